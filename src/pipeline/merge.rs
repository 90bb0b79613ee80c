//! Merge engine.
//!
//! Combines a deduplicated batch with the historical base, enforcing the
//! no-regression invariant: a stored delivery's status only moves to an
//! equal-or-higher priority. The base never shrinks.

use crate::models::{HistoricalBase, Occurrence};

/// Per-merge counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Keys not previously in the base
    pub inserted: usize,
    /// Stored records replaced by a strictly higher priority
    pub upgraded: usize,
    /// Stored records refreshed by a later date at equal priority
    pub refreshed: usize,
    /// Incoming updates discarded because they would regress the status
    pub regressions_discarded: usize,
    /// Incoming records identical in rank and date to the stored one
    pub unchanged: usize,
}

impl MergeStats {
    /// Records that changed the base in some way.
    pub fn applied(&self) -> usize {
        self.inserted + self.upgraded + self.refreshed
    }
}

/// Merge a deduplicated batch into the base, in place.
pub fn merge_batch(base: &mut HistoricalBase, batch: Vec<Occurrence>) -> MergeStats {
    let mut stats = MergeStats::default();

    for incoming in batch {
        match base.get(&incoming.key) {
            None => {
                stats.inserted += 1;
                base.insert(incoming);
            }
            Some(stored) => {
                let incoming_rank = incoming.status.priority();
                let stored_rank = stored.status.priority();

                if incoming_rank < stored_rank {
                    stats.regressions_discarded += 1;
                    log::debug!(
                        "Discarding regression for {}: {} would revert {}",
                        incoming.key,
                        incoming.status.as_label(),
                        stored.status.as_label()
                    );
                } else if incoming.supersedes(stored) {
                    if incoming_rank > stored_rank {
                        stats.upgraded += 1;
                    } else {
                        stats.refreshed += 1;
                    }
                    base.insert(incoming);
                } else {
                    stats.unchanged += 1;
                }
            }
        }
    }

    if stats.regressions_discarded > 0 {
        log::info!(
            "Merge discarded {} stale regression(s)",
            stats.regressions_discarded
        );
    }

    stats
}
