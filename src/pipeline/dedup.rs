//! Batch deduplication.
//!
//! Collapses a normalized batch to one occurrence per delivery key using
//! the status-priority + recency rule. Pure reduction; the result never
//! depends on hash iteration order.

use std::collections::HashMap;

use crate::models::Occurrence;

/// Reduce a batch to one occurrence per key.
///
/// Highest status priority wins; ties fall to the latest occurrence
/// date; a full tie keeps the first occurrence seen in input order.
/// Output preserves first-seen key order.
pub fn dedup(batch: Vec<Occurrence>) -> Vec<Occurrence> {
    let mut kept: Vec<Occurrence> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for occurrence in batch {
        match index.get(&occurrence.key) {
            Some(&slot) => {
                if occurrence.supersedes(&kept[slot]) {
                    kept[slot] = occurrence;
                }
            }
            None => {
                index.insert(occurrence.key.clone(), kept.len());
                kept.push(occurrence);
            }
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeliveryStatus;
    use chrono::{DateTime, TimeZone, Utc};

    fn date(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, 0, 0, 0).unwrap()
    }

    fn occ(key: &str, status: DeliveryStatus, day: u32, order: &str) -> Occurrence {
        Occurrence {
            key: key.to_string(),
            status,
            occurred_at: date(day),
            carrier: "Carrier".to_string(),
            invoice: "1".to_string(),
            series: "1".to_string(),
            order: order.to_string(),
        }
    }

    #[test]
    fn higher_priority_wins_despite_older_date() {
        let batch = vec![
            occ("A1", DeliveryStatus::DataConfirmed, 1, "newer"),
            occ("A1", DeliveryStatus::Delivered, 28, "older"),
        ];
        // Delivered dated earlier in the month still outranks DataConfirmed.
        let result = dedup(batch);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].status, DeliveryStatus::Delivered);
    }

    #[test]
    fn equal_priority_latest_date_wins() {
        let batch = vec![
            occ("A1", DeliveryStatus::Cancelled, 1, "first"),
            occ("A1", DeliveryStatus::Cancelled, 2, "second"),
        ];
        let result = dedup(batch);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].occurred_at, date(2));
    }

    #[test]
    fn full_tie_keeps_first_seen() {
        let batch = vec![
            occ("A1", DeliveryStatus::Delivered, 1, "first"),
            occ("A1", DeliveryStatus::Delivered, 1, "second"),
        ];
        let result = dedup(batch);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].order, "first");
    }

    #[test]
    fn distinct_keys_all_survive_in_input_order() {
        let batch = vec![
            occ("C", DeliveryStatus::Delivered, 1, ""),
            occ("A", DeliveryStatus::Cancelled, 1, ""),
            occ("B", DeliveryStatus::Delivered, 1, ""),
        ];
        let result = dedup(batch);
        let keys: Vec<&str> = result.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["C", "A", "B"]);
    }

    #[test]
    fn repeated_runs_pick_the_same_record() {
        let batch = vec![
            occ("A1", DeliveryStatus::Cancelled, 2, "keep"),
            occ("A1", DeliveryStatus::Cancelled, 1, "drop"),
            occ("A1", DeliveryStatus::Cancelled, 2, "tie-late"),
        ];
        let first = dedup(batch.clone());
        let second = dedup(batch);
        assert_eq!(first, second);
        assert_eq!(first[0].order, "keep");
    }

    #[test]
    fn empty_batch_yields_empty_result() {
        assert!(dedup(Vec::new()).is_empty());
    }
}
