//! Snapshot projection.
//!
//! Projects the full, mapped historical base into the flat row shape the
//! publish destination expects. Always the complete base, never a delta.

use crate::models::HistoricalBase;

/// Column order of the published snapshot.
pub const SNAPSHOT_COLUMNS: [&str; 5] = ["NUMERO", "SERIE", "CHAVE", "TRANSPORTADORA", "STATUS"];

/// One published row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotRow {
    pub invoice: String,
    pub series: String,
    pub key: String,
    pub carrier: String,
    pub status: String,
}

impl SnapshotRow {
    /// Cell values in [`SNAPSHOT_COLUMNS`] order.
    pub fn values(&self) -> Vec<String> {
        vec![
            self.invoice.clone(),
            self.series.clone(),
            self.key.clone(),
            self.carrier.clone(),
            self.status.clone(),
        ]
    }
}

/// Project the base into rows, in key order.
pub fn build_snapshot(base: &HistoricalBase) -> Vec<SnapshotRow> {
    base.iter()
        .map(|record| SnapshotRow {
            invoice: record.invoice.clone(),
            series: record.series.clone(),
            key: record.key.clone(),
            carrier: record.carrier.clone(),
            status: record.status.as_label().to_string(),
        })
        .collect()
}
