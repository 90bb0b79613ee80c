//! Persistence abstractions for the historical base and run marker.
//!
//! ## Storage Layout
//!
//! ```text
//! {state_dir}/
//! ├── base.json        # Historical base, full table
//! └── last_run.txt     # End of the last successful window (RFC 3339)
//! ```
//!
//! The base is written atomically (temp file + rename) so a crash
//! mid-write never truncates the previous base. The marker is written
//! only after the base write has completed.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{HistoricalBase, Occurrence};

// Re-export for convenience
pub use local::LocalStorage;

/// On-disk shape of the persisted base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseFile {
    /// Timestamp of the last write
    pub updated_at: DateTime<Utc>,

    /// Record count, for quick inspection
    pub count: usize,

    /// One record per delivery key
    pub records: Vec<Occurrence>,
}

impl BaseFile {
    pub fn new(base: &HistoricalBase) -> Self {
        let records: Vec<Occurrence> = base.iter().cloned().collect();
        Self {
            updated_at: Utc::now(),
            count: records.len(),
            records,
        }
    }
}

/// Trait for run-state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the historical base, or `None` on first run.
    async fn load_base(&self) -> Result<Option<HistoricalBase>>;

    /// Persist the full base atomically.
    async fn save_base(&self, base: &HistoricalBase) -> Result<()>;

    /// Load the run marker, or `None` if no successful run recorded one.
    async fn load_marker(&self) -> Result<Option<DateTime<Utc>>>;

    /// Record the end of a successful window.
    async fn save_marker(&self, marker: DateTime<Utc>) -> Result<()>;
}
