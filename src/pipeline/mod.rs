//! Reconciliation pipeline stages.
//!
//! - `window`: decide the `[since, until)` range for the next pull
//! - `normalize`: raw API records -> canonical occurrences
//! - `dedup`: one occurrence per delivery key
//! - `merge`: combine the batch with the historical base
//! - `mapping`: rewrite carrier names through the static table
//! - `snapshot`: project the base into publishable rows
//! - `pipeline`: wire the stages into a full run

pub mod dedup;
pub mod mapping;
pub mod merge;
pub mod normalize;
pub mod pipeline;
pub mod snapshot;
pub mod window;

pub use dedup::dedup;
pub use mapping::{CarrierMap, apply_mapping};
pub use merge::{MergeStats, merge_batch};
pub use normalize::{NormalizeStats, normalize_batch};
pub use pipeline::{RunOptions, RunReport, run_pipeline};
pub use snapshot::{SNAPSHOT_COLUMNS, SnapshotRow, build_snapshot};
pub use window::{FetchWindow, compute_window};
