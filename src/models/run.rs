//! Run context: what is known about previous runs, made explicit.

use chrono::{DateTime, Utc};

/// Typed view of the persisted run history, handed to the window
/// calculator instead of letting it probe the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunContext {
    /// End of the previously successful window, if any
    pub marker: Option<DateTime<Utc>>,

    /// Whether a persisted historical base exists
    pub base_exists: bool,
}

impl RunContext {
    pub fn new(marker: Option<DateTime<Utc>>, base_exists: bool) -> Self {
        Self {
            marker,
            base_exists,
        }
    }
}
