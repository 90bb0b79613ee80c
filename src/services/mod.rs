// src/services/mod.rs

//! External collaborators: the tracking API client and the snapshot
//! publisher. The pipeline only sees the traits.

pub mod publisher;
pub mod tracking;

pub use publisher::{LogPublisher, SheetsPublisher, SnapshotPublisher};
pub use tracking::{OccurrenceSource, TrackingClient};
