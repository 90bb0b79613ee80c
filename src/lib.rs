// src/lib.rs

//! tracksync library
//!
//! Reconciles incremental delivery-tracking events into a durable,
//! deduplicated historical base and republishes the full snapshot.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
