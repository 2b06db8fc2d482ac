//! Session planning for TSAM training batches.
//!
//! Distributes a batch's module curriculum over calendar dates and faculty
//! timing windows, skipping batch holidays, and stores the resulting
//! sessions in SQLite.

pub mod clock;
pub mod config;
pub mod db;
pub mod fixture;
pub mod model;
pub mod planner;
pub mod service;

/// Install the `RUST_LOG`-driven compact subscriber used by the binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
