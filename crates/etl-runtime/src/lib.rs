//! Runtime orchestration layer for the sales ETL.
//!
//! Runs the data-layer stages in order and reports per-stage timings.

pub mod pipeline;

pub use etl_core as core;
pub use etl_data as data;
