//! Pipeline stages for the sales ETL.
//!
//! Responsible for reading the store and auxiliary tables, joining them,
//! cleaning the result, aggregating sales per month, writing both tables as
//! CSV and checking that the outputs landed on disk.

pub mod aggregator;
pub mod extract;
pub mod loader;
pub mod reader;
pub mod transform;
pub mod validation;

pub use etl_core as core;
