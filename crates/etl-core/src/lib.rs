//! Shared building blocks for the sales ETL pipeline.
//!
//! Holds the in-memory [`table::Table`] model, the error type, configuration
//! and CLI settings, date handling and CSV value formatting.

pub mod columns;
pub mod error;
pub mod formatting;
pub mod settings;
pub mod table;
pub mod time_utils;

pub use error::{EtlError, ErrorKind, Result};
pub use table::{Cell, Column, Table, Value};
