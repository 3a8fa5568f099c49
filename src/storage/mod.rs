//! File system storage operations
//!
//! This module handles all file output:
//! - CSV sinks with a fixed header per row type
//! - Dated, per-project output file naming

mod csv_sink;
mod output;

pub use csv_sink::{CsvSink, Row};
pub use output::{Category, OutputDirectory};
