//! Migrate Extractor
//!
//! Extracts Azure Migrate discovery data (machines, software, SQL databases,
//! web applications and network dependencies) into CSV files

pub mod cli;
pub mod client;
pub mod etl;
pub mod migrate;
pub mod storage;

// Re-exports for convenience
pub use client::{ArmClient, ArmEndpoint, Auth, AuthType, Transport};
pub use etl::{Extractor, Loader};
pub use migrate::{ExtractionOptions, MigrateExtractor, RunSummary};
pub use storage::{Category, CsvSink, OutputDirectory, Row};
