//! Azure Migrate discovery extraction
//!
//! This module walks the discovery resources of a migrate project and turns
//! them into rows. Each resource family has its own submodule; the
//! [`MigrateExtractor`] drives them in order.

pub mod dependencies;
pub mod export;
pub mod join;
pub mod machines;
pub mod paginate;
pub mod resources;
pub mod sql;
pub mod web_apps;

mod orchestrator;

pub use dependencies::{Dependency, DependencyDeduplicator, DependencyExtractor};
pub use export::{ExportJob, ExportPoller};
pub use join::{JoinContext, SqlServerIndex};
pub use machines::{Application, Machine, MachineInventory, MachineRow, SoftwareRow};
pub use orchestrator::{ExtractionOptions, MigrateExtractor, ProjectSummary, RunSummary};
pub use paginate::paginate;
pub use sql::{DatabaseRow, SqlServer, SqlSiteExtractor};
pub use web_apps::{WebAppSiteExtractor, WebsiteRow};
