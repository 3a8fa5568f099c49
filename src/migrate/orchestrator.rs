//! Extraction run
//!
//! Walks solutions → master site → appliance and nested sites and writes
//! the five category files of every project:
//!
//! ```text
//! ListSolutions ─┬─ discoveredCount == 0 ──> skip
//!                └─ FetchMasterSite ─> ResolveNestedSites ─┬─ Software ─> WebApps
//!                                                          ├─ Sql
//!                                                          └─ Dependencies
//! ```
//!
//! The three branches run concurrently. Web applications wait for the
//! software pass because their machine names come from the machine map it
//! builds.

use super::dependencies::{DEFAULT_WINDOW_DAYS, Dependency, DependencyExtractor};
use super::export::{DEFAULT_POLL_INTERVAL, ExportPoller};
use super::join::JoinContext;
use super::machines::{MachineInventory, MachineRow, SoftwareRow};
use super::paginate::paginate;
use super::resources::{MasterSite, NestedSite, NestedSiteKind, Solution};
use super::sql::{DatabaseRow, SqlSiteExtractor};
use super::web_apps::{WebAppSiteExtractor, WebsiteRow};
use crate::client::{ArmEndpoint, Transport, fetch};
use crate::etl::{Extractor, Loader};
use crate::storage::{Category, OutputDirectory};

use eyre::{Context, Result};
use futures::TryStreamExt;
use owo_colors::OwoColorize;
use std::pin::pin;
use std::time::Duration;

/// What to extract and how patiently
#[derive(Debug, Clone)]
pub struct ExtractionOptions {
    pub subscription_id: String,
    pub resource_group: String,
    /// Name of the migrate project
    pub project: String,
    pub poll_interval: Duration,
    /// Look-back of dependency exports, in days
    pub dependency_days: i64,
}

impl ExtractionOptions {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            project: project.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            dependency_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

/// Rows written for one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectSummary {
    pub name: String,
    pub machines: usize,
    pub software_rows: usize,
    pub database_rows: usize,
    pub website_rows: usize,
    pub dependency_rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub projects: Vec<ProjectSummary>,
    /// Solutions skipped for having nothing discovered
    pub skipped: usize,
}

/// Nested site ids grouped by kind
#[derive(Debug, Default)]
struct NestedSites {
    sql: Vec<String>,
    web_apps: Vec<String>,
}

/// Drives a full extraction over a [`Transport`]
pub struct MigrateExtractor<T> {
    transport: T,
    endpoint: ArmEndpoint,
    options: ExtractionOptions,
}

impl<T: Transport> MigrateExtractor<T> {
    pub fn new(transport: T, endpoint: ArmEndpoint, options: ExtractionOptions) -> Self {
        Self {
            transport,
            endpoint,
            options,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Extract every solution with discovered servers into `output`.
    ///
    /// # Errors
    /// Transport failures and undecodable pages abort the run. Failed export
    /// jobs and unresolved references are logged and skipped.
    pub async fn run(&self, output: &OutputDirectory) -> Result<RunSummary> {
        let url = self.endpoint.solutions(
            &self.options.subscription_id,
            &self.options.resource_group,
            &self.options.project,
        );
        log::info!("Listing solutions of migrate project {}", self.options.project.cyan());

        let mut summary = RunSummary::default();
        let mut solutions = pin!(paginate::<T, Solution>(&self.transport, url));
        while let Some(solution) = solutions.try_next().await? {
            if solution.discovered_count() == 0 {
                log::debug!("Skipping {}: nothing discovered", solution.name);
                summary.skipped += 1;
                continue;
            }
            let Some(master_site_id) = solution.master_site_id() else {
                log::warn!("Skipping {}: no master site", solution.name);
                summary.skipped += 1;
                continue;
            };

            let project = self
                .extract_project(&solution.name, master_site_id, output)
                .await
                .with_context(|| format!("Failed to extract {}", solution.name))?;
            summary.projects.push(project);
        }

        log::info!(
            "Finished extracting data. Output files are in {}",
            output.root().display().bright_black()
        );
        Ok(summary)
    }

    async fn extract_project(
        &self,
        name: &str,
        master_site_id: &str,
        output: &OutputDirectory,
    ) -> Result<ProjectSummary> {
        log::info!("Processing project {}", name.cyan());

        let master: MasterSite = fetch(&self.transport, &self.endpoint.resource(master_site_id))
            .await
            .with_context(|| format!("Failed to fetch master site {}", master_site_id))?;
        let nested = self.nested_sites(&master).await?;

        let software_then_web_apps = async {
            let (context, software_rows) = self.extract_software(name, &master, output).await?;
            let website_rows = self
                .extract_web_apps(name, &nested.web_apps, &context, output)
                .await?;
            Ok::<_, eyre::Report>((context.len(), software_rows, website_rows))
        };

        let ((machines, software_rows, website_rows), database_rows, dependency_rows) = tokio::try_join!(
            software_then_web_apps,
            self.extract_sql(name, &nested.sql, output),
            self.extract_dependencies(name, &master, output),
        )?;

        let summary = ProjectSummary {
            name: name.to_string(),
            machines,
            software_rows,
            database_rows,
            website_rows,
            dependency_rows,
        };
        log::info!(
            "Project {}: {} machine(s), {} software, {} database, {} website, {} dependency row(s)",
            name,
            summary.machines,
            summary.software_rows,
            summary.database_rows,
            summary.website_rows,
            summary.dependency_rows
        );
        Ok(summary)
    }

    async fn nested_sites(&self, master: &MasterSite) -> Result<NestedSites> {
        let mut sites = NestedSites::default();
        for id in &master.properties.nested_sites {
            let site: NestedSite = fetch(&self.transport, &self.endpoint.resource(id))
                .await
                .with_context(|| format!("Failed to fetch nested site {}", id))?;
            match site.kind() {
                NestedSiteKind::Sql => sites.sql.push(site.id),
                NestedSiteKind::WebApps => sites.web_apps.push(site.id),
                NestedSiteKind::Other => {
                    log::debug!("Ignoring nested site {} of type {}", site.id, site.resource_type)
                }
            }
        }
        Ok(sites)
    }

    /// Machines and software; returns the project's machine map
    async fn extract_software(
        &self,
        name: &str,
        master: &MasterSite,
        output: &OutputDirectory,
    ) -> Result<(JoinContext, usize)> {
        let mut machine_sink = output.sink::<MachineRow>(name, Category::Machines)?;
        let mut software_sink = output.sink::<SoftwareRow>(name, Category::Software)?;
        let inventory = MachineInventory::new(&self.transport, &self.endpoint);
        let mut builder = JoinContext::builder();

        for site_id in &master.properties.sites {
            log::info!("Fetching software of appliance site {}", site_id);
            let mut machines = pin!(inventory.machines(site_id));
            while let Some(mut machine) = machines.try_next().await? {
                inventory.enrich(&mut machine).await?;
                machine_sink.load(vec![MachineRow::from(&machine)]).await?;
                software_sink.load(SoftwareRow::project(&machine)).await?;
                builder.insert(machine);
            }
        }

        let context = builder.build();
        if context.is_empty() {
            log::warn!("No machines found in the appliance sites of {}", name);
        }
        log::info!(
            "Wrote {} software row(s) for {} machine(s) to {}",
            software_sink.rows(),
            context.len(),
            software_sink.path().display()
        );
        Ok((context, software_sink.rows()))
    }

    async fn extract_web_apps(
        &self,
        name: &str,
        sites: &[String],
        context: &JoinContext,
        output: &OutputDirectory,
    ) -> Result<usize> {
        let mut sink = output.sink::<WebsiteRow>(name, Category::Websites)?;
        for site_id in sites {
            log::info!("Processing web app site {}", site_id);
            let extractor = WebAppSiteExtractor::new(&self.transport, &self.endpoint, context, site_id);
            sink.load(extractor.extract().await?).await?;
        }
        Ok(sink.rows())
    }

    async fn extract_sql(&self, name: &str, sites: &[String], output: &OutputDirectory) -> Result<usize> {
        let mut sink = output.sink::<DatabaseRow>(name, Category::Databases)?;
        for site_id in sites {
            log::info!("Processing SQL site {}", site_id);
            let extractor = SqlSiteExtractor::new(&self.transport, &self.endpoint, site_id);
            sink.load(extractor.extract().await?).await?;
        }
        Ok(sink.rows())
    }

    async fn extract_dependencies(
        &self,
        name: &str,
        master: &MasterSite,
        output: &OutputDirectory,
    ) -> Result<usize> {
        let mut sink = output.sink::<Dependency>(name, Category::Dependencies)?;
        let poller = ExportPoller::new(&self.transport, &self.endpoint, self.options.poll_interval);
        for site_id in &master.properties.sites {
            log::info!("Fetching dependencies of appliance site {}", site_id);
            let extractor = DependencyExtractor::new(&poller, site_id, self.options.dependency_days);
            sink.load(extractor.extract().await?).await?;
        }
        Ok(sink.rows())
    }
}
