//! SQL sites: servers and their databases

use super::join::{NOT_LINKED, SqlServerIndex};
use super::paginate::paginate;
use super::resources::{SqlDatabaseResource, SqlServerResource};
use crate::client::{ArmEndpoint, Transport};
use crate::etl::Extractor;
use crate::storage::Row;

use eyre::Result;
use futures::TryStreamExt;
use serde::Serialize;
use std::pin::pin;

#[derive(Debug, Clone)]
pub struct SqlServer {
    /// Lowercased resource id, the join key
    pub id: String,
    pub sql_server_name: String,
    pub edition: String,
    pub version: String,
    pub host_name: String,
    pub logical_cpu_count: u32,
    pub is_high_availability_enabled: bool,
    /// Id of the hosting machine, [`NOT_LINKED`] when unknown
    pub machine_id: String,
}

impl From<SqlServerResource> for SqlServer {
    fn from(resource: SqlServerResource) -> Self {
        let properties = resource.properties;
        let machine_id = properties
            .machine_overview_list
            .into_iter()
            .next()
            .and_then(|overview| overview.extended_machine_id)
            .unwrap_or_else(|| NOT_LINKED.to_string());
        Self {
            id: resource.id.to_lowercase(),
            sql_server_name: properties.sql_server_name,
            edition: properties.edition,
            version: properties.version,
            host_name: properties.host_name,
            logical_cpu_count: properties.logical_cpu_count,
            is_high_availability_enabled: properties.is_high_availability_enabled,
            machine_id,
        }
    }
}

/// One database with its server's details
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DatabaseRow {
    pub machine_id: String,
    pub sql_server_name: String,
    pub edition: String,
    pub is_server_high_availability_enabled: bool,
    pub logical_cpu_count: u32,
    pub host_name: String,
    pub version: String,
    pub database_name: String,
    pub is_database_highly_available: bool,
    pub size_in_mb: i64,
}

impl Row for DatabaseRow {
    const HEADER: &'static [&'static str] = &[
        "MachineId",
        "SqlServerName",
        "Edition",
        "IsServerHighAvailabilityEnabled",
        "LogicalCpuCount",
        "HostName",
        "Version",
        "DatabaseName",
        "IsDatabaseHighlyAvailable",
        "SizeInMb",
    ];
}

impl DatabaseRow {
    pub fn new(server: &SqlServer, database: &SqlDatabaseResource) -> Self {
        Self {
            machine_id: server.machine_id.clone(),
            sql_server_name: server.sql_server_name.clone(),
            edition: server.edition.clone(),
            is_server_high_availability_enabled: server.is_high_availability_enabled,
            logical_cpu_count: server.logical_cpu_count,
            host_name: server.host_name.clone(),
            version: server.version.clone(),
            database_name: database.properties.database_name.clone(),
            is_database_highly_available: database.properties.is_database_highly_available,
            size_in_mb: database.properties.size_mb.round() as i64,
        }
    }
}

/// Extracts the database inventory of one SQL site.
///
/// Every server of the site is enumerated before the first database is read,
/// so a database never races its server.
pub struct SqlSiteExtractor<'a, T> {
    transport: &'a T,
    endpoint: &'a ArmEndpoint,
    site_id: String,
}

impl<'a, T: Transport> SqlSiteExtractor<'a, T> {
    pub fn new(transport: &'a T, endpoint: &'a ArmEndpoint, site_id: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint,
            site_id: site_id.into(),
        }
    }

    async fn servers(&self) -> Result<SqlServerIndex> {
        let url = self.endpoint.child(&self.site_id, "sqlServers");
        let servers: Vec<SqlServerResource> =
            paginate::<T, SqlServerResource>(self.transport, url).try_collect().await?;
        let index: SqlServerIndex = servers.into_iter().map(SqlServer::from).collect();
        if index.is_empty() {
            log::warn!("No SQL servers found in {}", self.site_id);
        } else {
            log::debug!("Found {} SQL server(s) in {}", index.len(), self.site_id);
        }
        Ok(index)
    }
}

impl<T: Transport> Extractor for SqlSiteExtractor<'_, T> {
    type Item = DatabaseRow;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        let index = self.servers().await?;

        let url = self.endpoint.child(&self.site_id, "sqlDatabases");
        let mut databases = pin!(paginate::<T, SqlDatabaseResource>(self.transport, url));

        let mut rows = Vec::new();
        let mut skipped = 0;
        while let Some(database) = databases.try_next().await? {
            match index.resolve(&database.properties.sql_server_arm_id) {
                Ok(server) => rows.push(DatabaseRow::new(server, &database)),
                Err(e) => {
                    log::warn!(
                        "Skipping database {}: {}",
                        database.properties.database_name,
                        e
                    );
                    skipped += 1;
                }
            }
        }

        log::info!(
            "Extracted {} database(s) from {}{}",
            rows.len(),
            self.site_id,
            if skipped > 0 {
                format!(" ({} unresolved)", skipped)
            } else {
                String::new()
            }
        );

        Ok(rows)
    }
}
