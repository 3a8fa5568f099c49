//! Typed shapes of the management API responses
//!
//! Every endpoint is decoded into one of these structures as soon as it is
//! fetched. Optional fields are only those the service legitimately omits;
//! anything else missing fails the decode.

use serde::Deserialize;
use serde_json::Value;

/// One page of a collection
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub value: Vec<Value>,
    #[serde(default)]
    pub next_link: Option<String>,
}

/// A migrate-project solution (one discovery or assessment tool)
#[derive(Debug, Clone, Deserialize)]
pub struct Solution {
    pub name: String,
    #[serde(default)]
    pub properties: SolutionProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SolutionProperties {
    #[serde(default)]
    pub summary: Option<SolutionSummary>,
    #[serde(default)]
    pub details: Option<SolutionDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionSummary {
    #[serde(default)]
    pub discovered_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolutionDetails {
    #[serde(default)]
    pub extended_details: Option<ExtendedDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedDetails {
    #[serde(default)]
    pub master_site_id: Option<String>,
}

impl Solution {
    /// Number of discovered servers; a solution without a summary has discovered nothing
    pub fn discovered_count(&self) -> u64 {
        self.properties
            .summary
            .as_ref()
            .and_then(|s| s.discovered_count)
            .unwrap_or(0)
    }

    pub fn master_site_id(&self) -> Option<&str> {
        self.properties
            .details
            .as_ref()?
            .extended_details
            .as_ref()?
            .master_site_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }
}

/// Root of an appliance's discovered resources
#[derive(Debug, Clone, Deserialize)]
pub struct MasterSite {
    pub id: String,
    #[serde(default)]
    pub properties: MasterSiteProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterSiteProperties {
    /// Appliance sites, one per on-premises collector
    #[serde(default)]
    pub sites: Vec<String>,
    #[serde(default)]
    pub nested_sites: Vec<String>,
}

/// A typed sub-site of a master site
#[derive(Debug, Clone, Deserialize)]
pub struct NestedSite {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
}

/// Nested site types the extractor knows how to walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedSiteKind {
    Sql,
    WebApps,
    Other,
}

impl NestedSite {
    pub fn kind(&self) -> NestedSiteKind {
        match self.resource_type.to_ascii_lowercase().as_str() {
            "microsoft.offazure/mastersites/sqlsites" => NestedSiteKind::Sql,
            "microsoft.offazure/mastersites/webappsites" => NestedSiteKind::WebApps,
            _ => NestedSiteKind::Other,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MachineResource {
    pub id: String,
    pub name: String,
    pub properties: MachineProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineProperties {
    pub display_name: String,
    /// Physical servers report no power state
    #[serde(default)]
    pub power_status: Option<String>,
    #[serde(default)]
    pub network_adapters: Vec<NetworkAdapter>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkAdapter {
    #[serde(default)]
    pub ip_address_list: Vec<String>,
}

/// `{machine}/softwareInventories/default`
#[derive(Debug, Clone, Deserialize)]
pub struct SoftwareInventory {
    #[serde(default)]
    pub properties: SoftwareInventoryProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftwareInventoryProperties {
    #[serde(default)]
    pub apps_and_roles: Option<AppsAndRoles>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppsAndRoles {
    #[serde(default)]
    pub applications: Vec<ApplicationRecord>,
    #[serde(default)]
    pub features: Vec<FeatureRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationRecord {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureRecord {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlServerResource {
    pub id: String,
    pub properties: SqlServerProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlServerProperties {
    pub sql_server_name: String,
    pub edition: String,
    pub version: String,
    pub host_name: String,
    pub logical_cpu_count: u32,
    pub is_high_availability_enabled: bool,
    #[serde(default)]
    pub machine_overview_list: Vec<MachineOverview>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineOverview {
    #[serde(default)]
    pub extended_machine_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlDatabaseResource {
    pub id: String,
    pub properties: SqlDatabaseProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SqlDatabaseProperties {
    pub database_name: String,
    #[serde(rename = "sizeMB")]
    pub size_mb: f64,
    pub is_database_highly_available: bool,
    pub sql_server_arm_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebApplicationResource {
    pub id: String,
    pub properties: WebApplicationProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebApplicationProperties {
    pub display_name: String,
    #[serde(default)]
    pub web_server_name: Option<String>,
    #[serde(default)]
    pub server_type: Option<String>,
    #[serde(default)]
    pub frameworks: Vec<Framework>,
    #[serde(default)]
    pub machine_arm_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Framework {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Envelope returned by an async-operation status URL
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    pub status: String,
    #[serde(default)]
    pub properties: Option<OperationProperties>,
    #[serde(default)]
    pub error: Option<OperationError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationProperties {
    /// JSON-encoded [`ExportResult`]
    #[serde(default)]
    pub result: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl std::fmt::Display for OperationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.code.as_deref().unwrap_or("Unknown"),
            self.message.as_deref().unwrap_or("no message")
        )
    }
}

/// Decoded `properties.result` of a succeeded export
#[derive(Debug, Clone, Deserialize)]
pub struct ExportResult {
    #[serde(rename = "SASUri")]
    pub sas_uri: String,
}
