//! Management endpoint and resource URL construction

use eyre::{Context, Result};
use url::Url;

/// Public-cloud management root
pub const DEFAULT_ROOT: &str = "https://management.azure.com";

/// API version used for every site, machine and export request
pub const DEFAULT_API_VERSION: &str = "2023-06-06";

/// The migrate-project solutions listing only answers on the older preview version
pub const SOLUTIONS_API_VERSION: &str = "2020-06-01-preview";

/// Builds absolute URLs for ARM resource identifiers.
///
/// Resource identifiers returned by the service are root-relative
/// (`/subscriptions/...`), so every URL is `{root}{id}[/{child}]?api-version=...`.
#[derive(Clone, Debug)]
pub struct ArmEndpoint {
    root: Url,
    api_version: String,
}

impl ArmEndpoint {
    pub fn new(root: Url) -> Self {
        Self {
            root,
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    /// Parse a root URL, e.g. from `ARM_ENDPOINT`.
    pub fn parse(root: &str) -> Result<Self> {
        let url = Url::parse(root).with_context(|| format!("Invalid ARM endpoint: {}", root))?;
        Ok(Self::new(url))
    }

    fn base(&self) -> &str {
        self.root.as_str().trim_end_matches('/')
    }

    /// URL of a single resource
    pub fn resource(&self, id: &str) -> String {
        format!("{}{}?api-version={}", self.base(), id, self.api_version)
    }

    /// URL of a child collection or action under a resource
    pub fn child(&self, id: &str, name: &str) -> String {
        format!(
            "{}{}/{}?api-version={}",
            self.base(),
            id.trim_end_matches('/'),
            name,
            self.api_version
        )
    }

    /// URL listing the solutions of a migrate project
    pub fn solutions(&self, subscription_id: &str, resource_group: &str, project: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Migrate/migrateProjects/{}/solutions?api-version={}",
            self.base(),
            subscription_id,
            resource_group,
            project,
            SOLUTIONS_API_VERSION
        )
    }
}

impl std::fmt::Display for ArmEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base())
    }
}
