//! Web-app sites: discovered web applications and their hosting machine

use super::join::JoinContext;
use super::paginate::paginate;
use super::resources::WebApplicationResource;
use crate::client::{ArmEndpoint, Transport};
use crate::etl::Extractor;
use crate::storage::Row;

use eyre::Result;
use futures::TryStreamExt;
use serde::Serialize;
use std::pin::pin;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebsiteRow {
    pub machine_id: String,
    pub web_server_type: String,
    pub web_server_name: String,
    pub display_name: String,
    pub framework_name: String,
    pub framework_version: String,
}

impl Row for WebsiteRow {
    const HEADER: &'static [&'static str] = &[
        "MachineId",
        "WebServerType",
        "WebServerName",
        "DisplayName",
        "FrameworkName",
        "FrameworkVersion",
    ];
}

impl WebsiteRow {
    /// Project a web application; only its first framework is reported
    pub fn new(machine_id: &str, application: &WebApplicationResource) -> Self {
        let properties = &application.properties;
        let framework = properties.frameworks.first();
        Self {
            machine_id: machine_id.to_string(),
            web_server_type: properties.server_type.clone().unwrap_or_default(),
            web_server_name: properties.web_server_name.clone().unwrap_or_default(),
            display_name: properties.display_name.clone(),
            framework_name: framework.map(|f| f.name.clone()).unwrap_or_default(),
            framework_version: framework
                .and_then(|f| f.version.clone())
                .unwrap_or_default(),
        }
    }
}

/// Extracts the web applications of one web-app site
pub struct WebAppSiteExtractor<'a, T> {
    transport: &'a T,
    endpoint: &'a ArmEndpoint,
    context: &'a JoinContext,
    site_id: String,
}

impl<'a, T: Transport> WebAppSiteExtractor<'a, T> {
    pub fn new(
        transport: &'a T,
        endpoint: &'a ArmEndpoint,
        context: &'a JoinContext,
        site_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            endpoint,
            context,
            site_id: site_id.into(),
        }
    }
}

impl<T: Transport> Extractor for WebAppSiteExtractor<'_, T> {
    type Item = WebsiteRow;

    async fn extract(&self) -> Result<Vec<Self::Item>> {
        let url = self.endpoint.child(&self.site_id, "webApplications");
        let mut applications = pin!(paginate::<T, WebApplicationResource>(self.transport, url));

        let mut rows = Vec::new();
        while let Some(application) = applications.try_next().await? {
            let machine = self
                .context
                .machine_name(&application.properties.machine_arm_ids);
            rows.push(WebsiteRow::new(machine, &application));
        }

        log::info!("Extracted {} web application(s) from {}", rows.len(), self.site_id);

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_website_row() {
        let application: WebApplicationResource = serde_json::from_value(json!({
            "id": "/webapps/shop",
            "properties": {
                "displayName": "Default Web Site/shop",
                "webServerName": "iis-01",
                "serverType": "IIS",
                "frameworks": [
                    { "name": ".NET Framework", "version": "4.8" },
                    { "name": "ASP.NET" }
                ],
                "machineArmIds": ["/machines/iis-01"]
            }
        }))
        .unwrap();

        let row = WebsiteRow::new("iis-01-guid", &application);
        assert_eq!(row.machine_id, "iis-01-guid");
        assert_eq!(row.web_server_type, "IIS");
        assert_eq!(row.framework_name, ".NET Framework");
        assert_eq!(row.framework_version, "4.8");
    }

    #[test]
    fn test_website_row_without_framework() {
        let application: WebApplicationResource = serde_json::from_value(json!({
            "id": "/webapps/static",
            "properties": { "displayName": "static" }
        }))
        .unwrap();

        let context = JoinContext::default();
        let machine = context.machine_name(&application.properties.machine_arm_ids);
        let row = WebsiteRow::new(machine, &application);
        assert_eq!(row.machine_id, "NA");
        assert_eq!(row.framework_name, "");
        assert_eq!(row.web_server_name, "");
    }
}
