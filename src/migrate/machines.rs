//! Discovered machines and their installed software
//!
//! Machines are enumerated per appliance site, enriched with one
//! software-inventory fetch each, and projected into machine and software rows.

use super::paginate::paginate;
use super::resources::{MachineResource, SoftwareInventory};
use crate::client::{ArmEndpoint, Transport, fetch};
use crate::storage::Row;

use eyre::{Context, Result};
use futures::stream::{Stream, TryStreamExt};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Application {
    pub name: String,
    pub version: String,
    pub provider: String,
}

#[derive(Debug, Clone)]
pub struct Machine {
    /// Lowercased resource id, the join key
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub power_status: String,
    pub ip_addresses: Vec<String>,
    pub applications: Vec<Application>,
    pub features: Vec<String>,
}

impl From<MachineResource> for Machine {
    fn from(resource: MachineResource) -> Self {
        let properties = resource.properties;
        Self {
            id: resource.id.to_lowercase(),
            name: resource.name,
            display_name: properties.display_name,
            power_status: properties.power_status.unwrap_or_default(),
            ip_addresses: properties
                .network_adapters
                .into_iter()
                .flat_map(|adapter| adapter.ip_address_list)
                .collect(),
            applications: Vec::new(),
            features: Vec::new(),
        }
    }
}

impl Machine {
    /// Attach the applications and features of a software inventory
    pub fn enrich(&mut self, inventory: SoftwareInventory) {
        let Some(apps_and_roles) = inventory.properties.apps_and_roles else {
            return;
        };
        self.applications
            .extend(apps_and_roles.applications.into_iter().map(|app| Application {
                name: app.name,
                version: app.version.unwrap_or_default(),
                provider: app.provider.unwrap_or_default(),
            }));
        self.features
            .extend(apps_and_roles.features.into_iter().map(|f| f.name));
    }
}

/// One line of the machine export
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MachineRow {
    pub name: String,
    pub display_name: String,
    pub ip_addresses: String,
}

impl Row for MachineRow {
    const HEADER: &'static [&'static str] = &["Name", "DisplayName", "IpAddresses"];
}

impl From<&Machine> for MachineRow {
    fn from(machine: &Machine) -> Self {
        Self {
            name: machine.name.clone(),
            display_name: machine.display_name.clone(),
            ip_addresses: machine.ip_addresses.join(","),
        }
    }
}

/// One line of the software inventory: either an application or a feature
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SoftwareRow {
    pub machine_id: String,
    pub power_status: String,
    pub display_name: String,
    pub application_name: Option<String>,
    pub application_version: Option<String>,
    pub application_provider: Option<String>,
    pub feature_name: Option<String>,
}

impl Row for SoftwareRow {
    const HEADER: &'static [&'static str] = &[
        "MachineId",
        "PowerStatus",
        "DisplayName",
        "ApplicationName",
        "ApplicationVersion",
        "ApplicationProvider",
        "FeatureName",
    ];
}

impl SoftwareRow {
    pub fn for_application(machine: &Machine, application: &Application) -> Self {
        Self {
            machine_id: machine.name.clone(),
            power_status: machine.power_status.clone(),
            display_name: machine.display_name.clone(),
            application_name: Some(application.name.clone()),
            application_version: Some(application.version.clone()),
            application_provider: Some(application.provider.clone()),
            feature_name: None,
        }
    }

    pub fn for_feature(machine: &Machine, feature: &str) -> Self {
        Self {
            machine_id: machine.name.clone(),
            power_status: machine.power_status.clone(),
            display_name: machine.display_name.clone(),
            application_name: None,
            application_version: None,
            application_provider: None,
            feature_name: Some(feature.to_string()),
        }
    }

    /// Applications first, then features
    pub fn project(machine: &Machine) -> Vec<Self> {
        machine
            .applications
            .iter()
            .map(|app| Self::for_application(machine, app))
            .chain(machine.features.iter().map(|f| Self::for_feature(machine, f)))
            .collect()
    }
}

/// Reads the machines of appliance sites
pub struct MachineInventory<'a, T> {
    transport: &'a T,
    endpoint: &'a ArmEndpoint,
}

impl<'a, T: Transport> MachineInventory<'a, T> {
    pub fn new(transport: &'a T, endpoint: &'a ArmEndpoint) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    /// Lazily enumerate the machines of one appliance site
    pub fn machines(&self, site_id: &str) -> impl Stream<Item = Result<Machine>> + use<'a, T> {
        paginate::<T, MachineResource>(self.transport, self.endpoint.child(site_id, "machines"))
            .map_ok(Machine::from)
    }

    /// Fetch a machine's software inventory and attach it
    pub async fn enrich(&self, machine: &mut Machine) -> Result<()> {
        let url = self
            .endpoint
            .child(&machine.id, "softwareInventories/default");
        let inventory: SoftwareInventory = fetch(self.transport, &url)
            .await
            .with_context(|| format!("Failed to fetch software inventory of {}", machine.name))?;
        machine.enrich(inventory);

        log::debug!(
            "Machine {}: {} application(s), {} feature(s)",
            machine.name,
            machine.applications.len(),
            machine.features.len()
        );
        Ok(())
    }
}
