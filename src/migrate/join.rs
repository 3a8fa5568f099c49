//! Cross-reference resolution
//!
//! Rows that mention another resource (a database's server, a web
//! application's machine) are denormalized through the lookups here.
//! Resource ids are compared case-insensitively.

use super::machines::Machine;
use super::sql::SqlServer;

use eyre::{Result, eyre};
use std::collections::HashMap;

/// Machine id written when a record links to no machine at all
pub const NOT_LINKED: &str = "NA";

/// Machine id written when the linked machine was not discovered in this run
pub const UNKNOWN_MACHINE: &str = "unknown";

/// Collects machines while the software pass runs
#[derive(Debug, Default)]
pub struct JoinContextBuilder {
    machines: HashMap<String, Machine>,
}

impl JoinContextBuilder {
    pub fn insert(&mut self, machine: Machine) {
        self.machines.insert(machine.id.to_lowercase(), machine);
    }

    /// Freeze the map; nothing is added after this point
    pub fn build(self) -> JoinContext {
        JoinContext {
            machines: self.machines,
        }
    }
}

/// The machines of one project, read-only once built
#[derive(Debug, Default)]
pub struct JoinContext {
    machines: HashMap<String, Machine>,
}

impl JoinContext {
    pub fn builder() -> JoinContextBuilder {
        JoinContextBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn machine(&self, arm_id: &str) -> Option<&Machine> {
        self.machines.get(&arm_id.to_lowercase())
    }

    /// Name of the machine behind the first of `machine_arm_ids`.
    ///
    /// Falls back to [`NOT_LINKED`] for an empty list and to
    /// [`UNKNOWN_MACHINE`] when the id was never discovered.
    pub fn machine_name(&self, machine_arm_ids: &[String]) -> &str {
        let Some(arm_id) = machine_arm_ids.first() else {
            return NOT_LINKED;
        };
        match self.machine(arm_id) {
            Some(machine) => &machine.name,
            None => {
                log::debug!("Machine {} is not part of this project", arm_id);
                UNKNOWN_MACHINE
            }
        }
    }
}

/// SQL servers of one SQL site, keyed by resource id
#[derive(Debug, Default)]
pub struct SqlServerIndex {
    servers: HashMap<String, SqlServer>,
}

impl SqlServerIndex {
    pub fn insert(&mut self, server: SqlServer) {
        self.servers.insert(server.id.to_lowercase(), server);
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Look up the server a database belongs to.
    ///
    /// # Errors
    /// Returns an error if the server was not enumerated.
    pub fn resolve(&self, server_arm_id: &str) -> Result<&SqlServer> {
        self.servers
            .get(&server_arm_id.to_lowercase())
            .ok_or_else(|| eyre!("SQL server {} was not found in this site", server_arm_id))
    }
}

impl FromIterator<SqlServer> for SqlServerIndex {
    fn from_iter<I: IntoIterator<Item = SqlServer>>(iter: I) -> Self {
        let mut index = Self::default();
        for server in iter {
            index.insert(server);
        }
        index
    }
}
