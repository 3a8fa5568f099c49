//! Network dependencies
//!
//! An appliance's dependency export is a CSV of per-time-slot flow samples.
//! The same flow shows up once per slot it was seen in; folding away the
//! time slot leaves one row per distinct source/destination pair.

use super::export::ExportPoller;
use crate::client::Transport;
use crate::etl::Extractor;
use crate::storage::Row;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;

/// Source process reported for idle CPU time, never a real dependency
pub const IDLE_PROCESS: &str = "System Idle Process";

/// Default look-back of a dependency export
pub const DEFAULT_WINDOW_DAYS: i64 = 14;

/// Longest look-back accepted for a dependency export
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// One raw row of a dependency export
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyObservation {
    #[serde(rename = "Time slot")]
    pub time_slot: String,
    #[serde(rename = "Source server name")]
    pub source_server_name: String,
    #[serde(rename = "Source IP")]
    pub source_ip: String,
    #[serde(rename = "Source application")]
    pub source_application: Option<String>,
    #[serde(rename = "Source process")]
    pub source_process: Option<String>,
    #[serde(rename = "Destination server name")]
    pub destination_server_name: String,
    #[serde(rename = "Destination IP")]
    pub destination_ip: String,
    #[serde(rename = "Destination application")]
    pub destination_application: Option<String>,
    #[serde(rename = "Destination process")]
    pub destination_process: Option<String>,
    #[serde(rename = "Destination port")]
    pub destination_port: Option<u16>,
}

/// One side of a flow
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowEndpoint {
    pub server_name: String,
    pub ip: String,
    pub application: Option<String>,
    pub process: Option<String>,
}

/// Identity of a dependency: fields are compared one by one, never concatenated
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyKey {
    pub source: FlowEndpoint,
    pub destination: FlowEndpoint,
    pub destination_port: Option<u16>,
}

/// A distinct dependency, written as one CSV line
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Dependency {
    pub source_server_name: String,
    pub source_ip: String,
    pub source_application: Option<String>,
    pub source_process: Option<String>,
    pub destination_server_name: String,
    pub destination_ip: String,
    pub destination_application: Option<String>,
    pub destination_process: Option<String>,
    pub destination_port: Option<u16>,
}

impl Row for Dependency {
    const HEADER: &'static [&'static str] = &[
        "Source server name",
        "Source IP",
        "Source application",
        "Source process",
        "Destination server name",
        "Destination IP",
        "Destination application",
        "Destination process",
        "Destination port",
    ];
}

impl Dependency {
    pub fn key(&self) -> DependencyKey {
        DependencyKey {
            source: FlowEndpoint {
                server_name: self.source_server_name.clone(),
                ip: self.source_ip.clone(),
                application: self.source_application.clone(),
                process: self.source_process.clone(),
            },
            destination: FlowEndpoint {
                server_name: self.destination_server_name.clone(),
                ip: self.destination_ip.clone(),
                application: self.destination_application.clone(),
                process: self.destination_process.clone(),
            },
            destination_port: self.destination_port,
        }
    }
}

impl From<DependencyObservation> for Dependency {
    fn from(observation: DependencyObservation) -> Self {
        Self {
            source_server_name: observation.source_server_name,
            source_ip: observation.source_ip,
            source_application: observation.source_application,
            source_process: observation.source_process,
            destination_server_name: observation.destination_server_name,
            destination_ip: observation.destination_ip,
            destination_application: observation.destination_application,
            destination_process: observation.destination_process,
            destination_port: observation.destination_port,
        }
    }
}

/// Folds observations into distinct dependencies, keeping first-seen order
#[derive(Debug, Default)]
pub struct DependencyDeduplicator {
    seen: HashSet<DependencyKey>,
    dependencies: Vec<Dependency>,
    idle: usize,
    duplicates: usize,
}

impl DependencyDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one observation; returns whether it produced a new dependency
    pub fn observe(&mut self, observation: DependencyObservation) -> bool {
        if observation.source_process.as_deref() == Some(IDLE_PROCESS) {
            self.idle += 1;
            return false;
        }

        let dependency = Dependency::from(observation);
        if self.seen.insert(dependency.key()) {
            self.dependencies.push(dependency);
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn into_dependencies(self) -> Vec<Dependency> {
        if self.is_empty() {
            log::debug!("Export held no dependencies ({} idle observations dropped)", self.idle);
            return self.dependencies;
        }
        log::debug!(
            "{} distinct dependencies ({} duplicate, {} idle observations dropped)",
            self.len(),
            self.duplicates,
            self.idle
        );
        self.dependencies
    }
}

/// Decode a dependency export and deduplicate it.
///
/// Columns are matched by header name. Rows that fail to decode are logged
/// and skipped.
pub fn deduplicate_csv(payload: &[u8]) -> Result<Vec<Dependency>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(payload);

    let mut deduplicator = DependencyDeduplicator::new();
    for (line, record) in reader.deserialize::<DependencyObservation>().enumerate() {
        match record {
            Ok(observation) => {
                deduplicator.observe(observation);
            }
            Err(e) => log::warn!("Skipping dependency row {}: {}", line + 2, e),
        }
    }

    Ok(deduplicator.into_dependencies())
}

fn window_start(end: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    end - Duration::days(days.clamp(1, MAX_WINDOW_DAYS))
}

/// Runs one appliance's dependency export
pub struct DependencyExtractor<'a, T> {
    poller: &'a ExportPoller<'a, T>,
    site_id: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl<'a, T: Transport> DependencyExtractor<'a, T> {
    /// Export the `days` leading up to now, clamped to `1..=MAX_WINDOW_DAYS`
    pub fn new(poller: &'a ExportPoller<'a, T>, site_id: impl Into<String>, days: i64) -> Self {
        let end = Utc::now();
        Self {
            poller,
            site_id: site_id.into(),
            start: window_start(end, days),
            end,
        }
    }

    fn request_body(&self) -> serde_json::Value {
        json!({
            "startTime": self.start.to_rfc3339_opts(SecondsFormat::Secs, true),
            "endTime": self.end.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}

impl<T: Transport> Extractor for DependencyExtractor<'_, T> {
    type Item = Dependency;

    /// A failed export yields no rows rather than an error
    async fn extract(&self) -> Result<Vec<Self::Item>> {
        let job = self
            .poller
            .submit(&self.site_id, "exportDependencies", &self.request_body())
            .await?;

        let Some(payload) = self.poller.download(&job).await? else {
            log::warn!("Skipping dependencies of {}", self.site_id);
            return Ok(Vec::new());
        };

        let dependencies = deduplicate_csv(&payload)?;
        log::info!(
            "Extracted {} dependencies from {}",
            dependencies.len(),
            self.site_id
        );
        Ok(dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Time slot,Source server name,Source IP,Source application,Source process,Destination server name,Destination IP,Destination application,Destination process,Destination port\n";

    fn export_csv(rows: &[&str]) -> Vec<u8> {
        let mut content = HEADER.to_string();
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        content.into_bytes()
    }

    #[test]
    fn test_window_is_clamped() {
        let end = Utc::now();
        assert_eq!(window_start(end, 14), end - Duration::days(14));
        assert_eq!(window_start(end, -3), end - Duration::days(1));
        assert_eq!(window_start(end, i64::MAX), end - Duration::days(MAX_WINDOW_DAYS));
    }

    #[test]
    fn test_time_slots_collapse() {
        let payload = export_csv(&[
            "2024-01-01T00:00,web01,10.0.0.1,IIS,w3wp.exe,sql01,10.0.0.2,SQL Server,sqlservr.exe,1433",
            "2024-01-01T01:00,web01,10.0.0.1,IIS,w3wp.exe,sql01,10.0.0.2,SQL Server,sqlservr.exe,1433",
        ]);
        let dependencies = deduplicate_csv(&payload).unwrap();

        assert_eq!(dependencies.len(), 1);
        assert_eq!(dependencies[0].source_server_name, "web01");
        assert_eq!(dependencies[0].destination_port, Some(1433));
    }

    #[test]
    fn test_idle_process_never_emitted() {
        let payload = export_csv(&[
            "2024-01-01T00:00,web01,10.0.0.1,,System Idle Process,sql01,10.0.0.2,,,445",
            "2024-01-01T00:00,web01,10.0.0.1,,System Idle Process,dc01,10.0.0.3,,,53",
            "2024-01-01T00:00,web01,10.0.0.1,,svchost.exe,dc01,10.0.0.3,,,53",
        ]);
        let dependencies = deduplicate_csv(&payload).unwrap();

        assert_eq!(dependencies.len(), 1);
        assert!(
            dependencies
                .iter()
                .all(|d| d.source_process.as_deref() != Some(IDLE_PROCESS))
        );
    }

    #[test]
    fn test_empty_fields_are_none() {
        let payload = export_csv(&["2024-01-01T00:00,web01,10.0.0.1,,,sql01,10.0.0.2,,,"]);
        let dependencies = deduplicate_csv(&payload).unwrap();

        assert_eq!(dependencies[0].source_application, None);
        assert_eq!(dependencies[0].destination_port, None);
    }

    #[test]
    fn test_fields_are_not_concatenated() {
        // "AB" + "C" and "A" + "BC" must stay distinct
        let payload = export_csv(&[
            "t1,AB,C,,,dst,10.0.0.2,,,80",
            "t1,A,BC,,,dst,10.0.0.2,,,80",
        ]);
        let dependencies = deduplicate_csv(&payload).unwrap();
        assert_eq!(dependencies.len(), 2);
    }

    #[test]
    fn test_first_occurrence_order() {
        let payload = export_csv(&[
            "t1,b,1,,,x,2,,,80",
            "t1,a,1,,,x,2,,,80",
            "t2,b,1,,,x,2,,,80",
        ]);
        let names: Vec<_> = deduplicate_csv(&payload)
            .unwrap()
            .into_iter()
            .map(|d| d.source_server_name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_malformed_row_skipped() {
        let payload = export_csv(&[
            "t1,web01,10.0.0.1,,,sql01,10.0.0.2,,,not-a-port",
            "t1,web01,10.0.0.1,,,sql01,10.0.0.2,,,1433",
        ]);
        let dependencies = deduplicate_csv(&payload).unwrap();
        assert_eq!(dependencies.len(), 1);
    }

    #[test]
    fn test_deduplicator_counts() {
        let mut deduplicator = DependencyDeduplicator::new();
        let observation = DependencyObservation {
            time_slot: "t1".to_string(),
            source_server_name: "a".to_string(),
            source_ip: "1".to_string(),
            source_application: None,
            source_process: Some("app.exe".to_string()),
            destination_server_name: "b".to_string(),
            destination_ip: "2".to_string(),
            destination_application: None,
            destination_process: None,
            destination_port: Some(443),
        };
        assert!(deduplicator.observe(observation.clone()));
        assert!(!deduplicator.observe(DependencyObservation {
            time_slot: "t2".to_string(),
            ..observation
        }));
        assert_eq!(deduplicator.len(), 1);
    }
}
