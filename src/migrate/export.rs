//! Asynchronous export jobs
//!
//! Large extracts are produced out-of-band: a POST starts the job, the
//! `Azure-AsyncOperation` URL reports its progress, and a succeeded job
//! points at a short-lived pre-signed download URL.

use super::resources::{ExportResult, OperationStatus};
use crate::client::{ArmEndpoint, Transport, fetch};

use eyre::{Context, Result, eyre};
use serde_json::Value;
use std::time::Duration;

/// Default delay between two status polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

const RUNNING: &str = "Running";
const SUCCEEDED: &str = "Succeeded";

/// A finished (non-`Running`) export job
#[derive(Debug, Clone)]
pub struct ExportJob {
    pub status: String,
    pub envelope: OperationStatus,
    /// Number of status requests issued while waiting
    pub polls: usize,
}

impl ExportJob {
    /// Only a succeeded job has a payload
    pub fn succeeded(&self) -> bool {
        self.status == SUCCEEDED
    }

    /// Decode the pre-signed download URL from `properties.result`
    pub fn download_uri(&self) -> Result<String> {
        let result = self
            .envelope
            .properties
            .as_ref()
            .and_then(|p| p.result.as_deref())
            .ok_or_else(|| eyre!("Export succeeded without a result"))?;
        let result: ExportResult =
            serde_json::from_str(result).with_context(|| "Failed to parse export result")?;
        Ok(result.sas_uri)
    }
}

/// Submits export operations and waits for them to finish
pub struct ExportPoller<'a, T> {
    transport: &'a T,
    endpoint: &'a ArmEndpoint,
    interval: Duration,
}

impl<'a, T: Transport> ExportPoller<'a, T> {
    pub fn new(transport: &'a T, endpoint: &'a ArmEndpoint, interval: Duration) -> Self {
        Self {
            transport,
            endpoint,
            interval,
        }
    }

    /// Start `operation` on `resource_id` and poll until it leaves `Running`.
    ///
    /// Any terminal status is returned as-is; deciding what a failure means is
    /// up to the caller.
    ///
    /// # Errors
    /// Returns an error if the request fails, the response carries no
    /// status URL, or a status response cannot be decoded.
    pub async fn submit(&self, resource_id: &str, operation: &str, body: &Value) -> Result<ExportJob> {
        let url = self.endpoint.child(resource_id, operation);
        log::info!("Requesting {} from {}", operation, resource_id);

        let accepted = self
            .transport
            .post_json(&url, body)
            .await
            .with_context(|| format!("Failed to start {}", operation))?;
        let status_url = accepted
            .async_operation
            .ok_or_else(|| eyre!("{} response carried no Azure-AsyncOperation header", operation))?;

        let mut polls = 0;
        loop {
            tokio::time::sleep(self.interval).await;
            let envelope: OperationStatus = fetch(self.transport, &status_url)
                .await
                .with_context(|| format!("Failed to poll {} status", operation))?;
            polls += 1;

            if envelope.status != RUNNING {
                log::debug!("{} finished with status {}", operation, envelope.status);
                return Ok(ExportJob {
                    status: envelope.status.clone(),
                    envelope,
                    polls,
                });
            }
            log::info!("Waiting for {} extract", operation);
        }
    }

    /// Download the payload of a succeeded job.
    ///
    /// Returns `None`, after logging, when the job did not succeed or its
    /// result carries no usable download URL.
    ///
    /// # Errors
    /// Returns an error if the download itself fails.
    pub async fn download(&self, job: &ExportJob) -> Result<Option<Vec<u8>>> {
        if !job.succeeded() {
            match &job.envelope.error {
                Some(error) => log::warn!("Export ended with status {}: {}", job.status, error),
                None => log::warn!("Export ended with status {}", job.status),
            }
            return Ok(None);
        }

        let uri = match job.download_uri() {
            Ok(uri) => uri,
            Err(e) => {
                log::warn!("Export succeeded without a usable result: {:#}", e);
                return Ok(None);
            }
        };
        let payload = self
            .transport
            .download(&uri)
            .await
            .with_context(|| "Failed to download export")?;
        log::info!("Downloaded extract ({} bytes)", payload.len());
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Accepted, DEFAULT_ROOT};
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Scripted {
        statuses: Mutex<VecDeque<Value>>,
        status_gets: Mutex<usize>,
        header: Option<String>,
    }

    impl Scripted {
        fn new(statuses: Vec<Value>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                status_gets: Mutex::new(0),
                header: Some("https://status/op-1".to_string()),
            }
        }
    }

    impl Transport for Scripted {
        async fn get_json(&self, url: &str) -> Result<Value> {
            assert_eq!(url, "https://status/op-1");
            *self.status_gets.lock().unwrap() += 1;
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| eyre!("no more statuses"))
        }

        async fn post_json(&self, url: &str, _body: &Value) -> Result<Accepted> {
            assert!(url.contains("/sites/a/exportDependencies?api-version="));
            Ok(Accepted {
                async_operation: self.header.clone(),
            })
        }

        async fn download(&self, url: &str) -> Result<Vec<u8>> {
            assert_eq!(url, "https://blob/extract.csv?sig=x");
            Ok(b"payload".to_vec())
        }
    }

    fn endpoint() -> ArmEndpoint {
        ArmEndpoint::parse(DEFAULT_ROOT).unwrap()
    }

    fn succeeded() -> Value {
        json!({
            "status": "Succeeded",
            "properties": { "result": "{\"SASUri\":\"https://blob/extract.csv?sig=x\"}" }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_terminal() {
        let transport = Scripted::new(vec![
            json!({ "status": "Running" }),
            json!({ "status": "Running" }),
            succeeded(),
        ]);
        let endpoint = endpoint();
        let poller = ExportPoller::new(&transport, &endpoint, DEFAULT_POLL_INTERVAL);

        let started = tokio::time::Instant::now();
        let job = poller
            .submit("/sites/a", "exportDependencies", &json!({}))
            .await
            .unwrap();

        assert_eq!(job.status, "Succeeded");
        assert_eq!(job.polls, 3);
        assert_eq!(*transport.status_gets.lock().unwrap(), 3);
        assert!(started.elapsed() >= Duration::from_secs(15));
        assert_eq!(job.download_uri().unwrap(), "https://blob/extract.csv?sig=x");

        let payload = poller.download(&job).await.unwrap();
        assert_eq!(payload, Some(b"payload".to_vec()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_returns_immediately() {
        let transport = Scripted::new(vec![
            json!({ "status": "Failed", "error": { "code": "Boom", "message": "no data" } }),
            succeeded(),
        ]);
        let endpoint = endpoint();
        let poller = ExportPoller::new(&transport, &endpoint, DEFAULT_POLL_INTERVAL);

        let job = poller
            .submit("/sites/a", "exportDependencies", &json!({}))
            .await
            .unwrap();

        assert_eq!(job.status, "Failed");
        assert!(!job.succeeded());
        assert_eq!(*transport.status_gets.lock().unwrap(), 1);
        assert_eq!(poller.download(&job).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_status_header() {
        let mut transport = Scripted::new(vec![succeeded()]);
        transport.header = None;
        let endpoint = endpoint();
        let poller = ExportPoller::new(&transport, &endpoint, DEFAULT_POLL_INTERVAL);

        let result = poller
            .submit("/sites/a", "exportDependencies", &json!({}))
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Azure-AsyncOperation"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeded_without_result_has_no_payload() {
        let transport = Scripted::new(vec![json!({ "status": "Succeeded", "properties": {} })]);
        let endpoint = endpoint();
        let poller = ExportPoller::new(&transport, &endpoint, DEFAULT_POLL_INTERVAL);

        let job = poller
            .submit("/sites/a", "exportDependencies", &json!({}))
            .await
            .unwrap();

        assert!(job.succeeded());
        assert_eq!(poller.download(&job).await.unwrap(), None);
    }

    #[test]
    fn test_succeeded_without_result() {
        let job = ExportJob {
            status: "Succeeded".to_string(),
            envelope: serde_json::from_value(json!({ "status": "Succeeded" })).unwrap(),
            polls: 1,
        };
        assert!(job.download_uri().is_err());
    }
}
