//! The HTTP seam between the extraction engine and the management API

use eyre::{Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

/// Response to an accepted asynchronous operation
#[derive(Debug, Clone, Default)]
pub struct Accepted {
    /// Status-tracking URL from the `Azure-AsyncOperation` header
    pub async_operation: Option<String>,
}

/// Authenticated access to the management API.
///
/// Implementors own credentials and any retry policy. Every method fails on
/// network errors and non-success status codes; callers never inspect raw
/// responses.
pub trait Transport: Send + Sync {
    /// GET an absolute URL and parse the body as JSON
    fn get_json(&self, url: &str) -> impl Future<Output = Result<Value>> + Send;

    /// POST a JSON body to an absolute URL that starts an asynchronous operation
    fn post_json(&self, url: &str, body: &Value) -> impl Future<Output = Result<Accepted>> + Send;

    /// Download a pre-signed URL without sending credentials
    fn download(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// GET a URL and decode it into a typed resource.
pub async fn fetch<T, R>(transport: &T, url: &str) -> Result<R>
where
    T: Transport,
    R: DeserializeOwned,
{
    let value = transport.get_json(url).await?;
    serde_json::from_value(value).with_context(|| format!("Unexpected response shape from {}", url))
}
