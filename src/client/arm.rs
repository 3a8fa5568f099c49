//! Azure Resource Manager client
//!
//! Provides `ArmClient`, the HTTPS implementation of [`Transport`].

use super::{Accepted, Transport};
use eyre::{Context, Result, eyre};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;

/// Header carrying the status URL of a long-running operation
const ASYNC_OPERATION_HEADER: &str = "Azure-AsyncOperation";

/// Management API client holding a bearer token.
///
/// Two inner clients are kept: one sends the bearer token on every request,
/// the other is used for pre-signed download URLs, which reject requests that
/// carry an `Authorization` header.
///
/// # Example
/// ```no_run
/// use migrate_extractor::client::{ArmClient, Transport};
///
/// # async fn example() -> eyre::Result<()> {
/// let client = ArmClient::try_new("token")?;
/// let site = client
///     .get_json("https://management.azure.com/subscriptions/s/resourceGroups/r?api-version=2023-06-06")
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ArmClient {
    client: Client,
    download: Client,
}

impl ArmClient {
    /// Create a client that authenticates with the given bearer token.
    ///
    /// # Errors
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn try_new(token: &str) -> Result<Self> {
        let user_agent = format!("migrex/{}", env!("CARGO_PKG_VERSION"));

        let mut headers = HeaderMap::new();
        let mut bearer: HeaderValue = format!("Bearer {}", token)
            .parse()
            .map_err(|_| eyre!("Access token contains characters not allowed in a header"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(USER_AGENT, user_agent.parse()?);
        let client = Client::builder().default_headers(headers).build()?;

        let download = Client::builder().user_agent(user_agent).build()?;

        Ok(Self { client, download })
    }

    /// Send a request and fail on non-success status codes.
    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| eyre!("Failed to send request to {}: {}", url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            eyre::bail!("Request to {} failed ({}): {}", url, status, body);
        }

        Ok(response)
    }
}

impl Transport for ArmClient {
    async fn get_json(&self, url: &str) -> Result<Value> {
        log::trace!("GET {}", url);
        let response = self.send(self.client.get(url), url).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Accepted> {
        log::trace!("POST {}", url);
        let response = self.send(self.client.post(url).json(body), url).await?;
        let async_operation = response
            .headers()
            .get(ASYNC_OPERATION_HEADER)
            .map(|value| value.to_str().map(str::to_string))
            .transpose()
            .with_context(|| format!("Malformed {} header", ASYNC_OPERATION_HEADER))?;

        Ok(Accepted { async_operation })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        // Pre-signed URLs carry their own token in the query string
        let response = self.send(self.download.get(url), "<pre-signed url>").await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| "Failed to read download body")?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        assert!(ArmClient::try_new("eyJ0eXAiOiJKV1Qi.abc.def").is_ok());
    }

    #[test]
    fn test_rejects_token_with_newline() {
        let result = ArmClient::try_new("bad\ntoken");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not allowed in a header"));
    }
}
