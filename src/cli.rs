//! CLI helper functions

use crate::{
    client::{ArmClient, ArmEndpoint, Auth, AuthType, DEFAULT_ROOT},
    migrate::{ExtractionOptions, MigrateExtractor, RunSummary},
    storage::OutputDirectory,
};
use eyre::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Everything a run needs from the command line
#[derive(Debug, Clone)]
pub struct ExtractArgs {
    pub tenant_id: String,
    pub subscription_id: String,
    pub resource_group_name: String,
    pub project_name: String,
    pub output_path: PathBuf,
    pub auth: Option<AuthType>,
    pub poll_interval_secs: u64,
    pub dependency_days: i64,
}

/// Load the management endpoint from the environment
///
/// Expected environment variables:
/// - ARM_ENDPOINT: management root (optional, defaults to the public cloud)
pub fn load_endpoint() -> Result<ArmEndpoint> {
    match std::env::var("ARM_ENDPOINT") {
        Ok(root) => ArmEndpoint::parse(&root).with_context(|| format!("Invalid ARM_ENDPOINT: {}", root)),
        Err(_) => ArmEndpoint::parse(DEFAULT_ROOT),
    }
}

/// Pick the credential source
///
/// Expected environment variables:
/// - ARM_ACCESS_TOKEN: bearer token (optional, otherwise the Azure CLI is asked)
pub fn load_auth(r#type: Option<&AuthType>, tenant_id: &str) -> Result<Auth> {
    let token = std::env::var("ARM_ACCESS_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty());
    Auth::new(r#type, token, tenant_id)
}

/// Build an authenticated management client
pub async fn load_arm_client(auth: &Auth) -> Result<ArmClient> {
    log::info!("Signing into Azure ({})", auth);
    let token = auth
        .access_token()
        .await
        .with_context(|| "Failed to acquire an access token")?;
    ArmClient::try_new(&token).context("Failed to create ARM client")
}

/// Run a full extraction into `args.output_path`
///
/// Files are stamped with today's local date.
pub async fn run_extraction(args: ExtractArgs) -> Result<RunSummary> {
    let endpoint = load_endpoint()?;
    log::debug!("Using management endpoint {}", endpoint);

    let auth = load_auth(args.auth.as_ref(), &args.tenant_id)?;
    let client = load_arm_client(&auth).await?;

    let output = OutputDirectory::create(&args.output_path, chrono::Local::now().date_naive())?;

    let options = ExtractionOptions {
        poll_interval: Duration::from_secs(args.poll_interval_secs),
        dependency_days: args.dependency_days,
        ..ExtractionOptions::new(
            args.subscription_id,
            args.resource_group_name,
            args.project_name,
        )
    };

    MigrateExtractor::new(client, endpoint, options)
        .run(&output)
        .await
}
