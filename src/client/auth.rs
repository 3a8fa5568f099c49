use clap::ValueEnum;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::str::FromStr;

/// Resource the Azure CLI is asked to mint tokens for
const ARM_RESOURCE: &str = "https://management.azure.com/";

pub enum Auth {
    /// Use a pre-acquired bearer token
    Bearer(String),
    /// Ask the Azure CLI for a token scoped to the given tenant
    AzureCli { tenant_id: String },
}

impl Auth {
    /// Pick the credential source.
    ///
    /// With no explicit type, a supplied token wins and the Azure CLI is the fallback.
    pub fn new(r#type: Option<&AuthType>, token: Option<String>, tenant_id: &str) -> Result<Self> {
        match (r#type, token) {
            (Some(AuthType::Token) | None, Some(token)) => Ok(Self::Bearer(token)),
            (Some(AuthType::Token), None) => Err(eyre!(
                "Token authentication requested but ARM_ACCESS_TOKEN is not set"
            )),
            (Some(AuthType::AzureCli) | None, _) => Ok(Self::AzureCli {
                tenant_id: tenant_id.to_string(),
            }),
        }
    }

    /// Resolve the bearer token sent with every management request.
    pub async fn access_token(&self) -> Result<String> {
        match self {
            Self::Bearer(token) => Ok(token.clone()),
            Self::AzureCli { tenant_id } => azure_cli_token(tenant_id).await,
        }
    }
}

impl std::fmt::Display for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bearer(_) => write!(f, "Bearer"),
            Self::AzureCli { tenant_id } => write!(f, "Azure CLI (tenant {})", tenant_id),
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum AuthType {
    Token,
    AzureCli,
}

impl FromStr for AuthType {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "azure-cli" | "az" => Ok(Self::AzureCli),
            _ => Err(()),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
}

async fn azure_cli_token(tenant_id: &str) -> Result<String> {
    log::debug!("Requesting access token from the Azure CLI for tenant {}", tenant_id);

    let output = tokio::process::Command::new("az")
        .args([
            "account",
            "get-access-token",
            "--resource",
            ARM_RESOURCE,
            "--tenant",
            tenant_id,
            "--output",
            "json",
        ])
        .output()
        .await
        .with_context(|| "Failed to run the Azure CLI, is `az` installed?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        eyre::bail!("Azure CLI token request failed ({}): {}", output.status, stderr.trim());
    }

    let token: CliToken = serde_json::from_slice(&output.stdout)
        .with_context(|| "Failed to parse Azure CLI token response")?;
    Ok(token.access_token)
}
