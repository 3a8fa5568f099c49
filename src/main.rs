use clap::{Parser, builder::styling};
use eyre::Result;
use migrate_extractor::{
    cli::{ExtractArgs, run_extraction},
    client::AuthType,
    migrate::dependencies::{DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS},
};
use owo_colors::OwoColorize;
use std::path::PathBuf;

// CLI Styling
const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::BrightWhite.on_default())
    .usage(styling::AnsiColor::BrightWhite.on_default())
    .literal(styling::AnsiColor::Green.on_default())
    .placeholder(styling::AnsiColor::Cyan.on_default());

/// Azure Migrate Data Extractor: pull discovered servers, software, databases, web apps and dependencies into CSV files
#[derive(Parser)]
#[command(name = "migrex", version, styles = STYLES)]
struct Cli {
    /// Microsoft Entra tenant to sign into
    #[arg(long)]
    tenant_id: String,

    /// Subscription holding the migrate project
    #[arg(long)]
    subscription_id: String,

    /// Resource group holding the migrate project
    #[arg(long)]
    resource_group_name: String,

    /// Name of the Azure Migrate project
    #[arg(long, visible_alias = "azure-migrate-project-name")]
    project_name: String,

    /// Directory to write the CSV files to
    #[arg(long)]
    output_path: PathBuf,

    /// Credential source; defaults to ARM_ACCESS_TOKEN when set, else the Azure CLI
    #[arg(long, value_enum)]
    auth: Option<AuthType>,

    /// Seconds between export status polls
    #[arg(long, default_value_t = 5)]
    poll_interval_secs: u64,

    /// Days of dependency data to export
    #[arg(
        long,
        default_value_t = DEFAULT_WINDOW_DAYS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_WINDOW_DAYS)
    )]
    dependency_days: i64,

    /// The dotenv file to source credentials from
    #[arg(short, long, default_value = ".env")]
    env: String,

    /// More verbose logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = dotenvy::from_filename(&cli.env)
        && !e.not_found()
    {
        return Err(e.into());
    }

    let log_level = match cli.debug {
        true => "debug",
        false => "info",
    };
    let env = env_logger::Env::default().filter_or("LOG_LEVEL", log_level);
    env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .init();

    log::info!("Azure Migrate data extractor");

    let output_path = cli.output_path.clone();
    let args = ExtractArgs {
        tenant_id: cli.tenant_id,
        subscription_id: cli.subscription_id,
        resource_group_name: cli.resource_group_name,
        project_name: cli.project_name,
        output_path: cli.output_path,
        auth: cli.auth,
        poll_interval_secs: cli.poll_interval_secs,
        dependency_days: cli.dependency_days,
    };

    tokio::select! {
        result = run_extraction(args) => {
            let summary = result?;
            log::info!(
                "✓ Extracted {} project(s), skipped {}",
                summary.projects.len().cyan(),
                summary.skipped
            );
        }
        _ = tokio::signal::ctrl_c() => {
            log::warn!(
                "Interrupted; files in {} are incomplete",
                output_path.display().bright_black()
            );
            std::process::exit(130);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 11] = [
        "migrex",
        "--tenant-id",
        "t",
        "--subscription-id",
        "s",
        "--resource-group-name",
        "rg",
        "--project-name",
        "p",
        "--output-path",
        "out",
    ];

    #[test]
    fn test_dependency_days_default() {
        let cli = Cli::try_parse_from(REQUIRED).unwrap();
        assert_eq!(cli.dependency_days, DEFAULT_WINDOW_DAYS);
    }

    #[test]
    fn test_dependency_days_out_of_range() {
        for days in ["0", "-5", "99999999999"] {
            let args = REQUIRED.iter().copied().chain(["--dependency-days", days]);
            assert!(Cli::try_parse_from(args).is_err(), "accepted {}", days);
        }
    }

    #[test]
    fn test_missing_required_argument() {
        assert!(Cli::try_parse_from(&REQUIRED[..9]).is_err());
    }
}
