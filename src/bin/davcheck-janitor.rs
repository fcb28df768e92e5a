//! Out-of-band fixture janitor for davcheck.
//!
//! This binary deletes the named users and groups from the server under
//! test, as the configured administrator, and then verifies none remain.
//! It is meant for cleaning up after interrupted acceptance runs.

use clap::Parser;
use davcheck::{GraphProvisioning, HarnessConfig, Janitor, ReqwestTransport};
use std::io::Write as _;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "davcheck-janitor",
    about = "Delete leftover acceptance-test users and groups"
)]
struct Cli {
    /// Server to sweep; defaults to the configured base URL.
    #[arg(long, env = "DAVCHECK_JANITOR_BASE_URL")]
    base_url: Option<String>,
    /// User to delete. Repeat for several users.
    #[arg(long = "user", value_name = "USER")]
    users: Vec<String>,
    /// Group (name or id) to delete. Repeat for several groups.
    #[arg(long = "group", value_name = "GROUP")]
    groups: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("davcheck=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = HarnessConfig::load_without_cli_args().map_err(|err| err.to_string())?;
    let transport = ReqwestTransport::from_config(&config).map_err(|err| err.to_string())?;
    let provisioning = GraphProvisioning::new(
        transport,
        config.admin_username.clone(),
        config.admin_password.clone(),
    );
    let base_url = cli.base_url.unwrap_or(config.base_url);
    let janitor = Janitor::new(provisioning, base_url.trim_end_matches('/'));
    let summary = janitor
        .sweep(&cli.users, &cli.groups)
        .await
        .map_err(|err| err.to_string())?;
    writeln!(
        std::io::stdout(),
        "janitor sweep complete: deleted_users={}, deleted_groups={}",
        summary.deleted_users,
        summary.deleted_groups
    )
    .map_err(|err| err.to_string())?;
    Ok(())
}
