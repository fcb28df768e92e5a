//! Binary entry point for the davcheck CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use davcheck::{
    ConfigError, DavError, DavLayout, DavResource, DavVersion, DispatchError, ExpectedFailures,
    GraphProvisioning, HarnessConfig, ReqwestTransport, ScenarioContext, ScenarioLogError,
    TransportError,
};

mod cli;

use cli::{Cli, DavPathCommand, ExpandCommand, ExpectedFailureCommand};

const DEFAULT_LOG_FILTER: &str = "davcheck=info";

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Dav(#[from] DavError),
    #[error(transparent)]
    Manifest(#[from] ScenarioLogError),
    #[error("failed to write output: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn dispatch(cli: Cli) -> Result<i32, CliError> {
    match cli {
        Cli::Expand(command) => expand(&command, io::stdout()).await,
        Cli::DavPath(command) => dav_path(&command, io::stdout()),
        Cli::ExpectedFailure(command) => expected_failure(&command, io::stdout()),
    }
}

async fn expand(command: &ExpandCommand, out: impl Write) -> Result<i32, CliError> {
    let config = HarnessConfig::load_without_cli_args()?;
    let transport = ReqwestTransport::from_config(&config)?;
    let provisioning = GraphProvisioning::new(
        transport.clone(),
        config.admin_username.clone(),
        config.admin_password.clone(),
    );
    let context = ScenarioContext::new(config, transport, provisioning)?;
    let text = context
        .substitute(&command.text, command.user.as_deref())
        .await?;
    write_line(out, &text)?;
    Ok(0)
}

fn dav_path(command: &DavPathCommand, out: impl Write) -> Result<i32, CliError> {
    let version = DavVersion::try_from(command.version)?;
    let resource: DavResource = command.resource.parse()?;
    let layout = DavLayout::new(version, !command.without_remote_php);
    let path = layout.path(command.id.as_deref(), resource)?;
    write_line(out, &path)?;
    Ok(0)
}

fn configured_manifest() -> Result<Option<String>, CliError> {
    Ok(HarnessConfig::load_without_cli_args()?.expected_failures_file)
}

fn expected_failure(command: &ExpectedFailureCommand, out: impl Write) -> Result<i32, CliError> {
    let manifest_path = command
        .manifest
        .clone()
        .map_or_else(configured_manifest, |path| Ok(Some(path)))?;
    let listed = manifest_path
        .map(|path| ExpectedFailures::load(Utf8Path::new(&path)))
        .transpose()?
        .is_some_and(|manifest| manifest.contains(&command.scenario));
    if listed {
        write_line(out, &format!("{} is an expected failure", command.scenario))?;
        Ok(0)
    } else {
        write_line(out, &format!("{} is not an expected failure", command.scenario))?;
        Ok(1)
    }
}

fn write_line(mut out: impl Write, line: &str) -> Result<(), CliError> {
    writeln!(out, "{line}").map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
