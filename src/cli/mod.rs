//! Command-line interface definitions for the `davcheck` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `davcheck` binary.
#[derive(Debug, Parser)]
#[command(
    name = "davcheck",
    about = "Inspect how acceptance steps expand, address and classify requests",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Expand placeholders in a step argument.
    #[command(name = "expand", about = "Expand placeholders in a step argument")]
    Expand(ExpandCommand),
    /// Print the DAV path for a layout and resource.
    #[command(name = "dav-path", about = "Print the DAV path for a layout and resource")]
    DavPath(DavPathCommand),
    /// Check whether a scenario is listed as an expected failure.
    #[command(
        name = "expected-failure",
        about = "Exit 0 when a scenario is listed as an expected failure"
    )]
    ExpectedFailure(ExpectedFailureCommand),
}

/// Arguments for `davcheck expand`.
#[derive(Debug, Parser)]
pub(crate) struct ExpandCommand {
    /// Text containing `%placeholder%` tokens.
    #[arg(required = true)]
    pub(crate) text: String,
    /// Symbolic user whose values fill user-scoped tokens.
    #[arg(long, value_name = "USER")]
    pub(crate) user: Option<String>,
}

/// Arguments for `davcheck dav-path`.
#[derive(Debug, Parser)]
pub(crate) struct DavPathCommand {
    /// Layout selector: 1 old, 2 new, 3 spaces.
    #[arg(long, value_name = "N")]
    pub(crate) version: u8,
    /// Resource kind (`files`, `public-files`, `trash-bin`, `versions`,
    /// `archive`, `comments`, `root`).
    #[arg(long, value_name = "RESOURCE", default_value = "files")]
    pub(crate) resource: String,
    /// User, space, token or file id completing the path.
    #[arg(long, value_name = "ID")]
    pub(crate) id: Option<String>,
    /// Omit the `remote.php/` prefix.
    #[arg(long)]
    pub(crate) without_remote_php: bool,
}

/// Arguments for `davcheck expected-failure`.
#[derive(Debug, Parser)]
pub(crate) struct ExpectedFailureCommand {
    /// Scenario line reference, `suite/file.feature:line`.
    #[arg(required = true)]
    pub(crate) scenario: String,
    /// Manifest to consult instead of the configured one.
    #[arg(long, value_name = "PATH")]
    pub(crate) manifest: Option<String>,
}
