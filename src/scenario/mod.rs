//! Scenario bookkeeping outside the HTTP exchange: line references for
//! request ids, the expected-failures manifest, and the on-disk scenario
//! log that is kept only for unexpected failures.

use std::fmt;

use thiserror::Error;

mod expected;
mod journal;

pub use expected::ExpectedFailures;
pub use journal::{FAILED_LOG, SCENARIO_LOG, ScenarioLog};

/// Reference to a scenario: the last two segments of the feature path and
/// the scenario's line, for example `apiGraph/createUser.feature:24`.
#[must_use]
pub fn scenario_line_ref(feature_path: &str, line: u32) -> String {
    let mut tail: Vec<&str> = feature_path.rsplit('/').take(2).collect();
    tail.reverse();
    format!("{}:{line}", tail.join("/"))
}

/// Reference to a step inside a scenario: `{scenario}-{step_line}`.
#[must_use]
pub fn step_line_ref(scenario_ref: &str, step_line: u32) -> String {
    format!("{scenario_ref}-{step_line}")
}

/// Gherkin node kind printed in the scenario log header.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ScenarioKind {
    /// A plain scenario.
    #[default]
    Scenario,
    /// One example row of a scenario outline.
    Outline,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scenario => "Scenario",
            Self::Outline => "Scenario Outline",
        })
    }
}

/// Errors raised while reading manifests or writing logs.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ScenarioLogError {
    /// Raised when a log or manifest file cannot be accessed.
    #[error("failed to access {path}: {message}")]
    Io {
        /// File or directory involved.
        path: String,
        /// Underlying error.
        message: String,
    },
    /// Raised when a step or record is written before `begin`.
    #[error("no scenario has been started")]
    NotStarted,
}
