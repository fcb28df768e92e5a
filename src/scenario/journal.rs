//! Per-scenario request log, copied to `failed.log` for unexpected failures.

use std::io::{self, Write as _};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::{Dir, OpenOptions};
use tracing::{debug, info};

use crate::request::{REQUEST_ID_HEADER, TestRequest};
use crate::response::HttpResponse;

use super::{ExpectedFailures, ScenarioKind, ScenarioLogError};

/// Log of the running scenario.
pub const SCENARIO_LOG: &str = "scenario.log";
/// Accumulated logs of unexpectedly failed scenarios.
pub const FAILED_LOG: &str = "failed.log";

/// Writer for `scenario.log` and `failed.log` under one directory.
#[derive(Debug)]
pub struct ScenarioLog {
    dir: Dir,
    path: Utf8PathBuf,
    scenario_ref: Option<String>,
}

impl ScenarioLog {
    /// Opens `log_dir`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioLogError::Io`] when the directory cannot be created
    /// or opened.
    pub fn open(log_dir: &Utf8Path) -> Result<Self, ScenarioLogError> {
        let io_error = |err: io::Error| ScenarioLogError::Io {
            path: log_dir.to_string(),
            message: err.to_string(),
        };
        Dir::create_ambient_dir_all(log_dir, ambient_authority()).map_err(io_error)?;
        let dir = Dir::open_ambient_dir(log_dir, ambient_authority()).map_err(io_error)?;
        Ok(Self {
            dir,
            path: log_dir.to_owned(),
            scenario_ref: None,
        })
    }

    /// Directory holding the logs.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Reference of the scenario being logged.
    #[must_use]
    pub fn scenario_ref(&self) -> Option<&str> {
        self.scenario_ref.as_deref()
    }

    fn io_error(&self, file: &str, err: &io::Error) -> ScenarioLogError {
        ScenarioLogError::Io {
            path: self.path.join(file).to_string(),
            message: err.to_string(),
        }
    }

    fn append(&self, file: &str, text: &str) -> Result<(), ScenarioLogError> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        let mut handle = self
            .dir
            .open_with(file, &options)
            .map_err(|err| self.io_error(file, &err))?;
        handle
            .write_all(text.as_bytes())
            .map_err(|err| self.io_error(file, &err))
    }

    fn ensure_started(&self) -> Result<(), ScenarioLogError> {
        if self.scenario_ref.is_none() {
            return Err(ScenarioLogError::NotStarted);
        }
        Ok(())
    }

    /// Starts a new scenario, replacing the previous `scenario.log`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioLogError::Io`] when the log cannot be written.
    pub fn begin(
        &mut self,
        kind: ScenarioKind,
        title: &str,
        scenario_ref: &str,
    ) -> Result<(), ScenarioLogError> {
        self.dir
            .write(SCENARIO_LOG, format!("## {kind}: {title} ({scenario_ref})\n"))
            .map_err(|err| self.io_error(SCENARIO_LOG, &err))?;
        self.scenario_ref = Some(scenario_ref.to_owned());
        debug!(scenario = scenario_ref, "scenario log started");
        Ok(())
    }

    /// Appends a step header.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioLogError::NotStarted`] before [`Self::begin`] and
    /// [`ScenarioLogError::Io`] when the log cannot be written.
    pub fn step(&self, keyword: &str, text: &str) -> Result<(), ScenarioLogError> {
        self.ensure_started()?;
        self.append(SCENARIO_LOG, &format!("\t### {} {text}\n", keyword.trim()))
    }

    /// Appends a summary of one request and its response.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioLogError::NotStarted`] before [`Self::begin`] and
    /// [`ScenarioLogError::Io`] when the log cannot be written.
    pub fn record(
        &self,
        request: &TestRequest,
        response: &HttpResponse,
    ) -> Result<(), ScenarioLogError> {
        self.ensure_started()?;
        let request_id = request
            .header(REQUEST_ID_HEADER)
            .map(|id| format!(" [{id}]"))
            .unwrap_or_default();
        let mut entry = format!(
            "\t\t>>> {} {}{request_id}\n\t\t<<< {}\n",
            request.method, request.url, response.status
        );
        let body = response.text();
        if !body.trim().is_empty() {
            entry.push_str(body.trim_end());
            entry.push('\n');
        }
        self.append(SCENARIO_LOG, &entry)
    }

    /// Ends the scenario. When it failed and is not listed in `expected`,
    /// its log is appended to `failed.log` followed by two blank lines.
    /// Returns whether the log was kept.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioLogError::NotStarted`] before [`Self::begin`] and
    /// [`ScenarioLogError::Io`] when a log cannot be read or written.
    pub fn finish(
        &mut self,
        failed: bool,
        expected: &ExpectedFailures,
    ) -> Result<bool, ScenarioLogError> {
        let scenario_ref = self
            .scenario_ref
            .take()
            .ok_or(ScenarioLogError::NotStarted)?;
        if !failed || expected.contains(&scenario_ref) {
            return Ok(false);
        }
        let logs = self
            .dir
            .read_to_string(SCENARIO_LOG)
            .map_err(|err| self.io_error(SCENARIO_LOG, &err))?;
        self.append(FAILED_LOG, &format!("{}\n\n\n", logs.trim_end_matches('\n')))?;
        info!(scenario = %scenario_ref, "kept log of failed scenario");
        Ok(true)
    }
}
