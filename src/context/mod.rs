//! Per-scenario state. A [`ScenarioContext`] is created for one scenario,
//! handed by `&mut` to every step, and torn down with
//! [`ScenarioContext::after_scenario`]. It owns the registries, the last
//! response and the scenario log, and composes the focused services:
//! credentials, placeholders, transport and provisioning.

use std::env;

use camino::Utf8Path;

use thiserror::Error;
use tracing::{info, warn};

use crate::assertions::{self, AssertionError, assert_ocs_status, assert_status};
use crate::config::{ConfigError, HarnessConfig};
use crate::credentials::{CredentialError, CredentialResolver};
use crate::dav::{DavError, DavLayout};
use crate::fixtures::{CleanupSummary, FixtureError, Fixtures, ServerTarget, ServerUrls, cleanup};
use crate::placeholder::{
    PlaceholderError, PlaceholderRegistry, ResolveScope, Transform, UserScope,
};
use crate::poll::{PollError, PollPolicy};
use crate::provisioning::Provisioning;
use crate::request::{REQUEST_ID_HEADER, RequestError, TestRequest};
use crate::response::{HttpResponse, ResponseRecorder};
use crate::scenario::{
    ExpectedFailures, ScenarioKind, ScenarioLog, ScenarioLogError, step_line_ref,
};
use crate::transport::{RetryPolicy, Transport, TransportError, send_with_retry};

mod users;
mod webdav;

/// Status of a successful creation.
pub const STATUS_CREATED: u16 = 201;
/// Status of a successful deletion.
pub const STATUS_NO_CONTENT: u16 = 204;

const DEFAULT_HOSTNAME: &str = "localhost";

/// Errors surfaced by scenario steps.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum DispatchError {
    /// Configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The credential manifest could not be loaded.
    #[error(transparent)]
    Credential(#[from] CredentialError),
    /// A placeholder could not be resolved.
    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),
    /// A DAV path or body could not be produced.
    #[error(transparent)]
    Dav(#[from] DavError),
    /// A request could not be built.
    #[error(transparent)]
    Request(#[from] RequestError),
    /// A request could not be sent.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A `Then` step's expectation did not hold.
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    /// A `Given` step could not establish its precondition.
    #[error("setup step failed: {0}")]
    Setup(AssertionError),
    /// Fixture bookkeeping failed.
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    /// A polled condition never held.
    #[error(transparent)]
    Poll(#[from] PollError),
    /// The scenario log could not be written.
    #[error(transparent)]
    ScenarioLog(#[from] ScenarioLogError),
    /// Some requests of a table or batch failed; the others completed.
    #[error("{} request(s) failed: {}", failures.len(), failures.join("; "))]
    Batch {
        /// One message per failed request.
        failures: Vec<String>,
    },
}

/// Everything one scenario needs, passed by `&mut` into each step.
pub struct ScenarioContext<T, P> {
    config: HarnessConfig,
    credentials: CredentialResolver,
    placeholders: PlaceholderRegistry,
    transport: T,
    provisioning: P,
    recorder: ResponseRecorder,
    fixtures: Fixtures,
    urls: ServerUrls,
    target: ServerTarget,
    layout: DavLayout,
    retry: RetryPolicy,
    poll: PollPolicy,
    scenario_ref: Option<String>,
    step_ref: Option<String>,
    hostname: String,
    log: Option<ScenarioLog>,
    expected_failures: ExpectedFailures,
}

impl<T: Transport, P: Provisioning> ScenarioContext<T, P> {
    /// Validates `config`, loads the credential manifest and creates the
    /// context.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Config`] for invalid configuration and
    /// [`DispatchError::Credential`] when a configured manifest cannot be
    /// loaded.
    pub fn new(config: HarnessConfig, transport: T, provisioning: P) -> Result<Self, DispatchError> {
        config.validate()?;
        let credentials = CredentialResolver::from_config(&config)?;
        Self::with_credentials(config, credentials, transport, provisioning)
    }

    /// Creates a context around an already built credential resolver.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Config`] when the DAV path version is out of
    /// range.
    pub fn with_credentials(
        config: HarnessConfig,
        credentials: CredentialResolver,
        transport: T,
        provisioning: P,
    ) -> Result<Self, DispatchError> {
        let layout = DavLayout::new(config.dav_version()?, config.with_remote_php);
        let urls = ServerUrls::new(
            config.base_url.trim_end_matches('/'),
            config.remote_url().trim_end_matches('/'),
        );
        let hostname = env::var("HOSTNAME").unwrap_or_else(|_| DEFAULT_HOSTNAME.to_owned());
        Ok(Self {
            config,
            credentials,
            placeholders: PlaceholderRegistry::standard(),
            transport,
            provisioning,
            recorder: ResponseRecorder::new(),
            fixtures: Fixtures::new(),
            urls,
            target: ServerTarget::Local,
            layout,
            retry: RetryPolicy::standard(),
            poll: PollPolicy::standard(),
            scenario_ref: None,
            step_ref: None,
            hostname,
            log: None,
            expected_failures: ExpectedFailures::none(),
        })
    }

    /// Replaces the resend policy for transient statuses.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Replaces the polling policy.
    #[must_use]
    pub const fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll = policy;
        self
    }

    /// Sets the host name expected in `%request_id_pattern%`.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Harness configuration.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Credential resolver.
    #[must_use]
    pub const fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    /// Recorded responses.
    #[must_use]
    pub const fn recorder(&self) -> &ResponseRecorder {
        &self.recorder
    }

    /// Recorded responses, mutably, for assertions that clear accumulators.
    pub const fn recorder_mut(&mut self) -> &mut ResponseRecorder {
        &mut self.recorder
    }

    /// Scenario fixtures.
    #[must_use]
    pub const fn fixtures(&self) -> &Fixtures {
        &self.fixtures
    }

    /// Scenario fixtures, mutably.
    pub const fn fixtures_mut(&mut self) -> &mut Fixtures {
        &mut self.fixtures
    }

    /// The transport requests are sent through.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Active DAV layout.
    #[must_use]
    pub const fn layout(&self) -> DavLayout {
        self.layout
    }

    /// Server steps currently talk to.
    #[must_use]
    pub const fn target(&self) -> ServerTarget {
        self.target
    }

    /// Base URL of the active server.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.urls.get(self.target)
    }

    /// Switches the active server and returns the previous one.
    pub fn using_server(&mut self, target: ServerTarget) -> ServerTarget {
        let previous = self.target;
        self.target = target;
        info!(server = %target, url = %self.base_url(), "switched active server");
        previous
    }

    /// Starts a scenario identified by `scenario_ref`
    /// (`suite/file.feature:line`) and rewrites `scenario.log` under the
    /// configured log directory. The log directory and the expected-failures
    /// manifest are opened by the first scenario.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ScenarioLog`] when the log cannot be written
    /// or a configured manifest cannot be read.
    pub fn begin_scenario(
        &mut self,
        kind: ScenarioKind,
        title: &str,
        scenario_ref: &str,
    ) -> Result<(), DispatchError> {
        self.scenario_ref = Some(scenario_ref.to_owned());
        self.step_ref = None;
        if self.log.is_none() {
            if let Some(path) = self.config.expected_failures_file.as_deref() {
                self.expected_failures = ExpectedFailures::load(Utf8Path::new(path))?;
            }
            self.log = Some(ScenarioLog::open(Utf8Path::new(&self.config.log_dir))?);
        }
        if let Some(log) = self.log.as_mut() {
            log.begin(kind, title, scenario_ref)?;
        }
        Ok(())
    }

    /// Records the line of the step about to run and writes its header to
    /// the scenario log.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ScenarioLog`] when the log cannot be written.
    pub fn begin_step(
        &mut self,
        step_line: u32,
        keyword: &str,
        text: &str,
    ) -> Result<(), DispatchError> {
        self.step_ref = self
            .scenario_ref
            .as_deref()
            .map(|scenario| step_line_ref(scenario, step_line));
        if let Some(log) = self.active_log() {
            log.step(keyword, text)?;
        }
        Ok(())
    }

    fn active_log(&self) -> Option<&ScenarioLog> {
        self.log
            .as_ref()
            .filter(|log| log.scenario_ref().is_some())
    }

    /// Reference sent in `X-Request-ID`, when line references are enabled:
    /// the step reference, or the scenario reference before any step.
    #[must_use]
    pub fn line_ref(&self) -> Option<&str> {
        if !self.config.send_scenario_line_references {
            return None;
        }
        self.step_ref.as_deref().or(self.scenario_ref.as_deref())
    }

    /// Password `user` authenticates with.
    #[must_use]
    pub fn password_for(&self, user: &str) -> String {
        self.credentials.password_for_user(user, &self.fixtures.users)
    }

    /// Values of the user-scoped placeholders for `user`.
    #[must_use]
    pub fn user_scope(&self, user: &str) -> UserScope {
        let username = self.credentials.username(user);
        let record = self.fixtures.users.get(&username);
        UserScope {
            display_name: record
                .and_then(|entry| entry.display_name.clone())
                .unwrap_or_else(|| self.credentials.default_display_name(user)),
            password: self.password_for(user),
            email: record
                .and_then(|entry| entry.email.clone())
                .unwrap_or_else(|| self.credentials.default_email(user)),
            space_id: self.fixtures.spaces.get(&username).map(str::to_owned),
            user_id: record.and_then(|entry| entry.id.clone()),
            username,
        }
    }

    /// Expands placeholders in `text`; user-scoped tokens need `user`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Placeholder`] when the status document is
    /// needed but cannot be fetched.
    pub async fn substitute(&self, text: &str, user: Option<&str>) -> Result<String, DispatchError> {
        self.substitute_with(text, user, &[]).await
    }

    /// [`Self::substitute`] with value transforms.
    ///
    /// # Errors
    ///
    /// See [`Self::substitute`].
    pub async fn substitute_with(
        &self,
        text: &str,
        user: Option<&str>,
        transforms: &[Transform],
    ) -> Result<String, DispatchError> {
        let user_scope = user.map(|name| self.user_scope(name));
        let scope = ResolveScope {
            config: &self.config,
            urls: &self.urls,
            target: self.target,
            fixtures: &self.fixtures,
            user: user_scope.as_ref(),
            group: None,
            hostname: &self.hostname,
        };
        Ok(self
            .placeholders
            .substitute(text, &scope, &self.transport, transforms, &[])
            .await?)
    }

    fn stamp(&self, request: &mut TestRequest) {
        if let Some(line_ref) = self.line_ref() {
            request.set_header(REQUEST_ID_HEADER, line_ref);
        }
    }

    /// Resend policy of `Given` steps: the configured one, also resending
    /// on conflicts.
    const fn setup_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_conflict: true,
            ..self.retry
        }
    }

    /// Stamps, sends and logs one request without touching the recorder.
    async fn exchange(
        &self,
        mut request: TestRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, DispatchError> {
        self.stamp(&mut request);
        let response = send_with_retry(&self.transport, &request, policy).await?;
        self.log_exchange(&request, &response)?;
        Ok(response)
    }

    fn log_exchange(
        &self,
        request: &TestRequest,
        response: &HttpResponse,
    ) -> Result<(), DispatchError> {
        if let Some(log) = self.active_log() {
            log.record(request, response)?;
        }
        Ok(())
    }

    async fn dispatch(
        &mut self,
        request: TestRequest,
        owner: Option<&str>,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, DispatchError> {
        let response = self.exchange(request, policy).await?;
        self.recorder.set(response.clone(), owner);
        Ok(response)
    }

    /// Sends `request` and records the response as the last one.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] when the request cannot be sent.
    pub async fn send(
        &mut self,
        request: TestRequest,
        owner: Option<&str>,
    ) -> Result<HttpResponse, DispatchError> {
        let policy = self.retry;
        self.dispatch(request, owner, policy).await
    }

    /// Sends a setup request, resending on conflicts, and fails unless the
    /// response carries `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Setup`] on an unexpected status.
    pub async fn send_given(
        &mut self,
        request: TestRequest,
        expected: u16,
        owner: Option<&str>,
    ) -> Result<HttpResponse, DispatchError> {
        let policy = self.setup_policy();
        let response = self.dispatch(request, owner, policy).await?;
        assert_status(response.status, expected).map_err(DispatchError::Setup)?;
        Ok(response)
    }

    /// Sends one request per table row, accumulating HTTP and OCS codes for
    /// a later combined assertion. Every row is sent even when earlier rows
    /// fail; a row that gets no response accumulates `notset` codes.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Batch`] listing rows whose request could not
    /// be sent at all.
    pub async fn send_table_rows(
        &mut self,
        requests: Vec<TestRequest>,
    ) -> Result<(), DispatchError> {
        let mut failures = Vec::new();
        for request in requests {
            match self.exchange(request, self.retry).await {
                Ok(response) => {
                    self.recorder.push_status_codes(&response);
                    self.recorder.set(response, None);
                }
                Err(err) => {
                    self.recorder.push_unanswered();
                    failures.push(err.to_string());
                }
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Batch { failures })
        }
    }

    /// The last recorded response.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::NoResponse`] before any request.
    pub fn last_response(&self) -> Result<&HttpResponse, DispatchError> {
        Ok(self.recorder.get().ok_or(AssertionError::NoResponse)?)
    }

    /// Asserts the HTTP status of the last response.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Assertion`] on mismatch.
    pub fn assert_last_status(&self, expected: u16) -> Result<(), DispatchError> {
        Ok(assert_status(self.last_response()?.status, expected)?)
    }

    /// Asserts the OCS status of the last response against comma-separated
    /// alternatives.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Assertion`] on mismatch.
    pub fn assert_last_ocs_status(&mut self, expected: &str) -> Result<(), DispatchError> {
        Ok(assert_ocs_status(&mut self.recorder, expected)?)
    }

    /// Whether `url` is a public link on the active server.
    #[must_use]
    pub fn is_public_link_url(&self, url: &str) -> bool {
        assertions::is_public_link_url(url, self.base_url())
    }

    /// Deletes every registered fixture on both servers, closes the
    /// scenario log and resets the per-scenario state. When `failed` is set
    /// and the scenario is not an expected failure, its log is kept in
    /// `failed.log`. Never fails; problems are logged and returned.
    pub async fn after_scenario(&mut self, failed: bool) -> CleanupSummary {
        let summary = cleanup(&self.provisioning, &mut self.fixtures, &self.urls).await;
        let finished = self
            .log
            .as_mut()
            .filter(|log| log.scenario_ref().is_some())
            .map(|log| log.finish(failed, &self.expected_failures));
        if let Some(Err(err)) = finished {
            warn!(error = %err, "could not close the scenario log");
        }
        if !summary.is_clean() {
            warn!(
                failures = ?summary.failures,
                survivors = ?summary.survivors,
                "fixtures may leak into later scenarios"
            );
        }
        self.recorder = ResponseRecorder::new();
        self.target = ServerTarget::Local;
        self.scenario_ref = None;
        self.step_ref = None;
        summary
    }
}

#[cfg(test)]
mod tests;
