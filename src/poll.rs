//! Bounded polling for eventually consistent server state.

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

use crate::request::TestRequest;
use crate::response::HttpResponse;
use crate::transport::{Transport, TransportError};

/// Number of attempts and the pause between them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PollPolicy {
    /// Total number of probes, including the first.
    pub attempts: u32,
    /// Pause between probes.
    pub interval: Duration,
}

impl PollPolicy {
    /// Ten probes half a second apart.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            attempts: 10,
            interval: Duration::from_millis(500),
        }
    }

    /// Replaces the interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Errors raised while polling.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PollError {
    /// Raised when the awaited state never appeared.
    #[error("condition not met after {attempts} attempts")]
    Exhausted {
        /// Probes made.
        attempts: u32,
    },
    /// Raised when the body never decoded as JSON.
    #[error("response body is not valid JSON after {attempts} attempts: {message}")]
    Json {
        /// Requests made.
        attempts: u32,
        /// Last decode error.
        message: String,
    },
    /// Raised when a probe request fails outright.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Runs `probe` until it yields a value or the policy is exhausted.
///
/// # Errors
///
/// Returns [`PollError::Exhausted`] when every probe yielded `None`.
pub async fn poll_until<T, F, Fut>(policy: PollPolicy, mut probe: F) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for attempt in 1..=policy.attempts {
        if let Some(value) = probe().await {
            return Ok(value);
        }
        debug!(attempt, attempts = policy.attempts, "poll condition not met yet");
        if attempt < policy.attempts {
            sleep(policy.interval).await;
        }
    }
    Err(PollError::Exhausted {
        attempts: policy.attempts,
    })
}

/// Sends `request` and decodes the body as JSON, resending while the body
/// does not parse.
///
/// # Errors
///
/// Returns [`PollError::Transport`] when a request fails and
/// [`PollError::Json`] when no attempt produced valid JSON.
pub async fn decode_json_with_retry<T: Transport + ?Sized>(
    transport: &T,
    request: &TestRequest,
    policy: PollPolicy,
) -> Result<(HttpResponse, Value), PollError> {
    let mut last_error = String::new();
    for attempt in 1..=policy.attempts {
        let response = transport.send(request).await?;
        match response.json() {
            Ok(document) => return Ok((response, document)),
            Err(err) => {
                debug!(attempt, url = %request.url, error = %err, "body is not JSON yet");
                last_error = err.to_string();
            }
        }
        if attempt < policy.attempts {
            sleep(policy.interval).await;
        }
    }
    Err(PollError::Json {
        attempts: policy.attempts,
        message: last_error,
    })
}
