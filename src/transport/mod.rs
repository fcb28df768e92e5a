//! The network seam: a [`Transport`] sends one [`TestRequest`] and returns
//! the fully read [`HttpResponse`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::request::TestRequest;
use crate::response::HttpResponse;

mod reqwest_transport;

pub use reqwest_transport::ReqwestTransport;

/// Status returned while the server is still processing a previous write.
pub const STATUS_TOO_EARLY: u16 = 425;
/// Status returned for a conflicting concurrent write.
pub const STATUS_CONFLICT: u16 = 409;

/// Future returned by transport operations.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Sends fully resolved requests.
pub trait Transport: Send + Sync {
    /// Sends `request` and reads the whole response.
    fn send<'a>(&'a self, request: &'a TestRequest) -> TransportFuture<'a, HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send<'a>(&'a self, request: &'a TestRequest) -> TransportFuture<'a, HttpResponse> {
        (**self).send(request)
    }
}

/// Bounded resend policy for transient statuses.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of resends after the first attempt.
    pub attempts: u32,
    /// Pause before each resend.
    pub delay: Duration,
    /// Also resend on 409, for setup steps.
    pub retry_conflict: bool,
}

impl RetryPolicy {
    /// Policy for ordinary steps: up to 10 resends, 1 s apart, on 425.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(1),
            retry_conflict: false,
        }
    }

    /// Policy for setup steps, which also resend on 409.
    #[must_use]
    pub const fn setup() -> Self {
        Self {
            retry_conflict: true,
            ..Self::standard()
        }
    }

    /// Replaces the delay between resends.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Whether a response with `status` should be resent.
    #[must_use]
    pub const fn should_retry(&self, status: u16) -> bool {
        status == STATUS_TOO_EARLY || (self.retry_conflict && status == STATUS_CONFLICT)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Sends `request`, resending while `policy` asks for it. The last response
/// is returned even when it still carries a retryable status.
///
/// # Errors
///
/// Returns the first [`TransportError`] raised by the transport.
pub async fn send_with_retry<T: Transport + ?Sized>(
    transport: &T,
    request: &TestRequest,
    policy: RetryPolicy,
) -> Result<HttpResponse, TransportError> {
    let mut response = transport.send(request).await?;
    let mut attempt = 0;
    while policy.should_retry(response.status) && attempt < policy.attempts {
        attempt += 1;
        warn!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            attempt,
            "retrying request"
        );
        sleep(policy.delay).await;
        response = transport.send(request).await?;
    }
    debug!(
        method = %request.method,
        url = %request.url,
        status = response.status,
        body_len = response.body.len(),
        "received response"
    );
    Ok(response)
}

/// Errors raised while sending requests.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TransportError {
    /// Raised when the HTTP client cannot be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    /// Raised when a request cannot be sent or its response read.
    #[error("{method} {url} failed: {message}")]
    Request {
        /// Request method.
        method: String,
        /// Request URL.
        url: String,
        /// Underlying error.
        message: String,
    },
    /// Raised by scripted transports when no response is queued.
    #[error("no scripted response for {method} {url}")]
    Exhausted {
        /// Request method.
        method: String,
        /// Request URL.
        url: String,
    },
}
