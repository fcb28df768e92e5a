//! [`Transport`] backed by a `reqwest` client.

use std::time::Duration;

use reqwest::{Client, Method};
use tracing::debug;

use crate::config::HarnessConfig;
use crate::request::{Auth, RequestBody, TestRequest};
use crate::response::HttpResponse;

use super::{Transport, TransportError, TransportFuture};

/// Sends requests with `reqwest`. Certificate verification is disabled
/// because test servers use self-signed certificates.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Client(err.to_string()))?;
        Ok(Self { client })
    }

    /// Creates a transport using the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] when the client cannot be built.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, TransportError> {
        Self::new(Duration::from_secs(config.request_timeout_secs))
    }

    async fn execute(&self, request: &TestRequest) -> Result<HttpResponse, TransportError> {
        let failure = |message: String| TransportError::Request {
            method: request.method.clone(),
            url: request.url.clone(),
            message,
        };
        let method =
            Method::from_bytes(request.method.as_bytes()).map_err(|err| failure(err.to_string()))?;
        debug!(
            method = %request.method,
            url = %request.url,
            request_id = request.header(crate::request::REQUEST_ID_HEADER).unwrap_or_default(),
            "sending request"
        );

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match &request.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::Bearer(token) => builder.bearer_auth(token),
        };
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Raw(bytes) => builder.body(bytes.clone()),
            RequestBody::Form(pairs) => builder.form(pairs),
            RequestBody::Json(document) => builder.json(document),
        };

        let response = builder
            .send()
            .await
            .map_err(|err| failure(err.to_string()))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|err| failure(err.to_string()))?
            .to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(&'a self, request: &'a TestRequest) -> TransportFuture<'a, HttpResponse> {
        Box::pin(self.execute(request))
    }
}
