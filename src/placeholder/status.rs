//! The `status.php` document behind the product and version tokens.

use std::future::Future;
use std::pin::Pin;

use serde::Deserialize;

use crate::dav::sanitize_url;
use crate::request::TestRequest;
use crate::transport::Transport;

use super::PlaceholderError;

/// Fields of `status.php` used in substitutions. Missing fields are empty.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct ServerStatus {
    /// Product name.
    pub productname: String,
    /// Edition.
    pub edition: String,
    /// Numeric version.
    pub version: String,
    /// Human-readable version.
    pub versionstring: String,
}

/// Future returned by [`StatusSource::fetch_status`].
pub type StatusFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ServerStatus, PlaceholderError>> + Send + 'a>>;

/// Supplies the server status document.
pub trait StatusSource: Send + Sync {
    /// Fetches the status of the server at `base_url`.
    fn fetch_status<'a>(&'a self, base_url: &'a str) -> StatusFuture<'a>;
}

/// Reads `GET {base_url}/status.php` through any transport.
impl<T: Transport> StatusSource for T {
    fn fetch_status<'a>(&'a self, base_url: &'a str) -> StatusFuture<'a> {
        Box::pin(async move {
            let url = sanitize_url(&format!("{base_url}/status.php"), false);
            let request = TestRequest::builder()
                .method("GET")
                .url(url)
                .build()
                .map_err(|err| PlaceholderError::Status(err.to_string()))?;
            let response = self
                .send(&request)
                .await
                .map_err(|err| PlaceholderError::Status(err.to_string()))?;
            if response.is_failure() {
                return Err(PlaceholderError::Status(format!(
                    "status.php returned {}",
                    response.status
                )));
            }
            serde_json::from_slice(&response.body)
                .map_err(|err| PlaceholderError::Status(err.to_string()))
        })
    }
}

/// A fixed status, for offline expansion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct StaticStatus(pub ServerStatus);

impl StatusSource for StaticStatus {
    fn fetch_status<'a>(&'a self, _base_url: &'a str) -> StatusFuture<'a> {
        let status = self.0.clone();
        Box::pin(async move { Ok(status) })
    }
}
