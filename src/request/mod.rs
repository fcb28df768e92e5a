//! Outbound request description, DAV request assembly and table checks.
//!
//! A [`TestRequest`] is a fully resolved HTTP request: method, absolute URL,
//! headers, body and authentication. It is built once by a step and handed
//! to a [`crate::transport::Transport`]; nothing in it is resolved lazily.

use thiserror::Error;
use url::Url;

use crate::dav::DavError;

mod dav;
mod tables;

pub use dav::DavRequest;
pub use tables::{verify_column_count, verify_table_columns};

/// Header carrying the scenario step reference.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Authentication attached to a request.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Auth {
    /// No credentials.
    #[default]
    None,
    /// HTTP Basic credentials.
    Basic {
        /// Login name.
        username: String,
        /// Password.
        password: String,
    },
    /// `Authorization: Bearer <token>`.
    Bearer(String),
}

/// Body attached to a request.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// Raw bytes sent as-is.
    Raw(Vec<u8>),
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// `application/json` document.
    Json(serde_json::Value),
}

impl RequestBody {
    /// Raw body from text.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Raw(value.into().into_bytes())
    }

    /// Number of bytes in a raw body; structured bodies report zero.
    #[must_use]
    pub const fn raw_len(&self) -> usize {
        match self {
            Self::Raw(bytes) => bytes.len(),
            Self::Empty | Self::Form(_) | Self::Json(_) => 0,
        }
    }
}

/// A fully resolved HTTP request.
#[derive(Clone, Debug, PartialEq)]
pub struct TestRequest {
    /// HTTP or WebDAV method, upper case.
    pub method: String,
    /// Absolute URL.
    pub url: String,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// Authentication.
    pub auth: Auth,
}

impl TestRequest {
    /// Starts a builder for a [`TestRequest`].
    #[must_use]
    pub fn builder() -> TestRequestBuilder {
        TestRequestBuilder::new()
    }

    /// Returns the first header value with `name`, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Sets a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_owned(), value.into()));
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when the method is empty or the
    /// URL is not absolute.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.method.is_empty() || self.method.chars().any(char::is_whitespace) {
            return Err(RequestError::Validation(format!(
                "invalid method '{}'",
                self.method
            )));
        }
        Url::parse(&self.url)
            .map_err(|err| RequestError::Validation(format!("invalid url '{}': {err}", self.url)))?;
        Ok(())
    }
}

/// Builder for [`TestRequest`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TestRequestBuilder {
    method: String,
    url: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: RequestBody,
    auth: Auth,
}

impl TestRequestBuilder {
    /// Creates an empty builder; method and URL must be set before build.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the method.
    #[must_use]
    pub fn method(mut self, value: impl Into<String>) -> Self {
        self.method = value.into();
        self
    }

    /// Sets the absolute URL.
    #[must_use]
    pub fn url(mut self, value: impl Into<String>) -> Self {
        self.url = value.into();
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Appends several headers.
    #[must_use]
    pub fn headers<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(values.into_iter().map(|(key, value)| (key.into(), value.into())));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, value: RequestBody) -> Self {
        self.body = value;
        self
    }

    /// Sets authentication.
    #[must_use]
    pub fn auth(mut self, value: Auth) -> Self {
        self.auth = value;
        self
    }

    /// Uses Basic credentials.
    #[must_use]
    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth(Auth::Basic {
            username: username.into(),
            password: password.into(),
        })
    }

    /// Uses a bearer token instead of Basic credentials.
    #[must_use]
    pub fn bearer(self, token: impl Into<String>) -> Self {
        self.auth(Auth::Bearer(token.into()))
    }

    /// Builds and validates the request, upper-casing the method and
    /// form-encoding query parameters onto the URL.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::Validation`] when the method or URL is
    /// unusable.
    pub fn build(self) -> Result<TestRequest, RequestError> {
        let mut url = self.url.trim().to_owned();
        if !self.query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(&self.query)
                .finish();
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str(&encoded);
        }
        let request = TestRequest {
            method: self.method.trim().to_uppercase(),
            url,
            headers: self.headers,
            body: self.body,
            auth: self.auth,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Errors raised while building requests.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RequestError {
    /// Raised when a request is missing a usable method or URL.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Raised when a required table column is absent.
    #[error("Row with header '{0}' expected to be in table but not found")]
    MissingColumn(String),
    /// Raised when a table carries a column that is not allowed.
    #[error("Row with header '{0}' is not allowed in table but found")]
    UnexpectedColumn(String),
    /// Raised for a table with no header row.
    #[error("Table should have at least one row.")]
    EmptyTable,
    /// Raised when a table has the wrong number of columns.
    #[error("Table should have exactly {expected} columns but has {found}")]
    ColumnCount {
        /// Expected number of columns.
        expected: usize,
        /// Actual number of columns.
        found: usize,
    },
    /// Raised when the DAV path or body cannot be produced.
    #[error(transparent)]
    Dav(#[from] DavError),
}

#[cfg(test)]
mod tests;
