//! Checks used by `Then` steps. Each check is a function of the expected
//! value and the recorded state that fails with a message naming both.

mod content;
mod ocs;
mod schema;
mod status;

pub use content::{
    assert_checksum_header, assert_content, assert_mtime, assert_webdav_checksum,
    parse_http_date, propfind_checksum,
};
pub use ocs::{assert_ocs_status, assert_ocs_success, ocs_success_code};
pub use schema::{SchemaError, assert_json_matches_schema, validate_schema_requirements};
pub use status::{
    assert_all_http_status, assert_all_ocs_status, assert_failure_status,
    assert_http_status_respectively, assert_ocs_status_respectively, assert_status,
    assert_status_between, assert_status_one_of,
};

use regex::Regex;
use thiserror::Error;

use crate::response::HttpResponse;

/// Errors raised by failed assertions.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum AssertionError {
    /// An expectation did not hold; the message names expected and actual.
    #[error("{0}")]
    Failed(String),
    /// An assertion ran before any request was recorded.
    #[error("no response has been recorded")]
    NoResponse,
    /// The body carried no OCS status code.
    #[error("No OCS status code found in response")]
    MissingOcsStatus,
    /// The body was expected to be XML.
    #[error("response body is not valid XML: {0}")]
    Xml(String),
    /// The body was expected to be JSON.
    #[error("response body is not valid JSON: {0}")]
    Json(String),
    /// A pattern supplied by a step does not compile.
    #[error("invalid pattern '{pattern}': {message}")]
    Pattern {
        /// Pattern text.
        pattern: String,
        /// Compiler message.
        message: String,
    },
    /// Schema meta-validation or document validation failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Fails with `message` unless `condition` holds.
pub(crate) fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), AssertionError> {
    if condition {
        Ok(())
    } else {
        Err(AssertionError::Failed(message()))
    }
}

/// Asserts the text of the element reached by following `path`
/// (`/`-separated local names below the document root) equals `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::Xml`] for an unparsable body and
/// [`AssertionError::Failed`] when the element is missing or differs.
pub fn assert_xml_field(
    response: &HttpResponse,
    path: &str,
    expected: &str,
) -> Result<(), AssertionError> {
    let text = response.text();
    let document =
        roxmltree::Document::parse(&text).map_err(|err| AssertionError::Xml(err.to_string()))?;
    let mut node = document.root_element();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        node = node
            .children()
            .find(|child| child.is_element() && child.tag_name().name() == segment)
            .ok_or_else(|| {
                AssertionError::Failed(format!("XML field '{path}' not found in response"))
            })?;
    }
    let actual = node.text().unwrap_or_default();
    ensure(actual == expected, || {
        format!("XML field '{path}' was expected to be '{expected}', but actually is '{actual}'")
    })
}

/// Asserts header `name` is present and its first value matches `pattern`.
///
/// # Errors
///
/// Returns [`AssertionError::Pattern`] for an invalid pattern and
/// [`AssertionError::Failed`] when the header is missing or does not match.
pub fn assert_header_matches(
    response: &HttpResponse,
    name: &str,
    pattern: &str,
) -> Result<(), AssertionError> {
    let regex = Regex::new(pattern).map_err(|err| AssertionError::Pattern {
        pattern: pattern.to_owned(),
        message: err.to_string(),
    })?;
    let value = response
        .header(name)
        .ok_or_else(|| AssertionError::Failed(format!("Header '{name}' not found in response")))?;
    ensure(regex.is_match(value), || {
        format!("Header '{name}' value '{value}' does not match pattern '{pattern}'")
    })
}

/// Whether `url` is a public link share URL on `base_url`.
#[must_use]
pub fn is_public_link_url(url: &str, base_url: &str) -> bool {
    if !url.starts_with("http") {
        return false;
    }
    let prefix = format!("{}/", base_url.trim_end_matches('/'));
    let Some(remainder) = url.strip_prefix(&prefix) else {
        return false;
    };
    Regex::new(r"^(#/)?s/[a-zA-Z0-9]{15}$").is_ok_and(|regex| regex.is_match(remainder))
}
