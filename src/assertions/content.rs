//! Checksum, content and modification-time assertions.

use chrono::DateTime;
use roxmltree::{Document, Node};

use super::{AssertionError, ensure};
use crate::response::HttpResponse;

const DAV_NAMESPACE: &str = "DAV:";

/// Asserts the response carries exactly one `OC-Checksum` header equal to
/// `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] when the header is missing, repeated
/// or different.
pub fn assert_checksum_header(
    response: &HttpResponse,
    expected: &str,
) -> Result<(), AssertionError> {
    let values = response.header_values("OC-Checksum");
    let [actual] = values.as_slice() else {
        return Err(AssertionError::Failed(if values.is_empty() {
            String::from("No checksum header was found.")
        } else {
            format!(
                "Expected 1 checksum in the header but found {} checksums",
                values.len()
            )
        }));
    };
    ensure(*actual == expected, || {
        format!("Expected: header checksum should match {expected} but got {actual}")
    })
}

fn nth_element<'a, 'input>(node: Node<'a, 'input>, index: usize) -> Option<Node<'a, 'input>> {
    node.children().filter(Node::is_element).nth(index)
}

/// Reads the checksum of the first resource of a PROPFIND response. The
/// value sits at a fixed position: first response, its second child
/// (the propstat), then the first child three levels down.
#[must_use]
pub fn propfind_checksum(body: &str) -> Option<String> {
    let document = Document::parse(body).ok()?;
    let response = nth_element(document.root_element(), 0)?;
    let propstat = nth_element(response, 1)?;
    let prop = nth_element(propstat, 0)?;
    let checksums = nth_element(prop, 0)?;
    let checksum = nth_element(checksums, 0)?;
    Some(checksum.text().unwrap_or_default().to_owned())
}

/// Asserts the PROPFIND checksum in the response body equals `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::Xml`] when the body has no checksum at the
/// expected position and [`AssertionError::Failed`] on mismatch.
pub fn assert_webdav_checksum(
    response: &HttpResponse,
    expected: &str,
) -> Result<(), AssertionError> {
    let actual = propfind_checksum(&response.text()).ok_or_else(|| {
        AssertionError::Xml(String::from("no checksum found in PROPFIND response"))
    })?;
    ensure(actual == expected, || {
        format!("Expected: webDav checksum should be {expected} but got {actual}")
    })
}

/// Asserts the downloaded body equals `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] on mismatch.
pub fn assert_content(response: &HttpResponse, expected: &str) -> Result<(), AssertionError> {
    let actual = response.text();
    ensure(actual == expected, || {
        format!(
            "The content was expected to be '{expected}', but actually is '{actual}'. HTTP status was {}",
            response.status
        )
    })
}

/// Parses an HTTP date, an RFC 3339 timestamp or epoch seconds into epoch
/// seconds.
#[must_use]
pub fn parse_http_date(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    if let Ok(seconds) = trimmed.parse::<i64>() {
        return Some(seconds);
    }
    DateTime::parse_from_rfc2822(trimmed)
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed))
        .ok()
        .map(|parsed| parsed.timestamp())
}

/// Asserts the first `d:getlastmodified` in a PROPFIND body denotes the
/// same instant as `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::Xml`] for a body without the property and
/// [`AssertionError::Failed`] when either date is unparsable or they differ.
pub fn assert_mtime(response: &HttpResponse, expected: &str) -> Result<(), AssertionError> {
    let text = response.text();
    let document = Document::parse(&text).map_err(|err| AssertionError::Xml(err.to_string()))?;
    let actual = document
        .descendants()
        .find(|node| node.has_tag_name((DAV_NAMESPACE, "getlastmodified")))
        .and_then(|node| node.text())
        .ok_or_else(|| AssertionError::Xml(String::from("no getlastmodified in response")))?;
    let unparsable = |value: &str| AssertionError::Failed(format!("cannot parse date '{value}'"));
    let wanted = parse_http_date(expected).ok_or_else(|| unparsable(expected))?;
    let found = parse_http_date(actual).ok_or_else(|| unparsable(actual))?;
    ensure(wanted == found, || {
        format!("Expected mtime {wanted} but got {found} ('{actual}')")
    })
}
