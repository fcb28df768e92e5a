//! HTTP and accumulated status-code assertions.

use std::collections::BTreeSet;

use super::{AssertionError, ensure};
use crate::response::ResponseRecorder;

/// Asserts `actual` equals `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] on mismatch.
pub fn assert_status(actual: u16, expected: u16) -> Result<(), AssertionError> {
    ensure(actual == expected, || {
        format!("HTTP status code {actual} is not the expected value {expected}")
    })
}

/// Asserts `actual` is one of `expected`.
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] when no value matches.
pub fn assert_status_one_of(actual: u16, expected: &[u16]) -> Result<(), AssertionError> {
    ensure(expected.contains(&actual), || {
        let list = expected
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        format!("HTTP status code {actual} is not one of the expected values {list}")
    })
}

/// Asserts `lower <= actual <= upper`.
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] when out of range.
pub fn assert_status_between(actual: u16, lower: u16, upper: u16) -> Result<(), AssertionError> {
    ensure((lower..=upper).contains(&actual), || {
        format!("The HTTP status code {actual} is not between {lower} and {upper}")
    })
}

/// Asserts `actual` signals a failure (`>= 400`).
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] for a successful status.
pub fn assert_failure_status(actual: u16) -> Result<(), AssertionError> {
    ensure(actual >= 400, || {
        format!("The HTTP status code {actual} is not greater than or equals to 400")
    })
}

fn split_expected(expected: &str) -> Vec<String> {
    expected
        .split(',')
        .map(|code| code.trim().to_owned())
        .filter(|code| !code.is_empty())
        .collect()
}

fn assert_all_equal(codes: &[String], expected: &str, kind: &str) -> Result<(), AssertionError> {
    let unique: BTreeSet<&str> = codes.iter().map(String::as_str).collect();
    match unique.iter().next() {
        Some(only) if unique.len() == 1 => ensure(*only == expected.trim(), || {
            format!("Responses did not return expected {kind} status code")
        }),
        _ => Err(AssertionError::Failed(format!(
            "Expected same but found different {kind} status codes of last requested responses.Found status codes: {}",
            codes.join(",")
        ))),
    }
}

/// Asserts every accumulated HTTP code equals `expected`, then clears the
/// HTTP list.
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] when the codes differ from each other
/// or from `expected`.
pub fn assert_all_http_status(
    recorder: &mut ResponseRecorder,
    expected: &str,
) -> Result<(), AssertionError> {
    assert_all_equal(recorder.http_status_codes(), expected, "http")?;
    recorder.clear_http_status_codes();
    Ok(())
}

/// Asserts every accumulated OCS code equals `expected`, then clears the
/// OCS list.
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] when the codes differ from each other
/// or from `expected`.
pub fn assert_all_ocs_status(
    recorder: &mut ResponseRecorder,
    expected: &str,
) -> Result<(), AssertionError> {
    assert_all_equal(recorder.ocs_status_codes(), expected, "ocs")?;
    recorder.clear_ocs_status_codes();
    Ok(())
}

/// Asserts the accumulated HTTP codes equal the comma-separated `expected`
/// list in order. The HTTP list is cleared whatever the outcome.
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] when length or order differ.
pub fn assert_http_status_respectively(
    recorder: &mut ResponseRecorder,
    expected: &str,
) -> Result<(), AssertionError> {
    let actual = recorder.http_status_codes().to_vec();
    recorder.clear_http_status_codes();
    ensure(split_expected(expected) == actual, || {
        format!(
            "Expected HTTP status codes: \"{expected}\". Found HTTP status codes: \"{}\"",
            actual.join(",")
        )
    })
}

/// Asserts the accumulated OCS codes equal the comma-separated `expected`
/// list in order. The OCS list is cleared whatever the outcome.
///
/// # Errors
///
/// Returns [`AssertionError::Failed`] when length or order differ.
pub fn assert_ocs_status_respectively(
    recorder: &mut ResponseRecorder,
    expected: &str,
) -> Result<(), AssertionError> {
    let wanted = split_expected(expected);
    let actual = recorder.ocs_status_codes().to_vec();
    recorder.clear_ocs_status_codes();
    ensure(wanted == actual, || {
        format!(
            "Expected OCS status codes: \"{}\". Found OCS status codes: \"{}\"",
            wanted.join(","),
            actual.join(",")
        )
    })
}
