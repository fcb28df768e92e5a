//! OCS status assertions on the last recorded response.

use super::{AssertionError, ensure};
use crate::response::{ResponseRecorder, ocs_status_code};

/// Status code an OCS API version reports on success.
#[must_use]
pub const fn ocs_success_code(ocs_api_version: u8) -> &'static str {
    if ocs_api_version == 2 { "200" } else { "100" }
}

/// Asserts the OCS status of the last response is one of the
/// comma-separated `expected` codes, then clears the OCS accumulator.
///
/// # Errors
///
/// Returns [`AssertionError::NoResponse`] before any request,
/// [`AssertionError::MissingOcsStatus`] when the body has no status and
/// [`AssertionError::Failed`] on mismatch.
pub fn assert_ocs_status(
    recorder: &mut ResponseRecorder,
    expected: &str,
) -> Result<(), AssertionError> {
    let response = recorder.get().ok_or(AssertionError::NoResponse)?;
    let actual = ocs_status_code(response).ok_or(AssertionError::MissingOcsStatus)?;
    let accepted: Vec<&str> = expected.split(',').map(str::trim).collect();
    ensure(accepted.contains(&actual.as_str()), || {
        format!(
            "OCS status code is not any of the expected values {} got {actual}",
            accepted.join(",")
        )
    })?;
    recorder.clear_ocs_status_codes();
    Ok(())
}

/// Asserts the last response reports OCS success for `ocs_api_version`.
///
/// # Errors
///
/// See [`assert_ocs_status`].
pub fn assert_ocs_success(
    recorder: &mut ResponseRecorder,
    ocs_api_version: u8,
) -> Result<(), AssertionError> {
    assert_ocs_status(recorder, ocs_success_code(ocs_api_version))
}
