//! Unit tests for the response recorder.

use super::*;
use rstest::rstest;

#[rstest]
#[case(r#"{"ocs":{"meta":{"statuscode":100,"status":"ok"}}}"#, Some("100"))]
#[case(r#"{"ocs":{"meta":{"statuscode":"997"}}}"#, Some("997"))]
#[case(
    "<?xml version=\"1.0\"?><ocs><meta><status>failure</status><statuscode> 404 </statuscode></meta></ocs>",
    Some("404")
)]
#[case(r#"{"value":[]}"#, None)]
#[case("<d:multistatus xmlns:d=\"DAV:\"/>", None)]
#[case("plain text", None)]
fn ocs_status_prefers_json_then_xml(#[case] body: &str, #[case] expected: Option<&str>) {
    let response = HttpResponse::new(200, body);
    assert_eq!(ocs_status_code(&response).as_deref(), expected);
}

#[rstest]
fn headers_are_case_insensitive_and_repeatable() {
    let response = HttpResponse::new(200, "")
        .with_header("OC-Checksum", "SHA1:a")
        .with_header("oc-checksum", "MD5:b");
    assert_eq!(response.header("oc-CHECKSUM"), Some("SHA1:a"));
    assert_eq!(response.header_values("OC-Checksum"), vec!["SHA1:a", "MD5:b"]);
    assert_eq!(response.header("Missing"), None);
}

#[rstest]
#[case(399, false)]
#[case(400, true)]
#[case(503, true)]
fn failure_means_400_or_above(#[case] status: u16, #[case] expected: bool) {
    assert_eq!(HttpResponse::new(status, "").is_failure(), expected);
}

#[rstest]
fn recorder_keeps_last_response_and_owner() {
    let mut recorder = ResponseRecorder::new();
    assert!(recorder.get().is_none());
    recorder.set(HttpResponse::new(201, "first"), Some("alice"));
    recorder.set(HttpResponse::new(204, ""), Some("brian"));
    assert_eq!(recorder.get().map(|response| response.status), Some(204));
    assert_eq!(recorder.owner(), Some("brian"));
    recorder.set(HttpResponse::new(200, ""), None);
    assert_eq!(recorder.owner(), None);
}

#[rstest]
fn three_rows_accumulate_three_codes_each() {
    let mut recorder = ResponseRecorder::new();
    recorder.push_status_codes(&HttpResponse::new(
        200,
        r#"{"ocs":{"meta":{"statuscode":100}}}"#,
    ));
    recorder.push_status_codes(&HttpResponse::new(404, "<html>not found</html>"));
    recorder.push_status_codes(&HttpResponse::new(401, ""));
    assert_eq!(recorder.http_status_codes(), ["200", "404", "401"]);
    assert_eq!(
        recorder.ocs_status_codes(),
        ["100", OCS_STATUS_NOT_SET, OCS_STATUS_NOT_SET]
    );

    recorder.clear_http_status_codes();
    assert!(recorder.http_status_codes().is_empty());
    assert_eq!(recorder.ocs_status_codes().len(), 3);
    recorder.clear_status_codes();
    assert!(recorder.ocs_status_codes().is_empty());
}

#[rstest]
fn unanswered_request_keeps_one_entry_per_row() {
    let mut recorder = ResponseRecorder::new();
    recorder.push_unanswered();
    recorder.push_status_codes(&HttpResponse::new(207, ""));
    assert_eq!(recorder.http_status_codes(), [OCS_STATUS_NOT_SET, "207"]);
    assert_eq!(
        recorder.ocs_status_codes(),
        [OCS_STATUS_NOT_SET, OCS_STATUS_NOT_SET]
    );
}

#[rstest]
fn json_body_decodes() {
    let response = HttpResponse::new(200, r#"{"id":"abc"}"#);
    let document = response.json().expect("body is JSON");
    assert_eq!(document.get("id").and_then(Value::as_str), Some("abc"));
    assert!(HttpResponse::new(200, "{").json().is_err());
}
