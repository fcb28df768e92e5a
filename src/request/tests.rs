//! Unit tests for request building and table checks.

use super::*;
use crate::dav::{DavLayout, DavResource, DavVersion, SHARES_SPACE_ID};
use rstest::rstest;

const BASE: &str = "https://localhost:9200/";

fn new_layout() -> DavLayout {
    DavLayout::new(DavVersion::New, true)
}

fn spaces_layout() -> DavLayout {
    DavLayout::new(DavVersion::Spaces, true)
}

#[rstest]
fn builder_uppercases_method_and_encodes_query() {
    let request = TestRequest::builder()
        .method("propfind")
        .url("https://h/ocs/v2.php/apps/files_sharing/api/v1/shares")
        .query("path", "/a b")
        .query("reshares", "true")
        .build()
        .expect("request should build");
    assert_eq!(request.method, "PROPFIND");
    assert_eq!(
        request.url,
        "https://h/ocs/v2.php/apps/files_sharing/api/v1/shares?path=%2Fa+b&reshares=true"
    );
}

#[rstest]
fn builder_appends_to_existing_query() {
    let request = TestRequest::builder()
        .method("GET")
        .url("https://h/x?format=json")
        .query("a", "1")
        .build()
        .expect("request should build");
    assert_eq!(request.url, "https://h/x?format=json&a=1");
}

#[rstest]
#[case("GET", "relative/path")]
#[case("", "https://h/x")]
#[case("BAD METHOD", "https://h/x")]
fn builder_rejects_unusable_requests(#[case] method: &str, #[case] url: &str) {
    let err = TestRequest::builder()
        .method(method)
        .url(url)
        .build()
        .expect_err("request should be rejected");
    assert!(matches!(err, RequestError::Validation(_)));
}

#[rstest]
fn set_header_replaces_case_insensitively() {
    let mut request = TestRequest::builder()
        .method("GET")
        .url("https://h/x")
        .header("x-request-id", "old")
        .build()
        .expect("request should build");
    request.set_header(REQUEST_ID_HEADER, "new");
    assert_eq!(request.header("X-REQUEST-ID"), Some("new"));
    assert_eq!(request.headers.len(), 1);
}

#[rstest]
fn raw_length_counts_only_raw_bodies() {
    assert_eq!(RequestBody::text("hello").raw_len(), 5);
    assert_eq!(RequestBody::Json(serde_json::json!({"a": 1})).raw_len(), 0);
}

#[rstest]
fn new_layout_request_escapes_path() {
    let request = DavRequest::new("alice", "123456", "PUT", "/folder/a#b?.txt")
        .body(RequestBody::text("data"))
        .build(BASE, new_layout(), None)
        .expect("request should build");
    assert_eq!(
        request.url,
        "https://localhost:9200/remote.php/dav/files/alice/folder/a%23b%3F.txt"
    );
    assert_eq!(
        request.auth,
        Auth::Basic {
            username: String::from("alice"),
            password: String::from("123456"),
        }
    );
}

#[rstest]
fn old_layout_uses_webdav_root() {
    let request = DavRequest::new("alice", "pw", "GET", "textfile0.txt")
        .build(BASE, DavLayout::new(DavVersion::Old, true), None)
        .expect("request should build");
    assert_eq!(
        request.url,
        "https://localhost:9200/remote.php/webdav/textfile0.txt"
    );
}

#[rstest]
fn spaces_layout_uses_personal_space_once() {
    let dav = DavRequest::new("alice", "pw", "PROPFIND", "/docs/a.txt");
    assert!(dav.needs_personal_space(spaces_layout()));
    let request = dav
        .build(BASE, spaces_layout(), Some("space-1"))
        .expect("request should build");
    assert_eq!(
        request.url,
        "https://localhost:9200/remote.php/dav/spaces/space-1/docs/a.txt"
    );
    assert_eq!(request.url.matches("space-1").count(), 1);
}

#[rstest]
fn shares_prefix_selects_shares_space() {
    let dav = DavRequest::new("brian", "pw", "GET", "Shares/shared/a.txt");
    assert!(!dav.needs_personal_space(spaces_layout()));
    let request = dav
        .build(BASE, spaces_layout(), Some("ignored"))
        .expect("request should build");
    assert_eq!(
        request.url,
        format!("https://localhost:9200/remote.php/dav/spaces/{SHARES_SPACE_ID}/shared/a.txt")
    );
}

#[rstest]
fn explicit_space_id_wins() {
    let request = DavRequest::new("alice", "pw", "MKCOL", "new")
        .space_id("project-space")
        .build(BASE, spaces_layout(), Some("personal"))
        .expect("request should build");
    assert_eq!(
        request.url,
        "https://localhost:9200/remote.php/dav/spaces/project-space/new"
    );
}

#[rstest]
fn versions_path_carries_file_id_only() {
    let dav = DavRequest::new("alice", "pw", "PROPFIND", "file-id-1").resource(DavResource::Versions);
    assert!(!dav.needs_personal_space(spaces_layout()));
    let request = dav
        .build(BASE, spaces_layout(), None)
        .expect("request should build");
    assert_eq!(
        request.url,
        "https://localhost:9200/remote.php/dav/meta/file-id-1/v"
    );
}

#[rstest]
#[case("", Auth::None)]
#[case(
    "secret",
    Auth::Basic { username: String::from("public"), password: String::from("secret") }
)]
fn public_files_send_share_password_only(#[case] password: &str, #[case] expected: Auth) {
    let request = DavRequest::new("token123", password, "GET", "file.txt")
        .resource(DavResource::PublicFiles)
        .build(BASE, new_layout(), None)
        .expect("request should build");
    assert_eq!(
        request.url,
        "https://localhost:9200/remote.php/dav/public-files/token123/file.txt"
    );
    assert_eq!(request.auth, expected);
}

#[rstest]
fn bearer_replaces_basic_auth() {
    let request = DavRequest::new("alice", "token-abc", "GET", "a.txt")
        .bearer()
        .build(BASE, new_layout(), None)
        .expect("request should build");
    assert_eq!(request.auth, Auth::Bearer(String::from("token-abc")));
}

#[rstest]
fn act_as_changes_authenticated_user() {
    let request = DavRequest::new("alice", "brian-pw", "GET", "a.txt")
        .act_as("brian")
        .build(BASE, new_layout(), None)
        .expect("request should build");
    assert!(request.url.ends_with("/dav/files/alice/a.txt"));
    assert!(matches!(request.auth, Auth::Basic { ref username, .. } if username == "brian"));
}

#[rstest]
fn destination_header_is_escaped_and_query_appended() {
    let request = DavRequest::new("alice", "pw", "MOVE", "a.txt")
        .header("Destination", "https://localhost:9200/remote.php/dav/files/alice/b#1.txt")
        .header("Overwrite", "F")
        .query("preview", "1")
        .build(BASE, new_layout(), None)
        .expect("request should build");
    assert_eq!(
        request.header("Destination"),
        Some("https://localhost:9200/remote.php/dav/files/alice/b%231.txt")
    );
    assert_eq!(request.header("Overwrite"), Some("F"));
    assert!(request.url.ends_with("/a.txt?preview=1"));
}

#[rstest]
fn spaces_trash_bin_without_space_fails_before_sending() {
    let err = DavRequest::new("alice", "pw", "PROPFIND", "")
        .resource(DavResource::TrashBin)
        .build(BASE, spaces_layout(), None)
        .expect_err("trash-bin needs a space id");
    assert!(matches!(err, RequestError::Dav(_)));
}

#[rstest]
#[case(&["path", "permissions"], Ok(()))]
#[case(&["permissions"], Err(RequestError::MissingColumn(String::from("path"))))]
#[case(
    &["path", "colour"],
    Err(RequestError::UnexpectedColumn(String::from("colour")))
)]
#[case(&[], Err(RequestError::EmptyTable))]
fn table_columns_are_checked(
    #[case] header: &[&str],
    #[case] expected: Result<(), RequestError>,
) {
    assert_eq!(
        verify_table_columns(header, &["path"], &["permissions", "shareType"]),
        expected
    );
}

#[rstest]
fn table_column_errors_use_step_messages() {
    let err = verify_table_columns(&["x"], &["path"], &[]).expect_err("path missing");
    assert_eq!(
        err.to_string(),
        "Row with header 'path' expected to be in table but not found"
    );
    assert_eq!(
        RequestError::UnexpectedColumn(String::from("x")).to_string(),
        "Row with header 'x' is not allowed in table but found"
    );
    assert_eq!(RequestError::EmptyTable.to_string(), "Table should have at least one row.");
}

#[rstest]
fn column_count_checks_every_row() {
    let rows = vec![vec!["a", "b"], vec!["c", "d"]];
    assert!(verify_column_count(&rows, 2).is_ok());
    let ragged = vec![vec!["a", "b"], vec!["c"]];
    assert_eq!(
        verify_column_count(&ragged, 2),
        Err(RequestError::ColumnCount {
            expected: 2,
            found: 1
        })
    );
    let empty: Vec<Vec<&str>> = Vec::new();
    assert_eq!(verify_column_count(&empty, 2), Err(RequestError::EmptyTable));
}
