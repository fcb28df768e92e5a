//! Unit tests for the scenario context.

use std::time::Duration;

use super::*;
use crate::fixtures::ServerTarget;
use crate::poll::PollPolicy;
use crate::provisioning::GraphProvisioning;
use crate::request::{Auth, DavRequest, RequestBody};
use crate::response::OCS_STATUS_NOT_SET;
use crate::scenario::{FAILED_LOG, SCENARIO_LOG, ScenarioKind};
use crate::test_support::ScriptedTransport;
use rstest::rstest;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const LOCAL: &str = "https://localhost:9200";
const REMOTE: &str = "https://federated:10200";

type TestContext = ScenarioContext<ScriptedTransport, GraphProvisioning<ScriptedTransport>>;

fn config() -> HarnessConfig {
    let mut config = HarnessConfig::with_base_url(LOCAL);
    config.remote_base_url = Some(String::from(REMOTE));
    config
}

fn context_with(config: HarnessConfig, transport: &ScriptedTransport) -> TestContext {
    ScenarioContext::new(
        config,
        transport.clone(),
        GraphProvisioning::new(transport.clone(), "admin", "admin"),
    )
    .expect("context should build")
    .with_retry_policy(RetryPolicy::standard().with_delay(Duration::ZERO))
    .with_poll_policy(PollPolicy::standard().with_interval(Duration::ZERO))
    .with_hostname("runner")
}

/// Configuration writing scenario logs into `logs`.
fn logged_config(logs: &TempDir) -> HarnessConfig {
    let mut logged = config();
    logged.log_dir = logs.path().to_string_lossy().into_owned();
    logged
}

fn read_log(logs: &TempDir, name: &str) -> String {
    fs::read_to_string(logs.path().join(name)).unwrap_or_default()
}

fn context(transport: &ScriptedTransport) -> TestContext {
    context_with(config(), transport)
}

fn spaces_config() -> HarnessConfig {
    let mut spaces = config();
    spaces.dav_path_version = 3;
    spaces
}

fn get(url: &str) -> TestRequest {
    TestRequest::builder()
        .method("GET")
        .url(url)
        .build()
        .expect("request should build")
}

fn last_request(transport: &ScriptedTransport) -> TestRequest {
    transport
        .requests()
        .last()
        .cloned()
        .expect("a request was sent")
}

#[rstest]
fn invalid_configuration_is_rejected() {
    let mut broken = config();
    broken.dav_path_version = 7;
    let transport = ScriptedTransport::new();
    let result = ScenarioContext::new(
        broken,
        transport.clone(),
        GraphProvisioning::new(transport, "admin", "admin"),
    );
    assert!(matches!(result, Err(DispatchError::Config(_))));
}

#[rstest]
fn using_server_swaps_base_url() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    assert_eq!(ctx.base_url(), LOCAL);
    assert_eq!(ctx.using_server(ServerTarget::Remote), ServerTarget::Local);
    assert_eq!(ctx.base_url(), REMOTE);
    assert!(ctx.is_public_link_url(&format!("{REMOTE}/s/AbCdEfGhIjKlMnO")));
    assert!(!ctx.is_public_link_url(&format!("{LOCAL}/s/AbCdEfGhIjKlMnO")));
}

#[tokio::test]
async fn line_references_stamp_request_ids_when_enabled() {
    let transport = ScriptedTransport::new();
    let logs = TempDir::new().expect("tempdir");
    let mut enabled = logged_config(&logs);
    enabled.send_scenario_line_references = true;
    let mut ctx = context_with(enabled, &transport);
    ctx.begin_scenario(
        ScenarioKind::Scenario,
        "Create a user",
        "apiGraph/createUser.feature:10",
    )
    .expect("scenario starts");

    transport.push_status(200, "");
    ctx.send(get(&format!("{LOCAL}/a")), None).await.expect("sent");
    assert_eq!(
        last_request(&transport).header(REQUEST_ID_HEADER),
        Some("apiGraph/createUser.feature:10")
    );

    ctx.begin_step(12, "When", "the administrator creates user \"brian\"")
        .expect("step starts");
    transport.push_status(200, "");
    ctx.send(get(&format!("{LOCAL}/b")), None).await.expect("sent");
    assert_eq!(
        last_request(&transport).header(REQUEST_ID_HEADER),
        Some("apiGraph/createUser.feature:10-12")
    );
}

#[tokio::test]
async fn line_references_are_off_by_default() {
    let transport = ScriptedTransport::new();
    let logs = TempDir::new().expect("tempdir");
    let mut ctx = context_with(logged_config(&logs), &transport);
    ctx.begin_scenario(
        ScenarioKind::Scenario,
        "Create a user",
        "apiGraph/createUser.feature:10",
    )
    .expect("scenario starts");
    transport.push_status(200, "");
    ctx.send(get(&format!("{LOCAL}/a")), Some("alice"))
        .await
        .expect("sent");
    assert_eq!(last_request(&transport).header(REQUEST_ID_HEADER), None);
    assert_eq!(ctx.recorder().owner(), Some("alice"));
}

#[tokio::test]
async fn created_user_is_registered_with_default_password() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_json(201, &json!({"id": "user-1"}));

    ctx.user_has_been_created("alice", None)
        .await
        .expect("alice created");

    let record = ctx.fixtures().users.get("Alice").expect("registered");
    assert_eq!(record.password, "123456");
    assert_eq!(record.id.as_deref(), Some("user-1"));
    assert_eq!(record.display_name.as_deref(), Some("Alice Hansen"));
    assert_eq!(ctx.password_for("alice"), "123456");
    assert_eq!(ctx.recorder().owner(), Some("admin"));

    let request = last_request(&transport);
    assert_eq!(request.url, format!("{LOCAL}/graph/v1.0/users"));
    let RequestBody::Json(payload) = &request.body else {
        panic!("expected a JSON body, got {:?}", request.body);
    };
    assert_eq!(
        payload.get("onPremisesSamAccountName"),
        Some(&json!("alice"))
    );
}

#[tokio::test]
async fn explicit_password_marker_is_resolved() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_json(201, &json!({"id": "user-2"}));
    ctx.user_has_been_created("newbie", Some("%alt2%"))
        .await
        .expect("created");
    assert_eq!(ctx.password_for("newbie"), "AaBb2Cc3Dd4");
}

#[tokio::test]
async fn unexpected_status_fails_setup_without_registering() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_status(400, "bad request");

    let err = ctx
        .user_has_been_created("alice", None)
        .await
        .expect_err("setup fails");
    assert_eq!(
        err,
        DispatchError::Setup(AssertionError::Failed(String::from(
            "HTTP status code 400 is not the expected value 201"
        )))
    );
    assert!(ctx.fixtures().users.get("alice").is_none());
}

#[tokio::test]
async fn bulk_creation_registers_successes_and_reports_failures() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_json(201, &json!({"id": "a"}));
    transport.push_status(500, "");
    transport.push_json(201, &json!({"id": "c"}));

    let err = ctx
        .users_have_been_created(&["alice", "brian", "carol"])
        .await
        .expect_err("brian fails");
    let DispatchError::Batch { failures } = err else {
        panic!("expected batch error, got {err:?}");
    };
    assert_eq!(
        failures,
        ["creating user 'brian': HTTP status code 500 is not the expected value 201"]
    );
    assert!(ctx.fixtures().users.contains("alice"));
    assert!(!ctx.fixtures().users.contains("brian"));
    assert!(ctx.fixtures().users.contains("carol"));
}

#[tokio::test]
async fn table_rows_accumulate_codes_for_every_row() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_status(200, r#"{"ocs":{"meta":{"statuscode":100}}}"#);
    transport.push_status(404, "<html/>");
    transport.push_status(401, "");

    let rows = vec![
        get(&format!("{LOCAL}/ocs/v1.php/a")),
        get(&format!("{LOCAL}/ocs/v1.php/b")),
        get(&format!("{LOCAL}/ocs/v1.php/c")),
    ];
    ctx.send_table_rows(rows).await.expect("all rows sent");
    assert_eq!(ctx.recorder().http_status_codes(), ["200", "404", "401"]);
    assert_eq!(ctx.recorder().ocs_status_codes(), ["100", "notset", "notset"]);
}

#[tokio::test]
async fn table_rows_continue_after_a_failed_row() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_failure("connection refused");
    transport.push_status(200, "");

    let rows = vec![get(&format!("{LOCAL}/a")), get(&format!("{LOCAL}/b"))];
    let err = ctx.send_table_rows(rows).await.expect_err("first row fails");
    assert!(matches!(err, DispatchError::Batch { ref failures } if failures.len() == 1));
    assert_eq!(ctx.recorder().http_status_codes(), [OCS_STATUS_NOT_SET, "200"]);
    assert_eq!(
        ctx.recorder().ocs_status_codes(),
        [OCS_STATUS_NOT_SET, OCS_STATUS_NOT_SET]
    );
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn last_response_assertions_use_recorder() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    assert!(matches!(
        ctx.assert_last_status(200),
        Err(DispatchError::Assertion(AssertionError::NoResponse))
    ));
    transport.push_status(200, r#"{"ocs":{"meta":{"statuscode":100}}}"#);
    ctx.send(get(&format!("{LOCAL}/ocs/v1.php/x")), None)
        .await
        .expect("sent");
    ctx.assert_last_status(200).expect("status matches");
    ctx.assert_last_ocs_status("100,102").expect("ocs matches");
    assert!(ctx.assert_last_status(201).is_err());
}

#[tokio::test]
async fn substitution_uses_the_named_user() {
    let transport = ScriptedTransport::new();
    let ctx = context(&transport);
    let text = ctx
        .substitute("%username%:%password%@%base_url_without_scheme%", Some("brian"))
        .await
        .expect("substituted");
    assert_eq!(text, "brian:1234@localhost:9200");
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn spaces_requests_resolve_personal_space_once() {
    let transport = ScriptedTransport::new();
    let mut ctx = context_with(spaces_config(), &transport);
    transport.push_json(
        200,
        &json!({"value": [{"driveType": "personal", "id": "storage$alice"}]}),
    );
    transport.push_status(201, "");
    transport.push_status(201, "");

    let upload = DavRequest::new("alice", "123456", "PUT", "/a.txt").body(RequestBody::text("x"));
    ctx.send_dav(&upload).await.expect("first upload");
    ctx.send_dav(&upload).await.expect("second upload");

    let urls: Vec<String> = transport
        .requests()
        .iter()
        .map(|request| request.url.clone())
        .collect();
    assert_eq!(
        urls,
        [
            format!("{LOCAL}/graph/v1.0/me/drives"),
            format!("{LOCAL}/remote.php/dav/spaces/storage$alice/a.txt"),
            format!("{LOCAL}/remote.php/dav/spaces/storage$alice/a.txt"),
        ]
    );
}

#[tokio::test]
async fn space_lookup_falls_back_to_propfind() {
    let transport = ScriptedTransport::new();
    let mut ctx = context_with(spaces_config(), &transport);
    transport.push_status(404, "");
    transport.push_status(
        207,
        concat!(
            r#"<d:multistatus xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns">"#,
            "<d:response><d:propstat><d:prop><oc:spaceid>space-9</oc:spaceid>",
            "</d:prop></d:propstat></d:response></d:multistatus>"
        ),
    );

    let id = ctx.personal_space_id("brian").await.expect("space found");
    assert_eq!(id, "space-9");
    let request = last_request(&transport);
    assert_eq!(request.method, "PROPFIND");
    assert_eq!(request.url, format!("{LOCAL}/remote.php/dav/files/brian/"));
    assert_eq!(request.header("Depth"), Some("0"));
}

#[tokio::test]
async fn missing_space_is_a_lookup_error() {
    let transport = ScriptedTransport::new();
    let mut ctx = context_with(spaces_config(), &transport);
    transport.push_status(404, "");
    transport.push_status(404, "");
    let err = ctx.personal_space_id("brian").await.expect_err("no space");
    assert!(matches!(
        err,
        DispatchError::Fixture(FixtureError::Lookup { .. })
    ));
}

#[tokio::test]
async fn nonexistent_users_get_a_fabricated_space() {
    let transport = ScriptedTransport::new();
    let mut ctx = context_with(spaces_config(), &transport);
    let id = ctx
        .personal_space_id("nonexistentuser")
        .await
        .expect("fabricated");
    assert_eq!(id.len(), 36);
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn lock_tokens_are_kept_and_presented_on_unlock() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_status(
        200,
        concat!(
            r#"<d:prop xmlns:d="DAV:"><d:lockdiscovery><d:activelock>"#,
            "<d:locktoken><d:href>opaquelocktoken:abc</d:href></d:locktoken>",
            "</d:activelock></d:lockdiscovery></d:prop>"
        ),
    );
    let rows = vec![
        (String::from("lockscope"), String::from("exclusive")),
        (String::from("timeout"), String::from("Second-3600")),
    ];
    ctx.lock("alice", "/a.txt", &rows).await.expect("locked");
    let lock = last_request(&transport);
    assert_eq!(lock.method, "LOCK");
    assert_eq!(lock.header("Timeout"), Some("Second-3600"));
    assert_eq!(
        ctx.fixtures().locks.get("alice", "/a.txt"),
        Some("opaquelocktoken:abc")
    );

    transport.push_status(204, "");
    ctx.unlock("alice", "/a.txt").await.expect("unlocked");
    let unlock = last_request(&transport);
    assert_eq!(unlock.method, "UNLOCK");
    assert_eq!(unlock.header("Lock-Token"), Some("<opaquelocktoken:abc>"));

    let err = ctx.unlock("alice", "/a.txt").await.expect_err("no lock left");
    assert!(matches!(
        err,
        DispatchError::Fixture(FixtureError::Unknown { kind: "lock", .. })
    ));
}

#[tokio::test]
async fn tus_upload_location_is_remembered_and_chunks_patch_it() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_response(
        crate::response::HttpResponse::new(201, "")
            .with_header("Location", format!("{LOCAL}/data/upload-1")),
    );
    let headers = vec![
        (String::from("Upload-Length"), String::from("5")),
        (String::from("Upload-Metadata"), String::from("filename dGV4dC50eHQ=")),
    ];
    ctx.create_tus_upload("alice", "text.txt", &headers)
        .await
        .expect("created");
    let creation = last_request(&transport);
    assert_eq!(creation.method, "POST");
    assert_eq!(creation.url, format!("{LOCAL}/remote.php/dav/files/alice/"));
    assert_eq!(creation.header("Tus-Resumable"), Some("1.0.0"));
    assert_eq!(creation.header("Upload-Length"), Some("5"));

    let location = ctx
        .fixtures()
        .tus
        .latest_for("text.txt")
        .map(str::to_owned)
        .expect("location recorded");
    transport.push_status(204, "");
    ctx.send_tus_chunk("alice", &location, 0, b"hello", Some("SHA1 abc"))
        .await
        .expect("chunk sent");
    let chunk = last_request(&transport);
    assert_eq!(chunk.method, "PATCH");
    assert_eq!(chunk.url, format!("{LOCAL}/data/upload-1"));
    assert_eq!(chunk.header("Upload-Offset"), Some("0"));
    assert_eq!(chunk.header("Upload-Checksum"), Some("SHA1 abc"));
    assert_eq!(
        chunk.header("Content-Type"),
        Some("application/offset+octet-stream")
    );
    assert_eq!(
        chunk.auth,
        Auth::Basic {
            username: String::from("alice"),
            password: String::from("123456"),
        }
    );
}

#[tokio::test]
async fn after_scenario_cleans_up_and_resets() {
    let transport = ScriptedTransport::new();
    let logs = TempDir::new().expect("tempdir");
    let mut ctx = context_with(logged_config(&logs), &transport);
    transport.push_json(201, &json!({"id": "u"}));
    ctx.user_has_been_created("alice", None)
        .await
        .expect("created");
    ctx.using_server(ServerTarget::Remote);
    ctx.begin_scenario(ScenarioKind::Scenario, "Cleanup", "apiGraph/a.feature:1")
        .expect("scenario starts");

    transport.push_status(204, "");
    transport.push_status(404, "");
    let summary = ctx.after_scenario(false).await;
    assert!(summary.is_clean(), "{summary:?}");
    assert_eq!(summary.deleted_users, 1);
    assert!(ctx.recorder().get().is_none());
    assert_eq!(ctx.target(), ServerTarget::Local);
    assert!(ctx.fixtures().users.get("alice").is_none());
}

#[tokio::test]
async fn deleted_users_are_skipped_by_cleanup() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_json(201, &json!({"id": "u"}));
    transport.push_status(204, "");
    ctx.user_has_been_created("alice", None)
        .await
        .expect("created");
    ctx.user_has_been_deleted("alice").await.expect("deleted");

    let summary = ctx.after_scenario(false).await;
    assert_eq!(summary.deleted_users, 0);
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn groups_are_deleted_by_recorded_id() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_json(201, &json!({"id": "grp-id"}));
    ctx.group_has_been_created("grp1").await.expect("created");
    transport.push_status(204, "");
    ctx.delete_group("grp1").await.expect("deleted");
    assert_eq!(
        last_request(&transport).url,
        format!("{LOCAL}/graph/v1.0/groups/grp-id")
    );
    transport.push_status(404, "");
    assert!(!ctx.group_exists("grp1").await.expect("probe"));
}

#[tokio::test]
async fn scenario_log_records_steps_and_exchanges() {
    let transport = ScriptedTransport::new();
    let logs = TempDir::new().expect("tempdir");
    let mut ctx = context_with(logged_config(&logs), &transport);
    ctx.begin_scenario(ScenarioKind::Scenario, "Fetch a file", "apiGraph/a.feature:1")
        .expect("scenario starts");
    ctx.begin_step(3, "When", "user \"alice\" downloads a file")
        .expect("step starts");
    transport.push_status(200, "file body");
    ctx.send(get(&format!("{LOCAL}/a")), None).await.expect("sent");

    let log = read_log(&logs, SCENARIO_LOG);
    assert!(log.starts_with("## Scenario: Fetch a file (apiGraph/a.feature:1)\n"), "{log}");
    assert!(log.contains("\t### When user \"alice\" downloads a file\n"), "{log}");
    assert!(log.contains(&format!(">>> GET {LOCAL}/a")), "{log}");
    assert!(log.contains("<<< 200\nfile body\n"), "{log}");
}

#[tokio::test]
async fn provisioning_requests_are_logged_and_stamped() {
    let transport = ScriptedTransport::new();
    let logs = TempDir::new().expect("tempdir");
    let mut logged = logged_config(&logs);
    logged.send_scenario_line_references = true;
    let mut ctx = context_with(logged, &transport);
    ctx.begin_scenario(ScenarioKind::Scenario, "Create", "apiGraph/createUser.feature:5")
        .expect("scenario starts");
    ctx.begin_step(7, "Given", "user \"alice\" has been created")
        .expect("step starts");

    transport.push_json(201, &json!({"id": "user-1"}));
    ctx.user_has_been_created("alice", None)
        .await
        .expect("created");
    transport.push_status(200, "{}");
    assert!(ctx.user_exists("alice").await.expect("probed"));

    for request in transport.requests() {
        assert_eq!(
            request.header(REQUEST_ID_HEADER),
            Some("apiGraph/createUser.feature:5-7")
        );
    }
    let log = read_log(&logs, SCENARIO_LOG);
    assert!(log.contains(&format!(">>> POST {LOCAL}/graph/v1.0/users")), "{log}");
    assert!(log.contains(&format!(">>> GET {LOCAL}/graph/v1.0/users/alice")), "{log}");
}

#[tokio::test]
async fn user_creation_resends_while_the_server_is_busy() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_status(425, "");
    transport.push_status(409, "");
    transport.push_json(201, &json!({"id": "user-1"}));

    ctx.user_has_been_created("alice", None)
        .await
        .expect("created after resends");
    assert_eq!(transport.requests().len(), 3);
    assert_eq!(ctx.recorder().get().map(|response| response.status), Some(201));
    assert!(ctx.fixtures().users.contains("alice"));
}

#[tokio::test]
async fn plain_user_creation_does_not_resend_conflicts() {
    let transport = ScriptedTransport::new();
    let mut ctx = context(&transport);
    transport.push_status(425, "");
    transport.push_status(409, "");

    let response = ctx.create_user("alice", None).await.expect("sent");
    assert_eq!(response.status, 409);
    assert_eq!(transport.requests().len(), 2);
    assert!(!ctx.fixtures().users.contains("alice"));
}

#[rstest]
#[case::unexpected_failure(true, "", true)]
#[case::passing_scenario(false, "", false)]
#[case::listed_failure(true, "- [apiGraph/a.feature:1](https://example.org/1)\n", false)]
#[tokio::test]
async fn failed_log_keeps_only_unexpected_failures(
    #[case] failed: bool,
    #[case] manifest: &str,
    #[case] kept: bool,
) {
    let transport = ScriptedTransport::new();
    let logs = TempDir::new().expect("tempdir");
    let manifest_path = logs.path().join("expected-failures.md");
    fs::write(&manifest_path, manifest).expect("write manifest");
    let mut logged = logged_config(&logs);
    logged.expected_failures_file = Some(manifest_path.to_string_lossy().into_owned());
    let mut ctx = context_with(logged, &transport);
    ctx.begin_scenario(ScenarioKind::Scenario, "Flaky", "apiGraph/a.feature:1")
        .expect("scenario starts");
    transport.push_status(500, "boom");
    ctx.send(get(&format!("{LOCAL}/a")), None).await.expect("sent");

    ctx.after_scenario(failed).await;
    let failed_log = read_log(&logs, FAILED_LOG);
    assert_eq!(failed_log.contains("## Scenario: Flaky (apiGraph/a.feature:1)"), kept);
    assert_eq!(failed_log.contains("<<< 500"), kept);
}

#[tokio::test]
async fn missing_expected_failures_manifest_fails_the_scenario_start() {
    let transport = ScriptedTransport::new();
    let logs = TempDir::new().expect("tempdir");
    let mut logged = logged_config(&logs);
    logged.expected_failures_file = Some(
        logs.path()
            .join("absent.md")
            .to_string_lossy()
            .into_owned(),
    );
    let mut ctx = context_with(logged, &transport);
    let err = ctx
        .begin_scenario(ScenarioKind::Scenario, "Any", "apiGraph/a.feature:1")
        .expect_err("manifest is missing");
    assert!(matches!(err, DispatchError::ScenarioLog(_)), "{err:?}");
}
