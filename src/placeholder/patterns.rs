//! Regular expressions substituted for the `%…_pattern%` tokens.
//!
//! Space, file and share ids contain a `$`; the escapes below are meant to
//! survive one round of JSON string decoding inside schema documents.

/// UUID version 4.
pub const UUID_V4: &str =
    "[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-4[0-9A-Fa-f]{3}-[89ABab][0-9A-Fa-f]{3}-[0-9A-Fa-f]{12}";

/// Separator between storage and space halves of an id.
const SPACE_SEPARATOR: &str = r"\\$";

/// `storage$space`.
#[must_use]
pub fn space_id() -> String {
    format!("{UUID_V4}{SPACE_SEPARATOR}{UUID_V4}")
}

/// `uuid:uuid:uuid`.
#[must_use]
pub fn permissions_id() -> String {
    format!("{UUID_V4}:{UUID_V4}:{UUID_V4}")
}

/// `storage$space!node`.
#[must_use]
pub fn file_id() -> String {
    format!("{}!{UUID_V4}", space_id())
}

/// `storage$space!node:uuid:uuid`.
#[must_use]
pub fn share_id() -> String {
    format!("{}!{}", space_id(), permissions_id())
}

/// Quoted hexadecimal etag.
pub const ETAG: &str = r#"^\"[a-f0-9:.]{1,32}\"$"#;

/// Non-empty base64, the shape of federated user ids.
pub const FEDERATED_USER: &str = r"(?=(.{4})*$)[A-Za-z0-9+/]*={0,2}$";

/// Space id followed by a base64 node id.
#[must_use]
pub fn federated_file_id() -> String {
    format!("{}!(?=(.{{4}})*$)[A-Za-z0-9+/]*={{0,2}}", space_id())
}

/// Shape of the `X-Request-ID` header the harness sends.
#[must_use]
pub fn request_id(line_references: bool, hostname: &str) -> String {
    if line_references {
        String::from(r"/^[a-zA-Z]+\/[a-zA-Z]+\.feature:\d+(-\d+)?$/")
    } else {
        format!(r"/^{hostname}\/.*$/")
    }
}
