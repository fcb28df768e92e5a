//! Personal space id cache and the parsers feeding it.

use std::collections::BTreeMap;

use serde_json::Value;

const DAV_NAMESPACE: &str = "DAV:";
const OC_NAMESPACE: &str = "http://owncloud.org/ns";

/// Cached personal space ids, keyed by user.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SpaceIdCache {
    ids: BTreeMap<String, String>,
}

impl SpaceIdCache {
    /// Cached id for `user`.
    #[must_use]
    pub fn get(&self, user: &str) -> Option<&str> {
        self.ids.get(user).map(String::as_str)
    }

    /// Caches an id.
    pub fn insert(&mut self, user: &str, id: impl Into<String>) {
        self.ids.insert(user.to_owned(), id.into());
    }
}

/// Users whose names announce they do not exist get a fabricated id.
#[must_use]
pub fn is_nonexistent_user(user: &str) -> bool {
    let lowered = user.to_lowercase();
    lowered.starts_with("non-exist") || lowered.starts_with("nonexist")
}

/// Finds the `personal` drive in a Graph `me/drives` listing.
#[must_use]
pub fn personal_drive_id(listing: &Value) -> Option<String> {
    listing
        .get("value")?
        .as_array()?
        .iter()
        .find(|drive| drive.get("driveType").and_then(Value::as_str) == Some("personal"))
        .and_then(|drive| drive.get("id"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// Reads `oc:spaceid` from the first response of a PROPFIND multistatus.
#[must_use]
pub fn space_id_from_propfind(body: &str) -> Option<String> {
    let document = roxmltree::Document::parse(body).ok()?;
    let response = document
        .descendants()
        .find(|node| node.has_tag_name((DAV_NAMESPACE, "response")))?;
    response
        .descendants()
        .find(|node| node.has_tag_name((OC_NAMESPACE, "spaceid")))
        .and_then(|node| node.text())
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}
