//! Lock tokens held per user and resource.

use std::collections::BTreeMap;

const DAV_NAMESPACE: &str = "DAV:";

/// `(user, path) -> token`; the latest lock wins.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LockTokens {
    tokens: BTreeMap<(String, String), String>,
}

impl LockTokens {
    /// Stores the token obtained by `user` for `path`.
    pub fn store(&mut self, user: &str, path: &str, token: impl Into<String>) {
        self.tokens
            .insert((user.to_owned(), path.to_owned()), token.into());
    }

    /// Token held by `user` for `path`.
    #[must_use]
    pub fn get(&self, user: &str, path: &str) -> Option<&str> {
        self.tokens
            .get(&(user.to_owned(), path.to_owned()))
            .map(String::as_str)
    }

    /// Forgets a token after a successful unlock.
    pub fn remove(&mut self, user: &str, path: &str) -> Option<String> {
        self.tokens.remove(&(user.to_owned(), path.to_owned()))
    }
}

/// Extracts the token from `//d:locktoken/d:href` in a LOCK response body.
#[must_use]
pub fn parse_lock_token(body: &str) -> Option<String> {
    let document = roxmltree::Document::parse(body).ok()?;
    document
        .descendants()
        .filter(|node| node.has_tag_name((DAV_NAMESPACE, "locktoken")))
        .flat_map(|node| node.children())
        .find(|node| node.has_tag_name((DAV_NAMESPACE, "href")))
        .and_then(|href| href.text())
        .map(|text| text.trim().to_owned())
}
