//! Ordered list of shares created in the scenario.

/// One created share.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShareRecord {
    /// Share or permission identifier.
    pub id: String,
    /// Public link token; `None` for user and group shares.
    pub token: Option<String>,
    /// Shared resource path.
    pub resource: String,
    /// Receiving user or group; `None` for link shares.
    pub sharee: Option<String>,
    /// Space holding the resource.
    pub space: Option<String>,
    /// Role or permission metadata.
    pub role: Option<String>,
}

/// Shares in creation order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ShareRegistry {
    shares: Vec<ShareRecord>,
}

impl ShareRegistry {
    /// Appends a created share.
    pub fn push(&mut self, record: ShareRecord) {
        self.shares.push(record);
    }

    /// Most recently created share of any kind.
    #[must_use]
    pub fn last(&self) -> Option<&ShareRecord> {
        self.shares.last()
    }

    /// Identifier of the most recent user or group share.
    #[must_use]
    pub fn last_user_group_share_id(&self) -> Option<&str> {
        self.shares
            .iter()
            .rev()
            .find(|share| share.token.is_none())
            .map(|share| share.id.as_str())
    }

    /// Token of the most recent public link share.
    #[must_use]
    pub fn last_public_share_token(&self) -> Option<&str> {
        self.shares
            .iter()
            .rev()
            .find_map(|share| share.token.as_deref())
    }

    /// Most recent share matching resource, sharee and space.
    #[must_use]
    pub fn find(&self, resource: &str, sharee: &str, space: &str) -> Option<&ShareRecord> {
        self.shares.iter().rev().find(|share| {
            share.resource == resource
                && share.sharee.as_deref() == Some(sharee)
                && share.space.as_deref() == Some(space)
        })
    }

    /// Removes every share with `id`, returning how many were dropped.
    pub fn remove(&mut self, id: &str) -> usize {
        let before = self.shares.len();
        self.shares.retain(|share| share.id != id);
        before - self.shares.len()
    }

    /// Number of recorded shares.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.shares.len()
    }

    /// Whether no share was recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}
