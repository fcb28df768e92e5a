//! Created-group registry with separate local and remote maps.

use std::collections::BTreeMap;

use tracing::info;

use super::ServerTarget;

/// Bookkeeping for one created group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GroupRecord {
    /// Group display name.
    pub name: String,
    /// Whether cleanup should expect the group to still exist.
    pub should_exist: bool,
    /// Whether cleanup may delete the group.
    pub possible_to_delete: bool,
    /// Identifier returned by the provisioning API.
    pub id: Option<String>,
}

impl GroupRecord {
    /// Creates a deletable record expected to exist.
    #[must_use]
    pub fn new(name: impl Into<String>, id: Option<String>) -> Self {
        Self {
            name: name.into(),
            should_exist: true,
            possible_to_delete: true,
            id,
        }
    }
}

/// Groups created in this scenario.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct GroupRegistry {
    local: BTreeMap<String, GroupRecord>,
    remote: BTreeMap<String, GroupRecord>,
}

impl GroupRegistry {
    fn map(&self, target: ServerTarget) -> &BTreeMap<String, GroupRecord> {
        match target {
            ServerTarget::Local => &self.local,
            ServerTarget::Remote => &self.remote,
        }
    }

    fn map_mut(&mut self, target: ServerTarget) -> &mut BTreeMap<String, GroupRecord> {
        match target {
            ServerTarget::Local => &mut self.local,
            ServerTarget::Remote => &mut self.remote,
        }
    }

    /// Registers a group against `target`; the remote target writes both
    /// maps.
    pub fn add(&mut self, target: ServerTarget, record: GroupRecord) {
        info!(group = %record.name, server = %target, "registered group fixture");
        if target == ServerTarget::Remote {
            self.remote.insert(record.name.clone(), record.clone());
        }
        self.local.insert(record.name.clone(), record);
    }

    /// Looks a group up in the local map, then the remote one.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&GroupRecord> {
        self.local.get(name).or_else(|| self.remote.get(name))
    }

    /// Identifier of a created group.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|record| record.id.as_deref())
    }

    /// Marks a group as deleted mid-scenario so cleanup skips it.
    pub fn mark_not_expected_to_exist(&mut self, name: &str) {
        for target in ServerTarget::ALL {
            if let Some(record) = self.map_mut(target).get_mut(name) {
                record.should_exist = false;
            }
        }
    }

    /// Drops a group from one target's map.
    pub fn remove(&mut self, target: ServerTarget, name: &str) -> Option<GroupRecord> {
        self.map_mut(target).remove(name)
    }

    /// Records registered against `target`.
    pub fn iter(&self, target: ServerTarget) -> impl Iterator<Item = &GroupRecord> {
        self.map(target).values()
    }
}
