//! Created-user registry with separate local and remote maps.

use std::collections::BTreeMap;

use tracing::info;

use super::ServerTarget;

/// Bookkeeping for one created user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UserRecord {
    /// Login name as sent to the server.
    pub username: String,
    /// Current password.
    pub password: String,
    /// Display name, when known.
    pub display_name: Option<String>,
    /// Email address, when known.
    pub email: Option<String>,
    /// Server-side identifier, when created through the provisioning API.
    pub id: Option<String>,
    /// Whether cleanup should expect the user to still exist.
    pub should_exist: bool,
    /// Whether cleanup may delete the user.
    pub possible_to_delete: bool,
}

impl UserRecord {
    /// Creates a record for a user that is expected to exist.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            display_name: None,
            email: None,
            id: None,
            should_exist: true,
            possible_to_delete: true,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, value: impl Into<String>) -> Self {
        self.display_name = Some(value.into());
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, value: impl Into<String>) -> Self {
        self.email = Some(value.into());
        self
    }

    /// Sets the server-side identifier.
    #[must_use]
    pub fn with_id(mut self, value: Option<String>) -> Self {
        self.id = value;
        self
    }

    /// Sets the "should exist" flag.
    #[must_use]
    pub const fn expected_to_exist(mut self, value: bool) -> Self {
        self.should_exist = value;
        self
    }
}

/// Users created in this scenario, keyed by lowercase name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UserRegistry {
    local: BTreeMap<String, UserRecord>,
    remote: BTreeMap<String, UserRecord>,
}

fn key(user: &str) -> String {
    user.to_lowercase()
}

impl UserRegistry {
    fn map(&self, target: ServerTarget) -> &BTreeMap<String, UserRecord> {
        match target {
            ServerTarget::Local => &self.local,
            ServerTarget::Remote => &self.remote,
        }
    }

    fn map_mut(&mut self, target: ServerTarget) -> &mut BTreeMap<String, UserRecord> {
        match target {
            ServerTarget::Local => &mut self.local,
            ServerTarget::Remote => &mut self.remote,
        }
    }

    fn insert_into(map: &mut BTreeMap<String, UserRecord>, record: &UserRecord) {
        let slot = key(&record.username);
        let replace = record.should_exist || !map.contains_key(&slot);
        if replace {
            map.insert(slot, record.clone());
        }
    }

    /// Registers a user against `target`.
    ///
    /// The local target writes the local map only; the remote target writes
    /// both. An existing record is only replaced by one expected to exist.
    pub fn add(&mut self, target: ServerTarget, record: UserRecord) {
        info!(user = %record.username, server = %target, "registered user fixture");
        if target == ServerTarget::Remote {
            Self::insert_into(&mut self.remote, &record);
        }
        Self::insert_into(&mut self.local, &record);
    }

    /// Looks a user up in the local map, then the remote one.
    #[must_use]
    pub fn get(&self, user: &str) -> Option<&UserRecord> {
        let slot = key(user);
        self.local.get(&slot).or_else(|| self.remote.get(&slot))
    }

    /// Looks a user up in one target's map.
    #[must_use]
    pub fn get_in(&self, target: ServerTarget, user: &str) -> Option<&UserRecord> {
        self.map(target).get(&key(user))
    }

    /// Stored password of a created user.
    #[must_use]
    pub fn password_of(&self, user: &str) -> Option<&str> {
        self.get(user).map(|record| record.password.as_str())
    }

    /// Whether the user was created in this scenario on either target.
    #[must_use]
    pub fn contains(&self, user: &str) -> bool {
        self.get(user).is_some()
    }

    /// Records a password change on every map holding the user.
    pub fn remember_password(&mut self, user: &str, new_password: impl Into<String>) {
        let password = new_password.into();
        let slot = key(user);
        for target in ServerTarget::ALL {
            if let Some(record) = self.map_mut(target).get_mut(&slot) {
                record.password.clone_from(&password);
            }
        }
    }

    /// Records a display-name change on every map holding the user.
    pub fn remember_display_name(&mut self, user: &str, new_name: impl Into<String>) {
        let display_name = new_name.into();
        let slot = key(user);
        for target in ServerTarget::ALL {
            if let Some(record) = self.map_mut(target).get_mut(&slot) {
                record.display_name = Some(display_name.clone());
            }
        }
    }

    /// Moves a record to a new name, keeping everything else.
    pub fn rename(&mut self, old: &str, new: &str) {
        let old_slot = key(old);
        for target in ServerTarget::ALL {
            let map = self.map_mut(target);
            if let Some(mut record) = map.remove(&old_slot) {
                new.clone_into(&mut record.username);
                map.insert(key(new), record);
            }
        }
    }

    /// Marks a user as deleted mid-scenario so cleanup skips it.
    pub fn mark_not_expected_to_exist(&mut self, user: &str) {
        let slot = key(user);
        for target in ServerTarget::ALL {
            if let Some(record) = self.map_mut(target).get_mut(&slot) {
                record.should_exist = false;
            }
        }
    }

    /// Drops a user from one target's map.
    pub fn remove(&mut self, target: ServerTarget, user: &str) -> Option<UserRecord> {
        self.map_mut(target).remove(&key(user))
    }

    /// Records registered against `target`, ordered by key.
    pub fn iter(&self, target: ServerTarget) -> impl Iterator<Item = &UserRecord> {
        self.map(target).values()
    }

    /// Number of users registered against `target`.
    #[must_use]
    pub fn len(&self, target: ServerTarget) -> usize {
        self.map(target).len()
    }
}
