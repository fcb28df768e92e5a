//! Resolution of symbolic user and password references.
//!
//! Steps refer to users by fixture names (`Alice`, `%admin%`) and to
//! passwords by markers (`%regular%`, `%alt1%`). [`CredentialResolver`] maps
//! both to the concrete values for the current environment, consulting the
//! created-user registry and the optional replacement manifest first.

use camino::Utf8Path;
use thiserror::Error;

use crate::config::HarnessConfig;
use crate::fixtures::UserRegistry;

mod replacements;

pub use replacements::{Replacement, UsernameReplacements};

/// Marker that resolves to the configured administrator.
pub const ADMIN_MARKER: &str = "%admin%";

/// Symbolic password markers understood in step arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PasswordMarker {
    /// `%regular%`, the default password of ordinary users.
    Regular,
    /// `%alt1%`.
    Alt1,
    /// `%alt2%`.
    Alt2,
    /// `%alt3%`.
    Alt3,
    /// `%alt4%`.
    Alt4,
    /// `%subadmin%`.
    SubAdmin,
    /// `%admin%`.
    Admin,
    /// `%altadmin%`.
    AltAdmin,
    /// `%public%`, the public link share password.
    Public,
    /// `%remove%`, an empty password.
    Remove,
}

impl PasswordMarker {
    /// Parses a marker, returning `None` for a literal password.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "%regular%" => Some(Self::Regular),
            "%alt1%" => Some(Self::Alt1),
            "%alt2%" => Some(Self::Alt2),
            "%alt3%" => Some(Self::Alt3),
            "%alt4%" => Some(Self::Alt4),
            "%subadmin%" => Some(Self::SubAdmin),
            "%admin%" => Some(Self::Admin),
            "%altadmin%" => Some(Self::AltAdmin),
            "%public%" => Some(Self::Public),
            "%remove%" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// Fixed fixture users with known display names and passwords.
struct WellKnownUser {
    name: &'static str,
    display_name: &'static str,
    password: PasswordMarker,
}

const WELL_KNOWN_USERS: [WellKnownUser; 9] = [
    WellKnownUser {
        name: "regularuser",
        display_name: "Regular User",
        password: PasswordMarker::Regular,
    },
    WellKnownUser {
        name: "alice",
        display_name: "Alice Hansen",
        password: PasswordMarker::Regular,
    },
    WellKnownUser {
        name: "brian",
        display_name: "Brian Murphy",
        password: PasswordMarker::Alt1,
    },
    WellKnownUser {
        name: "carol",
        display_name: "Carol King",
        password: PasswordMarker::Alt2,
    },
    WellKnownUser {
        name: "david",
        display_name: "David Lopez",
        password: PasswordMarker::Alt3,
    },
    WellKnownUser {
        name: "emily",
        display_name: "Emily Wagner",
        password: PasswordMarker::Alt4,
    },
    WellKnownUser {
        name: "usergrp",
        display_name: "User Grp",
        password: PasswordMarker::Regular,
    },
    WellKnownUser {
        name: "sharee1",
        display_name: "Sharee One",
        password: PasswordMarker::Regular,
    },
    WellKnownUser {
        name: "sharee2",
        display_name: "Sharee Two",
        password: PasswordMarker::Regular,
    },
];

fn well_known(user: &str) -> Option<&'static WellKnownUser> {
    let lowered = user.to_lowercase();
    WELL_KNOWN_USERS.iter().find(|entry| entry.name == lowered)
}

/// Concrete passwords behind each marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PasswordSet {
    regular: String,
    alt: [String; 4],
    sub_admin: String,
    admin: String,
    alt_admin: String,
    public: String,
}

impl PasswordSet {
    /// Collects the marker passwords from configuration.
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            regular: config.regular_user_password.clone(),
            alt: [
                config.alt1_user_password.clone(),
                config.alt2_user_password.clone(),
                config.alt3_user_password.clone(),
                config.alt4_user_password.clone(),
            ],
            sub_admin: config.sub_admin_password.clone(),
            admin: config.admin_password.clone(),
            alt_admin: config.alt_admin_password.clone(),
            public: config.public_link_share_password.clone(),
        }
    }

    /// Returns the password behind `marker`.
    #[must_use]
    pub fn get(&self, marker: PasswordMarker) -> &str {
        let [alt1, alt2, alt3, alt4] = &self.alt;
        match marker {
            PasswordMarker::Regular => &self.regular,
            PasswordMarker::Alt1 => alt1,
            PasswordMarker::Alt2 => alt2,
            PasswordMarker::Alt3 => alt3,
            PasswordMarker::Alt4 => alt4,
            PasswordMarker::SubAdmin => &self.sub_admin,
            PasswordMarker::Admin => &self.admin,
            PasswordMarker::AltAdmin => &self.alt_admin,
            PasswordMarker::Public => &self.public,
            PasswordMarker::Remove => "",
        }
    }
}

/// Maps symbolic users and passwords to concrete credentials.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CredentialResolver {
    admin_username: String,
    passwords: PasswordSet,
    replacements: UsernameReplacements,
}

impl CredentialResolver {
    /// Creates a resolver from configuration and an already-loaded manifest.
    #[must_use]
    pub fn new(config: &HarnessConfig, replacements: UsernameReplacements) -> Self {
        Self {
            admin_username: config.admin_username.clone(),
            passwords: PasswordSet::from_config(config),
            replacements,
        }
    }

    /// Creates a resolver, loading the replacement manifest when one is
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when a configured manifest cannot be read
    /// or parsed.
    pub fn from_config(config: &HarnessConfig) -> Result<Self, CredentialError> {
        let replacements = match config.usernames_file.as_deref() {
            Some(path) if !path.trim().is_empty() => {
                UsernameReplacements::load(Utf8Path::new(path.trim()))?
            }
            _ => UsernameReplacements::empty(),
        };
        Ok(Self::new(config, replacements))
    }

    /// Configured administrator login name.
    #[must_use]
    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    /// Configured administrator password.
    #[must_use]
    pub fn admin_password(&self) -> &str {
        self.passwords.get(PasswordMarker::Admin)
    }

    /// Marker passwords.
    #[must_use]
    pub const fn passwords(&self) -> &PasswordSet {
        &self.passwords
    }

    /// Resolves a symbolic user to the login name used on the wire.
    #[must_use]
    pub fn username(&self, symbolic: &str) -> String {
        if symbolic == ADMIN_MARKER {
            return self.admin_username.clone();
        }
        self.replacements
            .lookup(symbolic)
            .and_then(|entry| entry.username.clone())
            .unwrap_or_else(|| symbolic.to_owned())
    }

    /// Resolves a password marker; literal passwords pass through.
    #[must_use]
    pub fn password(&self, symbolic: &str) -> String {
        PasswordMarker::parse(symbolic).map_or_else(
            || symbolic.to_owned(),
            |marker| self.passwords.get(marker).to_owned(),
        )
    }

    /// Returns the password a user authenticates with.
    ///
    /// Checks the administrator, then created fixtures (local before remote),
    /// then the replacement manifest, then the well-known fixture table, and
    /// finally falls back to the regular password. User names compare
    /// case-insensitively.
    #[must_use]
    pub fn password_for_user(&self, user: &str, created: &UserRegistry) -> String {
        let actual = self.username(user).to_lowercase();
        if actual == self.admin_username.to_lowercase() {
            return self.admin_password().to_owned();
        }
        if let Some(password) = created.password_of(&actual) {
            return password.to_owned();
        }
        if let Some(password) = self
            .replacements
            .lookup(user)
            .and_then(|entry| entry.password.clone())
        {
            return password;
        }
        let marker = well_known(&actual).map_or(PasswordMarker::Regular, |entry| entry.password);
        self.passwords.get(marker).to_owned()
    }

    /// Display name of a well-known or replaced user, if any.
    #[must_use]
    pub fn display_name_for_user(&self, user: &str) -> Option<String> {
        self.replacements
            .lookup(user)
            .and_then(|entry| entry.displayname.clone())
            .or_else(|| well_known(user).map(|entry| entry.display_name.to_owned()))
    }

    /// Email of a well-known or replaced user, if any.
    #[must_use]
    pub fn email_for_user(&self, user: &str) -> Option<String> {
        self.replacements
            .lookup(user)
            .and_then(|entry| entry.email.clone())
            .or_else(|| well_known(user).map(|entry| format!("{}@example.org", entry.name)))
    }

    /// Display name used when creating a user without one: the well-known
    /// name, otherwise the regular user's.
    #[must_use]
    pub fn default_display_name(&self, user: &str) -> String {
        self.display_name_for_user(user)
            .or_else(|| self.display_name_for_user("regularuser"))
            .unwrap_or_else(|| user.to_owned())
    }

    /// Email used when creating a user without one: the well-known address,
    /// otherwise `<user>@owncloud.com` with `@` and spaces removed.
    #[must_use]
    pub fn default_email(&self, user: &str) -> String {
        self.email_for_user(user).unwrap_or_else(|| {
            let local: String = user.chars().filter(|ch| *ch != '@' && *ch != ' ').collect();
            format!("{local}@owncloud.com")
        })
    }
}

/// Errors raised while loading credential data.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum CredentialError {
    /// Raised when the replacement manifest cannot be read.
    #[error("failed to read usernames manifest {path}: {message}")]
    Manifest {
        /// Manifest path.
        path: String,
        /// Underlying I/O error.
        message: String,
    },
    /// Raised when the replacement manifest is not valid JSON.
    #[error("failed to parse usernames manifest {path}: {message}")]
    Parse {
        /// Manifest path.
        path: String,
        /// Parser error.
        message: String,
    },
}
