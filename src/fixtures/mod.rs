//! In-memory registries of entities created during a scenario.
//!
//! Every registry is owned by one [`Fixtures`] value held by the scenario
//! context, so nothing here is shared between scenarios. Users and groups
//! keep separate local and remote (federated) maps; the active
//! [`ServerTarget`] at registration time decides which one is written.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

mod cleanup;
mod groups;
mod locks;
mod shares;
mod spaces;
mod tus;
mod users;

pub use cleanup::{CleanupSummary, Janitor, SweepSummary, cleanup};
pub use groups::{GroupRecord, GroupRegistry};
pub use locks::{LockTokens, parse_lock_token};
pub use shares::{ShareRecord, ShareRegistry};
pub use spaces::{SpaceIdCache, is_nonexistent_user, personal_drive_id, space_id_from_propfind};
pub use tus::{TusLocations, filename_key};
pub use users::{UserRecord, UserRegistry};

/// Server a step is currently talking to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum ServerTarget {
    /// The server under test.
    #[default]
    Local,
    /// The federated peer.
    Remote,
}

impl ServerTarget {
    /// Both targets in cleanup order.
    pub const ALL: [Self; 2] = [Self::Local, Self::Remote];

    /// Name used in step text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Remote => "REMOTE",
        }
    }
}

impl fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerTarget {
    type Err = FixtureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "LOCAL" => Ok(Self::Local),
            "REMOTE" => Ok(Self::Remote),
            other => Err(FixtureError::UnknownServer(other.to_owned())),
        }
    }
}

/// Base URLs of both servers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerUrls {
    /// URL of the server under test.
    pub local: String,
    /// URL of the federated peer.
    pub remote: String,
}

impl ServerUrls {
    /// Creates the pair.
    #[must_use]
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }

    /// URL of `target`.
    #[must_use]
    pub fn get(&self, target: ServerTarget) -> &str {
        match target {
            ServerTarget::Local => &self.local,
            ServerTarget::Remote => &self.remote,
        }
    }
}

/// All per-scenario registries.
#[derive(Clone, Debug, Default)]
pub struct Fixtures {
    /// Created users.
    pub users: UserRegistry,
    /// Created groups.
    pub groups: GroupRegistry,
    /// Created shares, oldest first.
    pub shares: ShareRegistry,
    /// Held lock tokens.
    pub locks: LockTokens,
    /// TUS upload locations.
    pub tus: TusLocations,
    /// Personal space ids per user.
    pub spaces: SpaceIdCache,
}

impl Fixtures {
    /// Creates empty registries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Errors raised by fixture bookkeeping.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum FixtureError {
    /// Raised for a server name other than `LOCAL` or `REMOTE`.
    #[error("unknown server '{0}', expected LOCAL or REMOTE")]
    UnknownServer(String),
    /// Raised when a step refers to a fixture that was never registered.
    #[error("{kind} '{name}' was not created in this scenario")]
    Unknown {
        /// Fixture kind, for example `user`.
        kind: &'static str,
        /// Name the step used.
        name: String,
    },
    /// Raised when the server does not reveal a value the fixture needs.
    #[error("could not determine {what}: {message}")]
    Lookup {
        /// What was being looked up.
        what: String,
        /// Why it failed.
        message: String,
    },
    /// Raised when fixtures remain after a janitor sweep.
    #[error("fixtures remain after janitor sweep: {message}")]
    NotClean {
        /// Human-readable description of what remains.
        message: String,
    },
    /// Raised when the provisioning API cannot be reached.
    #[error("provisioning request failed: {0}")]
    Provisioning(String),
}
