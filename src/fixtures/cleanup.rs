//! End-of-scenario cleanup and the out-of-band janitor sweep.

use tracing::{info, warn};

use crate::provisioning::Provisioning;
use crate::response::HttpResponse;
use crate::transport::TransportError;

use super::{FixtureError, Fixtures, ServerTarget, ServerUrls};

const STATUS_NOT_FOUND: u16 = 404;

/// Outcome of best-effort scenario cleanup.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CleanupSummary {
    /// Users deleted.
    pub deleted_users: usize,
    /// Groups deleted.
    pub deleted_groups: usize,
    /// Deletions that failed for a reason other than "already gone".
    pub failures: Vec<String>,
    /// Fixtures still present after cleanup.
    pub survivors: Vec<String>,
}

impl CleanupSummary {
    /// Whether every deletion succeeded and nothing survived.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.survivors.is_empty()
    }
}

enum Deletion {
    Deleted,
    AlreadyGone,
    Failed(String),
}

fn classify(outcome: Result<HttpResponse, TransportError>) -> Deletion {
    match outcome {
        Ok(response) if response.status == STATUS_NOT_FOUND => Deletion::AlreadyGone,
        Ok(response) if !response.is_failure() => Deletion::Deleted,
        Ok(response) => Deletion::Failed(format!(
            "status {} with body '{}'",
            response.status,
            response.text()
        )),
        Err(err) => Deletion::Failed(err.to_string()),
    }
}

/// Deletes every registered user and deletable group on both targets, then
/// re-queries the server and reports survivors. Never fails: problems are
/// logged and collected in the summary. The registries are emptied.
pub async fn cleanup<P: Provisioning + ?Sized>(
    provisioning: &P,
    fixtures: &mut Fixtures,
    urls: &ServerUrls,
) -> CleanupSummary {
    let mut summary = CleanupSummary::default();
    for target in ServerTarget::ALL {
        let base_url = urls.get(target);
        let users = fixtures
            .users
            .iter(target)
            .filter(|user| user.should_exist && user.possible_to_delete)
            .map(|user| user.username.clone())
            .collect::<Vec<_>>();
        for username in &users {
            match classify(provisioning.delete_user(base_url, username).await) {
                Deletion::Deleted => summary.deleted_users += 1,
                Deletion::AlreadyGone => {}
                Deletion::Failed(message) => {
                    warn!(user = %username, server = %target, %message, "could not delete user");
                    summary
                        .failures
                        .push(format!("INFORMATION: could not delete user '{username}' on {target}: {message}"));
                }
            }
        }

        let groups = fixtures
            .groups
            .iter(target)
            .filter(|group| group.should_exist && group.possible_to_delete)
            .map(|group| (group.name.clone(), group.id.clone()))
            .collect::<Vec<_>>();
        for (name, id) in &groups {
            let handle = id.as_deref().unwrap_or(name);
            match classify(provisioning.delete_group(base_url, handle).await) {
                Deletion::Deleted => summary.deleted_groups += 1,
                Deletion::AlreadyGone => {}
                Deletion::Failed(message) => {
                    warn!(group = %name, server = %target, %message, "could not delete group");
                    summary
                        .failures
                        .push(format!("INFORMATION: could not delete group '{name}' on {target}: {message}"));
                }
            }
        }

        for username in &users {
            if matches!(provisioning.user_exists(base_url, username).await, Ok(true)) {
                summary.survivors.push(format!("user '{username}' on {target}"));
            }
        }
        for (name, _) in &groups {
            if matches!(provisioning.group_exists(base_url, name).await, Ok(true)) {
                summary.survivors.push(format!("group '{name}' on {target}"));
            }
        }
    }
    *fixtures = Fixtures::default();
    info!(
        deleted_users = summary.deleted_users,
        deleted_groups = summary.deleted_groups,
        failures = summary.failures.len(),
        survivors = summary.survivors.len(),
        "scenario cleanup finished"
    );
    summary
}

/// Summary of a janitor sweep.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SweepSummary {
    /// Number of users deleted during the sweep.
    pub deleted_users: usize,
    /// Number of groups deleted during the sweep.
    pub deleted_groups: usize,
}

/// Deletes named users and groups out of band, failing if any remain.
#[derive(Clone, Debug)]
pub struct Janitor<P> {
    provisioning: P,
    base_url: String,
}

impl<P: Provisioning> Janitor<P> {
    /// Creates a janitor for the server at `base_url`.
    #[must_use]
    pub fn new(provisioning: P, base_url: impl Into<String>) -> Self {
        Self {
            provisioning,
            base_url: base_url.into(),
        }
    }

    /// Deletes `users` then `groups` and verifies none remain.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Provisioning`] when a request fails or a
    /// deletion is refused, and [`FixtureError::NotClean`] when anything
    /// remains afterwards.
    pub async fn sweep(
        &self,
        users: &[String],
        groups: &[String],
    ) -> Result<SweepSummary, FixtureError> {
        let mut deleted_users = 0;
        for user in users {
            match classify(self.provisioning.delete_user(&self.base_url, user).await) {
                Deletion::Deleted => deleted_users += 1,
                Deletion::AlreadyGone => {}
                Deletion::Failed(message) => {
                    return Err(FixtureError::Provisioning(format!(
                        "deleting user '{user}': {message}"
                    )));
                }
            }
        }

        let mut deleted_groups = 0;
        for group in groups {
            match classify(self.provisioning.delete_group(&self.base_url, group).await) {
                Deletion::Deleted => deleted_groups += 1,
                Deletion::AlreadyGone => {}
                Deletion::Failed(message) => {
                    return Err(FixtureError::Provisioning(format!(
                        "deleting group '{group}': {message}"
                    )));
                }
            }
        }

        let mut remaining_users = 0;
        for user in users {
            if self.exists(self.provisioning.user_exists(&self.base_url, user).await)? {
                remaining_users += 1;
            }
        }
        let mut remaining_groups = 0;
        for group in groups {
            if self.exists(self.provisioning.group_exists(&self.base_url, group).await)? {
                remaining_groups += 1;
            }
        }

        if remaining_users > 0 || remaining_groups > 0 {
            return Err(FixtureError::NotClean {
                message: format!(
                    "users remaining: {remaining_users}, groups remaining: {remaining_groups}"
                ),
            });
        }

        Ok(SweepSummary {
            deleted_users,
            deleted_groups,
        })
    }

    fn exists(&self, probe: Result<bool, TransportError>) -> Result<bool, FixtureError> {
        probe.map_err(|err| {
            FixtureError::Provisioning(format!("checking {}: {err}", self.base_url))
        })
    }
}
