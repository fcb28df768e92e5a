//! BDD step definitions for janitor behaviour.

use davcheck::{GraphProvisioning, Janitor};
use rstest_bdd_macros::{given, then, when};

use super::test_helpers::{BASE_URL, JanitorContext, RUNTIME, SweepOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a janitor sweeping user \"{user}\" and group \"{group}\"")]
fn janitor_sweeping(
    mut janitor_context: JanitorContext,
    user: String,
    group: String,
) -> JanitorContext {
    janitor_context.users = vec![user];
    janitor_context.groups = vec![group];
    janitor_context
}

#[given("the server deletes both fixtures and no longer knows them")]
fn server_deletes_everything(janitor_context: JanitorContext) -> JanitorContext {
    janitor_context.transport.push_status(204, ""); // delete user
    janitor_context.transport.push_status(204, ""); // delete group
    janitor_context.transport.push_status(404, "");
    janitor_context.transport.push_status(404, "");
    janitor_context
}

#[given("the server still knows the user after deletion")]
fn server_keeps_user(janitor_context: JanitorContext) -> JanitorContext {
    janitor_context.transport.push_status(204, "");
    janitor_context.transport.push_status(204, "");
    // post: user still present
    janitor_context
        .transport
        .push_status(200, "{\"id\":\"leftover\"}");
    janitor_context.transport.push_status(404, "");
    janitor_context
}

#[when("I run the janitor sweep")]
fn run_sweep(mut janitor_context: JanitorContext) -> JanitorContext {
    let provisioning = GraphProvisioning::new(janitor_context.transport.clone(), "admin", "admin");
    let janitor = Janitor::new(provisioning, BASE_URL);
    let result = RUNTIME.block_on(janitor.sweep(&janitor_context.users, &janitor_context.groups));
    janitor_context.outcome = Some(match result {
        Ok(summary) => SweepOutcome::Success(summary),
        Err(err) => SweepOutcome::Failure(err.to_string()),
    });
    janitor_context
}

#[then("the janitor reports deleting \"{users}\" user and \"{groups}\" group")]
fn reports_deletions(
    janitor_context: &JanitorContext,
    users: usize,
    groups: usize,
) -> Result<(), StepError> {
    let Some(outcome) = janitor_context.outcome.as_ref() else {
        return Err(StepError::Assertion(String::from("missing outcome")));
    };
    let SweepOutcome::Success(summary) = outcome else {
        return Err(StepError::Assertion(format!(
            "expected success, got: {outcome:?}"
        )));
    };
    if summary.deleted_users == users && summary.deleted_groups == groups {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {users} users and {groups} groups, got {summary:?}"
        )))
    }
}

#[then("the janitor reports a not-clean error")]
fn reports_not_clean(janitor_context: &JanitorContext) -> Result<(), StepError> {
    let Some(outcome) = janitor_context.outcome.as_ref() else {
        return Err(StepError::Assertion(String::from("missing outcome")));
    };
    let SweepOutcome::Failure(message) = outcome else {
        return Err(StepError::Assertion(String::from(
            "expected sweep to fail, got success",
        )));
    };
    if message.contains("users remaining: 1, groups remaining: 0") {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected not-clean error, got: {message}"
        )))
    }
}
