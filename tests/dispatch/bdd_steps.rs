//! BDD step definitions for scenario-context behaviour.

use davcheck::{Auth, TestRequest};
use rstest_bdd_macros::{given, then, when};
use serde_json::json;

use super::test_helpers::{BASE_URL, DispatchWorld, RUNTIME, StepOutcome};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

#[given("a scripted server")]
fn scripted_server(dispatch_world: &DispatchWorld) {
    assert_eq!(dispatch_world.transport.pending(), 0);
}

#[given("the server creates the next entity with id \"{id}\"")]
fn server_creates_entity(dispatch_world: &DispatchWorld, id: String) {
    dispatch_world.transport.push_json(201, &json!({ "id": id }));
}

#[given("the server answers the next request with status \"{status}\"")]
fn server_answers_status(dispatch_world: &DispatchWorld, status: u16) {
    dispatch_world.transport.push_status(status, "");
}

#[given("the server deletes the next fixture")]
fn server_deletes_fixture(dispatch_world: &DispatchWorld) {
    dispatch_world.transport.push_status(204, "");
}

#[given("the server no longer knows the next fixture")]
fn server_forgets_fixture(dispatch_world: &DispatchWorld) {
    dispatch_world.transport.push_status(404, "");
}

#[when("the administrator creates user \"{user}\"")]
fn administrator_creates_user(dispatch_world: &DispatchWorld, user: String) {
    let mut context = dispatch_world.context.borrow_mut();
    let result = RUNTIME.block_on(context.create_user(&user, None));
    dispatch_world.record(result);
}

#[when("user \"{user}\" has been created")]
fn user_has_been_created(dispatch_world: &DispatchWorld, user: String) {
    let mut context = dispatch_world.context.borrow_mut();
    let result = RUNTIME.block_on(context.user_has_been_created(&user, None));
    dispatch_world.record(result);
}

#[when("user \"{user}\" requests \"{first}\" and \"{second}\" as table rows")]
fn user_requests_table_rows(
    dispatch_world: &DispatchWorld,
    user: String,
    first: String,
    second: String,
) -> Result<(), StepError> {
    let mut context = dispatch_world.context.borrow_mut();
    let password = context.password_for(&user);
    let rows = [first, second]
        .iter()
        .map(|path| {
            TestRequest::builder()
                .method("GET")
                .url(format!("{BASE_URL}{path}"))
                .basic_auth(user.clone(), password.clone())
                .build()
                .map_err(|err| StepError::Assertion(err.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let result = RUNTIME.block_on(context.send_table_rows(rows));
    dispatch_world.record(result);
    Ok(())
}

#[when("\"{text}\" is expanded for user \"{user}\"")]
fn text_is_expanded(dispatch_world: &DispatchWorld, text: String, user: String) {
    let context = dispatch_world.context.borrow();
    let result = RUNTIME.block_on(context.substitute(&text, Some(&user)));
    if let Ok(expanded) = &result {
        *dispatch_world.expansion.borrow_mut() = Some(expanded.clone());
    }
    dispatch_world.record(result);
}

#[when("the scenario finishes")]
fn scenario_finishes(dispatch_world: &DispatchWorld) {
    let mut context = dispatch_world.context.borrow_mut();
    let summary = RUNTIME.block_on(context.after_scenario(false));
    *dispatch_world.cleanup.borrow_mut() = Some(summary);
}

#[then("the last response status is \"{status}\"")]
fn last_response_status(dispatch_world: &DispatchWorld, status: u16) -> Result<(), StepError> {
    dispatch_world
        .context
        .borrow()
        .assert_last_status(status)
        .map_err(|err| StepError::Assertion(err.to_string()))
}

#[then("user \"{user}\" is registered with password \"{password}\"")]
fn user_is_registered(
    dispatch_world: &DispatchWorld,
    user: String,
    password: String,
) -> Result<(), StepError> {
    let context = dispatch_world.context.borrow();
    let Some(record) = context.fixtures().users.get(&user) else {
        return Err(StepError::Assertion(format!("user '{user}' is not registered")));
    };
    if record.password == password {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected password '{password}', got '{}'",
            record.password
        )))
    }
}

#[then("user \"{user}\" is not registered")]
fn user_is_not_registered(dispatch_world: &DispatchWorld, user: String) -> Result<(), StepError> {
    if dispatch_world.context.borrow().fixtures().users.contains(&user) {
        Err(StepError::Assertion(format!("user '{user}' was registered")))
    } else {
        Ok(())
    }
}

#[then("the step fails with \"{message}\"")]
fn step_fails_with(dispatch_world: &DispatchWorld, message: String) -> Result<(), StepError> {
    let outcome = dispatch_world.outcome.borrow();
    let StepOutcome::Failure(actual) = &*outcome else {
        return Err(StepError::Assertion(format!(
            "expected failure, got {outcome:?}"
        )));
    };
    if actual.contains(&message) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure mentioning '{message}', got: {actual}"
        )))
    }
}

#[then("the accumulated HTTP status codes are \"{codes}\"")]
fn accumulated_codes(dispatch_world: &DispatchWorld, codes: String) -> Result<(), StepError> {
    let context = dispatch_world.context.borrow();
    let actual = context.recorder().http_status_codes().join(",");
    if actual == codes {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected codes {codes}, got {actual}"
        )))
    }
}

#[then("every request authenticated as \"{user}\" with password \"{password}\"")]
fn every_request_authenticated(
    dispatch_world: &DispatchWorld,
    user: String,
    password: String,
) -> Result<(), StepError> {
    let expected = Auth::Basic {
        username: user,
        password,
    };
    let requests = dispatch_world.transport.requests();
    if !requests.is_empty() && requests.iter().all(|request| request.auth == expected) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected every request to use {expected:?}, got {:?}",
            requests.iter().map(|request| &request.auth).collect::<Vec<_>>()
        )))
    }
}

#[then("the expansion is \"{expected}\"")]
fn expansion_is(dispatch_world: &DispatchWorld, expected: String) -> Result<(), StepError> {
    let expansion = dispatch_world.expansion.borrow();
    match expansion.as_deref() {
        Some(actual) if actual == expected => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected expansion '{expected}', got {other:?}"
        ))),
    }
}

#[then("cleanup deleted \"{users}\" user and left nothing behind")]
fn cleanup_deleted(dispatch_world: &DispatchWorld, users: usize) -> Result<(), StepError> {
    let cleanup = dispatch_world.cleanup.borrow();
    let Some(summary) = cleanup.as_ref() else {
        return Err(StepError::Assertion(String::from("scenario has not finished")));
    };
    if summary.deleted_users == users && summary.is_clean() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected {users} deleted users and a clean server, got {summary:?}"
        )))
    }
}
