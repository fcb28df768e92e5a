//! BDD scenarios for the scenario context.

use rstest_bdd_macros::scenario;

use super::test_helpers::{DispatchWorld, dispatch_world};

#[scenario(
    path = "tests/features/dispatch.feature",
    name = "Created users are registered and cleaned up"
)]
fn scenario_created_users_are_cleaned_up(dispatch_world: DispatchWorld) {
    let _ = dispatch_world;
}

#[scenario(
    path = "tests/features/dispatch.feature",
    name = "A failed setup step names the unexpected status"
)]
fn scenario_failed_setup_step(dispatch_world: DispatchWorld) {
    let _ = dispatch_world;
}

#[scenario(
    path = "tests/features/dispatch.feature",
    name = "Table rows accumulate status codes"
)]
fn scenario_table_rows(dispatch_world: DispatchWorld) {
    let _ = dispatch_world;
}

#[scenario(
    path = "tests/features/dispatch.feature",
    name = "Placeholders expand with the named user's credentials"
)]
fn scenario_placeholder_expansion(dispatch_world: DispatchWorld) {
    let _ = dispatch_world;
}

#[scenario(
    path = "tests/features/dispatch.feature",
    name = "Setup steps resend while the server is busy"
)]
fn scenario_setup_resends_when_busy(dispatch_world: DispatchWorld) {
    let _ = dispatch_world;
}
