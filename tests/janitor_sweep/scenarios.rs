//! BDD scenarios for the janitor sweep.

use rstest_bdd_macros::scenario;

use super::test_helpers::{JanitorContext, janitor_context};

#[scenario(
    path = "tests/features/janitor.feature",
    name = "Sweep leftover users and groups"
)]
fn scenario_sweep_leftovers(janitor_context: JanitorContext) {
    let _ = janitor_context;
}

#[scenario(
    path = "tests/features/janitor.feature",
    name = "Fail the sweep when fixtures remain"
)]
fn scenario_fail_when_not_clean(janitor_context: JanitorContext) {
    let _ = janitor_context;
}
