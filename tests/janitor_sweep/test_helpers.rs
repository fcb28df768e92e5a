//! Shared fixtures and helpers for janitor BDD scenarios.

use std::sync::LazyLock;

use davcheck::SweepSummary;
use davcheck::test_support::ScriptedTransport;
use rstest::fixture;
use tokio::runtime::Runtime;

pub const BASE_URL: &str = "https://localhost:9200";

pub static RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Runtime::new().unwrap_or_else(|err| panic!("tokio runtime should start for BDD tests: {err}"))
});

#[derive(Clone, Debug)]
pub enum SweepOutcome {
    Success(SweepSummary),
    Failure(String),
}

#[derive(Clone, Debug)]
pub struct JanitorContext {
    pub transport: ScriptedTransport,
    pub users: Vec<String>,
    pub groups: Vec<String>,
    pub outcome: Option<SweepOutcome>,
}

#[fixture]
pub fn janitor_context() -> JanitorContext {
    JanitorContext {
        transport: ScriptedTransport::new(),
        users: Vec::new(),
        groups: Vec::new(),
        outcome: None,
    }
}
