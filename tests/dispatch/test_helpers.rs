//! Shared fixtures for scenario-context BDD scenarios.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::LazyLock;
use std::time::Duration;

use davcheck::test_support::ScriptedTransport;
use davcheck::{
    CleanupSummary, GraphProvisioning, HarnessConfig, PollPolicy, RetryPolicy, ScenarioContext,
};
use rstest::fixture;
use tokio::runtime::Runtime;

pub const BASE_URL: &str = "https://localhost:9200";

pub static RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    Runtime::new().unwrap_or_else(|err| panic!("tokio runtime should start for BDD tests: {err}"))
});

pub type Context = ScenarioContext<ScriptedTransport, GraphProvisioning<ScriptedTransport>>;

#[derive(Clone, Debug, Default)]
pub enum StepOutcome {
    #[default]
    NotRun,
    Success,
    Failure(String),
}

#[derive(Clone)]
pub struct DispatchWorld {
    pub transport: ScriptedTransport,
    pub context: Rc<RefCell<Context>>,
    pub outcome: Rc<RefCell<StepOutcome>>,
    pub expansion: Rc<RefCell<Option<String>>>,
    pub cleanup: Rc<RefCell<Option<CleanupSummary>>>,
}

impl DispatchWorld {
    pub fn record<T, E: ToString>(&self, result: Result<T, E>) {
        *self.outcome.borrow_mut() = match result {
            Ok(_) => StepOutcome::Success,
            Err(err) => StepOutcome::Failure(err.to_string()),
        };
    }
}

pub fn build_context(transport: &ScriptedTransport) -> Context {
    ScenarioContext::new(
        HarnessConfig::with_base_url(BASE_URL),
        transport.clone(),
        GraphProvisioning::new(transport.clone(), "admin", "admin"),
    )
    .unwrap_or_else(|err| panic!("scenario context should build: {err}"))
    .with_retry_policy(RetryPolicy::standard().with_delay(Duration::ZERO))
    .with_poll_policy(PollPolicy::standard().with_interval(Duration::ZERO))
}

#[fixture]
pub fn dispatch_world() -> DispatchWorld {
    let transport = ScriptedTransport::new();
    let context = build_context(&transport);
    DispatchWorld {
        transport,
        context: Rc::new(RefCell::new(context)),
        outcome: Rc::new(RefCell::new(StepOutcome::NotRun)),
        expansion: Rc::new(RefCell::new(None)),
        cleanup: Rc::new(RefCell::new(None)),
    }
}
