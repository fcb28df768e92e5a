//! Action dispatcher for WebDAV, OCS and Graph acceptance scenarios.
//!
//! Scenario steps hand their arguments to a [`ScenarioContext`], which
//! expands placeholders, resolves credentials, builds and sends HTTP
//! requests, records the responses for later assertions and tracks every
//! fixture it creates so [`ScenarioContext::after_scenario`] can remove
//! them again. The network is reached only through the [`Transport`] and
//! [`Provisioning`] seams.

pub mod assertions;
pub mod batch;
pub mod config;
pub mod context;
pub mod credentials;
pub mod dav;
pub mod fixtures;
pub mod placeholder;
pub mod poll;
pub mod provisioning;
pub mod request;
pub mod response;
pub mod scenario;
pub mod test_support;
pub mod transport;

pub use assertions::AssertionError;
pub use config::{ConfigError, HarnessConfig};
pub use context::{DispatchError, ScenarioContext};
pub use credentials::{CredentialError, CredentialResolver, UsernameReplacements};
pub use dav::{DavError, DavLayout, DavResource, DavVersion};
pub use fixtures::{
    CleanupSummary, FixtureError, Fixtures, Janitor, ServerTarget, ServerUrls, SweepSummary,
};
pub use placeholder::{PlaceholderError, PlaceholderRegistry, Transform};
pub use poll::{PollError, PollPolicy};
pub use provisioning::{GraphProvisioning, NewUser, Provisioning};
pub use request::{Auth, DavRequest, RequestBody, RequestError, TestRequest};
pub use response::{HttpResponse, ResponseRecorder};
pub use scenario::{ExpectedFailures, ScenarioKind, ScenarioLog, ScenarioLogError};
pub use transport::{ReqwestTransport, RetryPolicy, Transport, TransportError};
