//! Expansion of `%token%` placeholders in step arguments.
//!
//! A [`PlaceholderRegistry`] maps token codes to resolver closures. Each
//! [`PlaceholderRegistry::substitute`] call scans every registered code in
//! registration order and only invokes the resolvers whose code occurs in
//! the text. Unknown tokens are left alone.

use thiserror::Error;
use url::Url;

use crate::config::HarnessConfig;
use crate::dav::{DavLayout, DavResource, DavVersion};
use crate::fixtures::{Fixtures, ServerTarget, ServerUrls};

pub mod patterns;
mod status;

pub use status::{ServerStatus, StaticStatus, StatusFuture, StatusSource};

const PATTERN_SUFFIX: &str = "_pattern%";

/// Post-processing applied to every non-pattern replacement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Transform {
    /// Percent-encode as a URL component.
    UrlEncode,
    /// Escape regular-expression metacharacters.
    RegexEscape,
}

impl Transform {
    /// Applies the transform.
    #[must_use]
    pub fn apply(self, value: &str) -> String {
        match self {
            Self::UrlEncode => url::form_urlencoded::byte_serialize(value.as_bytes())
                .collect::<String>()
                .replace('+', "%20"),
            Self::RegexEscape => regex::escape(value),
        }
    }
}

/// Values of the user-scoped tokens for one user.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UserScope {
    /// `%username%`.
    pub username: String,
    /// `%displayname%`.
    pub display_name: String,
    /// `%password%`.
    pub password: String,
    /// `%emailaddress%`.
    pub email: String,
    /// `%spaceid%`.
    pub space_id: Option<String>,
    /// `%user_id%`.
    pub user_id: Option<String>,
}

/// Everything a resolver may read.
#[derive(Clone, Copy, Debug)]
pub struct ResolveScope<'a> {
    /// Harness configuration.
    pub config: &'a HarnessConfig,
    /// Both server URLs.
    pub urls: &'a ServerUrls,
    /// Server steps currently talk to.
    pub target: ServerTarget,
    /// Scenario fixtures.
    pub fixtures: &'a Fixtures,
    /// User the step acts for, enabling the user-scoped tokens.
    pub user: Option<&'a UserScope>,
    /// Group behind `%group_id%`.
    pub group: Option<&'a str>,
    /// Host name expected in request ids.
    pub hostname: &'a str,
}

impl ResolveScope<'_> {
    fn active_url(&self) -> &str {
        self.urls.get(self.target).trim_end_matches('/')
    }

    fn base_path(&self) -> String {
        Url::parse(self.active_url())
            .map(|url| url.path().trim_matches('/').to_owned())
            .unwrap_or_default()
    }
}

type Resolver = Box<dyn Fn(&ResolveScope<'_>, &ServerStatus) -> String + Send + Sync>;

struct Entry {
    code: String,
    resolver: Resolver,
    needs_status: bool,
    user_scoped: bool,
}

impl Entry {
    fn active(&self, text: &str, scope: &ResolveScope<'_>) -> bool {
        (!self.user_scoped || scope.user.is_some()) && text.contains(&self.code)
    }
}

fn strip_scheme(url: &str) -> &str {
    url.strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url)
}

fn host_port(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let host = parsed.host_str()?.to_owned();
            Some(match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host,
            })
        })
        .unwrap_or_default()
}

fn hostname(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_owned))
        .unwrap_or_default()
}

fn user_value(scope: &ResolveScope<'_>, read: fn(&UserScope) -> String) -> String {
    scope.user.map(read).unwrap_or_default()
}

/// Registry of placeholder resolvers.
#[derive(Default)]
pub struct PlaceholderRegistry {
    entries: Vec<Entry>,
}

impl std::fmt::Debug for PlaceholderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| entry.code.as_str()))
            .finish()
    }
}

impl PlaceholderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        code: &str,
        needs_status: bool,
        user_scoped: bool,
        resolver: impl Fn(&ResolveScope<'_>, &ServerStatus) -> String + Send + Sync + 'static,
    ) {
        self.entries.push(Entry {
            code: code.to_owned(),
            resolver: Box::new(resolver),
            needs_status,
            user_scoped,
        });
    }

    /// Registers a token resolved from the scope.
    pub fn register(
        &mut self,
        code: &str,
        resolver: impl Fn(&ResolveScope<'_>) -> String + Send + Sync + 'static,
    ) {
        self.push(code, false, false, move |scope, _| resolver(scope));
    }

    /// Registers a token resolved from the server status document.
    pub fn register_status(&mut self, code: &str, read: fn(&ServerStatus) -> String) {
        self.push(code, true, false, move |_, status| read(status));
    }

    /// Registers a token only active when a user is in scope.
    pub fn register_user(&mut self, code: &str, read: fn(&UserScope) -> String) {
        self.push(code, false, true, move |scope, _| user_value(scope, read));
    }

    /// Registered codes in resolution order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.code.as_str())
    }

    /// Registry with every built-in token.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register("%base_url%", |scope| scope.active_url().to_owned());
        registry.register("%base_url_without_scheme%", |scope| {
            strip_scheme(scope.active_url()).to_owned()
        });
        registry.register("%base_host_port%", |scope| host_port(scope.active_url()));
        registry.register("%base_url_hostname%", |scope| hostname(scope.active_url()));
        registry.register("%local_base_url%", |scope| {
            scope.urls.local.trim_end_matches('/').to_owned()
        });
        registry.register("%remote_base_url%", |scope| {
            scope.urls.remote.trim_end_matches('/').to_owned()
        });
        registry.register("%local_host_port%", |scope| host_port(&scope.urls.local));
        registry.register("%remote_host_port%", |scope| host_port(&scope.urls.remote));
        registry.register("%remote_server%", |scope| {
            scope.urls.remote.trim_end_matches('/').to_owned()
        });
        registry.register("%remote_server_without_scheme%", |scope| {
            strip_scheme(scope.urls.remote.trim_end_matches('/')).to_owned()
        });
        registry.register("%local_server%", |scope| {
            scope.urls.local.trim_end_matches('/').to_owned()
        });
        registry.register("%local_server_without_scheme%", |scope| {
            strip_scheme(scope.urls.local.trim_end_matches('/')).to_owned()
        });
        registry.register("%base_path%", |scope| scope.base_path());
        registry.register("%dav_path%", |scope| {
            let version = scope.config.dav_version().unwrap_or(DavVersion::New);
            let layout = DavLayout::new(version, scope.config.with_remote_php);
            let dav = layout.path(None, DavResource::Root).unwrap_or_default();
            format!("{}/{dav}", scope.base_path())
                .trim_start_matches('/')
                .to_owned()
        });
        registry.register("%ocs_path_v1%", |scope| {
            format!("{}/ocs/v1.php", scope.base_path())
                .trim_start_matches('/')
                .to_owned()
        });
        registry.register("%ocs_path_v2%", |scope| {
            format!("{}/ocs/v2.php", scope.base_path())
                .trim_start_matches('/')
                .to_owned()
        });
        registry.register_status("%productname%", |status| status.productname.clone());
        registry.register_status("%edition%", |status| status.edition.clone());
        registry.register_status("%version%", |status| status.version.clone());
        registry.register_status("%versionstring%", |status| status.versionstring.clone());
        registry.register("%a_comment_url%", |scope| {
            let base = format!("{}/", scope.base_path());
            format!(
                "/{}remote.php/dav/comments/files/([0-9]+)",
                base.trim_start_matches('/')
            )
        });
        registry.register("%last_share_id%", |scope| {
            scope
                .fixtures
                .shares
                .last_user_group_share_id()
                .unwrap_or_default()
                .to_owned()
        });
        registry.register("%last_public_share_token%", |scope| {
            scope
                .fixtures
                .shares
                .last_public_share_token()
                .unwrap_or_default()
                .to_owned()
        });
        registry.register("%tus_upload_location%", |scope| {
            scope.fixtures.tus.last().unwrap_or_default().to_owned()
        });
        registry.register("%user_id%", |scope| {
            scope
                .user
                .and_then(|user| user.user_id.clone())
                .unwrap_or_default()
        });
        registry.register("%group_id%", |scope| {
            scope
                .group
                .and_then(|group| scope.fixtures.groups.id_of(group))
                .unwrap_or_default()
                .to_owned()
        });
        registry.register("%uuidv4_pattern%", |_| patterns::UUID_V4.to_owned());
        registry.register("%user_id_pattern%", |_| patterns::UUID_V4.to_owned());
        registry.register("%group_id_pattern%", |_| patterns::UUID_V4.to_owned());
        registry.register("%role_id_pattern%", |_| patterns::UUID_V4.to_owned());
        registry.register("%permissions_id_pattern%", |_| patterns::permissions_id());
        registry.register("%file_id_pattern%", |_| patterns::file_id());
        registry.register("%space_id_pattern%", |_| patterns::space_id());
        registry.register("%share_id_pattern%", |_| patterns::share_id());
        registry.register("%etag_pattern%", |_| patterns::ETAG.to_owned());
        registry.register("%federated_user_id_pattern%", |_| {
            patterns::FEDERATED_USER.to_owned()
        });
        registry.register("%federated_file_id_pattern%", |_| patterns::federated_file_id());
        registry.register("%identities_issuer_id_pattern%", |_| {
            patterns::FEDERATED_USER.to_owned()
        });
        registry.register("%request_id_pattern%", |scope| {
            patterns::request_id(scope.config.send_scenario_line_references, scope.hostname)
        });
        registry.register_user("%username%", |user| user.username.clone());
        registry.register_user("%displayname%", |user| user.display_name.clone());
        registry.register_user("%password%", |user| user.password.clone());
        registry.register_user("%emailaddress%", |user| user.email.clone());
        registry.register_user("%spaceid%", |user| user.space_id.clone().unwrap_or_default());
        registry
    }

    /// Whether expanding `text` needs the server status document.
    #[must_use]
    pub fn needs_status(&self, text: &str, scope: &ResolveScope<'_>) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.needs_status && entry.active(text, scope))
    }

    /// Expands `text` with an already known status document.
    ///
    /// `extra` pairs are applied after the registered tokens. `transforms`
    /// run on every replacement whose code does not end in `_pattern%`.
    #[must_use]
    pub fn expand(
        &self,
        text: &str,
        scope: &ResolveScope<'_>,
        status: &ServerStatus,
        transforms: &[Transform],
        extra: &[(String, String)],
    ) -> String {
        let mut output = text.to_owned();
        let registered = self
            .entries
            .iter()
            .filter(|entry| entry.active(text, scope))
            .map(|entry| (entry.code.clone(), (entry.resolver)(scope, status)));
        let additional = extra.iter().filter(|(code, _)| text.contains(code.as_str())).cloned();
        for (code, raw) in registered.chain(additional) {
            if !output.contains(&code) {
                continue;
            }
            let replacement = if code.ends_with(PATTERN_SUFFIX) {
                raw
            } else {
                transforms
                    .iter()
                    .fold(raw, |value, transform| transform.apply(&value))
            };
            output = output.replace(&code, &replacement);
        }
        output
    }

    /// Expands `text`, fetching the status document at most once and only
    /// when a status token occurs.
    ///
    /// # Errors
    ///
    /// Returns [`PlaceholderError::Status`] when the status document is
    /// needed but cannot be fetched; nothing is substituted in that case.
    pub async fn substitute<S: StatusSource + ?Sized>(
        &self,
        text: &str,
        scope: &ResolveScope<'_>,
        status_source: &S,
        transforms: &[Transform],
        extra: &[(String, String)],
    ) -> Result<String, PlaceholderError> {
        let status = if self.needs_status(text, scope) {
            status_source.fetch_status(scope.active_url()).await?
        } else {
            ServerStatus::default()
        };
        Ok(self.expand(text, scope, &status, transforms, extra))
    }
}

/// Errors raised while expanding placeholders.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum PlaceholderError {
    /// Raised when `status.php` cannot be fetched or decoded.
    #[error("could not read server status: {0}")]
    Status(String),
}
