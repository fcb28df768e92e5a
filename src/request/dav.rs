//! Assembly of WebDAV requests from user, path and resource kind.

use crate::dav::{
    DavLayout, DavResource, DavVersion, SHARES_SPACE_ID, escape_path, sanitize_url,
};

use super::{Auth, RequestBody, RequestError, TestRequest};

const SHARES_PREFIX: &str = "Shares/";
const PUBLIC_USER: &str = "public";
const DESTINATION_HEADER: &str = "Destination";

/// A DAV request described in step terms, before URL layout is applied.
#[derive(Clone, Debug, PartialEq)]
pub struct DavRequest {
    /// Concrete user owning the addressed resource.
    pub user: String,
    /// Password (or bearer token) for `user`; a share password for
    /// public-files requests.
    pub password: String,
    /// Method, for example `PROPFIND`.
    pub method: String,
    /// Resource path relative to the DAV root.
    pub path: String,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: RequestBody,
    /// Resource kind selecting the URL layout.
    pub resource: DavResource,
    /// Explicit space id; the personal space is used when absent.
    pub space_id: Option<String>,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Send `password` as a bearer token.
    pub bearer: bool,
    /// Authenticate as a different user than the resource owner.
    pub act_as: Option<String>,
}

impl DavRequest {
    /// Describes a `files` request by `user` on `path`.
    #[must_use]
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            resource: DavResource::Files,
            space_id: None,
            query: Vec::new(),
            bearer: false,
            act_as: None,
        }
    }

    /// Sets the resource kind.
    #[must_use]
    pub const fn resource(mut self, value: DavResource) -> Self {
        self.resource = value;
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, value: RequestBody) -> Self {
        self.body = value;
        self
    }

    /// Targets an explicit space.
    #[must_use]
    pub fn space_id(mut self, value: impl Into<String>) -> Self {
        self.space_id = Some(value.into());
        self
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sends the password as a bearer token.
    #[must_use]
    pub const fn bearer(mut self) -> Self {
        self.bearer = true;
        self
    }

    /// Authenticates as `user` instead of the resource owner.
    #[must_use]
    pub fn act_as(mut self, user: impl Into<String>) -> Self {
        self.act_as = Some(user.into());
        self
    }

    fn addresses_shares_space(&self) -> bool {
        self.path.trim_start_matches('/').starts_with(SHARES_PREFIX)
    }

    /// Whether [`Self::build`] needs the owner's personal space id.
    #[must_use]
    pub fn needs_personal_space(&self, layout: DavLayout) -> bool {
        layout.version == DavVersion::Spaces
            && self.space_id.is_none()
            && !matches!(
                self.resource,
                DavResource::PublicFiles | DavResource::Versions
            )
            && !self.addresses_shares_space()
    }

    /// Resolves the layout into a [`TestRequest`].
    ///
    /// `personal_space` is the owner's personal space id, consulted only
    /// when [`Self::needs_personal_space`] holds.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the DAV path cannot be produced or the
    /// resulting URL is invalid.
    pub fn build(
        &self,
        base_url: &str,
        layout: DavLayout,
        personal_space: Option<&str>,
    ) -> Result<TestRequest, RequestError> {
        let spaces = layout.version == DavVersion::Spaces;
        let mut path = self.path.clone();
        let mut space_id = self.space_id.clone();
        if spaces {
            let trimmed = self.path.trim_start_matches('/');
            let in_shares = trimmed.starts_with(SHARES_PREFIX);
            path = trimmed
                .strip_prefix(SHARES_PREFIX)
                .map_or_else(|| trimmed.to_owned(), |rest| format!("/{rest}"));
            if space_id.is_none()
                && !matches!(
                    self.resource,
                    DavResource::PublicFiles | DavResource::Versions
                )
            {
                space_id = if in_shares {
                    Some(SHARES_SPACE_ID.to_owned())
                } else {
                    personal_space.map(str::to_owned)
                };
            }
        }

        let suffix = if spaces
            && !matches!(
                self.resource,
                DavResource::Archive | DavResource::Versions | DavResource::PublicFiles
            ) {
            space_id.as_deref()
        } else if self.resource == DavResource::Versions {
            Some(path.as_str())
        } else {
            Some(self.user.as_str())
        };
        let dav_path = layout.path(suffix, self.resource)?;

        let base = sanitize_url(base_url, true);
        let mut url = sanitize_url(&format!("{base}/{dav_path}"), false);
        if !matches!(self.resource, DavResource::Archive | DavResource::Versions) {
            url.push('/');
            url.push_str(escape_path(&path).trim_start_matches('/'));
        }

        let headers = self
            .headers
            .iter()
            .map(|(name, value)| {
                if name == DESTINATION_HEADER {
                    (name.clone(), escape_path(value))
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect::<Vec<_>>();

        self.query
            .iter()
            .fold(
                TestRequest::builder()
                    .method(self.method.clone())
                    .url(url)
                    .headers(headers)
                    .body(self.body.clone())
                    .auth(self.auth()),
                |builder, (name, value)| builder.query(name.clone(), value.clone()),
            )
            .build()
    }

    fn auth(&self) -> Auth {
        if self.bearer {
            return Auth::Bearer(self.password.clone());
        }
        if self.resource == DavResource::PublicFiles {
            if self.password.is_empty() {
                return Auth::None;
            }
            return Auth::Basic {
                username: PUBLIC_USER.to_owned(),
                password: self.password.clone(),
            };
        }
        Auth::Basic {
            username: self.act_as.clone().unwrap_or_else(|| self.user.clone()),
            password: self.password.clone(),
        }
    }
}
