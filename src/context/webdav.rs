//! WebDAV steps: plain DAV requests, locks, resumable uploads and the
//! personal space lookup they depend on.

use tracing::debug;
use uuid::Uuid;

use crate::dav::{DavLayout, DavVersion, NamespacedProperty, lock_body, propfind_body, sanitize_url};
use crate::fixtures::{
    FixtureError, is_nonexistent_user, parse_lock_token, personal_drive_id, space_id_from_propfind,
};
use crate::poll::decode_json_with_retry;
use crate::provisioning::Provisioning;
use crate::request::{DavRequest, RequestBody, TestRequest};
use crate::response::HttpResponse;
use crate::transport::Transport;

use super::{DispatchError, ScenarioContext};

/// TUS protocol version sent with every upload request.
pub const TUS_VERSION: &str = "1.0.0";

impl<T: Transport, P: Provisioning> ScenarioContext<T, P> {
    /// Builds `dav` against the active server, resolving the owner's
    /// personal space when the layout needs it, then sends and records it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the space id cannot be found, the
    /// request cannot be built or sending fails.
    pub async fn send_dav(&mut self, dav: &DavRequest) -> Result<HttpResponse, DispatchError> {
        let personal = if dav.needs_personal_space(self.layout) {
            Some(self.personal_space_id(&dav.user).await?)
        } else {
            None
        };
        let request = dav.build(self.base_url(), self.layout, personal.as_deref())?;
        self.send(request, Some(&dav.user)).await
    }

    /// Locks `path` for `user` with a body built from `rows` (`lockscope`,
    /// `timeout`, ...). The returned token is kept for later steps.
    ///
    /// # Errors
    ///
    /// See [`Self::send_dav`].
    pub async fn lock(
        &mut self,
        user: &str,
        path: &str,
        rows: &[(String, String)],
    ) -> Result<HttpResponse, DispatchError> {
        let username = self.credentials.username(user);
        let (body, headers) = lock_body(rows);
        let dav = headers.into_iter().fold(
            DavRequest::new(&username, self.password_for(user), "LOCK", path)
                .body(RequestBody::text(body)),
            |request, (name, value)| request.header(name, value),
        );
        let response = self.send_dav(&dav).await?;
        let token = (!response.is_failure())
            .then(|| parse_lock_token(&response.text()))
            .flatten();
        if let Some(value) = token {
            debug!(user = %username, path, "stored lock token");
            self.fixtures.locks.store(&username, path, value);
        }
        Ok(response)
    }

    /// Unlocks `path` with the token `user` obtained earlier.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Unknown`] when `user` holds no lock on
    /// `path`, otherwise see [`Self::send_dav`].
    pub async fn unlock(&mut self, user: &str, path: &str) -> Result<HttpResponse, DispatchError> {
        let username = self.credentials.username(user);
        let token = self
            .fixtures
            .locks
            .get(&username, path)
            .map(str::to_owned)
            .ok_or_else(|| FixtureError::Unknown {
                kind: "lock",
                name: format!("{username}:{path}"),
            })?;
        let dav = DavRequest::new(&username, self.password_for(user), "UNLOCK", path)
            .header("Lock-Token", format!("<{token}>"));
        let response = self.send_dav(&dav).await?;
        if !response.is_failure() {
            self.fixtures.locks.remove(&username, path);
        }
        Ok(response)
    }

    /// Creates a resumable upload for `filename` in `user`'s files root.
    /// `headers` carries `Upload-Length`, `Upload-Metadata` and friends.
    /// The returned `Location` is remembered under the filename.
    ///
    /// # Errors
    ///
    /// See [`Self::send_dav`].
    pub async fn create_tus_upload(
        &mut self,
        user: &str,
        filename: &str,
        headers: &[(String, String)],
    ) -> Result<HttpResponse, DispatchError> {
        let username = self.credentials.username(user);
        let dav = headers.iter().fold(
            DavRequest::new(&username, self.password_for(user), "POST", "")
                .header("Tus-Resumable", TUS_VERSION),
            |request, (name, value)| request.header(name.clone(), value.clone()),
        );
        let response = self.send_dav(&dav).await?;
        if let Some(location) = response.header("Location") {
            self.fixtures.tus.record(filename, location);
        }
        Ok(response)
    }

    /// Sends one chunk of a resumable upload to `location`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the request cannot be built or sent.
    pub async fn send_tus_chunk(
        &mut self,
        user: &str,
        location: &str,
        offset: u64,
        data: &[u8],
        checksum: Option<&str>,
    ) -> Result<HttpResponse, DispatchError> {
        let username = self.credentials.username(user);
        let mut builder = TestRequest::builder()
            .method("PATCH")
            .url(location)
            .basic_auth(username.clone(), self.password_for(user))
            .header("Content-Type", "application/offset+octet-stream")
            .header("Tus-Resumable", TUS_VERSION)
            .header("Upload-Offset", offset.to_string())
            .body(RequestBody::Raw(data.to_vec()));
        if let Some(value) = checksum {
            builder = builder.header("Upload-Checksum", value);
        }
        let request = builder.build()?;
        self.send(request, Some(&username)).await
    }

    /// Personal space id of `user`, cached for the scenario.
    ///
    /// Users whose names announce that they do not exist get a random id.
    /// Otherwise the Graph drive listing is consulted, then a PROPFIND for
    /// `oc:spaceid` on the user's files root.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Lookup`] when neither source names a space.
    pub async fn personal_space_id(&mut self, user: &str) -> Result<String, DispatchError> {
        let username = self.credentials.username(user);
        if let Some(cached) = self.fixtures.spaces.get(&username) {
            return Ok(cached.to_owned());
        }
        let space_id = if is_nonexistent_user(&username) {
            Uuid::new_v4().to_string()
        } else {
            self.lookup_space_id(user, &username).await?
        };
        self.fixtures.spaces.insert(&username, space_id.clone());
        Ok(space_id)
    }

    async fn lookup_space_id(&self, user: &str, username: &str) -> Result<String, DispatchError> {
        let password = self.password_for(user);
        let drives = TestRequest::builder()
            .method("GET")
            .url(sanitize_url(
                &format!("{}/graph/v1.0/me/drives", self.base_url()),
                false,
            ))
            .basic_auth(username, password.clone())
            .build()?;
        let listing = self.exchange(drives.clone(), self.retry).await?;
        if !listing.is_failure() {
            let mut document = listing.json().ok();
            if document.is_none() {
                document = decode_json_with_retry(&self.transport, &drives, self.poll)
                    .await
                    .ok()
                    .map(|(_, value)| value);
            }
            if let Some(id) = document.as_ref().and_then(personal_drive_id) {
                return Ok(id);
            }
        }

        let layout = DavLayout::new(DavVersion::New, self.layout.with_remote_php);
        let body = propfind_body(&[NamespacedProperty::plain("oc:spaceid")])?;
        let request = DavRequest::new(username, password, "PROPFIND", "")
            .header("Depth", "0")
            .body(RequestBody::text(body))
            .build(self.base_url(), layout, None)?;
        let response = self.exchange(request, self.retry).await?;
        space_id_from_propfind(&response.text()).ok_or_else(|| {
            DispatchError::Fixture(FixtureError::Lookup {
                what: format!("personal space id of '{username}'"),
                message: format!("PROPFIND returned {}", response.status),
            })
        })
    }
}
