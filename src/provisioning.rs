//! User and group provisioning through the Graph API.

use url::form_urlencoded::byte_serialize;

use crate::dav::sanitize_url;
use crate::request::{RequestBody, RequestError, TestRequest};
use crate::response::HttpResponse;
use crate::transport::{RetryPolicy, Transport, TransportError, TransportFuture, send_with_retry};

const GRAPH_PATH: &str = "graph/v1.0";

/// Attributes of a user to create.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewUser {
    /// Login name.
    pub username: String,
    /// Initial password.
    pub password: String,
    /// Display name.
    pub display_name: String,
    /// Email address.
    pub email: String,
}

/// Builds the administrator requests that create, delete and probe users
/// and groups on a server.
///
/// Scenario steps dispatch the built requests themselves so they carry the
/// step's line reference and land in the scenario log. Cleanup and the
/// janitor use the provided sending methods, which resend transient
/// statuses through [`Provisioning::retry_policy`].
pub trait Provisioning: Send + Sync {
    /// Transport the provided sending methods use.
    fn transport(&self) -> &dyn Transport;

    /// Resend policy of the provided sending methods.
    fn retry_policy(&self) -> RetryPolicy;

    /// Request creating a user; success is a 201 with the new id in the body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the request cannot be built.
    fn create_user_request(&self, base_url: &str, user: &NewUser)
    -> Result<TestRequest, RequestError>;

    /// Request deleting a user by login name; success is a 204.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the request cannot be built.
    fn delete_user_request(&self, base_url: &str, username: &str)
    -> Result<TestRequest, RequestError>;

    /// Request fetching a user; any status below 400 means it exists.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the request cannot be built.
    fn user_request(&self, base_url: &str, username: &str) -> Result<TestRequest, RequestError>;

    /// Request creating a group; success is a 201 with the new id in the
    /// body.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the request cannot be built.
    fn create_group_request(&self, base_url: &str, name: &str)
    -> Result<TestRequest, RequestError>;

    /// Request deleting a group by id or name; success is a 204.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the request cannot be built.
    fn delete_group_request(&self, base_url: &str, group: &str)
    -> Result<TestRequest, RequestError>;

    /// Request fetching a group; any status below 400 means it exists.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError`] when the request cannot be built.
    fn group_request(&self, base_url: &str, name: &str) -> Result<TestRequest, RequestError>;

    /// Deletes a user by login name.
    fn delete_user<'a>(
        &'a self,
        base_url: &'a str,
        username: &'a str,
    ) -> TransportFuture<'a, HttpResponse> {
        Box::pin(async move {
            let request = self
                .delete_user_request(base_url, username)
                .map_err(|err| unbuildable("DELETE", base_url, &err))?;
            send_with_retry(self.transport(), &request, self.retry_policy()).await
        })
    }

    /// Whether the user is known to the server.
    fn user_exists<'a>(
        &'a self,
        base_url: &'a str,
        username: &'a str,
    ) -> TransportFuture<'a, bool> {
        Box::pin(async move {
            let request = self
                .user_request(base_url, username)
                .map_err(|err| unbuildable("GET", base_url, &err))?;
            let response = send_with_retry(self.transport(), &request, self.retry_policy()).await?;
            Ok(!response.is_failure())
        })
    }

    /// Deletes a group by id or name.
    fn delete_group<'a>(
        &'a self,
        base_url: &'a str,
        group: &'a str,
    ) -> TransportFuture<'a, HttpResponse> {
        Box::pin(async move {
            let request = self
                .delete_group_request(base_url, group)
                .map_err(|err| unbuildable("DELETE", base_url, &err))?;
            send_with_retry(self.transport(), &request, self.retry_policy()).await
        })
    }

    /// Whether the group is known to the server.
    fn group_exists<'a>(&'a self, base_url: &'a str, name: &'a str) -> TransportFuture<'a, bool> {
        Box::pin(async move {
            let request = self
                .group_request(base_url, name)
                .map_err(|err| unbuildable("GET", base_url, &err))?;
            let response = send_with_retry(self.transport(), &request, self.retry_policy()).await?;
            Ok(!response.is_failure())
        })
    }
}

fn unbuildable(method: &str, base_url: &str, err: &RequestError) -> TransportError {
    TransportError::Request {
        method: method.to_owned(),
        url: base_url.to_owned(),
        message: err.to_string(),
    }
}

/// Reads the `id` of a created entity from a Graph response.
#[must_use]
pub fn created_id(response: &HttpResponse) -> Option<String> {
    response
        .json()
        .ok()?
        .get("id")?
        .as_str()
        .map(str::to_owned)
}

fn encode_segment(segment: &str) -> String {
    byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// [`Provisioning`] over the Graph REST API, authenticated as the
/// administrator.
#[derive(Clone, Debug)]
pub struct GraphProvisioning<T> {
    transport: T,
    admin_username: String,
    admin_password: String,
    retry: RetryPolicy,
}

impl<T: Transport> GraphProvisioning<T> {
    /// Creates a provisioner sending through `transport`.
    #[must_use]
    pub fn new(
        transport: T,
        admin_username: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            admin_username: admin_username.into(),
            admin_password: admin_password.into(),
            retry: RetryPolicy::standard(),
        }
    }

    /// Replaces the resend policy used by cleanup and the janitor.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    fn request(
        &self,
        method: &str,
        base_url: &str,
        path: &str,
        body: RequestBody,
    ) -> Result<TestRequest, RequestError> {
        let url = sanitize_url(&format!("{base_url}/{GRAPH_PATH}/{path}"), false);
        let mut builder = TestRequest::builder()
            .method(method)
            .url(url)
            .basic_auth(self.admin_username.clone(), self.admin_password.clone());
        if matches!(body, RequestBody::Json(_)) {
            builder = builder.header("Content-Type", "application/json");
        }
        builder.body(body).build()
    }
}

impl<T: Transport> Provisioning for GraphProvisioning<T> {
    fn transport(&self) -> &dyn Transport {
        &self.transport
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn create_user_request(
        &self,
        base_url: &str,
        user: &NewUser,
    ) -> Result<TestRequest, RequestError> {
        let payload = serde_json::json!({
            "onPremisesSamAccountName": user.username,
            "passwordProfile": { "password": user.password },
            "displayName": user.display_name,
            "mail": user.email,
            "accountEnabled": true,
        });
        self.request("POST", base_url, "users", RequestBody::Json(payload))
    }

    fn delete_user_request(
        &self,
        base_url: &str,
        username: &str,
    ) -> Result<TestRequest, RequestError> {
        let path = format!("users/{}", encode_segment(username));
        self.request("DELETE", base_url, &path, RequestBody::Empty)
    }

    fn user_request(&self, base_url: &str, username: &str) -> Result<TestRequest, RequestError> {
        let path = format!("users/{}", encode_segment(username));
        self.request("GET", base_url, &path, RequestBody::Empty)
    }

    fn create_group_request(
        &self,
        base_url: &str,
        name: &str,
    ) -> Result<TestRequest, RequestError> {
        let payload = serde_json::json!({ "displayName": name });
        self.request("POST", base_url, "groups", RequestBody::Json(payload))
    }

    fn delete_group_request(
        &self,
        base_url: &str,
        group: &str,
    ) -> Result<TestRequest, RequestError> {
        let path = format!("groups/{}", encode_segment(group));
        self.request("DELETE", base_url, &path, RequestBody::Empty)
    }

    fn group_request(&self, base_url: &str, name: &str) -> Result<TestRequest, RequestError> {
        let path = format!("groups/{}", encode_segment(name));
        self.request("GET", base_url, &path, RequestBody::Empty)
    }
}
