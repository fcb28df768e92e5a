//! User and group provisioning steps.

use crate::assertions::assert_status;
use crate::batch::join_in_order;
use crate::fixtures::{GroupRecord, UserRecord};
use crate::provisioning::{NewUser, Provisioning, created_id};
use crate::request::TestRequest;
use crate::response::HttpResponse;
use crate::transport::{RetryPolicy, Transport};

use super::{DispatchError, STATUS_CREATED, STATUS_NO_CONTENT, ScenarioContext};

impl<T: Transport, P: Provisioning> ScenarioContext<T, P> {
    fn new_user(&self, user: &str, explicit_password: Option<&str>) -> NewUser {
        NewUser {
            username: self.credentials.username(user),
            password: explicit_password.map_or_else(
                || self.password_for(user),
                |marker| self.credentials.password(marker),
            ),
            display_name: self.credentials.default_display_name(user),
            email: self.credentials.default_email(user),
        }
    }

    fn register_user(&mut self, new_user: &NewUser, response: &HttpResponse) {
        let record = UserRecord::new(&new_user.username, &new_user.password)
            .with_display_name(&new_user.display_name)
            .with_email(&new_user.email)
            .with_id(created_id(response));
        self.fixtures.users.add(self.target, record);
    }

    /// Sends an administrator request built by the provisioning service and
    /// records the response under the admin's name.
    async fn send_as_admin(
        &mut self,
        request: TestRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, DispatchError> {
        let admin = self.credentials.admin_username().to_owned();
        self.dispatch(request, Some(&admin), policy).await
    }

    async fn create_user_with(
        &mut self,
        user: &str,
        password: Option<&str>,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, DispatchError> {
        let new_user = self.new_user(user, password);
        let request = self
            .provisioning
            .create_user_request(self.urls.get(self.target), &new_user)?;
        let response = self.send_as_admin(request, policy).await?;
        if response.status == STATUS_CREATED {
            self.register_user(&new_user, &response);
        }
        Ok(response)
    }

    async fn create_group_with(
        &mut self,
        name: &str,
        policy: RetryPolicy,
    ) -> Result<HttpResponse, DispatchError> {
        let request = self
            .provisioning
            .create_group_request(self.urls.get(self.target), name)?;
        let response = self.send_as_admin(request, policy).await?;
        if response.status == STATUS_CREATED {
            self.fixtures
                .groups
                .add(self.target, GroupRecord::new(name, created_id(&response)));
        }
        Ok(response)
    }

    /// Creates `user` as the administrator and records the response. The
    /// user is registered only when the server answers 201.
    ///
    /// `password` may be a marker such as `%alt1%`; without one the user's
    /// default password is used.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] when the request fails.
    pub async fn create_user(
        &mut self,
        user: &str,
        password: Option<&str>,
    ) -> Result<HttpResponse, DispatchError> {
        let policy = self.retry;
        self.create_user_with(user, password, policy).await
    }

    /// `Given user "X" has been created`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Setup`] unless the server answers 201.
    pub async fn user_has_been_created(
        &mut self,
        user: &str,
        password: Option<&str>,
    ) -> Result<(), DispatchError> {
        let policy = self.setup_policy();
        let response = self.create_user_with(user, password, policy).await?;
        assert_status(response.status, STATUS_CREATED).map_err(DispatchError::Setup)
    }

    /// Creates several users concurrently. Successful ones are registered
    /// before the failures are reported together.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Batch`] naming each user that could not be
    /// created.
    pub async fn users_have_been_created(&mut self, users: &[&str]) -> Result<(), DispatchError> {
        let new_users: Vec<NewUser> = users.iter().map(|user| self.new_user(user, None)).collect();
        let requests = new_users
            .iter()
            .map(|new_user| {
                self.provisioning
                    .create_user_request(self.base_url(), new_user)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let policy = self.setup_policy();
        let results = join_in_order(
            requests
                .into_iter()
                .map(|request| self.exchange(request, policy)),
        )
        .await;

        let mut failures = Vec::new();
        for (new_user, result) in new_users.iter().zip(results) {
            match result {
                Ok(response) if response.status == STATUS_CREATED => {
                    self.register_user(new_user, &response);
                }
                Ok(response) => failures.push(format!(
                    "creating user '{}': HTTP status code {} is not the expected value {STATUS_CREATED}",
                    new_user.username, response.status
                )),
                Err(err) => failures.push(format!("creating user '{}': {err}", new_user.username)),
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Batch { failures })
        }
    }

    /// Deletes `user` and records the response. On success the user is
    /// marked as no longer expected to exist.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] when the request fails.
    pub async fn delete_user(&mut self, user: &str) -> Result<HttpResponse, DispatchError> {
        let username = self.credentials.username(user);
        let request = self
            .provisioning
            .delete_user_request(self.urls.get(self.target), &username)?;
        let policy = self.retry;
        let response = self.send_as_admin(request, policy).await?;
        if !response.is_failure() {
            self.fixtures.users.mark_not_expected_to_exist(&username);
        }
        Ok(response)
    }

    /// `Given user "X" has been deleted`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Setup`] unless the server answers 204.
    pub async fn user_has_been_deleted(&mut self, user: &str) -> Result<(), DispatchError> {
        let response = self.delete_user(user).await?;
        assert_status(response.status, STATUS_NO_CONTENT).map_err(DispatchError::Setup)
    }

    /// Whether the server knows `user`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] when the probe fails.
    pub async fn user_exists(&self, user: &str) -> Result<bool, DispatchError> {
        let username = self.credentials.username(user);
        let request = self.provisioning.user_request(self.base_url(), &username)?;
        let response = self.exchange(request, self.retry).await?;
        Ok(!response.is_failure())
    }

    /// Creates group `name` and records the response; 201 registers it.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] when the request fails.
    pub async fn create_group(&mut self, name: &str) -> Result<HttpResponse, DispatchError> {
        let policy = self.retry;
        self.create_group_with(name, policy).await
    }

    /// `Given group "X" has been created`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Setup`] unless the server answers 201.
    pub async fn group_has_been_created(&mut self, name: &str) -> Result<(), DispatchError> {
        let policy = self.setup_policy();
        let response = self.create_group_with(name, policy).await?;
        assert_status(response.status, STATUS_CREATED).map_err(DispatchError::Setup)
    }

    /// Deletes group `name`, by id when one was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] when the request fails.
    pub async fn delete_group(&mut self, name: &str) -> Result<HttpResponse, DispatchError> {
        let handle = self
            .fixtures
            .groups
            .id_of(name)
            .unwrap_or(name)
            .to_owned();
        let request = self
            .provisioning
            .delete_group_request(self.urls.get(self.target), &handle)?;
        let policy = self.retry;
        let response = self.send_as_admin(request, policy).await?;
        if !response.is_failure() {
            self.fixtures.groups.mark_not_expected_to_exist(name);
        }
        Ok(response)
    }

    /// Whether the server knows group `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transport`] when the probe fails.
    pub async fn group_exists(&self, name: &str) -> Result<bool, DispatchError> {
        let request = self.provisioning.group_request(self.base_url(), name)?;
        let response = self.exchange(request, self.retry).await?;
        Ok(!response.is_failure())
    }
}
