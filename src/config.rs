//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::dav::DavVersion;

/// Default server under test when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://localhost:9200";

/// Default directory for scenario and failed-scenario request logs.
pub const DEFAULT_LOG_DIR: &str = "tests/acceptance/logs";

/// Harness settings derived from defaults, configuration files,
/// environment variables, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "DAVCHECK",
    discovery(
        app_name = "davcheck",
        env_var = "DAVCHECK_CONFIG_PATH",
        config_file_name = "davcheck.toml",
        dotfile_name = ".davcheck.toml",
        project_file_name = "davcheck.toml"
    )
)]
pub struct HarnessConfig {
    /// URL of the local server under test.
    #[ortho_config(default = DEFAULT_BASE_URL.to_owned())]
    pub base_url: String,
    /// URL of the federated (remote) server. Falls back to `base_url`.
    pub remote_base_url: Option<String>,
    /// Administrator login name.
    #[ortho_config(default = "admin".to_owned())]
    pub admin_username: String,
    /// Administrator password.
    #[ortho_config(default = "admin".to_owned())]
    pub admin_password: String,
    /// Password behind the `%regular%` marker and the default user password.
    #[ortho_config(default = "123456".to_owned())]
    pub regular_user_password: String,
    /// Password behind the `%alt1%` marker.
    #[ortho_config(default = "1234".to_owned())]
    pub alt1_user_password: String,
    /// Password behind the `%alt2%` marker.
    #[ortho_config(default = "AaBb2Cc3Dd4".to_owned())]
    pub alt2_user_password: String,
    /// Password behind the `%alt3%` marker.
    #[ortho_config(default = "aVeryLongPassword42TheMeaningOfLife".to_owned())]
    pub alt3_user_password: String,
    /// Password behind the `%alt4%` marker.
    #[ortho_config(default = "ThisIsThe4thAlternatePwd".to_owned())]
    pub alt4_user_password: String,
    /// Password behind the `%subadmin%` marker.
    #[ortho_config(default = "IamAJuniorAdmin42".to_owned())]
    pub sub_admin_password: String,
    /// Password behind the `%altadmin%` marker.
    #[ortho_config(default = "IHave99LotsOfPriv".to_owned())]
    pub alt_admin_password: String,
    /// Password behind the `%public%` marker.
    #[ortho_config(default = "publicPwd:1".to_owned())]
    pub public_link_share_password: String,
    /// WebDAV path layout: 1 old, 2 new, 3 spaces.
    #[ortho_config(default = 2)]
    pub dav_path_version: u8,
    /// OCS API version used for success-status checks.
    #[ortho_config(default = 1)]
    pub ocs_api_version: u8,
    /// Whether DAV paths carry the `remote.php/` prefix.
    #[ortho_config(default = true)]
    pub with_remote_php: bool,
    /// Per-request timeout in seconds.
    #[ortho_config(default = 60)]
    pub request_timeout_secs: u64,
    /// Whether outbound requests carry the step line reference in
    /// `X-Request-ID`.
    #[ortho_config(default = false)]
    pub send_scenario_line_references: bool,
    /// Path to a `usernames.json` replacement manifest.
    pub usernames_file: Option<String>,
    /// Path to the expected-failures manifest.
    pub expected_failures_file: Option<String>,
    /// Directory receiving `scenario.log` and `failed.log`.
    #[ortho_config(default = DEFAULT_LOG_DIR.to_owned())]
    pub log_dir: String,
}

impl HarnessConfig {
    /// Builds a configuration carrying the documented defaults for every
    /// field except the server URL.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            remote_base_url: None,
            admin_username: String::from("admin"),
            admin_password: String::from("admin"),
            regular_user_password: String::from("123456"),
            alt1_user_password: String::from("1234"),
            alt2_user_password: String::from("AaBb2Cc3Dd4"),
            alt3_user_password: String::from("aVeryLongPassword42TheMeaningOfLife"),
            alt4_user_password: String::from("ThisIsThe4thAlternatePwd"),
            sub_admin_password: String::from("IamAJuniorAdmin42"),
            alt_admin_password: String::from("IHave99LotsOfPriv"),
            public_link_share_password: String::from("publicPwd:1"),
            dav_path_version: 2,
            ocs_api_version: 1,
            with_remote_php: true,
            request_timeout_secs: 60,
            send_scenario_line_references: false,
            usernames_file: None,
            expected_failures_file: None,
            log_dir: DEFAULT_LOG_DIR.to_owned(),
        }
    }
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn hint(&self) -> String {
        format!(
            "{}: set {} or add {} to davcheck.toml",
            self.description, self.env_var, self.toml_key
        )
    }
}

impl HarnessConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!("missing {}", metadata.hint())));
        }
        Ok(())
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("davcheck")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Returns the remote server URL, falling back to the local one.
    #[must_use]
    pub fn remote_url(&self) -> &str {
        self.remote_base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(&self.base_url)
    }

    /// Returns the configured DAV path layout.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the version is not 1, 2 or 3.
    pub fn dav_version(&self) -> Result<DavVersion, ConfigError> {
        DavVersion::try_from(self.dav_path_version).map_err(|_| {
            ConfigError::Invalid(format!(
                "dav_path_version must be 1, 2 or 3 but was {}; {}",
                self.dav_path_version,
                FieldMetadata::new(
                    "DAV path version",
                    "DAVCHECK_DAV_PATH_VERSION",
                    "dav_path_version"
                )
                .hint()
            ))
        })
    }

    /// Performs semantic validation on required fields. Error messages include
    /// guidance on how to provide missing values via environment variables or
    /// configuration files.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is empty,
    /// or [`ConfigError::Invalid`] when a value is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = FieldMetadata::new("server base URL", "DAVCHECK_BASE_URL", "base_url");
        Self::require_field(&self.base_url, &base_url)?;
        Url::parse(self.base_url.trim()).map_err(|err| {
            ConfigError::Invalid(format!("invalid {} ({err})", base_url.hint()))
        })?;
        if let Some(remote) = self.remote_base_url.as_deref()
            && !remote.trim().is_empty()
        {
            Url::parse(remote.trim()).map_err(|err| {
                ConfigError::Invalid(format!(
                    "invalid {} ({err})",
                    FieldMetadata::new(
                        "remote server URL",
                        "DAVCHECK_REMOTE_BASE_URL",
                        "remote_base_url"
                    )
                    .hint()
                ))
            })?;
        }
        Self::require_field(
            &self.admin_username,
            &FieldMetadata::new(
                "administrator username",
                "DAVCHECK_ADMIN_USERNAME",
                "admin_username",
            ),
        )?;
        Self::require_field(
            &self.admin_password,
            &FieldMetadata::new(
                "administrator password",
                "DAVCHECK_ADMIN_PASSWORD",
                "admin_password",
            ),
        )?;
        Self::require_field(
            &self.log_dir,
            &FieldMetadata::new("log directory", "DAVCHECK_LOG_DIR", "log_dir"),
        )?;
        self.dav_version()?;
        if !(1..=2).contains(&self.ocs_api_version) {
            return Err(ConfigError::Invalid(format!(
                "ocs_api_version must be 1 or 2 but was {}; {}",
                self.ocs_api_version,
                FieldMetadata::new("OCS API version", "DAVCHECK_OCS_API_VERSION", "ocs_api_version")
                    .hint()
            )));
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is present but unusable.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
