//! Configuration loading via `ortho-config`.
//!
//! Credentials and resolution settings merge defaults, `nova-machine.toml`,
//! and `OS_*` environment variables.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::resolve::{AddressSelector, ResolutionPolicy};

/// Port probed when waiting for SSH.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// OpenStack settings derived from environment variables and configuration
/// files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "OS",
    discovery(
        app_name = "nova-machine",
        env_var = "NOVA_MACHINE_CONFIG_PATH",
        config_file_name = "nova-machine.toml",
        dotfile_name = ".nova-machine.toml",
        project_file_name = "nova-machine.toml"
    )
)]
pub struct OpenStackConfig {
    /// Keystone user name.
    pub username: String,
    /// Keystone password or API key.
    pub api_key: String,
    /// Keystone endpoint, with or without the `/v3` suffix.
    pub auth_url: String,
    /// Project the token is scoped to.
    pub tenant: String,
    /// Domain of both the user and the project. Defaults to `Default`.
    #[ortho_config(default = "Default".to_owned())]
    pub domain: String,
    /// Region used to pick the compute endpoint from the service catalogue.
    pub region: Option<String>,
    /// Network whose last address is used to reach the instance.
    pub network: Option<String>,
    /// Address slot used to reach the instance. The value `floating_ip`
    /// selects the configured floating IP.
    pub address_id: Option<String>,
    /// Floating IP attached to the instance outside this tool.
    pub floating_ip: Option<String>,
    /// Host address advertised to the guest for NFS exports.
    pub nfs_host_ip: Option<String>,
    /// Port probed while waiting for SSH after a reboot.
    #[ortho_config(default = DEFAULT_SSH_PORT)]
    pub ssh_port: u16,
    /// `tracing` filter directive.
    #[ortho_config(default = "info".to_owned())]
    pub log_filter: String,
    /// Log output format, `compact` or `json`.
    #[ortho_config(default = "compact".to_owned())]
    pub log_format: String,
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
}

impl OpenStackConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: set {} or add {} to [openstack] in nova-machine.toml",
                metadata.description, metadata.env_var, metadata.toml_key
            )));
        }
        Ok(())
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// still merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails, including when a
    /// required field is absent from every source.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("nova-machine")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation on required fields. Error messages name
    /// the environment variable and configuration key to set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required field is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.username,
            &FieldMetadata::new("OpenStack user name", "OS_USERNAME", "username"),
        )?;
        Self::require_field(
            &self.api_key,
            &FieldMetadata::new("OpenStack API key", "OS_API_KEY", "api_key"),
        )?;
        Self::require_field(
            &self.auth_url,
            &FieldMetadata::new("Keystone auth URL", "OS_AUTH_URL", "auth_url"),
        )?;
        Self::require_field(
            &self.tenant,
            &FieldMetadata::new("OpenStack tenant", "OS_TENANT", "tenant"),
        )?;
        Ok(())
    }

    /// Builds the address resolution policy from the `network`,
    /// `address_id`, and `nfs_host_ip` settings.
    #[must_use]
    pub fn resolution_policy(&self) -> ResolutionPolicy {
        let selector =
            AddressSelector::from_settings(self.network.as_deref(), self.address_id.as_deref());
        let host_ip = self
            .nfs_host_ip
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned);
        ResolutionPolicy::new(selector).with_host_ip(host_ip)
    }

    /// Floating IP with surrounding whitespace removed, if set and non-blank.
    #[must_use]
    pub fn attached_floating_ip(&self) -> Option<String> {
        self.floating_ip
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
