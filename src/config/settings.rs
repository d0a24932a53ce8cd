//! Configuration settings management
//!
//! This module handles loading configuration from multiple sources and
//! validating it for the command about to run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::resources::{ResourcesFile, DEFAULT_RESOURCES_FILE};
use crate::error::{BlobctlError, Result};
use crate::storage::naming::{
    is_valid_container_name, is_valid_resource_group_name, is_valid_storage_account_name,
};
use crate::storage::{
    AccountNaming, NameSuffix, ProvisionRequest, ProvisioningPoll, PublicAccessLevel,
    DEFAULT_KIND, DEFAULT_MIN_TLS_VERSION, DEFAULT_SKU,
};

pub const DEFAULT_LOG_FILE: &str = "blobctl.log";

/// Settings used only by `provision`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub storage_account_base: String,
    pub name_suffix: NameSuffix,
    pub sku: String,
    pub kind: String,
    pub container_public_access: PublicAccessLevel,
    pub allow_blob_public_access: bool,
    pub minimum_tls_version: String,
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        let poll = ProvisioningPoll::default();
        Self {
            storage_account_base: "vaultstore".to_string(),
            name_suffix: NameSuffix::default(),
            sku: DEFAULT_SKU.to_string(),
            kind: DEFAULT_KIND.to_string(),
            container_public_access: PublicAccessLevel::default(),
            allow_blob_public_access: true,
            minimum_tls_version: DEFAULT_MIN_TLS_VERSION.to_string(),
            poll_interval_secs: poll.interval.as_secs(),
            poll_timeout_secs: poll.timeout.as_secs(),
        }
    }
}

/// Account and container the blob commands work against
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub storage_account: String,
    pub container_name: String,
    /// Only ever taken from the environment
    #[serde(skip)]
    pub connection_string: Option<String>,
    #[serde(skip)]
    pub account_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_account: String::new(),
            container_name: "files".to_string(),
            connection_string: None,
            account_key: None,
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("StorageConfig")
            .field("storage_account", &self.storage_account)
            .field("container_name", &self.container_name)
            .field("connection_string", &redact(&self.connection_string))
            .field("account_key", &redact(&self.account_key))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    pub log_file: PathBuf,
    pub resources_file: PathBuf,
    pub output_json: bool,
    pub no_color: bool,
    pub provision: ProvisionConfig,
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            subscription_id: String::new(),
            resource_group: "blobctl-rg".to_string(),
            location: "eastus".to_string(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            resources_file: PathBuf::from(DEFAULT_RESOURCES_FILE),
            output_json: false,
            no_color: false,
            provision: ProvisionConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_config_path() -> Result<PathBuf> {
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| BlobctlError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("blobctl").join("blobctl.toml"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| BlobctlError::config("Unable to determine config directory"))?;
            Ok(config_dir.join("blobctl").join("blobctl.toml"))
        }
    }

    /// Load from the given file (or the default location) and the environment
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        load_config(config_path, |key| std::env::var(key).ok()).await
    }

    /// Check what `provision` needs
    pub fn validate_for_provision(&self) -> Result<()> {
        if self.subscription_id.trim().is_empty() {
            return Err(BlobctlError::config(
                "Subscription ID is required (set AZURE_SUBSCRIPTION_ID or subscription_id)",
            ));
        }
        if !is_valid_resource_group_name(&self.resource_group) {
            return Err(BlobctlError::invalid_argument(format!(
                "Invalid resource group name '{}'",
                self.resource_group
            )));
        }
        if self.location.trim().is_empty() {
            return Err(BlobctlError::config("Location is required"));
        }
        if !self.storage.storage_account.is_empty()
            && !is_valid_storage_account_name(&self.storage.storage_account)
        {
            return Err(BlobctlError::invalid_argument(format!(
                "Invalid storage account name '{}'",
                self.storage.storage_account
            )));
        }
        if !is_valid_container_name(&self.storage.container_name) {
            return Err(BlobctlError::invalid_argument(format!(
                "Invalid container name '{}'",
                self.storage.container_name
            )));
        }
        Ok(())
    }

    /// Check what the blob commands need
    pub fn validate_for_blob_ops(&self) -> Result<()> {
        if self.storage.storage_account.trim().is_empty() {
            return Err(BlobctlError::config(
                "No storage account configured. Run 'blobctl provision' or set AZURE_STORAGE_ACCOUNT",
            ));
        }
        if self.storage.container_name.trim().is_empty() {
            return Err(BlobctlError::config(
                "No container configured. Set AZURE_STORAGE_CONTAINER",
            ));
        }
        Ok(())
    }

    /// Reuse a known account name, otherwise generate one
    pub fn account_naming(&self) -> AccountNaming {
        if self.storage.storage_account.is_empty() {
            AccountNaming::Generated {
                base: self.provision.storage_account_base.clone(),
                suffix: self.provision.name_suffix,
            }
        } else {
            AccountNaming::Fixed(self.storage.storage_account.clone())
        }
    }

    pub fn provision_request(&self) -> ProvisionRequest {
        ProvisionRequest {
            resource_group: self.resource_group.clone(),
            region: self.location.clone(),
            account: self.account_naming(),
            container: self.storage.container_name.clone(),
            sku: self.provision.sku.clone(),
            kind: self.provision.kind.clone(),
            public_access: self.provision.container_public_access,
            allow_blob_public_access: self.provision.allow_blob_public_access,
            minimum_tls_version: self.provision.minimum_tls_version.clone(),
        }
    }

    pub fn provisioning_poll(&self) -> ProvisioningPoll {
        ProvisioningPoll {
            interval: Duration::from_secs(self.provision.poll_interval_secs.max(1)),
            timeout: Duration::from_secs(self.provision.poll_timeout_secs),
        }
    }
}

/// Load configuration from multiple sources with priority order:
/// 1. Command-line flags (applied by the caller)
/// 2. Environment variables
/// 3. Resources file from an earlier `provision`
/// 4. Configuration file
/// 5. Default values
pub async fn load_config<F>(config_path: Option<&Path>, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(BlobctlError::config(format!(
                    "Configuration file '{}' does not exist",
                    path.display()
                )));
            }
            load_from_file(path).await?
        }
        None => {
            let default_path = Config::get_config_path()?;
            if default_path.exists() {
                load_from_file(&default_path).await?
            } else {
                Config::default()
            }
        }
    };

    // The resources file location itself may come from the environment
    if let Some(value) = env("BLOBCTL_RESOURCES_FILE") {
        config.resources_file = PathBuf::from(value);
    }
    if let Some(resources) = ResourcesFile::load(&config.resources_file).await? {
        apply_resources(&mut config, resources);
    }

    apply_env(&mut config, env);

    Ok(config)
}

async fn load_from_file(path: &Path) -> Result<Config> {
    let contents = tokio::fs::read_to_string(path).await?;

    // Try to parse as TOML first, then JSON as fallback
    let toml_error = match toml::from_str::<Config>(&contents) {
        Ok(config) => return Ok(config),
        Err(e) => e,
    };

    serde_json::from_str::<Config>(&contents).map_err(|_| {
        BlobctlError::config(format!(
            "Failed to parse configuration file '{}': {}",
            path.display(),
            toml_error
        ))
    })
}

fn apply_resources(config: &mut Config, resources: ResourcesFile) {
    if let Some(value) = resources.resource_group {
        config.resource_group = value;
    }
    if let Some(value) = resources.storage_account {
        config.storage.storage_account = value;
    }
    if let Some(value) = resources.container {
        config.storage.container_name = value;
    }
}

fn apply_env<F>(config: &mut Config, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());

    if let Some(value) = env("DEBUG") {
        config.debug = value.to_lowercase() == "true" || value == "1";
    }
    if let Some(value) = non_empty("AZURE_SUBSCRIPTION_ID") {
        config.subscription_id = value;
    }
    if let Some(value) = non_empty("AZURE_RESOURCE_GROUP") {
        config.resource_group = value;
    }
    if let Some(value) = non_empty("AZURE_LOCATION") {
        config.location = value;
    }
    if let Some(value) = non_empty("AZURE_STORAGE_ACCOUNT") {
        config.storage.storage_account = value;
    }
    if let Some(value) = non_empty("AZURE_STORAGE_CONTAINER") {
        config.storage.container_name = value;
    }
    if let Some(value) = non_empty("AZURE_STORAGE_CONNECTION_STRING") {
        config.storage.connection_string = Some(value);
    }
    if let Some(value) = non_empty("AZURE_STORAGE_KEY") {
        config.storage.account_key = Some(value);
    }
    if let Some(value) = non_empty("BLOBCTL_LOG_FILE") {
        config.log_file = PathBuf::from(value);
    }
}
