//! Storage resource models
//!
//! This module defines the resources the provisioner manages: resource
//! groups, storage accounts and containers, plus the requests used to
//! create them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BlobctlError, Result};

pub const DEFAULT_SKU: &str = "Standard_LRS";
pub const DEFAULT_KIND: &str = "StorageV2";
pub const DEFAULT_MIN_TLS_VERSION: &str = "TLS1_2";

/// Anonymous read access granted on a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublicAccessLevel {
    /// Private container
    None,
    /// Anonymous read of blobs, no listing
    #[default]
    Blob,
    /// Anonymous read and listing
    Container,
}

impl PublicAccessLevel {
    /// Value used by the Azure Resource Manager API
    pub fn arm_value(&self) -> &'static str {
        match self {
            PublicAccessLevel::None => "None",
            PublicAccessLevel::Blob => "Blob",
            PublicAccessLevel::Container => "Container",
        }
    }

    pub fn is_public(&self) -> bool {
        !matches!(self, PublicAccessLevel::None)
    }
}

impl fmt::Display for PublicAccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            PublicAccessLevel::None => "none",
            PublicAccessLevel::Blob => "blob",
            PublicAccessLevel::Container => "container",
        };
        write!(f, "{value}")
    }
}

impl FromStr for PublicAccessLevel {
    type Err = BlobctlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" | "private" => Ok(PublicAccessLevel::None),
            "blob" => Ok(PublicAccessLevel::Blob),
            "container" => Ok(PublicAccessLevel::Container),
            other => Err(BlobctlError::invalid_argument(format!(
                "Unknown public access level '{other}' (expected none, blob or container)"
            ))),
        }
    }
}

/// Azure resource group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGroup {
    pub name: String,
    pub region: String,
}

/// Storage account as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageAccount {
    pub name: String,
    pub resource_group: String,
    pub region: String,
    pub sku: String,
    pub kind: String,
    pub allow_blob_public_access: bool,
    pub minimum_tls_version: String,
    pub provisioning_state: String,
}

impl StorageAccount {
    pub fn is_provisioned(&self) -> bool {
        self.provisioning_state.eq_ignore_ascii_case("succeeded")
    }
}

/// Request for creating a storage account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageAccountCreateRequest {
    pub name: String,
    pub resource_group: String,
    pub region: String,
    pub sku: String,
    pub kind: String,
    pub allow_blob_public_access: bool,
    pub minimum_tls_version: String,
}

/// Blob container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub storage_account: String,
    pub public_access: PublicAccessLevel,
}

/// Result of the provider's global name check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameAvailability {
    pub available: bool,
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl NameAvailability {
    pub fn available() -> Self {
        Self {
            available: true,
            reason: None,
            message: None,
        }
    }

    pub fn unavailable<S: Into<String>>(reason: S, message: S) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
            message: Some(message.into()),
        }
    }
}

/// What an idempotent create actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
}

impl fmt::Display for ProvisionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionOutcome::Created => write!(f, "created"),
            ProvisionOutcome::AlreadyExists => write!(f, "already exists"),
        }
    }
}
