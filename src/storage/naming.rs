//! Resource naming rules
//!
//! Storage account names are global across Azure, so new accounts get a
//! base name plus a uniqueness token. This module builds those names and
//! validates the names the provisioner and blob commands accept.

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BlobctlError, Result};

pub const STORAGE_ACCOUNT_MIN_LENGTH: usize = 3;
pub const STORAGE_ACCOUNT_MAX_LENGTH: usize = 24;
const CONTAINER_MAX_LENGTH: usize = 63;
const RESOURCE_GROUP_MAX_LENGTH: usize = 90;
const BLOB_NAME_MAX_LENGTH: usize = 1024;

/// Source of the uniqueness token appended to a base account name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NameSuffix {
    /// Unix timestamp in seconds
    #[default]
    Timestamp,
    /// Random five digit integer
    Random,
}

impl NameSuffix {
    /// Produce a token for this strategy at `now`
    pub fn token(&self, now: DateTime<Utc>) -> String {
        match self {
            NameSuffix::Timestamp => now.timestamp().to_string(),
            NameSuffix::Random => format!("{:05}", rand::thread_rng().gen_range(0..100_000u32)),
        }
    }
}

/// Check if a name is a valid Azure storage account name
pub fn is_valid_storage_account_name(name: &str) -> bool {
    if name.len() < STORAGE_ACCOUNT_MIN_LENGTH || name.len() > STORAGE_ACCOUNT_MAX_LENGTH {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Check if a name is a valid blob container name
pub fn is_valid_container_name(name: &str) -> bool {
    if name.len() < 3 || name.len() > CONTAINER_MAX_LENGTH || name.contains("--") {
        return false;
    }

    Regex::new(r"^[a-z0-9][a-z0-9-]*[a-z0-9]$")
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

/// Check if a name is a valid resource group name
pub fn is_valid_resource_group_name(name: &str) -> bool {
    if name.is_empty() || name.chars().count() > RESOURCE_GROUP_MAX_LENGTH || name.ends_with('.') {
        return false;
    }

    name.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')'))
}

/// Validate a blob name; surrounding whitespace is rejected, not trimmed
pub fn validate_blob_name(name: &str) -> Result<&str> {
    if name.trim().is_empty() {
        return Err(BlobctlError::invalid_argument("Blob name cannot be empty"));
    }
    if name.trim() != name {
        return Err(BlobctlError::invalid_argument(format!(
            "Blob name '{name}' has leading or trailing whitespace"
        )));
    }
    if name.len() > BLOB_NAME_MAX_LENGTH {
        return Err(BlobctlError::invalid_argument(format!(
            "Blob name is {} characters long; the limit is {BLOB_NAME_MAX_LENGTH}",
            name.len()
        )));
    }
    Ok(name)
}

/// Reduce a base name to lowercase ASCII alphanumerics
pub fn sanitize_account_base(base: &str) -> String {
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Combine a base name and a uniqueness token into an account name
///
/// The base is sanitized and truncated so that the token always survives
/// intact; the token is what keeps names from colliding.
pub fn storage_account_name_with_token(base: &str, token: &str) -> Result<String> {
    let token = sanitize_account_base(token);
    if token.len() >= STORAGE_ACCOUNT_MAX_LENGTH {
        return Err(BlobctlError::invalid_argument(format!(
            "Uniqueness token '{token}' leaves no room for a base name"
        )));
    }

    let mut base = sanitize_account_base(base);
    if base.is_empty() {
        return Err(BlobctlError::invalid_argument(
            "Storage account base name must contain at least one letter or digit",
        ));
    }
    base.truncate(STORAGE_ACCOUNT_MAX_LENGTH - token.len());

    let name = format!("{base}{token}");
    if !is_valid_storage_account_name(&name) {
        return Err(BlobctlError::invalid_argument(format!(
            "Generated storage account name '{name}' must be {STORAGE_ACCOUNT_MIN_LENGTH}-{STORAGE_ACCOUNT_MAX_LENGTH} lowercase letters or digits"
        )));
    }

    Ok(name)
}

/// Generate a storage account name from a base and a suffix strategy
pub fn generate_storage_account_name(base: &str, suffix: NameSuffix) -> Result<String> {
    storage_account_name_with_token(base, &suffix.token(Utc::now()))
}
