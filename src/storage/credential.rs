//! Connection credential handling
//!
//! A connection credential grants data-plane access to exactly one storage
//! account. It is held in zeroizing memory and never printed by `Debug`.

use std::fmt;
use zeroize::Zeroizing;

use crate::error::{BlobctlError, Result};
use crate::utils::helpers::{build_connection_string, parse_connection_string};

pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Connection string scoped to one storage account
#[derive(Clone)]
pub struct ConnectionCredential(Zeroizing<String>);

impl ConnectionCredential {
    /// Wrap a connection string, rejecting blank input
    pub fn new<S: Into<String>>(connection_string: S) -> Result<Self> {
        let value = Zeroizing::new(connection_string.into());
        if value.trim().is_empty() {
            return Err(BlobctlError::config("Connection credential is empty"));
        }
        Ok(Self(value))
    }

    /// Build the standard Azure connection string for an account key
    pub fn from_account_key(account_name: &str, account_key: &str) -> Result<Self> {
        if account_key.trim().is_empty() {
            return Err(BlobctlError::config(format!(
                "Storage account '{account_name}' returned an empty access key"
            )));
        }

        let params = [
            ("DefaultEndpointsProtocol", "https"),
            ("AccountName", account_name),
            ("AccountKey", account_key),
            ("EndpointSuffix", DEFAULT_ENDPOINT_SUFFIX),
        ];
        Self::new(build_connection_string(&params))
    }

    /// The raw connection string
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// `AccountName` field, when present
    pub fn account_name(&self) -> Option<String> {
        parse_connection_string(self.expose()).remove("AccountName")
    }
}

impl fmt::Debug for ConnectionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let account = self.account_name().unwrap_or_else(|| "unknown".to_string());
        write!(f, "ConnectionCredential(account={account}, secret=***)")
    }
}
