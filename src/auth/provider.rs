//! Authentication provider trait and implementations
//!
//! Management-plane calls need an Azure AD bearer token. The provider wraps
//! `DefaultAzureCredential`, which walks environment variables, managed
//! identity and the Azure CLI login in turn.

use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{DefaultAzureCredential, TokenCredentialOptions};
use std::sync::Arc;

use crate::error::{BlobctlError, Result};

/// Scope for Azure Resource Manager tokens
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Trait for Azure authentication providers
#[async_trait]
pub trait AzureAuthProvider: Send + Sync {
    /// Get an access token for the specified scopes
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;
}

/// Default Azure Credential Provider using DefaultAzureCredential
pub struct DefaultAzureCredentialProvider {
    credential: Arc<DefaultAzureCredential>,
}

impl DefaultAzureCredentialProvider {
    /// Create a new DefaultAzureCredentialProvider
    pub fn new() -> Result<Self> {
        let credential = Arc::new(
            DefaultAzureCredential::create(TokenCredentialOptions::default()).map_err(|e| {
                BlobctlError::authentication(format!(
                    "Failed to create DefaultAzureCredential: {}",
                    e
                ))
            })?,
        );

        Ok(Self { credential })
    }
}

#[async_trait]
impl AzureAuthProvider for DefaultAzureCredentialProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        match self.credential.get_token(scopes).await {
            Ok(token) => Ok(token),
            Err(e) => {
                // Without env credentials or managed identity the CLI login is the
                // last source; report a missing CLI distinctly from a failed login.
                if !azure_cli_available().await {
                    return Err(BlobctlError::missing_dependency(format!(
                        "No Azure credential source succeeded and the Azure CLI ('az') was not found: {}",
                        e
                    )));
                }
                Err(BlobctlError::authentication(format!(
                    "Failed to get token (try 'az login'): {}",
                    e
                )))
            }
        }
    }
}

/// Check if the Azure CLI is installed
pub async fn azure_cli_available() -> bool {
    tokio::process::Command::new("az")
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}
