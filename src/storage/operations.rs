//! Storage management operations
//!
//! This module defines the management-plane seam the provisioner talks to
//! and its Azure Resource Manager implementation.

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, Method};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::credential::ConnectionCredential;
use super::models::{
    Container, NameAvailability, PublicAccessLevel, ResourceGroup, StorageAccount,
    StorageAccountCreateRequest,
};
use crate::auth::provider::{AzureAuthProvider, MANAGEMENT_SCOPE};
use crate::error::{BlobctlError, Result};
use crate::utils::helpers::generate_uuid;
use crate::utils::network::{classify_network_error, create_http_client, NetworkConfig};

const ARM_ENDPOINT: &str = "https://management.azure.com";
const RESOURCE_GROUP_API_VERSION: &str = "2021-04-01";
const STORAGE_API_VERSION: &str = "2023-01-01";

/// Trait for storage management operations
///
/// Lookups return `Ok(None)` for resources that do not exist; creates are
/// only called for resources that were just looked up and found missing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageOperations: Send + Sync {
    /// Get a resource group
    async fn get_resource_group(&self, name: &str) -> Result<Option<ResourceGroup>>;

    /// Create a resource group
    async fn create_resource_group(&self, name: &str, region: &str) -> Result<ResourceGroup>;

    /// Get a storage account
    async fn get_storage_account(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<StorageAccount>>;

    /// Check whether a storage account name is free globally
    async fn check_name_availability(&self, name: &str) -> Result<NameAvailability>;

    /// Create a storage account and wait until it is usable
    async fn create_storage_account(
        &self,
        request: &StorageAccountCreateRequest,
    ) -> Result<StorageAccount>;

    /// Get a blob container
    async fn get_container(
        &self,
        resource_group: &str,
        storage_account: &str,
        name: &str,
    ) -> Result<Option<Container>>;

    /// Create a blob container
    async fn create_container(
        &self,
        resource_group: &str,
        storage_account: &str,
        name: &str,
        public_access: PublicAccessLevel,
    ) -> Result<Container>;

    /// Fetch the connection credential for a storage account
    async fn get_connection_credential(
        &self,
        resource_group: &str,
        storage_account: &str,
    ) -> Result<ConnectionCredential>;
}

/// Polling settings for long-running account creation
#[derive(Debug, Clone)]
pub struct ProvisioningPoll {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for ProvisioningPoll {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Azure Resource Manager implementation
pub struct AzureStorageOperations {
    auth_provider: Arc<dyn AzureAuthProvider>,
    http_client: Client,
    subscription_id: String,
    poll: ProvisioningPoll,
}

impl AzureStorageOperations {
    /// Create a new Azure storage operations instance
    pub fn new(
        auth_provider: Arc<dyn AzureAuthProvider>,
        subscription_id: String,
        poll: ProvisioningPoll,
    ) -> Result<Self> {
        if subscription_id.trim().is_empty() {
            return Err(BlobctlError::config(
                "Subscription ID is required (set AZURE_SUBSCRIPTION_ID)",
            ));
        }

        let http_client = create_http_client(&NetworkConfig::default())?;

        Ok(Self {
            auth_provider,
            http_client,
            subscription_id,
            poll,
        })
    }

    /// Create authorized headers for Azure REST API
    async fn create_headers(&self) -> Result<HeaderMap> {
        let token = self.auth_provider.get_token(&[MANAGEMENT_SCOPE]).await?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bearer {}", token.token.secret())
                .parse()
                .map_err(|e| BlobctlError::authentication(format!("Invalid token format: {}", e)))?,
        );
        headers.insert(
            "Content-Type",
            "application/json"
                .parse()
                .map_err(|e| BlobctlError::network(format!("Invalid header: {}", e)))?,
        );
        headers.insert(
            "x-ms-client-request-id",
            generate_uuid()
                .parse()
                .map_err(|e| BlobctlError::network(format!("Invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    fn resource_group_path(&self, resource_group: &str) -> String {
        format!(
            "/subscriptions/{}/resourcegroups/{}",
            self.subscription_id, resource_group
        )
    }

    fn storage_account_path(&self, resource_group: &str, name: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}",
            self.subscription_id, resource_group, name
        )
    }

    fn container_path(&self, resource_group: &str, storage_account: &str, name: &str) -> String {
        format!(
            "{}/blobServices/default/containers/{}",
            self.storage_account_path(resource_group, storage_account),
            name
        )
    }

    /// Build Azure Resource Manager URL
    fn build_arm_url(&self, path: &str, api_version: &str) -> String {
        format!("{}{}?api-version={}", ARM_ENDPOINT, path, api_version)
    }

    /// Send one ARM request; `Ok(None)` for 404
    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<Option<Value>> {
        let headers = self.create_headers().await?;
        tracing::debug!("{} {}", method, url);

        let mut request = self.http_client.request(method, url).headers(headers);
        request = match body {
            Some(body) => request.json(body),
            None => request.body(""),
        };

        let response = request
            .send()
            .await
            .map_err(|e| classify_network_error(&e, url))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }

        let text = response
            .text()
            .await
            .map_err(|e| classify_network_error(&e, url))?;

        if !(200..300).contains(&status) {
            return Err(parse_azure_error(status, &text));
        }

        if text.trim().is_empty() {
            return Ok(Some(Value::Null));
        }

        let value = serde_json::from_str(&text).map_err(|e| {
            BlobctlError::serialization(format!("Failed to parse response from {}: {}", url, e))
        })?;
        Ok(Some(value))
    }

    /// Wait for a freshly created account to reach `Succeeded`
    async fn wait_for_storage_account(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<StorageAccount> {
        let deadline = Instant::now() + self.poll.timeout;

        loop {
            if let Some(account) = self.get_storage_account(resource_group, name).await? {
                if account.is_provisioned() {
                    return Ok(account);
                }
                if account.provisioning_state.eq_ignore_ascii_case("failed") {
                    return Err(BlobctlError::remote(format!(
                        "Provisioning of storage account '{}' failed",
                        name
                    )));
                }
                tracing::debug!(
                    "Storage account '{}' is {}",
                    name,
                    account.provisioning_state
                );
            }

            if Instant::now() >= deadline {
                return Err(BlobctlError::timeout(format!(
                    "Storage account '{}' was not ready after {}s",
                    name,
                    self.poll.timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll.interval).await;
        }
    }
}

#[async_trait]
impl StorageOperations for AzureStorageOperations {
    async fn get_resource_group(&self, name: &str) -> Result<Option<ResourceGroup>> {
        let url = self.build_arm_url(&self.resource_group_path(name), RESOURCE_GROUP_API_VERSION);
        match self.send(Method::GET, &url, None).await? {
            Some(value) => Ok(Some(parse_resource_group(&value)?)),
            None => Ok(None),
        }
    }

    async fn create_resource_group(&self, name: &str, region: &str) -> Result<ResourceGroup> {
        let url = self.build_arm_url(&self.resource_group_path(name), RESOURCE_GROUP_API_VERSION);
        let body = json!({ "location": region });

        let value = self
            .send(Method::PUT, &url, Some(&body))
            .await?
            .ok_or_else(|| BlobctlError::remote(format!("Subscription for resource group '{}' not found", name)))?;
        parse_resource_group(&value)
    }

    async fn get_storage_account(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<StorageAccount>> {
        let url = self.build_arm_url(
            &self.storage_account_path(resource_group, name),
            STORAGE_API_VERSION,
        );
        match self.send(Method::GET, &url, None).await? {
            Some(value) => Ok(Some(parse_storage_account(&value)?)),
            None => Ok(None),
        }
    }

    async fn check_name_availability(&self, name: &str) -> Result<NameAvailability> {
        let url = self.build_arm_url(
            &format!(
                "/subscriptions/{}/providers/Microsoft.Storage/checkNameAvailability",
                self.subscription_id
            ),
            STORAGE_API_VERSION,
        );
        let body = json!({
            "name": name,
            "type": "Microsoft.Storage/storageAccounts"
        });

        let value = self
            .send(Method::POST, &url, Some(&body))
            .await?
            .ok_or_else(|| BlobctlError::remote("Name availability endpoint not found"))?;
        Ok(parse_name_availability(&value))
    }

    async fn create_storage_account(
        &self,
        request: &StorageAccountCreateRequest,
    ) -> Result<StorageAccount> {
        let url = self.build_arm_url(
            &self.storage_account_path(&request.resource_group, &request.name),
            STORAGE_API_VERSION,
        );
        let body = storage_account_body(request);

        // 202 Accepted carries no body; the account shows up via polling
        self.send(Method::PUT, &url, Some(&body))
            .await?
            .ok_or_else(|| {
                BlobctlError::remote(format!(
                    "Resource group '{}' not found while creating storage account",
                    request.resource_group
                ))
            })?;

        self.wait_for_storage_account(&request.resource_group, &request.name)
            .await
    }

    async fn get_container(
        &self,
        resource_group: &str,
        storage_account: &str,
        name: &str,
    ) -> Result<Option<Container>> {
        let url = self.build_arm_url(
            &self.container_path(resource_group, storage_account, name),
            STORAGE_API_VERSION,
        );
        match self.send(Method::GET, &url, None).await? {
            Some(value) => Ok(Some(parse_container(&value, storage_account))),
            None => Ok(None),
        }
    }

    async fn create_container(
        &self,
        resource_group: &str,
        storage_account: &str,
        name: &str,
        public_access: PublicAccessLevel,
    ) -> Result<Container> {
        let url = self.build_arm_url(
            &self.container_path(resource_group, storage_account, name),
            STORAGE_API_VERSION,
        );
        let body = json!({
            "properties": { "publicAccess": public_access.arm_value() }
        });

        let value = self
            .send(Method::PUT, &url, Some(&body))
            .await?
            .ok_or_else(|| {
                BlobctlError::remote(format!(
                    "Storage account '{}' not found while creating container",
                    storage_account
                ))
            })?;
        Ok(parse_container(&value, storage_account))
    }

    async fn get_connection_credential(
        &self,
        resource_group: &str,
        storage_account: &str,
    ) -> Result<ConnectionCredential> {
        let url = self.build_arm_url(
            &format!(
                "{}/listKeys",
                self.storage_account_path(resource_group, storage_account)
            ),
            STORAGE_API_VERSION,
        );

        let value = self
            .send(Method::POST, &url, None)
            .await?
            .ok_or_else(|| {
                BlobctlError::not_found(format!(
                    "Storage account '{}' not found in resource group '{}'",
                    storage_account, resource_group
                ))
            })?;

        let key = parse_first_account_key(&value).ok_or_else(|| {
            BlobctlError::remote(format!(
                "Storage account '{}' returned no access keys",
                storage_account
            ))
        })?;
        ConnectionCredential::from_account_key(storage_account, &key)
    }
}

/// Parse Azure error response
fn parse_azure_error(status: u16, body: &str) -> BlobctlError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|error_json| {
            let error = error_json.get("error")?;
            let code = error.get("code").and_then(|c| c.as_str()).unwrap_or("Error");
            let message = error.get("message").and_then(|m| m.as_str())?;
            Some(format!("HTTP {}: {}: {}", status, code, message))
        })
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

    match status {
        401 | 403 => BlobctlError::authentication(message),
        _ => BlobctlError::remote(message),
    }
}

fn required_str<'a>(value: &'a Value, pointer: &str) -> Result<&'a str> {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .ok_or_else(|| BlobctlError::serialization(format!("Response is missing '{}'", pointer)))
}

fn parse_resource_group(value: &Value) -> Result<ResourceGroup> {
    Ok(ResourceGroup {
        name: required_str(value, "/name")?.to_string(),
        region: required_str(value, "/location")?.to_string(),
    })
}

fn parse_storage_account(value: &Value) -> Result<StorageAccount> {
    let id = value.get("id").and_then(|v| v.as_str()).unwrap_or_default();
    // /subscriptions/{sub}/resourceGroups/{rg}/providers/...
    let resource_group = id.split('/').nth(4).unwrap_or_default().to_string();

    Ok(StorageAccount {
        name: required_str(value, "/name")?.to_string(),
        resource_group,
        region: required_str(value, "/location")?.to_string(),
        sku: value
            .pointer("/sku/name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        kind: value
            .get("kind")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        allow_blob_public_access: value
            .pointer("/properties/allowBlobPublicAccess")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        minimum_tls_version: value
            .pointer("/properties/minimumTlsVersion")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        provisioning_state: value
            .pointer("/properties/provisioningState")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown")
            .to_string(),
    })
}

fn parse_container(value: &Value, storage_account: &str) -> Container {
    let public_access = value
        .pointer("/properties/publicAccess")
        .and_then(|v| v.as_str())
        .and_then(|v| v.parse().ok())
        .unwrap_or(PublicAccessLevel::None);

    Container {
        name: value
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        storage_account: storage_account.to_string(),
        public_access,
    }
}

fn parse_name_availability(value: &Value) -> NameAvailability {
    NameAvailability {
        available: value
            .get("nameAvailable")
            .and_then(|v| v.as_bool())
            .unwrap_or(false),
        reason: value
            .get("reason")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        message: value
            .get("message")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
    }
}

fn parse_first_account_key(value: &Value) -> Option<String> {
    value
        .get("keys")?
        .as_array()?
        .iter()
        .filter_map(|key| key.get("value").and_then(|v| v.as_str()))
        .find(|key| !key.trim().is_empty())
        .map(|key| key.to_string())
}

fn storage_account_body(request: &StorageAccountCreateRequest) -> Value {
    json!({
        "location": request.region,
        "sku": { "name": request.sku },
        "kind": request.kind,
        "properties": {
            "allowBlobPublicAccess": request.allow_blob_public_access,
            "minimumTlsVersion": request.minimum_tls_version,
            "supportsHttpsTrafficOnly": true
        }
    })
}
