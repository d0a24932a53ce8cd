//! Blob data-plane client
//!
//! [`BlobStore`] is the seam between the blob commands and a provider.
//! [`AzureBlobStore`] talks to one Azure container with SDK retries
//! turned off, so every call is a single attempt.

use async_trait::async_trait;
use azure_core::{request_options::IfMatchCondition, RetryOptions, StatusCode};
use azure_storage::ConnectionString;
use azure_storage_blobs::prelude::*;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use super::models::BlobInfo;
use crate::error::{BlobctlError, Result};
use crate::storage::ConnectionCredential;

/// Data-plane operations on a single container
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write a blob
    ///
    /// With `overwrite` false the write is conditional on the blob being
    /// absent, and an existing blob yields `AlreadyExists`.
    async fn put_blob(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<BlobInfo>;

    /// Read a whole blob; `NotFound` if absent
    async fn get_blob(&self, name: &str) -> Result<Vec<u8>>;

    /// Lazily list the container; every call starts a fresh listing
    fn list_blobs(&self) -> BoxStream<'static, Result<BlobInfo>>;

    /// Delete a blob; returns false if it was not there
    async fn delete_blob(&self, name: &str) -> Result<bool>;
}

/// Azure Blob Storage implementation
pub struct AzureBlobStore {
    container_client: ContainerClient,
}

impl AzureBlobStore {
    /// Build a container client from a connection credential
    pub fn from_credential(credential: &ConnectionCredential, container_name: &str) -> Result<Self> {
        let connection_string = ConnectionString::new(credential.expose())
            .map_err(|e| BlobctlError::config(format!("Invalid connection string: {e}")))?;

        let account = connection_string
            .account_name
            .ok_or_else(|| BlobctlError::config("Connection string has no AccountName"))?
            .to_string();

        let storage_credentials = connection_string
            .storage_credentials()
            .map_err(|e| BlobctlError::config(format!("Unusable connection string: {e}")))?;

        let container_client = ClientBuilder::new(account, storage_credentials)
            .retry(RetryOptions::none())
            .container_client(container_name);

        Ok(Self { container_client })
    }
}

/// What a failed data-plane call says about the blob itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlobFailure {
    /// The container exists but the blob does not
    Absent,
    /// A conditional create found the blob already there
    Present,
    Other,
}

/// Classify by status and `x-ms-error-code`
///
/// A 404 only means the blob is absent when the code says `BlobNotFound`;
/// `ContainerNotFound` and friends are real failures.
fn classify_failure(status: StatusCode, error_code: Option<&str>) -> BlobFailure {
    match (status, error_code) {
        (StatusCode::NotFound, Some("BlobNotFound")) => BlobFailure::Absent,
        (StatusCode::Conflict, Some("BlobAlreadyExists") | None) => BlobFailure::Present,
        (StatusCode::PreconditionFailed, _) => BlobFailure::Present,
        _ => BlobFailure::Other,
    }
}

fn blob_failure(error: &azure_core::Error) -> BlobFailure {
    error
        .as_http_error()
        .map(|e| classify_failure(e.status(), e.error_code()))
        .unwrap_or(BlobFailure::Other)
}

fn to_chrono(timestamp: i64) -> chrono::DateTime<Utc> {
    chrono::DateTime::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now)
}

fn blob_info_from_item(blob: &Blob) -> BlobInfo {
    BlobInfo {
        name: blob.name.clone(),
        size: blob.properties.content_length,
        content_type: blob.properties.content_type.clone(),
        last_modified: to_chrono(blob.properties.last_modified.unix_timestamp()),
        etag: blob.properties.etag.to_string(),
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    async fn put_blob(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<BlobInfo> {
        let size = content.len() as u64;

        let mut request = self
            .container_client
            .blob_client(name)
            .put_block_blob(content)
            .content_type(content_type.to_string());
        if !overwrite {
            // If-None-Match: * makes the service refuse an existing blob
            request = request.if_match(IfMatchCondition::NotMatch("*".into()));
        }

        let response = request.await.map_err(|e| {
            if !overwrite && blob_failure(&e) == BlobFailure::Present {
                BlobctlError::already_exists(format!("Blob '{name}' already exists"))
            } else {
                BlobctlError::remote(format!("Failed to upload blob '{name}': {e}"))
            }
        })?;

        Ok(BlobInfo {
            name: name.to_string(),
            size,
            content_type: content_type.to_string(),
            last_modified: to_chrono(response.last_modified.unix_timestamp()),
            etag: response.etag.to_string(),
        })
    }

    async fn get_blob(&self, name: &str) -> Result<Vec<u8>> {
        let blob_client = self.container_client.blob_client(name);

        let properties = blob_client.get_properties().await.map_err(|e| {
            if blob_failure(&e) == BlobFailure::Absent {
                BlobctlError::not_found(format!("Blob '{name}' does not exist"))
            } else {
                BlobctlError::remote(format!("Failed to read properties of blob '{name}': {e}"))
            }
        })?;

        // get_content() answers 416 for zero-length blobs
        if properties.blob.properties.content_length == 0 {
            return Ok(Vec::new());
        }

        blob_client
            .get_content()
            .await
            .map_err(|e| BlobctlError::remote(format!("Failed to download blob '{name}': {e}")))
    }

    fn list_blobs(&self) -> BoxStream<'static, Result<BlobInfo>> {
        self.container_client
            .list_blobs()
            .into_stream()
            .map_err(|e| BlobctlError::remote(format!("Failed to list blobs: {e}")))
            .map_ok(|page| {
                let items: Vec<Result<BlobInfo>> =
                    page.blobs.blobs().map(|blob| Ok(blob_info_from_item(blob))).collect();
                stream::iter(items)
            })
            .try_flatten()
            .boxed()
    }

    async fn delete_blob(&self, name: &str) -> Result<bool> {
        match self.container_client.blob_client(name).delete().await {
            Ok(_) => Ok(true),
            Err(e) if blob_failure(&e) == BlobFailure::Absent => Ok(false),
            Err(e) => Err(BlobctlError::remote(format!(
                "Failed to delete blob '{name}': {e}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_from_credential() {
        let credential = ConnectionCredential::from_account_key(
            "vaultstore1",
            "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==",
        )
        .unwrap();
        assert!(AzureBlobStore::from_credential(&credential, "files").is_ok());
    }

    #[test]
    fn test_store_requires_account_name() {
        let credential = ConnectionCredential::new("AccountKey=abc==;EndpointSuffix=core.windows.net").unwrap();
        assert!(matches!(
            AzureBlobStore::from_credential(&credential, "files"),
            Err(BlobctlError::ConfigError(_))
        ));
    }

    #[test]
    fn test_only_blob_not_found_means_absent() {
        assert_eq!(
            classify_failure(StatusCode::NotFound, Some("BlobNotFound")),
            BlobFailure::Absent
        );
        assert_eq!(
            classify_failure(StatusCode::NotFound, Some("ContainerNotFound")),
            BlobFailure::Other
        );
        assert_eq!(classify_failure(StatusCode::NotFound, None), BlobFailure::Other);
        assert_eq!(
            classify_failure(StatusCode::Forbidden, Some("AuthorizationFailure")),
            BlobFailure::Other
        );
    }

    #[test]
    fn test_conditional_create_conflict_means_present() {
        assert_eq!(
            classify_failure(StatusCode::Conflict, Some("BlobAlreadyExists")),
            BlobFailure::Present
        );
        assert_eq!(
            classify_failure(StatusCode::PreconditionFailed, Some("ConditionNotMet")),
            BlobFailure::Present
        );
        assert_eq!(
            classify_failure(StatusCode::Conflict, Some("LeaseIdMissing")),
            BlobFailure::Other
        );
    }

    #[test]
    fn test_non_http_error_is_not_absent() {
        let error = azure_core::Error::message(azure_core::error::ErrorKind::Io, "404 not found");
        assert_eq!(blob_failure(&error), BlobFailure::Other);
    }

    #[test]
    fn test_to_chrono() {
        assert_eq!(to_chrono(0).timestamp(), 0);
    }
}
