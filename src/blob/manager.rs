//! Core blob manager for file operations
//!
//! This module provides the BlobManager struct with the four blob
//! operations: upload, download, list and delete. Each outcome is written
//! to the activity log.

use futures::stream::{BoxStream, TryStreamExt};
use std::path::Path;
use std::sync::Arc;

use super::models::{guess_content_type, BlobInfo};
use super::store::{AzureBlobStore, BlobStore};
use crate::error::{BlobctlError, Result};
use crate::logging::ActivityLog;
use crate::storage::naming::validate_blob_name;
use crate::storage::ConnectionCredential;

/// Core blob storage manager
pub struct BlobManager {
    store: Arc<dyn BlobStore>,
    container_name: String,
    activity: Arc<dyn ActivityLog>,
}

impl BlobManager {
    /// Create a new BlobManager instance
    pub fn new(
        store: Arc<dyn BlobStore>,
        container_name: String,
        activity: Arc<dyn ActivityLog>,
    ) -> Self {
        Self {
            store,
            container_name,
            activity,
        }
    }

    /// Create a BlobManager backed by Azure Blob Storage
    pub fn for_azure(
        credential: &ConnectionCredential,
        container_name: &str,
        activity: Arc<dyn ActivityLog>,
    ) -> Result<Self> {
        let store = Arc::new(AzureBlobStore::from_credential(credential, container_name)?);
        Ok(Self::new(store, container_name.to_string(), activity))
    }

    /// Upload a local file as `blob_name`
    ///
    /// The local file is checked before any remote call is made.
    pub async fn upload(&self, local_path: &Path, blob_name: &str, overwrite: bool) -> Result<BlobInfo> {
        let result = self.upload_inner(local_path, blob_name, overwrite).await;
        self.record(
            &result,
            || format!("Uploaded '{}' to '{}/{}'", local_path.display(), self.container_name, blob_name),
            |e| format!("Upload of '{}' as '{}' failed: {}", local_path.display(), blob_name, e),
        );
        result
    }

    async fn upload_inner(&self, local_path: &Path, blob_name: &str, overwrite: bool) -> Result<BlobInfo> {
        let blob_name = validate_blob_name(blob_name)?;

        if !local_path.is_file() {
            return Err(BlobctlError::not_found(format!(
                "Local file '{}' does not exist",
                local_path.display()
            )));
        }

        let content = tokio::fs::read(local_path).await?;
        let content_type = guess_content_type(blob_name);

        self.store
            .put_blob(blob_name, content, &content_type, overwrite)
            .await
            .map_err(|e| match e {
                BlobctlError::AlreadyExists(_) => BlobctlError::already_exists(format!(
                    "Blob '{}' already exists in container '{}'",
                    blob_name, self.container_name
                )),
                other => other,
            })
    }

    /// Download `blob_name` into `local_path`, returning the byte count
    pub async fn download(&self, blob_name: &str, local_path: &Path) -> Result<u64> {
        let result = self.download_inner(blob_name, local_path).await;
        self.record(
            &result,
            || format!("Downloaded '{}/{}' to '{}'", self.container_name, blob_name, local_path.display()),
            |e| format!("Download of '{}' failed: {}", blob_name, e),
        );
        result
    }

    async fn download_inner(&self, blob_name: &str, local_path: &Path) -> Result<u64> {
        let blob_name = validate_blob_name(blob_name)?;
        let content = self.store.get_blob(blob_name).await?;

        if let Some(parent) = local_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(local_path, &content).await?;

        Ok(content.len() as u64)
    }

    /// Lazily list the container
    ///
    /// Nothing is fetched until the stream is polled; calling this again
    /// starts over from the first page.
    pub fn list(&self) -> BoxStream<'static, Result<BlobInfo>> {
        self.store.list_blobs()
    }

    /// Collect the full listing
    pub async fn list_all(&self) -> Result<Vec<BlobInfo>> {
        let result: Result<Vec<BlobInfo>> = self.list().try_collect().await;
        self.record(
            &result,
            || {
                let count = result.as_ref().map(|blobs| blobs.len()).unwrap_or_default();
                format!("Listed {} blob(s) in '{}'", count, self.container_name)
            },
            |e| format!("Listing '{}' failed: {}", self.container_name, e),
        );
        result
    }

    /// Delete `blob_name`; absence is not an error
    pub async fn delete(&self, blob_name: &str) -> Result<bool> {
        let result = match validate_blob_name(blob_name) {
            Ok(name) => self.store.delete_blob(name).await,
            Err(e) => Err(e),
        };
        self.record(
            &result,
            || match &result {
                Ok(true) => format!("Deleted '{}/{}'", self.container_name, blob_name),
                _ => format!(
                    "Blob '{}/{}' did not exist; nothing to delete",
                    self.container_name, blob_name
                ),
            },
            |e| format!("Delete of '{}' failed: {}", blob_name, e),
        );
        result
    }

    /// Get the container name
    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    fn record<T>(
        &self,
        result: &Result<T>,
        success: impl FnOnce() -> String,
        failure: impl FnOnce(&BlobctlError) -> String,
    ) {
        match result {
            Ok(_) => self.activity.info(&success()),
            Err(e) => self.activity.error(&failure(e)),
        }
    }
}
