//! In-memory storage provider
//!
//! Implements both the management plane ([`StorageOperations`]) and the
//! data plane ([`BlobStore`]) over shared in-process state. It behaves like
//! the remote service where the commands can observe it: lookups of missing
//! resources return `None`, account names are global, blobs list in name
//! order, and blob calls against a missing container fail.

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::blob::{BlobInfo, BlobStore};
use crate::error::{BlobctlError, Result};
use crate::storage::{
    ConnectionCredential, Container, NameAvailability, PublicAccessLevel, ResourceGroup,
    StorageAccount, StorageAccountCreateRequest, StorageOperations,
};
use crate::utils::helpers::generate_uuid;

#[derive(Debug, Clone)]
struct StoredBlob {
    content: Vec<u8>,
    info: BlobInfo,
}

#[derive(Debug, Default)]
struct State {
    resource_groups: BTreeMap<String, ResourceGroup>,
    accounts: BTreeMap<String, (StorageAccount, String)>,
    containers: BTreeMap<(String, String), Container>,
    blobs: BTreeMap<(String, String), BTreeMap<String, StoredBlob>>,
    reserved_names: BTreeSet<String>,
    create_calls: usize,
    remote_calls: usize,
}

/// Shared in-memory provider
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<Mutex<State>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| BlobctlError::remote("In-memory storage state is poisoned"))
    }

    /// Mark an account name as owned by someone else
    pub fn reserve_account_name(&self, name: &str) {
        if let Ok(mut state) = self.lock() {
            state.reserved_names.insert(name.to_string());
        }
    }

    /// Number of create calls that reached the provider
    pub fn create_calls(&self) -> usize {
        self.lock().map(|state| state.create_calls).unwrap_or_default()
    }

    /// Number of data-plane calls that reached the provider
    pub fn remote_calls(&self) -> usize {
        self.lock().map(|state| state.remote_calls).unwrap_or_default()
    }

    /// Data-plane handle for one container
    pub fn blob_store(&self, storage_account: &str, container: &str) -> InMemoryBlobStore {
        InMemoryBlobStore {
            storage: self.clone(),
            key: (storage_account.to_string(), container.to_string()),
        }
    }
}

#[async_trait]
impl StorageOperations for InMemoryStorage {
    async fn get_resource_group(&self, name: &str) -> Result<Option<ResourceGroup>> {
        Ok(self.lock()?.resource_groups.get(name).cloned())
    }

    async fn create_resource_group(&self, name: &str, region: &str) -> Result<ResourceGroup> {
        let mut state = self.lock()?;
        state.create_calls += 1;
        let group = ResourceGroup {
            name: name.to_string(),
            region: region.to_string(),
        };
        state.resource_groups.insert(name.to_string(), group.clone());
        Ok(group)
    }

    async fn get_storage_account(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<StorageAccount>> {
        let state = self.lock()?;
        Ok(state
            .accounts
            .get(name)
            .filter(|(account, _)| account.resource_group == resource_group)
            .map(|(account, _)| account.clone()))
    }

    async fn check_name_availability(&self, name: &str) -> Result<NameAvailability> {
        let state = self.lock()?;
        if state.accounts.contains_key(name) || state.reserved_names.contains(name) {
            return Ok(NameAvailability::unavailable(
                "AlreadyExists".to_string(),
                format!("The storage account named {name} is already taken."),
            ));
        }
        Ok(NameAvailability::available())
    }

    async fn create_storage_account(
        &self,
        request: &StorageAccountCreateRequest,
    ) -> Result<StorageAccount> {
        let mut state = self.lock()?;
        state.create_calls += 1;

        if !state.resource_groups.contains_key(&request.resource_group) {
            return Err(BlobctlError::remote(format!(
                "HTTP 404: ResourceGroupNotFound: Resource group '{}' could not be found.",
                request.resource_group
            )));
        }
        if state.accounts.contains_key(&request.name) || state.reserved_names.contains(&request.name) {
            return Err(BlobctlError::remote(format!(
                "HTTP 409: StorageAccountAlreadyTaken: {}",
                request.name
            )));
        }

        let account = StorageAccount {
            name: request.name.clone(),
            resource_group: request.resource_group.clone(),
            region: request.region.clone(),
            sku: request.sku.clone(),
            kind: request.kind.clone(),
            allow_blob_public_access: request.allow_blob_public_access,
            minimum_tls_version: request.minimum_tls_version.clone(),
            provisioning_state: "Succeeded".to_string(),
        };
        state
            .accounts
            .insert(request.name.clone(), (account.clone(), generate_uuid()));
        Ok(account)
    }

    async fn get_container(
        &self,
        resource_group: &str,
        storage_account: &str,
        name: &str,
    ) -> Result<Option<Container>> {
        let state = self.lock()?;
        let in_group = state
            .accounts
            .get(storage_account)
            .map(|(account, _)| account.resource_group == resource_group)
            .unwrap_or(false);
        if !in_group {
            return Ok(None);
        }
        Ok(state
            .containers
            .get(&(storage_account.to_string(), name.to_string()))
            .cloned())
    }

    async fn create_container(
        &self,
        _resource_group: &str,
        storage_account: &str,
        name: &str,
        public_access: PublicAccessLevel,
    ) -> Result<Container> {
        let mut state = self.lock()?;
        state.create_calls += 1;

        let allows_public = match state.accounts.get(storage_account) {
            Some((account, _)) => account.allow_blob_public_access,
            None => {
                return Err(BlobctlError::remote(format!(
                    "HTTP 404: Storage account '{storage_account}' not found"
                )))
            }
        };
        if public_access.is_public() && !allows_public {
            return Err(BlobctlError::remote(
                "HTTP 409: PublicAccessNotPermitted: Public access is not permitted on this storage account.",
            ));
        }

        let key = (storage_account.to_string(), name.to_string());
        let container = Container {
            name: name.to_string(),
            storage_account: storage_account.to_string(),
            public_access,
        };
        state.containers.insert(key.clone(), container.clone());
        state.blobs.entry(key).or_default();
        Ok(container)
    }

    async fn get_connection_credential(
        &self,
        resource_group: &str,
        storage_account: &str,
    ) -> Result<ConnectionCredential> {
        let key = {
            let state = self.lock()?;
            match state.accounts.get(storage_account) {
                Some((account, key)) if account.resource_group == resource_group => key.clone(),
                _ => {
                    return Err(BlobctlError::not_found(format!(
                        "Storage account '{storage_account}' not found in resource group '{resource_group}'"
                    )))
                }
            }
        };
        ConnectionCredential::from_account_key(storage_account, &key)
    }
}

/// Data-plane view of one in-memory container
#[derive(Clone)]
pub struct InMemoryBlobStore {
    storage: InMemoryStorage,
    key: (String, String),
}

impl InMemoryBlobStore {
    fn with_blobs<T>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, StoredBlob>) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.storage.lock()?;
        state.remote_calls += 1;
        match state.blobs.get_mut(&self.key) {
            Some(blobs) => f(blobs),
            None => Err(BlobctlError::remote(format!(
                "HTTP 404: ContainerNotFound: container '{}' in account '{}'",
                self.key.1, self.key.0
            ))),
        }
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put_blob(
        &self,
        name: &str,
        content: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<BlobInfo> {
        self.with_blobs(|blobs| {
            if !overwrite && blobs.contains_key(name) {
                return Err(BlobctlError::already_exists(format!("Blob '{name}' already exists")));
            }
            let info = BlobInfo {
                name: name.to_string(),
                size: content.len() as u64,
                content_type: content_type.to_string(),
                last_modified: Utc::now(),
                etag: format!("\"{}\"", generate_uuid()),
            };
            blobs.insert(
                name.to_string(),
                StoredBlob {
                    content,
                    info: info.clone(),
                },
            );
            Ok(info)
        })
    }

    async fn get_blob(&self, name: &str) -> Result<Vec<u8>> {
        self.with_blobs(|blobs| {
            blobs
                .get(name)
                .map(|blob| blob.content.clone())
                .ok_or_else(|| BlobctlError::not_found(format!("Blob '{name}' does not exist")))
        })
    }

    fn list_blobs(&self) -> BoxStream<'static, Result<BlobInfo>> {
        let store = self.clone();
        // Snapshot on first poll so building the stream costs nothing
        stream::once(async move {
            store.with_blobs(|blobs| Ok(blobs.values().map(|blob| blob.info.clone()).collect::<Vec<_>>()))
        })
        .map(|snapshot| match snapshot {
            Ok(items) => stream::iter(items.into_iter().map(Ok).collect::<Vec<_>>()).boxed(),
            Err(e) => stream::iter(vec![Err(e)]).boxed(),
        })
        .flatten()
        .boxed()
    }

    async fn delete_blob(&self, name: &str) -> Result<bool> {
        self.with_blobs(|blobs| Ok(blobs.remove(name).is_some()))
    }
}
