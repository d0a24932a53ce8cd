//! Storage account provisioning
//!
//! This module covers the management plane: resource groups, storage
//! accounts, containers and the connection credential handed to the blob
//! commands.

pub mod credential;
pub mod models;
pub mod naming;
pub mod operations;
pub mod provisioner;

// Re-export commonly used types
pub use credential::ConnectionCredential;
pub use models::*;
pub use naming::NameSuffix;
pub use operations::{AzureStorageOperations, ProvisioningPoll, StorageOperations};
pub use provisioner::{AccountNaming, ProvisionRequest, ProvisionedResources, Provisioner};
