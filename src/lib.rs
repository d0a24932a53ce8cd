//! blobctl - Azure Storage provisioning and blob operations
//!
//! Provisions a resource group, storage account and container, then
//! uploads, downloads, lists and deletes blobs in that container.

pub mod auth;
pub mod blob;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod memory;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use error::{BlobctlError, Result};
