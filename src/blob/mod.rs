//! Blob operations for a single container
//!
//! This module provides upload, download, listing and deletion of blobs
//! on top of the [`BlobStore`] data-plane seam.

pub mod manager;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use manager::BlobManager;
pub use models::*;
pub use store::{AzureBlobStore, BlobStore};
