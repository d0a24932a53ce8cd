//! Authentication module for Azure services
//!
//! This module provides bearer tokens for the Azure Resource Manager calls
//! made by the provisioner.

pub mod provider;

pub use provider::*;
