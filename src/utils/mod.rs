//! Utility functions module
//!
//! Connection string and env-file parsing, HTTP client setup and console
//! output formatting.

pub mod format;
pub mod helpers;
pub mod network;

pub use format::*;
pub use helpers::*;
pub use network::*;
