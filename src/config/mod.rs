//! Configuration management module
//!
//! Configuration comes from defaults, a TOML (or JSON) file, the resources
//! file written by `provision`, environment variables and command-line
//! flags, in increasing order of priority.

pub mod resources;
pub mod settings;

pub use resources::*;
pub use settings::*;
