//! # balagate core
//!
//! Core types, configuration, and secrets for the balagate request gate.
//!
//! This crate provides:
//! - Configuration loading and validation (JSON5 format)
//! - The principal and role model resolved from the identity service
//! - A redacting wrapper for the session token

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod secrets;
pub mod types;

pub use config::{Config, ConfigError};
pub use secrets::SessionToken;
pub use types::{Principal, ResourceId, Role};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::secrets::SessionToken;
    pub use crate::types::*;
}
