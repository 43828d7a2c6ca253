//! Docuform Core: shared types, errors, configuration, and utilities.
//!
//! This crate provides the foundational types used across all Docuform crates.
//! It has no internal Docuform dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`config`]: Workspace configuration and the [`ConfigManager`] trait
//! - [`service`]: Lifecycle tracking for background services
//! - [`util`]: Template names and field-key helpers

#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod service;
pub mod util;

// Re-export key types at crate root for convenience
pub use config::{ConfigManager, DocuformConfig};
pub use error::{Error, Result};
pub use service::{ServiceHandle, ServiceState};

// Convenience re-exports from util
pub use util::names::{TemplateName, normalize_field_key};
