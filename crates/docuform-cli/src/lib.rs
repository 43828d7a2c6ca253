//! # docuform-cli
//!
//! The `docuform` command:
//! - `serve` runs the HTTP API
//! - `fields`, `render` and `from-html` work on local template files
//! - `student` looks up and searches student records
//! - `config` reads and edits the configuration file

#![doc = include_str!("../README.md")]

pub mod cli;
pub mod commands;
pub mod config_handlers;
pub mod error;

pub use cli::{Cli, Command, ConfigAction};
pub use error::{Error, Result};
