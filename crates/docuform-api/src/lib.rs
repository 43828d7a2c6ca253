//! HTTP API server for Docuform.
//!
//! - [`routes::router`]: the axum router over an [`AppState`]
//! - [`Server`]: binding, warm-up and graceful shutdown
//! - [`auth`]: bearer-token middleware for template management
//! - [`Error`]: maps every failure to a status code and JSON envelope

#![doc = include_str!("../README.md")]

pub mod auth;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{Error, Result};
pub use routes::router;
pub use server::Server;
pub use state::AppState;
