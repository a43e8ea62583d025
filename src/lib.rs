#![forbid(unsafe_code)]

//! Client session and sync engine for a bug-report desk.
//!
//! Resolves the host's launch parameter, routes between the report form,
//! the reporter's own reports and the admin triage queue, keeps both report
//! listings in sync with the server, and drives attachment uploads with
//! byte-level progress.

pub mod api;
pub mod collection;
pub mod config;
pub mod errors;
pub mod host;
pub mod launch;
pub mod models;
pub mod session;
pub mod upload;

pub use config::ClientConfig;
pub use errors::{AppError, ErrorClass, Result};
