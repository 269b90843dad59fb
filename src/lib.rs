//! Organizations directory service.
//!
//! Read-only HTTP API over buildings, a three-level activity catalogue and
//! the organizations that occupy them, guarded by a static API key.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
