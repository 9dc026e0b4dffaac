//! # fip-context Common Library
//!
//! Shared code for the fip-context service:
//! - Error type shared across crates
//! - Configuration resolution (CLI, environment, TOML, defaults)
//! - Database initialization

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
