//! # tvdash Common Library
//!
//! Shared code for the tvdash workspace:
//! - Error type used by the library crates
//! - TOML configuration file discovery and loading
//! - Tracing subscriber bootstrap
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
