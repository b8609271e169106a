//! # emusync Common Library
//!
//! Shared code for the emusync crates:
//! - Error types
//! - Configuration file resolution and TOML loading

pub mod config;
pub mod error;

pub use error::{Error, Result};
