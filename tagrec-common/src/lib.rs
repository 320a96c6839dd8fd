//! # tagrec Common Library
//!
//! Shared code for the tagrec workspace:
//! - Error and result types
//! - TOML configuration loading and LLM credential resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
