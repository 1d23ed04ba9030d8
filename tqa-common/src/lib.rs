//! # TQA Common Library
//!
//! Shared code for the translation-QA services:
//! - Common error type (`Error` / `Result`)
//! - TOML configuration loading
//! - Event types and the broadcast `EventBus`

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
