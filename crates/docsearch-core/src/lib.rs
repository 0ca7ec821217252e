//! docsearch-core
//!
//! Shared types, traits, configuration, loaders, chunking and report
//! formatting for the docsearch engines.

pub mod chunking;
pub mod config;
pub mod error;
pub mod loader;
pub mod report;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
