//! Reportify Core - Core data structures and shared plumbing
//!
//! This crate defines the data model, error taxonomy, run configuration
//! and logging bootstrap shared by the rest of the workspace.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
