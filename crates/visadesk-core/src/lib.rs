//! # visadesk-core
//!
//! Core types, errors, and utilities shared by the visadesk crates.
//!
//! This crate provides:
//! - [`VisadeskError`] - Error type for configuration, I/O, and parsing failures
//! - [`logging`] - Tracing setup and log file locations
//! - [`config`] - The `~/.visadesk/config.yaml` configuration file
//! - [`recovery`] - Retry with exponential backoff and jitter
//! - [`types`] - Shared identifiers
//!
//! ## Example
//!
//! ```no_run
//! use visadesk_core::{Config, logging};
//!
//! fn main() -> visadesk_core::Result<()> {
//!     let _guard = logging::init_logging(None, 0)?;
//!
//!     let config = Config::load()?;
//!     tracing::info!(base_url = %config.api.base_url, "loaded configuration");
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod recovery;
pub mod types;

// Re-export main types for convenience
pub use config::{AlertsConfig, ApiConfig, Config, RefreshConfig, ViewerConfig};
pub use error::{Result, VisadeskError};
pub use logging::{LogGuard, init_logging};
pub use recovery::{RetryConfig, RetryResult, retry_with_backoff};
pub use types::{ClientId, TaskId};
