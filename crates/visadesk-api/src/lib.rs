//! # visadesk-api
//!
//! REST access to the agency backend.
//!
//! - [`AgencyClient`] - fetches task collections and clients, and serves as
//!   the [`visadesk_alerts::ClientDirectory`] for per-id name lookups
//! - [`Refresher`] - debounced refresh loop that never delivers a stale result
//! - [`ApiError`] - classified HTTP and payload errors

pub mod api_types;
pub mod client;
pub mod error;
pub mod refresh;

pub use client::AgencyClient;
pub use error::{ApiError, Result};
pub use refresh::{DEFAULT_DEBOUNCE, GenerationGuard, RefreshEvent, Refresher};
