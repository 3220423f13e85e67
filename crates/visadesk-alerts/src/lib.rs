//! # visadesk-alerts
//!
//! Task alert pipeline for the agency dashboard.
//!
//! Data flows through these stages:
//!
//! 1. [`aggregator`] - flattens the backend's per-collection task arrays into [`Task`]s
//! 2. [`deriver`] - applies the deadline and payment rules and resolves client names
//! 3. [`dedup`] - keeps at most one alert per `(task, alert type)` key
//! 4. [`deriver::filter_owned`] - keeps alerts handled by the viewer
//! 5. [`store`] - single source of truth, consumed by the bell panel and the
//!    [`sequencer`], which shows toasts one at a time
//!
//! ## Example
//!
//! ```no_run
//! use visadesk_alerts::{aggregate, AlertDeriver, ClientIndex, ClientNameResolver};
//!
//! # async fn example(all_data: serde_json::Value) {
//! let tasks = aggregate(&all_data);
//! let index = ClientIndex::default();
//! let mut resolver = ClientNameResolver::new(&index, None);
//!
//! let derived = AlertDeriver::default()
//!     .derive(&tasks, chrono::Utc::now(), "Alice Tanaka", &mut resolver)
//!     .await;
//! println!("{} deadline alerts", derived.deadline.len());
//! # }
//! ```

pub mod aggregator;
pub mod alert;
pub mod client;
pub mod clock;
pub mod dedup;
pub mod deriver;
pub mod error;
pub mod sequencer;
pub mod store;
pub mod task;

pub use aggregator::aggregate;
pub use alert::{Alert, AlertPriority, AlertType};
pub use client::{Client, ClientDirectory, ClientIndex, ClientNameResolver, UNKNOWN_CLIENT};
pub use clock::{Clock, ManualClock, SystemClock};
pub use dedup::AlertSet;
pub use deriver::{AlertDeriver, Assessment, DerivedAlerts, assess, filter_owned};
pub use error::{AlertError, Result};
pub use sequencer::{Advance, NotificationSequencer};
pub use store::{AlertBadge, AlertSnapshot, AlertStore};
pub use task::{ClientRef, PaymentStatus, Task, TaskKind, TaskVariant};
