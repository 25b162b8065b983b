//! # threadline-core
//!
//! Core library for threadline - segmentation of agent conversation logs.
//!
//! This library provides:
//! - Domain types for events, activity groups and timeline entries
//! - A correlation index linking tool invocations to their results
//! - Per-kind groupers for research, critique and planning delegations
//! - Timeline merge of groups and unclaimed events
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows one way, recomputed from the full log on every call:
//! - **Events:** the ordered, append-only conversation log
//! - **Index:** correlation id → invocation and result
//! - **Groups:** one list of [`ActivityGroup`]s per [`DelegationKind`]
//! - **Timeline:** one ordered list of [`TimelineActivity`] entries
//!
//! ## Example
//!
//! ```rust,no_run
//! use threadline_core::{eventlog, Config, Segmenter, TracingDiagnostics};
//! use std::path::Path;
//!
//! let config = Config::load().expect("failed to load config");
//! let events = eventlog::read_events(Path::new("session.jsonl")).expect("failed to read log");
//!
//! let segmentation = Segmenter::from_config(&config)
//!     .segment(&events, &TracingDiagnostics)
//!     .expect("log indices out of order");
//! for activity in &segmentation.timeline {
//!     println!("{} {}", activity.status, activity.title);
//! }
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use correlation::CorrelationIndex;
pub use diagnostics::{
    Anomaly, CollectingDiagnostics, Diagnostics, NoopDiagnostics, TracingDiagnostics,
};
pub use error::{Error, Result};
pub use segment::{Grouper, KindConfig};
pub use segmenter::{Segmentation, Segmenter};
pub use types::*;

// Public modules
pub mod config;
pub mod correlation;
pub mod diagnostics;
pub mod error;
pub mod eventlog;
pub mod logging;
pub mod segment;
pub mod segmenter;
pub mod timeline;
pub mod types;
