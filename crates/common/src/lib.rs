//! Common utilities and shared types for herald.
//!
//! This crate provides foundational components used across all herald crates:
//!
//! - **Configuration**: Process settings via [`Settings`]
//! - **Error handling**: Unified error taxonomy via [`AppError`] and [`AppResult`]
//! - **Liveness**: Heartbeat-based health classification via [`LivenessMonitor`]
//! - **Metrics**: Job and delivery counters via [`Metrics`]
//!
//! # Example
//!
//! ```no_run
//! use herald_common::{AppResult, LivenessMonitor, Settings};
//!
//! fn example() -> AppResult<()> {
//!     let settings = Settings::load()?;
//!     let liveness = LivenessMonitor::new();
//!     liveness.beat();
//!     println!("Polling swaps every {:?}", settings.polling.swap_interval());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod liveness;
pub mod metrics;

pub use config::Settings;
pub use error::{AppError, AppResult};
pub use liveness::{Health, LivenessMonitor};
pub use metrics::{Metrics, MetricsSnapshot};
