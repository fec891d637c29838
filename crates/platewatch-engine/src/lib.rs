//! Platewatch Engine - Citation run orchestration.
//!
//! This crate is the coordination core of platewatch: given the fleet
//! collaborators and a reader registry, it drives bounded-concurrency,
//! per-provider-rate-limited sweeps over the vehicle×provider matrix,
//! collects successes and failures without letting one provider's outage
//! abort the run, tracks live progress, and fans the normalized results
//! out to the violation sink.
//!
//! # Example
//!
//! ```rust,ignore
//! use platewatch_engine::Orchestrator;
//! use tokio_util::sync::CancellationToken;
//!
//! let orchestrator = Orchestrator::new(
//!     authorizer,
//!     vehicle_source,
//!     violation_sink,
//!     readers,
//!     progress,
//! );
//!
//! let report = orchestrator.run(&CancellationToken::new()).await?;
//! println!("{} citations", report.summary.total_citations);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod dispatcher;
pub mod error;
pub mod limiter;
pub mod orchestrator;
pub mod report;

// Re-export commonly used types
pub use dispatcher::{DispatchStats, SinkDispatcher};
pub use error::{EngineError, Result};
pub use limiter::{RateLimiter, RateLimiterPermit};
pub use orchestrator::Orchestrator;
pub use report::{RunReport, RunSummary};
