//! Platewatch Client - HTTP plumbing for the fleet backend.
//!
//! This crate owns every outbound call to the internal system of record:
//! sign-in, the vehicle snapshot, and violation submission. All of them
//! go through one retry/backoff executor with failure classification and
//! a one-shot credential refresh on HTTP 401.
//!
//! The engine consumes the collaborator traits ([`Authorizer`],
//! [`VehicleSource`], [`ViolationSink`]) rather than the concrete
//! clients, so tests can substitute scripted implementations.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod auth;
pub mod error;
pub mod http;
pub mod token_cache;
pub mod traits;
pub mod vehicles;
pub mod violations;

// Re-export commonly used types
pub use auth::AuthClient;
pub use error::{status_message, ClientError, Result};
pub use http::{execute_with_retries, BackendEnvelope, HttpExecutor, RetryPolicy};
pub use token_cache::TokenCache;
pub use traits::{Authorizer, TokenRefresher, VehicleSource, ViolationSink};
pub use vehicles::VehicleClient;
pub use violations::{ViolationClient, ViolationSubmission};
