//! Platewatch Readers - The pluggable provider boundary.
//!
//! A reader is the fetch-and-normalize adapter for one provider. This
//! crate defines the [`CitationReader`] contract, the explicit
//! [`ReaderRegistry`] the engine is constructed with, and the JSON API
//! reader for the Vanguard service. Portal-scraping adapters plug in
//! through the same contract from outside this workspace.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod reader;
pub mod registry;
pub mod rest;

// Re-export commonly used types
pub use error::{ReaderError, Result};
pub use reader::CitationReader;
pub use registry::ReaderRegistry;
pub use rest::VanguardReader;
