//! # dirq-core
//!
//! Core types shared by the dirq directory query tool.
//!
//! This crate provides the error taxonomy and exit-status mapping used by the
//! directory client library and the `dirq` binary.
//!
//! ## Modules
//!
//! - [`error`] - Error types, error codes and process exit-code mapping

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;

// Re-export commonly used types
pub use error::{AuthCause, ConnectionCause, Error, Result, SearchCause};
