//! Directory client library for the dirq query tool.
//!
//! This crate provides the connection configuration, session lifecycle and
//! search-execution pipeline for querying an LDAP directory server, plus the
//! plain-text renderer for search results.

#![deny(missing_docs)]

mod config;
mod criteria;
mod dn;
mod entry;
mod format;
mod session;

pub use config::{
    ConnectionConfig, DEFAULT_CONNECTION_TIMEOUT_SECS, DEFAULT_OPERATION_TIMEOUT_SECS, DEFAULT_URL,
};
pub use criteria::{
    DerefPolicy, SearchCriteria, SearchScope, DEFAULT_ATTRIBUTES, DEFAULT_FILTER,
};
pub use dn::{DistinguishedName, DnComponent, DnError};
pub use entry::DirectoryEntry;
pub use format::{render, DEFAULT_INDENT_WIDTH};
pub use session::{DirectoryClient, DirectorySession, SessionState};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = dirq_core::Result<T>;
