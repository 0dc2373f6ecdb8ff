//! Error types for directory query operations.
//!
//! This module provides the error hierarchy for the search pipeline, including
//! per-stage failure causes and the mapping from error kind to process exit
//! status.

use std::fmt;
use thiserror::Error;

/// Cause of a connection-stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionCause {
    /// The transport could not be established.
    Network,
    /// TLS negotiation or certificate handling failed.
    Tls,
    /// The server URI did not parse or uses an unsupported scheme.
    MalformedUri,
}

impl ConnectionCause {
    /// Returns the kebab-case name of the cause.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Tls => "tls",
            Self::MalformedUri => "malformed-uri",
        }
    }
}

impl fmt::Display for ConnectionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause of a bind-stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCause {
    /// The server rejected the presented credentials.
    InvalidCredentials,
    /// The server refused to process the bind (policy, unsupported method).
    ServerRefused,
    /// The bind exchange itself was malformed or out of sequence.
    ProtocolError,
}

impl AuthCause {
    /// Returns the kebab-case name of the cause.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid-credentials",
            Self::ServerRefused => "server-refused",
            Self::ProtocolError => "protocol-error",
        }
    }
}

impl fmt::Display for AuthCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause of a search-stage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchCause {
    /// Search was attempted on a session that is not authenticated.
    NotAuthenticated,
    /// The server-enforced size limit was exceeded.
    SizeLimitExceeded,
    /// The server-enforced time limit was exceeded.
    TimeLimitExceeded,
    /// The filter expression did not parse.
    MalformedFilter,
    /// The server answered with a referral instead of entries.
    Referral,
    /// The transport failed while the search was in flight.
    Transport,
}

impl SearchCause {
    /// Returns the kebab-case name of the cause.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not-authenticated",
            Self::SizeLimitExceeded => "size-limit-exceeded",
            Self::TimeLimitExceeded => "time-limit-exceeded",
            Self::MalformedFilter => "malformed-filter",
            Self::Referral => "referral",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for SearchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for directory query operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed command-line input or invalid configuration
    #[error("Usage error: {0}")]
    Usage(String),

    /// Establishing the network session failed
    #[error("Connection failed ({cause}): {message}")]
    Connection {
        /// Failure cause
        cause: ConnectionCause,
        /// Error message
        message: String,
    },

    /// The bind exchange was rejected
    #[error("Authentication failed ({cause}): {message}")]
    Auth {
        /// Failure cause
        cause: AuthCause,
        /// Error message
        message: String,
    },

    /// The search operation failed
    #[error("Search failed ({cause}): {message}")]
    Search {
        /// Failure cause
        cause: SearchCause,
        /// Error message
        message: String,
    },

    /// An operation exceeded its configured deadline
    #[error("Timeout: {0}")]
    Timeout(String),
}

/// Specialized result type for directory query operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Usage(_) => "USAGE_ERROR",
            Self::Connection { .. } => "CONNECTION_ERROR",
            Self::Auth { .. } => "AUTH_ERROR",
            Self::Search { .. } => "SEARCH_ERROR",
            Self::Timeout(_) => "TIMEOUT",
        }
    }

    /// Returns the process exit status for this error kind.
    ///
    /// Each pipeline stage maps to a distinct non-zero code so calling
    /// scripts can tell configuration problems apart from network or
    /// authentication failures. Success is 0; 1 is left unassigned.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Connection { .. } => 3,
            Self::Auth { .. } => 4,
            Self::Search { .. } => 5,
            Self::Timeout(_) => 6,
        }
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Connection {
            cause: ConnectionCause::MalformedUri,
            message: err.to_string(),
        }
    }
}
