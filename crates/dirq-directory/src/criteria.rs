//! Search criteria construction.

use crate::{config::ConnectionConfig, dn::DistinguishedName};

/// Match-all filter used when no filter is configured.
pub const DEFAULT_FILTER: &str = "(objectClass=*)";

/// Minimal attribute set requested by default.
pub const DEFAULT_ATTRIBUTES: &[&str] = &["dn", "cn", "objectClass"];

/// Represents the search scope for directory queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    Subtree,
}

/// Alias dereferencing policy for directory queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerefPolicy {
    /// Never dereference aliases.
    Never,
    /// Dereference aliases while walking the subtree.
    InSearching,
    /// Dereference aliases when locating the base object.
    FindingBase,
    /// Always dereference aliases.
    Always,
}

/// A fully-specified search request, derived once per run from the
/// connection configuration and immutable thereafter.
///
/// The defaults reproduce the tool's fixed query shape: whole subtree, no
/// alias dereferencing, unlimited size and time, match-all filter and the
/// minimal attribute set. The `with_*` overrides exist so callers can widen
/// the shape without internal changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    base_dn: DistinguishedName,
    scope: SearchScope,
    deref_policy: DerefPolicy,
    size_limit: i32,
    time_limit: i32,
    filter: String,
    attributes: Vec<String>,
}

impl SearchCriteria {
    /// Builds the default search criteria for the given configuration.
    ///
    /// Pure and deterministic; performs no I/O.
    #[must_use]
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            base_dn: config.base_dn().clone(),
            scope: SearchScope::Subtree,
            deref_policy: DerefPolicy::Never,
            size_limit: 0,
            time_limit: 0,
            filter: DEFAULT_FILTER.to_string(),
            attributes: DEFAULT_ATTRIBUTES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Returns the search base distinguished name.
    #[must_use]
    pub const fn base_dn(&self) -> &DistinguishedName {
        &self.base_dn
    }

    /// Returns the search scope.
    #[must_use]
    pub const fn scope(&self) -> SearchScope {
        self.scope
    }

    /// Returns the alias dereferencing policy.
    #[must_use]
    pub const fn deref_policy(&self) -> DerefPolicy {
        self.deref_policy
    }

    /// Returns the size limit (0 = unlimited).
    #[must_use]
    pub const fn size_limit(&self) -> i32 {
        self.size_limit
    }

    /// Returns the time limit in seconds (0 = unlimited).
    #[must_use]
    pub const fn time_limit(&self) -> i32 {
        self.time_limit
    }

    /// Returns the filter expression.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Returns the requested attributes (empty = all attributes).
    #[must_use]
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Overrides the search scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    /// Overrides the alias dereferencing policy.
    #[must_use]
    pub const fn with_deref_policy(mut self, policy: DerefPolicy) -> Self {
        self.deref_policy = policy;
        self
    }

    /// Overrides the size limit (0 = unlimited).
    #[must_use]
    pub const fn with_size_limit(mut self, limit: i32) -> Self {
        self.size_limit = limit;
        self
    }

    /// Overrides the time limit in seconds (0 = unlimited).
    #[must_use]
    pub const fn with_time_limit(mut self, limit: i32) -> Self {
        self.time_limit = limit;
        self
    }

    /// Overrides the filter expression.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Overrides the requested attributes (empty = all attributes).
    #[must_use]
    pub fn with_attributes(mut self, attributes: Vec<String>) -> Self {
        self.attributes = attributes;
        self
    }
}
