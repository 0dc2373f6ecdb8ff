//! Directory entry representation.

use std::collections::HashMap;

/// One entry returned by a directory search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (value order preserved as delivered by the server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.attributes
            .get(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .get(attribute)
            .map(|values| values.as_slice())
    }
}
