//! Distinguished Name utilities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use dirq_core::Error as CoreError;

/// Errors that can occur when parsing a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component in the distinguished name was invalid.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component was missing the attribute name to the left of the `=`.
    #[error("distinguished name component missing attribute: {0}")]
    MissingAttribute(String),
    /// A component was missing the value to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DnError> for CoreError {
    fn from(err: DnError) -> Self {
        CoreError::Usage(err.to_string())
    }
}

/// One `attribute=value` component of a distinguished name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnComponent {
    attribute: String,
    value: String,
}

impl DnComponent {
    /// Creates a new component.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute portion of the component (e.g. `cn`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Attribute value portion of the component.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this component matches the provided attribute name
    /// (case-insensitive).
    #[must_use]
    pub fn matches_attribute(&self, attribute: &str) -> bool {
        self.attribute.eq_ignore_ascii_case(attribute)
    }

    fn matches(&self, other: &Self) -> bool {
        self.attribute.eq_ignore_ascii_case(&other.attribute)
            && self.value.eq_ignore_ascii_case(&other.value)
    }
}

/// Strongly-typed distinguished name wrapper.
///
/// Keeps a canonical string representation alongside the parsed components.
/// Parsing is intentionally strict so malformed DNs surface before any network
/// operation uses them. Multi-valued RDNs (`+`-joined groups) are not split;
/// this tool only compares and prints DNs, so a `+` is treated as part of the
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistinguishedName {
    raw: String,
    components: Vec<DnComponent>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DnError`] if the input is empty or contains invalid syntax.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DnError> {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            return Err(DnError::Empty);
        }

        let mut components = Vec::new();
        for part in split_unescaped(raw, ',')? {
            if part.is_empty() {
                return Err(DnError::InvalidComponent(raw.to_string()));
            }
            components.push(parse_component(&part)?);
        }

        Ok(Self {
            raw: components_to_string(&components),
            components,
        })
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the components in order, most specific first.
    #[must_use]
    pub fn components(&self) -> &[DnComponent] {
        &self.components
    }

    /// Looks up the value for the first attribute that matches `attribute`
    /// (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|component| component.matches_attribute(attribute))
            .map(DnComponent::value)
    }

    /// Returns true if this DN names the same entry as `base` or an entry
    /// beneath it.
    ///
    /// The comparison is component-wise and case-insensitive, matching the
    /// subtree visibility rule of a whole-subtree search.
    #[must_use]
    pub fn is_descendant_of(&self, base: &Self) -> bool {
        if base.components.len() > self.components.len() {
            return false;
        }
        let offset = self.components.len() - base.components.len();
        self.components[offset..]
            .iter()
            .zip(&base.components)
            .all(|(own, other)| own.matches(other))
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DnError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DistinguishedName> for String {
    fn from(value: DistinguishedName) -> Self {
        value.raw
    }
}

impl TryFrom<&str> for DistinguishedName {
    type Error = DnError;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        Self::parse(value)
    }
}

fn split_unescaped(input: &str, delimiter: char) -> std::result::Result<Vec<String>, DnError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push(ch);
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == delimiter {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }

    if escape {
        return Err(DnError::UnterminatedEscape);
    }

    parts.push(current.trim().to_string());
    Ok(parts)
}

fn parse_component(component: &str) -> std::result::Result<DnComponent, DnError> {
    let mut escape = false;
    let mut separator = None;

    for (i, ch) in component.char_indices() {
        if escape {
            escape = false;
        } else if ch == '\\' {
            escape = true;
        } else if ch == '=' {
            separator = Some(i);
            break;
        }
    }

    let idx = separator.ok_or_else(|| DnError::InvalidComponent(component.to_string()))?;
    let attribute = component[..idx].trim();
    let value = component[idx + 1..].trim_start();

    if attribute.is_empty() {
        return Err(DnError::MissingAttribute(component.to_string()));
    }
    if value.is_empty() {
        return Err(DnError::MissingValue(attribute.to_string()));
    }

    Ok(DnComponent::new(attribute, unescape(value)?))
}

fn unescape(value: &str) -> std::result::Result<String, DnError> {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            let next = chars.next().ok_or(DnError::UnterminatedEscape)?;
            result.push(next);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn escape(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in chars.iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx == chars.len() - 1;
        let needs_escape = matches!(ch, ',' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (is_first && (*ch == ' ' || *ch == '#'))
            || (is_last && *ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(*ch);
    }

    escaped
}

fn components_to_string(components: &[DnComponent]) -> String {
    components
        .iter()
        .map(|component| format!("{}={}", component.attribute(), escape(component.value())))
        .collect::<Vec<_>>()
        .join(",")
}
