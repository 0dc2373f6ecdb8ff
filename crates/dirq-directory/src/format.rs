//! Plain-text rendering of search results.

use crate::entry::DirectoryEntry;
use std::fmt::Write;

/// Default indentation for attribute lines.
pub const DEFAULT_INDENT_WIDTH: usize = 4;

/// Renders search results as indented text, one block per entry.
///
/// Each block starts with a `dn:` line followed by one line per attribute
/// value, indented by `indent_width` spaces, and ends with a blank line.
/// Attribute names are emitted in sorted order so identical input always
/// produces byte-identical output; value order within an attribute is kept as
/// delivered. An empty result renders to the empty string, which callers rely
/// on to mean "nothing found".
#[must_use]
pub fn render(entries: &[DirectoryEntry], indent_width: usize) -> String {
    let indent = " ".repeat(indent_width);
    let mut output = String::new();

    for entry in entries {
        let _ = writeln!(output, "dn: {}", entry.dn);

        let mut names: Vec<&String> = entry.attributes.keys().collect();
        names.sort();
        for name in names {
            for value in &entry.attributes[name] {
                let _ = writeln!(output, "{indent}{name}: {value}");
            }
        }
        output.push('\n');
    }

    output
}
