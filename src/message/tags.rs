//! IRCv3 message tag encoding.
//!
//! Tag values escape five characters on the wire:
//!
//! | wire | value |
//! |------|-------|
//! | `\:` | `;`   |
//! | `\s` | space |
//! | `\\` | `\`   |
//! | `\r` | CR    |
//! | `\n` | LF    |

use std::collections::BTreeMap;
use std::fmt::{Result as FmtResult, Write};

/// Tag mapping carried by a [`Message`](super::Message).
///
/// A key without a value is stored with an empty string.
pub type Tags = BTreeMap<String, String>;

/// Parse the tag segment of a line (the text between `@` and the first space).
///
/// Empty entries produced by stray `;` separators are skipped. When a key
/// repeats, the last occurrence wins.
pub fn parse_tags(segment: &str) -> Tags {
    segment
        .split(';')
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_owned(), unescape_tag_value(value)),
            None => (entry.to_owned(), String::new()),
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Write a tag mapping in wire form, without the leading `@`.
pub fn write_tags(f: &mut dyn Write, tags: &Tags) -> FmtResult {
    let mut first = true;
    for (key, value) in tags {
        if !first {
            f.write_char(';')?;
        }
        first = false;
        f.write_str(key)?;
        if !value.is_empty() {
            f.write_char('=')?;
            escape_tag_value(f, value)?;
        }
    }
    Ok(())
}

/// Escape a tag value for serialization.
pub fn escape_tag_value(f: &mut dyn Write, value: &str) -> FmtResult {
    for c in value.chars() {
        match c {
            ';' => f.write_str("\\:")?,
            ' ' => f.write_str("\\s")?,
            '\\' => f.write_str("\\\\")?,
            '\r' => f.write_str("\\r")?,
            '\n' => f.write_str("\\n")?,
            c => f.write_char(c)?,
        }
    }
    Ok(())
}

/// Decode an escaped tag value.
///
/// A trailing lone backslash is dropped and an unknown escape keeps the
/// escaped character.
pub fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => break,
        }
    }
    out
}
