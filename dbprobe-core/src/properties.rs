//! Line-oriented `key=value` properties files.
//!
//! The accepted syntax is the usual properties format:
//! - `#` and `!` start comment lines, blank lines are skipped
//! - a key ends at the first unescaped `=`, `:` or whitespace
//! - a line ending in an odd number of backslashes continues on the next line
//! - `\t`, `\n`, `\r`, `\f` and `\uXXXX` escapes are decoded in keys and values
//!
//! Entries keep the order in which their keys first appeared. A key that is
//! defined twice keeps its original position and takes the later value.

use crate::error::{ProbeError, Result, redact_database_url};
use std::io::Write;
use std::path::Path;

/// Ordered key/value pairs loaded from a properties file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

impl Properties {
    /// Creates an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses a properties file.
    ///
    /// # Errors
    /// Returns `ProbeError::Io` if the file cannot be read or is not valid
    /// UTF-8, and `ProbeError::Configuration` for malformed escapes.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let context = || format!("Failed to read properties file {}", path.display());

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ProbeError::io(context(), e))?;
        let text = String::from_utf8(bytes).map_err(|e| {
            ProbeError::io(
                context(),
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;

        tracing::debug!("Loaded {} bytes from {}", text.len(), path.display());
        Self::parse(&text)
    }

    /// Parses properties from text.
    ///
    /// # Errors
    /// Returns `ProbeError::Configuration` naming the offending line when a
    /// `\u` escape is malformed.
    pub fn parse(input: &str) -> Result<Self> {
        let mut properties = Self::new();
        let mut logical = String::new();
        let mut logical_start = 0usize;
        let mut continuing = false;

        for (index, natural) in natural_lines(input).enumerate() {
            if continuing {
                logical.push_str(natural.trim_start_matches(is_blank));
            } else {
                let trimmed = natural.trim_start_matches(is_blank);
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                logical.clear();
                logical.push_str(trimmed);
                logical_start = index.saturating_add(1);
            }

            let trailing = logical.chars().rev().take_while(|c| *c == '\\').count();
            if trailing.is_multiple_of(2) {
                continuing = false;
                properties.insert_logical_line(&logical, logical_start)?;
            } else {
                logical.pop();
                continuing = true;
            }
        }

        // A continuation marker on the last line just ends the entry.
        if continuing {
            properties.insert_logical_line(&logical, logical_start)?;
        }

        Ok(properties)
    }

    fn insert_logical_line(&mut self, line: &str, line_number: usize) -> Result<()> {
        let (raw_key, raw_value) = split_key_value(line);
        let key = unescape(raw_key, line_number)?;
        let value = unescape(raw_value, line_number)?;
        self.set(key, value);
        Ok(())
    }

    /// Sets a property, keeping the key's original position if it exists.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Looks up a property value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over the entries in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no keys were loaded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How loaded properties are echoed to standard output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EchoMode {
    /// Print every pair verbatim, passwords included
    #[default]
    Full,
    /// Print every pair with the password and URL credentials masked
    Redacted,
    /// Print nothing
    Off,
}

/// Writes each property as `key: value`, in load order.
///
/// # Errors
/// Returns the underlying I/O error if the writer fails.
pub fn echo_properties<W: Write + ?Sized>(
    properties: &Properties,
    mode: EchoMode,
    out: &mut W,
) -> std::io::Result<()> {
    if mode == EchoMode::Off {
        return Ok(());
    }

    for (key, value) in properties.iter() {
        match (mode, key) {
            (EchoMode::Redacted, "password") => writeln!(out, "{key}: ****")?,
            (EchoMode::Redacted, "url") => writeln!(out, "{key}: {}", redact_database_url(value))?,
            _ => writeln!(out, "{key}: {value}")?,
        }
    }

    Ok(())
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

fn natural_lines(input: &str) -> impl Iterator<Item = &str> {
    input.split('\n').flat_map(|line| {
        // `\r\n` leaves a trailing `\r`; a lone `\r` is also a terminator
        line.strip_suffix('\r').unwrap_or(line).split('\r')
    })
}

fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;

    for (pos, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                let (key, tail) = line.split_at(pos);
                return (key, tail[c.len_utf8()..].trim_start_matches(is_blank));
            }
            c if is_blank(c) => {
                let (key, tail) = line.split_at(pos);
                let rest = tail.trim_start_matches(is_blank);
                let rest = rest
                    .strip_prefix(['=', ':'])
                    .map_or(rest, |r| r.trim_start_matches(is_blank));
                return (key, rest);
            }
            _ => {}
        }
    }

    (line, "")
}

fn unescape(raw: &str, line_number: usize) -> Result<String> {
    let malformed = |detail: &str| {
        ProbeError::configuration(format!(
            "malformed \\u escape on line {line_number}: {detail}"
        ))
    };

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    let mut high_surrogate: Option<u16> = None;

    while let Some(c) = chars.next() {
        if c != '\\' {
            if high_surrogate.is_some() {
                return Err(malformed("unpaired surrogate"));
            }
            out.push(c);
            continue;
        }

        let Some(escaped) = chars.next() else {
            break;
        };

        if escaped == 'u' {
            let hex: String = chars.by_ref().take(4).collect();
            if hex.chars().count() != 4 {
                return Err(malformed("expected four hex digits"));
            }
            let unit = u16::from_str_radix(&hex, 16)
                .map_err(|_| malformed(&format!("'{hex}' is not hexadecimal")))?;

            match (high_surrogate.take(), unit) {
                (None, 0xD800..=0xDBFF) => high_surrogate = Some(unit),
                (Some(high), 0xDC00..=0xDFFF) => {
                    let decoded = char::decode_utf16([high, unit])
                        .next()
                        .and_then(std::result::Result::ok)
                        .ok_or_else(|| malformed("invalid surrogate pair"))?;
                    out.push(decoded);
                }
                (None, _) => {
                    let decoded = char::from_u32(u32::from(unit))
                        .ok_or_else(|| malformed("unpaired surrogate"))?;
                    out.push(decoded);
                }
                (Some(_), _) => return Err(malformed("unpaired surrogate")),
            }
            continue;
        }

        if high_surrogate.is_some() {
            return Err(malformed("unpaired surrogate"));
        }
        out.push(match escaped {
            't' => '\t',
            'n' => '\n',
            'r' => '\r',
            'f' => '\x0c',
            other => other,
        });
    }

    if high_surrogate.is_some() {
        return Err(malformed("unpaired surrogate"));
    }

    Ok(out)
}
