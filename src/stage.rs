//! Set/delete lines and the ordered buffer they are staged in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// One directive of the flat configuration language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ConfigLine {
    /// `set <path> [value]`
    Set {
        /// Statement path, space separated
        path: String,
        /// Trailing value, quoted on render when needed
        value: Option<String>,
    },
    /// `delete <path>`
    Delete {
        /// Statement path, space separated
        path: String,
    },
}

impl ConfigLine {
    /// `set path` with no value
    pub fn set(path: impl Into<String>) -> Self {
        ConfigLine::Set {
            path: path.into(),
            value: None,
        }
    }

    /// `set path value`
    pub fn set_value(path: impl Into<String>, value: impl Into<String>) -> Self {
        ConfigLine::Set {
            path: path.into(),
            value: Some(value.into()),
        }
    }

    /// `delete path`
    pub fn delete(path: impl Into<String>) -> Self {
        ConfigLine::Delete { path: path.into() }
    }

    /// Statement path
    pub fn path(&self) -> &str {
        match self {
            ConfigLine::Set { path, .. } | ConfigLine::Delete { path } => path,
        }
    }
}

impl fmt::Display for ConfigLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLine::Set { path, value: None } => write!(f, "set {}", path),
            ConfigLine::Set {
                path,
                value: Some(value),
            } => write!(f, "set {} {}", path, render_value(value)),
            ConfigLine::Delete { path } => write!(f, "delete {}", path),
        }
    }
}

impl FromStr for ConfigLine {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("delete ") {
            return Ok(ConfigLine::delete(rest.trim()));
        }
        let rest = s
            .strip_prefix("set ")
            .ok_or_else(|| Error::Config(format!("not a set/delete line: '{}'", s)))?
            .trim();

        // Only a quoted trailing value can be told apart from the path.
        if rest.ends_with('"') && rest.len() > 1 {
            if let Some(open) = find_opening_quote(rest) {
                let path = rest[..open].trim_end();
                if !path.is_empty() {
                    return Ok(ConfigLine::set_value(path, unquote(&rest[open..])));
                }
            }
        }
        Ok(ConfigLine::set(rest))
    }
}

impl From<ConfigLine> for String {
    fn from(line: ConfigLine) -> Self {
        line.to_string()
    }
}

impl From<&ConfigLine> for String {
    fn from(line: &ConfigLine) -> Self {
        line.to_string()
    }
}

/// Start of the quoted value ending the line, if it is preceded by a space.
fn find_opening_quote(rest: &str) -> Option<usize> {
    let body = &rest[..rest.len() - 1];
    let bytes = body.as_bytes();
    let mut i = body.len();
    while i > 0 {
        i -= 1;
        if bytes[i] == b'"' && (i == 0 || bytes[i - 1] != b'\\') {
            return (i > 0 && bytes[i - 1] == b' ').then_some(i);
        }
    }
    None
}

/// Wrap a value in `"` delimiters, escaping embedded quotes.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// Strip `"` delimiters if present.
pub fn unquote(text: &str) -> String {
    let text = text.trim();
    match text
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
    {
        Some(inner) => inner.replace("\\\"", "\""),
        None => text.to_string(),
    }
}

/// Returns true if a value must be quoted to survive as one token.
pub fn needs_quotes(value: &str) -> bool {
    value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '"' || c == ';')
}

/// Render a value, quoting it only when needed.
pub fn render_value(value: &str) -> String {
    if needs_quotes(value) {
        quote(value)
    } else {
        value.to_string()
    }
}

/// Ordered, append-only buffer of lines awaiting commit.
///
/// Never contacts the device. Line syntax is not validated.
#[derive(Debug, Clone, Default)]
pub struct CommandStager {
    lines: Vec<String>,
}

impl CommandStager {
    /// Create an empty stager
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line
    pub fn stage(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Append lines, preserving order
    pub fn stage_lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
    }

    /// Number of staged lines
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if nothing is staged
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Staged lines in order
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Drain the buffer
    pub fn take(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    /// Drop all staged lines
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Newline-joined batch as sent to the device
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}
