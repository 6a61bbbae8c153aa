//! Parser for `show configuration ... | display set relative` output.
//!
//! Each line is stripped of its `set ` prefix and dispatched against a
//! [`Schema`]: the longest keyword matching at the current level wins, scalar
//! values are converted to their declared type, and repeated blocks are keyed
//! by their leading token(s) so later lines for an existing key update that
//! entry in place. Unknown directives are skipped.
//!
//! ```rust,ignore
//! use junos_engine::parser::{builtin, parse_config};
//!
//! let record = parse_config("set system host-name R1\n", &builtin::system_schema())?;
//! assert_eq!(record.block("system").and_then(|s| s.text("host_name")), Some("R1"));
//! ```

pub mod builtin;
pub mod record;
pub mod schema;

pub use record::{Record, RecordKey, Text, Value};
pub use schema::{FieldKind, FieldSpec, KeyKind, Schema};

use tracing::trace;

use crate::error::{Error, Result};
use crate::stage::{render_value, unquote};

/// Envelope elements wrapping text output in a reply
const ENVELOPE_TAGS: [&str; 3] = ["configuration-output", "configuration-text", "output"];

// ============================================================================
// Tokenizer
// ============================================================================

/// Remove `prefix` from the start of `line` if it is there.
///
/// The prefix must end on a token boundary unless it ends in whitespace
/// itself. Returns whether it matched and the trimmed remainder (or `line`
/// unchanged).
pub fn cut_prefix<'a>(line: &'a str, prefix: &str) -> (bool, &'a str) {
    match line.strip_prefix(prefix) {
        Some(rest) if prefix.ends_with(char::is_whitespace) => (true, rest.trim_start()),
        Some(rest) if rest.is_empty() => (true, rest),
        Some(rest) if rest.starts_with(char::is_whitespace) => (true, rest.trim_start()),
        _ => (false, line),
    }
}

/// Split off the first token; a quoted token runs to its closing quote.
pub fn first_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    if s.starts_with('"') {
        let bytes = s.as_bytes();
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => return (&s[..=i], s[i + 1..].trim_start()),
                _ => i += 1,
            }
        }
        return (s, "");
    }
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Split off the first `n` tokens, joined by single spaces.
pub fn split_key(s: &str, n: usize) -> Option<(String, &str)> {
    let mut tokens = Vec::with_capacity(n);
    let mut rest = s;
    for _ in 0..n {
        let (token, remainder) = first_token(rest);
        if token.is_empty() {
            return None;
        }
        tokens.push(token);
        rest = remainder;
    }
    Some((tokens.join(" "), rest))
}

// ============================================================================
// Parsing
// ============================================================================

/// What to do with one raw line of output
enum Line<'a> {
    Content(&'a str),
    Skip,
    End,
    ContentThenEnd(&'a str),
}

fn classify(raw: &str) -> Line<'_> {
    let mut line = raw.trim();

    for tag in ENVELOPE_TAGS {
        let close = format!("</{}>", tag);
        if let Some(pos) = line.find(&close) {
            let before = strip_open_tag(line[..pos].trim());
            return if before.is_empty() {
                Line::End
            } else {
                Line::ContentThenEnd(before)
            };
        }
    }
    line = strip_open_tag(line);

    if line.is_empty()
        || line.starts_with('#')
        || (line.starts_with('{') && line.ends_with('}'))
        || line.starts_with("<?xml")
        || line.starts_with("<rpc-reply")
        || line.starts_with("</rpc-reply")
    {
        return Line::Skip;
    }
    Line::Content(line)
}

fn strip_open_tag(line: &str) -> &str {
    for tag in ENVELOPE_TAGS {
        let open = format!("<{}", tag);
        if let Some(rest) = line.strip_prefix(open.as_str()) {
            if let Some(end) = rest.find('>') {
                if rest[..end].is_empty() || rest.starts_with(char::is_whitespace) {
                    return rest[end + 1..].trim();
                }
            }
        }
    }
    line
}

/// Parse display-set output into a record tree shaped by `schema`.
pub fn parse_config(raw: &str, schema: &Schema) -> Result<Record> {
    parse_config_at(raw, schema, "")
}

/// Parse output that is relative to `context`.
///
/// `show configuration system host-name` prints `host-name R1;`; parsed with
/// context `system` against a schema rooted at the top level, it yields the
/// same tree as `set system host-name R1`.
pub fn parse_config_at(raw: &str, schema: &Schema, context: &str) -> Result<Record> {
    let context = context.trim();
    let mut record = Record::new();

    for raw_line in raw.lines() {
        let (content, end) = match classify(raw_line) {
            Line::Content(content) => (content, false),
            Line::ContentThenEnd(content) => (content, true),
            Line::Skip => continue,
            Line::End => break,
        };

        let (_, statement) = cut_prefix(content, "set");
        let statement = statement.strip_suffix(';').unwrap_or(statement).trim_end();
        if !statement.is_empty() {
            if context.is_empty() {
                apply(&mut record, schema, statement, raw_line)?;
            } else {
                let full = format!("{} {}", context, statement);
                apply(&mut record, schema, &full, raw_line)?;
            }
        }

        if end {
            break;
        }
    }

    Ok(record)
}

/// Dispatch one statement into `record`.
fn apply(record: &mut Record, schema: &Schema, statement: &str, line: &str) -> Result<()> {
    let (spec, rest) = match schema.lookup(statement) {
        Some(found) => found,
        None => {
            trace!(statement = %statement, "Skipping unknown directive");
            return Ok(());
        }
    };
    let key = spec.key();

    match spec.kind() {
        FieldKind::Text => {
            if rest.is_empty() {
                return Err(Error::malformed_value(line, key, "missing value"));
            }
            record.set(key, Value::Text(Text::from_raw(rest)));
        }
        FieldKind::Integer => {
            let value = unquote(rest);
            let n = value.parse::<i64>().map_err(|e| {
                Error::malformed_value(line, key, format!("'{}' is not an integer: {}", value, e))
            })?;
            record.set(key, Value::Integer(n));
        }
        FieldKind::Boolean => {
            let b = match unquote(rest).as_str() {
                "true" => true,
                "false" => false,
                other => {
                    return Err(Error::malformed_value(
                        line,
                        key,
                        format!("'{}' is not true or false", other),
                    ))
                }
            };
            record.set(key, Value::Boolean(b));
        }
        FieldKind::Flag => {
            if !rest.is_empty() {
                trace!(field = %key, rest = %rest, "Ignoring trailing tokens after flag");
            }
            record.set(key, Value::Flag);
        }
        FieldKind::List => {
            if rest.is_empty() {
                return Err(Error::malformed_value(line, key, "missing value"));
            }
            record.push_list(key, Text::from_raw(rest));
        }
        FieldKind::Block(inner) => {
            let block = record.block_mut(key);
            if !rest.is_empty() {
                apply(block, inner, rest, line)?;
            }
        }
        FieldKind::Repeated { key: kind, schema: inner } => {
            let (entry_key, rest) = extract_key(*kind, rest)
                .map_err(|message| Error::malformed_value(line, key, message))?;
            let entry = record.entry_mut(key, entry_key);
            if !rest.is_empty() {
                apply(entry, inner, rest, line)?;
            }
        }
    }
    Ok(())
}

fn extract_key(kind: KeyKind, rest: &str) -> std::result::Result<(RecordKey, &str), String> {
    match kind {
        KeyKind::Name => {
            let (token, rest) = first_token(rest);
            if token.is_empty() {
                return Err("missing key".to_string());
            }
            Ok((RecordKey::Name(unquote(token)), rest))
        }
        KeyKind::Index => {
            let (token, rest) = first_token(rest);
            let index = token
                .parse::<i64>()
                .map_err(|_| format!("'{}' is not a numeric index", token))?;
            Ok((RecordKey::Index(index), rest))
        }
        KeyKind::Composite(n) => {
            let (joined, rest) =
                split_key(rest, n).ok_or_else(|| format!("key needs {} tokens", n))?;
            Ok((RecordKey::Name(joined), rest))
        }
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render a record back to `set` lines, in first-seen order.
pub fn render(record: &Record, schema: &Schema) -> Vec<String> {
    let mut statements = Vec::new();
    render_into(record, schema, "", &mut statements);
    statements
        .into_iter()
        .map(|statement| format!("set {}", statement))
        .collect()
}

/// Render the part of a record under `context`, relative to it.
pub fn render_at(record: &Record, schema: &Schema, context: &str) -> Vec<String> {
    let context = context.trim();
    if context.is_empty() {
        return render(record, schema);
    }
    let mut statements = Vec::new();
    render_into(record, schema, "", &mut statements);
    statements
        .iter()
        .filter_map(|statement| match cut_prefix(statement, context) {
            (true, rest) if !rest.is_empty() => Some(format!("set {}", rest)),
            _ => None,
        })
        .collect()
}

fn join(prefix: &str, part: &str) -> String {
    if prefix.is_empty() {
        part.to_string()
    } else {
        format!("{} {}", prefix, part)
    }
}

fn render_into(record: &Record, schema: &Schema, prefix: &str, out: &mut Vec<String>) {
    for (key, value) in record.iter() {
        let spec = match schema.get(key) {
            Some(spec) => spec,
            None => continue,
        };
        let path = join(prefix, spec.keyword());

        match (value, spec.kind()) {
            (Value::Text(text), _) => out.push(join(&path, &text.token())),
            (Value::Integer(n), _) => out.push(join(&path, &n.to_string())),
            (Value::Boolean(b), _) => out.push(join(&path, &b.to_string())),
            (Value::Flag, _) => out.push(path),
            (Value::List(items), _) => {
                out.extend(items.iter().map(|item| join(&path, &item.token())))
            }
            (Value::Block(inner), FieldKind::Block(inner_schema)) => {
                if inner.is_empty() {
                    out.push(path);
                } else {
                    render_into(inner, inner_schema, &path, out);
                }
            }
            (Value::Repeated(entries), FieldKind::Repeated { key: kind, schema: inner_schema }) => {
                for (entry_key, entry) in entries {
                    let key_text = match (kind, entry_key) {
                        (KeyKind::Name, RecordKey::Name(name)) => render_value(name),
                        _ => entry_key.to_string(),
                    };
                    let entry_path = join(&path, &key_text);
                    if entry.is_empty() {
                        out.push(entry_path);
                    } else {
                        render_into(entry, inner_schema, &entry_path, out);
                    }
                }
            }
            _ => {}
        }
    }
}
