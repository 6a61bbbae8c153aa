//! NETCONF 1.0 message construction and reply parsing for Junos.
//!
//! Only the handful of RPCs the transaction engine needs are built here. Reply
//! parsing is deliberately shallow: the engine cares about `<ok/>`, the reply
//! payload and the list of `<rpc-error>` elements with their severity.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

// ============================================================================
// NETCONF Constants
// ============================================================================

/// NETCONF 1.0 end-of-message delimiter (RFC 4742 framing)
pub const DELIMITER: &str = "]]>]]>";

/// NETCONF SSH subsystem name
pub const SUBSYSTEM: &str = "netconf";

/// NETCONF base namespace (RFC 6241)
pub const NETCONF_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// Envelope tag wrapping `show configuration` text output
pub const CONFIGURATION_OUTPUT_TAG: &str = "configuration-output";

/// Message ID counter for RPC operations
static MESSAGE_ID_COUNTER: AtomicU32 = AtomicU32::new(1);

/// Get the next message ID for an RPC
fn next_message_id() -> u32 {
    MESSAGE_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

// ============================================================================
// Message Construction
// ============================================================================

/// Client hello, framed.
pub fn client_hello() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<hello xmlns="{}">
  <capabilities>
    <capability>urn:ietf:params:netconf:base:1.0</capability>
    <capability>urn:ietf:params:netconf:capability:candidate:1.0</capability>
    <capability>urn:ietf:params:netconf:capability:validate:1.0</capability>
  </capabilities>
</hello>{}"#,
        NETCONF_NS, DELIMITER
    )
}

/// Wrap an RPC body into a framed `<rpc>` message.
///
/// Returns the message id together with the framed text.
pub fn frame_rpc(body: &str) -> (u32, String) {
    let message_id = next_message_id();
    let framed = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rpc xmlns="{}" message-id="{}">
{}
</rpc>{}"#,
        NETCONF_NS, message_id, body, DELIMITER
    );
    (message_id, framed)
}

/// Output format requested from a `<command>` RPC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFormat {
    /// Plain text, as printed by the CLI
    Text,
    /// Junos XML
    Xml,
}

impl CommandFormat {
    fn as_str(self) -> &'static str {
        match self {
            CommandFormat::Text => "text",
            CommandFormat::Xml => "xml",
        }
    }
}

/// RPC bodies used by the engine.
pub mod rpc {
    use super::{escape_xml, CommandFormat};

    /// Identity/capability probe
    pub fn get_system_information() -> String {
        "<get-system-information/>".to_string()
    }

    /// Run an operational-mode command
    pub fn command(text: &str, format: CommandFormat) -> String {
        format!(
            r#"<command format="{}">{}</command>"#,
            format.as_str(),
            escape_xml(text)
        )
    }

    /// Lock the candidate datastore
    pub fn lock_candidate() -> String {
        "<lock><target><candidate/></target></lock>".to_string()
    }

    /// Unlock the candidate datastore
    pub fn unlock_candidate() -> String {
        "<unlock><target><candidate/></target></unlock>".to_string()
    }

    /// Load `set`/`delete` lines into the candidate as one batch
    pub fn load_set(lines: &str) -> String {
        format!(
            r#"<load-configuration action="set" format="text"><configuration-set>{}</configuration-set></load-configuration>"#,
            escape_xml(lines)
        )
    }

    /// Commit the candidate with a log message
    pub fn commit(log: &str) -> String {
        format!(
            "<commit-configuration><log>{}</log></commit-configuration>",
            escape_xml(log)
        )
    }

    /// Discard uncommitted candidate changes
    pub fn discard_changes() -> String {
        "<discard-changes/>".to_string()
    }

    /// Close the NETCONF session
    pub fn close_session() -> String {
        "<close-session/>".to_string()
    }
}

// ============================================================================
// Reply Parsing
// ============================================================================

/// Severity of an `<rpc-error>`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal for the operation
    Error,
    /// Diagnostic only
    Warning,
}

/// A single `<rpc-error>` from a reply.
#[derive(Debug, Clone)]
pub struct RpcError {
    /// Error severity
    pub severity: Severity,
    /// Error tag (e.g. `lock-denied`, `access-denied`)
    pub tag: String,
    /// Error message
    pub message: Option<String>,
    /// Error path (configuration element that caused the error)
    pub path: Option<String>,
    /// Offending element reported in `<error-info>`
    pub bad_element: Option<String>,
}

impl RpcError {
    /// Parse a single rpc-error element
    fn parse(xml: &str) -> Self {
        let severity = match element_text(xml, "error-severity").as_deref() {
            Some("warning") => Severity::Warning,
            _ => Severity::Error,
        };
        RpcError {
            severity,
            tag: element_text(xml, "error-tag").unwrap_or_default(),
            message: element_text(xml, "error-message"),
            path: element_text(xml, "error-path"),
            bad_element: element_text(xml, "bad-element"),
        }
    }

    /// Returns true for fatal errors
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self.message.as_deref().unwrap_or("unknown error");
        if self.tag.is_empty() {
            write!(f, "{}", message)?;
        } else {
            write!(f, "[{}] {}", self.tag, message)?;
        }
        if let Some(ref element) = self.bad_element {
            write!(f, " (element '{}')", element)?;
        }
        if let Some(ref path) = self.path {
            write!(f, " at {}", path)?;
        }
        Ok(())
    }
}

/// Parsed `<rpc-reply>`
#[derive(Debug, Clone, Default)]
pub struct RpcReply {
    /// Message ID echoed by the device
    pub message_id: Option<u32>,
    /// `<ok/>` was present
    pub ok: bool,
    /// All rpc-error elements, fatal and warnings
    pub errors: Vec<RpcError>,
    /// Raw inner XML of the reply
    pub data: String,
}

/// Message id echoed in a raw `<rpc-reply>`, without parsing the body
pub fn reply_message_id(reply: &str) -> Option<u32> {
    open_tag(reply, "rpc-reply")
        .and_then(|tag| attribute(tag, "message-id"))
        .and_then(|id| id.parse().ok())
}

impl RpcReply {
    /// Parse a raw reply document. Text outside `<rpc-reply>` is ignored.
    pub fn parse(reply: &str) -> Self {
        let reply = reply.trim().trim_end_matches(DELIMITER).trim();
        let message_id = reply_message_id(reply);
        let data = element_body(reply, "rpc-reply")
            .unwrap_or(reply)
            .trim()
            .to_string();

        let mut errors = Vec::new();
        let mut search_start = 0;
        while let Some(start) = data[search_start..].find("<rpc-error>") {
            let abs_start = search_start + start;
            match data[abs_start..].find("</rpc-error>") {
                Some(end) => {
                    let end = abs_start + end + "</rpc-error>".len();
                    errors.push(RpcError::parse(&data[abs_start..end]));
                    search_start = end;
                }
                None => break,
            }
        }

        RpcReply {
            message_id,
            ok: data.contains("<ok/>") || data.contains("<ok />"),
            errors,
            data,
        }
    }

    /// Returns true if any fatal error is present
    pub fn has_errors(&self) -> bool {
        self.errors.iter().any(RpcError::is_error)
    }

    /// Fatal errors only
    pub fn fatal_errors(&self) -> impl Iterator<Item = &RpcError> {
        self.errors.iter().filter(|e| e.is_error())
    }

    /// Warning messages, in reply order
    pub fn warnings(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter(|e| !e.is_error())
            .map(ToString::to_string)
            .collect()
    }

    /// All fatal error messages joined for display
    pub fn error_message(&self) -> String {
        self.fatal_errors()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Text content of the first `<tag>` in the reply data
    pub fn text_of(&self, tag: &str) -> Option<String> {
        element_text(&self.data, tag)
    }
}

// ============================================================================
// Framing
// ============================================================================

/// Accumulates transport bytes and splits them into NETCONF 1.0 messages.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: Vec<u8>,
}

impl FrameBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Pop the next complete message without its delimiter
    pub fn next_message(&mut self) -> Option<String> {
        let delimiter = DELIMITER.as_bytes();
        let pos = self
            .buffer
            .windows(delimiter.len())
            .position(|w| w == delimiter)?;
        let message: Vec<u8> = self.buffer.drain(..pos + delimiter.len()).collect();
        Some(String::from_utf8_lossy(&message[..pos]).into_owned())
    }
}

// ============================================================================
// XML Helpers
// ============================================================================

/// Escape special XML characters in text content
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Reverse [`escape_xml`]
pub fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Find the opening tag `<name ...>` and return its full text.
fn open_tag<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("<{}", name);
    let mut from = 0;
    while let Some(pos) = xml[from..].find(&needle) {
        let start = from + pos;
        let after = start + needle.len();
        match xml[after..].chars().next() {
            Some('>') | Some(' ') | Some('/') | Some('\n') | Some('\t') | Some('\r') => {
                let end = xml[after..].find('>')? + after;
                return Some(&xml[start..=end]);
            }
            _ => from = after,
        }
    }
    None
}

/// Read `attr="value"` from an opening tag.
fn attribute<'a>(tag: &'a str, attr: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", attr);
    let start = tag.find(&needle)? + needle.len();
    let end = tag[start..].find('"')? + start;
    Some(&tag[start..end])
}

/// Raw inner XML of the first `<name>` element; `Some("")` if self-closing.
pub fn element_body<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let tag = open_tag(xml, name)?;
    if tag.ends_with("/>") {
        return Some("");
    }
    let tag_start = xml.find(tag)?;
    let content_start = tag_start + tag.len();
    let close = format!("</{}>", name);
    let end = xml[content_start..].rfind(&close)? + content_start;
    Some(&xml[content_start..end])
}

/// Trimmed, unescaped text of the first `<name>` element.
pub fn element_text(xml: &str, name: &str) -> Option<String> {
    let tag = open_tag(xml, name)?;
    if tag.ends_with("/>") {
        return Some(String::new());
    }
    let tag_start = xml.find(tag)?;
    let content_start = tag_start + tag.len();
    let close = format!("</{}>", name);
    let end = xml[content_start..].find(&close)? + content_start;
    Some(unescape_xml(xml[content_start..end].trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("test"), "test");
        assert_eq!(escape_xml("<test>"), "&lt;test&gt;");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("\"quoted\""), "&quot;quoted&quot;");
        assert_eq!(unescape_xml(&escape_xml("set x \"a & b\"")), "set x \"a & b\"");
    }

    #[test]
    fn test_frame_rpc_increments_ids() {
        let (first, framed) = frame_rpc("<get-system-information/>");
        let (second, _) = frame_rpc("<get-system-information/>");
        assert!(second > first);
        assert!(framed.contains(&format!("message-id=\"{}\"", first)));
        assert!(framed.ends_with(DELIMITER));
    }

    #[test]
    fn test_rpc_bodies_escape_payload() {
        let body = rpc::load_set("set system login message \"a <b>\"");
        assert!(body.contains("&lt;b&gt;"));
        assert!(body.starts_with("<load-configuration action=\"set\" format=\"text\">"));
        assert!(rpc::commit("create resource X").contains("<log>create resource X</log>"));
        assert_eq!(
            rpc::command("show version", CommandFormat::Xml),
            "<command format=\"xml\">show version</command>"
        );
    }

    #[test]
    fn test_parse_ok_reply() {
        let reply = RpcReply::parse(
            r#"<rpc-reply xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" message-id="7"><ok/></rpc-reply>]]>]]>"#,
        );
        assert!(reply.ok);
        assert_eq!(reply.message_id, Some(7));
        assert!(!reply.has_errors());
    }

    #[test]
    fn test_reply_message_id() {
        let (id, framed) = frame_rpc("<get-system-information/>");
        assert!(framed.contains(&format!("message-id=\"{}\"", id)));

        let reply = format!(
            "<?xml version=\"1.0\"?>\n<rpc-reply xmlns=\"{}\" message-id=\"{}\"><ok/></rpc-reply>",
            NETCONF_NS, id
        );
        assert_eq!(reply_message_id(&reply), Some(id));
        assert_eq!(reply_message_id("<rpc-reply><ok/></rpc-reply>"), None);
    }

    #[test]
    fn test_parse_errors_and_warnings() {
        let reply = RpcReply::parse(
            r#"<rpc-reply message-id="3">
<rpc-error>
<error-type>protocol</error-type>
<error-tag>operation-failed</error-tag>
<error-severity>warning</error-severity>
<error-message>statement not found</error-message>
</rpc-error>
<rpc-error>
<error-severity>error</error-severity>
<error-message>syntax error</error-message>
<error-info><bad-element>ge-0/0/99</bad-element></error-info>
</rpc-error>
</rpc-reply>"#,
        );

        assert!(reply.has_errors());
        assert_eq!(reply.errors.len(), 2);
        assert_eq!(reply.warnings(), vec!["[operation-failed] statement not found"]);
        assert_eq!(reply.error_message(), "syntax error (element 'ge-0/0/99')");
    }

    #[test]
    fn test_element_helpers() {
        let xml = r#"<system-information><hardware-model>vsrx</hardware-model><os-name>junos</os-name><empty/></system-information>"#;
        assert_eq!(element_text(xml, "hardware-model").as_deref(), Some("vsrx"));
        assert_eq!(element_text(xml, "empty").as_deref(), Some(""));
        assert!(element_text(xml, "os-version").is_none());
        // prefix of another tag name must not match
        assert!(element_text("<hardware-model-x>a</hardware-model-x>", "hardware-model").is_none());
    }

    #[test]
    fn test_frame_buffer_splits_messages() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(b"<rpc-reply><ok/></rpc-reply>]]>]]><rpc-re");
        assert_eq!(buffer.next_message().as_deref(), Some("<rpc-reply><ok/></rpc-reply>"));
        assert!(buffer.next_message().is_none());
        buffer.extend(b"ply/>]]>]]>");
        assert_eq!(buffer.next_message().as_deref(), Some("<rpc-reply/>"));
    }
}
