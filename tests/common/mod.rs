//! Shared test utilities for the junos-engine test suite.
//!
//! Provides [`SimulatedDevice`], an in-memory [`Transport`] that answers the
//! NETCONF RPCs the engine sends the way a Junos device does: a running
//! configuration, a candidate, one exclusive lock and a commit log.
//!
//! Replies travel through one ordered stream, like a real channel: a reply
//! owed to a request the caller gave up on stays queued until
//! [`Transport::realign`] drops it.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use junos_engine::connection::netconf::{element_text, escape_xml, NETCONF_NS};
use junos_engine::connection::{ConnectionError, ConnectionParams, ConnectionResult, Transport};

// ============================================================================
// Device State
// ============================================================================

/// Everything the simulated device remembers
#[derive(Debug, Default)]
pub struct DeviceState {
    pub hardware_model: String,
    pub os_version: String,
    pub host_name: String,

    /// Active configuration, as `set` lines
    pub running: Vec<String>,
    /// Loaded but uncommitted lines
    pub candidate: Vec<String>,
    /// This client holds the candidate lock
    pub locked: bool,

    /// Remaining lock attempts answered with "locked by another user"
    pub busy_locks: u32,
    /// Every lock attempt is refused for lack of permission
    pub deny_lock: bool,
    /// Unlock fails after releasing the lock
    pub fail_unlock: bool,
    /// Identity query fails
    pub fail_identity: bool,
    /// Lines containing any of these fragments are rejected on load
    pub reject: Vec<String>,
    /// Warnings attached to every load reply
    pub load_warnings: Vec<String>,
    /// Warnings attached to every commit reply
    pub commit_warnings: Vec<String>,
    /// Commit fails with this message
    pub fail_commit: Option<String>,
    /// Discard fails
    pub fail_discard: bool,
    /// RPC names answered with a transport error
    pub drop_on: Vec<String>,
    /// RPC names that never get a reply
    pub hang_on: Vec<String>,
    /// Requests containing the fragment are executed at once but their
    /// reply arrives after the delay
    pub late_replies: Vec<(String, Duration)>,

    /// Replies on the wire, oldest first, with the time each one arrives
    pub outbox: VecDeque<(Instant, String)>,
    /// Replies dropped by `realign`
    pub dropped_replies: usize,

    /// `(log, lines)` for every successful commit
    pub commits: Vec<(String, Vec<String>)>,
    /// Name of every RPC received, in order
    pub rpcs: Vec<String>,
    /// Transport closed
    pub closed: bool,
}

/// In-memory Junos device behind the [`Transport`] trait.
///
/// Clones share state, so a test can keep one handle while the session owns
/// another.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    identifier: String,
    state: Arc<Mutex<DeviceState>>,
}

impl SimulatedDevice {
    /// A vSRX with an empty running configuration
    pub fn new() -> Self {
        Self::with_model("vsrx")
    }

    /// A device reporting `model`
    pub fn with_model(model: &str) -> Self {
        let state = DeviceState {
            hardware_model: model.to_string(),
            os_version: "22.4R1.10".to_string(),
            host_name: "lab-r0".to_string(),
            ..Default::default()
        };
        Self {
            identifier: "netops@lab-r0:830".to_string(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Seed the running configuration
    pub fn with_running(self, lines: &[&str]) -> Self {
        self.state.lock().running = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Change device behaviour
    pub fn configure(&self, f: impl FnOnce(&mut DeviceState)) {
        f(&mut self.state.lock());
    }

    /// Read device state
    pub fn inspect<T>(&self, f: impl FnOnce(&DeviceState) -> T) -> T {
        f(&self.state.lock())
    }

    pub fn rpcs(&self) -> Vec<String> {
        self.inspect(|s| s.rpcs.clone())
    }

    pub fn running(&self) -> Vec<String> {
        self.inspect(|s| s.running.clone())
    }

    pub fn candidate(&self) -> Vec<String> {
        self.inspect(|s| s.candidate.clone())
    }

    pub fn is_locked(&self) -> bool {
        self.inspect(|s| s.locked)
    }

    pub fn commits(&self) -> Vec<(String, Vec<String>)> {
        self.inspect(|s| s.commits.clone())
    }

    /// Boxed clone for handing to a session
    pub fn boxed(&self) -> Box<dyn Transport> {
        Box::new(self.clone())
    }

    pub fn dropped_replies(&self) -> usize {
        self.inspect(|s| s.dropped_replies)
    }

    /// Wait for the oldest reply on the wire and take it
    async fn next_reply(&self) -> ConnectionResult<String> {
        let arrives = self.state.lock().outbox.front().map(|(at, _)| *at);
        let Some(arrives) = arrives else {
            return Err(ConnectionError::Protocol("no reply on the wire".to_string()));
        };
        tokio::time::sleep_until(arrives).await;
        self.state
            .lock()
            .outbox
            .pop_front()
            .map(|(_, reply)| reply)
            .ok_or(ConnectionError::ConnectionClosed)
    }

    fn handle(&self, name: &str, rpc: &str) -> String {
        let mut state = self.state.lock();
        match name {
            "get-system-information" => {
                if state.fail_identity {
                    return rpc_error("error", "operation-failed", "system information unavailable");
                }
                format!(
                    "<system-information><hardware-model>{}</hardware-model><os-name>junos</os-name><os-version>{}</os-version><serial-number>SIM0001</serial-number><host-name>{}</host-name></system-information>",
                    state.hardware_model, state.os_version, state.host_name
                )
            }
            "lock" => {
                if state.deny_lock {
                    return rpc_error("error", "access-denied", "permission denied");
                }
                if state.busy_locks > 0 {
                    state.busy_locks -= 1;
                    return rpc_error(
                        "error",
                        "lock-denied",
                        "configuration database locked by: admin terminal p0 (pid 4242)",
                    );
                }
                if state.locked {
                    return rpc_error("error", "lock-denied", "configuration database already locked");
                }
                state.locked = true;
                "<ok/>".to_string()
            }
            "unlock" => {
                if !state.locked {
                    return rpc_error("error", "operation-failed", "configuration database not locked");
                }
                state.locked = false;
                if state.fail_unlock {
                    return rpc_error("error", "operation-failed", "unlock failed");
                }
                "<ok/>".to_string()
            }
            "load-configuration" => {
                let text = element_text(rpc, "configuration-set").unwrap_or_default();
                let mut reply = String::new();
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    if state.reject.iter().any(|r| line.contains(r.as_str())) {
                        let word = line.split_whitespace().last().unwrap_or_default();
                        reply.push_str(&format!(
                            "<rpc-error><error-severity>error</error-severity><error-message>syntax error</error-message><error-info><bad-element>{}</bad-element></error-info></rpc-error>",
                            escape_xml(word)
                        ));
                        return format!("<load-configuration-results>{}</load-configuration-results>", reply);
                    }
                    state.candidate.push(line.to_string());
                }
                for warning in &state.load_warnings {
                    reply.push_str(&rpc_error("warning", "", warning));
                }
                format!("<load-configuration-results>{}<ok/></load-configuration-results>", reply)
            }
            "commit-configuration" => {
                if let Some(message) = state.fail_commit.clone() {
                    return rpc_error("error", "operation-failed", &message);
                }
                let log = element_text(rpc, "log").unwrap_or_default();
                let lines = std::mem::take(&mut state.candidate);
                for line in &lines {
                    apply_line(&mut state.running, line);
                }
                state.commits.push((log, lines));
                let warnings: String = state
                    .commit_warnings
                    .iter()
                    .map(|w| rpc_error("warning", "", w))
                    .collect();
                format!(
                    "<commit-results>{}<routing-engine><name>re0</name><commit-success/></routing-engine></commit-results>",
                    warnings
                )
            }
            "discard-changes" => {
                if state.fail_discard {
                    return rpc_error("error", "operation-failed", "discard failed");
                }
                state.candidate.clear();
                "<ok/>".to_string()
            }
            "close-session" => "<ok/>".to_string(),
            "command" => {
                let text = element_text(rpc, "command").unwrap_or_default();
                if rpc.contains(r#"format="xml""#) {
                    return format!(
                        "<software-information><host-name>{}</host-name><product-model>{}</product-model></software-information>",
                        state.host_name, state.hardware_model
                    );
                }
                match show_configuration(&state.running, &text) {
                    Some(output) => format!(
                        "<configuration-output>\n{}</configuration-output>",
                        escape_xml(&output)
                    ),
                    None if text == "show version" => format!(
                        "<output>Hostname: {}\nModel: {}\nJunos: {}</output>",
                        state.host_name, state.hardware_model, state.os_version
                    ),
                    None => rpc_error("error", "", "syntax error, expecting <command>"),
                }
            }
            _ => rpc_error("error", "operation-not-supported", "unknown rpc"),
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SimulatedDevice {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn is_alive(&self) -> bool {
        !self.state.lock().closed
    }

    async fn send_rpc(&self, rpc: &str) -> ConnectionResult<String> {
        let name = rpc_name(rpc);
        let (hang, drop, delay) = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(ConnectionError::ConnectionClosed);
            }
            state.rpcs.push(name.clone());
            let delay = state
                .late_replies
                .iter()
                .find(|(fragment, _)| rpc.contains(fragment.as_str()))
                .map(|(_, delay)| *delay)
                .unwrap_or_default();
            (state.hang_on.contains(&name), state.drop_on.contains(&name), delay)
        };

        if hang {
            std::future::pending::<()>().await;
        }
        if drop {
            return Err(ConnectionError::ConnectionClosed);
        }

        let body = self.handle(&name, rpc);
        let reply = format!(
            r#"<rpc-reply xmlns="{}">{}</rpc-reply>"#,
            NETCONF_NS, body
        );
        self.state
            .lock()
            .outbox
            .push_back((Instant::now() + delay, reply));
        self.next_reply().await
    }

    async fn realign(&self) -> ConnectionResult<()> {
        let mut state = self.state.lock();
        state.dropped_replies += state.outbox.len();
        state.outbox.clear();
        Ok(())
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}

/// The simulated device behind a transport that cannot drop stale replies.
///
/// Keeps the trait's default `realign`.
pub struct PlainStream(pub SimulatedDevice);

#[async_trait]
impl Transport for PlainStream {
    fn identifier(&self) -> &str {
        self.0.identifier()
    }

    async fn is_alive(&self) -> bool {
        self.0.is_alive().await
    }

    async fn send_rpc(&self, rpc: &str) -> ConnectionResult<String> {
        self.0.send_rpc(rpc).await
    }

    async fn close(&self) -> ConnectionResult<()> {
        self.0.close().await
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Connection parameters matching the simulated device
pub fn lab_params() -> ConnectionParams {
    ConnectionParams::new("lab-r0").username("netops")
}

/// Tag name of the first element in an RPC body
pub fn rpc_name(rpc: &str) -> String {
    rpc.trim()
        .trim_start_matches('<')
        .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn rpc_error(severity: &str, tag: &str, message: &str) -> String {
    format!(
        "<rpc-error><error-type>application</error-type><error-tag>{}</error-tag><error-severity>{}</error-severity><error-message>{}</error-message></rpc-error>",
        tag,
        severity,
        escape_xml(message)
    )
}

/// Merge one `set`/`delete` line into a running configuration
fn apply_line(running: &mut Vec<String>, line: &str) {
    if let Some(path) = line.strip_prefix("delete ") {
        let prefix = format!("set {}", path);
        running.retain(|l| l != &prefix && !l.starts_with(&format!("{} ", prefix)));
    } else if !running.iter().any(|l| l == line) {
        running.push(line.to_string());
    }
}

/// Render `show configuration ...` from `set` lines.
///
/// `| display set relative` yields `set` lines relative to the path; plain
/// output yields `statement;` lines relative to the path's parent.
fn show_configuration(running: &[String], command: &str) -> Option<String> {
    let rest = command.strip_prefix("show configuration")?.trim();
    let (path, display_set) = match rest.strip_suffix("| display set relative") {
        Some(path) => (path.trim(), true),
        None => (rest, false),
    };

    let context = if display_set {
        path.to_string()
    } else {
        path.rsplit_once(' ').map(|(parent, _)| parent.to_string()).unwrap_or_default()
    };
    let prefix = if context.is_empty() {
        "set ".to_string()
    } else {
        format!("set {} ", context)
    };
    let selector = format!("set {} ", path);

    let mut output = String::new();
    for line in running {
        if !path.is_empty() && !line.starts_with(&selector) && line != selector.trim_end() {
            continue;
        }
        let Some(relative) = line.strip_prefix(&prefix) else {
            continue;
        };
        if display_set {
            output.push_str(&format!("set {}\n", relative));
        } else {
            output.push_str(&format!("{};\n", relative));
        }
    }
    Some(output)
}
