//! Connection parameters for a Junos device.
//!
//! Credentials are opaque to the engine; they are handed to the transport as-is.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default NETCONF over SSH port
pub const DEFAULT_NETCONF_PORT: u16 = 830;

/// Default connection timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 30;

/// Default per-RPC timeout in seconds
pub const DEFAULT_COMMAND_TIMEOUT: u64 = 120;

/// Parameters used to open a session to one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionParams {
    /// Device address or name
    pub host: String,

    /// NETCONF port
    pub port: u16,

    /// Login user
    pub username: String,

    /// Login password
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Private key used before falling back to password authentication
    pub private_key_file: Option<PathBuf>,

    /// Passphrase for the private key
    #[serde(skip_serializing)]
    pub key_passphrase: Option<String>,

    /// Timeout for establishing the transport
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Timeout for a single device round trip
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,

    /// Accept host keys not present in known_hosts
    pub accept_unknown_hosts: bool,
}

impl Default for ConnectionParams {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_NETCONF_PORT,
            username: std::env::var("USER").unwrap_or_else(|_| "root".to_string()),
            password: None,
            private_key_file: None,
            key_passphrase: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT),
            accept_unknown_hosts: true,
        }
    }
}

impl ConnectionParams {
    /// Create parameters for a host with defaults for everything else
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the user
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the private key path
    pub fn private_key(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key_file = Some(path.into());
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the per-RPC timeout
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// `user@host:port`
    pub fn identifier(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = ConnectionParams::new("r1.example.net");
        assert_eq!(params.port, 830);
        assert_eq!(params.command_timeout, Duration::from_secs(120));
        assert!(params.password.is_none());
    }

    #[test]
    fn test_builder() {
        let params = ConnectionParams::new("192.0.2.1")
            .port(2830)
            .username("netops")
            .password("secret")
            .command_timeout(Duration::from_secs(5));

        assert_eq!(params.identifier(), "netops@192.0.2.1:2830");
        assert_eq!(params.password.as_deref(), Some("secret"));
        assert_eq!(params.command_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_password_not_serialized() {
        let params = ConnectionParams::new("r1").password("secret");
        let json = serde_json::to_string(&params).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_deserialize_humantime() {
        let params: ConnectionParams =
            toml::from_str("host = \"r1\"\ncommand_timeout = \"45s\"\n").unwrap();
        assert_eq!(params.host, "r1");
        assert_eq!(params.command_timeout, Duration::from_secs(45));
        assert_eq!(params.port, 830);
    }
}
