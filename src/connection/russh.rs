//! NETCONF over SSH using the russh crate.
//!
//! Opens the `netconf` subsystem on port 830 (by default), exchanges hellos and
//! then carries one framed RPC at a time over the channel.

use async_trait::async_trait;
use russh::client::{Handle, Handler, Msg};
use russh::keys::key::PublicKey;
use russh::keys::load_secret_key;
use russh::{Channel, ChannelMsg, Disconnect};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

use super::config::ConnectionParams;
use super::netconf::{self, FrameBuffer, SUBSYSTEM};
use super::{ConnectionError, ConnectionResult, RusshError, Transport};

/// Client handler for russh with known_hosts verification
struct ClientHandler {
    host: String,
    port: u16,
    accept_unknown: bool,
}

#[async_trait]
impl Handler for ClientHandler {
    type Error = RusshError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match russh_keys::check_known_hosts(&self.host, self.port, server_public_key) {
            Ok(true) => {
                debug!(host = %self.host, "Host key verified against known_hosts");
                Ok(true)
            }
            Ok(false) if self.accept_unknown => {
                warn!(host = %self.host, "Host not found in known_hosts, accepting");
                Ok(true)
            }
            Ok(false) => {
                warn!(host = %self.host, "Host not found in known_hosts, rejecting");
                Ok(false)
            }
            Err(e) => {
                warn!(
                    host = %self.host,
                    error = %e,
                    "HOST KEY VERIFICATION FAILED"
                );
                Ok(false)
            }
        }
    }
}

/// Where the channel stands in the current request/reply exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exchange {
    Idle,
    /// A request was being written; if the caller went away here the
    /// framing on the wire is broken
    Writing,
    /// Request `id` is on the wire and its reply has not been read
    Awaiting(u32),
}

/// Open netconf channel plus bytes received past the last delimiter
struct NetconfChannel {
    channel: Channel<Msg>,
    buffer: FrameBuffer,
    exchange: Exchange,
}

impl NetconfChannel {
    async fn write(&mut self, message: &str) -> ConnectionResult<()> {
        let mut cursor = tokio::io::BufReader::new(message.as_bytes());
        self.channel.data(&mut cursor).await.map_err(|e| {
            ConnectionError::Protocol(format!("Failed to write to netconf channel: {}", e))
        })
    }

    async fn read_message(&mut self) -> ConnectionResult<String> {
        loop {
            if let Some(message) = self.buffer.next_message() {
                trace!(bytes = message.len(), "Received netconf message");
                return Ok(message);
            }
            match self.channel.wait().await {
                Some(ChannelMsg::Data { ref data }) => self.buffer.extend(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    debug!(stderr = %String::from_utf8_lossy(data), "netconf stderr");
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ConnectionError::ConnectionClosed);
                }
                Some(_) => {}
            }
        }
    }

    /// Read until the reply to `message_id`, dropping replies to abandoned
    /// requests on the way.
    async fn read_reply(&mut self, message_id: u32) -> ConnectionResult<String> {
        loop {
            let message = self.read_message().await?;
            match netconf::reply_message_id(&message) {
                Some(id) if id != message_id => {
                    debug!(expected = message_id, received = id, "Dropping stale reply");
                }
                _ => return Ok(message),
            }
        }
    }

    /// One request and its reply
    async fn exchange(&mut self, rpc: &str) -> ConnectionResult<String> {
        let (message_id, framed) = netconf::frame_rpc(rpc);
        trace!(message_id, "Sending RPC");

        self.exchange = Exchange::Writing;
        self.write(&framed).await?;
        self.exchange = Exchange::Awaiting(message_id);
        let reply = self.read_reply(message_id).await?;
        self.exchange = Exchange::Idle;
        Ok(reply)
    }
}

/// NETCONF session to a Junos device over SSH
pub struct NetconfSshTransport {
    identifier: String,
    handle: Mutex<Option<Handle<ClientHandler>>>,
    channel: Mutex<Option<NetconfChannel>>,
    connected: AtomicBool,
}

impl NetconfSshTransport {
    /// Connect, authenticate, open the netconf subsystem and exchange hellos
    pub async fn connect(params: &ConnectionParams) -> ConnectionResult<Self> {
        let identifier = params.identifier();
        debug!(identifier = %identifier, "Connecting via NETCONF over SSH");

        let mut config = russh::client::Config::default();
        config.inactivity_timeout = Some(params.command_timeout);
        let config = Arc::new(config);

        let addr = format!("{}:{}", params.host, params.port);
        let timeout = params.connect_timeout;
        let socket = tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&addr))
            .await
            .map_err(|_| ConnectionError::Timeout(timeout.as_secs()))?
            .map_err(|e| {
                ConnectionError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
            })?;

        socket.set_nodelay(true).map_err(|e| {
            ConnectionError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
        })?;

        let handler = ClientHandler {
            host: params.host.clone(),
            port: params.port,
            accept_unknown: params.accept_unknown_hosts,
        };

        let mut handle = russh::client::connect_stream(config, socket, handler)
            .await
            .map_err(|e| {
                ConnectionError::ConnectionFailed(format!("SSH handshake failed: {}", e))
            })?;

        Self::authenticate(&mut handle, params).await?;

        let channel = handle.channel_open_session().await.map_err(|e| {
            ConnectionError::ConnectionFailed(format!("Failed to open channel: {}", e))
        })?;
        channel.request_subsystem(true, SUBSYSTEM).await.map_err(|e| {
            ConnectionError::ConnectionFailed(format!(
                "Failed to start netconf subsystem: {}",
                e
            ))
        })?;

        let mut channel = NetconfChannel {
            channel,
            buffer: FrameBuffer::new(),
            exchange: Exchange::Idle,
        };

        let server_hello = tokio::time::timeout(timeout, channel.read_message())
            .await
            .map_err(|_| ConnectionError::Timeout(timeout.as_secs()))??;
        if !server_hello.contains("<hello") {
            return Err(ConnectionError::Protocol(
                "Device did not send a NETCONF hello".to_string(),
            ));
        }
        channel.write(&netconf::client_hello()).await?;

        debug!(identifier = %identifier, "NETCONF session established");

        Ok(Self {
            identifier,
            handle: Mutex::new(Some(handle)),
            channel: Mutex::new(Some(channel)),
            connected: AtomicBool::new(true),
        })
    }

    /// Key first, then password
    async fn authenticate(
        handle: &mut Handle<ClientHandler>,
        params: &ConnectionParams,
    ) -> ConnectionResult<()> {
        if let Some(ref key_path) = params.private_key_file {
            match Self::try_key_auth(handle, params, key_path).await {
                Ok(()) => {
                    debug!(key = %key_path.display(), "Authenticated using key");
                    return Ok(());
                }
                Err(e) => debug!(error = %e, "Key authentication failed"),
            }
        }

        if let Some(ref password) = params.password {
            let authenticated = handle
                .authenticate_password(&params.username, password)
                .await
                .map_err(|e| {
                    ConnectionError::AuthenticationFailed(format!(
                        "Password authentication failed: {}",
                        e
                    ))
                })?;
            if authenticated {
                debug!("Authenticated using password");
                return Ok(());
            }
        }

        Err(ConnectionError::AuthenticationFailed(
            "All authentication methods failed".to_string(),
        ))
    }

    async fn try_key_auth(
        handle: &mut Handle<ClientHandler>,
        params: &ConnectionParams,
        key_path: &Path,
    ) -> ConnectionResult<()> {
        let key_pair = load_secret_key(key_path, params.key_passphrase.as_deref()).map_err(|e| {
            ConnectionError::AuthenticationFailed(format!(
                "Failed to load key {}: {}",
                key_path.display(),
                e
            ))
        })?;

        let authenticated = handle
            .authenticate_publickey(&params.username, Arc::new(key_pair))
            .await
            .map_err(|e| {
                ConnectionError::AuthenticationFailed(format!("Key authentication failed: {}", e))
            })?;

        if authenticated {
            Ok(())
        } else {
            Err(ConnectionError::AuthenticationFailed(format!(
                "Key {} rejected",
                key_path.display()
            )))
        }
    }

    /// Discard the channel when a request was cut off mid-write.
    fn check_framing(&self, channel: &mut Option<NetconfChannel>) -> ConnectionResult<()> {
        match channel.as_ref().map(|c| c.exchange) {
            None => Err(ConnectionError::ConnectionClosed),
            Some(Exchange::Writing) => {
                warn!(identifier = %self.identifier, "Request interrupted mid-write, dropping netconf channel");
                channel.take();
                self.connected.store(false, Ordering::SeqCst);
                Err(ConnectionError::Protocol(
                    "netconf framing broken by an interrupted request".to_string(),
                ))
            }
            Some(_) => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for NetconfSshTransport {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn is_alive(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_rpc(&self, rpc: &str) -> ConnectionResult<String> {
        let mut guard = self.channel.lock().await;
        self.check_framing(&mut *guard)?;
        let channel = guard.as_mut().ok_or(ConnectionError::ConnectionClosed)?;

        let result = channel.exchange(rpc).await;
        if let Err(ConnectionError::ConnectionClosed) = result {
            self.connected.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn realign(&self) -> ConnectionResult<()> {
        let mut guard = self.channel.lock().await;
        self.check_framing(&mut *guard)?;
        if let Some(Exchange::Awaiting(id)) = guard.as_ref().map(|c| c.exchange) {
            debug!(identifier = %self.identifier, message_id = id, "Reply to abandoned request will be dropped");
        }
        Ok(())
    }

    async fn close(&self) -> ConnectionResult<()> {
        if let Some(channel) = self.channel.lock().await.take() {
            let _ = channel.channel.eof().await;
        }

        if let Some(handle) = self.handle.lock().await.take() {
            handle
                .disconnect(Disconnect::ByApplication, "", "en")
                .await
                .map_err(|e| ConnectionError::Protocol(format!("Disconnect failed: {}", e)))?;
        }

        self.connected.store(false, Ordering::SeqCst);
        debug!(identifier = %self.identifier, "NETCONF session closed");
        Ok(())
    }
}
