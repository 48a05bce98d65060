//! SSH transport: the agent as a subsystem on a russh channel.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::ChannelStream;

use super::Transport;
use super::config::{HostKeyVerification, SUBSYSTEM, SshConfig};
use crate::channel::FramedChannel;
use crate::error::{ProtocolError, Result, TransportError};

/// SSH transport wrapping a russh client and one subsystem channel.
pub struct SshTransport {
    /// Configuration used for this connection.
    config: SshConfig,

    /// The russh session handle (None when disconnected).
    session: Option<Handle<SshHandler>>,

    /// The framed subsystem channel (None when disconnected).
    channel: Option<FramedChannel<ChannelStream<Msg>>>,
}

impl SshTransport {
    /// Create a disconnected transport.
    pub fn new(config: SshConfig) -> Self {
        Self {
            config,
            session: None,
            channel: None,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// Open the TCP connection and run the SSH handshake.
    async fn open_session(&self) -> Result<Handle<SshHandler>> {
        let creds = &self.config.credentials;

        // The receive loop has no deadline, so idle sessions must not be reaped.
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: creds.host.clone(),
            port: creds.port,
            host_key_verification: self.config.host_key_verification.clone(),
            known_hosts_path: self.config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let session = tokio::time::timeout(
            self.config.timeout,
            client::connect(ssh_config, (creds.host.as_str(), creds.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(self.config.timeout))?
        .map_err(|e| {
            // check_server_key may have stored a more precise reason
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            match (stored, e) {
                (Some(hk_err), _) => hk_err,
                (None, russh::Error::IO(source)) => TransportError::ConnectionFailed {
                    host: creds.host.clone(),
                    port: creds.port,
                    source,
                },
                (None, e) => TransportError::Ssh(e),
            }
        })?;

        Ok(session)
    }

    /// Password authentication.
    async fn authenticate(&self, session: &mut Handle<SshHandler>) -> Result<()> {
        let creds = &self.config.credentials;
        let success = session
            .authenticate_password(&creds.username, creds.password())
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if !success {
            error!("SSH authentication failed for user '{}'", creds.username);
            return Err(TransportError::AuthenticationFailed {
                user: creds.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Open a session channel and invoke the agent subsystem on it.
    async fn open_subsystem(
        &self,
        session: &Handle<SshHandler>,
    ) -> Result<FramedChannel<ChannelStream<Msg>>> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_subsystem(true, SUBSYSTEM)
            .await
            .map_err(|e| {
                debug!("subsystem request failed: {}", e);
                ProtocolError::SubsystemFailed(SUBSYSTEM.to_string())
            })?;

        Ok(FramedChannel::new(channel.into_stream()))
    }
}

impl Transport for SshTransport {
    async fn connect(&mut self) -> Result<()> {
        info!(
            "connect to {} as {}",
            self.config.url(),
            self.config.credentials.username
        );

        let mut session = self.open_session().await?;
        self.authenticate(&mut session).await?;

        let mut channel = self.open_subsystem(&session).await?;
        if let Err(e) = channel.read_hello().await {
            error!("no wsma-hello from {}", self.config.url());
            let _ = session
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await;
            return Err(e);
        }

        self.session = Some(session);
        self.channel = Some(channel);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.shutdown().await {
                debug!("channel shutdown: {}", e);
            }
        }
        if let Some(session) = self.session.take() {
            info!("disconnect from {}", self.config.url());
            session
                .disconnect(russh::Disconnect::ByApplication, "", "en")
                .await
                .map_err(TransportError::Ssh)?;
        }
        Ok(())
    }

    async fn exchange(&mut self, request: &str) -> Result<String> {
        let channel = self.channel.as_mut().ok_or(TransportError::NotConnected)?;

        debug!("sending {} bytes", request.len());
        channel.send(request).await?;

        let response = channel.recv().await?;
        let text = response.as_str().into_owned();
        debug!("DATA: {}", text);
        Ok(text)
    }

    fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    fn endpoint(&self) -> String {
        self.config.url()
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts_path {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, err: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(err);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
