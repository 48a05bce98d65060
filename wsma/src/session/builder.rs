//! Builder for creating sessions.

use std::path::PathBuf;
use std::time::Duration;

use super::Session;
use crate::error::{Result, SessionError};
use crate::response::ParsePolicy;
use crate::transport::config::{
    Credentials, DEFAULT_PATH, DEFAULT_TIMEOUT, HostKeyVerification, HttpConfig, SshConfig,
    TransportKind,
};
use crate::transport::{HttpTransport, SshTransport, WsmaTransport};

/// Builder for constructing sessions.
///
/// # Example
///
/// ```rust,no_run
/// use wsma::{SessionBuilder, TransportKind};
///
/// # async fn example() -> Result<(), wsma::Error> {
/// let mut session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .transport(TransportKind::Ssh)
///     .build()?;
///
/// session.open().await?;
/// let outcome = session.exec("show version", None).await?;
/// println!("{}", outcome.output);
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: Option<u16>,
    username: Option<String>,
    password: String,
    kind: TransportKind,
    verify: bool,
    timeout: Duration,
    path: String,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    parse_policy: ParsePolicy,
}

impl SessionBuilder {
    /// Create a new session builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: None,
            password: String::new(),
            kind: TransportKind::default(),
            verify: true,
            timeout: DEFAULT_TIMEOUT,
            path: DEFAULT_PATH.to_string(),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            parse_policy: ParsePolicy::default(),
        }
    }

    /// Set the agent port (default depends on the transport).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Choose the transport (default: HTTPS).
    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.kind = kind;
        self
    }

    /// Verify the server certificate (HTTPS only, default: true).
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Set the HTTP deadline, SSH connect deadline and exec `maxWait`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the HTTP path of the agent (default: `/wsma`).
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the SSH host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file for SSH.
    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Set the policy for responses without a `response` element.
    pub fn parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.parse_policy = policy;
        self
    }

    /// Build the session.
    ///
    /// This creates the session but does not connect. Call `open()` (or
    /// `scoped()`) on the returned session to establish the connection.
    pub fn build(self) -> Result<Session<WsmaTransport>> {
        if self.host.trim().is_empty() {
            return Err(SessionError::InvalidConfig {
                message: "host may not be empty".to_string(),
            }
            .into());
        }

        let username = self.username.ok_or_else(|| SessionError::InvalidConfig {
            message: "Username is required".to_string(),
        })?;

        let port = self.port.unwrap_or_else(|| self.kind.default_port());
        let credentials = Credentials::new(self.host, port, username.clone(), self.password.clone())
            .with_tls(self.kind == TransportKind::Https);

        let transport = match self.kind {
            TransportKind::Http | TransportKind::Https => {
                let mut config = HttpConfig::new(credentials);
                config.verify = self.verify;
                config.timeout = self.timeout;
                config.path = self.path;
                WsmaTransport::from(HttpTransport::new(config))
            }
            TransportKind::Ssh => {
                let mut config = SshConfig::new(credentials);
                config.timeout = self.timeout;
                config.host_key_verification = self.host_key_verification;
                config.known_hosts_path = self.known_hosts_path;
                WsmaTransport::from(SshTransport::new(config))
            }
        };

        Ok(Session::new(transport, username, self.password)
            .with_timeout(self.timeout)
            .with_parse_policy(self.parse_policy))
    }
}
