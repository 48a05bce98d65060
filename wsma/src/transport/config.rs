//! Connection configuration for both transports.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// Default deadline for HTTP exchanges and the exec `maxWait`.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// URL path of the agent on the HTTP listener.
pub const DEFAULT_PATH: &str = "/wsma";

/// SSH subsystem name of the agent.
pub const SUBSYSTEM: &str = "wsma";

/// Which transport a session uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportKind {
    /// Plain HTTP.
    Http,
    /// HTTP over TLS.
    #[default]
    Https,
    /// SSH subsystem channel.
    Ssh,
}

impl TransportKind {
    /// Port used when none is configured.
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
            Self::Ssh => 22,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Ssh => "ssh",
        })
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            "ssh" => Ok(Self::Ssh),
            other => Err(format!("unknown transport '{other}'")),
        }
    }
}

/// Who to talk to and how to log in. Immutable for the life of a session.
#[derive(Clone)]
pub struct Credentials {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Agent port.
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Password, used both for channel authentication and the SOAP header.
    pub password: SecretString,

    /// Whether the HTTP transport uses TLS.
    pub tls: bool,
}

impl Credentials {
    /// Create credentials for `host:port`.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: SecretString::from(password.into()),
            tls: true,
        }
    }

    /// Set the TLS flag.
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// The password in clear, for the SOAP header and channel login.
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("tls", &self.tls)
            .finish()
    }
}

/// HTTP(S) transport configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub credentials: Credentials,

    /// Verify the server certificate. Ignored without TLS.
    pub verify: bool,

    /// Deadline for one POST.
    pub timeout: Duration,

    /// URL path of the agent.
    pub path: String,
}

impl HttpConfig {
    /// Configuration with defaults for everything but the credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            verify: true,
            timeout: DEFAULT_TIMEOUT,
            path: DEFAULT_PATH.to_string(),
        }
    }

    /// Whether certificates are actually checked.
    pub fn verifies_certificates(&self) -> bool {
        self.credentials.tls && self.verify
    }

    /// Full endpoint URL.
    pub fn url(&self) -> String {
        let scheme = if self.credentials.tls { "https" } else { "http" };
        format!(
            "{}://{}:{}{}",
            scheme, self.credentials.host, self.credentials.port, self.path
        )
    }
}

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. For testing and lab use only.
    Disabled,
}

/// SSH transport configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    pub credentials: Credentials,

    /// Deadline for TCP connect and key exchange.
    pub timeout: Duration,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Configuration with defaults for everything but the credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            timeout: DEFAULT_TIMEOUT,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// `ssh://host:port`, for log lines.
    pub fn url(&self) -> String {
        format!("ssh://{}", self.credentials.socket_addr())
    }
}
