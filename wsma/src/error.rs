//! Error types for wsma.

use std::io;
use thiserror::Error;

use crate::session::SessionState;

/// Main error type for wsma operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Channel-level errors (socket, TLS, HTTP, SSH, authentication)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Framing or handshake errors on the SSH subsystem channel
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Malformed or structurally unexpected XML
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The device answered with `success="0"`
    #[error("Device failure: {0}")]
    Device(#[from] DeviceFailure),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Transport layer errors (connection, authentication, HTTP status).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key does not match the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is not in known_hosts and strict checking is enabled
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// HTTP client error (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The agent answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Transport used before `connect()`
    #[error("Transport not connected")]
    NotConnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Whether the error is a credential rejection rather than a channel failure.
    pub fn is_auth(&self) -> bool {
        match self {
            Self::AuthenticationFailed { .. } => true,
            Self::Status { status, .. } => {
                *status == reqwest::StatusCode::UNAUTHORIZED
                    || *status == reqwest::StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }
}

/// Framing errors on the SSH subsystem channel.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The agent did not greet after subsystem invocation
    #[error("No wsma-hello greeting from host")]
    MissingHello,

    /// Channel closed before a complete message could be written
    #[error("Channel closed")]
    Closed,

    /// Failed to invoke the subsystem
    #[error("Failed to invoke subsystem '{0}'")]
    SubsystemFailed(String),
}

/// Response parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing to parse
    #[error("XML body is empty")]
    Empty,

    /// The document is not well-formed XML
    #[error("{0}")]
    Malformed(String),

    /// No `response` element and strict policy in effect
    #[error("no response element in document")]
    NoResponse,

    /// Well-formed, but not shaped like an exec or config response
    #[error("unexpected response schema: {0}")]
    Schema(String),
}

/// A well-formed response that reports failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DeviceFailure {
    pub message: String,
}

/// Session lifecycle errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation requires a `Ready` session
    #[error("Session not ready (state: {state:?})")]
    NotReady { state: SessionState },

    /// A request could not be exchanged with the agent
    #[error("Exchange failed: {message}")]
    ExchangeFailed { message: String },

    /// The liveness probe after connect did not succeed
    #[error("Liveness probe failed: {message}")]
    ProbeFailed { message: String },

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type alias using wsma's Error.
pub type Result<T> = std::result::Result<T, Error>;
