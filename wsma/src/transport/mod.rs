//! Transport layer: how request documents reach the agent.
//!
//! Both variants implement [`Transport`]. A transport only moves bytes; the
//! session decides when to connect, what to send and how to interpret the
//! answer.

pub mod config;
mod http;
mod ssh;

use std::future::Future;

pub use config::{
    Credentials, HostKeyVerification, HttpConfig, SshConfig, TransportKind, DEFAULT_TIMEOUT,
};
pub use http::HttpTransport;
pub use ssh::SshTransport;

use crate::error::Result;

/// Channel to a WSMA agent.
///
/// One request is outstanding at a time; `&mut self` on every operation
/// keeps a transport from being shared between concurrent callers.
pub trait Transport: Send {
    /// Establish the channel and run the transport's ready handshake.
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Release the channel. Safe to call when never or partially connected.
    fn disconnect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send one request document and return the raw response document.
    fn exchange(&mut self, request: &str) -> impl Future<Output = Result<String>> + Send;

    /// Whether `connect()` has completed and `disconnect()` has not.
    fn is_connected(&self) -> bool;

    /// Human readable endpoint, for log lines.
    fn endpoint(&self) -> String;
}

/// Transport picked at runtime by the session builder.
pub enum WsmaTransport {
    Http(HttpTransport),
    Ssh(SshTransport),
}

impl Transport for WsmaTransport {
    async fn connect(&mut self) -> Result<()> {
        match self {
            Self::Http(t) => t.connect().await,
            Self::Ssh(t) => t.connect().await,
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        match self {
            Self::Http(t) => t.disconnect().await,
            Self::Ssh(t) => t.disconnect().await,
        }
    }

    async fn exchange(&mut self, request: &str) -> Result<String> {
        match self {
            Self::Http(t) => t.exchange(request).await,
            Self::Ssh(t) => t.exchange(request).await,
        }
    }

    fn is_connected(&self) -> bool {
        match self {
            Self::Http(t) => t.is_connected(),
            Self::Ssh(t) => t.is_connected(),
        }
    }

    fn endpoint(&self) -> String {
        match self {
            Self::Http(t) => t.endpoint(),
            Self::Ssh(t) => t.endpoint(),
        }
    }
}

impl From<HttpTransport> for WsmaTransport {
    fn from(transport: HttpTransport) -> Self {
        Self::Http(transport)
    }
}

impl From<SshTransport> for WsmaTransport {
    fn from(transport: SshTransport) -> Self {
        Self::Ssh(transport)
    }
}
