//! # wsma
//!
//! Async client for the Web Services Management Agent (WSMA) of network
//! devices.
//!
//! WSMA wraps CLI commands and configuration blocks in SOAP documents and
//! carries them over HTTP(S) or an SSH subsystem. This crate builds those
//! documents, moves them over either transport, and reduces each reply to a
//! uniform [`Outcome`].
//!
//! ## Features
//!
//! - Async HTTP(S) transport via reqwest, SSH subsystem transport via russh
//! - `]]>]]>` message framing with the agent's `wsma-hello` greeting
//! - Exec, config (with stop / continue / rollback) and config persist
//! - Responses parsed into an ordered JSON tree for structured output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsma::{ActionOnFail, SessionBuilder, TransportKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wsma::Error> {
//!     let mut session = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .transport(TransportKind::Https)
//!         .build()?;
//!
//!     session.open().await?;
//!
//!     let outcome = session.exec("show clock", None).await?;
//!     println!("{}", outcome.output);
//!
//!     let outcome = session
//!         .config("hostname r1", ActionOnFail::Rollback)
//!         .await?;
//!     if !outcome.success {
//!         eprintln!("config failed: {}", outcome.output);
//!     }
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod error;
pub mod request;
pub mod response;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use request::ActionOnFail;
pub use request::bootstrap::ListenerTransport;
pub use response::{FailureKind, Outcome, ParsePolicy, ParsedResponse};
pub use session::{Session, SessionBuilder, SessionState};
pub use transport::{
    Credentials, HostKeyVerification, HttpConfig, HttpTransport, SshConfig, SshTransport,
    Transport, TransportKind, WsmaTransport,
};
