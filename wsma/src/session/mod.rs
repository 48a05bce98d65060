//! Session facade: the operations callers use.
//!
//! A [`Session`] owns one transport, the request correlator and the latest
//! [`Outcome`]. Its lifecycle is
//!
//! ```text
//! Disconnected --connect--> Connected --probe ok--> Ready --disconnect--> Disconnected
//!                               |                     |
//!                               +----- error ---------+--> Failed
//! ```
//!
//! Requests are only accepted in `Ready`. Exchange failures do not surface as
//! `Err`; they land in the outcome with `success == false`, so callers check
//! `success` after every call.

mod builder;

pub use builder::SessionBuilder;

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use log::{debug, error, info, warn};
use secrecy::{ExposeSecret, SecretString};

use crate::error::{Result, SessionError};
use crate::request::{ActionOnFail, Correlator, RequestTemplate};
use crate::response::{Outcome, ParsePolicy, ParsedResponse, classify, parse_with};
use crate::transport::{DEFAULT_TIMEOUT, Transport, WsmaTransport};

/// Exec command used to check that the agent answers after connect.
pub const PROBE_COMMAND: &str = "show wsma id";

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected,
    Ready,
    Failed,
}

/// A WSMA session over one transport.
///
/// # Example
///
/// ```rust,no_run
/// use wsma::SessionBuilder;
///
/// # async fn example() -> Result<(), wsma::Error> {
/// let session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .build()?;
///
/// let output = session
///     .scoped(|s| {
///         Box::pin(async move {
///             let outcome = s.exec("show clock", None).await?;
///             Ok::<_, wsma::Error>(outcome.output.clone())
///         })
///     })
///     .await??;
/// println!("{output}");
/// # Ok(())
/// # }
/// ```
pub struct Session<T: Transport = WsmaTransport> {
    transport: T,
    username: String,
    password: SecretString,
    timeout: Duration,
    policy: ParsePolicy,
    correlator: Correlator,
    state: SessionState,
    outcome: Outcome,
}

impl<T: Transport> Session<T> {
    /// Create a disconnected session.
    pub fn new(transport: T, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            transport,
            username: username.into(),
            password: SecretString::from(password.into()),
            timeout: DEFAULT_TIMEOUT,
            policy: ParsePolicy::default(),
            correlator: Correlator::new(),
            state: SessionState::Disconnected,
            outcome: Outcome::default(),
        }
    }

    /// Set the exec `maxWait`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the policy for responses without a `response` element.
    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Connect the transport. Does not probe.
    ///
    /// On failure the error is also recorded in the outcome and the session
    /// moves to `Failed`.
    pub async fn connect(&mut self) -> Result<()> {
        if matches!(self.state, SessionState::Connected | SessionState::Ready) {
            return Ok(());
        }

        match self.transport.connect().await {
            Ok(()) => {
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => {
                error!("connect to {} failed: {}", self.transport.endpoint(), e);
                self.outcome = Outcome::from_error(&e);
                self.state = SessionState::Failed;
                if let Err(cleanup) = self.transport.disconnect().await {
                    debug!("cleanup after failed connect: {}", cleanup);
                }
                Err(e)
            }
        }
    }

    /// Connect and run the liveness probe.
    ///
    /// On success the session is `Ready`. Otherwise the transport is released,
    /// the session is `Failed` and the error says why.
    pub async fn open(&mut self) -> Result<()> {
        self.connect().await?;

        if self.probe().await {
            self.state = SessionState::Ready;
            info!("session to {} ready", self.transport.endpoint());
            return Ok(());
        }

        let message = self.outcome.output.clone();
        error!("liveness probe failed: {}", message);
        if let Err(e) = self.disconnect().await {
            debug!("cleanup after failed probe: {}", e);
        }
        self.state = SessionState::Failed;
        Err(SessionError::ProbeFailed { message }.into())
    }

    /// Release the transport.
    pub async fn disconnect(&mut self) -> Result<()> {
        let result = self.transport.disconnect().await;
        self.state = SessionState::Disconnected;
        result
    }

    /// Alias for [`disconnect`](Self::disconnect).
    pub async fn close(&mut self) -> Result<()> {
        self.disconnect().await
    }

    /// Open, hand the session to `f`, and disconnect on every way out of `f`
    /// (including a panic, which is resumed after cleanup).
    ///
    /// Returns `Err` without calling `f` when the session cannot be opened.
    pub async fn scoped<F, R>(mut self, f: F) -> Result<R>
    where
        F: for<'s> FnOnce(&'s mut Session<T>) -> BoxFuture<'s, R>,
    {
        self.open().await?;

        let result = AssertUnwindSafe(f(&mut self)).catch_unwind().await;

        if let Err(e) = self.disconnect().await {
            warn!("disconnect from {} failed: {}", self.transport.endpoint(), e);
        }

        match result {
            Ok(value) => Ok(value),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Run a command in exec mode.
    ///
    /// With a `format` spec the device also returns structured data, see
    /// [`Outcome::format_result`].
    pub async fn exec(&mut self, command: &str, format: Option<&str>) -> Result<&Outcome> {
        self.ensure_ready()?;
        let template = RequestTemplate::Exec {
            command,
            format,
            timeout: self.timeout,
        };
        Ok(self.request(template).await)
    }

    /// Apply a block of configuration lines.
    pub async fn config(&mut self, text: &str, action_on_fail: ActionOnFail) -> Result<&Outcome> {
        self.ensure_ready()?;
        let template = RequestTemplate::Config {
            text,
            action_on_fail,
        };
        Ok(self.request(template).await)
    }

    /// Make the running configuration persistent.
    pub async fn config_persist(&mut self) -> Result<&Outcome> {
        self.ensure_ready()?;
        Ok(self.request(RequestTemplate::ConfigPersist).await)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Outcome of the latest request.
    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    /// Whether the latest request succeeded.
    pub fn success(&self) -> bool {
        self.outcome.success
    }

    /// Output of the latest request.
    pub fn output(&self) -> &str {
        &self.outcome.output
    }

    /// Parsed response of the latest request.
    pub fn data(&self) -> Option<&ParsedResponse> {
        self.outcome.data.as_ref()
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Number of requests issued over the life of this session.
    pub fn request_count(&self) -> u64 {
        self.correlator.count()
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state != SessionState::Ready {
            return Err(SessionError::NotReady { state: self.state }.into());
        }
        Ok(())
    }

    async fn probe(&mut self) -> bool {
        let template = RequestTemplate::Exec {
            command: PROBE_COMMAND,
            format: None,
            timeout: self.timeout,
        };
        self.request(template).await.success
    }

    /// Exchange one request and replace the current outcome.
    async fn request(&mut self, template: RequestTemplate<'_>) -> &Outcome {
        let correlator = self.correlator.next(&template.correlator_seed());
        debug!("request {} ({})", correlator, template.namespace());

        let xml = template.render(&correlator, &self.username, self.password.expose_secret());

        self.outcome = match self.transport.exchange(&xml).await {
            Ok(raw) => classify(parse_with(&raw, self.policy)),
            Err(e) => {
                error!("exchange with {} failed: {}", self.transport.endpoint(), e);
                self.state = SessionState::Failed;
                Outcome::from_error(&e)
            }
        };

        if let Some(data) = &self.outcome.data {
            match serde_json::to_string_pretty(data) {
                Ok(json) => debug!("JSON data: {}", json),
                Err(e) => debug!("response not serializable: {}", e),
            }
        }
        if !self.outcome.success {
            info!("{} failed: {}", correlator, self.outcome.output);
        }

        &self.outcome
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        if self.transport.is_connected() {
            warn!(
                "Session to {} dropped while connected; call close() or use scoped()",
                self.transport.endpoint()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use crate::error::{Error, TransportError};
    use crate::response::FailureKind;

    const OK_EXEC: &str = r#"<response xmlns="urn:cisco:wsma-exec" success="1"><execLog><dialogueLog><received><text>ok</text></received></dialogueLog></execLog></response>"#;

    /// Scripted transport: pops one canned reply per exchange and records requests.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: VecDeque<std::result::Result<String, String>>,
        sent: Arc<Mutex<Vec<String>>>,
        connected: bool,
        fail_connect: bool,
        disconnects: Arc<Mutex<usize>>,
    }

    impl ScriptedTransport {
        fn with_replies(replies: &[std::result::Result<&str, &str>]) -> Self {
            Self {
                replies: replies
                    .iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl Transport for ScriptedTransport {
        async fn connect(&mut self) -> Result<()> {
            if self.fail_connect {
                return Err(TransportError::AuthenticationFailed {
                    user: "admin".to_string(),
                }
                .into());
            }
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<()> {
            self.connected = false;
            *self.disconnects.lock().unwrap() += 1;
            Ok(())
        }

        async fn exchange(&mut self, request: &str) -> Result<String> {
            self.sent.lock().unwrap().push(request.to_string());
            match self.replies.pop_front() {
                Some(Ok(reply)) => Ok(reply),
                Some(Err(message)) => Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    message,
                ))
                .into()),
                None => Ok(String::new()),
            }
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn endpoint(&self) -> String {
            "scripted://device".to_string()
        }
    }

    fn session(transport: ScriptedTransport) -> Session<ScriptedTransport> {
        Session::new(transport, "admin", "secret")
    }

    #[tokio::test]
    async fn test_open_probes_and_becomes_ready() {
        let transport = ScriptedTransport::with_replies(&[Ok(OK_EXEC)]);
        let sent = transport.sent.clone();
        let mut session = session(transport);

        session.open().await.unwrap();
        assert_eq!(session.state(), SessionState::Ready);

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("<cmd>show wsma id</cmd>"));
        drop(sent);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_probe_yields_no_session() {
        let failure = r#"<response xmlns="urn:cisco:wsma-exec" success="0"><execLog><errorInfo><errorMessage>denied</errorMessage></errorInfo></execLog></response>"#;
        let transport = ScriptedTransport::with_replies(&[Ok(failure)]);
        let disconnects = transport.disconnects.clone();
        let mut session = session(transport);

        let err = session.open().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::ProbeFailed { ref message }) if message == "denied"
        ));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(!session.transport().is_connected());
        assert_eq!(*disconnects.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_connect_error_is_recorded() {
        let transport = ScriptedTransport {
            fail_connect: true,
            ..Default::default()
        };
        let mut session = session(transport);

        assert!(session.open().await.is_err());
        assert_eq!(session.state(), SessionState::Failed);
        assert!(!session.success());
        assert!(session.output().contains("Authentication failed"));
        assert_eq!(session.outcome().failure, Some(FailureKind::Transport));
    }

    #[tokio::test]
    async fn test_requests_outside_ready_are_rejected() {
        let mut session = session(ScriptedTransport::default());
        let err = session.exec("show clock", None).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Session(SessionError::NotReady {
                state: SessionState::Disconnected
            })
        ));
        assert!(session.config_persist().await.is_err());
    }

    #[tokio::test]
    async fn test_latest_outcome_supersedes_previous() {
        let failure = r#"<response xmlns="urn:cisco:wsma-exec" success="0"><execLog><errorInfo><errorMessage>% Invalid input</errorMessage></errorInfo></execLog></response>"#;
        let transport = ScriptedTransport::with_replies(&[Ok(OK_EXEC), Ok(OK_EXEC), Ok(failure)]);
        let mut session = session(transport);
        session.open().await.unwrap();

        assert!(session.exec("show clock", None).await.unwrap().success);
        assert_eq!(session.output(), "ok");

        let outcome = session.exec("show ip intbr", None).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(session.output(), "% Invalid input");
        assert_eq!(session.state(), SessionState::Ready);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_correlators_are_distinct() {
        let config_ok = r#"<response xmlns="urn:cisco:wsma-config" success="1"/>"#;
        let transport =
            ScriptedTransport::with_replies(&[Ok(OK_EXEC), Ok(config_ok), Ok(config_ok)]);
        let sent = transport.sent.clone();
        let mut session = session(transport);
        session.open().await.unwrap();

        session
            .config("hostname r1", ActionOnFail::Stop)
            .await
            .unwrap();
        session
            .config("hostname r1", ActionOnFail::Stop)
            .await
            .unwrap();
        assert_eq!(session.request_count(), 3);

        let correlators: Vec<String> = sent
            .lock()
            .unwrap()
            .iter()
            .map(|xml| {
                let start = xml.find("correlator=\"").unwrap() + "correlator=\"".len();
                let end = xml[start..].find('"').unwrap();
                xml[start..start + end].to_string()
            })
            .collect();
        assert_ne!(correlators[1], correlators[2]);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_exchange_error_fails_session() {
        let transport = ScriptedTransport::with_replies(&[Ok(OK_EXEC), Err("link down")]);
        let mut session = session(transport);
        session.open().await.unwrap();

        let outcome = session.exec("show clock", None).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.output.contains("link down"));
        assert_eq!(session.state(), SessionState::Failed);
        assert!(session.exec("show clock", None).await.is_err());
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_truncated_response_is_parse_failure() {
        let transport =
            ScriptedTransport::with_replies(&[Ok(OK_EXEC), Ok("<response success=\"1\"><exec")]);
        let mut session = session(transport);
        session.open().await.unwrap();

        let outcome = session.exec("show clock", None).await.unwrap();
        assert!(!outcome.success);
        assert!(matches!(outcome.failure, Some(FailureKind::Parse(_))));
        assert_eq!(session.state(), SessionState::Ready);
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_scoped_disconnects_after_body() {
        let transport = ScriptedTransport::with_replies(&[Ok(OK_EXEC), Ok(OK_EXEC)]);
        let disconnects = transport.disconnects.clone();
        let session = session(transport);

        let output = session
            .scoped(|s| {
                Box::pin(async move {
                    s.exec("show clock", None)
                        .await
                        .map(|outcome| outcome.output.clone())
                })
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(output, "ok");
        assert_eq!(*disconnects.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_scoped_disconnects_on_panic() {
        let transport = ScriptedTransport::with_replies(&[Ok(OK_EXEC)]);
        let disconnects = transport.disconnects.clone();
        let session = session(transport);

        let handle = tokio::spawn(session.scoped(|_s| {
            Box::pin(async move {
                panic!("caller bug");
            })
        }));

        assert!(handle.await.unwrap_err().is_panic());
        assert_eq!(*disconnects.lock().unwrap(), 1);
    }
}
