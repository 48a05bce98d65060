//! HTTP(S) transport: one POST per request.

use std::sync::Once;

use log::{debug, info, warn};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use super::Transport;
use super::config::HttpConfig;
use crate::error::{Result, TransportError};

static INSECURE_WARNING: Once = Once::new();

/// Announce, once per process, that certificate verification is off.
fn warn_insecure_once(url: &str) {
    INSECURE_WARNING.call_once(|| {
        warn!(
            "TLS certificate verification disabled (first for {}); further warnings suppressed",
            url
        );
    });
}

/// HTTP(S) transport holding a persistent client.
pub struct HttpTransport {
    config: HttpConfig,
    url: String,
    client: Option<Client>,
}

impl HttpTransport {
    /// Create a disconnected transport.
    pub fn new(config: HttpConfig) -> Self {
        let url = config.url();
        Self {
            config,
            url,
            client: None,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}

impl Transport for HttpTransport {
    async fn connect(&mut self) -> Result<()> {
        info!(
            "connect to {} as {}",
            self.url, self.config.credentials.username
        );

        let insecure = !self.config.verifies_certificates();
        if insecure && self.config.credentials.tls {
            warn_insecure_once(&self.url);
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(insecure)
            .timeout(self.config.timeout)
            .build()
            .map_err(TransportError::Http)?;

        self.client = Some(client);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.client.take().is_some() {
            info!("disconnect from {}", self.url);
        }
        Ok(())
    }

    async fn exchange(&mut self, request: &str) -> Result<String> {
        let client = self.client.as_ref().ok_or(TransportError::NotConnected)?;
        let creds = &self.config.credentials;

        debug!("sending {} bytes", request.len());
        let response = client
            .post(&self.url)
            .basic_auth(&creds.username, Some(creds.password()))
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(request.to_owned())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.config.timeout)
                } else {
                    TransportError::Http(e)
                }
            })?;

        let status = response.status();
        info!("status {}", status);

        let bytes = response.bytes().await.map_err(TransportError::Http)?;
        let body = String::from_utf8_lossy(&bytes).into_owned();
        debug!("DATA: {}", body);

        if !status.is_success() {
            return Err(TransportError::Status { status, body }.into());
        }

        Ok(body)
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn endpoint(&self) -> String {
        self.url.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::config::Credentials;

    #[tokio::test]
    async fn test_exchange_requires_connect() {
        let creds = Credentials::new("127.0.0.1", 1, "u", "p").with_tls(false);
        let mut transport = HttpTransport::new(HttpConfig::new(creds));
        let err = transport.exchange("<x/>").await.unwrap_err();
        assert!(matches!(err, Error::Transport(TransportError::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let creds = Credentials::new("127.0.0.1", 1, "u", "p");
        let mut transport = HttpTransport::new(HttpConfig::new(creds));
        transport.disconnect().await.unwrap();
        transport.connect().await.unwrap();
        assert!(transport.is_connected());
        transport.disconnect().await.unwrap();
        transport.disconnect().await.unwrap();
        assert!(!transport.is_connected());
    }
}
