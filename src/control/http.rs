//! Agones SDK sidecar client over HTTP.
//!
//! The sidecar exposes `POST /ready` and `POST /health`, both taking an empty
//! JSON object. Calls are made exactly once; there is no retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{ClientError, ControlPlaneClient};

/// Port the SDK sidecar listens on when the environment does not say otherwise.
pub const DEFAULT_SDK_HTTP_PORT: u16 = 9358;

/// Environment variable carrying the sidecar's HTTP port.
pub const SDK_HTTP_PORT_ENV: &str = "AGONES_SDK_HTTP_PORT";

/// Overall request timeout for control plane calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection timeout for control plane calls.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Control plane client for the Agones SDK sidecar REST API.
#[derive(Debug, Clone)]
pub struct HttpSdkClient {
    client: Client,
    base_url: Url,
}

impl HttpSdkClient {
    /// Create a client for the sidecar at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Build` if the URL is invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| ClientError::Build(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Build(format!("{base_url}: not a base URL")));
        }
        // `Url::join` replaces the last segment unless the path ends in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Create a client for the local sidecar, honouring `AGONES_SDK_HTTP_PORT`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Build` if the HTTP client cannot be constructed.
    pub fn from_env(timeout: Duration) -> Result<Self, ClientError> {
        Self::new(&default_base_url(), timeout)
    }

    /// The base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post(&self, endpoint: &str) -> Result<(), ClientError> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| ClientError::Build(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout
                } else {
                    ClientError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::trace!(endpoint, "Control plane call accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ControlPlaneClient for HttpSdkClient {
    async fn report_ready(&self) -> Result<(), ClientError> {
        self.post("ready").await
    }

    async fn report_healthy(&self) -> Result<(), ClientError> {
        self.post("health").await
    }
}

/// The sidecar URL derived from `AGONES_SDK_HTTP_PORT`, falling back to 9358.
#[must_use]
pub fn default_base_url() -> String {
    let port = std::env::var(SDK_HTTP_PORT_ENV)
        .ok()
        .and_then(|p| p.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_SDK_HTTP_PORT);
    format!("http://localhost:{port}")
}
