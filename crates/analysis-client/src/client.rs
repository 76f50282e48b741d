//! HTTP exchange with the analysis service

use async_trait::async_trait;
use reqwest::header::HeaderName;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::codec::{EncodedPayload, FrameSample};
use crate::outcome::{interpret_response, AnalysisOutcome, TransportErrorKind};
use crate::token::TokenSource;
use crate::{AnalysisConfig, AnalysisError};

/// Anything that can turn a frame sample into a verdict
#[async_trait]
pub trait FrameAnalyzer: Send + Sync {
    async fn analyze(&self, sample: &FrameSample) -> AnalysisOutcome;
}

/// Client for the frame-processing endpoint. One request per call, no retries.
pub struct AnalysisClient {
    config: AnalysisConfig,
    csrf_header: HeaderName,
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl AnalysisClient {
    /// Create a client from configuration, taking tokens from `tokens`
    pub fn new(config: AnalysisConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, AnalysisError> {
        if config.endpoint.trim().is_empty() {
            return Err(AnalysisError::Config("endpoint is empty".into()));
        }
        if config.timeout_ms == 0 {
            return Err(AnalysisError::Config("timeout_ms must be positive".into()));
        }

        let csrf_header = HeaderName::from_bytes(config.csrf_header.as_bytes())
            .map_err(|e| AnalysisError::Config(format!("csrf_header: {}", e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AnalysisError::Client(e.to_string()))?;

        Ok(Self {
            config,
            csrf_header,
            http,
            tokens,
        })
    }

    /// Create a client whose token source comes from the configuration itself
    pub fn from_config(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        let tokens = config.token_source();
        Self::new(config, tokens)
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Send one encoded frame and classify whatever comes back.
    pub async fn submit(&self, payload: &EncodedPayload, auth_token: Option<&str>) -> AnalysisOutcome {
        let mut request = self
            .http
            .post(&self.config.endpoint)
            .form(&[("image_data", payload.as_str())]);
        if let Some(token) = auth_token {
            request = request.header(self.csrf_header.clone(), token);
        }

        debug!("Submitting frame ({} bytes)", payload.len());
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                let detail = if e.is_timeout() {
                    format!("request timed out after {}ms", self.config.timeout_ms)
                } else if e.is_connect() {
                    format!("analysis service unreachable: {}", e)
                } else {
                    format!("request failed: {}", e)
                };
                warn!("{}", detail);
                return AnalysisOutcome::transport(TransportErrorKind::NetworkFailure, detail);
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to read response body: {}", e);
                return AnalysisOutcome::transport(
                    TransportErrorKind::NetworkFailure,
                    format!("failed to read response body: {}", e),
                );
            }
        };

        interpret_response(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status"),
            &body,
        )
    }
}

#[async_trait]
impl FrameAnalyzer for AnalysisClient {
    async fn analyze(&self, sample: &FrameSample) -> AnalysisOutcome {
        let token = self.tokens.token();
        self.submit(&sample.payload, token.as_deref()).await
    }
}
