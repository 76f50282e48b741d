//! Remote Drowsiness Analysis Client
//!
//! Per-frame exchange with the analysis service:
//! - JPEG / base64 data-URI frame encoding
//! - Form-encoded POST with anti-forgery token header
//! - Typed classification of every response and transport failure

mod client;
pub mod codec;
mod outcome;
pub mod token;

pub use client::{AnalysisClient, FrameAnalyzer};
pub use codec::{CodecError, EncodedPayload, FrameCodec, FrameSample};
pub use outcome::{interpret_response, AnalysisOutcome, TransportErrorKind};
pub use token::{CookieToken, StaticToken, TokenSource};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Client construction errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid client configuration: {0}")]
    Config(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Analysis endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Full URL of the frame-processing endpoint
    pub endpoint: String,
    /// Per-request timeout (milliseconds)
    pub timeout_ms: u64,
    /// Header the anti-forgery token is echoed under
    pub csrf_header: String,
    /// Cookie the anti-forgery token is read from
    pub csrf_cookie: String,
    /// Raw `Cookie` header contents to read the token from
    pub cookies: Option<String>,
    /// Fixed token; takes precedence over `cookies`
    pub token: Option<String>,
    /// JPEG quality for uploaded frames (1-100)
    pub jpeg_quality: u8,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/sleep_monitor/process_frame/".to_string(),
            timeout_ms: 10_000,
            csrf_header: "X-CSRFToken".to_string(),
            csrf_cookie: "csrftoken".to_string(),
            cookies: None,
            token: None,
            jpeg_quality: 92,
        }
    }
}

impl AnalysisConfig {
    /// Token source implied by this configuration
    pub fn token_source(&self) -> Arc<dyn TokenSource> {
        match (&self.token, &self.cookies) {
            (Some(token), _) => Arc::new(StaticToken::new(token.clone())),
            (None, Some(cookies)) => Arc::new(CookieToken::new(cookies.clone(), &self.csrf_cookie)),
            (None, None) => Arc::new(StaticToken::none()),
        }
    }
}
