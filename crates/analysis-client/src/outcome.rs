//! Analysis outcomes and response classification

use serde::Deserialize;
use std::fmt;

/// Why an exchange failed below the application level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// No response (connect failure, timeout, broken body)
    NetworkFailure,
    /// Response with a non-200 status
    HttpStatus(u16),
    /// 200 response whose body is not a valid analysis result
    DecodeFailure,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::NetworkFailure => write!(f, "network failure"),
            TransportErrorKind::HttpStatus(code) => write!(f, "HTTP {}", code),
            TransportErrorKind::DecodeFailure => write!(f, "decode failure"),
        }
    }
}

/// Result of one frame exchange
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    /// The service analysed the frame
    Success {
        /// Eye aspect ratio; `None` when the service sent null
        ear: Option<f64>,
        /// Server-maintained count of consecutive closed-eye frames
        frames_closed: u32,
        /// Drowsiness verdict
        alert: bool,
    },
    /// The service reported an error message. `status` is set when the
    /// message arrived on a non-200 response.
    ServerError {
        message: String,
        status: Option<u16>,
    },
    /// The exchange failed before a usable verdict was obtained
    TransportError {
        kind: TransportErrorKind,
        detail: String,
    },
}

impl AnalysisOutcome {
    pub fn is_alert(&self) -> bool {
        matches!(self, AnalysisOutcome::Success { alert: true, .. })
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisOutcome::Success { .. } => "success",
            AnalysisOutcome::ServerError { .. } => "server_error",
            AnalysisOutcome::TransportError { kind, .. } => match kind {
                TransportErrorKind::NetworkFailure => "network_failure",
                TransportErrorKind::HttpStatus(_) => "http_status",
                TransportErrorKind::DecodeFailure => "decode_failure",
            },
        }
    }

    pub(crate) fn transport(kind: TransportErrorKind, detail: impl Into<String>) -> Self {
        AnalysisOutcome::TransportError {
            kind,
            detail: detail.into(),
        }
    }
}

/// Response body of the frame-processing endpoint
#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    ear: Option<f64>,
    #[serde(default)]
    frames_closed: Option<u32>,
    #[serde(default)]
    alert: Option<bool>,
    #[serde(default)]
    error: Option<String>,
}

/// Body of a failed request, read only for its message
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// Classify a complete HTTP response.
///
/// Any status other than 200 is a failure; its body is only mined for an
/// `error` message. A 200 body must carry `alert` and `frames_closed` with the
/// right types unless it reports an `error`.
pub fn interpret_response(status: u16, reason: &str, body: &[u8]) -> AnalysisOutcome {
    if status != 200 {
        if let Ok(ErrorBody {
            error: Some(message),
        }) = serde_json::from_slice::<ErrorBody>(body)
        {
            return AnalysisOutcome::ServerError {
                message,
                status: Some(status),
            };
        }
        return AnalysisOutcome::transport(
            TransportErrorKind::HttpStatus(status),
            format!("HTTP {}: {}", status, reason),
        );
    }

    let response: AnalysisResponse = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            return AnalysisOutcome::transport(
                TransportErrorKind::DecodeFailure,
                format!("invalid response body: {}", e),
            )
        }
    };

    if let Some(message) = response.error {
        return AnalysisOutcome::ServerError {
            message,
            status: None,
        };
    }

    match (response.frames_closed, response.alert) {
        (Some(frames_closed), Some(alert)) => AnalysisOutcome::Success {
            ear: response.ear,
            frames_closed,
            alert,
        },
        (None, _) => AnalysisOutcome::transport(
            TransportErrorKind::DecodeFailure,
            "response is missing frames_closed",
        ),
        (_, None) => AnalysisOutcome::transport(
            TransportErrorKind::DecodeFailure,
            "response is missing alert",
        ),
    }
}
