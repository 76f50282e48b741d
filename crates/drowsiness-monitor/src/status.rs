//! Status events and sinks

use analysis_client::TransportErrorKind;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Observable session events, in the order the controller emits them
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Nothing running; waiting for a start request
    Ready,
    /// Camera access requested
    Acquiring,
    /// Camera access refused or device unavailable
    PermissionDenied { detail: String },
    /// Camera stream acquired
    CameraReady,
    /// Sampling clock running
    Started { session_id: Uuid },
    /// Latest verdict: awake
    Monitoring { ear: Option<f64>, frames_closed: u32 },
    /// Latest verdict: drowsy
    Alert { frames_closed: u32 },
    /// The service reported an error
    ServerError { message: String },
    /// The exchange failed
    TransportError {
        kind: TransportErrorKind,
        detail: String,
    },
    /// A frame could not be grabbed from a live stream
    CaptureFailed { detail: String },
    /// A frame was grabbed but could not be encoded
    FrameSkipped { reason: String },
    /// The camera stream died
    StreamLost,
    /// Session torn down
    Stopped,
}

impl StatusEvent {
    pub fn is_alert(&self) -> bool {
        matches!(self, StatusEvent::Alert { .. })
    }

    /// Failure events that leave the session running
    pub fn is_recoverable_error(&self) -> bool {
        matches!(
            self,
            StatusEvent::ServerError { .. }
                | StatusEvent::TransportError { .. }
                | StatusEvent::CaptureFailed { .. }
                | StatusEvent::FrameSkipped { .. }
        )
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusEvent::Ready => write!(f, "Press start to access the camera."),
            StatusEvent::Acquiring => write!(f, "Requesting camera access..."),
            StatusEvent::PermissionDenied { detail } => write!(
                f,
                "Could not access the camera. Check permissions. ({})",
                detail
            ),
            StatusEvent::CameraReady => write!(f, "Camera ready."),
            StatusEvent::Started { .. } => write!(f, "Starting monitoring..."),
            StatusEvent::Monitoring { ear, frames_closed } => {
                let ear = match ear {
                    Some(v) if *v >= 0.0 => format!("{:.2}", v),
                    _ => "N/A".to_string(),
                };
                write!(f, "Monitoring... EAR: {}, Closed frames: {}", ear, frames_closed)
            }
            StatusEvent::Alert { .. } => write!(f, "DROWSINESS ALERT!"),
            StatusEvent::ServerError { message } => write!(f, "Server error: {}", message),
            StatusEvent::TransportError { detail, .. } => {
                write!(f, "Communication error: {}", detail)
            }
            StatusEvent::CaptureFailed { detail } => write!(f, "Error capturing frame: {}", detail),
            StatusEvent::FrameSkipped { reason } => write!(f, "Frame skipped: {}", reason),
            StatusEvent::StreamLost => write!(f, "Error: camera is not active."),
            StatusEvent::Stopped => write!(f, "Monitoring stopped. Press start to begin."),
        }
    }
}

/// Receives status events. Implementations must not block.
pub trait StatusSink: Send + Sync {
    fn publish(&self, event: &StatusEvent);
}

/// Writes every status event to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn publish(&self, event: &StatusEvent) {
        match event {
            StatusEvent::Alert { frames_closed } => {
                warn!(frames_closed, "{}", event)
            }
            StatusEvent::PermissionDenied { .. } | StatusEvent::StreamLost => warn!("{}", event),
            e if e.is_recoverable_error() => warn!("{}", event),
            _ => info!("{}", event),
        }
    }
}

/// Keeps the most recent event, like a status text region
#[derive(Debug, Default)]
pub struct StatusBoard {
    latest: Mutex<Option<StatusEvent>>,
    published: AtomicU64,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latest(&self) -> Option<StatusEvent> {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Rendered text of the latest event
    pub fn text(&self) -> String {
        self.latest()
            .unwrap_or(StatusEvent::Ready)
            .to_string()
    }

    /// Number of events received
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }
}

impl StatusSink for StatusBoard {
    fn publish(&self, event: &StatusEvent) {
        *self
            .latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(event.clone());
        self.published.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitoring_text() {
        let event = StatusEvent::Monitoring {
            ear: Some(0.2549),
            frames_closed: 3,
        };
        assert_eq!(event.to_string(), "Monitoring... EAR: 0.25, Closed frames: 3");
    }

    #[test]
    fn test_missing_or_sentinel_ear() {
        for ear in [None, Some(-1.0)] {
            let event = StatusEvent::Monitoring {
                ear,
                frames_closed: 0,
            };
            assert_eq!(event.to_string(), "Monitoring... EAR: N/A, Closed frames: 0");
        }
    }

    #[test]
    fn test_board_keeps_latest() {
        let board = StatusBoard::new();
        assert_eq!(board.text(), StatusEvent::Ready.to_string());

        board.publish(&StatusEvent::Alert { frames_closed: 20 });
        assert_eq!(board.text(), "DROWSINESS ALERT!");
        board.publish(&StatusEvent::ServerError {
            message: "model unavailable".into(),
        });
        assert_eq!(board.text(), "Server error: model unavailable");
        assert_eq!(board.published(), 2);
    }

    #[test]
    fn test_error_classes() {
        assert!(StatusEvent::FrameSkipped { reason: "x".into() }.is_recoverable_error());
        assert!(!StatusEvent::StreamLost.is_recoverable_error());
        assert!(StatusEvent::Alert { frames_closed: 1 }.is_alert());
    }
}
