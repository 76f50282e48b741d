//! Drowsiness Monitoring Session
//!
//! Drives one monitoring session at a time:
//! - Camera acquisition and release
//! - Fixed-interval frame sampling with at most one exchange in flight
//! - Verdict reporting and audible alert on drowsiness
//! - Automatic teardown when the camera stream dies

pub mod config;
pub mod controller;
pub mod pipeline;
pub mod scheduler;
pub mod state;
pub mod status;

pub use config::{ConfigError, MonitorConfig, SessionConfig};
pub use controller::{SessionComponents, SessionController};
pub use pipeline::{SamplePipeline, TickOutcome};
pub use scheduler::{InFlightGuard, InFlightToken, SampleScheduler, SchedulerStats};
pub use state::SessionState;
pub use status::{StatusBoard, StatusEvent, StatusSink, TracingStatusSink};

use analysis_client::AnalysisError;
use camera_capture::CameraError;
use thiserror::Error;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera access failed: {0}")]
    Permission(CameraError),

    #[error("Session already {0}")]
    AlreadyRunning(SessionState),

    #[error("Start cancelled by stop request")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Analysis client setup failed: {0}")]
    Client(#[from] AnalysisError),
}
