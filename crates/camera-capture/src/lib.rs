//! Camera Capture Library for Drowsiness Monitoring
//!
//! Owns the live camera stream for a monitoring session:
//! - Video-only acquisition with permission / device error reporting
//! - Single-frame grabs with a bounded wait
//! - Idempotent release
//!
//! Devices are pluggable through [`CaptureDevice`]; a synthetic [`MockCamera`]
//! and a directory-backed [`ReplayCamera`] are bundled.

pub mod frame;
pub mod mock;
pub mod replay;
mod resource;

pub use frame::VideoFrame;
pub use mock::MockCamera;
pub use replay::ReplayCamera;
pub use resource::{CaptureHandle, CaptureResource};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Camera error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),

    #[error("Failed to open camera: {0}")]
    Open(String),

    #[error("Camera stream is not active")]
    StreamInactive,

    #[error("Frame grab failed: {0}")]
    Grab(String),

    #[error("Capture timeout after {0}ms")]
    Timeout(u64),

    #[error("Camera not acquired")]
    NotAcquired,

    #[error("Camera already acquired")]
    AlreadyAcquired,
}

impl CameraError {
    /// Whether the error means the stream itself is gone (as opposed to a
    /// single failed grab on a live stream)
    pub fn is_stream_lost(&self) -> bool {
        matches!(self, CameraError::StreamInactive | CameraError::NotAcquired)
    }
}

/// Where frames come from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraSource {
    /// Synthetic test pattern
    #[default]
    Mock,
    /// Still images cycled from a directory
    Replay { dir: PathBuf },
}

impl CameraSource {
    /// Build the capture device for this source
    pub fn device(&self) -> Arc<dyn CaptureDevice> {
        match self {
            CameraSource::Mock => Arc::new(MockCamera::default()),
            CameraSource::Replay { dir } => Arc::new(ReplayCamera::new(dir.clone())),
        }
    }
}

/// Camera configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Frame source
    pub source: CameraSource,
    /// Requested capture width
    pub width: u32,
    /// Requested capture height
    pub height: u32,
    /// Upper bound on a single frame grab (milliseconds)
    pub grab_timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: CameraSource::Mock,
            width: 640,
            height: 480,
            grab_timeout_ms: 1000,
        }
    }
}

/// A camera that can be opened for video-only capture.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request access and start streaming. Denial or device failure yields an
    /// error and no stream.
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn CaptureStream>, CameraError>;
}

/// A live stream returned by [`CaptureDevice::open`].
#[async_trait]
pub trait CaptureStream: Send + Sync {
    /// Whether the underlying stream is still delivering frames
    fn is_active(&self) -> bool;

    /// Grab the current frame
    async fn grab_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// Stop the stream's tracks. Must be safe to call more than once.
    fn stop(&mut self);
}
