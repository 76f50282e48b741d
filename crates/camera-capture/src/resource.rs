//! Capture resource: one live stream per session

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{CameraConfig, CameraError, CaptureDevice, CaptureStream, VideoFrame};

/// Live stream owned by a [`CaptureResource`] between acquire and release.
///
/// Not `Clone`; dropping it stops the stream.
pub struct CaptureHandle {
    stream: Box<dyn CaptureStream>,
    acquired_at: Instant,
}

impl CaptureHandle {
    fn new(stream: Box<dyn CaptureStream>) -> Self {
        Self {
            stream,
            acquired_at: Instant::now(),
        }
    }

    /// Time since the stream was acquired
    pub fn age(&self) -> Duration {
        self.acquired_at.elapsed()
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stream.stop();
    }
}

/// Owns acquisition and release of the camera stream
pub struct CaptureResource {
    device: Arc<dyn CaptureDevice>,
    config: CameraConfig,
    handle: Mutex<Option<CaptureHandle>>,
}

impl CaptureResource {
    /// Create a resource for a device; nothing is opened until [`acquire`](Self::acquire)
    pub fn new(device: Arc<dyn CaptureDevice>, config: CameraConfig) -> Self {
        Self {
            device,
            config,
            handle: Mutex::new(None),
        }
    }

    /// Request video-only access and hold the stream.
    pub async fn acquire(&self) -> Result<(), CameraError> {
        let mut slot = self.handle.lock().await;
        if slot.is_some() {
            return Err(CameraError::AlreadyAcquired);
        }

        debug!(
            "Requesting camera access ({}x{})",
            self.config.width, self.config.height
        );
        let stream = self.device.open(&self.config).await.map_err(|e| {
            warn!("Camera acquisition failed: {}", e);
            e
        })?;

        *slot = Some(CaptureHandle::new(stream));
        info!("Camera stream acquired");
        Ok(())
    }

    /// Whether a stream is held and still live
    pub async fn is_active(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .map(|h| h.stream.is_active())
            .unwrap_or(false)
    }

    /// Whether a handle is currently held (live or not)
    pub async fn is_acquired(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Grab one frame from the held stream.
    ///
    /// Fails with [`CameraError::StreamInactive`] once the stream has stopped,
    /// and with [`CameraError::Timeout`] if the grab exceeds the configured bound.
    pub async fn grab_frame(&self) -> Result<VideoFrame, CameraError> {
        let mut slot = self.handle.lock().await;
        let handle = slot.as_mut().ok_or(CameraError::NotAcquired)?;

        if !handle.stream.is_active() {
            return Err(CameraError::StreamInactive);
        }

        let limit = self.config.grab_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(limit), handle.stream.grab_frame()).await {
            Ok(result) => result,
            Err(_) => Err(CameraError::Timeout(limit)),
        }
    }

    /// Stop and drop the held stream. Safe to call when nothing is held.
    pub async fn release(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            info!("Releasing camera stream after {:?}", handle.age());
            drop(handle);
        } else {
            debug!("Release requested with no stream held");
        }
    }

    /// Release without waiting. Returns false if the handle is in use.
    pub fn try_release(&self) -> bool {
        match self.handle.try_lock() {
            Ok(mut slot) => {
                if let Some(handle) = slot.take() {
                    info!("Releasing camera stream after {:?}", handle.age());
                }
                true
            }
            Err(_) => false,
        }
    }
}
