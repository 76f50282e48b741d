//! Synthetic camera for tests and headless runs

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::frame::now_ns;
use crate::{CameraConfig, CameraError, CaptureDevice, CaptureStream, VideoFrame};

#[derive(Debug, Default)]
struct MockState {
    denied: AtomicBool,
    disconnected: AtomicBool,
    pending_grab_failures: AtomicU32,
    opened: AtomicU32,
    live: AtomicU32,
    grabs: AtomicU32,
}

/// Camera producing a gradient test pattern at the configured resolution.
///
/// Clones share state, so a test can keep one clone to steer the device
/// (deny access, unplug it, fail grabs) while another is owned by the
/// capture resource.
#[derive(Debug, Clone, Default)]
pub struct MockCamera {
    state: Arc<MockState>,
}

impl MockCamera {
    /// Create a mock camera that grants access
    pub fn new() -> Self {
        info!("Creating mock camera");
        Self::default()
    }

    /// Refuse all subsequent open requests
    pub fn deny_permission(&self) {
        self.state.denied.store(true, Ordering::SeqCst);
    }

    /// Simulate the device being unplugged; open streams go inactive
    pub fn disconnect(&self) {
        info!("Mock camera disconnected");
        self.state.disconnected.store(true, Ordering::SeqCst);
    }

    /// Plug the device back in
    pub fn reconnect(&self) {
        self.state.disconnected.store(false, Ordering::SeqCst);
    }

    /// Make the next `n` grabs fail while the stream stays active
    pub fn fail_next_grabs(&self, n: u32) {
        self.state.pending_grab_failures.store(n, Ordering::SeqCst);
    }

    /// Number of successful opens
    pub fn open_count(&self) -> u32 {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Streams opened and not yet stopped
    pub fn live_streams(&self) -> u32 {
        self.state.live.load(Ordering::SeqCst)
    }

    /// Number of grab attempts across all streams
    pub fn grab_count(&self) -> u32 {
        self.state.grabs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureDevice for MockCamera {
    async fn open(&self, config: &CameraConfig) -> Result<Box<dyn CaptureStream>, CameraError> {
        if self.state.denied.load(Ordering::SeqCst) {
            return Err(CameraError::PermissionDenied("mock camera denied access".into()));
        }
        if self.state.disconnected.load(Ordering::SeqCst) {
            return Err(CameraError::Open("mock camera not connected".into()));
        }

        self.state.opened.fetch_add(1, Ordering::SeqCst);
        self.state.live.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockStream {
            state: self.state.clone(),
            width: config.width,
            height: config.height,
            sequence: 0,
            stopped: false,
        }))
    }
}

struct MockStream {
    state: Arc<MockState>,
    width: u32,
    height: u32,
    sequence: u32,
    stopped: bool,
}

impl MockStream {
    fn pattern(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        let shift = (self.sequence % 256) as u8;
        for y in 0..self.height {
            for x in 0..self.width {
                data.push((x % 256) as u8);
                data.push((y % 256) as u8);
                data.push(shift);
            }
        }
        data
    }
}

#[async_trait]
impl CaptureStream for MockStream {
    fn is_active(&self) -> bool {
        !self.stopped && !self.state.disconnected.load(Ordering::SeqCst)
    }

    async fn grab_frame(&mut self) -> Result<VideoFrame, CameraError> {
        self.state.grabs.fetch_add(1, Ordering::SeqCst);
        if !self.is_active() {
            return Err(CameraError::StreamInactive);
        }

        let failing = self
            .state
            .pending_grab_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(CameraError::Grab("injected grab failure".into()));
        }

        self.sequence = self.sequence.wrapping_add(1);
        debug!("Mock frame {}", self.sequence);
        Ok(VideoFrame::new(
            self.pattern(),
            self.width,
            self.height,
            now_ns(),
            self.sequence,
        ))
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.state.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}
