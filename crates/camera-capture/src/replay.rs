//! Camera that replays still images from a directory

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{CameraConfig, CameraError, CaptureDevice, CaptureStream, VideoFrame};

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Cycles through the images of a directory in file-name order
#[derive(Debug, Clone)]
pub struct ReplayCamera {
    dir: PathBuf,
}

impl ReplayCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn list_images(&self) -> Result<Vec<PathBuf>, CameraError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            CameraError::Open(format!("cannot read {}: {}", self.dir.display(), e))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CameraError::Open(e.to_string()))?
        {
            let path = entry.path();
            if is_image(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl CaptureDevice for ReplayCamera {
    async fn open(&self, _config: &CameraConfig) -> Result<Box<dyn CaptureStream>, CameraError> {
        let files = self.list_images().await?;
        if files.is_empty() {
            return Err(CameraError::Open(format!(
                "no images in {}",
                self.dir.display()
            )));
        }

        info!("Replaying {} images from {}", files.len(), self.dir.display());
        Ok(Box::new(ReplayStream {
            files,
            next: 0,
            sequence: 0,
            stopped: false,
        }))
    }
}

struct ReplayStream {
    files: Vec<PathBuf>,
    next: usize,
    sequence: u32,
    stopped: bool,
}

#[async_trait]
impl CaptureStream for ReplayStream {
    fn is_active(&self) -> bool {
        !self.stopped
    }

    async fn grab_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if self.stopped {
            return Err(CameraError::StreamInactive);
        }

        let path = self.files[self.next].clone();
        self.next = (self.next + 1) % self.files.len();
        self.sequence = self.sequence.wrapping_add(1);
        debug!("Replaying {}", path.display());

        let img = tokio::task::spawn_blocking(move || image::open(&path))
            .await
            .map_err(|e| CameraError::Grab(e.to_string()))?
            .map_err(|e| CameraError::Grab(e.to_string()))?;

        Ok(VideoFrame::from_rgb_image(img.to_rgb8(), self.sequence))
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
