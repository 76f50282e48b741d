//! Alert cue resource

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::PlaybackError;

/// Format of a readable WAV cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueInfo {
    pub channels: u16,
    pub sample_rate: u32,
    pub duration: Duration,
}

/// The alert sound on disk
#[derive(Debug, Clone)]
pub struct AlertCue {
    path: PathBuf,
    info: Option<CueInfo>,
}

impl AlertCue {
    /// Read the WAV header of `path`
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PlaybackError> {
        let path = path.into();
        let reader = hound::WavReader::open(&path)
            .map_err(|e| PlaybackError::Cue(format!("{}: {}", path.display(), e)))?;

        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(PlaybackError::Cue(format!("{}: zero sample rate", path.display())));
        }
        let duration = Duration::from_secs_f64(reader.duration() as f64 / spec.sample_rate as f64);

        let info = CueInfo {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            duration,
        };
        info!(
            "Alert cue {} loaded ({} ch, {} Hz, {:?})",
            path.display(),
            info.channels,
            info.sample_rate,
            info.duration
        );
        Ok(Self {
            path,
            info: Some(info),
        })
    }

    /// Like [`load`](Self::load), but keeps the path even when the file cannot
    /// be validated; playback will then report the failure.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::load(path.clone()) {
            Ok(cue) => cue,
            Err(e) => {
                warn!("Alert cue not validated: {}", e);
                Self { path, info: None }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// WAV format, if the file was readable
    pub fn info(&self) -> Option<CueInfo> {
        self.info
    }
}
