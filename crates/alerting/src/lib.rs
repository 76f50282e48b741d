//! Alerting System
//!
//! Plays the drowsiness alert cue. Playback is best-effort: failures are
//! logged and counted, never returned to the caller.

mod annunciator;
mod cue;
mod player;

pub use annunciator::{AlertAnnunciator, AnnunciatorStats};
pub use cue::{AlertCue, CueInfo};
pub use player::{CommandPlayer, CuePlayer, SilentPlayer};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Playback error types
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Alert cue unreadable: {0}")]
    Cue(String),

    #[error("Failed to start player: {0}")]
    Spawn(String),

    #[error("Player failed: {0}")]
    Player(String),
}

/// How the cue is played
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlayerConfig {
    /// Run an external program with the cue path as its last argument
    Command { program: String, args: Vec<String> },
    /// Log instead of playing
    Silent,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig::Command {
            program: "aplay".to_string(),
            args: vec!["-q".to_string()],
        }
    }
}

/// Alert configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Path of the WAV cue
    pub cue_path: PathBuf,
    /// Playback backend
    pub player: PlayerConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cue_path: PathBuf::from("static/alarme.wav"),
            player: PlayerConfig::default(),
        }
    }
}
