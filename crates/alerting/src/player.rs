//! Cue playback backends

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{PlaybackError, PlayerConfig};

/// Plays a sound file to completion
#[async_trait]
pub trait CuePlayer: Send + Sync {
    async fn play(&self, cue: &Path) -> Result<(), PlaybackError>;
}

impl PlayerConfig {
    /// Build the backend described by this configuration
    pub fn build(&self) -> Arc<dyn CuePlayer> {
        match self {
            PlayerConfig::Command { program, args } => {
                Arc::new(CommandPlayer::new(program.clone(), args.clone()))
            }
            PlayerConfig::Silent => Arc::new(SilentPlayer),
        }
    }
}

/// Plays through an external program (e.g. `aplay`, `afplay`, `paplay`).
///
/// The child is killed if the playing future is dropped, so aborting the
/// playback task stops the sound.
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl CuePlayer for CommandPlayer {
    async fn play(&self, cue: &Path) -> Result<(), PlaybackError> {
        debug!("Playing {} with {}", cue.display(), self.program);
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(cue)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| PlaybackError::Spawn(format!("{}: {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(PlaybackError::Player(format!("{} exited with {}", self.program, status)))
        }
    }
}

/// Logs the alert without producing sound
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentPlayer;

#[async_trait]
impl CuePlayer for SilentPlayer {
    async fn play(&self, cue: &Path) -> Result<(), PlaybackError> {
        info!("ALERT (silent playback of {})", cue.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let player = CommandPlayer::new("definitely-not-a-player-binary", vec![]);
        let err = player.play(Path::new("alarme.wav")).await.unwrap_err();
        assert!(matches!(err, PlaybackError::Spawn(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_program_exit_status() {
        let ok = CommandPlayer::new("true", vec![]);
        assert!(ok.play(Path::new("alarme.wav")).await.is_ok());

        let failing = CommandPlayer::new("false", vec![]);
        assert!(matches!(
            failing.play(Path::new("alarme.wav")).await,
            Err(PlaybackError::Player(_))
        ));
    }

    #[tokio::test]
    async fn test_silent_player() {
        assert!(SilentPlayer.play(Path::new("alarme.wav")).await.is_ok());
    }
}
