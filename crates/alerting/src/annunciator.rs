//! Alert Annunciator Implementation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{AlertConfig, AlertCue, CuePlayer};

/// Counters for triggers and playback results
#[derive(Debug, Default)]
pub struct AnnunciatorStats {
    triggered: AtomicU64,
    played: AtomicU64,
    failed: AtomicU64,
}

impl AnnunciatorStats {
    /// Calls to `sound()`
    pub fn triggered(&self) -> u64 {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Playbacks that ran to completion
    pub fn played(&self) -> u64 {
        self.played.load(Ordering::SeqCst)
    }

    /// Playbacks that failed or could not start
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Plays the alert cue on demand.
///
/// A new trigger while the cue is still playing restarts it.
pub struct AlertAnnunciator {
    cue: Arc<AlertCue>,
    player: Arc<dyn CuePlayer>,
    current: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<AnnunciatorStats>,
}

impl AlertAnnunciator {
    /// Create an annunciator for a cue and backend
    pub fn new(cue: AlertCue, player: Arc<dyn CuePlayer>) -> Self {
        Self {
            cue: Arc::new(cue),
            player,
            current: Mutex::new(None),
            stats: Arc::new(AnnunciatorStats::default()),
        }
    }

    /// Create an annunciator from configuration
    pub fn from_config(config: &AlertConfig) -> Self {
        info!("Creating alert annunciator with config: {:?}", config);
        Self::new(AlertCue::open(config.cue_path.clone()), config.player.build())
    }

    pub fn stats(&self) -> &AnnunciatorStats {
        &self.stats
    }

    /// Play the cue. Never fails; playback errors are logged.
    pub fn sound(&self) {
        self.stats.triggered.fetch_add(1, Ordering::SeqCst);

        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("Alert cue not played: no async runtime");
                self.stats.failed.fetch_add(1, Ordering::SeqCst);
                return;
            }
        };

        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = current.take() {
            if !previous.is_finished() {
                debug!("Restarting alert cue");
                previous.abort();
            }
        }

        let cue = self.cue.clone();
        let player = self.player.clone();
        let stats = self.stats.clone();
        *current = Some(runtime.spawn(async move {
            match player.play(cue.path()).await {
                Ok(()) => {
                    stats.played.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) => {
                    warn!("Alert playback failed: {}", e);
                    stats.failed.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));
    }

    /// Stop any playing cue
    pub fn silence(&self) {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = current.take() {
            handle.abort();
        }
    }
}

impl Drop for AlertAnnunciator {
    fn drop(&mut self) {
        self.silence();
    }
}
