//! Session lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// No camera held, no clock running
    #[default]
    Idle,
    /// Waiting for camera access
    Acquiring,
    /// Camera held and sampling clock running
    Active,
    /// Tearing down clock and camera
    Stopping,
}

impl SessionState {
    /// Whether a start request is pending or fulfilled
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Acquiring | SessionState::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Acquiring => "acquiring",
            SessionState::Active => "active",
            SessionState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
