//! Drowsiness state tracking
//!
//! Debounces per-frame eye closure into an alert: the alert rises once the
//! eyes have stayed below the EAR cutoff for `consec_frames` frames in a row,
//! and falls on the first open-eye frame, on a no-face frame, or when the
//! driver acknowledges it.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Tracker phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerPhase {
    /// No closed frames pending
    #[default]
    Idle,
    /// Eyes closed, debounce window not yet reached
    Accumulating,
    /// Eyes closed past the window, alarm raised
    Alerting,
}

/// Mutable tracker state, owned by one detection session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    pub consecutive_closed_frames: u32,
    pub alert_active: bool,
}

/// Result of one tracker tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerUpdate {
    pub closed_frames: u32,
    pub alert_active: bool,
    /// The alert rose on this tick
    pub just_triggered: bool,
    /// The alert fell on this tick
    pub just_cleared: bool,
}

/// Consecutive-closed-frame drowsiness tracker
#[derive(Debug, Clone)]
pub struct DrowsinessTracker {
    consec_frames: u32,
    state: TrackerState,
}

impl DrowsinessTracker {
    /// `consec_frames` is the debounce window; zero is treated as one
    pub fn new(consec_frames: u32) -> Self {
        Self {
            consec_frames: consec_frames.max(1),
            state: TrackerState::default(),
        }
    }

    /// Feed one frame.
    ///
    /// `avg_ear` is ignored when `face_found` is false: losing the face resets
    /// the tracker unconditionally.
    pub fn update(&mut self, avg_ear: f32, threshold: f32, face_found: bool) -> TrackerUpdate {
        let was_active = self.state.alert_active;

        if !face_found {
            if self.state.consecutive_closed_frames > 0 {
                debug!("Face lost after {} closed frames, resetting tracker",
                    self.state.consecutive_closed_frames);
            }
            self.state = TrackerState::default();
            if was_active {
                info!("Drowsiness alert cleared: face lost");
            }
            return self.snapshot(false, was_active);
        }

        if avg_ear < threshold {
            self.state.consecutive_closed_frames = self.state.consecutive_closed_frames.saturating_add(1);

            let just_triggered = !was_active && self.state.consecutive_closed_frames >= self.consec_frames;
            if just_triggered {
                self.state.alert_active = true;
                info!("Drowsiness alert raised after {} closed frames (EAR {:.3} < {:.3})",
                    self.state.consecutive_closed_frames, avg_ear, threshold);
            }
            self.snapshot(just_triggered, false)
        } else {
            self.state = TrackerState::default();
            if was_active {
                info!("Drowsiness alert cleared: eyes open (EAR {:.3})", avg_ear);
            }
            self.snapshot(false, was_active)
        }
    }

    /// Driver's "I'm awake": force the tracker back to idle.
    ///
    /// Returns false if no alert was active. The closed-frame count restarts,
    /// so a driver who keeps their eyes shut is alerted again after another
    /// full window.
    pub fn acknowledge(&mut self) -> bool {
        if !self.state.alert_active {
            return false;
        }
        self.state = TrackerState::default();
        info!("Drowsiness alert acknowledged");
        true
    }

    /// Forget everything (session start/stop)
    pub fn reset(&mut self) {
        self.state = TrackerState::default();
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn phase(&self) -> TrackerPhase {
        match (self.state.alert_active, self.state.consecutive_closed_frames) {
            (true, _) => TrackerPhase::Alerting,
            (false, 0) => TrackerPhase::Idle,
            (false, _) => TrackerPhase::Accumulating,
        }
    }

    pub fn consec_frames(&self) -> u32 {
        self.consec_frames
    }

    fn snapshot(&self, just_triggered: bool, just_cleared: bool) -> TrackerUpdate {
        TrackerUpdate {
            closed_frames: self.state.consecutive_closed_frames,
            alert_active: self.state.alert_active,
            just_triggered,
            just_cleared,
        }
    }
}
