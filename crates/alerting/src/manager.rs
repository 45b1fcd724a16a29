//! Alert Manager Implementation

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::{AlertEvent, AlertSink, ClearReason};

/// Point-in-time view of the alert bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertSnapshot {
    /// Whether the alarm is currently sounding
    pub active: bool,
    /// Alerts raised since the manager was created
    pub fire_count: usize,
    /// Alerts raised in the current hour
    pub hourly_count: usize,
    /// Alerts cleared by an open-eye / no-face frame or session end
    pub clear_count: usize,
    /// Alerts dismissed by the driver
    pub ack_count: usize,
    /// Reason the last alert went away
    pub last_clear: Option<ClearReason>,
    /// EAR reading that raised the last alert
    pub last_trigger_ear: Option<f32>,
}

/// Alert manager: keeps counts and the active flag in step with the edges
/// it is notified of.
pub struct AlertManager {
    snapshot: AlertSnapshot,
    /// Last time an alert was raised
    last_fired: Option<Instant>,
    /// Hour start time
    hour_start: Instant,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new() -> Self {
        Self {
            snapshot: AlertSnapshot::default(),
            last_fired: None,
            hour_start: Instant::now(),
        }
    }

    /// Record that an alert was raised
    pub fn record_fire(&mut self, ear: f32) {
        if self.hour_start.elapsed() > Duration::from_secs(3600) {
            self.snapshot.hourly_count = 0;
            self.hour_start = Instant::now();
        }

        self.snapshot.active = true;
        self.snapshot.fire_count += 1;
        self.snapshot.hourly_count += 1;
        self.snapshot.last_trigger_ear = Some(ear);
        self.last_fired = Some(Instant::now());

        info!("Alert recorded (count: {}, this hour: {})",
            self.snapshot.fire_count, self.snapshot.hourly_count);
    }

    /// Record that the active alert went away on its own
    pub fn record_clear(&mut self, reason: ClearReason) {
        if !self.snapshot.active {
            debug!("Clear without an active alert ignored ({:?})", reason);
            return;
        }
        self.snapshot.active = false;
        self.snapshot.clear_count += 1;
        self.snapshot.last_clear = Some(reason);
    }

    /// Acknowledge the active alert; false if nothing was sounding
    pub fn acknowledge(&mut self) -> bool {
        if !self.snapshot.active {
            return false;
        }
        self.snapshot.active = false;
        self.snapshot.ack_count += 1;
        info!("Alert acknowledged after {:?}",
            self.last_fired.map(|t| t.elapsed()).unwrap_or_default());
        true
    }

    /// Whether the alarm is currently sounding
    pub fn is_active(&self) -> bool {
        self.snapshot.active
    }

    /// Get hourly alert count
    pub fn hourly_count(&self) -> usize {
        self.snapshot.hourly_count
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> AlertSnapshot {
        self.snapshot.clone()
    }

    /// Clear all alert state
    pub fn clear(&mut self) {
        self.snapshot = AlertSnapshot::default();
        self.last_fired = None;
        self.hour_start = Instant::now();
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink for AlertManager {
    fn notify(&mut self, event: &AlertEvent) {
        match event {
            AlertEvent::Triggered { ear, .. } => self.record_fire(*ear),
            AlertEvent::Cleared { reason } => self.record_clear(*reason),
            AlertEvent::Acknowledged => {
                self.acknowledge();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_and_clear() {
        let mut manager = AlertManager::default();
        assert!(!manager.is_active());

        manager.notify(&AlertEvent::Triggered { closed_frames: 45, ear: 0.12 });
        assert!(manager.is_active());
        assert_eq!(manager.hourly_count(), 1);

        manager.notify(&AlertEvent::Cleared { reason: ClearReason::EyesOpen });
        let snapshot = manager.snapshot();
        assert!(!snapshot.active);
        assert_eq!(snapshot.fire_count, 1);
        assert_eq!(snapshot.clear_count, 1);
        assert_eq!(snapshot.last_clear, Some(ClearReason::EyesOpen));
        assert_eq!(snapshot.last_trigger_ear, Some(0.12));
    }

    #[test]
    fn test_clear_without_alert_is_ignored() {
        let mut manager = AlertManager::default();
        manager.record_clear(ClearReason::FaceLost);
        assert_eq!(manager.snapshot().clear_count, 0);
    }

    #[test]
    fn test_acknowledgement() {
        let mut manager = AlertManager::default();
        assert!(!manager.acknowledge());

        manager.record_fire(0.1);
        assert!(manager.acknowledge());
        assert!(!manager.is_active());
        assert_eq!(manager.snapshot().ack_count, 1);

        // Acknowledging twice does nothing
        assert!(!manager.acknowledge());
        assert_eq!(manager.snapshot().ack_count, 1);
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut manager = AlertManager::default();
        manager.record_fire(0.1);
        manager.record_fire(0.1);
        manager.clear();
        assert_eq!(manager.snapshot(), AlertSnapshot::default());
    }
}
