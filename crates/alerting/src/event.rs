//! Alert transition edges

use serde::{Deserialize, Serialize};

/// Why an active alert went away
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    /// An open-eye frame was observed
    EyesOpen,
    /// The driver's face was lost; nothing can be asserted
    FaceLost,
    /// The detection session ended while alerting
    SessionStopped,
}

/// Edge emitted when the drowsiness alert changes state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertEvent {
    /// Eyes stayed closed for the configured number of frames
    Triggered {
        closed_frames: u32,
        ear: f32,
    },

    /// Alert cleared by the model (or by the session ending)
    Cleared {
        reason: ClearReason,
    },

    /// Driver dismissed the alert manually
    Acknowledged,
}

impl AlertEvent {
    /// Whether this edge starts the alarm
    pub fn is_trigger(&self) -> bool {
        matches!(self, AlertEvent::Triggered { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let raised = AlertEvent::Triggered { closed_frames: 45, ear: 0.1 };
        let json = serde_json::to_value(&raised).unwrap();
        assert_eq!(json["type"], "triggered");
        assert_eq!(json["closed_frames"], 45);

        let cleared = AlertEvent::Cleared { reason: ClearReason::FaceLost };
        let json = serde_json::to_value(&cleared).unwrap();
        assert_eq!(json["reason"], "face_lost");
        assert!(!cleared.is_trigger());
        assert!(raised.is_trigger());
    }
}
