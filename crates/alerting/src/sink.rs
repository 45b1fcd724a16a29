//! Alert sinks

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::AlertEvent;

/// Consumer of alert edges.
///
/// Called from the detection loop, once per edge; implementations must not
/// block for long.
pub trait AlertSink: Send {
    fn notify(&mut self, event: &AlertEvent);
}

/// Fan-out to two sinks
impl<A: AlertSink, B: AlertSink> AlertSink for (A, B) {
    fn notify(&mut self, event: &AlertEvent) {
        self.0.notify(event);
        self.1.notify(event);
    }
}

/// Writes alert edges to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn notify(&mut self, event: &AlertEvent) {
        match event {
            AlertEvent::Triggered { closed_frames, ear } => {
                warn!("DROWSINESS ALERT: eyes closed for {} frames (EAR {:.3})", closed_frames, ear);
            }
            AlertEvent::Cleared { reason } => {
                info!("Drowsiness alert cleared ({:?})", reason);
            }
            AlertEvent::Acknowledged => {
                info!("Drowsiness alert acknowledged by driver");
            }
        }
    }
}

/// Forwards alert edges over an unbounded channel (UI layers, tests)
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<AlertEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AlertEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl AlertSink for ChannelSink {
    fn notify(&mut self, event: &AlertEvent) {
        // A receiver that went away just stops listening.
        let _ = self.tx.send(event.clone());
    }
}
