//! Alerting System
//!
//! Carries drowsiness alert transitions (raised, cleared, acknowledged) from
//! the detection loop to whatever renders them: logs, a UI channel, or the
//! in-process alert manager.

mod event;
mod manager;
mod sink;

pub use event::{AlertEvent, ClearReason};
pub use manager::{AlertManager, AlertSnapshot};
pub use sink::{AlertSink, ChannelSink, LogSink};
