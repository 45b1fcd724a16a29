//! Detection sessions
//!
//! A session owns everything one live monitoring run needs: the landmark
//! model handle, the drowsiness tracker, and (while `run` is active) the
//! frame source. The loop pulls one frame, evaluates it, emits alert edges,
//! and yields; stop and acknowledge commands are checked once per iteration.

use std::sync::Arc;

use alerting::{AlertEvent, AlertSink, ClearReason};
use camera_capture::{FrameSource, VideoFrame};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::analysis::FrameAnalysis;
use crate::detector::LandmarkSource;
use crate::ear::DetectionFrame;
use crate::tracker::{DrowsinessTracker, TrackerPhase};
use crate::{DmsConfig, DmsError};

/// Commands accepted by a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Driver dismissed the alarm
    Acknowledge,
    /// End the session
    Stop,
}

/// Controls a running session from another task.
///
/// Dropping every handle stops the session, same as `stop`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Ask the session to stop; false if it already has
    pub fn stop(&self) -> bool {
        self.tx.send(SessionCommand::Stop).is_ok()
    }

    /// Forward the driver's "I'm awake"; false if the session is gone
    pub fn acknowledge(&self) -> bool {
        self.tx.send(SessionCommand::Acknowledge).is_ok()
    }
}

/// Create the command channel for `DetectionSession::run`
pub fn session_channel() -> (SessionHandle, mpsc::UnboundedReceiver<SessionCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionHandle { tx }, rx)
}

/// Counters for one finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub frames: u64,
    pub no_face_frames: u64,
    pub alerts_triggered: u64,
    pub acknowledgments: u64,
}

impl SessionSummary {
    fn record(&mut self, analysis: &FrameAnalysis) {
        self.frames += 1;
        if !analysis.frame.face_found {
            self.no_face_frames += 1;
        }
        if analysis.tracker.just_triggered {
            self.alerts_triggered += 1;
        }
    }
}

/// One live monitoring session
pub struct DetectionSession {
    landmarks: Arc<dyn LandmarkSource>,
    config: DmsConfig,
    tracker: DrowsinessTracker,
    running: bool,
}

impl DetectionSession {
    pub fn new(landmarks: Arc<dyn LandmarkSource>, config: DmsConfig) -> Result<Self, DmsError> {
        config.validate()?;
        Ok(Self {
            tracker: DrowsinessTracker::new(config.consec_frames),
            landmarks,
            config,
            running: false,
        })
    }

    /// Begin a fresh session; tracker state starts from idle
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.tracker.reset();
        self.running = true;
        info!("Detection session started (model: {}, EAR < {}, {} frames)",
            self.landmarks.name(), self.config.ear_threshold, self.config.consec_frames);
    }

    /// End the session and discard tracker state
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.tracker.reset();
        gauge!("dms_closed_frames").set(0.0);
        info!("Detection session stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> TrackerPhase {
        self.tracker.phase()
    }

    pub fn config(&self) -> &DmsConfig {
        &self.config
    }

    /// Driver's manual dismissal; false if nothing was alerting
    pub fn acknowledge(&mut self) -> bool {
        self.tracker.acknowledge()
    }

    /// Evaluate one frame and advance the tracker.
    ///
    /// A landmark-model failure is logged and treated as a frame without a
    /// face; it never ends the session.
    pub fn process_frame(&mut self, frame: &VideoFrame) -> Result<FrameAnalysis, DmsError> {
        if !self.running {
            return Err(DmsError::NotRunning);
        }

        let faces = match self.landmarks.detect(frame) {
            Ok(faces) => faces,
            Err(e) => {
                warn!("Landmark detection failed on frame {}: {}", frame.sequence, e);
                counter!("dms_detection_failures_total").increment(1);
                Vec::new()
            }
        };

        let reading = DetectionFrame::from_face(faces.first(), &self.config.left_eye, &self.config.right_eye);
        let update = self.tracker.update(reading.avg_ear, self.config.ear_threshold, reading.face_found);

        counter!("dms_frames_total").increment(1);
        if !reading.face_found {
            counter!("dms_no_face_frames_total").increment(1);
        }
        if update.just_triggered {
            counter!("dms_alerts_triggered_total").increment(1);
        }
        gauge!("dms_closed_frames").set(update.closed_frames as f64);

        Ok(FrameAnalysis {
            sequence: frame.sequence,
            frame: reading,
            tracker: update,
            phase: self.tracker.phase(),
        })
    }

    /// Run the cooperative detection loop until the source is exhausted, a
    /// stop command arrives, or every `SessionHandle` is dropped.
    ///
    /// On exit the frame source is released and tracker state is cleared; an
    /// alert still active at that point is reported as cleared.
    pub async fn run<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Result<SessionSummary, DmsError>
    where
        S: FrameSource,
        K: AlertSink,
    {
        self.start();
        let mut summary = SessionSummary::default();

        let outcome = loop {
            let next = tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(SessionCommand::Acknowledge) => {
                        if self.acknowledge() {
                            summary.acknowledgments += 1;
                            sink.notify(&AlertEvent::Acknowledged);
                        }
                        continue;
                    }
                    Some(SessionCommand::Stop) | None => {
                        info!("Stop requested");
                        break Ok(());
                    }
                },
                next = source.next_frame() => next,
            };

            let frame = match next {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Frame source exhausted");
                    break Ok(());
                }
                Err(e) => {
                    error!("Frame source failed: {}", e);
                    break Err(DmsError::FrameSource(e));
                }
            };

            let analysis = match self.process_frame(&frame) {
                Ok(analysis) => analysis,
                Err(e) => break Err(e),
            };
            summary.record(&analysis);

            if analysis.tracker.just_triggered {
                sink.notify(&AlertEvent::Triggered {
                    closed_frames: analysis.tracker.closed_frames,
                    ear: analysis.frame.avg_ear,
                });
            }
            if analysis.tracker.just_cleared {
                let reason = if analysis.frame.face_found {
                    ClearReason::EyesOpen
                } else {
                    ClearReason::FaceLost
                };
                sink.notify(&AlertEvent::Cleared { reason });
            }

            tokio::task::yield_now().await;
        };

        let was_alerting = self.tracker.state().alert_active;
        source.release();
        self.stop();
        if was_alerting {
            sink.notify(&AlertEvent::Cleared { reason: ClearReason::SessionStopped });
        }

        info!("Session summary: {} frames, {} without face, {} alerts, {} acknowledged",
            summary.frames, summary.no_face_frames, summary.alerts_triggered, summary.acknowledgments);

        outcome.map(|()| summary)
    }
}
