//! Monitoring session controller

use alerting::AlertAnnunciator;
use analysis_client::{AnalysisClient, AnalysisOutcome, FrameAnalyzer, FrameCodec};
use camera_capture::CaptureResource;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::pipeline::{SamplePipeline, TickOutcome};
use crate::scheduler::{SampleScheduler, SchedulerStats};
use crate::status::{StatusEvent, StatusSink};
use crate::{MonitorConfig, SessionConfig, SessionError, SessionState};

/// Collaborators a controller drives
pub struct SessionComponents {
    pub capture: CaptureResource,
    pub codec: FrameCodec,
    pub analyzer: Arc<dyn FrameAnalyzer>,
    pub annunciator: AlertAnnunciator,
    pub sink: Arc<dyn StatusSink>,
}

/// Owns the camera, the sampling clock and the alert for one monitoring
/// session at a time.
///
/// While the state is `Active` the camera is held and the clock runs; in
/// every other state neither is true once a transition completes.
pub struct SessionController {
    shared: Arc<Shared>,
}

struct Shared {
    interval: Duration,
    capture: Arc<CaptureResource>,
    pipeline: SamplePipeline,
    annunciator: AlertAnnunciator,
    sink: Arc<dyn StatusSink>,
    state: watch::Sender<SessionState>,
    // Outcomes tagged with any other id are stale
    session: Mutex<Option<Uuid>>,
    scheduler: tokio::sync::Mutex<SampleScheduler>,
    scheduler_stats: Arc<SchedulerStats>,
}

impl SessionController {
    pub fn new(session: &SessionConfig, components: SessionComponents) -> Self {
        let capture = Arc::new(components.capture);
        let scheduler = SampleScheduler::new();
        let scheduler_stats = scheduler.stats();
        let (state, _) = watch::channel(SessionState::Idle);

        Self {
            shared: Arc::new(Shared {
                interval: session.interval(),
                pipeline: SamplePipeline::new(capture.clone(), components.codec, components.analyzer),
                capture,
                annunciator: components.annunciator,
                sink: components.sink,
                state,
                session: Mutex::new(None),
                scheduler: tokio::sync::Mutex::new(scheduler),
                scheduler_stats,
            }),
        }
    }

    /// Build the full stack described by `config`
    pub fn from_config(config: &MonitorConfig, sink: Arc<dyn StatusSink>) -> Result<Self, SessionError> {
        config.validate()?;
        info!("Creating session controller with {:?} camera", config.camera.source);

        let capture = CaptureResource::new(config.camera.source.device(), config.camera.clone());
        let analyzer = Arc::new(AnalysisClient::from_config(config.analysis.clone())?);

        Ok(Self::new(
            &config.session,
            SessionComponents {
                capture,
                codec: FrameCodec::new(config.analysis.jpeg_quality),
                analyzer,
                annunciator: AlertAnnunciator::from_config(&config.alert),
                sink,
            },
        ))
    }

    /// Acquire the camera and start sampling.
    ///
    /// Fails with `AlreadyRunning` unless the session is idle. A refused
    /// camera leaves the session idle with nothing scheduled.
    pub async fn start(&self) -> Result<Uuid, SessionError> {
        let shared = &self.shared;
        if !shared.transition(&[SessionState::Idle], SessionState::Acquiring) {
            let current = self.state();
            debug!("Start ignored: session is {}", current);
            return Err(SessionError::AlreadyRunning(current));
        }

        let session_id = Uuid::new_v4();
        shared.set_session(Some(session_id));
        let pending = PendingStart {
            shared,
            session_id,
            armed: true,
        };
        info!(%session_id, "Requesting camera access");
        shared.sink.publish(&StatusEvent::Acquiring);

        if let Err(e) = shared.capture.acquire().await {
            pending.disarm();
            warn!(%session_id, "Camera access failed: {}", e);
            shared.finish(StatusEvent::PermissionDenied {
                detail: e.to_string(),
            });
            return Err(SessionError::Permission(e));
        }
        shared.sink.publish(&StatusEvent::CameraReady);

        // Holding the scheduler lock orders us before any stop() that sees Active
        let mut scheduler = shared.scheduler.lock().await;
        if !shared.transition(&[SessionState::Acquiring], SessionState::Active) {
            drop(scheduler);
            info!(%session_id, "Start cancelled while acquiring camera");
            if !shared.capture.try_release() {
                shared.capture.release().await;
            }
            pending.disarm();
            shared.finish(StatusEvent::Stopped);
            return Err(SessionError::Cancelled);
        }
        pending.disarm();

        let weak = Arc::downgrade(&self.shared);
        scheduler.begin(shared.interval, move || {
            let weak = weak.clone();
            async move {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let outcome = shared.pipeline.run_once().await;
                if shared.report(session_id, outcome) {
                    shared.shutdown().await;
                }
            }
        });

        metrics::counter!("monitor_sessions_started_total").increment(1);
        info!(%session_id, "Monitoring started");
        shared.sink.publish(&StatusEvent::Started { session_id });
        Ok(session_id)
    }

    /// Stop sampling and release the camera. No-op when idle.
    ///
    /// During acquisition the pending start is cancelled and releases the
    /// camera itself.
    pub async fn stop(&self) {
        self.shared.shutdown().await;
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// Watch state transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Id of the running session, if any
    pub fn session_id(&self) -> Option<Uuid> {
        self.shared.current_session()
    }

    pub fn scheduler_stats(&self) -> Arc<SchedulerStats> {
        self.shared.scheduler_stats.clone()
    }

    pub fn annunciator(&self) -> &AlertAnnunciator {
        &self.shared.annunciator
    }
}

/// Undoes a `start()` whose future is dropped before it resolves
struct PendingStart<'a> {
    shared: &'a Shared,
    session_id: Uuid,
    armed: bool,
}

impl PendingStart<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(session_id = %self.session_id, "Start abandoned before completion");

        if !self.shared.capture.try_release() {
            match Handle::try_current() {
                Ok(runtime) => {
                    let capture = self.shared.capture.clone();
                    runtime.spawn(async move { capture.release().await });
                }
                Err(_) => warn!("Camera left held: no async runtime to release it"),
            }
        }
        self.shared.finish(StatusEvent::Stopped);
    }
}

impl Shared {
    fn transition(&self, from: &[SessionState], to: SessionState) -> bool {
        self.state.send_if_modified(|state| {
            if from.contains(state) {
                debug!("Session {} -> {}", state, to);
                *state = to;
                true
            } else {
                false
            }
        })
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Uuid>> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_session(&self, id: Option<Uuid>) {
        *self.lock_session() = id;
    }

    fn current_session(&self) -> Option<Uuid> {
        *self.lock_session()
    }

    /// Return to Idle and publish the closing event
    fn finish(&self, event: StatusEvent) {
        let mut session = self.lock_session();
        *session = None;
        self.transition(&[SessionState::Acquiring, SessionState::Stopping], SessionState::Idle);
        self.sink.publish(&event);
    }

    async fn shutdown(&self) {
        if !self.transition(&[SessionState::Active], SessionState::Stopping) {
            if self.transition(&[SessionState::Acquiring], SessionState::Stopping) {
                info!("Stop requested while acquiring camera");
            }
            return;
        }

        info!(session_id = ?self.current_session(), "Stopping monitoring");
        self.scheduler.lock().await.end();
        self.capture.release().await;
        self.finish(StatusEvent::Stopped);
    }

    /// Publish a tick's result. Returns true when the session must end.
    fn report(&self, session_id: Uuid, outcome: TickOutcome) -> bool {
        let session = self.lock_session();
        if *session != Some(session_id) || *self.state.borrow() != SessionState::Active {
            debug!(%session_id, "Discarding outcome of finished session");
            return false;
        }

        match outcome {
            TickOutcome::Analyzed(analysis) => {
                metrics::counter!("monitor_exchanges_total", "outcome" => analysis.label()).increment(1);
                self.report_analysis(analysis);
                false
            }
            TickOutcome::CaptureFailed(e) => {
                warn!("Frame capture failed: {}", e);
                self.sink.publish(&StatusEvent::CaptureFailed {
                    detail: e.to_string(),
                });
                false
            }
            TickOutcome::EncodeFailed(e) => {
                warn!("Frame skipped: {}", e);
                self.sink.publish(&StatusEvent::FrameSkipped {
                    reason: e.to_string(),
                });
                false
            }
            TickOutcome::StreamLost => {
                error!(%session_id, "Camera stream is no longer active");
                self.sink.publish(&StatusEvent::StreamLost);
                true
            }
        }
    }

    fn report_analysis(&self, analysis: AnalysisOutcome) {
        match analysis {
            AnalysisOutcome::Success {
                alert: true,
                frames_closed,
                ear,
            } => {
                warn!(frames_closed, ?ear, "Drowsiness detected");
                metrics::counter!("monitor_alerts_total").increment(1);
                self.annunciator.sound();
                self.sink.publish(&StatusEvent::Alert { frames_closed });
            }
            AnalysisOutcome::Success {
                alert: false,
                frames_closed,
                ear,
            } => {
                debug!(frames_closed, ?ear, "Driver awake");
                self.sink.publish(&StatusEvent::Monitoring { ear, frames_closed });
            }
            AnalysisOutcome::ServerError { message, status } => {
                warn!(?status, "Analysis server error: {}", message);
                self.sink.publish(&StatusEvent::ServerError { message });
            }
            AnalysisOutcome::TransportError { kind, detail } => {
                warn!("Analysis exchange failed ({}): {}", kind, detail);
                self.sink.publish(&StatusEvent::TransportError { kind, detail });
            }
        }
    }
}
