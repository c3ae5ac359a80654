use std::sync::Arc;

use eyeframe_media::{encode_png, fit_to_native, VideoSource};
use eyeframe_ops::EventLog;
use eyeframe_types::{
    config::CaptureConfig,
    events::{
        EventKind, EventPayload, FrameCapturedEvent, LifecyclePhase, SelectionEvent,
        SessionEvent,
    },
    frame::{EyeSide, Frame, FrameId},
    Precondition, Result,
};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::{
    clock::{Clock, SystemClock},
    gate::ExportGate,
    store::{FrameIdCounter, FrameStore},
};

/// A capture session shared between the timer task and its callers.
pub type SharedSession = Arc<Mutex<CaptureSession>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    Rejected(Precondition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Capture is not running; nothing happened.
    Idle,
    /// The video ended or was paused, so capture stopped.
    Stopped,
    /// The video or its surface was not ready; the sample was dropped.
    Skipped,
    Captured(FrameId),
}

/// Owns the loaded video, the frame store, the id counter and the eye-side tag.
pub struct CaptureSession {
    video: Option<Box<dyn VideoSource>>,
    store: FrameStore,
    ids: FrameIdCounter,
    eye_side: EyeSide,
    default_eye: EyeSide,
    mute: bool,
    running: bool,
    clock: Arc<dyn Clock>,
    gate: ExportGate,
    events: EventLog,
    /// Run generation. Bumped on every start and stop so a tick task from an
    /// earlier run can tell it is stale.
    run: watch::Sender<u64>,
}

impl CaptureSession {
    pub fn new(config: &CaptureConfig, clock: Arc<dyn Clock>, events: EventLog) -> Self {
        Self {
            video: None,
            store: FrameStore::new(),
            ids: FrameIdCounter::new(),
            eye_side: config.default_eye,
            default_eye: config.default_eye,
            mute: config.mute,
            running: false,
            clock,
            gate: ExportGate::new(),
            events,
            run: watch::channel(0).0,
        }
    }

    pub fn with_system_clock(config: &CaptureConfig, events: EventLog) -> Self {
        Self::new(config, Arc::new(SystemClock), events)
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Replace the video source. Any running capture stops and all frames,
    /// the id counter and the eye-side tag are reset.
    pub async fn load_video(&mut self, video: Box<dyn VideoSource>) {
        self.stop().await;
        let description = video.describe();
        self.video = Some(video);
        self.reset().await;
        self.eye_side = self.default_eye;
        info!("Loaded video {}", description);
        self.events
            .record(SessionEvent::lifecycle(
                LifecyclePhase::VideoLoaded,
                Some(description),
            ))
            .await;
    }

    pub async fn reset(&mut self) {
        let dropped = self.store.len();
        self.store.reset();
        self.ids.reset();
        self.events
            .record(SessionEvent::lifecycle(
                LifecyclePhase::Reset,
                Some(format!("{dropped} frames cleared")),
            ))
            .await;
    }

    pub async fn start(&mut self) -> Result<StartOutcome> {
        if self.running {
            debug!("start ignored: capture already running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        if self.gate.is_busy() {
            return Ok(self.reject(Precondition::ExportInFlight).await);
        }
        let Some(video) = self.video.as_mut() else {
            return Ok(self.reject(Precondition::NoVideoLoaded).await);
        };
        video.play(self.mute).await?;
        self.running = true;
        self.next_run();
        info!("Capture started with eye side {}", self.eye_side);
        self.events
            .record(SessionEvent::lifecycle(LifecyclePhase::CaptureStarted, None))
            .await;
        Ok(StartOutcome::Started)
    }

    /// Take one sample of the playing video.
    pub async fn tick(&mut self) -> TickOutcome {
        if !self.running {
            return TickOutcome::Idle;
        }
        let Some(video) = self.video.as_ref() else {
            debug!("tick skipped: no video element");
            return TickOutcome::Skipped;
        };
        if !video.state().is_playing() {
            debug!("video is {:?}; stopping capture", video.state());
            self.stop().await;
            return TickOutcome::Stopped;
        }
        let Some(native) = video.native_size() else {
            debug!("tick skipped: native size unknown");
            return TickOutcome::Skipped;
        };
        let raster = match video.current_frame().await {
            Ok(Some(raster)) => raster,
            Ok(None) => {
                debug!("tick skipped: surface not ready");
                return TickOutcome::Skipped;
            }
            Err(err) => {
                debug!("tick skipped: {err}");
                return TickOutcome::Skipped;
            }
        };
        let image = match fit_to_native(raster, native).and_then(|r| encode_png(&r)) {
            Ok(image) => image,
            Err(err) => {
                debug!("tick skipped: {err}");
                return TickOutcome::Skipped;
            }
        };

        let id = self.ids.peek();
        let frame = Frame::new(id, self.eye_side, image, self.clock.now());
        let captured = FrameCapturedEvent {
            id,
            file_name: frame.file_name.clone(),
            eye_side: frame.eye_side(),
        };
        self.store.append(frame);
        self.ids.advance();
        self.events
            .record(SessionEvent::new(
                EventKind::Capture,
                EventPayload::FrameCaptured(captured),
            ))
            .await;
        TickOutcome::Captured(id)
    }

    /// Leave the running state. Returns false when capture was not running.
    pub async fn stop(&mut self) -> bool {
        if !self.running {
            debug!("stop ignored: capture not running");
            return false;
        }
        self.running = false;
        self.next_run();
        info!("Capture stopped after {} frames", self.store.len());
        self.events
            .record(SessionEvent::lifecycle(LifecyclePhase::CaptureStopped, None))
            .await;
        true
    }

    /// Stop only if `run_id` is still the current run.
    pub async fn stop_run(&mut self, run_id: u64) -> bool {
        if self.run_id() != run_id {
            debug!("stop ignored: run {run_id} already superseded");
            return false;
        }
        self.stop().await
    }

    /// Identifier of the current run; changes on every start and stop.
    pub fn run_id(&self) -> u64 {
        *self.run.borrow()
    }

    /// Receiver notified whenever the run generation changes.
    pub fn watch_runs(&self) -> watch::Receiver<u64> {
        self.run.subscribe()
    }

    fn next_run(&mut self) {
        let next = self.run_id() + 1;
        self.run.send_replace(next);
    }

    /// Pause playback; the next tick ends the capture.
    pub fn pause_video(&mut self) {
        if let Some(video) = self.video.as_mut() {
            video.pause();
        }
    }

    pub fn eye_side(&self) -> EyeSide {
        self.eye_side
    }

    pub fn set_eye_side(&mut self, side: EyeSide) {
        self.eye_side = side;
    }

    pub fn toggle_eye_side(&mut self) -> EyeSide {
        self.eye_side = self.eye_side.toggled();
        self.eye_side
    }

    pub async fn toggle_selected(&mut self, id: FrameId) -> Option<bool> {
        let Some(selected) = self.store.toggle_selected(id) else {
            debug!("toggle ignored: no frame with id {id}");
            return None;
        };
        self.events
            .record(SessionEvent::new(
                EventKind::Selection,
                EventPayload::SelectionChanged(SelectionEvent { id, selected }),
            ))
            .await;
        Some(selected)
    }

    pub fn select_all(&mut self) {
        self.store.select_all();
    }

    pub fn clear_selection(&mut self) {
        self.store.clear_selection();
    }

    pub fn frames(&self) -> &[Frame] {
        self.store.frames()
    }

    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    /// Owned copy of the export set. Image payloads are shared, not copied.
    pub fn export_set(&self) -> Vec<Frame> {
        self.store.export_set().into_iter().cloned().collect()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn export_gate(&self) -> ExportGate {
        self.gate.clone()
    }

    pub fn events(&self) -> EventLog {
        self.events.clone()
    }

    async fn reject(&self, precondition: Precondition) -> StartOutcome {
        info!("start rejected: {precondition}");
        self.events.record(SessionEvent::notice(precondition)).await;
        StartOutcome::Rejected(precondition)
    }
}
