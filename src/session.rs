// Capture session: the per-frame pipeline and the worker that runs it.
//
// `CaptureSession` is the synchronous core. Given a frame, the latest
// observation and a threshold snapshot, it runs distance check -> drawing
// state machine -> confirm gate -> (maybe) persist -> overlay. It has no
// threads and no clock of its own, so tests drive it frame by frame.
//
// `SessionController` owns the background worker: it opens the frame
// source on the worker thread, paces the loop, submits frames to the
// recognizer, and hands rendered frames to the `FrameMailbox`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::camera::{mirror_horizontal, FrameSource};
use crate::config::{CaptureSettings, SharedSettings, Thresholds};
use crate::confirm::{ConfirmGate, GateDecision};
use crate::display::{DisplayFrame, FrameMailbox};
use crate::distance::{DistanceState, DistanceValidator};
use crate::drawing::{DrawingStateMachine, StrokeUpdate};
use crate::error::{Error, Result};
use crate::observation::ObservationSlot;
use crate::overlay::{OverlayInput, OverlayRenderer};
use crate::pacing::{FpsCounter, FramePacer};
use crate::persist::SignatureSink;
use crate::recognizer::Recognizer;
use crate::types::{FrameBuffer, GestureCategory, GestureObservation};

/// Log a read miss at `warn` once every this many consecutive misses.
const MISS_WARN_EVERY: u32 = 30;

/// Reported by the worker to whoever owns the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Saved(PathBuf),
    /// The write failed; the stroke is still there for another try.
    SaveFailed(String),
    Stopped,
}

/// What one call to [`CaptureSession::process_frame`] decided.
#[derive(Debug)]
pub struct FrameOutcome {
    pub category: GestureCategory,
    pub distance: DistanceState,
    pub stroke: StrokeUpdate,
    pub gate: GateDecision,
    pub event: Option<SessionEvent>,
}

pub struct CaptureSession {
    drawing: DrawingStateMachine,
    gate: ConfirmGate,
    distance: DistanceValidator,
    overlay: OverlayRenderer,
    fps: FpsCounter,
}

impl CaptureSession {
    pub fn new(width: usize, height: usize, now: Instant) -> Self {
        Self {
            drawing: DrawingStateMachine::new(width, height),
            gate: ConfirmGate::new(),
            distance: DistanceValidator::new(),
            overlay: OverlayRenderer::new(),
            fps: FpsCounter::new(now),
        }
    }

    /// Run the whole pipeline for one frame, painting the result into `frame`.
    pub fn process_frame(
        &mut self,
        frame: &mut FrameBuffer,
        observation: Option<&GestureObservation>,
        thresholds: &Thresholds,
        developer_mode: bool,
        sink: &mut dyn SignatureSink,
        now: Instant,
    ) -> FrameOutcome {
        if self.drawing.resize(frame.width, frame.height) {
            // New capture geometry: nothing from the old frames carries over.
            self.gate.reset();
            self.distance.reset();
        }

        let category = observation.map_or(GestureCategory::None, |o| o.category);
        let distance = self.distance.check(observation, thresholds, now);
        let fingertip = observation
            .and_then(|o| o.index_tip())
            .map(|tip| tip.to_pixel(frame.width, frame.height));

        let stroke = self.drawing.apply(category, distance.is_valid(), fingertip);
        if stroke == StrokeUpdate::Cleared {
            self.gate.cancel_hold();
        }

        let gate = self.gate.evaluate(
            category,
            distance.is_valid(),
            self.drawing.point_count(),
            thresholds,
            now,
        );

        let event = if gate == GateDecision::Commit {
            Some(self.commit(sink, now))
        } else {
            None
        };
        self.gate.tick_cooldown();

        let fps = self.fps.tick(now);
        let input = OverlayInput {
            observation,
            developer_mode,
            category,
            drawing_active: self.drawing.is_drawing(),
            fingertip,
            point_count: self.drawing.point_count(),
            min_points: thresholds.min_points,
            gate,
            saved_banner: self.gate.saved_banner_visible(now),
            distance_warning: self.distance.active_warning(now),
            fps,
            closeness: self.distance.last_score(),
        };
        self.overlay.render(frame, self.drawing.canvas(), &input);

        FrameOutcome { category, distance, stroke, gate, event }
    }

    fn commit(&mut self, sink: &mut dyn SignatureSink, now: Instant) -> SessionEvent {
        let points = self.drawing.point_count();
        match sink.persist(self.drawing.canvas()) {
            Ok(path) => {
                info!(points, path = %path.display(), "signature committed");
                self.drawing.clear();
                self.gate.record_commit(now);
                SessionEvent::Saved(path)
            }
            Err(e) => {
                error!(points, error = %e, "signature commit failed; stroke kept");
                self.gate.record_failed_commit();
                SessionEvent::SaveFailed(e.to_string())
            }
        }
    }

    pub fn drawing(&self) -> &DrawingStateMachine {
        &self.drawing
    }

    pub fn gate(&self) -> &ConfirmGate {
        &self.gate
    }
}

/// Opens the frame source. Runs on the worker thread.
pub type SourceOpener = Arc<dyn Fn(&CaptureSettings) -> Result<Box<dyn FrameSource>> + Send + Sync>;
/// Builds the recognizer that will publish into the given slot.
pub type RecognizerFactory = Arc<dyn Fn(Arc<ObservationSlot>) -> Box<dyn Recognizer> + Send + Sync>;
/// Builds the persistence sink for a session.
pub type SinkFactory = Arc<dyn Fn() -> Box<dyn SignatureSink> + Send + Sync>;

/// External collaborators a session is assembled from.
#[derive(Clone)]
pub struct Collaborators {
    pub open_source: SourceOpener,
    pub recognizer: RecognizerFactory,
    pub sink: SinkFactory,
}

/// Everything the worker thread needs, moved in at spawn.
struct WorkerContext {
    capture: CaptureSettings,
    settings: Arc<SharedSettings>,
    slot: Arc<ObservationSlot>,
    mailbox: FrameMailbox,
    events: Sender<SessionEvent>,
    running: Arc<AtomicBool>,
    collaborators: Collaborators,
}

/// Owns the capture worker. Hand it (or a reference) to the UI.
pub struct SessionController {
    capture: CaptureSettings,
    settings: Arc<SharedSettings>,
    collaborators: Collaborators,
    slot: Arc<ObservationSlot>,
    mailbox: FrameMailbox,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(capture: CaptureSettings, settings: Arc<SharedSettings>, collaborators: Collaborators) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            capture,
            settings,
            collaborators,
            slot: Arc::new(ObservationSlot::new()),
            mailbox: FrameMailbox::new(),
            events_tx,
            events_rx,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    /// Open the source and start the loop. Returns the source's error if
    /// every fallback failed; in that case no loop runs.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        self.reap_finished_worker();
        self.capture.validate()?;

        self.slot.clear();
        self.running.store(true, Ordering::Release);

        let (ready_tx, ready_rx) = bounded::<Result<(u32, u32)>>(1);
        let ctx = WorkerContext {
            capture: self.capture,
            settings: Arc::clone(&self.settings),
            slot: Arc::clone(&self.slot),
            mailbox: self.mailbox.clone(),
            events: self.events_tx.clone(),
            running: Arc::clone(&self.running),
            collaborators: self.collaborators.clone(),
        };

        let handle = thread::Builder::new()
            .name("capture-worker".into())
            .spawn(move || {
                let source = match (ctx.collaborators.open_source)(&ctx.capture) {
                    Ok(source) => source,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(source.resolution()));
                run_capture_loop(source, ctx);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::Release);
                Error::Worker(format!("spawn capture thread: {e}"))
            })?;

        match ready_rx.recv() {
            Ok(Ok((w, h))) => {
                info!(camera = self.capture.camera_index, width = w, height = h, fps_cap = self.capture.fps_cap, "capture started");
                self.worker = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::Release);
                let _ = handle.join();
                error!(error = %e, "capture could not start");
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::Release);
                let _ = handle.join();
                Err(Error::Worker("capture thread exited during start".into()))
            }
        }
    }

    /// Ask the worker to finish and wait for it. Safe to call when stopped.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("capture worker panicked");
                self.mailbox.present(DisplayFrame::Empty);
            } else {
                info!("capture stopped");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Apply new capture settings, restarting only if a session was running.
    /// Invalid settings are rejected and the current ones kept.
    pub fn change_settings(
        &mut self,
        camera_index: Option<u32>,
        fps_cap: Option<u32>,
        resolution: Option<(u32, u32)>,
    ) -> Result<()> {
        let next = CaptureSettings {
            camera_index: camera_index.unwrap_or(self.capture.camera_index),
            fps_cap: fps_cap.unwrap_or(self.capture.fps_cap),
            resolution: resolution.unwrap_or(self.capture.resolution),
        };
        next.validate().inspect_err(|e| warn!("rejected capture settings: {e}"))?;

        let was_running = self.is_running();
        self.stop();
        self.capture = next;
        debug!(?next, "capture settings changed");
        if was_running {
            self.start()?;
        }
        Ok(())
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        self.capture
    }

    pub fn settings(&self) -> &Arc<SharedSettings> {
        &self.settings
    }

    pub fn mailbox(&self) -> FrameMailbox {
        self.mailbox.clone()
    }

    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    fn reap_finished_worker(&mut self) {
        if self.worker.as_ref().is_some_and(|h| h.is_finished()) {
            self.stop();
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_capture_loop(mut source: Box<dyn FrameSource>, ctx: WorkerContext) {
    let (w, h) = source.resolution();
    let started = Instant::now();
    let mut session = CaptureSession::new(w as usize, h as usize, started);
    let mut recognizer = (ctx.collaborators.recognizer)(Arc::clone(&ctx.slot));
    let mut sink = (ctx.collaborators.sink)();
    let mut pacer = FramePacer::new(ctx.capture.fps_cap);
    let mut last_timestamp: Option<u64> = None;
    let mut misses = 0u32;

    debug!(skip = pacer.skip(), "capture loop running");
    while ctx.running.load(Ordering::Acquire) {
        pacer.wait_for_next();

        let mut frame = match source.next_frame() {
            Ok(frame) => {
                misses = 0;
                frame
            }
            Err(e) => {
                misses += 1;
                if misses % MISS_WARN_EVERY == 1 {
                    warn!(misses, error = %e, "frame read missed");
                } else {
                    debug!(misses, error = %e, "frame read missed");
                }
                continue;
            }
        };
        mirror_horizontal(&mut frame);

        if pacer.should_submit() {
            // Recognizers want strictly increasing timestamps.
            let elapsed = started.elapsed().as_millis() as u64;
            let ts = last_timestamp.map_or(elapsed, |prev| elapsed.max(prev + 1));
            recognizer.submit(&frame, ts);
            last_timestamp = Some(ts);
        }

        let observation = ctx.slot.latest();
        let thresholds = ctx.settings.snapshot();
        let outcome = session.process_frame(
            &mut frame,
            observation.as_deref(),
            &thresholds,
            ctx.settings.developer_mode(),
            sink.as_mut(),
            Instant::now(),
        );
        if let Some(event) = outcome.event {
            let _ = ctx.events.send(event);
        }
        ctx.mailbox.present(DisplayFrame::Frame(frame));
    }

    // Release the camera and the recognizer before telling anyone we're done.
    drop(recognizer);
    drop(source);
    ctx.mailbox.present(DisplayFrame::Empty);
    let _ = ctx.events.send(SessionEvent::Stopped);
    debug!("capture loop exited");
}
