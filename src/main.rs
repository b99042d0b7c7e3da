// What you SEE:
// • The mirrored camera feed with your signature drawn over it in green.
// • The simulated hand follows the mouse; the gesture comes from the keyboard:
//     hold Left Mouse = pointing up (draws), hold U = thumbs up (save after the hold),
//     hold X = thumbs down (clear), nothing held = hand without a gesture.
//   [ / ] move the hand closer / further (watch the distance warning).
// • Space starts/stops capture, D toggles developer mode, R resets thresholds.
// • ESC quits.

use std::sync::Arc;
use std::time::Duration;

use airsign::camera::FrameSource;
use airsign::cli::AppArgs;
use airsign::config::{CaptureSettings, SharedSettings};
use airsign::display::DisplayFrame;
use airsign::draw::Drawer;
use airsign::observation::ObservationSlot;
use airsign::persist::{PngSignatureStore, SignatureSink};
use airsign::recognizer::{Recognizer, SharedSimHand, SimHand, SimRecognizer};
use airsign::session::{Collaborators, SessionController, SessionEvent};
use airsign::types::GestureCategory;
use anyhow::Context;
use clap::Parser;
use minifb::Key;
use parking_lot::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How far one [ or ] press moves the simulated hand in depth units.
const DEPTH_STEP: f32 = 0.01;

fn main() -> anyhow::Result<()> {
    let args = AppArgs::parse();
    init_logging(args.debug);

    let settings = Arc::new(
        SharedSettings::try_new(args.thresholds(), args.developer_mode)
            .context("invalid signature thresholds")?,
    );
    let capture = args.capture_settings();
    capture.validate().context("invalid capture settings")?;

    let hand: SharedSimHand = Arc::new(Mutex::new(SimHand::default()));
    let collaborators = collaborators(&args, Arc::clone(&hand));
    let mut controller = SessionController::new(capture, Arc::clone(&settings), collaborators);

    let (w, h) = capture.resolution;
    let mut drawer = Drawer::new("Air Signature", w as usize, h as usize)?;

    if let Err(e) = controller.start() {
        // Window stays up; Space retries.
        error!("{e}");
    }
    let mailbox = controller.mailbox();
    let events = controller.events();

    /* ------------------------------ UI loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        update_sim_hand(&drawer, &hand);

        if drawer.key_pressed_once(Key::Space) {
            if controller.is_running() {
                controller.stop();
            } else if let Err(e) = controller.start() {
                error!("{e}");
            }
        }
        if drawer.key_pressed_once(Key::D) {
            let on = settings.toggle_developer_mode();
            info!(on, "developer mode");
        }
        if drawer.key_pressed_once(Key::R) {
            settings.reset_defaults();
        }

        match mailbox.recv_timeout(Duration::from_millis(16)) {
            Some(DisplayFrame::Frame(frame)) => drawer.present(&frame)?,
            Some(DisplayFrame::Empty) => drawer.present_blank()?,
            None => drawer.pump(),
        }

        for event in events.try_iter() {
            match event {
                SessionEvent::Saved(path) => info!(path = %path.display(), "saved"),
                SessionEvent::SaveFailed(reason) => warn!(%reason, "save failed, hold thumbs-up again to retry"),
                SessionEvent::Stopped => info!("capture session ended"),
            }
        }
    }

    controller.stop();
    Ok(())
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn collaborators(args: &AppArgs, hand: SharedSimHand) -> Collaborators {
    let latency = Duration::from_millis(args.recognizer_latency_ms);
    let output_dir = args.output_dir.clone();
    Collaborators {
        open_source: Arc::new(open_camera),
        recognizer: Arc::new(move |slot: Arc<ObservationSlot>| {
            Box::new(SimRecognizer::spawn(Arc::clone(&hand), slot, latency)) as Box<dyn Recognizer>
        }),
        sink: Arc::new(move || Box::new(PngSignatureStore::new(output_dir.clone())) as Box<dyn SignatureSink>),
    }
}

#[cfg(feature = "camera")]
fn open_camera(capture: &CaptureSettings) -> airsign::Result<Box<dyn FrameSource>> {
    let (w, h) = capture.resolution;
    let cam = airsign::camera::CameraCapture::open(capture.camera_index, w, h, capture.fps_cap)?;
    Ok(Box::new(cam))
}

#[cfg(not(feature = "camera"))]
fn open_camera(_capture: &CaptureSettings) -> airsign::Result<Box<dyn FrameSource>> {
    Err(airsign::Error::CameraInit("built without the `camera` feature".into()))
}

/// Mouse + keys -> the simulated recognizer's input.
fn update_sim_hand(drawer: &Drawer, hand: &SharedSimHand) {
    let category = if drawer.key_down(Key::X) {
        GestureCategory::ThumbDown
    } else if drawer.key_down(Key::U) {
        GestureCategory::ThumbUp
    } else if drawer.left_mouse_down() {
        GestureCategory::PointingUp
    } else {
        GestureCategory::None
    };

    let mut h = hand.lock();
    if drawer.key_pressed_once(Key::LeftBracket) {
        h.depth += DEPTH_STEP;
    }
    if drawer.key_pressed_once(Key::RightBracket) {
        h.depth -= DEPTH_STEP;
    }
    h.depth = h.depth.clamp(0.0, 1.0);
    h.pointer = drawer.mouse_pos_normalized();
    h.category = category;
}
