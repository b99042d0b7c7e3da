// Opens a camera and converts frames into a buffer suitable for the window.
// `next_frame()` hands back a Vec<u32> where each pixel is 0x00RRGGBB.
//
// Opening walks a fallback chain: the requested device on the platform's
// native backend, the same device with automatic backend selection, then the
// default device. Only when all of them fail is the session start refused.

use crate::error::Error;
use crate::types::FrameBuffer;

/// Anything the capture loop can pull frames from.
pub trait FrameSource {
    /// Block until the next frame is available. An error is a transient miss.
    fn next_frame(&mut self) -> Result<FrameBuffer, Error>;

    /// Size the source is actually delivering.
    fn resolution(&self) -> (u32, u32);
}

impl FrameSource for Box<dyn FrameSource> {
    fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        (**self).next_frame()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }
}

/// Flip left/right in place so the preview behaves like a mirror.
pub fn mirror_horizontal(frame: &mut FrameBuffer) {
    if frame.width == 0 {
        return;
    }
    for row in frame.pixels.chunks_exact_mut(frame.width) {
        row.reverse();
    }
}

#[cfg(feature = "camera")]
pub use self::nokhwa_capture::CameraCapture;

#[cfg(feature = "camera")]
mod nokhwa_capture {
    use super::FrameSource;
    use crate::error::Error;
    use crate::types::FrameBuffer;

    use nokhwa::{
        Camera,
        pixel_format::RgbFormat,
        utils::{
            ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat,
            RequestedFormatType, Resolution,
        },
    };
    use tracing::{info, warn};

    // A small wrapper around nokhwa::Camera so the capture loop stays clean.
    pub struct CameraCapture {
        cam: Camera,
        width: u32,
        height: u32,
    }

    /// One rung of the fallback ladder.
    struct Attempt {
        index: u32,
        backend: ApiBackend,
        format: RequestedFormatType,
        label: &'static str,
    }

    impl CameraCapture {
        /// Open `index` near `width`x`height` at `fps`, falling back as needed.
        pub fn open(index: u32, width: u32, height: u32, fps: u32) -> Result<Self, Error> {
            let wanted = |frame_format| {
                RequestedFormatType::Closest(CameraFormat::new(
                    Resolution::new(width, height),
                    frame_format,
                    fps,
                ))
            };
            let native = nokhwa::native_api_backend().unwrap_or(ApiBackend::Auto);

            let mut ladder = vec![
                Attempt { index, backend: native, format: wanted(FrameFormat::MJPEG), label: "native backend" },
                Attempt { index, backend: ApiBackend::Auto, format: wanted(FrameFormat::YUYV), label: "auto backend" },
            ];
            if index != 0 {
                ladder.push(Attempt {
                    index: 0,
                    backend: ApiBackend::Auto,
                    format: RequestedFormatType::AbsoluteHighestFrameRate,
                    label: "default device",
                });
            }

            let mut last_err = String::from("no attempts made");
            for attempt in ladder {
                info!(index = attempt.index, via = attempt.label, "opening camera");
                match Self::try_open(attempt.index, attempt.backend, attempt.format) {
                    Ok(cap) => {
                        info!(width = cap.width, height = cap.height, "camera opened");
                        return Ok(cap);
                    }
                    Err(e) => {
                        warn!(index = attempt.index, via = attempt.label, error = %e, "camera open failed");
                        last_err = e.to_string();
                    }
                }
            }
            Err(Error::CameraInit(format!("all camera fallbacks failed; last error: {last_err}")))
        }

        fn try_open(index: u32, backend: ApiBackend, format: RequestedFormatType) -> Result<Self, Error> {
            let req = RequestedFormat::new::<RgbFormat>(format);

            // This might fail if no device exists or it is busy.
            let mut cam = Camera::with_backend(CameraIndex::Index(index), req, backend)
                .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;

            cam.open_stream()
                .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

            // The actual stream might choose a slightly different resolution.
            let actual = cam.resolution();
            Ok(Self { cam, width: actual.width(), height: actual.height() })
        }
    }

    impl FrameSource for CameraCapture {
        /// Grab one frame and convert it to 0x00RRGGBB pixels.
        fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
            // Blocks until the driver delivers (or times out).
            let frame = self
                .cam
                .frame()
                .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

            // Decode to an ImageBuffer<Rgb<u8>, Vec<u8>> (handles MJPEG/YUYV alike).
            let rgb_img = frame
                .decode_image::<RgbFormat>()
                .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

            let (w, h) = rgb_img.dimensions();
            let pixels = rgb_img
                .pixels()
                .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
                .collect();

            Ok(FrameBuffer { width: w as usize, height: h as usize, pixels })
        }

        fn resolution(&self) -> (u32, u32) {
            (self.width, self.height)
        }
    }

    impl Drop for CameraCapture {
        fn drop(&mut self) {
            if let Err(e) = self.cam.stop_stream() {
                warn!(error = %e, "camera stream did not stop cleanly");
            }
        }
    }
}
