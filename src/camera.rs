//! Camera frame sources.
//!
//! `UsbCamera` fronts one physical (or synthetic) camera:
//! - `stub://` device paths select a synthetic backend that paints a white
//!   tape line on a dark floor - used by tests and bench deployments.
//! - `/dev/video*` paths use the V4L2 backend (feature `camera-v4l2`).
//!
//! Frame acquisition is the pipeline's only suspension point: `next_frame`
//! paces capture to the configured rate and is called from the session's
//! dedicated worker thread. A capture failure affects only that frame; the
//! session simply asks for the next one.

#[cfg(feature = "camera-v4l2")]
mod v4l2;

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::frame::Frame;

/// Resolved settings for one camera, derived from its config-file descriptor.
#[derive(Clone, Debug)]
pub struct CameraSettings {
    /// Display name from the camera document (e.g. "Front Camera").
    pub name: String,
    /// Device path (e.g. "/dev/video0") or a `stub://` identifier.
    pub path: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            name: "Camera".to_string(),
            path: "stub://camera".to_string(),
            width: 240,
            height: 320,
            fps: 30,
        }
    }
}

/// Capture statistics for health logging.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub path: String,
}

/// One camera, synthetic or V4L2-backed.
pub struct UsbCamera {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "camera-v4l2")]
    Device(v4l2::DeviceCamera),
}

impl UsbCamera {
    pub fn new(settings: CameraSettings) -> Result<Self> {
        if settings.path.starts_with("stub://") {
            Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCamera::new(settings)),
            })
        } else {
            #[cfg(feature = "camera-v4l2")]
            {
                Ok(Self {
                    backend: CameraBackend::Device(v4l2::DeviceCamera::new(settings)?),
                })
            }
            #[cfg(not(feature = "camera-v4l2"))]
            {
                anyhow::bail!(
                    "camera path '{}' requires the camera-v4l2 feature",
                    settings.path
                )
            }
        }
    }

    /// Open the device and start streaming.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.connect(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.connect(),
        }
    }

    /// Capture the next frame, pacing to the configured frame rate.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.next_frame(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.next_frame(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(_) => true,
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.is_healthy(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.stats(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.stats(),
        }
    }

    pub fn name(&self) -> &str {
        match &self.backend {
            CameraBackend::Synthetic(camera) => &camera.settings.name,
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.name(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://)
// ----------------------------------------------------------------------------

const FLOOR_LEVEL: u8 = 40;
// Wide enough that a full-width band clears the detector's default
// minimum-area gate at the default 240x320 capture size.
const LINE_HALF_WIDTH: f64 = 30.0;

/// Deterministic painted-line scene with sensor-like noise.
///
/// Each frame shows a dark floor and one bright white band through the frame
/// center whose heading drifts slowly over time, so a running pipeline sees
/// a moving line without any hardware attached.
struct SyntheticCamera {
    settings: CameraSettings,
    frame_count: u64,
    last_frame_at: Option<Instant>,
}

impl SyntheticCamera {
    fn new(settings: CameraSettings) -> Self {
        Self {
            settings,
            frame_count: 0,
            last_frame_at: None,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "camera '{}': connected to {} (synthetic, {}x{} @ {} fps)",
            self.settings.name,
            self.settings.path,
            self.settings.width,
            self.settings.height,
            self.settings.fps
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        self.pace();
        self.frame_count += 1;

        let width = self.settings.width;
        let height = self.settings.height;
        let mut data = vec![0u8; (width as usize) * (height as usize) * 3];

        // Line through the frame center; heading drifts ~0.5 deg per frame.
        let theta = (self.frame_count as f64 * 0.5).to_radians();
        let (sin, cos) = theta.sin_cos();
        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;

        for y in 0..height {
            for x in 0..width {
                // Signed distance from the pixel to the line.
                let dist = ((x as f64 - cx) * cos - (y as f64 - cy) * sin).abs();
                let level = if dist <= LINE_HALF_WIDTH {
                    255
                } else {
                    // Dark floor with a little per-pixel noise.
                    FLOOR_LEVEL.saturating_add(rand::random::<u8>() % 8)
                };
                let i = ((y * width + x) * 3) as usize;
                data[i] = level;
                data[i + 1] = level;
                data[i + 2] = level;
            }
        }

        self.last_frame_at = Some(Instant::now());
        Frame::from_bgr(data, width, height)
    }

    /// Sleep out the remainder of the frame interval.
    fn pace(&self) {
        let Some(last) = self.last_frame_at else {
            return;
        };
        if self.settings.fps == 0 {
            return;
        }
        let interval = Duration::from_secs(1) / self.settings.fps;
        let elapsed = last.elapsed();
        if elapsed < interval {
            std::thread::sleep(interval - elapsed);
        }
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            path: self.settings.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ColorRange, LinePipeline, PipelineSettings};

    fn stub_settings() -> CameraSettings {
        CameraSettings {
            name: "Front Camera".to_string(),
            path: "stub://front".to_string(),
            width: 240,
            height: 320,
            fps: 0, // no pacing in tests
        }
    }

    #[test]
    fn synthetic_camera_produces_frames() -> Result<()> {
        let mut camera = UsbCamera::new(stub_settings())?;
        camera.connect()?;
        let frame = camera.next_frame()?;
        assert_eq!(frame.width(), 240);
        assert_eq!(frame.height(), 320);
        assert!(camera.is_healthy());
        assert_eq!(camera.stats().frames_captured, 1);
        Ok(())
    }

    #[test]
    fn synthetic_line_is_detectable_with_default_tuning() -> Result<()> {
        let mut camera = UsbCamera::new(stub_settings())?;
        camera.connect()?;
        let frame = camera.next_frame()?;

        let pipeline = LinePipeline::new(&PipelineSettings::default());
        let result = pipeline.process(&frame, &ColorRange::default());
        assert_eq!(result.contour_count, 1);
        assert!(result.is_detection());
        Ok(())
    }

    #[cfg(not(feature = "camera-v4l2"))]
    #[test]
    fn device_paths_require_the_v4l2_feature() {
        let settings = CameraSettings {
            path: "/dev/video0".to_string(),
            ..stub_settings()
        };
        assert!(UsbCamera::new(settings).is_err());
    }
}
