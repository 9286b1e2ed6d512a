//! V4L2 capture backend (feature `camera-v4l2`).
//!
//! Captures YUYV from the device and normalizes to the BGR24 frames the
//! pipeline consumes. The capture stream borrows the device handle, hence
//! the self-referencing state struct.

use anyhow::{Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use crate::camera::{CameraSettings, CameraStats};
use crate::frame::Frame;

pub(crate) struct DeviceCamera {
    settings: CameraSettings,
    state: Option<DeviceState>,
    frame_count: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceCamera {
    pub(crate) fn new(settings: CameraSettings) -> Result<Self> {
        Ok(Self {
            active_width: settings.width,
            active_height: settings.height,
            settings,
            state: None,
            frame_count: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.settings.name
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device = v4l::Device::with_path(&self.settings.path)
            .with_context(|| format!("open v4l2 device {}", self.settings.path))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.settings.width;
        format.height = self.settings.height;
        format.fourcc = v4l::FourCC::new(b"YUYV");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "camera '{}': failed to set format on {}: {}",
                    self.settings.name,
                    self.settings.path,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        if self.settings.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.settings.fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "camera '{}': failed to set fps on {}: {}",
                    self.settings.name,
                    self.settings.path,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "camera '{}': connected to {} ({}x{})",
            self.settings.name,
            self.settings.path,
            self.active_width,
            self.active_height
        );
        Ok(())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let (width, height) = (self.active_width, self.active_height);
        let bgr = state.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, _meta) = fields
                .stream
                .next()
                .map_err(|err| anyhow::Error::new(err).context("capture v4l2 frame"))?;
            yuyv_to_bgr(buf, width, height)
        });
        let bgr = match bgr {
            Ok(bgr) => bgr,
            Err(err) => {
                self.last_error = Some(err.to_string());
                return Err(err);
            }
        };

        self.frame_count += 1;
        self.last_frame_at = Some(Instant::now());
        Frame::from_bgr(bgr, width, height)
    }

    pub(crate) fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    pub(crate) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            path: self.settings.path.clone(),
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.settings.fps == 0 {
            2_000
        } else {
            (1000 / self.settings.fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}

/// YUYV 4:2:2 to packed BGR24 (BT.601 full range).
fn yuyv_to_bgr(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixels = (width as usize) * (height as usize);
    let expected = pixels * 2;
    if yuyv.len() < expected {
        anyhow::bail!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            yuyv.len()
        );
    }

    let mut bgr = vec![0u8; pixels * 3];
    for (i, chunk) in yuyv[..expected].chunks_exact(4).enumerate() {
        let [y0, u, y1, v] = [
            chunk[0] as f32,
            chunk[1] as f32 - 128.0,
            chunk[2] as f32,
            chunk[3] as f32 - 128.0,
        ];
        for (j, y) in [y0, y1].into_iter().enumerate() {
            let r = y + 1.402 * v;
            let g = y - 0.344_136 * u - 0.714_136 * v;
            let b = y + 1.772 * u;
            let offset = (i * 2 + j) * 3;
            bgr[offset] = clamp_to_u8(b);
            bgr[offset + 1] = clamp_to_u8(g);
            bgr[offset + 2] = clamp_to_u8(r);
        }
    }
    Ok(bgr)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuyv_grayscale_maps_to_equal_channels() {
        // Y=200, U=V=128 (no chroma): every channel 200.
        let yuyv = vec![200, 128, 200, 128];
        let bgr = yuyv_to_bgr(&yuyv, 2, 1).unwrap();
        assert_eq!(bgr, vec![200, 200, 200, 200, 200, 200]);
    }

    #[test]
    fn truncated_buffers_are_rejected() {
        assert!(yuyv_to_bgr(&[0u8; 7], 2, 2).is_err());
    }
}
