//! Pixel containers shared by the capture and pipeline layers.
//!
//! - `Frame`: packed BGR24 color frame as delivered by a camera source.
//! - `Mask`: single-channel binary image produced by HSV segmentation.
//!
//! Both are plain owned buffers. A frame is consumed by exactly one pipeline
//! run and dropped; nothing in the pipeline retains pixel data across frames.

use anyhow::{anyhow, Result};

/// Packed BGR24 color frame.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap an owned BGR24 buffer. The buffer length must be width * height * 3.
    pub fn from_bgr(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "BGR frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Zero-sized frame, used to represent a failed or absent capture.
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// BGR triple at (x, y). Caller guarantees x < width, y < height.
    #[inline]
    pub fn bgr(&self, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * self.width + x) * 3) as usize;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Single-channel binary mask. Foreground pixels are 255, background 0.
#[derive(Clone, Debug)]
pub struct Mask {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Mask {
    pub fn zeroed(width: u32, height: u32) -> Self {
        Self {
            data: vec![0u8; (width as usize) * (height as usize)],
            width,
            height,
        }
    }

    /// Empty mask for a zero-sized input frame.
    pub fn empty() -> Self {
        Self::zeroed(0, 0)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// True when (x, y) is inside the mask and a foreground pixel.
    #[inline]
    pub fn is_set(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return false;
        }
        self.data[(y as u32 * self.width + x as u32) as usize] != 0
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32) {
        self.data[(y * self.width + x) as usize] = 255;
    }

    /// Count of foreground pixels. Used by tests and health logging.
    pub fn foreground_count(&self) -> usize {
        self.data.iter().filter(|&&p| p != 0).count()
    }
}
