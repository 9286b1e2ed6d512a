//! HSV color segmentation.
//!
//! Converts each BGR pixel to hue/saturation/value and marks it foreground
//! when all three channels fall inside the configured closed intervals.
//! Hue uses the half-degree scale (0-180) so a full ColorRange fits in u8
//! arithmetic; saturation and value are 0-255.

use crate::frame::{Frame, Mask};
use crate::telemetry::{keys, TelemetryTable};

/// Shuffleboard fallback defaults: a white tape line on a dark floor is
/// low-saturation and near-maximum value at any hue.
pub const HUE_MIN_DEFAULT: f64 = 0.0;
pub const HUE_MAX_DEFAULT: f64 = 180.0;
pub const SATURATION_MIN_DEFAULT: f64 = 0.0;
pub const SATURATION_MAX_DEFAULT: f64 = 146.0;
pub const VALUE_MIN_DEFAULT: f64 = 232.0;
pub const VALUE_MAX_DEFAULT: f64 = 255.0;

/// Inclusive per-channel HSV intervals.
///
/// Operators retune these at runtime; a session snapshots the range once per
/// frame, so a concurrent update shifts which frame it applies to but never
/// changes mid-frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorRange {
    pub hue: (f64, f64),
    pub saturation: (f64, f64),
    pub value: (f64, f64),
}

impl Default for ColorRange {
    fn default() -> Self {
        Self {
            hue: (HUE_MIN_DEFAULT, HUE_MAX_DEFAULT),
            saturation: (SATURATION_MIN_DEFAULT, SATURATION_MAX_DEFAULT),
            value: (VALUE_MIN_DEFAULT, VALUE_MAX_DEFAULT),
        }
    }
}

impl ColorRange {
    /// Read the six tuning entries from the telemetry table, falling back to
    /// the documented defaults for absent entries.
    pub fn snapshot(table: &TelemetryTable) -> Self {
        Self {
            hue: (
                table.number_or(keys::HUE_MIN, HUE_MIN_DEFAULT),
                table.number_or(keys::HUE_MAX, HUE_MAX_DEFAULT),
            ),
            saturation: (
                table.number_or(keys::SATURATION_MIN, SATURATION_MIN_DEFAULT),
                table.number_or(keys::SATURATION_MAX, SATURATION_MAX_DEFAULT),
            ),
            value: (
                table.number_or(keys::VALUE_MIN, VALUE_MIN_DEFAULT),
                table.number_or(keys::VALUE_MAX, VALUE_MAX_DEFAULT),
            ),
        }
    }

    #[inline]
    fn contains(&self, h: f64, s: f64, v: f64) -> bool {
        h >= self.hue.0
            && h <= self.hue.1
            && s >= self.saturation.0
            && s <= self.saturation.1
            && v >= self.value.0
            && v <= self.value.1
    }
}

/// Convert one BGR pixel to (hue 0-180, saturation 0-255, value 0-255).
pub fn bgr_to_hsv(bgr: [u8; 3]) -> (f64, f64, f64) {
    let b = bgr[0] as f64;
    let g = bgr[1] as f64;
    let r = bgr[2] as f64;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { 255.0 * delta / max };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let h = if h < 0.0 { h + 360.0 } else { h };

    ((h / 2.0).round(), s.round(), v)
}

/// Produce the binary mask of pixels whose HSV channels all fall inside
/// `range`. A zero-sized frame yields a zero-sized mask.
pub fn hsv_threshold(frame: &Frame, range: &ColorRange) -> Mask {
    if frame.is_empty() {
        return Mask::empty();
    }

    let mut mask = Mask::zeroed(frame.width(), frame.height());
    for y in 0..frame.height() {
        for x in 0..frame.width() {
            let (h, s, v) = bgr_to_hsv(frame.bgr(x, y));
            if range.contains(h, s, v) {
                mask.set(x, y);
            }
        }
    }
    mask
}
