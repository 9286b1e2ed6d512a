//! Single-target line detection.
//!
//! The detector turns the filtered contour set for one frame into exactly one
//! `DetectionResult`: a real measurement when there is a single usable
//! candidate, the documented default otherwise. It never fails - every input,
//! including an empty list, maps to a well-defined result.
//!
//! A minimum-area rectangle's angle is only defined modulo 180 degrees, so a
//! line's reported heading would flip as it crosses the frame's vertical
//! midline. The quadrant rule re-maps the angle into a signed range that is
//! continuous across the frame, which is what a line-following controller
//! wants; the remaining discontinuity sits exactly on the reference-frame
//! boundary.

use serde::Deserialize;

use crate::pipeline::contours::Contour;
use crate::pipeline::geometry::{min_area_rect, OrientedBox};

/// Classification of a point within the fixed reference frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quadrant {
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

/// Reference frame the quadrant classification runs against. Matches the
/// camera's portrait capture resolution in the reference deployment.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReferenceFrame {
    pub width: u32,
    pub height: u32,
}

pub const REFERENCE_WIDTH_DEFAULT: u32 = 240;
pub const REFERENCE_HEIGHT_DEFAULT: u32 = 320;

impl Default for ReferenceFrame {
    fn default() -> Self {
        Self {
            width: REFERENCE_WIDTH_DEFAULT,
            height: REFERENCE_HEIGHT_DEFAULT,
        }
    }
}

impl ReferenceFrame {
    /// Classify a point. Both midlines are inclusive: a point exactly on the
    /// horizontal or vertical midline counts as upper / left.
    pub fn quadrant(&self, x: f64, y: f64) -> Quadrant {
        let is_upper = y <= (self.height / 2) as f64;
        let is_left = x <= (self.width / 2) as f64;
        match (is_upper, is_left) {
            (true, true) => Quadrant::UpperLeft,
            (true, false) => Quadrant::UpperRight,
            (false, true) => Quadrant::LowerLeft,
            (false, false) => Quadrant::LowerRight,
        }
    }

    /// Final acceptance gate for forming a detection: the square of a third
    /// of the reference height.
    pub fn default_minimum_area(&self) -> f64 {
        let third = (self.height / 3) as f64;
        third * third
    }
}

/// Per-frame line measurement, published to telemetry and then dropped.
///
/// Either a genuine measurement or the all-zero default - never both, never
/// neither. `contour_count` always reports the filtered candidate count, even
/// when the detection itself fell through to the default.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DetectionResult {
    pub contour_count: usize,
    pub area: f64,
    pub angle: f64,
    pub center_x: f64,
    pub center_y: f64,
    /// Seconds since session start, stamped by the session driver.
    pub elapsed_seconds: f64,
}

impl DetectionResult {
    /// The no-detection default for a frame with `contour_count` candidates.
    pub fn none(contour_count: usize) -> Self {
        Self {
            contour_count,
            ..Self::default()
        }
    }

    /// True when this result carries a real measurement.
    pub fn is_detection(&self) -> bool {
        self.area > 0.0
    }
}

/// Selects a single usable contour and derives the line geometry from it.
#[derive(Clone, Copy, Debug)]
pub struct LineDetector {
    minimum_area: f64,
    reference: ReferenceFrame,
}

impl LineDetector {
    pub fn new(minimum_area: f64, reference: ReferenceFrame) -> Self {
        Self {
            minimum_area,
            reference,
        }
    }

    pub fn minimum_area(&self) -> f64 {
        self.minimum_area
    }

    /// Map the frame's filtered candidate set to its DetectionResult.
    ///
    /// Zero candidates or more than one (ambiguous - no multi-candidate
    /// disambiguation is attempted) yield the default result. A single
    /// candidate whose rotated rectangle is smaller than the minimum area
    /// also falls through to the default, still reporting one contour.
    pub fn detect(&self, candidates: &[Contour]) -> DetectionResult {
        let [contour] = candidates else {
            return DetectionResult::none(candidates.len());
        };

        let rect = min_area_rect(contour);
        let area = rect.area();
        if area < self.minimum_area {
            return DetectionResult::none(1);
        }

        // Center comes from the integer bounding rect of the rotated
        // rectangle, with truncating halves. The quadrant rule below sees
        // these integer coordinates, so a center on a midline classifies
        // the same way on every frame.
        let (center_x, center_y) = integer_center(&rect);

        // Reference the angle to the long axis regardless of which side the
        // rectangle computation labeled width.
        let mut angle = rect.angle;
        if rect.width < rect.height {
            angle += 90.0;
        }

        match self.reference.quadrant(center_x, center_y) {
            Quadrant::UpperLeft | Quadrant::UpperRight => {}
            Quadrant::LowerLeft => {
                if angle > 0.0 {
                    angle -= 180.0;
                }
            }
            Quadrant::LowerRight => {
                if angle < 0.0 {
                    angle += 180.0;
                }
            }
        }

        DetectionResult {
            contour_count: 1,
            area,
            angle,
            center_x,
            center_y,
            elapsed_seconds: 0.0,
        }
    }
}

/// Center of the integer bounding rect enclosing the rotated rectangle,
/// with integer-division halves.
fn integer_center(rect: &OrientedBox) -> (f64, f64) {
    let corners = rect.corners();
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for (x, y) in corners {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let x = lattice_floor(min_x);
    let y = lattice_floor(min_y);
    let width = lattice_ceil(max_x) - x + 1;
    let height = lattice_ceil(max_y) - y + 1;
    ((x + width / 2) as f64, (y + height / 2) as f64)
}

// Rectangle corners for lattice contours sit on integer coordinates up to
// float error; snap within a tolerance so floor/ceil cannot jump a pixel.
const LATTICE_EPS: f64 = 1e-6;

fn lattice_floor(v: f64) -> i64 {
    (v + LATTICE_EPS).floor() as i64
}

fn lattice_ceil(v: f64) -> i64 {
    (v - LATTICE_EPS).ceil() as i64
}
