//! The line-detection pipeline.
//!
//! One frame flows through four stages:
//!
//! 1. `segment`: HSV threshold -> binary mask
//! 2. `contours`: boundary extraction -> contour list
//! 3. `filter`: geometric constraints -> candidate contours
//! 4. `detect`: single-target selection -> `DetectionResult`
//!
//! A `LinePipeline` owns the per-camera stage parameters and is driven by a
//! `CameraLineSession`, once per delivered frame. Stages share nothing across
//! frames; the only cross-frame inputs are the tuning snapshot taken by the
//! caller and the immutable constraint set.

pub mod contours;
pub mod detect;
pub mod filter;
pub mod geometry;
pub mod segment;

use serde::Deserialize;

use crate::frame::Frame;
pub use contours::{find_contours, Contour};
pub use detect::{DetectionResult, LineDetector, Quadrant, ReferenceFrame};
pub use filter::{filter_contours, ShapeConstraints};
pub use geometry::{OrientedBox, Point};
pub use segment::{bgr_to_hsv, hsv_threshold, ColorRange};

/// Per-camera pipeline parameters, resolved from configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    pub constraints: ShapeConstraints,
    pub reference: ReferenceFrame,
    /// Final acceptance gate for the rotated-rectangle area. When absent,
    /// derived from the reference frame (a third of its height, squared).
    pub minimum_area: Option<f64>,
    /// Return only outermost region boundaries from contour extraction.
    pub external_only: bool,
}

impl PipelineSettings {
    pub fn minimum_area(&self) -> f64 {
        self.minimum_area
            .unwrap_or_else(|| self.reference.default_minimum_area())
    }
}

/// One camera's line-detection pipeline.
#[derive(Clone, Copy, Debug)]
pub struct LinePipeline {
    constraints: ShapeConstraints,
    external_only: bool,
    detector: LineDetector,
}

impl LinePipeline {
    pub fn new(settings: &PipelineSettings) -> Self {
        Self {
            constraints: settings.constraints,
            external_only: settings.external_only,
            detector: LineDetector::new(settings.minimum_area(), settings.reference),
        }
    }

    pub fn detector(&self) -> &LineDetector {
        &self.detector
    }

    /// Run all four stages on one frame.
    ///
    /// Always produces exactly one result. A malformed (empty) frame takes
    /// the same path as any other: empty mask, zero contours, default result.
    pub fn process(&self, frame: &Frame, range: &ColorRange) -> DetectionResult {
        let mask = hsv_threshold(frame, range);
        let contours = find_contours(&mask, self.external_only);
        let candidates = filter_contours(&contours, &self.constraints);
        self.detector.detect(&candidates)
    }
}
