//! Line-following vision co-processor.
//!
//! This crate implements the onboard sensor that turns camera frames into
//! line pose telemetry for a drive controller.
//!
//! # Pipeline
//!
//! Every frame passes through four stages in order:
//!
//! 1. **Segment**: HSV thresholding selects line-colored pixels into a mask.
//! 2. **Contours**: boundary tracing extracts closed outlines from the mask.
//! 3. **Filter**: geometric gates discard outlines that cannot be the line.
//! 4. **Detect**: exactly one surviving candidate yields area, angle, and
//!    center; anything else reports no detection.
//!
//! # Module Structure
//!
//! - `frame`: BGR frame and binary mask buffers
//! - `pipeline`: the four processing stages plus supporting geometry
//! - `camera`: capture backends (V4L2 devices, `stub://` synthetic)
//! - `session`: one worker thread per camera position
//! - `telemetry`: latest-value store and MQTT publishing
//! - `config`: the `/boot/frc.json` document
//! - `ranging`: HC-SR04 ultrasonic distance supplement

pub mod camera;
pub mod config;
pub mod frame;
pub mod pipeline;
pub mod ranging;
pub mod session;
pub mod telemetry;

pub use camera::{CameraSettings, UsbCamera};
pub use config::VisionConfig;
pub use frame::{Frame, Mask};
pub use pipeline::{
    ColorRange, DetectionResult, LineDetector, LinePipeline, PipelineSettings, Quadrant,
};
pub use session::{CameraLineSession, CameraPosition};
pub use telemetry::{FanoutSink, TelemetrySink, TelemetryTable};
