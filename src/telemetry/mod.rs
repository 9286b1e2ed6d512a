//! Telemetry publication and the operator tuning channel.
//!
//! The motion controller consumes a latest-value key/value store: every
//! frame overwrites the previous values, nothing is a log. Publishing is
//! fire-and-forget by contract - a slow or absent consumer must never block
//! frame processing, so the sink trait is infallible and implementations
//! drop on backpressure.
//!
//! - `TelemetryTable`: in-process store. Always present; doubles as the
//!   tuning channel the segmenter snapshots its HSV range from.
//! - `MqttSink` (`mqtt` submodule): retained publishes to the robot's broker.
//! - `FanoutSink`: composite over any number of sinks.

pub mod mqtt;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::session::CameraPosition;

pub use mqtt::{MqttSink, MqttSinkConfig};

/// Latest-value telemetry sink. Implementations must not block the caller;
/// on sink unavailability the value is dropped and the frame loop continues.
pub trait TelemetrySink: Send + Sync {
    fn publish_number(&self, key: &str, value: f64);
    fn publish_text(&self, key: &str, value: &str);
}

/// Key namespace. One sub-tree per camera position plus the shared HSV
/// tuning entries.
pub mod keys {
    use super::CameraPosition;

    pub const HUE_MIN: &str = "vision/hsv/hue_min";
    pub const HUE_MAX: &str = "vision/hsv/hue_max";
    pub const SATURATION_MIN: &str = "vision/hsv/saturation_min";
    pub const SATURATION_MAX: &str = "vision/hsv/saturation_max";
    pub const VALUE_MIN: &str = "vision/hsv/value_min";
    pub const VALUE_MAX: &str = "vision/hsv/value_max";

    /// The six tuning entries, in hue/saturation/value min-max order.
    pub const HSV_ENTRIES: [&str; 6] = [
        HUE_MIN,
        HUE_MAX,
        SATURATION_MIN,
        SATURATION_MAX,
        VALUE_MIN,
        VALUE_MAX,
    ];

    pub fn camera_name(position: CameraPosition) -> String {
        format!("vision/{}/camera_name", position.key())
    }

    pub fn line_contours(position: CameraPosition) -> String {
        format!("vision/{}/line_contours", position.key())
    }

    pub fn line_area(position: CameraPosition) -> String {
        format!("vision/{}/line_area", position.key())
    }

    pub fn line_angle(position: CameraPosition) -> String {
        format!("vision/{}/line_angle", position.key())
    }

    pub fn line_center_x(position: CameraPosition) -> String {
        format!("vision/{}/line_center_x", position.key())
    }

    pub fn line_center_y(position: CameraPosition) -> String {
        format!("vision/{}/line_center_y", position.key())
    }

    pub fn elapsed_seconds(position: CameraPosition) -> String {
        format!("vision/{}/elapsed_seconds", position.key())
    }
}

#[derive(Clone, Debug)]
enum Value {
    Number(f64),
    Text(String),
}

/// In-process latest-value store.
///
/// Shared between sessions (writers) and the tuning channel (operator
/// writes, per-frame reads). Lock scope is one key access; a reader may see
/// a value change between frames but never within one.
#[derive(Default)]
pub struct TelemetryTable {
    values: RwLock<HashMap<String, Value>>,
}

impl TelemetryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish_number(&self, key: &str, value: f64) {
        // A poisoned lock means a writer panicked mid-insert; telemetry is
        // best-effort, so drop the update rather than propagate.
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), Value::Number(value));
        }
    }

    pub fn publish_text(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), Value::Text(value.to_string()));
        }
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        match self.values.read().ok()?.get(key)? {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    /// Numeric entry with a fallback default for absent (or non-numeric)
    /// entries - the tuning-channel read primitive.
    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.get_number(key).unwrap_or(default)
    }

    pub fn get_text(&self, key: &str) -> Option<String> {
        match self.values.read().ok()?.get(key)? {
            Value::Text(s) => Some(s.clone()),
            Value::Number(_) => None,
        }
    }
}

impl TelemetrySink for TelemetryTable {
    fn publish_number(&self, key: &str, value: f64) {
        TelemetryTable::publish_number(self, key, value);
    }

    fn publish_text(&self, key: &str, value: &str) {
        TelemetryTable::publish_text(self, key, value);
    }
}

/// Publishes to every wrapped sink in order.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }
}

impl TelemetrySink for FanoutSink {
    fn publish_number(&self, key: &str, value: f64) {
        for sink in &self.sinks {
            sink.publish_number(key, value);
        }
    }

    fn publish_text(&self, key: &str, value: &str) {
        for sink in &self.sinks {
            sink.publish_text(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_latest_value_not_a_log() {
        let table = TelemetryTable::new();
        table.publish_number("vision/front/line_area", 100.0);
        table.publish_number("vision/front/line_area", 250.0);
        assert_eq!(table.get_number("vision/front/line_area"), Some(250.0));
    }

    #[test]
    fn absent_entries_fall_back() {
        let table = TelemetryTable::new();
        assert_eq!(table.number_or("vision/hsv/hue_min", 0.0), 0.0);
        table.publish_number("vision/hsv/hue_min", 15.0);
        assert_eq!(table.number_or("vision/hsv/hue_min", 0.0), 15.0);
    }

    #[test]
    fn text_and_number_namespaces_do_not_cross() {
        let table = TelemetryTable::new();
        table.publish_text("vision/front/camera_name", "Front Camera");
        assert_eq!(table.get_number("vision/front/camera_name"), None);
        assert_eq!(
            table.get_text("vision/front/camera_name").as_deref(),
            Some("Front Camera")
        );
    }

    #[test]
    fn fanout_reaches_all_sinks() {
        let a = Arc::new(TelemetryTable::new());
        let b = Arc::new(TelemetryTable::new());
        let fanout = FanoutSink::new(vec![a.clone(), b.clone()]);
        fanout.publish_number("k", 7.0);
        assert_eq!(a.get_number("k"), Some(7.0));
        assert_eq!(b.get_number("k"), Some(7.0));
    }

    #[test]
    fn keys_are_namespaced_per_position() {
        assert_eq!(
            keys::line_area(CameraPosition::Front),
            "vision/front/line_area"
        );
        assert_eq!(
            keys::line_angle(CameraPosition::Right),
            "vision/right/line_angle"
        );
    }
}
