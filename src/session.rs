//! Per-camera session driver.
//!
//! Each `CameraLineSession` owns one camera, one pipeline, and one handle to
//! the telemetry sink, and runs on its own worker thread. Sessions share no
//! mutable state with each other; the only cross-thread inputs are the
//! tuning table (snapshot-read once per frame) and the shutdown flag.
//!
//! Within a session, results publish in capture order. Across sessions there
//! is no ordering guarantee.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::camera::UsbCamera;
use crate::pipeline::{ColorRange, DetectionResult, LinePipeline};
use crate::telemetry::{keys, TelemetrySink, TelemetryTable};

/// Logical mount position of a camera. Dispatch on position is mutually
/// exclusive: a detection publishes to exactly one namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraPosition {
    Front,
    Left,
    Right,
}

impl CameraPosition {
    /// Positions in camera-document order: the first configured camera is
    /// Front, then Left, then Right.
    pub const ALL: [CameraPosition; 3] = [
        CameraPosition::Front,
        CameraPosition::Left,
        CameraPosition::Right,
    ];

    /// Telemetry namespace segment.
    pub fn key(self) -> &'static str {
        match self {
            CameraPosition::Front => "front",
            CameraPosition::Left => "left",
            CameraPosition::Right => "right",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CameraPosition::Front => "Front",
            CameraPosition::Left => "Left",
            CameraPosition::Right => "Right",
        }
    }
}

impl std::fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

/// Drives one camera's pipeline at the camera's native frame rate.
pub struct CameraLineSession {
    position: CameraPosition,
    camera: UsbCamera,
    pipeline: LinePipeline,
    tuning: Arc<TelemetryTable>,
    sink: Arc<dyn TelemetrySink>,
}

impl CameraLineSession {
    pub fn new(
        position: CameraPosition,
        camera: UsbCamera,
        pipeline: LinePipeline,
        tuning: Arc<TelemetryTable>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            position,
            camera,
            pipeline,
            tuning,
            sink,
        }
    }

    /// Spawn the session's worker thread. The loop exits when `running`
    /// clears; a session never exits on per-frame anomalies.
    pub fn spawn(self, running: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
        let name = format!("line-session-{}", self.position.key());
        std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || self.run(running))
            .with_context(|| format!("spawn session thread {}", name))
    }

    fn run(mut self, running: Arc<AtomicBool>) {
        let position = self.position;
        let started = Instant::now();
        let mut last_health_log = Instant::now();

        self.sink.publish_text(
            &keys::camera_name(position),
            &format!("{} Camera", position.label()),
        );
        log::info!(
            "{}: session running (camera '{}', minimum area {})",
            position,
            self.camera.name(),
            self.pipeline.detector().minimum_area()
        );

        while running.load(Ordering::Relaxed) {
            let frame = match self.camera.next_frame() {
                Ok(frame) => frame,
                Err(err) => {
                    // One bad frame is not a session failure; keep attempting.
                    log::warn!("{}: frame capture failed: {}", position, err);
                    std::thread::sleep(Duration::from_millis(100));
                    continue;
                }
            };

            // Snapshot tuning once per frame: an operator update lands
            // between frames, never inside one.
            let range = ColorRange::snapshot(&self.tuning);

            let mut result = self.pipeline.process(&frame, &range);
            result.elapsed_seconds = started.elapsed().as_secs_f64();
            self.publish(&result);

            if result.is_detection() {
                log::debug!(
                    "{}: line detected at ({:.1}, {:.1}) angle {:.1} area {:.0} ({:.3}s)",
                    position,
                    result.center_x,
                    result.center_y,
                    result.angle,
                    result.area,
                    result.elapsed_seconds
                );
            }

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                let stats = self.camera.stats();
                log::info!(
                    "{}: health={} frames={} path={}",
                    position,
                    self.camera.is_healthy(),
                    stats.frames_captured,
                    stats.path
                );
                last_health_log = Instant::now();
            }
        }

        log::info!("{}: session stopped", position);
    }

    /// Publish one frame's result to this camera's namespace. Exactly one
    /// result goes out per processed frame.
    fn publish(&self, result: &DetectionResult) {
        let position = self.position;
        self.sink
            .publish_number(&keys::line_contours(position), result.contour_count as f64);
        self.sink
            .publish_number(&keys::line_area(position), result.area);
        self.sink
            .publish_number(&keys::line_angle(position), result.angle);
        self.sink
            .publish_number(&keys::line_center_x(position), result.center_x);
        self.sink
            .publish_number(&keys::line_center_y(position), result.center_y);
        self.sink
            .publish_number(&keys::elapsed_seconds(position), result.elapsed_seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSettings;
    use crate::pipeline::PipelineSettings;

    fn stub_session(position: CameraPosition, table: Arc<TelemetryTable>) -> CameraLineSession {
        let settings = CameraSettings {
            name: format!("{} Camera", position.label()),
            path: format!("stub://{}", position.key()),
            fps: 0,
            ..CameraSettings::default()
        };
        let camera = UsbCamera::new(settings).unwrap();
        CameraLineSession::new(
            position,
            camera,
            LinePipeline::new(&PipelineSettings::default()),
            table.clone(),
            table,
        )
    }

    #[test]
    fn session_publishes_all_keys_then_stops() {
        let table = Arc::new(TelemetryTable::new());
        let session = stub_session(CameraPosition::Front, table.clone());

        let running = Arc::new(AtomicBool::new(true));
        let handle = session.spawn(running.clone()).unwrap();

        // Wait for the first full publish.
        let deadline = Instant::now() + Duration::from_secs(5);
        while table
            .get_number(&keys::elapsed_seconds(CameraPosition::Front))
            .is_none()
        {
            assert!(Instant::now() < deadline, "session never published");
            std::thread::sleep(Duration::from_millis(10));
        }

        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();

        for key in [
            keys::line_contours(CameraPosition::Front),
            keys::line_area(CameraPosition::Front),
            keys::line_angle(CameraPosition::Front),
            keys::line_center_x(CameraPosition::Front),
            keys::line_center_y(CameraPosition::Front),
        ] {
            assert!(table.get_number(&key).is_some(), "missing {}", key);
        }
        assert_eq!(
            table
                .get_text(&keys::camera_name(CameraPosition::Front))
                .as_deref(),
            Some("Front Camera")
        );
        // The synthetic line is a single candidate.
        assert_eq!(
            table.get_number(&keys::line_contours(CameraPosition::Front)),
            Some(1.0)
        );
    }

    #[test]
    fn sessions_use_disjoint_namespaces() {
        let keys_front = keys::line_area(CameraPosition::Front);
        let keys_left = keys::line_area(CameraPosition::Left);
        assert_ne!(keys_front, keys_left);
    }
}
