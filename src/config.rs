//! Configuration document loader.
//!
//! The daemon reads a single JSON document (by convention `/boot/frc.json`)
//! describing the team, the telemetry mode, and the camera list. Parsing is
//! permissive; resolution into `VisionConfig` is where errors become fatal.
//! A config the daemon cannot act on stops startup rather than running with
//! guessed values.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;

use crate::camera::CameraSettings;
use crate::pipeline::PipelineSettings;

pub const DEFAULT_CONFIG_PATH: &str = "/boot/frc.json";

const DEFAULT_BROKER_PORT: u16 = 1883;

/// Raw document shape. Unknown camera properties (brightness, white balance,
/// stream blocks) are carried as opaque values so a file shared with other
/// tools round-trips without complaint.
#[derive(Debug, Deserialize, Default)]
struct VisionConfigFile {
    team: Option<u32>,
    ntmode: Option<String>,
    telemetry: Option<TelemetryConfigFile>,
    cameras: Option<Vec<CameraConfigFile>>,
    pipeline: Option<PipelineSettings>,
}

#[derive(Debug, Deserialize, Default)]
struct TelemetryConfigFile {
    broker: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    name: Option<String>,
    path: Option<String>,
    #[serde(rename = "pixel format")]
    pixel_format: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    fps: Option<u32>,
    brightness: Option<serde_json::Value>,
    #[serde(rename = "white balance")]
    white_balance: Option<serde_json::Value>,
    exposure: Option<serde_json::Value>,
    properties: Option<serde_json::Value>,
    stream: Option<serde_json::Value>,
}

/// Resolved, validated configuration.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub team: u32,
    /// True when this process hosts the telemetry store itself instead of
    /// publishing to an external broker.
    pub server_mode: bool,
    /// Broker address, `host:port`. None in server mode without a broker.
    pub broker: Option<String>,
    pub cameras: Vec<CameraSettings>,
    pub pipeline: PipelineSettings,
}

impl VisionConfig {
    /// Load and resolve the document at `path`, then apply env overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let file = read_config_file(path)?;
        let mut cfg = Self::from_file(file)
            .map_err(|e| anyhow!("config error in '{}': {}", path.display(), e))?;
        cfg.apply_env();
        Ok(cfg)
    }

    fn from_file(file: VisionConfigFile) -> Result<Self> {
        let team = file.team.ok_or_else(|| anyhow!("could not read team number"))?;

        let server_mode = match file.ntmode.as_deref() {
            None => false,
            Some(mode) if mode.eq_ignore_ascii_case("client") => false,
            Some(mode) if mode.eq_ignore_ascii_case("server") => true,
            Some(other) => return Err(anyhow!("could not understand ntmode value '{}'", other)),
        };

        let broker = file
            .telemetry
            .and_then(|t| t.broker)
            .map(|b| normalize_broker(&b));

        let camera_files = file
            .cameras
            .ok_or_else(|| anyhow!("could not read cameras"))?;
        let mut cameras = Vec::with_capacity(camera_files.len());
        for (index, camera) in camera_files.into_iter().enumerate() {
            cameras.push(
                resolve_camera(camera)
                    .map_err(|e| anyhow!("camera entry {}: {}", index, e))?,
            );
        }

        Ok(Self {
            team,
            server_mode,
            broker,
            cameras,
            pipeline: file.pipeline.unwrap_or_default(),
        })
    }

    fn apply_env(&mut self) {
        if let Ok(broker) = std::env::var("LINETRACK_BROKER") {
            if !broker.trim().is_empty() {
                self.broker = Some(normalize_broker(broker.trim()));
            }
        }
    }
}

fn resolve_camera(file: CameraConfigFile) -> Result<CameraSettings> {
    // The extra v4l properties are accepted but applied by the camera
    // backend, not here; only name and path are mandatory.
    let _ = (
        file.pixel_format,
        file.brightness,
        file.white_balance,
        file.exposure,
        file.properties,
        file.stream,
    );
    let defaults = CameraSettings::default();
    Ok(CameraSettings {
        name: file
            .name
            .ok_or_else(|| anyhow!("could not read camera name"))?,
        path: file
            .path
            .ok_or_else(|| anyhow!("could not read camera path"))?,
        width: file.width.unwrap_or(defaults.width),
        height: file.height.unwrap_or(defaults.height),
        fps: file.fps.unwrap_or(defaults.fps),
    })
}

fn read_config_file(path: &Path) -> Result<VisionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("could not open '{}': {}", path.display(), e))?;
    serde_json::from_str(&raw)
        .map_err(|e| anyhow!("config error in '{}': {}", path.display(), e))
}

fn normalize_broker(value: &str) -> String {
    if value.contains(':') {
        value.to_string()
    } else {
        format!("{}:{}", value, DEFAULT_BROKER_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_client_config() {
        let file = write_config(
            r#"{
                "team": 5587,
                "ntmode": "client",
                "cameras": [
                    {"name": "Front Camera", "path": "/dev/video0"}
                ]
            }"#,
        );
        let cfg = VisionConfig::load(file.path()).unwrap();
        assert_eq!(cfg.team, 5587);
        assert!(!cfg.server_mode);
        assert_eq!(cfg.broker, None);
        assert_eq!(cfg.cameras.len(), 1);
        assert_eq!(cfg.cameras[0].name, "Front Camera");
        assert_eq!(cfg.cameras[0].path, "/dev/video0");
        // Unset dimensions fall back to the pipeline reference frame.
        assert_eq!(cfg.cameras[0].width, CameraSettings::default().width);
    }

    #[test]
    fn ntmode_is_case_insensitive_and_validated() {
        let server = write_config(
            r#"{"team": 1, "ntmode": "SERVER", "cameras": []}"#,
        );
        assert!(VisionConfig::load(server.path()).unwrap().server_mode);

        let bogus = write_config(
            r#"{"team": 1, "ntmode": "peer", "cameras": []}"#,
        );
        let err = VisionConfig::load(bogus.path()).unwrap_err();
        assert!(err.to_string().contains("ntmode"), "{}", err);
    }

    #[test]
    fn missing_team_is_fatal() {
        let file = write_config(r#"{"cameras": []}"#);
        let err = VisionConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("team"), "{}", err);
    }

    #[test]
    fn missing_cameras_is_fatal() {
        let file = write_config(r#"{"team": 1}"#);
        let err = VisionConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("cameras"), "{}", err);
    }

    #[test]
    fn camera_without_path_is_fatal() {
        let file = write_config(
            r#"{"team": 1, "cameras": [{"name": "Front Camera"}]}"#,
        );
        let err = VisionConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("camera path"), "{}", err);
    }

    #[test]
    fn extra_v4l_properties_are_tolerated() {
        let file = write_config(
            r#"{
                "team": 5587,
                "cameras": [{
                    "name": "Front Camera",
                    "path": "/dev/video0",
                    "pixel format": "mjpeg",
                    "width": 160,
                    "height": 120,
                    "fps": 15,
                    "brightness": 50,
                    "white balance": "auto",
                    "exposure": "auto",
                    "properties": [],
                    "stream": {"properties": []}
                }]
            }"#,
        );
        let cfg = VisionConfig::load(file.path()).unwrap();
        assert_eq!(cfg.cameras[0].width, 160);
        assert_eq!(cfg.cameras[0].fps, 15);
    }

    #[test]
    fn broker_gains_default_port() {
        let file = write_config(
            r#"{
                "team": 1,
                "telemetry": {"broker": "10.55.87.2"},
                "cameras": []
            }"#,
        );
        let cfg = VisionConfig::load(file.path()).unwrap();
        assert_eq!(cfg.broker.as_deref(), Some("10.55.87.2:1883"));
    }

    #[test]
    fn pipeline_block_overrides_defaults() {
        let file = write_config(
            r#"{
                "team": 1,
                "cameras": [],
                "pipeline": {"minimum_area": 500.0, "external_only": true}
            }"#,
        );
        let cfg = VisionConfig::load(file.path()).unwrap();
        assert_eq!(cfg.pipeline.minimum_area(), 500.0);
        assert!(cfg.pipeline.external_only);
    }
}
