use std::sync::Mutex;

use tempfile::NamedTempFile;

use linetrack::pipeline::segment;
use linetrack::VisionConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in ["LINETRACK_CONFIG", "LINETRACK_BROKER"] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_full_document() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "team": 5587,
            "ntmode": "client",
            "telemetry": {
                "broker": "10.55.87.2:1883"
            },
            "cameras": [
                {
                    "name": "Front Camera",
                    "path": "/dev/video0",
                    "pixel format": "mjpeg",
                    "width": 240,
                    "height": 320,
                    "fps": 30
                },
                {
                    "name": "Left Camera",
                    "path": "/dev/video1"
                },
                {
                    "name": "Right Camera",
                    "path": "/dev/video2"
                }
            ],
            "pipeline": {
                "minimum_area": 9000.0,
                "external_only": true,
                "constraints": {
                    "min_area": 150.0,
                    "min_perimeter": 100.0
                }
            }
        }"#,
    );

    let cfg = VisionConfig::load(file.path()).expect("load config");

    assert_eq!(cfg.team, 5587);
    assert!(!cfg.server_mode);
    assert_eq!(cfg.broker.as_deref(), Some("10.55.87.2:1883"));
    assert_eq!(cfg.cameras.len(), 3);
    assert_eq!(cfg.cameras[0].name, "Front Camera");
    assert_eq!(cfg.cameras[0].width, 240);
    assert_eq!(cfg.cameras[2].path, "/dev/video2");
    assert_eq!(cfg.pipeline.minimum_area(), 9000.0);
    assert!(cfg.pipeline.external_only);
    assert_eq!(cfg.pipeline.constraints.min_area, 150.0);

    clear_env();
}

#[test]
fn broker_env_override_wins() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "team": 1,
            "telemetry": {"broker": "10.0.0.1:1883"},
            "cameras": []
        }"#,
    );

    std::env::set_var("LINETRACK_BROKER", "192.168.1.50");
    let cfg = VisionConfig::load(file.path()).expect("load config");
    assert_eq!(cfg.broker.as_deref(), Some("192.168.1.50:1883"));

    clear_env();
}

#[test]
fn unset_pipeline_block_keeps_stock_tuning() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "team": 1,
            "cameras": [{"name": "Front Camera", "path": "stub://front"}]
        }"#,
    );

    let cfg = VisionConfig::load(file.path()).expect("load config");
    // Reference frame 240x320 puts the derived area gate at (320/3)^2.
    assert_eq!(cfg.pipeline.minimum_area(), 106.0 * 106.0);
    assert!(!cfg.pipeline.external_only);
    assert_eq!(cfg.pipeline.constraints.max_ratio, 1000.0);
    // Stock HSV range is independent of the config document.
    assert_eq!(segment::VALUE_MIN_DEFAULT, 232.0);

    clear_env();
}

#[test]
fn malformed_json_reports_the_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config("{not json");
    let err = VisionConfig::load(file.path()).expect_err("load should fail");
    assert!(
        err.to_string().contains(&file.path().display().to_string()),
        "{}",
        err
    );

    clear_env();
}
