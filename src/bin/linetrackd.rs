//! linetrackd - line-following vision daemon.
//!
//! This daemon:
//! 1. Reads the camera/telemetry document (default `/boot/frc.json`)
//! 2. Opens one capture backend per configured camera
//! 3. Runs the segment/contours/filter/detect pipeline per camera thread
//! 4. Publishes line pose telemetry to the latest-value store and MQTT

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use linetrack::telemetry::mqtt::{MqttSink, MqttSinkConfig};
use linetrack::{
    config, CameraLineSession, CameraPosition, FanoutSink, LinePipeline, TelemetrySink,
    TelemetryTable, UsbCamera, VisionConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Line-following vision co-processor daemon")]
struct Args {
    /// Path to the JSON configuration document.
    #[arg(env = "LINETRACK_CONFIG", default_value = config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = VisionConfig::load(&args.config)?;
    log::info!(
        "team {}, {} mode, {} camera(s), minimum line area {}",
        cfg.team,
        if cfg.server_mode { "server" } else { "client" },
        cfg.cameras.len(),
        cfg.pipeline.minimum_area()
    );

    let table = Arc::new(TelemetryTable::new());
    let sink = build_sink(&cfg, table.clone())?;

    let running = Arc::new(AtomicBool::new(true));
    let ctrlc_flag = running.clone();
    ctrlc::set_handler(move || {
        ctrlc_flag.store(false, Ordering::Relaxed);
    })
    .context("error setting Ctrl-C handler")?;

    let mut handles = Vec::new();
    for (index, settings) in cfg.cameras.iter().enumerate() {
        let Some(position) = CameraPosition::ALL.get(index).copied() else {
            log::warn!(
                "ignoring extra camera '{}': only {} positions available",
                settings.name,
                CameraPosition::ALL.len()
            );
            continue;
        };
        let mut camera = UsbCamera::new(settings.clone())?;
        camera
            .connect()
            .with_context(|| format!("connecting camera '{}'", settings.name))?;
        let session = CameraLineSession::new(
            position,
            camera,
            LinePipeline::new(&cfg.pipeline),
            table.clone(),
            sink.clone(),
        );
        handles.push(session.spawn(running.clone())?);
    }

    if handles.is_empty() {
        log::warn!("no cameras started; daemon idle until shutdown");
    }

    while running.load(Ordering::Relaxed) {
        std::thread::sleep(std::time::Duration::from_millis(200));
    }
    log::info!("shutdown signal received, stopping sessions...");
    for handle in handles {
        let _ = handle.join();
    }

    Ok(())
}

/// The local table always receives results; a configured broker is mirrored
/// alongside it so operators see the same values the daemon acts on.
fn build_sink(cfg: &VisionConfig, table: Arc<TelemetryTable>) -> Result<Arc<dyn TelemetrySink>> {
    let Some(broker) = cfg.broker.as_deref() else {
        log::info!("no telemetry broker configured; publishing to local table only");
        return Ok(table);
    };
    let mqtt = MqttSink::connect(&MqttSinkConfig {
        broker_addr: broker.to_string(),
        client_id: format!("linetrackd-{}", cfg.team),
    })?;
    log::info!("mirroring telemetry to mqtt broker {}", broker);
    Ok(Arc::new(FanoutSink::new(vec![table, Arc::new(mqtt)])))
}
