//! MQTT telemetry sink.
//!
//! Keys map directly to topics and every publish is retained at QoS 0, so
//! the broker behaves as a latest-value store: a consumer that subscribes
//! late immediately sees the current value of every key.
//!
//! Publishes go through `try_publish` - if the client's request queue is
//! full (broker down, link stalled) the value is dropped with a warning and
//! the frame loop keeps running. A background thread drives the event loop
//! and its automatic reconnects.

use anyhow::{anyhow, Context, Result};
use rumqttc::{Client, Connection, MqttOptions, QoS};
use std::thread::JoinHandle;
use std::time::Duration;

/// Broker connection settings.
#[derive(Clone, Debug)]
pub struct MqttSinkConfig {
    /// Broker address as host:port.
    pub broker_addr: String,
    /// Client identifier; per-daemon unique on the robot network.
    pub client_id: String,
}

impl MqttSinkConfig {
    fn split_addr(&self) -> Result<(String, u16)> {
        let (host, port) = self
            .broker_addr
            .rsplit_once(':')
            .ok_or_else(|| anyhow!("broker address '{}' missing port", self.broker_addr))?;
        let port: u16 = port
            .parse()
            .with_context(|| format!("broker address '{}' has invalid port", self.broker_addr))?;
        Ok((host.to_string(), port))
    }
}

/// Fire-and-forget MQTT publisher.
pub struct MqttSink {
    client: Client,
    _event_loop: JoinHandle<()>,
}

impl MqttSink {
    /// Create the client and spawn its event-loop thread. Connection
    /// failures are handled inside the loop (rumqttc reconnects), so this
    /// only fails on a malformed address.
    pub fn connect(config: &MqttSinkConfig) -> Result<Self> {
        let (host, port) = config.split_addr()?;
        let mut options = MqttOptions::new(&config.client_id, host, port);
        options.set_keep_alive(Duration::from_secs(5));

        let (client, connection) = Client::new(options, 64);
        let broker_addr = config.broker_addr.clone();
        let event_loop = std::thread::Builder::new()
            .name("mqtt-telemetry".to_string())
            .spawn(move || drive_connection(connection, broker_addr))
            .context("spawn mqtt event loop thread")?;

        Ok(Self {
            client,
            _event_loop: event_loop,
        })
    }

    fn publish(&self, key: &str, payload: String) {
        if let Err(err) = self
            .client
            .try_publish(key, QoS::AtMostOnce, true, payload)
        {
            log::warn!("telemetry publish dropped for '{}': {}", key, err);
        }
    }
}

impl super::TelemetrySink for MqttSink {
    fn publish_number(&self, key: &str, value: f64) {
        self.publish(key, format_number(value));
    }

    fn publish_text(&self, key: &str, value: &str) {
        self.publish(key, value.to_string());
    }
}

fn drive_connection(mut connection: Connection, broker_addr: String) {
    for event in connection.iter() {
        if let Err(err) = event {
            log::debug!("mqtt connection to {}: {}", broker_addr, err);
            std::thread::sleep(Duration::from_secs(1));
        }
    }
}

/// Numbers publish in a form that round-trips through f64 parsing and stays
/// readable on dashboards: integers without a trailing fraction.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
