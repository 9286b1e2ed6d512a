//! line_tune - operator console for the line sensor.
//!
//! Reads and writes the retained telemetry the daemon consumes:
//! - `set` pushes an HSV tuning range to the broker; every camera picks it
//!   up on its next frame.
//! - `show` prints the retained line pose values for one camera position.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rumqttc::{Client, Connection, Event, Incoming, MqttOptions, QoS};
use std::time::Duration;

use linetrack::pipeline::segment;
use linetrack::telemetry::keys;
use linetrack::CameraPosition;

const ACK_TIMEOUT: Duration = Duration::from_secs(10);
const LISTEN_WINDOW: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(author, version, about = "Tune and inspect the line sensor over MQTT")]
struct Args {
    /// MQTT broker address.
    #[arg(long, env = "LINETRACK_BROKER", default_value = "127.0.0.1:1883")]
    broker: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish an HSV tuning range as retained values.
    Set {
        #[arg(long, default_value_t = segment::HUE_MIN_DEFAULT)]
        hue_min: f64,
        #[arg(long, default_value_t = segment::HUE_MAX_DEFAULT)]
        hue_max: f64,
        #[arg(long, default_value_t = segment::SATURATION_MIN_DEFAULT)]
        saturation_min: f64,
        #[arg(long, default_value_t = segment::SATURATION_MAX_DEFAULT)]
        saturation_max: f64,
        #[arg(long, default_value_t = segment::VALUE_MIN_DEFAULT)]
        value_min: f64,
        #[arg(long, default_value_t = segment::VALUE_MAX_DEFAULT)]
        value_max: f64,
    },
    /// Print retained line pose telemetry for one camera position.
    Show {
        /// Camera position: front, left, or right.
        #[arg(value_parser = parse_position)]
        position: CameraPosition,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let (host, port) = split_addr(&args.broker)?;
    let mut options = MqttOptions::new("line_tune", host, port);
    options.set_keep_alive(Duration::from_secs(5));
    let (client, connection) = Client::new(options, 16);

    match args.command {
        Command::Set {
            hue_min,
            hue_max,
            saturation_min,
            saturation_max,
            value_min,
            value_max,
        } => {
            let values = [
                (keys::HUE_MIN, hue_min),
                (keys::HUE_MAX, hue_max),
                (keys::SATURATION_MIN, saturation_min),
                (keys::SATURATION_MAX, saturation_max),
                (keys::VALUE_MIN, value_min),
                (keys::VALUE_MAX, value_max),
            ];
            set_tuning(&client, connection, &values)?;
            for (key, value) in values {
                println!("{} = {}", key, value);
            }
        }
        Command::Show { position } => show_position(&client, connection, position)?,
    }
    Ok(())
}

/// Publish each value retained at QoS 1 and wait for the broker to ack all
/// of them, so the values survive this process exiting.
fn set_tuning(client: &Client, mut connection: Connection, values: &[(&str, f64)]) -> Result<()> {
    for (key, value) in values {
        client
            .publish(*key, QoS::AtLeastOnce, true, value.to_string())
            .with_context(|| format!("queueing publish for {}", key))?;
    }

    let mut pending = values.len();
    let deadline = std::time::Instant::now() + ACK_TIMEOUT;
    while pending > 0 {
        let remaining = deadline
            .checked_duration_since(std::time::Instant::now())
            .ok_or_else(|| anyhow!("timed out waiting for broker acks ({} pending)", pending))?;
        match connection.recv_timeout(remaining) {
            Ok(Ok(Event::Incoming(Incoming::PubAck(_)))) => pending -= 1,
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(anyhow!("mqtt connection error: {}", err)),
            Err(_) => return Err(anyhow!("timed out waiting for broker acks ({} pending)", pending)),
        }
    }
    client.disconnect().context("disconnecting")?;
    // Drain the remaining events so the disconnect actually goes out.
    for event in connection.iter() {
        if event.is_err() {
            break;
        }
    }
    Ok(())
}

/// Subscribe to one camera's namespace and print whatever retained values
/// arrive within the listen window.
fn show_position(client: &Client, mut connection: Connection, position: CameraPosition) -> Result<()> {
    let filter = format!("vision/{}/#", position.key());
    client
        .subscribe(&filter, QoS::AtMostOnce)
        .with_context(|| format!("subscribing to {}", filter))?;

    let mut seen = 0usize;
    let deadline = std::time::Instant::now() + LISTEN_WINDOW;
    loop {
        let Some(remaining) = deadline.checked_duration_since(std::time::Instant::now()) else {
            break;
        };
        match connection.recv_timeout(remaining) {
            Ok(Ok(Event::Incoming(Incoming::Publish(publish)))) => {
                let payload = String::from_utf8_lossy(&publish.payload);
                println!("{} = {}", publish.topic, payload);
                seen += 1;
            }
            Ok(Ok(_)) => {}
            Ok(Err(err)) => return Err(anyhow!("mqtt connection error: {}", err)),
            Err(_) => break,
        }
    }
    if seen == 0 {
        println!("no retained telemetry for '{}'; is linetrackd running?", position.key());
    }
    let _ = client.disconnect();
    Ok(())
}

fn parse_position(value: &str) -> Result<CameraPosition, String> {
    CameraPosition::ALL
        .into_iter()
        .find(|p| p.key().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("expected one of: front, left, right (got '{}')", value))
}

fn split_addr(addr: &str) -> Result<(String, u16)> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| anyhow!("broker address '{}' must be host:port", addr))?;
    let port: u16 = port
        .parse()
        .with_context(|| format!("invalid broker port in '{}'", addr))?;
    Ok((host.to_string(), port))
}
