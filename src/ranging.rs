//! HC-SR04 ultrasonic ranging.
//!
//! The sensor is driven through the `RangePins` trait so the measurement
//! logic stays testable off-robot; the real GPIO binding lives behind it.
//! Protocol: hold the trigger high for 10 microseconds, then time the echo
//! pulse. Distance in centimetres is `pulse_us * speed_of_sound / (2 * 1e4)`.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

/// Speed of sound at room temperature, metres per second.
const SOUND_SPEED_M_PER_S: f32 = 340.29;

const TRIGGER_PULSE: Duration = Duration::from_micros(10);

/// Polling budget for each echo edge. The sensor's maximum range answers
/// well inside this; running out means a wiring or sensor fault.
const EDGE_TIMEOUT_POLLS: u32 = 2100;

/// Hardware access needed by the monitor: one output trigger line and one
/// input echo line.
pub trait RangePins {
    fn set_trigger(&mut self, high: bool);
    fn echo_is_high(&mut self) -> bool;
}

pub struct DistanceMonitor<P: RangePins> {
    pins: P,
}

impl<P: RangePins> DistanceMonitor<P> {
    pub fn new(pins: P) -> Self {
        Self { pins }
    }

    /// Fire one ping and return the distance in centimetres.
    pub fn measure_distance(&mut self) -> Result<f32> {
        self.pins.set_trigger(true);
        spin_for(TRIGGER_PULSE);
        self.pins.set_trigger(false);

        wait_for_edge(&mut self.pins, true)
            .ok_or_else(|| anyhow!("Timeout waiting for signal start"))?;
        let echo_start = Instant::now();
        wait_for_edge(&mut self.pins, false)
            .ok_or_else(|| anyhow!("Timeout waiting for signal end"))?;

        let pulse_us = echo_start.elapsed().as_micros() as f32;
        Ok(pulse_us * SOUND_SPEED_M_PER_S / (2.0 * 1.0e4))
    }
}

fn wait_for_edge<P: RangePins>(pins: &mut P, level: bool) -> Option<()> {
    let mut countdown = EDGE_TIMEOUT_POLLS;
    while pins.echo_is_high() != level {
        countdown -= 1;
        if countdown == 0 {
            return None;
        }
    }
    Some(())
}

fn spin_for(duration: Duration) {
    // std::thread::sleep overshoots badly at microsecond scale.
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted pin behavior: echo goes high after `high_after` polls and
    /// drops after `low_after` further polls.
    struct ScriptedPins {
        polls: u32,
        high_after: Option<u32>,
        low_after: Option<u32>,
        trigger_pulses: u32,
        trigger_high: bool,
    }

    impl ScriptedPins {
        fn new(high_after: Option<u32>, low_after: Option<u32>) -> Self {
            Self {
                polls: 0,
                high_after,
                low_after,
                trigger_pulses: 0,
                trigger_high: false,
            }
        }
    }

    impl RangePins for ScriptedPins {
        fn set_trigger(&mut self, high: bool) {
            if high && !self.trigger_high {
                self.trigger_pulses += 1;
            }
            self.trigger_high = high;
        }

        fn echo_is_high(&mut self) -> bool {
            self.polls += 1;
            let Some(high_after) = self.high_after else {
                return false;
            };
            if self.polls <= high_after {
                return false;
            }
            match self.low_after {
                Some(low_after) => self.polls <= high_after + low_after,
                None => true,
            }
        }
    }

    #[test]
    fn measures_a_short_pulse() {
        let pins = ScriptedPins::new(Some(3), Some(50));
        let mut monitor = DistanceMonitor::new(pins);
        let distance = monitor.measure_distance().unwrap();
        // Pulse width is wall-clock time over ~50 polls: small but positive.
        assert!(distance >= 0.0);
        assert!(distance < 50.0, "implausible distance {}", distance);
        assert_eq!(monitor.pins.trigger_pulses, 1);
    }

    #[test]
    fn echo_never_starting_times_out() {
        let pins = ScriptedPins::new(None, None);
        let mut monitor = DistanceMonitor::new(pins);
        let err = monitor.measure_distance().unwrap_err();
        assert_eq!(err.to_string(), "Timeout waiting for signal start");
    }

    #[test]
    fn echo_never_ending_times_out() {
        let pins = ScriptedPins::new(Some(1), None);
        let mut monitor = DistanceMonitor::new(pins);
        let err = monitor.measure_distance().unwrap_err();
        assert_eq!(err.to_string(), "Timeout waiting for signal end");
    }

    #[test]
    fn conversion_constant_matches_round_trip_arithmetic() {
        // 1000 us round trip at 340.29 m/s is about 17 cm.
        let cm = 1000.0 * SOUND_SPEED_M_PER_S / (2.0 * 1.0e4);
        assert!((cm - 17.0145).abs() < 1e-3);
    }
}
