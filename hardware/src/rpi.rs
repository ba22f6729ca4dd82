//! HC-SR04 ultrasonic sensor, RGB LED and camera on the Raspberry Pi.

use async_trait::async_trait;
use rppal::gpio::{Gpio, InputPin, Level, OutputPin};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, error};

use crate::{Capability, Hardware, HardwareError, SignalColor};

const TRIG_PIN: u8 = 23;
const ECHO_PIN: u8 = 24;
const LED_RED_PIN: u8 = 17;
const LED_GREEN_PIN: u8 = 27;
const LED_BLUE_PIN: u8 = 22;

/// Bound for each echo phase so a disconnected sensor cannot hang a poll tick.
const ECHO_PHASE_TIMEOUT: Duration = Duration::from_millis(50);

/// pulse seconds -> centimeters (speed of sound / 2)
const CM_PER_PULSE_SECOND: f64 = 17150.0;

struct Pins {
    trig: OutputPin,
    echo: InputPin,
    red: OutputPin,
    green: OutputPin,
    blue: OutputPin,
}

pub struct RpiHardware {
    pins: Arc<Mutex<Pins>>,
}

impl RpiHardware {
    /// Open the GPIO pins. Fails when not running on a Pi or when another
    /// process holds the pins; the caller falls back to simulation.
    pub fn open() -> Result<Self, HardwareError> {
        let gpio = Gpio::new().map_err(|e| HardwareError::Gpio(e.to_string()))?;
        let get_out = |pin: u8| {
            gpio.get(pin)
                .map(|p| p.into_output_low())
                .map_err(|e| HardwareError::Gpio(format!("pin {pin}: {e}")))
        };
        let trig = get_out(TRIG_PIN)?;
        let echo = gpio
            .get(ECHO_PIN)
            .map(|p| p.into_input())
            .map_err(|e| HardwareError::Gpio(format!("pin {ECHO_PIN}: {e}")))?;
        let red = get_out(LED_RED_PIN)?;
        let green = get_out(LED_GREEN_PIN)?;
        let blue = get_out(LED_BLUE_PIN)?;
        Ok(Self {
            pins: Arc::new(Mutex::new(Pins {
                trig,
                echo,
                red,
                green,
                blue,
            })),
        })
    }

    fn apply_color(pins: &mut Pins, color: SignalColor) {
        let (r, g, b) = match color {
            SignalColor::Green => (false, true, false),
            SignalColor::Yellow => (true, true, false),
            SignalColor::Red => (true, false, false),
            SignalColor::Off => (false, false, false),
        };
        pins.red.write(if r { Level::High } else { Level::Low });
        pins.green.write(if g { Level::High } else { Level::Low });
        pins.blue.write(if b { Level::High } else { Level::Low });
    }
}

#[async_trait]
impl Hardware for RpiHardware {
    async fn measure_distance(&self) -> f64 {
        let pins = self.pins.clone();
        // Pulse timing busy-waits for up to 100 ms, so keep it off the
        // async workers.
        tokio::task::spawn_blocking(move || {
            let mut pins = match pins.lock() {
                Ok(pins) => pins,
                Err(_) => return -1.0,
            };
            pins.trig.set_high();
            std::thread::sleep(Duration::from_micros(10));
            pins.trig.set_low();

            let deadline = Instant::now() + ECHO_PHASE_TIMEOUT;
            while pins.echo.read() == Level::Low {
                if Instant::now() > deadline {
                    return -1.0;
                }
            }
            let pulse_start = Instant::now();
            let deadline = pulse_start + ECHO_PHASE_TIMEOUT;
            while pins.echo.read() == Level::High {
                if Instant::now() > deadline {
                    return -1.0;
                }
            }
            pulse_start.elapsed().as_secs_f64() * CM_PER_PULSE_SECOND
        })
        .await
        .unwrap_or(-1.0)
    }

    async fn set_signal(&self, color: SignalColor) {
        if let Ok(mut pins) = self.pins.lock() {
            Self::apply_color(&mut pins, color);
        }
    }

    async fn capture_still(&self, path: &Path) -> Result<(), HardwareError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HardwareError::Capture(e.to_string()))?;
        }
        let status = tokio::process::Command::new("rpicam-still")
            .arg("--nopreview")
            .args(["-t", "1"])
            .args(["--width", "1920"])
            .args(["--height", "1080"])
            .arg("-o")
            .arg(path)
            .status()
            .await
            .map_err(|e| HardwareError::Capture(e.to_string()))?;
        if !status.success() {
            return Err(HardwareError::Capture(format!(
                "rpicam-still exited with {status}"
            )));
        }
        debug!(path = %path.display(), "still captured");
        Ok(())
    }

    async fn release(&self) {
        match self.pins.lock() {
            Ok(mut pins) => Self::apply_color(&mut pins, SignalColor::Off),
            Err(_) => error!("gpio lock poisoned during release"),
        }
        debug!("gpio released");
    }

    fn capability(&self) -> Capability {
        Capability::real()
    }
}
