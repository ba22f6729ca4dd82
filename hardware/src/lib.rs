//! Distance sensing, LED signaling and still capture, real or simulated.
//!
//! The [`Hardware`] trait is the pipeline's only view of the physical world.
//! [`probe`] selects one of two concrete implementations exactly once at
//! startup: [`SimulatedHardware`] everywhere, or `RpiHardware` when the crate
//! is built with the `rpi` feature and the GPIO opens successfully.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::info;
#[cfg(feature = "rpi")]
use tracing::warn;

mod simulated;
#[cfg(feature = "rpi")]
mod rpi;

pub use simulated::SimulatedHardware;
#[cfg(feature = "rpi")]
pub use rpi::RpiHardware;

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("capture failed: {0}")]
    Capture(String),
    #[error("gpio unavailable: {0}")]
    Gpio(String),
}

/// RGB LED states used by the warning cue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignalColor {
    Green,
    Yellow,
    Red,
    Off,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backing {
    Real,
    Simulated,
}

/// What each capability is backed by; fixed for the process lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capability {
    pub distance: Backing,
    pub signal: Backing,
    pub capture: Backing,
}

impl Capability {
    pub const fn simulated() -> Self {
        Self {
            distance: Backing::Simulated,
            signal: Backing::Simulated,
            capture: Backing::Simulated,
        }
    }

    pub const fn real() -> Self {
        Self {
            distance: Backing::Real,
            signal: Backing::Real,
            capture: Backing::Real,
        }
    }
}

#[async_trait]
pub trait Hardware: Send + Sync {
    /// Measure the distance in centimeters. Returns a negative sentinel when
    /// the sensor times out or faults; the call itself always returns.
    async fn measure_distance(&self) -> f64;

    async fn set_signal(&self, color: SignalColor);

    /// Capture a still image to `path`.
    async fn capture_still(&self, path: &Path) -> Result<(), HardwareError>;

    /// Release underlying devices. Must be safe to call at any time.
    async fn release(&self);

    fn capability(&self) -> Capability;

    /// The warning cue preceding a capture: three green/yellow/red blink
    /// cycles of decreasing period, then steady red held briefly, then off.
    /// Deliberately sequential; the cue is a short bounded physical signal
    /// that must finish before the shutter fires.
    async fn warning_sequence(&self) {
        for (period_ms, cycles) in [(200u64, 2), (100, 2), (50, 3)] {
            for _ in 0..cycles {
                for color in [SignalColor::Green, SignalColor::Yellow, SignalColor::Red] {
                    self.set_signal(color).await;
                    sleep(Duration::from_millis(period_ms)).await;
                }
            }
        }
        self.set_signal(SignalColor::Red).await;
        sleep(Duration::from_millis(500)).await;
        self.set_signal(SignalColor::Off).await;
    }
}

/// One-time capability probe. Never re-probed mid-run.
///
/// `mock_distance` pins the simulated sensor to a fixed reading, which is
/// handy for bench-testing the trigger path without waving at the sensor.
pub fn probe(force_simulation: bool, mock_distance: Option<f64>) -> Arc<dyn Hardware> {
    #[cfg(feature = "rpi")]
    if !force_simulation {
        match RpiHardware::open() {
            Ok(hw) => {
                info!("hardware probe: gpio and camera available");
                return Arc::new(hw);
            }
            Err(e) => warn!(%e, "hardware probe failed, falling back to simulation"),
        }
    }
    #[cfg(not(feature = "rpi"))]
    let _ = force_simulation;
    info!("hardware probe: using simulated devices");
    Arc::new(SimulatedHardware::with_mock_distance(mock_distance))
}
