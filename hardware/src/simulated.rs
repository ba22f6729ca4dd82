use async_trait::async_trait;
use rand::Rng;
use std::path::Path;
use tracing::debug;

use crate::{Capability, Hardware, HardwareError, SignalColor};

const PLACEHOLDER_FRAME: &[u8] = b"simulated still frame\n";

/// Stand-in hardware for development off the installation.
///
/// Distance readings are bounded pseudo-random values (or a fixed override),
/// LED calls are logged, and captures write a placeholder file so downstream
/// stages behave exactly as with a real camera.
pub struct SimulatedHardware {
    mock_distance: Option<f64>,
}

impl SimulatedHardware {
    pub fn new() -> Self {
        Self {
            mock_distance: None,
        }
    }

    pub fn with_mock_distance(mock_distance: Option<f64>) -> Self {
        Self { mock_distance }
    }
}

impl Default for SimulatedHardware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hardware for SimulatedHardware {
    async fn measure_distance(&self) -> f64 {
        if let Some(distance) = self.mock_distance {
            return distance;
        }
        rand::thread_rng().gen_range(1.0..100.0)
    }

    async fn set_signal(&self, color: SignalColor) {
        debug!(?color, "led");
    }

    async fn capture_still(&self, path: &Path) -> Result<(), HardwareError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HardwareError::Capture(e.to_string()))?;
        }
        tokio::fs::write(path, PLACEHOLDER_FRAME)
            .await
            .map_err(|e| HardwareError::Capture(e.to_string()))?;
        debug!(path = %path.display(), "simulated capture");
        Ok(())
    }

    async fn release(&self) {
        debug!("simulated hardware released");
    }

    fn capability(&self) -> Capability {
        Capability::simulated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Backing;

    #[tokio::test]
    async fn mock_distance_overrides_the_random_source() {
        let hw = SimulatedHardware::with_mock_distance(Some(3.0));
        assert_eq!(hw.measure_distance().await, 3.0);
    }

    #[tokio::test]
    async fn random_distance_stays_in_bounds() {
        let hw = SimulatedHardware::new();
        for _ in 0..100 {
            let d = hw.measure_distance().await;
            assert!((1.0..100.0).contains(&d));
        }
    }

    #[test]
    fn everything_is_simulated() {
        let hw = SimulatedHardware::new();
        assert_eq!(hw.capability().distance, Backing::Simulated);
        assert_eq!(hw.capability().capture, Backing::Simulated);
    }
}
