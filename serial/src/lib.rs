//! Best-effort line protocol to the serial peer.
//!
//! Outbound mood pushes are fire-and-forget: at most one `MOOD:<mood>` line
//! per committed change, no acknowledgement, no retry. A write failure is
//! logged and never rolls back the local mood commit. Inbound reads are
//! non-blocking polls; lines are currently only logged (reserved for a
//! future handshake).

use async_trait::async_trait;
use mood::Mood;
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

#[cfg(feature = "rpi")]
mod uart;
#[cfg(feature = "rpi")]
pub use uart::RpiSerial;

#[derive(Debug, Error)]
pub enum SerialError {
    #[error("serial port unavailable: {0}")]
    Open(String),
    #[error("serial write failed: {0}")]
    Write(String),
    #[error("serial read failed: {0}")]
    Read(String),
}

#[async_trait]
pub trait SerialBridge: Send + Sync {
    /// Send one line of text. Implementations append the `\n` terminator.
    async fn send_line(&self, line: &str) -> Result<(), SerialError>;

    /// Return the next unconsumed inbound line, or `None` immediately when
    /// no data is waiting.
    async fn read_line(&self) -> Option<String>;

    async fn close(&self);

    /// Push a committed mood change to the peer.
    async fn push_mood(&self, mood: Mood) -> Result<(), SerialError> {
        self.send_line(&format!("MOOD:{mood}")).await
    }
}

/// Drain the mood push channel into the bridge, at most one push per
/// committed change. Write failures are logged; the local commit stands.
pub async fn push_loop(mut rx: mpsc::UnboundedReceiver<Mood>, bridge: Arc<dyn SerialBridge>) {
    while let Some(mood) = rx.recv().await {
        if let Err(e) = bridge.push_mood(mood).await {
            warn!(%mood, %e, "mood push failed");
        }
    }
    debug!("mood push channel closed");
}

/// Poll the bridge for inbound lines and log them.
pub async fn read_loop(bridge: Arc<dyn SerialBridge>, interval: Duration) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        while let Some(line) = bridge.read_line().await {
            info!(%line, "received from serial peer");
        }
    }
}

/// Open the serial port, or fall back to the simulated bridge.
pub fn open(port: &str, baud: u32, force_simulation: bool) -> Arc<dyn SerialBridge> {
    #[cfg(feature = "rpi")]
    if !force_simulation {
        match RpiSerial::open(port, baud) {
            Ok(bridge) => {
                info!(port, baud, "serial port opened");
                return Arc::new(bridge);
            }
            Err(e) => warn!(%e, port, "serial open failed, falling back to simulation"),
        }
    }
    #[cfg(not(feature = "rpi"))]
    let _ = (port, baud, force_simulation);
    info!("serial bridge simulated");
    Arc::new(SimulatedSerial::new())
}

/// Bridge that logs instead of touching a port, with identical contracts.
///
/// Sent lines are recorded and inbound lines can be injected, which the
/// tests use to observe the wire without hardware.
#[derive(Default)]
pub struct SimulatedSerial {
    sent: Mutex<Vec<String>>,
    inbound: Mutex<VecDeque<String>>,
}

impl SimulatedSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines sent so far, without terminators.
    pub async fn sent(&self) -> Vec<String> {
        self.sent.lock().await.clone()
    }

    /// Queue a line for the next [`SerialBridge::read_line`] call.
    pub async fn inject(&self, line: impl Into<String>) {
        self.inbound.lock().await.push_back(line.into());
    }
}

#[async_trait]
impl SerialBridge for SimulatedSerial {
    async fn send_line(&self, line: &str) -> Result<(), SerialError> {
        debug!(%line, "[simulated] serial write");
        self.sent.lock().await.push(line.to_string());
        Ok(())
    }

    async fn read_line(&self) -> Option<String> {
        self.inbound.lock().await.pop_front()
    }

    async fn close(&self) {
        debug!("[simulated] serial closed");
    }
}
