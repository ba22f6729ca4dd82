//! UART bridge for the on-board serial header.

use async_trait::async_trait;
use rppal::uart::{Parity, Queue, Uart};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{SerialBridge, SerialError};

pub struct RpiSerial {
    // Option so close() can drop the port while the bridge is still shared.
    uart: Mutex<Option<Uart>>,
    partial: Mutex<String>,
}

impl RpiSerial {
    pub fn open(port: &str, baud: u32) -> Result<Self, SerialError> {
        let mut uart = Uart::with_path(port, baud, Parity::None, 8, 1)
            .map_err(|e| SerialError::Open(e.to_string()))?;
        // Non-blocking reads: return immediately with whatever is queued.
        uart.set_read_mode(0, Duration::ZERO)
            .map_err(|e| SerialError::Open(e.to_string()))?;
        Ok(Self {
            uart: Mutex::new(Some(uart)),
            partial: Mutex::new(String::new()),
        })
    }
}

#[async_trait]
impl SerialBridge for RpiSerial {
    async fn send_line(&self, line: &str) -> Result<(), SerialError> {
        let mut guard = self
            .uart
            .lock()
            .map_err(|_| SerialError::Write("uart lock poisoned".into()))?;
        let uart = guard
            .as_mut()
            .ok_or_else(|| SerialError::Write("port closed".into()))?;
        let mut framed = line.to_string();
        if !framed.ends_with('\n') {
            framed.push('\n');
        }
        uart.write(framed.as_bytes())
            .map_err(|e| SerialError::Write(e.to_string()))?;
        debug!(%line, "serial write");
        Ok(())
    }

    async fn read_line(&self) -> Option<String> {
        let mut buf = [0u8; 64];
        loop {
            let read = {
                let mut guard = self.uart.lock().ok()?;
                let uart = guard.as_mut()?;
                match uart.read(&mut buf) {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(%e, "serial read failed");
                        return None;
                    }
                }
            };
            if read == 0 {
                return None;
            }
            let chunk = String::from_utf8_lossy(&buf[..read]).into_owned();
            let mut partial = self.partial.lock().ok()?;
            partial.push_str(&chunk);
            if let Some(pos) = partial.find('\n') {
                let line = partial[..pos].trim_end_matches('\r').to_string();
                partial.drain(..=pos);
                if !line.is_empty() {
                    return Some(line);
                }
            }
        }
    }

    async fn close(&self) {
        if let Ok(mut guard) = self.uart.lock() {
            if let Some(uart) = guard.take() {
                let _ = uart.flush(Queue::Both);
                debug!("serial port closed");
            }
        }
    }
}
