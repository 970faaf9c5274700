use async_trait::async_trait;
use log::{debug, info};
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use std::io::Read;
use std::time::Duration;
use tokio::time::sleep;

use super::traits::ByteSource;
use crate::utils::error::AcquireError;

// The USB-serial adapter needs a moment after open before its stream is live
const SETTLE_DELAY: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_millis(100);
const READ_CHUNK: usize = 1024;

/// Hardware UART source reading from a serial device node: configured baud,
/// 5-8 data bits, no parity, one stop bit, short per-read timeout.
pub struct UartSource {
    port_name: String,
    baud_rate: u32,
    data_bits: u8,
    port: Option<Box<dyn SerialPort>>,
}

impl UartSource {
    pub fn new(port_name: impl Into<String>, baud_rate: u32, data_bits: u8) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            data_bits,
            port: None,
        }
    }

    fn map_data_bits(&self) -> Result<DataBits, AcquireError> {
        match self.data_bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(AcquireError::Config(format!(
                "Invalid data bits value: {} (must be 5, 6, 7, or 8)",
                other
            ))),
        }
    }
}

#[async_trait]
impl ByteSource for UartSource {
    fn descriptor(&self) -> String {
        format!(
            "serial port {} @ {} baud, {} data bits",
            self.port_name, self.baud_rate, self.data_bits
        )
    }

    async fn open(&mut self) -> Result<(), AcquireError> {
        let data_bits = self.map_data_bits()?;

        info!("🔌 Opening {}", self.descriptor());
        let port = serialport::new(self.port_name.as_str(), self.baud_rate)
            .data_bits(data_bits)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| {
                AcquireError::SourceUnavailable(format!(
                    "Failed to open serial port {}: {}",
                    self.port_name, e
                ))
            })?;

        // Settle, then drop whatever the driver queued before we were
        // listening so the first matched frame reflects live data
        sleep(SETTLE_DELAY).await;
        port.clear(ClearBuffer::Input).map_err(|e| {
            AcquireError::SourceUnavailable(format!(
                "Failed to flush stale input on {}: {}",
                self.port_name, e
            ))
        })?;

        debug!("Serial port {} open, stale input flushed", self.port_name);
        self.port = Some(port);
        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<u8>, AcquireError> {
        let port_name = self.port_name.clone();
        let port = self.port.as_mut().ok_or_else(|| {
            AcquireError::SourceUnavailable("UART source polled before open".to_string())
        })?;

        let mut buffer = [0u8; READ_CHUNK];
        match port.read(&mut buffer) {
            Ok(0) => Ok(Vec::new()),
            Ok(n) => Ok(buffer[..n].to_vec()),
            // The driver timeout just means no bytes arrived this poll
            Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(Vec::new()),
            Err(e) => Err(AcquireError::SourceUnavailable(format!(
                "Read error on serial port {}: {}",
                port_name, e
            ))),
        }
    }

    async fn close(&mut self) -> Result<(), AcquireError> {
        if self.port.take().is_some() {
            debug!("Closed serial port {}", self.port_name);
        }
        Ok(())
    }
}
