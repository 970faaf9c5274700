use log::{debug, info};

use super::pigpio::{PigpioClient, DEFAULT_DAEMON_HOST, DEFAULT_DAEMON_PORT};
use super::traits::ByteSource;
use crate::utils::error::AcquireError;

// pigpio buffers bit-bang data daemon-side; drain generously per poll
const POLL_CHUNK: u32 = 8192;

/// Bit-banged serial receiver on a GPIO pin, driven through the pigpio
/// daemon. The ranger's open-collector output is wired inverted, so
/// inverted-signal framing is enabled right after open. The channel is
/// logically infinite; `poll` never reports end-of-stream.
pub struct GpioBitBangSource {
    gpio: u8,
    baud_rate: u32,
    data_bits: u8,
    daemon_addr: String,
    client: Option<PigpioClient>,
}

impl GpioBitBangSource {
    pub fn new(gpio: u8, baud_rate: u32, data_bits: u8) -> Self {
        Self {
            gpio,
            baud_rate,
            data_bits,
            daemon_addr: daemon_addr_from_env(),
            client: None,
        }
    }

    /// Overrides the daemon address instead of the PIGPIO_ADDR/PIGPIO_PORT
    /// environment (used by tests against a stub daemon).
    pub fn with_daemon_addr(mut self, daemon_addr: impl Into<String>) -> Self {
        self.daemon_addr = daemon_addr.into();
        self
    }
}

// Same resolution order as the pigpio client library
fn daemon_addr_from_env() -> String {
    let host =
        std::env::var("PIGPIO_ADDR").unwrap_or_else(|_| DEFAULT_DAEMON_HOST.to_string());
    let port = std::env::var("PIGPIO_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_DAEMON_PORT);
    format!("{}:{}", host, port)
}

#[async_trait::async_trait]
impl ByteSource for GpioBitBangSource {
    fn descriptor(&self) -> String {
        format!(
            "GPIO {} @ {} baud, {} data bits",
            self.gpio, self.baud_rate, self.data_bits
        )
    }

    async fn open(&mut self) -> Result<(), AcquireError> {
        info!(
            "🔌 Opening bit-bang serial read on {} via pigpiod at {}",
            self.descriptor(),
            self.daemon_addr
        );

        let mut client = PigpioClient::connect(&self.daemon_addr).await?;
        client
            .serial_read_open(self.gpio, self.baud_rate, self.data_bits)
            .await?;

        // Inverted mode flag
        if let Err(e) = client.serial_invert(self.gpio, true).await {
            // Don't leak the open slot when invert is refused
            if let Err(close_err) = client.serial_read_close(self.gpio).await {
                return Err(e.with_cleanup(AcquireError::SourceClose {
                    source_name: self.descriptor(),
                    reason: close_err.to_string(),
                }));
            }
            return Err(e);
        }

        self.client = Some(client);
        Ok(())
    }

    async fn poll(&mut self) -> Result<Vec<u8>, AcquireError> {
        let gpio = self.gpio;
        let client = self.client.as_mut().ok_or_else(|| {
            AcquireError::SourceUnavailable("GPIO source polled before open".to_string())
        })?;
        client.serial_read(gpio, POLL_CHUNK).await
    }

    async fn close(&mut self) -> Result<(), AcquireError> {
        // Closing an unopened source is a no-op
        let Some(mut client) = self.client.take() else {
            return Ok(());
        };

        debug!("Closing bit-bang serial read on GPIO {}", self.gpio);
        client
            .serial_read_close(self.gpio)
            .await
            .map_err(|e| AcquireError::SourceClose {
                source_name: self.descriptor(),
                reason: e.to_string(),
            })
    }
}
