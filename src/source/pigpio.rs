use log::debug;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::utils::error::AcquireError;

// pigpiod socket interface command numbers (pigpio command.h)
pub const CMD_SLRO: u32 = 42; // bit-bang serial read open
pub const CMD_SLR: u32 = 43; // bit-bang serial read
pub const CMD_SLRC: u32 = 44; // bit-bang serial read close
pub const CMD_SLRI: u32 = 53; // bit-bang serial invert

pub const DEFAULT_DAEMON_HOST: &str = "127.0.0.1";
pub const DEFAULT_DAEMON_PORT: u16 = 8888;

/// Minimal client for the pigpio daemon's TCP socket interface.
///
/// Every command is a 16-byte little-endian frame (cmd, p1, p2, p3); p3
/// doubles as the extension length on commands that carry one. The reply
/// echoes the first three words and returns a signed status in the fourth,
/// followed by `status` data bytes on read commands.
pub struct PigpioClient {
    stream: TcpStream,
    daemon_addr: String,
}

impl PigpioClient {
    pub async fn connect(daemon_addr: &str) -> Result<Self, AcquireError> {
        let stream = TcpStream::connect(daemon_addr).await.map_err(|e| {
            AcquireError::SourceUnavailable(format!(
                "Cannot connect to pigpio daemon at {}: {}. Is pigpiod running?",
                daemon_addr, e
            ))
        })?;
        // Command frames are tiny; don't let Nagle hold them back
        stream.set_nodelay(true).ok();

        debug!("Connected to pigpio daemon at {}", daemon_addr);
        Ok(Self {
            stream,
            daemon_addr: daemon_addr.to_string(),
        })
    }

    async fn command(
        &mut self,
        cmd: u32,
        p1: u32,
        p2: u32,
        extension: &[u8],
    ) -> Result<i32, AcquireError> {
        let mut frame = Vec::with_capacity(16 + extension.len());
        frame.extend_from_slice(&cmd.to_le_bytes());
        frame.extend_from_slice(&p1.to_le_bytes());
        frame.extend_from_slice(&p2.to_le_bytes());
        frame.extend_from_slice(&(extension.len() as u32).to_le_bytes());
        frame.extend_from_slice(extension);

        self.stream.write_all(&frame).await.map_err(|e| {
            AcquireError::SourceUnavailable(format!(
                "Lost connection to pigpio daemon at {}: {}",
                self.daemon_addr, e
            ))
        })?;

        let mut reply = [0u8; 16];
        self.stream.read_exact(&mut reply).await.map_err(|e| {
            AcquireError::SourceUnavailable(format!(
                "No reply from pigpio daemon at {}: {}",
                self.daemon_addr, e
            ))
        })?;

        Ok(i32::from_le_bytes([reply[12], reply[13], reply[14], reply[15]]))
    }

    /// Opens bit-bang serial read on a GPIO at the given baud and data bits.
    pub async fn serial_read_open(
        &mut self,
        gpio: u8,
        baud: u32,
        data_bits: u8,
    ) -> Result<(), AcquireError> {
        let extension = (data_bits as u32).to_le_bytes();
        let status = self.command(CMD_SLRO, gpio as u32, baud, &extension).await?;
        if status < 0 {
            return Err(AcquireError::SourceUnavailable(format!(
                "pigpiod refused bit-bang serial open on GPIO {} (status {})",
                gpio, status
            )));
        }
        Ok(())
    }

    pub async fn serial_invert(&mut self, gpio: u8, invert: bool) -> Result<(), AcquireError> {
        let status = self
            .command(CMD_SLRI, gpio as u32, invert as u32, &[])
            .await?;
        if status < 0 {
            return Err(AcquireError::SourceUnavailable(format!(
                "pigpiod refused serial invert on GPIO {} (status {})",
                gpio, status
            )));
        }
        Ok(())
    }

    /// Reads up to `max_bytes` of accumulated bit-bang serial data.
    pub async fn serial_read(&mut self, gpio: u8, max_bytes: u32) -> Result<Vec<u8>, AcquireError> {
        let status = self.command(CMD_SLR, gpio as u32, max_bytes, &[]).await?;
        if status < 0 {
            return Err(AcquireError::SourceUnavailable(format!(
                "pigpiod serial read failed on GPIO {} (status {})",
                gpio, status
            )));
        }

        let count = status as usize;
        let mut data = vec![0u8; count];
        if count > 0 {
            self.stream.read_exact(&mut data).await.map_err(|e| {
                AcquireError::SourceUnavailable(format!(
                    "Short read from pigpio daemon at {}: {}",
                    self.daemon_addr, e
                ))
            })?;
        }
        Ok(data)
    }

    pub async fn serial_read_close(&mut self, gpio: u8) -> Result<(), AcquireError> {
        let status = self.command(CMD_SLRC, gpio as u32, 0, &[]).await?;
        if status < 0 {
            return Err(AcquireError::SourceUnavailable(format!(
                "pigpiod refused serial close on GPIO {} (status {})",
                gpio, status
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn read_frame(stream: &mut TcpStream) -> (u32, u32, u32, Vec<u8>) {
        let mut head = [0u8; 16];
        stream.read_exact(&mut head).await.unwrap();
        let cmd = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);
        let p1 = u32::from_le_bytes([head[4], head[5], head[6], head[7]]);
        let p2 = u32::from_le_bytes([head[8], head[9], head[10], head[11]]);
        let p3 = u32::from_le_bytes([head[12], head[13], head[14], head[15]]);
        let mut extension = vec![0u8; p3 as usize];
        if p3 > 0 {
            stream.read_exact(&mut extension).await.unwrap();
        }
        (cmd, p1, p2, extension)
    }

    async fn write_reply(stream: &mut TcpStream, cmd: u32, p1: u32, p2: u32, res: i32, data: &[u8]) {
        let mut frame = Vec::new();
        frame.extend_from_slice(&cmd.to_le_bytes());
        frame.extend_from_slice(&p1.to_le_bytes());
        frame.extend_from_slice(&p2.to_le_bytes());
        frame.extend_from_slice(&res.to_le_bytes());
        frame.extend_from_slice(data);
        stream.write_all(&frame).await.unwrap();
    }

    #[tokio::test]
    async fn bit_bang_session_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let daemon = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();

            let (cmd, p1, p2, extension) = read_frame(&mut stream).await;
            assert_eq!(cmd, CMD_SLRO);
            assert_eq!(p1, 15);
            assert_eq!(p2, 9600);
            assert_eq!(extension, 8u32.to_le_bytes().to_vec());
            write_reply(&mut stream, cmd, p1, p2, 0, &[]).await;

            let (cmd, p1, p2, _) = read_frame(&mut stream).await;
            assert_eq!(cmd, CMD_SLRI);
            assert_eq!(p2, 1);
            write_reply(&mut stream, cmd, p1, p2, 0, &[]).await;

            let (cmd, p1, p2, _) = read_frame(&mut stream).await;
            assert_eq!(cmd, CMD_SLR);
            write_reply(&mut stream, cmd, p1, p2, 6, b"R0123\r").await;

            let (cmd, p1, p2, _) = read_frame(&mut stream).await;
            assert_eq!(cmd, CMD_SLRC);
            write_reply(&mut stream, cmd, p1, p2, 0, &[]).await;
        });

        let mut client = PigpioClient::connect(&addr).await.unwrap();
        client.serial_read_open(15, 9600, 8).await.unwrap();
        client.serial_invert(15, true).await.unwrap();
        let data = client.serial_read(15, 8192).await.unwrap();
        assert_eq!(data, b"R0123\r");
        client.serial_read_close(15).await.unwrap();

        daemon.await.unwrap();
    }

    #[tokio::test]
    async fn negative_status_is_surfaced() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let daemon = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let (cmd, p1, p2, _) = read_frame(&mut stream).await;
            // PI_BAD_GPIO
            write_reply(&mut stream, cmd, p1, p2, -3, &[]).await;
        });

        let mut client = PigpioClient::connect(&addr).await.unwrap();
        let result = client.serial_read_open(99, 9600, 8).await;
        assert!(matches!(result, Err(AcquireError::SourceUnavailable(_))));

        daemon.await.unwrap();
    }

    #[tokio::test]
    async fn refused_connection_is_source_unavailable() {
        let result = PigpioClient::connect("127.0.0.1:1").await;
        assert!(matches!(result, Err(AcquireError::SourceUnavailable(_))));
    }
}
