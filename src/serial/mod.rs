//! # Serial Communication Module
//!
//! Handles the RS-485 link to UMB devices.
//!
//! This module handles:
//! - Opening the serial port (8N1, configurable baud rate)
//! - Writing request frames
//! - Reassembling response frames from the byte stream
//! - Read timeouts

pub mod port_trait;

use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{Result, UmbPollerError};
use crate::umb::protocol::{expected_frame_len, UMB_HEADER_VERSION, UMB_SOH, UMB_STX};
use port_trait::{SerialPortIO, TokioSerialPort};

/// Size of a single read from the port
const READ_CHUNK_SIZE: usize = 256;

/// UMB Serial Port Handler
///
/// Owns the port exclusively: one request is in flight at a time.
pub struct UmbSerial {
    /// Serial port handle
    port: Box<dyn SerialPortIO>,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
    /// How long to wait for a complete response frame
    timeout: Duration,
    /// Received bytes not yet consumed as a frame
    buffer: BytesMut,
}

impl std::fmt::Debug for UmbSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UmbSerial")
            .field("device_path", &self.device_path)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl UmbSerial {
    /// Open the serial port named in the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the port cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use umb_poller::config::SerialConfig;
    /// use umb_poller::serial::UmbSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = UmbSerial::open(&SerialConfig::default())?;
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        Self::open_with_paths(
            &[config.port.as_str()],
            config.baud_rate,
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Open the first serial port that works from a list of candidates
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyUSB0"])
    /// * `baud_rate` - Line speed
    /// * `timeout` - Response timeout
    pub fn open_with_paths(paths: &[&str], baud_rate: u32, timeout: Duration) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened UMB bus at {} ({} baud)", path, baud_rate);
                    return Ok(Self::from_port(
                        Box::new(TokioSerialPort::new(port)),
                        path.to_string(),
                        timeout,
                    ));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(UmbPollerError::SerialPortNotFound(paths.join(", ")))
    }

    /// Wrap an already opened port
    pub fn from_port(port: Box<dyn SerialPortIO>, device_path: String, timeout: Duration) -> Self {
        Self {
            port,
            device_path,
            timeout,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
        }
    }

    /// Open a specific serial port with UMB line settings (8N1)
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| UmbPollerError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Write a frame (or ASCII command) to the bus
    pub async fn send_packet(&mut self, packet: &[u8]) -> Result<()> {
        self.port
            .write_all(packet)
            .await
            .map_err(|e| UmbPollerError::Serial(format!("Failed to write packet: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| UmbPollerError::Serial(format!("Failed to flush serial port: {}", e)))?;

        debug!("Sent {} bytes: {:02X?}", packet.len(), packet);
        Ok(())
    }

    /// Read the next complete frame
    ///
    /// Bytes in front of an SOH are discarded. The frame length comes from
    /// the header's `Len` byte; validation is left to the decoder.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if no complete frame arrives in time, or a serial
    /// error if the port fails or closes.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let timeout = self.timeout;

        match tokio::time::timeout(timeout, self.fill_frame()).await {
            Ok(result) => result,
            Err(_) => {
                if !self.buffer.is_empty() {
                    debug!("Dropping {} bytes of partial frame", self.buffer.len());
                    self.buffer.clear();
                }
                Err(UmbPollerError::Timeout(timeout.as_millis() as u64))
            }
        }
    }

    /// Send a request and wait for its response
    ///
    /// Leftover bytes from earlier exchanges are dropped first so a late
    /// answer is not taken for this one.
    pub async fn transact(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.buffer.clear();
        self.send_packet(request).await?;
        let response = self.read_frame().await?;
        debug!("Received {} bytes: {:02X?}", response.len(), response);
        Ok(response)
    }

    async fn fill_frame(&mut self) -> Result<Vec<u8>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            match self.buffer.iter().position(|&b| b == UMB_SOH) {
                Some(0) => {}
                Some(start) => {
                    debug!("Discarding {} bytes before SOH", start);
                    self.buffer.advance(start);
                }
                None => self.buffer.clear(),
            }

            if !plausible_header(&self.buffer) {
                debug!("Stray SOH, resyncing");
                self.buffer.advance(1);
                continue;
            }

            if let Some(total) = expected_frame_len(&self.buffer) {
                if self.buffer.len() >= total {
                    return Ok(self.buffer.split_to(total).to_vec());
                }
            }

            let n = self
                .port
                .read(&mut chunk)
                .await
                .map_err(|e| UmbPollerError::Serial(format!("Failed to read: {}", e)))?;
            if n == 0 {
                return Err(UmbPollerError::Serial(format!(
                    "Serial port {} closed",
                    self.device_path
                )));
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

/// Whether the header bytes received so far can start a frame
///
/// `buffer` starts at an SOH or is empty. Ver and STX are checked once they
/// have arrived.
fn plausible_header(buffer: &[u8]) -> bool {
    !matches!(buffer.get(1), Some(&ver) if ver != UMB_HEADER_VERSION)
        && !matches!(buffer.get(7), Some(&stx) if stx != UMB_STX)
}
