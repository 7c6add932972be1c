//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;

    /// Read whatever is available; `Ok(0)` means the port was closed
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Adapter from any async byte stream to [`SerialPortIO`]
pub struct StreamPort<S> {
    stream: S,
}

impl<S> StreamPort<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

/// The real serial port
pub type TokioSerialPort = StreamPort<tokio_serial::SerialStream>;

#[async_trait]
impl<S> SerialPortIO for StreamPort<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf).await
    }
}
