use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};

use super::{Result, SerialError};

pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Per-read timeout of the port itself. Much shorter than a protocol timeout.
pub const PORT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// Byte stream to a motor bus.
pub trait SerialLink: AsyncRead + AsyncWrite + Unpin + Send {
    /// Drop anything pending in the input and output buffers.
    fn clear_buffers(&mut self) -> Result<()>;
}

impl SerialLink for SerialStream {
    fn clear_buffers(&mut self) -> Result<()> {
        SerialPort::clear(self, ClearBuffer::All)?;
        Ok(())
    }
}

/// Transport session over one open serial link.
pub struct SerialInterface<L = SerialStream> {
    link: L,
    port_name: String,
}

impl SerialInterface<SerialStream> {
    /// Open `path` as 8N1 without flow control. Must run inside a tokio runtime.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let stream = tokio_serial::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(PORT_READ_TIMEOUT)
            .open_native_async()
            .map_err(|e| SerialError::ConnectionFailed(format!("{}: {}", path, e)))?;

        log::info!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self::with_link(stream, path))
    }
}

impl<L: SerialLink> SerialInterface<L> {
    pub fn with_link(link: L, port_name: impl Into<String>) -> Self {
        Self {
            link,
            port_name: port_name.into(),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Discard stale bytes left over from an earlier exchange.
    pub fn reset_buffers(&mut self) -> Result<()> {
        self.link.clear_buffers()
    }

    /// Write all of `data` and flush it to the line.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        self.link.write_all(data).await?;
        self.link.flush().await?;
        Ok(())
    }

    /// Read up to `len` bytes, giving up once `deadline` has passed.
    ///
    /// When the deadline expires after some bytes arrived, the partial buffer
    /// is returned so frame validation can report the short length. Only a
    /// completely silent line yields [`SerialError::Timeout`].
    pub async fn read_exact(&mut self, len: usize, deadline: Duration) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; len];
        let mut filled = 0;

        let read_operation = async {
            while filled < len {
                let n = self.link.read(&mut buffer[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            Ok::<(), io::Error>(())
        };

        match timeout(deadline, read_operation).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(SerialError::IoError(e)),
            Err(_) if filled == 0 => {
                log::warn!("No response on {} after {:?}", self.port_name, deadline);
                return Err(SerialError::Timeout(deadline));
            }
            Err(_) => {
                log::warn!(
                    "Partial response on {} after {:?}: {} of {} bytes",
                    self.port_name,
                    deadline,
                    filled,
                    len
                );
            }
        }

        if filled == 0 {
            return Err(SerialError::IoError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} closed before responding", self.port_name),
            )));
        }

        buffer.truncate(filled);
        Ok(buffer)
    }
}
