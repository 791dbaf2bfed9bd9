pub mod frame;
pub mod interface;
pub mod protocol;

#[cfg(test)]
pub(crate) mod mock;

use std::time::Duration;

pub use frame::{Channel, Command, DeviceAddress, Frame, FrameError, ParsedResponse};
pub use interface::{SerialInterface, SerialLink};
pub use protocol::CurtainProtocol;

#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Invalid response frame: {0}")]
    Frame(#[from] FrameError),

    /// A well-formed frame answering some other request, e.g. a stale reply.
    #[error("Unexpected response command: 0x{actual:02X} (expected 0x{expected:02X})")]
    CommandMismatch { expected: u8, actual: u8 },

    #[error("Invalid channel {0}: must be within 1-254")]
    InvalidChannel(u8),

    #[error("Invalid position {0}: must be within 0-100")]
    InvalidPosition(u8),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialport error: {0}")]
    SerialportError(#[from] serialport::Error),
}

impl SerialError {
    /// True when the reply came from another device sharing the bus.
    pub fn is_foreign_reply(&self) -> bool {
        matches!(self, SerialError::Frame(e) if e.is_foreign_reply())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SerialError::Timeout(_))
    }
}

pub type Result<T> = std::result::Result<T, SerialError>;
