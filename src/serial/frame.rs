//! Novo motor RS-485 frame codec.
//!
//! Requests and responses share one fixed layout:
//! ```text
//! [ 0x55 | addr_hi | addr_lo | channel | command | p0 | p1 | p2 | checksum ]
//! ```
//! The checksum is the sum of the eight preceding bytes modulo 256.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::{Result, SerialError};

pub const FRAME_LEN: usize = 9;
pub const FRAME_HEADER: u8 = 0x55;
pub const PARAMS_LEN: usize = 3;

const CHECKSUM_OFFSET: usize = FRAME_LEN - 1;

pub type Frame = [u8; FRAME_LEN];

/// 16-bit bus address of a motor controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress(u16);

impl DeviceAddress {
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn from_bytes(hi: u8, lo: u8) -> Self {
        Self(u16::from_be_bytes([hi, lo]))
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn hi(self) -> u8 {
        self.0.to_be_bytes()[0]
    }

    pub const fn lo(self) -> u8 {
        self.0.to_be_bytes()[1]
    }
}

impl From<u16> for DeviceAddress {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Motor channel behind a device address. 0 and 255 are reserved on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channel(u8);

impl Channel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 254;

    pub fn new(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SerialError::InvalidChannel(value))
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Channel {
    type Error = SerialError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Command byte of a frame.
///
/// Equality and hashing go by the wire code, so `Other(0x67)` is the same
/// command as `SetPosition`.
#[derive(Debug, Clone, Copy)]
pub enum Command {
    SetPosition,
    QueryStatus,
    /// Opcode not modelled above, sent as-is.
    Other(u8),
}

impl Command {
    pub const SET_POSITION: u8 = 0x67;
    pub const QUERY_STATUS: u8 = 0x98;

    pub const fn code(self) -> u8 {
        match self {
            Command::SetPosition => Self::SET_POSITION,
            Command::QueryStatus => Self::QUERY_STATUS,
            Command::Other(code) => code,
        }
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for Command {}

impl Hash for Command {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl From<u8> for Command {
    fn from(code: u8) -> Self {
        match code {
            Self::SET_POSITION => Command::SetPosition,
            Self::QUERY_STATUS => Command::QueryStatus,
            other => Command::Other(other),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::SetPosition => write!(f, "SET_POSITION"),
            Command::QueryStatus => write!(f, "QUERY_STATUS"),
            Command::Other(code) => write!(f, "0x{:02X}", code),
        }
    }
}

/// Command byte and parameters of a validated response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedResponse {
    pub command: u8,
    pub params: [u8; PARAMS_LEN],
}

/// Frame-level validation failures, in the order `decode` checks them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("invalid length: {0} bytes (expected {FRAME_LEN})")]
    BadLength(usize),

    #[error("invalid header: 0x{0:02X}")]
    BadHeader(u8),

    #[error("mismatched address: {actual} (expected {expected})")]
    AddressMismatch {
        expected: DeviceAddress,
        actual: DeviceAddress,
    },

    #[error("mismatched channel: {actual} (expected {expected})")]
    ChannelMismatch { expected: u8, actual: u8 },

    #[error("invalid checksum: 0x{actual:02X} (expected 0x{expected:02X})")]
    BadChecksum { expected: u8, actual: u8 },
}

impl FrameError {
    /// An address mismatch means another device answered on the shared bus,
    /// not that the line is corrupt.
    pub fn is_foreign_reply(&self) -> bool {
        matches!(self, FrameError::AddressMismatch { .. })
    }
}

/// Sum of `bytes` modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// Build a request frame.
///
/// `params` is normalized to exactly three bytes: shorter input is padded
/// with zeros, longer input is truncated. The device firmware expects this
/// leniency, so it is not reported as an error.
pub fn encode(address: DeviceAddress, channel: Channel, command: Command, params: &[u8]) -> Frame {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = FRAME_HEADER;
    frame[1] = address.hi();
    frame[2] = address.lo();
    frame[3] = channel.value();
    frame[4] = command.code();

    let n = params.len().min(PARAMS_LEN);
    frame[5..5 + n].copy_from_slice(&params[..n]);

    frame[CHECKSUM_OFFSET] = checksum(&frame[..CHECKSUM_OFFSET]);
    frame
}

/// Validate a received frame against the expected address and channel.
///
/// Checks run in a fixed order and the first failure is returned: length,
/// header, address, channel, checksum. The command byte is not compared here;
/// that is the caller's job since only it knows what was sent.
pub fn decode(
    data: &[u8],
    address: DeviceAddress,
    channel: Channel,
) -> std::result::Result<ParsedResponse, FrameError> {
    if data.len() != FRAME_LEN {
        return Err(FrameError::BadLength(data.len()));
    }
    if data[0] != FRAME_HEADER {
        return Err(FrameError::BadHeader(data[0]));
    }

    let actual_address = DeviceAddress::from_bytes(data[1], data[2]);
    if actual_address != address {
        return Err(FrameError::AddressMismatch {
            expected: address,
            actual: actual_address,
        });
    }
    if data[3] != channel.value() {
        return Err(FrameError::ChannelMismatch {
            expected: channel.value(),
            actual: data[3],
        });
    }

    let expected = checksum(&data[..CHECKSUM_OFFSET]);
    let actual = data[CHECKSUM_OFFSET];
    if actual != expected {
        return Err(FrameError::BadChecksum { expected, actual });
    }

    let mut params = [0u8; PARAMS_LEN];
    params.copy_from_slice(&data[5..CHECKSUM_OFFSET]);

    Ok(ParsedResponse {
        command: data[4],
        params,
    })
}
