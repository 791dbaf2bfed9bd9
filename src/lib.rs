//! Control of Novo motorized curtains over an RS-485 serial bus.

pub mod config;
pub mod device;
pub mod serial;

pub use config::CurtainSettings;
pub use device::{CoverState, Curtain, PositionPoller};
pub use serial::{Channel, Command, CurtainProtocol, DeviceAddress, FrameError, SerialError};
