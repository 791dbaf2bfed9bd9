use std::time::Duration;

use tokio::sync::Mutex;
use tokio_serial::SerialStream;

use super::frame::{self, Channel, Command, DeviceAddress, FRAME_LEN, PARAMS_LEN};
use super::{Result, SerialError, SerialInterface, SerialLink};
use crate::config::CurtainSettings;

/// End-to-end wait for a response. Motors can be slow to start answering,
/// so this is well above the port's own read timeout.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

pub const POSITION_OPEN: u8 = 100;
pub const POSITION_CLOSED: u8 = 0;

/// Novo motor protocol client.
///
/// Every request is a single write-then-read transaction. The bus is half
/// duplex and replies carry no request id, so transactions are serialized
/// behind a fair mutex: callers run one at a time, in arrival order.
pub struct CurtainProtocol<L = SerialStream> {
    interface: Mutex<SerialInterface<L>>,
    address: DeviceAddress,
    channel: Channel,
    response_timeout: Duration,
}

impl CurtainProtocol<SerialStream> {
    /// Open the configured serial port and bind a client to it.
    pub fn open(settings: &CurtainSettings) -> Result<Self> {
        let channel = Channel::new(settings.channel)?;
        let interface = SerialInterface::open(&settings.serial_path, settings.baud_rate)?;
        Ok(Self::new(interface, DeviceAddress::new(settings.address), channel)
            .with_response_timeout(settings.response_timeout()))
    }
}

impl<L: SerialLink> CurtainProtocol<L> {
    pub fn new(interface: SerialInterface<L>, address: DeviceAddress, channel: Channel) -> Self {
        Self {
            interface: Mutex::new(interface),
            address,
            channel,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    pub fn address(&self) -> DeviceAddress {
        self.address
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Send `command` and wait for the matching reply.
    ///
    /// Returns the three parameter bytes of the response. Nothing is retried:
    /// the first failure is returned and the bus is released for the next
    /// caller. A reply from another address aborts the transaction as well.
    pub async fn transact(&self, command: Command, params: &[u8]) -> Result<[u8; PARAMS_LEN]> {
        let request = frame::encode(self.address, self.channel, command, params);

        let mut interface = self.interface.lock().await;
        interface.reset_buffers()?;

        log::debug!(
            "Sending {} to {}/{}: {}",
            command,
            self.address,
            self.channel,
            hex::encode(request)
        );
        interface.write_all(&request).await?;

        let data = interface.read_exact(FRAME_LEN, self.response_timeout).await?;
        log::debug!("Received response: {}", hex::encode(&data));

        let response = frame::decode(&data, self.address, self.channel).map_err(|e| {
            if e.is_foreign_reply() {
                log::warn!(
                    "Ignoring reply from another device on {}: {}",
                    interface.port_name(),
                    e
                );
            }
            SerialError::Frame(e)
        })?;

        if response.command != command.code() {
            return Err(SerialError::CommandMismatch {
                expected: command.code(),
                actual: response.command,
            });
        }

        Ok(response.params)
    }

    /// Move the curtain to `position` percent open.
    pub async fn set_position(&self, position: u8) -> Result<()> {
        if position > POSITION_OPEN {
            return Err(SerialError::InvalidPosition(position));
        }
        self.transact(Command::SetPosition, &[position]).await?;
        Ok(())
    }

    /// Current position as reported by the motor, 0 = closed, 100 = open.
    pub async fn query_position(&self) -> Result<u8> {
        let params = self.transact(Command::QueryStatus, &[]).await?;
        Ok(params[0])
    }
}
