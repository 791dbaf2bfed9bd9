pub mod models;
pub mod poller;

pub use models::CoverState;
pub use poller::PositionPoller;

use async_trait::async_trait;

use crate::serial::protocol::{POSITION_CLOSED, POSITION_OPEN};
use crate::serial::{CurtainProtocol, Result, SerialLink};

/// Commands a curtain motor accepts, independent of how it is reached.
#[async_trait]
pub trait Curtain: Send + Sync {
    async fn set_position(&self, position: u8) -> Result<()>;

    async fn query_position(&self) -> Result<u8>;

    async fn open(&self) -> Result<()> {
        self.set_position(POSITION_OPEN).await
    }

    async fn close(&self) -> Result<()> {
        self.set_position(POSITION_CLOSED).await
    }
}

#[async_trait]
impl<L: SerialLink> Curtain for CurtainProtocol<L> {
    async fn set_position(&self, position: u8) -> Result<()> {
        CurtainProtocol::set_position(self, position).await
    }

    async fn query_position(&self) -> Result<u8> {
        CurtainProtocol::query_position(self).await
    }
}
