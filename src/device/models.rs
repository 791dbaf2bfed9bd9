use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::serial::SerialError;

/// Last known state of a curtain as seen by the poller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverState {
    /// Percent open; `None` until the first successful poll.
    pub position: Option<u8>,
    pub available: bool,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl CoverState {
    pub fn is_closed(&self) -> Option<bool> {
        self.position.map(|p| p == 0)
    }

    pub fn record_position(&mut self, position: u8) {
        self.position = Some(position);
        self.available = true;
        self.updated_at = Some(Utc::now());
        self.last_error = None;
    }

    /// Mark unavailable. The last known position is kept.
    pub fn record_failure(&mut self, error: &SerialError) {
        self.available = false;
        self.last_error = Some(error.to_string());
    }
}
