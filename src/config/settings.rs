use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{ConfigError, Result};
use crate::serial::frame::Channel;
use crate::serial::interface::DEFAULT_BAUD_RATE;
use crate::serial::protocol::DEFAULT_RESPONSE_TIMEOUT;

/// Hourly, like the reference deployment.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3600);

/// Settings for one curtain motor, read from a TOML file.
///
/// ```toml
/// serial_path = "/dev/ttyUSB0"
/// address = 0x1234
/// channel = 1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurtainSettings {
    pub serial_path: String,
    pub address: u16,
    pub channel: u8,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_response_timeout_ms() -> u64 {
    DEFAULT_RESPONSE_TIMEOUT.as_millis() as u64
}

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL.as_secs()
}

impl CurtainSettings {
    /// Settings with default timing for the given port and bus position.
    pub fn new(serial_path: impl Into<String>, address: u16, channel: u8) -> Self {
        Self {
            serial_path: serial_path.into(),
            address,
            channel,
            baud_rate: default_baud_rate(),
            response_timeout_ms: default_response_timeout_ms(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: CurtainSettings = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial_path.trim().is_empty() {
            return Err(ConfigError::Invalid("serial_path must not be empty".to_string()));
        }
        Channel::new(self.channel).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be positive".to_string()));
        }
        if self.response_timeout_ms == 0 {
            return Err(ConfigError::Invalid("response_timeout_ms must be positive".to_string()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid("poll_interval_secs must be positive".to_string()));
        }
        Ok(())
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
