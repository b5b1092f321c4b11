use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use crate::core::dispatch::ExecutionMode;
use crate::core::wire::{QSEECOM_SBUFF_SIZE, max_shared_footprint};

/// Delay before `HDCP_TXMTR_SET_HW_KEY`; the receiver needs at least
/// [`MIN_HW_KEY_DELAY_MS`] after `SKE_Send_Eks`.
pub const SLEEP_SET_HW_KEY_MS: u64 = 300;
pub const MIN_HW_KEY_DELAY_MS: u64 = 200;
/// Bound on the wait for the receiver ID list of a repeater.
pub const TOPOLOGY_WAIT_MS: u64 = 3000;
pub const HDCP2P2_APP_NAME: &str = "hdcp2p2";
pub const WORKER_NAME: &str = "hdcp_tz_lib";

/// Per-session settings fixed at registration.
///
/// Deserializable from any serde format; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub execution_mode: ExecutionMode,
    pub hw_key_delay_ms: u64,
    pub topology_wait_ms: u64,
    pub app_name: String,
    pub shared_buffer_size: usize,
    pub worker_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::default(),
            hw_key_delay_ms: SLEEP_SET_HW_KEY_MS,
            topology_wait_ms: TOPOLOGY_WAIT_MS,
            app_name: HDCP2P2_APP_NAME.to_owned(),
            shared_buffer_size: QSEECOM_SBUFF_SIZE,
            worker_name: WORKER_NAME.to_owned(),
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn tethered() -> Self {
        Self {
            execution_mode: ExecutionMode::Tethered,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn threaded() -> Self {
        Self {
            execution_mode: ExecutionMode::Threaded,
            ..Self::default()
        }
    }

    /// # Errors
    /// The first violated constraint, see [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hw_key_delay_ms < MIN_HW_KEY_DELAY_MS {
            return Err(ConfigError::HwKeyDelayTooShort {
                ms: self.hw_key_delay_ms,
                min: MIN_HW_KEY_DELAY_MS,
            });
        }
        if self.topology_wait_ms == 0 {
            return Err(ConfigError::ZeroTopologyWait);
        }
        if self.app_name.is_empty() {
            return Err(ConfigError::EmptyAppName);
        }
        if self.worker_name.is_empty() || self.worker_name.contains('\0') {
            return Err(ConfigError::InvalidWorkerName(self.worker_name.clone()));
        }
        let required = max_shared_footprint();
        if self.shared_buffer_size < required {
            return Err(ConfigError::SharedBufferTooSmall {
                required,
                actual: self.shared_buffer_size,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn hw_key_delay(&self) -> Duration {
        Duration::from_millis(self.hw_key_delay_ms)
    }

    #[must_use]
    pub fn topology_wait(&self) -> Duration {
        Duration::from_millis(self.topology_wait_ms)
    }
}
