//! Settings for waiting on a change stream that is still being enabled.

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Controls the bounded polling wait performed at startup while the table's stream is
/// `ENABLING`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamEnableConfig {
    /// Delay between two stream status checks.
    ///
    /// Default: 1000 (1 second)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum number of status checks before giving up.
    ///
    /// Default: 60
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl StreamEnableConfig {
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

    pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "stream_enable.max_attempts",
                constraint: "must be greater than 0",
            });
        }

        Ok(())
    }
}

impl Default for StreamEnableConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    StreamEnableConfig::DEFAULT_POLL_INTERVAL_MS
}

fn default_max_attempts() -> u32 {
    StreamEnableConfig::DEFAULT_MAX_ATTEMPTS
}
