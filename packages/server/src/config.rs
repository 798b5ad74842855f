//! Hub tuning knobs.

use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;
pub const DEFAULT_MAX_FRAME_BYTES: usize = 4096;
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Frames buffered per connection before it is evicted as a slow consumer.
    pub outbound_queue_capacity: usize,
    /// Largest inbound frame accepted; anything bigger ends the connection.
    pub max_frame_bytes: usize,
    /// How long the outbound pump may keep writing after teardown before the
    /// socket is dropped.
    pub close_grace: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("outbound queue capacity must be at least 1")]
    ZeroQueueCapacity,

    #[error("max frame size must be at least 1 byte")]
    ZeroFrameSize,
}

impl HubConfig {
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.outbound_queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.max_frame_bytes == 0 {
            return Err(ConfigError::ZeroFrameSize);
        }
        Ok(self)
    }
}
