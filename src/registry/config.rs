//! Registry configuration.

use std::time::Duration;

/// Tunables for a [`crate::BroadcastSet`].
#[derive(Debug, Clone)]
pub struct SetConfig {
    /// How long a closed stream stays reclaimable before eviction.
    pub grace_timeout: Duration,

    /// Housekeeping cadence; grace timers advance at this granularity.
    pub tick_interval: Duration,

    /// Bounded depth of each viewer sink. The engine emits block-sized
    /// chunks, so this is measured in chunks, not bytes.
    pub viewer_queue_len: usize,
}

impl Default for SetConfig {
    fn default() -> Self {
        Self {
            grace_timeout: Duration::from_secs(10),
            tick_interval: Duration::from_secs(1),
            viewer_queue_len: 64,
        }
    }
}

impl SetConfig {
    /// Set the grace window for producer reconnection.
    pub fn grace_timeout(mut self, timeout: Duration) -> Self {
        self.grace_timeout = timeout;
        self
    }

    /// Set the housekeeping tick interval.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the per-viewer sink depth in chunks.
    pub fn viewer_queue_len(mut self, len: usize) -> Self {
        self.viewer_queue_len = len;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SetConfig::default();
        assert_eq!(config.grace_timeout, Duration::from_secs(10));
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.viewer_queue_len, 64);
    }

    #[test]
    fn test_builder_chaining() {
        let config = SetConfig::default()
            .grace_timeout(Duration::from_secs(3))
            .tick_interval(Duration::from_millis(250))
            .viewer_queue_len(8);

        assert_eq!(config.grace_timeout, Duration::from_secs(3));
        assert_eq!(config.tick_interval, Duration::from_millis(250));
        assert_eq!(config.viewer_queue_len, 8);
    }
}
