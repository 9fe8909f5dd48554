//! The central registry mapping stream names to broadcast engines.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::engine::Broadcast;

use super::config::SetConfig;
use super::error::RegistryError;
use super::handle::{ReaderHandle, WriterHandle};

/// Called with the stream name when a broadcast is evicted after its
/// grace window has elapsed.
pub type CloseCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Registry of all live broadcasts.
///
/// Thread-safe via `RwLock`; reads (viewer joins, metadata queries)
/// outnumber writes (stream creation, eviction) by far.
pub struct BroadcastSet {
    streams: RwLock<HashMap<String, Arc<Broadcast>>>,
    config: SetConfig,
    on_close: Option<CloseCallback>,
}

impl BroadcastSet {
    /// Create a registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(SetConfig::default())
    }

    /// Create a registry with custom configuration.
    pub fn with_config(config: SetConfig) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            config,
            on_close: None,
        }
    }

    /// Install a callback fired after a broadcast is evicted.
    pub fn on_close(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    /// Get the registry configuration.
    pub fn config(&self) -> &SetConfig {
        &self.config
    }

    /// Acquire the producer side of `name`.
    ///
    /// Creates the broadcast on first use. A broadcast whose producer is
    /// gone but whose grace window has not elapsed is reclaimed: the
    /// grace timer is cancelled and residual partial input discarded, so
    /// the new producer starts from a tag boundary.
    pub async fn acquire_writer(&self, name: &str) -> Result<WriterHandle, RegistryError> {
        let mut streams = self.streams.write().await;

        if let Some(cast) = streams.get(name) {
            if cast.is_live() {
                return Err(RegistryError::AlreadyLive(name.to_string()));
            }
            cast.reclaim();
            cast.reset();
            tracing::info!(stream = %name, viewers = cast.viewer_count(), "producer reclaimed stream");
            return Ok(WriterHandle::new(Arc::clone(cast)));
        }

        let cast = Arc::new(Broadcast::new());
        streams.insert(name.to_string(), Arc::clone(&cast));
        tracing::info!(stream = %name, "stream created");
        Ok(WriterHandle::new(cast))
    }

    /// Look up a broadcast without connecting a viewer, for metadata
    /// queries (dimensions, closed flag, ingest rate).
    pub async fn readable(&self, name: &str) -> Option<Arc<Broadcast>> {
        self.streams.read().await.get(name).cloned()
    }

    /// Connect a viewer to `name`. Returns `None` for unknown streams;
    /// a stream inside its grace window still accepts viewers, since the
    /// producer may reconnect.
    pub async fn open_reader(&self, name: &str) -> Option<ReaderHandle> {
        let cast = self.readable(name).await?;
        let reader = ReaderHandle::connect(cast, self.config.viewer_queue_len, false);
        tracing::debug!(stream = %name, "viewer connected");
        Some(reader)
    }

    /// Number of known streams, grace-window ones included.
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Run one housekeeping pass: roll every ingest-rate gauge, advance
    /// armed grace timers, and evict broadcasts whose grace has elapsed.
    pub async fn tick(&self) {
        let mut evicted = Vec::new();
        {
            let mut streams = self.streams.write().await;
            streams.retain(|name, cast| {
                cast.roll_rate();
                if cast.advance_grace(self.config.tick_interval, self.config.grace_timeout) {
                    cast.finish_close();
                    tracing::info!(stream = %name, "stream evicted after grace window");
                    evicted.push(name.clone());
                    false
                } else {
                    true
                }
            });
        }

        if let Some(callback) = &self.on_close {
            for name in &evicted {
                callback(name);
            }
        }
    }

    /// Spawn the periodic housekeeping task.
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_housekeeping(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let set = Arc::clone(self);
        let interval = set.config.tick_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                set.tick().await;
            }
        })
    }
}

impl Default for BroadcastSet {
    fn default() -> Self {
        Self::new()
    }
}
