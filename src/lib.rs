//! Live WebM broadcast relay.
//!
//! A single producer pushes an unbounded WebM (EBML-framed Matroska)
//! byte stream at a named broadcast; any number of viewers subscribe and
//! receive a rewritten stream that ordinary media players accept
//! mid-broadcast. The engine parses the stream incrementally no matter
//! how it is chunked, keeps cluster timecodes monotonic across producer
//! restarts, never hands a viewer a frame before that track's first
//! keyframe, and degrades slow viewers instead of blocking the producer.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use webm_relay::BroadcastSet;
//!
//! # async fn demo(input: &[u8]) -> webm_relay::Result<()> {
//! let set = Arc::new(BroadcastSet::new());
//! let _housekeeping = set.spawn_housekeeping();
//!
//! let mut writer = set.acquire_writer("garden").await.expect("name is free");
//! let mut reader = set.open_reader("garden").await.expect("stream exists");
//!
//! writer.write(input)?;
//! while let Some(chunk) = reader.recv().await {
//!     // Forward `chunk` to the player.
//!     let _ = chunk;
//! }
//! # Ok(())
//! # }
//! ```

pub mod ebml;
pub mod engine;
pub mod error;
pub mod registry;

pub use engine::{Broadcast, ViewerId};
pub use error::{EngineError, Result};
pub use registry::{BroadcastSet, ReaderHandle, RegistryError, SetConfig, WriterHandle};
