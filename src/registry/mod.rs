//! Broadcast registry: name → engine routing with producer-exclusive
//! acquisition and idle eviction.
//!
//! # Architecture
//!
//! ```text
//!                       Arc<BroadcastSet>
//!                 ┌──────────────────────────┐
//!                 │ streams: HashMap<String, │
//!                 │   Arc<Broadcast>>        │
//!                 └────────────┬─────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!   [WriterHandle]       [ReaderHandle]        [ReaderHandle]
//!   write()              recv()                recv()
//!        │                     ▲                     ▲
//!        └──► Broadcast::write ┴── try_send ─────────┘
//! ```
//!
//! A name has at most one producer at a time. When the producer closes
//! (or drops its handle), the broadcast stays reclaimable for a grace
//! window; the background tick evicts it afterwards, EOF-signalling
//! every viewer.

pub mod config;
pub mod error;
pub mod handle;
pub mod store;

pub use config::SetConfig;
pub use error::RegistryError;
pub use handle::{ReaderHandle, WriterHandle};
pub use store::BroadcastSet;
