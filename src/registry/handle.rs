//! Producer and viewer handles.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::engine::{Broadcast, ViewerId};
use crate::error::{EngineError, Result};

/// Exclusive producer side of a broadcast.
///
/// Dropping the handle behaves like [`WriterHandle::close`]: the grace
/// timer starts and the stream becomes reclaimable.
pub struct WriterHandle {
    cast: Arc<Broadcast>,
    poisoned: Option<EngineError>,
    closed: bool,
}

impl WriterHandle {
    pub(super) fn new(cast: Arc<Broadcast>) -> Self {
        Self {
            cast,
            poisoned: None,
            closed: false,
        }
    }

    /// Feed producer bytes.
    ///
    /// After the first hard error the handle refuses further writes and
    /// keeps returning that error; the broadcast itself stays up so a
    /// fresh producer attempt can resume.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        if let Some(err) = self.poisoned {
            return Err(err);
        }
        match self.cast.write(data) {
            Ok(consumed) => Ok(consumed),
            Err(err) => {
                self.poisoned = Some(err);
                tracing::warn!(error = %err, "producer input rejected");
                Err(err)
            }
        }
    }

    /// Restart this producer attempt: drop partial parse input and clear
    /// the poisoned state.
    pub fn reset(&mut self) {
        self.poisoned = None;
        self.cast.reset();
    }

    /// End the stream. The registry's grace window begins now.
    pub fn close(mut self) {
        self.close_inner();
    }

    /// The underlying broadcast, for metadata queries.
    pub fn broadcast(&self) -> &Arc<Broadcast> {
        &self.cast
    }

    fn close_inner(&mut self) {
        if !self.closed {
            self.closed = true;
            self.cast.close();
        }
    }
}

impl Drop for WriterHandle {
    fn drop(&mut self) {
        self.close_inner();
    }
}

/// Receiving side of a viewer connection.
///
/// Chunks arrive in delivery order. Dropping the handle disconnects the
/// viewer; chunks already queued are lost with it.
pub struct ReaderHandle {
    cast: Arc<Broadcast>,
    id: ViewerId,
    rx: mpsc::Receiver<Bytes>,
}

impl ReaderHandle {
    pub(super) fn connect(cast: Arc<Broadcast>, queue_len: usize, skip_headers: bool) -> Self {
        let (tx, rx) = mpsc::channel(queue_len);
        let id = cast.connect(tx, skip_headers);
        Self { cast, id, rx }
    }

    /// Wait for the next chunk. `None` once the broadcast has closed
    /// (the engine signals that with an empty chunk).
    pub async fn recv(&mut self) -> Option<Bytes> {
        match self.rx.recv().await {
            Some(chunk) if chunk.is_empty() => None,
            other => other,
        }
    }

    /// Non-blocking variant of [`ReaderHandle::recv`]; `None` when no
    /// chunk is queued.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.rx.try_recv().ok().filter(|chunk| !chunk.is_empty())
    }

    /// The underlying broadcast, for metadata queries.
    pub fn broadcast(&self) -> &Arc<Broadcast> {
        &self.cast
    }
}

impl Drop for ReaderHandle {
    fn drop(&mut self) {
        self.cast.disconnect(self.id);
    }
}
