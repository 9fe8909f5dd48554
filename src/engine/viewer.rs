//! Per-viewer delivery state.

use bytes::Bytes;
use tokio::sync::mpsc;

/// Opaque handle identifying a connected viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(pub(crate) u64);

/// Delivery state for one subscriber.
///
/// Every field is independent per viewer; nothing here is shared or
/// derived across the viewer set.
pub(crate) struct Viewer {
    /// Bounded chunk sink. A full or closed sink counts as a failed
    /// write; the stream resynchronizes at the next keyframe.
    sink: mpsc::Sender<Bytes>,
    /// Viewers may hop between streams, but should only receive headers
    /// once. This includes track info, as codecs must stay the same
    /// between segments.
    pub skip_headers: bool,
    /// Blocks are regrouped into indeterminate-length clusters. So long
    /// as the cluster's timecode has not changed, there is no need to
    /// start a new one.
    pub skip_cluster: bool,
    /// To avoid decoding errors due to missing reference frames, the
    /// first frame of each track received by a viewer must be a
    /// keyframe. Each track for which one has been sent is a bit here.
    pub seen_keyframes: u32,
}

impl Viewer {
    pub fn new(sink: mpsc::Sender<Bytes>, skip_headers: bool) -> Self {
        Self {
            sink,
            skip_headers,
            skip_cluster: false,
            seen_keyframes: 0,
        }
    }

    /// Non-blocking write of one chunk. `false` signals the sink cannot
    /// take any more data right now.
    pub fn send(&self, chunk: &Bytes) -> bool {
        self.sink.try_send(chunk.clone()).is_ok()
    }
}
