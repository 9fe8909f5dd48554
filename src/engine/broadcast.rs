//! The EBML rewriting and fan-out engine.
//!
//! One `Broadcast` exists per named stream. A single producer feeds it
//! arbitrarily chunked WebM bytes through [`Broadcast::write`]; any
//! number of viewers receive a rewritten stream that an ordinary media
//! player accepts mid-broadcast:
//!
//! - the cached EBML header and Segment/Info/Tracks subtree are
//!   delivered before a viewer's first block, with `Duration` voided and
//!   the Segment length canonicalised to the one-byte indeterminate form;
//! - every block is wrapped in a fresh indeterminate-length Cluster
//!   carrying an eight-byte Timecode that never decreases, even across
//!   producer restarts;
//! - nothing is delivered on a track before that track's first keyframe.
//!
//! The producer never blocks on a viewer: delivery is non-blocking, and
//! a viewer whose sink is full simply loses blocks until the next
//! keyframe on the affected track.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::{Buf, Bytes, BytesMut};
use tokio::sync::mpsc;

use crate::ebml::tag::{Parsed, Tag};
use crate::ebml::{tags, vint};
use crate::engine::rate::RateGauge;
use crate::engine::viewer::{Viewer, ViewerId};
use crate::error::{EngineError, Result};

/// Largest accepted wire length for a non-container tag.
const MAX_TAG_LEN: u64 = 1024 * 1024;

/// Track numbers must fit the 32-bit per-viewer keyframe mask.
const MAX_TRACKS: u64 = 32;

/// One live stream: producer-side parse state, rewritten caches, and the
/// viewer set, all behind a single coarse lock. Metadata that the
/// transport layer polls lives in atomics beside it.
pub struct Broadcast {
    shared: Mutex<Shared>,
    created_at: Instant,
    closed: AtomicBool,
    has_video: AtomicBool,
    has_audio: AtomicBool,
    width: AtomicU32,
    height: AtomicU32,
    /// Milliseconds of grace elapsed since `close`; negative while a
    /// producer holds the stream.
    closing_ms: AtomicI64,
    next_viewer: AtomicU64,
}

struct Shared {
    /// Unparsed tail of producer input.
    buffer: BytesMut,
    /// The EBML (DocType) tag; the same in all WebM streams, captured
    /// once for the broadcast's whole lifetime.
    header: Bytes,
    /// Segment open + Info + Tracks. Replaced wholesale, never mutated:
    /// a viewer's sink may still hold a reference to the old blob.
    tracks: Bytes,
    time: Timeline,
    rate: RateGauge,
    viewers: HashMap<ViewerId, Viewer>,
}

/// Cluster timecode bookkeeping.
#[derive(Debug, Default, Clone, Copy)]
struct Timeline {
    /// Last emitted block timecode. The next one must be no less.
    last: u64,
    /// Last received cluster timecode, shifted to stay monotonic.
    recv: u64,
    /// Last cluster timecode sent to viewers; all viewers receive the
    /// same clusters.
    sent: u64,
    /// By how much received timecodes have been shifted.
    shift: u64,
}

impl Broadcast {
    pub fn new() -> Self {
        Self {
            shared: Mutex::new(Shared {
                buffer: BytesMut::new(),
                header: Bytes::new(),
                tracks: Bytes::new(),
                time: Timeline::default(),
                rate: RateGauge::default(),
                viewers: HashMap::new(),
            }),
            created_at: Instant::now(),
            closed: AtomicBool::new(false),
            has_video: AtomicBool::new(false),
            has_audio: AtomicBool::new(false),
            width: AtomicU32::new(0),
            height: AtomicU32::new(0),
            closing_ms: AtomicI64::new(-1),
            next_viewer: AtomicU64::new(0),
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().expect("broadcast state poisoned")
    }

    /// Feed producer bytes.
    ///
    /// The whole chunk is consumed on success no matter where tag
    /// boundaries fall; incomplete tags wait in the parse buffer. A hard
    /// error ends this producer attempt only: viewers stay connected,
    /// and a reconnecting producer may resume after [`Broadcast::reset`].
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        let mut shared = self.shared();
        shared.rate.add(data.len());
        shared.buffer.extend_from_slice(data);

        loop {
            let tag = match Tag::parse_header(&shared.buffer) {
                Parsed::NeedMore => return Ok(data.len()),
                Parsed::Malformed => return Err(EngineError::MalformedEbml),
                Parsed::Tag(tag) => tag,
            };

            // Segment, Tracks and Cluster have their children parsed in
            // this same loop, so only their header bytes are stepped
            // over. That is also what makes their indeterminate lengths
            // workable.
            let span = if matches!(tag.id, tags::SEGMENT | tags::TRACKS | tags::CLUSTER) {
                if tag.size == tags::INDETERMINATE && tag.header_len >= 7 {
                    // Some decoders only accept the one-byte encoding of
                    // an indeterminate length; recode it and let a Void
                    // tag consume the freed bytes. Four-byte container
                    // ids put the size field at offset 4.
                    shared.buffer[4] = 0xFF;
                    shared.buffer[5] = tags::VOID as u8;
                    shared.buffer[6] = 0x80 | (tag.header_len - 7) as u8;
                }
                tag.header_len
            } else {
                let total = tag.header_len as u64 + tag.size;
                if total > MAX_TAG_LEN {
                    return Err(EngineError::BlockTooLarge);
                }
                if total > shared.buffer.len() as u64 {
                    return Ok(data.len());
                }
                total as usize
            };

            self.dispatch(&mut shared, tag, span)?;
            shared.buffer.advance(span);
        }
    }

    fn dispatch(&self, shared: &mut Shared, tag: Tag, span: usize) -> Result<()> {
        match tag.id {
            // No seeking and no buffered past: navigation aids are
            // dropped rather than forwarded.
            tags::SEEK_HEAD | tags::CHAPTERS | tags::CUES | tags::VOID | tags::TAGS
            | tags::PREV_SIZE => {}

            tags::EBML => {
                if shared.header.is_empty() {
                    shared.header = Bytes::copy_from_slice(&shared.buffer[..span]);
                }
            }

            tags::SEGMENT => {
                self.has_video.store(false, Ordering::Relaxed);
                self.has_audio.store(false, Ordering::Relaxed);
                self.width.store(0, Ordering::Relaxed);
                self.height.store(0, Ordering::Relaxed);
                // Recalculated when the first block of the new segment
                // arrives.
                shared.time.shift = 0;
                shared.tracks = Bytes::copy_from_slice(&shared.buffer[..span]);
            }

            tags::INFO => self.on_info(shared, tag, span)?,

            tags::TRACK_ENTRY => self.on_track_entry(shared, tag, span)?,

            tags::TRACKS => append_to_tracks(shared, span),

            tags::CLUSTER => {
                // Boundary marker only; the data is regrouped on the way
                // out.
            }

            tags::TIMECODE => {
                let body = tag.contents(&shared.buffer[..span]);
                shared.time.recv = vint::fixed_uint(body) + shared.time.shift;
            }

            tags::SIMPLE_BLOCK | tags::BLOCK_GROUP => self.on_block(shared, tag, span)?,

            other => return Err(EngineError::UnknownTag(other)),
        }
        Ok(())
    }

    /// Validate `Info`, void any `Duration`, and append the tag to the
    /// cached track data.
    fn on_info(&self, shared: &mut Shared, tag: Tag, span: usize) -> Result<()> {
        let mut scale = 0;
        let mut offset = tag.header_len;

        while offset < span {
            let child = match Tag::parse(&shared.buffer[offset..span]) {
                Parsed::Tag(child) => child,
                _ => return Err(EngineError::MalformedEbml),
            };

            match child.id {
                tags::DURATION => {
                    // A live stream must not declare a duration. Void it
                    // in place; the replacement spans exactly the same
                    // bytes.
                    let total = child.header_len as u64 + child.size - 2;
                    if total > 0x7F {
                        return Err(EngineError::DurationTooLarge);
                    }
                    shared.buffer[offset] = tags::VOID as u8;
                    shared.buffer[offset + 1] = 0x80 | total as u8;
                }
                tags::TIMECODE_SCALE => {
                    scale = vint::fixed_uint(child.contents(&shared.buffer[offset..span]));
                }
                _ => {}
            }

            offset += child.header_len + child.size as usize;
        }

        // Millisecond resolution is the Matroska default and mandatory
        // in WebM; the timecode rewriting knows no other scale.
        if scale != 1_000_000 {
            return Err(EngineError::InvalidTimecodeScale);
        }

        append_to_tracks(shared, span);
        Ok(())
    }

    /// Validate a `TrackEntry`, record track metadata, and append the
    /// tag to the cached track data.
    fn on_track_entry(&self, shared: &mut Shared, tag: Tag, span: usize) -> Result<()> {
        let mut data = &shared.buffer[tag.header_len..span];
        while !data.is_empty() {
            let child = match Tag::parse(data) {
                Parsed::Tag(child) => child,
                _ => return Err(EngineError::MalformedEbml),
            };

            match child.id {
                tags::TRACK_NUMBER => {
                    if vint::fixed_uint(child.contents(data)) >= MAX_TRACKS {
                        return Err(EngineError::TooManyTracks);
                    }
                }
                tags::AUDIO => self.has_audio.store(true, Ordering::Relaxed),
                tags::VIDEO => {
                    self.has_video.store(true, Ordering::Relaxed);
                    // Grab the dimensions while passing by.
                    let mut video = child.contents(data);
                    while !video.is_empty() {
                        let sub = match Tag::parse(video) {
                            Parsed::Tag(sub) => sub,
                            _ => return Err(EngineError::MalformedEbml),
                        };
                        match sub.id {
                            tags::PIXEL_WIDTH => self
                                .width
                                .store(vint::fixed_uint(sub.contents(video)) as u32, Ordering::Relaxed),
                            tags::PIXEL_HEIGHT => self
                                .height
                                .store(vint::fixed_uint(sub.contents(video)) as u32, Ordering::Relaxed),
                            _ => {}
                        }
                        video = sub.skip(video);
                    }
                }
                _ => {}
            }

            data = child.skip(data);
        }

        append_to_tracks(shared, span);
        Ok(())
    }

    /// Rewrite one block-carrying tag and deliver it to every viewer
    /// whose state permits it.
    fn on_block(&self, shared: &mut Shared, tag: Tag, span: usize) -> Result<()> {
        // One copy; every viewer shares the same allocation.
        let raw = Bytes::copy_from_slice(&shared.buffer[..span]);

        let mut key = false;
        let block = if tag.id == tags::BLOCK_GROUP {
            // A grouped block is a keyframe exactly when it has no
            // reference frame.
            key = true;
            let mut found = None;
            let mut data = &raw[tag.header_len..];
            while !data.is_empty() {
                let child = match Tag::parse(data) {
                    Parsed::Tag(child) => child,
                    _ => return Err(EngineError::MalformedEbml),
                };
                match child.id {
                    tags::BLOCK => found = Some(child.contents(data)),
                    tags::REFERENCE_BLOCK => {
                        key = vint::fixed_uint(child.contents(data)) == 0;
                    }
                    _ => {}
                }
                data = child.skip(data);
            }
            found.ok_or(EngineError::BlockGroupMissingBlock)?
        } else {
            &raw[tag.header_len..]
        };

        let Some((track, track_len)) = vint::vint(block) else {
            return Err(EngineError::InvalidTrack);
        };
        if track >= MAX_TRACKS || block.len() < track_len + 3 {
            return Err(EngineError::InvalidTrack);
        }

        // This bit is always 0 in a Block, but 1 in a keyframe
        // SimpleBlock.
        key = key || block[track_len + 2] & 0x80 != 0;

        // Block timecodes are relative to the cluster timecode.
        let relative = u64::from(block[track_len]) << 8 | u64::from(block[track_len + 1]);
        if shared.time.recv + relative < shared.time.last {
            // The producer went backwards, most likely a restart; slide
            // the cluster timecode forward instead.
            shared.time.shift += shared.time.last - (shared.time.recv + relative);
            shared.time.recv = shared.time.last - relative;
        }
        shared.time.last = shared.time.recv + relative;

        let cluster = cluster_wrapper(shared.time.recv);
        let mask = 1u32 << track;

        let Shared {
            viewers,
            header,
            tracks,
            time,
            ..
        } = shared;

        for viewer in viewers.values_mut() {
            if !viewer.skip_headers {
                if !viewer.send(header) || !viewer.send(tracks) {
                    continue;
                }
                viewer.skip_headers = true;
                viewer.skip_cluster = false;
            }

            if key {
                viewer.seen_keyframes |= mask;
            }

            if viewer.seen_keyframes & mask != 0 {
                if !viewer.skip_cluster || relative != time.sent {
                    viewer.skip_cluster = viewer.send(&cluster);
                }
                if !viewer.skip_cluster || !viewer.send(&raw) {
                    viewer.seen_keyframes &= !mask;
                }
            }
        }

        time.sent = relative;
        Ok(())
    }

    /// Attach a viewer. `skip_headers` suppresses header and track
    /// delivery for a viewer migrating from a broadcast with identical
    /// tracks.
    pub fn connect(&self, sink: mpsc::Sender<Bytes>, skip_headers: bool) -> ViewerId {
        let id = ViewerId(self.next_viewer.fetch_add(1, Ordering::Relaxed));
        self.shared().viewers.insert(id, Viewer::new(sink, skip_headers));
        id
    }

    /// Detach a viewer. Pending chunks in its sink remain readable.
    pub fn disconnect(&self, id: ViewerId) {
        self.shared().viewers.remove(&id);
    }

    /// Drop partially parsed input, for a producer reconnecting after a
    /// mid-tag interruption.
    pub fn reset(&self) {
        self.shared().buffer.clear();
    }

    /// Arm the grace timer. The housekeeping tick finishes the close
    /// once the timer outlives the configured window.
    pub fn close(&self) {
        self.closing_ms.store(0, Ordering::Release);
    }

    /// `true` while a producer holds the stream (grace timer not armed).
    pub(crate) fn is_live(&self) -> bool {
        self.closing_ms.load(Ordering::Acquire) < 0
    }

    /// Hand the stream to a new producer, cancelling the grace timer.
    pub(crate) fn reclaim(&self) {
        self.closing_ms.store(-1, Ordering::Release);
    }

    /// Advance the grace timer; `true` once it has outlived `timeout`.
    pub(crate) fn advance_grace(&self, step: Duration, timeout: Duration) -> bool {
        let ms = self.closing_ms.load(Ordering::Acquire);
        if ms < 0 {
            return false;
        }
        let ms = ms + step.as_millis() as i64;
        self.closing_ms.store(ms, Ordering::Release);
        ms > timeout.as_millis() as i64
    }

    /// Fold the tick's byte count into the rate gauge.
    pub(crate) fn roll_rate(&self) {
        self.shared().rate.roll();
    }

    /// Final close: mark the broadcast closed and EOF-signal every
    /// viewer with an empty chunk.
    pub(crate) fn finish_close(&self) {
        self.closed.store(true, Ordering::Release);
        let shared = self.shared();
        let eof = Bytes::new();
        for viewer in shared.viewers.values() {
            viewer.send(&eof);
        }
    }

    /// `true` once the producer is gone and the grace window has
    /// elapsed.
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn has_video(&self) -> bool {
        self.has_video.load(Ordering::Relaxed)
    }

    pub fn has_audio(&self) -> bool {
        self.has_audio.load(Ordering::Relaxed)
    }

    /// Width of the video track that came last in `Tracks`. Hopefully
    /// there is only one video track in the stream.
    pub fn width(&self) -> u32 {
        self.width.load(Ordering::Relaxed)
    }

    pub fn height(&self) -> u32 {
        self.height.load(Ordering::Relaxed)
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn viewer_count(&self) -> usize {
        self.shared().viewers.len()
    }

    /// Moving mean and variance of the ingest byte rate per
    /// housekeeping tick.
    pub fn rate(&self) -> (f64, f64) {
        let shared = self.shared();
        (shared.rate.mean(), shared.rate.variance())
    }
}

impl Default for Broadcast {
    fn default() -> Self {
        Self::new()
    }
}

/// The caches are shared with in-flight sink reads, so extending one
/// allocates a fresh blob instead of appending in place.
fn append_to_tracks(shared: &mut Shared, span: usize) {
    let mut next = BytesMut::with_capacity(shared.tracks.len() + span);
    next.extend_from_slice(&shared.tracks);
    next.extend_from_slice(&shared.buffer[..span]);
    shared.tracks = next.freeze();
}

/// A minimal Cluster open: indeterminate length plus one eight-byte
/// Timecode. Fifteen bytes on the wire.
fn cluster_wrapper(timecode: u64) -> Bytes {
    let mut out = BytesMut::with_capacity(15);
    vint::put_tag_header(&mut out, tags::CLUSTER, tags::INDETERMINATE);
    vint::put_tag_header(&mut out, tags::TIMECODE, 8);
    vint::put_fixed_uint(&mut out, timecode, 8);
    out.freeze()
}
