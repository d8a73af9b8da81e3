//! Lazy byte-stream bodies.
//!
//! A [`Body`] is the request body type used across streamsign:
//! `http::Request<Body>`. It wraps one concrete [`Stream`] variant:
//!
//! - [`BytesStream`]: a fixed in-memory buffer, length always known.
//! - [`FileStream`]: an OS file handle, length known when stat succeeds.
//! - [`CallableStream`]: a producer closure, an empty chunk ends the stream.
//! - [`IterStream`]: an iterator of chunks, empty chunks are skipped.
//! - [`FixedSizeStream`]: re-chunks an inner body into fixed-size blocks.
//! - [`RewindableStream`]: caches an inner body so it can be replayed.
//!
//! Streams are consumed by a single caller, in order, one chunk at a time.
//! Apart from [`RewindableStream`] and [`BytesStream`] they are one-pass:
//! draining them advances the underlying source.

use crate::{Error, Result};
use bytes::{Bytes, BytesMut};
use std::fmt::{self, Debug};
use std::fs::File;
use std::io::Read;

/// Read size for file-backed streams.
const FILE_READ_SIZE: usize = 8 * 1024;

/// The capability contract every body variant implements.
pub trait Stream: Send + 'static {
    /// Best-effort byte length.
    ///
    /// Returns `Some` only when the exact count is cheaply knowable up
    /// front. Never guesses.
    fn len(&self) -> Option<u64>;

    /// Produce the next chunk, `Ok(None)` once exhausted.
    ///
    /// Implementations must never drop a non-empty chunk.
    fn next_chunk(&mut self) -> Result<Option<Bytes>>;

    /// Drain the remaining chunks into a single buffer.
    ///
    /// This is a destructive, one-time drain for non-replayable variants.
    /// [`BytesStream`] and a fully cached [`RewindableStream`] override this
    /// to be idempotent.
    fn read_to_bytes(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next_chunk()? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

/// The request body: a boxed stream variant.
pub struct Body {
    inner: Box<dyn Stream>,
}

impl Body {
    /// An empty in-memory body.
    pub fn empty() -> Self {
        Self::from_bytes(Bytes::new())
    }

    /// A body backed by an in-memory buffer.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self {
            inner: Box::new(BytesStream::new(bytes.into())),
        }
    }

    /// A body backed by a file handle.
    pub fn from_file(file: File) -> Self {
        Self {
            inner: Box::new(FileStream::new(file)),
        }
    }

    /// A body produced by a closure; an empty chunk ends the stream.
    pub fn from_callable(f: impl FnMut() -> Result<Bytes> + Send + 'static) -> Self {
        Self {
            inner: Box::new(CallableStream::new(f)),
        }
    }

    /// A body backed by an iterator of chunks; empty chunks are skipped.
    pub fn from_iter(iter: impl Iterator<Item = Bytes> + Send + 'static) -> Self {
        Self {
            inner: Box::new(IterStream::new(iter)),
        }
    }

    /// A body backed by any stream implementation.
    pub fn from_stream(stream: impl Stream) -> Self {
        Self {
            inner: Box::new(stream),
        }
    }

    /// Re-chunk this body into blocks of exactly `size` bytes.
    pub fn into_fixed_size(self, size: usize) -> Self {
        Self::from_stream(FixedSizeStream::new(self, size))
    }

    /// Make this body replayable by caching its chunks.
    pub fn into_rewindable(self) -> Self {
        Self::from_stream(RewindableStream::new(self))
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Stream for Body {
    fn len(&self) -> Option<u64> {
        self.inner.len()
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.inner.next_chunk()
    }

    fn read_to_bytes(&mut self) -> Result<Bytes> {
        self.inner.read_to_bytes()
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body").field("len", &self.len()).finish()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Self::from_bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Self::from_bytes(Bytes::from(v))
    }
}

/// A fixed in-memory buffer.
#[derive(Debug)]
pub struct BytesStream {
    data: Bytes,
    consumed: bool,
}

impl BytesStream {
    /// Create a stream over the given buffer.
    pub fn new(data: Bytes) -> Self {
        Self {
            data,
            consumed: false,
        }
    }
}

impl Stream for BytesStream {
    fn len(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.consumed || self.data.is_empty() {
            return Ok(None);
        }
        self.consumed = true;
        Ok(Some(self.data.clone()))
    }

    // Replayable: the buffer stays intact across reads.
    fn read_to_bytes(&mut self) -> Result<Bytes> {
        Ok(self.data.clone())
    }
}

/// A stream over an OS file handle, read in bounded blocks.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    len: Option<u64>,
}

impl FileStream {
    /// Create a stream over the given file.
    ///
    /// The length is taken from metadata when the handle is a regular file;
    /// pipes and sockets report an unknown length.
    pub fn new(file: File) -> Self {
        let len = file
            .metadata()
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len());
        Self { file, len }
    }
}

impl Stream for FileStream {
    fn len(&self) -> Option<u64> {
        self.len
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let mut buf = [0u8; FILE_READ_SIZE];
        let n = self
            .file
            .read(&mut buf)
            .map_err(|e| Error::unexpected("failed to read body file").with_source(e))?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(Bytes::copy_from_slice(&buf[..n])))
    }
}

/// A stream over a producer closure.
///
/// The closure is polled for the next chunk; an empty chunk signals
/// end-of-stream and the closure is never invoked again afterwards.
pub struct CallableStream {
    f: Box<dyn FnMut() -> Result<Bytes> + Send + 'static>,
    done: bool,
}

impl CallableStream {
    /// Create a stream over the given producer.
    pub fn new(f: impl FnMut() -> Result<Bytes> + Send + 'static) -> Self {
        Self {
            f: Box::new(f),
            done: false,
        }
    }
}

impl Stream for CallableStream {
    fn len(&self) -> Option<u64> {
        None
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.done {
            return Ok(None);
        }
        let chunk = (self.f)()?;
        if chunk.is_empty() {
            self.done = true;
            return Ok(None);
        }
        Ok(Some(chunk))
    }
}

impl Debug for CallableStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableStream")
            .field("done", &self.done)
            .finish()
    }
}

/// A stream over an iterator of chunks.
pub struct IterStream {
    iter: Box<dyn Iterator<Item = Bytes> + Send + 'static>,
}

impl IterStream {
    /// Create a stream over the given iterator.
    pub fn new(iter: impl Iterator<Item = Bytes> + Send + 'static) -> Self {
        Self {
            iter: Box::new(iter),
        }
    }
}

impl Stream for IterStream {
    fn len(&self) -> Option<u64> {
        None
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        // Empty chunks are filler, not end-of-stream.
        for chunk in self.iter.by_ref() {
            if !chunk.is_empty() {
                return Ok(Some(chunk));
            }
        }
        Ok(None)
    }
}

impl Debug for IterStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IterStream").finish()
    }
}

/// Re-chunks an inner body into blocks of exactly `size` bytes.
///
/// The final block may be shorter. An exact-multiple input produces only
/// full blocks: this stream never emits an empty block, so a consumer that
/// needs a zero-length terminator has to append it itself.
#[derive(Debug)]
pub struct FixedSizeStream {
    inner: Body,
    size: usize,
    buffer: BytesMut,
    done: bool,
}

impl FixedSizeStream {
    /// Wrap `inner`, emitting blocks of exactly `size` bytes.
    pub fn new(inner: Body, size: usize) -> Self {
        assert!(size > 0, "block size must be positive");
        Self {
            inner,
            size,
            buffer: BytesMut::new(),
            done: false,
        }
    }
}

impl Stream for FixedSizeStream {
    fn len(&self) -> Option<u64> {
        self.inner.len()
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        loop {
            if self.buffer.len() >= self.size {
                return Ok(Some(self.buffer.split_to(self.size).freeze()));
            }
            if self.done {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let rest = self.buffer.split().freeze();
                return Ok(Some(rest));
            }
            match self.inner.next_chunk()? {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => self.done = true,
            }
        }
    }
}

/// Caches an inner body on first consumption and replays it afterwards.
///
/// The inner stream is drained exactly once; once it reports end-of-stream
/// it is never touched again. This is what makes a [`CallableStream`] body
/// safe to consume twice: the underlying producer already signaled
/// end-of-stream and must not be re-invoked.
#[derive(Debug)]
pub struct RewindableStream {
    inner: Body,
    cache: Vec<Bytes>,
    pos: usize,
    fully_cached: bool,
}

impl RewindableStream {
    /// Wrap `inner` in a caching replay layer.
    pub fn new(inner: Body) -> Self {
        Self {
            inner,
            cache: Vec::new(),
            pos: 0,
            fully_cached: false,
        }
    }
}

impl Stream for RewindableStream {
    fn len(&self) -> Option<u64> {
        if self.fully_cached {
            return Some(self.cache.iter().map(|c| c.len() as u64).sum());
        }
        self.inner.len()
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.pos < self.cache.len() {
            let chunk = self.cache[self.pos].clone();
            self.pos += 1;
            return Ok(Some(chunk));
        }

        if self.fully_cached {
            // Exhausting a replay rewinds it for the next consumer.
            self.pos = 0;
            return Ok(None);
        }

        match self.inner.next_chunk()? {
            Some(chunk) => {
                self.cache.push(chunk.clone());
                self.pos += 1;
                Ok(Some(chunk))
            }
            None => {
                self.fully_cached = true;
                self.pos = 0;
                Ok(None)
            }
        }
    }
}
