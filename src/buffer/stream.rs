//! The stream buffer: append/expand on the tail, consume from the head,
//! and the fill/flush protocol against a bound I/O adapter.

use crate::buffer::chunk::{Chunk, ChunkId};
use crate::config::{
    IO_PULL_SIZE_DEFAULT, IO_PULL_SIZE_MINIMUM, PAGE_SIZE, READ_REFERENCE_THRESHOLD_DEFAULT,
    READ_REFERENCE_THRESHOLD_MINIMUM, WRITE_REFERENCE_THRESHOLD_DEFAULT,
    WRITE_REFERENCE_THRESHOLD_MINIMUM,
};
use crate::io::IoAdapter;
use crate::slab::SlabPool;
use bytes::{Bytes, BytesMut};
use eyre::Result;

/// Segmented FIFO byte buffer.
///
/// Content is a chain of chunks held in an arena: producers fill the tail
/// chunk and readers drain the head chunk through a read cursor. Retired
/// chunk records go on a free list and are recycled for later appends, while
/// their backing storage (pool page, heap block, or shared alias handle) is
/// released immediately.
///
/// The arena's slot 0 is the permanent tail record: it is never put on the
/// free list, and draining the last chunk resets it in place, so an empty
/// buffer always has `head == tail` with no backing.
///
/// Bytes always read back in append order, whether they were copied or
/// aliased.
pub struct StreamBuffer {
    slots: Vec<Chunk>,
    head: ChunkId,
    tail: ChunkId,
    /// Free list of retired slot ids, linked through `Chunk::next`.
    free: Option<ChunkId>,
    /// Read cursor: offset into the head chunk's filled region.
    read_pos: usize,
    pool: SlabPool,
    io: Option<Box<dyn IoAdapter>>,
    /// Reusable buffer for adapter pulls.
    pull_buffer: Vec<u8>,
    write_reference_threshold: usize,
    read_reference_threshold: usize,
    io_pull_size: usize,
}

impl StreamBuffer {
    /// Creates an empty, unbound buffer drawing pages from `pool`.
    pub fn new(pool: SlabPool) -> Self {
        Self {
            slots: vec![Chunk::empty()],
            head: ChunkId(0),
            tail: ChunkId(0),
            free: None,
            read_pos: 0,
            pool,
            io: None,
            pull_buffer: Vec::new(),
            write_reference_threshold: WRITE_REFERENCE_THRESHOLD_DEFAULT,
            read_reference_threshold: READ_REFERENCE_THRESHOLD_DEFAULT,
            io_pull_size: IO_PULL_SIZE_DEFAULT,
        }
    }

    // ------------------------------------------------------------------
    // arena plumbing
    // ------------------------------------------------------------------

    fn chunk(&self, id: ChunkId) -> &Chunk {
        &self.slots[id.0 as usize]
    }

    fn chunk_mut(&mut self, id: ChunkId) -> &mut Chunk {
        &mut self.slots[id.0 as usize]
    }

    /// Takes a record from the free list or grows the arena.
    fn alloc_node(&mut self, chunk: Chunk) -> ChunkId {
        debug_assert!(chunk.next.is_none());
        match self.free {
            Some(id) => {
                self.free = self.chunk(id).next;
                *self.chunk_mut(id) = chunk;
                id
            }
            None => {
                let id = ChunkId(self.slots.len() as u32);
                self.slots.push(chunk);
                id
            }
        }
    }

    fn push_tail(&mut self, chunk: Chunk) -> ChunkId {
        let id = self.alloc_node(chunk);
        let old_tail = self.tail;
        self.chunk_mut(old_tail).next = Some(id);
        self.tail = id;
        id
    }

    /// Retires the head chunk: releases its backing, recycles the record,
    /// and advances the head. Returns false when the buffer becomes empty
    /// (the tail record is reset in place instead of retired).
    fn retire_head(&mut self) -> bool {
        let head = self.head;
        self.chunk_mut(head).release();
        self.read_pos = 0;

        if head == self.tail {
            return false;
        }

        let next = match self.chunk_mut(head).next.take() {
            Some(next) => next,
            None => unreachable!("non-tail chunk always links to a successor"),
        };
        self.chunk_mut(head).next = self.free;
        self.free = Some(head);
        self.head = next;
        true
    }

    fn tail_write(&mut self, data: &[u8]) {
        let tail = self.tail;
        self.chunk_mut(tail).write(data);
    }

    /// Slab page for page-sized requests, exact-size heap block beyond that.
    fn fresh_chunk(&self, required: usize) -> Chunk {
        if required <= PAGE_SIZE {
            Chunk::page(self.pool.allocate())
        } else {
            Chunk::heap(required)
        }
    }

    // ------------------------------------------------------------------
    // write path
    // ------------------------------------------------------------------

    /// Remaining writable capacity of the tail chunk.
    pub fn writable_size(&self) -> usize {
        self.chunk(self.tail).writable()
    }

    /// Appends a copy of `data`, flushing to a bound adapter before growing
    /// when the tail runs out of room.
    pub fn append(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        if data.len() <= self.writable_size() {
            self.tail_write(data);
            return Ok(());
        }
        self.expand(Some(data), data.len(), true)
    }

    /// Appends a copy of `data` without ever touching the bound adapter.
    /// Used on the fill path, where adapter recursion is unwanted.
    pub fn append_nonblock(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if data.len() <= self.writable_size() {
            self.tail_write(data);
            return;
        }
        self.expand_nonblock(Some(data), data.len());
    }

    /// Guarantees `require` contiguous writable bytes in the tail.
    pub fn ensure_writable(&mut self, require: usize) -> Result<()> {
        if self.writable_size() < require {
            self.expand(None, require, true)?;
        }
        Ok(())
    }

    /// Fast single-byte write. The caller must have reserved capacity with
    /// [`ensure_writable`](Self::ensure_writable).
    pub fn write_byte(&mut self, byte: u8) {
        assert!(
            self.writable_size() >= 1,
            "write_byte requires reserved capacity; call ensure_writable first"
        );
        self.tail_write(&[byte]);
    }

    /// Appends a shared payload, choosing copy vs. alias by size.
    ///
    /// Above the write reference threshold the payload is never copied: with
    /// an adapter bound, buffered bytes are flushed and the payload written
    /// straight through; otherwise it becomes an aliased tail chunk holding
    /// its own handle on the storage. At or below the threshold the bytes
    /// are copied like any other append. Returns the payload length.
    pub fn append_shared(&mut self, bytes: Bytes) -> Result<usize> {
        let length = bytes.len();
        if length > self.write_reference_threshold {
            if self.io.is_some() {
                self.flush()?;
                self.with_io(|_, io| io.write_all(&bytes))?;
            } else {
                self.append_reference(bytes);
            }
        } else {
            self.append(&bytes)?;
        }
        Ok(length)
    }

    fn append_reference(&mut self, bytes: Bytes) {
        if self.head == self.tail && self.chunk(self.tail).is_unbacked() {
            let tail = self.tail;
            *self.chunk_mut(tail) = Chunk::shared(bytes);
        } else {
            self.push_tail(Chunk::shared(bytes));
        }
    }

    /// Obtains room for `length` more bytes (and copies `data` in when
    /// given; `None` reserves capacity only).
    fn expand(&mut self, data: Option<&[u8]>, length: usize, allow_flush: bool) -> Result<()> {
        if allow_flush && self.io.is_some() {
            self.flush()?;
            if self.writable_size() >= length {
                if let Some(data) = data {
                    self.tail_write(&data[..length]);
                }
                return Ok(());
            }
        }
        self.expand_nonblock(data, length);
        Ok(())
    }

    fn expand_nonblock(&mut self, mut data: Option<&[u8]>, mut length: usize) {
        // Fill whatever the tail still holds before growing.
        if let Some(d) = data {
            let avail = self.writable_size().min(d.len());
            if avail > 0 {
                self.tail_write(&d[..avail]);
                data = Some(&d[avail..]);
                length -= avail;
            }
            if length == 0 {
                return;
            }
        }

        let tail_id = self.tail;
        let tail = self.chunk(tail_id);
        if tail.is_growable() {
            let target = tail.filled() + length;
            self.chunk_mut(tail_id).grow(target);
            if let Some(d) = data {
                self.tail_write(d);
            }
        } else if tail.is_unbacked() {
            // Logically empty buffer: install backing in place.
            let fresh = self.fresh_chunk(length);
            *self.chunk_mut(tail_id) = fresh;
            if let Some(d) = data {
                self.tail_write(d);
            }
        } else {
            // Aliased or page-backed tails are sealed at their final size;
            // growth opens a fresh chunk after them.
            let fresh = self.fresh_chunk(length);
            let id = self.push_tail(fresh);
            if let Some(d) = data {
                self.chunk_mut(id).write(d);
            }
        }
    }

    // ------------------------------------------------------------------
    // read path
    // ------------------------------------------------------------------

    /// Readable bytes remaining in the head chunk.
    pub fn top_readable_size(&self) -> usize {
        self.chunk(self.head).filled() - self.read_pos
    }

    /// Readable bytes across all chunks.
    pub fn all_readable_size(&self) -> usize {
        let mut size = self.top_readable_size();
        let mut next = self.chunk(self.head).next;
        while let Some(id) = next {
            let chunk = self.chunk(id);
            size += chunk.filled();
            next = chunk.next;
        }
        size
    }

    pub fn is_empty(&self) -> bool {
        self.all_readable_size() == 0
    }

    /// Advances the read cursor, retiring the head chunk once exhausted.
    fn consumed(&mut self, length: usize) {
        self.read_pos += length;
        if self.read_pos >= self.chunk(self.head).filled() {
            self.retire_head();
        }
    }

    /// Copies (or, with `None`, discards) up to `length` bytes across as
    /// many chunks as needed. Returns the actual count, short when the
    /// buffer runs dry.
    fn drain(&mut self, length: usize, mut out: Option<&mut [u8]>) -> usize {
        let mut moved = 0;
        while moved < length {
            let avail = self.top_readable_size();
            let want = length - moved;

            if want <= avail {
                if let Some(out) = out.as_deref_mut() {
                    let head = self.chunk(self.head);
                    out[moved..moved + want]
                        .copy_from_slice(&head.readable()[self.read_pos..self.read_pos + want]);
                }
                self.consumed(want);
                return length;
            }

            if avail > 0 {
                if let Some(out) = out.as_deref_mut() {
                    let head = self.chunk(self.head);
                    out[moved..moved + avail].copy_from_slice(&head.readable()[self.read_pos..]);
                }
                moved += avail;
            }

            if !self.retire_head() {
                return moved;
            }
        }
        moved
    }

    /// Fills `out` from buffered bytes only; short count when the buffer
    /// runs dry.
    pub fn read_nonblock(&mut self, out: &mut [u8]) -> usize {
        let length = out.len();
        self.drain(length, Some(out))
    }

    /// Discards up to `length` buffered bytes; returns the actual count.
    pub fn skip_nonblock(&mut self, length: usize) -> usize {
        self.drain(length, None)
    }

    /// Next readable byte without consuming it, if any is buffered.
    pub fn peek_byte(&self) -> Option<u8> {
        if self.top_readable_size() == 0 {
            return None;
        }
        Some(self.chunk(self.head).readable()[self.read_pos])
    }

    /// Reads one byte, pulling once from a bound adapter when empty.
    /// `Ok(None)` means starved (or end of stream), never an error.
    pub fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.top_readable_size() == 0 {
            if self.io.is_none() || self.fill_from_io()? == 0 {
                return Ok(None);
            }
        }
        let byte = self.chunk(self.head).readable()[self.read_pos];
        self.consumed(1);
        Ok(Some(byte))
    }

    /// Fills `out` completely, pulling from the adapter as needed. `false`
    /// when the bytes cannot be produced (unbound and short, or stream
    /// exhausted); the buffer is left untouched in that case.
    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<bool> {
        if !self.ensure_readable(out.len())? {
            return Ok(false);
        }
        self.read_nonblock(out);
        Ok(true)
    }

    /// Discards up to `length` bytes, pulling once when empty and bound.
    pub fn skip(&mut self, length: usize) -> Result<usize> {
        if length == 0 {
            return Ok(0);
        }
        if self.top_readable_size() == 0 && self.io.is_some() {
            self.fill_from_io()?;
        }
        Ok(self.skip_nonblock(length))
    }

    /// Materializes up to `length` buffered bytes.
    ///
    /// When the request lies entirely within an aliased head chunk and meets
    /// the read reference threshold, the returned [`Bytes`] is a zero-copy
    /// slice of the original shared storage. Otherwise the bytes are copied.
    /// Short when the buffer runs dry.
    pub fn read_bytes_nonblock(&mut self, length: usize) -> Bytes {
        if length == 0 {
            return Bytes::new();
        }

        if length <= self.top_readable_size() && length >= self.read_reference_threshold {
            if let Some(shared) = self.chunk(self.head).shared_bytes() {
                let slice = shared.slice(self.read_pos..self.read_pos + length);
                self.consumed(length);
                return slice;
            }
        }

        let take = length.min(self.all_readable_size());
        let mut buf = vec![0u8; take];
        let filled = self.read_nonblock(&mut buf);
        buf.truncate(filled);
        Bytes::from(buf)
    }

    /// Materializes `length` bytes, pulling once when empty and bound.
    pub fn read_bytes(&mut self, length: usize) -> Result<Bytes> {
        if length == 0 {
            return Ok(Bytes::new());
        }
        if self.top_readable_size() == 0 && self.io.is_some() {
            self.fill_from_io()?;
        }
        Ok(self.read_bytes_nonblock(length))
    }

    /// The head chunk's readable region as [`Bytes`]; zero-copy for aliased
    /// chunks, copied otherwise.
    fn head_chunk_as_bytes(&self) -> Bytes {
        let head = self.chunk(self.head);
        if head.filled() == self.read_pos {
            return Bytes::new();
        }
        if let Some(shared) = head.shared_bytes() {
            return shared.slice(self.read_pos..head.filled());
        }
        Bytes::copy_from_slice(&head.readable()[self.read_pos..])
    }

    /// Everything readable as one contiguous [`Bytes`], without consuming.
    /// A buffer holding a single aliased chunk returns a zero-copy slice.
    pub fn all_as_bytes(&self) -> Bytes {
        if self.head == self.tail {
            return self.head_chunk_as_bytes();
        }

        let mut out = BytesMut::with_capacity(self.all_readable_size());
        out.extend_from_slice(&self.chunk(self.head).readable()[self.read_pos..]);
        let mut next = self.chunk(self.head).next;
        while let Some(id) = next {
            let chunk = self.chunk(id);
            out.extend_from_slice(chunk.readable());
            next = chunk.next;
        }
        out.freeze()
    }

    // ------------------------------------------------------------------
    // I/O protocol
    // ------------------------------------------------------------------

    /// Binds an adapter; reads transparently pull from it and appends may
    /// flush through it.
    pub fn bind_io(&mut self, io: Box<dyn IoAdapter>) {
        self.io = Some(io);
    }

    /// Unbinds and returns the adapter; the buffer goes back to starved
    /// (zero/short) reads.
    pub fn unbind_io(&mut self) -> Option<Box<dyn IoAdapter>> {
        self.io.take()
    }

    pub fn has_io(&self) -> bool {
        self.io.is_some()
    }

    /// Runs `f` with the adapter temporarily taken out of the buffer, so the
    /// closure can borrow both.
    fn with_io<T>(
        &mut self,
        f: impl FnOnce(&mut Self, &mut dyn IoAdapter) -> Result<T>,
    ) -> Result<T> {
        let mut io = match self.io.take() {
            Some(io) => io,
            None => unreachable!("with_io callers check has_io first"),
        };
        let result = f(self, io.as_mut());
        self.io = Some(io);
        result
    }

    /// Flushes all readable bytes to the bound adapter, consuming them.
    /// Returns the byte count written; zero when unbound or empty.
    pub fn flush(&mut self) -> Result<usize> {
        if self.io.is_none() {
            return Ok(0);
        }
        self.with_io(|buf, io| buf.flush_to(io, true))
    }

    /// Writes all readable bytes to `io` in order.
    ///
    /// With `consume` the chunks are retired as they are written. Without it
    /// the walk is read-only: the buffer keeps its content, and a repeated
    /// peek-flush writes the same bytes again - callers mirroring buffered
    /// content to a stream own that protocol decision.
    pub fn flush_to(&mut self, io: &mut dyn IoAdapter, consume: bool) -> Result<usize> {
        if self.top_readable_size() == 0 {
            return Ok(0);
        }

        let head_bytes = self.head_chunk_as_bytes();
        io.write_all(&head_bytes)?;
        let mut written = head_bytes.len();

        if consume {
            while self.retire_head() {
                let head = self.chunk(self.head);
                io.write_all(head.readable())?;
                written += head.filled();
            }
        } else {
            let mut next = self.chunk(self.head).next;
            while let Some(id) = next {
                let chunk = self.chunk(id);
                io.write_all(chunk.readable())?;
                written += chunk.filled();
                next = chunk.next;
            }
        }
        Ok(written)
    }

    /// Pulls once from the bound adapter (up to the configured pull size)
    /// and appends the bytes. Returns the pulled count; zero means end of
    /// stream, which the caller interprets.
    pub fn fill_from_io(&mut self) -> Result<usize> {
        if self.io.is_none() {
            return Ok(0);
        }
        let mut pull = std::mem::take(&mut self.pull_buffer);
        let pull_size = self.io_pull_size;
        let pulled = self.with_io(|_, io| io.partial_read(pull_size, &mut pull));
        match pulled {
            Ok(count) => {
                self.append_nonblock(&pull[..count]);
                self.pull_buffer = pull;
                Ok(count)
            }
            Err(err) => {
                self.pull_buffer = pull;
                Err(err)
            }
        }
    }

    /// Makes at least `require` bytes readable, pulling from the adapter as
    /// needed. `Ok(false)` when unbound and short, or when the stream ends
    /// first; already-pulled bytes stay buffered.
    pub fn ensure_readable(&mut self, require: usize) -> Result<bool> {
        if self.top_readable_size() >= require {
            return Ok(true);
        }
        let mut available = self.all_readable_size();
        if available >= require {
            return Ok(true);
        }
        if self.io.is_none() {
            return Ok(false);
        }
        while available < require {
            let pulled = self.fill_from_io()?;
            if pulled == 0 {
                return Ok(false);
            }
            available += pulled;
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // lifecycle and configuration
    // ------------------------------------------------------------------

    /// Drops all buffered content, releasing every chunk's backing.
    pub fn clear(&mut self) {
        while self.retire_head() {}
    }

    /// Clears content and unbinds the adapter.
    pub fn reset(&mut self) {
        self.clear();
        self.io = None;
    }

    /// Sets the copy-avoidance size for shared appends, clamped up to the
    /// documented floor.
    pub fn set_write_reference_threshold(&mut self, length: usize) {
        self.write_reference_threshold = length.max(WRITE_REFERENCE_THRESHOLD_MINIMUM);
    }

    pub fn write_reference_threshold(&self) -> usize {
        self.write_reference_threshold
    }

    /// Sets the zero-copy size for aliased reads, clamped up to the
    /// documented floor.
    pub fn set_read_reference_threshold(&mut self, length: usize) {
        self.read_reference_threshold = length.max(READ_REFERENCE_THRESHOLD_MINIMUM);
    }

    pub fn read_reference_threshold(&self) -> usize {
        self.read_reference_threshold
    }

    /// Sets the per-pull byte count for adapter reads, clamped up to the
    /// documented floor.
    pub fn set_io_pull_size(&mut self, length: usize) {
        self.io_pull_size = length.max(IO_PULL_SIZE_MINIMUM);
    }

    pub fn io_pull_size(&self) -> usize {
        self.io_pull_size
    }
}

impl std::fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("readable", &self.all_readable_size())
            .field("writable", &self.writable_size())
            .field("bound", &self.io.is_some())
            .finish()
    }
}
