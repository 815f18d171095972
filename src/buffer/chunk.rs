//! Chunk records: one contiguous filled byte range plus its backing storage.
//!
//! A chunk's content lives in exactly one of three places: a pool page
//! (fixed capacity, returned to the pool on release), a heap block (growable
//! in place, exact-sized for oversized requests), or aliased external bytes
//! (a shared [`Bytes`] handle that keeps the storage alive; never writable
//! through the chunk). The buffer links chunks through arena handles rather
//! than pointers, so retired records can be recycled from a free list
//! without touching their backing storage.

use crate::config::PAGE_SIZE;
use crate::slab::SlabPage;
use bytes::Bytes;

/// Handle into a buffer's chunk arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ChunkId(pub(crate) u32);

/// Storage behind one chunk.
pub(crate) enum Backing {
    /// No storage: a drained record or the tail of a logically empty buffer.
    None,
    /// One pool page; fixed capacity, never grown in place.
    Page(SlabPage),
    /// Heap block; the only backing that can grow in place.
    Heap(Vec<u8>),
    /// Aliased external bytes. The handle keeps the source alive; writable
    /// capacity is zero so the next write always opens a fresh chunk.
    Shared(Bytes),
}

/// One chunk: the filled region `[0, filled)` of its backing store.
pub(crate) struct Chunk {
    backing: Backing,
    filled: usize,
    pub(crate) next: Option<ChunkId>,
}

impl Chunk {
    pub(crate) fn empty() -> Self {
        Self {
            backing: Backing::None,
            filled: 0,
            next: None,
        }
    }

    pub(crate) fn page(page: SlabPage) -> Self {
        Self {
            backing: Backing::Page(page),
            filled: 0,
            next: None,
        }
    }

    /// Heap chunk with exactly `capacity` writable bytes.
    pub(crate) fn heap(capacity: usize) -> Self {
        Self {
            backing: Backing::Heap(Vec::with_capacity(capacity)),
            filled: 0,
            next: None,
        }
    }

    /// Aliased chunk covering the whole shared payload.
    pub(crate) fn shared(bytes: Bytes) -> Self {
        let filled = bytes.len();
        Self {
            backing: Backing::Shared(bytes),
            filled,
            next: None,
        }
    }

    pub(crate) fn filled(&self) -> usize {
        self.filled
    }

    pub(crate) fn capacity(&self) -> usize {
        match &self.backing {
            Backing::None => 0,
            Backing::Page(_) => PAGE_SIZE,
            Backing::Heap(vec) => vec.capacity(),
            Backing::Shared(bytes) => bytes.len(),
        }
    }

    pub(crate) fn writable(&self) -> usize {
        self.capacity() - self.filled
    }

    pub(crate) fn readable(&self) -> &[u8] {
        match &self.backing {
            Backing::None => &[],
            Backing::Page(page) => &page.as_slice()[..self.filled],
            Backing::Heap(vec) => vec,
            Backing::Shared(bytes) => bytes,
        }
    }

    pub(crate) fn shared_bytes(&self) -> Option<&Bytes> {
        match &self.backing {
            Backing::Shared(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// True when the chunk can grow in place; aliased chunks and pool pages
    /// never can, and unbacked chunks have nothing to grow.
    pub(crate) fn is_growable(&self) -> bool {
        matches!(self.backing, Backing::Heap(_))
    }

    pub(crate) fn is_unbacked(&self) -> bool {
        matches!(self.backing, Backing::None)
    }

    /// Copies `data` into the writable region. Caller ensures it fits.
    pub(crate) fn write(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        debug_assert!(data.len() <= self.writable());
        match &mut self.backing {
            Backing::Page(page) => {
                page.as_mut_slice()[self.filled..self.filled + data.len()].copy_from_slice(data);
                self.filled += data.len();
            }
            Backing::Heap(vec) => {
                vec.extend_from_slice(data);
                self.filled = vec.len();
            }
            Backing::None | Backing::Shared(_) => {
                unreachable!("write into a chunk with no writable backing")
            }
        }
    }

    /// Grows a heap backing to the smallest power-of-two multiple of its
    /// current capacity that holds `target` bytes.
    pub(crate) fn grow(&mut self, target: usize) {
        let Backing::Heap(vec) = &mut self.backing else {
            unreachable!("only heap chunks grow in place");
        };
        let mut next = vec.capacity().max(1) * 2;
        while next < target {
            next *= 2;
        }
        vec.reserve_exact(next - vec.len());
    }

    /// Drops the backing storage (page back to its pool, heap block freed,
    /// alias handle released) and resets the record for reuse.
    pub(crate) fn release(&mut self) {
        self.backing = Backing::None;
        self.filled = 0;
    }
}
