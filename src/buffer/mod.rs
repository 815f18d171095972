//! # Buffer Module
//!
//! The segmented streaming buffer: a FIFO byte queue built from a linked
//! chain of chunks, designed so serializers can append without up-front
//! sizing and deserializers can consume without compacting.
//!
//! ## Architecture Overview
//!
//! ```text
//! StreamBuffer
//!   ├── chunk arena: Vec<Chunk> + free list of retired records
//!   │     (slot 0 is the permanent tail record)
//!   │
//!   │   head                                   tail
//!   │    │                                      │
//!   │    v                                      v
//!   │  [ chunk ] -> [ chunk ] -> [ chunk ] -> [ chunk ]
//!   │    ^ read cursor                          ^ writable capacity
//!   │
//!   ├── SlabPool handle: page-sized chunk backing
//!   └── optional IoAdapter: flush on overflow, pull on underflow
//! ```
//!
//! ## Chunk Backing
//!
//! Each chunk's bytes live in exactly one of:
//!
//! - a **pool page** (fixed size, returned to the pool when the chunk is
//!   retired),
//! - a **heap block** (the only backing that grows in place; oversized
//!   requests get their exact size, growth doubles capacity), or
//! - **aliased shared bytes** (a [`bytes::Bytes`] handle that keeps the
//!   external storage alive with zero copies; never writable, so the next
//!   append opens a fresh chunk instead of mutating aliased data).
//!
//! ## Zero-Copy Rules
//!
//! Shared payloads above the write reference threshold are appended by
//! handle, not copied. Reads of at least the read reference threshold that
//! fall entirely inside an aliased chunk come back as zero-copy slices of
//! the original storage. Both thresholds clamp to documented floors - large
//! aliased payloads that are re-exported untouched are never copied at all.
//!
//! ## Ordering Guarantee
//!
//! Bytes read in exactly the order appended, across any mix of copied and
//! aliased chunks and any number of chunk boundaries.

pub(crate) mod chunk;
mod stream;

pub use stream::StreamBuffer;
