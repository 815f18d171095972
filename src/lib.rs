//! # segbuf - Segmented Streaming Buffer
//!
//! segbuf is a streaming encode/decode buffer for compact binary object
//! serialization, built on a slab-backed page pool. It prioritizes:
//!
//! - **Zero-copy payload handling**: large shared byte strings are aliased
//!   on append and sliced on read, never copied
//! - **Allocation reuse**: chunk backing comes from a bitmap-tracked slab
//!   pool, and retired chunk records are recycled from a free list
//! - **Streaming I/O**: appends flush to a bound stream when the buffer
//!   overflows, reads pull from it when the buffer runs dry
//!
//! ## Quick Start
//!
//! ```
//! use segbuf::{SlabPool, StreamBuffer};
//!
//! let pool = SlabPool::new();
//! let mut buf = StreamBuffer::new(pool);
//!
//! buf.append(b"hello ").unwrap();
//! buf.append(b"world").unwrap();
//!
//! let mut out = [0u8; 11];
//! assert_eq!(buf.read_nonblock(&mut out), 11);
//! assert_eq!(&out, b"hello world");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Serializer / Deserializer (caller)    │
//! ├─────────────────────────────────────────┤
//! │  StreamBuffer (chunk chain + cursors)   │
//! ├─────────────────────┬───────────────────┤
//! │  SlabPool           │  IoAdapter        │
//! │  (page allocation)  │  (flush / pull)   │
//! └─────────────────────┴───────────────────┘
//! ```
//!
//! Producers append bytes (or shared byte handles) at the tail; consumers
//! drain from the head. When the tail cannot hold more, the buffer flushes
//! to the bound stream or allocates a new chunk; when the head runs dry,
//! it pulls from the stream. Backing pages come from [`SlabPool`], a
//! process-lifetime pool of 32-page slabs with bitmap free tracking.
//!
//! ## Concurrency Model
//!
//! Single-threaded, single-owner, cooperative: no operation suspends on its
//! own, and "blocking" reads are synchronous calls into the adapter. The
//! pool handle is clone-shareable and safe to move between workers; give
//! each worker its own [`StreamBuffer`].
//!
//! ## Module Overview
//!
//! - [`buffer`]: chunk chain, read/write cursors, fill/flush protocol
//! - [`slab`]: page-granular slab pool with bitmap free tracking
//! - [`io`]: the adapter trait the buffer streams through
//! - [`config`]: page geometry and threshold constants

pub mod buffer;
pub mod config;
pub mod io;
pub mod slab;

pub use buffer::StreamBuffer;
pub use io::{IoAdapter, SinkIo, SourceIo, StreamIo};
pub use slab::{SlabPage, SlabPool};
