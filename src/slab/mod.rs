//! # Slab Page Pool
//!
//! This module implements the page-granular slab pool backing buffer chunks.
//! Pages are fixed-size (`PAGE_SIZE`) regions grouped into 32-page slabs,
//! each slab one contiguous allocation tracked by a 32-bit occupancy bitmap.
//!
//! ## Architecture Overview
//!
//! ```text
//! SlabPool (cloneable handle)
//!    │
//!    └─> PoolInner
//!          ├── current: Slab        <- fast-path slab, held outside the
//!          │     mask: u32             directory; allocation is one
//!          │     pages: 32 * 4 KiB     bit-scan when it has a free bit
//!          │
//!          └── directory: SmallVec<[Slab; 8]>
//!                slabs swap with `current` when it runs dry
//!                (self-organizing: recently-used slabs stay hot)
//! ```
//!
//! ## Allocation Strategy
//!
//! 1. If the current slab has a free bit, clear the lowest set bit and hand
//!    out the corresponding page - O(1).
//! 2. Otherwise scan the directory for a slab with a free bit and swap it
//!    into the current slot, so subsequent allocations hit the fast path.
//! 3. Otherwise push the exhausted current slab into the directory (the
//!    directory grows geometrically: 8 inline entries, then doubling) and
//!    install a freshly allocated slab with its first page pre-taken.
//!
//! Freeing checks the current slab first by range containment, then scans
//! the directory back-to-front - most recently added slabs are statistically
//! likeliest to hold live pages. A directory slab whose bitmap returns to
//! all-ones is evicted (swap-removed against the last entry and its storage
//! released), except directory slot 0, which is kept permanently to avoid
//! free-then-immediately-reallocate churn.
//!
//! ## Ownership Model
//!
//! [`SlabPool`] handles clone-share one inner pool. [`SlabPage`] is an owned
//! guard over exactly one page; it returns the page to its pool when
//! dropped, so pages can never leak or be returned twice.
//!
//! ## Failure Model
//!
//! Slab storage comes from the global allocator. Out-of-memory aborts via
//! `handle_alloc_error`; there is no fallback strategy at this layer.
//!
//! ## Thread Safety
//!
//! The pool is designed for single-threaded, single-owner use; the internal
//! `parking_lot::Mutex` is uncontended in that setting and merely makes the
//! handle safe to move between workers.

mod pool;

pub use pool::{SlabPage, SlabPool};
