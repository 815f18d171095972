//! # Configuration Constants
//!
//! This module centralizes all configuration constants, grouping
//! interdependent values together and documenting their relationships.
//!
//! ## Dependency Graph
//!
//! ```text
//! PAGE_SIZE (4096 bytes)
//!       │
//!       ├─> SLAB_BYTES (derived: PAGE_SIZE * SLAB_PAGE_COUNT)
//!       │     One slab is a single contiguous allocation of 32 pages.
//!       │
//!       └─> Buffer expansion strategy
//!             Requests <= PAGE_SIZE are served from the slab pool;
//!             larger requests get an exact-size heap chunk.
//!
//! SLAB_PAGE_COUNT (32)
//!       │
//!       └─> Slab occupancy bitmap is a u32: one bit per page.
//!           Changing this count requires a wider bitmap type.
//!
//! *_THRESHOLD_DEFAULT / *_MINIMUM
//!       │
//!       └─> Setters clamp up to the minimum, never reject. Defaults must
//!           therefore be at least the minimum or a fresh buffer would be
//!           out of range by construction.
//! ```
//!
//! ## Critical Invariants
//!
//! These invariants are enforced by compile-time assertions:
//!
//! 1. `PAGE_SIZE` is a power of two (slab storage is page-aligned)
//! 2. `SLAB_PAGE_COUNT == 32` (occupancy bitmap is a `u32`)
//! 3. Every threshold default is `>=` its documented floor
//!
//! ## Usage
//!
//! Import constants from this module rather than defining them locally:
//!
//! ```ignore
//! use segbuf::config::{PAGE_SIZE, SLAB_BYTES};
//! ```

// ============================================================================
// SLAB POOL GEOMETRY
// These constants are tightly coupled - changing one may require changing others
// ============================================================================

/// Size in bytes of one pool page, the unit of slab allocation.
/// Buffer chunks that fit in one page are served from the pool; larger
/// chunks are heap-allocated at their exact size.
pub const PAGE_SIZE: usize = 4 * 1024;

/// Number of pages per slab. One slab is one contiguous allocation tracked
/// by a 32-bit occupancy bitmap, so this MUST stay 32.
pub const SLAB_PAGE_COUNT: usize = 32;

/// Total bytes of one slab allocation.
pub const SLAB_BYTES: usize = PAGE_SIZE * SLAB_PAGE_COUNT;

/// Number of slab directory entries held inline before the directory spills
/// to the heap and starts doubling geometrically (8 -> 16 -> 32 ...).
pub const SLAB_DIRECTORY_INLINE: usize = 8;

const _: () = assert!(PAGE_SIZE.is_power_of_two(), "slab storage is page-aligned");

const _: () = assert!(
    SLAB_PAGE_COUNT == 32,
    "slab occupancy bitmap is a u32: exactly one bit per page"
);

// ============================================================================
// BUFFER THRESHOLDS
// Out-of-range values are clamped up to the stated floor, never rejected
// ============================================================================

/// Payloads appended as shared byte handles above this size are aliased
/// (zero-copy) instead of copied into buffer-owned storage.
pub const WRITE_REFERENCE_THRESHOLD_DEFAULT: usize = 512 * 1024;

/// Floor for [`WRITE_REFERENCE_THRESHOLD_DEFAULT`]. Aliasing tiny payloads
/// costs more in chunk bookkeeping than the copy it avoids.
pub const WRITE_REFERENCE_THRESHOLD_MINIMUM: usize = 256;

/// Reads of at least this many bytes from an aliased chunk return a
/// zero-copy slice of the original storage instead of a fresh copy.
pub const READ_REFERENCE_THRESHOLD_DEFAULT: usize = 256;

/// Floor for [`READ_REFERENCE_THRESHOLD_DEFAULT`].
pub const READ_REFERENCE_THRESHOLD_MINIMUM: usize = 256;

/// Bytes requested per partial read when the buffer pulls from a bound
/// I/O adapter.
pub const IO_PULL_SIZE_DEFAULT: usize = 32 * 1024;

/// Floor for [`IO_PULL_SIZE_DEFAULT`]. Pulls below this degenerate into
/// one adapter call per decoded value.
pub const IO_PULL_SIZE_MINIMUM: usize = 1024;

const _: () = assert!(
    WRITE_REFERENCE_THRESHOLD_DEFAULT >= WRITE_REFERENCE_THRESHOLD_MINIMUM,
    "default write reference threshold must not be below its floor"
);

const _: () = assert!(
    READ_REFERENCE_THRESHOLD_DEFAULT >= READ_REFERENCE_THRESHOLD_MINIMUM,
    "default read reference threshold must not be below its floor"
);

const _: () = assert!(
    IO_PULL_SIZE_DEFAULT >= IO_PULL_SIZE_MINIMUM,
    "default io pull size must not be below its floor"
);
