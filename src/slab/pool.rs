//! Slab pool internals: bitmap slabs, the swap-to-front directory, and the
//! drop-returns-page guard.

use crate::config::{PAGE_SIZE, SLAB_BYTES, SLAB_DIRECTORY_INLINE, SLAB_PAGE_COUNT};
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::Arc;

const SLAB_LAYOUT: Layout = match Layout::from_size_align(SLAB_BYTES, PAGE_SIZE) {
    Ok(layout) => layout,
    Err(_) => panic!("slab layout must be valid: SLAB_BYTES rounded to PAGE_SIZE"),
};

/// One slab: 32 contiguous pages plus a free-page bitmap.
///
/// Bit `i` set means page `i` is free. A slab is fully free when the mask is
/// all ones and exhausted when it is zero.
struct Slab {
    mask: u32,
    pages: NonNull<u8>,
}

impl Slab {
    fn new() -> Self {
        // SAFETY: SLAB_LAYOUT has non-zero size.
        let ptr = unsafe { alloc(SLAB_LAYOUT) };
        let Some(pages) = NonNull::new(ptr) else {
            handle_alloc_error(SLAB_LAYOUT);
        };
        Self {
            mask: u32::MAX,
            pages,
        }
    }

    fn has_free_page(&self) -> bool {
        self.mask != 0
    }

    fn is_fully_free(&self) -> bool {
        self.mask == u32::MAX
    }

    fn free_page_count(&self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Clears the lowest set bit and returns the address of that page.
    fn take_page(&mut self) -> NonNull<u8> {
        debug_assert!(self.has_free_page());
        let pos = self.mask.trailing_zeros() as usize;
        self.mask &= !(1 << pos);
        // SAFETY: pos < SLAB_PAGE_COUNT, so the offset stays inside the
        // slab's SLAB_BYTES allocation.
        unsafe { NonNull::new_unchecked(self.pages.as_ptr().add(pos * PAGE_SIZE)) }
    }

    /// Sets the free bit for `page` if this slab owns it (range containment).
    fn try_release(&mut self, page: NonNull<u8>) -> bool {
        let offset = (page.as_ptr() as usize).wrapping_sub(self.pages.as_ptr() as usize);
        if offset >= SLAB_BYTES {
            return false;
        }
        let pos = offset / PAGE_SIZE;
        debug_assert!(self.mask & (1 << pos) == 0, "page freed twice");
        self.mask |= 1 << pos;
        true
    }
}

impl Drop for Slab {
    fn drop(&mut self) {
        // SAFETY: pages was obtained from alloc(SLAB_LAYOUT) and is released
        // exactly once; fully-free slabs are the only ones ever dropped while
        // the pool is live, so no outstanding page points into this storage.
        unsafe { dealloc(self.pages.as_ptr(), SLAB_LAYOUT) };
    }
}

// SAFETY: a Slab exclusively owns its page storage.
unsafe impl Send for Slab {}

struct PoolInner {
    current: Slab,
    directory: SmallVec<[Slab; SLAB_DIRECTORY_INLINE]>,
}

impl PoolInner {
    fn allocate_page(&mut self) -> NonNull<u8> {
        if self.current.has_free_page() {
            return self.current.take_page();
        }

        // Current slab exhausted: bring a directory slab with free pages to
        // the front so the next allocations hit the fast path again.
        for slot in self.directory.iter_mut() {
            if slot.has_free_page() {
                std::mem::swap(&mut self.current, slot);
                return self.current.take_page();
            }
        }

        // Every slab is exhausted: retire the current one to the directory
        // and start a fresh slab with its first page already taken.
        let mut fresh = Slab::new();
        let page = fresh.take_page();
        let exhausted = std::mem::replace(&mut self.current, fresh);
        self.directory.push(exhausted);
        page
    }

    fn free_page(&mut self, page: NonNull<u8>) {
        if self.current.try_release(page) {
            return;
        }

        // Most recently added slabs are likeliest to hold live pages.
        for i in (0..self.directory.len()).rev() {
            if self.directory[i].try_release(page) {
                if i != 0 && self.directory[i].is_fully_free() {
                    // Compact: swap with the last entry and release storage.
                    // Slot 0 is kept permanently.
                    self.directory.swap_remove(i);
                }
                return;
            }
        }

        debug_assert!(false, "page does not belong to this pool");
    }

    fn live_pages(&self) -> usize {
        let total = (1 + self.directory.len()) * SLAB_PAGE_COUNT;
        let free = self.current.free_page_count()
            + self
                .directory
                .iter()
                .map(Slab::free_page_count)
                .sum::<usize>();
        total - free
    }
}

/// Cloneable handle to a slab page pool.
///
/// Handles clone-share one inner pool; pages allocated through any clone
/// return to the same pool when their [`SlabPage`] guard is dropped.
pub struct SlabPool {
    inner: Arc<Mutex<PoolInner>>,
}

impl SlabPool {
    /// Creates a pool with one pre-allocated, fully free slab.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PoolInner {
                current: Slab::new(),
                directory: SmallVec::new(),
            })),
        }
    }

    /// Hands out one page. O(1) while the current slab has a free bit;
    /// otherwise a directory scan and, if needed, a fresh slab allocation.
    pub fn allocate(&self) -> SlabPage {
        let page = self.inner.lock().allocate_page();
        SlabPage {
            page,
            pool: Arc::clone(&self.inner),
        }
    }

    /// Number of pages handed out and not yet returned.
    pub fn live_pages(&self) -> usize {
        self.inner.lock().live_pages()
    }

    /// Number of slabs currently held, including the current slab.
    pub fn slab_count(&self) -> usize {
        1 + self.inner.lock().directory.len()
    }
}

impl Clone for SlabPool {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for SlabPool {
    fn default() -> Self {
        Self::new()
    }
}

/// An exclusively owned page that returns to its pool when dropped.
pub struct SlabPage {
    page: NonNull<u8>,
    pool: Arc<Mutex<PoolInner>>,
}

impl SlabPage {
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the guard exclusively owns PAGE_SIZE bytes at `page` for
        // its whole lifetime; the pool never touches page contents.
        unsafe { std::slice::from_raw_parts(self.page.as_ptr(), PAGE_SIZE) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, plus &mut self guarantees unique access.
        unsafe { std::slice::from_raw_parts_mut(self.page.as_ptr(), PAGE_SIZE) }
    }
}

impl std::fmt::Debug for SlabPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlabPage").finish_non_exhaustive()
    }
}

impl Drop for SlabPage {
    fn drop(&mut self) {
        self.pool.lock().free_page(self.page);
    }
}

// SAFETY: the guard exclusively owns its page; the pool it points to is
// behind Arc<Mutex>.
unsafe impl Send for SlabPage {}
unsafe impl Sync for SlabPage {}
