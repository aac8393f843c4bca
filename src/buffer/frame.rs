//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus the metadata needed for buffer
//! management:
//! - Which page is resident (if any)
//! - Pin count for reference counting
//! - Dirty flag for write-back tracking
//! - In-flight flush count, which keeps the frame from being reused

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::PageId;
use crate::storage::page::Page;

/// A frame in the buffer pool.
///
/// The pool allocates a fixed number of frames at startup and addresses
/// them by [`FrameId`](crate::FrameId) only.
///
/// # Thread Safety
/// - `page`: `RwLock` latch on the page bytes, held by page guards
/// - `page_id`, `pin_count`, `is_dirty`: atomics so holders of a pinned
///   page can read them without the pool latch
/// - `flushing`: flushes that have claimed the frame but not finished
///   writing it
///
/// Metadata transitions (bind, pin, unpin, reset, begin_flush) are only
/// performed by the buffer pool while it holds its latch. `end_flush` and
/// `clear_dirty` may run without it.
pub struct Frame {
    /// The page data, protected by RwLock.
    page: RwLock<Page>,

    /// Resident page id, or `PageId::INVALID` if the frame is free.
    page_id: AtomicU32,

    /// Number of active references to this frame.
    pin_count: AtomicU32,

    /// Whether the page has been modified since it was last written.
    is_dirty: AtomicBool,

    /// Flushes in progress outside the pool latch.
    flushing: AtomicU32,
}

impl Frame {
    /// Create a new empty frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
            page_id: AtomicU32::new(PageId::INVALID.0),
            pin_count: AtomicU32::new(0),
            is_dirty: AtomicBool::new(false),
            flushing: AtomicU32::new(0),
        }
    }

    // ========================================================================
    // Page access (RwLock)
    // ========================================================================

    /// Acquire read latch on the page.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire write latch on the page.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// Acquire write latch on the page, or None if anyone holds it.
    #[inline]
    pub fn try_page_mut(&self) -> Option<RwLockWriteGuard<'_, Page>> {
        self.page.try_write()
    }

    // ========================================================================
    // Binding
    // ========================================================================

    /// Resident page id, or None if the frame is free.
    #[inline]
    pub fn page_id(&self) -> Option<PageId> {
        let pid = PageId(self.page_id.load(Ordering::Acquire));
        pid.is_valid().then_some(pid)
    }

    /// Bind the frame to `page_id` with a single pin and a clean page.
    pub(crate) fn bind(&self, page_id: PageId) {
        self.page_id.store(page_id.0, Ordering::Release);
        self.pin_count.store(1, Ordering::Release);
        self.is_dirty.store(false, Ordering::Release);
    }

    /// Detach the frame from its page without touching the bytes.
    pub(crate) fn unbind(&self) {
        self.page_id.store(PageId::INVALID.0, Ordering::Release);
        self.pin_count.store(0, Ordering::Release);
        self.is_dirty.store(false, Ordering::Release);
    }

    // ========================================================================
    // Pin count
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0; the pool checks before calling.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    /// Get the current pin count.
    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    /// Check if the frame is currently pinned.
    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Dirty flag
    // ========================================================================

    /// OR `dirty` into the dirty flag.
    #[inline]
    pub(crate) fn mark_dirty_if(&self, dirty: bool) {
        if dirty {
            self.is_dirty.store(true, Ordering::Release);
        }
    }

    /// Clear the dirty flag after a write-back.
    #[inline]
    pub(crate) fn clear_dirty(&self) {
        self.is_dirty.store(false, Ordering::Release);
    }

    /// Check if the frame is dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.is_dirty.load(Ordering::Acquire)
    }

    // ========================================================================
    // Flush claims
    // ========================================================================

    /// Claim the frame for a flush that will run after the pool latch is
    /// released.
    #[inline]
    pub(crate) fn begin_flush(&self) {
        self.flushing.fetch_add(1, Ordering::AcqRel);
    }

    /// Drop a claim taken with [`begin_flush`](Self::begin_flush).
    #[inline]
    pub(crate) fn end_flush(&self) {
        let old = self.flushing.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(old > 0, "flush claim underflow");
    }

    /// Whether a flush is writing this frame's page.
    #[inline]
    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire) > 0
    }

    // ========================================================================
    // Frame state queries
    // ========================================================================

    /// Check if the frame holds no page.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.page_id().is_none()
    }

    /// Check if the frame's page could be chosen as a victim.
    #[inline]
    pub fn is_evictable(&self) -> bool {
        !self.is_empty() && !self.is_pinned() && !self.is_flushing()
    }

    /// Reset the frame to the free state and zero its bytes.
    pub(crate) fn reset(&self) {
        self.page_mut().reset();
        self.unbind();
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}
