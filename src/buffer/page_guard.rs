//! RAII guards for page access.
//!
//! - [`PageReadGuard`] holds a shared latch and unpins clean.
//! - [`PageWriteGuard`] holds an exclusive latch and unpins dirty.
//!
//! On release the page latch is dropped first and the pin second, so a
//! frame never becomes an eviction candidate while its latch is held.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use super::buffer_pool_manager::BufferPoolManager;
use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

/// One pin on a frame, given back to the pool at most once.
struct FramePin<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    dirty: bool,
    released: bool,
}

impl<'a> FramePin<'a> {
    fn new(bpm: &'a BufferPoolManager, frame_id: FrameId, page_id: PageId, dirty: bool) -> Self {
        Self {
            bpm,
            frame_id,
            page_id,
            dirty,
            released: false,
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.bpm.unpin_frame(self.frame_id, self.dirty);
        }
    }
}

/// Shared access to a pinned page.
///
/// # Example
/// ```
/// use pagecache::{BufferPoolManager, MemoryDiskManager};
///
/// let bpm = BufferPoolManager::new(2, MemoryDiskManager::new());
/// let page_id = bpm.new_page_write().unwrap().page_id();
///
/// let guard = bpm.fetch_page_read(page_id).unwrap();
/// assert_eq!(guard.as_slice()[0], 0);
/// assert_eq!(bpm.get_pin_count(page_id), Some(1));
/// drop(guard);
/// assert_eq!(bpm.get_pin_count(page_id), Some(0));
/// ```
pub struct PageReadGuard<'a> {
    lock: Option<RwLockReadGuard<'a, Page>>,
    pin: FramePin<'a>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            lock: Some(lock),
            pin: FramePin::new(bpm, frame_id, page_id, false),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pin.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.pin.frame_id
    }

    /// Release the latch and the pin before the guard goes out of scope.
    ///
    /// Idempotent. The guard must not be dereferenced afterwards.
    pub fn drop_guard(&mut self) {
        self.lock = None;
        self.pin.release();
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.lock.as_deref().expect("page guard used after drop_guard")
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}

/// Exclusive access to a pinned page. The page is marked dirty on release.
///
/// # Example
/// ```
/// use pagecache::{BufferPoolManager, MemoryDiskManager};
///
/// let bpm = BufferPoolManager::new(2, MemoryDiskManager::new());
/// let mut guard = bpm.new_page_write().unwrap();
/// let page_id = guard.page_id();
/// guard.as_mut_slice()[0] = 0xFF;
/// drop(guard);
///
/// assert_eq!(bpm.is_dirty(page_id), Some(true));
/// ```
pub struct PageWriteGuard<'a> {
    lock: Option<RwLockWriteGuard<'a, Page>>,
    pin: FramePin<'a>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            lock: Some(lock),
            pin: FramePin::new(bpm, frame_id, page_id, true),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.pin.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.pin.frame_id
    }

    /// Release the latch and the pin before the guard goes out of scope.
    ///
    /// Idempotent. The guard must not be dereferenced afterwards.
    pub fn drop_guard(&mut self) {
        self.lock = None;
        self.pin.release();
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        self.lock.as_deref().expect("page guard used after drop_guard")
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        self.lock.as_deref_mut().expect("page guard used after drop_guard")
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}
