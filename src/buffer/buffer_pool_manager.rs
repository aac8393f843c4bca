//! Buffer Pool Manager - the page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting
//! - Dirty page write-back on eviction and flush
//! - FIFO-over-unpin victim selection

use std::collections::{HashMap, VecDeque};

use parking_lot::{Mutex, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::config::BufferPoolConfig;
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::DiskManager;

/// State guarded by the pool latch.
struct PoolState {
    /// Maps resident page IDs to frame IDs.
    page_table: HashMap<PageId, FrameId>,

    /// Frames holding no page, consumed front first.
    free_list: VecDeque<FrameId>,
}

/// Where a frame for an incoming page came from.
#[derive(Clone, Copy)]
enum Reclaimed {
    Free(FrameId),
    Victim(FrameId),
}

impl Reclaimed {
    fn frame_id(self) -> FrameId {
        match self {
            Reclaimed::Free(fid) | Reclaimed::Victim(fid) => fid,
        }
    }
}

/// Manages a fixed pool of frames caching disk pages.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌─────────────── latch: Mutex<PoolState> ──────────────┐   │
/// │  │ page_table: PageId → FrameId                         │   │
/// │  │ free_list:  VecDeque<FrameId>                        │   │
/// │  └──────────────────────────────────────────────────────┘   │
/// │  ┌──────────────────────┐  ┌───────────────────────────┐    │
/// │  │ replacer (own latch, │  │ frames: Vec<Frame>        │    │
/// │  │ taken inside pool    │  │ [Frame0] [Frame1] ...     │    │
/// │  │ latch only)          │  │                           │    │
/// │  └──────────────────────┘  └───────────────────────────┘    │
/// │  ┌─────────── disk: Mutex<Box<dyn DiskManager>> ────────┐   │
/// │  └──────────────────────────────────────────────────────┘   │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// Fetch, new, unpin and delete hold the pool latch for their whole body.
/// The replacer latch is always acquired while the pool latch is held, and
/// the disk latch is always the last one taken.
///
/// Page guards hold a frame latch and may call back into the pool, so the
/// pool latch is never held while waiting on a frame latch somebody else
/// could own. Eviction and delete only latch frames that are unpinned and
/// not being flushed. Flush claims its frame under the pool latch, then
/// releases it before taking the frame's read latch and writing.
///
/// # Usage
/// ```
/// use pagecache::{BufferPoolManager, MemoryDiskManager};
///
/// let bpm = BufferPoolManager::new(4, MemoryDiskManager::new());
///
/// // Explicit pin/unpin
/// let page = bpm.new_page().unwrap();
/// let pid = page.page_id();
/// page.write().as_mut_slice()[0] = 0xAB;
/// bpm.unpin_page(pid, true).unwrap();
///
/// // RAII guard: unpins on drop
/// let guard = bpm.fetch_page_read(pid).unwrap();
/// assert_eq!(guard.as_slice()[0], 0xAB);
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    /// Page table and free list.
    latch: Mutex<PoolState>,

    /// Victim selection among unpinned frames.
    replacer: FifoReplacer,

    /// Handles all disk I/O.
    disk: Mutex<Box<dyn DiskManager>>,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Number of frames in the pool (immutable after construction).
    pool_size: usize,
}

/// A page pinned through the explicit [`BufferPoolManager`] API.
///
/// The handle does not unpin on drop: release it with
/// [`BufferPoolManager::unpin_page`]. Its bytes must not be accessed after
/// the matching unpin, and a latch obtained from [`read`](Self::read) or
/// [`write`](Self::write) must be released before unpinning.
pub struct PageHandle<'a> {
    frame: &'a Frame,
    frame_id: FrameId,
    page_id: PageId,
}

impl<'a> PageHandle<'a> {
    /// Id of the pinned page.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Frame holding the page.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Shared latch on the page bytes.
    pub fn read(&self) -> RwLockReadGuard<'a, Page> {
        self.frame.page()
    }

    /// Exclusive latch on the page bytes.
    ///
    /// Writing does not mark the page dirty; pass `is_dirty = true` to
    /// `unpin_page`.
    pub fn write(&self) -> RwLockWriteGuard<'a, Page> {
        self.frame.page_mut()
    }

    /// Current pin count of the frame.
    pub fn pin_count(&self) -> u32 {
        self.frame.pin_count()
    }

    /// Whether the frame is marked dirty.
    pub fn is_dirty(&self) -> bool {
        self.frame.is_dirty()
    }
}

impl BufferPoolManager {
    /// Create a buffer pool with `pool_size` frames.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk_manager: impl DiskManager + 'static) -> Self {
        Self::with_config(BufferPoolConfig::with_pool_size(pool_size), disk_manager)
    }

    /// Create a buffer pool from a [`BufferPoolConfig`].
    ///
    /// # Panics
    /// Panics if `config.pool_size` is 0.
    pub fn with_config(config: BufferPoolConfig, disk_manager: impl DiskManager + 'static) -> Self {
        let pool_size = config.pool_size;
        assert!(pool_size > 0, "pool_size must be > 0");

        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new()).collect();
        let free_list: VecDeque<FrameId> = (0..pool_size).map(FrameId::new).collect();

        debug!(pool_size, "buffer pool created");

        Self {
            frames,
            latch: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
            }),
            replacer: FifoReplacer::new(pool_size),
            disk: Mutex::new(Box::new(disk_manager)),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Public API: explicit pin / unpin
    // ========================================================================

    /// Pin `page_id`, reading it from disk if it is not resident.
    ///
    /// On a miss the frame comes from the free list, or else from the
    /// replacer; a dirty victim is written back before reuse.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned
    /// - `Error::PageNotFound` / I/O errors from the disk manager
    ///
    /// A failed fetch leaves the page table, free list, frame metadata and
    /// replacer order unchanged.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PageHandle<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        Ok(self.handle(frame_id, page_id))
    }

    /// Allocate a fresh page on disk and pin it in a zeroed frame.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if every frame is pinned (no page id is
    ///   allocated in that case)
    /// - errors from the disk manager
    ///
    /// The victim, if any, is written back only after the page id has been
    /// allocated, so a failed allocation leaves every frame as it was. If
    /// that write-back fails the new id is deallocated again.
    pub fn new_page(&self) -> Result<PageHandle<'_>> {
        let (frame_id, page_id) = self.new_page_internal()?;
        Ok(self.handle(frame_id, page_id))
    }

    /// Release one pin on `page_id`, OR-ing `is_dirty` into its dirty flag.
    ///
    /// When the pin count reaches zero the frame becomes an eviction
    /// candidate.
    ///
    /// # Errors
    /// - `Error::PageNotResident` if the page is not in the pool
    /// - `Error::PageNotPinned` if its pin count is already zero
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<()> {
        let state = self.latch.lock();

        let frame_id = *state
            .page_table
            .get(&page_id)
            .ok_or(Error::PageNotResident(page_id))?;

        if !self.frames[frame_id.0].is_pinned() {
            return Err(Error::PageNotPinned(page_id));
        }

        self.release_pin(frame_id, is_dirty);
        Ok(())
    }

    /// Allocate a page id on disk without bringing it into the pool.
    pub fn allocate_page_id(&self) -> Result<PageId> {
        let page_id = self.disk.lock().allocate_page()?;
        BufferPoolStats::incr(&self.stats.pages_allocated);
        Ok(page_id)
    }

    // ========================================================================
    // Public API: RAII guards
    // ========================================================================

    /// Fetch a page for reading (shared latch). Unpins clean on drop.
    ///
    /// # Errors
    /// Same as [`fetch_page`](Self::fetch_page).
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page for writing (exclusive latch). Unpins dirty on drop.
    ///
    /// Blocks while any other guard on the page is alive, including one
    /// held by the calling thread.
    ///
    /// # Errors
    /// Same as [`fetch_page`](Self::fetch_page).
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Like [`fetch_page_write`](Self::fetch_page_write), but never waits
    /// for the page latch.
    ///
    /// # Errors
    /// - `Error::PageBusy` if a guard on the page is alive; the pin taken
    ///   for the attempt is released again
    /// - everything [`fetch_page`](Self::fetch_page) returns
    pub fn try_fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.fetch_page_internal(page_id)?;

        match self.frames[frame_id.0].try_page_mut() {
            Some(lock) => Ok(PageWriteGuard::new(self, frame_id, page_id, lock)),
            None => {
                self.unpin_frame(frame_id, false);
                Err(Error::PageBusy(page_id))
            }
        }
    }

    /// Allocate a new page and return a write guard on it.
    pub fn new_page_write(&self) -> Result<PageWriteGuard<'_>> {
        let (frame_id, page_id) = self.new_page_internal()?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, lock))
    }

    /// Like [`fetch_page_read`](Self::fetch_page_read), discarding the error.
    pub fn checked_read_page(&self, page_id: PageId) -> Option<PageReadGuard<'_>> {
        self.fetch_page_read(page_id).ok()
    }

    /// Like [`fetch_page_write`](Self::fetch_page_write), discarding the error.
    pub fn checked_write_page(&self, page_id: PageId) -> Option<PageWriteGuard<'_>> {
        self.fetch_page_write(page_id).ok()
    }

    // ========================================================================
    // Public API: delete and flush
    // ========================================================================

    /// Remove a page from the pool and deallocate it on disk.
    ///
    /// A page that is not resident is left alone and `Ok(())` is returned.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page is still in use
    /// - `Error::PageBusy` if a flush is writing the page
    /// - errors from the disk manager's deallocation
    pub fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut state = self.latch.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        let frame = &self.frames[frame_id.0];
        let pin_count = frame.pin_count();
        if pin_count > 0 {
            return Err(Error::PagePinned { page_id, pin_count });
        }
        if frame.is_flushing() {
            return Err(Error::PageBusy(page_id));
        }

        self.disk.lock().deallocate_page(page_id)?;

        state.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        frame.reset();
        state.free_list.push_back(frame_id);

        BufferPoolStats::incr(&self.stats.pages_deallocated);
        debug!(%page_id, %frame_id, "page deleted");

        Ok(())
    }

    /// Write a resident page to disk, dirty or not, and clear its dirty
    /// flag. The pin count is unchanged.
    ///
    /// The write waits for writers of the page to release their latch, but
    /// does not hold the pool latch meanwhile. While the write is pending
    /// the page cannot be evicted or deleted.
    ///
    /// # Errors
    /// - `Error::PageNotResident` if the page is not in the pool
    /// - I/O errors from disk write
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        let frame_id = {
            let state = self.latch.lock();
            let frame_id = *state
                .page_table
                .get(&page_id)
                .ok_or(Error::PageNotResident(page_id))?;
            self.frames[frame_id.0].begin_flush();
            frame_id
        };

        let result = self.write_back(frame_id, page_id);
        self.frames[frame_id.0].end_flush();
        result
    }

    /// Write every resident page to disk and clear every dirty flag.
    ///
    /// Pages are written in page id order, one [`flush_page`](Self::flush_page)
    /// at a time. A page evicted before its turn was already written back
    /// by the eviction and is skipped.
    ///
    /// # Errors
    /// Stops at the first I/O error.
    pub fn flush_all_pages(&self) -> Result<()> {
        let mut pages: Vec<PageId> = self.latch.lock().page_table.keys().copied().collect();
        pages.sort_unstable();

        let mut flushed = 0usize;
        for &page_id in &pages {
            match self.flush_page(page_id) {
                Ok(()) => flushed += 1,
                Err(Error::PageNotResident(_)) => {}
                Err(e) => return Err(e),
            }
        }

        debug!(pages = flushed, "flushed all pages");
        Ok(())
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Get the number of free frames.
    pub fn free_frame_count(&self) -> usize {
        self.latch.lock().free_list.len()
    }

    /// Get the number of resident pages.
    pub fn page_count(&self) -> usize {
        self.latch.lock().page_table.len()
    }

    /// Number of frames the replacer could currently evict.
    pub fn evictable_count(&self) -> usize {
        let _state = self.latch.lock();
        self.replacer.size()
    }

    /// Whether the page is resident.
    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.latch.lock().page_table.contains_key(&page_id)
    }

    /// Pin count of a resident page, or None if it is not resident.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.latch.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| self.frames[fid.0].pin_count())
    }

    /// Dirty flag of a resident page, or None if it is not resident.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.latch.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| self.frames[fid.0].is_dirty())
    }

    // ========================================================================
    // Internal: called by page guards on drop
    // ========================================================================

    /// Release the pin held by a guard.
    pub(crate) fn unpin_frame(&self, frame_id: FrameId, is_dirty: bool) {
        let _state = self.latch.lock();
        self.release_pin(frame_id, is_dirty);
    }

    /// Caller holds the pool latch and has checked the frame is pinned.
    fn release_pin(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];
        frame.mark_dirty_if(is_dirty);

        if frame.unpin() == 0 {
            self.replacer.unpin(frame_id);
        }
    }

    // ========================================================================
    // Internal: fetch / new
    // ========================================================================

    fn handle(&self, frame_id: FrameId, page_id: PageId) -> PageHandle<'_> {
        PageHandle {
            frame: &self.frames[frame_id.0],
            frame_id,
            page_id,
        }
    }

    /// Pin a page, loading it on a miss, and return its frame.
    fn fetch_page_internal(&self, page_id: PageId) -> Result<FrameId> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }

        let mut state = self.latch.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frames[frame_id.0].pin();
            self.replacer.pin(frame_id);
            BufferPoolStats::incr(&self.stats.cache_hits);
            trace!(%page_id, %frame_id, "cache hit");
            return Ok(frame_id);
        }

        BufferPoolStats::incr(&self.stats.cache_misses);
        trace!(%page_id, "cache miss");

        if state.free_list.is_empty() && self.replacer.size() == 0 {
            return Err(Error::NoFreeFrames);
        }

        // Read before claiming a frame so a failed read changes nothing.
        let mut incoming = Page::new();
        self.disk.lock().read_page(page_id, &mut incoming)?;
        BufferPoolStats::incr(&self.stats.pages_read);

        let reclaimed = self.select_frame(&mut state)?;
        self.write_back_victim(&mut state, reclaimed)?;

        let frame_id = reclaimed.frame_id();
        self.frames[frame_id.0].page_mut().copy_from(&incoming);
        self.install(&mut state, reclaimed, page_id);

        Ok(frame_id)
    }

    /// Allocate a page id and pin it in a zeroed frame.
    fn new_page_internal(&self) -> Result<(FrameId, PageId)> {
        let mut state = self.latch.lock();

        let reclaimed = self.select_frame(&mut state)?;

        let allocated = self.disk.lock().allocate_page();
        let page_id = match allocated {
            Ok(pid) => pid,
            Err(e) => {
                self.give_back(&mut state, reclaimed);
                return Err(e);
            }
        };

        if let Err(e) = self.write_back_victim(&mut state, reclaimed) {
            if let Err(undo) = self.disk.lock().deallocate_page(page_id) {
                debug!(%page_id, error = %undo, "could not return unused page id");
            }
            return Err(e);
        }
        BufferPoolStats::incr(&self.stats.pages_allocated);

        let frame_id = reclaimed.frame_id();
        self.frames[frame_id.0].page_mut().reset();
        self.install(&mut state, reclaimed, page_id);

        debug!(%page_id, %frame_id, "new page");
        Ok((frame_id, page_id))
    }

    // ========================================================================
    // Internal: frame allocation and eviction
    // ========================================================================

    /// Take a frame from the free list, or the replacer's earliest victim
    /// that no flush is writing.
    ///
    /// Nothing is written here. The victim keeps its page-table entry until
    /// [`install`](Self::install), so the frame can still be handed back
    /// with [`give_back`](Self::give_back).
    fn select_frame(&self, state: &mut PoolState) -> Result<Reclaimed> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(Reclaimed::Free(frame_id));
        }

        let mut skipped = Vec::new();
        let victim = loop {
            match self.replacer.victim() {
                Some(frame_id) if self.frames[frame_id.0].is_flushing() => skipped.push(frame_id),
                other => break other,
            }
        };

        // Restoring to the head in reverse keeps the skipped frames' order.
        for &frame_id in skipped.iter().rev() {
            self.replacer.restore(frame_id);
        }

        victim.map(Reclaimed::Victim).ok_or(Error::NoFreeFrames)
    }

    /// Write a dirty victim back before its frame is reused. On failure the
    /// frame is handed back untouched.
    fn write_back_victim(&self, state: &mut PoolState, reclaimed: Reclaimed) -> Result<()> {
        let Reclaimed::Victim(frame_id) = reclaimed else {
            return Ok(());
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_dirty() {
            if let Some(old_page_id) = frame.page_id() {
                if let Err(e) = self.write_back(frame_id, old_page_id) {
                    self.give_back(state, reclaimed);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Undo [`select_frame`](Self::select_frame) after a later failure.
    fn give_back(&self, state: &mut PoolState, reclaimed: Reclaimed) {
        match reclaimed {
            Reclaimed::Free(frame_id) => state.free_list.push_front(frame_id),
            Reclaimed::Victim(frame_id) => self.replacer.restore(frame_id),
        }
    }

    /// Bind the acquired frame to `page_id` with one pin.
    fn install(&self, state: &mut PoolState, reclaimed: Reclaimed, page_id: PageId) {
        let frame_id = reclaimed.frame_id();
        let frame = &self.frames[frame_id.0];

        if let Reclaimed::Victim(_) = reclaimed {
            if let Some(old_page_id) = frame.page_id() {
                state.page_table.remove(&old_page_id);
                debug!(%old_page_id, %frame_id, new_page_id = %page_id, "evicted page");
            }
            BufferPoolStats::incr(&self.stats.evictions);
        }

        frame.bind(page_id);
        state.page_table.insert(page_id, frame_id);
        self.replacer.pin(frame_id);
    }

    /// Write a frame's bytes to disk and clear its dirty flag.
    ///
    /// The flag is cleared while the read latch is still held, so a writer
    /// that latches the page afterwards marks it dirty again on release.
    fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        let page = frame.page();
        self.disk.lock().write_page(page_id, &page)?;
        frame.clear_dirty();
        drop(page);

        BufferPoolStats::incr(&self.stats.pages_written);
        trace!(%page_id, %frame_id, "page written");

        Ok(())
    }
}
