//! In-memory disk manager.
//!
//! Pages live in a `Vec` behind a shared handle, so a test can keep one
//! clone of the manager, hand another to the buffer pool, and then inspect
//! exactly which reads and writes the pool issued.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::common::{Error, PageId, Result};
use crate::storage::disk_manager::DiskManager;
use crate::storage::page::Page;

#[derive(Default)]
struct MemoryDisk {
    pages: Vec<Box<Page>>,
    free_pages: Vec<PageId>,
    reads: u64,
    writes: u64,
    write_log: Vec<PageId>,
}

impl MemoryDisk {
    fn page(&self, page_id: PageId) -> Result<&Page> {
        self.pages
            .get(page_id.0 as usize)
            .map(|p| &**p)
            .ok_or(Error::PageNotFound(page_id))
    }

    fn page_mut(&mut self, page_id: PageId) -> Result<&mut Page> {
        self.pages
            .get_mut(page_id.0 as usize)
            .map(|p| &mut **p)
            .ok_or(Error::PageNotFound(page_id))
    }
}

/// Disk manager that keeps every page in memory.
///
/// Cloning yields another handle to the same pages and counters.
#[derive(Clone, Default)]
pub struct MemoryDiskManager {
    inner: Arc<Mutex<MemoryDisk>>,
}

impl MemoryDiskManager {
    /// Create an empty in-memory disk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `read_page` calls served.
    pub fn read_count(&self) -> u64 {
        self.inner.lock().reads
    }

    /// Number of `write_page` calls served.
    pub fn write_count(&self) -> u64 {
        self.inner.lock().writes
    }

    /// Page ids written, in order.
    pub fn write_log(&self) -> Vec<PageId> {
        self.inner.lock().write_log.clone()
    }

    /// Number of pages ever allocated (including deallocated ones).
    pub fn page_count(&self) -> usize {
        self.inner.lock().pages.len()
    }

    /// Whether `page_id` is currently deallocated.
    pub fn is_deallocated(&self, page_id: PageId) -> bool {
        self.inner.lock().free_pages.contains(&page_id)
    }

    /// Copy of the persisted bytes of `page_id`, bypassing the counters.
    pub fn persisted_bytes(&self, page_id: PageId) -> Option<Vec<u8>> {
        let disk = self.inner.lock();
        disk.page(page_id).ok().map(|p| p.as_slice().to_vec())
    }

    /// Reset the I/O counters and write log.
    pub fn reset_counters(&self) {
        let mut disk = self.inner.lock();
        disk.reads = 0;
        disk.writes = 0;
        disk.write_log.clear();
    }
}

impl DiskManager for MemoryDiskManager {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        let mut disk = self.inner.lock();
        page.copy_from(disk.page(page_id)?);
        disk.reads += 1;
        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let mut disk = self.inner.lock();
        disk.page_mut(page_id)?.copy_from(page);
        disk.writes += 1;
        disk.write_log.push(page_id);
        Ok(())
    }

    fn allocate_page(&mut self) -> Result<PageId> {
        let mut disk = self.inner.lock();

        if let Some(page_id) = disk.free_pages.pop() {
            disk.page_mut(page_id)?.reset();
            return Ok(page_id);
        }

        let page_id = PageId::new(disk.pages.len() as u32);
        disk.pages.push(Box::new(Page::new()));
        Ok(page_id)
    }

    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        let mut disk = self.inner.lock();
        disk.page(page_id)?;
        if !disk.free_pages.contains(&page_id) {
            disk.free_pages.push(page_id);
        }
        Ok(())
    }
}
