//! Disk Manager - page I/O and page-id allocation.
//!
//! The buffer pool talks to persistent storage only through the
//! [`DiskManager`] trait. [`FileDiskManager`] is the file-backed
//! implementation; [`MemoryDiskManager`](super::MemoryDiskManager) keeps
//! pages in memory and counts I/O for tests.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::{MAX_PAGES, PAGE_SIZE};
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Raw page storage consumed by the buffer pool.
///
/// Calls are synchronous. The buffer pool serializes all calls under its
/// own latch, so implementations need `Send` but not `Sync`.
pub trait DiskManager: Send {
    /// Fill `page` with the persisted content of `page_id`.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page was never allocated.
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()>;

    /// Persist `page` as the content of `page_id`.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page was never allocated.
    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()>;

    /// Hand out a fresh page id whose content reads as zeros.
    fn allocate_page(&mut self) -> Result<PageId>;

    /// Mark `page_id` as free; a later `allocate_page` may return it again.
    fn deallocate_page(&mut self, page_id: PageId) -> Result<()>;
}

impl<D: DiskManager + ?Sized> DiskManager for Box<D> {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        (**self).read_page(page_id, page)
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        (**self).write_page(page_id, page)
    }

    fn allocate_page(&mut self) -> Result<PageId> {
        (**self).allocate_page()
    }

    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        (**self).deallocate_page(page_id)
    }
}

/// Disk manager backed by a single database file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Deallocated page ids are remembered in memory only and reused by
/// `allocate_page` for the lifetime of this instance.
///
/// # Durability
/// All writes are followed by `fsync()`.
pub struct FileDiskManager {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
    /// Deallocated page ids available for reuse (LIFO).
    free_pages: Vec<PageId>,
}

impl FileDiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
            free_pages: Vec::new(),
        })
    }

    /// Open an existing database file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            page_count,
            free_pages: Vec::new(),
        })
    }

    /// Open an existing database file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Number of pages in the file (including deallocated ones).
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Number of deallocated page ids waiting for reuse.
    #[inline]
    pub fn free_page_count(&self) -> usize {
        self.free_pages.len()
    }

    /// Total size of the database file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        (self.page_count as u64) * (PAGE_SIZE as u64)
    }

    fn check_allocated(&self, page_id: PageId) -> Result<()> {
        if !page_id.is_valid() {
            return Err(Error::InvalidPageId(page_id));
        }
        if page_id.0 >= self.page_count {
            return Err(Error::PageNotFound(page_id));
        }
        Ok(())
    }

    fn write_at(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl DiskManager for FileDiskManager {
    fn read_page(&mut self, page_id: PageId, page: &mut Page) -> Result<()> {
        self.check_allocated(page_id)?;

        let offset = (page_id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(page.as_mut_slice())?;

        Ok(())
    }

    fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_allocated(page_id)?;
        self.write_at(page_id, page.as_slice())
    }

    fn allocate_page(&mut self) -> Result<PageId> {
        let zeros = [0u8; PAGE_SIZE];

        if let Some(page_id) = self.free_pages.pop() {
            self.write_at(page_id, &zeros)?;
            return Ok(page_id);
        }

        if self.page_count as u64 >= MAX_PAGES {
            return Err(Error::InvalidPageId(PageId::INVALID));
        }

        let page_id = PageId::new(self.page_count);
        self.write_at(page_id, &zeros)?;
        self.page_count += 1;

        Ok(page_id)
    }

    fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        self.check_allocated(page_id)?;
        if !self.free_pages.contains(&page_id) {
            self.free_pages.push(page_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_new_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let dm = FileDiskManager::create(&path).unwrap();
        assert_eq!(dm.page_count(), 0);
        assert_eq!(dm.file_size(), 0);

        assert!(FileDiskManager::create(&path).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        assert!(FileDiskManager::open(dir.path().join("missing.db")).is_err());
    }

    #[test]
    fn test_allocate_write_read() {
        let dir = tempdir().unwrap();
        let mut dm = FileDiskManager::create(dir.path().join("test.db")).unwrap();

        let page_id = dm.allocate_page().unwrap();
        assert_eq!(page_id, PageId::new(0));

        let mut page = Page::new();
        dm.read_page(page_id, &mut page).unwrap();
        assert!(page.as_slice().iter().all(|&b| b == 0));

        page.as_mut_slice()[0] = 0xAB;
        page.as_mut_slice()[4095] = 0xEF;
        dm.write_page(page_id, &page).unwrap();

        let mut read_back = Page::new();
        dm.read_page(page_id, &mut read_back).unwrap();
        assert_eq!(read_back.as_slice()[0], 0xAB);
        assert_eq!(read_back.as_slice()[4095], 0xEF);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut dm = FileDiskManager::create(&path).unwrap();
            let page_id = dm.allocate_page().unwrap();
            let mut page = Page::new();
            page.as_mut_slice()[0] = 0x42;
            dm.write_page(page_id, &page).unwrap();
        }

        {
            let mut dm = FileDiskManager::open_or_create(&path).unwrap();
            assert_eq!(dm.page_count(), 1);

            let mut page = Page::new();
            dm.read_page(PageId::new(0), &mut page).unwrap();
            assert_eq!(page.as_slice()[0], 0x42);
        }
    }

    #[test]
    fn test_unallocated_page_errors() {
        let dir = tempdir().unwrap();
        let mut dm = FileDiskManager::create(dir.path().join("test.db")).unwrap();
        dm.allocate_page().unwrap();

        let mut page = Page::new();
        assert!(matches!(
            dm.read_page(PageId::new(1), &mut page),
            Err(Error::PageNotFound(_))
        ));
        assert!(matches!(
            dm.write_page(PageId::new(5), &page),
            Err(Error::PageNotFound(_))
        ));
        assert!(matches!(
            dm.read_page(PageId::INVALID, &mut page),
            Err(Error::InvalidPageId(_))
        ));
    }

    #[test]
    fn test_deallocate_reuses_zeroed_page() {
        let dir = tempdir().unwrap();
        let mut dm = FileDiskManager::create(dir.path().join("test.db")).unwrap();

        let p0 = dm.allocate_page().unwrap();
        let p1 = dm.allocate_page().unwrap();

        let mut page = Page::new();
        page.as_mut_slice()[10] = 0x77;
        dm.write_page(p0, &page).unwrap();

        dm.deallocate_page(p0).unwrap();
        dm.deallocate_page(p0).unwrap();
        assert_eq!(dm.free_page_count(), 1);

        let reused = dm.allocate_page().unwrap();
        assert_eq!(reused, p0);
        assert_eq!(dm.page_count(), 2);

        dm.read_page(reused, &mut page).unwrap();
        assert_eq!(page.as_slice()[10], 0);

        assert_eq!(dm.allocate_page().unwrap(), PageId::new(2));
        assert_ne!(p1, reused);
    }
}
