//! pagecache - a buffer pool and B+Tree internal node core for a
//! disk-oriented storage engine.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │             Index Layer (index/btree)                    │   │
//! │  │   InternalPage: lookup, insert, split, merge, borrow     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓  fetch / unpin (re-parenting)    │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │             Buffer Pool (buffer/)                        │   │
//! │  │   BufferPoolManager + Frame + FifoReplacer + Stats       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓  read / write / allocate         │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │             Storage Layer (storage/)                     │   │
//! │  │   DiskManager trait + File/Memory impls + Page formats   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction policy
//! - [`storage`] - Disk I/O and page formats
//! - [`index`] - B+Tree node formats
//!
//! # Quick Start
//! ```no_run
//! use pagecache::{BufferPoolManager, FileDiskManager};
//!
//! let dm = FileDiskManager::open_or_create("my_database.db").unwrap();
//! let bpm = BufferPoolManager::new(64, dm);
//!
//! let page_id = {
//!     let mut guard = bpm.new_page_write().unwrap();
//!     guard.as_mut_slice()[0] = 0xFF;
//!     guard.page_id()
//! };
//! bpm.flush_page(page_id).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

pub use common::config::{BufferPoolConfig, PAGE_SIZE};
pub use common::{Error, ErrorKind, FrameId, PageId, Result};

pub use buffer::{
    BufferPoolManager, BufferPoolStats, Frame, PageHandle, PageReadGuard, PageWriteGuard, StatsSnapshot,
};
pub use index::btree::{GenericComparator, GenericKey, InternalPage, KeyComparator};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{DiskManager, FileDiskManager, MemoryDiskManager};
