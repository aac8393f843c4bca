//! Storage layer - disk I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - The page I/O seam used by the buffer pool
//! - [`FileDiskManager`] / [`MemoryDiskManager`] - Its implementations
//! - [`page`] - Page types and layouts

mod disk_manager;
mod memory_disk_manager;
pub mod page;

pub use disk_manager::{DiskManager, FileDiskManager};
pub use memory_disk_manager::MemoryDiskManager;
