//! Configuration for the page cache.
//!
//! Sizes that shape on-disk layout are compile-time constants; the buffer
//! pool's frame count is runtime configuration via [`BufferPoolConfig`].

/// Size of a page in bytes (4KB).
///
/// Every frame, every disk read/write and every B+Tree node is exactly one
/// page. Pages are aligned to 4096 bytes for Direct I/O.
pub const PAGE_SIZE: usize = 4096;

/// Number of frames used when no explicit pool size is given.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Maximum number of pages addressable with a u32 `PageId`.
///
/// `u32::MAX` is reserved for [`PageId::INVALID`](crate::PageId::INVALID).
pub const MAX_PAGES: u64 = u32::MAX as u64;

/// Runtime configuration for a [`BufferPoolManager`](crate::BufferPoolManager).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool. Must be greater than zero.
    pub pool_size: usize,
}

impl BufferPoolConfig {
    /// Config with the given number of frames.
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self { pool_size }
    }

    /// Bytes of page memory the pool will hold.
    pub fn memory_bytes(&self) -> usize {
        self.pool_size * PAGE_SIZE
    }
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}
