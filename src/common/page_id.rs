//! Page identifier type.

use std::fmt;

/// Logical identifier of a page, independent of where (or whether) it is
/// cached in memory.
///
/// Page ids are handed out by a [`DiskManager`](crate::storage::DiskManager)
/// and resolved to frames through the buffer pool's page table. B+Tree
/// pages store them as 4 little-endian bytes (child pointers, parent
/// pointers).
///
/// # Example
/// ```
/// use pagecache::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(PageId::from_le_bytes(page_id.to_le_bytes()), page_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel meaning "no page" (e.g. the parent of a root).
    pub const INVALID: PageId = PageId(u32::MAX);

    /// Width of a serialized page id in bytes.
    pub const SIZE: usize = 4;

    /// Create a new PageId.
    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Serialize for storage inside a page.
    #[inline]
    pub fn to_le_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_le_bytes()
    }

    /// Deserialize from a page.
    #[inline]
    pub fn from_le_bytes(bytes: [u8; Self::SIZE]) -> Self {
        PageId(u32::from_le_bytes(bytes))
    }

    /// Read a page id from the first [`PageId::SIZE`] bytes of `data`.
    ///
    /// # Panics
    /// Panics if `data` is shorter than [`PageId::SIZE`].
    #[inline]
    pub fn read_from(data: &[u8]) -> Self {
        Self::from_le_bytes([data[0], data[1], data[2], data[3]])
    }

    /// Write this page id into the first [`PageId::SIZE`] bytes of `data`.
    #[inline]
    pub fn write_to(self, data: &mut [u8]) {
        data[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
