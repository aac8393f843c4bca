//! B+Tree page header and page type definitions.
//!
//! Every B+Tree page (internal or leaf) starts with a [`PageHeader`]. The
//! layout is shared so that a parent can re-point any child's parent id
//! without knowing whether the child is a leaf.

use crate::common::PageId;

/// Type of a B+Tree page.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Zeroed or unrecognized page.
    #[default]
    Invalid = 0,
    /// B-tree internal (non-leaf) node.
    BTreeInternal = 1,
    /// B-tree leaf node.
    BTreeLeaf = 2,
}

impl PageType {
    /// Convert from u8, returning Invalid for unknown values.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => PageType::BTreeInternal,
            2 => PageType::BTreeLeaf,
            _ => PageType::Invalid,
        }
    }
}

/// Metadata stored at the beginning of every B+Tree page.
///
/// # Layout (20 bytes, little-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     page_type (PageType as u8)
/// 1       3     reserved (zero)
/// 4       4     size (number of occupied slots)
/// 8       4     max_size (slot capacity chosen at init)
/// 12      4     page_id (this page)
/// 16      4     parent_page_id (PageId::INVALID for a root)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub size: u32,
    pub max_size: u32,
    pub page_id: PageId,
    pub parent_page_id: PageId,
}

impl PageHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 20;

    pub const OFFSET_PAGE_TYPE: usize = 0;
    pub const OFFSET_SIZE: usize = 4;
    pub const OFFSET_MAX_SIZE: usize = 8;
    pub const OFFSET_PAGE_ID: usize = 12;
    pub const OFFSET_PARENT_PAGE_ID: usize = 16;

    /// Create an empty header for a freshly initialized page.
    pub fn new(page_type: PageType, page_id: PageId, parent_page_id: PageId, max_size: u32) -> Self {
        Self {
            page_type,
            size: 0,
            max_size,
            page_id,
            parent_page_id,
        }
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        Self {
            page_type: PageType::from_u8(data[Self::OFFSET_PAGE_TYPE]),
            size: read_u32(data, Self::OFFSET_SIZE),
            max_size: read_u32(data, Self::OFFSET_MAX_SIZE),
            page_id: PageId::read_from(&data[Self::OFFSET_PAGE_ID..]),
            parent_page_id: PageId::read_from(&data[Self::OFFSET_PARENT_PAGE_ID..]),
        }
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < PageHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for PageHeader");

        data[Self::OFFSET_PAGE_TYPE] = self.page_type as u8;
        data[Self::OFFSET_PAGE_TYPE + 1..Self::OFFSET_SIZE].fill(0);
        write_u32(data, Self::OFFSET_SIZE, self.size);
        write_u32(data, Self::OFFSET_MAX_SIZE, self.max_size);
        self.page_id.write_to(&mut data[Self::OFFSET_PAGE_ID..]);
        self.parent_page_id
            .write_to(&mut data[Self::OFFSET_PARENT_PAGE_ID..]);
    }

    /// Read only the parent pointer, without decoding the rest.
    pub fn read_parent_page_id(data: &[u8]) -> PageId {
        PageId::read_from(&data[Self::OFFSET_PARENT_PAGE_ID..])
    }

    /// Overwrite only the parent pointer.
    pub fn write_parent_page_id(data: &mut [u8], parent_page_id: PageId) {
        parent_page_id.write_to(&mut data[Self::OFFSET_PARENT_PAGE_ID..]);
    }
}

#[inline]
pub(crate) fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

#[inline]
pub(crate) fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

// ============================================================================
// TESTS
// ============================================================================
