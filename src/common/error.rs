//! Error types for the page cache.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Callers that only care about how to react (retry, propagate, treat as a
/// bug) can match on the kind instead of the concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Every frame is pinned; retry after other pins are released.
    ResourceExhausted,
    /// The target page is not resident or does not exist.
    NotFound,
    /// The request conflicts with the page's current pin state.
    InvalidState,
    /// Underlying disk I/O failed.
    Io,
}

/// All errors raised by the buffer pool and the disk managers.
///
/// B+Tree page structural operations never produce these for their own
/// preconditions (those are asserted); they only forward pool errors hit
/// while re-parenting children, including `PageBusy` for a child whose
/// latch is already held.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Buffer pool has no free frames and every resident page is pinned.
    #[error("No free frames available in buffer pool")]
    NoFreeFrames,

    /// The page is not currently resident in the buffer pool.
    #[error("{0} is not resident in the buffer pool")]
    PageNotResident(PageId),

    /// Requested page does not exist on disk.
    #[error("{0} not found on disk")]
    PageNotFound(PageId),

    /// Attempted to unpin a page whose pin count is already zero.
    #[error("{0} is not pinned")]
    PageNotPinned(PageId),

    /// Attempted to delete a page that is still in use.
    #[error("{page_id} is still pinned (pin count {pin_count})")]
    PagePinned { page_id: PageId, pin_count: u32 },

    /// The page is latched by another holder or is being flushed.
    #[error("{0} is busy (latched or being flushed)")]
    PageBusy(PageId),

    /// The page id is the invalid sentinel or otherwise unusable.
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) => ErrorKind::Io,
            Error::NoFreeFrames => ErrorKind::ResourceExhausted,
            Error::PageNotResident(_) | Error::PageNotFound(_) => ErrorKind::NotFound,
            Error::PageNotPinned(_)
            | Error::PagePinned { .. }
            | Error::PageBusy(_)
            | Error::InvalidPageId(_) => ErrorKind::InvalidState,
        }
    }
}
