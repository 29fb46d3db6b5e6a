//! Error types for clockpool.

use thiserror::Error;

use crate::common::{FrameId, PageId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
/// This is a common Rust pattern (see `std::io::Result`).
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the buffer pool and its page files.
///
/// A page-table miss is deliberately absent: lookups return `Option`, and
/// "not resident" is handled inside the buffer pool rather than reported.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested page does not exist in the file (never allocated or deleted).
    #[error("{page_id} not found in file {file}")]
    PageNotFound { file: String, page_id: PageId },

    /// Every frame is pinned; a full clock sweep found nothing to evict.
    ///
    /// The caller must unpin pages before retrying.
    #[error("buffer pool exhausted: no evictable frame")]
    PoolExhausted,

    /// Attempted to unpin a page whose pin count is already zero.
    ///
    /// This indicates a bug - unpinning should match pinning.
    #[error("{page_id} of file {file} in {frame_id} is not pinned")]
    PageNotPinned {
        file: String,
        page_id: PageId,
        frame_id: FrameId,
    },

    /// Flush or dispose was requested for a page that is still in use.
    #[error("{page_id} of file {file} in {frame_id} is pinned")]
    PagePinned {
        file: String,
        page_id: PageId,
        frame_id: FrameId,
    },

    /// A frame descriptor is in a state the buffer pool never produces.
    #[error("bad buffer state in {frame_id}: dirty={dirty} valid={valid} refbit={refbit}")]
    BadBufferState {
        frame_id: FrameId,
        dirty: bool,
        valid: bool,
        refbit: bool,
    },

    /// A frame's page header names a different page than the frame holds.
    ///
    /// Raised before write-back, so the bytes never reach another page's slot.
    #[error("{frame_id} holds {expected} but its header names {found}")]
    FrameHeaderMismatch {
        frame_id: FrameId,
        expected: PageId,
        found: PageId,
    },

    /// A page-table insert found the key already mapped.
    #[error("{page_id} of file {file} is already buffered")]
    PageAlreadyBuffered { file: String, page_id: PageId },

    /// Stored checksum or embedded page number did not match on read.
    #[error("checksum mismatch on {page_id}")]
    ChecksumMismatch { page_id: PageId },

    /// The provided page ID is invalid (e.g., the sentinel or past the
    /// addressable range).
    #[error("invalid page ID: {0}")]
    InvalidPageId(u32),
}
