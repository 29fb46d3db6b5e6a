//! Configuration constants for clockpool.

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so a frame maps onto exactly
/// one page of memory and file offsets stay aligned.
pub const PAGE_SIZE: usize = 4096;

/// Pool size used by [`BufferPoolManager::with_default_size`].
///
/// [`BufferPoolManager::with_default_size`]: crate::BufferPoolManager::with_default_size
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Maximum number of pages addressable with a u32 PageId.
///
/// `u32::MAX` itself is reserved for `PageId::INVALID`.
pub const MAX_PAGES: u64 = u32::MAX as u64;

/// Initial capacity of the page table for a pool of `pool_size` frames.
///
/// Roughly 1.2 entries per frame, rounded to an odd number so the table
/// never sits at exactly its load limit when the pool is full.
pub fn page_table_capacity(pool_size: usize) -> usize {
    ((pool_size * 6 / 5) & !1) + 1
}
