//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache layer between callers and page
//! files. It manages a fixed pool of frames, each holding one page.
//!
//! # Components
//! - [`BufferPoolManager`] - The page cache and its public operations
//! - [`PageHandle`] - A pin on one page, unpinned on drop
//! - [`PageWriteGuard`] - Payload-only write access through a handle
//! - [`BufferPoolStats`] - Performance statistics
//!
//! Frame descriptors, the frame pool, the page table and the clock
//! replacer are internal to the pool.

mod buffer_pool_manager;
mod frame;
mod frame_pool;
mod page_handle;
mod page_table;
mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use page_handle::{PageHandle, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
