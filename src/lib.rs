//! clockpool - a buffer pool manager with clock page replacement.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 callers (index / record layer)              │
//! └─────────────────────────────────────────────────────────────┘
//!                   fetch / unpin / new / flush / dispose
//!                              ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Buffer Pool (buffer/)                                      │
//! │    BufferPoolManager + PageTable + FrameDescriptors         │
//! │    ClockReplacer (second chance) + FramePool + Stats        │
//! └─────────────────────────────────────────────────────────────┘
//!                              ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage (storage/)                                         │
//! │    PageFile trait → DiskFile | MemFile                      │
//! │    Page + PageHeader                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, FileId, Error, config)
//! - [`buffer`] - Buffer pool management and the clock replacer
//! - [`storage`] - Page files and page formats
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use clockpool::{BufferPoolManager, DiskFile, FileRef};
//!
//! let file: FileRef = Arc::new(DiskFile::create("my_table.db").unwrap());
//! let bpm = BufferPoolManager::new(64);
//!
//! let (page_id, mut handle) = bpm.new_page(&file).unwrap();
//! handle.write().payload_mut()[..5].copy_from_slice(b"hello");
//! drop(handle);
//!
//! bpm.flush_file(&file).unwrap();
//! # let _ = page_id;
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, FileId, FrameId, PageId, Result};

pub use buffer::{BufferPoolManager, BufferPoolStats, PageHandle, PageWriteGuard, StatsSnapshot};
pub use storage::page::{Page, PageHeader, PageType};
pub use storage::{DiskFile, FileRef, MemFile, PageFile};
