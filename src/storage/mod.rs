//! Storage layer - page files and page formats.
//!
//! This module handles persistent storage:
//! - [`PageFile`] - What the buffer pool needs from a file
//! - [`DiskFile`] - Page file backed by an OS file
//! - [`MemFile`] - In-memory page file that counts its I/O
//! - [`page`] - Page types and layouts

mod disk_file;
mod mem_file;
pub mod page;
mod page_file;

pub use disk_file::DiskFile;
pub use mem_file::{IoCounters, IoSnapshot, MemFile};
pub use page_file::{FileRef, PageFile};
