//! Disk file - a page file backed by a single OS file.
//!
//! The [`DiskFile`] handles all direct file operations:
//! - Reading and writing pages at fixed offsets
//! - Allocating new pages, reusing deleted ones first
//! - Checksumming every page it writes

use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use crate::common::config::{MAX_PAGES, PAGE_SIZE};
use crate::common::{Error, FileId, PageId, Result};
use crate::storage::page::{Page, PageHeader, PageType};
use crate::storage::PageFile;

/// A page file stored in one OS file.
///
/// # File Layout
/// Pages are laid out sequentially:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Deleted pages stay in place with a [`PageType::Free`] header and are
/// handed out again by [`PageFile::allocate_page`]. The free list is rebuilt
/// from those headers when the file is reopened.
///
/// # Durability
/// All writes are followed by `fsync()`.
pub struct DiskFile {
    id: FileId,
    name: String,
    inner: Mutex<DiskFileInner>,
}

struct DiskFileInner {
    file: File,
    /// Number of page slots in the file, free ones included.
    page_count: u32,
    /// Deleted pages available for reuse, lowest first.
    free_pages: BTreeSet<PageId>,
}

impl DiskFile {
    /// Create a new page file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        Ok(Self::from_parts(path.as_ref(), file, 0, BTreeSet::new()))
    }

    /// Open an existing page file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let page_count = (file_size / PAGE_SIZE as u64) as u32;

        let mut free_pages = BTreeSet::new();
        let mut header = [0u8; PageHeader::SIZE];
        for n in 0..page_count {
            let page_id = PageId::new(n);
            file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
            file.read_exact(&mut header)?;
            if PageHeader::from_bytes(&header).page_type == PageType::Free {
                free_pages.insert(page_id);
            }
        }

        Ok(Self::from_parts(path.as_ref(), file, page_count, free_pages))
    }

    /// Open an existing page file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    fn from_parts(path: &Path, file: File, page_count: u32, free_pages: BTreeSet<PageId>) -> Self {
        Self {
            id: FileId::next(),
            name: path.display().to_string(),
            inner: Mutex::new(DiskFileInner {
                file,
                page_count,
                free_pages,
            }),
        }
    }

    /// Number of page slots in the file, deleted ones included.
    pub fn page_count(&self) -> u32 {
        self.inner.lock().page_count
    }

    /// Number of deleted pages waiting to be reused.
    pub fn free_page_count(&self) -> usize {
        self.inner.lock().free_pages.len()
    }

    /// Total size of the file in bytes.
    pub fn file_size(&self) -> u64 {
        (self.page_count() as u64) * (PAGE_SIZE as u64)
    }

    fn not_found(&self, page_id: PageId) -> Error {
        Error::PageNotFound {
            file: self.name.clone(),
            page_id,
        }
    }
}

impl DiskFileInner {
    fn is_live(&self, page_id: PageId) -> bool {
        page_id.is_valid() && page_id.0 < self.page_count && !self.free_pages.contains(&page_id)
    }

    /// Stamp the checksum and write `page` to its slot.
    fn write_slot(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        let mut stamped = Page::new();
        stamped.copy_from(page);
        stamped.update_checksum();

        self.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        self.file.write_all(stamped.as_slice())?;
        self.file.sync_all()?;
        Ok(())
    }
}

impl PageFile for DiskFile {
    fn id(&self) -> FileId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_page(&self, page_id: PageId) -> Result<Page> {
        let mut inner = self.inner.lock();
        if !inner.is_live(page_id) {
            return Err(self.not_found(page_id));
        }

        inner.file.seek(SeekFrom::Start(page_id.file_offset(PAGE_SIZE)))?;
        let mut page = Page::new();
        inner.file.read_exact(page.as_mut_slice())?;

        if page.page_id() != page_id || !page.verify_checksum() {
            return Err(Error::ChecksumMismatch { page_id });
        }
        Ok(page)
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        let page_id = page.page_id();
        let mut inner = self.inner.lock();
        if !inner.is_live(page_id) {
            return Err(self.not_found(page_id));
        }
        inner.write_slot(page_id, page)
    }

    fn allocate_page(&self) -> Result<Page> {
        let mut inner = self.inner.lock();

        let (page_id, reused) = match inner.free_pages.first().copied() {
            Some(page_id) => (page_id, true),
            None => {
                if inner.page_count as u64 >= MAX_PAGES {
                    return Err(Error::InvalidPageId(inner.page_count));
                }
                (PageId::new(inner.page_count), false)
            }
        };

        let mut page = Page::for_page(page_id);
        inner.write_slot(page_id, &page)?;
        if reused {
            inner.free_pages.remove(&page_id);
        } else {
            inner.page_count += 1;
        }

        page.update_checksum();
        Ok(page)
    }

    fn delete_page(&self, page_id: PageId) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.is_live(page_id) {
            return Err(self.not_found(page_id));
        }

        let mut tombstone = Page::new();
        tombstone.set_header(&PageHeader::new(PageType::Free, page_id));
        inner.write_slot(page_id, &tombstone)?;
        inner.free_pages.insert(page_id);
        Ok(())
    }
}
