//! In-memory page file with I/O counters.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::common::{Error, FileId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::PageFile;

/// A page file that lives entirely in memory.
///
/// Every call is counted, which makes it the natural collaborator for
/// checking what the buffer pool did (or did not) ask of its storage.
///
/// # Example
/// ```
/// use clockpool::storage::{MemFile, PageFile};
///
/// let file = MemFile::new("scratch");
/// let page = file.allocate_page().unwrap();
/// file.read_page(page.page_id()).unwrap();
/// assert_eq!(file.counters().snapshot().reads, 1);
/// ```
pub struct MemFile {
    id: FileId,
    name: String,
    pages: Mutex<BTreeMap<PageId, Box<Page>>>,
    next_page: Mutex<u32>,
    counters: IoCounters,
}

/// Calls made against a [`MemFile`].
#[derive(Debug, Default)]
pub struct IoCounters {
    reads: AtomicU64,
    writes: AtomicU64,
    allocations: AtomicU64,
    deletions: AtomicU64,
}

/// Point-in-time copy of [`IoCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub allocations: u64,
    pub deletions: u64,
}

impl IoCounters {
    pub fn snapshot(&self) -> IoSnapshot {
        IoSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            allocations: self.allocations.load(Ordering::Relaxed),
            deletions: self.deletions.load(Ordering::Relaxed),
        }
    }
}

impl MemFile {
    /// Create an empty in-memory file.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: FileId::next(),
            name: name.into(),
            pages: Mutex::new(BTreeMap::new()),
            next_page: Mutex::new(0),
            counters: IoCounters::default(),
        }
    }

    /// Calls made so far.
    pub fn counters(&self) -> &IoCounters {
        &self.counters
    }

    /// Number of live (allocated and not deleted) pages.
    pub fn page_count(&self) -> usize {
        self.pages.lock().len()
    }

    /// Whether `page_id` is allocated and not deleted.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.pages.lock().contains_key(&page_id)
    }

    fn not_found(&self, page_id: PageId) -> Error {
        Error::PageNotFound {
            file: self.name.clone(),
            page_id,
        }
    }
}

impl PageFile for MemFile {
    fn id(&self) -> FileId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn read_page(&self, page_id: PageId) -> Result<Page> {
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let pages = self.pages.lock();
        let stored = pages.get(&page_id).ok_or_else(|| self.not_found(page_id))?;

        let mut page = Page::new();
        page.copy_from(stored);
        Ok(page)
    }

    fn write_page(&self, page: &Page) -> Result<()> {
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
        let page_id = page.page_id();
        let mut pages = self.pages.lock();
        let stored = pages.get_mut(&page_id).ok_or_else(|| self.not_found(page_id))?;
        stored.copy_from(page);
        Ok(())
    }

    fn allocate_page(&self) -> Result<Page> {
        self.counters.allocations.fetch_add(1, Ordering::Relaxed);
        let page_id = {
            let mut next = self.next_page.lock();
            let page_id = PageId::new(*next);
            if !page_id.is_valid() {
                return Err(Error::InvalidPageId(*next));
            }
            *next += 1;
            page_id
        };

        let page = Page::for_page(page_id);
        let mut stored = Box::new(Page::new());
        stored.copy_from(&page);
        self.pages.lock().insert(page_id, stored);
        Ok(page)
    }

    fn delete_page(&self, page_id: PageId) -> Result<()> {
        self.counters.deletions.fetch_add(1, Ordering::Relaxed);
        self.pages
            .lock()
            .remove(&page_id)
            .map(|_| ())
            .ok_or_else(|| self.not_found(page_id))
    }
}
