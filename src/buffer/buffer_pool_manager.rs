//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between page files and memory
//! - Pin-based reference counting
//! - Clock (second-chance) replacement
//! - Write-back of dirty pages before their frame is reused

use std::fmt::Write as _;
use std::sync::Arc;

use log::{debug, info, trace, warn};
use parking_lot::Mutex;

use crate::buffer::frame::FrameDescriptor;
use crate::buffer::frame_pool::FramePool;
use crate::buffer::page_table::PageTable;
use crate::buffer::replacer::ClockReplacer;
use crate::buffer::{BufferPoolStats, PageHandle};
use crate::common::config::DEFAULT_POOL_SIZE;
use crate::common::{Error, FrameId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::FileRef;

/// Manages a fixed pool of frames caching pages of any number of files.
///
/// # Architecture
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │                      BufferPoolManager                       │
/// │  ┌───────────────── Mutex<PoolState> ─────────────────────┐  │
/// │  │ ┌──────────────┐ ┌──────────────────┐ ┌─────────────┐  │  │
/// │  │ │ page_table   │ │ descriptors      │ │ replacer    │  │  │
/// │  │ │(File,Page)→F │ │ Vec<FrameDesc>   │ │ clock hand  │  │  │
/// │  │ └──────────────┘ └──────────────────┘ └─────────────┘  │  │
/// │  └────────────────────────────────────────────────────────┘  │
/// │  ┌────────────────────────────────────────────────────────┐  │
/// │  │ frames: FramePool   [RwLock<Page>] [RwLock<Page>] ...  │  │
/// │  └────────────────────────────────────────────────────────┘  │
/// └──────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `state`: one `Mutex` over the page table, descriptors and clock hand.
///   Every decision (hit or miss, victim choice, pin changes) happens under
///   it, so a frame can never be evicted between a lookup and the pin that
///   follows it. Loads and evictions do their I/O under it too.
/// - `frames`: no pool-level lock; each frame has its own `RwLock`, taken by
///   [`PageHandle::read`] / [`PageHandle::write`] while the page is pinned.
/// - `stats`: atomic counters.
///
/// Handles take a frame lock and then the pool lock. The pool only takes a
/// frame lock while holding its own lock for unpinned frames, which no
/// handle can be holding; pinned frames are read by
/// [`flush_all_pages`](Self::flush_all_pages) with the pool lock released.
///
/// # Usage
/// ```
/// use std::sync::Arc;
/// use clockpool::{BufferPoolManager, FileRef, MemFile};
///
/// let file: FileRef = Arc::new(MemFile::new("example"));
/// let bpm = BufferPoolManager::new(8);
///
/// let (page_id, mut handle) = bpm.new_page(&file).unwrap();
/// handle.write().payload_mut()[0] = 0xAB;
/// drop(handle); // unpinned, dirty
///
/// let handle = bpm.fetch_page(&file, page_id).unwrap();
/// assert_eq!(handle.read().payload()[0], 0xAB);
/// ```
pub struct BufferPoolManager {
    /// Page bytes, one slot per frame.
    frames: FramePool,

    /// Everything that decides which page lives where.
    state: Mutex<PoolState>,

    /// Performance statistics.
    stats: BufferPoolStats,

    /// Number of frames in the pool (immutable after construction).
    pool_size: usize,
}

struct PoolState {
    descriptors: Vec<FrameDescriptor>,
    page_table: PageTable,
    replacer: ClockReplacer,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let descriptors = (0..pool_size)
            .map(|i| FrameDescriptor::new(FrameId::new(i)))
            .collect();

        info!("buffer pool created with {} frames", pool_size);

        Self {
            frames: FramePool::new(pool_size),
            state: Mutex::new(PoolState {
                descriptors,
                page_table: PageTable::new(pool_size),
                replacer: ClockReplacer::new(pool_size),
            }),
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    /// Create a pool of [`DEFAULT_POOL_SIZE`] frames.
    pub fn with_default_size() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }

    // ========================================================================
    // Public API: Fetch and unpin
    // ========================================================================

    /// Pin `page_id` of `file`, reading it in if it is not resident.
    ///
    /// A resident page is pinned again without any I/O. Otherwise a frame is
    /// taken from the clock (writing back its previous page if dirty) and
    /// the page is read into it.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if every frame is pinned
    /// - `Error::PageNotFound` / I/O errors from the page file
    pub fn fetch_page(&self, file: &FileRef, page_id: PageId) -> Result<PageHandle<'_>> {
        let mut state = self.state.lock();

        if let Some(frame_id) = state.page_table.lookup(file.id(), page_id) {
            let pins = state.descriptors[frame_id.0].pin();
            self.stats.record_hit();
            trace!("hit {} of {} in {} (pins={})", page_id, file.name(), frame_id, pins);
            return Ok(PageHandle::new(self, Arc::clone(file), page_id, frame_id));
        }

        self.stats.record_miss();
        let frame_id = self.allocate_frame(&mut state)?;

        let page = file.read_page(page_id)?;
        self.stats.record_read();
        self.frames.page_mut(frame_id).copy_from(&page);

        self.install(&mut state, file, page_id, frame_id)?;
        trace!("miss {} of {}, loaded into {}", page_id, file.name(), frame_id);

        Ok(PageHandle::new(self, Arc::clone(file), page_id, frame_id))
    }

    /// Drop one pin on `page_id` of `file`, marking it dirty if `dirty`.
    ///
    /// Unpinning a page that is not resident is a no-op. Dirtiness is
    /// sticky: a later unpin with `dirty == false` does not clean the page.
    ///
    /// # Errors
    /// - `Error::PageNotPinned` if the page is resident with no pins
    pub fn unpin_page(&self, file: &FileRef, page_id: PageId, dirty: bool) -> Result<()> {
        let mut state = self.state.lock();

        let Some(frame_id) = state.page_table.lookup(file.id(), page_id) else {
            return Ok(());
        };

        let desc = &mut state.descriptors[frame_id.0];
        desc.unpin()?;
        if dirty {
            desc.mark_dirty();
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Create and dispose pages
    // ========================================================================

    /// Allocate a new page in `file` and pin it in the pool.
    ///
    /// The frame is secured before the file is asked for a page, so an
    /// exhausted pool does not leave an orphaned allocation behind. The
    /// page's initial content is whatever the file allocated; nothing is
    /// read back.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if every frame is pinned
    /// - I/O errors from the page file
    pub fn new_page(&self, file: &FileRef) -> Result<(PageId, PageHandle<'_>)> {
        let mut state = self.state.lock();

        let frame_id = self.allocate_frame(&mut state)?;
        let page = file.allocate_page()?;
        let page_id = page.page_id();
        self.frames.page_mut(frame_id).copy_from(&page);

        self.install(&mut state, file, page_id, frame_id)?;
        debug!("allocated {} of {} into {}", page_id, file.name(), frame_id);

        Ok((
            page_id,
            PageHandle::new(self, Arc::clone(file), page_id, frame_id),
        ))
    }

    /// Delete `page_id` from `file`, dropping it from the pool first.
    ///
    /// The file is told to delete the page whether or not it was resident.
    ///
    /// # Errors
    /// - `Error::PagePinned` if the page is resident and pinned; the file
    ///   is left untouched
    /// - errors from the page file's delete
    pub fn dispose_page(&self, file: &FileRef, page_id: PageId) -> Result<()> {
        let mut state = self.state.lock();

        if let Some(frame_id) = state.page_table.lookup(file.id(), page_id) {
            let desc = &mut state.descriptors[frame_id.0];
            if desc.is_pinned() {
                return Err(Error::PagePinned {
                    file: file.name().to_string(),
                    page_id,
                    frame_id,
                });
            }
            desc.clear();
            state.page_table.remove(file.id(), page_id);
            debug!("disposed {} of {} from {}", page_id, file.name(), frame_id);
        }

        file.delete_page(page_id)
    }

    // ========================================================================
    // Public API: Flush pages
    // ========================================================================

    /// Write back and drop every dirty page of `file`.
    ///
    /// All of the file's frames are checked before anything is written: if
    /// one is pinned, nothing is flushed. Clean pages stay resident.
    ///
    /// # Errors
    /// - `Error::PagePinned` if any page of `file` is pinned
    /// - `Error::BadBufferState` if a frame claims `file` but is not valid
    /// - `Error::FrameHeaderMismatch` if a dirty frame's header names
    ///   another page
    /// - I/O errors from the page file; frames flushed before the failure
    ///   stay flushed
    pub fn flush_file(&self, file: &FileRef) -> Result<()> {
        let mut state = self.state.lock();
        let file_id = file.id();

        for desc in state.descriptors.iter().filter(|d| d.belongs_to(file_id)) {
            if desc.is_pinned() {
                return Err(Error::PagePinned {
                    file: file.name().to_string(),
                    page_id: desc.page_id(),
                    frame_id: desc.frame_id(),
                });
            }
            if !desc.is_valid() {
                return Err(desc.bad_state());
            }
            if desc.is_dirty() {
                let page = self.frames.page(desc.frame_id());
                check_header(desc.frame_id(), desc.page_id(), &page)?;
            }
        }

        let PoolState {
            descriptors,
            page_table,
            ..
        } = &mut *state;

        let mut flushed = 0;
        for desc in descriptors
            .iter_mut()
            .filter(|d| d.belongs_to(file_id) && d.is_dirty())
        {
            let frame_id = desc.frame_id();
            self.write_back(file, frame_id, desc.page_id(), &self.frames.page(frame_id))?;
            desc.clear_dirty();
            page_table.remove(file_id, desc.page_id());
            desc.clear();
            flushed += 1;
        }

        debug!("flushed {} pages of {}", flushed, file.name());
        Ok(())
    }

    /// Write back every dirty page in the pool, keeping all pages resident.
    ///
    /// Dirty frames are collected and pinned under the pool lock, which is
    /// then released; each page is copied out under its frame's read lock
    /// and written with no lock held. A handle holding a frame's write lock
    /// can therefore keep calling into the pool while a checkpoint waits on
    /// it. Changes made after a page is copied leave it dirty again.
    ///
    /// While a page is being written its extra pin makes `flush_file` and
    /// `dispose_page` report it as pinned.
    ///
    /// # Errors
    /// The first write-back failure. Every collected page is still
    /// attempted, and pages that failed stay dirty.
    pub fn flush_all_pages(&self) -> Result<()> {
        let dirty: Vec<(FileRef, PageId, FrameId)> = {
            let mut state = self.state.lock();
            state
                .descriptors
                .iter_mut()
                .filter(|d| d.is_valid() && d.is_dirty())
                .filter_map(|desc| {
                    let file = desc.file().cloned()?;
                    desc.pin_for_io();
                    desc.clear_dirty();
                    Some((file, desc.page_id(), desc.frame_id()))
                })
                .collect()
        };

        let mut first_err = None;
        let mut copy = Page::new();
        for (file, page_id, frame_id) in dirty {
            copy.copy_from(&self.frames.page(frame_id));
            let written = self.write_back(&file, frame_id, page_id, &copy);

            let mut state = self.state.lock();
            let desc = &mut state.descriptors[frame_id.0];
            if let Err(e) = written {
                desc.mark_dirty();
                first_err.get_or_insert(e);
            }
            if let Err(e) = desc.unpin() {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of pages mapped in the page table.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// Number of frames holding a page.
    pub fn valid_frame_count(&self) -> usize {
        self.state
            .lock()
            .descriptors
            .iter()
            .filter(|d| d.is_valid())
            .count()
    }

    /// Number of frames holding no page.
    pub fn free_frame_count(&self) -> usize {
        self.pool_size - self.valid_frame_count()
    }

    /// Frame the clock hand points at.
    pub fn clock_hand(&self) -> FrameId {
        self.state.lock().replacer.hand()
    }

    /// Pin count of a resident page, `None` if not resident.
    pub fn pin_count(&self, file: &FileRef, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .lookup(file.id(), page_id)
            .map(|fid| state.descriptors[fid.0].pin_count())
    }

    /// Dirty flag of a resident page, `None` if not resident.
    pub fn is_dirty(&self, file: &FileRef, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        state
            .page_table
            .lookup(file.id(), page_id)
            .map(|fid| state.descriptors[fid.0].is_dirty())
    }

    /// Whether `page_id` of `file` currently occupies a frame.
    pub fn is_resident(&self, file: &FileRef, page_id: PageId) -> bool {
        self.state.lock().page_table.lookup(file.id(), page_id).is_some()
    }

    /// One line per frame, then the number of valid frames.
    pub fn debug_dump(&self) -> String {
        let state = self.state.lock();
        let mut out = String::new();
        let mut valid = 0;

        for desc in &state.descriptors {
            let _ = writeln!(out, "FrameNo:{} {}", desc.frame_id().0, desc);
            if desc.is_valid() {
                valid += 1;
            }
        }
        let _ = writeln!(out, "Total Number of Valid Frames:{}", valid);
        out
    }

    // ========================================================================
    // Internal: Called by PageHandle
    // ========================================================================

    pub(crate) fn frames(&self) -> &FramePool {
        &self.frames
    }

    /// Mark a resident page dirty without touching its pins.
    pub(crate) fn mark_dirty(&self, file: &FileRef, page_id: PageId) {
        let mut state = self.state.lock();
        if let Some(frame_id) = state.page_table.lookup(file.id(), page_id) {
            state.descriptors[frame_id.0].mark_dirty();
        }
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    /// Get an empty frame, evicting the clock's victim if necessary.
    ///
    /// A dirty victim is written back through its own file before it is
    /// unmapped. The returned frame is always cleared, so a failure between
    /// here and [`Self::install`] leaves a free frame rather than a stale
    /// mapping.
    fn allocate_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        let PoolState {
            descriptors,
            page_table,
            replacer,
        } = state;

        let frame_id = replacer
            .victim(descriptors)
            .ok_or(Error::PoolExhausted)?;

        let desc = &mut descriptors[frame_id.0];
        if !desc.is_valid() {
            return Ok(frame_id);
        }

        let file = desc.file().cloned().ok_or_else(|| desc.bad_state())?;
        let page_id = desc.page_id();

        if desc.is_dirty() {
            self.write_back(&file, frame_id, page_id, &self.frames.page(frame_id))?;
            desc.clear_dirty();
        }

        page_table.remove(file.id(), page_id);
        desc.clear();
        self.stats.record_eviction();
        debug!("evicted {} of {} from {}", page_id, file.name(), frame_id);

        Ok(frame_id)
    }

    /// Write a frame's bytes to `page_id` of `file`.
    ///
    /// The page file places a page by the id in its header, so a header that
    /// disagrees with the frame's descriptor is refused.
    fn write_back(
        &self,
        file: &FileRef,
        frame_id: FrameId,
        page_id: PageId,
        page: &Page,
    ) -> Result<()> {
        check_header(frame_id, page_id, page)?;
        file.write_page(page)?;
        self.stats.record_write();
        Ok(())
    }

    /// Map `page_id` of `file` to an empty `frame_id` and pin it once.
    fn install(
        &self,
        state: &mut PoolState,
        file: &FileRef,
        page_id: PageId,
        frame_id: FrameId,
    ) -> Result<()> {
        state
            .page_table
            .insert(file.id(), file.name(), page_id, frame_id)?;
        state.descriptors[frame_id.0].set(Arc::clone(file), page_id);
        Ok(())
    }
}

fn check_header(frame_id: FrameId, expected: PageId, page: &Page) -> Result<()> {
    let found = page.page_id();
    if found != expected {
        return Err(Error::FrameHeaderMismatch {
            frame_id,
            expected,
            found,
        });
    }
    Ok(())
}

impl Drop for BufferPoolManager {
    fn drop(&mut self) {
        if let Err(e) = self.flush_all_pages() {
            warn!("failed to flush dirty pages on shutdown: {}", e);
        }
    }
}
