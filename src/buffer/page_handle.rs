//! Pinned page handles.
//!
//! A [`PageHandle`] is proof that a page is pinned in the buffer pool. Page
//! bytes are reached through [`PageHandle::read`] and [`PageHandle::write`],
//! whose lock guards borrow the handle, so no reference to a frame can
//! outlive the pin that keeps the frame from being evicted.
//!
//! The pin is dropped together with the handle.

use std::ops::Deref;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId, Result};
use crate::storage::page::Page;
use crate::storage::FileRef;

use super::buffer_pool_manager::BufferPoolManager;

/// A pin on one buffered page.
///
/// # Example
/// ```ignore
/// let mut handle = bpm.fetch_page(&file, page_id)?;
/// handle.write().payload_mut()[0] = 0xFF;  // marks the page dirty
/// // handle drops here, page unpinned (dirty)
/// ```
pub struct PageHandle<'a> {
    bpm: &'a BufferPoolManager,
    file: FileRef,
    page_id: PageId,
    frame_id: FrameId,
    dirty: bool,
    released: bool,
}

/// Exclusive access to a pinned page's payload.
///
/// The whole page is readable through `Deref`, but only the payload can be
/// written: the header belongs to the pool and the page file.
pub struct PageWriteGuard<'a> {
    guard: RwLockWriteGuard<'a, Page>,
}

impl PageWriteGuard<'_> {
    /// Mutable view of the bytes after the header.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.guard.payload_mut()
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Page {
        &self.guard
    }
}

impl<'a> PageHandle<'a> {
    /// Called by the buffer pool once the pin is taken.
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        file: FileRef,
        page_id: PageId,
        frame_id: FrameId,
    ) -> Self {
        Self {
            bpm,
            file,
            page_id,
            frame_id,
            dirty: false,
            released: false,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn file(&self) -> &FileRef {
        &self.file
    }

    /// Shared access to the page bytes.
    pub fn read(&self) -> RwLockReadGuard<'_, Page> {
        self.bpm.frames().page(self.frame_id)
    }

    /// Exclusive access to the page payload. Marks the page dirty.
    pub fn write(&mut self) -> PageWriteGuard<'_> {
        self.dirty = true;
        PageWriteGuard {
            guard: self.bpm.frames().page_mut(self.frame_id),
        }
    }

    /// Report the page as modified when the pin is dropped.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Whether this handle will unpin the page as dirty.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Unpin now and report the outcome, rather than on drop.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.bpm.unpin_page(&self.file, self.page_id, self.dirty)
    }

    /// Give up the handle but leave the page pinned.
    ///
    /// The caller takes over the pin and must pair it with
    /// [`BufferPoolManager::unpin_page`]. Any dirtiness recorded on the
    /// handle is applied to the frame now.
    pub fn keep_pinned(mut self) -> PageId {
        self.released = true;
        if self.dirty {
            self.bpm.mark_dirty(&self.file, self.page_id);
        }
        self.page_id
    }
}

impl Drop for PageHandle<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.bpm.unpin_page(&self.file, self.page_id, self.dirty) {
            log::warn!("dropping handle for {} of {}: {}", self.page_id, self.file.name(), e);
        }
    }
}
