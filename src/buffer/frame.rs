//! Frame descriptors - the bookkeeping row for each buffer pool slot.
//!
//! A [`FrameDescriptor`] records which page occupies a frame and the state
//! the clock replacer and pin accounting need:
//! - Which file and page are loaded (if any)
//! - Pin count for reference counting
//! - Reference bit for the clock's second chance
//! - Dirty flag for write-back tracking
//!
//! Descriptors are plain data guarded by the pool mutex; every mutation goes
//! through a method so the reset-on-invalid invariant cannot be bypassed.

use std::fmt;

use crate::common::{Error, FileId, FrameId, PageId, Result};
use crate::storage::FileRef;

/// State of one frame in the buffer pool.
///
/// # Invariant
/// When `valid` is false the frame holds no file, and `dirty`, `refbit`
/// and `pin_count` are at their reset values.
pub struct FrameDescriptor {
    frame_id: FrameId,
    file: Option<FileRef>,
    page_id: PageId,
    valid: bool,
    refbit: bool,
    dirty: bool,
    pin_count: u32,
}

impl FrameDescriptor {
    /// Create an empty descriptor for `frame_id`.
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            file: None,
            page_id: PageId::INVALID,
            valid: false,
            refbit: false,
            dirty: false,
            pin_count: 0,
        }
    }

    // ========================================================================
    // Identity changes
    // ========================================================================

    /// Occupy the frame with `page_id` of `file`.
    ///
    /// The page starts clean, referenced and pinned once.
    pub fn set(&mut self, file: FileRef, page_id: PageId) {
        self.file = Some(file);
        self.page_id = page_id;
        self.valid = true;
        self.refbit = true;
        self.dirty = false;
        self.pin_count = 1;
    }

    /// Return the frame to the empty state.
    pub fn clear(&mut self) {
        self.file = None;
        self.page_id = PageId::INVALID;
        self.valid = false;
        self.refbit = false;
        self.dirty = false;
        self.pin_count = 0;
    }

    // ========================================================================
    // Pin count
    // ========================================================================

    /// Add a pin and mark the frame referenced. Returns the new pin count.
    #[inline]
    pub fn pin(&mut self) -> u32 {
        self.pin_count += 1;
        self.refbit = true;
        self.pin_count
    }

    /// Add a pin for the pool's own write-back. The reference bit is left
    /// alone, so a checkpoint does not change the clock's choices.
    #[inline]
    pub fn pin_for_io(&mut self) -> u32 {
        self.pin_count += 1;
        self.pin_count
    }

    /// Drop a pin. Returns the new pin count.
    ///
    /// # Errors
    /// `Error::PageNotPinned` if the pin count is already zero.
    pub fn unpin(&mut self) -> Result<u32> {
        if self.pin_count == 0 {
            return Err(Error::PageNotPinned {
                file: self.file_name(),
                page_id: self.page_id,
                frame_id: self.frame_id,
            });
        }
        self.pin_count -= 1;
        Ok(self.pin_count)
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    // ========================================================================
    // Flags
    // ========================================================================

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[inline]
    pub fn refbit(&self) -> bool {
        self.refbit
    }

    #[inline]
    pub fn clear_refbit(&mut self) {
        self.refbit = false;
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    // ========================================================================
    // Identity queries
    // ========================================================================

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// The file whose page occupies this frame.
    pub fn file(&self) -> Option<&FileRef> {
        self.file.as_ref()
    }

    pub fn file_id(&self) -> Option<FileId> {
        self.file.as_ref().map(|f| f.id())
    }

    /// Whether this frame claims to hold a page of `file_id`.
    pub fn belongs_to(&self, file_id: FileId) -> bool {
        self.file_id() == Some(file_id)
    }

    /// Error describing this descriptor as inconsistent.
    pub fn bad_state(&self) -> Error {
        Error::BadBufferState {
            frame_id: self.frame_id,
            dirty: self.dirty,
            valid: self.valid,
            refbit: self.refbit,
        }
    }

    pub(crate) fn file_name(&self) -> String {
        self.file
            .as_ref()
            .map(|f| f.name().to_string())
            .unwrap_or_default()
    }
}

impl fmt::Display for FrameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "file:{} {} ", file.name(), self.page_id)?,
            None => write!(f, "file:NULL ")?,
        }
        write!(
            f,
            "valid:{} pinCnt:{} dirty:{} refbit:{}",
            self.valid, self.pin_count, self.dirty, self.refbit
        )
    }
}

impl fmt::Debug for FrameDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameDescriptor")
            .field("frame_id", &self.frame_id)
            .field("file", &self.file_id())
            .field("page_id", &self.page_id)
            .field("valid", &self.valid)
            .field("refbit", &self.refbit)
            .field("dirty", &self.dirty)
            .field("pin_count", &self.pin_count)
            .finish()
    }
}
