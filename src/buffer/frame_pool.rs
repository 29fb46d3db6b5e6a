//! Frame storage - the page bytes behind each buffer pool slot.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::FrameId;
use crate::storage::page::Page;

/// Fixed array of page-sized frames, allocated once.
///
/// Each frame has its own `RwLock`, so readers of different pages (and
/// concurrent readers of one page) never contend. Which page a frame holds
/// is tracked separately, by the frame descriptors.
pub struct FramePool {
    frames: Vec<RwLock<Page>>,
}

impl FramePool {
    /// Allocate `pool_size` zeroed frames.
    pub fn new(pool_size: usize) -> Self {
        Self {
            frames: (0..pool_size).map(|_| RwLock::new(Page::new())).collect(),
        }
    }

    /// Acquire read lock on a frame's page.
    #[inline]
    pub fn page(&self, frame_id: FrameId) -> RwLockReadGuard<'_, Page> {
        self.frames[frame_id.0].read()
    }

    /// Acquire write lock on a frame's page.
    #[inline]
    pub fn page_mut(&self, frame_id: FrameId) -> RwLockWriteGuard<'_, Page> {
        self.frames[frame_id.0].write()
    }
}
