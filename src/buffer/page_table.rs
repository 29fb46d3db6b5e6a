//! Page table - maps buffered pages to the frames holding them.

use std::collections::HashMap;

use crate::common::config::page_table_capacity;
use crate::common::{Error, FileId, FrameId, PageId, Result};

/// Hash index from `(file, page)` to the frame holding that page.
///
/// A lookup miss is an ordinary outcome (`None`), never an error: the buffer
/// pool uses it to pick the miss path on fetch and to no-op on unpin and
/// dispose.
#[derive(Debug)]
pub struct PageTable {
    map: HashMap<(FileId, PageId), FrameId>,
}

impl PageTable {
    /// Create a table sized for a pool of `pool_size` frames.
    pub fn new(pool_size: usize) -> Self {
        Self {
            map: HashMap::with_capacity(page_table_capacity(pool_size)),
        }
    }

    /// Find the frame holding `page_id` of `file_id`.
    #[inline]
    pub fn lookup(&self, file_id: FileId, page_id: PageId) -> Option<FrameId> {
        self.map.get(&(file_id, page_id)).copied()
    }

    /// Record that `frame_id` now holds `page_id` of `file_id`.
    ///
    /// # Errors
    /// `Error::PageAlreadyBuffered` if the page is already mapped; the
    /// existing mapping is left untouched.
    pub fn insert(
        &mut self,
        file_id: FileId,
        file_name: &str,
        page_id: PageId,
        frame_id: FrameId,
    ) -> Result<()> {
        if self.map.contains_key(&(file_id, page_id)) {
            return Err(Error::PageAlreadyBuffered {
                file: file_name.to_string(),
                page_id,
            });
        }
        self.map.insert((file_id, page_id), frame_id);
        Ok(())
    }

    /// Drop the mapping for `page_id` of `file_id`, returning its frame.
    ///
    /// Removing an absent key is not an error.
    pub fn remove(&mut self, file_id: FileId, page_id: PageId) -> Option<FrameId> {
        self.map.remove(&(file_id, page_id))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }
}
