//! The page file abstraction the buffer pool reads from and writes to.

use std::sync::Arc;

use crate::common::{FileId, PageId, Result};
use crate::storage::page::Page;

/// A file of fixed-size pages.
///
/// The buffer pool owns no storage of its own: every read, write-back,
/// allocation and deletion goes through this trait. Implementations take
/// `&self` and synchronize internally, so a single handle can be shared by
/// the pool (for write-back of evicted pages) and its callers.
pub trait PageFile: Send + Sync {
    /// Identity used to match buffered pages to this file.
    fn id(&self) -> FileId;

    /// Human readable name, used in error messages.
    fn name(&self) -> &str;

    /// Read a page.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page was never allocated or was deleted.
    fn read_page(&self, page_id: PageId) -> Result<Page>;

    /// Write a page back to the slot named by its embedded page number.
    fn write_page(&self, page: &Page) -> Result<()>;

    /// Allocate a new page and return its initial content.
    ///
    /// The returned page carries its freshly assigned number in its header.
    fn allocate_page(&self) -> Result<Page>;

    /// Release a page's storage.
    ///
    /// Safe to call whether or not the page is buffered anywhere.
    fn delete_page(&self, page_id: PageId) -> Result<()>;
}

/// Shared handle to a page file, as stored in frame descriptors.
pub type FileRef = Arc<dyn PageFile>;
