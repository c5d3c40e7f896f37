//! The coordinator composes the file manager and the page cache into the
//! single owned context every higher layer (table store, B+-tree index)
//! holds a `Rc<RefCell<Coordinator>>` to, instead of reaching for a global
//! singleton.

use crate::cache::{PageCache, PageHandle};
use common::{DbResult, FileDescriptor, PageIndex, PAGE_SIZE};
use pagefile::FileManager;
use std::path::Path;

pub struct Coordinator {
    files: FileManager,
    cache: PageCache,
}

impl Coordinator {
    pub fn new(buffer_pool_pages: usize) -> Self {
        Self {
            files: FileManager::new(),
            cache: PageCache::new(buffer_pool_pages),
        }
    }

    pub fn create_file(&self, path: impl AsRef<Path>) -> DbResult<()> {
        self.files.create_file(path)
    }

    pub fn open_file(&mut self, path: impl AsRef<Path>) -> DbResult<FileDescriptor> {
        self.files.open_file(path)
    }

    pub fn delete_file(&self, path: impl AsRef<Path>) -> DbResult<()> {
        self.files.delete_file(path)
    }

    /// Writes back every page cached for `fd` before handing it back to the
    /// file manager, so a later re-open never sees stale cached pages.
    pub fn close_file(&mut self, fd: FileDescriptor) -> DbResult<()> {
        self.cache.on_close_file(&mut self.files, fd)?;
        self.files.close_file(fd)
    }

    pub fn get_handle(&mut self, fd: FileDescriptor, page: PageIndex) -> DbResult<PageHandle> {
        self.cache.get_handle(&mut self.files, fd, page)
    }

    /// Renews `handle` in place if it had gone stale, then returns its
    /// buffer — the safe way to read a page without juggling staleness by
    /// hand.
    pub fn load(&mut self, handle: &mut PageHandle) -> DbResult<&[u8; PAGE_SIZE]> {
        self.renew(handle)?;
        Ok(self
            .cache
            .load(handle)
            .expect("handle was just renewed and must be valid"))
    }

    pub fn load_mut(&mut self, handle: &mut PageHandle) -> DbResult<&mut [u8; PAGE_SIZE]> {
        self.renew(handle)?;
        Ok(self
            .cache
            .load_mut(handle)
            .expect("handle was just renewed and must be valid"))
    }

    pub fn renew(&mut self, handle: &mut PageHandle) -> DbResult<()> {
        let renewed = self.cache.renew(&mut self.files, *handle)?;
        *handle = renewed;
        Ok(())
    }

    pub fn mark_dirty(&mut self, handle: &PageHandle) -> DbResult<()> {
        self.cache.mark_dirty(handle)
    }

    pub fn validate(&self, handle: &PageHandle) -> bool {
        self.cache.validate(handle)
    }

    /// Writes back every active page across every open file.
    pub fn close(&mut self) -> DbResult<()> {
        self.cache.close(&mut self.files)
    }
}
