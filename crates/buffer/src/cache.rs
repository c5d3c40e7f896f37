//! Generation-stamped page cache.
//!
//! A handle snapshots the generation of the slot it names at the moment it
//! was issued. Eviction bumps the slot's generation, so any handle obtained
//! before that eviction fails [`PageCache::validate`] afterward — the slot
//! has been reused for a different page and the handle no longer names
//! anything meaningful. Callers must [`PageCache::renew`] a stale handle
//! before touching its buffer again.

use common::{DbError, DbResult, FileDescriptor, PageIndex, PAGE_SIZE};
use hashbrown::HashMap;
use pagefile::FileManager;

/// A reference to a resident page, valid only as long as its generation
/// matches the slot it points to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageHandle {
    fd: FileDescriptor,
    page: PageIndex,
    slot: usize,
    generation: u64,
}

impl PageHandle {
    pub fn file(&self) -> FileDescriptor {
        self.fd
    }

    pub fn page(&self) -> PageIndex {
        self.page
    }
}

struct Slot {
    fd: FileDescriptor,
    page: PageIndex,
    dirty: bool,
    generation: u64,
    buf: Box<[u8; PAGE_SIZE]>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl Slot {
    fn empty() -> Self {
        Self {
            fd: FileDescriptor(0),
            page: -1,
            dirty: false,
            generation: 0,
            buf: Box::new([0u8; PAGE_SIZE]),
            prev: None,
            next: None,
        }
    }
}

/// A fixed-size pool of page-sized buffers with two intrusive lists: a
/// `free` list of unused slots and an `active` list ordered MRU-first,
/// plus a `(file, page) -> slot` map over every resident active slot.
pub struct PageCache {
    slots: Vec<Slot>,
    free_head: Option<usize>,
    active_head: Option<usize>,
    active_tail: Option<usize>,
    index: HashMap<(FileDescriptor, PageIndex), usize>,
}

impl PageCache {
    pub fn new(capacity: usize) -> Self {
        let mut slots: Vec<Slot> = (0..capacity).map(|_| Slot::empty()).collect();
        for i in 0..capacity {
            slots[i].next = if i + 1 < capacity { Some(i + 1) } else { None };
        }
        Self {
            slots,
            free_head: if capacity > 0 { Some(0) } else { None },
            active_head: None,
            active_tail: None,
            index: HashMap::new(),
        }
    }

    /// The central lookup-or-load operation.
    pub fn get_handle(
        &mut self,
        files: &mut FileManager,
        fd: FileDescriptor,
        page: PageIndex,
    ) -> DbResult<PageHandle> {
        if let Some(&idx) = self.index.get(&(fd, page)) {
            self.move_to_mru(idx);
            return Ok(self.handle_for(idx));
        }

        let idx = match self.pop_free() {
            Some(idx) => idx,
            None => {
                let lru = self.active_tail.ok_or(DbError::TooManyOpen)?;
                self.write_back(files, lru)?;
                self.pop_free().expect("write-back just freed a slot")
            }
        };

        {
            let slot = &mut self.slots[idx];
            slot.fd = fd;
            slot.page = page;
            slot.dirty = false;
        }
        files.read_page(fd, page, &mut self.slots[idx].buf, true)?;
        self.push_active_mru(idx);
        self.index.insert((fd, page), idx);
        Ok(self.handle_for(idx))
    }

    pub fn validate(&self, handle: &PageHandle) -> bool {
        self.slots[handle.slot].generation == handle.generation
    }

    pub fn load(&self, handle: &PageHandle) -> Option<&[u8; PAGE_SIZE]> {
        self.validate(handle).then(|| &*self.slots[handle.slot].buf)
    }

    pub fn load_mut(&mut self, handle: &PageHandle) -> Option<&mut [u8; PAGE_SIZE]> {
        if !self.validate(handle) {
            return None;
        }
        Some(&mut self.slots[handle.slot].buf)
    }

    /// Returns `handle` unchanged if still valid, otherwise re-acquires it.
    pub fn renew(
        &mut self,
        files: &mut FileManager,
        handle: PageHandle,
    ) -> DbResult<PageHandle> {
        if self.validate(&handle) {
            Ok(handle)
        } else {
            self.get_handle(files, handle.fd, handle.page)
        }
    }

    pub fn mark_dirty(&mut self, handle: &PageHandle) -> DbResult<()> {
        if !self.validate(handle) {
            return Err(DbError::InvalidHandle);
        }
        self.slots[handle.slot].dirty = true;
        Ok(())
    }

    /// Writes a slot back if dirty, evicts it from the active set, and
    /// bumps its generation, invalidating every outstanding handle to it.
    fn write_back(&mut self, files: &mut FileManager, idx: usize) -> DbResult<()> {
        let (fd, page, dirty) = {
            let slot = &self.slots[idx];
            (slot.fd, slot.page, slot.dirty)
        };
        if dirty {
            files.write_page(fd, page, &self.slots[idx].buf)?;
            self.slots[idx].dirty = false;
        }
        self.index.remove(&(fd, page));
        self.remove_active(idx);
        self.push_free(idx);
        self.slots[idx].generation = self.slots[idx].generation.wrapping_add(1);
        Ok(())
    }

    /// Writes back every slot currently mapped to `fd`.
    pub fn on_close_file(&mut self, files: &mut FileManager, fd: FileDescriptor) -> DbResult<()> {
        let victims: Vec<usize> = self
            .index
            .iter()
            .filter(|((f, _), _)| *f == fd)
            .map(|(_, &idx)| idx)
            .collect();
        for idx in victims {
            self.write_back(files, idx)?;
        }
        Ok(())
    }

    /// Writes back every active slot, across every file.
    pub fn close(&mut self, files: &mut FileManager) -> DbResult<()> {
        let all: Vec<usize> = self.index.values().copied().collect();
        for idx in all {
            self.write_back(files, idx)?;
        }
        Ok(())
    }

    fn handle_for(&self, idx: usize) -> PageHandle {
        let slot = &self.slots[idx];
        PageHandle {
            fd: slot.fd,
            page: slot.page,
            slot: idx,
            generation: slot.generation,
        }
    }

    fn pop_free(&mut self) -> Option<usize> {
        let idx = self.free_head?;
        self.free_head = self.slots[idx].next;
        self.slots[idx].next = None;
        Some(idx)
    }

    fn push_free(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.free_head;
        self.free_head = Some(idx);
    }

    fn push_active_mru(&mut self, idx: usize) {
        self.slots[idx].prev = None;
        self.slots[idx].next = self.active_head;
        if let Some(head) = self.active_head {
            self.slots[head].prev = Some(idx);
        }
        self.active_head = Some(idx);
        if self.active_tail.is_none() {
            self.active_tail = Some(idx);
        }
    }

    fn remove_active(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            Some(p) => self.slots[p].next = next,
            None => self.active_head = next,
        }
        match next {
            Some(n) => self.slots[n].prev = prev,
            None => self.active_tail = prev,
        }
        self.slots[idx].prev = None;
        self.slots[idx].next = None;
    }

    fn move_to_mru(&mut self, idx: usize) {
        if self.active_head == Some(idx) {
            return;
        }
        self.remove_active(idx);
        self.push_active_mru(idx);
    }
}
