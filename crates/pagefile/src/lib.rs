//! The file manager: a fixed table of up to [`MAX_OPEN_FILES`] open OS file
//! handles, addressed by small integer descriptors rather than by path.
//!
//! Everything above this layer (the page cache, the coordinator) talks to
//! files exclusively through [`FileDescriptor`] values handed back by
//! [`FileManager::open_file`] — paths never leak past this module once a
//! file is open.

#[cfg(test)]
mod tests;

use common::{DbError, DbResult, FileDescriptor, MAX_OPEN_FILES, PAGE_SIZE};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

struct OpenedFile {
    path: PathBuf,
    file: File,
}

/// Owns every open file handle for an engine instance.
///
/// Allocation mirrors the original design directly: a 64-bit bitmap tracks
/// which of the `MAX_OPEN_FILES` slots are in use, and a new descriptor
/// always takes the lowest free slot.
pub struct FileManager {
    slots: Vec<Option<OpenedFile>>,
    bitmap: u64,
}

impl Default for FileManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FileManager {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_OPEN_FILES);
        slots.resize_with(MAX_OPEN_FILES, || None);
        Self { slots, bitmap: 0 }
    }

    /// Creates an empty file at `path`. Fails if the path already exists.
    pub fn create_file(&self, path: impl AsRef<Path>) -> DbResult<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(DbError::FileExists);
        }
        File::create(path)?;
        Ok(())
    }

    /// Opens `path` and assigns it a descriptor, taking the lowest free slot.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> DbResult<FileDescriptor> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|_| DbError::OpenFailed)?;
        self.alloc_descriptor(path.to_path_buf(), file)
    }

    /// Closes the file behind `fd` and frees its slot.
    pub fn close_file(&mut self, fd: FileDescriptor) -> DbResult<()> {
        let idx = self.validated_index(fd)?;
        self.slots[idx] = None;
        self.bitmap &= !(1u64 << idx);
        Ok(())
    }

    /// Unlinks a file from the filesystem. The file need not be open.
    pub fn delete_file(&self, path: impl AsRef<Path>) -> DbResult<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    /// Reads exactly [`PAGE_SIZE`] bytes starting at `page * PAGE_SIZE` into
    /// `buf`. When `may_fail` is set, a short read (including EOF, which
    /// happens when populating the cache for a page beyond current file
    /// length) is swallowed rather than reported.
    pub fn read_page(
        &mut self,
        fd: FileDescriptor,
        page: i32,
        buf: &mut [u8; PAGE_SIZE],
        may_fail: bool,
    ) -> DbResult<()> {
        if page < 0 {
            return Err(DbError::BadPage(page));
        }
        let idx = self.validated_index(fd)?;
        let file = &mut self.slots[idx].as_mut().unwrap().file;
        let offset = page as u64 * PAGE_SIZE as u64;
        if file.seek(SeekFrom::Start(offset)).is_err() {
            return if may_fail { Ok(()) } else { Err(DbError::ReadFailed) };
        }
        match file.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(_) if may_fail => Ok(()),
            Err(_) => Err(DbError::ReadFailed),
        }
    }

    /// Writes exactly [`PAGE_SIZE`] bytes from `buf` at `page * PAGE_SIZE`.
    pub fn write_page(
        &mut self,
        fd: FileDescriptor,
        page: i32,
        buf: &[u8; PAGE_SIZE],
    ) -> DbResult<()> {
        if page < 0 {
            return Err(DbError::BadPage(page));
        }
        let idx = self.validated_index(fd)?;
        let file = &mut self.slots[idx].as_mut().unwrap().file;
        let offset = page as u64 * PAGE_SIZE as u64;
        file.seek(SeekFrom::Start(offset))
            .map_err(|_| DbError::WriteFailed)?;
        file.write_all(buf).map_err(|_| DbError::WriteFailed)?;
        Ok(())
    }

    /// Whether `fd` names a currently-open slot.
    pub fn validate(&self, fd: FileDescriptor) -> bool {
        let idx = fd.0 as usize;
        idx < MAX_OPEN_FILES && self.bitmap & (1u64 << idx) != 0
    }

    /// The path a descriptor was opened with, mostly for diagnostics.
    pub fn path_of(&self, fd: FileDescriptor) -> DbResult<&Path> {
        let idx = self.validated_index(fd)?;
        Ok(&self.slots[idx].as_ref().unwrap().path)
    }

    fn alloc_descriptor(&mut self, path: PathBuf, file: File) -> DbResult<FileDescriptor> {
        let free = (!self.bitmap).trailing_zeros();
        if free as usize >= MAX_OPEN_FILES {
            return Err(DbError::TooManyOpen);
        }
        self.bitmap |= 1u64 << free;
        self.slots[free as usize] = Some(OpenedFile { path, file });
        Ok(FileDescriptor(free))
    }

    fn validated_index(&self, fd: FileDescriptor) -> DbResult<usize> {
        let idx = fd.0 as usize;
        if idx >= MAX_OPEN_FILES || self.bitmap & (1u64 << idx) == 0 {
            return Err(DbError::BadDescriptor);
        }
        Ok(idx)
    }
}
