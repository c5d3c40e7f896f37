//! Shared identifiers, error types, and engine configuration for the storage
//! engine core.
//!
//! Every other crate in this workspace (`pagefile`, `buffer`, `table`,
//! `btree`) depends on `common` for the ids that thread through the whole
//! stack (`FileDescriptor`, `PageIndex`, `RecordId`) and for the single
//! error type (`DbError`) that every fallible operation returns.

#[cfg(test)]
mod tests;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fixed page size used by every on-disk file: table files, index files.
pub const PAGE_SIZE: usize = 8192;

/// Number of resident slots in the buffer pool, sized well above the
/// expected concurrent working set.
pub const NUM_BUFFER_PAGES: usize = 1024;

/// Maximum number of files the file manager can hold open simultaneously.
pub const MAX_OPEN_FILES: usize = 64;

/// A small non-negative integer identifying an open file slot.
///
/// Carries identity, not meaning: two descriptors are equal iff they name
/// the same open-file slot, never by comparing paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FileDescriptor(pub u32);

/// A zero-based page index within a file. Page 0 always holds metadata.
pub type PageIndex = i32;

/// Fully-qualified location of a record: the page it lives on and its slot
/// within that page's slotted layout.
///
/// Ordered lexicographically by `(page, slot)` — the B+-Tree index relies on
/// this ordering to disambiguate duplicate keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId {
    pub page: i32,
    pub slot: i32,
}

impl RecordId {
    /// The sentinel record id used where "no record" must be represented.
    pub const NULL: RecordId = RecordId { page: -1, slot: -1 };

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::NULL
    }
}

/// Canonical error type shared across the storage engine core.
///
/// One variant per failure mode rather than a single stringly-typed variant,
/// so callers (the table store, the index, and the test suite) can match on
/// the specific failure rather than parse messages.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("file already exists")]
    FileExists,
    #[error("failed to open file")]
    OpenFailed,
    #[error("too many open files")]
    TooManyOpen,
    #[error("bad file descriptor")]
    BadDescriptor,
    #[error("failed to read page")]
    ReadFailed,
    #[error("failed to write page")]
    WriteFailed,
    #[error("bad page number: {0}")]
    BadPage(i32),
    #[error("page handle is invalid (stale generation)")]
    InvalidHandle,
    #[error("name too long: {0}")]
    InvalidName(String),
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("too many columns: {0} (max {1})")]
    TooManyColumns(usize, usize),
    #[error("invalid primary key: {0}")]
    InvalidPrimaryKey(String),
    #[error("column too large: {0}")]
    ColumnTooLarge(String),
    #[error("value type does not match declared column type: {0}")]
    TypeMismatch(String),
    #[error("value missing for column without a default: {0}")]
    ValueMissing(String),
    #[error("invalid slot: page {0} slot {1}")]
    InvalidSlot(i32, i32),
    #[error("wrong column count: expected {0}, got {1}")]
    WrongColumnCount(usize, usize),
    #[error("null value given for non-nullable column: {0}")]
    NullNotAllowed(String),
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("primary key already set: {0}")]
    PrimaryKeyExists(String),
    #[error("no primary key set on this table")]
    PrimaryKeyNotExists,
    #[error("not initialized")]
    NotInitialized,
    #[error("key already exists")]
    KeyExists,
    #[error("key not found")]
    KeyNotFound,
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias used throughout the storage engine core.
pub type DbResult<T> = Result<T, DbError>;

/// Runtime configuration for an engine instance.
///
/// Scoped to what this storage core actually configures: where files live,
/// how big the buffer pool is, and how many files may be open at once.
/// There is no network, CLI, or SQL-surface configuration here — those
/// layers sit outside the storage engine core.
///
/// # Example
/// ```
/// use common::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .data_dir("./my_db")
///     .buffer_pool_pages(2048)
///     .build();
/// assert_eq!(config.buffer_pool_pages, 2048);
/// ```
#[derive(Clone, Debug, bon::Builder)]
pub struct EngineConfig {
    /// Directory under which table and index files are created.
    #[builder(into, default = PathBuf::from("./db_data"))]
    pub data_dir: PathBuf,
    /// Number of pages the buffer pool keeps resident at once.
    #[builder(default = NUM_BUFFER_PAGES)]
    pub buffer_pool_pages: usize,
    /// Maximum number of files the file manager may hold open at once.
    #[builder(default = MAX_OPEN_FILES)]
    pub max_open_files: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./db_data"),
            buffer_pool_pages: NUM_BUFFER_PAGES,
            max_open_files: MAX_OPEN_FILES,
        }
    }
}

/// Little-endian byte-cursor helpers for the bit-exact on-disk layouts used
/// throughout this workspace. Every metadata struct and slotted record is
/// serialized by hand with these rather than through a generic codec,
/// because field widths and offsets are fixed exactly.
pub mod layout {
    /// Writes a NUL-terminated, NUL-padded string into `buf[..width]`.
    /// Panics if `s` (plus the terminator) does not fit — callers validate
    /// length limits (table/column name caps) before calling this.
    pub fn write_cstr(buf: &mut [u8], s: &str) {
        let bytes = s.as_bytes();
        assert!(bytes.len() < buf.len(), "string does not fit in field");
        buf.fill(0);
        buf[..bytes.len()].copy_from_slice(bytes);
    }

    /// Reads a NUL-terminated string out of a fixed-width field.
    pub fn read_cstr(buf: &[u8]) -> String {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        String::from_utf8_lossy(&buf[..end]).into_owned()
    }
}
