//! The column value domain for the table store: fixed-width `INT32` and
//! `FLOAT32` scalars plus bounded `VARCHAR` strings.
//!
//! Unlike a general SQL engine's dynamically-typed `Value`, every column
//! here has a declared [`DataType`] up front (table creation fixes it), so
//! [`FieldValue`] never needs a `Null` variant of its own — nullability is
//! tracked separately as `Option<FieldValue>` alongside the column's
//! declared type.

use std::cmp::Ordering;

/// Maximum length of a `VARCHAR` column (`VARCHAR(n<=255)`).
pub const MAX_VARCHAR_LEN: usize = 255;

/// Maximum number of columns a table may declare.
pub const MAX_COLUMNS: usize = 16;

/// Maximum length of a column or table name (64-byte name fields on disk).
pub const MAX_NAME_LEN: usize = 64;

/// The declared type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Int32,
    Float32,
    /// Declared maximum length in bytes, `0..=255`.
    Varchar(u8),
}

impl DataType {
    /// On-disk byte width of a value of this type: INT/FLOAT are 4 bytes,
    /// VARCHAR occupies its declared max-length bytes.
    pub fn width(&self) -> u32 {
        match self {
            DataType::Int32 | DataType::Float32 => 4,
            DataType::Varchar(n) => *n as u32,
        }
    }

    /// The type tag written to the on-disk `ColumnMeta` record
    /// (`0=INT,1=FLOAT,2=VARCHAR`).
    pub fn tag(&self) -> u32 {
        match self {
            DataType::Int32 => 0,
            DataType::Float32 => 1,
            DataType::Varchar(_) => 2,
        }
    }

    pub fn from_tag(tag: u32, size: u32) -> Option<DataType> {
        match tag {
            0 => Some(DataType::Int32),
            1 => Some(DataType::Float32),
            2 => Some(DataType::Varchar(size.min(MAX_VARCHAR_LEN as u32) as u8)),
            _ => None,
        }
    }
}

/// A non-null column value. Nullability is represented separately as
/// `Option<FieldValue>` by callers (the record's null bitmap is the single
/// source of truth for which columns are null).
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Int32(i32),
    Float32(f32),
    Varchar(String),
}

impl FieldValue {
    pub fn data_type(&self) -> DataType {
        match self {
            FieldValue::Int32(_) => DataType::Int32,
            FieldValue::Float32(_) => DataType::Float32,
            FieldValue::Varchar(s) => DataType::Varchar(s.len().min(MAX_VARCHAR_LEN) as u8),
        }
    }

    pub fn as_int32(&self) -> Option<i32> {
        match self {
            FieldValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float32(&self) -> Option<f32> {
        match self {
            FieldValue::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_varchar(&self) -> Option<&str> {
        match self {
            FieldValue::Varchar(s) => Some(s),
            _ => None,
        }
    }

    /// Total ordering within a single type, used by the B+-Tree's `i32` key
    /// comparisons and by table-store primary-key uniqueness checks.
    /// Returns `None` across mismatched types.
    pub fn cmp_same_type(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Int32(a), FieldValue::Int32(b)) => Some(a.cmp(b)),
            (FieldValue::Float32(a), FieldValue::Float32(b)) => a.partial_cmp(b),
            (FieldValue::Varchar(a), FieldValue::Varchar(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// The declaration of one table column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub default: Option<FieldValue>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
            default: None,
        }
    }

    pub fn with_default(mut self, default: FieldValue) -> Self {
        self.default = Some(default);
        self
    }
}
