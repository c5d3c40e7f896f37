//! On-disk layout for table and page metadata, and the column/record codec.
//!
//! Every struct here is written and read through explicit little-endian
//! byte-cursor code rather than a generic serializer, because the layout is
//! bit-exact: fixed offsets, fixed widths, and canary values that must
//! survive being read back by a process that only trusts the bytes on disk.

use common::{layout, DbError, DbResult};
use types::{ColumnDef, DataType, FieldValue, MAX_COLUMNS, MAX_NAME_LEN, MAX_VARCHAR_LEN};

pub const TABLE_META_CANARY: u16 = 0xDDBB;
pub const PAGE_META_CANARY: u16 = 0xDBDB;

/// Bits in the page occupation bitmap. `slotsPerPage` is capped at 64
/// (`min(pageSize/slotSize, 64)`), so the occupation bitmap is an 8-byte
/// field wide enough to address every slot on a page.
pub const MAX_SLOT_PER_PAGE: usize = 64;

const MAX_DEFAULT_BYTES: usize = 256;
/// `type_tag(4) + size(4) + nullable(1) + name(64) + has_default(1) + default(256)`
const COLUMN_META_SIZE: usize = 4 + 4 + 1 + MAX_NAME_LEN + 1 + MAX_DEFAULT_BYTES;

const TABLE_NAME_FIELD: usize = MAX_NAME_LEN + 1;

/// Offset of each fixed field within page 0 of a table file.
pub mod table_meta_offset {
    use super::*;

    pub const HEAD_CANARY: usize = 0;
    pub const NAME: usize = HEAD_CANARY + 2;
    pub const COLUMN_COUNT: usize = NAME + TABLE_NAME_FIELD;
    pub const COLUMNS: usize = COLUMN_COUNT + 4;
    pub const NUM_USED_PAGES: usize = COLUMNS + MAX_COLUMNS * COLUMN_META_SIZE;
    pub const FIRST_FREE: usize = NUM_USED_PAGES + 2;
    /// The primary key column index must persist across close/open, so it
    /// is threaded in right before the tail canary.
    pub const PRIMARY_KEY_INDEX: usize = FIRST_FREE + 2;
    pub const TAIL_CANARY: usize = PRIMARY_KEY_INDEX + 4;
    pub const END: usize = TAIL_CANARY + 2;
}

/// Offset of each field within a data page's slot-0 `PageMeta`.
pub mod page_meta_offset {
    pub const HEAD_CANARY: usize = 0;
    pub const OCCUPIED: usize = HEAD_CANARY + 2;
    pub const NEXT_FREE: usize = OCCUPIED + 8;
    pub const TAIL_CANARY: usize = NEXT_FREE + 2;
    pub const SIZE: usize = TAIL_CANARY + 2;
}

/// In-memory table metadata, decoded from / encoded to page 0.
#[derive(Clone, Debug)]
pub struct TableMeta {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub record_size: u32,
    pub num_used_pages: u16,
    pub first_free: u16,
    pub primary_key_index: i32,
}

impl TableMeta {
    pub fn encode(&self, buf: &mut [u8]) {
        use table_meta_offset::*;
        buf[..END].fill(0);
        buf[HEAD_CANARY..HEAD_CANARY + 2].copy_from_slice(&TABLE_META_CANARY.to_le_bytes());
        layout::write_cstr(&mut buf[NAME..NAME + TABLE_NAME_FIELD], &self.name);
        buf[COLUMN_COUNT..COLUMN_COUNT + 4]
            .copy_from_slice(&(self.columns.len() as u32).to_le_bytes());
        for (i, col) in self.columns.iter().enumerate() {
            let start = COLUMNS + i * COLUMN_META_SIZE;
            encode_column_meta(col, &mut buf[start..start + COLUMN_META_SIZE]);
        }
        buf[NUM_USED_PAGES..NUM_USED_PAGES + 2].copy_from_slice(&self.num_used_pages.to_le_bytes());
        buf[FIRST_FREE..FIRST_FREE + 2].copy_from_slice(&self.first_free.to_le_bytes());
        buf[PRIMARY_KEY_INDEX..PRIMARY_KEY_INDEX + 4]
            .copy_from_slice(&self.primary_key_index.to_le_bytes());
        buf[TAIL_CANARY..TAIL_CANARY + 2].copy_from_slice(&TABLE_META_CANARY.to_le_bytes());
    }

    pub fn decode(buf: &[u8]) -> DbResult<TableMeta> {
        use table_meta_offset::*;
        let head = u16::from_le_bytes(buf[HEAD_CANARY..HEAD_CANARY + 2].try_into().unwrap());
        let tail = u16::from_le_bytes(buf[TAIL_CANARY..TAIL_CANARY + 2].try_into().unwrap());
        if head != TABLE_META_CANARY || tail != TABLE_META_CANARY {
            return Err(DbError::ReadFailed);
        }
        let name = layout::read_cstr(&buf[NAME..NAME + TABLE_NAME_FIELD]);
        let num_columns =
            u32::from_le_bytes(buf[COLUMN_COUNT..COLUMN_COUNT + 4].try_into().unwrap()) as usize;
        if num_columns > MAX_COLUMNS {
            return Err(DbError::ReadFailed);
        }
        let mut columns = Vec::with_capacity(num_columns);
        for i in 0..num_columns {
            let start = COLUMNS + i * COLUMN_META_SIZE;
            columns.push(decode_column_meta(&buf[start..start + COLUMN_META_SIZE])?);
        }
        let num_used_pages =
            u16::from_le_bytes(buf[NUM_USED_PAGES..NUM_USED_PAGES + 2].try_into().unwrap());
        let first_free = u16::from_le_bytes(buf[FIRST_FREE..FIRST_FREE + 2].try_into().unwrap());
        let primary_key_index = i32::from_le_bytes(
            buf[PRIMARY_KEY_INDEX..PRIMARY_KEY_INDEX + 4]
                .try_into()
                .unwrap(),
        );
        let record_size = columns.iter().map(|c| c.data_type.width()).sum();
        Ok(TableMeta {
            name,
            columns,
            record_size,
            num_used_pages,
            first_free,
            primary_key_index,
        })
    }
}

fn encode_column_meta(col: &ColumnDef, buf: &mut [u8]) {
    let width = col.data_type.width();
    buf[0..4].copy_from_slice(&col.data_type.tag().to_le_bytes());
    buf[4..8].copy_from_slice(&width.to_le_bytes());
    buf[8] = col.nullable as u8;
    layout::write_cstr(&mut buf[9..9 + MAX_NAME_LEN], &col.name);
    buf[9 + MAX_NAME_LEN] = col.default.is_some() as u8;
    let default_region = &mut buf[10 + MAX_NAME_LEN..10 + MAX_NAME_LEN + MAX_DEFAULT_BYTES];
    if let Some(default) = &col.default {
        encode_field_value(default, width, default_region);
    }
}

fn decode_column_meta(buf: &[u8]) -> DbResult<ColumnDef> {
    let tag = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    let size = u32::from_le_bytes(buf[4..8].try_into().unwrap());
    let nullable = buf[8] != 0;
    let name = layout::read_cstr(&buf[9..9 + MAX_NAME_LEN]);
    let has_default = buf[9 + MAX_NAME_LEN] != 0;
    let data_type = DataType::from_tag(tag, size).ok_or(DbError::ReadFailed)?;
    let default = if has_default {
        let region = &buf[10 + MAX_NAME_LEN..10 + MAX_NAME_LEN + MAX_DEFAULT_BYTES];
        Some(decode_field_value(data_type, &region[..size as usize]))
    } else {
        None
    };
    Ok(ColumnDef {
        name,
        data_type,
        nullable,
        default,
    })
}

/// Encodes a value into exactly `width` bytes: 4-byte LE for INT/FLOAT,
/// NUL-padded bytes (not length-prefixed) for VARCHAR.
pub fn encode_field_value(value: &FieldValue, width: u32, buf: &mut [u8]) {
    let region = &mut buf[..width as usize];
    match value {
        FieldValue::Int32(v) => region.copy_from_slice(&v.to_le_bytes()),
        FieldValue::Float32(v) => region.copy_from_slice(&v.to_le_bytes()),
        FieldValue::Varchar(s) => {
            let bytes = s.as_bytes();
            let n = bytes.len().min(MAX_VARCHAR_LEN).min(region.len());
            region.fill(0);
            region[..n].copy_from_slice(&bytes[..n]);
        }
    }
}

pub fn decode_field_value(data_type: DataType, buf: &[u8]) -> FieldValue {
    match data_type {
        DataType::Int32 => FieldValue::Int32(i32::from_le_bytes(buf[..4].try_into().unwrap())),
        DataType::Float32 => FieldValue::Float32(f32::from_le_bytes(buf[..4].try_into().unwrap())),
        DataType::Varchar(_) => {
            let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
            FieldValue::Varchar(String::from_utf8_lossy(&buf[..end]).into_owned())
        }
    }
}

/// A data page's slot-0 metadata: occupation bitmap and free-list link.
#[derive(Clone, Copy, Debug)]
pub struct PageMeta {
    pub occupied: u64,
    pub next_free: u16,
}

impl PageMeta {
    pub fn encode(&self, buf: &mut [u8]) {
        use page_meta_offset::*;
        buf[HEAD_CANARY..HEAD_CANARY + 2].copy_from_slice(&PAGE_META_CANARY.to_le_bytes());
        buf[OCCUPIED..OCCUPIED + 8].copy_from_slice(&self.occupied.to_le_bytes());
        buf[NEXT_FREE..NEXT_FREE + 2].copy_from_slice(&self.next_free.to_le_bytes());
        buf[TAIL_CANARY..TAIL_CANARY + 2].copy_from_slice(&PAGE_META_CANARY.to_le_bytes());
    }

    pub fn decode(buf: &[u8]) -> DbResult<PageMeta> {
        use page_meta_offset::*;
        let head = u16::from_le_bytes(buf[HEAD_CANARY..HEAD_CANARY + 2].try_into().unwrap());
        let tail = u16::from_le_bytes(buf[TAIL_CANARY..TAIL_CANARY + 2].try_into().unwrap());
        if head != PAGE_META_CANARY || tail != PAGE_META_CANARY {
            return Err(DbError::ReadFailed);
        }
        let occupied = u64::from_le_bytes(buf[OCCUPIED..OCCUPIED + 8].try_into().unwrap());
        let next_free = u16::from_le_bytes(buf[NEXT_FREE..NEXT_FREE + 2].try_into().unwrap());
        Ok(PageMeta { occupied, next_free })
    }

    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupied & (1u64 << slot) != 0
    }

    pub fn set_occupied(&mut self, slot: usize) {
        self.occupied |= 1u64 << slot;
    }

    pub fn clear_occupied(&mut self, slot: usize) {
        self.occupied &= !(1u64 << slot);
    }

    /// First unset bit, i.e. the next slot a `getEmptySlot` scan would hand
    /// out; `None` once every representable slot is taken.
    pub fn first_free_slot(&self) -> Option<usize> {
        let idx = (!self.occupied).trailing_zeros() as usize;
        (idx < MAX_SLOT_PER_PAGE).then_some(idx)
    }
}
