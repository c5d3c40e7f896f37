//! Record codec: a 16-bit null bitmap followed by each column's fixed-width
//! encoding, in declared column order.

use crate::meta::{decode_field_value, encode_field_value};
use types::{ColumnDef, FieldValue};

/// Byte width of a full record slot body (excluding the page-meta header
/// that prefixes slot 0 of each page).
pub fn record_width(columns: &[ColumnDef]) -> usize {
    2 + columns
        .iter()
        .map(|c| c.data_type.width() as usize)
        .sum::<usize>()
}

/// Writes `values[i]` into `buf` for every column where `present[i]` is
/// true; columns with `present[i] == false` are left untouched, including
/// their null-bitmap bit — this is what lets `update` overwrite only the
/// columns named by its bitmap.
pub fn encode_record(
    columns: &[ColumnDef],
    values: &[Option<FieldValue>],
    present: &[bool],
    buf: &mut [u8],
) {
    let mut null_bitmap = u16::from_le_bytes(buf[0..2].try_into().unwrap());
    let mut offset = 2;
    for (i, col) in columns.iter().enumerate() {
        let width = col.data_type.width() as usize;
        if present[i] {
            match &values[i] {
                None => null_bitmap |= 1u16 << i,
                Some(v) => {
                    null_bitmap &= !(1u16 << i);
                    encode_field_value(v, width as u32, &mut buf[offset..offset + width]);
                }
            }
        }
        offset += width;
    }
    buf[0..2].copy_from_slice(&null_bitmap.to_le_bytes());
}

/// Decodes every column named by `mask` (bit i set ⇒ decode column i).
pub fn decode_record(columns: &[ColumnDef], buf: &[u8], mask: u32) -> Vec<Option<FieldValue>> {
    let null_bitmap = u16::from_le_bytes(buf[0..2].try_into().unwrap());
    let mut offset = 2;
    let mut out = Vec::new();
    for (i, col) in columns.iter().enumerate() {
        let width = col.data_type.width() as usize;
        if mask & (1u32 << i) != 0 {
            if null_bitmap & (1u16 << i) != 0 {
                out.push(None);
            } else {
                out.push(Some(decode_field_value(col.data_type, &buf[offset..offset + width])));
            }
        }
        offset += width;
    }
    out
}
