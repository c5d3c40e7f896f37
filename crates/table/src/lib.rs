//! The table store: fixed-width records laid out in slotted pages, on top
//! of the page cache and coordinator.
//!
//! Slot 0 of every data page holds that page's [`meta::PageMeta`] (an
//! occupation bitmap plus a free-list link); slots `1..slotsPerPage` hold
//! records. Page 0 of the file holds [`meta::TableMeta`]. A table never
//! reaches for a global singleton — it is handed a `Rc<RefCell<Coordinator>>`
//! at construction, so tests can stand up isolated engines freely.
//!
//! # Example
//!
//! ```no_run
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use buffer::Coordinator;
//! use table::Table;
//! use types::{ColumnDef, DataType, FieldValue};
//!
//! let coord = Rc::new(RefCell::new(Coordinator::new(1024)));
//! let columns = vec![ColumnDef::new("id", DataType::Int32, false)];
//! let mut t = Table::create(coord, "/tmp/demo.tbl", "demo", columns, None).unwrap();
//! let id = t.insert(&[Some(FieldValue::Int32(1))], 0b1).unwrap();
//! assert_eq!(t.get_all(id).unwrap(), vec![Some(FieldValue::Int32(1))]);
//! ```

pub mod meta;
mod record;

#[cfg(test)]
mod tests;

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use buffer::Coordinator;
use common::{DbError, DbResult, PAGE_SIZE, RecordId};
use meta::{PageMeta, TableMeta, page_meta_offset};
use types::{ColumnDef, DataType, FieldValue, MAX_COLUMNS, MAX_NAME_LEN, MAX_VARCHAR_LEN};

fn matches_declared_type(data_type: &DataType, value: &FieldValue) -> bool {
    matches!(
        (data_type, value),
        (DataType::Int32, FieldValue::Int32(_))
            | (DataType::Float32, FieldValue::Float32(_))
            | (DataType::Varchar(_), FieldValue::Varchar(_))
    )
}

/// A table's rows, backed by one file through a shared coordinator.
pub struct Table {
    coord: Rc<RefCell<Coordinator>>,
    fd: common::FileDescriptor,
    meta: TableMeta,
    slot_size: usize,
    slots_per_page: usize,
}

impl Table {
    /// Creates a new table file and writes its metadata page.
    ///
    /// Validates column count, name uniqueness, `VARCHAR` bounds, the
    /// primary key's type and nullability, and that one record fits in a
    /// page.
    pub fn create(
        coord: Rc<RefCell<Coordinator>>,
        path: impl AsRef<Path>,
        name: &str,
        mut columns: Vec<ColumnDef>,
        primary_key: Option<&str>,
    ) -> DbResult<Table> {
        if columns.len() > MAX_COLUMNS {
            return Err(DbError::TooManyColumns(columns.len(), MAX_COLUMNS));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(DbError::InvalidName(name.to_string()));
        }

        let mut seen = HashSet::new();
        for col in &columns {
            if col.name.len() > MAX_NAME_LEN {
                return Err(DbError::InvalidName(col.name.clone()));
            }
            if let DataType::Varchar(n) = col.data_type
                && n as usize > MAX_VARCHAR_LEN
            {
                return Err(DbError::ColumnTooLarge(col.name.clone()));
            }
            if !seen.insert(col.name.clone()) {
                return Err(DbError::DuplicateColumn(col.name.clone()));
            }
        }

        let mut primary_key_index = -1i32;
        if let Some(pk_name) = primary_key {
            let idx = columns
                .iter()
                .position(|c| c.name == pk_name)
                .ok_or_else(|| DbError::InvalidPrimaryKey("field not exists".into()))?;
            if columns[idx].data_type != DataType::Int32 {
                return Err(DbError::InvalidPrimaryKey(
                    "VARCHAR or FLOAT is not supported for primary key".into(),
                ));
            }
            columns[idx].nullable = false;
            primary_key_index = idx as i32;
        }

        let record_size: u32 = columns.iter().map(|c| c.data_type.width()).sum();
        let slot_size = page_meta_offset::SIZE + record::record_width(&columns);
        if slot_size > PAGE_SIZE {
            return Err(DbError::ColumnTooLarge(format!(
                "record for table {name} does not fit in a page"
            )));
        }

        let meta = TableMeta {
            name: name.to_string(),
            columns,
            record_size,
            num_used_pages: 1,
            first_free: 1,
            primary_key_index,
        };

        let fd = {
            let mut c = coord.borrow_mut();
            c.create_file(&path)?;
            c.open_file(&path)?
        };

        let mut table = Table {
            coord,
            fd,
            slots_per_page: (PAGE_SIZE / slot_size).min(meta::MAX_SLOT_PER_PAGE),
            slot_size,
            meta,
        };
        table.flush_meta()?;
        Ok(table)
    }

    /// Opens an existing table file, validating its metadata canaries.
    pub fn open(coord: Rc<RefCell<Coordinator>>, path: impl AsRef<Path>) -> DbResult<Table> {
        let fd = coord.borrow_mut().open_file(&path)?;
        let meta = {
            let mut c = coord.borrow_mut();
            let mut handle = c.get_handle(fd, 0)?;
            TableMeta::decode(c.load(&mut handle)?)?
        };
        let slot_size = page_meta_offset::SIZE + record::record_width(&meta.columns);
        Ok(Table {
            coord,
            fd,
            slots_per_page: (PAGE_SIZE / slot_size).min(meta::MAX_SLOT_PER_PAGE),
            slot_size,
            meta,
        })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.meta.columns.iter().position(|c| c.name == name)
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.meta.columns
    }

    /// A mask with every declared column's bit set, for callers that want
    /// the full row.
    pub fn all_columns_mask(&self) -> u32 {
        if self.meta.columns.len() >= 32 {
            u32::MAX
        } else {
            (1u32 << self.meta.columns.len()) - 1
        }
    }

    /// Inserts a row. `present_mask` bit `i` set means `values[i]` supplies
    /// column `i`; unset bits fall back to that column's declared default,
    /// failing [`DbError::ValueMissing`] if it has none.
    pub fn insert(&mut self, values: &[Option<FieldValue>], present_mask: u32) -> DbResult<RecordId> {
        let present = self.check_values(values, present_mask, false)?;
        let id = self.get_empty_slot()?;

        let resolved: Vec<Option<FieldValue>> = self
            .meta
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                if present[i] {
                    values[i].clone()
                } else {
                    col.default.clone()
                }
            })
            .collect();
        let present_all = vec![true; self.meta.columns.len()];

        let mut c = self.coord.borrow_mut();
        let mut handle = c.get_handle(self.fd, id.page)?;
        c.mark_dirty(&handle)?;
        let buf = c.load_mut(&mut handle)?;
        let offset = id.slot as usize * self.slot_size;
        record::encode_record(
            &self.meta.columns,
            &resolved,
            &present_all,
            &mut buf[offset..offset + self.slot_size],
        );
        Ok(id)
    }

    /// Overwrites only the columns named by `present_mask`; others are left
    /// untouched.
    pub fn update(
        &mut self,
        id: RecordId,
        values: &[Option<FieldValue>],
        present_mask: u32,
    ) -> DbResult<()> {
        self.validate_slot(id)?;
        let present = self.check_values(values, present_mask, true)?;

        let mut c = self.coord.borrow_mut();
        let mut handle = c.get_handle(self.fd, id.page)?;
        let page_meta = PageMeta::decode(c.load(&mut handle)?)?;
        if !page_meta.is_occupied(id.slot as usize) {
            return Err(DbError::InvalidSlot(id.page, id.slot));
        }
        c.mark_dirty(&handle)?;
        let buf = c.load_mut(&mut handle)?;
        let offset = id.slot as usize * self.slot_size;
        record::encode_record(
            &self.meta.columns,
            values,
            &present,
            &mut buf[offset..offset + self.slot_size],
        );
        Ok(())
    }

    /// Clears the slot's occupied bit. If the page was previously full, it
    /// is prepended to the table's free-page list.
    pub fn remove(&mut self, id: RecordId) -> DbResult<()> {
        self.validate_slot(id)?;

        let mut c = self.coord.borrow_mut();
        let mut handle = c.get_handle(self.fd, id.page)?;
        let mut page_meta = PageMeta::decode(c.load(&mut handle)?)?;
        if !page_meta.is_occupied(id.slot as usize) {
            return Err(DbError::InvalidSlot(id.page, id.slot));
        }

        let was_full = self.page_is_full(&page_meta);
        page_meta.clear_occupied(id.slot as usize);
        if was_full {
            page_meta.next_free = self.meta.first_free;
            self.meta.first_free = id.page as u16;
        }

        c.mark_dirty(&handle)?;
        page_meta.encode(c.load_mut(&mut handle)?);
        Ok(())
    }

    /// Reads the columns named by `mask`. Fails [`DbError::InvalidSlot`] if
    /// the slot is out of range or unoccupied.
    pub fn get(&mut self, id: RecordId, mask: u32) -> DbResult<Vec<Option<FieldValue>>> {
        self.validate_slot(id)?;
        let mut c = self.coord.borrow_mut();
        let mut handle = c.get_handle(self.fd, id.page)?;
        let buf = c.load(&mut handle)?;
        let page_meta = PageMeta::decode(buf)?;
        if !page_meta.is_occupied(id.slot as usize) {
            return Err(DbError::InvalidSlot(id.page, id.slot));
        }
        let offset = id.slot as usize * self.slot_size;
        Ok(record::decode_record(
            &self.meta.columns,
            &buf[offset..offset + self.slot_size],
            mask,
        ))
    }

    pub fn get_all(&mut self, id: RecordId) -> DbResult<Vec<Option<FieldValue>>> {
        let mask = self.all_columns_mask();
        self.get(id, mask)
    }

    /// Scans every occupied slot in page order, invoking `callback(id,
    /// row)`. Stops early if `callback` returns `false`.
    pub fn iterate<F>(&mut self, mut callback: F) -> DbResult<()>
    where
        F: FnMut(RecordId, Vec<Option<FieldValue>>) -> bool,
    {
        let mask = self.all_columns_mask();
        for page in 1..self.meta.num_used_pages as i32 {
            let page_meta = {
                let mut c = self.coord.borrow_mut();
                let mut handle = c.get_handle(self.fd, page)?;
                PageMeta::decode(c.load(&mut handle)?)?
            };
            for slot in 1..self.slots_per_page {
                if !page_meta.is_occupied(slot) {
                    continue;
                }
                let id = RecordId {
                    page,
                    slot: slot as i32,
                };
                let row = self.get(id, mask)?;
                if !callback(id, row) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Designates `field` as the primary key, scanning the full table to
    /// check uniqueness.
    pub fn set_primary_key(&mut self, field: &str) -> DbResult<()> {
        if self.meta.primary_key_index != -1 {
            let name = self.meta.columns[self.meta.primary_key_index as usize]
                .name
                .clone();
            return Err(DbError::PrimaryKeyExists(name));
        }
        let idx = self
            .column_index(field)
            .ok_or_else(|| DbError::ColumnNotFound(field.to_string()))?;
        if self.meta.columns[idx].data_type != DataType::Int32 {
            return Err(DbError::InvalidPrimaryKey(
                "VARCHAR or FLOAT is not supported for primary key".into(),
            ));
        }
        if self.meta.columns[idx].nullable {
            return Err(DbError::InvalidPrimaryKey(
                "nullable column is not supported for primary key".into(),
            ));
        }

        let mut seen = HashSet::new();
        let mut duplicate = false;
        self.iterate(|_, row| {
            if let Some(FieldValue::Int32(v)) = row[idx] {
                if !seen.insert(v) {
                    duplicate = true;
                    return false;
                }
            }
            true
        })?;
        if duplicate {
            return Err(DbError::InvalidPrimaryKey(
                "primary key has duplicated values".into(),
            ));
        }

        self.meta.primary_key_index = idx as i32;
        Ok(())
    }

    pub fn drop_primary_key(&mut self) -> DbResult<()> {
        if self.meta.primary_key_index == -1 {
            return Err(DbError::PrimaryKeyNotExists);
        }
        self.meta.primary_key_index = -1;
        Ok(())
    }

    /// Flushes the metadata page and closes the underlying file.
    pub fn close(mut self) -> DbResult<()> {
        self.flush_meta()?;
        self.coord.borrow_mut().close_file(self.fd)
    }

    fn flush_meta(&mut self) -> DbResult<()> {
        let mut c = self.coord.borrow_mut();
        let mut handle = c.get_handle(self.fd, 0)?;
        c.mark_dirty(&handle)?;
        self.meta.encode(c.load_mut(&mut handle)?);
        Ok(())
    }

    fn validate_slot(&self, id: RecordId) -> DbResult<()> {
        let valid = id.page >= 1
            && (id.page as u32) < self.meta.num_used_pages as u32
            && id.slot >= 1
            && (id.slot as usize) < self.slots_per_page;
        if valid {
            Ok(())
        } else {
            Err(DbError::InvalidSlot(id.page, id.slot))
        }
    }

    fn page_is_full(&self, page_meta: &PageMeta) -> bool {
        match page_meta.first_free_slot() {
            None => true,
            Some(idx) => idx >= self.slots_per_page,
        }
    }

    /// Validates `present_mask` against nullability/defaults and returns the
    /// per-column present flags. `is_update` relaxes the "must have a
    /// default" rule for absent columns, since an update simply leaves them
    /// untouched.
    fn check_values(
        &self,
        values: &[Option<FieldValue>],
        present_mask: u32,
        is_update: bool,
    ) -> DbResult<Vec<bool>> {
        if values.len() != self.meta.columns.len() {
            return Err(DbError::WrongColumnCount(
                self.meta.columns.len(),
                values.len(),
            ));
        }
        let mut present = Vec::with_capacity(self.meta.columns.len());
        for (i, col) in self.meta.columns.iter().enumerate() {
            let is_present = present_mask & (1u32 << i) != 0;
            if is_present {
                match &values[i] {
                    None if !col.nullable => {
                        return Err(DbError::NullNotAllowed(col.name.clone()));
                    }
                    Some(v) if !matches_declared_type(&col.data_type, v) => {
                        return Err(DbError::TypeMismatch(col.name.clone()));
                    }
                    _ => {}
                }
            } else if !is_update && col.default.is_none() && !col.nullable {
                return Err(DbError::ValueMissing(col.name.clone()));
            }
            present.push(is_present);
        }
        Ok(present)
    }

    /// Allocates a slot, extending the file with a fresh page when every
    /// existing page is full.
    fn get_empty_slot(&mut self) -> DbResult<RecordId> {
        if self.meta.num_used_pages == self.meta.first_free {
            let page = self.meta.first_free as i32;
            let mut page_meta = PageMeta {
                occupied: 0,
                next_free: self.meta.first_free + 1,
            };
            page_meta.set_occupied(0);
            page_meta.set_occupied(1);

            let mut c = self.coord.borrow_mut();
            let mut handle = c.get_handle(self.fd, page)?;
            c.mark_dirty(&handle)?;
            page_meta.encode(c.load_mut(&mut handle)?);
            drop(c);

            self.meta.num_used_pages += 1;
            Ok(RecordId { page, slot: 1 })
        } else {
            let page = self.meta.first_free as i32;
            let mut c = self.coord.borrow_mut();
            let mut handle = c.get_handle(self.fd, page)?;
            let mut page_meta = PageMeta::decode(c.load(&mut handle)?)?;
            let slot = page_meta
                .first_free_slot()
                .filter(|&s| s < self.slots_per_page)
                .ok_or(DbError::ReadFailed)?;
            page_meta.set_occupied(slot);

            if self.page_is_full(&page_meta) {
                self.meta.first_free = page_meta.next_free;
            }

            c.mark_dirty(&handle)?;
            page_meta.encode(c.load_mut(&mut handle)?);
            Ok(RecordId {
                page,
                slot: slot as i32,
            })
        }
    }
}
