use super::*;
use buffer::Coordinator;
use tempfile::tempdir;
use types::{ColumnDef, DataType, FieldValue};

fn fresh_coord() -> Rc<RefCell<Coordinator>> {
    Rc::new(RefCell::new(Coordinator::new(64)))
}

fn person_columns() -> Vec<ColumnDef> {
    vec![
        ColumnDef::new("id", DataType::Int32, false),
        ColumnDef::new("name", DataType::Varchar(20), true),
        ColumnDef::new("age", DataType::Int32, true).with_default(FieldValue::Int32(0)),
    ]
}

#[test]
fn insert_and_get_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    let id = table
        .insert(
            &[
                Some(FieldValue::Int32(1)),
                Some(FieldValue::Varchar("Will".into())),
                Some(FieldValue::Int32(27)),
            ],
            0b111,
        )
        .unwrap();

    let row = table.get_all(id).unwrap();
    assert_eq!(
        row,
        vec![
            Some(FieldValue::Int32(1)),
            Some(FieldValue::Varchar("Will".into())),
            Some(FieldValue::Int32(27)),
        ]
    );
}

#[test]
fn absent_columns_fall_back_to_declared_default() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    let id = table
        .insert(&[Some(FieldValue::Int32(1)), None, None], 0b001)
        .unwrap();

    let row = table.get_all(id).unwrap();
    assert_eq!(row[2], Some(FieldValue::Int32(0)));
}

#[test]
fn insert_without_default_for_absent_column_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    let err = table.insert(&[None, None, None], 0b000).unwrap_err();
    assert!(matches!(err, DbError::ValueMissing(_)));
}

#[test]
fn null_in_non_nullable_column_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    let err = table.insert(&[None, None, None], 0b001).unwrap_err();
    assert!(matches!(err, DbError::NullNotAllowed(_)));
}

#[test]
fn update_only_touches_masked_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    let id = table
        .insert(
            &[
                Some(FieldValue::Int32(1)),
                Some(FieldValue::Varchar("Will".into())),
                Some(FieldValue::Int32(27)),
            ],
            0b111,
        )
        .unwrap();

    table
        .update(id, &[None, None, Some(FieldValue::Int32(28))], 0b100)
        .unwrap();

    let row = table.get_all(id).unwrap();
    assert_eq!(row[0], Some(FieldValue::Int32(1)));
    assert_eq!(row[1], Some(FieldValue::Varchar("Will".into())));
    assert_eq!(row[2], Some(FieldValue::Int32(28)));
}

#[test]
fn remove_then_get_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    let id = table
        .insert(&[Some(FieldValue::Int32(1)), None, None], 0b001)
        .unwrap();
    table.remove(id).unwrap();

    let err = table.get_all(id).unwrap_err();
    assert!(matches!(err, DbError::InvalidSlot(_, _)));
}

#[test]
fn remove_twice_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    let id = table
        .insert(&[Some(FieldValue::Int32(1)), None, None], 0b001)
        .unwrap();
    table.remove(id).unwrap();
    let err = table.remove(id).unwrap_err();
    assert!(matches!(err, DbError::InvalidSlot(_, _)));
}

#[test]
fn get_rejects_out_of_range_slot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    let id = table
        .insert(&[Some(FieldValue::Int32(1)), None, None], 0b001)
        .unwrap();
    let bogus = RecordId {
        page: id.page,
        slot: id.slot + 50,
    };

    let err = table.get_all(bogus).unwrap_err();
    assert!(matches!(err, DbError::InvalidSlot(_, _)));
}

/// A freed slot on a page that had been full is recycled by a later insert
/// before any new page is allocated.
#[test]
fn freed_slot_is_recycled_before_growing_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    let mut ids = Vec::new();
    loop {
        let id = table
            .insert(&[Some(FieldValue::Int32(ids.len() as i32)), None, None], 0b001)
            .unwrap();
        let full_now = ids.last().map(|prev: &RecordId| prev.page != id.page).unwrap_or(false);
        ids.push(id);
        if full_now {
            break;
        }
    }

    let pages_before = table.meta.num_used_pages;
    let victim = ids[0];
    table.remove(victim).unwrap();

    let recycled = table
        .insert(&[Some(FieldValue::Int32(-1)), None, None], 0b001)
        .unwrap();
    assert_eq!(recycled.page, victim.page);
    assert_eq!(table.meta.num_used_pages, pages_before);
}

#[test]
fn iterate_visits_every_occupied_slot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    for i in 0..5 {
        table
            .insert(&[Some(FieldValue::Int32(i)), None, None], 0b001)
            .unwrap();
    }

    let mut seen = Vec::new();
    table
        .iterate(|_, row| {
            seen.push(row[0].clone().unwrap());
            true
        })
        .unwrap();
    seen.sort_by_key(|v| v.as_int32().unwrap());
    assert_eq!(
        seen,
        (0..5).map(FieldValue::Int32).collect::<Vec<_>>()
    );
}

#[test]
fn primary_key_rejects_non_int_column() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");

    let err = Table::create(fresh_coord(), &path, "people", person_columns(), Some("name"))
        .err()
        .unwrap();
    assert!(matches!(err, DbError::InvalidPrimaryKey(_)));
}

#[test]
fn set_primary_key_detects_duplicates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let mut table = Table::create(fresh_coord(), &path, "people", person_columns(), None).unwrap();

    table
        .insert(&[Some(FieldValue::Int32(1)), None, None], 0b001)
        .unwrap();
    table
        .insert(&[Some(FieldValue::Int32(1)), None, None], 0b001)
        .unwrap();

    let err = table.set_primary_key("id").unwrap_err();
    assert!(matches!(err, DbError::InvalidPrimaryKey(_)));
}

#[test]
fn close_and_reopen_preserves_rows_and_metadata() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("people.tbl");
    let coord = fresh_coord();
    let mut table =
        Table::create(coord.clone(), &path, "people", person_columns(), Some("id")).unwrap();

    let id = table
        .insert(
            &[
                Some(FieldValue::Int32(9)),
                Some(FieldValue::Varchar("Ada".into())),
                Some(FieldValue::Int32(36)),
            ],
            0b111,
        )
        .unwrap();
    table.close().unwrap();

    let mut reopened = Table::open(coord, &path).unwrap();
    let row = reopened.get_all(id).unwrap();
    assert_eq!(row[0], Some(FieldValue::Int32(9)));
    assert_eq!(row[1], Some(FieldValue::Varchar("Ada".into())));
    assert_eq!(reopened.meta.primary_key_index, 0);
}
