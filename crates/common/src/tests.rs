use super::*;
use std::io;

#[test]
fn config_defaults_are_sane() {
    let cfg = EngineConfig::default();
    assert_eq!(cfg.buffer_pool_pages, NUM_BUFFER_PAGES);
    assert_eq!(cfg.max_open_files, MAX_OPEN_FILES);
}

#[test]
fn config_builder_overrides_defaults() {
    let cfg = EngineConfig::builder()
        .data_dir("./somewhere")
        .buffer_pool_pages(8)
        .build();
    assert_eq!(cfg.data_dir, PathBuf::from("./somewhere"));
    assert_eq!(cfg.buffer_pool_pages, 8);
    assert_eq!(cfg.max_open_files, MAX_OPEN_FILES);
}

#[test]
fn db_error_formats_cleanly() {
    let err = DbError::InvalidSlot(1, 2);
    assert!(format!("{err}").contains("slot"));
}

#[test]
fn io_error_converts() {
    let e = io::Error::other("oops");
    let db_err: DbError = e.into();
    assert!(matches!(db_err, DbError::Io(_)));
}

#[test]
fn record_id_ordering_is_lexicographic() {
    let a = RecordId { page: 1, slot: 5 };
    let b = RecordId { page: 1, slot: 6 };
    let c = RecordId { page: 2, slot: 0 };
    assert!(a < b);
    assert!(b < c);
    assert!(RecordId::NULL.is_null());
}

#[test]
fn cstr_round_trips() {
    let mut buf = [0u8; 16];
    layout::write_cstr(&mut buf, "hello");
    assert_eq!(layout::read_cstr(&buf), "hello");
}
