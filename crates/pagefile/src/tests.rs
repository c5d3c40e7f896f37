use super::*;
use common::DbError;
use tempfile::tempdir;

#[test]
fn create_then_open_round_trips_a_page() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut fm = FileManager::new();
    fm.create_file(&path).unwrap();
    let fd = fm.open_file(&path).unwrap();

    let page = [7u8; PAGE_SIZE];
    fm.write_page(fd, 0, &page).unwrap();

    let mut back = [0u8; PAGE_SIZE];
    fm.read_page(fd, 0, &mut back, false).unwrap();
    assert_eq!(back, page);
}

#[test]
fn create_fails_if_file_exists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let fm = FileManager::new();
    fm.create_file(&path).unwrap();
    assert!(matches!(fm.create_file(&path), Err(DbError::FileExists)));
}

#[test]
fn open_nonexistent_file_fails() {
    let dir = tempdir().unwrap();
    let mut fm = FileManager::new();
    assert!(matches!(
        fm.open_file(dir.path().join("missing.db")),
        Err(DbError::OpenFailed)
    ));
}

#[test]
fn close_frees_the_slot_for_reuse() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut fm = FileManager::new();
    fm.create_file(&path).unwrap();
    let fd = fm.open_file(&path).unwrap();
    fm.close_file(fd).unwrap();
    assert!(!fm.validate(fd));

    let fd2 = fm.open_file(&path).unwrap();
    assert_eq!(fd2, fd, "freed slot should be the lowest free bit again");
}

#[test]
fn operations_on_closed_descriptor_fail() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut fm = FileManager::new();
    fm.create_file(&path).unwrap();
    let fd = fm.open_file(&path).unwrap();
    fm.close_file(fd).unwrap();

    assert!(matches!(fm.close_file(fd), Err(DbError::BadDescriptor)));
    let mut buf = [0u8; PAGE_SIZE];
    assert!(matches!(
        fm.read_page(fd, 0, &mut buf, false),
        Err(DbError::BadDescriptor)
    ));
}

#[test]
fn allocator_exhausts_after_max_open_files() {
    let dir = tempdir().unwrap();
    let mut fm = FileManager::new();
    let mut fds = Vec::new();
    for i in 0..MAX_OPEN_FILES {
        let path = dir.path().join(format!("t{i}.db"));
        fm.create_file(&path).unwrap();
        fds.push(fm.open_file(&path).unwrap());
    }
    let overflow_path = dir.path().join("overflow.db");
    fm.create_file(&overflow_path).unwrap();
    assert!(matches!(
        fm.open_file(&overflow_path),
        Err(DbError::TooManyOpen)
    ));
}

#[test]
fn negative_page_number_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut fm = FileManager::new();
    fm.create_file(&path).unwrap();
    let fd = fm.open_file(&path).unwrap();

    let page = [0u8; PAGE_SIZE];
    assert!(matches!(
        fm.write_page(fd, -1, &page),
        Err(DbError::BadPage(-1))
    ));
    let mut buf = [0u8; PAGE_SIZE];
    assert!(matches!(
        fm.read_page(fd, -1, &mut buf, false),
        Err(DbError::BadPage(-1))
    ));
}

#[test]
fn may_fail_read_past_eof_is_silent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let mut fm = FileManager::new();
    fm.create_file(&path).unwrap();
    let fd = fm.open_file(&path).unwrap();

    let mut buf = [0xAAu8; PAGE_SIZE];
    fm.read_page(fd, 3, &mut buf, true).unwrap();

    let mut buf2 = [0xAAu8; PAGE_SIZE];
    assert!(matches!(
        fm.read_page(fd, 3, &mut buf2, false),
        Err(DbError::ReadFailed)
    ));
}

#[test]
fn delete_file_unlinks_from_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.db");
    let fm = FileManager::new();
    fm.create_file(&path).unwrap();
    assert!(path.exists());
    fm.delete_file(&path).unwrap();
    assert!(!path.exists());
}
