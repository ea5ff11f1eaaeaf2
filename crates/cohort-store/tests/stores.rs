//! Contract tests shared by both store implementations.

use chrono::NaiveDate;
use polars::df;
use polars::prelude::{DataFrame, DataType};
use tempfile::tempdir;

use cohort_model::{Identity, PeriodId, PeriodLabel, SliceId};
use cohort_store::{CsvStore, InMemoryStore, MemoizedStore, StoreError, TableKind};

fn slice_identity() -> Identity {
    SliceId::new(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()).into()
}

fn period_identity(month: u32) -> Identity {
    PeriodId::new(
        SliceId::new(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()),
        PeriodLabel::month(2016, month).unwrap(),
    )
    .into()
}

fn snapshot() -> DataFrame {
    df!(
        "ppsn" => ["A", "B", "C"],
        "date_of_birth" => [Some("1970-01-01"), None, Some("1990-05-05")],
        "weeks" => [10i64, 20, 30],
        "age_eligible" => [true, false, true]
    )
    .unwrap()
}

fn exercise_contract(store: &mut dyn MemoizedStore) {
    let slice = slice_identity();

    let miss = store.read(TableKind::PopulationSlice, &slice).unwrap_err();
    assert!(miss.is_cache_miss());
    assert!(!store.exists(TableKind::PopulationSlice, &slice).unwrap());

    store
        .write(TableKind::PopulationSlice, &slice, &snapshot())
        .unwrap();
    assert!(store.exists(TableKind::PopulationSlice, &slice).unwrap());
    let read = store.read(TableKind::PopulationSlice, &slice).unwrap();
    assert!(read.equals_missing(&snapshot()));
    assert_eq!(read.column("age_eligible").unwrap().dtype(), &DataType::Boolean);

    // Same kind, other identity: still a miss.
    let other = SliceId::new(NaiveDate::from_ymd_opt(2016, 4, 1).unwrap()).into();
    let err = store.read(TableKind::PopulationSlice, &other).unwrap_err();
    assert!(matches!(err, StoreError::IdentityDataNotFound { .. }));

    // Writing again replaces rather than appends.
    let smaller = snapshot().head(Some(1));
    store
        .write(TableKind::PopulationSlice, &slice, &smaller)
        .unwrap();
    assert_eq!(store.read(TableKind::PopulationSlice, &slice).unwrap().height(), 1);

    // Sibling periods are independent entries.
    store
        .write(TableKind::TreatmentPeriod, &period_identity(2), &snapshot())
        .unwrap();
    assert!(!store.exists(TableKind::TreatmentPeriod, &period_identity(3)).unwrap());
    assert_eq!(
        store
            .read(TableKind::TreatmentPeriod, &period_identity(2))
            .unwrap()
            .height(),
        3
    );
}

#[test]
fn in_memory_store_honours_the_contract() {
    let mut store = InMemoryStore::new();
    exercise_contract(&mut store);
    assert_eq!(store.writes(), 3);
    assert_eq!(store.keys(TableKind::PopulationSlice).len(), 1);
}

#[test]
fn csv_store_honours_the_contract() {
    let dir = tempdir().unwrap();
    let mut store = CsvStore::open(dir.path().join("store")).unwrap();
    exercise_contract(&mut store);
}

#[test]
fn missing_kind_is_table_not_found() {
    let store = InMemoryStore::new();
    let err = store
        .read(TableKind::TreatmentPeriod, &period_identity(2))
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::TableNotFound {
            kind: TableKind::TreatmentPeriod
        }
    ));
}

#[test]
fn csv_store_files_carry_the_identity_columns() {
    let dir = tempdir().unwrap();
    let mut store = CsvStore::open(dir.path()).unwrap();
    let identity = period_identity(2);
    store
        .write(TableKind::TreatmentPeriod, &identity, &snapshot())
        .unwrap();

    let (data_path, manifest_path) = store.paths(TableKind::TreatmentPeriod, &identity);
    let contents = std::fs::read_to_string(&data_path).unwrap();
    let header = contents.lines().next().unwrap();
    assert!(header.contains("key_period"));
    assert!(header.contains("key_slice_date"));
    assert!(contents.contains("2016-02"));
    assert!(manifest_path.is_file());
    assert!(data_path.parent().unwrap().ends_with("treatment_period"));
}

#[test]
fn csv_store_keeps_empty_snapshots_typed() {
    let dir = tempdir().unwrap();
    let mut store = CsvStore::open(dir.path()).unwrap();
    let empty = snapshot().head(Some(0));

    store
        .write(TableKind::PopulationSlice, &slice_identity(), &empty)
        .unwrap();
    let read = store
        .read(TableKind::PopulationSlice, &slice_identity())
        .unwrap();

    assert_eq!(read.height(), 0);
    assert_eq!(read.column("age_eligible").unwrap().dtype(), &DataType::Boolean);
    assert_eq!(read.column("weeks").unwrap().dtype(), &DataType::Int64);
}

fn exercise_key_prefixed_columns(store: &mut dyn MemoizedStore) {
    let slice = slice_identity();
    let data = df!(
        "ppsn" => ["A", "B"],
        "key_worker" => ["W1", "W2"],
        "date" => ["2016-01-04", "2016-01-05"]
    )
    .unwrap();

    store
        .write(TableKind::PopulationSlice, &slice, &data)
        .unwrap();
    let read = store.read(TableKind::PopulationSlice, &slice).unwrap();
    assert!(read.equals_missing(&data));

    // `key_date` is where a slice identity keeps its anchor date.
    let colliding = df!("ppsn" => ["A"], "key_date" => ["mine"]).unwrap();
    let err = store
        .write(TableKind::PopulationSlice, &slice, &colliding)
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::ReservedColumn { ref column } if column == "key_date"
    ));
    // The rejected write leaves the earlier snapshot in place.
    assert!(
        store
            .read(TableKind::PopulationSlice, &slice)
            .unwrap()
            .equals_missing(&data)
    );
}

#[test]
fn in_memory_store_keeps_key_prefixed_data_columns() {
    exercise_key_prefixed_columns(&mut InMemoryStore::new());
}

#[test]
fn csv_store_keeps_key_prefixed_data_columns() {
    let dir = tempdir().unwrap();
    exercise_key_prefixed_columns(&mut CsvStore::open(dir.path()).unwrap());
}

#[test]
fn csv_store_hides_an_interrupted_write() {
    let dir = tempdir().unwrap();
    let mut store = CsvStore::open(dir.path()).unwrap();
    let identity = period_identity(2);
    store
        .write(TableKind::TreatmentPeriod, &identity, &snapshot())
        .unwrap();
    let (data_path, manifest_path) = store.paths(TableKind::TreatmentPeriod, &identity);

    // A write stopped after the rows were replaced but before the manifest
    // was renamed into place, with a temp file left behind.
    std::fs::remove_file(&manifest_path).unwrap();
    let mut stale = data_path.as_os_str().to_owned();
    stale.push(".tmp");
    std::fs::write(&stale, "ppsn\npartial\n").unwrap();

    let err = store.read(TableKind::TreatmentPeriod, &identity).unwrap_err();
    assert!(err.is_cache_miss());
    assert!(!store.exists(TableKind::TreatmentPeriod, &identity).unwrap());

    // Retrying the write restores a readable snapshot.
    store
        .write(TableKind::TreatmentPeriod, &identity, &snapshot())
        .unwrap();
    assert!(store.exists(TableKind::TreatmentPeriod, &identity).unwrap());
    let read = store.read(TableKind::TreatmentPeriod, &identity).unwrap();
    assert!(read.equals_missing(&snapshot()));
    assert!(!std::path::Path::new(&stale).exists());
}

#[test]
fn csv_store_without_rows_file_is_a_miss() {
    let dir = tempdir().unwrap();
    let mut store = CsvStore::open(dir.path()).unwrap();
    let slice = slice_identity();
    store
        .write(TableKind::PopulationSlice, &slice, &snapshot())
        .unwrap();
    let (data_path, _) = store.paths(TableKind::PopulationSlice, &slice);
    std::fs::remove_file(&data_path).unwrap();

    let err = store.read(TableKind::PopulationSlice, &slice).unwrap_err();
    assert!(matches!(err, StoreError::IdentityDataNotFound { .. }));
    assert!(!store.exists(TableKind::PopulationSlice, &slice).unwrap());
}

#[test]
fn zero_row_snapshots_are_hits() {
    let mut store = InMemoryStore::new();
    let slice = slice_identity();
    store
        .write(TableKind::PopulationSlice, &slice, &snapshot().head(Some(0)))
        .unwrap();
    let read = store.read(TableKind::PopulationSlice, &slice).unwrap();
    assert_eq!(read.height(), 0);
    assert_eq!(read.width(), snapshot().width());
}
