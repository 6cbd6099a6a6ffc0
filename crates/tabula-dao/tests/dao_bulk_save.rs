mod common;

use std::sync::Arc;

use common::{at, Call, RecordingGrid};
use pretty_assertions::assert_eq;
use tabula_dao::{Dao, DaoConfig, DaoError, GridSequence, ProcessLock};
use tabula_model::{CellValue, Record, TableSchema};

fn schema() -> TableSchema {
    TableSchema::builder(["key", "name", "qty"])
        .with_header()
        .build()
        .unwrap()
}

fn dao_over(grid: &Arc<RecordingGrid>, config: DaoConfig) -> Dao {
    Dao::new(grid.clone(), Arc::new(ProcessLock::new()), schema(), config).unwrap()
}

fn record(key: &str, name: &str, qty: i64) -> Record {
    Record::new()
        .with_field("key", key)
        .with_field("name", name)
        .with_field("qty", qty)
}

/// Seed `keys` as rows 2.. in order.
fn seed(dao: &Dao, keys: &[&str]) {
    let records: Vec<Record> = keys.iter().map(|k| record(k, "seed", 0)).collect();
    dao.bulk_save(&records).unwrap();
}

#[test]
fn contiguous_updates_plus_inserts_produce_two_block_writes() {
    let grid = RecordingGrid::shared();
    let dao = dao_over(&grid, DaoConfig::new());
    seed(&dao, &["k1", "k2", "k3"]);

    grid.reset_calls();
    dao.bulk_save(&[
        record("k1", "updated", 1),
        record("k2", "updated", 2),
        record("k3", "updated", 3),
        record("k10", "new", 10),
        record("k11", "new", 11),
    ])
    .unwrap();

    // One range write covers the contiguous update run (rows 2..4), one the
    // appended inserts (rows 5..6).
    assert_eq!(grid.write_ranges(), vec!["A2:C4".to_string(), "A5:C6".to_string()]);
    assert_eq!(grid.flush_count(), 1);

    let all = dao.find_all().unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].get("name"), &CellValue::Text("updated".into()));
    assert_eq!(all[3].get("key"), &CellValue::Text("k10".into()));
    assert_eq!(all[4].get("key"), &CellValue::Text("k11".into()));
}

#[test]
fn non_contiguous_updates_split_into_runs() {
    let grid = RecordingGrid::shared();
    let dao = dao_over(&grid, DaoConfig::new());
    seed(&dao, &["k1", "k2", "k3", "k4", "k5"]);

    grid.reset_calls();
    // Rows 2, 3 and 5, 6; the gap at row 4 splits the batch in two.
    dao.bulk_save(&[
        record("k4", "updated", 4),
        record("k1", "updated", 1),
        record("k2", "updated", 2),
        record("k5", "updated", 5),
    ])
    .unwrap();

    assert_eq!(grid.write_ranges(), vec!["A2:C3".to_string(), "A5:C6".to_string()]);
}

#[test]
fn update_order_follows_rows_not_input() {
    let grid = RecordingGrid::shared();
    let dao = dao_over(&grid, DaoConfig::new());
    seed(&dao, &["k1", "k2", "k3"]);

    // Input order reversed; still one contiguous run in row order.
    grid.reset_calls();
    dao.bulk_save(&[
        record("k3", "c", 3),
        record("k1", "a", 1),
        record("k2", "b", 2),
    ])
    .unwrap();

    assert_eq!(grid.write_ranges(), vec!["A2:C4".to_string()]);
    let all = dao.find_all().unwrap();
    assert_eq!(all[0].get("name"), &CellValue::Text("a".into()));
    assert_eq!(all[2].get("name"), &CellValue::Text("c".into()));
}

#[test]
fn inserts_preserve_input_order() {
    let grid = RecordingGrid::shared();
    let dao = dao_over(&grid, DaoConfig::new());

    dao.bulk_save(&[record("b", "2nd", 0), record("a", "1st", 0), record("c", "3rd", 0)])
        .unwrap();

    let all = dao.find_all().unwrap();
    let keys: Vec<String> = all.iter().map(|r| r.get("key").display_text()).collect();
    assert_eq!(keys, ["b", "a", "c"]);
}

#[test]
fn sequence_values_are_minted_with_one_counter_round_trip() {
    let grid = RecordingGrid::shared();
    let sequence = Arc::new(GridSequence::new(grid.clone(), at("Z", 1)));
    let dao = dao_over(&grid, DaoConfig::new().sequence("key", sequence));

    grid.reset_calls();
    dao.bulk_save(&[
        Record::new().with_field("name", "first"),
        record("fixed", "has key", 0),
        Record::new().with_field("name", "second"),
    ])
    .unwrap();

    // One read and one write of the counter cell for the whole batch.
    let counter_reads = grid
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::ReadRange(r) if r == "Z1"))
        .count();
    assert_eq!(counter_reads, 1);
    assert_eq!(grid.inner().value_at(at("Z", 1)), CellValue::Number(2.0));

    // Minted values land in input order on the records that needed them.
    let all = dao.find_all().unwrap();
    assert_eq!(all[0].get("key"), &CellValue::Number(1.0));
    assert_eq!(all[1].get("key"), &CellValue::Text("fixed".into()));
    assert_eq!(all[2].get("key"), &CellValue::Number(2.0));
}

#[test]
fn duplicate_keys_in_a_batch_resolve_last_write_wins() {
    let grid = RecordingGrid::shared();
    let dao = dao_over(&grid, DaoConfig::new());

    dao.bulk_save(&[record("x", "first", 1), record("x", "second", 2)]).unwrap();

    assert_eq!(dao.find_all().unwrap().len(), 1);
    let survivor = dao.find_by_key("x").unwrap();
    assert_eq!(survivor.get("name"), &CellValue::Text("second".into()));
}

#[test]
fn row_claims_are_validated_before_the_lock() {
    let grid = RecordingGrid::shared();
    let dao = dao_over(&grid, DaoConfig::new());

    grid.reset_calls();
    let err = dao
        .bulk_save(&[Record::new().with_field("name", "ghost").with_row(4)])
        .unwrap_err();

    assert!(matches!(err, DaoError::RowWithoutKey { row: 4, .. }));
    assert_eq!(grid.calls(), Vec::new());
}

#[test]
fn claimed_rows_must_match_resolution() {
    let grid = RecordingGrid::shared();
    let dao = dao_over(&grid, DaoConfig::new());
    seed(&dao, &["k1", "k2"]);

    let err = dao
        .bulk_save(&[record("k2", "moved", 0).with_row(2)])
        .unwrap_err();
    assert!(matches!(err, DaoError::RowMismatch { claimed: 2, resolved: 3, .. }));

    let err = dao
        .bulk_save(&[record("k9", "new", 0).with_row(7)])
        .unwrap_err();
    assert!(matches!(err, DaoError::RowForMissingRecord { row: 7, .. }));
}

#[test]
fn formulas_are_recomputed_for_every_written_row() {
    let grid = RecordingGrid::shared();
    let schema = TableSchema::builder(["key", "name", "qty", "double"])
        .with_header()
        .formula("double", "[qty][row]*2")
        .build()
        .unwrap();
    let dao = Dao::new(grid.clone(), Arc::new(ProcessLock::new()), schema, DaoConfig::new()).unwrap();

    dao.bulk_save(&[
        Record::new().with_field("key", "a").with_field("qty", 1),
        Record::new().with_field("key", "b").with_field("qty", 2),
    ])
    .unwrap();

    assert_eq!(grid.inner().value_at(at("D", 2)), CellValue::Formula("=C2*2".into()));
    assert_eq!(grid.inner().value_at(at("D", 3)), CellValue::Formula("=C3*2".into()));
}

#[test]
fn empty_batches_are_a_no_op() {
    let grid = RecordingGrid::shared();
    let dao = dao_over(&grid, DaoConfig::new());

    dao.bulk_save(&[]).unwrap();
    assert_eq!(grid.calls(), Vec::new());
}
