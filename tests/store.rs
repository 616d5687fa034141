use std::path::PathBuf;

use rating_archive::pipeline;
use rating_archive::raw::RawDataset;
use rating_archive::store;

fn reduced_fixture() -> rating_archive::reduce::ReducedDataset {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push("raw_archive.json");
    let raw = RawDataset::load(&path).expect("fixture should parse");
    pipeline::run(&raw).expect("fixture should reduce")
}

#[test]
fn writes_every_table_into_a_fresh_db() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("archive.sqlite");
    let reduced = reduced_fixture();

    let mut conn = store::open_db(&db_path).unwrap();
    let summary = store::write_dataset(&mut conn, &reduced).unwrap();
    assert_eq!(summary.total(), 67);
    assert_eq!(summary.rows("results"), Some(18));

    let counts = store::load_table_counts(&conn).unwrap();
    assert_eq!(counts, pipeline::table_counts(&reduced).to_vec());

    let formats: Vec<String> = conn
        .prepare("SELECT format FROM \"groups\" ORDER BY id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(formats, vec!["RR1", "RR1"]);

    let anonymous: (Option<String>, Option<String>) = conn
        .query_row("SELECT pre, sur FROM names WHERE id = 5", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(anonymous, (None, None));
}

#[test]
fn rerun_replaces_rows_and_logs_each_run() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("archive.sqlite");
    let reduced = reduced_fixture();

    let mut conn = store::open_db(&db_path).unwrap();
    store::write_dataset(&mut conn, &reduced).unwrap();
    drop(conn);

    let mut conn = store::open_db(&db_path).unwrap();
    let second = store::write_dataset(&mut conn, &reduced).unwrap();
    assert_eq!(second.rows("expected"), Some(10));

    let runs: i64 = conn
        .query_row("SELECT COUNT(*) FROM normalize_runs", [], |row| row.get(0))
        .unwrap();
    assert_eq!(runs, 2);
    let byes: i64 = conn
        .query_row("SELECT COUNT(*) FROM results WHERE player_id_2 = 0", [], |row| row.get(0))
        .unwrap();
    assert_eq!(byes, 8);
}
