use std::path::PathBuf;

use rating_archive::ArchiveError;
use rating_archive::checks;
use rating_archive::normalize::{self, NormalizedDataset};
use rating_archive::pipeline;
use rating_archive::raw::RawDataset;
use rating_archive::reduce::GroupFormat;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

fn raw_fixture() -> RawDataset {
    RawDataset::load(&fixture_path("raw_archive.json")).expect("fixture should parse")
}

fn normalized() -> NormalizedDataset {
    pipeline::run_to_normalized(&raw_fixture()).expect("fixture should normalize")
}

fn set_cell(table: &mut rating_archive::raw::RawTable, row: usize, col: usize, value: &str) {
    table.rows[row][col] = Some(value.to_string());
}

#[test]
fn fixture_reduces_end_to_end() {
    let reduced = pipeline::run(&raw_fixture()).expect("fixture should reduce");
    let counts = pipeline::table_counts(&reduced);
    assert_eq!(
        counts,
        [
            ("tournaments", 2),
            ("events", 2),
            ("groups", 2),
            ("names", 6),
            ("ratings", 5),
            ("history", 8),
            ("dates", 2),
            ("standings", 6),
            ("results", 18),
            ("activity", 6),
            ("expected", 10),
        ]
    );
    for g in reduced.groups.iter() {
        assert_eq!(g.format, GroupFormat::Rr1);
    }
    assert!(checks::dense_index("expected", &reduced.expected).passed());
    assert!(checks::dense_index("results", &reduced.results).passed());
}

#[test]
fn normalized_tables_satisfy_contracts() {
    let ds = normalized();
    ds.verify().expect("every table contract holds");
    assert!(checks::unique_key("standings", "unique_group_rank", ds.standings.iter(), |s| {
        (s.group_id, s.rank)
    })
    .passed());

    // rank order and score order coincide per group
    let mut by_score = ds.standings.rows().to_vec();
    by_score.sort_by(|a, b| {
        a.group_id
            .cmp(&b.group_id)
            .then(b.score.cmp(&a.score))
            .then(checks::desc_f64(a.median, b.median))
            .then(checks::desc_f64(a.buchholz, b.buchholz))
            .then(b.dmr_w.cmp(&a.dmr_w))
    });
    assert_eq!(by_score, ds.standings.rows());
}

#[test]
fn groups_are_numbered_by_event_then_gid() {
    let ds = normalized();
    let groups: Vec<(i64, i64, &str)> = ds
        .groups
        .iter()
        .map(|g| (g.id, g.event_id, g.name.as_str()))
        .collect();
    assert_eq!(groups, vec![(0, 1, "Leiden Open"), (1, 2, "Delft Open")]);
}

#[test]
fn names_resolve_against_standings() {
    let ds = normalized();
    let ids: Vec<i64> = ds.names.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);

    let cas = &ds.names.rows()[2];
    assert_eq!(
        (cas.pre.as_deref(), cas.sur.as_deref(), cas.nat.as_deref()),
        (Some("Cas"), Some("Ito"), Some("BEL"))
    );
    // listed in the name table only: split, no nationality
    let eva = &ds.names.rows()[5];
    assert_eq!((eva.pre.as_deref(), eva.sur.as_deref(), eva.nat.as_deref()), (Some("Eva"), Some("Vos"), None));
    assert!(ds.names.rows()[4].is_anonymous());
}

#[test]
fn byes_and_withdrawals_point_at_sentinel() {
    let ds = normalized();
    let dirk_last = ds
        .results
        .iter()
        .find(|r| r.player_id_1 == 4 && r.round == 3)
        .expect("withdrawal row");
    assert_eq!((dirk_last.player_id_2, dirk_last.unplayed, dirk_last.w), (0, true, Some(0.0)));

    let byes = ds.results.iter().filter(|r| r.player_id_2 == 0).count();
    assert_eq!(byes, 8);
    assert!(ds.results.iter().filter(|r| r.player_id_2 == 0).all(|r| r.unplayed));

    // cross-table order survives the split on opponent rank
    let first: Vec<(i64, i64, i64)> = ds
        .results
        .iter()
        .take(3)
        .map(|r| (r.player_id_1, r.player_id_2, r.round))
        .collect();
    assert_eq!(first, vec![(1, 2, 1), (1, 3, 2), (1, 0, 3)]);
}

#[test]
fn anonymous_opponent_games_are_mirrored() {
    let ds = normalized();
    let mirrored: Vec<_> = ds.games.iter().filter(|g| g.player_id_1 == 5).collect();
    assert_eq!(mirrored.len(), 1);
    let m = mirrored[0];
    assert_eq!((m.player_id_2, m.event_id, m.r_2), (1, 2, Some(1300)));
    assert_eq!(m.w, 1.0);
    assert!((m.we - 0.5).abs() < 1e-12);
    assert!((m.dw - 0.5).abs() < 1e-12);
}

#[test]
fn history_chains_rating_lists() {
    let ds = normalized();
    let ann: Vec<(i64, i64, Option<i64>, Option<i64>)> = ds
        .history
        .iter()
        .filter(|h| h.player_id == 1)
        .map(|h| (h.event_id, h.rn, h.ro, h.dr))
        .collect();
    assert_eq!(ann, vec![(1, 1280, None, None), (2, 1300, Some(1280), Some(20))]);
    assert!(ds.history.iter().all(|h| h.player_id != 4), "unrated player has no history");
}

#[test]
fn ratings_keep_published_order_and_ranks() {
    let ds = normalized();
    let order: Vec<(i64, Option<i64>, Option<i64>)> = ds
        .ratings
        .iter()
        .map(|r| (r.player_id, r.r, r.int_rank))
        .collect();
    assert_eq!(
        order,
        vec![
            (1, Some(1300), Some(1)),
            (3, Some(1240), Some(2)),
            (2, Some(1210), Some(3)),
            (6, Some(1150), None),
            (4, None, None),
        ]
    );
}

#[test]
fn renormalizing_is_a_fixed_point() {
    let ds = normalized();
    let again = normalize::renormalize(ds.clone()).expect("renormalize");
    assert_eq!(again, ds);
}

#[test]
fn repeated_runs_are_identical() {
    let raw = raw_fixture();
    let first = pipeline::run(&raw).unwrap();
    let second = pipeline::run(&raw).unwrap();
    assert_eq!(first, second);
}

#[test]
fn published_game_count_must_match_results() {
    let mut raw = raw_fixture();
    set_cell(&mut raw.rating_table, 0, 5, "5");
    let err = pipeline::run(&raw).unwrap_err();
    assert!(matches!(err, ArchiveError::Disagreement { fact: "tot_games", .. }), "{err}");
}

#[test]
fn game_row_significance_must_match_formula() {
    let mut raw = raw_fixture();
    set_cell(&mut raw.expected, 2, 3, "0.9");
    let err = pipeline::run(&raw).unwrap_err();
    assert!(
        matches!(err, ArchiveError::Disagreement { fact: "significance", left: "events", right: "games", .. }),
        "{err}"
    );
}

#[test]
fn published_list_significance_must_match_formula() {
    let mut raw = raw_fixture();
    raw.rating_table.columns[7] = ["Rating", "Leiden", "2018-12-15", "0.9"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let err = pipeline::run(&raw).unwrap_err();
    assert!(
        matches!(err, ArchiveError::Disagreement { fact: "significance", left: "events", right: "lists", .. }),
        "{err}"
    );
}

#[test]
fn every_event_needs_a_rating_list() {
    let mut raw = raw_fixture();
    raw.rating_table.columns.truncate(7);
    for row in raw.rating_table.rows.iter_mut() {
        row.truncate(7);
    }
    let err = pipeline::run(&raw).unwrap_err();
    match err {
        ArchiveError::Disagreement { fact: "significance", left: "events", right: "lists", detail } => {
            assert!(detail.contains("[1]"), "{detail}")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn one_event_carries_one_significance_in_game_rows() {
    let mut raw = raw_fixture();
    set_cell(&mut raw.expected, 3, 3, "0.85998");
    let err = pipeline::run(&raw).unwrap_err();
    assert!(
        matches!(err, ArchiveError::Disagreement { fact: "significance", left: "lists", right: "games", .. }),
        "{err}"
    );
}

#[test]
fn game_row_significance_must_match_list() {
    let mut raw = raw_fixture();
    for row in 2..8 {
        set_cell(&mut raw.expected, row, 3, "0.85998");
    }
    let err = pipeline::run(&raw).unwrap_err();
    assert!(
        matches!(err, ArchiveError::Disagreement { fact: "significance", left: "lists", right: "games", .. }),
        "{err}"
    );
}

#[test]
fn game_page_of_unknown_player_is_rejected() {
    let mut raw = raw_fixture();
    set_cell(&mut raw.expected, 0, 0, "42");
    let err = pipeline::run(&raw).unwrap_err();
    assert!(
        matches!(err, ArchiveError::Schema { table: "games", check: "unmatched_key", .. }),
        "{err}"
    );
}

#[test]
fn activity_rating_must_match_history() {
    let mut raw = raw_fixture();
    set_cell(&mut raw.activity, 4, 5, "1305");
    let err = pipeline::run(&raw).unwrap_err();
    assert!(matches!(err, ArchiveError::Disagreement { fact: "rating_history", .. }), "{err}");
}

#[test]
fn opponent_rating_must_match_current_list() {
    let mut raw = raw_fixture();
    set_cell(&mut raw.expected, 2, 6, "1215");
    let err = pipeline::run(&raw).unwrap_err();
    assert!(matches!(err, ArchiveError::Disagreement { fact: "current_rating", .. }), "{err}");
}

#[test]
fn out_of_order_rating_table_is_rejected() {
    let mut raw = raw_fixture();
    raw.rating_table.rows.swap(0, 1);
    let err = pipeline::run(&raw).unwrap_err();
    assert!(
        matches!(err, ArchiveError::Schema { table: "ratings", check: "sorted_by_rating", .. }),
        "{err}"
    );
}

#[test]
fn duplicate_rank_in_group_is_rejected() {
    let mut raw = raw_fixture();
    set_cell(&mut raw.standings, 1, 2, "1");
    let err = pipeline::run(&raw).unwrap_err();
    assert!(matches!(err, ArchiveError::Schema { table: "standings", .. }), "{err}");
}

#[test]
fn rank_outside_group_size_is_rejected() {
    let mut raw = raw_fixture();
    set_cell(&mut raw.standings, 2, 2, "4");
    let err = pipeline::run(&raw).unwrap_err();
    assert!(
        matches!(err, ArchiveError::Schema { table: "standings", check: "rank_range", .. }),
        "{err}"
    );
}

#[test]
fn unknown_cross_table_header_is_fatal() {
    let mut raw = raw_fixture();
    raw.standings.columns[9] = vec!["Standings".to_string(), "Sonneborn".to_string()];
    let err = pipeline::run(&raw).unwrap_err();
    assert!(matches!(err, ArchiveError::Header { table: "cross_table", .. }), "{err}");
}

#[test]
fn empty_input_reduces_to_empty_archive() {
    let reduced = pipeline::run(&RawDataset::default()).unwrap();
    assert!(pipeline::table_counts(&reduced).iter().all(|(_, n)| *n == 0));
}
