use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, Transaction, params};
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::pipeline::table_counts;
use crate::reduce::ReducedDataset;

/// Tables in write order. Every run replaces all of them.
pub const TABLES: [&str; 11] = [
    "tournaments",
    "events",
    "groups",
    "names",
    "ratings",
    "history",
    "dates",
    "standings",
    "results",
    "activity",
    "expected",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub run_id: i64,
    pub tables: Vec<(String, usize)>,
}

impl WriteSummary {
    pub fn total(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }

    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|(name, _)| name == table).map(|(_, n)| *n)
    }
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS tournaments (
            eid INTEGER PRIMARY KEY,
            nat TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            place TEXT NOT NULL,
            UNIQUE (date, place)
        );
        CREATE TABLE IF NOT EXISTS "groups" (
            id INTEGER PRIMARY KEY,
            event_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            grp TEXT NULL,
            score_w INTEGER NOT NULL,
            score_d INTEGER NOT NULL,
            score_l INTEGER NOT NULL,
            m INTEGER NOT NULL,
            n INTEGER NOT NULL,
            format TEXT NOT NULL,
            file_from TEXT NULL,
            file_date TEXT NULL,
            file_name TEXT NULL,
            remarks TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_groups_event ON "groups"(event_id);
        CREATE TABLE IF NOT EXISTS names (
            id INTEGER PRIMARY KEY,
            pre TEXT NULL,
            sur TEXT NULL,
            nat TEXT NULL
        );
        CREATE TABLE IF NOT EXISTS ratings (
            player_id INTEGER PRIMARY KEY,
            r INTEGER NULL,
            eff_games REAL NOT NULL
        );
        CREATE TABLE IF NOT EXISTS history (
            event_id INTEGER NOT NULL,
            player_id INTEGER NOT NULL,
            rn INTEGER NOT NULL,
            ro INTEGER NULL,
            dr INTEGER NULL,
            PRIMARY KEY (event_id, player_id)
        );
        CREATE TABLE IF NOT EXISTS dates (
            event_id INTEGER PRIMARY KEY,
            significance REAL NOT NULL
        );
        CREATE TABLE IF NOT EXISTS standings (
            group_id INTEGER NOT NULL,
            player_id INTEGER NOT NULL,
            rank INTEGER NOT NULL,
            score INTEGER NOT NULL,
            median REAL NOT NULL,
            buchholz REAL NOT NULL,
            dmr_w INTEGER NOT NULL,
            dmr_n INTEGER NOT NULL,
            PRIMARY KEY (group_id, player_id),
            UNIQUE (group_id, rank)
        );
        CREATE TABLE IF NOT EXISTS results (
            pos INTEGER NOT NULL,
            group_id INTEGER NOT NULL,
            player_id_1 INTEGER NOT NULL,
            player_id_2 INTEGER NOT NULL,
            round INTEGER NOT NULL,
            unplayed INTEGER NOT NULL,
            w REAL NULL,
            color TEXT NULL,
            PRIMARY KEY (group_id, player_id_1, round)
        );
        CREATE TABLE IF NOT EXISTS activity (
            player_id INTEGER NOT NULL,
            event_id INTEGER NOT NULL,
            eff_games REAL NOT NULL,
            PRIMARY KEY (player_id, event_id)
        );
        CREATE TABLE IF NOT EXISTS expected (
            player_id_1 INTEGER NOT NULL,
            player_id_2 INTEGER NOT NULL,
            we REAL NOT NULL,
            PRIMARY KEY (player_id_1, player_id_2)
        );

        CREATE TABLE IF NOT EXISTS normalize_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            finished_at TEXT NOT NULL,
            rows_written INTEGER NOT NULL,
            tables_json TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

/// Replace every archive table with `ds` in one transaction.
pub fn write_dataset(conn: &mut Connection, ds: &ReducedDataset) -> Result<WriteSummary> {
    let tx = conn.transaction()?;
    for table in TABLES {
        tx.execute(&format!("DELETE FROM \"{table}\""), [])?;
    }
    write_rows(&tx, ds)?;

    let tables: Vec<(String, usize)> = table_counts(ds)
        .iter()
        .map(|(name, n)| (name.to_string(), *n))
        .collect();
    let rows_written: usize = tables.iter().map(|(_, n)| n).sum();
    let tables_json = serde_json::to_string(&tables)?;
    tx.execute(
        "INSERT INTO normalize_runs(finished_at, rows_written, tables_json) VALUES (?1, ?2, ?3)",
        params![Utc::now().to_rfc3339(), rows_written as i64, tables_json],
    )?;
    let run_id = tx.last_insert_rowid();
    tx.commit()?;

    info!(run_id, rows_written, "archive written");
    Ok(WriteSummary { run_id, tables })
}

fn write_rows(tx: &Transaction<'_>, ds: &ReducedDataset) -> Result<()> {
    for t in ds.tournaments.iter() {
        tx.execute(
            "INSERT INTO tournaments(eid, nat) VALUES (?1, ?2)",
            params![t.eid, t.nat],
        )?;
    }
    for e in ds.events.iter() {
        tx.execute(
            "INSERT INTO events(id, date, place) VALUES (?1, ?2, ?3)",
            params![e.id, e.date.format("%Y-%m-%d").to_string(), e.place],
        )?;
    }
    for g in ds.groups.iter() {
        let (group, format) = (&g.group, g.format);
        tx.execute(
            r#"
            INSERT INTO "groups"(
                id, event_id, name, grp, score_w, score_d, score_l,
                m, n, format, file_from, file_date, file_name, remarks
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                group.id,
                group.event_id,
                group.name,
                group.group,
                group.score_w,
                group.score_d,
                group.score_l,
                group.m,
                group.n,
                format.as_str(),
                group.file_from,
                group.file_date,
                group.file_name,
                group.remarks
            ],
        )?;
    }
    for n in ds.names.iter() {
        tx.execute(
            "INSERT INTO names(id, pre, sur, nat) VALUES (?1, ?2, ?3, ?4)",
            params![n.id, n.pre, n.sur, n.nat],
        )?;
    }
    for r in ds.ratings.iter() {
        tx.execute(
            "INSERT INTO ratings(player_id, r, eff_games) VALUES (?1, ?2, ?3)",
            params![r.player_id, r.r, r.eff_games],
        )?;
    }
    for h in ds.history.iter() {
        tx.execute(
            "INSERT INTO history(event_id, player_id, rn, ro, dr) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![h.event_id, h.player_id, h.rn, h.ro, h.dr],
        )?;
    }
    for d in ds.dates.iter() {
        tx.execute(
            "INSERT INTO dates(event_id, significance) VALUES (?1, ?2)",
            params![d.event_id, d.significance],
        )?;
    }
    for s in ds.standings.iter() {
        tx.execute(
            r#"
            INSERT INTO standings(group_id, player_id, rank, score, median, buchholz, dmr_w, dmr_n)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                s.group_id,
                s.player_id,
                s.rank,
                s.score,
                s.median,
                s.buchholz,
                s.dmr_w,
                s.dmr_n
            ],
        )?;
    }
    for (pos, r) in ds.results.iter_indexed() {
        tx.execute(
            r#"
            INSERT INTO results(pos, group_id, player_id_1, player_id_2, round, unplayed, w, color)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                pos as i64,
                r.group_id,
                r.player_id_1,
                r.player_id_2,
                r.round,
                r.unplayed,
                r.w,
                r.color.map(|c| c.as_str())
            ],
        )?;
    }
    for a in ds.activity.iter() {
        tx.execute(
            "INSERT INTO activity(player_id, event_id, eff_games) VALUES (?1, ?2, ?3)",
            params![a.player_id, a.event_id, a.eff_games],
        )?;
    }
    for e in ds.expected.iter() {
        tx.execute(
            "INSERT INTO expected(player_id_1, player_id_2, we) VALUES (?1, ?2, ?3)",
            params![e.player_id_1, e.player_id_2, e.we],
        )?;
    }
    Ok(())
}

pub fn load_table_counts(conn: &Connection) -> Result<Vec<(&'static str, usize)>> {
    let mut out = Vec::with_capacity(TABLES.len());
    for table in TABLES {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| row.get(0))?;
        out.push((table, n as usize));
    }
    Ok(out)
}
