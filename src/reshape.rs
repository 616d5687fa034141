use std::collections::HashMap;

use crate::error::{ArchiveError, Result};
use crate::raw::RawTable;

/// One fact row of a melted table: the id cells of the source row, which
/// wide column group the facts came from, and one value per stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongRow {
    pub source_row: usize,
    pub ids: Vec<Option<String>>,
    pub key: usize,
    pub values: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LongTable {
    /// Header levels of the columns that were carried through unchanged.
    pub id_columns: Vec<Vec<String>>,
    /// Remaining header levels under each stub, e.g. `["3"]` for round 3 or
    /// `[place, date, significance]` for one published rating list.
    pub keys: Vec<Vec<String>>,
    pub rows: Vec<LongRow>,
}

impl LongTable {
    /// The id columns as a raw table of their own, one row per source row.
    pub fn id_table(&self, raw: &RawTable) -> RawTable {
        let positions: Vec<usize> = raw
            .columns
            .iter()
            .enumerate()
            .filter(|(_, levels)| self.id_columns.contains(levels))
            .map(|(pos, _)| pos)
            .collect();
        RawTable {
            columns: self.id_columns.clone(),
            rows: raw
                .rows
                .iter()
                .map(|row| positions.iter().map(|pos| row[*pos].clone()).collect())
                .collect(),
        }
    }
}

/// Unpivot every column whose top header level is one of `stubs` into fact
/// rows keyed by the column's lower header levels. Rows come out grouped by
/// source row, keys in column order.
pub fn wide_to_long(table: &'static str, raw: &RawTable, stubs: &[&str]) -> Result<LongTable> {
    raw.check_shape(table)?;

    let mut keys: Vec<Vec<String>> = Vec::new();
    let mut key_pos: HashMap<Vec<String>, usize> = HashMap::new();
    // (stub, key) -> column position
    let mut cells: HashMap<(usize, usize), usize> = HashMap::new();
    let mut id_positions = Vec::new();
    let mut id_columns = Vec::new();

    for (pos, levels) in raw.columns.iter().enumerate() {
        let stub = levels
            .first()
            .and_then(|top| stubs.iter().position(|s| s.eq_ignore_ascii_case(top.trim())));
        let Some(stub) = stub.filter(|_| levels.len() > 1) else {
            id_positions.push(pos);
            id_columns.push(levels.clone());
            continue;
        };
        let key: Vec<String> = levels[1..].iter().map(|l| l.trim().to_string()).collect();
        let next = keys.len();
        let k = *key_pos.entry(key.clone()).or_insert(next);
        if k == next {
            keys.push(key);
        }
        if cells.insert((stub, k), pos).is_some() {
            return Err(ArchiveError::schema(
                table,
                "unique_header",
                format!("{} / {:?} appears twice", stubs[stub], keys[k]),
            ));
        }
    }

    for stub in 0..stubs.len() {
        for (k, key) in keys.iter().enumerate() {
            if !cells.contains_key(&(stub, k)) {
                return Err(ArchiveError::schema(
                    table,
                    "stub_mismatch",
                    format!("{} has no column for {key:?}", stubs[stub]),
                ));
            }
        }
    }

    let mut rows = Vec::with_capacity(raw.rows.len() * keys.len());
    for (source_row, row) in raw.rows.iter().enumerate() {
        let ids: Vec<Option<String>> = id_positions.iter().map(|pos| row[*pos].clone()).collect();
        for k in 0..keys.len() {
            let values = (0..stubs.len())
                .map(|stub| row[cells[&(stub, k)]].clone())
                .collect();
            rows.push(LongRow {
                source_row,
                ids: ids.clone(),
                key: k,
                values,
            });
        }
    }

    Ok(LongTable {
        id_columns,
        keys,
        rows,
    })
}
