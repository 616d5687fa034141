use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ArchiveError, Result};

/// A table as handed over by the HTML parsing layer: nested header levels per
/// column, one optional text cell per column per row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    #[serde(default)]
    pub columns: Vec<Vec<String>>,
    #[serde(default)]
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Builder used by fixtures and tests. Every header level is a `&str`,
    /// `None` cells stand for empty HTML cells.
    pub fn from_parts(columns: &[&[&str]], rows: Vec<Vec<Option<&str>>>) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|levels| levels.iter().map(|s| s.to_string()).collect())
                .collect(),
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|c| c.map(str::to_string)).collect())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Rows shorter or longer than the header are a parser contract violation.
    pub fn check_shape(&self, table: &'static str) -> Result<()> {
        let width = self.columns.len();
        for (idx, row) in self.rows.iter().enumerate() {
            if row.len() != width {
                return Err(ArchiveError::schema(
                    table,
                    "row_width",
                    format!("row {idx} has {} cells, header has {width}", row.len()),
                ));
            }
        }
        Ok(())
    }
}

/// Every denormalized table the extraction layer produces for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDataset {
    #[serde(default)]
    pub tournaments: RawTable,
    #[serde(default)]
    pub events: RawTable,
    #[serde(default)]
    pub groups: RawTable,
    #[serde(default)]
    pub activity: RawTable,
    #[serde(default)]
    pub standings: RawTable,
    #[serde(default)]
    pub results: RawTable,
    #[serde(default)]
    pub names: RawTable,
    #[serde(default)]
    pub expected: RawTable,
    #[serde(default)]
    pub rating_table: RawTable,
}

impl RawDataset {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str::<RawDataset>(raw.trim())?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tables_default_to_empty() {
        let ds = RawDataset::from_json_str(r#"{"names":{"columns":[["pid"],["name"]],"rows":[["1","Ann Lee"]]}}"#)
            .expect("partial dataset should parse");
        assert_eq!(ds.names.len(), 1);
        assert!(ds.events.is_empty());
        assert!(ds.rating_table.columns.is_empty());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let table = RawTable::from_parts(&[&["pid"], &["name"]], vec![vec![Some("1")]]);
        let err = table.check_shape("names").unwrap_err();
        assert!(err.to_string().contains("row_width"));
    }
}
