use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Duplicate key, broken join multiplicity, bad ordering or a gap in a row index.
    #[error("schema violation in {table} ({check}): {detail}")]
    Schema {
        table: &'static str,
        check: &'static str,
        detail: String,
    },

    /// The same fact, derived from two scraped sources, does not agree.
    #[error("{fact} disagrees between {left} and {right}: {detail}")]
    Disagreement {
        fact: &'static str,
        left: &'static str,
        right: &'static str,
        detail: String,
    },

    #[error("unrecognized header {header:?} in {table}")]
    Header { table: &'static str, header: String },

    #[error("missing column {column} in {table}")]
    MissingColumn {
        table: &'static str,
        column: &'static str,
    },

    #[error("cannot read {value:?} as {expected} in {table} row {row} column {column}")]
    Cell {
        table: &'static str,
        row: usize,
        column: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("raw json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    pub fn schema(table: &'static str, check: &'static str, detail: impl Into<String>) -> Self {
        Self::Schema {
            table,
            check,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_table_and_check() {
        let err = ArchiveError::schema("standings", "unique_key", "2 duplicates");
        let text = err.to_string();
        assert!(text.contains("standings"));
        assert!(text.contains("unique_key"));
        assert!(text.contains("2 duplicates"));
    }

    #[test]
    fn disagreement_names_both_sources() {
        let err = ArchiveError::Disagreement {
            fact: "significance",
            left: "lists",
            right: "games",
            detail: "event 3".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("lists"));
        assert!(text.contains("games"));
    }
}
