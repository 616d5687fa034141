use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub table: &'static str,
    pub name: &'static str,
    pub failure: Option<String>,
}

impl Check {
    pub fn pass(table: &'static str, name: &'static str) -> Self {
        Self {
            table,
            name,
            failure: None,
        }
    }

    pub fn fail(table: &'static str, name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            table,
            name,
            failure: Some(detail.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    pub fn ensure(self) -> Result<()> {
        match self.failure {
            None => {
                debug!(table = self.table, check = self.name, "check passed");
                Ok(())
            }
            Some(detail) => Err(ArchiveError::schema(self.table, self.name, detail)),
        }
    }
}

/// The same fact taken from two sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agreement {
    pub fact: &'static str,
    pub left: &'static str,
    pub right: &'static str,
    pub failure: Option<String>,
}

impl Agreement {
    pub fn new(fact: &'static str, left: &'static str, right: &'static str) -> Self {
        Self {
            fact,
            left,
            right,
            failure: None,
        }
    }

    pub fn with_failure(mut self, failure: Option<String>) -> Self {
        self.failure = failure;
        self
    }

    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }

    pub fn ensure(self) -> Result<()> {
        match self.failure {
            None => {
                debug!(fact = self.fact, left = self.left, right = self.right, "sources agree");
                Ok(())
            }
            Some(detail) => Err(ArchiveError::Disagreement {
                fact: self.fact,
                left: self.left,
                right: self.right,
                detail,
            }),
        }
    }
}

/// Row labels are exactly `0, 1, .., n-1` in order.
pub fn dense_index<R>(table: &'static str, rows: &Table<R>) -> Check {
    for (pos, label) in rows.index().iter().enumerate() {
        if *label != pos {
            return Check::fail(
                table,
                "dense_index",
                format!("row {pos} carries label {label}"),
            );
        }
    }
    Check::pass(table, "dense_index")
}

pub fn unique_key<'a, R: 'a, K>(
    table: &'static str,
    name: &'static str,
    rows: impl IntoIterator<Item = &'a R>,
    key: impl Fn(&R) -> K,
) -> Check
where
    K: Eq + Hash + Debug,
{
    let mut seen: HashMap<K, usize> = HashMap::new();
    let mut duplicates = 0usize;
    let mut first: Option<String> = None;
    for (pos, row) in rows.into_iter().enumerate() {
        let k = key(row);
        if let Some(prev) = seen.get(&k) {
            duplicates += 1;
            if first.is_none() {
                first = Some(format!("{k:?} at rows {prev} and {pos}"));
            }
        } else {
            seen.insert(k, pos);
        }
    }
    match first {
        None => Check::pass(table, name),
        Some(example) => Check::fail(
            table,
            name,
            format!("{duplicates} duplicate key(s), first {example}"),
        ),
    }
}

/// A stable sort by `cmp` would leave the table unchanged.
pub fn sorted_by<R: Debug>(
    table: &'static str,
    name: &'static str,
    rows: &[R],
    cmp: impl Fn(&R, &R) -> Ordering,
) -> Check {
    for (pos, pair) in rows.windows(2).enumerate() {
        if cmp(&pair[0], &pair[1]) == Ordering::Greater {
            return Check::fail(
                table,
                name,
                format!("rows {} and {} out of order: {:?} then {:?}", pos, pos + 1, pair[0], pair[1]),
            );
        }
    }
    Check::pass(table, name)
}

pub fn asc_nulls_last<T: PartialOrd>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn desc_nulls_last<T: PartialOrd>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.partial_cmp(x).unwrap_or(Ordering::Equal),
        _ => asc_nulls_last(a, b),
    }
}

pub fn desc_f64(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

pub fn is_close(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    (a - b).abs() <= atol + rtol * b.abs()
}
