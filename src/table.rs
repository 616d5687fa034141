/// Rows plus the explicit row index that travels with them through joins,
/// partitions and re-concatenation.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    index: Vec<usize>,
    rows: Vec<R>,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            index: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl<R> Table<R> {
    /// Fresh table with a `0..n` index.
    pub fn from_rows(rows: Vec<R>) -> Self {
        Self {
            index: (0..rows.len()).collect(),
            rows,
        }
    }

    /// Keeps the given labels; used when a partition is re-joined with its
    /// complement and sorted back by original position.
    pub fn with_index(index: Vec<usize>, rows: Vec<R>) -> Self {
        debug_assert_eq!(index.len(), rows.len());
        Self { index, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.rows.iter()
    }

    pub fn iter_indexed(&self) -> impl Iterator<Item = (usize, &R)> {
        self.index.iter().copied().zip(self.rows.iter())
    }

    /// Row-wise transform that keeps index labels.
    pub fn map<S>(self, f: impl FnMut(R) -> S) -> Table<S> {
        Table {
            index: self.index,
            rows: self.rows.into_iter().map(f).collect(),
        }
    }

    pub fn try_map<S, E>(self, mut f: impl FnMut(usize, R) -> Result<S, E>) -> Result<Table<S>, E> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for (idx, row) in self.index.iter().copied().zip(self.rows) {
            rows.push(f(idx, row)?);
        }
        Ok(Table {
            index: self.index,
            rows,
        })
    }

    /// Split by predicate, both halves keep their original labels.
    pub fn partition(self, mut pred: impl FnMut(&R) -> bool) -> (Table<R>, Table<R>) {
        let mut yes = Table::default();
        let mut no = Table::default();
        for (idx, row) in self.index.into_iter().zip(self.rows) {
            let side = if pred(&row) { &mut yes } else { &mut no };
            side.index.push(idx);
            side.rows.push(row);
        }
        (yes, no)
    }

    /// Concatenate and order by index label, the inverse of `partition`.
    pub fn concat_sorted(self, other: Table<R>) -> Table<R> {
        let mut pairs: Vec<(usize, R)> = self
            .index
            .into_iter()
            .zip(self.rows)
            .chain(other.index.into_iter().zip(other.rows))
            .collect();
        pairs.sort_by_key(|(idx, _)| *idx);
        let (index, rows): (Vec<usize>, Vec<R>) = pairs.into_iter().unzip();
        Table { index, rows }
    }

    /// Stable sort of the rows; labels move with their rows.
    pub fn sort_by(self, mut cmp: impl FnMut(&R, &R) -> std::cmp::Ordering) -> Table<R> {
        let mut pairs: Vec<(usize, R)> = self.index.into_iter().zip(self.rows).collect();
        pairs.sort_by(|a, b| cmp(&a.1, &b.1));
        let (index, rows): (Vec<usize>, Vec<R>) = pairs.into_iter().unzip();
        Table { index, rows }
    }

    /// Drop the labels and number rows `0..n` in their current order.
    pub fn reset_index(self) -> Table<R> {
        Table::from_rows(self.rows)
    }
}
