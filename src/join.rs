use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::checks::{self, Check};
use crate::error::{ArchiveError, Result};

/// Declared cardinality of a merge, validated before any row is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Multiplicity {
    OneToOne,
    ManyToOne,
    ManyToMany,
}

impl Multiplicity {
    fn name(self) -> &'static str {
        match self {
            Multiplicity::OneToOne => "one_to_one",
            Multiplicity::ManyToOne => "many_to_one",
            Multiplicity::ManyToMany => "many_to_many",
        }
    }

    pub fn validate<L, R, K>(
        self,
        table: &'static str,
        left: &[L],
        right: &[R],
        left_key: impl Fn(&L) -> K,
        right_key: impl Fn(&R) -> K,
    ) -> Check
    where
        K: Eq + Hash + Debug,
    {
        let name = self.name();
        if self == Multiplicity::OneToOne {
            let check = checks::unique_key(table, name, left, &left_key);
            if !check.passed() {
                return Check::fail(
                    table,
                    name,
                    format!("left keys not unique: {}", check.failure.unwrap_or_default()),
                );
            }
        }
        if self != Multiplicity::ManyToMany {
            let check = checks::unique_key(table, name, right, &right_key);
            if !check.passed() {
                return Check::fail(
                    table,
                    name,
                    format!("right keys not unique: {}", check.failure.unwrap_or_default()),
                );
            }
        }
        Check::pass(table, name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Joined<'a, L, R> {
    Both(&'a L, &'a R),
    LeftOnly(&'a L),
    RightOnly(&'a R),
}

/// Left join. Unmatched left rows pair with `None`; under `ManyToMany` a left
/// row pairs with every match.
pub fn left_join<'a, L, R, K>(
    table: &'static str,
    multiplicity: Multiplicity,
    left: &'a [L],
    right: &'a [R],
    left_key: impl Fn(&L) -> K,
    right_key: impl Fn(&R) -> K,
) -> Result<Vec<(&'a L, Option<&'a R>)>>
where
    K: Eq + Hash + Debug,
{
    multiplicity
        .validate(table, left, right, &left_key, &right_key)
        .ensure()?;
    let index = group_by_key(right, &right_key);
    let mut out = Vec::with_capacity(left.len());
    for l in left {
        match index.get(&left_key(l)) {
            Some(matches) => out.extend(matches.iter().map(|&i| (l, Some(&right[i])))),
            None => out.push((l, None)),
        }
    }
    Ok(out)
}

/// Full outer join with provenance. Left rows come first in their order,
/// then right rows nothing matched, in theirs.
pub fn outer_join<'a, L, R, K>(
    table: &'static str,
    multiplicity: Multiplicity,
    left: &'a [L],
    right: &'a [R],
    left_key: impl Fn(&L) -> K,
    right_key: impl Fn(&R) -> K,
) -> Result<Vec<Joined<'a, L, R>>>
where
    K: Eq + Hash + Debug,
{
    multiplicity
        .validate(table, left, right, &left_key, &right_key)
        .ensure()?;
    let index = group_by_key(right, &right_key);
    let mut matched = vec![false; right.len()];
    let mut out = Vec::with_capacity(left.len() + right.len());
    for l in left {
        match index.get(&left_key(l)) {
            Some(matches) => {
                for &i in matches {
                    matched[i] = true;
                    out.push(Joined::Both(l, &right[i]));
                }
            }
            None => out.push(Joined::LeftOnly(l)),
        }
    }
    out.extend(
        right
            .iter()
            .zip(&matched)
            .filter(|(_, seen)| !**seen)
            .map(|(r, _)| Joined::RightOnly(r)),
    );
    Ok(out)
}

/// Unique-key lookup table for translating natural keys to surrogate ids.
#[derive(Debug, Clone)]
pub struct Lookup<K, V> {
    table: &'static str,
    what: &'static str,
    map: HashMap<K, V>,
}

impl<K, V> Lookup<K, V>
where
    K: Eq + Hash + Debug,
{
    /// Fails if two entries share a key: the lookup side of a many-to-one merge.
    pub fn unique(
        table: &'static str,
        what: &'static str,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self> {
        let mut map = HashMap::new();
        for (k, v) in entries {
            if map.contains_key(&k) {
                return Err(ArchiveError::schema(
                    table,
                    "many_to_one",
                    format!("{what} key {k:?} maps to more than one row"),
                ));
            }
            map.insert(k, v);
        }
        Ok(Self { table, what, map })
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.map.get(key)
    }

    /// A key with no match means a row would be silently orphaned.
    pub fn require(&self, key: &K) -> Result<&V> {
        self.map.get(key).ok_or_else(|| {
            ArchiveError::schema(
                self.table,
                "unmatched_key",
                format!("no {} for key {key:?}", self.what),
            )
        })
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Positions of the rows sharing each key.
fn group_by_key<R, K>(rows: &[R], key: impl Fn(&R) -> K) -> HashMap<K, Vec<usize>>
where
    K: Eq + Hash,
{
    let mut index: HashMap<K, Vec<usize>> = HashMap::new();
    for (i, r) in rows.iter().enumerate() {
        index.entry(key(r)).or_default().push(i);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn many_to_one_rejects_duplicate_right_keys() {
        let left = vec![1, 2];
        let right = vec![(1, 'a'), (1, 'b')];
        let err = left_join("t", Multiplicity::ManyToOne, &left, &right, |l| *l, |r| r.0)
            .unwrap_err();
        assert!(err.to_string().contains("many_to_one"));
    }

    #[test]
    fn one_to_one_rejects_duplicate_left_keys() {
        let left = vec![1, 1];
        let right = vec![(1, 'a')];
        assert!(left_join("t", Multiplicity::OneToOne, &left, &right, |l| *l, |r| r.0).is_err());
        assert!(left_join("t", Multiplicity::ManyToOne, &left, &right, |l| *l, |r| r.0).is_ok());
    }

    #[test]
    fn many_to_many_fans_out() {
        let left = vec![1, 3];
        let right = vec![(1, 'a'), (1, 'b')];
        let rows = left_join("t", Multiplicity::ManyToMany, &left, &right, |l| *l, |r| r.0).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], (&3, None));
    }

    #[test]
    fn outer_join_tags_provenance() {
        let left = vec![(1, "ann"), (2, "bob")];
        let right = vec![("bob", 'x'), ("cy", 'y')];
        let rows = outer_join("t", Multiplicity::OneToOne, &left, &right, |l| l.1, |r| r.0).unwrap();
        assert!(matches!(rows[0], Joined::LeftOnly((1, "ann"))));
        assert!(matches!(rows[1], Joined::Both((2, "bob"), ("bob", 'x'))));
        assert!(matches!(rows[2], Joined::RightOnly(("cy", 'y'))));
    }

    #[test]
    fn outer_join_tracks_equal_right_rows_by_position() {
        let left = vec![1];
        let right = vec![(1, "a"), (2, "a"), (2, "a")];
        let rows = outer_join("t", Multiplicity::ManyToMany, &left, &right, |l| *l, |r| r.0).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(matches!(rows[0], Joined::Both(1, (1, "a"))));
        assert!(rows[1..].iter().all(|j| matches!(j, Joined::RightOnly((2, "a")))));
    }

    #[test]
    fn lookup_require_names_missing_key() {
        let lookup = Lookup::unique("t", "player", vec![("a", 1)]).unwrap();
        assert_eq!(*lookup.require(&"a").unwrap(), 1);
        let err = lookup.require(&"b").unwrap_err();
        assert!(err.to_string().contains("no player"));
    }
}
