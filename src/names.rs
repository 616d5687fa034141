use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::checks::{self, Check};
use crate::error::{ArchiveError, Result};
use crate::format::{NameRow, StandingRow};
use crate::join::{Joined, Multiplicity, outer_join};
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub id: i64,
    pub pre: Option<String>,
    pub sur: Option<String>,
    pub nat: Option<String>,
}

impl Name {
    /// Both halves unknown: the stand-in for opponents the archive does not name.
    pub fn is_anonymous(&self) -> bool {
        self.pre.is_none() && self.sur.is_none()
    }

    pub fn key(&self) -> (Option<String>, Option<String>) {
        (self.pre.clone(), self.sur.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Split {
    pre: Option<String>,
    sur: Option<String>,
    nat: Option<String>,
}

impl Split {
    fn display(&self) -> String {
        display_name(self.pre.as_deref(), self.sur.as_deref())
    }
}

pub fn display_name(pre: Option<&str>, sur: Option<&str>) -> String {
    format!("{} {}", pre.unwrap_or_default(), sur.unwrap_or_default())
        .trim()
        .to_string()
}

/// First token is the given name, second the family name.
pub fn split_display_name(name: &str) -> (Option<String>, Option<String>) {
    let mut tokens = name.split_whitespace();
    let pre = tokens.next().map(str::to_string);
    let sur = tokens.next().map(str::to_string);
    (pre, sur)
}

pub fn resolve(names: &Table<NameRow>, standings: &Table<StandingRow>) -> Result<Table<Name>> {
    checks::unique_key("names", "unique_name", names.iter(), |n| n.name.clone()).ensure()?;
    checks::unique_key("names", "unique_id", names.iter(), |n| n.id).ensure()?;

    let mut seen = HashSet::new();
    let splits: Vec<Split> = standings
        .iter()
        .map(|s| Split {
            pre: s.pre.clone(),
            sur: s.sur.clone(),
            nat: s.nat.clone(),
        })
        .filter(|split| seen.insert(split.clone()))
        .collect();

    let joined = outer_join(
        "names",
        Multiplicity::OneToOne,
        names.rows(),
        &splits,
        |n| n.name.clone(),
        Split::display,
    )?;

    let mut resolved = Vec::with_capacity(joined.len());
    let mut unmatched = Vec::new();
    let mut fallbacks = 0usize;
    for row in joined {
        match row {
            Joined::Both(n, s) => resolved.push(Name {
                id: n.id,
                pre: s.pre.clone(),
                sur: s.sur.clone(),
                nat: s.nat.clone(),
            }),
            Joined::LeftOnly(n) => {
                let (pre, sur) = split_display_name(&n.name);
                debug!(id = n.id, name = %n.name, "no standings entry, splitting display name");
                fallbacks += 1;
                resolved.push(Name {
                    id: n.id,
                    pre,
                    sur,
                    nat: None,
                });
            }
            Joined::RightOnly(s) => unmatched.push(s),
        }
    }

    let next_id = resolved.iter().map(|n| n.id).max().unwrap_or(0) + 1;
    unmatched.sort_by(|a, b| (&a.sur, &a.pre).cmp(&(&b.sur, &b.pre)));
    for (offset, s) in unmatched.iter().enumerate() {
        let id = next_id + offset as i64;
        warn!(id, name = %s.display(), "standings name missing from name list, minted id");
        resolved.push(Name {
            id,
            pre: s.pre.clone(),
            sur: s.sur.clone(),
            nat: s.nat.clone(),
        });
    }
    resolved.sort_by_key(|n| n.id);

    let table = Table::from_rows(resolved);
    verify(&table)?;
    info!(
        players = table.len(),
        split_fallbacks = fallbacks,
        minted = unmatched.len(),
        "resolved player names"
    );
    Ok(table)
}

/// Contract of the resolved name table.
pub fn verify(names: &Table<Name>) -> Result<()> {
    checks::unique_key("names", "unique_pre_sur", names.iter(), Name::key).ensure()?;
    checks::unique_key("names", "unique_id", names.iter(), |n| n.id).ensure()?;
    checks::sorted_by("names", "sorted_by_id", names.rows(), |a, b| a.id.cmp(&b.id)).ensure()?;
    checks::dense_index("names", names).ensure()?;
    no_sentinel_id(names).ensure()?;
    let anonymous = names.iter().filter(|n| n.is_anonymous()).count();
    if anonymous > 1 {
        return Err(ArchiveError::schema(
            "names",
            "single_placeholder",
            format!("{anonymous} entries without given and family name"),
        ));
    }
    Ok(())
}

pub fn no_sentinel_id(names: &Table<Name>) -> Check {
    match names.iter().find(|n| n.id == 0) {
        Some(n) => Check::fail("names", "no_sentinel_id", format!("{n:?} uses reserved id 0")),
        None => Check::pass("names", "no_sentinel_id"),
    }
}

/// Id of the entry standing in for anonymous opponents, if any.
pub fn placeholder(names: &Table<Name>) -> Option<i64> {
    names.iter().find(|n| n.is_anonymous()).map(|n| n.id)
}
