use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ArchiveError, Result};
use crate::raw::RawTable;

static UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("static regex"));

/// The canonical column vocabulary. Every formatted table is addressed
/// through these names only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Eid,
    Gid,
    Pid,
    Date,
    Place,
    Nat,
    Name,
    Group,
    ScoreW,
    ScoreD,
    ScoreL,
    M,
    N,
    FileFrom,
    FileDate,
    FileName,
    Remarks,
    Rank,
    Sur,
    Pre,
    Rn,
    DR,
    EffGames,
    TotGames,
    Score,
    Median,
    Buchholz,
    Compa,
    Rank1,
    Result,
    Round,
    Unplayed,
    Sur2,
    Pre2,
    R2,
    Significance,
    W,
    We,
    DW,
    IntRank,
    NatRank,
}

impl Column {
    pub fn as_str(self) -> &'static str {
        match self {
            Column::Eid => "eid",
            Column::Gid => "gid",
            Column::Pid => "pid",
            Column::Date => "date",
            Column::Place => "place",
            Column::Nat => "nat",
            Column::Name => "name",
            Column::Group => "group",
            Column::ScoreW => "score_W",
            Column::ScoreD => "score_D",
            Column::ScoreL => "score_L",
            Column::M => "M",
            Column::N => "N",
            Column::FileFrom => "file_from",
            Column::FileDate => "file_date",
            Column::FileName => "file_name",
            Column::Remarks => "remarks",
            Column::Rank => "rank",
            Column::Sur => "sur",
            Column::Pre => "pre",
            Column::Rn => "Rn",
            Column::DR => "dR",
            Column::EffGames => "eff_games",
            Column::TotGames => "tot_games",
            Column::Score => "score",
            Column::Median => "median",
            Column::Buchholz => "buchholz",
            Column::Compa => "compa",
            Column::Rank1 => "rank_1",
            Column::Result => "result",
            Column::Round => "round",
            Column::Unplayed => "unplayed",
            Column::Sur2 => "sur_2",
            Column::Pre2 => "pre_2",
            Column::R2 => "R_2",
            Column::Significance => "significance",
            Column::W => "W",
            Column::We => "We",
            Column::DW => "dW",
            Column::IntRank => "int_rank",
            Column::NatRank => "nat_rank",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Rewrite {
    StripPrefix(&'static str),
    /// `opponent_rating` -> `rating_2`, `games_eff` -> `eff_games`.
    PrefixToSuffix(&'static str, &'static str),
    /// `surname` -> `sur`, `prename` -> `pre`, wherever they occur.
    ShortNames,
}

impl Rewrite {
    fn apply(self, name: String) -> String {
        let (prefix, suffix) = match self {
            Rewrite::StripPrefix(prefix) => (prefix, ""),
            Rewrite::PrefixToSuffix(prefix, suffix) => (prefix, suffix),
            Rewrite::ShortNames => {
                return name.replace("surname", "sur").replace("prename", "pre");
            }
        };
        if let Some(rest) = name.strip_prefix(prefix).filter(|rest| !rest.is_empty()) {
            return format!("{rest}{suffix}");
        }
        name
    }
}

/// How one kind of scraped page labels its columns.
#[derive(Debug)]
pub struct HeaderStyle {
    pub table: &'static str,
    rewrites: &'static [Rewrite],
    aliases: &'static [(&'static str, Column)],
}

impl HeaderStyle {
    pub fn resolve(&self, levels: &[String]) -> Result<Column> {
        let mut name = flatten_levels(levels);
        for rewrite in self.rewrites {
            name = rewrite.apply(name);
        }
        self.aliases
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, col)| *col)
            .ok_or_else(|| ArchiveError::Header {
                table: self.table,
                header: levels.join(" / "),
            })
    }
}

pub static TOURNAMENTS: HeaderStyle = HeaderStyle {
    table: "tournaments",
    rewrites: &[],
    aliases: &[
        ("eid", Column::Eid),
        ("nat", Column::Nat),
        ("nationality", Column::Nat),
    ],
};

pub static EVENTS: HeaderStyle = HeaderStyle {
    table: "events",
    rewrites: &[],
    aliases: &[
        ("eid", Column::Eid),
        ("date", Column::Date),
        ("place", Column::Place),
    ],
};

pub static GROUPS: HeaderStyle = HeaderStyle {
    table: "groups",
    rewrites: &[],
    aliases: &[
        ("eid", Column::Eid),
        ("gid", Column::Gid),
        ("name", Column::Name),
        ("group", Column::Group),
        ("score_w", Column::ScoreW),
        ("score_d", Column::ScoreD),
        ("score_l", Column::ScoreL),
        ("m", Column::M),
        ("n", Column::N),
        ("file_from", Column::FileFrom),
        ("file_date", Column::FileDate),
        ("file_name", Column::FileName),
        ("remarks", Column::Remarks),
    ],
};

/// Tournament cross-table columns (both the standings and the activity slices).
pub static CROSS_TABLE: HeaderStyle = HeaderStyle {
    table: "cross_table",
    rewrites: &[
        Rewrite::StripPrefix("rating_"),
        Rewrite::StripPrefix("standings_"),
        Rewrite::ShortNames,
    ],
    aliases: &[
        ("eid", Column::Eid),
        ("gid", Column::Gid),
        ("#", Column::Rank),
        ("sur", Column::Sur),
        ("pre", Column::Pre),
        ("nationality", Column::Nat),
        ("value", Column::Rn),
        ("change", Column::DR),
        ("eff_games", Column::EffGames),
        ("score", Column::Score),
        ("median", Column::Median),
        ("buchholz", Column::Buchholz),
        ("compa", Column::Compa),
    ],
};

/// Id columns of the wide cross-table results slice. The per-round columns
/// are split off by the melt before header resolution.
pub static RESULTS: HeaderStyle = HeaderStyle {
    table: "results",
    rewrites: &[],
    aliases: &[
        ("eid", Column::Eid),
        ("gid", Column::Gid),
        ("##", Column::Rank1),
    ],
};

pub static NAMES: HeaderStyle = HeaderStyle {
    table: "names",
    rewrites: &[],
    aliases: &[("pid", Column::Pid), ("name", Column::Name)],
};

/// Per-player game history pages.
pub static EXPECTED: HeaderStyle = HeaderStyle {
    table: "expected",
    rewrites: &[
        Rewrite::StripPrefix("event_"),
        Rewrite::PrefixToSuffix("opponent_", "_2"),
        Rewrite::StripPrefix("result_"),
        Rewrite::ShortNames,
    ],
    aliases: &[
        ("pid", Column::Pid),
        ("date", Column::Date),
        ("place", Column::Place),
        ("sur_2", Column::Sur2),
        ("pre_2", Column::Pre2),
        ("rating_2", Column::R2),
        ("significance", Column::Significance),
        ("unplayed", Column::Unplayed),
        ("observed", Column::W),
        ("expected", Column::We),
        ("net_yield", Column::DW),
    ],
};

/// Player columns of the global rating table. Rating-list columns are
/// melted away before header resolution.
pub static RATING_TABLE: HeaderStyle = HeaderStyle {
    table: "rating_table",
    rewrites: &[
        Rewrite::PrefixToSuffix("ranking_", "_rank"),
        Rewrite::PrefixToSuffix("games_", "_games"),
        Rewrite::ShortNames,
    ],
    aliases: &[
        ("sur", Column::Sur),
        ("pre", Column::Pre),
        ("int_rank", Column::IntRank),
        ("nat_rank", Column::NatRank),
        ("eff_games", Column::EffGames),
        ("tot_games", Column::TotGames),
    ],
};

/// Flatten nested header levels into one lower-case, underscore-separated name.
pub fn flatten_levels(levels: &[String]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for level in levels {
        let level = level.trim();
        if level.is_empty() {
            continue;
        }
        // Spanning header cells repeat the same text on every level.
        if parts.last().is_some_and(|prev| prev.eq_ignore_ascii_case(level)) {
            continue;
        }
        parts.push(level);
    }
    let joined = parts
        .join("_")
        .replace('\u{2191}', "")
        .replace(['\u{a0}', ' ', '.'], "_");
    UNDERSCORES
        .replace_all(&joined, "_")
        .trim_matches('_')
        .to_lowercase()
}

/// A raw table whose headers have been resolved onto the canonical vocabulary.
#[derive(Debug, Clone)]
pub struct FlatTable {
    pub table: &'static str,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl FlatTable {
    pub fn resolve(style: &HeaderStyle, raw: &RawTable) -> Result<Self> {
        raw.check_shape(style.table)?;
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(raw.columns.len());
        for levels in &raw.columns {
            let col = style.resolve(levels)?;
            if !seen.insert(col) {
                return Err(ArchiveError::schema(
                    style.table,
                    "unique_header",
                    format!("column {col} appears twice"),
                ));
            }
            columns.push(col);
        }
        Ok(Self {
            table: style.table,
            columns,
            rows: raw.rows.clone(),
        })
    }

    pub fn position(&self, col: Column) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| *c == col)
            .ok_or(ArchiveError::MissingColumn {
                table: self.table,
                column: col.as_str(),
            })
    }

    pub fn has(&self, col: Column) -> bool {
        self.columns.contains(&col)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
