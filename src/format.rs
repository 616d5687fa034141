use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::header::{self, Column, FlatTable};
use crate::raw::{RawDataset, RawTable};
use crate::reshape::wide_to_long;
use crate::table::Table;

/// `12+B`: opponent rank, outcome symbol, colour.
static CROSS_CELL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d*)([+=?-])([BW]?)$").expect("static regex"));

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];
const UNKNOWN_MARKERS: [&str; 3] = ["-", "unrated", "\u{2013}"];

#[derive(Debug, Clone, PartialEq)]
pub struct Tournament {
    pub eid: i64,
    pub nat: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub id: i64,
    pub date: NaiveDate,
    pub place: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub id: i64,
    pub event_id: i64,
    pub gid: i64,
    pub name: String,
    pub group: Option<String>,
    pub score_w: i64,
    pub score_d: i64,
    pub score_l: i64,
    pub m: i64,
    pub n: i64,
    pub file_from: Option<String>,
    pub file_date: Option<String>,
    pub file_name: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRow {
    pub pre: Option<String>,
    pub sur: Option<String>,
    pub nat: Option<String>,
    pub event_id: i64,
    pub eff_games: f64,
    pub rn: Option<i64>,
    pub ro: Option<i64>,
    pub dr: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandingRow {
    pub event_id: i64,
    pub gid: i64,
    pub pre: Option<String>,
    pub sur: Option<String>,
    pub nat: Option<String>,
    pub rank: i64,
    pub score: i64,
    pub median: f64,
    pub buchholz: f64,
    /// Direct mutual result: games won and games played among tied players.
    pub dmr_w: i64,
    pub dmr_n: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "W",
            Color::Black => "B",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub event_id: i64,
    pub gid: i64,
    pub rank_1: i64,
    /// 0 for a bye or a withdrawal.
    pub rank_2: i64,
    pub round: i64,
    pub unplayed: bool,
    /// None when no decision was recorded.
    pub w: Option<f64>,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameRow {
    pub id: i64,
    pub name: String,
}

/// One game as listed on the history page of `player_id_1`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRow {
    pub date: NaiveDate,
    pub place: String,
    pub player_id_1: i64,
    pub sur_2: Option<String>,
    pub pre_2: Option<String>,
    pub r_2: Option<i64>,
    pub significance: f64,
    pub unplayed: Option<bool>,
    pub w: f64,
    pub we: f64,
    pub dw: f64,
}

/// A published rating list, keyed by the event that closed it.
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub date: NaiveDate,
    pub place: String,
    pub significance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingRow {
    pub pre: Option<String>,
    pub sur: Option<String>,
    pub nat: Option<String>,
    pub r: Option<i64>,
    pub int_rank: Option<i64>,
    pub nat_rank: Option<i64>,
    pub eff_games: f64,
    pub tot_games: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub pre: Option<String>,
    pub sur: Option<String>,
    pub date: NaiveDate,
    pub place: String,
    pub r: i64,
}

/// The three views carried by the global rating table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingTable {
    /// Chronological, oldest list first.
    pub lists: Table<ListRow>,
    /// Newest list only, in published order.
    pub ratings: Table<RatingRow>,
    pub history: Table<HistoryRow>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormattedDataset {
    pub tournaments: Table<Tournament>,
    pub events: Table<Event>,
    pub groups: Table<GroupRow>,
    pub activity: Table<ActivityRow>,
    pub standings: Table<StandingRow>,
    pub results: Table<ResultRow>,
    pub names: Table<NameRow>,
    pub games: Table<GameRow>,
    pub lists: Table<ListRow>,
    pub ratings: Table<RatingRow>,
    pub history: Table<HistoryRow>,
}

pub fn format_dataset(raw: &RawDataset) -> Result<FormattedDataset> {
    let RatingTable {
        lists,
        ratings,
        history,
    } = rating_table(&raw.rating_table)?;
    Ok(FormattedDataset {
        tournaments: tournaments(&raw.tournaments)?,
        events: events(&raw.events)?,
        groups: groups(&raw.groups)?,
        activity: activity(&raw.activity)?,
        standings: standings(&raw.standings)?,
        results: results(&raw.results)?,
        names: names(&raw.names)?,
        games: games(&raw.expected)?,
        lists,
        ratings,
        history,
    })
}

pub fn tournaments(raw: &RawTable) -> Result<Table<Tournament>> {
    if raw.is_empty() {
        return Ok(Table::default());
    }
    let flat = FlatTable::resolve(&header::TOURNAMENTS, raw)?;
    let mut rows = records(&flat)
        .map(|rec| {
            Ok(Tournament {
                eid: rec.int(Column::Eid)?,
                nat: rec.required(Column::Nat, "nationality")?.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by_key(|t| t.eid);
    finish(&flat, rows)
}

pub fn events(raw: &RawTable) -> Result<Table<Event>> {
    if raw.is_empty() {
        return Ok(Table::default());
    }
    let flat = FlatTable::resolve(&header::EVENTS, raw)?;
    let mut rows = records(&flat)
        .map(|rec| {
            Ok(Event {
                id: rec.int(Column::Eid)?,
                date: rec.date(Column::Date)?,
                place: rec.required(Column::Place, "place")?.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by_key(|e| e.id);
    finish(&flat, rows)
}

/// Groups are numbered densely in `(eid, gid)` order.
pub fn groups(raw: &RawTable) -> Result<Table<GroupRow>> {
    if raw.is_empty() {
        return Ok(Table::default());
    }
    let flat = FlatTable::resolve(&header::GROUPS, raw)?;
    let mut rows = records(&flat)
        .map(|rec| {
            Ok(GroupRow {
                id: 0,
                event_id: rec.int(Column::Eid)?,
                gid: rec.int(Column::Gid)?,
                name: rec.required(Column::Name, "group name")?.to_string(),
                group: rec.optional_text(Column::Group)?.map(str::to_string),
                score_w: rec.int(Column::ScoreW)?,
                score_d: rec.int(Column::ScoreD)?,
                score_l: rec.int(Column::ScoreL)?,
                m: rec.int(Column::M)?,
                n: rec.int(Column::N)?,
                file_from: rec.optional_text(Column::FileFrom)?.map(str::to_string),
                file_date: rec.optional_text(Column::FileDate)?.map(str::to_string),
                file_name: rec.optional_text(Column::FileName)?.map(str::to_string),
                remarks: rec.optional_text(Column::Remarks)?.map(str::to_string),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by_key(|g| (g.event_id, g.gid));
    for (id, row) in rows.iter_mut().enumerate() {
        row.id = id as i64;
    }
    finish(&flat, rows)
}

/// Per-event ratings from the cross-table. `Ro` is derived as `Rn - dR`; a
/// player listed in several groups of one event collapses to one row.
pub fn activity(raw: &RawTable) -> Result<Table<ActivityRow>> {
    if raw.is_empty() {
        return Ok(Table::default());
    }
    let flat = FlatTable::resolve(&header::CROSS_TABLE, raw)?;
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(flat.len());
    for rec in records(&flat) {
        let rn = rec.opt_int(Column::Rn)?;
        let dr = rec.opt_int(Column::DR)?;
        let row = ActivityRow {
            pre: rec.text(Column::Pre)?.map(str::to_string),
            sur: rec.text(Column::Sur)?.map(str::to_string),
            nat: rec.text(Column::Nat)?.map(str::to_string),
            event_id: rec.int(Column::Eid)?,
            eff_games: rec.float(Column::EffGames)?,
            rn,
            ro: rn.zip(dr).map(|(rn, dr)| rn - dr),
            dr,
        };
        let key = (
            row.pre.clone(),
            row.sur.clone(),
            row.nat.clone(),
            row.event_id,
            row.eff_games.to_bits(),
            row.rn,
            row.dr,
        );
        if seen.insert(key) {
            rows.push(row);
        }
    }
    if rows.len() < flat.len() {
        debug!(
            dropped = flat.len() - rows.len(),
            "collapsed duplicate activity rows"
        );
    }
    finish(&flat, rows)
}

pub fn standings(raw: &RawTable) -> Result<Table<StandingRow>> {
    if raw.is_empty() {
        return Ok(Table::default());
    }
    let flat = FlatTable::resolve(&header::CROSS_TABLE, raw)?;
    let rows = records(&flat)
        .map(|rec| {
            let (dmr_w, dmr_n) = rec.ratio(Column::Compa)?;
            Ok(StandingRow {
                event_id: rec.int(Column::Eid)?,
                gid: rec.int(Column::Gid)?,
                pre: rec.text(Column::Pre)?.map(str::to_string),
                sur: rec.text(Column::Sur)?.map(str::to_string),
                nat: rec.text(Column::Nat)?.map(str::to_string),
                rank: rec.int(Column::Rank)?,
                score: rec.int(Column::Score)?,
                median: rec.float(Column::Median)?,
                buchholz: rec.float(Column::Buchholz)?,
                dmr_w,
                dmr_n,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    finish(&flat, rows)
}

/// Melt the round columns of the cross-table into one row per
/// `(group, rank, round)` and split each cell into its facts.
pub fn results(raw: &RawTable) -> Result<Table<ResultRow>> {
    if raw.is_empty() {
        return Ok(Table::default());
    }
    let long = wide_to_long("results", raw, &["Results", "Unplayed"])?;
    let rounds = long
        .keys
        .iter()
        .map(|key| match key.as_slice() {
            [round] => parse_int(round).ok_or_else(|| ArchiveError::Header {
                table: "results",
                header: format!("Results / {round}"),
            }),
            _ => Err(ArchiveError::Header {
                table: "results",
                header: key.join(" / "),
            }),
        })
        .collect::<Result<Vec<i64>>>()?;
    let ids = FlatTable::resolve(&header::RESULTS, &long.id_table(raw))?;

    let mut rows = Vec::with_capacity(long.rows.len());
    for fact in &long.rows {
        let rec = Record::at(&ids, fact.source_row);
        let cell = fact.values[0].as_deref().map(str::trim).unwrap_or("0?");
        let cell = if cell.is_empty() { "0?" } else { cell };
        let (rank_2, w, color) = parse_cross_cell(cell)
            .ok_or_else(|| rec.bad(Column::Result, cell, "cross-table result"))?;
        let unplayed = match fact.values[1].as_deref().map(str::trim) {
            None | Some("") => false,
            Some(flag) => {
                parse_flag(flag).ok_or_else(|| rec.bad(Column::Unplayed, flag, "boolean"))?
            }
        };
        rows.push(ResultRow {
            event_id: rec.int(Column::Eid)?,
            gid: rec.int(Column::Gid)?,
            rank_1: rec.int(Column::Rank1)?,
            rank_2,
            round: rounds[fact.key],
            unplayed,
            w,
            color,
        });
    }
    debug!(table = "results", rows = rows.len(), rounds = rounds.len(), "formatted");
    Ok(Table::from_rows(rows))
}

pub fn names(raw: &RawTable) -> Result<Table<NameRow>> {
    if raw.is_empty() {
        return Ok(Table::default());
    }
    let flat = FlatTable::resolve(&header::NAMES, raw)?;
    let mut rows = records(&flat)
        .map(|rec| {
            Ok(NameRow {
                id: rec.int(Column::Pid)?,
                name: rec.text(Column::Name)?.unwrap_or_default().to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by_key(|n| n.id);
    finish(&flat, rows)
}

/// Game rows scraped from per-player history pages.
pub fn games(raw: &RawTable) -> Result<Table<GameRow>> {
    if raw.is_empty() {
        return Ok(Table::default());
    }
    let flat = FlatTable::resolve(&header::EXPECTED, raw)?;
    let rows = records(&flat)
        .map(|rec| {
            Ok(GameRow {
                date: rec.date(Column::Date)?,
                place: rec.required(Column::Place, "place")?.to_string(),
                player_id_1: rec.int(Column::Pid)?,
                sur_2: rec.text(Column::Sur2)?.map(str::to_string),
                pre_2: rec.text(Column::Pre2)?.map(str::to_string),
                r_2: rec.opt_int(Column::R2)?,
                significance: rec.float(Column::Significance)?,
                unplayed: rec.opt_flag(Column::Unplayed)?,
                w: rec.float(Column::W)?,
                we: rec.float(Column::We)?,
                dw: rec.float(Column::DW)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    finish(&flat, rows)
}

/// Melt the global rating table. Its list columns are headed
/// `Rating / place / date / significance`, newest list first.
pub fn rating_table(raw: &RawTable) -> Result<RatingTable> {
    if raw.is_empty() {
        return Ok(RatingTable::default());
    }
    let long = wide_to_long("rating_table", raw, &["Rating"])?;
    let newest_first = long
        .keys
        .iter()
        .map(|key| parse_list_key(key))
        .collect::<Result<Vec<ListRow>>>()?;
    let n_lists = newest_first.len();
    let ids = FlatTable::resolve(&header::RATING_TABLE, &long.id_table(raw))?;

    let mut ratings = Vec::with_capacity(ids.len());
    // (chronological list position, source row, rating)
    let mut rated: Vec<(usize, usize, i64)> = Vec::new();
    for fact in &long.rows {
        let rec = Record::at(&ids, fact.source_row);
        let cell = fact.values[0].as_deref().map(str::trim).filter(|c| !c.is_empty());
        let r = match cell {
            None => None,
            Some(c) if is_unknown(c) => None,
            Some(c) => Some(parse_int(c).ok_or_else(|| rec.bad(Column::Rn, c, "rating"))?),
        };
        if fact.key == 0 {
            ratings.push(rating_row(&rec, r)?);
        }
        if let Some(r) = r {
            rated.push((n_lists - 1 - fact.key, fact.source_row, r));
        }
    }

    // A player's tiebreak is where they first appear scanning lists newest first.
    let mut first_seen: HashMap<usize, usize> = HashMap::new();
    let mut scan: Vec<(usize, usize)> = rated.iter().map(|(list, row, _)| (n_lists - 1 - list, *row)).collect();
    scan.sort();
    for (_, row) in scan {
        let next = first_seen.len();
        first_seen.entry(row).or_insert(next);
    }
    rated.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then(b.2.cmp(&a.2))
            .then(first_seen[&a.1].cmp(&first_seen[&b.1]))
    });

    let mut history = Vec::with_capacity(rated.len());
    for (list, row, r) in rated {
        let rec = Record::at(&ids, row);
        let published = &newest_first[n_lists - 1 - list];
        history.push(HistoryRow {
            pre: rec.text(Column::Pre)?.map(str::to_string),
            sur: rec.text(Column::Sur)?.map(str::to_string),
            date: published.date,
            place: published.place.clone(),
            r,
        });
    }

    let lists: Vec<ListRow> = newest_first.into_iter().rev().collect();
    debug!(
        table = "rating_table",
        lists = lists.len(),
        ratings = ratings.len(),
        history = history.len(),
        "formatted"
    );
    Ok(RatingTable {
        lists: Table::from_rows(lists),
        ratings: Table::from_rows(ratings),
        history: Table::from_rows(history),
    })
}

fn rating_row(rec: &Record<'_>, r: Option<i64>) -> Result<RatingRow> {
    // "12/NED" or "-/NED"
    let nat_cell = rec.text(Column::NatRank)?;
    let mut parts = nat_cell.map(|c| c.split('/').map(str::trim).collect::<Vec<_>>()).unwrap_or_default();
    let nat = parts.pop().filter(|p| !p.is_empty()).map(str::to_string);
    let nat_rank = match parts.first() {
        Some(rank) if starts_with_digit(rank) => Some(
            parse_int(rank).ok_or_else(|| rec.bad(Column::NatRank, rank, "national rank"))?,
        ),
        _ => None,
    };
    let int_rank = match rec.text(Column::IntRank)? {
        Some(rank) if starts_with_digit(rank) => Some(
            parse_int(rank).ok_or_else(|| rec.bad(Column::IntRank, rank, "international rank"))?,
        ),
        _ => None,
    };
    Ok(RatingRow {
        pre: rec.text(Column::Pre)?.map(str::to_string),
        sur: rec.text(Column::Sur)?.map(str::to_string),
        nat,
        r,
        int_rank,
        nat_rank,
        eff_games: rec.float(Column::EffGames)?,
        tot_games: rec.int(Column::TotGames)?,
    })
}

fn parse_list_key(key: &[String]) -> Result<ListRow> {
    let bad = || ArchiveError::Header {
        table: "rating_table",
        header: format!("Rating / {}", key.join(" / ")),
    };
    let [place, date, significance] = key else {
        return Err(bad());
    };
    Ok(ListRow {
        date: parse_date(date).ok_or_else(bad)?,
        place: place.clone(),
        significance: parse_float(significance).ok_or_else(bad)?,
    })
}

/// `(rank_2, W, colour)` from a cross-table cell; `0?` means nothing recorded.
pub fn parse_cross_cell(cell: &str) -> Option<(i64, Option<f64>, Option<Color>)> {
    let caps = CROSS_CELL.captures(cell)?;
    let rank = match &caps[1] {
        "" => 0,
        digits => digits.parse().ok()?,
    };
    let w = match &caps[2] {
        "+" => Some(1.0),
        "=" => Some(0.5),
        "-" => Some(0.0),
        _ => None,
    };
    let color = match &caps[3] {
        "W" => Some(Color::White),
        "B" => Some(Color::Black),
        _ => None,
    };
    Some((rank, w, color))
}

fn finish<R>(flat: &FlatTable, rows: Vec<R>) -> Result<Table<R>> {
    debug!(table = flat.table, rows = rows.len(), "formatted");
    Ok(Table::from_rows(rows))
}

fn records(flat: &FlatTable) -> impl Iterator<Item = Record<'_>> {
    (0..flat.len()).map(move |row| Record::at(flat, row))
}

/// Typed access to one row of a resolved table.
struct Record<'a> {
    flat: &'a FlatTable,
    row: usize,
}

impl<'a> Record<'a> {
    fn at(flat: &'a FlatTable, row: usize) -> Self {
        Self { flat, row }
    }

    fn text(&self, col: Column) -> Result<Option<&'a str>> {
        let pos = self.flat.position(col)?;
        Ok(self.flat.rows[self.row][pos]
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty()))
    }

    /// Like `text`, but a column the page does not carry reads as empty.
    fn optional_text(&self, col: Column) -> Result<Option<&'a str>> {
        if !self.flat.has(col) {
            return Ok(None);
        }
        self.text(col)
    }

    fn required(&self, col: Column, expected: &'static str) -> Result<&'a str> {
        self.text(col)?.ok_or_else(|| self.bad(col, "", expected))
    }

    fn int(&self, col: Column) -> Result<i64> {
        let cell = self.required(col, "integer")?;
        parse_int(cell).ok_or_else(|| self.bad(col, cell, "integer"))
    }

    fn opt_int(&self, col: Column) -> Result<Option<i64>> {
        match self.text(col)? {
            None => Ok(None),
            Some(cell) if is_unknown(cell) => Ok(None),
            Some(cell) => parse_int(cell)
                .map(Some)
                .ok_or_else(|| self.bad(col, cell, "integer")),
        }
    }

    fn float(&self, col: Column) -> Result<f64> {
        let cell = self.required(col, "number")?;
        parse_float(cell).ok_or_else(|| self.bad(col, cell, "number"))
    }

    fn date(&self, col: Column) -> Result<NaiveDate> {
        let cell = self.required(col, "date")?;
        parse_date(cell).ok_or_else(|| self.bad(col, cell, "date"))
    }

    fn opt_flag(&self, col: Column) -> Result<Option<bool>> {
        match self.optional_text(col)? {
            None => Ok(None),
            Some(cell) => parse_flag(cell)
                .map(Some)
                .ok_or_else(|| self.bad(col, cell, "boolean")),
        }
    }

    /// `"W/N"`, absent reads as `0/0`.
    fn ratio(&self, col: Column) -> Result<(i64, i64)> {
        let Some(cell) = self.text(col)? else {
            return Ok((0, 0));
        };
        let parsed = cell
            .split_once('/')
            .and_then(|(w, n)| Some((parse_int(w.trim())?, parse_int(n.trim())?)));
        parsed.ok_or_else(|| self.bad(col, cell, "W/N ratio"))
    }

    fn bad(&self, col: Column, value: &str, expected: &'static str) -> ArchiveError {
        ArchiveError::Cell {
            table: self.flat.table,
            row: self.row,
            column: col.as_str(),
            value: value.to_string(),
            expected,
        }
    }
}

fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64)
            .map(|v| v as i64)
    })
}

fn parse_float(raw: &str) -> Option<f64> {
    let raw = raw.trim().replace('\u{bd}', ".5").replace(',', ".");
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn is_unknown(cell: &str) -> bool {
    UNKNOWN_MARKERS.iter().any(|m| m.eq_ignore_ascii_case(cell))
}

fn starts_with_digit(cell: &str) -> bool {
    cell.chars().next().is_some_and(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_cells_split_into_rank_outcome_colour() {
        assert_eq!(parse_cross_cell("12+B"), Some((12, Some(1.0), Some(Color::Black))));
        assert_eq!(parse_cross_cell("3=W"), Some((3, Some(0.5), Some(Color::White))));
        assert_eq!(parse_cross_cell("0-"), Some((0, Some(0.0), None)));
        assert_eq!(parse_cross_cell("0?"), Some((0, None, None)));
        assert_eq!(parse_cross_cell("12x"), None);
    }

    #[test]
    fn missing_result_cell_defaults_to_no_decision() {
        let raw = RawTable::from_parts(
            &[&["eid"], &["gid"], &["##"], &["Results", "1"], &["Unplayed", "1"]],
            vec![
                vec![Some("1"), Some("1"), Some("1"), None, None],
                vec![Some("1"), Some("1"), Some("2"), Some("0-"), Some("true")],
            ],
        );
        let rows = results(&raw).unwrap();
        let first = &rows.rows()[0];
        assert_eq!((first.rank_2, first.w, first.unplayed), (0, None, false));
        let second = &rows.rows()[1];
        assert_eq!((second.rank_2, second.w, second.unplayed), (0, Some(0.0), true));
        assert_eq!(second.round, 1);
    }

    #[test]
    fn activity_derives_prior_rating_and_collapses_duplicates() {
        let raw = RawTable::from_parts(
            &[
                &["eid"],
                &["gid"],
                &["Surname"],
                &["Prename"],
                &["Nationality"],
                &["Rating", "Value"],
                &["Rating", "Change"],
                &["Rating", "Eff.Games"],
            ],
            vec![
                vec![Some("1"), Some("1"), Some("Lee"), Some("Ann"), Some("NED"), Some("1210"), Some("10"), Some("7.5")],
                vec![Some("1"), Some("2"), Some("Lee"), Some("Ann"), Some("NED"), Some("1210"), Some("10"), Some("7.5")],
                vec![Some("1"), Some("1"), Some("Roe"), Some("Bo"), Some("NED"), Some("1100"), None, Some("3.0")],
            ],
        );
        let rows = activity(&raw).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows()[0].ro, Some(1200));
        assert_eq!(rows.rows()[1].ro, None);
    }

    #[test]
    fn compa_splits_into_direct_mutual_result() {
        let raw = RawTable::from_parts(
            &[
                &["eid"],
                &["gid"],
                &["#", "#"],
                &["Surname"],
                &["Prename"],
                &["Nationality"],
                &["Standings", "Score"],
                &["Standings", "Median"],
                &["Standings", "Buchholz"],
                &["Standings", "Compa."],
            ],
            vec![
                vec![Some("1"), Some("1"), Some("1"), Some("Lee"), Some("Ann"), Some("NED"), Some("6"), Some("4"), Some("8.5"), Some("1/2")],
                vec![Some("1"), Some("1"), Some("2"), Some("Roe"), Some("Bo"), Some("NED"), Some("6"), Some("4"), Some("8.5"), None],
            ],
        );
        let rows = standings(&raw).unwrap();
        assert_eq!((rows.rows()[0].dmr_w, rows.rows()[0].dmr_n), (1, 2));
        assert_eq!((rows.rows()[1].dmr_w, rows.rows()[1].dmr_n), (0, 0));
    }

    fn rating_raw() -> RawTable {
        RawTable::from_parts(
            &[
                &["Surname"],
                &["Prename"],
                &["Ranking", "Int."],
                &["Ranking", "Nat."],
                &["Games", "Eff."],
                &["Games", "Tot."],
                &["Rating", "Delft", "2019-12-15", "1.0"],
                &["Rating", "Leiden", "2019-06-01", "0.98"],
            ],
            vec![
                vec![Some("Lee"), Some("Ann"), Some("1"), Some("1/NED"), Some("9.0"), Some("20"), Some("1250"), Some("1200")],
                vec![Some("Roe"), Some("Bo"), Some("-"), Some("-/BEL"), Some("2.0"), Some("4"), Some("unrated"), Some("1200")],
            ],
        )
    }

    #[test]
    fn rating_table_melts_into_lists_ratings_history() {
        let table = rating_table(&rating_raw()).unwrap();
        let places: Vec<&str> = table.lists.iter().map(|l| l.place.as_str()).collect();
        assert_eq!(places, vec!["Leiden", "Delft"]);

        let bo = &table.ratings.rows()[1];
        assert_eq!(bo.nat.as_deref(), Some("BEL"));
        assert_eq!((bo.r, bo.int_rank, bo.nat_rank), (None, None, None));
        assert_eq!(table.ratings.rows()[0].nat_rank, Some(1));

        // unrated cell dropped; equal ratings keep first-seen order
        let history: Vec<(&str, i64)> = table
            .history
            .iter()
            .map(|h| (h.place.as_str(), h.r))
            .collect();
        assert_eq!(history, vec![("Leiden", 1200), ("Leiden", 1200), ("Delft", 1250)]);
        assert_eq!(table.history.rows()[0].sur.as_deref(), Some("Lee"));
    }

    #[test]
    fn bad_cells_name_row_and_column() {
        let raw = RawTable::from_parts(
            &[&["eid"], &["date"], &["place"]],
            vec![vec![Some("1"), Some("someday"), Some("Delft")]],
        );
        let err = events(&raw).unwrap_err();
        assert!(matches!(err, ArchiveError::Cell { column: "date", row: 0, .. }));
    }

    #[test]
    fn integers_accept_whole_floats_in_range() {
        assert_eq!(parse_int(" 12 "), Some(12));
        assert_eq!(parse_int("3.0"), Some(3));
        assert_eq!(parse_int("3.5"), None);
        assert_eq!(parse_int("1e20"), None);
        assert_eq!(parse_int("-1e20"), None);
        assert_eq!(parse_int("inf"), None);
    }

    #[test]
    fn empty_tables_format_to_empty() {
        assert!(games(&RawTable::default()).unwrap().is_empty());
        assert!(rating_table(&RawTable::default()).unwrap().history.is_empty());
    }
}
