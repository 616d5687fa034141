use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::checks::{self, Check, desc_f64, desc_nulls_last};
use crate::error::{ArchiveError, Result};
use crate::format::{
    ActivityRow, Color, Event, FormattedDataset, GameRow, GroupRow, HistoryRow, ListRow,
    RatingRow, ResultRow, StandingRow, Tournament,
};
use crate::join::{Lookup, Multiplicity, left_join};
use crate::names::{self, Name};
use crate::params::MIN_EFF_GAMES;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: i64,
    pub event_id: i64,
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
pub struct Rating {
    pub player_id: i64,
    pub r: Option<i64>,
    pub int_rank: Option<i64>,
    pub nat_rank: Option<i64>,
    pub eff_games: f64,
    pub tot_games: i64,
}

/// A player's rating after an event (`rn`), the one after their previous
/// event (`ro`) and the difference.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    pub event_id: i64,
    pub player_id: i64,
    pub rn: i64,
    pub ro: Option<i64>,
    pub dr: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub event_id: i64,
    pub significance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub group_id: i64,
    pub player_id: i64,
    pub rank: i64,
    pub score: i64,
    pub median: f64,
    pub buchholz: f64,
    pub dmr_w: i64,
    pub dmr_n: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub player_id: i64,
    pub event_id: i64,
    pub eff_games: f64,
    pub rn: Option<i64>,
    pub ro: Option<i64>,
    pub dr: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameResult {
    pub group_id: i64,
    pub player_id_1: i64,
    /// 0 for a bye or a withdrawal.
    pub player_id_2: i64,
    pub round: i64,
    pub unplayed: bool,
    pub w: Option<f64>,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub event_id: i64,
    pub player_id_1: i64,
    pub player_id_2: i64,
    pub significance: f64,
    pub r_1: Option<i64>,
    pub r_2: Option<i64>,
    pub unplayed: Option<bool>,
    pub w: f64,
    pub we: f64,
    pub dw: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedDataset {
    pub tournaments: Table<Tournament>,
    pub events: Table<Event>,
    pub groups: Table<Group>,
    pub names: Table<Name>,
    pub ratings: Table<Rating>,
    pub history: Table<History>,
    pub lists: Table<List>,
    pub standings: Table<Standing>,
    pub activity: Table<Activity>,
    pub results: Table<GameResult>,
    pub games: Table<Game>,
}

impl NormalizedDataset {
    /// Re-run every output contract.
    pub fn verify(&self) -> Result<()> {
        verify_tournaments(&self.tournaments)?;
        verify_events(&self.events)?;
        verify_groups(&self.groups)?;
        names::verify(&self.names)?;
        verify_ratings(&self.ratings)?;
        verify_history(&self.history)?;
        verify_lists(&self.lists)?;
        verify_standings(&self.standings)?;
        rank_range(&self.standings, &self.groups).ensure()?;
        verify_activity(&self.activity)?;
        verify_results(&self.results)?;
        verify_games(&self.games)?;
        Ok(())
    }
}

pub fn normalize(formatted: FormattedDataset) -> Result<NormalizedDataset> {
    let FormattedDataset {
        tournaments: raw_tournaments,
        events: raw_events,
        groups: raw_groups,
        activity: raw_activity,
        standings: raw_standings,
        results: raw_results,
        names: raw_names,
        games: raw_games,
        lists: raw_lists,
        ratings: raw_ratings,
        history: raw_history,
    } = formatted;

    let tournaments = tournaments(raw_tournaments)?;
    let events = events(raw_events)?;
    let names = names::resolve(&raw_names, &raw_standings)?;
    let groups_lookup = group_lookup(&raw_groups)?;
    let groups = groups(raw_groups, &events)?;
    let ratings = ratings(&raw_ratings, &names)?;
    let history = history(&raw_history, &events, &names)?;
    let lists = lists(&raw_lists, &events)?;
    let standings = standings(&raw_standings, &groups_lookup, &groups, &names)?;
    let activity = activity(&raw_activity, &names)?;
    let results = results(raw_results, &groups_lookup, &standings)?;
    let games = games(&raw_games, &events, &names, &ratings)?;

    Ok(NormalizedDataset {
        tournaments,
        events,
        groups,
        names,
        ratings,
        history,
        lists,
        standings,
        activity,
        results,
        games,
    })
}

/// Normalizing an already normalized dataset: put every table in its
/// canonical order, renumber, and re-check. A fixed point on valid input.
pub fn renormalize(ds: NormalizedDataset) -> Result<NormalizedDataset> {
    let out = NormalizedDataset {
        tournaments: ds.tournaments.sort_by(|a, b| a.eid.cmp(&b.eid)).reset_index(),
        events: ds.events.sort_by(|a, b| a.id.cmp(&b.id)).reset_index(),
        groups: ds.groups.sort_by(|a, b| a.id.cmp(&b.id)).reset_index(),
        names: ds.names.sort_by(|a, b| a.id.cmp(&b.id)).reset_index(),
        ratings: ds.ratings.sort_by(rating_order).reset_index(),
        history: ds.history.sort_by(history_order).reset_index(),
        lists: ds.lists.sort_by(|a, b| a.event_id.cmp(&b.event_id)).reset_index(),
        standings: ds.standings.sort_by(standing_rank_order).reset_index(),
        activity: ds.activity.sort_by(activity_order).reset_index(),
        results: ds.results.reset_index(),
        games: ds.games.sort_by(game_order).reset_index(),
    };
    out.verify()?;
    Ok(out)
}

pub fn tournaments(rows: Table<Tournament>) -> Result<Table<Tournament>> {
    let rows = rows.reset_index();
    verify_tournaments(&rows)?;
    Ok(rows)
}

pub fn verify_tournaments(rows: &Table<Tournament>) -> Result<()> {
    checks::unique_key("tournaments", "unique_eid", rows.iter(), |t| t.eid).ensure()?;
    checks::sorted_by("tournaments", "sorted_by_eid", rows.rows(), |a, b| a.eid.cmp(&b.eid))
        .ensure()?;
    checks::dense_index("tournaments", rows).ensure()
}

pub fn events(rows: Table<Event>) -> Result<Table<Event>> {
    checks::unique_key("events", "unique_date_place", rows.iter(), |e| {
        (e.date, e.place.clone())
    })
    .ensure()?;
    let rows = rows.reset_index();
    verify_events(&rows)?;
    Ok(rows)
}

pub fn verify_events(rows: &Table<Event>) -> Result<()> {
    checks::unique_key("events", "unique_id", rows.iter(), |e| e.id).ensure()?;
    checks::sorted_by("events", "sorted_by_id", rows.rows(), |a, b| a.id.cmp(&b.id)).ensure()?;
    checks::dense_index("events", rows).ensure()
}

fn group_lookup(rows: &Table<GroupRow>) -> Result<Lookup<(i64, i64), i64>> {
    Lookup::unique(
        "groups",
        "group",
        rows.iter().map(|g| ((g.event_id, g.gid), g.id)),
    )
}

pub fn groups(rows: Table<GroupRow>, events: &Table<Event>) -> Result<Table<Group>> {
    let known: HashSet<i64> = events.iter().map(|e| e.id).collect();
    if let Some(orphan) = rows.iter().find(|g| !known.contains(&g.event_id)) {
        return Err(ArchiveError::schema(
            "groups",
            "known_event",
            format!("group {} refers to unknown event {}", orphan.id, orphan.event_id),
        ));
    }
    let rows = rows
        .map(|g| Group {
            id: g.id,
            event_id: g.event_id,
            name: g.name,
            group: g.group,
            score_w: g.score_w,
            score_d: g.score_d,
            score_l: g.score_l,
            m: g.m,
            n: g.n,
            file_from: g.file_from,
            file_date: g.file_date,
            file_name: g.file_name,
            remarks: g.remarks,
        })
        .reset_index();
    verify_groups(&rows)?;
    Ok(rows)
}

pub fn verify_groups(rows: &Table<Group>) -> Result<()> {
    checks::unique_key("groups", "unique_id", rows.iter(), |g| g.id).ensure()?;
    checks::sorted_by("groups", "sorted_by_id", rows.rows(), |a, b| a.id.cmp(&b.id)).ensure()?;
    checks::dense_index("groups", rows).ensure()
}

fn player_lookup(names: &Table<Name>) -> Result<Lookup<(Option<String>, Option<String>), i64>> {
    Lookup::unique("names", "player", names.iter().map(|n| (n.key(), n.id)))
}

fn player_nat_lookup(
    table: &'static str,
    names: &Table<Name>,
) -> Result<Lookup<(Option<String>, Option<String>, Option<String>), i64>> {
    Lookup::unique(
        table,
        "player",
        names
            .iter()
            .map(|n| ((n.pre.clone(), n.sur.clone(), n.nat.clone()), n.id)),
    )
}

/// International and national ranks are ordinal positions by `R`
/// (first-seen order on ties) among players with a known rating and
/// enough effective games; everyone else has neither.
pub fn rank_derivation(rows: &Table<RatingRow>) -> Check {
    let mut order: Vec<usize> = (0..rows.len())
        .filter(|i| {
            let row = &rows.rows()[*i];
            row.r.is_some() && row.eff_games >= MIN_EFF_GAMES
        })
        .collect();
    order.sort_by(|a, b| desc_nulls_last(&rows.rows()[*a].r, &rows.rows()[*b].r));

    let mut expected: HashMap<usize, (i64, i64)> = HashMap::new();
    let mut per_nat: HashMap<Option<&str>, i64> = HashMap::new();
    for (pos, i) in order.iter().enumerate() {
        let nat = per_nat.entry(rows.rows()[*i].nat.as_deref()).or_insert(0);
        *nat += 1;
        expected.insert(*i, (pos as i64 + 1, *nat));
    }

    for (i, row) in rows.iter().enumerate() {
        let (int_rank, nat_rank) = match expected.get(&i) {
            Some((int_rank, nat_rank)) => (Some(*int_rank), Some(*nat_rank)),
            None => (None, None),
        };
        if row.int_rank != int_rank || row.nat_rank != nat_rank {
            return Check::fail(
                "ratings",
                "rank_derivation",
                format!(
                    "{} {}: published ranks {:?}/{:?}, derived {:?}/{:?}",
                    row.pre.as_deref().unwrap_or_default(),
                    row.sur.as_deref().unwrap_or_default(),
                    row.int_rank,
                    row.nat_rank,
                    int_rank,
                    nat_rank
                ),
            );
        }
    }
    Check::pass("ratings", "rank_derivation")
}

pub fn ratings(rows: &Table<RatingRow>, names: &Table<Name>) -> Result<Table<Rating>> {
    checks::unique_key("ratings", "unique_pre_sur_nat", rows.iter(), |r| {
        (r.pre.clone(), r.sur.clone(), r.nat.clone())
    })
    .ensure()?;
    rank_derivation(rows).ensure()?;

    let players = player_lookup(names)?;
    let nats: HashMap<i64, Option<&str>> =
        names.iter().map(|n| (n.id, n.nat.as_deref())).collect();
    let mut out = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        let player_id = *players.require(&(row.pre.clone(), row.sur.clone()))?;
        if let Some(Some(nat)) = nats.get(&player_id)
            && row.nat.as_deref() != Some(*nat)
        {
            return Err(ArchiveError::schema(
                "ratings",
                "many_to_one",
                format!("player {player_id} is {nat} in standings, {:?} in ratings", row.nat),
            ));
        }
        out.push(Rating {
            player_id,
            r: row.r,
            int_rank: row.int_rank,
            nat_rank: row.nat_rank,
            eff_games: row.eff_games,
            tot_games: row.tot_games,
        });
    }
    let out = Table::from_rows(out);
    verify_ratings(&out)?;
    Ok(out)
}

fn rating_order(a: &Rating, b: &Rating) -> Ordering {
    desc_nulls_last(&a.r, &b.r)
}

pub fn verify_ratings(rows: &Table<Rating>) -> Result<()> {
    checks::unique_key("ratings", "unique_player_id", rows.iter(), |r| r.player_id).ensure()?;
    checks::sorted_by("ratings", "sorted_by_rating", rows.rows(), rating_order).ensure()?;
    checks::dense_index("ratings", rows).ensure()
}

fn event_lookup(table: &'static str, events: &Table<Event>) -> Result<Lookup<(NaiveDate, String), i64>> {
    Lookup::unique(
        table,
        "event",
        events.iter().map(|e| ((e.date, e.place.clone()), e.id)),
    )
}

pub fn history(
    rows: &Table<HistoryRow>,
    events: &Table<Event>,
    names: &Table<Name>,
) -> Result<Table<History>> {
    checks::unique_key("history", "unique_date_place_pre_sur", rows.iter(), |h| {
        (h.date, h.place.clone(), h.pre.clone(), h.sur.clone())
    })
    .ensure()?;
    let event_ids = event_lookup("history", events)?;
    let players = player_lookup(names)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        out.push(History {
            event_id: *event_ids.require(&(row.date, row.place.clone()))?,
            player_id: *players.require(&(row.pre.clone(), row.sur.clone()))?,
            rn: row.r,
            ro: None,
            dr: None,
        });
    }

    let mut order: Vec<usize> = (0..out.len()).collect();
    order.sort_by_key(|i| (out[*i].player_id, out[*i].event_id));
    let mut prev: Option<(i64, i64)> = None;
    for i in order {
        let row = &mut out[i];
        row.ro = match prev {
            Some((player_id, rn)) if player_id == row.player_id => Some(rn),
            _ => None,
        };
        let rn = row.rn;
        row.dr = row.ro.map(|ro| rn - ro);
        prev = Some((row.player_id, row.rn));
    }

    let out = Table::from_rows(out);
    verify_history(&out)?;
    Ok(out)
}

fn history_order(a: &History, b: &History) -> Ordering {
    a.event_id.cmp(&b.event_id).then(b.rn.cmp(&a.rn))
}

pub fn verify_history(rows: &Table<History>) -> Result<()> {
    checks::unique_key("history", "unique_event_player", rows.iter(), |h| {
        (h.event_id, h.player_id)
    })
    .ensure()?;
    checks::sorted_by("history", "sorted_by_event_rating", rows.rows(), history_order).ensure()?;
    checks::dense_index("history", rows).ensure()
}

pub fn lists(rows: &Table<ListRow>, events: &Table<Event>) -> Result<Table<List>> {
    checks::unique_key("lists", "unique_date_place", rows.iter(), |l| {
        (l.date, l.place.clone())
    })
    .ensure()?;
    let joined = left_join(
        "lists",
        Multiplicity::OneToOne,
        rows.rows(),
        events.rows(),
        |l| (l.date, l.place.clone()),
        |e| (e.date, e.place.clone()),
    )?;
    let mut out = Vec::with_capacity(joined.len());
    for (list, event) in joined {
        let Some(event) = event else {
            return Err(ArchiveError::schema(
                "lists",
                "unmatched_key",
                format!("no event for list {} {}", list.date, list.place),
            ));
        };
        out.push(List {
            event_id: event.id,
            significance: list.significance,
        });
    }
    let out = Table::from_rows(out);
    verify_lists(&out)?;
    Ok(out)
}

pub fn verify_lists(rows: &Table<List>) -> Result<()> {
    checks::unique_key("lists", "unique_event_id", rows.iter(), |l| l.event_id).ensure()?;
    checks::sorted_by("lists", "sorted_by_event_id", rows.rows(), |a, b| {
        a.event_id.cmp(&b.event_id)
    })
    .ensure()?;
    checks::dense_index("lists", rows).ensure()
}

pub fn standings(
    rows: &Table<StandingRow>,
    group_ids: &Lookup<(i64, i64), i64>,
    groups: &Table<Group>,
    names: &Table<Name>,
) -> Result<Table<Standing>> {
    checks::unique_key("standings", "unique_group_player_name", rows.iter(), |s| {
        (s.event_id, s.gid, s.pre.clone(), s.sur.clone(), s.nat.clone())
    })
    .ensure()?;
    let players = player_nat_lookup("standings", names)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        out.push(Standing {
            group_id: *group_ids.require(&(row.event_id, row.gid))?,
            player_id: *players.require(&(row.pre.clone(), row.sur.clone(), row.nat.clone()))?,
            rank: row.rank,
            score: row.score,
            median: row.median,
            buchholz: row.buchholz,
            dmr_w: row.dmr_w,
            dmr_n: row.dmr_n,
        });
    }
    let out = Table::from_rows(out);
    verify_standings(&out)?;
    rank_range(&out, groups).ensure()?;
    Ok(out)
}

/// Every group of `M` players ranks them exactly `1..=M`.
pub fn rank_range(rows: &Table<Standing>, groups: &Table<Group>) -> Check {
    let mut ranks: HashMap<i64, Vec<i64>> = groups.iter().map(|g| (g.id, Vec::new())).collect();
    for s in rows.iter() {
        match ranks.get_mut(&s.group_id) {
            Some(seen) => seen.push(s.rank),
            None => {
                return Check::fail(
                    "standings",
                    "rank_range",
                    format!("player {} is ranked in unknown group {}", s.player_id, s.group_id),
                );
            }
        }
    }
    for g in groups.iter() {
        let mut seen = ranks.remove(&g.id).unwrap_or_default();
        seen.sort_unstable();
        if !seen.iter().copied().eq(1..=g.m) {
            return Check::fail(
                "standings",
                "rank_range",
                format!("group {} has M = {} but ranks {seen:?}", g.id, g.m),
            );
        }
    }
    Check::pass("standings", "rank_range")
}

fn standing_rank_order(a: &Standing, b: &Standing) -> Ordering {
    a.group_id.cmp(&b.group_id).then(a.rank.cmp(&b.rank))
}

/// Within a group, descending tiebreak statistics.
fn standing_score_order(a: &Standing, b: &Standing) -> Ordering {
    a.group_id
        .cmp(&b.group_id)
        .then(b.score.cmp(&a.score))
        .then(desc_f64(a.median, b.median))
        .then(desc_f64(a.buchholz, b.buchholz))
        .then(b.dmr_w.cmp(&a.dmr_w))
}

pub fn verify_standings(rows: &Table<Standing>) -> Result<()> {
    checks::unique_key("standings", "unique_group_player", rows.iter(), |s| {
        (s.group_id, s.player_id)
    })
    .ensure()?;
    checks::unique_key("standings", "unique_group_rank", rows.iter(), |s| (s.group_id, s.rank))
        .ensure()?;
    checks::sorted_by("standings", "sorted_by_score", rows.rows(), standing_score_order)
        .ensure()?;
    checks::sorted_by("standings", "sorted_by_rank", rows.rows(), standing_rank_order).ensure()?;
    checks::dense_index("standings", rows).ensure()
}

pub fn activity(rows: &Table<ActivityRow>, names: &Table<Name>) -> Result<Table<Activity>> {
    checks::unique_key("activity", "unique_player_event", rows.iter(), |a| {
        (a.pre.clone(), a.sur.clone(), a.nat.clone(), a.event_id)
    })
    .ensure()?;
    let players = player_nat_lookup("activity", names)?;
    let mut out = Vec::with_capacity(rows.len());
    for row in rows.iter() {
        out.push(Activity {
            player_id: *players.require(&(row.pre.clone(), row.sur.clone(), row.nat.clone()))?,
            event_id: row.event_id,
            eff_games: row.eff_games,
            rn: row.rn,
            ro: row.ro,
            dr: row.dr,
        });
    }
    let out = Table::from_rows(out).sort_by(activity_order).reset_index();
    verify_activity(&out)?;
    Ok(out)
}

fn activity_order(a: &Activity, b: &Activity) -> Ordering {
    (a.player_id, a.event_id).cmp(&(b.player_id, b.event_id))
}

pub fn verify_activity(rows: &Table<Activity>) -> Result<()> {
    checks::unique_key("activity", "unique_player_event", rows.iter(), |a| {
        (a.player_id, a.event_id)
    })
    .ensure()?;
    checks::sorted_by("activity", "sorted_by_player_event", rows.rows(), activity_order)
        .ensure()?;
    checks::dense_index("activity", rows).ensure()
}

/// Resolve `(group, rank)` to a player on both sides of every result.
/// Rank 0 opponents become the sentinel player 0 instead of a lookup.
pub fn results(
    rows: Table<ResultRow>,
    groups: &Lookup<(i64, i64), i64>,
    standings: &Table<Standing>,
) -> Result<Table<GameResult>> {
    let by_rank = Lookup::unique(
        "results",
        "player at rank",
        standings.iter().map(|s| ((s.group_id, s.rank), s.player_id)),
    )?;
    let rows = rows.try_map(|_, row| -> Result<(i64, ResultRow)> {
        Ok((*groups.require(&(row.event_id, row.gid))?, row))
    })?;
    let (dummy, played) = rows.partition(|(_, row)| row.rank_2 == 0);
    debug!(byes = dummy.len(), games = played.len(), "split results on opponent rank");

    let played = played.try_map(|_, (group_id, row)| -> Result<GameResult> {
        Ok(GameResult {
            group_id,
            player_id_1: *by_rank.require(&(group_id, row.rank_1))?,
            player_id_2: *by_rank.require(&(group_id, row.rank_2))?,
            round: row.round,
            unplayed: row.unplayed,
            w: row.w,
            color: row.color,
        })
    })?;
    let dummy = dummy.try_map(|_, (group_id, row)| -> Result<GameResult> {
        Ok(GameResult {
            group_id,
            player_id_1: *by_rank.require(&(group_id, row.rank_1))?,
            player_id_2: 0,
            round: row.round,
            unplayed: row.unplayed,
            w: row.w,
            color: row.color,
        })
    })?;

    let out = played.concat_sorted(dummy);
    verify_results(&out)?;
    Ok(out)
}

pub fn verify_results(rows: &Table<GameResult>) -> Result<()> {
    checks::unique_key("results", "unique_group_player_round", rows.iter(), |r| {
        (r.group_id, r.player_id_1, r.round)
    })
    .ensure()?;
    checks::dense_index("results", rows).ensure()
}

/// The same game seen from the opponent's side.
pub fn mirror(game: &Game) -> Game {
    Game {
        event_id: game.event_id,
        player_id_1: game.player_id_2,
        player_id_2: game.player_id_1,
        significance: game.significance,
        r_1: game.r_2,
        r_2: game.r_1,
        unplayed: game.unplayed,
        w: 1.0 - game.w,
        we: 1.0 - game.we,
        dw: -game.dw,
    }
}

/// Key game rows by event and players. Games against an opponent the
/// archive does not name are only listed on the named side, so each gets a
/// mirrored row on the placeholder's side.
pub fn games(
    rows: &Table<GameRow>,
    events: &Table<Event>,
    names: &Table<Name>,
    ratings: &Table<Rating>,
) -> Result<Table<Game>> {
    let event_ids = event_lookup("games", events)?;
    let players = player_lookup(names)?;
    let placeholder = names::placeholder(names);
    let known: HashSet<i64> = names.iter().map(|n| n.id).collect();
    let current = Lookup::unique(
        "games",
        "rating",
        ratings.iter().map(|r| (r.player_id, r.r)),
    )?;

    let mut named = Vec::with_capacity(rows.len());
    let mut anonymous = Vec::new();
    for row in rows.iter() {
        if !known.contains(&row.player_id_1) {
            return Err(ArchiveError::schema(
                "games",
                "unmatched_key",
                format!("game page of unknown player {}", row.player_id_1),
            ));
        }
        let is_anonymous = row.pre_2.is_none() && row.sur_2.is_none();
        let player_id_2 = match (is_anonymous, placeholder) {
            (true, Some(id)) => id,
            (true, None) => {
                return Err(ArchiveError::schema(
                    "games",
                    "placeholder",
                    format!(
                        "player {} has an anonymous opponent but no placeholder name exists",
                        row.player_id_1
                    ),
                ));
            }
            (false, _) => *players.require(&(row.pre_2.clone(), row.sur_2.clone()))?,
        };
        let game = Game {
            event_id: *event_ids.require(&(row.date, row.place.clone()))?,
            player_id_1: row.player_id_1,
            player_id_2,
            significance: row.significance,
            r_1: current.get(&row.player_id_1).copied().flatten(),
            r_2: row.r_2,
            unplayed: row.unplayed,
            w: row.w,
            we: row.we,
            dw: row.dw,
        };
        if is_anonymous {
            anonymous.push(mirror(&game));
        }
        named.push(game);
    }
    if !anonymous.is_empty() {
        info!(mirrored = anonymous.len(), "materialized anonymous-opponent games");
    }

    named.extend(anonymous);
    let out = Table::from_rows(named).sort_by(game_order).reset_index();
    verify_games(&out)?;
    Ok(out)
}

fn game_order(a: &Game, b: &Game) -> Ordering {
    a.player_id_1
        .cmp(&b.player_id_1)
        .then(b.event_id.cmp(&a.event_id))
        .then(desc_nulls_last(&a.r_2, &b.r_2))
}

pub fn verify_games(rows: &Table<Game>) -> Result<()> {
    checks::sorted_by("games", "sorted_by_player_event_rating", rows.rows(), game_order)
        .ensure()?;
    checks::dense_index("games", rows).ensure()
}
