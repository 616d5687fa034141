use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use tracing::info;

use crate::checks::{self, Agreement};
use crate::error::Result;
use crate::format::{Event, Tournament};
use crate::names::{self, Name};
use crate::normalize::{Activity, Game, GameResult, Group, History, List, NormalizedDataset, Rating, Standing};
use crate::params::{PUBLISHED_ATOL, PUBLISHED_RTOL, SIGNIFICANCE_RTOL};
use crate::significance::significance;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupFormat {
    Rr1,
    Rr2,
    Rrx,
    Ss,
}

impl GroupFormat {
    pub fn classify(m: i64, n: i64) -> Self {
        let single = m - 1 + m % 2;
        if n == single {
            GroupFormat::Rr1
        } else if n == 2 * single {
            GroupFormat::Rr2
        } else if n >= m {
            GroupFormat::Rrx
        } else {
            GroupFormat::Ss
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GroupFormat::Rr1 => "RR1",
            GroupFormat::Rr2 => "RR2",
            GroupFormat::Rrx => "RRX",
            GroupFormat::Ss => "SS",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReducedGroup {
    pub group: Group,
    pub format: GroupFormat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReducedRating {
    pub player_id: i64,
    pub r: Option<i64>,
    pub eff_games: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReducedActivity {
    pub player_id: i64,
    pub event_id: i64,
    pub eff_games: f64,
}

/// Expected score of `player_id_1` against `player_id_2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Expected {
    pub player_id_1: i64,
    pub player_id_2: i64,
    pub we: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducedDataset {
    pub tournaments: Table<Tournament>,
    pub events: Table<Event>,
    pub groups: Table<ReducedGroup>,
    pub names: Table<Name>,
    pub ratings: Table<ReducedRating>,
    pub history: Table<History>,
    pub dates: Table<List>,
    pub standings: Table<Standing>,
    pub results: Table<GameResult>,
    pub activity: Table<ReducedActivity>,
    pub expected: Table<Expected>,
}

pub fn reduce(ds: NormalizedDataset) -> Result<ReducedDataset> {
    significance_events_lists(&ds.events, &ds.lists).ensure()?;
    significance_events_games(&ds.events, &ds.games).ensure()?;
    significance_lists_games(&ds.lists, &ds.games).ensure()?;
    ratings_in_games(&ds.ratings, &ds.games, &ds.names).ensure()?;
    results_games(&ds.results, &ds.groups, &ds.games).ensure()?;
    tot_games(&ds.ratings, &ds.results).ensure()?;
    history_activity(&ds.activity, &ds.history).ensure()?;

    let expected = expected(&ds.games)?;
    let out = ReducedDataset {
        tournaments: ds.tournaments,
        events: ds.events,
        groups: ds.groups.map(|group| ReducedGroup {
            format: GroupFormat::classify(group.m, group.n),
            group,
        }),
        names: ds.names,
        ratings: ds.ratings.map(|r| ReducedRating {
            player_id: r.player_id,
            r: r.r,
            eff_games: r.eff_games,
        }),
        history: ds.history,
        dates: ds.lists,
        standings: ds.standings,
        results: ds.results,
        activity: ds.activity.map(|a| ReducedActivity {
            player_id: a.player_id,
            event_id: a.event_id,
            eff_games: a.eff_games,
        }),
        expected,
    };
    info!(
        events = out.events.len(),
        players = out.names.len(),
        results = out.results.len(),
        expected = out.expected.len(),
        "reduced archive"
    );
    Ok(out)
}

fn base_date(events: &Table<Event>) -> Option<NaiveDate> {
    events.iter().map(|e| e.date).max()
}

fn event_dates(events: &Table<Event>) -> HashMap<i64, NaiveDate> {
    events.iter().map(|e| (e.id, e.date)).collect()
}

pub fn significance_events_lists(events: &Table<Event>, lists: &Table<List>) -> Agreement {
    let agreement = Agreement::new("significance", "events", "lists");
    let Some(base) = base_date(events) else {
        return agreement;
    };
    let listed: HashSet<i64> = lists.iter().map(|l| l.event_id).collect();
    let unlisted: Vec<i64> = events
        .iter()
        .map(|e| e.id)
        .filter(|id| !listed.contains(id))
        .collect();
    if !unlisted.is_empty() {
        return agreement.with_failure(Some(format!("events without a rating list: {unlisted:?}")));
    }

    let dates = event_dates(events);
    let failure = lists.iter().find_map(|l| {
        let Some(date) = dates.get(&l.event_id) else {
            return Some(format!("rating list refers to unknown event {}", l.event_id));
        };
        let computed = significance(base, *date);
        (!checks::is_close(computed, l.significance, SIGNIFICANCE_RTOL, 0.0)).then(|| {
            format!(
                "event {}: computed {computed}, published {}",
                l.event_id, l.significance
            )
        })
    });
    agreement.with_failure(failure)
}

pub fn significance_events_games(events: &Table<Event>, games: &Table<Game>) -> Agreement {
    let agreement = Agreement::new("significance", "events", "games");
    let Some(base) = base_date(events) else {
        return agreement;
    };
    let dates = event_dates(events);
    let failure = games.iter().find_map(|g| {
        let Some(date) = dates.get(&g.event_id) else {
            return Some(format!("game row refers to unknown event {}", g.event_id));
        };
        let computed = significance(base, *date);
        (!checks::is_close(computed, g.significance, SIGNIFICANCE_RTOL, 0.0)).then(|| {
            format!(
                "event {} (player {}): computed {computed}, game row {}",
                g.event_id, g.player_id_1, g.significance
            )
        })
    });
    agreement.with_failure(failure)
}

/// The two published copies: one value per event in the game rows, equal to the list's.
pub fn significance_lists_games(lists: &Table<List>, games: &Table<Game>) -> Agreement {
    let agreement = Agreement::new("significance", "lists", "games");
    let published: HashMap<i64, f64> = lists.iter().map(|l| (l.event_id, l.significance)).collect();
    let mut per_event: BTreeMap<i64, f64> = BTreeMap::new();
    for g in games.iter() {
        match per_event.get(&g.event_id) {
            Some(seen) if seen.to_bits() != g.significance.to_bits() => {
                return agreement.with_failure(Some(format!(
                    "event {} carries significance {seen} and {} in game rows",
                    g.event_id, g.significance
                )));
            }
            Some(_) => {}
            None => {
                per_event.insert(g.event_id, g.significance);
            }
        }
    }
    let failure = per_event.iter().find_map(|(event_id, from_games)| match published.get(event_id) {
        None => Some(format!("event {event_id} has game rows but no rating list")),
        Some(from_list) if !checks::is_close(*from_games, *from_list, PUBLISHED_RTOL, PUBLISHED_ATOL) => {
            Some(format!("event {event_id}: list {from_list}, games {from_games}"))
        }
        Some(_) => None,
    });
    agreement.with_failure(failure)
}

// the anonymous placeholder has no rating to compare
pub fn ratings_in_games(ratings: &Table<Rating>, games: &Table<Game>, names: &Table<Name>) -> Agreement {
    let agreement = Agreement::new("current_rating", "games", "ratings");
    let placeholder = names::placeholder(names);
    let current: HashMap<i64, Option<i64>> = ratings.iter().map(|r| (r.player_id, r.r)).collect();
    let rating_of = |player_id: i64| current.get(&player_id).copied().flatten();
    let failure = games.iter().find_map(|g| {
        [(g.player_id_1, g.r_1), (g.player_id_2, g.r_2)]
            .into_iter()
            .filter(|(player_id, _)| Some(*player_id) != placeholder)
            .find(|(player_id, r)| rating_of(*player_id) != *r)
            .map(|(player_id, r)| {
                format!(
                    "player {player_id} in event {}: game row {r:?}, ratings {:?}",
                    g.event_id,
                    rating_of(player_id)
                )
            })
    });
    agreement.with_failure(failure)
}

// (event, player 1, player 2, W bits)
type Outcome = (i64, i64, i64, u64);

fn take(counts: &mut BTreeMap<(Outcome, bool), usize>, key: &(Outcome, bool)) -> bool {
    match counts.get_mut(key) {
        Some(n) if *n > 0 => {
            *n -= 1;
            true
        }
        _ => false,
    }
}

/// Game rows with an unknown `unplayed` flag match a cross-table game of
/// either kind, after the flagged rows have taken theirs.
pub fn results_games(results: &Table<GameResult>, groups: &Table<Group>, games: &Table<Game>) -> Agreement {
    let agreement = Agreement::new("results", "cross_table", "games");
    let events: HashMap<i64, i64> = groups.iter().map(|g| (g.id, g.event_id)).collect();

    let mut cross_table: BTreeMap<(Outcome, bool), usize> = BTreeMap::new();
    let mut played = 0usize;
    for r in results.iter().filter(|r| r.player_id_2 != 0) {
        let (Some(event_id), Some(w)) = (events.get(&r.group_id), r.w) else {
            return agreement.with_failure(Some(format!(
                "result of player {} in group {} round {} has no event or no decision",
                r.player_id_1, r.group_id, r.round
            )));
        };
        let outcome = (*event_id, r.player_id_1, r.player_id_2, w.to_bits());
        *cross_table.entry((outcome, r.unplayed)).or_insert(0) += 1;
        played += 1;
    }
    if played != games.len() {
        return agreement.with_failure(Some(format!(
            "{played} games in the cross-table, {} in game rows",
            games.len()
        )));
    }

    let outcome_of = |g: &Game| (g.event_id, g.player_id_1, g.player_id_2, g.w.to_bits());
    let describe = |g: &Game| {
        format!(
            "game row event {} players {}-{} W {} unplayed {:?} has no cross-table counterpart",
            g.event_id, g.player_id_1, g.player_id_2, g.w, g.unplayed
        )
    };
    for g in games.iter() {
        if let Some(flag) = g.unplayed
            && !take(&mut cross_table, &(outcome_of(g), flag))
        {
            return agreement.with_failure(Some(describe(g)));
        }
    }
    for g in games.iter().filter(|g| g.unplayed.is_none()) {
        let outcome = outcome_of(g);
        if !take(&mut cross_table, &(outcome, false)) && !take(&mut cross_table, &(outcome, true)) {
            return agreement.with_failure(Some(describe(g)));
        }
    }
    agreement
}

/// Games actually contested per player: not unplayed, not against the sentinel.
pub fn counted_games(results: &Table<GameResult>) -> HashMap<i64, i64> {
    let mut counts = HashMap::new();
    for r in results.iter().filter(|r| !r.unplayed && r.player_id_2 != 0) {
        *counts.entry(r.player_id_1).or_insert(0) += 1;
    }
    counts
}

pub fn tot_games(ratings: &Table<Rating>, results: &Table<GameResult>) -> Agreement {
    let agreement = Agreement::new("tot_games", "results", "ratings");
    let counts = counted_games(results);
    let failure = ratings.iter().find_map(|r| {
        let counted = counts.get(&r.player_id).copied().unwrap_or(0);
        (counted != r.tot_games).then(|| {
            format!(
                "player {}: {counted} counted, {} published",
                r.player_id, r.tot_games
            )
        })
    });
    agreement.with_failure(failure)
}

pub fn history_activity(activity: &Table<Activity>, history: &Table<History>) -> Agreement {
    let agreement = Agreement::new("rating_history", "activity", "history");
    let by_key: HashMap<(i64, i64), &History> = history
        .iter()
        .map(|h| ((h.event_id, h.player_id), h))
        .collect();
    let failure = activity.iter().find_map(|a| {
        let found = by_key.get(&(a.event_id, a.player_id));
        match (a.rn, found) {
            (None, None) => None,
            (None, Some(h)) => Some(format!(
                "player {} event {}: unrated in activity, {} in history",
                a.player_id, a.event_id, h.rn
            )),
            (Some(rn), None) => Some(format!(
                "player {} event {}: rated {rn} in activity, missing from history",
                a.player_id, a.event_id
            )),
            (Some(rn), Some(h)) if (Some(rn), a.ro, a.dr) != (Some(h.rn), h.ro, h.dr) => Some(format!(
                "player {} event {}: activity {:?}/{:?}/{:?}, history {}/{:?}/{:?}",
                a.player_id, a.event_id, a.rn, a.ro, a.dr, h.rn, h.ro, h.dr
            )),
            (Some(_), Some(_)) => None,
        }
    });
    agreement.with_failure(failure)
}

/// Reduce game rows to one expected score per ordered pair of players.
pub fn expected(games: &Table<Game>) -> Result<Table<Expected>> {
    let mut seen = HashSet::new();
    let mut rows: Vec<Expected> = games
        .iter()
        .filter(|g| seen.insert((g.player_id_1, g.player_id_2, g.we.to_bits())))
        .map(|g| Expected {
            player_id_1: g.player_id_1,
            player_id_2: g.player_id_2,
            we: g.we,
        })
        .collect();
    rows.sort_by_key(|e| (e.player_id_1, e.player_id_2));
    let rows = Table::from_rows(rows);
    checks::unique_key("expected", "unique_pair", rows.iter(), |e| {
        (e.player_id_1, e.player_id_2)
    })
    .ensure()?;
    checks::dense_index("expected", &rows).ensure()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_formats() {
        assert_eq!(GroupFormat::classify(5, 5), GroupFormat::Rr1);
        assert_eq!(GroupFormat::classify(5, 10), GroupFormat::Rr2);
        assert_eq!(GroupFormat::classify(5, 7), GroupFormat::Rrx);
        assert_eq!(GroupFormat::classify(8, 7), GroupFormat::Ss);
        assert_eq!(GroupFormat::classify(6, 5).as_str(), "RR1");
    }

    fn result(player_id_1: i64, player_id_2: i64, round: i64, unplayed: bool) -> GameResult {
        GameResult {
            group_id: 0,
            player_id_1,
            player_id_2,
            round,
            unplayed,
            w: Some(1.0),
            color: None,
        }
    }

    fn rating(player_id: i64, tot_games: i64) -> Rating {
        Rating {
            player_id,
            r: Some(1200),
            int_rank: None,
            nat_rank: None,
            eff_games: 1.0,
            tot_games,
        }
    }

    #[test]
    fn tot_games_skips_unplayed_and_byes() {
        let results = Table::from_rows(vec![
            result(1, 2, 1, false),
            result(1, 0, 2, true),
            result(1, 3, 3, true),
            result(2, 1, 1, false),
        ]);
        let ratings = Table::from_rows(vec![rating(1, 1), rating(2, 1), rating(3, 0)]);
        assert!(tot_games(&ratings, &results).passed());

        let wrong = Table::from_rows(vec![rating(1, 3)]);
        let err = tot_games(&wrong, &results).ensure().unwrap_err();
        assert!(err.to_string().contains("tot_games disagrees between results and ratings"));
    }

    fn one_group(m: i64, n: i64) -> Table<Group> {
        Table::from_rows(vec![Group {
            id: 0,
            event_id: 1,
            name: "A".into(),
            group: None,
            score_w: 2,
            score_d: 1,
            score_l: 0,
            m,
            n,
            file_from: None,
            file_date: None,
            file_name: None,
            remarks: None,
        }])
    }

    fn game(player_id_1: i64, player_id_2: i64, we: f64) -> Game {
        Game {
            event_id: 1,
            player_id_1,
            player_id_2,
            significance: 1.0,
            r_1: None,
            r_2: None,
            unplayed: None,
            w: 1.0,
            we,
            dw: 1.0 - we,
        }
    }

    #[test]
    fn expected_deduplicates_and_sorts_pairs() {
        let games = Table::from_rows(vec![game(2, 1, 0.4), game(1, 2, 0.6), game(1, 2, 0.6)]);
        let out = expected(&games).unwrap();
        let pairs: Vec<(i64, i64)> = out.iter().map(|e| (e.player_id_1, e.player_id_2)).collect();
        assert_eq!(pairs, vec![(1, 2), (2, 1)]);
    }

    #[test]
    fn conflicting_expected_scores_are_fatal() {
        let games = Table::from_rows(vec![game(1, 2, 0.6), game(1, 2, 0.55)]);
        assert!(expected(&games).is_err());
    }

    #[test]
    fn unknown_unplayed_flag_matches_either_way() {
        let groups = one_group(2, 1);
        let results = Table::from_rows(vec![result(1, 2, 1, true), result(1, 0, 2, true)]);
        let games = Table::from_rows(vec![game(1, 2, 0.5)]);
        assert!(results_games(&results, &groups, &games).passed());

        let mut flagged = game(1, 2, 0.5);
        flagged.unplayed = Some(false);
        let games = Table::from_rows(vec![flagged]);
        assert!(!results_games(&results, &groups, &games).passed());
    }

    #[test]
    fn flagged_forfeit_keeps_its_own_cross_table_row() {
        let groups = one_group(2, 2);
        let results = Table::from_rows(vec![result(1, 2, 1, false), result(1, 2, 2, true)]);

        let mut forfeit = game(1, 2, 0.5);
        forfeit.unplayed = Some(true);
        let games = Table::from_rows(vec![game(1, 2, 0.5), forfeit.clone()]);
        assert!(results_games(&results, &groups, &games).passed());

        let games = Table::from_rows(vec![forfeit.clone(), forfeit]);
        assert!(!results_games(&results, &groups, &games).passed());
    }

    #[test]
    fn activity_must_match_history() {
        let activity = Table::from_rows(vec![
            Activity { player_id: 1, event_id: 1, eff_games: 2.0, rn: Some(1200), ro: None, dr: None },
            Activity { player_id: 2, event_id: 1, eff_games: 0.0, rn: None, ro: None, dr: None },
        ]);
        let history = Table::from_rows(vec![History { event_id: 1, player_id: 1, rn: 1200, ro: None, dr: None }]);
        assert!(history_activity(&activity, &history).passed());

        let drifted = Table::from_rows(vec![History { event_id: 1, player_id: 1, rn: 1210, ro: None, dr: None }]);
        assert!(!history_activity(&activity, &drifted).passed());
    }
}
