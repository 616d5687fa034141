use std::fmt;
use std::time::Instant;

use tracing::info;

use crate::error::Result;
use crate::format::{self, FormattedDataset};
use crate::normalize::{self, NormalizedDataset};
use crate::raw::RawDataset;
use crate::reduce::{self, ReducedDataset};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Format,
    Normalize,
    Reduce,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Format => "format",
            Stage::Normalize => "normalize",
            Stage::Reduce => "reduce",
        })
    }
}

fn timed<T>(stage: Stage, run: impl FnOnce() -> Result<T>, rows: impl Fn(&T) -> usize) -> Result<T> {
    let started = Instant::now();
    let out = run()?;
    info!(
        %stage,
        rows = rows(&out),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "stage finished"
    );
    Ok(out)
}

pub fn format_stage(raw: &RawDataset) -> Result<FormattedDataset> {
    timed(Stage::Format, || format::format_dataset(raw), |f: &FormattedDataset| {
        f.names.len() + f.standings.len() + f.results.len() + f.games.len() + f.history.len()
    })
}

pub fn normalize_stage(formatted: FormattedDataset) -> Result<NormalizedDataset> {
    timed(Stage::Normalize, || normalize::normalize(formatted), |n: &NormalizedDataset| {
        n.names.len() + n.standings.len() + n.results.len() + n.games.len() + n.history.len()
    })
}

pub fn reduce_stage(normalized: NormalizedDataset) -> Result<ReducedDataset> {
    timed(Stage::Reduce, || reduce::reduce(normalized), |r: &ReducedDataset| {
        table_counts(r).iter().map(|(_, n)| n).sum()
    })
}

/// Raw tables to the reduced archive.
pub fn run(raw: &RawDataset) -> Result<ReducedDataset> {
    let formatted = format_stage(raw)?;
    let normalized = normalize_stage(formatted)?;
    reduce_stage(normalized)
}

/// Stops before reduction, with every redundant copy still present.
pub fn run_to_normalized(raw: &RawDataset) -> Result<NormalizedDataset> {
    normalize_stage(format_stage(raw)?)
}

/// Row count per persisted table, in write order.
pub fn table_counts(ds: &ReducedDataset) -> [(&'static str, usize); 11] {
    [
        ("tournaments", ds.tournaments.len()),
        ("events", ds.events.len()),
        ("groups", ds.groups.len()),
        ("names", ds.names.len()),
        ("ratings", ds.ratings.len()),
        ("history", ds.history.len()),
        ("dates", ds.dates.len()),
        ("standings", ds.standings.len()),
        ("results", ds.results.len()),
        ("activity", ds.activity.len()),
        ("expected", ds.expected.len()),
    ]
}
