use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use rating_archive::config::Config;
use rating_archive::raw::RawDataset;
use rating_archive::{pipeline, store};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let config = Config::from_env_and_args();
    let raw = RawDataset::load(&config.raw_path)
        .with_context(|| format!("load raw tables {}", config.raw_path.display()))?;

    let reduced = pipeline::run(&raw).context("normalize archive")?;

    let mut conn = store::open_db(&config.db_path)
        .with_context(|| format!("open sqlite db {}", config.db_path.display()))?;
    let summary = store::write_dataset(&mut conn, &reduced).context("write archive")?;

    println!("Archive normalized");
    println!("Raw: {}", config.raw_path.display());
    println!("DB: {}", config.db_path.display());
    println!("Run: {}", summary.run_id);
    for (table, rows) in &summary.tables {
        println!("{table:<12} {rows:>8}");
    }
    println!("{:<12} {:>8}", "total", summary.total());
    Ok(())
}
