//! Command handlers
//!
//! poolcast check    - detect a new period (exit code signal)
//! poolcast current  - show the period on sale
//! poolcast listing  - show a period's matches
//! poolcast fuse     - fuse basic + advanced estimates into a report
//! poolcast strength - score common-opponent strength for a period
//! poolcast log      - show recorded observations

use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::adapters::{
    DocumentStore, FixedPeriodSource, FsDocumentStore, HttpPeriodSource, PeriodListing,
    PeriodSource,
};
use crate::config::AppConfig;
use crate::error::{PoolcastError, Result};
use crate::fusion::WeightingPolicy;
use crate::services::{
    run_period_check, FusionJob, FusionJobOutput, StrengthJob, StrengthJobOutput,
};
use crate::tracker::{PeriodCheck, PeriodTracker, TrackerSettings};

fn open_store(config: &AppConfig) -> Arc<dyn DocumentStore> {
    Arc::new(FsDocumentStore::new(config.storage.root_dir.clone()))
}

fn open_tracker(config: &AppConfig, store: Arc<dyn DocumentStore>) -> PeriodTracker {
    PeriodTracker::new(store, TrackerSettings::from_config(config))
}

/// Fetch and track. Never fails; provider setup errors count as no signal.
pub async fn run_check(config: &AppConfig, period: Option<&str>) -> PeriodCheck {
    let source: Box<dyn PeriodSource> = match period {
        Some(p) => Box::new(FixedPeriodSource(Some(p.to_string()))),
        None => match HttpPeriodSource::new(&config.provider) {
            Ok(source) => Box::new(source),
            Err(e) => {
                warn!(error = %e, "provider client unavailable");
                Box::new(FixedPeriodSource(None))
            }
        },
    };

    let tracker = open_tracker(config, open_store(config));
    let deadline = Duration::from_secs(config.provider.timeout_secs);
    let check = run_period_check(source.as_ref(), &tracker, deadline).await;

    match (&check.current_period, check.has_new_period) {
        (Some(p), true) => println!("\x1b[32m✓ New period: {}\x1b[0m", p),
        (Some(p), false) => println!("  No new period (current: {})", p),
        (None, _) => match check.local_number {
            Some(n) => println!("  No upstream signal; local data up to period {}", n),
            None => println!("  No upstream signal"),
        },
    }

    check
}

pub async fn run_current(config: &AppConfig) -> Result<Option<String>> {
    let source = HttpPeriodSource::new(&config.provider)?;
    let period = source.fetch_current_period().await;
    match &period {
        Some(p) => println!("{}", p),
        None => println!("unavailable"),
    }
    Ok(period)
}

pub async fn run_listing(config: &AppConfig, period: Option<&str>) -> Result<PeriodListing> {
    let source = HttpPeriodSource::new(&config.provider)?;
    let listing = source.fetch_period_listing(period).await?;

    println!("\n===== {} =====", listing.period);
    for m in &listing.matches {
        println!(
            "{:>2}. [{}] {} ({}) vs {} ({})  {}",
            m.order, m.league, m.home_team, m.home_rank, m.away_team, m.away_rank, m.kickoff
        );
    }
    println!();

    Ok(listing)
}

pub fn run_fuse(
    config: &AppConfig,
    period: Option<&str>,
    weighting: Option<WeightingPolicy>,
    discount: Option<f64>,
) -> Result<FusionJobOutput> {
    let mut config = config.clone();
    if let Some(w) = weighting {
        config.fusion.weighting = w;
    }
    if let Some(d) = discount {
        config.fusion.basic_discount = d;
    }
    config
        .validate()
        .map_err(|errors| PoolcastError::Validation(errors.join("; ")))?;

    let store = open_store(&config);
    let tracker = open_tracker(&config, store.clone());
    let job = FusionJob::from_config(store, &config);

    let period_number = job.resolve_period(period, Some(&tracker))?;
    let output = job.run(period_number)?;
    let report = &output.report;

    println!(
        "\n  Period {} | weighting {} (basic x{})",
        report.period, report.weighting, report.basic_discount
    );
    for m in &report.matches {
        let p = &m.fused_probabilities;
        println!(
            "  {:>3} {} vs {}  {:.2}% / {:.2}% / {:.2}%  -> {}",
            m.match_id,
            m.home_team,
            m.away_team,
            p.win * 100.0,
            p.draw * 100.0,
            p.loss * 100.0,
            m.outcome
        );
    }
    for w in &report.warnings {
        println!("  \x1b[33m⚠ {}\x1b[0m", w);
    }
    println!("  Ticket: {}", report.ticket());
    println!("  Saved: {}\n", output.output_key);

    Ok(output)
}

pub fn run_strength(
    config: &AppConfig,
    period: Option<&str>,
    as_of: Option<NaiveDate>,
) -> Result<StrengthJobOutput> {
    let store = open_store(config);
    let tracker = open_tracker(config, store.clone());
    let job = StrengthJob::from_config(store, config);

    let period_number = job.resolve_period(period, Some(&tracker))?;
    let as_of = as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    let output = job.run(period_number, as_of)?;
    let doc = &output.document;

    println!("\n  Period {} | as of {}", doc.period, doc.as_of);
    for r in &doc.results {
        match &r.error {
            Some(reason) => println!(
                "  {:>3} {} vs {}  \x1b[33m{}\x1b[0m",
                r.match_id, r.home_team, r.away_team, reason
            ),
            None => println!(
                "  {:>3} {} vs {}  common {}  {:.3} / {:.3}  ratio {:.3} / {:.3}",
                r.match_id,
                r.home_team,
                r.away_team,
                r.common_opponents,
                r.home_total,
                r.away_total,
                r.home_ratio,
                r.away_ratio
            ),
        }
    }
    println!(
        "  Scored {}/{} matches",
        doc.scored_matches(),
        doc.results.len()
    );
    println!("  Saved: {}\n", output.output_key);

    Ok(output)
}

pub fn show_log(config: &AppConfig, limit: usize) -> Result<()> {
    let tracker = open_tracker(config, open_store(config));
    let observations = tracker.observations()?;

    if observations.is_empty() {
        println!("  No observations recorded");
        return Ok(());
    }

    let start = observations.len().saturating_sub(limit);
    for obs in &observations[start..] {
        println!(
            "  {:<12} {:>8}  {}",
            obs.period_token().unwrap_or_else(|| "-".to_string()),
            obs.resolved_number(),
            obs.timestamp.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
