//! Allocate command: candidate selection and capital split.

use anyhow::{Context, Result};
use std::path::Path;
use trailguard_allocator::allocate;
use trailguard_config::load_config;
use trailguard_core::types::Candidate;

use crate::cli::AllocateArgs;

pub async fn run(args: AllocateArgs, config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;

    let raw = std::fs::read_to_string(&args.candidates)
        .with_context(|| format!("failed to read {:?}", args.candidates))?;
    let candidates: Vec<Candidate> =
        serde_json::from_str(&raw).context("candidate file is not a JSON array of candidates")?;

    let trades = allocate(&candidates, args.capital, &config.allocator);

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&trades)?);
        return Ok(());
    }

    if trades.is_empty() {
        println!("No candidates passed the filters.");
        return Ok(());
    }

    println!(
        "{} of {} candidates funded from a budget of {}:",
        trades.len(),
        candidates.len(),
        args.capital
    );
    println!("{:<10} {:<12} {:>10} {:>14}", "TICKER", "ASSET", "SCORE", "CAPITAL");
    for trade in &trades {
        println!(
            "{:<10} {:<12} {:>10.4} {:>14}",
            trade.candidate.ticker, trade.candidate.asset_type, trade.score, trade.allocated_capital
        );
    }

    Ok(())
}
