//! `controls` subcommand.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use flows2fim_core::{controls, flows, seeds, RatingCurvesDb};

/// Arguments of `flows2fim controls`.
#[derive(Args, Debug)]
#[command(group = clap::ArgGroup::new("seed_source").required(true).args(["seeds_csv", "sids"]))]
pub struct ControlsArgs {
    /// Path to the rating-curves database file
    #[arg(long, value_name = "FILE")]
    pub db: PathBuf,

    /// Path to the input flows CSV file
    #[arg(long = "f", value_name = "FLOWSFILE")]
    pub flows: PathBuf,

    /// Path to a seeds CSV file: reach_id,<stage|nd>
    #[arg(long = "scsv", value_name = "FILE", conflicts_with_all = ["sids", "scs"])]
    pub seeds_csv: Option<PathBuf>,

    /// Comma-separated starting reach ids
    #[arg(long, value_name = "IDS", requires = "scs")]
    pub sids: Option<String>,

    /// Comma-separated starting control stages; a single `nd` broadcasts to all ids
    #[arg(long, value_name = "STAGES", requires = "sids")]
    pub scs: Option<String>,

    /// Path to the output controls CSV file
    #[arg(long = "o", value_name = "OUT")]
    pub output: PathBuf,
}

pub fn run(args: &ControlsArgs) -> Result<()> {
    let flows = flows::read_flows(&args.flows)
        .with_context(|| format!("reading flows file {}", args.flows.display()))?;

    let seeds = match (&args.seeds_csv, &args.sids, &args.scs) {
        (Some(path), _, _) => seeds::from_file(path)
            .with_context(|| format!("reading seeds file {}", path.display()))?,
        (None, Some(sids), Some(scs)) => seeds::from_lists(sids, scs)?,
        _ => unreachable!("clap enforces the seed source group"),
    };

    let db = RatingCurvesDb::open(&args.db)?;
    let results = controls::select_controls(&db, &flows, &seeds)?;
    controls::write_controls(&args.output, &results)
        .with_context(|| format!("writing controls file {}", args.output.display()))?;

    println!(
        "{} {} rows at {}",
        "Controls table created:".green(),
        results.len(),
        args.output.display()
    );
    Ok(())
}
