//! `validate` subcommand.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use flows2fim_core::validate::{self, ValidateOptions};
use flows2fim_core::{scan, RatingCurvesDb};

/// Arguments of `flows2fim validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the rating-curves database file
    #[arg(long, value_name = "FILE")]
    pub db: PathBuf,

    /// FIM library root: a directory or a GDAL /vsi prefix
    #[arg(long, value_name = "DIR")]
    pub lib: String,

    /// Output CSV for rating-curve rows missing FIM rasters
    #[arg(long = "o_fims", value_name = "FILE", default_value = "missing_fims.csv")]
    pub o_fims: PathBuf,

    /// Output CSV for FIM rasters missing rating-curve rows
    #[arg(
        long = "o_rcs",
        value_name = "FILE",
        default_value = "missing_rating_curves.csv"
    )]
    pub o_rcs: PathBuf,

    /// Number of reach directories scanned concurrently
    #[arg(long, value_name = "N", default_value_t = scan::DEFAULT_CONCURRENCY)]
    pub cc: usize,

    /// Do not create a report whose diff is empty
    #[arg(long = "skip_empty")]
    pub skip_empty: bool,
}

pub fn run(args: &ValidateArgs) -> Result<()> {
    let db = RatingCurvesDb::open(&args.db)?;
    let options = ValidateOptions {
        concurrency: args.cc,
        skip_empty: args.skip_empty,
        missing_fims_path: args.o_fims.clone(),
        missing_rating_curves_path: args.o_rcs.clone(),
    };

    let summary = validate::run(db, &args.lib, &options)?;

    println!("{}", "Validation complete".green());
    println!("Library entries scanned: {}", summary.entries);
    match summary.missing_fims {
        Some(rows) => println!(
            "Missing FIMs file created at: {} ({rows} rows)",
            args.o_fims.display()
        ),
        None => println!("No missing FIMs, report skipped"),
    }
    match summary.missing_rating_curves {
        Some(rows) => println!(
            "Missing rating curves file created at: {} ({rows} rows)",
            args.o_rcs.display()
        ),
        None => println!("No missing rating curves, report skipped"),
    }
    Ok(())
}
