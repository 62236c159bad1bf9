//! flows2fim CLI.
//!
//! Usage:
//!   `flows2fim controls --db reach_data.db --f flows_100yr.csv --sids 8489318 --scs nd --o controls.csv`
//!   `flows2fim fim --lib ./library --c controls.csv --o fim.vrt`
//!   `flows2fim domain --lib ./library --r reaches.csv --o domain.tif --fmt GTiff`
//!   `flows2fim validate --db reach_data.db --lib ./library`
//!
//! The `fim` and `domain` commands need GDAL's `gdalbuildvrt` (and
//! `gdal_translate` for non-VRT formats) on PATH; `validate` against a
//! `/vsi` library additionally needs `gdal_ls`.

mod commands;
mod gdal;
mod logging;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "flows2fim")]
#[command(
    author,
    version,
    about = "Compose flood inundation maps from a FIM library and a rating-curves database"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a controls table of reach flows and downstream boundary conditions
    Controls(commands::controls::ControlsArgs),

    /// Composite the rasters named by a controls table into one coverage
    Fim(commands::fim::FimArgs),

    /// Composite per-reach domain rasters for a reach list
    Domain(commands::domain::DomainArgs),

    /// Cross-validate the rating-curves database against the FIM library
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Controls(args) => commands::controls::run(&args),
        Commands::Fim(args) => commands::fim::run(&args),
        Commands::Domain(args) => commands::domain::run(&args),
        Commands::Validate(args) => commands::validate::run(&args),
    }
}
