//! `domain` subcommand.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use crate::gdal::{self, OutputFormat};

/// Arguments of `flows2fim domain`.
#[derive(Args, Debug)]
pub struct DomainArgs {
    /// FIM library root: a directory or a GDAL /vsi prefix
    #[arg(long, value_name = "DIR")]
    pub lib: String,

    /// Reach list CSV; a controls table works as long as the first column is reach_id
    #[arg(long = "r", value_name = "REACHLIST")]
    pub reaches: PathBuf,

    /// Output domain raster path
    #[arg(long = "o", value_name = "OUT")]
    pub output: String,

    /// Output format
    #[arg(long, value_enum, ignore_case = true, default_value_t)]
    pub fmt: OutputFormat,
}

pub fn run(args: &DomainArgs) -> Result<()> {
    gdal::ensure_tool("gdalbuildvrt")?;
    if args.fmt != OutputFormat::Vrt {
        gdal::ensure_tool("gdal_translate")?;
    }

    let reach_ids = read_reach_ids(&args.reaches)
        .with_context(|| format!("reading reaches file {}", args.reaches.display()))?;

    let lib = gdal::absolutize(&args.lib)?;
    let output = gdal::absolutize(&args.output)?;
    let staging = gdal::staging_dir(&output);

    let domains: Vec<String> = reach_ids
        .iter()
        .map(|reach_id| format!("{lib}/{reach_id}/domain.tif"))
        .collect();

    let file_list = gdal::write_file_list(&staging, &domains)?;
    gdal::compose(&file_list, &output, &staging, args.fmt, &[])?;

    println!("{} {}", "Composite domain created at".green(), output);
    Ok(())
}

/// First-column values of the reach list; the header must name it reach_id.
fn read_reach_ids(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)?;
    let first_header = reader
        .headers()?
        .iter()
        .next()
        .unwrap_or_default()
        .to_string();
    if first_header != "reach_id" {
        bail!("first column of reaches file should be reach_id, got {first_header:?}");
    }

    let mut reach_ids = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(reach_id) = record.get(0) {
            reach_ids.push(reach_id.to_string());
        }
    }
    if reach_ids.is_empty() {
        bail!("no records in reaches file");
    }
    Ok(reach_ids)
}
