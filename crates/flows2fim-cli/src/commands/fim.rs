//! `fim` subcommand.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use flows2fim_core::library;
use serde::Deserialize;

use crate::gdal::{self, OutputFormat};

/// Pixel interpretation of the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum MapType {
    /// Water depth, as stored in the library rasters.
    #[default]
    Depth,
    /// Binary inundation extent: every wet pixel becomes 1.
    Extent,
}

/// `gdal_translate` arguments that collapse depths into a binary extent.
const EXTENT_TRANSLATE_ARGS: [&str; 9] = [
    "-ot", "Byte", "-scale", "0", "1000000", "1", "1", "-a_nodata", "0",
];

/// Arguments of `flows2fim fim`.
#[derive(Args, Debug)]
pub struct FimArgs {
    /// FIM library root: a directory or a GDAL /vsi prefix
    #[arg(long, value_name = "DIR")]
    pub lib: String,

    /// Path to the controls CSV file
    #[arg(long = "c", value_name = "CTRLCSV")]
    pub controls: PathBuf,

    /// Output raster path
    #[arg(long = "o", value_name = "OUT")]
    pub output: String,

    /// Output format
    #[arg(long, value_enum, ignore_case = true, default_value_t)]
    pub fmt: OutputFormat,

    /// Composite water depths or a binary extent
    #[arg(long = "type", value_enum, ignore_case = true, default_value_t)]
    pub map_type: MapType,
}

/// One row of a controls table.
#[derive(Debug, Deserialize)]
struct ControlRow {
    reach_id: String,
    flow: String,
    control_stage: String,
}

pub fn run(args: &FimArgs) -> Result<()> {
    gdal::ensure_tool("gdalbuildvrt")?;
    let extra_args = translate_args(args.map_type);
    if args.fmt != OutputFormat::Vrt || !extra_args.is_empty() {
        gdal::ensure_tool("gdal_translate")?;
    }

    let rows = read_control_rows(&args.controls)
        .with_context(|| format!("reading controls file {}", args.controls.display()))?;
    if rows.is_empty() {
        bail!("no rows in controls file {}", args.controls.display());
    }

    let lib = gdal::absolutize(&args.lib)?;
    let output = gdal::absolutize(&args.output)?;
    let staging = gdal::staging_dir(&output);

    // Relative entries keep local VRTs relocatable; cloud paths cannot be
    // expressed relative to a local output.
    let relative = !gdal::is_vsi(&lib) && !gdal::is_vsi(&output);
    let rasters = raster_list(&rows, &lib, &staging, relative);

    let file_list = gdal::write_file_list(&staging, &rasters)?;
    gdal::compose(&file_list, &output, &staging, args.fmt, extra_args)?;

    println!("{} {}", "FIM created at".green(), output);
    Ok(())
}

fn translate_args(map_type: MapType) -> &'static [&'static str] {
    match map_type {
        MapType::Depth => &[],
        MapType::Extent => &EXTENT_TRANSLATE_ARGS,
    }
}

fn read_control_rows(path: &Path) -> Result<Vec<ControlRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<ControlRow>, csv::Error>>()?;
    Ok(rows)
}

/// One library raster path per controls row, by the library convention.
fn raster_list(
    rows: &[ControlRow],
    lib: &str,
    staging: &Path,
    relative: bool,
) -> Vec<String> {
    rows.iter()
        .map(|row| {
            let rel = library::raster_rel_path(&row.reach_id, &row.flow, &row.control_stage);
            let full = format!("{lib}/{rel}");
            if relative {
                gdal::relative_to(Path::new(&full), staging)
                    .to_string_lossy()
                    .replace('\\', "/")
            } else {
                full
            }
        })
        .collect()
}
