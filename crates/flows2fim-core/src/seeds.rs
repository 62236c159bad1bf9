//! Seed list loaders.
//!
//! Seeds are the starting points of the upstream traversal. They come either
//! from a two-column CSV file or from paired comma-separated command-line
//! lists.

use std::fs::File;
use std::path::Path;

use crate::error::{Error, Result};
use crate::ReachId;

/// Control target carried by a seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeedControl {
    /// Start the reach at normal depth.
    NormalDepth,
    /// Target downstream water-surface elevation.
    Stage(f64),
}

/// Starting point for the upstream traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    /// Reach to start from.
    pub reach_id: ReachId,
    /// Control target at that reach.
    pub control: SeedControl,
}

fn parse_control(text: &str) -> Option<SeedControl> {
    if text == "nd" {
        return Some(SeedControl::NormalDepth);
    }
    text.parse::<f64>().ok().map(SeedControl::Stage)
}

/// Reads seeds from a two-column CSV file: `reach_id,<stage-or-"nd">`.
///
/// Malformed rows are skipped, which also drops a header row.
///
/// # Errors
///
/// Returns an error when the file cannot be opened or read.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Vec<Seed>> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut seeds = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() != 2 {
            continue;
        }
        let Ok(reach_id) = record[0].trim().parse::<ReachId>() else {
            continue;
        };
        let Some(control) = parse_control(record[1].trim()) else {
            continue;
        };
        seeds.push(Seed { reach_id, control });
    }
    Ok(seeds)
}

/// Builds seeds from paired comma-separated lists of reach ids and control
/// stages.
///
/// Element counts must match, except that a single `nd` stage is broadcast
/// to every id.
///
/// # Errors
///
/// Returns [`Error::SeedList`] on a count mismatch or an unparsable element.
pub fn from_lists(sids: &str, scs: &str) -> Result<Vec<Seed>> {
    let ids = sids
        .split(',')
        .map(|id| {
            id.trim()
                .parse::<ReachId>()
                .map_err(|_| Error::SeedList(format!("invalid reach id: {id}")))
        })
        .collect::<Result<Vec<ReachId>>>()?;

    if scs.trim() == "nd" {
        return Ok(ids
            .into_iter()
            .map(|reach_id| Seed {
                reach_id,
                control: SeedControl::NormalDepth,
            })
            .collect());
    }

    let controls = scs
        .split(',')
        .map(|sc| {
            parse_control(sc.trim())
                .ok_or_else(|| Error::SeedList(format!("invalid control stage: {sc}")))
        })
        .collect::<Result<Vec<SeedControl>>>()?;

    if ids.len() != controls.len() {
        return Err(Error::SeedList(format!(
            "got {} reach ids but {} control stages",
            ids.len(),
            controls.len()
        )));
    }

    Ok(ids
        .into_iter()
        .zip(controls)
        .map(|(reach_id, control)| Seed { reach_id, control })
        .collect())
}
