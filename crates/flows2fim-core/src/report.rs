//! Atomic CSV emission for validation reports.
//!
//! Rows are written to a `~f2f_` temp file in the destination directory and
//! renamed over the target, so a report either exists in full or not at all.
//! The rename stays on one volume because the temp file lives next to the
//! target.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::store::BoundaryCondition;
use crate::ReachId;

/// Prefix of in-progress output files.
pub const TEMP_PREFIX: &str = "~f2f_";

/// One row of a validation diff.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffRow {
    /// Reach the entry belongs to.
    pub reach_id: ReachId,
    /// Discharge of the entry.
    pub us_flow: i64,
    /// Effective downstream stage; 0 for normal-depth entries.
    pub ds_wse: f64,
    /// Boundary condition of the entry.
    pub boundary: BoundaryCondition,
}

/// Writes a diff report atomically.
///
/// With `skip_empty`, an empty row set creates neither the file nor its
/// parent directories. Returns the number of rows written, or `None` when
/// the report was skipped.
///
/// # Errors
///
/// Returns an error on any IO or CSV failure; the temp file is removed and
/// no partial output remains.
pub fn write_diff<P: AsRef<Path>>(
    path: P,
    rows: &[DiffRow],
    skip_empty: bool,
) -> Result<Option<usize>> {
    let path = path.as_ref();
    if skip_empty && rows.is_empty() {
        tracing::debug!(path = %path.display(), "no differences, skipping report");
        return Ok(None);
    }

    let dir = parent_dir(path);
    fs::create_dir_all(&dir)?;

    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".csv")
        .tempfile_in(&dir)?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file_mut());
        writer.write_record(["reach_id", "us_flow", "ds_wse", "boundary_condition"])?;
        for row in rows {
            writer.write_record([
                row.reach_id.to_string(),
                row.us_flow.to_string(),
                format!("{:.1}", row.ds_wse),
                row.boundary.as_str().to_string(),
            ])?;
        }
        writer.flush()?;
    }
    temp.persist(path).map_err(|err| Error::Io(err.error))?;

    Ok(Some(rows.len()))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
