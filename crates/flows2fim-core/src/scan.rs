//! Library enumeration.
//!
//! Two backends discover raster leaves: a recursive filesystem walk for
//! local roots, and the external `gdal_ls` utility for `/vsi` object-store
//! roots. Top-level reach directories are discovered serially; one worker
//! per reach directory then enumerates its subtree, capped by a counting
//! semaphore, and pushes parsed entries onto a bounded channel.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::thread;

use crossbeam_channel::{bounded, Sender};

use crate::error::{Error, Result};
use crate::library::{self, FimEntry};

/// Rows buffered between directory workers and the ingesting consumer.
pub const CHANNEL_CAPACITY: usize = 2000;
/// Default ceiling on concurrently scanned reach directories.
pub const DEFAULT_CONCURRENCY: usize = 25;

/// External utility used to list virtualized (`/vsi…`) paths.
const LISTING_TOOL: &str = "gdal_ls";

/// True when the root routes through an object-store driver.
#[must_use]
pub fn is_virtual(root: &str) -> bool {
    root.starts_with("/vsi")
}

/// Enumerates every raster under `root` and sends parsed entries to `tx`.
///
/// Returns once every reach directory has been walked; dropping the final
/// sender clone is the termination signal for the receiving side.
///
/// # Errors
///
/// Returns an error when the root cannot be listed, a subtree walk hits an
/// IO failure, or the external listing utility fails for a `/vsi` root.
/// Individual leaves that do not parse are logged and skipped.
pub fn scan_library(root: &str, concurrency: usize, tx: Sender<FimEntry>) -> Result<()> {
    let reach_dirs = list_reach_dirs(root)?;
    let (token_tx, token_rx) = bounded::<()>(concurrency.max(1));

    thread::scope(|scope| -> Result<()> {
        let mut workers = Vec::with_capacity(reach_dirs.len());
        for name in &reach_dirs {
            let tx = tx.clone();
            let token_tx = token_tx.clone();
            let token_rx = token_rx.clone();
            workers.push(scope.spawn(move || -> Result<()> {
                token_tx
                    .send(())
                    .expect("semaphore channel closed before workers finished");
                let outcome = scan_reach_dir(root, name, &tx);
                token_rx.recv().ok();
                outcome
            }));
        }
        for worker in workers {
            worker.join().expect("scan worker panicked")?;
        }
        Ok(())
    })
}

/// Walks one reach directory and sends every parsed entry.
fn scan_reach_dir(root: &str, reach: &str, tx: &Sender<FimEntry>) -> Result<()> {
    for rel_path in list_reach_leaves(root, reach)? {
        if let Some(entry) = library::parse_leaf(&rel_path) {
            if tx.send(entry).is_err() {
                // Consumer went away; its error is reported on that side.
                break;
            }
        }
    }
    Ok(())
}

/// Immediate subdirectory names of the library root (the reach folders).
fn list_reach_dirs(root: &str) -> Result<Vec<String>> {
    if is_virtual(root) {
        let dirs = vsi_list(root, false)?
            .iter()
            .filter_map(|line| rel_entry(line, root))
            .filter(|(_, is_dir)| *is_dir)
            .map(|(name, _)| name)
            .collect();
        return Ok(dirs);
    }

    let mut dirs = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(dirs)
}

/// Leaf files under one reach directory, as `/`-separated paths relative to
/// the library root.
fn list_reach_leaves(root: &str, reach: &str) -> Result<Vec<String>> {
    if is_virtual(root) {
        let reach_root = format!("{}/{reach}", root.trim_end_matches('/'));
        let leaves = vsi_list(&reach_root, true)?
            .iter()
            .filter_map(|line| rel_entry(line, &reach_root))
            .filter(|(_, is_dir)| !*is_dir)
            .map(|(rel, _)| format!("{reach}/{rel}"))
            .collect();
        return Ok(leaves);
    }

    let root = Path::new(root);
    let mut leaves = Vec::new();
    walk_local(root, &root.join(reach), &mut leaves)?;
    Ok(leaves)
}

fn walk_local(root: &Path, dir: &Path, leaves: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            walk_local(root, &path, leaves)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            leaves.push(
                rel.to_string_lossy()
                    .replace(std::path::MAIN_SEPARATOR, "/"),
            );
        }
    }
    Ok(())
}

/// Invokes the external listing utility; directory lines end with `/`.
fn vsi_list(path: &str, recursive: bool) -> Result<Vec<String>> {
    let mut cmd = Command::new(LISTING_TOOL);
    if recursive {
        cmd.arg("-r");
    }
    cmd.arg(path);

    let output = cmd
        .output()
        .map_err(|err| Error::Listing(format!("could not run {LISTING_TOOL}: {err}")))?;
    if !output.status.success() {
        return Err(Error::Listing(format!(
            "{LISTING_TOOL} exited with {} for {path}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToString::to_string)
        .collect())
}

/// Classifies one listing line relative to `base`: `(relative path, is_dir)`.
fn rel_entry(line: &str, base: &str) -> Option<(String, bool)> {
    let is_dir = line.ends_with('/');
    let trimmed = line.trim_end_matches('/');
    let base = base.trim_end_matches('/');
    let rel = trimmed
        .strip_prefix(base)
        .map_or(trimmed, |rel| rel.trim_start_matches('/'));
    if rel.is_empty() {
        return None;
    }
    Some((rel.to_string(), is_dir))
}
