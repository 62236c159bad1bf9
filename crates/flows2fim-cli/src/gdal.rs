//! Thin shim over the external GDAL utilities.
//!
//! The compositing commands never touch pixels themselves: they synthesize
//! raster paths, write a file list to a `~f2f_` temp file in the output
//! directory, and drive `gdalbuildvrt` / `gdal_translate`. Temp files are
//! removed on success and failure; a VRT destined for a local path is moved
//! into place with a same-volume rename.

use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use tempfile::{Builder, TempPath};

/// Prefix of in-progress output files.
pub const TEMP_PREFIX: &str = "~f2f_";

/// Raster output format, by GDAL driver name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Virtual mosaic referencing the library rasters.
    #[default]
    Vrt,
    /// Cloud-optimized GeoTIFF.
    Cog,
    /// Plain GeoTIFF.
    #[value(alias = "tif")]
    Gtiff,
}

impl OutputFormat {
    /// GDAL driver name for `-of`.
    pub fn gdal_name(self) -> &'static str {
        match self {
            Self::Vrt => "VRT",
            Self::Cog => "COG",
            Self::Gtiff => "GTiff",
        }
    }
}

/// True for GDAL virtual filesystem paths.
pub fn is_vsi(path: &str) -> bool {
    path.starts_with("/vsi")
}

/// Checks that a GDAL executable is on PATH.
pub fn ensure_tool(tool: &str) -> Result<()> {
    let available = Command::new(tool)
        .arg("--version")
        .output()
        .map(|out| {
            out.status.success()
                || String::from_utf8_lossy(&out.stdout)
                    .to_lowercase()
                    .contains("released")
        })
        .unwrap_or(false);
    if !available {
        bail!("{tool} is not available. Please install GDAL and ensure {tool} is in your PATH");
    }
    Ok(())
}

/// Absolute form of `path`; `/vsi` paths pass through untouched.
pub fn absolutize(path: &str) -> Result<String> {
    if is_vsi(path) {
        return Ok(path.trim_end_matches('/').to_string());
    }
    let abs = std::path::absolute(path)
        .with_context(|| format!("resolving absolute path for {path}"))?;
    Ok(abs.to_string_lossy().into_owned())
}

/// Directory where temp files for `output` live: next to the output, or the
/// system temp directory for `/vsi` outputs.
pub fn staging_dir(output: &str) -> PathBuf {
    if is_vsi(output) {
        return std::env::temp_dir();
    }
    match Path::new(output).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Re-expresses `target` relative to the directory `base`; both absolute.
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target_parts: Vec<Component<'_>> = target.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();
    let common = target_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(t, b)| t == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &target_parts[common..] {
        rel.push(part.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}

/// Writes one path per line to a `~f2f_` temp file in `dir`.
pub fn write_file_list(dir: &Path, paths: &[String]) -> Result<TempPath> {
    let mut file = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".txt")
        .tempfile_in(dir)
        .with_context(|| format!("creating temp file list in {}", dir.display()))?;
    for path in paths {
        writeln!(file, "{path}")?;
    }
    tracing::debug!(lines = paths.len(), "wrote raster file list");
    Ok(file.into_temp_path())
}

/// Mosaics the listed rasters into `output`.
///
/// A plain VRT destined for a local path is built as a `~f2f_` temp next to
/// the output and renamed into place; everything else goes through
/// `gdal_translate` with `extra_args` appended.
pub fn compose(
    file_list: &Path,
    output: &str,
    staging: &Path,
    format: OutputFormat,
    extra_args: &[&str],
) -> Result<()> {
    if format == OutputFormat::Vrt && extra_args.is_empty() {
        if is_vsi(output) {
            // gdalbuildvrt writes virtual outputs directly
            return run_tool(
                Command::new("gdalbuildvrt")
                    .arg("-overwrite")
                    .arg("-input_file_list")
                    .arg(file_list)
                    .arg(output),
            );
        }
        let temp_vrt = build_temp_vrt(file_list, staging)?;
        tracing::debug!(to = output, "moving temporary VRT to final destination");
        temp_vrt
            .persist(output)
            .with_context(|| format!("renaming temp VRT to {output}"))?;
        return Ok(());
    }

    let temp_vrt = build_temp_vrt(file_list, staging)?;
    let mut cmd = Command::new("gdal_translate");
    cmd.args(["-co", "COMPRESS=LZW", "-co", "NUM_THREADS=ALL_CPUS"])
        .args(["-of", format.gdal_name()])
        .args(extra_args)
        .arg(&temp_vrt)
        .arg(output);
    run_tool(&mut cmd)
}

/// Builds a `~f2f_` temp VRT in `staging` over the listed rasters.
///
/// The tool runs with `staging` as its working directory so relative list
/// entries resolve against the output location.
fn build_temp_vrt(file_list: &Path, staging: &Path) -> Result<TempPath> {
    let temp = Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".vrt")
        .tempfile_in(staging)
        .with_context(|| format!("creating temp VRT in {}", staging.display()))?
        .into_temp_path();

    run_tool(
        Command::new("gdalbuildvrt")
            .current_dir(staging)
            .arg("-overwrite")
            .arg("-input_file_list")
            .arg(file_list)
            .arg(&temp),
    )?;
    Ok(temp)
}

fn run_tool(cmd: &mut Command) -> Result<()> {
    let tool = cmd.get_program().to_string_lossy().into_owned();
    let status = cmd
        .status()
        .with_context(|| format!("running {tool}"))?;
    if !status.success() {
        bail!("{tool} exited with {status}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_walk_up_and_down() {
        assert_eq!(
            relative_to(
                Path::new("/data/library/8489318/z_0_0/f_1560.tif"),
                Path::new("/data/outputs"),
            ),
            Path::new("../library/8489318/z_0_0/f_1560.tif")
        );
        assert_eq!(
            relative_to(Path::new("/data/out/fim.vrt"), Path::new("/data/out")),
            Path::new("fim.vrt")
        );
        assert_eq!(
            relative_to(Path::new("/data/out"), Path::new("/data/out")),
            Path::new(".")
        );
    }

    #[test]
    fn vsi_prefixes_are_detected() {
        assert!(is_vsi("/vsis3/fimc-data/fim2d/prototype/2024_03_13"));
        assert!(!is_vsi("/data/library"));
    }

    #[test]
    fn vsi_paths_absolutize_to_themselves() {
        assert_eq!(
            absolutize("/vsis3/bucket/lib/").unwrap(),
            "/vsis3/bucket/lib"
        );
    }

    #[test]
    fn staging_next_to_local_output() {
        assert_eq!(
            staging_dir("/data/outputs/fim.vrt"),
            PathBuf::from("/data/outputs")
        );
        assert_eq!(staging_dir("fim.vrt"), PathBuf::from("."));
    }

    #[test]
    fn file_list_is_temp_prefixed_and_line_separated() {
        let dir = tempfile::tempdir().unwrap();
        let list = write_file_list(
            dir.path(),
            &["a/z_nd/f_1.tif".to_string(), "b/z_0_0/f_2.tif".to_string()],
        )
        .unwrap();

        let name = list.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(TEMP_PREFIX));
        assert_eq!(
            std::fs::read_to_string(&list).unwrap(),
            "a/z_nd/f_1.tif\nb/z_0_0/f_2.tif\n"
        );
    }

    #[test]
    fn format_names_match_gdal_drivers() {
        assert_eq!(OutputFormat::Vrt.gdal_name(), "VRT");
        assert_eq!(OutputFormat::Cog.gdal_name(), "COG");
        assert_eq!(OutputFormat::Gtiff.gdal_name(), "GTiff");
    }
}
