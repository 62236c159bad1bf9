//! FIM library path convention.
//!
//! A library is a directory tree of precomputed rasters keyed by reach,
//! boundary condition, and flow:
//!
//! ```text
//! <root>/<reach_id>/z_<stage>/f_<us_flow>.tif
//! ```
//!
//! The `z_` suffix is either `nd` (normal depth) or a one-decimal stage with
//! the decimal point replaced by an underscore, e.g. `z_53_5` for 53.5.

use crate::store::BoundaryCondition;
use crate::ReachId;

/// Sidecar extensions that accompany rasters and are silently skipped.
pub const IGNORED_EXTENSIONS: [&str; 5] = [".aux", ".aux.xml", ".ovr", ".xml", ".tfw"];

/// Entry derived from one raster leaf in the library.
#[derive(Debug, Clone, PartialEq)]
pub struct FimEntry {
    /// Reach the raster belongs to (first path segment).
    pub reach_id: ReachId,
    /// Discharge embedded in the leaf name.
    pub us_flow: i64,
    /// Downstream stage from the `z_` directory; 0 for normal depth.
    pub ds_wse: f64,
    /// Boundary condition from the `z_` directory.
    pub boundary: BoundaryCondition,
}

/// Replaces the decimal point with an underscore for `z_` directory names.
#[must_use]
pub fn encode_stage(stage: &str) -> String {
    stage.replace('.', "_")
}

/// Parses a `z_` directory suffix: `nd`, or an underscore-decimal real.
#[must_use]
pub fn decode_stage(suffix: &str) -> Option<(BoundaryCondition, f64)> {
    if suffix == "nd" {
        return Some((BoundaryCondition::NormalDepth, 0.0));
    }
    suffix
        .replace('_', ".")
        .parse::<f64>()
        .ok()
        .map(|ds_wse| (BoundaryCondition::KnownWse, ds_wse))
}

/// Library-relative raster path for a controls row.
///
/// The flow and stage texts are used verbatim, so the path matches whatever
/// the controls table carries without a numeric round-trip.
#[must_use]
pub fn raster_rel_path(reach_id: &str, flow: &str, control_stage: &str) -> String {
    format!("{reach_id}/z_{}/f_{flow}.tif", encode_stage(control_stage))
}

/// Classifies one leaf path, relative to the library root with `/`
/// separators.
///
/// Returns `None` for sidecar files (silent), non-raster leaves (warning),
/// and rasters that do not follow the convention (error); those leaves are
/// skipped, the scan continues.
#[must_use]
pub fn parse_leaf(rel_path: &str) -> Option<FimEntry> {
    let segments: Vec<&str> = rel_path.split('/').filter(|s| !s.is_empty()).collect();
    let name = *segments.last()?;

    if IGNORED_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        return None;
    }
    if !name.ends_with(".tif") {
        tracing::warn!("skipping non-raster file in library: {rel_path}");
        return None;
    }
    if segments.len() < 3 {
        tracing::error!("raster outside <reach>/z_<stage>/ layout: {rel_path}");
        return None;
    }

    let Some(flow_text) = name.strip_prefix("f_").and_then(|n| n.strip_suffix(".tif")) else {
        tracing::error!("raster name does not match f_<flow>.tif: {rel_path}");
        return None;
    };
    let Ok(us_flow) = flow_text.parse::<i64>() else {
        tracing::error!("could not parse us_flow: {rel_path}");
        return None;
    };
    let Ok(reach_id) = segments[0].parse::<ReachId>() else {
        tracing::error!("could not parse reach_id: {rel_path}");
        return None;
    };
    let Some(suffix) = segments[1].strip_prefix("z_") else {
        tracing::error!("stage directory does not match z_<stage>: {rel_path}");
        return None;
    };
    let Some((boundary, ds_wse)) = decode_stage(suffix) else {
        tracing::error!("could not parse stage directory: {rel_path}");
        return None;
    };

    Some(FimEntry {
        reach_id,
        us_flow,
        ds_wse,
        boundary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kwse_leaf() {
        let entry = parse_leaf("2821866/z_53_5/f_10283.tif").unwrap();
        assert_eq!(
            entry,
            FimEntry {
                reach_id: 2821866,
                us_flow: 10283,
                ds_wse: 53.5,
                boundary: BoundaryCondition::KnownWse,
            }
        );
    }

    #[test]
    fn parses_normal_depth_leaf() {
        let entry = parse_leaf("2821866/z_nd/f_10283.tif").unwrap();
        assert_eq!(entry.ds_wse, 0.0);
        assert_eq!(entry.boundary, BoundaryCondition::NormalDepth);
    }

    #[test]
    fn sidecar_files_are_ignored() {
        for name in [
            "2821866/z_nd/f_10283.tif.aux",
            "2821866/z_nd/f_10283.tif.aux.xml",
            "2821866/z_nd/f_10283.tif.ovr",
            "2821866/z_nd/f_10283.xml",
            "2821866/z_nd/f_10283.tfw",
        ] {
            assert_eq!(parse_leaf(name), None, "{name} should be ignored");
        }
    }

    #[test]
    fn malformed_leaves_are_skipped() {
        assert_eq!(parse_leaf("2821866/z_nd/readme.txt"), None);
        assert_eq!(parse_leaf("2821866/z_nd/notflow.tif"), None);
        assert_eq!(parse_leaf("2821866/z_nd/f_abc.tif"), None);
        assert_eq!(parse_leaf("reachless/z_nd/f_10283.tif"), None);
        assert_eq!(parse_leaf("2821866/stage/f_10283.tif"), None);
        assert_eq!(parse_leaf("2821866/z_5_5_5/f_10283.tif"), None);
        assert_eq!(parse_leaf("f_10283.tif"), None);
    }

    #[test]
    fn stage_text_round_trips_through_directory_names() {
        for stage in ["0.0", "53.5", "102.4"] {
            let encoded = encode_stage(stage);
            let (boundary, ds_wse) = decode_stage(&encoded).unwrap();
            assert_eq!(boundary, BoundaryCondition::KnownWse);
            assert_eq!(format!("{ds_wse:.1}"), stage);
        }
    }

    #[test]
    fn nd_stage_encodes_to_itself() {
        assert_eq!(encode_stage("nd"), "nd");
        assert_eq!(
            decode_stage("nd"),
            Some((BoundaryCondition::NormalDepth, 0.0))
        );
    }

    #[test]
    fn raster_path_uses_row_text_verbatim() {
        assert_eq!(
            raster_rel_path("8489318", "1560", "0.0"),
            "8489318/z_0_0/f_1560.tif"
        );
        assert_eq!(
            raster_rel_path("8490370", "130", "nd"),
            "8490370/z_nd/f_130.tif"
        );
    }
}
