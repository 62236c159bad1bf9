//! Upstream control selection.
//!
//! Starting from the seed reaches, the engine walks the reach network
//! upstream breadth-first. For each visited reach it picks exactly one
//! rating-curve row, emits one controls row, and enqueues every upstream
//! neighbor with a control target derived from the chosen row: the upstream
//! stage of the selected row becomes the downstream target of the neighbors.
//!
//! A reach with no matching rating curve emits nothing, but its upstream
//! neighbors are still enqueued at normal depth so coverage continues past
//! the gap.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use crate::error::Result;
use crate::seeds::{Seed, SeedControl};
use crate::store::{BoundaryCondition, RatingCurvesDb};
use crate::ReachId;

/// Relative flow difference above which a mismatch warning is logged.
const FLOW_MISMATCH_RATIO: f64 = 0.25;
/// Stage difference above which a mismatch warning is logged.
const STAGE_MISMATCH_LIMIT: f64 = 1.0;

/// One selected control: the rating-curve row chosen for a reach.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlResult {
    /// Reach the control applies to.
    pub reach_id: ReachId,
    /// Discharge of the chosen rating-curve row.
    pub flow: f64,
    /// `"nd"` or the chosen downstream stage at one decimal.
    pub control_stage: String,
}

/// Pending work item of the traversal.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    reach_id: ReachId,
    target_stage: f64,
    normal_depth: bool,
}

impl From<Seed> for Frontier {
    fn from(seed: Seed) -> Self {
        match seed.control {
            SeedControl::NormalDepth => Self {
                reach_id: seed.reach_id,
                target_stage: 0.0,
                normal_depth: true,
            },
            SeedControl::Stage(stage) => Self {
                reach_id: seed.reach_id,
                target_stage: stage,
                normal_depth: false,
            },
        }
    }
}

/// Walks the network upstream from `seeds` and picks one rating-curve row
/// per visited reach.
///
/// Results are in breadth-first visitation order. A visited set keeps the
/// traversal terminating on malformed (cyclic) networks; the first visit of
/// a reach wins.
///
/// # Errors
///
/// Returns a database error when a query fails.
pub fn select_controls(
    db: &RatingCurvesDb,
    flows: &HashMap<ReachId, f64>,
    seeds: &[Seed],
) -> Result<Vec<ControlResult>> {
    let mut queue: VecDeque<Frontier> = seeds.iter().copied().map(Into::into).collect();
    let mut visited: HashSet<ReachId> = HashSet::new();
    let mut results = Vec::new();

    while let Some(current) = queue.pop_front() {
        if !visited.insert(current.reach_id) {
            continue;
        }

        let flow = match flows.get(&current.reach_id) {
            Some(flow) => *flow,
            None => {
                tracing::warn!("Flow not found for reach {}, assuming 0", current.reach_id);
                0.0
            }
        };

        let row = if current.normal_depth {
            db.nearest_normal_depth(current.reach_id, flow)?
        } else {
            db.nearest_to_control(current.reach_id, flow, current.target_stage)?
        };

        let Some(row) = row else {
            // No rating curve here. Restart the upstream neighbors at normal
            // depth so the traversal covers everything above the gap.
            for upstream in db.upstream_of(current.reach_id)? {
                queue.push_back(Frontier {
                    reach_id: upstream,
                    target_stage: 0.0,
                    normal_depth: true,
                });
            }
            continue;
        };

        if flow > 0.0 && (flow - row.us_flow).abs() / flow > FLOW_MISMATCH_RATIO {
            tracing::warn!(
                "Large difference in target vs found flow for reach {}: {:.1} vs {:.1}",
                current.reach_id,
                flow,
                row.us_flow
            );
        }
        if !current.normal_depth {
            let nd_above_target = row.boundary == BoundaryCondition::NormalDepth
                && row.ds_wse > current.target_stage;
            if (row.ds_wse - current.target_stage).abs() > STAGE_MISMATCH_LIMIT && !nd_above_target
            {
                tracing::warn!(
                    "Large difference in target vs found control stage for reach {}: {:.1} vs {:.1}",
                    current.reach_id,
                    current.target_stage,
                    row.ds_wse
                );
            }
        }

        let control_stage = if row.boundary == BoundaryCondition::NormalDepth {
            "nd".to_string()
        } else {
            format!("{:.1}", row.ds_wse)
        };
        results.push(ControlResult {
            reach_id: current.reach_id,
            flow: row.us_flow,
            control_stage,
        });

        for upstream in db.upstream_of(current.reach_id)? {
            queue.push_back(Frontier {
                reach_id: upstream,
                target_stage: row.us_wse,
                normal_depth: false,
            });
        }
    }

    Ok(results)
}

/// Writes the controls table: `reach_id,flow,control_stage`.
///
/// An existing file is overwritten.
///
/// # Errors
///
/// Returns an error when the file cannot be created or written.
pub fn write_controls<P: AsRef<Path>>(path: P, results: &[ControlResult]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["reach_id", "flow", "control_stage"])?;
    for result in results {
        writer.write_record([
            result.reach_id.to_string(),
            format_flow(result.flow),
            result.control_stage.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Prints integral discharges without a decimal point; the text is reused
/// verbatim in `f_<flow>.tif` raster names.
#[allow(clippy::cast_possible_truncation)]
fn format_flow(flow: f64) -> String {
    if flow.fract() == 0.0 && flow.abs() < 1e15 {
        format!("{}", flow as i64)
    } else {
        format!("{flow}")
    }
}
