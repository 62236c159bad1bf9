//! Read-only accessor over the rating-curves database.
//!
//! The database is an SQLite file with two tables: `rating_curves`, relating
//! reach discharge and water-surface elevations at a boundary condition, and
//! `network`, holding the directed reach graph as `reach_id -> updated_to_id`
//! edges.

use std::fmt;
use std::path::Path;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};

use crate::error::{Error, Result};
use crate::ReachId;

/// Downstream boundary condition of a rating-curve row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryCondition {
    /// Downstream water surface governed by the reach's own slope and
    /// roughness; ds_wse carries no meaning.
    NormalDepth,
    /// Known downstream water-surface elevation.
    KnownWse,
}

impl BoundaryCondition {
    /// The database/CSV text of this boundary condition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NormalDepth => "nd",
            Self::KnownWse => "kwse",
        }
    }

    /// Parses the database/CSV text form.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "nd" => Some(Self::NormalDepth),
            "kwse" => Some(Self::KnownWse),
            _ => None,
        }
    }
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql for BoundaryCondition {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::parse(text).ok_or_else(|| {
            FromSqlError::Other(format!("unknown boundary condition: {text}").into())
        })
    }
}

impl ToSql for BoundaryCondition {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

/// One row of the `rating_curves` table.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingCurveRow {
    /// Reach this row belongs to.
    pub reach_id: ReachId,
    /// Upstream discharge of the modeled steady-state run.
    pub us_flow: f64,
    /// Upstream water-surface elevation (stage).
    pub us_wse: f64,
    /// Downstream water-surface elevation; not meaningful for `nd` rows.
    pub ds_wse: f64,
    /// Boundary condition the row was modeled under.
    pub boundary: BoundaryCondition,
}

/// Handle over the rating-curves database file.
///
/// Read-only after open; the validation pipeline attaches a scratch
/// in-memory namespace on top of the same connection.
#[derive(Debug)]
pub struct RatingCurvesDb {
    conn: Connection,
}

impl RatingCurvesDb {
    /// Opens the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DatabaseMissing`] when the file does not exist, or a
    /// database error when it cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::DatabaseMissing(path.to_path_buf()));
        }
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Reaches whose immediate downstream is `reach`.
    ///
    /// # Errors
    ///
    /// Returns a database error when the query fails.
    pub fn upstream_of(&self, reach: ReachId) -> Result<Vec<ReachId>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT reach_id FROM network WHERE updated_to_id = ?1")?;
        let ids = stmt
            .query_map([reach], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<ReachId>>>()?;
        Ok(ids)
    }

    /// The `nd` row at `reach` minimizing `|us_flow - flow|`.
    ///
    /// # Errors
    ///
    /// Returns a database error when the query fails.
    pub fn nearest_normal_depth(
        &self,
        reach: ReachId,
        flow: f64,
    ) -> Result<Option<RatingCurveRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT us_flow, us_wse, ds_wse, boundary_condition FROM rating_curves \
             WHERE reach_id = ?1 AND boundary_condition = 'nd' \
             ORDER BY ABS(us_flow - ?2) LIMIT 1",
        )?;
        let row = stmt
            .query_row(params![reach, flow], |row| read_rating_curve(reach, row))
            .optional()?;
        Ok(row)
    }

    /// The row at `reach` minimizing the pair
    /// `(|us_flow - flow|, |ds_wse - target_stage|)`, any boundary.
    ///
    /// Flow distance is the primary key; stage distance breaks ties.
    ///
    /// # Errors
    ///
    /// Returns a database error when the query fails.
    pub fn nearest_to_control(
        &self,
        reach: ReachId,
        flow: f64,
        target_stage: f64,
    ) -> Result<Option<RatingCurveRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT us_flow, us_wse, ds_wse, boundary_condition FROM rating_curves \
             WHERE reach_id = ?1 \
             ORDER BY ABS(us_flow - ?2), ABS(ds_wse - ?3) LIMIT 1",
        )?;
        let row = stmt
            .query_row(params![reach, flow, target_stage], |row| {
                read_rating_curve(reach, row)
            })
            .optional()?;
        Ok(row)
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

fn read_rating_curve(reach: ReachId, row: &Row<'_>) -> rusqlite::Result<RatingCurveRow> {
    Ok(RatingCurveRow {
        reach_id: reach,
        us_flow: row.get(0)?,
        us_wse: row.get(1)?,
        ds_wse: row.get(2)?,
        boundary: row.get(3)?,
    })
}
