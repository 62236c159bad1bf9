//! Shared fixtures for unit tests.

use rusqlite::{params, Connection};

use crate::store::{BoundaryCondition, RatingCurvesDb};
use crate::ReachId;

/// Schema of the rating-curves database, as produced by the modeling
/// pipeline upstream of this tool.
pub const SCHEMA: &str = "
    CREATE TABLE rating_curves (
        reach_id INTEGER,
        us_flow REAL,
        us_depth REAL,
        us_wse REAL,
        ds_depth REAL,
        ds_wse REAL,
        boundary_condition TEXT CHECK (boundary_condition IN ('nd', 'kwse')),
        UNIQUE (reach_id, us_flow, ds_wse, boundary_condition)
    );
    CREATE TABLE network (
        reach_id INTEGER,
        updated_to_id INTEGER
    );
";

/// An in-memory rating-curves database with the production schema.
pub fn empty_db() -> RatingCurvesDb {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    RatingCurvesDb::from_connection(conn)
}

/// Inserts one rating-curve row.
pub fn insert_curve(
    db: &RatingCurvesDb,
    reach_id: ReachId,
    us_flow: f64,
    us_wse: f64,
    ds_wse: f64,
    boundary: BoundaryCondition,
) {
    db.conn()
        .execute(
            "INSERT INTO rating_curves \
             (reach_id, us_flow, us_depth, us_wse, ds_depth, ds_wse, boundary_condition) \
             VALUES (?1, ?2, 0, ?3, 0, ?4, ?5)",
            params![reach_id, us_flow, us_wse, ds_wse, boundary],
        )
        .unwrap();
}

/// Inserts one `reach_id -> updated_to_id` network edge.
pub fn insert_edge(db: &RatingCurvesDb, reach_id: ReachId, updated_to_id: ReachId) {
    db.conn()
        .execute(
            "INSERT INTO network (reach_id, updated_to_id) VALUES (?1, ?2)",
            params![reach_id, updated_to_id],
        )
        .unwrap();
}
