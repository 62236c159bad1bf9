//! Library/database cross-validation.
//!
//! Discovered library entries are bulk-loaded into an in-memory namespace
//! attached to the rating-curves connection, then two anti-joins report what
//! each side is missing. A single consumer performs all inserts in one
//! transaction; the transaction commits only after the scan finished
//! cleanly, so a failed run leaves no committed rows and no reports.

use std::path::PathBuf;
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Transaction};

use crate::error::Result;
use crate::library::FimEntry;
use crate::report::{self, DiffRow};
use crate::scan;
use crate::store::RatingCurvesDb;

/// Rows per multi-VALUES insert.
const INSERT_BATCH: usize = 1000;

const CREATE_SCRATCH_SQL: &str = "
    ATTACH ':memory:' AS scandb;
    CREATE TABLE scandb.fim_entries (
        reach_id INTEGER,
        us_flow INTEGER,
        ds_wse REAL,
        boundary_condition TEXT
    );
";

/// Rating-curve rows with no matching library raster, on
/// `(reach_id, us_flow, effective_ds_wse, boundary_condition)` where the
/// effective stage of an `nd` row is 0.
const MISSING_FIMS_SQL: &str = "
    SELECT
        rc.reach_id,
        rc.us_flow,
        CASE WHEN rc.boundary_condition = 'nd' THEN 0 ELSE rc.ds_wse END,
        rc.boundary_condition
    FROM rating_curves rc
    LEFT JOIN scandb.fim_entries f
        ON rc.reach_id = f.reach_id
        AND rc.us_flow = f.us_flow
        AND (CASE WHEN rc.boundary_condition = 'nd' THEN 0 ELSE rc.ds_wse END) = f.ds_wse
        AND rc.boundary_condition = f.boundary_condition
    WHERE f.reach_id IS NULL
    ORDER BY rc.reach_id, rc.boundary_condition, rc.ds_wse, rc.us_flow
";

/// Library rasters with no matching rating-curve row; `fim_entries.ds_wse`
/// is already 0 for `nd` entries.
const MISSING_RATING_CURVES_SQL: &str = "
    SELECT
        f.reach_id,
        f.us_flow,
        f.ds_wse,
        f.boundary_condition
    FROM scandb.fim_entries f
    LEFT JOIN rating_curves rc
        ON f.reach_id = rc.reach_id
        AND f.us_flow = rc.us_flow
        AND f.ds_wse = (CASE WHEN rc.boundary_condition = 'nd' THEN 0 ELSE rc.ds_wse END)
        AND f.boundary_condition = rc.boundary_condition
    WHERE rc.reach_id IS NULL
    ORDER BY f.reach_id, f.boundary_condition, f.ds_wse, f.us_flow
";

/// Settings of one validation run.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    /// Ceiling on concurrently scanned reach directories.
    pub concurrency: usize,
    /// Suppress a report whose diff is empty.
    pub skip_empty: bool,
    /// Output path of the missing-FIMs report.
    pub missing_fims_path: PathBuf,
    /// Output path of the missing-rating-curves report.
    pub missing_rating_curves_path: PathBuf,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            concurrency: scan::DEFAULT_CONCURRENCY,
            skip_empty: false,
            missing_fims_path: PathBuf::from("missing_fims.csv"),
            missing_rating_curves_path: PathBuf::from("missing_rating_curves.csv"),
        }
    }
}

/// Outcome of one validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidateSummary {
    /// Library entries ingested into the scratch table.
    pub entries: usize,
    /// Rows written to the missing-FIMs report; `None` when skipped.
    pub missing_fims: Option<usize>,
    /// Rows written to the missing-rating-curves report; `None` when skipped.
    pub missing_rating_curves: Option<usize>,
}

/// Rating-curves database with the scratch `fim_entries` namespace attached.
pub struct LibraryIndex {
    db: RatingCurvesDb,
}

impl LibraryIndex {
    /// Attaches the in-memory scratch namespace to `db`.
    ///
    /// # Errors
    ///
    /// Returns a database error when the attach or table creation fails.
    pub fn attach(db: RatingCurvesDb) -> Result<Self> {
        db.conn().execute_batch(CREATE_SCRATCH_SQL)?;
        Ok(Self { db })
    }

    /// Rating-curve rows with no library raster.
    ///
    /// # Errors
    ///
    /// Returns a database error when the query fails.
    pub fn missing_fims(&self) -> Result<Vec<DiffRow>> {
        query_diff(&self.db, MISSING_FIMS_SQL)
    }

    /// Library rasters with no rating-curve row.
    ///
    /// # Errors
    ///
    /// Returns a database error when the query fails.
    pub fn missing_rating_curves(&self) -> Result<Vec<DiffRow>> {
        query_diff(&self.db, MISSING_RATING_CURVES_SQL)
    }
}

/// Runs the full validation: scan the library, ingest, write both reports.
///
/// # Errors
///
/// Returns an error on scan, database, or report-write failure. Per-leaf
/// parse failures are logged and skipped.
pub fn run(
    db: RatingCurvesDb,
    library_root: &str,
    options: &ValidateOptions,
) -> Result<ValidateSummary> {
    let mut index = LibraryIndex::attach(db)?;

    let (tx, rx) = bounded(scan::CHANNEL_CAPACITY);
    let entries = {
        let sql_tx = index.db.conn_mut().transaction()?;
        let entries = thread::scope(|scope| -> Result<usize> {
            let scanner =
                scope.spawn(move || scan::scan_library(library_root, options.concurrency, tx));
            let entries = ingest_rows(&sql_tx, rx)?;
            scanner.join().expect("library scanner panicked")?;
            Ok(entries)
        })?;
        sql_tx.commit()?;
        entries
    };
    tracing::info!(entries, "library scan complete");

    let missing_fims = report::write_diff(
        &options.missing_fims_path,
        &index.missing_fims()?,
        options.skip_empty,
    )?;
    let missing_rating_curves = report::write_diff(
        &options.missing_rating_curves_path,
        &index.missing_rating_curves()?,
        options.skip_empty,
    )?;

    Ok(ValidateSummary {
        entries,
        missing_fims,
        missing_rating_curves,
    })
}

/// Drains the channel into the scratch table, `INSERT_BATCH` rows per
/// statement. The trailing batch is shorter, so the statement text is built
/// per flush rather than prepared once.
fn ingest_rows(sql_tx: &Transaction<'_>, rx: Receiver<FimEntry>) -> Result<usize> {
    let mut batch: Vec<FimEntry> = Vec::with_capacity(INSERT_BATCH);
    let mut total = 0;

    for entry in rx {
        batch.push(entry);
        if batch.len() >= INSERT_BATCH {
            total += flush_batch(sql_tx, &mut batch)?;
        }
    }
    total += flush_batch(sql_tx, &mut batch)?;

    Ok(total)
}

fn flush_batch(sql_tx: &Transaction<'_>, batch: &mut Vec<FimEntry>) -> Result<usize> {
    if batch.is_empty() {
        return Ok(0);
    }

    let mut sql = String::from(
        "INSERT INTO scandb.fim_entries (reach_id, us_flow, ds_wse, boundary_condition) VALUES ",
    );
    sql.push_str(&vec!["(?,?,?,?)"; batch.len()].join(","));

    let values = batch.iter().flat_map(|entry| {
        [
            Value::Integer(entry.reach_id),
            Value::Integer(entry.us_flow),
            Value::Real(entry.ds_wse),
            Value::Text(entry.boundary.as_str().to_owned()),
        ]
    });
    sql_tx.execute(&sql, params_from_iter(values))?;

    let inserted = batch.len();
    batch.clear();
    Ok(inserted)
}

#[allow(clippy::cast_possible_truncation)]
fn query_diff(db: &RatingCurvesDb, sql: &str) -> Result<Vec<DiffRow>> {
    let mut stmt = db.conn().prepare(sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(DiffRow {
                reach_id: row.get(0)?,
                us_flow: row.get::<_, f64>(1)?.round() as i64,
                ds_wse: row.get(2)?,
                boundary: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<DiffRow>>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};
    use std::path::Path;

    use super::*;
    use crate::store::BoundaryCondition::{KnownWse, NormalDepth};
    use crate::testutil::{empty_db, insert_curve};
    use crate::BoundaryCondition;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        File::create(path).unwrap();
    }

    fn options_in(dir: &Path, skip_empty: bool) -> ValidateOptions {
        ValidateOptions {
            concurrency: 4,
            skip_empty,
            missing_fims_path: dir.join("missing_fims.csv"),
            missing_rating_curves_path: dir.join("missing_rating_curves.csv"),
        }
    }

    #[test]
    fn reports_both_directions_of_the_diff() {
        // Database: reaches 1 (kwse 2.5) and 2 (nd). Library: reach 2 (nd)
        // and reach 3 (kwse 4.0). Only reach 2 matches.
        let db = empty_db();
        insert_curve(&db, 1, 100.0, 5.0, 2.5, KnownWse);
        insert_curve(&db, 2, 130.0, 3.0, 7.3, NormalDepth);

        let lib = tempfile::tempdir().unwrap();
        touch(&lib.path().join("2/z_nd/f_130.tif"));
        touch(&lib.path().join("3/z_4_0/f_42.tif"));

        let out = tempfile::tempdir().unwrap();
        let options = options_in(out.path(), false);
        let summary = run(db, lib.path().to_str().unwrap(), &options).unwrap();

        assert_eq!(summary.entries, 2);
        assert_eq!(summary.missing_fims, Some(1));
        assert_eq!(summary.missing_rating_curves, Some(1));

        assert_eq!(
            fs::read_to_string(&options.missing_fims_path).unwrap(),
            "reach_id,us_flow,ds_wse,boundary_condition\n1,100,2.5,kwse\n"
        );
        assert_eq!(
            fs::read_to_string(&options.missing_rating_curves_path).unwrap(),
            "reach_id,us_flow,ds_wse,boundary_condition\n3,42,4.0,kwse\n"
        );
    }

    #[test]
    fn nd_rows_match_on_effective_stage_zero() {
        // The database carries a real ds_wse on the nd row; the library
        // encodes nd as z_nd with stage 0. They must still match.
        let db = empty_db();
        insert_curve(&db, 2, 130.0, 3.0, 7.3, NormalDepth);

        let lib = tempfile::tempdir().unwrap();
        touch(&lib.path().join("2/z_nd/f_130.tif"));

        let out = tempfile::tempdir().unwrap();
        let options = options_in(out.path(), false);
        let summary = run(db, lib.path().to_str().unwrap(), &options).unwrap();

        assert_eq!(summary.missing_fims, Some(0));
        assert_eq!(summary.missing_rating_curves, Some(0));
    }

    #[test]
    fn empty_library_reports_every_rating_curve() {
        let db = empty_db();
        insert_curve(&db, 1, 100.0, 5.0, 2.5, KnownWse);
        insert_curve(&db, 2, 130.0, 3.0, 0.0, NormalDepth);

        let lib = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let options = options_in(out.path(), false);
        let summary = run(db, lib.path().to_str().unwrap(), &options).unwrap();

        assert_eq!(summary.entries, 0);
        assert_eq!(summary.missing_fims, Some(2));
        assert_eq!(summary.missing_rating_curves, Some(0));
    }

    #[test]
    fn skip_empty_suppresses_matched_reports() {
        let db = empty_db();
        insert_curve(&db, 2, 130.0, 3.0, 0.0, NormalDepth);

        let lib = tempfile::tempdir().unwrap();
        touch(&lib.path().join("2/z_nd/f_130.tif"));

        let out = tempfile::tempdir().unwrap();
        let reports = out.path().join("reports");
        let options = ValidateOptions {
            concurrency: 2,
            skip_empty: true,
            missing_fims_path: reports.join("missing_fims.csv"),
            missing_rating_curves_path: reports.join("missing_rating_curves.csv"),
        };
        let summary = run(db, lib.path().to_str().unwrap(), &options).unwrap();

        assert_eq!(summary.missing_fims, None);
        assert_eq!(summary.missing_rating_curves, None);
        assert!(
            !reports.exists(),
            "skip-empty must not create the output directory"
        );
    }

    #[test]
    fn reports_are_ordered_by_reach_boundary_stage_flow() {
        let db = empty_db();
        insert_curve(&db, 9, 200.0, 5.0, 3.0, KnownWse);
        insert_curve(&db, 9, 100.0, 5.0, 3.0, KnownWse);
        insert_curve(&db, 9, 100.0, 5.0, 1.0, KnownWse);
        insert_curve(&db, 9, 100.0, 5.0, 0.0, NormalDepth);
        insert_curve(&db, 4, 100.0, 5.0, 1.0, KnownWse);

        let lib = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let options = options_in(out.path(), false);
        run(db, lib.path().to_str().unwrap(), &options).unwrap();

        assert_eq!(
            fs::read_to_string(&options.missing_fims_path).unwrap(),
            "reach_id,us_flow,ds_wse,boundary_condition\n\
             4,100,1.0,kwse\n\
             9,100,1.0,kwse\n\
             9,100,3.0,kwse\n\
             9,200,3.0,kwse\n\
             9,100,0.0,nd\n"
        );
    }

    #[test]
    fn scan_and_rating_curves_partition_cleanly() {
        // |matched| + |missing_fims| = |rating_curves| and
        // |matched| + |missing_rating_curves| = |fim_entries|.
        let db = empty_db();
        insert_curve(&db, 1, 100.0, 5.0, 2.5, KnownWse);
        insert_curve(&db, 2, 130.0, 3.0, 0.0, NormalDepth);
        insert_curve(&db, 3, 140.0, 3.0, 4.0, KnownWse);

        let lib = tempfile::tempdir().unwrap();
        touch(&lib.path().join("1/z_2_5/f_100.tif"));
        touch(&lib.path().join("3/z_9_9/f_140.tif"));

        let out = tempfile::tempdir().unwrap();
        let options = options_in(out.path(), false);
        let summary = run(db, lib.path().to_str().unwrap(), &options).unwrap();

        let rating_curves = 3;
        let fim_entries = summary.entries;
        let matched_db_side = rating_curves - summary.missing_fims.unwrap();
        let matched_lib_side = fim_entries - summary.missing_rating_curves.unwrap();
        assert_eq!(matched_db_side, matched_lib_side);
        assert_eq!(matched_db_side, 1);
    }

    #[test]
    fn ingests_full_batches_and_the_short_tail() {
        let mut index = LibraryIndex::attach(empty_db()).unwrap();
        let (tx, rx) = bounded(scan::CHANNEL_CAPACITY);

        let feeder = thread::spawn(move || {
            for i in 0..2500_i64 {
                tx.send(FimEntry {
                    reach_id: i,
                    us_flow: i,
                    ds_wse: 0.0,
                    boundary: BoundaryCondition::NormalDepth,
                })
                .unwrap();
            }
        });

        let sql_tx = index.db.conn_mut().transaction().unwrap();
        let total = ingest_rows(&sql_tx, rx).unwrap();
        sql_tx.commit().unwrap();
        feeder.join().unwrap();

        assert_eq!(total, 2500);
        let stored: i64 = index
            .db
            .conn()
            .query_row("SELECT COUNT(*) FROM scandb.fim_entries", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(stored, 2500);
    }
}
