//! # flows2fim core
//!
//! Composes flood inundation maps (FIMs) for river networks from a
//! precomputed FIM library and a rating-curves database.
//!
//! The two central pieces are the upstream-propagating control-selection
//! engine ([`controls`]) and the library/database cross-validation pipeline
//! ([`scan`] + [`validate`]). Everything else is input loading and report
//! emission around them.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use flows2fim_core::{controls, flows, seeds, RatingCurvesDb};
//!
//! let db = RatingCurvesDb::open("./reach_data.db")?;
//! let flows = flows::read_flows("./flows_100yr.csv")?;
//! let seeds = seeds::from_lists("8489318", "nd")?;
//!
//! let results = controls::select_controls(&db, &flows, &seeds)?;
//! controls::write_controls("./controls.csv", &results)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod controls;
pub mod error;
pub mod flows;
pub mod library;
pub mod report;
pub mod scan;
pub mod seeds;
pub mod store;
#[cfg(test)]
pub(crate) mod testutil;
pub mod validate;

pub use controls::ControlResult;
pub use error::{Error, Result};
pub use library::FimEntry;
pub use seeds::{Seed, SeedControl};
pub use store::{BoundaryCondition, RatingCurveRow, RatingCurvesDb};

/// Opaque integer identifier of a reach.
pub type ReachId = i64;
