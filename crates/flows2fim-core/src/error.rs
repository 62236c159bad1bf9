//! Error types for flows2fim.
//!
//! A single unified error type covers database access, input parsing, and
//! report emission. Error codes follow the pattern `F2F-XXX`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for flows2fim operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in flows2fim operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Rating-curves database file does not exist (F2F-001).
    #[error("[F2F-001] database file does not exist: {}", .0.display())]
    DatabaseMissing(PathBuf),

    /// Underlying SQLite error (F2F-002).
    #[error("[F2F-002] database error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// IO error (F2F-003).
    #[error("[F2F-003] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error (F2F-004).
    #[error("[F2F-004] CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed seed list (F2F-005).
    #[error("[F2F-005] invalid seed list: {0}")]
    SeedList(String),

    /// External listing utility failure for virtualized paths (F2F-006).
    #[error("[F2F-006] listing error: {0}")]
    Listing(String),
}

impl Error {
    /// Returns the error code (e.g., "F2F-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DatabaseMissing(_) => "F2F-001",
            Self::Sql(_) => "F2F-002",
            Self::Io(_) => "F2F-003",
            Self::Csv(_) => "F2F-004",
            Self::SeedList(_) => "F2F-005",
            Self::Listing(_) => "F2F-006",
        }
    }
}
