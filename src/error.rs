//! Error taxonomy for a feed load.
//!
//! [`GtfsDbError`] is what the pipeline surfaces to the caller; every variant
//! is fatal to the run. [`LoadError`] is the failure of a single entity kind
//! and is always wrapped in [`GtfsDbError::EntityLoad`] by the pipeline.

use thiserror::Error;

use crate::model::EntityKind;

#[derive(Error, Debug)]
pub enum GtfsDbError {
    /// Invalid or unreachable database URL, invalid schema name.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Table drop/create or schema preparation failed.
    #[error("schema error on {object}: {message}")]
    Schema { object: String, message: String },

    /// The feed archive could not be fetched, read or extracted.
    #[error("could not stage feed from {location}: {message}")]
    SourceAcquisition { location: String, message: String },

    #[error("failed to load {kind}: {source}")]
    EntityLoad {
        kind: EntityKind,
        #[source]
        source: LoadError,
    },

    #[error("route geometry derivation failed: {0}")]
    GeometryDerivation(String),
}

impl GtfsDbError {
    pub(crate) fn schema(object: impl Into<String>, err: impl std::fmt::Display) -> Self {
        GtfsDbError::Schema {
            object: object.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn source_acquisition(location: &str, err: impl std::fmt::Display) -> Self {
        GtfsDbError::SourceAcquisition {
            location: location.to_string(),
            message: err.to_string(),
        }
    }
}

/// Failure of one entity kind's load.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("required file {0} is missing from the feed")]
    MissingFile(String),

    #[error("no staged feed directory is available")]
    NoSourceDirectory,

    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("{file} line {line}: {message}")]
    MalformedRow {
        file: String,
        line: u64,
        message: String,
    },

    /// A derived row is missing a required value.
    #[error("invalid row for {table}: {message}")]
    InvalidRow { table: String, message: String },

    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),

    #[error("database error: {0}")]
    Database(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for LoadError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("FOREIGN KEY") => {
                LoadError::ForeignKeyViolation(msg)
            }
            _ => LoadError::Database(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, GtfsDbError>;
pub type LoadResult<T> = std::result::Result<T, LoadError>;
