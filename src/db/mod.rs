//! Storage backends.
//!
//! The pipeline only needs a connection handle, the dialect name for
//! reporting, a capability query for spatial support and a way to make sure
//! the target schema exists. [`Backend`] is that seam; [`SqliteBackend`] is
//! the implementation behind `sqlite://` URLs.

mod sqlite;

pub use sqlite::{SPATIALITE_EXTENSION, SqliteBackend};

use std::path::PathBuf;

use rusqlite::Connection;

use crate::error::{GtfsDbError, Result};

pub trait Backend {
    /// Dialect name, used for reporting only.
    fn dialect(&self) -> &'static str;

    fn connection(&self) -> &Connection;

    /// Whether the backend has a spatial extension loaded.
    fn supports_spatial(&self) -> bool;

    /// Makes `schema` available for qualified table names.
    ///
    /// # Errors
    ///
    /// Returns [`GtfsDbError::Schema`] if the schema cannot be created.
    fn prepare_schema(&self, schema: &str) -> Result<()>;
}

/// Where a `sqlite://` URL points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

/// A parsed `--database_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    Sqlite(SqliteTarget),
}

impl DatabaseUrl {
    /// Parses a database URL.
    ///
    /// `sqlite://` and `sqlite:///:memory:` are in-memory databases,
    /// `sqlite:///relative.db` is relative to the working directory and
    /// `sqlite:////abs/path.db` is absolute.
    pub fn parse(url: &str) -> Result<Self> {
        let Some((scheme, rest)) = url.split_once("://") else {
            return Err(GtfsDbError::Configuration(format!(
                "malformed database URL {url:?}"
            )));
        };

        // Driver suffixes such as `sqlite+pysqlite` name the same dialect.
        let dialect = scheme.split('+').next().unwrap_or(scheme);
        if dialect != "sqlite" {
            return Err(GtfsDbError::Configuration(format!(
                "unsupported database dialect {dialect:?}"
            )));
        }

        let path = rest.strip_prefix('/').unwrap_or(rest);
        if !rest.is_empty() && !rest.starts_with('/') {
            return Err(GtfsDbError::Configuration(format!(
                "sqlite URLs take no host: {url:?}"
            )));
        }

        let target = match path {
            "" | ":memory:" => SqliteTarget::Memory,
            path => SqliteTarget::File(PathBuf::from(path)),
        };
        Ok(DatabaseUrl::Sqlite(target))
    }
}

/// Opens the backend named by `url`, loading `spatial_extension` if given.
pub fn connect(url: &str, spatial_extension: Option<&str>) -> Result<Box<dyn Backend>> {
    match DatabaseUrl::parse(url)? {
        DatabaseUrl::Sqlite(target) => {
            Ok(Box::new(SqliteBackend::open_with(target, spatial_extension)?))
        }
    }
}
