use std::path::PathBuf;

use rusqlite::{Connection, LoadExtensionGuard};
use tracing::{debug, info, warn};

use super::{Backend, SqliteTarget};
use crate::error::{GtfsDbError, Result};

/// SQLite through `rusqlite`, with foreign keys enforced.
///
/// Schemas are attached databases: `:memory:` for an in-memory main
/// database, otherwise a sibling file `<stem>.<schema>.db`.
pub struct SqliteBackend {
    conn: Connection,
    target: SqliteTarget,
    spatial: bool,
}

/// Default name of the SpatiaLite loadable extension.
pub const SPATIALITE_EXTENSION: &str = "mod_spatialite";

fn load_extension(conn: &Connection, name: &str) -> rusqlite::Result<()> {
    // SAFETY: the extension is chosen by the operator, and loading is
    // switched off again when the guard drops.
    unsafe {
        let _guard = LoadExtensionGuard::new(conn)?;
        conn.load_extension(name, None::<&str>)
    }
}

impl SqliteBackend {
    /// Opens `target` without any spatial extension.
    pub fn open(target: SqliteTarget) -> Result<Self> {
        Self::open_with(target, None)
    }

    /// Opens `target`, loading the spatial extension `extension` when given.
    ///
    /// A missing or broken extension is not an error: the backend then
    /// reports no spatial support and geometry derivation is skipped.
    pub fn open_with(target: SqliteTarget, extension: Option<&str>) -> Result<Self> {
        let conn = match &target {
            SqliteTarget::Memory => Connection::open_in_memory(),
            SqliteTarget::File(path) => Connection::open(path),
        }
        .map_err(|e| GtfsDbError::Configuration(format!("cannot open {target:?}: {e}")))?;

        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| GtfsDbError::Configuration(format!("cannot enable foreign keys: {e}")))?;

        if let Some(name) = extension {
            match load_extension(&conn, name) {
                Ok(()) => info!(extension = name, "Loaded spatial extension"),
                Err(e) => warn!(extension = name, error = %e, "Spatial extension unavailable"),
            }
        }

        let spatial = conn
            .query_row("SELECT spatialite_version()", [], |row| row.get::<_, String>(0))
            .is_ok();
        debug!(?target, spatial, "Opened SQLite database");

        Ok(Self {
            conn,
            target,
            spatial,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::open(SqliteTarget::Memory)
    }

    fn attached(&self) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self.conn.prepare("PRAGMA database_list")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn schema_location(&self, schema: &str) -> String {
        match &self.target {
            SqliteTarget::Memory => ":memory:".to_string(),
            SqliteTarget::File(path) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "gtfs".to_string());
                let sibling: PathBuf = path.with_file_name(format!("{stem}.{schema}.db"));
                sibling.to_string_lossy().into_owned()
            }
        }
    }
}

impl Backend for SqliteBackend {
    fn dialect(&self) -> &'static str {
        "sqlite"
    }

    fn connection(&self) -> &Connection {
        &self.conn
    }

    fn supports_spatial(&self) -> bool {
        self.spatial
    }

    fn prepare_schema(&self, schema: &str) -> Result<()> {
        let attached = self
            .attached()
            .map_err(|e| GtfsDbError::schema(schema, e))?;
        if attached.iter().any(|name| name == schema) {
            debug!(schema, "Schema already attached");
            return Ok(());
        }

        let location = self.schema_location(schema);
        // The alias cannot be bound; callers validate it as an identifier.
        self.conn
            .execute(&format!("ATTACH DATABASE ?1 AS {schema}"), [&location])
            .map_err(|e| GtfsDbError::schema(schema, e))?;

        info!(schema, location, "Attached schema");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreign_keys_enabled() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let enabled: i64 = backend
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_plain_open_has_no_spatial_support() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(!backend.supports_spatial());
    }

    #[test]
    fn test_unknown_extension_falls_back_to_non_spatial() {
        let backend =
            SqliteBackend::open_with(SqliteTarget::Memory, Some("gtfsdb_no_such_extension")).unwrap();
        assert!(!backend.supports_spatial());

        let one: i64 = backend
            .connection()
            .query_row("SELECT 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(one, 1);
    }

    #[test]
    fn test_spatial_support_follows_spatialite_availability() {
        let backend =
            SqliteBackend::open_with(SqliteTarget::Memory, Some(SPATIALITE_EXTENSION)).unwrap();
        let answers = backend
            .connection()
            .query_row("SELECT spatialite_version()", [], |row| row.get::<_, String>(0))
            .is_ok();
        assert_eq!(backend.supports_spatial(), answers);
    }

    #[test]
    fn test_prepare_schema_attaches_once() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.prepare_schema("gtfs").unwrap();
        backend.prepare_schema("gtfs").unwrap();

        let attached = backend.attached().unwrap();
        assert_eq!(attached.iter().filter(|n| *n == "gtfs").count(), 1);
    }

    #[test]
    fn test_main_schema_is_already_available() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.prepare_schema("main").unwrap();
    }

    #[test]
    fn test_file_schema_uses_sibling_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("feed.db");
        let backend = SqliteBackend::open(SqliteTarget::File(db)).unwrap();

        backend.prepare_schema("gtfs").unwrap();
        backend
            .connection()
            .execute("CREATE TABLE gtfs.probe (id INTEGER)", [])
            .unwrap();

        assert!(dir.path().join("feed.gtfs.db").exists());
    }

    #[test]
    fn test_unopenable_schema_is_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("feed.gtfs.db")).unwrap();
        let backend = SqliteBackend::open(SqliteTarget::File(dir.path().join("feed.db"))).unwrap();

        let err = backend.prepare_schema("gtfs").unwrap_err();
        assert!(matches!(err, GtfsDbError::Schema { .. }));
    }
}
