//! Loaders backed by one feed file each.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use geo_types::Point;
use rusqlite::types::Value;
use tracing::{info, warn};

use super::copy::{Conflict, Row, copy_csv};
use super::wkt::ToWkt;
use super::{EntityKind, EntityLoader, FileRequirement, GeometryKind, LoadInput, Source};
use crate::error::{LoadError, LoadResult};
use crate::pipeline::ExecutionContext;

/// Agency id given to an agency row that omits one.
pub const DEFAULT_AGENCY_ID: &str = "1";

/// Opens `name` under `dir`. A missing optional file yields `None`.
fn open_feed_file(
    dir: &Path,
    name: &str,
    requirement: FileRequirement,
) -> LoadResult<Option<File>> {
    let path = dir.join(name);
    if path.is_file() {
        return Ok(Some(File::open(path)?));
    }
    match requirement {
        FileRequirement::Required => Err(LoadError::MissingFile(name.to_string())),
        FileRequirement::Optional => {
            info!(file = name, "Optional feed file not present, table left empty");
            Ok(None)
        }
    }
}

fn copy_feed_file(
    ctx: &ExecutionContext<'_>,
    kind: EntityKind,
    input: LoadInput<'_>,
    name: &str,
    requirement: FileRequirement,
    prepare: impl FnMut(&mut Row<'_>) -> LoadResult<()>,
) -> LoadResult<usize> {
    match open_feed_file(input.directory()?, name, requirement)? {
        Some(file) => copy_csv(ctx, kind, name, file, Conflict::Abort, prepare),
        None => Ok(0),
    }
}

fn point_geometry(row: &mut Row<'_>, lat: &str, lon: &str) {
    if !row.wants_geometry() {
        return;
    }
    if let (Some(lat), Some(lon)) = (row.real(lat), row.real(lon)) {
        row.set_geometry(Point::new(lon, lat).to_wkt());
    }
}

/// A file copied as-is.
pub struct FeedFile {
    kind: EntityKind,
    file: &'static str,
    requirement: FileRequirement,
}

impl FeedFile {
    pub const fn required(kind: EntityKind, file: &'static str) -> Self {
        Self {
            kind,
            file,
            requirement: FileRequirement::Required,
        }
    }

    pub const fn optional(kind: EntityKind, file: &'static str) -> Self {
        Self {
            kind,
            file,
            requirement: FileRequirement::Optional,
        }
    }
}

impl EntityLoader for FeedFile {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    fn source(&self) -> Source {
        Source::File {
            name: self.file,
            requirement: self.requirement,
        }
    }

    fn load(&self, ctx: &ExecutionContext<'_>, input: LoadInput<'_>) -> LoadResult<usize> {
        copy_feed_file(ctx, self.kind, input, self.file, self.requirement, |_| Ok(()))
    }
}

/// `agency.txt`; rows without an `agency_id` get [`DEFAULT_AGENCY_ID`].
pub struct AgencyFile;

impl EntityLoader for AgencyFile {
    fn kind(&self) -> EntityKind {
        EntityKind::Agency
    }

    fn source(&self) -> Source {
        Source::File {
            name: "agency.txt",
            requirement: FileRequirement::Required,
        }
    }

    fn load(&self, ctx: &ExecutionContext<'_>, input: LoadInput<'_>) -> LoadResult<usize> {
        copy_feed_file(
            ctx,
            EntityKind::Agency,
            input,
            "agency.txt",
            FileRequirement::Required,
            |row| {
                if row.is_null("agency_id") {
                    row.set("agency_id", Value::Text(DEFAULT_AGENCY_ID.to_string()));
                }
                Ok(())
            },
        )
    }
}

/// Name given to route types the feed uses but the seed does not list.
pub const UNKNOWN_ROUTE_TYPE: &str = "Unknown";

/// `routes.txt`; when the feed has a single agency, routes without an
/// `agency_id` are assigned to it. Route types missing from the seed get a
/// placeholder lookup row.
pub struct RouteFile;

impl RouteFile {
    fn sole_agency(ctx: &ExecutionContext<'_>) -> LoadResult<Option<String>> {
        let sql = format!(
            "SELECT agency_id FROM {} LIMIT 2",
            ctx.table(EntityKind::Agency).qualified_name()
        );
        let mut stmt = ctx.connection().prepare(&sql)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(match ids.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        })
    }

    fn known_route_types(ctx: &ExecutionContext<'_>) -> LoadResult<HashSet<i64>> {
        let sql = format!(
            "SELECT route_type FROM {}",
            ctx.table(EntityKind::RouteType).qualified_name()
        );
        let mut stmt = ctx.connection().prepare(&sql)?;
        let codes = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(codes)
    }

    fn add_placeholder_route_type(ctx: &ExecutionContext<'_>, code: i64) -> LoadResult<()> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (route_type, route_type_name) VALUES (?1, ?2)",
            ctx.table(EntityKind::RouteType).qualified_name()
        );
        ctx.connection()
            .execute(&sql, rusqlite::params![code, UNKNOWN_ROUTE_TYPE])?;
        warn!(route_type = code, "Route type not in seed data, placeholder added");
        Ok(())
    }
}

impl EntityLoader for RouteFile {
    fn kind(&self) -> EntityKind {
        EntityKind::Route
    }

    fn source(&self) -> Source {
        Source::File {
            name: "routes.txt",
            requirement: FileRequirement::Required,
        }
    }

    /// Filled in after the load by the route geometry pass.
    fn geometry(&self) -> Option<GeometryKind> {
        Some(GeometryKind::MultiLineString)
    }

    fn load(&self, ctx: &ExecutionContext<'_>, input: LoadInput<'_>) -> LoadResult<usize> {
        let agency = Self::sole_agency(ctx)?;
        let mut known = Self::known_route_types(ctx)?;
        copy_feed_file(
            ctx,
            EntityKind::Route,
            input,
            "routes.txt",
            FileRequirement::Required,
            |row| {
                if let Some(agency) = agency.as_ref().filter(|_| row.is_null("agency_id")) {
                    row.set("agency_id", Value::Text(agency.clone()));
                }
                if let Some(code) = row.integer("route_type") {
                    if known.insert(code) {
                        Self::add_placeholder_route_type(ctx, code)?;
                    }
                }
                Ok(())
            },
        )
    }
}

pub struct StopFile;

impl EntityLoader for StopFile {
    fn kind(&self) -> EntityKind {
        EntityKind::Stop
    }

    fn source(&self) -> Source {
        Source::File {
            name: "stops.txt",
            requirement: FileRequirement::Required,
        }
    }

    fn geometry(&self) -> Option<GeometryKind> {
        Some(GeometryKind::Point)
    }

    fn load(&self, ctx: &ExecutionContext<'_>, input: LoadInput<'_>) -> LoadResult<usize> {
        copy_feed_file(
            ctx,
            EntityKind::Stop,
            input,
            "stops.txt",
            FileRequirement::Required,
            |row| {
                point_geometry(row, "stop_lat", "stop_lon");
                Ok(())
            },
        )
    }
}

pub struct ShapeFile;

impl EntityLoader for ShapeFile {
    fn kind(&self) -> EntityKind {
        EntityKind::Shape
    }

    fn source(&self) -> Source {
        Source::File {
            name: "shapes.txt",
            requirement: FileRequirement::Optional,
        }
    }

    fn geometry(&self) -> Option<GeometryKind> {
        Some(GeometryKind::Point)
    }

    fn load(&self, ctx: &ExecutionContext<'_>, input: LoadInput<'_>) -> LoadResult<usize> {
        copy_feed_file(
            ctx,
            EntityKind::Shape,
            input,
            "shapes.txt",
            FileRequirement::Optional,
            |row| {
                point_geometry(row, "shape_pt_lat", "shape_pt_lon");
                Ok(())
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_required_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_feed_file(dir.path(), "agency.txt", FileRequirement::Required).unwrap_err();
        assert!(matches!(err, LoadError::MissingFile(name) if name == "agency.txt"));
    }

    #[test]
    fn test_missing_optional_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = open_feed_file(dir.path(), "shapes.txt", FileRequirement::Optional).unwrap();
        assert!(file.is_none());
    }

    #[test]
    fn test_present_file_opens() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("stops.txt"), "stop_id\nS1\n").unwrap();
        let file = open_feed_file(dir.path(), "stops.txt", FileRequirement::Required).unwrap();
        assert!(file.is_some());
    }
}
