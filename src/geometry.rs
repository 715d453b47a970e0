//! Route geometry: a post-load pass that attaches a `MULTILINESTRING` to
//! each route from the shapes its trips follow.
//!
//! Runs only in geospatial mode on a backend that reports spatial support.
//! Routes whose trips reference no usable shape are skipped and counted;
//! they never fail the pass. Database errors abort it.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use geo_types::{LineString, MultiLineString};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::LoadOptions;
use crate::db::Backend;
use crate::error::{GtfsDbError, Result};
use crate::model::wkt::ToWkt;
use crate::model::{EntityKind, read_shape_traces};
use crate::schema::Schema;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeometryOutcome {
    /// Geospatial mode was off.
    NotRequested,
    /// The backend has no spatial support.
    Unsupported { dialect: &'static str },
    Derived {
        routes: usize,
        updated: usize,
        skipped: usize,
        elapsed: Duration,
    },
}

fn derivation_error(err: rusqlite::Error) -> GtfsDbError {
    GtfsDbError::GeometryDerivation(err.to_string())
}

/// Computes and stores every route's geometry, committing once at the end.
#[tracing::instrument(skip_all, fields(dialect = backend.dialect()))]
pub fn derive_route_geometries(
    backend: &dyn Backend,
    options: &LoadOptions,
    schema: &Schema,
) -> Result<GeometryOutcome> {
    if !options.geospatial {
        debug!("Geospatial mode off, route geometry not derived");
        return Ok(GeometryOutcome::NotRequested);
    }
    if !backend.supports_spatial() {
        info!(
            dialect = backend.dialect(),
            "Route geometry is not supported on this backend, skipping"
        );
        return Ok(GeometryOutcome::Unsupported {
            dialect: backend.dialect(),
        });
    }

    let start = Instant::now();
    let routes = schema.table(EntityKind::Route);
    let trips = schema.table(EntityKind::Trip);

    let tx = backend
        .connection()
        .unchecked_transaction()
        .map_err(derivation_error)?;

    let lines: HashMap<String, LineString<f64>> =
        read_shape_traces(&tx, schema.table(EntityKind::Shape))
            .map_err(derivation_error)?
            .into_iter()
            .filter(|t| t.is_line())
            .map(|t| (t.shape_id, t.line))
            .collect();

    let sql = format!(
        "SELECT r.route_id, t.shape_id FROM {} r \
         LEFT JOIN (SELECT DISTINCT route_id, shape_id FROM {} WHERE shape_id IS NOT NULL) t \
         ON t.route_id = r.route_id ORDER BY r.route_id, t.shape_id",
        routes.qualified_name(),
        trips.qualified_name()
    );
    let mut route_shapes: BTreeMap<String, Vec<String>> = BTreeMap::new();
    {
        let mut stmt = tx.prepare(&sql).map_err(derivation_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .map_err(derivation_error)?;
        for row in rows {
            let (route_id, shape_id) = row.map_err(derivation_error)?;
            let shapes = route_shapes.entry(route_id).or_default();
            shapes.extend(shape_id);
        }
    }

    let update = format!(
        "UPDATE {} SET geom = ?1 WHERE route_id = ?2",
        routes.qualified_name()
    );
    let mut updated = 0;
    let mut skipped = 0;
    {
        let mut stmt = tx.prepare(&update).map_err(derivation_error)?;
        for (route_id, shape_ids) in &route_shapes {
            let parts: Vec<LineString<f64>> = shape_ids
                .iter()
                .filter_map(|id| lines.get(id).cloned())
                .collect();
            if parts.is_empty() {
                debug!(route_id = %route_id, "No shape data for route, geometry skipped");
                skipped += 1;
                continue;
            }

            let geom = MultiLineString::new(parts).to_wkt();
            stmt.execute(rusqlite::params![geom, route_id])
                .map_err(derivation_error)?;
            updated += 1;
        }
    }
    tx.commit().map_err(derivation_error)?;

    let elapsed = start.elapsed();
    if skipped > 0 {
        warn!(skipped, "Routes without shape data have no geometry");
    }
    info!(
        routes = route_shapes.len(),
        updated,
        skipped,
        elapsed_secs = elapsed.as_secs_f64(),
        "Route geometries derived"
    );

    Ok(GeometryOutcome::Derived {
        routes: route_shapes.len(),
        updated,
        skipped,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteBackend;
    use rusqlite::Connection;

    /// SQLite that claims spatial support.
    struct Spatial(SqliteBackend);

    impl Backend for Spatial {
        fn dialect(&self) -> &'static str {
            "sqlite"
        }

        fn connection(&self) -> &Connection {
            self.0.connection()
        }

        fn supports_spatial(&self) -> bool {
            true
        }

        fn prepare_schema(&self, schema: &str) -> Result<()> {
            self.0.prepare_schema(schema)
        }
    }

    fn seeded(backend: &dyn Backend, options: &LoadOptions) -> Schema {
        let schema = Schema::configure(options);
        schema.reset(backend).unwrap();
        backend
            .connection()
            .execute_batch(
                "INSERT INTO route_type (route_type, route_type_name) VALUES (3, 'Bus');
                 INSERT INTO agency (agency_id, agency_name) VALUES ('A', 'Agency');
                 INSERT INTO routes (route_id, agency_id, route_type) VALUES ('R1', 'A', 3), ('R2', 'A', 3);
                 INSERT INTO shapes (shape_id, shape_pt_lat, shape_pt_lon, shape_pt_sequence) VALUES
                     ('S1', 45.0, -122.0, 1), ('S1', 45.1, -122.1, 2),
                     ('S2', 45.2, -122.2, 1), ('S2', 45.3, -122.3, 2);
                 INSERT INTO patterns (shape_id) VALUES ('S1'), ('S2');
                 INSERT INTO trips (trip_id, route_id, service_id, shape_id) VALUES
                     ('T1', 'R1', 'WK', 'S1'), ('T2', 'R1', 'WK', 'S2'), ('T3', 'R1', 'WK', 'S1'),
                     ('T4', 'R2', 'WK', NULL);",
            )
            .unwrap();
        schema
    }

    #[test]
    fn test_not_requested_without_geospatial_mode() {
        let backend = Spatial(SqliteBackend::open_in_memory().unwrap());
        let options = LoadOptions::default();
        let schema = seeded(&backend, &options);

        let outcome = derive_route_geometries(&backend, &options, &schema).unwrap();
        assert_eq!(outcome, GeometryOutcome::NotRequested);
    }

    #[test]
    fn test_unsupported_backend_is_skipped() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let options = LoadOptions::new(None, true).unwrap();
        let schema = seeded(&backend, &options);

        let outcome = derive_route_geometries(&backend, &options, &schema).unwrap();
        assert_eq!(outcome, GeometryOutcome::Unsupported { dialect: "sqlite" });

        let populated: i64 = backend
            .connection()
            .query_row("SELECT COUNT(*) FROM routes WHERE geom IS NOT NULL", [], |r| r.get(0))
            .unwrap();
        assert_eq!(populated, 0);
    }

    #[test]
    fn test_routes_with_shapes_get_geometry() {
        let backend = Spatial(SqliteBackend::open_in_memory().unwrap());
        let options = LoadOptions::new(None, true).unwrap();
        let schema = seeded(&backend, &options);

        let outcome = derive_route_geometries(&backend, &options, &schema).unwrap();
        let GeometryOutcome::Derived {
            routes,
            updated,
            skipped,
            ..
        } = outcome
        else {
            panic!("expected a derived outcome, got {outcome:?}");
        };
        assert_eq!((routes, updated, skipped), (2, 1, 1));

        let geom: String = backend
            .connection()
            .query_row("SELECT geom FROM routes WHERE route_id = 'R1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(
            geom,
            "MULTILINESTRING((-122 45, -122.1 45.1), (-122.2 45.2, -122.3 45.3))"
        );

        let r2: Option<String> = backend
            .connection()
            .query_row("SELECT geom FROM routes WHERE route_id = 'R2'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(r2, None);
    }

    #[test]
    fn test_route_identity_is_preserved() {
        let backend = Spatial(SqliteBackend::open_in_memory().unwrap());
        let options = LoadOptions::new(None, true).unwrap();
        let schema = seeded(&backend, &options);

        derive_route_geometries(&backend, &options, &schema).unwrap();

        let (count, agency): (i64, String) = backend
            .connection()
            .query_row(
                "SELECT COUNT(*), MIN(agency_id) FROM routes",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!((count, agency.as_str()), (2, "A"));
    }
}
