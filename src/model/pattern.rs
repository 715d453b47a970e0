//! Patterns: one row per shape, derived from the loaded shape points.

use geo_types::{Coord, LineString};
use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::debug;

use super::copy::Row;
use super::table::Table;
use super::wkt::ToWkt;
use super::{EntityKind, EntityLoader, GeometryKind, LoadInput, Source};
use crate::error::LoadResult;
use crate::pipeline::ExecutionContext;

/// The ordered points of one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTrace {
    pub shape_id: String,
    pub line: LineString<f64>,
    /// Largest `shape_dist_traveled` among the points.
    pub distance: Option<f64>,
}

impl ShapeTrace {
    /// A trace needs two points to form a line.
    pub fn is_line(&self) -> bool {
        self.line.0.len() >= 2
    }
}

/// Reads every shape from `shapes`, points ordered by sequence.
pub fn read_shape_traces(conn: &Connection, shapes: &Table) -> rusqlite::Result<Vec<ShapeTrace>> {
    let sql = format!(
        "SELECT shape_id, shape_pt_lon, shape_pt_lat, shape_dist_traveled FROM {} \
         ORDER BY shape_id, shape_pt_sequence",
        shapes.qualified_name()
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    let mut traces: Vec<ShapeTrace> = Vec::new();
    while let Some(row) = rows.next()? {
        let shape_id: String = row.get(0)?;
        let point = Coord {
            x: row.get::<_, f64>(1)?,
            y: row.get::<_, f64>(2)?,
        };
        let dist: Option<f64> = row.get(3)?;

        let same_shape = traces.last().is_some_and(|t| t.shape_id == shape_id);
        if !same_shape {
            traces.push(ShapeTrace {
                shape_id,
                line: LineString::new(Vec::new()),
                distance: None,
            });
        }
        if let Some(trace) = traces.last_mut() {
            trace.line.0.push(point);
            trace.distance = match (trace.distance, dist) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (a, b) => a.or(b),
            };
        }
    }
    Ok(traces)
}

pub struct Patterns;

impl EntityLoader for Patterns {
    fn kind(&self) -> EntityKind {
        EntityKind::Pattern
    }

    fn source(&self) -> Source {
        Source::Derived
    }

    fn geometry(&self) -> Option<GeometryKind> {
        Some(GeometryKind::LineString)
    }

    fn reads(&self) -> &'static [EntityKind] {
        &[EntityKind::Shape]
    }

    fn load(&self, ctx: &ExecutionContext<'_>, _input: LoadInput<'_>) -> LoadResult<usize> {
        let table = ctx.table(EntityKind::Pattern);
        let traces = read_shape_traces(ctx.connection(), ctx.table(EntityKind::Shape))?;

        let tx = ctx.connection().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&table.insert_sql(false))?;
            for trace in &traces {
                let mut row = Row::empty(table);
                row.set("shape_id", Value::Text(trace.shape_id.clone()));
                row.set("pattern_dist", trace.distance.map_or(Value::Null, Value::Real));
                if trace.is_line() {
                    row.set_geometry(trace.line.to_wkt());
                } else {
                    debug!(shape_id = %trace.shape_id, "Shape has fewer than two points, no pattern geometry");
                }
                row.insert(&mut stmt)?;
            }
        }
        tx.commit()?;
        Ok(traces.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoadOptions;
    use crate::db::{Backend, SqliteBackend};
    use crate::schema::Schema;

    fn insert_shapes(backend: &SqliteBackend) {
        backend
            .connection()
            .execute_batch(
                "INSERT INTO shapes (shape_id, shape_pt_lat, shape_pt_lon, shape_pt_sequence, shape_dist_traveled) VALUES
                    ('A', 45.0, -122.0, 2, 1.5),
                    ('A', 45.5, -122.5, 1, 0.0),
                    ('A', 46.0, -123.0, 3, 3.0),
                    ('B', 40.0, -70.0, 1, NULL);",
            )
            .unwrap();
    }

    #[test]
    fn test_traces_are_grouped_and_ordered() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let options = LoadOptions::default();
        let schema = Schema::configure(&options);
        schema.reset(&backend).unwrap();
        insert_shapes(&backend);

        let traces =
            read_shape_traces(backend.connection(), schema.table(EntityKind::Shape)).unwrap();

        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].shape_id, "A");
        assert_eq!(traces[0].line.0[0], Coord { x: -122.5, y: 45.5 });
        assert_eq!(traces[0].distance, Some(3.0));
        assert!(traces[0].is_line());
        assert_eq!(traces[1].distance, None);
        assert!(!traces[1].is_line());
    }

    #[test]
    fn test_patterns_with_geometry() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let options = LoadOptions::new(None, true).unwrap();
        let schema = Schema::configure(&options);
        schema.reset(&backend).unwrap();
        insert_shapes(&backend);
        let ctx = ExecutionContext::new(&backend, &options, &schema, None);

        assert_eq!(Patterns.load(&ctx, LoadInput::Derived).unwrap(), 2);

        let (dist, geom): (Option<f64>, Option<String>) = backend
            .connection()
            .query_row(
                "SELECT pattern_dist, geom FROM patterns WHERE shape_id = 'A'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(dist, Some(3.0));
        assert_eq!(
            geom.as_deref(),
            Some("LINESTRING(-122.5 45.5, -122 45, -123 46)")
        );

        let single: Option<String> = backend
            .connection()
            .query_row("SELECT geom FROM patterns WHERE shape_id = 'B'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(single, None);
    }
}
