//! Table definitions and their schema-resolved form.

use super::EntityKind;
use crate::config::LoadOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    /// GTFS `YYYYMMDD`, stored as ISO `YYYY-MM-DD` text.
    Date,
}

impl ColumnType {
    fn sql(self) -> &'static str {
        match self {
            ColumnType::Text | ColumnType::Date => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

#[derive(Debug)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
}

/// A nullable column.
pub const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column {
        name,
        ty,
        nullable: true,
    }
}

/// A `NOT NULL` column.
pub const fn req(name: &'static str, ty: ColumnType) -> Column {
    Column {
        name,
        ty,
        nullable: false,
    }
}

#[derive(Debug)]
pub struct ForeignKey {
    pub columns: &'static [&'static str],
    pub parent: EntityKind,
    pub parent_columns: &'static [&'static str],
}

#[derive(Debug)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [Column],
    /// Empty means rowid only.
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
    /// Single-column secondary indexes.
    pub indexes: &'static [&'static str],
}

/// Geometry attached to a kind in geospatial mode, stored as WKT text in
/// a `geom` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    LineString,
    MultiLineString,
}

pub const GEOMETRY_COLUMN: &str = "geom";

/// A table with the load options applied: qualified name, and a geometry
/// column when geospatial mode is on and the kind has one.
#[derive(Debug)]
pub struct Table {
    pub kind: EntityKind,
    pub def: &'static TableDef,
    qualified: String,
    schema: Option<String>,
    geometry: Option<GeometryKind>,
}

impl Table {
    pub fn new(
        kind: EntityKind,
        def: &'static TableDef,
        geometry: Option<GeometryKind>,
        options: &LoadOptions,
    ) -> Self {
        Self {
            kind,
            def,
            qualified: options.qualify(def.name),
            schema: options.schema.clone(),
            geometry: geometry.filter(|_| options.geospatial),
        }
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified
    }

    pub fn geometry(&self) -> Option<GeometryKind> {
        self.geometry
    }

    /// Column names in insert order, `geom` last when present.
    pub fn column_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.def.columns.iter().map(|c| c.name).collect();
        if self.geometry.is_some() {
            names.push(GEOMETRY_COLUMN);
        }
        names
    }

    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .def
            .columns
            .iter()
            .map(|c| {
                let null = if c.nullable { "" } else { " NOT NULL" };
                format!("{} {}{}", c.name, c.ty.sql(), null)
            })
            .collect();

        if self.geometry.is_some() {
            parts.push(format!("{GEOMETRY_COLUMN} TEXT"));
        }
        if !self.def.primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", self.def.primary_key.join(", ")));
        }
        // SQLite resolves REFERENCES within the child's own schema.
        for fk in self.def.foreign_keys {
            parts.push(format!(
                "FOREIGN KEY ({}) REFERENCES {} ({})",
                fk.columns.join(", "),
                fk.parent.table_def().name,
                fk.parent_columns.join(", ")
            ));
        }

        format!(
            "CREATE TABLE {} (\n    {}\n)",
            self.qualified,
            parts.join(",\n    ")
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.qualified)
    }

    pub fn index_sql(&self) -> Vec<String> {
        self.def
            .indexes
            .iter()
            .map(|column| {
                let index = format!("ix_{}_{}", self.def.name, column);
                let index = match &self.schema {
                    Some(schema) => format!("{schema}.{index}"),
                    None => index,
                };
                format!(
                    "CREATE INDEX IF NOT EXISTS {index} ON {} ({column})",
                    self.def.name
                )
            })
            .collect()
    }

    pub fn insert_sql(&self, replace: bool) -> String {
        let names = self.column_names();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        let verb = if replace {
            "INSERT OR REPLACE"
        } else {
            "INSERT"
        };
        format!(
            "{verb} INTO {} ({}) VALUES ({})",
            self.qualified,
            names.join(", "),
            placeholders.join(", ")
        )
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}", self.qualified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tables;

    fn options(schema: Option<&str>, geospatial: bool) -> LoadOptions {
        LoadOptions::new(schema.map(str::to_string), geospatial).unwrap()
    }

    #[test]
    fn test_create_sql_has_keys_and_constraints() {
        let table = Table::new(EntityKind::Trip, &tables::TRIPS, None, &options(None, false));
        let sql = table.create_sql();

        assert!(sql.starts_with("CREATE TABLE trips ("));
        assert!(sql.contains("route_id TEXT NOT NULL"));
        assert!(sql.contains("PRIMARY KEY (trip_id)"));
        assert!(sql.contains("FOREIGN KEY (route_id) REFERENCES routes (route_id)"));
        assert!(!sql.contains("geom"));
    }

    #[test]
    fn test_geometry_column_only_in_geospatial_mode() {
        let plain = Table::new(
            EntityKind::Stop,
            &tables::STOPS,
            Some(GeometryKind::Point),
            &options(None, false),
        );
        assert_eq!(plain.geometry(), None);

        let spatial = Table::new(
            EntityKind::Stop,
            &tables::STOPS,
            Some(GeometryKind::Point),
            &options(None, true),
        );
        assert_eq!(spatial.geometry(), Some(GeometryKind::Point));
        assert!(spatial.create_sql().contains("geom TEXT"));
        assert_eq!(spatial.column_names().last(), Some(&"geom"));
    }

    #[test]
    fn test_schema_qualifies_names_but_not_references() {
        let table = Table::new(
            EntityKind::StopTime,
            &tables::STOP_TIMES,
            None,
            &options(Some("gtfs"), false),
        );

        assert_eq!(table.qualified_name(), "gtfs.stop_times");
        assert!(table.create_sql().contains("REFERENCES trips (trip_id)"));
        assert!(table.drop_sql().ends_with("gtfs.stop_times"));
        assert_eq!(
            table.index_sql()[0],
            "CREATE INDEX IF NOT EXISTS gtfs.ix_stop_times_stop_id ON stop_times (stop_id)"
        );
    }

    #[test]
    fn test_insert_sql_placeholders() {
        let table = Table::new(
            EntityKind::RouteType,
            &tables::ROUTE_TYPE,
            None,
            &options(None, false),
        );

        assert_eq!(
            table.insert_sql(false),
            "INSERT INTO route_type (route_type, route_type_name, route_type_desc) VALUES (?1, ?2, ?3)"
        );
        assert!(table.insert_sql(true).starts_with("INSERT OR REPLACE INTO"));
    }
}
