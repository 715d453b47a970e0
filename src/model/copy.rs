//! CSV → table copy shared by the file-backed and seed loaders.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use rusqlite::types::Value;
use tracing::debug;

use super::EntityKind;
use super::table::{Column, ColumnType, Table};
use crate::error::{LoadError, LoadResult};
use crate::pipeline::ExecutionContext;

/// What to do when an inserted row collides with an existing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Conflict {
    Abort,
    Replace,
}

/// One row of a [`Table`], values in insert order.
#[derive(Debug)]
pub struct Row<'t> {
    table: &'t Table,
    values: Vec<Value>,
}

impl<'t> Row<'t> {
    pub fn empty(table: &'t Table) -> Self {
        Self {
            table,
            values: vec![Value::Null; table.column_names().len()],
        }
    }

    fn parse(
        table: &'t Table,
        positions: &[Option<usize>],
        record: &StringRecord,
    ) -> Result<Self, String> {
        let mut row = Row::empty(table);
        for (i, (column, position)) in table.def.columns.iter().zip(positions).enumerate() {
            let raw = position.and_then(|p| record.get(p)).unwrap_or("");
            row.values[i] = parse_cell(column, raw)?;
        }
        Ok(row)
    }

    fn index(&self, column: &str) -> Option<usize> {
        self.table.def.columns.iter().position(|c| c.name == column)
    }

    pub fn text(&self, column: &str) -> Option<&str> {
        match self.values.get(self.index(column)?)? {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, column: &str) -> Option<i64> {
        match self.values.get(self.index(column)?)? {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn real(&self, column: &str) -> Option<f64> {
        match self.values.get(self.index(column)?)? {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn is_null(&self, column: &str) -> bool {
        self.index(column)
            .is_none_or(|i| matches!(self.values[i], Value::Null))
    }

    /// Sets a declared column; unknown names are ignored.
    pub fn set(&mut self, column: &str, value: Value) {
        if let Some(i) = self.index(column) {
            self.values[i] = value;
        }
    }

    /// Whether the table carries a geometry column in this run.
    pub fn wants_geometry(&self) -> bool {
        self.table.geometry().is_some()
    }

    /// Sets the WKT geometry; a no-op outside geospatial mode.
    pub fn set_geometry(&mut self, wkt: String) {
        if self.wants_geometry() {
            if let Some(last) = self.values.last_mut() {
                *last = Value::Text(wkt);
            }
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn check_required(&self) -> Result<(), String> {
        for (column, value) in self.table.def.columns.iter().zip(&self.values) {
            if !column.nullable && matches!(value, Value::Null) {
                return Err(format!("missing value for {}", column.name));
            }
        }
        Ok(())
    }

    pub(crate) fn insert(&self, stmt: &mut rusqlite::Statement<'_>) -> LoadResult<()> {
        self.check_required()
            .map_err(|message| LoadError::InvalidRow {
                table: self.table.name().to_string(),
                message,
            })?;
        stmt.execute(rusqlite::params_from_iter(self.values.iter()))?;
        Ok(())
    }
}

fn parse_cell(column: &Column, raw: &str) -> Result<Value, String> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    match column.ty {
        ColumnType::Text => Ok(Value::Text(raw.to_string())),
        ColumnType::Integer => raw
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| format!("{} is not an integer: {raw:?}", column.name)),
        ColumnType::Real => raw
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|_| format!("{} is not a number: {raw:?}", column.name)),
        ColumnType::Date => NaiveDate::parse_from_str(raw, "%Y%m%d")
            .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
            .map_err(|_| format!("{} is not a YYYYMMDD date: {raw:?}", column.name)),
    }
}

/// Copies every record of `reader` into `kind`'s table inside one
/// transaction. `prepare` sees each parsed row before it is checked and
/// inserted.
pub(crate) fn copy_csv<R: Read>(
    ctx: &ExecutionContext<'_>,
    kind: EntityKind,
    file: &str,
    reader: R,
    conflict: Conflict,
    mut prepare: impl FnMut(&mut Row<'_>) -> LoadResult<()>,
) -> LoadResult<usize> {
    let table = ctx.table(kind);
    let csv_error = |source| LoadError::Csv {
        file: file.to_string(),
        source,
    };

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();
    let positions: Vec<Option<usize>> = table
        .def
        .columns
        .iter()
        .map(|c| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}') == c.name)
        })
        .collect();

    let tx = ctx.connection().unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&table.insert_sql(conflict == Conflict::Replace))?;
        for record in rdr.records() {
            let record = record.map_err(csv_error)?;
            let line = record.position().map_or(0, |p| p.line());
            let malformed = |message| LoadError::MalformedRow {
                file: file.to_string(),
                line,
                message,
            };

            let mut row = Row::parse(table, &positions, &record).map_err(malformed)?;
            prepare(&mut row)?;
            row.check_required().map_err(malformed)?;
            stmt.execute(rusqlite::params_from_iter(row.values.iter()))?;
            count += 1;
        }
    }
    tx.commit()?;

    debug!(table = table.name(), file, rows = count, "Copied CSV rows");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::table::{col, req};

    #[test]
    fn test_parse_cell_types() {
        assert_eq!(
            parse_cell(&col("n", ColumnType::Integer), "42").unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            parse_cell(&col("x", ColumnType::Real), "-122.5").unwrap(),
            Value::Real(-122.5)
        );
        assert_eq!(
            parse_cell(&col("s", ColumnType::Text), "Main St").unwrap(),
            Value::Text("Main St".to_string())
        );
        assert_eq!(
            parse_cell(&req("d", ColumnType::Date), "20240131").unwrap(),
            Value::Text("2024-01-31".to_string())
        );
    }

    #[test]
    fn test_parse_cell_empty_is_null() {
        assert_eq!(
            parse_cell(&req("n", ColumnType::Integer), "").unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_parse_cell_rejects_bad_values() {
        let err = parse_cell(&col("direction_id", ColumnType::Integer), "north").unwrap_err();
        assert!(err.contains("direction_id"));
        assert!(parse_cell(&col("d", ColumnType::Date), "2024-01-31").is_err());
        assert!(parse_cell(&col("x", ColumnType::Real), "abc").is_err());
    }

    #[test]
    fn test_insert_rejects_row_missing_required_value() {
        use crate::config::LoadOptions;
        use crate::db::{Backend, SqliteBackend};
        use crate::schema::Schema;

        let backend = SqliteBackend::open_in_memory().unwrap();
        let schema = Schema::configure(&LoadOptions::default());
        schema.reset(&backend).unwrap();
        let table = schema.table(EntityKind::Pattern);
        let mut stmt = backend
            .connection()
            .prepare(&table.insert_sql(false))
            .unwrap();

        let err = Row::empty(table).insert(&mut stmt).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidRow { ref table, ref message }
                if table == "patterns" && message.contains("shape_id")
        ));
    }
}
