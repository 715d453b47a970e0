//! Schema configuration: applies the load options to every entity kind and
//! recreates all tables from scratch.

use tracing::{debug, info};

use crate::config::LoadOptions;
use crate::db::Backend;
use crate::error::{GtfsDbError, Result};
use crate::model::{EntityKind, REGISTRY, Table};

/// Every entity kind's table, resolved against one set of load options.
#[derive(Debug)]
pub struct Schema {
    name: Option<String>,
    tables: Vec<Table>,
}

impl Schema {
    /// Applies the schema name to every kind, and geometry columns to the
    /// kinds that carry one when geospatial mode is on.
    pub fn configure(options: &LoadOptions) -> Self {
        Self {
            name: options.schema.clone(),
            tables: REGISTRY.iter().map(|loader| loader.configure(options)).collect(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn table(&self, kind: EntityKind) -> &Table {
        &self.tables[kind as usize]
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Drops every known table if it exists, then creates them all fresh.
    /// Existing data at the target is lost.
    ///
    /// # Errors
    ///
    /// [`GtfsDbError::Schema`] if the schema cannot be prepared or any table
    /// cannot be dropped or created.
    #[tracing::instrument(skip_all, fields(schema = self.name.as_deref().unwrap_or("main")))]
    pub fn reset(&self, backend: &dyn Backend) -> Result<()> {
        if let Some(name) = &self.name {
            backend.prepare_schema(name)?;
        }

        let conn = backend.connection();
        // Dependents first.
        for table in self.tables.iter().rev() {
            conn.execute(&table.drop_sql(), [])
                .map_err(|e| GtfsDbError::schema(table.qualified_name(), e))?;
        }

        for table in &self.tables {
            conn.execute(&table.create_sql(), [])
                .map_err(|e| GtfsDbError::schema(table.qualified_name(), e))?;
            for index in table.index_sql() {
                conn.execute(&index, [])
                    .map_err(|e| GtfsDbError::schema(table.qualified_name(), e))?;
            }
            debug!(table = table.qualified_name(), geometry = ?table.geometry(), "Created table");
        }

        info!(tables = self.tables.len(), "Schema recreated");
        Ok(())
    }
}
