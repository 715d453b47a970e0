//! Resolved load options.
//!
//! The schema name and geospatial flag are decided once from the command line
//! and handed by reference to the schema configurator, every entity loader
//! and the geometry pass.

use crate::error::{GtfsDbError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Target schema; `None` loads into the default (`main`) database.
    pub schema: Option<String>,
    /// Adds geometry columns and enables the route geometry pass.
    pub geospatial: bool,
}

impl LoadOptions {
    /// Validates `schema` and builds the options. An empty schema name is
    /// treated as no schema.
    pub fn new(schema: Option<String>, geospatial: bool) -> Result<Self> {
        let schema = schema.filter(|s| !s.is_empty());
        if let Some(name) = &schema {
            if !is_identifier(name) {
                return Err(GtfsDbError::Configuration(format!(
                    "invalid schema name {name:?}: expected letters, digits and underscores"
                )));
            }
        }
        Ok(Self { schema, geospatial })
    }

    /// Prefixes `table` with the schema, if any.
    pub fn qualify(&self, table: &str) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{table}"),
            None => table.to_string(),
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_schema_names() {
        for name in ["gtfs", "_staging", "feed_2024"] {
            let options = LoadOptions::new(Some(name.to_string()), false).unwrap();
            assert_eq!(options.schema.as_deref(), Some(name));
        }
    }

    #[test]
    fn test_invalid_schema_name_is_configuration_error() {
        for name in ["2024", "bad name", "gtfs;drop", "x.y"] {
            let err = LoadOptions::new(Some(name.to_string()), false).unwrap_err();
            assert!(matches!(err, GtfsDbError::Configuration(_)), "{name}");
        }
    }

    #[test]
    fn test_empty_schema_means_none() {
        let options = LoadOptions::new(Some(String::new()), true).unwrap();
        assert_eq!(options.schema, None);
        assert!(options.geospatial);
    }

    #[test]
    fn test_qualify() {
        let plain = LoadOptions::default();
        assert_eq!(plain.qualify("routes"), "routes");

        let scoped = LoadOptions::new(Some("gtfs".to_string()), false).unwrap();
        assert_eq!(scoped.qualify("routes"), "gtfs.routes");
    }
}
