pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod load;
pub mod logging;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod schema;
pub mod stage;

pub use error::{GtfsDbError, LoadError, Result};
