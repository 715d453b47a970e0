//! One complete load: schema reset, staging, the ordered pipeline, and the
//! route geometry pass.

use serde::Serialize;

use crate::config::LoadOptions;
use crate::db::Backend;
use crate::error::Result;
use crate::fetch::HttpClient;
use crate::geometry::{GeometryOutcome, derive_route_geometries};
use crate::pipeline::{ExecutionContext, Pipeline, PipelineReport};
use crate::schema::Schema;
use crate::stage::stage;

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub pipeline: PipelineReport,
    pub geometry: GeometryOutcome,
}

/// Loads the feed at `source` into `backend`, replacing whatever the target
/// schema held.
///
/// # Errors
///
/// Any schema, staging, entity or geometry failure ends the load; nothing
/// already written is rolled back.
#[tracing::instrument(skip(backend, client), fields(dialect = backend.dialect()))]
pub async fn load_feed<C: HttpClient>(
    backend: &dyn Backend,
    options: &LoadOptions,
    source: &str,
    client: &C,
) -> Result<LoadSummary> {
    let schema = Schema::configure(options);
    schema.reset(backend)?;

    let staged = stage(source, client).await?;
    let ctx = ExecutionContext::new(backend, options, &schema, Some(staged));
    let pipeline = Pipeline::new(ctx).run()?;

    let geometry = derive_route_geometries(backend, options, &schema)?;

    Ok(LoadSummary { pipeline, geometry })
}
