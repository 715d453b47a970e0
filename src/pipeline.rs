//! The dependency-ordered load pipeline.
//!
//! [`LOAD_ORDER`] is fixed: the lookup seed, then the feed files in an order
//! where every foreign-key parent precedes its dependents, with derived kinds
//! placed after the kinds they read. The staged feed directory is removed
//! right after the last file-backed load. Steps run strictly one after
//! another on the shared connection, and the first failure ends the run.

use std::path::Path;
use std::time::Instant;

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::LoadOptions;
use crate::db::Backend;
use crate::error::{GtfsDbError, Result};
use crate::model::{EntityKind, LoadInput, SeedMode, Source, Table};
use crate::schema::Schema;
use crate::stage::StagedFeed;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Load(EntityKind),
    /// Deletes the staged feed directory.
    RemoveStagedFeed,
}

pub const LOAD_ORDER: [Step; 17] = [
    Step::Load(EntityKind::RouteType),
    Step::Load(EntityKind::FeedInfo),
    Step::Load(EntityKind::Agency),
    Step::Load(EntityKind::Calendar),
    Step::Load(EntityKind::CalendarDate),
    Step::Load(EntityKind::Route),
    Step::Load(EntityKind::Stop),
    Step::Load(EntityKind::Transfer),
    Step::Load(EntityKind::Shape),
    Step::Load(EntityKind::Pattern),
    Step::Load(EntityKind::Trip),
    Step::Load(EntityKind::StopTime),
    Step::Load(EntityKind::Frequency),
    Step::Load(EntityKind::FareAttribute),
    Step::Load(EntityKind::FareRule),
    Step::RemoveStagedFeed,
    Step::Load(EntityKind::UniversalCalendar),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderViolation {
    #[error("{dependent} is loaded before {dependency}, which it depends on")]
    DependencyNotBefore {
        dependency: EntityKind,
        dependent: EntityKind,
    },

    #[error("{0} is loaded more than once")]
    Duplicate(EntityKind),

    #[error("{0} is never loaded")]
    Missing(EntityKind),

    #[error("{0} reads feed files after the staged feed is removed")]
    FileAfterRemoval(EntityKind),

    #[error("the staged feed must be removed exactly once")]
    Removal,
}

/// Checks `steps` against every kind's foreign keys and derived inputs.
pub fn validate_order(steps: &[Step]) -> std::result::Result<(), OrderViolation> {
    let mut seen: Vec<EntityKind> = Vec::new();
    let mut removed = false;

    for step in steps {
        let kind = match step {
            Step::RemoveStagedFeed => {
                if removed {
                    return Err(OrderViolation::Removal);
                }
                removed = true;
                continue;
            }
            Step::Load(kind) => *kind,
        };

        if seen.contains(&kind) {
            return Err(OrderViolation::Duplicate(kind));
        }

        let loader = kind.loader();
        if removed && matches!(loader.source(), Source::File { .. }) {
            return Err(OrderViolation::FileAfterRemoval(kind));
        }

        let parents = kind.table_def().foreign_keys.iter().map(|fk| fk.parent);
        for dependency in parents.chain(loader.reads().iter().copied()) {
            if dependency != kind && !seen.contains(&dependency) {
                return Err(OrderViolation::DependencyNotBefore {
                    dependency,
                    dependent: kind,
                });
            }
        }
        seen.push(kind);
    }

    if !removed {
        return Err(OrderViolation::Removal);
    }
    if let Some(missing) = EntityKind::ALL.iter().find(|k| !seen.contains(k)) {
        return Err(OrderViolation::Missing(*missing));
    }
    Ok(())
}

/// Everything a load step may touch. Built once per run; the staged feed is
/// the only part that changes, when it is removed.
pub struct ExecutionContext<'a> {
    backend: &'a dyn Backend,
    options: &'a LoadOptions,
    schema: &'a Schema,
    staged: Option<StagedFeed>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        backend: &'a dyn Backend,
        options: &'a LoadOptions,
        schema: &'a Schema,
        staged: Option<StagedFeed>,
    ) -> Self {
        Self {
            backend,
            options,
            schema,
            staged,
        }
    }

    pub fn connection(&self) -> &Connection {
        self.backend.connection()
    }

    pub fn options(&self) -> &LoadOptions {
        self.options
    }

    pub fn table(&self, kind: EntityKind) -> &Table {
        self.schema.table(kind)
    }

    /// The staged feed directory, until it is removed.
    pub fn source_dir(&self) -> Option<&Path> {
        self.staged.as_ref().map(StagedFeed::path)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub kind: EntityKind,
    pub table: String,
    pub rows: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PipelineReport {
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    pub fn rows(&self, kind: EntityKind) -> Option<usize> {
        self.steps.iter().find(|s| s.kind == kind).map(|s| s.rows)
    }

    pub fn total_rows(&self) -> usize {
        self.steps.iter().map(|s| s.rows).sum()
    }
}

pub struct Pipeline<'a> {
    ctx: ExecutionContext<'a>,
    steps: &'a [Step],
}

impl<'a> Pipeline<'a> {
    pub fn new(ctx: ExecutionContext<'a>) -> Self {
        Self {
            ctx,
            steps: &LOAD_ORDER,
        }
    }

    /// Runs a custom step list; it is validated like [`LOAD_ORDER`].
    pub fn with_steps(ctx: ExecutionContext<'a>, steps: &'a [Step]) -> Self {
        Self { ctx, steps }
    }

    /// Executes every step in order.
    ///
    /// # Errors
    ///
    /// The first failing step ends the run. Rows written by earlier steps
    /// stay in place.
    #[tracing::instrument(skip_all, fields(steps = self.steps.len()))]
    pub fn run(mut self) -> Result<PipelineReport> {
        validate_order(self.steps)
            .map_err(|v| GtfsDbError::Configuration(format!("invalid load order: {v}")))?;

        let mut report = PipelineReport::default();
        for step in self.steps {
            match *step {
                Step::Load(kind) => report.steps.push(self.load(kind)?),
                Step::RemoveStagedFeed => self.remove_staged_feed()?,
            }
        }

        info!(total_rows = report.total_rows(), "Pipeline complete");
        Ok(report)
    }

    fn load(&self, kind: EntityKind) -> Result<StepReport> {
        let loader = kind.loader();
        let table = self.ctx.table(kind).qualified_name().to_string();
        let input = match loader.source() {
            Source::Seed => LoadInput::Seed(SeedMode::Initial),
            Source::Derived => LoadInput::Derived,
            Source::File { .. } => match self.ctx.source_dir() {
                Some(dir) => LoadInput::Directory(dir),
                None => {
                    return Err(GtfsDbError::EntityLoad {
                        kind,
                        source: crate::error::LoadError::NoSourceDirectory,
                    });
                }
            },
        };

        let span = tracing::info_span!("load", kind = %kind, table = %table);
        let _entered = span.enter();

        let start = Instant::now();
        let rows = loader
            .load(&self.ctx, input)
            .map_err(|source| GtfsDbError::EntityLoad { kind, source })?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        info!(rows, elapsed_ms, "Loaded");
        Ok(StepReport {
            kind,
            table,
            rows,
            elapsed_ms,
        })
    }

    fn remove_staged_feed(&mut self) -> Result<()> {
        match self.ctx.staged.take() {
            Some(staged) => staged.remove(),
            None => {
                debug!("No staged feed to remove");
                Ok(())
            }
        }
    }
}
