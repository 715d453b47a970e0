//! Route type lookup table, seeded from a dataset bundled with the binary.

use super::copy::{Conflict, copy_csv};
use super::{EntityKind, EntityLoader, LoadInput, SeedMode, Source};
use crate::error::LoadResult;
use crate::pipeline::ExecutionContext;

const SEED_FILE: &str = "route_type.txt";
const SEED_DATA: &str = include_str!("../../data/route_type.txt");

pub struct RouteTypes;

impl EntityLoader for RouteTypes {
    fn kind(&self) -> EntityKind {
        EntityKind::RouteType
    }

    fn source(&self) -> Source {
        Source::Seed
    }

    fn load(&self, ctx: &ExecutionContext<'_>, input: LoadInput<'_>) -> LoadResult<usize> {
        let conflict = match input {
            LoadInput::Seed(SeedMode::Reload) => Conflict::Replace,
            _ => Conflict::Abort,
        };
        copy_csv(
            ctx,
            EntityKind::RouteType,
            SEED_FILE,
            SEED_DATA.as_bytes(),
            conflict,
            |_| Ok(()),
        )
    }
}
