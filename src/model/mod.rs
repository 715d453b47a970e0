//! Entity kinds and their loaders.
//!
//! Every kind is declared once in [`REGISTRY`], in load order. A loader
//! exposes where its rows come from ([`Source`]), an optional geometry
//! capability, and a uniform `load`.

mod copy;
mod feed;
mod pattern;
mod route_type;
pub mod table;
pub mod tables;
mod universal_calendar;
pub mod wkt;

pub use copy::Row;
pub use pattern::{ShapeTrace, read_shape_traces};
pub use table::{GeometryKind, Table, TableDef};

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::config::LoadOptions;
use crate::error::{LoadError, LoadResult};
use crate::pipeline::ExecutionContext;

use feed::{AgencyFile, FeedFile, RouteFile, ShapeFile, StopFile};
use pattern::Patterns;
use route_type::RouteTypes;
use universal_calendar::UniversalCalendar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    RouteType,
    FeedInfo,
    Agency,
    Calendar,
    CalendarDate,
    Route,
    Stop,
    Transfer,
    Shape,
    Pattern,
    Trip,
    StopTime,
    Frequency,
    FareAttribute,
    FareRule,
    UniversalCalendar,
}

impl EntityKind {
    pub const ALL: [EntityKind; 16] = [
        EntityKind::RouteType,
        EntityKind::FeedInfo,
        EntityKind::Agency,
        EntityKind::Calendar,
        EntityKind::CalendarDate,
        EntityKind::Route,
        EntityKind::Stop,
        EntityKind::Transfer,
        EntityKind::Shape,
        EntityKind::Pattern,
        EntityKind::Trip,
        EntityKind::StopTime,
        EntityKind::Frequency,
        EntityKind::FareAttribute,
        EntityKind::FareRule,
        EntityKind::UniversalCalendar,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::RouteType => "route_type",
            EntityKind::FeedInfo => "feed_info",
            EntityKind::Agency => "agency",
            EntityKind::Calendar => "calendar",
            EntityKind::CalendarDate => "calendar_date",
            EntityKind::Route => "route",
            EntityKind::Stop => "stop",
            EntityKind::Transfer => "transfer",
            EntityKind::Shape => "shape",
            EntityKind::Pattern => "pattern",
            EntityKind::Trip => "trip",
            EntityKind::StopTime => "stop_time",
            EntityKind::Frequency => "frequency",
            EntityKind::FareAttribute => "fare_attribute",
            EntityKind::FareRule => "fare_rule",
            EntityKind::UniversalCalendar => "universal_calendar",
        }
    }

    pub fn table_def(self) -> &'static TableDef {
        match self {
            EntityKind::RouteType => &tables::ROUTE_TYPE,
            EntityKind::FeedInfo => &tables::FEED_INFO,
            EntityKind::Agency => &tables::AGENCY,
            EntityKind::Calendar => &tables::CALENDAR,
            EntityKind::CalendarDate => &tables::CALENDAR_DATES,
            EntityKind::Route => &tables::ROUTES,
            EntityKind::Stop => &tables::STOPS,
            EntityKind::Transfer => &tables::TRANSFERS,
            EntityKind::Shape => &tables::SHAPES,
            EntityKind::Pattern => &tables::PATTERNS,
            EntityKind::Trip => &tables::TRIPS,
            EntityKind::StopTime => &tables::STOP_TIMES,
            EntityKind::Frequency => &tables::FREQUENCIES,
            EntityKind::FareAttribute => &tables::FARE_ATTRIBUTES,
            EntityKind::FareRule => &tables::FARE_RULES,
            EntityKind::UniversalCalendar => &tables::UNIVERSAL_CALENDAR,
        }
    }

    pub fn loader(self) -> &'static dyn EntityLoader {
        REGISTRY[self as usize]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a kind's feed file must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRequirement {
    /// Absence fails the load with [`LoadError::MissingFile`].
    Required,
    /// Absence leaves the table empty.
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Bundled dataset, independent of the feed.
    Seed,
    File {
        name: &'static str,
        requirement: FileRequirement,
    },
    /// Computed from rows already persisted by earlier kinds.
    Derived,
}

/// How a seed load treats rows that already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedMode {
    /// Plain inserts into freshly created tables.
    Initial,
    /// Insert-or-replace over existing rows.
    Reload,
}

#[derive(Debug, Clone, Copy)]
pub enum LoadInput<'a> {
    Seed(SeedMode),
    Directory(&'a Path),
    Derived,
}

impl<'a> LoadInput<'a> {
    pub fn directory(self) -> LoadResult<&'a Path> {
        match self {
            LoadInput::Directory(dir) => Ok(dir),
            _ => Err(LoadError::NoSourceDirectory),
        }
    }
}

pub trait EntityLoader: Sync {
    fn kind(&self) -> EntityKind;

    fn source(&self) -> Source;

    /// Geometry this kind carries in geospatial mode.
    fn geometry(&self) -> Option<GeometryKind> {
        None
    }

    /// Kinds whose persisted rows a derived load reads.
    fn reads(&self) -> &'static [EntityKind] {
        &[]
    }

    /// Applies the load options to this kind's table definition.
    fn configure(&self, options: &LoadOptions) -> Table {
        let kind = self.kind();
        Table::new(kind, kind.table_def(), self.geometry(), options)
    }

    /// Persists this kind's rows and returns how many were written.
    fn load(&self, ctx: &ExecutionContext<'_>, input: LoadInput<'_>) -> LoadResult<usize>;
}

static ROUTE_TYPE: RouteTypes = RouteTypes;
static FEED_INFO: FeedFile = FeedFile::optional(EntityKind::FeedInfo, "feed_info.txt");
static AGENCY: AgencyFile = AgencyFile;
static CALENDAR: FeedFile = FeedFile::optional(EntityKind::Calendar, "calendar.txt");
static CALENDAR_DATE: FeedFile =
    FeedFile::optional(EntityKind::CalendarDate, "calendar_dates.txt");
static ROUTE: RouteFile = RouteFile;
static STOP: StopFile = StopFile;
static TRANSFER: FeedFile = FeedFile::optional(EntityKind::Transfer, "transfers.txt");
static SHAPE: ShapeFile = ShapeFile;
static PATTERN: Patterns = Patterns;
static TRIP: FeedFile = FeedFile::required(EntityKind::Trip, "trips.txt");
static STOP_TIME: FeedFile = FeedFile::required(EntityKind::StopTime, "stop_times.txt");
static FREQUENCY: FeedFile = FeedFile::optional(EntityKind::Frequency, "frequencies.txt");
static FARE_ATTRIBUTE: FeedFile =
    FeedFile::optional(EntityKind::FareAttribute, "fare_attributes.txt");
static FARE_RULE: FeedFile = FeedFile::optional(EntityKind::FareRule, "fare_rules.txt");
static UNIVERSAL_CALENDAR: UniversalCalendar = UniversalCalendar;

/// Every entity kind, indexed by its [`EntityKind`] discriminant.
pub static REGISTRY: [&dyn EntityLoader; 16] = [
    &ROUTE_TYPE,
    &FEED_INFO,
    &AGENCY,
    &CALENDAR,
    &CALENDAR_DATE,
    &ROUTE,
    &STOP,
    &TRANSFER,
    &SHAPE,
    &PATTERN,
    &TRIP,
    &STOP_TIME,
    &FREQUENCY,
    &FARE_ATTRIBUTE,
    &FARE_RULE,
    &UNIVERSAL_CALENDAR,
];
