//! Table definitions for every entity kind.

use super::EntityKind;
use super::table::{ColumnType::*, ForeignKey, TableDef, col, req};

pub static ROUTE_TYPE: TableDef = TableDef {
    name: "route_type",
    columns: &[
        req("route_type", Integer),
        col("route_type_name", Text),
        col("route_type_desc", Text),
    ],
    primary_key: &["route_type"],
    foreign_keys: &[],
    indexes: &[],
};

pub static FEED_INFO: TableDef = TableDef {
    name: "feed_info",
    columns: &[
        req("feed_publisher_name", Text),
        req("feed_publisher_url", Text),
        req("feed_lang", Text),
        col("default_lang", Text),
        col("feed_start_date", Date),
        col("feed_end_date", Date),
        col("feed_version", Text),
        col("feed_contact_email", Text),
        col("feed_contact_url", Text),
    ],
    primary_key: &[],
    foreign_keys: &[],
    indexes: &[],
};

pub static AGENCY: TableDef = TableDef {
    name: "agency",
    columns: &[
        req("agency_id", Text),
        req("agency_name", Text),
        col("agency_url", Text),
        col("agency_timezone", Text),
        col("agency_lang", Text),
        col("agency_phone", Text),
        col("agency_fare_url", Text),
        col("agency_email", Text),
    ],
    primary_key: &["agency_id"],
    foreign_keys: &[],
    indexes: &[],
};

pub static CALENDAR: TableDef = TableDef {
    name: "calendar",
    columns: &[
        req("service_id", Text),
        req("monday", Integer),
        req("tuesday", Integer),
        req("wednesday", Integer),
        req("thursday", Integer),
        req("friday", Integer),
        req("saturday", Integer),
        req("sunday", Integer),
        req("start_date", Date),
        req("end_date", Date),
    ],
    primary_key: &["service_id"],
    foreign_keys: &[],
    indexes: &[],
};

pub static CALENDAR_DATES: TableDef = TableDef {
    name: "calendar_dates",
    columns: &[
        req("service_id", Text),
        req("date", Date),
        req("exception_type", Integer),
    ],
    primary_key: &["service_id", "date"],
    foreign_keys: &[],
    indexes: &[],
};

pub static ROUTES: TableDef = TableDef {
    name: "routes",
    columns: &[
        req("route_id", Text),
        col("agency_id", Text),
        col("route_short_name", Text),
        col("route_long_name", Text),
        col("route_desc", Text),
        req("route_type", Integer),
        col("route_url", Text),
        col("route_color", Text),
        col("route_text_color", Text),
        col("route_sort_order", Integer),
    ],
    primary_key: &["route_id"],
    foreign_keys: &[
        ForeignKey {
            columns: &["agency_id"],
            parent: EntityKind::Agency,
            parent_columns: &["agency_id"],
        },
        ForeignKey {
            columns: &["route_type"],
            parent: EntityKind::RouteType,
            parent_columns: &["route_type"],
        },
    ],
    indexes: &["agency_id"],
};

pub static STOPS: TableDef = TableDef {
    name: "stops",
    columns: &[
        req("stop_id", Text),
        col("stop_code", Text),
        col("stop_name", Text),
        col("stop_desc", Text),
        col("stop_lat", Real),
        col("stop_lon", Real),
        col("zone_id", Text),
        col("stop_url", Text),
        col("location_type", Integer),
        col("parent_station", Text),
        col("stop_timezone", Text),
        col("wheelchair_boarding", Integer),
        col("platform_code", Text),
    ],
    primary_key: &["stop_id"],
    foreign_keys: &[],
    indexes: &["parent_station"],
};

pub static TRANSFERS: TableDef = TableDef {
    name: "transfers",
    columns: &[
        col("from_stop_id", Text),
        col("to_stop_id", Text),
        col("from_route_id", Text),
        col("to_route_id", Text),
        col("from_trip_id", Text),
        col("to_trip_id", Text),
        col("transfer_type", Integer),
        col("min_transfer_time", Integer),
    ],
    primary_key: &[],
    foreign_keys: &[
        ForeignKey {
            columns: &["from_stop_id"],
            parent: EntityKind::Stop,
            parent_columns: &["stop_id"],
        },
        ForeignKey {
            columns: &["to_stop_id"],
            parent: EntityKind::Stop,
            parent_columns: &["stop_id"],
        },
    ],
    indexes: &[],
};

pub static SHAPES: TableDef = TableDef {
    name: "shapes",
    columns: &[
        req("shape_id", Text),
        req("shape_pt_lat", Real),
        req("shape_pt_lon", Real),
        req("shape_pt_sequence", Integer),
        col("shape_dist_traveled", Real),
    ],
    primary_key: &["shape_id", "shape_pt_sequence"],
    foreign_keys: &[],
    indexes: &[],
};

pub static PATTERNS: TableDef = TableDef {
    name: "patterns",
    columns: &[req("shape_id", Text), col("pattern_dist", Real)],
    primary_key: &["shape_id"],
    foreign_keys: &[],
    indexes: &[],
};

pub static TRIPS: TableDef = TableDef {
    name: "trips",
    columns: &[
        req("trip_id", Text),
        req("route_id", Text),
        req("service_id", Text),
        col("trip_headsign", Text),
        col("trip_short_name", Text),
        col("direction_id", Integer),
        col("block_id", Text),
        col("shape_id", Text),
        col("wheelchair_accessible", Integer),
        col("bikes_allowed", Integer),
    ],
    primary_key: &["trip_id"],
    foreign_keys: &[
        ForeignKey {
            columns: &["route_id"],
            parent: EntityKind::Route,
            parent_columns: &["route_id"],
        },
        ForeignKey {
            columns: &["shape_id"],
            parent: EntityKind::Pattern,
            parent_columns: &["shape_id"],
        },
    ],
    indexes: &["route_id", "service_id", "shape_id"],
};

pub static STOP_TIMES: TableDef = TableDef {
    name: "stop_times",
    columns: &[
        req("trip_id", Text),
        col("arrival_time", Text),
        col("departure_time", Text),
        req("stop_id", Text),
        req("stop_sequence", Integer),
        col("stop_headsign", Text),
        col("pickup_type", Integer),
        col("drop_off_type", Integer),
        col("shape_dist_traveled", Real),
        col("timepoint", Integer),
    ],
    primary_key: &["trip_id", "stop_sequence"],
    foreign_keys: &[
        ForeignKey {
            columns: &["trip_id"],
            parent: EntityKind::Trip,
            parent_columns: &["trip_id"],
        },
        ForeignKey {
            columns: &["stop_id"],
            parent: EntityKind::Stop,
            parent_columns: &["stop_id"],
        },
    ],
    indexes: &["stop_id"],
};

pub static FREQUENCIES: TableDef = TableDef {
    name: "frequencies",
    columns: &[
        req("trip_id", Text),
        req("start_time", Text),
        req("end_time", Text),
        req("headway_secs", Integer),
        col("exact_times", Integer),
    ],
    primary_key: &["trip_id", "start_time"],
    foreign_keys: &[ForeignKey {
        columns: &["trip_id"],
        parent: EntityKind::Trip,
        parent_columns: &["trip_id"],
    }],
    indexes: &[],
};

pub static FARE_ATTRIBUTES: TableDef = TableDef {
    name: "fare_attributes",
    columns: &[
        req("fare_id", Text),
        req("price", Real),
        req("currency_type", Text),
        req("payment_method", Integer),
        col("transfers", Integer),
        col("agency_id", Text),
        col("transfer_duration", Integer),
    ],
    primary_key: &["fare_id"],
    foreign_keys: &[ForeignKey {
        columns: &["agency_id"],
        parent: EntityKind::Agency,
        parent_columns: &["agency_id"],
    }],
    indexes: &[],
};

pub static FARE_RULES: TableDef = TableDef {
    name: "fare_rules",
    columns: &[
        req("fare_id", Text),
        col("route_id", Text),
        col("origin_id", Text),
        col("destination_id", Text),
        col("contains_id", Text),
    ],
    primary_key: &[],
    foreign_keys: &[
        ForeignKey {
            columns: &["fare_id"],
            parent: EntityKind::FareAttribute,
            parent_columns: &["fare_id"],
        },
        ForeignKey {
            columns: &["route_id"],
            parent: EntityKind::Route,
            parent_columns: &["route_id"],
        },
    ],
    indexes: &["fare_id"],
};

pub static UNIVERSAL_CALENDAR: TableDef = TableDef {
    name: "universal_calendar",
    columns: &[req("service_id", Text), req("date", Date)],
    primary_key: &["service_id", "date"],
    foreign_keys: &[],
    indexes: &["date"],
};
