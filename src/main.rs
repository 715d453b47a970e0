//! `gtfsdb-load`: bulk-loads a static GTFS feed into a relational database.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use gtfsdb::config::LoadOptions;
use gtfsdb::db::SPATIALITE_EXTENSION;
use gtfsdb::fetch::BasicClient;
use gtfsdb::geometry::GeometryOutcome;
use gtfsdb::load::load_feed;
use gtfsdb::output::{append_report, print_json};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "gtfsdb-load")]
#[command(about = "Load a GTFS feed into a relational database", long_about = None)]
struct Cli {
    /// URL or local path to the GTFS zip file (or an extracted feed directory)
    #[arg(value_name = "FILE")]
    file: String,

    /// Database URL with appropriate privileges
    #[arg(long = "database_url", env = "DATABASE_URL", default_value = "sqlite://")]
    database_url: String,

    /// Database is geospatial: add geometry columns and derive route geometries
    #[arg(long = "is_geospatial", default_value_t = false)]
    is_geospatial: bool,

    /// SpatiaLite extension loaded in geospatial mode
    #[arg(long, env = "SPATIALITE_EXTENSION", default_value = SPATIALITE_EXTENSION)]
    spatialite: String,

    /// Database schema name
    #[arg(long, env = "GTFSDB_SCHEMA")]
    schema: Option<String>,

    /// Optional CSV file to append per-table row counts to
    #[arg(long, value_name = "CSV")]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = gtfsdb::logging::init();

    let cli = Cli::parse();

    let started = Instant::now();
    println!("begin time: {}", Local::now().format("%H:%M:%S"));

    if let Err(e) = run(&cli).await {
        error!(error = %e, "Load failed");
        return Err(e);
    }

    println!("end time: {}", Local::now().format("%H:%M:%S"));
    println!(
        "processing time: {:.0} seconds",
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

#[tracing::instrument(skip_all, fields(source = %cli.file))]
async fn run(cli: &Cli) -> Result<()> {
    let options = LoadOptions::new(cli.schema.clone(), cli.is_geospatial)?;
    let extension = cli.is_geospatial.then_some(cli.spatialite.as_str());
    let backend = gtfsdb::db::connect(&cli.database_url, extension)?;
    let client = BasicClient::new()?;

    let summary = load_feed(backend.as_ref(), &options, &cli.file, &client).await?;

    if let GeometryOutcome::Derived { elapsed, .. } = &summary.geometry {
        println!(" - routes geom ({:.0} seconds)", elapsed.as_secs_f64());
    }

    print_json(&summary)?;
    if let Some(path) = &cli.report {
        append_report(path, &summary.pipeline)?;
        info!(path = %path.display(), "Load report appended");
    }

    info!(
        tables = summary.pipeline.steps.len(),
        rows = summary.pipeline.total_rows(),
        "Feed loaded"
    );
    Ok(())
}
