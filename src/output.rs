//! Load report output: JSON to the log, and CSV rows appended to a report
//! file.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::load::LoadSummary;
use crate::pipeline::PipelineReport;

/// One table's row in the report CSV.
#[derive(Debug, Serialize)]
pub struct TableRecord {
    pub timestamp: DateTime<Utc>,
    pub table: String,
    pub rows: usize,
    pub elapsed_ms: u64,
}

/// Logs the summary as pretty-printed JSON.
pub fn print_json(summary: &LoadSummary) -> Result<()> {
    debug!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// Appends one row per loaded table to the CSV at `path`, writing the header
/// only when the file is new.
pub fn append_report(path: &Path, report: &PipelineReport) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending load report");

    let file = OpenOptions::new().append(true).create(true).open(path)?;
    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    let timestamp = Utc::now();
    for step in &report.steps {
        writer.serialize(TableRecord {
            timestamp,
            table: step.table.clone(),
            rows: step.rows,
            elapsed_ms: step.elapsed_ms,
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::GeometryOutcome;
    use crate::model::EntityKind;
    use crate::pipeline::StepReport;
    use std::fs;

    fn report() -> PipelineReport {
        PipelineReport {
            steps: vec![
                StepReport {
                    kind: EntityKind::Agency,
                    table: "agency".to_string(),
                    rows: 1,
                    elapsed_ms: 3,
                },
                StepReport {
                    kind: EntityKind::Route,
                    table: "routes".to_string(),
                    rows: 12,
                    elapsed_ms: 9,
                },
            ],
        }
    }

    #[test]
    fn test_print_json_does_not_panic() {
        let summary = LoadSummary {
            pipeline: report(),
            geometry: GeometryOutcome::NotRequested,
        };
        print_json(&summary).unwrap();
    }

    #[test]
    fn test_append_report_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        append_report(&path, &report()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "timestamp,table,rows,elapsed_ms");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].contains(",routes,12,9"));
    }

    #[test]
    fn test_append_report_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");

        append_report(&path, &report()).unwrap();
        append_report(&path, &report()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("timestamp")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 5);
    }
}
