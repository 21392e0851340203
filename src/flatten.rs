use crate::error::FlattenError;
use log::{debug, info, warn};
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Header of the timestamp column in every output file
pub const TIMESTAMP_HEADER: &str = "Timestamp_ms";

/// One table-to-CSV extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    /// Table holding the metric rows
    pub table: String,
    /// Column whose text is a JSON array of measurement objects
    pub json_column: String,
    /// Key of the measurement value inside each object
    pub value_key: String,
    /// Output CSV file
    pub output: PathBuf,
    /// Header of the value column
    pub value_header: String,
}

impl ExtractionJob {
    pub fn new(
        table: &str,
        json_column: &str,
        value_key: &str,
        output: impl Into<PathBuf>,
        value_header: &str,
    ) -> Self {
        ExtractionJob {
            table: table.to_string(),
            json_column: json_column.to_string(),
            value_key: value_key.to_string(),
            output: output.into(),
            value_header: value_header.to_string(),
        }
    }
}

/// A single measurement, rendered the way it is written to CSV
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRecord {
    pub timestamp: String,
    pub value: String,
}

/// Counters reported after a job finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenStats {
    /// Rows read from the table
    pub rows_scanned: usize,
    /// Rows whose payload could not be parsed
    pub rows_skipped: usize,
    /// Data lines written
    pub measurements: usize,
}

/// Renders a JSON scalar for CSV output. Strings lose their quotes; null is absent.
fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Parses one row payload and pulls out every complete (timestamp, value) pair.
///
/// The payload must be a JSON array of objects; anything else is an error and
/// the caller skips the row. Entries missing either key (or holding null for
/// it) are dropped without comment.
pub fn parse_entries(
    payload: &[u8],
    timestamp_key: &str,
    value_key: &str,
) -> Result<Vec<MetricRecord>, serde_json::Error> {
    let entries: Vec<Map<String, Value>> = serde_json::from_slice(payload)?;

    let records = entries
        .iter()
        .filter_map(|entry| {
            let timestamp = entry.get(timestamp_key).and_then(render_value)?;
            let value = entry.get(value_key).and_then(render_value)?;
            Some(MetricRecord { timestamp, value })
        })
        .collect();

    Ok(records)
}

/// Quotes an SQL identifier. Backticks are never reinterpreted as string literals.
fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Reads every payload of the job's JSON column. Non-text cells come back as `None`.
fn read_payloads(
    conn: &Connection,
    job: &ExtractionJob,
) -> rusqlite::Result<Vec<Option<Vec<u8>>>> {
    let query = format!(
        "SELECT {} FROM {}",
        quote_identifier(&job.json_column),
        quote_identifier(&job.table)
    );
    debug!("Running query: {}", query);

    let mut stmt = conn.prepare(&query)?;
    let payloads = stmt
        .query_map([], |row| {
            Ok(match row.get_ref(0)? {
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Some(bytes.to_vec()),
                _ => None,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(payloads)
}

/// Converts one table's JSON-array column into a two-column CSV.
///
/// A failing query leaves no output file behind. Rows that fail to parse are
/// skipped and counted in [`FlattenStats::rows_skipped`].
pub fn flatten(
    conn: &Connection,
    job: &ExtractionJob,
    timestamp_key: &str,
    output_path: &Path,
) -> Result<FlattenStats, FlattenError> {
    let payloads = read_payloads(conn, job).map_err(|source| FlattenError::Query {
        table: job.table.clone(),
        source,
    })?;
    info!("Found {} records in the table {}.", payloads.len(), job.table);

    let file = File::create(output_path).map_err(|source| FlattenError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    let value_header = format!(" {}", job.value_header);
    writer.write_record([TIMESTAMP_HEADER, value_header.as_str()])?;

    let mut stats = FlattenStats {
        rows_scanned: payloads.len(),
        ..FlattenStats::default()
    };

    for (index, payload) in payloads.iter().enumerate() {
        let Some(payload) = payload else {
            warn!(
                "Row {} in table {} has no JSON text, skipping",
                index, job.table
            );
            stats.rows_skipped += 1;
            continue;
        };

        match parse_entries(payload, timestamp_key, &job.value_key) {
            Ok(records) => {
                for record in &records {
                    writer.write_record([record.timestamp.as_str(), record.value.as_str()])?;
                }
                stats.measurements += records.len();
            }
            Err(e) => {
                warn!(
                    "Could not parse a JSON string in table {} (row {}): {}",
                    job.table, index, e
                );
                stats.rows_skipped += 1;
            }
        }
    }

    writer.flush().map_err(|source| FlattenError::Io {
        path: output_path.to_path_buf(),
        source,
    })?;

    info!(
        "Total measurements written to {}: {}",
        output_path.display(),
        stats.measurements
    );

    Ok(stats)
}
