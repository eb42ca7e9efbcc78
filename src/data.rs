use crate::catalog::{FieldCatalog, LATITUDE_COLUMN, LONGITUDE_COLUMN};
use crate::error::{MapError, Result};
use crate::types::{valid_coordinates, Place};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Spellings pandas reads as NaN; treated the same as an empty cell.
const MISSING_MARKERS: [&str; 7] = ["nan", "na", "n/a", "null", "none", "#n/a", "<na>"];

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    MissingName,
    MissingCoordinate { column: String },
    MalformedCoordinate { column: String, value: String },
    OutOfRange { latitude: f64, longitude: f64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingName => write!(f, "name is blank"),
            SkipReason::MissingCoordinate { column } => write!(f, "{} is blank", column),
            SkipReason::MalformedCoordinate { column, value } => {
                write!(f, "{} '{}' is not a number", column, value)
            }
            SkipReason::OutOfRange { latitude, longitude } => {
                write!(f, "coordinates ({}, {}) are out of range", latitude, longitude)
            }
        }
    }
}

/// A row left out of the marker layer. `line` is the 1-based line in the table.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingestion {
    pub places: Vec<Place>,
    pub skipped: Vec<SkippedRow>,
}

impl Ingestion {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub require_name: bool,
    pub extra_columns: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            require_name: true,
            extra_columns: Vec::new(),
        }
    }
}

pub fn ingest_path(path: &Path, catalog: &FieldCatalog, options: &IngestOptions) -> Result<Ingestion> {
    let file = File::open(path).map_err(|e| MapError::io(path, e))?;
    ingest(file, catalog, options)
}

/// Parse a delimited table into places, in row order.
///
/// Missing required headers or an unreadable table abort with `Parse`; bad
/// individual rows are only recorded in [`Ingestion::skipped`].
pub fn ingest<R: Read>(reader: R, catalog: &FieldCatalog, options: &IngestOptions) -> Result<Ingestion> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| MapError::parse("input table", e))?
        .clone();

    let col_indices: HashMap<&str, usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| (h, i))
        .collect();

    let required = |name: &str| {
        col_indices
            .get(name)
            .copied()
            .ok_or_else(|| MapError::parse("input table", format!("required column '{}' not found", name)))
    };
    let name_idx = required(catalog.title_column())?;
    let lat_idx = required(LATITUDE_COLUMN)?;
    let lon_idx = required(LONGITUDE_COLUMN)?;

    // Attribute columns that actually exist in this table, catalog order first
    let attribute_indices: Vec<(String, usize)> = catalog
        .attribute_columns()
        .chain(options.extra_columns.iter().map(String::as_str))
        .filter_map(|col| col_indices.get(col).map(|&i| (col.to_string(), i)))
        .collect();

    let mut ingestion = Ingestion::default();

    for result in rdr.records() {
        let record = result.map_err(|e| MapError::parse("input table", e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        match parse_row(&record, name_idx, lat_idx, lon_idx, &attribute_indices, options) {
            Ok(place) => ingestion.places.push(place),
            Err(reason) => {
                debug!(line, %reason, "Skipping row");
                ingestion.skipped.push(SkippedRow { line, reason });
            }
        }
    }

    info!(
        places = ingestion.places.len(),
        skipped = ingestion.skipped.len(),
        "Ingested input table"
    );
    Ok(ingestion)
}

fn parse_row(
    record: &StringRecord,
    name_idx: usize,
    lat_idx: usize,
    lon_idx: usize,
    attribute_indices: &[(String, usize)],
    options: &IngestOptions,
) -> std::result::Result<Place, SkipReason> {
    let name = cell(record, name_idx).map(str::to_string);
    if name.is_none() && options.require_name {
        return Err(SkipReason::MissingName);
    }

    let latitude = coordinate(record, lat_idx, LATITUDE_COLUMN)?;
    let longitude = coordinate(record, lon_idx, LONGITUDE_COLUMN)?;
    if !valid_coordinates(latitude, longitude) {
        return Err(SkipReason::OutOfRange { latitude, longitude });
    }

    let fields = attribute_indices
        .iter()
        .filter_map(|(col, idx)| cell(record, *idx).map(|v| (col.clone(), v.to_string())))
        .collect();

    Ok(Place {
        name,
        latitude,
        longitude,
        fields,
    })
}

/// Trimmed cell value, or `None` when the cell is absent, blank or a NaN marker.
fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    let value = record.get(idx)?.trim();
    if value.is_empty() || MISSING_MARKERS.iter().any(|m| value.eq_ignore_ascii_case(m)) {
        None
    } else {
        Some(value)
    }
}

fn coordinate(record: &StringRecord, idx: usize, column: &str) -> std::result::Result<f64, SkipReason> {
    let raw = cell(record, idx).ok_or_else(|| SkipReason::MissingCoordinate {
        column: column.to_string(),
    })?;
    raw.parse::<f64>().map_err(|_| SkipReason::MalformedCoordinate {
        column: column.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NAME_COLUMN, WEBSITE_COLUMN};
    use crate::error::ErrorKind;

    const HEADER: &str = "Organization or Agency Name,Latitude,Longitude,Organization or Agency Phone Number,Organization or Agency Website,Notes\n";

    fn run(body: &str, options: &IngestOptions) -> Result<Ingestion> {
        let table = format!("{}{}", HEADER, body);
        ingest(table.as_bytes(), &FieldCatalog::default(), options)
    }

    #[test]
    fn valid_rows_become_places_in_order() {
        let ingestion = run(
            "Acme,39.0,-76.6,555-1234,,\nBeta,38.5,-77.0,,beta.org,\n",
            &IngestOptions::default(),
        )
        .unwrap();

        assert_eq!(ingestion.places.len(), 2);
        assert_eq!(ingestion.skipped_count(), 0);
        let acme = &ingestion.places[0];
        assert_eq!(acme.name.as_deref(), Some("Acme"));
        assert_eq!(acme.latitude, 39.0);
        assert_eq!(acme.field("Organization or Agency Phone Number"), Some("555-1234"));
        assert_eq!(acme.field(WEBSITE_COLUMN), None);
        assert_eq!(ingestion.places[1].name.as_deref(), Some("Beta"));
        assert_eq!(ingestion.places[1].field(WEBSITE_COLUMN), Some("beta.org"));
    }

    #[test]
    fn blank_and_nan_cells_are_absent() {
        let ingestion = run("Acme,39.0,-76.6,   ,NaN,\n", &IngestOptions::default()).unwrap();
        assert!(ingestion.places[0].fields.is_empty());
    }

    #[test]
    fn bad_rows_are_skipped_and_counted() {
        let ingestion = run(
            ",39.0,-76.6,,,\nNoLat,,-76.6,,,\nWord,abc,-76.6,,,\nFar,95.0,-76.6,,,\nShort,39.0\nGood,39.1,-76.5,,,\n",
            &IngestOptions::default(),
        )
        .unwrap();

        assert_eq!(ingestion.places.len(), 1);
        assert_eq!(ingestion.skipped_count(), 5);
        let reasons: Vec<&SkipReason> = ingestion.skipped.iter().map(|s| &s.reason).collect();
        assert_eq!(reasons[0], &SkipReason::MissingName);
        assert_eq!(reasons[1], &SkipReason::MissingCoordinate { column: LATITUDE_COLUMN.into() });
        assert!(matches!(reasons[2], SkipReason::MalformedCoordinate { .. }));
        assert!(matches!(reasons[3], SkipReason::OutOfRange { .. }));
        assert_eq!(reasons[4], &SkipReason::MissingCoordinate { column: LONGITUDE_COLUMN.into() });
        assert_eq!(ingestion.skipped[0].line, 2);
    }

    #[test]
    fn nameless_rows_kept_when_name_not_required() {
        let options = IngestOptions {
            require_name: false,
            ..IngestOptions::default()
        };
        let ingestion = run(",39.0,-76.6,555-0000,,\n", &options).unwrap();
        assert_eq!(ingestion.places.len(), 1);
        assert_eq!(ingestion.places[0].name, None);
    }

    #[test]
    fn extra_columns_copied_only_when_declared() {
        let default = run("Acme,39.0,-76.6,,,Open late\n", &IngestOptions::default()).unwrap();
        assert_eq!(default.places[0].field("Notes"), None);

        let options = IngestOptions {
            extra_columns: vec!["Notes".into()],
            ..IngestOptions::default()
        };
        let ingestion = run("Acme,39.0,-76.6,,,Open late\n", &options).unwrap();
        assert_eq!(ingestion.places[0].field("Notes"), Some("Open late"));
    }

    #[test]
    fn missing_required_header_is_parse_error() {
        let table = format!("{},Latitude\nAcme,39.0\n", NAME_COLUMN);
        let err = ingest(table.as_bytes(), &FieldCatalog::default(), &IngestOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("Longitude"));
    }
}
