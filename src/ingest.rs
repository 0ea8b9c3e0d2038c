//! CSV ingest: uploaded bytes or a file on disk into validated rows.

use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::models::RawProductRow;
use crate::utils::error::{AppError, Result, EXPECTED_HEADERS};

/// Column positions of the three required headers.
#[derive(Debug, Clone, Copy)]
struct Columns {
    company: usize,
    catalog: usize,
    product: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };

        let found: Vec<Option<usize>> = EXPECTED_HEADERS.iter().map(|h| position(h)).collect();
        match found[..] {
            [Some(company), Some(catalog), Some(product)] => Ok(Self {
                company,
                catalog,
                product,
            }),
            _ => {
                let missing: Vec<&str> = EXPECTED_HEADERS
                    .iter()
                    .zip(&found)
                    .filter(|(_, pos)| pos.is_none())
                    .map(|(name, _)| *name)
                    .collect();
                Err(AppError::InvalidCsv {
                    message: format!("missing column(s) {}", missing.join(", ")),
                })
            }
        }
    }
}

/// Parses CSV from any reader. Rows with an empty required field are
/// dropped; a file with no surviving rows is an error.
pub fn parse_reader<R: Read>(reader: R) -> Result<Vec<RawProductRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = Columns::locate(reader.headers()?)?;

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        let row = RawProductRow::new(
            field(columns.company),
            field(columns.catalog),
            field(columns.product),
        );

        if row.is_valid() {
            rows.push(row);
        } else {
            dropped += 1;
        }
    }

    if dropped > 0 {
        debug!("Dropped {} CSV rows with missing fields", dropped);
    }
    if rows.is_empty() {
        return Err(AppError::NoValidRows);
    }

    info!("Parsed {} product rows", rows.len());
    Ok(rows)
}

pub fn parse_bytes(bytes: &[u8]) -> Result<Vec<RawProductRow>> {
    parse_reader(bytes)
}

pub fn read_path(path: &Path) -> Result<Vec<RawProductRow>> {
    debug!("Loading rows from {:?}", path);
    let file = std::fs::File::open(path)?;
    parse_reader(file)
}
