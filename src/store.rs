// 💾 Resolved Table Persistence
// Full-table CSV dump after a resolve run, reloaded on later runs so the
// rate-limited geocoding need not be repeated. No incremental caching.

use crate::record::{CollateralRecord, Coordinate};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

// ============================================================================
// RESOLVED ROW
// ============================================================================

/// On-disk shape of one resolved record. Unresolved fields stay empty cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResolvedRow {
    #[serde(rename = "Deal - Title")]
    title: String,

    #[serde(rename = "Deal - Č. úvěru")]
    loan_reference: String,

    #[serde(rename = "Hodnota")]
    value: i64,

    #[serde(rename = "Adresa")]
    address: String,

    #[serde(rename = "lat")]
    lat: Option<f64>,

    #[serde(rename = "lon")]
    lon: Option<f64>,

    #[serde(rename = "Kraj")]
    region: Option<String>,
}

impl From<&CollateralRecord> for ResolvedRow {
    fn from(record: &CollateralRecord) -> Self {
        ResolvedRow {
            title: record.title.clone(),
            loan_reference: record.loan_reference.clone(),
            value: record.value,
            address: record.address.clone(),
            lat: record.coordinate.map(|c| c.lat),
            lon: record.coordinate.map(|c| c.lon),
            region: record.region.clone(),
        }
    }
}

impl From<ResolvedRow> for CollateralRecord {
    fn from(row: ResolvedRow) -> Self {
        // A coordinate needs both halves
        let coordinate = match (row.lat, row.lon) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        };

        CollateralRecord {
            title: row.title,
            loan_reference: row.loan_reference,
            value: row.value,
            address: row.address,
            coordinate,
            region: row.region.filter(|r| !r.is_empty()),
        }
    }
}

// ============================================================================
// DUMP / RELOAD
// ============================================================================

/// Write the whole resolved table, one row per record, unresolved rows
/// included (their lat/lon/Kraj cells stay empty)
pub fn write_resolved(path: &Path, records: &[CollateralRecord]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create resolved table {:?}", path))?;
    write_resolved_to(file, records)
}

pub fn write_resolved_to<W: Write>(writer: W, records: &[CollateralRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(ResolvedRow::from(record))
            .context("Failed to serialize resolved row")?;
    }
    wtr.flush().context("Failed to flush resolved table")?;
    Ok(())
}

/// Reload a previously dumped table; unresolved rows come back with absent
/// coordinate and region
pub fn load_resolved(path: &Path) -> Result<Vec<CollateralRecord>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open resolved table {:?}", path))?;
    load_resolved_from(file)
}

pub fn load_resolved_from<R: Read>(reader: R) -> Result<Vec<CollateralRecord>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let row: ResolvedRow = result.context("Failed to deserialize resolved row")?;
        records.push(CollateralRecord::from(row));
    }

    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
