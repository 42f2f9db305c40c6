// 📥 Ingest - Raw Spreadsheet Reshape
// Unions the two collateral slots of each source row into one
// row-per-collateral table and drops candidates without an address

use crate::record::CollateralRecord;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// INPUT KIND DETECTION
// ============================================================================

/// Which pipeline an input file takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Raw export with the two collateral-slot column groups; needs
    /// reshape + resolution
    Raw,
    /// Already carries lat/lon/Kraj columns; bypasses resolution
    PreResolved,
}

impl InputKind {
    pub fn name(&self) -> &str {
        match self {
            InputKind::Raw => "raw",
            InputKind::PreResolved => "pre-resolved",
        }
    }
}

/// Detect the input kind by filename convention: anything with "gps" in the
/// file name is treated as a pre-resolved table
pub fn detect_input(path: &Path) -> InputKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if name.contains("gps") {
        InputKind::PreResolved
    } else {
        InputKind::Raw
    }
}

// ============================================================================
// RAW ROW
// ============================================================================

/// One row of the raw export, two collateral slots wide
#[derive(Debug, Clone, Deserialize)]
pub struct RawDealRow {
    #[serde(rename = "Deal - Title")]
    pub title: String,

    #[serde(rename = "Deal - Č. úvěru")]
    pub loan_reference: String,

    #[serde(rename = "Deal - 1. nemovitost - HODNOTA:")]
    #[serde(default)]
    pub primary_value: Option<String>,

    #[serde(rename = "Deal - Adresa zástavy 1")]
    #[serde(default)]
    pub primary_address: Option<String>,

    #[serde(rename = "Deal - 2. nemovitost - HODNOTA:")]
    #[serde(default)]
    pub secondary_value: Option<String>,

    #[serde(rename = "Deal - Adresa zástavy 2")]
    #[serde(default)]
    pub secondary_address: Option<String>,
}

impl RawDealRow {
    /// Both collateral slots of this row, in slot order
    fn slots(&self) -> [(&Option<String>, &Option<String>); 2] {
        [
            (&self.primary_value, &self.primary_address),
            (&self.secondary_value, &self.secondary_address),
        ]
    }
}

// ============================================================================
// RESHAPE
// ============================================================================

/// Outcome of the reshape step, kept for count-conservation checks
#[derive(Debug, Clone)]
pub struct ReshapeResult {
    pub records: Vec<CollateralRecord>,
    pub source_rows: usize,
    pub dropped_for_empty_address: usize,
}

/// Union the two collateral slots of every row into one record per slot,
/// dropping candidates whose address cell is empty.
///
/// Invariant: `records.len() == 2 * source_rows - dropped_for_empty_address`
pub fn reshape(rows: &[RawDealRow]) -> ReshapeResult {
    let mut records = Vec::new();
    let mut dropped = 0;

    for row in rows {
        for (value, address) in row.slots() {
            let address = address.as_deref().map(str::trim).unwrap_or("");
            if address.is_empty() {
                dropped += 1;
                continue;
            }

            records.push(CollateralRecord::new(
                row.title.clone(),
                row.loan_reference.clone(),
                parse_value(value.as_deref()),
                address.to_string(),
            ));
        }
    }

    ReshapeResult {
        records,
        source_rows: rows.len(),
        dropped_for_empty_address: dropped,
    }
}

/// Parse a value cell leniently: spaces, "Kč" and a decimal tail are
/// tolerated, blank or unparsable parses to 0
pub fn parse_value(cell: Option<&str>) -> i64 {
    let cell = match cell {
        Some(c) => c.trim(),
        None => return 0,
    };

    let mut digits = String::with_capacity(cell.len());
    for ch in cell.chars() {
        match ch {
            '0'..='9' => digits.push(ch),
            '-' if digits.is_empty() => digits.push(ch),
            // Decimal tail (haléře) is cut off
            '.' | ',' => break,
            ' ' | '\u{a0}' => continue,
            _ => continue,
        }
    }

    digits.parse().unwrap_or(0)
}

// ============================================================================
// LOADING
// ============================================================================

/// Load a raw export and reshape it into the row-per-collateral table
pub fn load_raw(path: &Path) -> Result<ReshapeResult> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open raw export {:?}", path))?;

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: RawDealRow = result.context("Failed to deserialize raw deal row")?;
        rows.push(row);
    }

    Ok(reshape(&rows))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_row(primary: Option<&str>, secondary: Option<&str>) -> RawDealRow {
        RawDealRow {
            title: "Novák - RD Beroun".to_string(),
            loan_reference: "UV-2023-0417".to_string(),
            primary_value: Some("4 500 000".to_string()),
            primary_address: primary.map(String::from),
            secondary_value: Some("2 100 000".to_string()),
            secondary_address: secondary.map(String::from),
        }
    }

    #[test]
    fn test_detect_input_by_filename() {
        assert_eq!(detect_input(Path::new("podklad.csv")), InputKind::Raw);
        assert_eq!(
            detect_input(Path::new("podklad_gps.csv")),
            InputKind::PreResolved
        );
        assert_eq!(
            detect_input(Path::new("data/PODKLAD_GPS.CSV")),
            InputKind::PreResolved
        );
    }

    #[test]
    fn test_reshape_both_slots() {
        let rows = vec![create_test_row(
            Some("Husova 12, Beroun"),
            Some("Nádražní 3, Zdice"),
        )];
        let result = reshape(&rows);

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.dropped_for_empty_address, 0);
        assert_eq!(result.records[0].address, "Husova 12, Beroun");
        assert_eq!(result.records[0].value, 4_500_000);
        assert_eq!(result.records[1].address, "Nádražní 3, Zdice");
        assert_eq!(result.records[1].value, 2_100_000);
        // Both slots share title and loan reference
        assert_eq!(result.records[0].title, result.records[1].title);
        assert_eq!(
            result.records[0].loan_reference,
            result.records[1].loan_reference
        );
    }

    #[test]
    fn test_reshape_drops_empty_addresses() {
        let rows = vec![
            create_test_row(Some("Husova 12, Beroun"), None),
            create_test_row(None, Some("Nádražní 3, Zdice")),
            create_test_row(Some("  "), Some("")),
        ];
        let result = reshape(&rows);

        assert_eq!(result.records.len(), 2);
        assert_eq!(result.dropped_for_empty_address, 4);
    }

    #[test]
    fn test_count_conservation() {
        let rows = vec![
            create_test_row(Some("Husova 12, Beroun"), Some("Nádražní 3, Zdice")),
            create_test_row(Some("Dlouhá 8, Praha"), None),
            create_test_row(None, None),
        ];
        let result = reshape(&rows);

        assert_eq!(
            result.records.len(),
            2 * result.source_rows - result.dropped_for_empty_address
        );
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.dropped_for_empty_address, 3);
    }

    #[test]
    fn test_primary_only_scenario_yields_three_candidates() {
        // Three rows with only the primary slot populated
        let rows = vec![
            create_test_row(Some("Husova 12, Beroun"), None),
            create_test_row(Some("Dlouhá 8, Praha"), None),
            create_test_row(Some("Masarykova 1, Brno"), None),
        ];
        let result = reshape(&rows);

        assert_eq!(result.records.len(), 3);
        assert_eq!(result.dropped_for_empty_address, 3);

        // No duplicate addresses among the candidates
        let mut addresses: Vec<&str> =
            result.records.iter().map(|r| r.address.as_str()).collect();
        addresses.sort();
        addresses.dedup();
        assert_eq!(addresses.len(), 3);
    }

    #[test]
    fn test_parse_value_lenient() {
        assert_eq!(parse_value(Some("4500000")), 4_500_000);
        assert_eq!(parse_value(Some("4 500 000")), 4_500_000);
        assert_eq!(parse_value(Some("4 500 000 Kč")), 4_500_000);
        assert_eq!(parse_value(Some("4500000.00")), 4_500_000);
        assert_eq!(parse_value(Some("4500000,50")), 4_500_000);
        assert_eq!(parse_value(Some("")), 0);
        assert_eq!(parse_value(Some("n/a")), 0);
        assert_eq!(parse_value(None), 0);
    }
}
