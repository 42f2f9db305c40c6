// 🏠 Collateral Record - Core Data Model
// One record per secured property, enriched in place by the resolver

use serde::{Deserialize, Serialize};

// ============================================================================
// KNOWN REGIONS
// ============================================================================

/// The fixed set of administrative regions offered for selection.
/// 14 Czech kraje plus Trnavský kraj (one Slovak region appears in the data).
pub const KNOWN_REGIONS: [&str; 15] = [
    "Hlavní město Praha",
    "Středočeský kraj",
    "Jihočeský kraj",
    "Plzeňský kraj",
    "Karlovarský kraj",
    "Ústecký kraj",
    "Liberecký kraj",
    "Královéhradecký kraj",
    "Pardubický kraj",
    "Kraj Vysočina",
    "Jihomoravský kraj",
    "Zlínský kraj",
    "Olomoucký kraj",
    "Moravskoslezský kraj",
    "Trnavský kraj",
];

/// Check whether a region name is one of the known 15
pub fn is_known_region(name: &str) -> bool {
    KNOWN_REGIONS.contains(&name)
}

// ============================================================================
// COORDINATE
// ============================================================================

/// Geographic coordinate (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinate { lat, lon }
    }
}

// ============================================================================
// COLLATERAL RECORD
// ============================================================================

/// One secured property derived from a collateral slot of a source row.
///
/// `coordinate` and `region` start absent and are populated once by the
/// resolver; after that the record set is immutable for the session and
/// filtering only ever produces views over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralRecord {
    /// Deal display name
    pub title: String,

    /// Loan number ("Č. úvěru")
    pub loan_reference: String,

    /// Monetary value in CZK
    pub value: i64,

    /// Free-text postal address, non-empty by construction
    pub address: String,

    /// Absent until resolved; absent permanently if resolution failed
    pub coordinate: Option<Coordinate>,

    /// Administrative region (kraj), absent when reverse lookup found none
    pub region: Option<String>,
}

impl CollateralRecord {
    /// Create an unresolved record (coordinate/region to be filled in later)
    pub fn new(title: String, loan_reference: String, value: i64, address: String) -> Self {
        CollateralRecord {
            title,
            loan_reference,
            value,
            address,
            coordinate: None,
            region: None,
        }
    }

    /// A record participates in map rendering only if it has a coordinate
    pub fn on_map(&self) -> bool {
        self.coordinate.is_some()
    }

    /// A record participates in region aggregation only if it has a region
    pub fn in_region_counts(&self) -> bool {
        self.region.is_some()
    }

    /// Value formatted for display, e.g. "1 234 567 Kč"
    pub fn formatted_value(&self) -> String {
        format_czk(self.value)
    }
}

/// Format a CZK amount with space-separated thousands, e.g. "1 234 567 Kč"
pub fn format_czk(value: i64) -> String {
    let negative = value < 0;
    let digits = value.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{} Kč", grouped)
    } else {
        format!("{} Kč", grouped)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_record() -> CollateralRecord {
        CollateralRecord::new(
            "Novák - RD Beroun".to_string(),
            "UV-2023-0417".to_string(),
            4_500_000,
            "Husova 12, Beroun".to_string(),
        )
    }

    #[test]
    fn test_new_record_is_unresolved() {
        let record = create_test_record();
        assert!(record.coordinate.is_none());
        assert!(record.region.is_none());
        assert!(!record.on_map());
        assert!(!record.in_region_counts());
    }

    #[test]
    fn test_resolved_record_participates() {
        let mut record = create_test_record();
        record.coordinate = Some(Coordinate::new(49.96, 14.07));
        record.region = Some("Středočeský kraj".to_string());

        assert!(record.on_map());
        assert!(record.in_region_counts());
    }

    #[test]
    fn test_coordinate_without_region_still_on_map() {
        let mut record = create_test_record();
        record.coordinate = Some(Coordinate::new(49.96, 14.07));

        assert!(record.on_map());
        assert!(!record.in_region_counts());
    }

    #[test]
    fn test_format_czk() {
        assert_eq!(format_czk(0), "0 Kč");
        assert_eq!(format_czk(950), "950 Kč");
        assert_eq!(format_czk(4_500_000), "4 500 000 Kč");
        assert_eq!(format_czk(1_234_567), "1 234 567 Kč");
        assert_eq!(format_czk(-75_000), "-75 000 Kč");
    }

    #[test]
    fn test_known_regions() {
        assert_eq!(KNOWN_REGIONS.len(), 15);
        assert!(is_known_region("Hlavní město Praha"));
        assert!(is_known_region("Trnavský kraj"));
        assert!(!is_known_region("Bavorsko"));
        assert!(!is_known_region(""));
    }
}
