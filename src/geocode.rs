// 🌍 Address Resolver - Nominatim Geocoding
// Forward lookup (address → coordinate), reverse lookup (coordinate →
// kraj), one rate-limited call at a time

use crate::record::{CollateralRecord, Coordinate};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::thread;
use std::time::{Duration, Instant};

/// Nominatim usage policy: at most one request per second
pub const MIN_CALL_INTERVAL: Duration = Duration::from_secs(1);

const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";
const USER_AGENT: &str = "mapa_nemovitosti";

// ============================================================================
// RATE LIMITER
// ============================================================================

/// Enforces a minimum interval between successive dispatches.
/// One instance per lookup type per client; not coordinated across clients.
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        RateLimiter {
            min_interval,
            last_call: None,
        }
    }

    /// Block until the minimum interval since the previous call has passed.
    /// The first call goes through immediately.
    pub fn wait(&mut self) {
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last_call = Some(Instant::now());
    }
}

// ============================================================================
// LOOKUP RESULTS
// ============================================================================

/// Typed outcome of a reverse lookup.
///
/// `NotFound` (service answered, no state field) and `Failed` (transport or
/// decode error) are treated identically by callers today - region stays
/// absent, coordinate is kept - but the distinction is preserved here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionLookup {
    Found(String),
    NotFound,
    Failed,
}

// ============================================================================
// GEOCODER TRAIT
// ============================================================================

/// The resolver seam. Production uses `NominatimClient`; tests substitute a
/// deterministic stub.
pub trait Geocoder {
    /// Forward-geocode an address. Every failure shape (unreachable service,
    /// error status, empty result, malformed payload) collapses to `None`.
    fn forward(&mut self, address: &str) -> Option<Coordinate>;

    /// Reverse-geocode a coordinate into an administrative region name
    fn reverse(&mut self, coordinate: Coordinate) -> RegionLookup;
}

// ============================================================================
// NOMINATIM CLIENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

pub struct NominatimClient {
    http: reqwest::blocking::Client,
    base_url: String,
    forward_limiter: RateLimiter,
    reverse_limiter: RateLimiter,
}

impl NominatimClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(NOMINATIM_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build geocoding HTTP client")?;

        Ok(NominatimClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            forward_limiter: RateLimiter::new(MIN_CALL_INTERVAL),
            reverse_limiter: RateLimiter::new(MIN_CALL_INTERVAL),
        })
    }

    fn search(&self, address: &str) -> Option<Coordinate> {
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .ok()?;

        if !response.status().is_success() {
            return None;
        }

        let hits: Vec<SearchHit> = response.json().ok()?;
        let hit = hits.into_iter().next()?;

        let lat: f64 = hit.lat.parse().ok()?;
        let lon: f64 = hit.lon.parse().ok()?;
        Some(Coordinate::new(lat, lon))
    }

    fn lookup_region(&self, coordinate: Coordinate) -> RegionLookup {
        let response = match self
            .http
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("lat", coordinate.lat.to_string().as_str()),
                ("lon", coordinate.lon.to_string().as_str()),
                ("format", "json"),
                ("accept-language", "cs"),
            ])
            .send()
        {
            Ok(r) if r.status().is_success() => r,
            _ => return RegionLookup::Failed,
        };

        // The reverse payload is loosely shaped; only address.state matters
        let body: serde_json::Value = match response.json() {
            Ok(v) => v,
            Err(_) => return RegionLookup::Failed,
        };

        match body
            .get("address")
            .and_then(|a| a.get("state"))
            .and_then(|s| s.as_str())
        {
            Some(state) => RegionLookup::Found(state.to_string()),
            None => RegionLookup::NotFound,
        }
    }
}

impl Geocoder for NominatimClient {
    fn forward(&mut self, address: &str) -> Option<Coordinate> {
        self.forward_limiter.wait();
        self.search(address)
    }

    fn reverse(&mut self, coordinate: Coordinate) -> RegionLookup {
        self.reverse_limiter.wait();
        self.lookup_region(coordinate)
    }
}

// ============================================================================
// BATCH RESOLUTION
// ============================================================================

/// Bookkeeping for one resolve run
#[derive(Debug, Clone)]
pub struct ResolveStats {
    pub started_at: DateTime<Utc>,
    pub attempted: usize,
    pub resolved: usize,
    pub with_region: usize,
    pub unresolved: usize,
}

/// Resolve every record in input order, enriching coordinate and region in
/// place. Failures are silent and per-record; no retry, no deduplication of
/// repeated addresses.
pub fn resolve_records(
    records: &mut [CollateralRecord],
    geocoder: &mut dyn Geocoder,
) -> ResolveStats {
    let mut stats = ResolveStats {
        started_at: Utc::now(),
        attempted: 0,
        resolved: 0,
        with_region: 0,
        unresolved: 0,
    };

    for record in records.iter_mut() {
        stats.attempted += 1;

        let coordinate = match geocoder.forward(&record.address) {
            Some(c) => c,
            None => {
                // No region lookup for an unresolved address
                stats.unresolved += 1;
                continue;
            }
        };

        record.coordinate = Some(coordinate);
        stats.resolved += 1;

        match geocoder.reverse(coordinate) {
            RegionLookup::Found(region) => {
                record.region = Some(region);
                stats.with_region += 1;
            }
            // Coordinate is kept either way
            RegionLookup::NotFound | RegionLookup::Failed => {}
        }
    }

    stats
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Deterministic stand-in for the Nominatim client
    pub struct StubGeocoder {
        coordinates: HashMap<String, Coordinate>,
        regions: HashMap<String, String>,
        reverse_fails: bool,
        pub forward_calls: usize,
        pub reverse_calls: usize,
    }

    impl StubGeocoder {
        pub fn new() -> Self {
            StubGeocoder {
                coordinates: HashMap::new(),
                regions: HashMap::new(),
                reverse_fails: false,
                forward_calls: 0,
                reverse_calls: 0,
            }
        }

        pub fn with_entry(mut self, address: &str, coordinate: Coordinate, region: &str) -> Self {
            self.coordinates.insert(address.to_string(), coordinate);
            self.regions
                .insert(coordinate_key(coordinate), region.to_string());
            self
        }

        pub fn with_failing_reverse(mut self) -> Self {
            self.reverse_fails = true;
            self
        }
    }

    fn coordinate_key(c: Coordinate) -> String {
        format!("{:.4},{:.4}", c.lat, c.lon)
    }

    impl Geocoder for StubGeocoder {
        fn forward(&mut self, address: &str) -> Option<Coordinate> {
            self.forward_calls += 1;
            self.coordinates.get(address).copied()
        }

        fn reverse(&mut self, coordinate: Coordinate) -> RegionLookup {
            self.reverse_calls += 1;
            if self.reverse_fails {
                return RegionLookup::Failed;
            }
            match self.regions.get(&coordinate_key(coordinate)) {
                Some(region) => RegionLookup::Found(region.clone()),
                None => RegionLookup::NotFound,
            }
        }
    }

    fn create_test_records() -> Vec<CollateralRecord> {
        vec![
            CollateralRecord::new(
                "Novák - RD Beroun".to_string(),
                "UV-2023-0417".to_string(),
                4_500_000,
                "Husova 12, Beroun".to_string(),
            ),
            CollateralRecord::new(
                "Dvořák - byt Praha".to_string(),
                "UV-2023-0502".to_string(),
                7_800_000,
                "Dlouhá 8, Praha".to_string(),
            ),
            CollateralRecord::new(
                "Svoboda - RD Brno".to_string(),
                "UV-2023-0519".to_string(),
                5_200_000,
                "Masarykova 1, Brno".to_string(),
            ),
        ]
    }

    #[test]
    fn test_resolve_all_records() {
        let mut records = create_test_records();
        let mut geocoder = StubGeocoder::new()
            .with_entry(
                "Husova 12, Beroun",
                Coordinate::new(49.9638, 14.0720),
                "Středočeský kraj",
            )
            .with_entry(
                "Dlouhá 8, Praha",
                Coordinate::new(50.0890, 14.4250),
                "Hlavní město Praha",
            )
            .with_entry(
                "Masarykova 1, Brno",
                Coordinate::new(49.1930, 16.6100),
                "Jihomoravský kraj",
            );

        let stats = resolve_records(&mut records, &mut geocoder);

        assert_eq!(stats.attempted, 3);
        assert_eq!(stats.resolved, 3);
        assert_eq!(stats.with_region, 3);
        assert_eq!(stats.unresolved, 0);

        assert!(records.iter().all(|r| r.on_map()));
        assert_eq!(records[0].region.as_deref(), Some("Středočeský kraj"));
        assert_eq!(records[2].region.as_deref(), Some("Jihomoravský kraj"));
    }

    #[test]
    fn test_forward_failure_is_silent_and_per_record() {
        let mut records = create_test_records();
        // Only the second address resolves
        let mut geocoder = StubGeocoder::new().with_entry(
            "Dlouhá 8, Praha",
            Coordinate::new(50.0890, 14.4250),
            "Hlavní město Praha",
        );

        let stats = resolve_records(&mut records, &mut geocoder);

        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unresolved, 2);
        assert!(records[0].coordinate.is_none());
        assert!(records[1].coordinate.is_some());
        assert!(records[2].coordinate.is_none());
    }

    #[test]
    fn test_no_reverse_lookup_for_unresolved_address() {
        let mut records = create_test_records();
        let mut geocoder = StubGeocoder::new();

        resolve_records(&mut records, &mut geocoder);

        assert_eq!(geocoder.forward_calls, 3);
        assert_eq!(geocoder.reverse_calls, 0);
    }

    #[test]
    fn test_reverse_failure_keeps_coordinate() {
        let mut records = create_test_records();
        let mut geocoder = StubGeocoder::new()
            .with_entry(
                "Husova 12, Beroun",
                Coordinate::new(49.9638, 14.0720),
                "Středočeský kraj",
            )
            .with_failing_reverse();

        let stats = resolve_records(&mut records, &mut geocoder);

        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.with_region, 0);
        assert!(records[0].coordinate.is_some());
        assert!(records[0].region.is_none());
    }

    #[test]
    fn test_no_retry_and_no_deduplication() {
        let mut records = create_test_records();
        records[1].address = records[0].address.clone();
        let mut geocoder = StubGeocoder::new();

        resolve_records(&mut records, &mut geocoder);

        // Repeated identical addresses cost one lookup each
        assert_eq!(geocoder.forward_calls, 3);
    }

    #[test]
    fn test_rate_limiter_spacing() {
        let interval = Duration::from_millis(20);
        let mut limiter = RateLimiter::new(interval);

        let start = Instant::now();
        limiter.wait();
        // First call goes through immediately
        assert!(start.elapsed() < interval);

        limiter.wait();
        assert!(start.elapsed() >= interval);
    }

    #[test]
    fn test_reshape_resolve_aggregate_end_to_end() {
        use crate::filter::{full_value_range, region_counts, value_filtered};
        use crate::ingest::{reshape, RawDealRow};

        // Three source rows, only the primary slot populated
        let rows: Vec<RawDealRow> = [
            ("Novák - RD Beroun", "UV-2023-0417", "4 500 000", "Husova 12, Beroun"),
            ("Dvořák - byt Praha", "UV-2023-0502", "7 800 000", "Dlouhá 8, Praha"),
            ("Svoboda - RD Brno", "UV-2023-0519", "5 200 000", "Masarykova 1, Brno"),
        ]
        .iter()
        .map(|(title, loan, value, address)| RawDealRow {
            title: title.to_string(),
            loan_reference: loan.to_string(),
            primary_value: Some(value.to_string()),
            primary_address: Some(address.to_string()),
            secondary_value: None,
            secondary_address: None,
        })
        .collect();

        let reshaped = reshape(&rows);
        assert_eq!(reshaped.records.len(), 3);
        assert_eq!(reshaped.dropped_for_empty_address, 3);

        let mut records = reshaped.records;
        let mut geocoder = StubGeocoder::new()
            .with_entry(
                "Husova 12, Beroun",
                Coordinate::new(49.9638, 14.0720),
                "Středočeský kraj",
            )
            .with_entry(
                "Dlouhá 8, Praha",
                Coordinate::new(50.0890, 14.4250),
                "Hlavní město Praha",
            )
            .with_entry(
                "Masarykova 1, Brno",
                Coordinate::new(49.1930, 16.6100),
                "Jihomoravský kraj",
            );

        let stats = resolve_records(&mut records, &mut geocoder);
        assert_eq!(stats.resolved, 3);

        let range = full_value_range(&records).unwrap();
        let by_value = value_filtered(&records, range);
        let counts = region_counts(&by_value);

        let total: usize = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, 3);
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn test_region_lookup_variants_are_distinct() {
        assert_ne!(RegionLookup::NotFound, RegionLookup::Failed);
        assert_ne!(
            RegionLookup::Found("Kraj Vysočina".to_string()),
            RegionLookup::NotFound
        );
    }
}
