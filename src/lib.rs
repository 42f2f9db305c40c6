// Collateral Map - Core Library
// Exposes all modules for use in the CLI, the dashboard server, and tests

pub mod record;
pub mod ingest;
pub mod geocode;
pub mod filter;
pub mod store;

// Re-export commonly used types
pub use record::{
    CollateralRecord, Coordinate,
    KNOWN_REGIONS, is_known_region, format_czk,
};
pub use ingest::{
    RawDealRow, ReshapeResult, InputKind,
    reshape, load_raw, detect_input, parse_value,
};
pub use geocode::{
    Geocoder, NominatimClient, RateLimiter, RegionLookup, ResolveStats,
    resolve_records, MIN_CALL_INTERVAL,
};
pub use filter::{
    FilterParams, ValueRange, RegionCount, DashboardView,
    filter_records, value_filtered, region_counts, full_value_range, build_view,
};
pub use store::{load_resolved, write_resolved};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
