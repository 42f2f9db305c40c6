// Collateral Map - Web Dashboard Server
// Serves the filtered record set, region counts and the map page

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::get,
    Router,
};
use collateral_map::{
    build_view, detect_input, full_value_range, load_resolved, CollateralRecord, FilterParams,
    InputKind, RegionCount, ValueRange, KNOWN_REGIONS,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Shared application state: the resolved record set, immutable for the
/// lifetime of the server. Filtering produces views per request.
#[derive(Clone)]
struct AppState {
    records: Arc<Vec<CollateralRecord>>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

/// Filter parameters carried in the query string.
/// `regions` is a comma-separated list; absent means all known regions.
#[derive(Deserialize, Default)]
struct FilterQuery {
    min: Option<i64>,
    max: Option<i64>,
    regions: Option<String>,
}

impl FilterQuery {
    fn to_params(&self, records: &[CollateralRecord]) -> FilterParams {
        let full = full_value_range(records).unwrap_or(ValueRange::new(0, 0));
        let range = ValueRange::new(self.min.unwrap_or(full.min), self.max.unwrap_or(full.max));

        let selected: HashSet<String> = match &self.regions {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect(),
            None => KNOWN_REGIONS.iter().map(|r| r.to_string()).collect(),
        };

        FilterParams::new(range, selected)
    }
}

/// Range response (drives the value-interval control)
#[derive(Serialize)]
struct RangeResponse {
    min: i64,
    max: i64,
    degenerate: bool,
    regions: Vec<&'static str>,
}

/// Region counts plus the headline groups
#[derive(Serialize)]
struct RegionsResponse {
    counts: Vec<RegionCount>,
    most: Option<RegionCount>,
    least: Option<RegionCount>,
    total: usize,
}

/// One map marker
#[derive(Serialize)]
struct MarkerResponse {
    title: String,
    loan_reference: String,
    value: i64,
    formatted_value: String,
    address: String,
    lat: f64,
    lon: f64,
    region: Option<String>,
}

impl MarkerResponse {
    fn from_record(record: &CollateralRecord) -> Option<Self> {
        let coordinate = record.coordinate?;
        Some(Self {
            title: record.title.clone(),
            loan_reference: record.loan_reference.clone(),
            value: record.value,
            formatted_value: record.formatted_value(),
            address: record.address.clone(),
            lat: coordinate.lat,
            lon: coordinate.lon,
            region: record.region.clone(),
        })
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/range - Full value range and the known region list
async fn get_range(State(state): State<AppState>) -> impl IntoResponse {
    let full = full_value_range(&state.records).unwrap_or(ValueRange::new(0, 0));

    let response = RangeResponse {
        min: full.min,
        max: full.max,
        degenerate: full.is_degenerate(),
        regions: KNOWN_REGIONS.to_vec(),
    };

    (StatusCode::OK, Json(ApiResponse::ok(response)))
}

/// GET /api/regions?min&max - Region counts over the value-filtered set.
/// Region selection deliberately plays no part here (the count table shows
/// every region regardless of which ones are displayed on the map).
async fn get_regions(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> impl IntoResponse {
    let params = query.to_params(&state.records);
    let view = build_view(&state.records, &params);

    let total = view.region_counts.iter().map(|c| c.count).sum();
    let response = RegionsResponse {
        most: view.most_populated().cloned(),
        least: view.least_populated().cloned(),
        counts: view.region_counts,
        total,
    };

    (StatusCode::OK, Json(ApiResponse::ok(response)))
}

/// GET /api/records?min&max&regions - Map markers, both predicates applied
async fn get_records(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> impl IntoResponse {
    let params = query.to_params(&state.records);
    let view = build_view(&state.records, &params);

    let markers: Vec<MarkerResponse> = view
        .map_records
        .iter()
        .filter_map(|r| MarkerResponse::from_record(r))
        .collect();

    (StatusCode::OK, Json(ApiResponse::ok(markers)))
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() {
    println!("🌐 Collateral Map - Web Dashboard");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let args: Vec<String> = std::env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("podklad_gps.csv");
    let path = std::path::Path::new(path);

    if !path.exists() {
        eprintln!("📂 Resolved table not found: {:?}", path);
        eprintln!("   Run: collateral-map resolve podklad.csv");
        eprintln!("   to geocode the raw export first.");
        std::process::exit(1);
    }

    if detect_input(path) == InputKind::Raw {
        eprintln!("⚠️  {:?} looks like a raw export (no 'gps' in the name).", path);
        eprintln!("   The server expects a resolved table; resolve it first.");
        std::process::exit(1);
    }

    let records = load_resolved(path).expect("Failed to load resolved table");
    println!("✓ Loaded {} records from {:?}", records.len(), path);

    // Create shared state
    let state = AppState {
        records: Arc::new(records),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/range", get(get_range))
        .route("/regions", get(get_regions))
        .route("/records", get(get_records))
        .with_state(state.clone());

    // Build main router
    let app = Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    println!("\n🚀 Server running on http://localhost:3000");
    println!("   API: http://localhost:3000/api/records");
    println!("   UI:  http://localhost:3000");
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
