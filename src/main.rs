// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use std::env;
use std::path::Path;

use collateral_map::{
    detect_input, load_raw, load_resolved, resolve_records, write_resolved, InputKind,
    NominatimClient,
};

const DEFAULT_RAW_PATH: &str = "podklad.csv";
const DEFAULT_RESOLVED_PATH: &str = "podklad_gps.csv";

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && args[1] == "resolve" {
        // Resolve mode
        let input = args.get(2).map(String::as_str).unwrap_or(DEFAULT_RAW_PATH);
        let output = args
            .get(3)
            .map(String::as_str)
            .unwrap_or(DEFAULT_RESOLVED_PATH);
        run_resolve(Path::new(input), Path::new(output))?;
    } else {
        // UI mode (default)
        let input = args
            .get(1)
            .map(String::as_str)
            .unwrap_or(DEFAULT_RESOLVED_PATH);
        run_ui_mode(Path::new(input))?;
    }

    Ok(())
}

fn run_resolve(input: &Path, output: &Path) -> Result<()> {
    println!("📍 Collateral Map - Address Resolution");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if !input.exists() {
        eprintln!("📂 Input file not found: {:?}", input);
        eprintln!("   Supply the raw export '{}' (or a", DEFAULT_RAW_PATH);
        eprintln!(
            "   pre-resolved '{}' for the UI/server).",
            DEFAULT_RESOLVED_PATH
        );
        std::process::exit(1);
    }

    if detect_input(input) == InputKind::PreResolved {
        println!("✓ {:?} is already resolved - nothing to do", input);
        return Ok(());
    }

    if output.exists() {
        println!("✓ Resolved table {:?} already exists - skipping", output);
        println!("  Delete it to force re-resolution.");
        return Ok(());
    }

    // 1. Load and reshape
    println!("\n📂 Loading raw export...");
    let reshaped = load_raw(input)?;
    println!(
        "✓ {} source rows → {} collateral records ({} slots without address dropped)",
        reshaped.source_rows,
        reshaped.records.len(),
        reshaped.dropped_for_empty_address
    );

    // 2. Resolve addresses (rate limited, two calls per record)
    let mut records = reshaped.records;
    let eta_secs = records.len() * 2;
    println!("\n🌍 Resolving {} addresses via Nominatim...", records.len());
    println!("  One call per second - expect roughly {} s", eta_secs);

    let mut geocoder = NominatimClient::new()?;
    let stats = resolve_records(&mut records, &mut geocoder);

    println!(
        "✓ Resolved {} of {} addresses (run started {} UTC)",
        stats.resolved,
        stats.attempted,
        stats.started_at.format("%H:%M:%S")
    );
    println!("  With region: {}", stats.with_region);
    println!("  Unresolved:  {}", stats.unresolved);

    // 3. Dump the enriched table
    println!("\n💾 Writing resolved table...");
    write_resolved(output, &records)?;
    println!("✓ Wrote {:?}", output);

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("🎉 Done. Later runs will load {:?} directly.", output);

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(input: &Path) -> Result<()> {
    println!("🖥️  Loading Collateral Map UI...\n");

    if !input.exists() {
        eprintln!("📂 Resolved table not found: {:?}", input);
        eprintln!("   Run: collateral-map resolve {}", DEFAULT_RAW_PATH);
        eprintln!("   to geocode the raw export first.");
        std::process::exit(1);
    }

    println!("📊 Loading records...");
    let records = load_resolved(input)?;
    println!("✓ Loaded {} records\n", records.len());
    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(records);
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_input: &Path) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web dashboard: cargo run --bin collateral-server --features server");
    std::process::exit(1);
}
