// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! PharmaLink Explorer walkthrough.
//!
//! Demonstrates:
//! 1. Loading configuration (YAML/JSON file, or defaults)
//! 2. Opening a product passport with a misspelled id
//! 3. Searching the document and reading suggestions back
//! 4. Field history and the backend version
//! 5. Idle preloading and clean shutdown
//!
//! # Run
//!
//! ```bash
//! # Built-in demo data
//! cargo run --example explore
//!
//! # Against a backend, with persistent state
//! cargo run --example explore -- explorer.yaml ./state
//! ```

use pharmalink_explorer::{
    Explorer, ExplorerConfig, FileStorage, InMemoryStorage, KeyValueStorage, ReqwestTransport,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let mut args = std::env::args().skip(1);
    let mut config = match args.next() {
        Some(path) => ExplorerConfig::load_or_default(path),
        None => ExplorerConfig::default(),
    };
    // Suggestions are only learned with search history on
    config.features.search_history = true;
    let storage: Arc<dyn KeyValueStorage> = match args.next() {
        Some(dir) => Arc::new(FileStorage::open(dir)?),
        None => Arc::new(InMemoryStorage::new()),
    };

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║              PharmaLink Explorer: Walkthrough                 ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    let explorer = Explorer::new(config, storage, Arc::new(ReqwestTransport::new()?));
    println!("📦 Data source: {:?}", explorer.data().source());
    explorer.start();
    println!("   State: {}", explorer.state());

    // ─────────────────────────────────────────────────────────────────────────
    // Passport
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔎 Opening \"med-1\"...");
    let passport = explorer.open("med-1").await;
    if let Some(error) = &passport.response.error {
        println!("   ✗ {}", error);
        explorer.shutdown();
        return Ok(());
    }
    println!("   ✓ Resolved to {} (source: {:?})", passport.id, passport.response.source);

    for popup in &passport.popups {
        println!("   [{:?}] {}: {}", popup.kind, popup.author, popup.message);
    }
    for chain in &passport.chains {
        println!("   {} ({} deliveries)", chain.title, chain.total_deliveries);
        for entry in &chain.entries {
            println!(
                "     {} {} {:?}",
                entry.timestamp,
                entry.recipient,
                explorer.delivery_status(&entry.timestamp)
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────────
    let Some(document) = passport.response.data.clone() else {
        explorer.shutdown();
        return Ok(());
    };
    for query in ["aspirin", "hauptwirkstoff:acetyl", "temperatur"] {
        let hits = explorer.search(&document, query);
        println!("\n🔍 \"{}\" → {} hit(s)", query, hits.len());
        for hit in hits.iter().take(3) {
            println!("   {} = {}", hit.path.join("."), hit.full_value);
        }
    }

    println!("\n💡 Suggestions for \"haupt\":");
    for suggestion in explorer.suggestions("haupt", 5) {
        println!("   {} ({:?}, used {}x)", suggestion.query, suggestion.category, suggestion.frequency);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // History and version
    // ─────────────────────────────────────────────────────────────────────────
    let history = explorer.key_history(&passport.id, "identifikation.pzn").await;
    println!("\n📜 identifikation.pzn: {} change(s), current {}", history.total_changes, history.current_value);
    for entry in &history.history {
        println!("   {} {} ({})", entry.timestamp, entry.value, entry.user.as_deref().unwrap_or("-"));
    }

    let version = explorer.backend_version().await;
    println!("\n🏷  Backend version: {} ({:?})", version.version, version.status);

    // ─────────────────────────────────────────────────────────────────────────
    // Preloading and shutdown
    // ─────────────────────────────────────────────────────────────────────────
    tokio::time::sleep(Duration::from_secs(3)).await;
    let stats = explorer.preload_stats();
    println!(
        "\n⚡ Preloaded {} id(s), {} queued, data cache {} entries",
        stats.preloaded_count, stats.queue_size, stats.cache_stats.valid_entries
    );

    explorer.shutdown();
    println!("\n✅ State: {}", explorer.state());
    Ok(())
}
