//! kioskcache CLI - fleet status view.
//!
//! Exercises the production wiring end to end: loads config, seeds the
//! cache from disk, refreshes all three collections from the backend, and
//! prints a per-screen connectivity summary. With `--watch`, keeps the
//! background refresh scheduler running until Ctrl+C.

use std::io;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kioskcache::cache::CacheService;
use kioskcache::config::Config;
use kioskcache::store::{FileStorage, SystemClock};
use kioskcache::{ApiClient, RefreshScheduler};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn age_display(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return "never".to_string();
    };
    let minutes = (now - at).num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        format!("{}h ago", minutes / 60)
    } else {
        format!("{}d ago", minutes / 1440)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });
    info!(api = %config.api_base_url, "kioskcache starting");

    let mut client = ApiClient::new(&config.api_base_url)?;
    if let Ok(token) = std::env::var("KIOSK_API_TOKEN") {
        client = client.with_token(token);
    }

    let storage = FileStorage::new(config.cache_dir()?)?;
    let clock = SystemClock;

    let mut service = CacheService::new(Arc::new(client), Arc::new(storage), Arc::new(clock));
    if let Some(secs) = config.stale_after_secs {
        service = service.with_stale_after(chrono::Duration::seconds(secs as i64));
    }
    let service = Arc::new(service);

    let now = Utc::now();
    println!(
        "cached: {} screens, {} playlists, {} schedules (synced {})",
        service.screens().len(),
        service.playlists().len(),
        service.schedules().len(),
        age_display(service.last_synced_at(), now),
    );

    if service.is_stale() {
        println!("refreshing from {} ...", config.api_base_url);
        service.refresh_all().await;
    }

    for key in ["screens", "playlists", "schedules"] {
        let error = match key {
            "screens" => service.last_error_screens(),
            "playlists" => service.last_error_playlists(),
            _ => service.last_error_schedules(),
        };
        if let Some(error) = error {
            eprintln!("warning: {} refresh failed: {}", key, error);
        }
    }

    let now = Utc::now();
    println!("\n{:<12} {:<24} {:<12} {:>10}", "ID", "NAME", "STATUS", "SESSIONS");
    for screen in service.screens() {
        println!(
            "{:<12} {:<24} {:<12} {:>10}",
            screen.id,
            screen.name,
            screen.status(now).to_string(),
            screen.session_count,
        );
    }
    println!(
        "\n{} playlists, {} schedules (synced {})",
        service.playlists().len(),
        service.schedules().len(),
        age_display(service.last_synced_at(), now),
    );

    if std::env::args().any(|a| a == "--watch") {
        let mut scheduler = RefreshScheduler::new(Arc::clone(&service));
        if let Some(secs) = config.refresh_interval_secs {
            scheduler = scheduler.with_interval(std::time::Duration::from_secs(secs));
        }
        scheduler.start();
        println!("\nwatching for changes, Ctrl+C to stop");
        tokio::signal::ctrl_c().await?;
        scheduler.shutdown();
        info!("kioskcache shutting down");
    }

    Ok(())
}
