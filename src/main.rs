//! Application entry point for the `weatherflow` service.
//!
//! This binary orchestrates the full startup sequence for the weather API,
//! including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Opening the date-partitioned reading store
//! - Spawning the collector loop (unless `COLLECTOR_ENABLED=false`)
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests until Ctrl-C
//!
//! See [`weatherflow::load_from_env`] for the environment variables.
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use dotenvy::dotenv;
use tokio::sync::watch;

use weatherflow::collector::Collector;
use weatherflow::routes::{self, AppState};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    weatherflow::init_tracing("debug");

    let cfg = weatherflow::load_from_env()?;
    cfg.log_config();

    let store = weatherflow::open_store(&cfg);
    let sensor = weatherflow::open_sensor(&cfg);

    // Shared stop signal for the collector and the HTTP server
    let (stop_tx, stop_rx) = watch::channel(false);

    let latest = if cfg.collector_enabled {
        let collector = Collector::new(sensor.clone(), store.clone(), &cfg);
        let feed = collector.subscribe();
        tokio::spawn(collector.run(wait_for_stop(stop_rx.clone())));
        Some(feed)
    } else {
        tracing::info!("Collector disabled, serving stored readings only");
        None
    };

    let state = AppState {
        store,
        sensor,
        latest,
        calibration_offset_c: cfg.temp_calibration_offset_c,
    };

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        let _ = stop_tx.send(true);
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_stop(stop_rx))
        .await?;

    Ok(())
}

async fn wait_for_stop(mut stop: watch::Receiver<bool>) {
    // ---
    let _ = stop.wait_for(|stopped| *stopped).await;
}
