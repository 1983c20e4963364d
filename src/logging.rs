//! Tracing setup shared by the service, collector and backfill binaries.
//!
//! Environment knobs: `RUST_LOG` (full filter, wins), `WEATHER_LOG_LEVEL`,
//! `WEATHER_SPAN_EVENTS` (`full` | `enter_exit`) and `FORCE_COLOR`.

use std::{env, io::IsTerminal, str::FromStr};

use tracing::Level;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

// ---

/// Noisy HTTP client internals are capped at `warn`.
const QUIET_DEPENDENCIES: &str = "hyper=warn,reqwest=warn";

/// Install the global subscriber. Call once per process.
pub fn init_tracing(default_level: &str) {
    // ---
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = env::var("WEATHER_LOG_LEVEL").ok();
        EnvFilter::new(filter_directive(level.as_deref(), default_level))
    };

    let force_color = env::var("FORCE_COLOR").ok();
    let span_events = env::var("WEATHER_SPAN_EVENTS").ok();

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events_for(span_events.as_deref()))
        .with_env_filter(env_filter)
        .with_ansi(use_color(force_color.as_deref(), || std::io::stdout().is_terminal()))
        .compact()
        .init();
}

/// `WEATHER_LOG_LEVEL` when it names a level, else `default_level`.
fn filter_directive(requested: Option<&str>, default_level: &str) -> String {
    // ---
    let level = requested
        .and_then(|l| Level::from_str(l.trim()).ok())
        .map(|l| l.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| default_level.to_string());
    format!("{level},{QUIET_DEPENDENCIES}")
}

fn span_events_for(mode: Option<&str>) -> FmtSpan {
    // ---
    match mode {
        Some("full") => FmtSpan::FULL,
        Some("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    }
}

/// `FORCE_COLOR` overrides TTY detection in either direction.
fn use_color(force: Option<&str>, is_tty: impl FnOnce() -> bool) -> bool {
    // ---
    match force.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
        Some("1" | "true" | "yes") => true,
        Some("0" | "false" | "no") => false,
        _ => is_tty(),
    }
}
