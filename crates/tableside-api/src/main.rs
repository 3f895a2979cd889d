//! Tableside API server entry point.

use std::error::Error;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use tableside_core::clock::{Clock, SystemClock};
use tableside_journal::FileJournal;
use tableside_relay::{Relay, RelayConfig, spawn_sweeper};

use tableside_api::build_router;
use tableside_api::state::AppState;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5);
const ENGINE_POLL_TIMEOUT: Duration = Duration::from_secs(25);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Tableside API server");

    // Read configuration from environment.
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .map_err(|e| format!("PORT must be a valid u16: {e}"))?;
    let journal_path =
        std::env::var("JOURNAL_PATH").unwrap_or_else(|_| "tableside.journal".to_string());
    let host_label = std::env::var("HOST_LABEL").unwrap_or_else(|_| "Host".to_string());

    let defaults = RelayConfig::default();
    let config = RelayConfig {
        heartbeat_timeout: env_seconds("HEARTBEAT_TIMEOUT_SECS", defaults.heartbeat_timeout)?,
        stuck_ceiling: env_seconds("STUCK_CEILING_SECS", defaults.stuck_ceiling)?,
        hold_capacity: match std::env::var("HOLD_CAPACITY") {
            Ok(value) => value
                .parse()
                .map_err(|e| format!("HOLD_CAPACITY must be a valid usize: {e}"))?,
            Err(_) => defaults.hold_capacity,
        },
        turn_skip_after: env_seconds("TURN_SKIP_SECS", defaults.turn_skip_after)?,
    };

    // Open the durable journal and the session relay.
    let journal = Arc::new(FileJournal::open(&journal_path).await?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (relay, host_token) = Relay::open_session(&host_label, config, journal, clock).await?;
    let relay = Arc::new(relay);

    // One-time credentials: the Host's bearer token and the engine key are
    // only ever shown here.
    let engine_key = fresh_engine_key();
    tracing::info!(host_token = %host_token.value, "host token issued");
    tracing::info!(engine_key = %engine_key, "engine key issued");

    let sweeper = spawn_sweeper(Arc::clone(&relay), SWEEP_INTERVAL);

    // Build application state and router.
    let app_state = AppState::new(relay, engine_key, ENGINE_POLL_TIMEOUT);
    let app = build_router(app_state);

    // Start server.
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| format!("invalid HOST:PORT combination: {e}"))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    sweeper.abort();
    Ok(())
}

fn env_seconds(name: &str, default: chrono::Duration) -> Result<chrono::Duration, String> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(chrono::Duration::seconds)
            .map_err(|e| format!("{name} must be a whole number of seconds: {e}")),
        Err(_) => Ok(default),
    }
}

fn fresh_engine_key() -> String {
    let bytes: [u8; 32] = rand::random();
    bytes.iter().fold(String::with_capacity(64), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
