//! Application entry point and server initialization
//!
//! Loads configuration, opens the database, wires the payment provider and
//! image store into the shared state, then serves HTTP until SIGINT/SIGTERM.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use storefront::accounts::seed_admin;
use storefront::config::Config;
use storefront::database::Store;
use storefront::payment::PayChangu;
use storefront::route::create_app;
use storefront::state::AppState;
use storefront::upload::LocalImageStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("storefront=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;

    // The database is opened once and shared by every request
    let store = Store::open(&config.database_path)?;
    if let Some(seed) = &config.admin_seed {
        seed_admin(&store, seed)?;
    }

    if config.paychangu_webhook_secret.is_none() {
        warn!("PAYCHANGU_WEBHOOK_SECRET is not set, payment webhooks will be rejected");
    }

    let payments = PayChangu::new(
        &config.paychangu_base_url,
        &config.paychangu_secret_key,
        Duration::from_secs(config.paychangu_timeout_secs),
    )?;
    let images = LocalImageStore::new(&config.upload_dir, &config.public_url)?;

    let port = config.port;
    let database_path = config.database_path.clone();
    let state = AppState {
        store,
        config: Arc::new(config),
        payments: Arc::new(payments),
        images: Arc::new(images),
    };

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!(%addr, database = %database_path, "server listening");

    // In-flight requests finish before the process exits; the database closes
    // when the last handle to it is dropped
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C (SIGINT) or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}
