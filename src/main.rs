use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use chatbud_backend::config::Config;
use chatbud_backend::error::FirebaseError;
use chatbud_backend::firebase::FirebaseStore;
use chatbud_backend::razorpay_client::RazorpayClient;
use chatbud_backend::{app, AppState};

#[derive(Debug, Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] chatbud_backend::config::ConfigError),

    #[error("firebase: {0}")]
    Firebase(#[from] FirebaseError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    // Load environment variables from .env if available
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chatbud_backend=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;

    // One HTTP client shared by both upstream services
    let http_client = reqwest::Client::new();
    let users = FirebaseStore::new(&config.firebase, http_client.clone())?;
    let gateway = RazorpayClient::new(config.razorpay.clone(), http_client);

    let state = Arc::new(AppState {
        razorpay_key_id: config.razorpay.key_id.clone(),
        webhook_secret: config.razorpay.webhook_secret.clone(),
        gateway: Arc::new(gateway),
        users: Arc::new(users),
    });

    let router = app(state, Duration::from_secs(config.request_timeout_secs));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server running on port {}", config.port);
    tracing::info!("   - Create subscription: http://{}/create-subscription", addr);
    tracing::info!("   - Razorpay webhook:    http://{}/razorpay-webhook", addr);
    tracing::info!("   - Health check:        http://{}/", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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

    tracing::info!("Shutdown signal received, shutting down gracefully");
}
