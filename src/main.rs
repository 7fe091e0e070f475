mod browser;
mod config;
mod dto;
mod error;
mod handler;
mod page;
mod service;
mod upload;

use std::sync::Arc;

use handler::AppState;
use service::{EmailService, SmtpMailer};
use upload::UploadStore;

#[tokio::main]
async fn main() {
    // Credentials may live in a local .env file
    let dotenv = dotenvy::dotenv();

    // Log setup
    tracing_subscriber::fmt::init();

    if let Ok(path) = dotenv {
        tracing::info!("Loaded environment from {}", path.display());
    }

    // Load config
    let cfg = config::load_config().expect("failed to load config file");
    tracing::info!("Successfully loaded mail form config");

    let credentials = config::load_credentials();

    // Setup components
    let uploads = UploadStore::new(&cfg.upload_dir).unwrap_or_else(|e| {
        tracing::error!(
            "Failed to create upload directory {}: {e}",
            cfg.upload_dir.display()
        );
        panic!("failed to create upload directory: {e}");
    });
    tracing::info!("Storing uploads in {}", uploads.dir().display());

    let mailer = SmtpMailer::new(&cfg.smtp, credentials.as_ref()).unwrap_or_else(|e| {
        tracing::error!("Failed to configure SMTP relay {}: {e}", cfg.smtp.relay);
        panic!("failed to configure SMTP relay: {e}");
    });
    tracing::info!(
        "Relaying through {}:{} (STARTTLS)",
        cfg.smtp.relay,
        cfg.smtp.port
    );

    let state = Arc::new(AppState {
        service: EmailService::new(credentials, Arc::new(mailer)),
        uploads,
        max_repeat: cfg.max_repeat,
    });

    // Setup router
    let router = handler::router(state, cfg.max_upload_bytes);

    // Start server
    let listener = tokio::net::TcpListener::bind((cfg.host.as_str(), cfg.port))
        .await
        .expect("Failed to bind to address");
    let addr = listener
        .local_addr()
        .expect("Failed to read listener address");

    tracing::info!("Mail form starting, listening on {}", addr);

    if cfg.open_browser {
        browser::spawn_launch(browser::local_url(addr), cfg.browser.clone());
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    tracing::info!("Mail form stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
