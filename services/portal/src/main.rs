use std::sync::Arc;

use order_domain::{config::PortalConfig, delivery::SmtpMailer, receipt::PdfReceiptRenderer};
use portal::{app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = PortalConfig::from_env()?;
    tracing::info!("Mail relay: {:?}", config.mail);

    let renderer = Arc::new(PdfReceiptRenderer::new(config.receipt_dir.clone()));
    let mailer = Arc::new(SmtpMailer::new(&config.mail)?);
    let state = AppState::new(renderer, mailer);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Medicine order portal listening on {}", config.bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Router and state are dropped by now, taking unreleased receipt files with them.
    tracing::info!("Medicine order portal stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
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
    tracing::info!("Medicine order portal received shutdown signal");
}
