use chrono::Local;
use client_desk::{auth, billing, load_data, persist_data, router, AppState, Config};
use std::net::SocketAddr;
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env()?;
    if let Some(parent) = config.data_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut data = load_data(&config.data_path).await;
    let mut dirty = auth::bootstrap_admin(&mut data, &config.admin_username, &config.admin_password)?;

    if config.invoice_on_start {
        let today = Local::now().date_naive();
        let month = billing::month_key(today);
        let created = billing::generate_invoices(&mut data, &month, today)?;
        if !created.is_empty() {
            info!(month = %month, count = created.len(), "generated invoices on startup");
            dirty = true;
        }
    }

    if dirty {
        persist_data(&config.data_path, &data)
            .await
            .map_err(|err| err.message)?;
    }

    let state = AppState::new(&config, data);
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
