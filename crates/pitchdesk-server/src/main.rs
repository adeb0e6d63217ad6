// pitchdesk-server — runnable HTTP server.
//
// Reads configuration from the environment, picks a storage backend
// (SQL when DATABASE_URL is set, in-memory otherwise), migrates the
// schema, provisions the admin account, and serves the API until
// ctrl-c or SIGTERM.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use pitchdesk::bootstrap::{self, ensure_admin};
use pitchdesk_axum::PitchdeskApp;
use pitchdesk_core::db::adapter::{Adapter, SchemaOptions, SchemaStatus};
use pitchdesk_core::db::schema::AppSchema;
use pitchdesk_core::env::init_logger;
use pitchdesk_core::PitchdeskOptions;
use pitchdesk_memory::MemoryAdapter;
use pitchdesk_sqlx::SqlxAdapter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    init_logger();

    let adapter = select_adapter().await?;

    let schema_options = SchemaOptions { auto_migrate: true };
    match adapter
        .create_schema(&AppSchema::core_schema(), &schema_options)
        .await?
    {
        SchemaStatus::UpToDate => tracing::debug!("schema is up to date"),
        SchemaStatus::NeedsMigration { statements } => {
            tracing::info!(applied = statements.len(), "applied schema migrations");
        }
    }

    let app = PitchdeskApp::new(load_options(), adapter);
    let ctx = app.context().clone();

    let admin_email = env_or("PITCHDESK_ADMIN_EMAIL", bootstrap::DEFAULT_ADMIN_EMAIL);
    let admin_password = env::var("PITCHDESK_ADMIN_PASSWORD")
        .unwrap_or_else(|_| bootstrap::DEFAULT_ADMIN_PASSWORD.to_string());
    ensure_admin(&ctx, &admin_email, &admin_password).await?;

    let address = bind_address();
    let listener = TcpListener::bind(&address).await?;
    tracing::info!("listening on {address}");

    axum::serve(listener, app.router_with_cors())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// SQL backend when `DATABASE_URL` is set, in-memory otherwise. The
/// in-memory store loses all data on restart.
async fn select_adapter() -> anyhow::Result<Arc<dyn Adapter>> {
    match env::var("DATABASE_URL") {
        Ok(url) => {
            let adapter = SqlxAdapter::connect(&url).await?;
            tracing::info!("connected to database");
            Ok(Arc::new(adapter))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Ok(Arc::new(MemoryAdapter::new()))
        }
    }
}

fn load_options() -> PitchdeskOptions {
    let mut options = PitchdeskOptions::default();
    if let Ok(dir) = env::var("PITCHDESK_UPLOAD_DIR") {
        options.uploads.dir = dir;
    }
    options
}

/// `PITCHDESK_ADDR` wins outright; otherwise `0.0.0.0` with
/// `PITCHDESK_PORT` (default 5000).
fn bind_address() -> String {
    if let Ok(addr) = env::var("PITCHDESK_ADDR") {
        return addr;
    }
    let port = env_or("PITCHDESK_PORT", "5000");
    format!("0.0.0.0:{port}")
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => {
            tracing::debug!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install ctrl-c handler: {e}");
            // Resolving here would shut the server down at boot.
            std::future::pending::<()>().await;
        }
        tracing::info!("received ctrl-c, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
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
}
