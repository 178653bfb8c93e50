//! Stockroom server: settings, tracing, store, migrations, routes.

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use stockroom::config::load_from_path;
use stockroom::telemetry::{init_fallback_tracing, init_tracing};
use stockroom::{
    app, apply_migrations, builtin_catalog, ensure_database_exists, resolve, AppState, MemoryStore,
    PgStore, Settings, Store,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => {
            init_fallback_tracing();
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };
    if let Err(e) = init_tracing(&settings) {
        init_fallback_tracing();
        tracing::warn!(error = %e, "using fallback tracing subscriber");
    }

    if let Err(e) = run(settings).await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = match &settings.catalog_path {
        Some(path) => load_from_path(path).await?,
        None => builtin_catalog()?,
    };
    let model = resolve(&catalog, settings.mount_unwired_routes)?;

    let store: Arc<dyn Store> = match &settings.database_url {
        Some(url) => {
            ensure_database_exists(url).await?;
            let pool = PgPoolOptions::new()
                .max_connections(settings.db_max_connections)
                .connect(url)
                .await?;
            apply_migrations(&pool, &settings.db_schema, &model).await?;
            Arc::new(PgStore::new(pool, settings.db_schema.clone()))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store, data is lost on exit");
            Arc::new(MemoryStore::new(&model))
        }
    };

    tracing::info!(resources = %model.mounted_paths().join(", "), "entity routes mounted under /api");
    let state = AppState::new(store, model);

    let listener = TcpListener::bind(settings.bind_addr()).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
