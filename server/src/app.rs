//! Process startup and shutdown.

use crate::config::Config;
use crate::metrics::MetricsServer;
use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use ticketbox_core::TicketService;
use ticketbox_postgres::PostgresTicketStore;
use ticketbox_redis::RedisTicketCache;
use ticketbox_web::{AppState, HealthMonitor, build_router};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to `info,ticketbox=debug,sqlx=warn`.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ticketbox=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Connect the database pool described by `config`.
///
/// # Errors
///
/// Returns error if no connection can be established.
pub async fn connect_database(config: &Config) -> anyhow::Result<PgPool> {
    let db = &config.database;
    PgPoolOptions::new()
        .max_connections(db.max_connections)
        .min_connections(db.min_connections)
        .acquire_timeout(Duration::from_secs(db.connect_timeout))
        .idle_timeout(Some(Duration::from_secs(db.idle_timeout)))
        .connect(&db.url)
        .await
        .context("Failed to connect to PostgreSQL")
}

/// Run the server until a shutdown signal arrives.
///
/// # Errors
///
/// Returns error if a backing service is unreachable at startup, a listener
/// cannot bind, or the HTTP server fails.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let metrics_addr: SocketAddr = config
        .server
        .metrics_addr()
        .parse()
        .context("Invalid metrics address")?;
    let mut metrics = MetricsServer::new(metrics_addr);
    metrics
        .start()
        .await
        .context("Failed to start metrics server")?;

    let pool = connect_database(&config).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to PostgreSQL"
    );

    let service_config = config.service_config();
    let store = PostgresTicketStore::from_pool(pool.clone())
        .with_lock_timeout(service_config.lock_timeout);

    if config.database.run_migrations {
        store.migrate().await.context("Failed to run migrations")?;
        info!("Migrations applied");
    }

    let cache = RedisTicketCache::new(&config.redis.url)
        .await
        .context("Failed to connect to Redis")?;
    info!("Connected to Redis");

    let mut health = HealthMonitor::new();
    let probes = [
        health.spawn_probe(
            store.clone(),
            Duration::from_millis(config.database.health_interval_ms),
        ),
        health.spawn_probe(
            cache.clone(),
            Duration::from_millis(config.redis.health_interval_ms),
        ),
    ];

    let service = TicketService::new(store, cache, service_config);
    let app = build_router(AppState::new(service, health));

    let bind_addr = config.server.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {bind_addr}"))?;
    info!(addr = %bind_addr, "Ticketbox listening");

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = signalled_tx.send(());
    });

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout);
    tokio::select! {
        result = server.into_future() => result.context("HTTP server failed")?,
        () = async {
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(shutdown_timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(
                timeout_secs = shutdown_timeout.as_secs(),
                "In-flight requests did not finish before the shutdown timeout"
            );
        }
    }

    for probe in probes {
        probe.abort();
    }
    pool.close().await;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
