//! Hook-Relay service binary.
//!
//! Loads and validates configuration, wires the shared state, and serves the
//! ingress and consumer routers on their configured listeners until one of
//! them fails.

use anyhow::Context;
use hook_relay_service::config::ServiceConfig;
use hook_relay_service::{consumer_router, ingress_router, AppState};
use hook_relay_core::relay::{InMemoryPublisher, InMemorySink};
use hook_relay_core::signature::SignatureVerifier;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "hook_relay_service=info,hook_relay_core=info,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServiceConfig::load().and_then(|config| {
        config.validate()?;
        Ok(config)
    }) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "configuration is unusable, refusing to start");
            std::process::exit(3);
        }
    };

    // TODO: replace with the real queue and warehouse clients once their
    // deployment credentials land; until then every run is self-contained.
    warn!("using in-memory queue and sink transports; events do not leave this process");

    let state = AppState {
        verifier: Arc::new(SignatureVerifier::new(config.webhook_secret.as_bytes())),
        publisher: Arc::new(InMemoryPublisher::new()),
        sink: Arc::new(InMemorySink::new()),
    };

    let mut servers: JoinSet<std::io::Result<()>> = JoinSet::new();

    if config.ingress.enabled {
        let addr = format!("{}:{}", config.ingress.host, config.ingress.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind ingress listener on {addr}"))?;
        info!(addr = %addr, "ingress listener started");
        let router = ingress_router(state.clone());
        servers.spawn(async move { axum::serve(listener, router).await });
    }

    if config.consumer.enabled {
        let addr = format!("{}:{}", config.consumer.host, config.consumer.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind consumer listener on {addr}"))?;
        info!(addr = %addr, "consumer listener started");
        let router = consumer_router(state.clone());
        servers.spawn(async move { axum::serve(listener, router).await });
    }

    // Validation guarantees at least one listener; the first server to exit
    // takes the process down with it.
    while let Some(result) = servers.join_next().await {
        result
            .context("server task panicked")?
            .context("server exited with an error")?;
    }

    Ok(())
}
