// Copyright © 2026 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use billgate_core::audit::DynAuditSink;
use billgate_core::auth::JwtAuthority;
use billgate_core::config::{Config, LoggingConfig};
use billgate_core::database;
use billgate_core::types::Result;
use billgate_server::audit::MemoryAuditSink;
use billgate_server::gateway::Gateway;
use billgate_server::handlers::{ApiHandlers, UpstreamProxy};
use billgate_server::router::{create_router, AppState};
use clap::Parser;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Records kept by the in-memory audit sink when no database is configured.
const MEMORY_SINK_CAPACITY: usize = 100_000;

#[derive(Debug, Parser)]
#[command(name = "billgate", version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

fn load_config(path: &str) -> Result<Config> {
    let mut config = if Path::new(path).exists() {
        Config::load_from_file(path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter);

    if logging.format.eq_ignore_ascii_case("pretty") {
        builder.pretty().init();
    } else {
        builder.json().init();
    }
}

async fn build_audit_sink(config: &Config) -> Result<DynAuditSink> {
    if config.database.enabled {
        let sink = database::connect_audit_sink(&config.database).await?;
        info!("Audit records persisted to database");
        Ok(Arc::new(sink))
    } else {
        warn!("Database disabled, audit records kept in memory only");
        Ok(Arc::new(MemoryAuditSink::new(MEMORY_SINK_CAPACITY)))
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutting down HTTP server...");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;
    init_tracing(&config.logging);

    info!("Starting {}", config.app.name);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let authority = Arc::new(JwtAuthority::new(&config.auth)?);
    let sink = build_audit_sink(&config).await?;

    let gateway = Arc::new(
        Gateway::new(config.gateway.clone(), authority.clone(), sink)
            .with_trusted_proxies(config.app.trusted_proxies.clone()),
    );

    let state = AppState {
        handlers: Arc::new(ApiHandlers::new(authority)),
        upstream: Arc::new(UpstreamProxy::new(&config.upstream)?),
    };

    let request_timeout = Duration::from_secs(config.upstream.timeout_seconds.saturating_add(5));
    let router = create_router(state, gateway, request_timeout);

    let addr = config.app.http_addr()?;
    info!(upstream = config.upstream.base_url, "Starting HTTP server on {}", addr);
    let listener = TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}
