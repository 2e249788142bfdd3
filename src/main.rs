//! token-proxy: OIDC token-translating reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                    TOKEN PROXY                       │
//!                         │                                                      │
//!     Client Request      │  ┌─────────┐   ┌───────────┐   ┌────────────────┐   │
//!     ────────────────────┼─▶│  http   │──▶│   auth    │──▶│ oidc verifier  │   │
//!                         │  │ server  │   │ extractor │   │ (shared keys)  │   │
//!                         │  └─────────┘   └───────────┘   └───────┬────────┘   │
//!                         │                                        ▼            │
//!                         │                                ┌────────────────┐   │      Identity
//!                         │                                │ broker exchange│◀──┼───▶  Provider
//!                         │                                │ + github login │   │
//!                         │                                └───────┬────────┘   │
//!                         │                                        ▼            │
//!     Client Response     │  ┌─────────┐                   ┌────────────────┐   │
//!     ◀───────────────────┼──│ forward │◀──────────────────│    rewrite     │   │
//!                         │  └────┬────┘                   └────────────────┘   │
//!                         │       └──────────────────────────────────────────────┼───▶  Proxy
//!                         │                                                      │      Destination
//!                         │  ┌────────────────────────────────────────────────┐  │
//!                         │  │ config · lifecycle · observability · provider  │  │
//!                         │  │                                   sync task    │  │
//!                         │  └────────────────────────────────────────────────┘  │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use token_proxy::config::{load_config, Cli};
use token_proxy::http::GatewayServer;
use token_proxy::lifecycle::Shutdown;
use token_proxy::net::{build_client, load_tls_config};
use token_proxy::observability::{init_logging, init_metrics};
use token_proxy::oidc::{bootstrap, shared, HttpDiscovery, ProviderSync};

/// Invalid command line or configuration file.
const EXIT_CONFIG: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match load_config(Cli::parse()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("token-proxy: {e}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        issuer = %config.provider.issuer,
        provider_type = %config.provider.kind,
        provider_alias = %config.provider.alias,
        proxy_url = %config.proxy_url,
        "token-proxy starting"
    );

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "token-proxy failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: token_proxy::GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(addr) = config.observability.metrics_address {
        init_metrics(addr)?;
    }

    let client = build_client(&config.outbound)?;

    // Keys must be loaded before the first request is accepted.
    tracing::info!(discovery = %config.provider.discovery_url(), "Loading provider config");
    let discovery = HttpDiscovery::new(client.clone(), config.provider.issuer.clone());
    let provider_config = shared(bootstrap(&discovery, config.bootstrap).await?);

    let shutdown = Shutdown::new();
    shutdown.listen_for_signals();

    let sync = ProviderSync::new(
        discovery,
        provider_config.clone(),
        config.provider.sync_interval,
    );
    let sync_task = tokio::spawn(sync.run(shutdown.subscribe()));

    let server = GatewayServer::new(&config, client, provider_config)?;
    let served = match &config.listener.tls {
        Some(tls) => {
            let tls = load_tls_config(tls).await?;
            server
                .serve_tls(config.listener.bind_address, tls, shutdown.subscribe())
                .await
        }
        None => {
            let listener = TcpListener::bind(config.listener.bind_address).await?;
            server.serve(listener, shutdown.subscribe()).await
        }
    };

    shutdown.trigger();
    let _ = sync_task.await;
    served?;
    Ok(())
}
