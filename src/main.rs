// Copyright (c) mcp-hook-proxy contributors.
// Licensed under the MIT license.

//! The `mcp-hook-proxy(1)` command: loads configuration, builds the hook
//! chain and session store, and serves either the stdio or HTTP-stream
//! transport.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rmcp::model::{ClientInfo, Implementation};
use rmcp::service::serve_server;
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::transport::stdio as stdio_transport;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

mod cli;
mod config;

use cli::{Cli, Commands, Serve};
use config::{Config, TransportType};
use hook_chain::HookChain;
use proxy_server::{ConfiguredTargetFactory, ProxyDispatcher, SessionStore};

/// Target graceful-shutdown window: in-flight requests get this long to
/// drain before the session store is torn down regardless.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve(serve)) => run_serve(serve).await,
        None => {
            eprintln!("No command provided. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

async fn run_serve(serve: Serve) -> Result<()> {
    let config = Config::load(&serve).context("failed to load configuration")?;
    init_logging(config.transport_type);

    let server_info = Implementation {
        name: config
            .server_info
            .name
            .clone()
            .unwrap_or_else(|| "mcp-hook-proxy".to_string()),
        version: config
            .server_info
            .version
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
        title: None,
        website_url: None,
        icons: None,
    };

    let client_info = ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: Default::default(),
        client_info: Implementation {
            name: config
                .client_info
                .name
                .clone()
                .unwrap_or_else(|| "mcp-hook-proxy".to_string()),
            version: config
                .client_info
                .version
                .clone()
                .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            title: None,
            website_url: None,
            icons: None,
        },
    };

    let factory = Arc::new(ConfiguredTargetFactory {
        target: config.target_config(),
        client_info,
    });
    let store = Arc::new(SessionStore::new(factory));
    let chain = Arc::new(HookChain::new(config.hook_definitions()));

    let dispatcher = ProxyDispatcher::new(store.clone(), chain, server_info, None);

    match config.transport_type {
        TransportType::Stdio => run_stdio(dispatcher, store).await,
        TransportType::HttpStream => run_http(dispatcher, store, config.port).await,
    }
}

fn init_logging(transport: TransportType) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".to_string().into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match transport {
        // stdout carries the JSON-RPC protocol stream under stdio; logging
        // must never touch it.
        TransportType::Stdio => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .init(),
        TransportType::HttpStream => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run_stdio(dispatcher: ProxyDispatcher, store: Arc<SessionStore>) -> Result<()> {
    dispatcher
        .discover()
        .await
        .context("initial tools/list discovery failed")?;

    tracing::info!("starting mcp-hook-proxy on stdio");
    let transport = stdio_transport();
    let running_service = serve_server(dispatcher, transport)
        .await
        .context("failed to start stdio service")?;

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutting down");
    if tokio::time::timeout(SHUTDOWN_GRACE, running_service.cancel())
        .await
        .is_err()
    {
        tracing::warn!("stdio shutdown exceeded grace period; tearing down sessions anyway");
    }
    store.clear_all().await;
    Ok(())
}

async fn run_http(dispatcher: ProxyDispatcher, store: Arc<SessionStore>, port: u16) -> Result<()> {
    let bind_address = format!("127.0.0.1:{port}");

    let service = StreamableHttpService::new(
        move || Ok(dispatcher.for_new_session()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {bind_address}"))?;

    tracing::info!(%bind_address, "starting mcp-hook-proxy on http-stream");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server_handle = tokio::spawn(async move {
        axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
    });

    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutting down");
    let _ = shutdown_tx.send(());
    if tokio::time::timeout(SHUTDOWN_GRACE, server_handle)
        .await
        .is_err()
    {
        tracing::warn!("http shutdown exceeded grace period; tearing down sessions anyway");
    }
    store.clear_all().await;
    Ok(())
}
