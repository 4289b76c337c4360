//! FCU CAN gateway service

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use fcugw::{
    api::create_routes,
    bootstrap::{self, Args},
    config::GatewayConfig,
    create_driver, logging,
    shutdown::wait_for_shutdown,
    Gateway,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config =
        GatewayConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply_overrides(&mut config);

    logging::init_logging(&config.logging, args.log_level.as_deref(), !args.no_color)
        .map_err(|e| anyhow::anyhow!("Failed to init logging: {}", e))?;
    info!(
        "Starting {} v{}",
        logging::SERVICE_NAME,
        env!("CARGO_PKG_VERSION")
    );
    bootstrap::describe_configuration(&config);

    // Validation mode: validate and exit
    if args.validate {
        config.validate()?;
        println!("{}", bootstrap::render_configuration(&config)?);
        info!("Validation completed successfully");
        return Ok(());
    }

    let bind_address = bootstrap::determine_bind_address(args.bind.as_deref(), &config);
    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", bind_address))?;

    let driver = create_driver(&config)?;
    let gateway = Arc::new(Gateway::new(&config, driver)?);
    gateway.open().await.context("Failed to open CAN driver")?;

    let shutdown_token = CancellationToken::new();

    let receive_handle = {
        let gateway = Arc::clone(&gateway);
        let token = shutdown_token.clone();
        tokio::spawn(async move { gateway.run_receive_loop(token).await })
    };
    let broadcast_handle = {
        let gateway = Arc::clone(&gateway);
        let token = shutdown_token.clone();
        tokio::spawn(async move { gateway.run_broadcast_loop(token).await })
    };

    let socket = tokio::net::TcpSocket::new_v4().context("Failed to create socket")?;
    socket
        .set_reuseaddr(true)
        .context("Failed to set SO_REUSEADDR")?;
    socket
        .bind(addr)
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let listener = socket.listen(1024).context("Failed to listen")?;

    info!("API server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let app = create_routes(Arc::clone(&gateway));
    let server_token = shutdown_token.clone();
    let server_handle = tokio::spawn(async move {
        let shutdown = async move { server_token.cancelled().await };
        if let Err(e) = serve(listener, app).with_graceful_shutdown(shutdown).await {
            error!("API server error: {}", e);
        }
    });

    wait_for_shutdown().await;
    info!("Shutdown signal received");
    shutdown_token.cancel();

    for (name, handle) in [
        ("receive", receive_handle),
        ("broadcast", broadcast_handle),
        ("api", server_handle),
    ] {
        if let Err(e) = handle.await {
            error!("{} task ended abnormally: {}", name, e);
        }
    }

    gateway.shutdown().await;
    info!("{} stopped", logging::SERVICE_NAME);
    Ok(())
}
