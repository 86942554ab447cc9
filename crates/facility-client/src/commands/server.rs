//! Server command: runs the reservation server in the foreground.

use std::net::IpAddr;

use tracing::info;

use facility_server::{SignalHandler, UdpServer};

use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Starts the server and blocks until SIGTERM/SIGINT.
pub async fn run(
    config: &ClientConfig,
    bind: Option<IpAddr>,
    port: Option<u16>,
) -> ClientResult<()> {
    let mut settings = config.daemon.clone();
    if let Some(bind) = bind {
        settings.bind = bind;
    }
    if let Some(port) = port {
        settings.port = port;
    }

    let signal_handler = SignalHandler::new();
    signal_handler.spawn_listener();

    let server = UdpServer::bind(settings.to_server_config()).await?;
    let shutdown = signal_handler.shutdown();
    server.run_until_shutdown(shutdown.wait()).await?;

    info!("Server stopped");
    Ok(())
}
