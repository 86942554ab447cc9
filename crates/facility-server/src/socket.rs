//! UDP listener for the reservation service.
//!
//! One receive loop handles one datagram at a time: decode, dispatch, reply
//! to the sender. Observer updates leave through the same socket.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, error, info};

use crate::cache::ReplyCache;
use crate::config::ServerConfig;
use crate::dispatcher::RequestDispatcher;
use crate::engine::BookingEngine;
use crate::error::ServerResult;
use crate::notifier::UdpNotifier;
use crate::schedule::ScheduleStore;

/// UDP server wiring the socket to a [`RequestDispatcher`].
pub struct UdpServer {
    config: ServerConfig,
    socket: Arc<UdpSocket>,
    dispatcher: Arc<RequestDispatcher>,
}

impl UdpServer {
    /// Binds the socket and builds the booking engine over the catalogue.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        let socket = Arc::new(UdpSocket::bind(config.bind_addr).await?);
        let notifier = Arc::new(UdpNotifier::new(socket.clone(), config.notify_timeout));
        let engine = Arc::new(BookingEngine::new(ScheduleStore::new(), notifier));
        let dispatcher = Arc::new(RequestDispatcher::new(
            engine,
            ReplyCache::new(config.reply_ttl, config.reply_capacity),
        ));

        info!(addr = %socket.local_addr()?, "Reservation server listening");

        Ok(Self {
            config,
            socket,
            dispatcher,
        })
    }

    /// Returns the bound address.
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    /// Receives one datagram and sends its reply.
    pub async fn serve_one(&self, buf: &mut [u8]) -> ServerResult<()> {
        let (len, origin) = self.socket.recv_from(buf).await?;
        debug!(%origin, len, "Received datagram");

        if let Some(reply) = self.dispatcher.handle_datagram(&buf[..len], origin).await {
            self.socket.send_to(&reply, origin).await?;
            debug!(%origin, len = reply.len(), "Sent reply");
        }
        Ok(())
    }

    /// Runs the receive loop.
    ///
    /// This method runs indefinitely; per-datagram errors are logged and the
    /// loop continues.
    pub async fn run(&self) -> ServerResult<()> {
        let mut buf = vec![0u8; self.config.recv_buffer_size];
        loop {
            if let Err(e) = self.serve_one(&mut buf).await {
                error!(error = %e, "Failed to serve datagram");
            }
        }
    }

    /// Runs the receive loop until `shutdown` completes.
    pub async fn run_until_shutdown<S>(&self, shutdown: S) -> ServerResult<()>
    where
        S: Future<Output = ()> + Send,
    {
        tokio::select! {
            result = self.run() => result,
            _ = shutdown => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }
}
