//! UDP invocation client for the reservation server.
//!
//! Every request is sent as one datagram and retried with the identical
//! bytes until a reply with the matching sequence arrives, or the attempt
//! budget runs out. The server replays cached replies for retried
//! non-idempotent requests, so a lost reply never executes a booking twice.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::net::{UdpSocket, lookup_host};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, trace, warn};

use facility_protocol::codec::Marshal;
use facility_protocol::{FacilityUpdate, MAX_DATAGRAM_SIZE, Request, Response};

use crate::error::{ClientError, ClientResult};

/// Wait for one reply before resending.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends per request, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Client bound to one local UDP port talking to one server.
pub struct InvocationClient {
    socket: UdpSocket,
    server: SocketAddr,
    timeout: Duration,
    max_attempts: u32,
    next_sequence: i64,
}

impl InvocationClient {
    /// Binds an ephemeral local port of the same address family as `server`.
    pub async fn connect(server: SocketAddr) -> ClientResult<Self> {
        let local: SocketAddr = if server.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(Self::with_socket(socket, server))
    }

    /// Resolves `host:port` and connects to the first address found.
    pub async fn resolve(host: &str, port: u16) -> ClientResult<Self> {
        let server = lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| ClientError::Config(format!("cannot resolve host {}", host)))?;
        Self::connect(server).await
    }

    /// Wraps an already bound socket.
    ///
    /// Sequences start at the current Unix time in milliseconds, so a later
    /// process that gets the same ephemeral port does not repeat the request
    /// ids of an earlier one.
    pub fn with_socket(socket: UdpSocket, server: SocketAddr) -> Self {
        Self {
            socket,
            server,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            next_sequence: initial_sequence(Utc::now()),
        }
    }

    /// Builder: per-attempt reply timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: total sends per request. Zero is treated as one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn local_addr(&self) -> ClientResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Sends `request` and waits for its reply, resending on timeout or
    /// socket error.
    ///
    /// A reply with a non-success status is still `Ok`; the caller decides
    /// what it means.
    pub async fn invoke(&mut self, request: &Request) -> ClientResult<Response> {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let payload = request.encode(sequence)?;

        for attempt in 1..=self.max_attempts {
            if let Err(e) = self.socket.send_to(&payload, self.server).await {
                warn!(sequence, attempt, error = %e, "Failed to send request");
                continue;
            }
            debug!(
                server = %self.server,
                function = %request.function(),
                sequence,
                attempt,
                "Request sent"
            );

            match timeout(self.timeout, self.await_reply(sequence)).await {
                Ok(Ok(reply)) => return Ok(reply),
                Ok(Err(e)) => warn!(sequence, attempt, error = %e, "Failed to receive reply"),
                Err(_) => warn!(
                    sequence,
                    attempt,
                    max_attempts = self.max_attempts,
                    "No reply before timeout"
                ),
            }
        }

        Err(ClientError::RequestFailed {
            attempts: self.max_attempts,
        })
    }

    /// Reads datagrams until the reply for `sequence` shows up.
    async fn await_reply(&self, sequence: i64) -> ClientResult<Response> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, from) = self.socket.recv_from(&mut buf).await?;
            if from != self.server {
                trace!(%from, "Ignoring datagram from unknown peer");
                continue;
            }
            match Response::unmarshal(&buf[..len]) {
                Ok(response) if response.sequence == sequence => return Ok(response),
                Ok(response) => {
                    debug!(expected = sequence, received = response.sequence, "Stale reply")
                }
                Err(e) => trace!(error = %e, "Ignoring non-reply datagram"),
            }
        }
    }

    /// Registers this client's address as an observer of `facility`.
    pub async fn observe(&mut self, facility: &str, minutes: i32) -> ClientResult<Response> {
        self.invoke(&Request::observe(facility, minutes)).await
    }

    /// Waits for the next pushed update, or `None` once `deadline` passes.
    pub async fn next_update(&self, deadline: Instant) -> ClientResult<Option<FacilityUpdate>> {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            let (len, from) = match timeout_at(deadline, self.socket.recv_from(&mut buf)).await {
                Ok(received) => received?,
                Err(_) => return Ok(None),
            };
            if from != self.server {
                continue;
            }
            match FacilityUpdate::unmarshal(&buf[..len]) {
                Ok(update) => return Ok(Some(update)),
                Err(e) => trace!(error = %e, "Ignoring non-update datagram"),
            }
        }
    }

    /// Checks whether the server answers a heartbeat.
    pub async fn ping(&mut self) -> ClientResult<bool> {
        match self.invoke(&Request::Heartbeat).await {
            Ok(response) => Ok(response.is_success()),
            Err(ClientError::RequestFailed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn initial_sequence(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis().max(1)
}
