//! Time-bounded observer subscriptions for one facility.
//!
//! Sessions sit in a min-heap keyed by expiry. Nothing runs in the
//! background: expired sessions are popped off the top whenever the
//! registry is consulted, so the cost of pruning is proportional to the
//! number of sessions that actually expired.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::notifier::Notifier;

/// One observer's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObservationSession {
    /// Ordering key; must stay the first field.
    pub expires_at: Instant,
    pub addr: SocketAddr,
}

impl ObservationSession {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Default)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: Vec<(SocketAddr, io::Error)>,
}

impl DeliveryReport {
    /// True if every live session received the update.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ObservationRegistry {
    sessions: BinaryHeap<Reverse<ObservationSession>>,
}

impl ObservationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `addr` until `now + duration` and returns the expiry.
    pub fn subscribe(&mut self, addr: SocketAddr, duration: Duration, now: Instant) -> Instant {
        let expires_at = now + duration;
        self.sessions
            .push(Reverse(ObservationSession { expires_at, addr }));
        debug!(%addr, secs = duration.as_secs(), "Observer subscribed");
        expires_at
    }

    /// Pops sessions off the top of the heap while they are expired.
    pub fn prune_expired(&mut self, now: Instant) -> usize {
        let mut pruned = 0;
        while let Some(Reverse(head)) = self.sessions.peek() {
            if !head.is_expired(now) {
                break;
            }
            trace!(addr = %head.addr, "Pruning expired observer");
            self.sessions.pop();
            pruned += 1;
        }
        if pruned > 0 {
            debug!(pruned, "Pruned expired observers");
        }
        pruned
    }

    /// Sessions currently held, including any not yet pruned.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Soonest expiry among held sessions.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.sessions.peek().map(|Reverse(s)| s.expires_at)
    }

    /// Sends `payload` to every live session.
    ///
    /// A failed delivery is recorded in the report and does not stop
    /// delivery to the remaining sessions.
    pub async fn broadcast<N>(&mut self, notifier: &N, payload: &[u8], now: Instant) -> DeliveryReport
    where
        N: Notifier + ?Sized,
    {
        self.prune_expired(now);

        let mut report = DeliveryReport::default();
        for Reverse(session) in self.sessions.iter() {
            match notifier.send_to(payload, session.addr).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(addr = %session.addr, error = %e, "Failed to deliver update");
                    report.failed.push((session.addr, e));
                }
            }
        }
        report
    }
}
