//! Reply cache with TTL support.
//!
//! Maps a request id to the encoded reply sent for it, so a retried
//! datagram is answered with the identical bytes instead of being executed
//! again. A request id is claimed before the request runs, which makes the
//! first-sight check and the insert a single step.
//!
//! Each entry also keeps a digest of the request datagram. A request id that
//! comes back with different bytes belongs to a new client that reused the
//! port and sequence, and is executed instead of replayed.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tracing::{debug, trace};

/// SHA-256 digest of a request datagram.
pub type Fingerprint = [u8; 32];

/// Digest of `request`, as stored next to its reply.
pub fn fingerprint(request: &[u8]) -> Fingerprint {
    Sha256::digest(request).into()
}

/// Identity of one logical client action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId {
    pub origin: SocketAddr,
    pub sequence: i64,
}

impl RequestId {
    pub fn new(origin: SocketAddr, sequence: i64) -> Self {
        Self { origin, sequence }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.origin, self.sequence)
    }
}

/// Result of [`ReplyCache::claim`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// Seen before and answered; resend these bytes.
    Replay(Vec<u8>),
    /// Seen before and still executing.
    InFlight,
    /// First sight; the caller must execute and then call `complete`.
    Claimed,
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Pending {
        fingerprint: Fingerprint,
    },
    Done {
        fingerprint: Fingerprint,
        reply: Vec<u8>,
        expires_at: Instant,
    },
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        match self {
            Self::Pending { .. } => false,
            Self::Done { expires_at, .. } => now >= *expires_at,
        }
    }

    fn fingerprint(&self) -> &Fingerprint {
        match self {
            Self::Pending { fingerprint } | Self::Done { fingerprint, .. } => fingerprint,
        }
    }
}

#[derive(Debug)]
pub struct ReplyCache {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<RequestId, CacheEntry>,
}

impl Default for ReplyCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(10 * 60), 4096)
    }
}

impl ReplyCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: HashMap::new(),
        }
    }

    /// Looks up `id` and claims it if unseen, expired, or recorded for
    /// different request bytes.
    pub fn claim(&mut self, id: RequestId, fingerprint: Fingerprint, now: Instant) -> Claim {
        if let Some(entry) = self.entries.get(&id) {
            if entry.is_expired(now) {
                trace!(%id, "Reply cache entry expired");
            } else if *entry.fingerprint() != fingerprint {
                debug!(%id, "Request id reused for different request, executing");
            } else {
                return match entry {
                    CacheEntry::Pending { .. } => Claim::InFlight,
                    CacheEntry::Done { reply, .. } => {
                        trace!(%id, "Reply cache hit");
                        Claim::Replay(reply.clone())
                    }
                };
            }
        }
        self.entries.insert(id, CacheEntry::Pending { fingerprint });
        Claim::Claimed
    }

    /// Stores the reply for a claimed id.
    pub fn complete(
        &mut self,
        id: RequestId,
        fingerprint: Fingerprint,
        reply: Vec<u8>,
        now: Instant,
    ) {
        self.entries.insert(
            id,
            CacheEntry::Done {
                fingerprint,
                reply,
                expires_at: now + self.ttl,
            },
        );
        if self.entries.len() > self.capacity {
            self.evict_expired(now);
            self.evict_oldest();
        }
    }

    /// Drops a claim whose request produced no reply.
    pub fn release(&mut self, id: &RequestId) {
        if matches!(self.entries.get(id), Some(CacheEntry::Pending { .. })) {
            self.entries.remove(id);
        }
    }

    /// Removes all expired replies.
    pub fn evict_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                trace!(%id, "Evicting expired reply");
            }
            keep
        });
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted, "Evicted expired replies");
        }
        evicted
    }

    /// Drops the oldest completed replies until within capacity.
    fn evict_oldest(&mut self) {
        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess == 0 {
            return;
        }
        let mut completed: Vec<_> = self
            .entries
            .iter()
            .filter_map(|(id, entry)| match entry {
                CacheEntry::Done { expires_at, .. } => Some((*expires_at, *id)),
                CacheEntry::Pending { .. } => None,
            })
            .collect();
        completed.sort_unstable_by_key(|(expires_at, _)| *expires_at);
        for (_, id) in completed.into_iter().take(excess) {
            self.entries.remove(&id);
        }
        debug!(excess, "Evicted oldest replies over capacity");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
