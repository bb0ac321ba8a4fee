//! Process-local idempotency guard for in-flight remote operations.
//!
//! Keys are derived from the operation name, a digest of its parameters,
//! and a coarse time bucket, so an accidental immediate double-submission
//! of the same logical call fails fast instead of executing twice. The
//! guard is process-local and time-salted only: it does not provide
//! cross-process or cross-restart exactly-once guarantees. Callers needing
//! those must layer a durable dedupe store on top.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupeError {
    /// An operation with the same key is already in flight.
    #[error("duplicate in-flight operation: {key}")]
    Conflict { key: String },
}

/// Tracks in-flight operation keys for one process.
///
/// Construct one per process and inject it wherever remote calls are
/// issued; tests construct a fresh guard per case. The map is concurrent,
/// so the guard stays sound even when the runtime serves requests from
/// multiple worker threads.
pub struct DedupeGuard {
    inflight: DashMap<String, Instant>,
    /// Width of the time bucket mixed into derived keys.
    salt_window: Duration,
    /// Entries older than this are presumed leaked and evicted.
    stale_after: Duration,
}

impl DedupeGuard {
    pub fn new(salt_window: Duration) -> Self {
        Self { inflight: DashMap::new(), salt_window, stale_after: Duration::from_secs(300) }
    }

    /// Derive an idempotency key from an operation name and its parameters.
    ///
    /// The current wall-clock time, truncated to the salt window, is mixed
    /// in so that a deliberate re-submission in a later window is allowed.
    pub fn derive_key(&self, operation: &str, params: &[u8]) -> String {
        let bucket = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
            / self.salt_window.as_secs().max(1);

        let mut hasher = blake3::Hasher::new();
        hasher.update(operation.as_bytes());
        hasher.update(params);
        hasher.update(&bucket.to_le_bytes());
        let digest = hex::encode(&hasher.finalize().as_bytes()[..16]);

        format!("{operation}:{digest}")
    }

    /// Claim a key for the duration of an operation.
    ///
    /// Returns a ticket that releases the key when dropped. Fails with
    /// [`DedupeError::Conflict`] if the key is already claimed and not
    /// stale.
    pub fn begin(&self, key: &str) -> Result<DedupeTicket<'_>, DedupeError> {
        use dashmap::mapref::entry::Entry;

        match self.inflight.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Instant::now());
            }
            Entry::Occupied(mut slot) => {
                if slot.get().elapsed() < self.stale_after {
                    return Err(DedupeError::Conflict { key: key.to_string() });
                }
                // Leaked by a panicked or abandoned caller; reclaim.
                slot.insert(Instant::now());
            }
        }

        Ok(DedupeTicket { guard: self, key: key.to_string() })
    }

    /// Number of keys currently claimed.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    fn release(&self, key: &str) {
        self.inflight.remove(key);
    }
}

impl Default for DedupeGuard {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

/// RAII claim on an idempotency key; dropping it releases the key.
pub struct DedupeTicket<'a> {
    guard: &'a DedupeGuard,
    key: String,
}

impl DedupeTicket<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for DedupeTicket<'_> {
    fn drop(&mut self) {
        self.guard.release(&self.key);
    }
}
