//! Token-keyed registry of pending responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use rsvp_config::RegistryConfig;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::error::{RegistryError, RegistryResult};
use crate::id::ResponseId;
use crate::metrics::{MetricsSnapshot, RegistryMetrics};
use crate::rendezvous::{self, ResponseReceiver, ResponseSender};

/// What may cut a send short.
#[derive(Debug, Clone, Copy)]
enum SendBound<'a> {
    Cancel(&'a CancellationToken),
    Timeout(Duration),
    CancelOrDeadline(&'a CancellationToken, Instant),
}

impl SendBound<'_> {
    /// Completes with the error to report once the bound fires. The timer,
    /// if any, lives inside this future and is dropped with it.
    async fn fired(self) -> RegistryError {
        match self {
            SendBound::Cancel(token) => {
                token.cancelled().await;
                RegistryError::Cancelled
            }
            SendBound::Timeout(timeout) => {
                time::sleep(timeout).await;
                RegistryError::DeadlineExceeded
            }
            SendBound::CancelOrDeadline(token, deadline) => tokio::select! {
                biased;
                _ = token.cancelled() => RegistryError::Cancelled,
                _ = time::sleep_until(deadline) => RegistryError::DeadlineExceeded,
            },
        }
    }
}

/// Correlation registry mapping live [`ResponseId`]s to the send half of
/// their rendezvous channel.
///
/// A caller [`allocate`](Self::allocate)s an id, ships it to whoever will
/// produce the answer, waits on the returned receiver, and finally calls
/// [`release`](Self::release). A responder that only knows the id delivers
/// the answer with one of the send methods.
///
/// The map lock only guards id bookkeeping; the hand-over itself runs
/// outside it, so a slow receiver never stalls unrelated ids.
///
/// Entries are never expired automatically. A caller that forgets to
/// release leaks its entry; [`len`](Self::len), the metrics snapshot and the
/// `live_entry_warn_threshold` warning exist to spot that.
pub struct ResponseRegistry<T> {
    config: RegistryConfig,
    next_id: AtomicU64,
    entries: RwLock<HashMap<ResponseId, ResponseSender<T>>>,
    metrics: RegistryMetrics,
    leak_warned: AtomicBool,
}

impl<T> Default for ResponseRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ResponseRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseRegistry")
            .field("config", &self.config)
            .field("live_entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl<T> ResponseRegistry<T> {
    /// Create a registry with default configuration.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with the given configuration.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(0),
            entries: RwLock::new(HashMap::new()),
            metrics: RegistryMetrics::new(),
            leak_warned: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Allocate a fresh id and the receiver its response will arrive on.
    ///
    /// Never returns [`ResponseId::NONE`] and never reissues an id that is
    /// still live, even after the counter wraps.
    pub fn allocate(&self) -> (ResponseId, ResponseReceiver<T>) {
        let (sender, receiver) = rendezvous::channel();

        let mut entries = self.entries.write();
        let id = loop {
            let candidate =
                ResponseId::new(self.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1));
            if candidate.is_none() {
                continue;
            }
            if entries.contains_key(&candidate) {
                self.metrics.record_collision();
                continue;
            }
            break candidate;
        };
        entries.insert(id, sender);
        let live = entries.len();
        self.metrics.record_allocated(live);
        drop(entries);

        trace!(%id, live, "Allocated response id");
        self.check_live_entries(live);
        (id, receiver)
    }

    /// Forget `id`. Returns whether an entry was removed; releasing an
    /// unknown or already released id is a no-op.
    pub fn release(&self, id: ResponseId) -> bool {
        let mut entries = self.entries.write();
        let removed = entries.remove(&id);
        let live = entries.len();
        if removed.is_some() {
            self.metrics.record_released(live);
        }
        drop(entries);

        if removed.is_none() {
            return false;
        }
        trace!(%id, live, "Released response id");
        self.check_live_entries(live);
        true
    }

    /// Resolve `id` to its sender. [`ResponseId::NONE`] is never found.
    pub fn lookup(&self, id: ResponseId) -> Option<ResponseSender<T>> {
        if id.is_none() {
            return None;
        }
        self.entries.read().get(&id).cloned()
    }

    /// Deliver `value` to the caller waiting on `id`, unless `cancel` fires
    /// first.
    pub async fn send(
        &self,
        id: ResponseId,
        value: T,
        cancel: &CancellationToken,
    ) -> RegistryResult<()> {
        self.deliver(id, value, SendBound::Cancel(cancel)).await
    }

    /// Deliver `value` to the caller waiting on `id`, giving up after
    /// `timeout`.
    pub async fn send_timeout(
        &self,
        id: ResponseId,
        value: T,
        timeout: Duration,
    ) -> RegistryResult<()> {
        self.deliver(id, value, SendBound::Timeout(timeout)).await
    }

    /// Deliver `value` unless `cancel` fires or `deadline` passes first;
    /// the error names whichever happened.
    pub async fn send_until(
        &self,
        id: ResponseId,
        value: T,
        cancel: &CancellationToken,
        deadline: Instant,
    ) -> RegistryResult<()> {
        self.deliver(id, value, SendBound::CancelOrDeadline(cancel, deadline))
            .await
    }

    /// [`send_timeout`](Self::send_timeout) with the configured default timeout.
    pub async fn send_default(&self, id: ResponseId, value: T) -> RegistryResult<()> {
        let timeout = self.config.default_send_timeout();
        self.send_timeout(id, value, timeout).await
    }

    async fn deliver(&self, id: ResponseId, value: T, bound: SendBound<'_>) -> RegistryResult<()> {
        let Some(sender) = self.lookup(id) else {
            self.metrics.record_closed();
            trace!(%id, "Send to unknown response id");
            return Err(RegistryError::ChannelClosed(id));
        };

        // Bound first: an already-fired bound never delivers.
        let outcome = tokio::select! {
            biased;
            err = bound.fired() => Err(err),
            sent = sender.send(value) => sent.map_err(|_| RegistryError::ChannelClosed(id)),
        };

        match &outcome {
            Ok(()) => self.metrics.record_delivered(),
            Err(RegistryError::ChannelClosed(_)) => self.metrics.record_closed(),
            Err(RegistryError::Cancelled) => self.metrics.record_cancelled(),
            Err(RegistryError::DeadlineExceeded) => self.metrics.record_deadline_exceeded(),
        }
        trace!(%id, ?outcome, "Send finished");
        outcome
    }

    /// Number of live ids.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn contains(&self, id: ResponseId) -> bool {
        !id.is_none() && self.entries.read().contains_key(&id)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn check_live_entries(&self, live: usize) {
        let threshold = self.config.live_entry_warn_threshold;
        if threshold == 0 {
            return;
        }

        if live >= threshold {
            if !self.leak_warned.swap(true, Ordering::Relaxed) {
                warn!(
                    live,
                    threshold,
                    "Live response ids reached warning threshold, callers may be skipping release"
                );
            }
        } else if live < threshold / 2 {
            // Re-arm only once well below the threshold.
            self.leak_warned.store(false, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
