//! Soak workload: concurrent callers, a responder pool, one registry.
//!
//! Callers allocate an id, ship it to the responders over an mpsc queue that
//! stands in for a transport, and wait for the reply. Responders only see the
//! id and answer through the registry. Every reply echoes the id it was sent
//! for, so any cross-delivery shows up as a mismatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use rsvp_config::{RegistryConfig, SoakConfig};
use rsvp_registry::{
    CancellationToken, MetricsSnapshot, RegistryError, RegistryResult, ResponseId,
    ResponseRegistry,
};

/// Request as it travels to a responder.
#[derive(Debug)]
struct Request {
    reply_to: ResponseId,
    payload: u64,
}

/// Reply pushed back through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reply {
    id: ResponseId,
    payload: u64,
}

#[derive(Debug, Default)]
struct Tally {
    requests: AtomicU64,
    received: AtomicU64,
    abandoned: AtomicU64,
    receive_timeouts: AtomicU64,
    mismatches: AtomicU64,
    responder_delivered: AtomicU64,
    responder_closed: AtomicU64,
    responder_cancelled: AtomicU64,
    responder_deadline: AtomicU64,
}

impl Tally {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_send(&self, result: RegistryResult<()>) {
        match result {
            Ok(()) => Self::bump(&self.responder_delivered),
            Err(RegistryError::ChannelClosed(_)) => Self::bump(&self.responder_closed),
            Err(RegistryError::Cancelled) => Self::bump(&self.responder_cancelled),
            Err(RegistryError::DeadlineExceeded) => Self::bump(&self.responder_deadline),
        }
    }
}

/// Outcome of a soak run.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct SoakReport {
    pub requests: u64,
    pub received: u64,
    pub abandoned: u64,
    pub receive_timeouts: u64,
    pub mismatches: u64,
    pub responder_delivered: u64,
    pub responder_closed: u64,
    pub responder_cancelled: u64,
    pub responder_deadline: u64,
    pub leaked_entries: usize,
    pub elapsed_ms: u64,
    pub metrics: MetricsSnapshot,
}

impl SoakReport {
    /// No reply reached the wrong caller and every id was released.
    pub fn is_healthy(&self) -> bool {
        self.mismatches == 0 && self.leaked_entries == 0
    }

    pub fn render_text(&self) -> String {
        let lines = [
            format!("requests:            {}", self.requests),
            format!("received:            {}", self.received),
            format!("abandoned:           {}", self.abandoned),
            format!("receive timeouts:    {}", self.receive_timeouts),
            format!("mismatches:          {}", self.mismatches),
            format!("responder delivered: {}", self.responder_delivered),
            format!("responder closed:    {}", self.responder_closed),
            format!("responder cancelled: {}", self.responder_cancelled),
            format!("responder deadline:  {}", self.responder_deadline),
            format!("leaked entries:      {}", self.leaked_entries),
            format!("elapsed:             {} ms", self.elapsed_ms),
            format!("id collisions:       {}", self.metrics.collisions),
            format!("delivery ratio:      {:.3}", self.metrics.delivery_ratio()),
        ];
        lines.join("\n")
    }
}

/// Whether request number `seq` belongs to a caller that stops listening.
/// Spreads abandoned requests evenly instead of bunching them up.
fn should_abandon(seq: usize, ratio: f64) -> bool {
    if ratio <= 0.0 {
        return false;
    }
    ((seq + 1) as f64 * ratio).floor() > (seq as f64 * ratio).floor()
}

/// Run the workload to completion, or until `shutdown` fires.
pub(crate) async fn run(
    registry_config: RegistryConfig,
    soak: SoakConfig,
    shutdown: CancellationToken,
) -> SoakReport {
    let registry = Arc::new(ResponseRegistry::<Reply>::with_config(registry_config));
    let tally = Arc::new(Tally::default());
    let (tx, rx) = mpsc::channel::<Request>(soak.responders.max(1) * 4);
    let rx = Arc::new(Mutex::new(rx));
    let started = Instant::now();

    info!(
        callers = soak.callers,
        responders = soak.responders,
        requests_per_caller = soak.requests_per_caller,
        abandon_ratio = soak.abandon_ratio,
        "Starting soak run"
    );

    let send_timeout = Duration::from_millis(soak.send_timeout_ms);
    let responders: Vec<_> = (0..soak.responders)
        .map(|worker| {
            tokio::spawn(respond(
                worker,
                registry.clone(),
                rx.clone(),
                tally.clone(),
                shutdown.clone(),
                send_timeout,
            ))
        })
        .collect();

    let soak = Arc::new(soak);
    let callers: Vec<_> = (0..soak.callers)
        .map(|caller| {
            tokio::spawn(call(
                caller,
                soak.clone(),
                registry.clone(),
                tx.clone(),
                tally.clone(),
                shutdown.clone(),
            ))
        })
        .collect();
    drop(tx);

    for caller in callers {
        if let Err(e) = caller.await {
            warn!(error = %e, "Caller task failed");
        }
    }
    for responder in responders {
        if let Err(e) = responder.await {
            warn!(error = %e, "Responder task failed");
        }
    }

    let leaked_entries = registry.len();
    if leaked_entries > 0 {
        warn!(leaked_entries, "Soak run finished with live response ids");
    }

    let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
    let report = SoakReport {
        requests: load(&tally.requests),
        received: load(&tally.received),
        abandoned: load(&tally.abandoned),
        receive_timeouts: load(&tally.receive_timeouts),
        mismatches: load(&tally.mismatches),
        responder_delivered: load(&tally.responder_delivered),
        responder_closed: load(&tally.responder_closed),
        responder_cancelled: load(&tally.responder_cancelled),
        responder_deadline: load(&tally.responder_deadline),
        leaked_entries,
        elapsed_ms: started.elapsed().as_millis() as u64,
        metrics: registry.metrics(),
    };
    info!(
        requests = report.requests,
        received = report.received,
        mismatches = report.mismatches,
        elapsed_ms = report.elapsed_ms,
        "Soak run finished"
    );
    report
}

async fn call(
    caller: usize,
    soak: Arc<SoakConfig>,
    registry: Arc<ResponseRegistry<Reply>>,
    requests: mpsc::Sender<Request>,
    tally: Arc<Tally>,
    shutdown: CancellationToken,
) {
    let send_timeout = Duration::from_millis(soak.send_timeout_ms);
    let receive_timeout = Duration::from_millis(soak.receive_timeout_ms);

    for n in 0..soak.requests_per_caller {
        if shutdown.is_cancelled() {
            break;
        }

        let seq = caller * soak.requests_per_caller + n;
        let payload = seq as u64;
        let mut pending = registry.pending();
        let id = pending.id();

        let request = Request {
            reply_to: id,
            payload,
        };
        if requests.send(request).await.is_err() {
            break;
        }
        Tally::bump(&tally.requests);

        if should_abandon(seq, soak.abandon_ratio) {
            // Keep the id live without listening until the responder has
            // had time to give up, then let the guard release it.
            tokio::select! {
                _ = tokio::time::sleep(send_timeout.saturating_mul(2)) => {}
                _ = shutdown.cancelled() => {}
            }
            Tally::bump(&tally.abandoned);
            continue;
        }

        match pending.recv_timeout(receive_timeout).await {
            Ok(reply) if reply == (Reply { id, payload }) => Tally::bump(&tally.received),
            Ok(reply) => {
                Tally::bump(&tally.mismatches);
                warn!(
                    %id,
                    got = %reply.id,
                    payload,
                    got_payload = reply.payload,
                    "Reply reached the wrong caller"
                );
            }
            Err(e) => {
                Tally::bump(&tally.receive_timeouts);
                debug!(%id, error = %e, "Caller gave up waiting");
            }
        }
    }

    debug!(caller, "Caller finished");
}

async fn respond(
    worker: usize,
    registry: Arc<ResponseRegistry<Reply>>,
    requests: Arc<Mutex<mpsc::Receiver<Request>>>,
    tally: Arc<Tally>,
    shutdown: CancellationToken,
    send_timeout: Duration,
) {
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => None,
            request = async { requests.lock().await.recv().await } => request,
        };
        let Some(request) = next else {
            break;
        };

        let reply = Reply {
            id: request.reply_to,
            payload: request.payload,
        };
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(RegistryError::Cancelled),
            sent = registry.send_timeout(request.reply_to, reply, send_timeout) => sent,
        };
        tally.record_send(result);
    }

    debug!(worker, "Responder stopped");
}

#[cfg(test)]
#[path = "soak_tests.rs"]
mod tests;
