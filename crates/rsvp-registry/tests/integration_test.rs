//! End-to-end tests for request/response correlation through a worker pool.
//!
//! Callers only share an id with the workers; the answer travels back
//! through the registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};

use rsvp_registry::{CancellationToken, RegistryError, ResponseId, ResponseRegistry};

// ============================================================================
// Test Helpers
// ============================================================================

/// Request as it would appear on a transport: the id plus an opaque payload.
#[derive(Debug)]
struct Request {
    reply_to: ResponseId,
    payload: u64,
}

/// Spawn `workers` responders that answer each request with `payload + 1`.
fn spawn_workers(
    workers: usize,
    registry: Arc<ResponseRegistry<u64>>,
    requests: mpsc::Receiver<Request>,
    shutdown: CancellationToken,
    failures: Arc<AtomicU32>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let requests = Arc::new(Mutex::new(requests));
    (0..workers)
        .map(|_| {
            let registry = registry.clone();
            let requests = requests.clone();
            let shutdown = shutdown.clone();
            let failures = failures.clone();
            tokio::spawn(async move {
                loop {
                    let next = requests.lock().await.recv().await;
                    let Some(request) = next else { break };
                    if request.reply_to.is_none() {
                        continue;
                    }
                    let result = registry
                        .send(request.reply_to, request.payload + 1, &shutdown)
                        .await;
                    if result.is_err() {
                        failures.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_worker_pool_answers_every_caller() {
    let registry = Arc::new(ResponseRegistry::<u64>::new());
    let (tx, rx) = mpsc::channel(32);
    let shutdown = CancellationToken::new();
    let failures = Arc::new(AtomicU32::new(0));
    let workers = spawn_workers(4, registry.clone(), rx, shutdown.clone(), failures.clone());

    let mut callers = Vec::new();
    for payload in 0..200u64 {
        let registry = registry.clone();
        let tx = tx.clone();
        callers.push(tokio::spawn(async move {
            let mut pending = registry.pending();
            tx.send(Request {
                reply_to: pending.id(),
                payload,
            })
            .await
            .unwrap();
            pending.recv_timeout(Duration::from_secs(10)).await
        }));
    }
    drop(tx);

    for (payload, caller) in callers.into_iter().enumerate() {
        assert_eq!(caller.await.unwrap(), Ok(payload as u64 + 1));
    }
    for worker in workers {
        worker.await.unwrap();
    }

    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert!(registry.is_empty());

    let metrics = registry.metrics();
    assert_eq!(metrics.allocated, 200);
    assert_eq!(metrics.released, 200);
    assert_eq!(metrics.delivered, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fire_and_forget_requests_carry_no_id() {
    let registry = Arc::new(ResponseRegistry::<u64>::new());
    let (tx, rx) = mpsc::channel(8);
    let shutdown = CancellationToken::new();
    let failures = Arc::new(AtomicU32::new(0));
    let workers = spawn_workers(1, registry.clone(), rx, shutdown, failures.clone());

    tx.send(Request {
        reply_to: ResponseId::NONE,
        payload: 1,
    })
    .await
    .unwrap();
    drop(tx);

    for worker in workers {
        worker.await.unwrap();
    }
    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert_eq!(registry.metrics().send_attempts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_unblocks_responder_for_absent_caller() {
    let registry = Arc::new(ResponseRegistry::<u64>::new());
    let shutdown = CancellationToken::new();

    // Caller allocates but never reads.
    let (id, _receiver) = registry.allocate();

    let responder = {
        let registry = registry.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { registry.send(id, 5, &shutdown).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!responder.is_finished());

    shutdown.cancel();
    assert_eq!(responder.await.unwrap(), Err(RegistryError::Cancelled));

    registry.release(id);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_independent_registries_do_not_share_ids() {
    let first = ResponseRegistry::<u64>::new();
    let second = ResponseRegistry::<u64>::new();

    let (id, _receiver) = first.allocate();
    // Same counter position, separate maps.
    let (other, _other_receiver) = second.allocate();
    assert_eq!(id, other);

    second.release(other);
    assert!(first.contains(id));
    assert!(!second.contains(other));
}
