//! Scoped pending response.
//!
//! Provides [`PendingResponse`], which owns an allocated id together with its
//! receiver and releases the id when dropped, so an early return or a
//! cancelled caller cannot leak a registry entry.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{RegistryError, RegistryResult};
use crate::id::ResponseId;
use crate::registry::ResponseRegistry;
use crate::rendezvous::ResponseReceiver;

impl<T> ResponseRegistry<T> {
    /// Allocate an id wrapped in a guard that releases it on drop.
    pub fn pending(self: &Arc<Self>) -> PendingResponse<T> {
        let (id, receiver) = self.allocate();
        PendingResponse {
            registry: Arc::clone(self),
            id,
            receiver,
            released: false,
        }
    }
}

/// Allocated id plus its receiver, released exactly once.
pub struct PendingResponse<T> {
    registry: Arc<ResponseRegistry<T>>,
    id: ResponseId,
    receiver: ResponseReceiver<T>,
    /// Set once the id has been released, via [`release`](Self::release) or drop.
    released: bool,
}

impl<T> PendingResponse<T> {
    /// The id to hand to the responder.
    pub fn id(&self) -> ResponseId {
        self.id
    }

    /// Wait for the response.
    ///
    /// While the guard is alive the registry keeps a sender, so this only
    /// returns `None` if the id was released out from under the guard.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Wait for the response for at most `timeout`.
    pub async fn recv_timeout(&mut self, timeout: Duration) -> RegistryResult<T> {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(RegistryError::ChannelClosed(self.id)),
            Err(_) => Err(RegistryError::DeadlineExceeded),
        }
    }

    /// Wait for the response until `cancel` fires.
    pub async fn recv_cancellable(&mut self, cancel: &CancellationToken) -> RegistryResult<T> {
        tokio::select! {
            biased;
            received = self.receiver.recv() => received.ok_or(RegistryError::ChannelClosed(self.id)),
            _ = cancel.cancelled() => Err(RegistryError::Cancelled),
        }
    }

    /// Release the id now instead of at drop.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.release(self.id);
        }
    }
}

impl<T> Drop for PendingResponse<T> {
    fn drop(&mut self) {
        self.release_once();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_round_trip() {
        let registry = Arc::new(ResponseRegistry::<&'static str>::new());
        let mut pending = registry.pending();
        let id = pending.id();

        let responder = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.send_timeout(id, "done", Duration::from_secs(5)).await })
        };

        assert_eq!(pending.recv_timeout(Duration::from_secs(5)).await, Ok("done"));
        assert_eq!(responder.await.unwrap(), Ok(()));
        assert!(registry.contains(id));

        pending.release();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_drop_releases_id() {
        let registry = Arc::new(ResponseRegistry::<u32>::new());
        let id = {
            let pending = registry.pending();
            assert_eq!(registry.len(), 1);
            pending.id()
        };

        assert!(!registry.contains(id));
        let result = registry.send_timeout(id, 1, Duration::from_secs(1)).await;
        assert_eq!(result, Err(RegistryError::ChannelClosed(id)));
        assert_eq!(registry.metrics().released, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_timeout_expires() {
        let registry = Arc::new(ResponseRegistry::<u32>::new());
        let mut pending = registry.pending();

        let result = pending.recv_timeout(Duration::from_millis(10)).await;
        assert_eq!(result, Err(RegistryError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_responder_times_out_after_recv_timeout() {
        let registry = Arc::new(ResponseRegistry::<u32>::new());
        let mut pending = registry.pending();
        let id = pending.id();

        let waited = pending.recv_timeout(Duration::from_millis(10)).await;
        assert_eq!(waited, Err(RegistryError::DeadlineExceeded));

        // The id is still live but nobody listens on it any more.
        let sent = registry.send_timeout(id, 7, Duration::from_millis(10)).await;
        assert_eq!(sent, Err(RegistryError::DeadlineExceeded));

        pending.release();
        assert_eq!(registry.metrics().delivered, 0);
    }

    #[tokio::test]
    async fn test_recv_cancellable() {
        let registry = Arc::new(ResponseRegistry::<u32>::new());
        let mut pending = registry.pending();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(pending.recv_cancellable(&cancel).await, Err(RegistryError::Cancelled));
    }

    #[tokio::test]
    async fn test_recv_after_external_release_is_closed() {
        let registry = Arc::new(ResponseRegistry::<u32>::new());
        let mut pending = registry.pending();

        registry.release(pending.id());
        assert_eq!(pending.recv().await, None);
    }
}
