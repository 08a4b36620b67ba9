//! Unbuffered rendezvous channel.
//!
//! A send only completes while the receiving side is inside `recv`.
//! Each `recv` posts a fresh one-shot slot on an internal queue and closes it
//! again when the `recv` future goes away; a sender waits for the next open
//! slot and hands its value straight into it, so nothing is ever parked in
//! the channel on behalf of a receiver that is not listening.
//!
//! ```text
//!   ResponseReceiver::recv ──(oneshot slot)──▶ slot queue ──▶ ResponseSender::send
//!            ▲                                                      │
//!            └──────────────────── value ◀──────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};

type Slot<T> = oneshot::Sender<T>;

/// Create a connected sender/receiver pair.
pub fn channel<T>() -> (ResponseSender<T>, ResponseReceiver<T>) {
    let (slot_tx, slot_rx) = mpsc::unbounded_channel();
    let sender = ResponseSender {
        slots: Arc::new(Mutex::new(slot_rx)),
    };
    let receiver = ResponseReceiver {
        slots: slot_tx,
        buffered: None,
    };
    (sender, receiver)
}

/// Send half. Cheap to clone; every clone feeds the same receiver.
pub struct ResponseSender<T> {
    slots: Arc<Mutex<mpsc::UnboundedReceiver<Slot<T>>>>,
}

impl<T> Clone for ResponseSender<T> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<T> std::fmt::Debug for ResponseSender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseSender").finish_non_exhaustive()
    }
}

impl<T> ResponseSender<T> {
    /// Wait for the receiver to ask for a value, then hand `value` over.
    ///
    /// Returns the value back if the receiver has been dropped. The future
    /// is cancel-safe: dropping it before completion never delivers `value`.
    pub async fn send(&self, value: T) -> Result<(), T> {
        let mut slots = self.slots.lock().await;
        let mut value = value;
        while let Some(slot) = slots.recv().await {
            match slot.send(value) {
                Ok(()) => return Ok(()),
                // Slot was closed by a `recv` that stopped waiting.
                Err(returned) => value = returned,
            }
        }
        Err(value)
    }
}

/// Receive half, held by the caller that allocated the id.
pub struct ResponseReceiver<T> {
    slots: mpsc::UnboundedSender<Slot<T>>,
    /// Value handed over just as a `recv` future was dropped.
    buffered: Option<T>,
}

impl<T> std::fmt::Debug for ResponseReceiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseReceiver")
            .field("buffered", &self.buffered.is_some())
            .finish_non_exhaustive()
    }
}

impl<T> ResponseReceiver<T> {
    /// Wait for a value.
    ///
    /// Returns `None` once every sender is gone. Cancel-safe: if this future
    /// is dropped after a sender already handed its value over, the next call
    /// returns that value. Once dropped, the slot it posted accepts nothing.
    pub async fn recv(&mut self) -> Option<T> {
        if let Some(value) = self.buffered.take() {
            return Some(value);
        }

        let (slot, pending) = oneshot::channel();
        self.slots.send(slot).ok()?;

        let mut wait = SlotWait {
            pending,
            buffered: &mut self.buffered,
        };
        (&mut wait.pending).await.ok()
    }
}

/// Open slot of one `recv` call. Closes the slot on drop and keeps a value
/// that won the race with the close.
struct SlotWait<'a, T> {
    pending: oneshot::Receiver<T>,
    buffered: &'a mut Option<T>,
}

impl<T> Drop for SlotWait<'_, T> {
    fn drop(&mut self) {
        // No-op when the value was already received.
        self.pending.close();
        if let Ok(value) = self.pending.try_recv() {
            *self.buffered = Some(value);
        }
    }
}

#[cfg(test)]
#[path = "rendezvous_tests.rs"]
mod tests;
