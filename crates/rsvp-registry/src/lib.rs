//! # rsvp Registry
//!
//! Correlation registry for asynchronous request/response matching.
//!
//! A caller allocates a [`ResponseId`] together with a receiver, hands the id
//! to whatever will eventually produce the answer (a worker pool, a peer on
//! the other side of a socket), and waits. The responder only needs the id to
//! push exactly one value back.
//!
//! ## Architecture
//!
//! ```text
//!   caller                         ResponseRegistry                    responder
//!     │  allocate() ─────────────▶  id ─▶ ResponseSender (RwLock map)
//!     │  ◀── (id, ResponseReceiver)
//!     │  ─── id over any transport ───────────────────────────────────▶  │
//!     │                                                 send(id, v, ..)  │
//!     │  recv() ◀══════════ rendezvous hand-over (outside the lock) ═════│
//!     │  release(id) ────────────▶  entry removed
//! ```
//!
//! ## Key Components
//!
//! - [`ResponseRegistry`]: id allocation, lookup, release and bounded sends
//! - [`ResponseId`]: opaque id; [`ResponseId::NONE`] is never allocated
//! - [`ResponseReceiver`] / [`ResponseSender`]: unbuffered rendezvous channel
//! - [`PendingResponse`]: allocation guard that releases on drop
//! - [`RegistryMetrics`]: counters and the live entry gauge
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use rsvp_registry::ResponseRegistry;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(ResponseRegistry::<String>::new());
//!     let (id, mut receiver) = registry.allocate();
//!
//!     let responder = registry.clone();
//!     tokio::spawn(async move {
//!         let _ = responder
//!             .send_timeout(id, "pong".to_string(), Duration::from_secs(1))
//!             .await;
//!     });
//!
//!     let reply = receiver.recv().await;
//!     registry.release(id);
//!     assert_eq!(reply.as_deref(), Some("pong"));
//! }
//! ```

pub mod error;
pub mod id;
pub mod metrics;
pub mod pending;
pub mod registry;
pub mod rendezvous;

// Re-exports
pub use error::{RegistryError, RegistryResult};
pub use id::ResponseId;
pub use metrics::{MetricsSnapshot, RegistryMetrics};
pub use pending::PendingResponse;
pub use registry::ResponseRegistry;
pub use rendezvous::{ResponseReceiver, ResponseSender};
pub use rsvp_config::RegistryConfig;
// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;
