//! Latest-state broadcast hub for signalcast
//!
//! Keeps the most recent [`StockSnapshot`] per ticker and fans every change
//! out to connected subscribers. Late joiners receive a catch-up snapshot of
//! the headline set before any further update.
//!
//! # Features
//!
//! - Bounded headline set (oldest ticker evicted at capacity)
//! - Single and batch updates, batches delivered as one aggregate event
//! - Periodic quote polling with per-ticker failure isolation
//! - Reconnecting subscriber sessions with a capped retry budget
//! - JSON wire protocol shared by server and client
//!
//! # Example
//!
//! ```no_run
//! use sc_hub::{BroadcastHub, StockSnapshot};
//! use sc_analysis::SignalType;
//!
//! #[tokio::main]
//! async fn main() {
//!     let hub = BroadcastHub::new();
//!     let mut subscriber = hub.subscribe();
//!
//!     hub.update_one(StockSnapshot::new("AAPL", 191.3, SignalType::Buy, 1.8));
//!
//!     if let Some(event) = subscriber.recv().await {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod hub;
pub mod polling;
pub mod protocol;
pub mod session;
pub mod store;
pub mod types;

// Re-export main types
pub use config::{HubConfig, ReconnectConfig};
pub use error::{HubError, Result};
pub use hub::{BroadcastHub, SessionId, SubscriberHandle, DEFAULT_QUEUE_CAPACITY};
pub use polling::{classify_move, snapshot_from_quote, CycleReport, PollingLoop, POLL_INTERVAL};
pub use protocol::{ClientMessage, ServerMessage, SnapshotPayload};
pub use session::{ConnectionState, LocalTransport, ReconnectPolicy, SubscriberSession, Transport};
pub use store::{StateStore, HEADLINE_CAPACITY};
pub use types::{HubEvent, StockSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing subscriber
///
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sc_hub=info,sc_analysis=info,signalcast=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .init();
}
