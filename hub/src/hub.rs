//! Latest-state broadcast hub
//!
//! The hub owns the [`StateStore`] and the registry of subscriber sessions
//! behind a single lock. Each session gets a bounded queue; state mutation
//! and enqueueing happen under the same lock so every session observes
//! updates in commit order, and a joining session receives its catch-up
//! before any later increment. Network writes happen outside the hub in
//! per-session writer tasks draining those queues.

use crate::error::{HubError, Result};
use crate::store::StateStore;
use crate::types::{HubEvent, StockSnapshot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sc_analysis::NextDayPrediction;
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier assigned to each subscriber session
pub type SessionId = Uuid;

/// Default per-session queue depth
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Receiving end of a subscription
#[derive(Debug)]
pub struct SubscriberHandle {
    id: SessionId,
    connected_at: DateTime<Utc>,
    events: mpsc::Receiver<HubEvent>,
}

impl SubscriberHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Wait for the next event; `None` once the hub dropped the session
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.events.recv().await
    }

    /// Next queued event without waiting
    pub fn try_recv(&mut self) -> Option<HubEvent> {
        self.events.try_recv().ok()
    }
}

#[derive(Debug)]
struct Session {
    sender: mpsc::Sender<HubEvent>,
    connected_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct HubState {
    store: StateStore,
    sessions: HashMap<SessionId, Session>,
}

impl HubState {
    /// Enqueue `event` for every session; drops closed and lagging ones
    fn dispatch(&mut self, event: HubEvent) -> usize {
        let mut delivered = 0;
        let mut dropped = Vec::new();

        for (id, session) in &self.sessions {
            match session.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Closed(_)) => {
                    debug!(session = %id, "Session closed, removing");
                    dropped.push(*id);
                }
                Err(TrySendError::Full(_)) => {
                    warn!(session = %id, "Session queue full, dropping lagging subscriber");
                    dropped.push(*id);
                }
            }
        }

        for id in dropped {
            self.sessions.remove(&id);
        }
        delivered
    }
}

/// Shared hub; wrap in `Arc` to share between tasks
#[derive(Debug)]
pub struct BroadcastHub {
    state: Mutex<HubState>,
    queue_capacity: usize,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            state: Mutex::new(HubState::default()),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Record one snapshot and push it to every session
    ///
    /// Returns the number of sessions the event was queued for.
    pub fn update_one(&self, snapshot: StockSnapshot) -> usize {
        let mut state = self.state.lock();
        if let Some(evicted) = state.store.upsert(snapshot.clone()) {
            debug!(ticker = %evicted.ticker, "Evicted from headlines");
        }
        debug!(ticker = %snapshot.ticker, price = snapshot.price, "Single update");
        state.dispatch(HubEvent::SingleUpdate(snapshot))
    }

    /// Record every snapshot, then push one aggregate event
    ///
    /// An empty batch changes nothing and sends nothing.
    pub fn update_batch(&self, snapshots: Vec<StockSnapshot>) -> usize {
        if snapshots.is_empty() {
            return 0;
        }

        let mut state = self.state.lock();
        let count = snapshots.len();
        for snapshot in snapshots {
            state.store.upsert(snapshot);
        }
        let headlines = state.store.headlines();
        debug!(count, "Batch update");
        state.dispatch(HubEvent::BatchUpdate(headlines))
    }

    /// Push an analysis forecast as a regular single update
    pub fn publish_prediction(&self, ticker: &str, prediction: &NextDayPrediction) -> usize {
        self.update_one(StockSnapshot::from_prediction(ticker, prediction))
    }

    /// Register a new session
    ///
    /// If any state exists the catch-up event is the first thing queued.
    pub fn subscribe(&self) -> SubscriberHandle {
        let (sender, events) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();
        let connected_at = Utc::now();

        let mut state = self.state.lock();
        if !state.store.is_empty() {
            // Fresh queue with capacity >= 1 cannot be full
            let _ = sender.try_send(HubEvent::CatchUp(state.store.headlines()));
        }
        state.sessions.insert(id, Session { sender, connected_at });
        info!(session = %id, subscribers = state.sessions.len(), "Subscriber connected");

        SubscriberHandle {
            id,
            connected_at,
            events,
        }
    }

    /// Remove a session; returns false if it was already gone
    pub fn unsubscribe(&self, id: &SessionId) -> bool {
        let mut state = self.state.lock();
        let removed = state.sessions.remove(id);
        if let Some(session) = &removed {
            let duration = Utc::now() - session.connected_at;
            info!(
                session = %id,
                connected_secs = duration.num_seconds(),
                subscribers = state.sessions.len(),
                "Subscriber disconnected"
            );
        }
        removed.is_some()
    }

    /// Queue the current headline list for one session
    pub fn request_catch_up(&self, id: &SessionId) -> Result<()> {
        let mut state = self.state.lock();
        let headlines = state.store.headlines();
        let session = state
            .sessions
            .get(id)
            .ok_or_else(|| HubError::SessionNotFound(id.to_string()))?;

        match session.sender.try_send(HubEvent::CatchUp(headlines)) {
            Ok(()) => Ok(()),
            Err(e) => {
                state.sessions.remove(id);
                warn!(session = %id, "Catch-up could not be queued, dropping session");
                Err(HubError::ConnectionError(e.to_string()))
            }
        }
    }

    /// Current headline snapshots, oldest first
    pub fn headlines(&self) -> Vec<StockSnapshot> {
        self.state.lock().store.headlines()
    }

    /// Latest snapshot for any ticker seen so far
    pub fn snapshot(&self, ticker: &str) -> Option<StockSnapshot> {
        self.state.lock().store.get(ticker).cloned()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Drop every session; their receivers observe end of stream
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        let count = state.sessions.len();
        state.sessions.clear();
        info!(sessions = count, "Hub shut down");
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_analysis::SignalType;

    fn snap(ticker: &str, price: f64) -> StockSnapshot {
        StockSnapshot::new(ticker, price, SignalType::Neutral, 0.0)
    }

    #[tokio::test]
    async fn test_no_catch_up_when_empty() {
        let hub = BroadcastHub::new();
        let mut handle = hub.subscribe();
        assert!(handle.try_recv().is_none());
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_catch_up_precedes_updates() {
        let hub = BroadcastHub::new();
        hub.update_one(snap("AAPL", 190.0));

        let mut handle = hub.subscribe();
        hub.update_one(snap("MSFT", 410.0));

        let first = handle.recv().await.unwrap();
        assert!(matches!(first, HubEvent::CatchUp(ref list) if list.len() == 1 && list[0].ticker == "AAPL"));
        let second = handle.recv().await.unwrap();
        assert!(matches!(second, HubEvent::SingleUpdate(ref s) if s.ticker == "MSFT"));
        assert!(handle.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let hub = BroadcastHub::new();
        let handle = hub.subscribe();
        assert!(hub.unsubscribe(&handle.id()));
        assert!(!hub.unsubscribe(&handle.id()));
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let hub = BroadcastHub::new();
        let mut handle = hub.subscribe();
        assert_eq!(hub.update_batch(Vec::new()), 0);
        assert!(handle.try_recv().is_none());
        assert!(hub.headlines().is_empty());
    }

    #[tokio::test]
    async fn test_lagging_session_dropped() {
        let hub = BroadcastHub::with_queue_capacity(2);
        let _slow = hub.subscribe();
        let mut fast = hub.subscribe();

        hub.update_one(snap("A", 1.0));
        fast.try_recv();
        hub.update_one(snap("B", 2.0));
        fast.try_recv();
        assert_eq!(hub.subscriber_count(), 2);

        // Third event overflows the slow queue
        hub.update_one(snap("C", 3.0));
        assert_eq!(hub.subscriber_count(), 1);
        assert!(fast.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_dropped_receiver_removed_on_dispatch() {
        let hub = BroadcastHub::new();
        let handle = hub.subscribe();
        drop(handle);

        assert_eq!(hub.update_one(snap("A", 1.0)), 0);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_request_catch_up() {
        let hub = BroadcastHub::new();
        let mut handle = hub.subscribe();
        hub.update_one(snap("A", 1.0));
        handle.try_recv();

        hub.request_catch_up(&handle.id()).unwrap();
        assert!(matches!(handle.try_recv(), Some(HubEvent::CatchUp(list)) if list.len() == 1));

        let missing = hub.request_catch_up(&Uuid::new_v4());
        assert!(matches!(missing, Err(HubError::SessionNotFound(_))));
    }

    #[tokio::test]
    async fn test_shutdown_ends_streams() {
        let hub = BroadcastHub::new();
        let mut handle = hub.subscribe();
        hub.shutdown();
        assert!(handle.recv().await.is_none());
    }
}
