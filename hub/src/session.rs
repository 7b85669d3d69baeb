//! Reconnecting subscriber sessions
//!
//! A [`SubscriberSession`] sits on top of a [`Transport`] and hides
//! transient disconnects from its caller. When the connection drops it
//! retries with a fixed delay up to the policy's attempt budget; every
//! successful reconnect subscribes afresh, which brings a new catch-up
//! snapshot. Once the budget is spent the session is `Disconnected` and
//! stays there.
//!
//! The budget counts consecutive failures. A connection that is accepted
//! but closes before delivering an event counts as a failure, so only a
//! delivered event restores the full budget.

use crate::config::ReconnectConfig;
use crate::error::{HubError, Result};
use crate::hub::{BroadcastHub, SubscriberHandle};
use crate::store::StateStore;
use crate::types::{HubEvent, StockSnapshot};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

/// Capped, fixed-delay reconnect policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay }
    }

    /// Delay before reconnect `attempt` (1-based); `None` once exhausted
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        (1..=self.max_attempts).contains(&attempt).then_some(self.delay)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectConfig::default().into()
    }
}

impl From<ReconnectConfig> for ReconnectPolicy {
    fn from(config: ReconnectConfig) -> Self {
        Self::new(config.max_attempts, config.delay())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Never connected
    Idle,
    Connected,
    Reconnecting { attempt: u32 },
    /// Budget exhausted or closed by the caller; terminal
    Disconnected,
}

/// One connection to a hub, local or remote
#[async_trait]
pub trait Transport: Send {
    /// Open a fresh subscription
    async fn connect(&mut self) -> Result<()>;

    /// Next event; `None` when the connection ended
    async fn recv(&mut self) -> Option<Result<HubEvent>>;

    /// Release the connection
    async fn close(&mut self) {}
}

/// Subscriber that survives transient disconnects
pub struct SubscriberSession<T: Transport> {
    transport: T,
    policy: ReconnectPolicy,
    state: ConnectionState,
    view: StateStore,
    connects: u32,
    /// Consecutive reconnect attempts without a delivered event
    failures: u32,
}

impl<T: Transport> SubscriberSession<T> {
    pub fn new(transport: T, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            policy,
            state: ConnectionState::Idle,
            view: StateStore::new(),
            connects: 0,
            failures: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Successful connections so far, the first one included
    pub fn connects(&self) -> u32 {
        self.connects
    }

    /// Headline list as seen by this subscriber
    pub fn view(&self) -> Vec<StockSnapshot> {
        self.view.headlines()
    }

    /// Next event from the hub, reconnecting as needed
    ///
    /// Returns [`HubError::Disconnected`] once the reconnect budget is spent.
    pub async fn next_event(&mut self) -> Result<HubEvent> {
        loop {
            match self.state {
                ConnectionState::Disconnected => {
                    return Err(HubError::Disconnected {
                        attempts: self.policy.max_attempts,
                    })
                }
                ConnectionState::Idle | ConnectionState::Reconnecting { .. } => {
                    self.establish().await?;
                }
                ConnectionState::Connected => match self.transport.recv().await {
                    Some(Ok(event)) => {
                        self.failures = 0;
                        self.apply(&event);
                        return Ok(event);
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Connection failed, reconnecting");
                        self.transport.close().await;
                        self.state = ConnectionState::Reconnecting { attempt: self.failures };
                    }
                    None => {
                        info!("Connection closed, reconnecting");
                        self.state = ConnectionState::Reconnecting { attempt: self.failures };
                    }
                },
            }
        }
    }

    /// Close the session for good
    pub async fn close(&mut self) {
        self.transport.close().await;
        self.state = ConnectionState::Disconnected;
    }

    async fn establish(&mut self) -> Result<()> {
        if self.state == ConnectionState::Idle {
            match self.transport.connect().await {
                Ok(()) => {
                    self.mark_connected();
                    return Ok(());
                }
                Err(e) => warn!(error = %e, "Initial connect failed"),
            }
        }

        loop {
            self.failures += 1;
            let attempt = self.failures;
            let Some(delay) = self.policy.delay_for(attempt) else {
                self.state = ConnectionState::Disconnected;
                error!(attempts = self.policy.max_attempts, "Reconnect budget exhausted");
                return Err(HubError::Disconnected {
                    attempts: self.policy.max_attempts,
                });
            };

            self.state = ConnectionState::Reconnecting { attempt };
            sleep(delay).await;

            match self.transport.connect().await {
                Ok(()) => {
                    info!(attempt, "Reconnected");
                    self.mark_connected();
                    return Ok(());
                }
                Err(e) => warn!(attempt, error = %e, "Reconnect attempt failed"),
            }
        }
    }

    fn mark_connected(&mut self) {
        self.connects += 1;
        self.state = ConnectionState::Connected;
        debug!(connects = self.connects, "Session connected");
    }

    fn apply(&mut self, event: &HubEvent) {
        match event {
            HubEvent::SingleUpdate(snapshot) => {
                self.view.upsert(snapshot.clone());
            }
            HubEvent::BatchUpdate(list) | HubEvent::CatchUp(list) => {
                self.view.replace_headlines(list.clone());
            }
        }
    }
}

/// In-process transport subscribing directly to a hub
pub struct LocalTransport {
    hub: Arc<BroadcastHub>,
    handle: Option<SubscriberHandle>,
}

impl LocalTransport {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub, handle: None }
    }

    pub fn session_id(&self) -> Option<uuid::Uuid> {
        self.handle.as_ref().map(|h| h.id())
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn connect(&mut self) -> Result<()> {
        if let Some(old) = self.handle.take() {
            self.hub.unsubscribe(&old.id());
        }
        self.handle = Some(self.hub.subscribe());
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<HubEvent>> {
        let handle = self.handle.as_mut()?;
        let event = handle.recv().await;
        if event.is_none() {
            self.handle = None;
        }
        event.map(Ok)
    }

    async fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.hub.unsubscribe(&handle.id());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_budget() {
        let policy = ReconnectPolicy::new(3, Duration::from_millis(50));
        assert_eq!(policy.delay_for(0), None);
        assert_eq!(policy.delay_for(1), Some(Duration::from_millis(50)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(50)));
        assert_eq!(policy.delay_for(4), None);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.delay, Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_local_session_receives_catch_up() {
        let hub = Arc::new(BroadcastHub::new());
        hub.update_one(StockSnapshot::new("AAPL", 190.0, sc_analysis::SignalType::Buy, 1.9));

        let mut session = SubscriberSession::new(LocalTransport::new(hub.clone()), ReconnectPolicy::default());
        assert_eq!(session.state(), ConnectionState::Idle);

        let event = session.next_event().await.unwrap();
        assert!(event.is_catch_up());
        assert_eq!(session.state(), ConnectionState::Connected);
        assert_eq!(session.view()[0].ticker, "AAPL");

        session.close().await;
        assert_eq!(hub.subscriber_count(), 0);
        assert!(matches!(session.next_event().await, Err(HubError::Disconnected { .. })));
    }
}
