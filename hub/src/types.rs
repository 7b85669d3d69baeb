use chrono::{DateTime, Utc};
use sc_analysis::{NextDayPrediction, SignalType};
use serde::{Deserialize, Serialize};

/// Latest published state for one ticker; the unit of broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub ticker: String,
    pub price: f64,
    pub signal: SignalType,
    /// Percent change against the reference price (session open or last close)
    pub change_percent: f64,
    pub timestamp: DateTime<Utc>,
}

impl StockSnapshot {
    /// Create a snapshot stamped with the current time
    pub fn new(ticker: impl Into<String>, price: f64, signal: SignalType, change_percent: f64) -> Self {
        Self {
            ticker: ticker.into(),
            price,
            signal,
            change_percent,
            timestamp: Utc::now(),
        }
    }

    /// Snapshot carrying an analysis forecast for `ticker`
    pub fn from_prediction(ticker: impl Into<String>, prediction: &NextDayPrediction) -> Self {
        Self::new(ticker, prediction.price, prediction.signal, prediction.change_percent)
    }
}

/// Event pushed to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum HubEvent {
    /// One ticker changed
    SingleUpdate(StockSnapshot),
    /// Full headline list after a batch
    BatchUpdate(Vec<StockSnapshot>),
    /// Current headline list for a session that just joined
    CatchUp(Vec<StockSnapshot>),
}

impl HubEvent {
    /// Snapshots carried by the event
    pub fn snapshots(&self) -> &[StockSnapshot] {
        match self {
            HubEvent::SingleUpdate(snapshot) => std::slice::from_ref(snapshot),
            HubEvent::BatchUpdate(list) | HubEvent::CatchUp(list) => list,
        }
    }

    pub fn is_catch_up(&self) -> bool {
        matches!(self, HubEvent::CatchUp(_))
    }
}
