//! Wire protocol
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! Inbound payloads are validated here, before they reach the hub.

use crate::error::{HubError, Result};
use crate::types::{HubEvent, StockSnapshot};
use sc_analysis::SignalType;
use serde::{Deserialize, Serialize};

/// Server -> client frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    StockUpdate(StockSnapshot),
    TopStocksUpdate(Vec<StockSnapshot>),
}

impl From<HubEvent> for ServerMessage {
    fn from(event: HubEvent) -> Self {
        match event {
            HubEvent::SingleUpdate(snapshot) => ServerMessage::StockUpdate(snapshot),
            HubEvent::BatchUpdate(list) | HubEvent::CatchUp(list) => ServerMessage::TopStocksUpdate(list),
        }
    }
}

impl ServerMessage {
    /// Client-side view of the frame; catch-up and batch share one wire name
    pub fn into_event(self) -> HubEvent {
        match self {
            ServerMessage::StockUpdate(snapshot) => HubEvent::SingleUpdate(snapshot),
            ServerMessage::TopStocksUpdate(list) => HubEvent::BatchUpdate(list),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Client -> server frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    StockUpdate(SnapshotPayload),
    TopStocksUpdate(Vec<SnapshotPayload>),
    GetTopStocks,
}

impl ClientMessage {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| HubError::InvalidPayload(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Untrusted snapshot as received on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub ticker: String,
    pub price: f64,
    #[serde(default)]
    pub signal: Option<SignalType>,
    #[serde(default)]
    pub change_percent: Option<f64>,
}

impl SnapshotPayload {
    /// Check the payload and stamp it; the hub assigns the timestamp
    pub fn validate(self) -> Result<StockSnapshot> {
        let ticker = self.ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            return Err(HubError::InvalidPayload("ticker is empty".to_string()));
        }
        if !(self.price.is_finite() && self.price > 0.0) {
            return Err(HubError::InvalidPayload(format!(
                "price {} for {} must be positive",
                self.price, ticker
            )));
        }

        let change_percent = self.change_percent.unwrap_or(0.0);
        if !change_percent.is_finite() {
            return Err(HubError::InvalidPayload(format!("change_percent for {} is not finite", ticker)));
        }

        Ok(StockSnapshot::new(
            ticker,
            self.price,
            self.signal.unwrap_or_default(),
            change_percent,
        ))
    }
}

impl From<&StockSnapshot> for SnapshotPayload {
    fn from(snapshot: &StockSnapshot) -> Self {
        Self {
            ticker: snapshot.ticker.clone(),
            price: snapshot.price,
            signal: Some(snapshot.signal),
            change_percent: Some(snapshot.change_percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_frame_shape() {
        let snapshot = StockSnapshot::new("AAPL", 190.5, SignalType::Buy, 1.75);
        let json = ServerMessage::from(HubEvent::SingleUpdate(snapshot)).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["event"], "stock_update");
        assert_eq!(value["data"]["ticker"], "AAPL");
        assert_eq!(value["data"]["signal"], "BUY");
    }

    #[test]
    fn test_catch_up_uses_top_stocks_frame() {
        let snapshot = StockSnapshot::new("MSFT", 410.0, SignalType::Neutral, 0.2);
        let message = ServerMessage::from(HubEvent::CatchUp(vec![snapshot]));
        let json = message.to_json().unwrap();
        assert!(json.contains("\"top_stocks_update\""));

        let parsed = ServerMessage::from_json(&json).unwrap();
        assert!(matches!(parsed.into_event(), HubEvent::BatchUpdate(list) if list.len() == 1));
    }

    #[test]
    fn test_client_stock_update_defaults() {
        let message = ClientMessage::from_json(r#"{"event":"stock_update","data":{"ticker":"tsla","price":250.0}}"#).unwrap();
        let ClientMessage::StockUpdate(payload) = message else {
            panic!("expected stock_update");
        };
        let snapshot = payload.validate().unwrap();
        assert_eq!(snapshot.ticker, "TSLA");
        assert_eq!(snapshot.signal, SignalType::Neutral);
        assert_eq!(snapshot.change_percent, 0.0);
    }

    #[test]
    fn test_client_get_top_stocks() {
        let message = ClientMessage::from_json(r#"{"event":"get_top_stocks"}"#).unwrap();
        assert_eq!(message, ClientMessage::GetTopStocks);
    }

    #[test]
    fn test_invalid_payloads_rejected() {
        let empty = SnapshotPayload {
            ticker: "  ".to_string(),
            price: 10.0,
            signal: None,
            change_percent: None,
        };
        assert!(matches!(empty.validate(), Err(HubError::InvalidPayload(_))));

        let negative = SnapshotPayload {
            ticker: "AAPL".to_string(),
            price: -1.0,
            signal: None,
            change_percent: None,
        };
        assert!(negative.validate().is_err());

        assert!(ClientMessage::from_json(r#"{"event":"stock_update","data":{"ticker":"AAPL"}}"#).is_err());
        assert!(ClientMessage::from_json(r#"{"event":"unknown"}"#).is_err());
    }
}
