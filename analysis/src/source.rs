//! Market data source contract
//!
//! The engine never talks to a vendor directly. Anything that can answer
//! `(ticker, start, end) -> ordered bars` implements [`DataSource`]; anything
//! that can report the current session's price and open implements
//! [`QuoteSource`]. An empty history is the "no data" answer, not an error.

use crate::error::SourceError;
use crate::types::OhlcvBar;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// Intraday quote for the current session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: String,
    /// Latest traded price
    pub price: f64,
    /// Session open
    pub open: f64,
    pub timestamp: DateTime<Utc>,
}

/// Historical daily bars
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Bars with `start <= date < end`, oldest first
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SourceError>;
}

/// Current-session quotes
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn latest_quote(&self, ticker: &str) -> Result<Quote, SourceError>;
}

/// Scripted in-memory source
///
/// Quotes are queued per ticker; each call consumes the front entry until a
/// single one remains, which then repeats.
#[derive(Debug, Default)]
pub struct MemorySource {
    history: Mutex<HashMap<String, Result<Vec<OhlcvBar>, SourceError>>>,
    quotes: Mutex<HashMap<String, VecDeque<Result<Quote, SourceError>>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_history(&self, ticker: &str, bars: Vec<OhlcvBar>) {
        self.history.lock().insert(ticker.to_string(), Ok(bars));
    }

    pub fn fail_history(&self, ticker: &str, error: SourceError) {
        self.history.lock().insert(ticker.to_string(), Err(error));
    }

    pub fn push_quote(&self, ticker: &str, quote: Result<Quote, SourceError>) {
        self.quotes
            .lock()
            .entry(ticker.to_string())
            .or_default()
            .push_back(quote);
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SourceError> {
        match self.history.lock().get(ticker) {
            Some(Ok(bars)) => Ok(bars
                .iter()
                .filter(|b| b.date >= start && b.date < end)
                .copied()
                .collect()),
            Some(Err(e)) => Err(e.clone()),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl QuoteSource for MemorySource {
    async fn latest_quote(&self, ticker: &str) -> Result<Quote, SourceError> {
        let mut quotes = self.quotes.lock();
        let queue = quotes
            .get_mut(ticker)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| SourceError::UnknownTicker(ticker.to_string()))?;

        if queue.len() > 1 {
            queue
                .pop_front()
                .ok_or_else(|| SourceError::UnknownTicker(ticker.to_string()))?
        } else {
            queue
                .front()
                .cloned()
                .ok_or_else(|| SourceError::UnknownTicker(ticker.to_string()))?
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: f64) -> Quote {
        Quote {
            ticker: "X".to_string(),
            price,
            open: 100.0,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_history_range_is_half_open() {
        let source = MemorySource::new();
        let d = |day| NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        source.set_history("X", vec![OhlcvBar::flat(d(1), 1.0), OhlcvBar::flat(d(2), 2.0), OhlcvBar::flat(d(3), 3.0)]);

        let bars = source.fetch_history("X", d(2), d(3)).await.unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 2.0);

        assert!(source.fetch_history("NONE", d(1), d(3)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quote_script_repeats_last() {
        let source = MemorySource::new();
        source.push_quote("X", Err(SourceError::Transport("down".to_string())));
        source.push_quote("X", Ok(quote(101.0)));

        assert!(source.latest_quote("X").await.is_err());
        assert_eq!(source.latest_quote("X").await.unwrap().price, 101.0);
        assert_eq!(source.latest_quote("X").await.unwrap().price, 101.0);
        assert!(matches!(source.latest_quote("Y").await, Err(SourceError::UnknownTicker(_))));
    }
}
