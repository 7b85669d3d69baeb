use crate::error::{HubError, Result};
use crate::hub::BroadcastHub;
use crate::types::StockSnapshot;
use sc_analysis::{round2, Quote, QuoteSource, SignalType};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

/// Pause between poll cycles
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Intraday move, in percent, beyond which a ticker is flagged
pub const MOVE_THRESHOLD_PERCENT: f64 = 1.5;

/// BUY above the threshold, SELL below its negative
pub fn classify_move(change_percent: f64) -> SignalType {
    if change_percent > MOVE_THRESHOLD_PERCENT {
        SignalType::Buy
    } else if change_percent < -MOVE_THRESHOLD_PERCENT {
        SignalType::Sell
    } else {
        SignalType::Neutral
    }
}

/// Turn a quote for `ticker` into a snapshot, rejecting non-positive prices
///
/// The signal is classified on the exact move; only the stored percentage
/// is rounded.
pub fn snapshot_from_quote(ticker: &str, quote: &Quote) -> Result<StockSnapshot> {
    if !(quote.open.is_finite() && quote.open > 0.0) || !(quote.price.is_finite() && quote.price > 0.0) {
        return Err(HubError::InvalidPayload(format!(
            "quote for {} has open {} and price {}",
            ticker, quote.open, quote.price
        )));
    }

    let change_percent = (quote.price - quote.open) / quote.open * 100.0;
    Ok(StockSnapshot::new(
        ticker,
        quote.price,
        classify_move(change_percent),
        round2(change_percent),
    ))
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub updated: Vec<String>,
    /// Ticker and reason
    pub failed: Vec<(String, String)>,
}

/// Periodic quote poller feeding the hub
pub struct PollingLoop {
    hub: Arc<BroadcastHub>,
    source: Arc<dyn QuoteSource>,
    watchlist: Vec<String>,
    interval: Duration,
    error_backoff: Duration,
}

impl PollingLoop {
    pub fn new(hub: Arc<BroadcastHub>, source: Arc<dyn QuoteSource>, watchlist: Vec<String>) -> Self {
        Self {
            hub,
            source,
            watchlist,
            interval: POLL_INTERVAL,
            error_backoff: POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    /// Poll every watched ticker once and publish the successes as one batch
    ///
    /// Fails with [`HubError::CycleFailed`] only when every ticker failed.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();
        let mut snapshots = Vec::with_capacity(self.watchlist.len());

        for ticker in &self.watchlist {
            let outcome = match self.source.latest_quote(ticker).await {
                Ok(quote) => snapshot_from_quote(ticker, &quote),
                Err(e) => Err(HubError::from(e)),
            };

            match outcome {
                Ok(snapshot) => {
                    debug!(
                        ticker = %ticker,
                        price = snapshot.price,
                        change = snapshot.change_percent,
                        signal = %snapshot.signal,
                        "Polled"
                    );
                    report.updated.push(ticker.clone());
                    snapshots.push(snapshot);
                }
                Err(e) => {
                    warn!(ticker = %ticker, error = %e, "Quote fetch failed, keeping prior snapshot");
                    report.failed.push((ticker.clone(), e.to_string()));
                }
            }
        }

        if !self.watchlist.is_empty() && snapshots.is_empty() {
            return Err(HubError::CycleFailed(report.failed.len()));
        }

        self.hub.update_batch(snapshots);
        Ok(report)
    }

    /// Poll until `stop` flips to true or its sender is dropped
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        info!(
            "Starting polling loop ({} tickers, interval: {:?})",
            self.watchlist.len(),
            self.interval
        );

        loop {
            if *stop.borrow() {
                break;
            }

            let mut pause = self.interval;
            match self.run_cycle().await {
                Ok(report) => {
                    debug!(updated = report.updated.len(), failed = report.failed.len(), "Poll cycle done");
                }
                Err(e) => {
                    error!("Poll cycle failed: {}", e);
                    pause += self.error_backoff;
                }
            }

            tokio::select! {
                _ = sleep(pause) => {}
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Polling loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote(price: f64, open: f64) -> Quote {
        Quote {
            ticker: "AAPL".to_string(),
            price,
            open,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_classify_thresholds() {
        assert_eq!(classify_move(1.51), SignalType::Buy);
        assert_eq!(classify_move(1.5), SignalType::Neutral);
        assert_eq!(classify_move(-1.5), SignalType::Neutral);
        assert_eq!(classify_move(-1.51), SignalType::Sell);
        assert_eq!(classify_move(0.0), SignalType::Neutral);
    }

    #[test]
    fn test_snapshot_from_quote() {
        let snapshot = snapshot_from_quote("AAPL", &quote(102.0, 100.0)).unwrap();
        assert_eq!(snapshot.change_percent, 2.0);
        assert_eq!(snapshot.signal, SignalType::Buy);

        let snapshot = snapshot_from_quote("AAPL", &quote(98.333, 100.0)).unwrap();
        assert_eq!(snapshot.change_percent, -1.67);
        assert_eq!(snapshot.signal, SignalType::Sell);
    }

    #[test]
    fn test_classified_before_rounding() {
        // 1.504% is stored as 1.5 but still clears the threshold
        let snapshot = snapshot_from_quote("AAPL", &quote(101.504, 100.0)).unwrap();
        assert_eq!(snapshot.change_percent, 1.5);
        assert_eq!(snapshot.signal, SignalType::Buy);

        let snapshot = snapshot_from_quote("AAPL", &quote(98.496, 100.0)).unwrap();
        assert_eq!(snapshot.change_percent, -1.5);
        assert_eq!(snapshot.signal, SignalType::Sell);
    }

    #[test]
    fn test_snapshot_keyed_by_watchlist_ticker() {
        let mut q = quote(190.0, 188.0);
        q.ticker = "aapl.o".to_string();
        let snapshot = snapshot_from_quote("AAPL", &q).unwrap();
        assert_eq!(snapshot.ticker, "AAPL");
    }

    #[test]
    fn test_non_positive_quote_rejected() {
        assert!(snapshot_from_quote("AAPL", &quote(100.0, 0.0)).is_err());
        assert!(snapshot_from_quote("AAPL", &quote(-1.0, 100.0)).is_err());
        assert!(snapshot_from_quote("AAPL", &quote(f64::NAN, 100.0)).is_err());
    }
}
