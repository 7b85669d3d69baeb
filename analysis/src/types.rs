//! Core types for the analysis engine

use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Smallest lookback window accepted by the orchestrator
pub const MIN_LOOKBACK: usize = 10;

/// Largest lookback window accepted by the orchestrator
pub const MAX_LOOKBACK: usize = 120;

/// Daily OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// Session date
    pub date: NaiveDate,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

impl OhlcvBar {
    /// Bar with every price set to `close`, mostly useful for fixtures
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// Ordered, immutable price history for one instrument
///
/// Dates are strictly increasing and every close is a positive finite number.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    /// Build a series, rejecting unordered or duplicate dates and unusable closes
    pub fn new(ticker: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(AnalysisError::InvalidSeries(format!(
                    "dates not strictly increasing at {} -> {}",
                    pair[0].date, pair[1].date
                )));
            }
        }

        if let Some(bad) = bars.iter().find(|b| !(b.close.is_finite() && b.close > 0.0)) {
            return Err(AnalysisError::InvalidSeries(format!(
                "non-positive close {} on {}",
                bad.close, bad.date
            )));
        }

        Ok(Self {
            ticker: ticker.into(),
            bars,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Close prices in chronological order
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|b| b.date).collect()
    }

    pub fn last(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }
}

/// Discrete trading recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Buy,
    Sell,
    #[default]
    Neutral,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Buy => write!(f, "BUY"),
            SignalType::Sell => write!(f, "SELL"),
            SignalType::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

impl FromStr for SignalType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(SignalType::Buy),
            "SELL" => Ok(SignalType::Sell),
            "NEUTRAL" => Ok(SignalType::Neutral),
            other => Err(AnalysisError::InvalidRequest(format!("unknown signal: {}", other))),
        }
    }
}

/// Recent BUY/SELL bar, as shown in the signal log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEntry {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub signal: SignalType,
    /// Close price rounded to cents
    pub price: f64,
}

/// Indicator arrays aligned with the price series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSet {
    /// Fast EMA (20)
    pub ema_fast: Vec<f64>,
    /// Slow EMA (50)
    pub ema_slow: Vec<f64>,
    /// Wilder RSI (14), each value in [0, 100]
    pub rsi: Vec<f64>,
}

/// Out-of-sample accuracy of the forecast model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Mean absolute percentage error, in percent
    pub mape: f64,
}

/// Forecast for the next trading session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextDayPrediction {
    pub date: NaiveDate,
    pub price: f64,
    /// Change relative to the last observed close, in percent
    pub change_percent: f64,
    pub signal: SignalType,
}

/// Signal counts and RSI range over the whole series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalStats {
    pub total_signals: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub min_rsi: f64,
    pub max_rsi: f64,
}

/// One analysis query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub lookback: usize,
}

impl AnalysisRequest {
    pub fn new(ticker: impl Into<String>, start: NaiveDate, end: NaiveDate, lookback: usize) -> Self {
        Self {
            ticker: ticker.into(),
            start,
            end,
            lookback,
        }
    }

    /// Check the boundary contract and normalize the ticker
    pub fn validate(&self) -> Result<Self> {
        let ticker = self.ticker.trim().to_ascii_uppercase();
        if ticker.is_empty() {
            return Err(AnalysisError::InvalidRequest("ticker is empty".to_string()));
        }

        if self.start >= self.end {
            return Err(AnalysisError::InvalidRequest(format!(
                "start date {} must be before end date {}",
                self.start, self.end
            )));
        }

        if !(MIN_LOOKBACK..=MAX_LOOKBACK).contains(&self.lookback) {
            return Err(AnalysisError::InvalidRequest(format!(
                "lookback {} outside {}..={}",
                self.lookback, MIN_LOOKBACK, MAX_LOOKBACK
            )));
        }

        Ok(Self {
            ticker,
            start: self.start,
            end: self.end,
            lookback: self.lookback,
        })
    }
}

/// Everything one analysis run produces
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub ticker: String,
    pub series: PriceSeries,
    pub indicators: IndicatorSet,
    /// Reconstructed model output, same length as the series
    pub predictions: Vec<f64>,
    /// Per-bar signal, same length as the series
    pub signals: Vec<SignalType>,
    pub recent_signals: Vec<SignalEntry>,
    pub accuracy: AccuracyMetrics,
    pub next_day: NextDayPrediction,
    pub stats: SignalStats,
}

/// Round to two decimals (cents / basis of display percentages)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
