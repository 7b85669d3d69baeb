//! # sc-analysis: Indicator, Signal and Forecast Engine
//!
//! Turns a raw daily price series into a structured analysis: technical
//! indicators, per-bar BUY/SELL/NEUTRAL signals, a random-forest forecast of
//! the next session and the accuracy of that forecast on held-out data.
//!
//! ## Core Components
//!
//! - **Indicators**: EMA and Wilder-smoothed RSI over close prices
//! - **Signals**: RSI-threshold and EMA-crossover rules, recent-signal log
//! - **Forecast**: sliding-window random forest, chronological 80/20 split
//! - **AnalysisOrchestrator**: one `(ticker, start, end, lookback)` query in,
//!   one [`AnalysisResult`] or [`AnalysisError`] out
//! - **Sources**: the [`DataSource`] / [`QuoteSource`] contract the engine
//!   needs from a market-data provider
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use sc_analysis::{AnalysisConfig, AnalysisOrchestrator, AnalysisRequest, MemorySource};
//! use chrono::NaiveDate;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), sc_analysis::AnalysisError> {
//! let source = Arc::new(MemorySource::new());
//! let orchestrator = AnalysisOrchestrator::new(source, AnalysisConfig::default());
//!
//! let request = AnalysisRequest::new(
//!     "AAPL",
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
//!     60,
//! );
//! let result = orchestrator.analyze(&request).await?;
//! println!("{} -> {} on {}", result.ticker, result.next_day.signal, result.next_day.date);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod forecast;
pub mod indicators;
pub mod orchestrator;
pub mod signals;
pub mod source;
pub mod types;

// Re-export main types
pub use config::{AnalysisConfig, ForestConfig};
pub use error::{AnalysisError, Result, SourceError};
pub use forecast::{next_trading_day, Forecast, ForecastModel, RandomForestRegressor, SupervisedWindows};
pub use indicators::{ema, rsi, ExponentialMovingAverage};
pub use orchestrator::{analyze_series, AnalysisOrchestrator};
pub use signals::{generate_signals, next_session_signal, recent_signals};
pub use source::{DataSource, MemorySource, Quote, QuoteSource};
pub use types::{
    AccuracyMetrics, AnalysisRequest, AnalysisResult, IndicatorSet, NextDayPrediction, OhlcvBar,
    round2, PriceSeries, SignalEntry, SignalStats, SignalType,
};
