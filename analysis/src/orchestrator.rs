//! Analysis orchestrator
//!
//! Composes indicators, signals and the forecast model into one request /
//! response unit. The orchestrator holds no shared mutable state: concurrent
//! calls are independent, and nothing is retried here.

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, Result};
use crate::forecast::{change_percent, next_trading_day, ForecastModel};
use crate::indicators::{ema, rsi};
use crate::signals::{generate_signals, next_session_signal, recent_signals};
use crate::source::DataSource;
use crate::types::{
    round2, AnalysisRequest, AnalysisResult, IndicatorSet, NextDayPrediction, PriceSeries, SignalStats,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Public entry point of the engine
pub struct AnalysisOrchestrator {
    source: Arc<dyn DataSource>,
    config: AnalysisConfig,
}

impl AnalysisOrchestrator {
    pub fn new(source: Arc<dyn DataSource>, config: AnalysisConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Fetch the requested range and analyze it
    ///
    /// Every failure comes back as an [`AnalysisError`]; model fitting runs on
    /// the blocking pool.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult> {
        let request = request.validate()?;

        let bars = self
            .source
            .fetch_history(&request.ticker, request.start, request.end)
            .await
            .map_err(|e| {
                warn!(ticker = %request.ticker, error = %e, "History fetch failed");
                AnalysisError::from(e)
            })?;

        if bars.is_empty() {
            return Err(AnalysisError::NoData {
                ticker: request.ticker,
            });
        }

        let series = PriceSeries::new(request.ticker.clone(), bars)?;
        let config = self.config.clone();
        let lookback = request.lookback;

        let result = tokio::task::spawn_blocking(move || analyze_series(series, lookback, &config))
            .await
            .map_err(|e| AnalysisError::ModelError(format!("analysis task failed: {}", e)))??;

        info!(
            ticker = %result.ticker,
            bars = result.series.len(),
            rmse = result.accuracy.rmse,
            next_price = result.next_day.price,
            signal = %result.next_day.signal,
            "Analysis complete"
        );

        Ok(result)
    }
}

/// Run the whole engine over an already fetched series
pub fn analyze_series(series: PriceSeries, lookback: usize, config: &AnalysisConfig) -> Result<AnalysisResult> {
    if series.is_empty() {
        return Err(AnalysisError::NoData {
            ticker: series.ticker().to_string(),
        });
    }
    if series.len() < lookback {
        return Err(AnalysisError::InsufficientData {
            required: lookback,
            available: series.len(),
        });
    }

    let prices = series.closes();

    let indicators = IndicatorSet {
        ema_fast: ema(&prices, config.ema_fast_period),
        ema_slow: ema(&prices, config.ema_slow_period),
        rsi: rsi(&prices, config.rsi_period),
    };

    let signals = generate_signals(&prices, &indicators.ema_fast, &indicators.rsi);
    let recent = recent_signals(&series, &signals, config.recent_signal_window);
    let stats = SignalStats::compute(&signals, &indicators.rsi);

    let model = ForecastModel::new(lookback, config.train_fraction, config.forest.clone());
    let forecast = model.run(&prices)?;

    let last = series
        .last()
        .ok_or_else(|| AnalysisError::NoData { ticker: series.ticker().to_string() })?;
    let last_ema = indicators.ema_fast.last().copied().unwrap_or(last.close);

    let next_day = NextDayPrediction {
        date: next_trading_day(last.date),
        price: round2(forecast.next_price),
        change_percent: round2(change_percent(forecast.next_price, last.close)),
        signal: next_session_signal(forecast.next_price, last.close, last_ema),
    };

    Ok(AnalysisResult {
        ticker: series.ticker().to_string(),
        series,
        indicators,
        predictions: forecast.predictions,
        signals,
        recent_signals: recent,
        accuracy: forecast.accuracy,
        next_day,
        stats,
    })
}
