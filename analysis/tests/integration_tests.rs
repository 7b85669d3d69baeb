//! Integration tests for the analysis engine
//!
//! These drive the orchestrator end to end against an in-memory source.

use chrono::{Duration, NaiveDate};
use sc_analysis::{
    AnalysisConfig, AnalysisError, AnalysisOrchestrator, AnalysisRequest, ForestConfig, MemorySource,
    OhlcvBar, SignalType, SourceError,
};
use std::sync::Arc;
use tokio_test::assert_ok;

fn test_config() -> AnalysisConfig {
    AnalysisConfig {
        forest: ForestConfig {
            n_trees: 15,
            ..ForestConfig::default()
        },
        ..AnalysisConfig::default()
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// Weekday bars starting Monday 2024-01-01
fn trading_bars(n: usize) -> Vec<OhlcvBar> {
    let mut bars = Vec::with_capacity(n);
    let mut day = date(2024, 1, 1);
    let mut i = 0;
    while bars.len() < n {
        if chrono::Datelike::weekday(&day).number_from_monday() <= 5 {
            let close = 150.0 + (i as f64 * 0.25).sin() * 8.0 + i as f64 * 0.2;
            bars.push(OhlcvBar {
                date: day,
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0,
            });
            i += 1;
        }
        day += Duration::days(1);
    }
    bars
}

fn orchestrator_with(bars: Vec<OhlcvBar>) -> AnalysisOrchestrator {
    let source = Arc::new(MemorySource::new());
    source.set_history("AAPL", bars);
    AnalysisOrchestrator::new(source, test_config())
}

#[tokio::test]
async fn test_full_analysis() {
    let bars = trading_bars(120);
    let last_date = bars.last().unwrap().date;
    let orchestrator = orchestrator_with(bars);

    let request = AnalysisRequest::new("aapl", date(2024, 1, 1), date(2025, 1, 1), 30);
    let result = assert_ok!(orchestrator.analyze(&request).await);

    assert_eq!(result.ticker, "AAPL");
    assert_eq!(result.series.len(), 120);
    assert_eq!(result.predictions.len(), 120);
    assert!(result.accuracy.rmse.is_finite());
    assert!(result.accuracy.mape >= 0.0);
    assert!(result.next_day.date > last_date);
    assert!(matches!(
        result.next_day.signal,
        SignalType::Buy | SignalType::Sell | SignalType::Neutral
    ));

    // Serializes for the presentation layer
    let json = serde_json::to_value(&result).unwrap();
    assert!(json["next_day"]["signal"].is_string());
}

#[tokio::test]
async fn test_friday_rolls_to_monday() {
    let mut bars = trading_bars(80);
    while chrono::Datelike::weekday(&bars.last().unwrap().date) != chrono::Weekday::Fri {
        bars.pop();
    }
    let orchestrator = orchestrator_with(bars);

    let request = AnalysisRequest::new("AAPL", date(2024, 1, 1), date(2025, 1, 1), 20);
    let result = orchestrator.analyze(&request).await.unwrap();
    assert_eq!(chrono::Datelike::weekday(&result.next_day.date), chrono::Weekday::Mon);
}

#[tokio::test]
async fn test_no_data() {
    let orchestrator = orchestrator_with(trading_bars(50));
    let request = AnalysisRequest::new("MSFT", date(2024, 1, 1), date(2025, 1, 1), 20);

    let err = orchestrator.analyze(&request).await.unwrap_err();
    assert!(matches!(err, AnalysisError::NoData { ref ticker } if ticker == "MSFT"));
}

#[tokio::test]
async fn test_insufficient_data() {
    let orchestrator = orchestrator_with(trading_bars(25));
    let request = AnalysisRequest::new("AAPL", date(2024, 1, 1), date(2025, 1, 1), 60);

    let err = orchestrator.analyze(&request).await.unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { required: 60, available: 25 }));
}

#[tokio::test]
async fn test_upstream_failure_is_wrapped() {
    let source = Arc::new(MemorySource::new());
    source.fail_history("AAPL", SourceError::Transport("connection reset".to_string()));
    let orchestrator = AnalysisOrchestrator::new(source, test_config());

    let request = AnalysisRequest::new("AAPL", date(2024, 1, 1), date(2025, 1, 1), 20);
    let err = orchestrator.analyze(&request).await.unwrap_err();
    assert!(matches!(err, AnalysisError::UpstreamFetch(SourceError::Transport(_))));
    assert!(err.to_string().contains("connection reset"));
}

#[tokio::test]
async fn test_invalid_request() {
    let orchestrator = orchestrator_with(trading_bars(50));
    let request = AnalysisRequest::new("AAPL", date(2024, 6, 1), date(2024, 1, 1), 20);

    let err = orchestrator.analyze(&request).await.unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_concurrent_queries_are_independent() {
    let orchestrator = Arc::new(orchestrator_with(trading_bars(90)));
    let request = AnalysisRequest::new("AAPL", date(2024, 1, 1), date(2025, 1, 1), 20);

    let (a, b) = tokio::join!(orchestrator.analyze(&request), orchestrator.analyze(&request));
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(a.next_day, b.next_day);
    assert_eq!(a.predictions, b.predictions);
}
