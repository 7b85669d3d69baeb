//! HTTP chart API client
//!
//! Speaks the `/v8/finance/chart/{ticker}` JSON shape: parallel arrays of
//! timestamps and OHLCV values, any of which may be null.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::{Client, StatusCode};
use sc_analysis::{DataSource, OhlcvBar, Quote, QuoteSource, SourceError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

impl QuoteColumns {
    fn at(column: &[Option<f64>], i: usize) -> Option<f64> {
        column.get(i).copied().flatten()
    }
}

fn first_result(body: &str, ticker: &str) -> Result<ChartResult, SourceError> {
    let envelope: ChartEnvelope =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    if let Some(error) = envelope.chart.error {
        return Err(if error.code.eq_ignore_ascii_case("not found") {
            SourceError::UnknownTicker(ticker.to_string())
        } else {
            SourceError::Malformed(format!("{}: {}", error.code, error.description))
        });
    }

    envelope
        .chart
        .result
        .and_then(|mut results| results.pop())
        .ok_or_else(|| SourceError::Malformed(format!("empty chart result for {}", ticker)))
}

/// Daily bars from a chart response, one per date, oldest first
///
/// Rows with a missing close are skipped; a repeated date keeps the last row.
fn parse_daily_bars(body: &str, ticker: &str) -> Result<Vec<OhlcvBar>, SourceError> {
    let result = first_result(body, ticker)?;
    let columns = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut by_date = BTreeMap::new();
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(close) = QuoteColumns::at(&columns.close, i) else {
            continue;
        };
        let date = DateTime::<Utc>::from_timestamp(*ts, 0)
            .ok_or_else(|| SourceError::Malformed(format!("bad timestamp {}", ts)))?
            .date_naive();

        by_date.insert(
            date,
            OhlcvBar {
                date,
                open: QuoteColumns::at(&columns.open, i).unwrap_or(close),
                high: QuoteColumns::at(&columns.high, i).unwrap_or(close),
                low: QuoteColumns::at(&columns.low, i).unwrap_or(close),
                close,
                volume: QuoteColumns::at(&columns.volume, i).unwrap_or(0.0),
            },
        );
    }

    Ok(by_date.into_values().collect())
}

/// Session quote: first open and last close of the intraday series
fn parse_quote(body: &str, ticker: &str) -> Result<Quote, SourceError> {
    let result = first_result(body, ticker)?;
    let columns = result.indicators.quote.into_iter().next().unwrap_or_default();

    let open = columns.open.iter().flatten().copied().next();
    let price = columns.close.iter().rev().flatten().copied().next();
    let timestamp = result
        .timestamp
        .last()
        .and_then(|ts| DateTime::<Utc>::from_timestamp(*ts, 0))
        .unwrap_or_else(Utc::now);

    match (open, price) {
        (Some(open), Some(price)) => Ok(Quote {
            ticker: ticker.to_string(),
            price,
            open,
            timestamp,
        }),
        _ => Err(SourceError::Malformed(format!("no intraday prices for {}", ticker))),
    }
}

/// Chart API backed market data
pub struct ChartSource {
    client: Client,
    base_url: String,
}

impl ChartSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("signalcast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_chart(&self, ticker: &str, query: &[(&str, String)]) -> Result<String, SourceError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(SourceError::UnknownTicker(ticker.to_string())),
            status if !status.is_success() => {
                return Err(SourceError::Transport(format!("HTTP {} for {}", status, ticker)))
            }
            _ => {}
        }

        response
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))
    }
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

#[async_trait]
impl DataSource for ChartSource {
    async fn fetch_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SourceError> {
        let query = [
            ("period1", unix_midnight(start).to_string()),
            ("period2", unix_midnight(end).to_string()),
            ("interval", "1d".to_string()),
        ];
        let body = self.get_chart(ticker, &query).await?;

        let mut bars = parse_daily_bars(&body, ticker)?;
        bars.retain(|bar| bar.date >= start && bar.date < end);
        Ok(bars)
    }
}

#[async_trait]
impl QuoteSource for ChartSource {
    async fn latest_quote(&self, ticker: &str) -> Result<Quote, SourceError> {
        let query = [("range", "1d".to_string()), ("interval", "1m".to_string())];
        let body = self.get_chart(ticker, &query).await?;
        parse_quote(&body, ticker)
    }
}
