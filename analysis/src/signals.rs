//! Signal generation from price, EMA and RSI state

use crate::types::{round2, PriceSeries, SignalEntry, SignalStats, SignalType};

/// RSI below this reads as oversold
pub const RSI_BUY_THRESHOLD: f64 = 40.0;

/// RSI above this reads as overbought
pub const RSI_SELL_THRESHOLD: f64 = 60.0;

/// Number of trailing bars scanned for the recent-signal log
pub const RECENT_SIGNAL_WINDOW: usize = 20;

/// Per-bar signals
///
/// Bar 0 has no predecessor and is always neutral. The BUY test runs before
/// the SELL test, so a bar matching both is a BUY.
pub fn generate_signals(prices: &[f64], ema_fast: &[f64], rsi: &[f64]) -> Vec<SignalType> {
    let len = prices.len().min(ema_fast.len()).min(rsi.len());
    let mut signals = vec![SignalType::Neutral; prices.len()];

    for i in 1..len {
        signals[i] = classify_bar(
            prices[i - 1],
            prices[i],
            ema_fast[i - 1],
            ema_fast[i],
            rsi[i],
        );
    }

    signals
}

fn classify_bar(prev_price: f64, price: f64, prev_ema: f64, ema: f64, rsi: f64) -> SignalType {
    let crossed_up = price > ema && prev_price <= prev_ema;
    let crossed_down = price < ema && prev_price >= prev_ema;

    if rsi < RSI_BUY_THRESHOLD || crossed_up {
        SignalType::Buy
    } else if rsi > RSI_SELL_THRESHOLD || crossed_down {
        SignalType::Sell
    } else {
        SignalType::Neutral
    }
}

/// BUY/SELL bars among the last `window` bars, oldest first
pub fn recent_signals(series: &PriceSeries, signals: &[SignalType], window: usize) -> Vec<SignalEntry> {
    let len = series.len().min(signals.len());
    let start = len.saturating_sub(window);

    series.bars()[start..len]
        .iter()
        .zip(&signals[start..len])
        .filter(|(_, signal)| **signal != SignalType::Neutral)
        .map(|(bar, signal)| SignalEntry {
            date: bar.date,
            signal: *signal,
            price: round2(bar.close),
        })
        .collect()
}

/// Crossover rule applied to the forecast price for the next session
pub fn next_session_signal(forecast: f64, last_price: f64, last_ema: f64) -> SignalType {
    if forecast > last_ema && last_price <= last_ema {
        SignalType::Buy
    } else if forecast < last_ema && last_price >= last_ema {
        SignalType::Sell
    } else {
        SignalType::Neutral
    }
}

impl SignalStats {
    /// Summarize a signal array and the RSI range it came from
    pub fn compute(signals: &[SignalType], rsi: &[f64]) -> Self {
        let buy_signals = signals.iter().filter(|s| **s == SignalType::Buy).count();
        let sell_signals = signals.iter().filter(|s| **s == SignalType::Sell).count();

        let (min_rsi, max_rsi) = if rsi.is_empty() {
            (0.0, 0.0)
        } else {
            rsi.iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
        };

        Self {
            total_signals: buy_signals + sell_signals,
            buy_signals,
            sell_signals,
            min_rsi,
            max_rsi,
        }
    }
}
