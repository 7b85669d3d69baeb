//! Short-horizon price forecasting
//!
//! Prices are turned into supervised examples (the `lookback` prices before a
//! bar predict that bar), split chronologically into train and test, and fit
//! with a [`RandomForestRegressor`]. Accuracy is measured on the test split
//! only; the next session is predicted from the last `lookback` prices.

pub mod forest;
pub mod metrics;

pub use forest::{RandomForestRegressor, RegressionTree};

use crate::config::ForestConfig;
use crate::error::{AnalysisError, Result};
use crate::types::AccuracyMetrics;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Sliding-window examples built from a price series
#[derive(Debug, Clone)]
pub struct SupervisedWindows {
    /// `features[k]` holds `prices[label_index[k] - lookback .. label_index[k]]`
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
    /// Index in the price series of each label
    pub label_index: Vec<usize>,
    pub lookback: usize,
}

impl SupervisedWindows {
    pub fn build(prices: &[f64], lookback: usize) -> Self {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        let mut label_index = Vec::new();

        for i in lookback..prices.len() {
            features.push(prices[i - lookback..i].to_vec());
            labels.push(prices[i]);
            label_index.push(i);
        }

        Self {
            features,
            labels,
            label_index,
            lookback,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of leading examples used for training
    ///
    /// Never shuffled; at least one example is left on each side.
    pub fn train_size(&self, train_fraction: f64) -> usize {
        let n = self.len();
        let size = (n as f64 * train_fraction).floor() as usize;
        size.clamp(1, n.saturating_sub(1).max(1))
    }
}

/// Output of one forecasting run
#[derive(Debug, Clone)]
pub struct Forecast {
    /// Raw prices, then training labels, then out-of-sample predictions
    pub predictions: Vec<f64>,
    pub accuracy: AccuracyMetrics,
    /// Unrounded next-session price
    pub next_price: f64,
    pub train_size: usize,
    pub test_size: usize,
}

/// Random-forest forecaster over close prices
#[derive(Debug, Clone)]
pub struct ForecastModel {
    lookback: usize,
    train_fraction: f64,
    forest: ForestConfig,
}

impl ForecastModel {
    pub fn new(lookback: usize, train_fraction: f64, forest: ForestConfig) -> Self {
        Self {
            lookback,
            train_fraction,
            forest,
        }
    }

    /// Smallest series this model can fit and evaluate
    pub fn min_series_len(&self) -> usize {
        self.lookback + 2
    }

    /// Fit on `prices`, score the test split and predict the next session
    pub fn run(&self, prices: &[f64]) -> Result<Forecast> {
        if self.lookback == 0 {
            return Err(AnalysisError::InvalidRequest("lookback must be positive".to_string()));
        }
        if prices.len() < self.min_series_len() {
            return Err(AnalysisError::InsufficientData {
                required: self.min_series_len(),
                available: prices.len(),
            });
        }

        let windows = SupervisedWindows::build(prices, self.lookback);
        let train_size = windows.train_size(self.train_fraction);
        let (train_x, test_x) = windows.features.split_at(train_size);
        let (train_y, test_y) = windows.labels.split_at(train_size);

        let mut model = RandomForestRegressor::new(self.forest.clone());
        model.fit(train_x, train_y)?;

        let test_predictions = model.predict(test_x)?;
        let accuracy = AccuracyMetrics::compute(test_y, &test_predictions)?;

        let mut predictions = prices.to_vec();
        let train_end = self.lookback + train_size;
        predictions[self.lookback..train_end].copy_from_slice(train_y);
        predictions[train_end..].copy_from_slice(&test_predictions);

        let next_price = model.predict_one(&prices[prices.len() - self.lookback..])?;

        Ok(Forecast {
            predictions,
            accuracy,
            next_price,
            train_size,
            test_size: test_y.len(),
        })
    }
}

/// Next trading session after `last`: the following day, or Monday if that is a weekend
pub fn next_trading_day(last: NaiveDate) -> NaiveDate {
    let next = last + Duration::days(1);
    match next.weekday() {
        Weekday::Sat => next + Duration::days(2),
        Weekday::Sun => next + Duration::days(1),
        _ => next,
    }
}

/// Percentage change from `last_close` to `predicted`
pub fn change_percent(predicted: f64, last_close: f64) -> f64 {
    (predicted - last_close) / last_close * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wave(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5 + (i as f64 * 0.7).sin() * 3.0).collect()
    }

    fn small_forest() -> ForestConfig {
        ForestConfig {
            n_trees: 10,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_windows_alignment() {
        let prices: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let windows = SupervisedWindows::build(&prices, 3);

        assert_eq!(windows.len(), 5);
        assert_eq!(windows.features[0], vec![0.0, 1.0, 2.0]);
        assert_eq!(windows.labels[0], 3.0);
        assert_eq!(windows.label_index, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_split_has_no_lookahead() {
        let prices = wave(60);
        let windows = SupervisedWindows::build(&prices, 10);
        let train_size = windows.train_size(0.8);
        assert_eq!(train_size, 40);

        let boundary = windows.label_index[train_size];
        for k in 0..train_size {
            // Every training feature and label sits before the first test label
            assert!(windows.label_index[k] < boundary);
            assert!(windows.label_index[k] - windows.lookback < boundary);
        }
        for k in train_size..windows.len() {
            // Test features never include their own label
            assert!(windows.label_index[k] >= boundary);
            assert_eq!(windows.features[k].len(), windows.lookback);
            assert_eq!(windows.features[k].last(), Some(&prices[windows.label_index[k] - 1]));
        }
    }

    #[test]
    fn test_train_size_leaves_a_test_example() {
        let windows = SupervisedWindows::build(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows.train_size(0.8), 1);
    }

    #[test]
    fn test_reconstruction_alignment() {
        let prices = wave(60);
        let model = ForecastModel::new(10, 0.8, small_forest());
        let forecast = model.run(&prices).unwrap();

        assert_eq!(forecast.predictions.len(), prices.len());
        assert_eq!(forecast.train_size, 40);
        assert_eq!(forecast.test_size, 10);
        // Leading span and training span echo the raw prices
        assert_eq!(&forecast.predictions[..50], &prices[..50]);
        assert!(forecast.accuracy.rmse >= 0.0);
        assert_relative_eq!(forecast.accuracy.rmse, forecast.accuracy.mse.sqrt());
        assert!(forecast.next_price.is_finite());
    }

    #[test]
    fn test_run_is_deterministic() {
        let prices = wave(50);
        let model = ForecastModel::new(10, 0.8, small_forest());
        let a = model.run(&prices).unwrap();
        let b = model.run(&prices).unwrap();
        assert_eq!(a.next_price, b.next_price);
        assert_eq!(a.predictions, b.predictions);
    }

    #[test]
    fn test_run_rejects_short_series() {
        let model = ForecastModel::new(10, 0.8, small_forest());
        let err = model.run(&wave(11)).unwrap_err();
        assert!(matches!(err, AnalysisError::InsufficientData { required: 12, available: 11 }));
    }

    #[test]
    fn test_next_trading_day() {
        let friday = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
        let saturday = NaiveDate::from_ymd_opt(2024, 6, 8).unwrap();
        let monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 6, 11).unwrap();

        assert_eq!(next_trading_day(friday), monday);
        assert_eq!(next_trading_day(saturday), monday);
        assert_eq!(next_trading_day(monday), tuesday);
    }

    #[test]
    fn test_change_percent() {
        assert_relative_eq!(change_percent(110.0, 100.0), 10.0);
        assert_relative_eq!(change_percent(95.0, 100.0), -5.0);
    }
}
