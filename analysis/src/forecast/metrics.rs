//! Forecast accuracy metrics
//!
//! Computed over the held-out test split only:
//! - MSE / RMSE: squared-error loss and its root
//! - MAE: mean absolute error
//! - R²: share of label variance explained by the predictions
//! - MAPE: mean absolute percentage error, in percent

use crate::error::{AnalysisError, Result};
use crate::types::AccuracyMetrics;

impl AccuracyMetrics {
    /// Compare predictions against the true labels
    pub fn compute(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.is_empty() {
            return Err(AnalysisError::InsufficientData {
                required: 1,
                available: 0,
            });
        }
        if actual.len() != predicted.len() {
            return Err(AnalysisError::ModelError(format!(
                "{} labels but {} predictions",
                actual.len(),
                predicted.len()
            )));
        }

        let n = actual.len() as f64;
        let errors: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();

        let ss_res: f64 = errors.iter().map(|e| e * e).sum();
        let mse = ss_res / n;
        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        let mean = actual.iter().sum::<f64>() / n;
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
        let r2 = if ss_tot == 0.0 {
            // Constant labels: perfect fit or nothing explained
            if ss_res == 0.0 { 1.0 } else { 0.0 }
        } else {
            1.0 - ss_res / ss_tot
        };

        let mape = actual
            .iter()
            .zip(&errors)
            .map(|(a, e)| (e / a).abs())
            .sum::<f64>()
            / n
            * 100.0;

        Ok(Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
            mape,
        })
    }
}
