//! Technical indicators over close-price series

/// Default RSI period
pub const RSI_PERIOD: usize = 14;

/// RS value used when the average loss is zero
const RS_SENTINEL: f64 = 100.0;

/// Streaming exponential moving average
///
/// The first update seeds the average with the raw price.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    period: usize,
    alpha: f64,
    ema: Option<f64>,
}

impl ExponentialMovingAverage {
    pub fn new(period: usize) -> Self {
        let alpha = 2.0 / (period as f64 + 1.0);
        Self {
            period,
            alpha,
            ema: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn update(&mut self, price: f64) -> f64 {
        let next = match self.ema {
            None => price,
            Some(prev) => self.alpha * price + (1.0 - self.alpha) * prev,
        };
        self.ema = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.ema
    }
}

/// EMA over the whole series, no warm-up truncation
pub fn ema(prices: &[f64], period: usize) -> Vec<f64> {
    let mut average = ExponentialMovingAverage::new(period);
    prices.iter().map(|&p| average.update(p)).collect()
}

/// Wilder-smoothed RSI
///
/// The first `period` entries carry the seed value computed from the first
/// `period` deltas. Output length always equals input length.
pub fn rsi(prices: &[f64], period: usize) -> Vec<f64> {
    if prices.is_empty() {
        return Vec::new();
    }

    let period = period.max(1);
    let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
    let seed = &deltas[..deltas.len().min(period)];

    let mut avg_gain = seed.iter().filter(|d| **d > 0.0).sum::<f64>() / period as f64;
    let mut avg_loss = -seed.iter().filter(|d| **d < 0.0).sum::<f64>() / period as f64;

    // Seed with no losses at all reads as fully overbought
    let seed_rsi = if avg_loss == 0.0 {
        100.0
    } else {
        rsi_from_averages(avg_gain, avg_loss)
    };

    let mut out = vec![seed_rsi; prices.len().min(period)];
    let decay = (period - 1) as f64;

    for i in period..prices.len() {
        let delta = deltas[i - 1];
        let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };

        avg_gain = (avg_gain * decay + gain) / period as f64;
        avg_loss = (avg_loss * decay + loss) / period as f64;

        out.push(rsi_from_averages(avg_gain, avg_loss));
    }

    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    let rs = if avg_loss == 0.0 { RS_SENTINEL } else { avg_gain / avg_loss };
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_ema_streaming() {
        let mut ema = ExponentialMovingAverage::new(3);
        assert_eq!(ema.value(), None);

        ema.update(10.0);
        assert_eq!(ema.value(), Some(10.0));

        ema.update(20.0);
        ema.update(30.0);
        let value = ema.value().unwrap();
        assert!(value > 10.0 && value < 30.0);
    }

    #[test]
    fn test_ema_recurrence() {
        let values = ema(&[10.0, 20.0, 30.0], 3);
        // alpha = 0.5
        assert_relative_eq!(values[0], 10.0);
        assert_relative_eq!(values[1], 15.0);
        assert_relative_eq!(values[2], 22.5);
    }

    #[test]
    fn test_ema_constant_series() {
        let prices = vec![42.0; 60];
        for v in ema(&prices, 20) {
            assert_relative_eq!(v, 42.0);
        }
    }

    #[test]
    fn test_rsi_seed_is_100_without_losses() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let values = rsi(&prices, RSI_PERIOD);
        for v in &values[..RSI_PERIOD] {
            assert_eq!(*v, 100.0);
        }
        // After the seed the sentinel RS keeps the value just under 100
        assert_relative_eq!(values[RSI_PERIOD], 100.0 - 100.0 / 101.0);
    }

    #[test]
    fn test_rsi_rises_when_gains_dominate() {
        let mut prices = vec![100.0, 102.0, 104.0, 103.0, 105.0, 107.0];
        let mut last = 107.0;
        for i in 0..30 {
            last += if i % 4 == 3 { -1.0 } else { 2.0 };
            prices.push(last);
        }
        let values = rsi(&prices, RSI_PERIOD);

        assert!(values.iter().all(|v| (0.0..=100.0).contains(v)));
        assert!(values[RSI_PERIOD] > 50.0);
        assert!(*values.last().unwrap() > 70.0);
    }

    #[test]
    fn test_rsi_falls_when_losses_dominate() {
        let prices: Vec<f64> = (0..40).map(|i| 200.0 - i as f64 * 1.5 + (i % 3) as f64).collect();
        let values = rsi(&prices, RSI_PERIOD);
        assert!(*values.last().unwrap() < 40.0);
    }

    #[test]
    fn test_rsi_short_series() {
        let values = rsi(&[10.0, 9.0, 11.0], RSI_PERIOD);
        assert_eq!(values.len(), 3);
        assert!(values.windows(2).all(|w| w[0] == w[1]));

        assert!(rsi(&[], RSI_PERIOD).is_empty());
        assert_eq!(rsi(&[5.0], RSI_PERIOD), vec![100.0]);
    }

    proptest! {
        #[test]
        fn prop_rsi_bounded_and_aligned(prices in prop::collection::vec(1.0f64..1000.0, 1..200)) {
            let values = rsi(&prices, RSI_PERIOD);
            prop_assert_eq!(values.len(), prices.len());
            prop_assert_eq!(ema(&prices, 20).len(), prices.len());
            for v in values {
                prop_assert!((0.0..=100.0).contains(&v));
            }
        }

        #[test]
        fn prop_ema_constant(price in 1.0f64..1000.0, len in 1usize..100, period in 1usize..60) {
            for v in ema(&vec![price; len], period) {
                prop_assert!((v - price).abs() < 1e-9);
            }
        }
    }
}
