//! Technical indicators over closing prices (oldest first).
//!
//! Every function returns `None` when the series is too short for the
//! requested period.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width: f64,
    /// Position of the last close inside the bands, in percent
    pub percent_b: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Stochastic {
    pub k_percent: f64,
    pub d_percent: f64,
}

/// Mean of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average seeded with the first value and run over the
/// whole series with multiplier `2 / (period + 1)`.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut iter = values.iter();
    let seed = *iter.next()?;
    Some(iter.fold(seed, |ema, price| price * multiplier + ema * (1.0 - multiplier)))
}

/// RSI from simple averages of the last `period` changes.
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let recent = &changes[changes.len() - period..];

    let avg_gain = recent.iter().filter(|c| **c > 0.0).sum::<f64>() / period as f64;
    let avg_loss = recent.iter().filter(|c| **c < 0.0).map(|c| -c).sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// MACD line, signal line and histogram.
///
/// Needs `slow + signal` closes. The signal line is an EMA over the MACD
/// value of every prefix ending at index `slow` or later.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if values.len() < slow + signal {
        return None;
    }
    let line = ema(values, fast)? - ema(values, slow)?;

    let history: Vec<f64> = (slow..values.len())
        .filter_map(|i| {
            let prefix = &values[..=i];
            Some(ema(prefix, fast)? - ema(prefix, slow)?)
        })
        .collect();
    let signal_line = ema(&history, signal)?;

    Some(Macd {
        macd: line,
        signal: signal_line,
        histogram: line - signal_line,
    })
}

/// Bollinger bands with population standard deviation.
pub fn bollinger(values: &[f64], period: usize, std_devs: f64) -> Option<BollingerBands> {
    let middle = sma(values, period)?;
    let window = &values[values.len() - period..];
    let variance = window.iter().map(|p| (p - middle).powi(2)).sum::<f64>() / period as f64;
    let deviation = variance.sqrt();

    let upper = middle + std_devs * deviation;
    let lower = middle - std_devs * deviation;
    let last = *values.last()?;
    let percent_b = if upper != lower {
        (last - lower) / (upper - lower) * 100.0
    } else {
        50.0
    };

    Some(BollingerBands {
        upper,
        middle,
        lower,
        width: upper - lower,
        percent_b,
    })
}

/// %K for every full window and %D as the SMA of the last `smoothing` %K values.
pub fn stochastic(values: &[f64], period: usize, smoothing: usize) -> Option<Stochastic> {
    if period == 0 || values.len() < period {
        return None;
    }
    let k_values: Vec<f64> = values
        .windows(period)
        .map(|window| {
            let (low, high) = min_max(window);
            let close = window[window.len() - 1];
            if high == low {
                50.0
            } else {
                (close - low) / (high - low) * 100.0
            }
        })
        .collect();

    let d_percent = sma(&k_values, smoothing)?;
    Some(Stochastic {
        k_percent: *k_values.last()?,
        d_percent,
    })
}

/// Williams %R over the last `period` closes (-100 to 0; -50 when flat).
pub fn williams_r(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    let (low, high) = min_max(window);
    let close = *values.last()?;
    if high == low {
        return Some(-50.0);
    }
    Some((high - close) / (high - low) * -100.0)
}

/// Average true range. With closes only, the true range of a bar is the
/// absolute close-to-close move.
pub fn atr(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let ranges: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
    sma(&ranges, period)
}

fn min_max(window: &[f64]) -> (f64, f64) {
    window
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn rising(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_sma() {
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
        assert_eq!(sma(&[1.0], 2), None);
        assert_eq!(sma(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        // multiplier = 0.5: 1 -> 1.5 -> 2.25
        let value = ema(&[1.0, 2.0, 3.0], 3).unwrap();
        assert!(approx(value, 2.25));
        assert_eq!(ema(&[1.0, 2.0], 3), None);
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        assert_eq!(rsi(&rising(15), 14), Some(100.0));
        assert_eq!(rsi(&rising(14), 14), None);
    }

    #[test]
    fn test_rsi_balanced_moves_is_50() {
        let values: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let value = rsi(&values, 14).unwrap();
        assert!(approx(value, 50.0));
    }

    #[test]
    fn test_macd_requires_slow_plus_signal() {
        assert!(macd(&rising(34), 12, 26, 9).is_none());
        let result = macd(&rising(35), 12, 26, 9).unwrap();
        assert!(result.macd > 0.0);
        assert!(approx(result.histogram, result.macd - result.signal));
    }

    #[test]
    fn test_bollinger_flat_series() {
        let bands = bollinger(&[5.0; 20], 20, 2.0).unwrap();
        assert_eq!(bands.upper, 5.0);
        assert_eq!(bands.lower, 5.0);
        assert_eq!(bands.width, 0.0);
        assert_eq!(bands.percent_b, 50.0);
    }

    #[test]
    fn test_bollinger_population_deviation() {
        let mut values = vec![1.0; 10];
        values.extend(vec![3.0; 10]);
        let bands = bollinger(&values, 20, 2.0).unwrap();
        assert!(approx(bands.middle, 2.0));
        assert!(approx(bands.upper, 4.0));
        assert!(approx(bands.lower, 0.0));
        assert!(approx(bands.percent_b, 75.0));
    }

    #[test]
    fn test_stochastic_at_top_of_range() {
        let result = stochastic(&rising(20), 14, 3).unwrap();
        assert!(approx(result.k_percent, 100.0));
        assert!(approx(result.d_percent, 100.0));
    }

    #[test]
    fn test_stochastic_flat_is_neutral() {
        let result = stochastic(&[7.0; 16], 14, 3).unwrap();
        assert_eq!(result.k_percent, 50.0);
    }

    #[test]
    fn test_williams_r() {
        assert_eq!(williams_r(&rising(14), 14), Some(0.0));
        assert_eq!(williams_r(&[3.0; 14], 14), Some(-50.0));
        let falling: Vec<f64> = rising(14).into_iter().rev().collect();
        assert_eq!(williams_r(&falling, 14), Some(-100.0));
    }

    #[test]
    fn test_atr_uses_close_to_close_moves() {
        let values: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 12.0 }).collect();
        assert_eq!(atr(&values, 14), Some(2.0));
        assert_eq!(atr(&values[..14], 14), None);
    }
}
