//! Descriptive statistics over numeric samples.
//!
//! Every function is total: empty input, singleton input and zero
//! denominators resolve to `0.0` instead of `NaN` or a panic. Location
//! measures (mean, median, percentiles) of a singleton return the value
//! itself; spread measures (standard deviation, coefficient of variation,
//! Gini index, entropy) return `0.0`.

pub mod diversity;

use serde::{Deserialize, Serialize};

/// Round to a fixed number of decimals.
#[must_use]
pub fn round(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Ratio with a zero-denominator guard.
#[must_use]
pub fn ratio(numer: f64, denom: f64) -> f64 {
    if denom == 0.0 || !numer.is_finite() || !denom.is_finite() {
        0.0
    } else {
        numer / denom
    }
}

/// Arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median (mean of the two central values for even-sized samples).
#[must_use]
pub fn median(values: &[f64]) -> f64 {
    percentile(values, 50.0)
}

/// Population standard deviation.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    finite(variance.sqrt())
}

/// Standard deviation relative to the mean; `0.0` when the mean is zero.
#[must_use]
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let avg = mean(values);
    if avg == 0.0 {
        return 0.0;
    }
    finite(std_dev(values) / avg)
}

/// Percentile `p` in `[0, 100]`.
///
/// Linear interpolation between closest ranks: the rank is
/// `p / 100 * (n - 1)` over the ascending sample, and the result
/// interpolates between the values at `floor(rank)` and `ceil(rank)`.
#[must_use]
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sorted = sorted(values);
    let p = if p.is_finite() { p.clamp(0.0, 100.0) } else { 0.0 };
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    finite(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Gini index of a non-negative sample.
///
/// Relative mean absolute difference `Σ|xi - xj| / (2 n² μ)`, normalized by
/// `n / (n - 1)` so a sample where one element holds everything scores `1.0`.
#[must_use]
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let sorted = sorted(values);
    let total: f64 = sorted.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| (2.0 * (i as f64 + 1.0) - n as f64 - 1.0) * v)
        .sum();
    finite(weighted / ((n as f64 - 1.0) * total)).clamp(0.0, 1.0)
}

/// Shannon entropy (bits) of a frequency distribution.
#[must_use]
pub fn entropy(frequencies: &[f64]) -> f64 {
    let total: f64 = frequencies.iter().filter(|f| **f > 0.0).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let h: f64 = frequencies
        .iter()
        .filter(|f| **f > 0.0)
        .map(|f| {
            let p = f / total;
            -p * p.log2()
        })
        .sum();
    finite(h).max(0.0)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().map(finite).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Summary of one numeric distribution, as embedded in dimension cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub coefficient_of_variation: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub gini: f64,
}

impl Summary {
    /// Summarize a sample.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let sorted = sorted(values);
        Self {
            count: values.len(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: round(mean(values), 4),
            median: round(median(values), 4),
            std_dev: round(std_dev(values), 4),
            coefficient_of_variation: round(coefficient_of_variation(values), 4),
            p25: round(percentile(values, 25.0), 4),
            p75: round(percentile(values, 75.0), 4),
            p90: round(percentile(values, 90.0), 4),
            p95: round(percentile(values, 95.0), 4),
            gini: round(gini(values), 4),
        }
    }
}
