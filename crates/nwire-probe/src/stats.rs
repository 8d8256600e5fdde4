//! Trimmed error statistics.

use serde::{Deserialize, Serialize};

/// Mean, standard deviation and maximum over the kept samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    pub mean: f64,
    pub stdev: f64,
    pub max: f64,
    /// Samples kept after trimming.
    pub count: usize,
}

/// Mean and population standard deviation; `(0, 0)` for no values.
pub fn mean_stdev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// How many of `n` sorted samples a confidence level keeps.
pub fn trimmed_count(n: usize, confidence: f64) -> usize {
    if n == 0 {
        return 0;
    }
    let level = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        1.0
    };
    ((n as f64 * level).round() as usize).clamp(1, n)
}

/// Statistics over the smallest `confidence` fraction of non-negative errors.
pub fn trimmed_stats(errors: &[f64], confidence: f64) -> ErrorStats {
    let mut sorted = errors.to_vec();
    sorted.sort_by(f64::total_cmp);
    let kept = &sorted[..trimmed_count(sorted.len(), confidence)];
    let (mean, stdev) = mean_stdev(kept);
    ErrorStats {
        mean,
        stdev,
        max: kept.last().copied().unwrap_or(0.0),
        count: kept.len(),
    }
}

/// Like [`trimmed_stats`] for signed errors: trimming is by magnitude, the
/// mean and stdev are of the signed values, `max` is the largest magnitude.
pub fn trimmed_signed_stats(errors: &[f64], confidence: f64) -> ErrorStats {
    let mut sorted = errors.to_vec();
    sorted.sort_by(|a, b| a.abs().total_cmp(&b.abs()));
    let kept = &sorted[..trimmed_count(sorted.len(), confidence)];
    let (mean, stdev) = mean_stdev(kept);
    ErrorStats {
        mean,
        stdev,
        max: kept.last().map_or(0.0, |v| v.abs()),
        count: kept.len(),
    }
}
