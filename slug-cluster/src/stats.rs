//! Order statistics across the trial axis
//!
//! Stacked quantities are laid out trials × time steps; every function here
//! reduces over the trial axis (axis 0) independently for each time step.

use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Median of a set of samples
///
/// Even counts average the two middle values. An empty set or any NaN sample
/// gives NaN.
pub fn median(values: ArrayView1<'_, f64>) -> f64 {
    let sorted = match sorted_samples(values) {
        Some(sorted) => sorted,
        None => return f64::NAN,
    };

    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Percentile of a set of samples, `q` in `[0, 100]`
///
/// Linearly interpolates between the two closest ranks. An empty set or any
/// NaN sample gives NaN.
pub fn percentile(values: ArrayView1<'_, f64>, q: f64) -> f64 {
    let sorted = match sorted_samples(values) {
        Some(sorted) => sorted,
        None => return f64::NAN,
    };

    let q = q.clamp(0.0, 100.0);
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let t = rank - lower as f64;

    sorted[lower] + t * (sorted[upper] - sorted[lower])
}

fn sorted_samples(values: ArrayView1<'_, f64>) -> Option<Vec<f64>> {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted)
}

/// Per-column median of a trials × time matrix
pub fn median_axis0(stacked: &Array2<f64>) -> Array1<f64> {
    stacked.map_axis(Axis(0), median)
}

/// Per-column percentile of a trials × time matrix
pub fn percentile_axis0(stacked: &Array2<f64>, q: f64) -> Array1<f64> {
    stacked.map_axis(Axis(0), |column| percentile(column, q))
}
