//! Numerical integration of sampled data
//!
//! Both rules operate on tabulated `(x, y)` pairs with arbitrary (ascending)
//! spacing, which is what wavelength grids of synthesized spectra look like.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during sampled integration
#[derive(Debug, Error, PartialEq)]
pub enum QuadratureError {
    #[error("Sample arrays differ in length: {y_len} values for {x_len} abscissae")]
    MismatchedLengths { y_len: usize, x_len: usize },
}

/// Integration rule applied to sampled spectra
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum IntegrationRule {
    /// Composite trapezoidal rule
    #[default]
    Trapezoid,
    /// Composite Simpson's rule for irregular spacing
    Simpson,
}

impl IntegrationRule {
    /// Integrate `y` sampled at `x`
    ///
    /// Fewer than two samples integrate to zero.
    pub fn integrate(&self, y: &[f64], x: &[f64]) -> Result<f64, QuadratureError> {
        match self {
            IntegrationRule::Trapezoid => trapezoid(y, x),
            IntegrationRule::Simpson => simpson(y, x),
        }
    }
}

impl std::fmt::Display for IntegrationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrationRule::Trapezoid => write!(f, "trapezoid"),
            IntegrationRule::Simpson => write!(f, "simpson"),
        }
    }
}

fn check_lengths(y: &[f64], x: &[f64]) -> Result<(), QuadratureError> {
    if y.len() != x.len() {
        return Err(QuadratureError::MismatchedLengths {
            y_len: y.len(),
            x_len: x.len(),
        });
    }
    Ok(())
}

/// Composite trapezoidal rule over tabulated samples
///
/// ∫[x₁,x₂] f(x)dx ≈ (x₂-x₁) × (f(x₁)+f(x₂))/2, summed over every interval.
pub fn trapezoid(y: &[f64], x: &[f64]) -> Result<f64, QuadratureError> {
    check_lengths(y, x)?;

    let integral = x
        .windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum();

    Ok(integral)
}

/// Composite Simpson's rule over tabulated samples with irregular spacing
///
/// Consecutive interval pairs are fitted with parabolas. When the sample count
/// is even the final interval is closed with a three-point parabolic correction
/// so the result stays exact for quadratics. Two samples degrade to the
/// trapezoidal rule.
pub fn simpson(y: &[f64], x: &[f64]) -> Result<f64, QuadratureError> {
    check_lengths(y, x)?;

    let n = x.len();
    match n {
        0 | 1 => return Ok(0.0),
        2 => return trapezoid(y, x),
        _ => {}
    }

    if n % 2 == 1 {
        return Ok(simpson_odd(y, x));
    }

    // Even count: Simpson over the first n-1 samples plus the last interval
    let head = simpson_odd(&y[..n - 1], &x[..n - 1]);

    let h0 = x[n - 2] - x[n - 3];
    let h1 = x[n - 1] - x[n - 2];
    let alpha = (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h0 + h1));
    let beta = (h1 * h1 + 3.0 * h0 * h1) / (6.0 * h0);
    let eta = h1 * h1 * h1 / (6.0 * h0 * (h0 + h1));

    Ok(head + alpha * y[n - 1] + beta * y[n - 2] - eta * y[n - 3])
}

/// Simpson's rule for an odd number (≥ 3) of samples
fn simpson_odd(y: &[f64], x: &[f64]) -> f64 {
    let mut sum = 0.0;
    for i in (0..x.len() - 2).step_by(2) {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let hsum = h0 + h1;
        let hprod = h0 * h1;
        let h0_over_h1 = h0 / h1;

        sum += hsum / 6.0
            * (y[i] * (2.0 - 1.0 / h0_over_h1)
                + y[i + 1] * (hsum * hsum / hprod)
                + y[i + 2] * (2.0 - h0_over_h1));
    }
    sum
}
