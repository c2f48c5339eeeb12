/*!
# Synthetic Regression Data.

Reproducible fake datasets drawn from known "true" parameters:
- [`generate_linear`]: standard normal predictor with a Gaussian-noise linear response.
- [`generate_binary`]: the same linear predictor pushed through the inverse logit and
  binarized with one uniform draw per observation.
- [`standardize`]: zero mean, unit variance transform that remembers how to undo itself.

All randomness flows through an explicit generator. The seeded functions build a
[`SmallRng`] from the seed, and the `*_with_rng` variants accept any [`rand::Rng`], so
equal seeds and inputs always reproduce identical data.

```rust
use regression_diagnostics::params::ParameterSet;
use regression_diagnostics::synthetic::generate_linear;

let truth = ParameterSet::linear(1.0, 1.2);
let a = generate_linear(100, &truth, 0.5, 42).unwrap();
let b = generate_linear(100, &truth, 0.5, 42).unwrap();
assert_eq!(a, b);
```
*/

use log::debug;
use ndarray::{Array1, ArrayView1, Zip};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{StandardNormal, StandardUniform};
use serde::Serialize;

use crate::error::{DiagnosticsError, Result};
use crate::params::{ParameterSet, INTERCEPT, SLOPE};

/// Predictor and continuous response of a linear regression dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearData {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
}

/// Predictor and binary response of a logistic regression dataset.
///
/// `latent` is the linear response and `p` its inverse logit. They are kept so
/// the binarization can be inspected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinaryData {
    pub x: Array1<f64>,
    pub latent: Array1<f64>,
    pub p: Array1<f64>,
    pub y: Array1<u8>,
}

/// Generates `y = intercept + slope * x + noise` with `x ~ N(0, 1)` and `noise ~ N(0, noise_sd)`.
///
/// Reads `intercept` and `slope` from `true_params`. All `n` predictors are drawn
/// before the `n` noise terms.
///
/// # Errors
/// [`DiagnosticsError::InvalidArgument`] if `n == 0`, if `noise_sd` is negative or not
/// finite, or if `intercept`/`slope` are missing from `true_params`.
pub fn generate_linear(
    n: usize,
    true_params: &ParameterSet,
    noise_sd: f64,
    seed: u64,
) -> Result<LinearData> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let data = generate_linear_with_rng(n, true_params, noise_sd, &mut rng)?;
    debug!("Generated {n} linear observations with seed {seed}");
    Ok(data)
}

/// Same as [`generate_linear`] but draws from the caller's generator.
pub fn generate_linear_with_rng<R: Rng + ?Sized>(
    n: usize,
    true_params: &ParameterSet,
    noise_sd: f64,
    rng: &mut R,
) -> Result<LinearData> {
    if n == 0 {
        return Err(DiagnosticsError::invalid("n", "must be positive, got 0"));
    }
    if !noise_sd.is_finite() || noise_sd < 0.0 {
        return Err(DiagnosticsError::invalid(
            "noise_sd",
            format!("must be finite and non-negative, got {noise_sd}"),
        ));
    }
    let intercept = true_params.require(INTERCEPT)?;
    let slope = true_params.require(SLOPE)?;

    let x: Array1<f64> = (0..n).map(|_| rng.sample(StandardNormal)).collect();
    let noise: Array1<f64> = (0..n)
        .map(|_| noise_sd * rng.sample::<f64, _>(StandardNormal))
        .collect();
    let y = x.mapv(|xi| intercept + slope * xi) + noise;

    Ok(LinearData { x, y })
}

/// Generates a binary response whose success probability is the inverse logit of a linear
/// response.
///
/// The linear part is produced exactly as by [`generate_linear`]. Then one uniform
/// `u[i]` is drawn per observation and `y[i] = 1` iff `u[i] < p[i]`. This is a Bernoulli
/// draw, not a 0.5 cutoff, so `p[i] == 0` always yields 0 and `p[i] == 1` always yields 1.
///
/// # Errors
/// As [`generate_linear`].
pub fn generate_binary(
    n: usize,
    true_params: &ParameterSet,
    noise_sd: f64,
    seed: u64,
) -> Result<BinaryData> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let data = generate_binary_with_rng(n, true_params, noise_sd, &mut rng)?;
    debug!(
        "Generated {n} binary observations with seed {seed} ({} successes)",
        data.y.iter().filter(|&&v| v == 1).count()
    );
    Ok(data)
}

/// Same as [`generate_binary`] but draws from the caller's generator.
pub fn generate_binary_with_rng<R: Rng + ?Sized>(
    n: usize,
    true_params: &ParameterSet,
    noise_sd: f64,
    rng: &mut R,
) -> Result<BinaryData> {
    let LinearData { x, y: latent } = generate_linear_with_rng(n, true_params, noise_sd, rng)?;
    let p = latent.mapv(inverse_logit);
    let u: Array1<f64> = (0..n).map(|_| rng.sample(StandardUniform)).collect();
    let y = Zip::from(&u)
        .and(&p)
        .map_collect(|&ui, &pi| (ui < pi) as u8);

    Ok(BinaryData { x, latent, p, y })
}

/// The logistic function `1 / (1 + exp(-x))`, evaluated without overflow for large `|x|`.
pub fn inverse_logit(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// The log-odds `ln(p / (1 - p))`.
///
/// # Errors
/// [`DiagnosticsError::InvalidArgument`] unless `0 < p < 1`.
pub fn logit(p: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(DiagnosticsError::invalid(
            "p",
            format!("must lie strictly between 0 and 1, got {p}"),
        ));
    }
    Ok((p / (1.0 - p)).ln())
}

/// A standardized vector together with the moments used to produce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standardized {
    pub values: Array1<f64>,
    pub mean: f64,
    /// Population standard deviation (divisor `N`) of the original values.
    pub sd: f64,
}

impl Standardized {
    /// Maps standardized values back to the original scale.
    pub fn invert(&self, z: ArrayView1<f64>) -> Array1<f64> {
        z.mapv(|zi| zi * self.sd + self.mean)
    }

    /// Standardizes new values with the stored moments, e.g. a prediction grid.
    pub fn apply(&self, raw: ArrayView1<f64>) -> Array1<f64> {
        raw.mapv(|v| (v - self.mean) / self.sd)
    }

    /// Converts an intercept and slope estimated against the standardized predictor into
    /// coefficients for the raw predictor.
    ///
    /// `a + b * (x - mean) / sd == (a - b * mean / sd) + (b / sd) * x`.
    pub fn coefficients_to_original_scale(&self, intercept: f64, slope: f64) -> (f64, f64) {
        let raw_slope = slope / self.sd;
        (intercept - raw_slope * self.mean, raw_slope)
    }
}

/// Replaces each value by `(value - mean) / sd` using the population standard deviation.
///
/// # Errors
/// - [`DiagnosticsError::EmptyInput`] for an empty vector.
/// - [`DiagnosticsError::InvalidArgument`] if a value is not finite.
/// - [`DiagnosticsError::DivisionByZero`] if all values are equal.
pub fn standardize(values: ArrayView1<f64>) -> Result<Standardized> {
    if values.is_empty() {
        return Err(DiagnosticsError::EmptyInput(
            "cannot standardize an empty vector".to_string(),
        ));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(DiagnosticsError::invalid(
            "values",
            format!("must be finite, found {bad}"),
        ));
    }
    let first = values[0];
    let zero_variance = DiagnosticsError::DivisionByZero {
        len: values.len(),
        value: first,
    };
    if values.iter().all(|&v| v == first) {
        return Err(zero_variance);
    }
    let n = values.len() as f64;
    let mean = values.sum() / n;
    // Squares are taken relative to the largest deviation so tiny spreads do not underflow.
    let deviations = values.mapv(|v| v - mean);
    let scale = deviations.fold(0.0_f64, |acc, d| acc.max(d.abs()));
    if scale == 0.0 {
        return Err(zero_variance);
    }
    let sd = scale * (deviations.mapv(|d| (d / scale).powi(2)).sum() / n).sqrt();
    Ok(Standardized {
        values: values.mapv(|v| (v - mean) / sd),
        mean,
        sd,
    })
}
