/*!
# Posterior Summaries.

Per-chain and pooled summaries of a [`ChainCollection`] (mean, standard deviation, median
and central credible interval bounds) and the comparison of posterior intervals against
known true values.

Quantiles interpolate linearly between order statistics: with `n` sorted draws
`x_0 <= ... <= x_{n-1}` the `p` quantile sits at position `h = (n - 1) * p` and equals
`x_floor(h) + (h - floor(h)) * (x_ceil(h) - x_floor(h))` (Hyndman–Fan type 7, the default
of R and NumPy).

```rust
use ndarray::Array3;
use regression_diagnostics::chains::ChainCollection;
use regression_diagnostics::summary::{summarize, Scope, TailProbs};

let draws = Array3::from_shape_fn((2, 5, 1), |(c, t, _)| (c * 5 + t) as f64);
let chains = ChainCollection::new(vec!["mu".to_string()], draws).unwrap();
let pooled = summarize(&chains, Scope::Pooled, TailProbs::default()).unwrap();
assert_eq!(pooled[0].mean, 4.5);
assert_eq!(pooled[0].median, 4.5);
```
*/

use log::debug;
use ndarray::prelude::*;
use ndarray_stats::{interpolate::Linear, QuantileExt};
use noisy_float::types::n64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::chains::ChainCollection;
use crate::error::{DiagnosticsError, Result};
use crate::params::ParameterSet;

/// Which draws a summary is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// One record per chain.
    PerChain,
    /// One record over the draws of all chains.
    Pooled,
}

/// The draws a single [`SummaryRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryScope {
    Chain(usize),
    Pooled,
}

/// Lower and upper tail probabilities of a central credible interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailProbs {
    pub lower: f64,
    pub upper: f64,
}

impl Default for TailProbs {
    /// The 95% central interval.
    fn default() -> Self {
        Self {
            lower: 0.025,
            upper: 0.975,
        }
    }
}

impl TailProbs {
    /// Tail probabilities of the central interval holding `mass` of the posterior, e.g. 0.9
    /// gives `(0.05, 0.95)`.
    pub fn central(mass: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&mass) {
            return Err(DiagnosticsError::invalid(
                "mass",
                format!("must lie in [0, 1], got {mass}"),
            ));
        }
        let tail = (1.0 - mass) / 2.0;
        Ok(Self {
            lower: tail,
            upper: 1.0 - tail,
        })
    }

    pub fn validate(&self) -> Result<()> {
        let in_range = |p: f64| (0.0..=1.0).contains(&p);
        if !in_range(self.lower) || !in_range(self.upper) || self.lower > self.upper {
            return Err(DiagnosticsError::invalid(
                "tail_probs",
                format!(
                    "need 0 <= lower <= upper <= 1, got ({}, {})",
                    self.lower, self.upper
                ),
            ));
        }
        Ok(())
    }
}

/// Summary statistics of one parameter over one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub parameter: String,
    pub scope: SummaryScope,
    pub n_draws: usize,
    pub mean: f64,
    /// Sample standard deviation (divisor `n - 1`); 0 for a single draw.
    pub sd: f64,
    pub median: f64,
    pub tail_probs: TailProbs,
    pub lower: f64,
    pub upper: f64,
}

/// Summarizes every parameter per chain or pooled over all chains.
///
/// Records come in parameter order, and for [`Scope::PerChain`] chain by chain within each
/// parameter. Pooled mean and sd equal those of all chains concatenated into one.
/// A scope holding a NaN draw reports NaN for every statistic.
///
/// # Errors
/// - [`DiagnosticsError::EmptyInput`] without chains or when chains hold zero draws.
/// - [`DiagnosticsError::InvalidArgument`] for tail probabilities outside `[0, 1]` or out
///   of order.
pub fn summarize(
    chains: &ChainCollection,
    scope: Scope,
    tail_probs: TailProbs,
) -> Result<Vec<SummaryRecord>> {
    tail_probs.validate()?;
    chains.ensure_non_empty()?;
    debug!(
        "Summarizing {} parameters ({:?}) at tails ({}, {})",
        chains.n_params(),
        scope,
        tail_probs.lower,
        tail_probs.upper
    );

    let per_param: Vec<Vec<SummaryRecord>> = (0..chains.n_params())
        .into_par_iter()
        .map(|p| -> Result<Vec<SummaryRecord>> {
            let name = &chains.names()[p];
            match scope {
                Scope::Pooled => Ok(vec![summarize_draws(
                    name,
                    SummaryScope::Pooled,
                    chains.pooled(p),
                    tail_probs,
                )?]),
                Scope::PerChain => (0..chains.n_chains())
                    .map(|c| {
                        summarize_draws(
                            name,
                            SummaryScope::Chain(c),
                            chains.trace(c, p).to_owned(),
                            tail_probs,
                        )
                    })
                    .collect(),
            }
        })
        .collect::<Result<_>>()?;
    Ok(per_param.into_iter().flatten().collect())
}

fn summarize_draws(
    name: &str,
    scope: SummaryScope,
    mut draws: Array1<f64>,
    tail_probs: TailProbs,
) -> Result<SummaryRecord> {
    let n = draws.len();
    let mean = draws.sum() / n as f64;
    let sd = if n > 1 { draws.std(1.0) } else { 0.0 };
    let median = quantile(&mut draws, 0.5)?;
    let lower = quantile(&mut draws, tail_probs.lower)?;
    let upper = quantile(&mut draws, tail_probs.upper)?;
    Ok(SummaryRecord {
        parameter: name.to_string(),
        scope,
        n_draws: n,
        mean,
        sd,
        median,
        tail_probs,
        lower,
        upper,
    })
}

/// Linearly interpolated empirical quantile. Reorders `draws` in place.
///
/// A NaN draw makes the quantile NaN, as it does the mean and sd.
fn quantile(draws: &mut Array1<f64>, prob: f64) -> Result<f64> {
    if draws.iter().any(|v| v.is_nan()) {
        return Ok(f64::NAN);
    }
    draws
        .quantile_axis_skipnan_mut(Axis(0), n64(prob), &Linear)
        .map(|q| q.into_scalar())
        .map_err(|e| DiagnosticsError::invalid("quantile", format!("{e:?} at p = {prob}")))
}

/// Point estimate reported next to the credible intervals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointEstimator {
    #[default]
    Mean,
    Median,
}

/// A central credible interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    /// Posterior mass inside the interval.
    pub mass: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Posterior point estimate and intervals of one parameter next to its true value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveryRecord {
    pub parameter: String,
    pub truth: f64,
    pub estimator: PointEstimator,
    pub estimate: f64,
    /// 50% central interval.
    pub inner: Interval,
    /// 90% central interval.
    pub outer: Interval,
}

impl RecoveryRecord {
    /// Signed distance of the estimate from the truth.
    pub fn error(&self) -> f64 {
        self.estimate - self.truth
    }

    pub fn inner_covers_truth(&self) -> bool {
        self.inner.contains(self.truth)
    }

    pub fn outer_covers_truth(&self) -> bool {
        self.outer.contains(self.truth)
    }
}

const INNER_MASS: f64 = 0.5;
const OUTER_MASS: f64 = 0.9;

/// Pairs the pooled point estimate and the 50% and 90% central credible intervals of every
/// parameter in `true_values` with its true value, in the order of `true_values`.
///
/// # Errors
/// - [`DiagnosticsError::UnknownParameter`] if a name in `true_values` is not monitored by
///   `chains`; checked before anything is computed.
/// - [`DiagnosticsError::EmptyInput`] as in [`summarize`].
pub fn recover_intervals(
    chains: &ChainCollection,
    true_values: &ParameterSet,
    estimator: PointEstimator,
) -> Result<Vec<RecoveryRecord>> {
    let indices = true_values
        .names()
        .map(|name| chains.param_index(name))
        .collect::<Result<Vec<usize>>>()?;
    chains.ensure_non_empty()?;
    let inner_tails = TailProbs::central(INNER_MASS)?;
    let outer_tails = TailProbs::central(OUTER_MASS)?;

    true_values
        .iter()
        .zip(indices)
        .map(|((name, truth), p)| -> Result<RecoveryRecord> {
            let draws = chains.pooled(p);
            let inner = summarize_draws(name, SummaryScope::Pooled, draws.clone(), inner_tails)?;
            let outer = summarize_draws(name, SummaryScope::Pooled, draws, outer_tails)?;
            let estimate = match estimator {
                PointEstimator::Mean => inner.mean,
                PointEstimator::Median => inner.median,
            };
            Ok(RecoveryRecord {
                parameter: name.to_string(),
                truth,
                estimator,
                estimate,
                inner: Interval {
                    mass: INNER_MASS,
                    lower: inner.lower,
                    upper: inner.upper,
                },
                outer: Interval {
                    mass: OUTER_MASS,
                    lower: outer.lower,
                    upper: outer.upper,
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr3;
    use approx::assert_abs_diff_eq;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::StandardNormal;

    fn collection(names: &[&str], data: Array3<f64>) -> ChainCollection {
        ChainCollection::new(names.iter().map(|s| s.to_string()).collect(), data).unwrap()
    }

    #[test]
    fn test_quantile_interpolates_linearly() {
        let mut draws = array![4.0, 1.0, 3.0, 2.0];
        // h = 3 * 0.25 = 0.75 -> 1 + 0.75 * (2 - 1)
        assert_abs_diff_eq!(quantile(&mut draws, 0.25).unwrap(), 1.75);
        assert_abs_diff_eq!(quantile(&mut draws, 0.5).unwrap(), 2.5);
        assert_abs_diff_eq!(quantile(&mut draws, 0.0).unwrap(), 1.0);
        assert_abs_diff_eq!(quantile(&mut draws, 1.0).unwrap(), 4.0);
        // h = 3 * 0.975 = 2.925 -> 3 + 0.925 * (4 - 3)
        assert_abs_diff_eq!(quantile(&mut draws, 0.975).unwrap(), 3.925, epsilon = 1e-12);
    }

    #[test]
    fn test_per_chain_summary() {
        let data = arr3(&[[[1.0], [2.0], [3.0]], [[10.0], [20.0], [30.0]]]);
        let records = summarize(&collection(&["mu"], data), Scope::PerChain, TailProbs::default())
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].scope, SummaryScope::Chain(0));
        assert_eq!(records[1].scope, SummaryScope::Chain(1));
        assert_abs_diff_eq!(records[0].mean, 2.0);
        assert_abs_diff_eq!(records[0].sd, 1.0);
        assert_abs_diff_eq!(records[1].mean, 20.0);
        assert_abs_diff_eq!(records[1].median, 20.0);
        assert_abs_diff_eq!(records[1].lower, 10.5, epsilon = 1e-12);
        assert_abs_diff_eq!(records[1].upper, 29.5, epsilon = 1e-12);
    }

    #[test]
    fn test_pooled_equals_concatenated_chain() {
        let mut rng = SmallRng::seed_from_u64(4);
        let data = Array3::from_shape_simple_fn((4, 50, 2), || rng.sample(StandardNormal));
        let chains = collection(&["a", "b"], data.clone());
        let pooled = summarize(&chains, Scope::Pooled, TailProbs::default()).unwrap();

        let flat = data.to_shape((1, 200, 2)).unwrap().to_owned();
        let single = summarize(&collection(&["a", "b"], flat), Scope::PerChain, TailProbs::default())
            .unwrap();
        for (p, s) in pooled.iter().zip(single.iter()) {
            assert_eq!(p.n_draws, 200);
            assert_abs_diff_eq!(p.mean, s.mean, epsilon = 1e-12);
            assert_abs_diff_eq!(p.sd, s.sd, epsilon = 1e-12);
            assert_abs_diff_eq!(p.lower, s.lower, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_single_draw_has_zero_sd() {
        let records = summarize(
            &collection(&["mu"], Array3::from_elem((1, 1, 1), 7.0)),
            Scope::Pooled,
            TailProbs::default(),
        )
        .unwrap();
        assert_eq!(records[0].sd, 0.0);
        assert_eq!(records[0].lower, 7.0);
        assert_eq!(records[0].upper, 7.0);
    }

    #[test]
    fn test_nan_draw_poisons_whole_record() {
        let mut data = Array3::from_shape_fn((2, 5, 2), |(c, t, _)| (c * 5 + t) as f64);
        data[[1, 2, 0]] = f64::NAN;
        let chains = collection(&["mu", "tau"], data);

        let pooled = summarize(&chains, Scope::Pooled, TailProbs::default()).unwrap();
        let r = &pooled[0];
        assert!(r.mean.is_nan() && r.sd.is_nan());
        assert!(r.median.is_nan() && r.lower.is_nan() && r.upper.is_nan());
        assert_abs_diff_eq!(pooled[1].median, 4.5);

        // Only the chain holding the NaN is affected.
        let per_chain = summarize(&chains, Scope::PerChain, TailProbs::default()).unwrap();
        assert_abs_diff_eq!(per_chain[0].median, 2.0);
        assert!(per_chain[1].median.is_nan() && per_chain[1].mean.is_nan());
    }

    #[test]
    fn test_summarize_rejects_bad_input() {
        let empty = collection(&["mu"], Array3::zeros((2, 0, 1)));
        assert!(matches!(
            summarize(&empty, Scope::Pooled, TailProbs::default()),
            Err(DiagnosticsError::EmptyInput(_))
        ));
        let chains = collection(&["mu"], Array3::zeros((2, 3, 1)));
        let reversed = TailProbs {
            lower: 0.9,
            upper: 0.1,
        };
        assert!(matches!(
            summarize(&chains, Scope::Pooled, reversed),
            Err(DiagnosticsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_central_tail_probs() {
        let t = TailProbs::central(0.9).unwrap();
        assert_abs_diff_eq!(t.lower, 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(t.upper, 0.95, epsilon = 1e-12);
        assert!(TailProbs::central(1.5).is_err());
    }

    #[test]
    fn test_recover_intervals() {
        let mut rng = SmallRng::seed_from_u64(21);
        let mut data = Array3::<f64>::zeros((4, 500, 2));
        data.index_axis_mut(Axis(2), 0)
            .mapv_inplace(|_| 1.0 + 0.1 * rng.sample::<f64, _>(StandardNormal));
        data.index_axis_mut(Axis(2), 1)
            .mapv_inplace(|_| 1.2 + 0.1 * rng.sample::<f64, _>(StandardNormal));
        let chains = collection(&["intercept", "slope"], data);
        let truth = ParameterSet::linear(1.0, 1.2);

        let records = recover_intervals(&chains, &truth, PointEstimator::Median).unwrap();
        assert_eq!(records.len(), 2);
        for r in &records {
            assert_eq!(r.estimator, PointEstimator::Median);
            assert!(r.error().abs() < 0.02, "{r:?}");
            assert!(r.outer_covers_truth());
            assert!(r.inner.width() < r.outer.width());
            assert!(r.outer.lower < r.inner.lower && r.inner.upper < r.outer.upper);
        }
        assert_eq!(records[1].parameter, "slope");
        assert_abs_diff_eq!(records[1].truth, 1.2);
    }

    #[test]
    fn test_recover_intervals_unknown_parameter() {
        let chains = collection(&["intercept"], Array3::zeros((2, 3, 1)));
        let truth = ParameterSet::linear(1.0, 1.2);
        assert_eq!(
            recover_intervals(&chains, &truth, PointEstimator::Mean),
            Err(DiagnosticsError::UnknownParameter("slope".to_string()))
        );
    }
}
