//! Convergence and mixing diagnostics over a [`ChainCollection`]: Gelman–Rubin potential scale
//! reduction, split R-hat with effective sample size, and lag-1 autocorrelation.

use log::{debug, warn};
use ndarray::prelude::*;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;
use std::cmp::Ordering;

use crate::chains::ChainCollection;
use crate::error::{DiagnosticsError, Result};

/// Traces up to this length use the brute-force autocovariance, longer ones the FFT.
const BRUTE_FORCE_MAX_LEN: usize = 100;

/// Potential scale reduction of one parameter, with the variance components it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceRecord {
    pub parameter: String,
    /// `sqrt(V / W)`.
    pub rhat: f64,
    /// Mean of the within-chain variances.
    pub within: f64,
    /// `T / (C - 1)` times the sum of squared deviations of chain means from the grand mean.
    pub between: f64,
    /// `(T - 1) / T * W + B / T`.
    pub pooled_var: f64,
}

impl ConvergenceRecord {
    /// Whether R-hat lies below the caller's threshold (conventionally 1.1).
    pub fn is_below(&self, threshold: f64) -> bool {
        self.rhat < threshold
    }
}

/// Split R-hat and effective sample size of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EssRecord {
    pub parameter: String,
    pub split_rhat: f64,
    pub ess: f64,
}

/// Lag-1 autocorrelation of one parameter in one chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutocorrelationRecord {
    pub parameter: String,
    pub chain: usize,
    pub lag1: f64,
}

/// Computes the Gelman–Rubin potential scale reduction factor for every parameter.
///
/// For each parameter, with `C` chains of `T` draws:
/// 1. chain means and variances (divisor `T - 1`),
/// 2. `W`, the average chain variance,
/// 3. `B = T / (C - 1) * sum((chain_mean - grand_mean)^2)`,
/// 4. `V = (T - 1) / T * W + B / T`,
/// 5. `R-hat = sqrt(V / W)`.
///
/// No convergence verdict is made here; compare against a threshold with
/// [`ConvergenceRecord::is_below`] or [`max_rhat`]. Identical non-constant chains have
/// `B == 0`, so R-hat is `sqrt((T - 1) / T)`, slightly below 1 for short chains (about
/// 0.98995 at `T = 50`). When every chain is constant, `W` is
/// zero and R-hat is reported as 1 if the chains also agree (`B == 0`) and as infinity
/// otherwise.
///
/// # Errors
/// [`DiagnosticsError::InsufficientChains`] for fewer than 2 chains and
/// [`DiagnosticsError::InsufficientSamples`] for fewer than 2 draws per chain.
pub fn gelman_rubin(chains: &ChainCollection) -> Result<Vec<ConvergenceRecord>> {
    if chains.n_chains() < 2 {
        return Err(DiagnosticsError::InsufficientChains {
            required: 2,
            found: chains.n_chains(),
        });
    }
    if chains.n_draws() < 2 {
        return Err(DiagnosticsError::InsufficientSamples {
            required: 2,
            found: chains.n_draws(),
        });
    }
    debug!(
        "Computing R-hat for {} parameters over {} chains of {} draws",
        chains.n_params(),
        chains.n_chains(),
        chains.n_draws()
    );

    let records: Vec<ConvergenceRecord> = (0..chains.n_params())
        .into_par_iter()
        .map(|p| {
            let (within, between, pooled_var) = variance_components(chains.param(p));
            let rhat = if within > 0.0 {
                (pooled_var / within).sqrt()
            } else if between > 0.0 {
                warn!(
                    "Chains of `{}` are constant but disagree; R-hat is infinite",
                    chains.names()[p]
                );
                f64::INFINITY
            } else {
                warn!(
                    "Chains of `{}` are constant and identical; reporting R-hat = 1",
                    chains.names()[p]
                );
                1.0
            };
            ConvergenceRecord {
                parameter: chains.names()[p].clone(),
                rhat,
                within,
                between,
                pooled_var,
            }
        })
        .collect();
    Ok(records)
}

/// `(W, B, V)` of a `[n_chains, n_draws]` array.
fn variance_components(data: ArrayView2<f64>) -> (f64, f64, f64) {
    let (c, t) = data.dim();
    let (c, t) = (c as f64, t as f64);
    let chain_means = data.mean_axis(Axis(1)).expect("Expected at least one draw");
    let chain_vars = data.var_axis(Axis(1), 1.0);
    let within = chain_vars.sum() / c;
    let grand_mean = chain_means.sum() / c;
    let between = t / (c - 1.0) * chain_means.mapv(|m| (m - grand_mean).powi(2)).sum();
    let pooled_var = (t - 1.0) / t * within + between / t;
    (within, between, pooled_var)
}

/// The largest R-hat, or `None` for an empty slice.
pub fn max_rhat(records: &[ConvergenceRecord]) -> Option<f64> {
    records
        .iter()
        .map(|r| r.rhat)
        .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal))
}

/// Gelman–Rubin R-hat after splitting every chain in half.
///
/// Splitting also detects non-stationarity within single chains, so this works from one
/// chain upward.
///
/// # Errors
/// [`DiagnosticsError::EmptyInput`] without chains and
/// [`DiagnosticsError::InsufficientSamples`] for fewer than 4 draws per chain.
pub fn split_gelman_rubin(chains: &ChainCollection) -> Result<Vec<ConvergenceRecord>> {
    ensure_splittable(chains)?;
    gelman_rubin(&chains.split_halves())
}

fn ensure_splittable(chains: &ChainCollection) -> Result<()> {
    if chains.n_chains() == 0 {
        return Err(DiagnosticsError::EmptyInput(
            "chain collection holds no chains".to_string(),
        ));
    }
    if chains.n_draws() < 4 {
        return Err(DiagnosticsError::InsufficientSamples {
            required: 4,
            found: chains.n_draws(),
        });
    }
    Ok(())
}

/// Computes split R-hat and the effective sample size (ESS) of every parameter.
///
/// Chains are split in half, their autocovariances averaged, and the autocorrelation
/// estimate `rho_t = 1 - (W - mean_acov_t) / V` is summed in pairs using Geyer's initial
/// monotone sequence: `tau = -1 + 2 * sum(P_k)`, `ESS = C * T / tau`.
///
/// # Errors
/// As [`split_gelman_rubin`].
///
/// # References
/// - STAN Reference Manual, Section on R-hat and Effective Sample Size
pub fn effective_sample_size(chains: &ChainCollection) -> Result<Vec<EssRecord>> {
    ensure_splittable(chains)?;
    let split = chains.split_halves();
    let rhats = gelman_rubin(&split)?;
    let (n_chains, n_draws) = (split.n_chains(), split.n_draws());

    let ess: Vec<f64> = (0..split.n_params())
        .into_par_iter()
        .map(|p| {
            let data = split.param(p);
            let (within, _, pooled_var) = variance_components(data);
            if pooled_var <= 0.0 {
                warn!(
                    "`{}` has zero variance; ESS is undefined",
                    split.names()[p]
                );
                return f64::NAN;
            }
            let mut avg_acov = Array1::<f64>::zeros(n_draws);
            for trace in data.rows() {
                avg_acov += &autocov(trace);
            }
            avg_acov /= n_chains as f64;
            let rho = avg_acov.mapv(|a| 1.0 - (within - a) / pooled_var);
            let tau = geyer_tau(rho.view());
            (n_chains * n_draws) as f64 / tau
        })
        .collect();

    Ok(rhats
        .into_iter()
        .zip(ess)
        .map(|(r, ess)| EssRecord {
            parameter: r.parameter,
            split_rhat: r.rhat,
            ess,
        })
        .collect())
}

/// Integrated autocorrelation time from Geyer's initial monotone positive sequence.
fn geyer_tau(rho: ArrayView1<f64>) -> f64 {
    let mut min = if rho.len() >= 2 {
        rho[0] + rho[1]
    } else {
        0.0
    };

    let mut out = 0.0;
    for rho_t in rho.windows_with_stride(2, 2) {
        let mut p_t = rho_t[0] + rho_t[1];
        if p_t <= 0.0 {
            break;
        }
        if p_t > min {
            p_t = min;
        }
        min = p_t;
        out += p_t;
    }
    -1.0 + 2.0 * out
}

/// Lag-1 autocorrelation of every parameter in every chain, a cheap proxy for mixing speed.
///
/// Computed as the lag-1 over the lag-0 autocovariance, both with divisor `T`. A constant
/// trace reports 0. Values near 1 mean slow mixing; nothing is classified.
///
/// # Errors
/// [`DiagnosticsError::EmptyInput`] without chains and
/// [`DiagnosticsError::InsufficientSamples`] for fewer than 2 draws per chain.
pub fn effective_independence_check(
    chains: &ChainCollection,
) -> Result<Vec<AutocorrelationRecord>> {
    if chains.n_chains() == 0 {
        return Err(DiagnosticsError::EmptyInput(
            "chain collection holds no chains".to_string(),
        ));
    }
    if chains.n_draws() < 2 {
        return Err(DiagnosticsError::InsufficientSamples {
            required: 2,
            found: chains.n_draws(),
        });
    }
    let records: Vec<AutocorrelationRecord> = (0..chains.n_params())
        .flat_map(|p| {
            (0..chains.n_chains()).map(move |c| AutocorrelationRecord {
                parameter: chains.names()[p].clone(),
                chain: c,
                lag1: lag1_autocorrelation(chains.trace(c, p)),
            })
        })
        .collect();
    Ok(records)
}

fn lag1_autocorrelation(trace: ArrayView1<f64>) -> f64 {
    let n = trace.len() as f64;
    let mean = trace.sum() / n;
    let centered = trace.mapv(|v| v - mean);
    let acov0 = centered.mapv(|v| v * v).sum() / n;
    if acov0 == 0.0 {
        return 0.0;
    }
    let acov1 = (&centered.slice(s![..-1]) * &centered.slice(s![1..])).sum() / n;
    acov1 / acov0
}

fn autocov(trace: ArrayView1<f64>) -> Array1<f64> {
    if trace.len() <= BRUTE_FORCE_MAX_LEN {
        autocov_bf(trace)
    } else {
        autocov_fft(trace)
    }
}

/// Autocovariance of a sequence at every lag `0..n` via FFT.
///
/// Zero-pads to the next power of two `>= 2n - 1` to avoid wrap-around. `rustfft` does not
/// normalize, so the result is scaled by `1 / n_padded` explicitly before the `1 / n`
/// autocovariance divisor.
fn autocov_fft(trace: ArrayView1<f64>) -> Array1<f64> {
    let n = trace.len();
    let mut n_padded = 1;
    while n_padded < 2 * n - 1 {
        n_padded <<= 1;
    }
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n_padded);
    let ffti = planner.plan_fft_inverse(n_padded);

    let mean = trace.sum() / n as f64;
    let mut x: Vec<Complex<f64>> = trace
        .iter()
        .map(|xi| Complex {
            re: xi - mean,
            im: 0.0,
        })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }).take(n_padded - n))
        .collect();
    fft.process(&mut x);
    x.iter_mut().for_each(|xi| *xi *= xi.conj());
    ffti.process(&mut x);
    x.iter()
        .take(n)
        .map(|xi| xi.re / n_padded as f64 / n as f64)
        .collect()
}

/// Brute-force autocovariance: `out[lag] = sum_t (x_t - mean)(x_{t+lag} - mean) / n`.
fn autocov_bf(trace: ArrayView1<f64>) -> Array1<f64> {
    let n = trace.len();
    let mean = trace.sum() / n as f64;
    let centered = trace.mapv(|v| v - mean);
    (0..n)
        .map(|lag| {
            let sum_lag: f64 = (0..(n - lag))
                .map(|t| centered[t] * centered[t + lag])
                .sum();
            sum_lag / n as f64
        })
        .collect()
}
