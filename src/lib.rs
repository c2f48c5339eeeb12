//! # Regression Diagnostics
//!
//! Synthetic data and posterior diagnostics for **Bayesian linear and logistic regression**
//! workflows. Fitting is left to any external MCMC sampler; this crate covers what happens
//! before and after it:
//!
//! 1. **Synthetic data** ([`synthetic`]): reproducible predictors and responses from known
//!    true parameters, with a linear or inverse-logit/Bernoulli link and an invertible
//!    standardization.
//! 2. **Chain collections** ([`chains`]): sampler output of shape chains × draws × parameters,
//!    with burn-in removal, thinning and chain splitting.
//! 3. **Summaries** ([`summary`]): per-chain and pooled mean, sd, median and credible
//!    intervals, plus recovery of known true values.
//! 4. **Convergence** ([`stats`]): Gelman–Rubin R-hat, split R-hat, effective sample size and
//!    lag-1 autocorrelation.
//!
//! ## Getting Started
//!
//! ```bash
//! cargo add regression-diagnostics
//! ```
//!
//! ## Example: Recovering Known Parameters
//!
//! ```rust
//! use ndarray::Array3;
//! use rand::rngs::SmallRng;
//! use rand::{Rng, SeedableRng};
//! use rand_distr::StandardNormal;
//! use regression_diagnostics::chains::ChainCollection;
//! use regression_diagnostics::params::ParameterSet;
//! use regression_diagnostics::stats::{gelman_rubin, max_rhat};
//! use regression_diagnostics::summary::{recover_intervals, PointEstimator};
//! use regression_diagnostics::synthetic::generate_linear;
//!
//! let truth = ParameterSet::linear(1.0, 1.2);
//! let data = generate_linear(100, &truth, 0.5, 42).unwrap();
//! assert_eq!(data.y.len(), 100);
//!
//! // Stand-in for the output of an external sampler: 4 chains, 500 draws, 2 parameters.
//! let mut rng = SmallRng::seed_from_u64(1);
//! let draws = Array3::from_shape_fn((4, 500, 2), |(_, _, p)| {
//!     let centre = if p == 0 { 1.0 } else { 1.2 };
//!     centre + 0.05 * rng.sample::<f64, _>(StandardNormal)
//! });
//! let chains =
//!     ChainCollection::new(vec!["intercept".into(), "slope".into()], draws).unwrap();
//!
//! let rhat = gelman_rubin(&chains).unwrap();
//! assert!(max_rhat(&rhat).unwrap() < 1.1);
//!
//! let recovered = recover_intervals(&chains, &truth, PointEstimator::Mean).unwrap();
//! assert!(recovered.iter().all(|r| r.outer_covers_truth()));
//! ```
//!
//! ## Features
//! - **Explicit randomness**: every generator takes a seed or an `Rng`, no global state
//! - **Documented quantiles**: linear interpolation between order statistics (type 7)
//! - **Parallel per-parameter statistics** (Rayon) with results identical to sequential runs
//! - **Serializable records** (`serde`) for plotting and reporting collaborators
//! - **Logging** through the `log` facade

pub mod chains;
pub mod config;
pub mod error;
pub mod params;
pub mod stats;
pub mod summary;
pub mod synthetic;

pub use error::{DiagnosticsError, Result};
