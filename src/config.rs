/*!
Run configuration: the options a tutorial run is parameterized by.

- [`SimulationConfig`]: number of data points, true parameter values, noise scale and seed.
- [`SamplerSettings`]: chain count, iterations, burn-in and thinning. The sampler itself is
  external; these settings describe its output and [`SamplerSettings::apply`] trims a
  collection accordingly.
- [`DiagnosticsConfig`]: credible-interval tails, point estimator and the caller's R-hat
  threshold.

All structs deserialize with `serde`, and missing fields take their [`Default`] values.

```rust
use regression_diagnostics::config::RunConfig;

let config = RunConfig::default().with_seed(7);
config.validate().unwrap();
assert_eq!(config.simulation.seed, 7);
assert_eq!(config.sampler.retained_draws(), 1000);
```
*/

use log::debug;
use serde::{Deserialize, Serialize};

use crate::chains::ChainCollection;
use crate::error::{DiagnosticsError, Result};
use crate::params::ParameterSet;
use crate::stats::ConvergenceRecord;
use crate::summary::{self, PointEstimator, RecoveryRecord, Scope, SummaryRecord, TailProbs};
use crate::synthetic::{self, BinaryData, LinearData};

/// All options of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    pub sampler: SamplerSettings,
    pub diagnostics: DiagnosticsConfig,
}

impl RunConfig {
    /// Sets the seed of the data generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.simulation.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.sampler.validate()?;
        self.diagnostics.validate()
    }
}

/// Synthetic dataset options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub n_points: usize,
    pub true_params: ParameterSet,
    pub noise_sd: f64,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            n_points: 100,
            true_params: ParameterSet::linear(1.0, 1.2),
            noise_sd: 0.5,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_points == 0 {
            return Err(DiagnosticsError::invalid("n_points", "must be positive"));
        }
        if !self.noise_sd.is_finite() || self.noise_sd < 0.0 {
            return Err(DiagnosticsError::invalid(
                "noise_sd",
                format!("must be finite and non-negative, got {}", self.noise_sd),
            ));
        }
        Ok(())
    }

    pub fn generate_linear(&self) -> Result<LinearData> {
        synthetic::generate_linear(self.n_points, &self.true_params, self.noise_sd, self.seed)
    }

    pub fn generate_binary(&self) -> Result<BinaryData> {
        synthetic::generate_binary(self.n_points, &self.true_params, self.noise_sd, self.seed)
    }
}

/// How the external sampler was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    pub n_chains: usize,
    /// Draws per chain including burn-in.
    pub n_iterations: usize,
    /// Leading draws of every chain to discard.
    pub burn_in: usize,
    /// Keep every `thin`-th draw after burn-in.
    pub thin: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            n_chains: 4,
            n_iterations: 2000,
            burn_in: 1000,
            thin: 1,
        }
    }
}

impl SamplerSettings {
    pub fn validate(&self) -> Result<()> {
        if self.n_chains == 0 {
            return Err(DiagnosticsError::invalid("n_chains", "must be positive"));
        }
        if self.thin == 0 {
            return Err(DiagnosticsError::invalid("thin", "must be at least 1"));
        }
        if self.burn_in >= self.n_iterations {
            return Err(DiagnosticsError::invalid(
                "burn_in",
                format!(
                    "must be smaller than n_iterations ({}), got {}",
                    self.n_iterations, self.burn_in
                ),
            ));
        }
        Ok(())
    }

    /// Draws per chain left after burn-in and thinning.
    pub fn retained_draws(&self) -> usize {
        self.n_iterations
            .saturating_sub(self.burn_in)
            .div_ceil(self.thin.max(1))
    }

    /// Checks that `chains` has the configured shape, then discards the burn-in and thins.
    ///
    /// # Errors
    /// [`DiagnosticsError::InvalidArgument`] for invalid settings and
    /// [`DiagnosticsError::ShapeMismatch`] if the collection was not produced with them.
    pub fn apply(&self, chains: &ChainCollection) -> Result<ChainCollection> {
        self.validate()?;
        if chains.n_chains() != self.n_chains || chains.n_draws() != self.n_iterations {
            return Err(DiagnosticsError::ShapeMismatch(format!(
                "expected {} chains of {} draws, got {} chains of {} draws",
                self.n_chains,
                self.n_iterations,
                chains.n_chains(),
                chains.n_draws()
            )));
        }
        let kept = chains.discard_burn_in(self.burn_in)?.thin(self.thin)?;
        debug!(
            "Kept {} of {} draws per chain (burn-in {}, thin {})",
            kept.n_draws(),
            self.n_iterations,
            self.burn_in,
            self.thin
        );
        Ok(kept)
    }
}

/// Summary and recovery options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub tail_probs: TailProbs,
    pub point_estimator: PointEstimator,
    /// R-hat values at or above this are reported by [`DiagnosticsConfig::unconverged`].
    pub rhat_threshold: f64,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            tail_probs: TailProbs::default(),
            point_estimator: PointEstimator::Mean,
            rhat_threshold: 1.1,
        }
    }
}

impl DiagnosticsConfig {
    pub fn validate(&self) -> Result<()> {
        self.tail_probs.validate()?;
        if self.rhat_threshold.is_nan() || self.rhat_threshold < 1.0 {
            return Err(DiagnosticsError::invalid(
                "rhat_threshold",
                format!("must be at least 1, got {}", self.rhat_threshold),
            ));
        }
        Ok(())
    }

    pub fn summarize(&self, chains: &ChainCollection, scope: Scope) -> Result<Vec<SummaryRecord>> {
        summary::summarize(chains, scope, self.tail_probs)
    }

    pub fn recover(
        &self,
        chains: &ChainCollection,
        true_values: &ParameterSet,
    ) -> Result<Vec<RecoveryRecord>> {
        summary::recover_intervals(chains, true_values, self.point_estimator)
    }

    /// Names of the parameters whose R-hat is not below the threshold.
    pub fn unconverged<'a>(&self, records: &'a [ConvergenceRecord]) -> Vec<&'a str> {
        records
            .iter()
            .filter(|r| !r.is_below(self.rhat_threshold))
            .map(|r| r.parameter.as_str())
            .collect()
    }
}
