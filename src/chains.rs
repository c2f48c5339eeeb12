/*!
# Chain Collections.

A [`ChainCollection`] is the read-only sampler output the diagnostics work on: `C` chains of
`T` draws each, every draw holding a value for the same `P` named parameters. The values are
stored as an [`ndarray::Array3<f64>`] with the first axis representing the chain, the second
one the draw and the last one the parameter, which is the shape a multi-chain runner
returns.

Collections can be built from such an array (any numeric element type) or from per-draw
name/value maps, and are validated on construction so that every chain has the same length
and the same parameter set.
*/

use log::{debug, warn};
use ndarray::{concatenate, prelude::*};
use num_traits::ToPrimitive;
use std::collections::{BTreeMap, HashSet};

use crate::error::{DiagnosticsError, Result};

/// Posterior draws of several chains over a fixed set of named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainCollection {
    names: Vec<String>,
    draws: Array3<f64>, // n_chains x n_draws x n_params
}

impl ChainCollection {
    /// Wraps an array of shape `[n_chains, n_draws, n_params]`.
    ///
    /// # Errors
    /// [`DiagnosticsError::ShapeMismatch`] if the number of names differs from the parameter
    /// axis, if there are no parameters, or if a name is repeated.
    pub fn new(names: Vec<String>, draws: Array3<f64>) -> Result<Self> {
        let n_params = draws.shape()[2];
        if names.len() != n_params {
            return Err(DiagnosticsError::ShapeMismatch(format!(
                "{} parameter names for {} parameter columns",
                names.len(),
                n_params
            )));
        }
        if names.is_empty() {
            return Err(DiagnosticsError::ShapeMismatch(
                "a chain collection needs at least one parameter".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(names.len());
        if let Some(dup) = names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(DiagnosticsError::ShapeMismatch(format!(
                "parameter `{dup}` appears more than once"
            )));
        }
        if draws.iter().any(|v| !v.is_finite()) {
            warn!("Chain collection contains non-finite draws");
        }
        debug!(
            "Chain collection with {} chains, {} draws, {} parameters",
            draws.shape()[0],
            draws.shape()[1],
            n_params
        );
        Ok(Self { names, draws })
    }

    /// Converts a sampler's `[n_chains, n_draws, n_params]` array of any numeric type.
    ///
    /// # Errors
    /// As [`ChainCollection::new`], and [`DiagnosticsError::InvalidArgument`] if an element
    /// cannot be represented as `f64`.
    pub fn from_array<T>(names: Vec<String>, sample: ArrayView3<T>) -> Result<Self>
    where
        T: ToPrimitive,
    {
        let mut converted = Array3::<f64>::zeros(sample.raw_dim());
        for (out, v) in converted.iter_mut().zip(sample.iter()) {
            *out = v.to_f64().ok_or_else(|| {
                DiagnosticsError::invalid("sample", "element is not representable as f64")
            })?;
        }
        Self::new(names, converted)
    }

    /// Builds a collection from chains of draws, each draw mapping parameter name to value.
    ///
    /// Parameter columns follow the lexicographic order of the names.
    ///
    /// # Errors
    /// [`DiagnosticsError::EmptyInput`] if there are no chains or the first chain has no
    /// draws, [`DiagnosticsError::ShapeMismatch`] if chains differ in length or any draw has a
    /// different parameter set than the first one.
    pub fn from_draws(chains: &[Vec<BTreeMap<String, f64>>]) -> Result<Self> {
        let first = chains
            .first()
            .ok_or_else(|| DiagnosticsError::EmptyInput("no chains supplied".to_string()))?;
        let reference = first.first().ok_or_else(|| {
            DiagnosticsError::EmptyInput("chain 0 has zero draws".to_string())
        })?;
        let names: Vec<String> = reference.keys().cloned().collect();
        let (n_chains, n_draws, n_params) = (chains.len(), first.len(), names.len());

        let mut draws = Array3::<f64>::zeros((n_chains, n_draws, n_params));
        for (c, chain) in chains.iter().enumerate() {
            if chain.len() != n_draws {
                return Err(DiagnosticsError::ShapeMismatch(format!(
                    "chain {c} has {} draws, chain 0 has {n_draws}",
                    chain.len()
                )));
            }
            for (t, draw) in chain.iter().enumerate() {
                if draw.len() != n_params || !draw.keys().eq(names.iter()) {
                    return Err(DiagnosticsError::ShapeMismatch(format!(
                        "draw {t} of chain {c} monitors a different parameter set"
                    )));
                }
                for (p, value) in draw.values().enumerate() {
                    draws[[c, t, p]] = *value;
                }
            }
        }
        Self::new(names, draws)
    }

    pub fn n_chains(&self) -> usize {
        self.draws.shape()[0]
    }

    pub fn n_draws(&self) -> usize {
        self.draws.shape()[1]
    }

    pub fn n_params(&self) -> usize {
        self.draws.shape()[2]
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The full `[n_chains, n_draws, n_params]` array.
    pub fn draws(&self) -> ArrayView3<f64> {
        self.draws.view()
    }

    /// Column index of `name`.
    pub fn param_index(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| DiagnosticsError::UnknownParameter(name.to_string()))
    }

    /// Draws of parameter column `p` as a `[n_chains, n_draws]` view.
    pub fn param(&self, p: usize) -> ArrayView2<f64> {
        self.draws.index_axis(Axis(2), p)
    }

    /// Draws of parameter column `p` in chain `c`, in iteration order.
    pub fn trace(&self, c: usize, p: usize) -> ArrayView1<f64> {
        self.draws.slice(s![c, .., p])
    }

    /// All draws of parameter column `p`, chain after chain.
    pub fn pooled(&self, p: usize) -> Array1<f64> {
        self.param(p).iter().copied().collect()
    }

    /// Fails with [`DiagnosticsError::EmptyInput`] if there are no chains or no draws.
    pub(crate) fn ensure_non_empty(&self) -> Result<()> {
        if self.n_chains() == 0 {
            return Err(DiagnosticsError::EmptyInput(
                "chain collection holds no chains".to_string(),
            ));
        }
        if self.n_draws() == 0 {
            return Err(DiagnosticsError::EmptyInput(
                "chains hold zero draws".to_string(),
            ));
        }
        Ok(())
    }

    /// Drops the first `n_discard` draws of every chain (burn-in).
    ///
    /// # Errors
    /// [`DiagnosticsError::InsufficientSamples`] if nothing would be left.
    pub fn discard_burn_in(&self, n_discard: usize) -> Result<Self> {
        if n_discard >= self.n_draws() {
            return Err(DiagnosticsError::InsufficientSamples {
                required: n_discard + 1,
                found: self.n_draws(),
            });
        }
        let kept = self.draws.slice(s![.., n_discard.., ..]).to_owned();
        Ok(Self {
            names: self.names.clone(),
            draws: kept,
        })
    }

    /// Keeps every `step`-th draw of every chain, starting with the first.
    ///
    /// # Errors
    /// [`DiagnosticsError::InvalidArgument`] if `step == 0`.
    pub fn thin(&self, step: usize) -> Result<Self> {
        if step == 0 {
            return Err(DiagnosticsError::invalid("thin", "must be at least 1"));
        }
        let kept = self.draws.slice(s![.., ..;step, ..]).to_owned();
        Ok(Self {
            names: self.names.clone(),
            draws: kept,
        })
    }

    /// Splits every chain into its first and second half, doubling the number of chains.
    ///
    /// With an odd number of draws the middle draw is dropped.
    pub fn split_halves(&self) -> Self {
        let n = self.n_draws();
        let half = n / 2;
        let first = self.draws.slice(s![.., ..half, ..]);
        let second = self.draws.slice(s![.., (n - half).., ..]);
        let draws = concatenate(Axis(0), &[first, second])
            .expect("Expected halves of equal shape to concatenate");
        Self {
            names: self.names.clone(),
            draws,
        }
    }
}
