//! Named parameter values used as ground truth for data generation and recovery checks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DiagnosticsError, Result};

/// Conventional name of the regression intercept.
pub const INTERCEPT: &str = "intercept";
/// Conventional name of the regression slope.
pub const SLOPE: &str = "slope";
/// Conventional name of the residual noise scale.
pub const SIGMA: &str = "sigma";

/// An ordered mapping from parameter name to its true value.
///
/// Iteration order is the lexicographic order of the names, so anything derived
/// from a `ParameterSet` is deterministic.
///
/// ```rust
/// use regression_diagnostics::params::ParameterSet;
///
/// let truth = ParameterSet::linear(1.0, 1.2).with("sigma", 0.5);
/// assert_eq!(truth.get("slope"), Some(1.2));
/// assert_eq!(truth.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, f64>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A parameter set holding `intercept` and `slope`.
    pub fn linear(intercept: f64, slope: f64) -> Self {
        Self::new().with(INTERCEPT, intercept).with(SLOPE, slope)
    }

    /// Returns a copy of this set with `name` bound to `value`.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Looks up a value that an operation cannot proceed without.
    pub(crate) fn require(&self, name: &'static str) -> Result<f64> {
        let value = self.get(name).ok_or_else(|| {
            DiagnosticsError::invalid(name, "missing from the true parameter set")
        })?;
        if !value.is_finite() {
            return Err(DiagnosticsError::invalid(
                name,
                format!("must be finite, got {value}"),
            ));
        }
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
