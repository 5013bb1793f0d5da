use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The configuration of the click model.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    priors: Priors,
    tolerance: Option<f64>,
}

/// Potential errors of the click model configuration.
#[derive(Copy, Clone, Debug, Display, Error, PartialEq)]
pub enum ConfigError {
    /// Invalid prior, expected value from the open unit interval
    Prior,
    /// Invalid convergence tolerance, expected finite non-negative value
    Tolerance,
}

/// Initial values of the estimated parameters.
///
/// Keyed parameters start from their prior whenever a new (query, document) pair is seen.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Priors {
    pub attractiveness: f64,
    pub satisfaction: f64,
    pub continuation_satisfied: f64,
    pub continuation_unsatisfied: f64,
}

impl Default for Priors {
    fn default() -> Self {
        Self {
            attractiveness: 0.5,
            satisfaction: 0.5,
            continuation_satisfied: 0.5,
            continuation_unsatisfied: 0.5,
        }
    }
}

impl Priors {
    fn is_valid(&self) -> bool {
        [
            self.attractiveness,
            self.satisfaction,
            self.continuation_satisfied,
            self.continuation_unsatisfied,
        ]
        .iter()
        .all(|prior| 0. < *prior && *prior < 1.)
    }
}

impl Config {
    /// The initial parameter values.
    pub fn priors(&self) -> &Priors {
        &self.priors
    }

    /// Sets the priors.
    ///
    /// # Errors
    /// Fails if any prior is outside of the open unit interval.
    pub fn with_priors(self, priors: Priors) -> Result<Self, ConfigError> {
        if priors.is_valid() {
            Ok(Self { priors, ..self })
        } else {
            Err(ConfigError::Prior)
        }
    }

    /// The log-likelihood change below which training stops early, if any.
    pub fn tolerance(&self) -> Option<f64> {
        self.tolerance
    }

    /// Sets the tolerance.
    ///
    /// # Errors
    /// Fails if the tolerance is negative or not finite.
    pub fn with_tolerance(self, tolerance: Option<f64>) -> Result<Self, ConfigError> {
        match tolerance {
            Some(tol) if !tol.is_finite() || tol < 0. => Err(ConfigError::Tolerance),
            tolerance => Ok(Self { tolerance, ..self }),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            priors: Priors::default(),
            tolerance: None,
        }
    }
}
