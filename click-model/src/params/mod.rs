//! Storage of the estimated parameters and their sufficient statistics.

mod container;
mod store;

pub use container::{QueryDocumentParams, SingleParam};
pub use store::{ModelParams, Param};

use serde::{Deserialize, Serialize};

use crate::data::session::{DocumentId, Query};

/// A probability estimated by expectation-maximization.
///
/// The current value is kept next to the statistics collected for the next one. The statistics
/// are only turned into a new value by [`finalize`](ParamEm::finalize).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamEm {
    value: f64,
    numerator: f64,
    denominator: f64,
}

impl ParamEm {
    pub(crate) fn new(value: f64) -> Self {
        Self {
            value,
            numerator: 0.,
            denominator: 0.,
        }
    }

    /// The current estimate.
    pub fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn add(&mut self, numerator: f64, denominator: f64) {
        self.numerator += numerator;
        self.denominator += denominator;
    }

    /// Adds the statistics of `other`, its value is ignored.
    pub(crate) fn absorb(&mut self, other: &ParamEm) {
        self.add(other.numerator, other.denominator);
    }

    /// Sets the value from the collected statistics and resets them.
    ///
    /// Without any statistics the value stays unchanged.
    pub(crate) fn finalize(&mut self) {
        if self.denominator > 0. {
            self.value = self.numerator / self.denominator;
        }
        self.numerator = 0.;
        self.denominator = 0.;
    }

    #[cfg(test)]
    pub(crate) fn statistics(&self) -> (f64, f64) {
        (self.numerator, self.denominator)
    }
}

/// Access to a parameter independent of how it is keyed.
///
/// Global parameters ignore the query and document.
pub trait ParamContainer {
    /// The current value for the query and document, falls back to the prior.
    fn get_value(&self, query: &Query, document: &DocumentId) -> f64;

    /// Adds to the statistics for the query and document.
    fn accumulate(
        &mut self,
        query: &Query,
        document: &DocumentId,
        numerator: f64,
        denominator: f64,
    );

    /// Adds all statistics collected by `other`.
    fn merge(&mut self, other: Self)
    where
        Self: Sized;

    /// Turns the statistics into the next values.
    fn finalize(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_divides_statistics() {
        let mut param = ParamEm::new(0.5);
        param.add(1., 4.);
        param.add(0.5, 1.);
        assert_eq!(param.value(), 0.5);

        param.finalize();
        assert_eq!(param.value(), 0.3);
        assert_eq!(param.statistics(), (0., 0.));
    }

    #[test]
    fn test_finalize_without_statistics_keeps_value() {
        let mut param = ParamEm::new(0.25);
        param.finalize();
        assert_eq!(param.value(), 0.25);
        assert!(!param.value().is_nan());
    }

    #[test]
    fn test_absorb_ignores_value() {
        let mut param = ParamEm::new(0.5);
        let mut other = ParamEm::new(0.9);
        other.add(2., 3.);
        param.absorb(&other);
        assert_eq!(param.value(), 0.5);
        assert_eq!(param.statistics(), (2., 3.));
    }
}
