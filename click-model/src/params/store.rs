use serde::{Deserialize, Serialize};

use crate::{
    config::Priors,
    data::session::{DocumentId, Query},
    params::{ParamContainer, QueryDocumentParams, SingleParam},
};

/// The estimated parameters of the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    /// Probability of a click on an examined document.
    Attractiveness,
    /// Probability that a clicked document satisfies.
    Satisfaction,
    /// Probability to examine the next result after a satisfying one.
    ContinuationSatisfied,
    /// Probability to examine the next result after a not satisfying one.
    ContinuationUnsatisfied,
}

impl Param {
    pub const ALL: [Param; 4] = [
        Param::Attractiveness,
        Param::Satisfaction,
        Param::ContinuationSatisfied,
        Param::ContinuationUnsatisfied,
    ];
}

/// The parameter store, owning all estimated parameters.
///
/// The same type serves as the per-worker accumulator of a training pass, see
/// [`empty_like`](ModelParams::empty_like) and [`merge`](ModelParams::merge).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    attractiveness: QueryDocumentParams,
    satisfaction: QueryDocumentParams,
    continuation_satisfied: SingleParam,
    continuation_unsatisfied: SingleParam,
}

impl ModelParams {
    pub fn new(priors: &Priors) -> Self {
        Self {
            attractiveness: QueryDocumentParams::new(priors.attractiveness),
            satisfaction: QueryDocumentParams::new(priors.satisfaction),
            continuation_satisfied: SingleParam::new(priors.continuation_satisfied),
            continuation_unsatisfied: SingleParam::new(priors.continuation_unsatisfied),
        }
    }

    /// An accumulator without any statistics sharing the priors of these parameters.
    pub(crate) fn empty_like(&self) -> Self {
        Self {
            attractiveness: self.attractiveness.empty_like(),
            satisfaction: self.satisfaction.empty_like(),
            continuation_satisfied: self.continuation_satisfied.empty_like(),
            continuation_unsatisfied: self.continuation_unsatisfied.empty_like(),
        }
    }

    pub fn attractiveness(&self) -> &QueryDocumentParams {
        &self.attractiveness
    }

    pub fn satisfaction(&self) -> &QueryDocumentParams {
        &self.satisfaction
    }

    pub fn continuation_satisfied(&self) -> &SingleParam {
        &self.continuation_satisfied
    }

    pub fn continuation_unsatisfied(&self) -> &SingleParam {
        &self.continuation_unsatisfied
    }

    /// The current value of a parameter for the query and document.
    pub fn get_value(&self, param: Param, query: &Query, document: &DocumentId) -> f64 {
        match param {
            Param::Attractiveness => self.attractiveness.get_value(query, document),
            Param::Satisfaction => self.satisfaction.get_value(query, document),
            Param::ContinuationSatisfied => self.continuation_satisfied.get_value(query, document),
            Param::ContinuationUnsatisfied => {
                self.continuation_unsatisfied.get_value(query, document)
            }
        }
    }

    /// Adds to the statistics of a parameter for the query and document.
    pub(crate) fn accumulate(
        &mut self,
        param: Param,
        query: &Query,
        document: &DocumentId,
        numerator: f64,
        denominator: f64,
    ) {
        match param {
            Param::Attractiveness => {
                self.attractiveness
                    .accumulate(query, document, numerator, denominator)
            }
            Param::Satisfaction => {
                self.satisfaction
                    .accumulate(query, document, numerator, denominator)
            }
            Param::ContinuationSatisfied => {
                self.continuation_satisfied
                    .accumulate(query, document, numerator, denominator)
            }
            Param::ContinuationUnsatisfied => {
                self.continuation_unsatisfied
                    .accumulate(query, document, numerator, denominator)
            }
        }
    }

    /// Adds all statistics collected by `other`.
    pub(crate) fn merge(&mut self, other: Self) {
        self.attractiveness.merge(other.attractiveness);
        self.satisfaction.merge(other.satisfaction);
        self.continuation_satisfied
            .merge(other.continuation_satisfied);
        self.continuation_unsatisfied
            .merge(other.continuation_unsatisfied);
    }

    /// Turns the collected statistics into the next parameter values.
    pub(crate) fn finalize(&mut self) {
        self.attractiveness.finalize();
        self.satisfaction.finalize();
        self.continuation_satisfied.finalize();
        self.continuation_unsatisfied.finalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_value_falls_back_to_priors() {
        let priors = Priors {
            attractiveness: 0.1,
            satisfaction: 0.2,
            continuation_satisfied: 0.3,
            continuation_unsatisfied: 0.4,
        };
        let params = ModelParams::new(&priors);
        let values = Param::ALL
            .iter()
            .map(|param| params.get_value(*param, &"q".into(), &"d".into()))
            .collect::<Vec<_>>();
        assert_eq!(values, [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_merge_then_finalize() {
        let (query, document) = (Query::from("q"), DocumentId::from("d"));
        let mut params = ModelParams::new(&Priors::default());
        let mut stats = params.empty_like();
        for param in Param::ALL {
            stats.accumulate(param, &query, &document, 1., 4.);
        }
        // the store itself is unaffected until the statistics are merged
        assert_eq!(params, ModelParams::new(&Priors::default()));

        params.merge(stats);
        params.finalize();
        for param in Param::ALL {
            assert_eq!(params.get_value(param, &query, &document), 0.25);
        }
        assert_eq!(params.attractiveness().len(), 1);
    }
}
