use derive_more::Deref;

use crate::{
    data::session::SearchSession,
    params::{ModelParams, Param},
};

/// The parameter values at a single rank of a session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankParams {
    pub attractiveness: f64,
    pub satisfaction: f64,
    pub continuation_satisfied: f64,
    pub continuation_unsatisfied: f64,
    /// Probability to examine the rank, not conditioned on any observation.
    pub examination: f64,
    /// Probability of a click at or below the rank given the rank is examined.
    pub click_after_rank: f64,
}

impl RankParams {
    /// Probability to examine the next rank given this rank is examined.
    fn continuation(&self) -> f64 {
        let RankParams {
            attractiveness: a,
            satisfaction: s,
            continuation_satisfied: g1,
            continuation_unsatisfied: g2,
            ..
        } = *self;
        g2 * ((1. - s) * a + (1. - a)) + g1 * a * s
    }
}

/// The current parameter values for every rank of a session.
///
/// Recomputed whenever a session is processed, the derived examination and click after rank
/// values are not estimated themselves.
#[derive(Clone, Debug, PartialEq, Deref)]
pub struct SessionFrame(Vec<RankParams>);

impl SessionFrame {
    pub fn new(params: &ModelParams, session: &SearchSession) -> Self {
        let query = session.query();
        let ranks = session
            .results()
            .iter()
            .map(|result| {
                let value = |param| params.get_value(param, query, result.id());
                RankParams {
                    attractiveness: value(Param::Attractiveness),
                    satisfaction: value(Param::Satisfaction),
                    continuation_satisfied: value(Param::ContinuationSatisfied),
                    continuation_unsatisfied: value(Param::ContinuationUnsatisfied),
                    examination: 0.,
                    click_after_rank: 0.,
                }
            })
            .collect();

        Self::with_derived(ranks)
    }

    /// Fills in the examination and click after rank values.
    fn with_derived(mut ranks: Vec<RankParams>) -> Self {
        let examination = examination_probs(&ranks);
        let click_after_rank = click_after_rank_probs(&ranks);
        for (rank, params) in ranks.iter_mut().enumerate() {
            params.examination = examination[rank];
            params.click_after_rank = click_after_rank[rank];
        }

        Self(ranks)
    }

    #[cfg(test)]
    pub(crate) fn from_values(values: &[(f64, f64, f64, f64)]) -> Self {
        let ranks = values
            .iter()
            .map(|&(a, s, g1, g2)| RankParams {
                attractiveness: a,
                satisfaction: s,
                continuation_satisfied: g1,
                continuation_unsatisfied: g2,
                examination: 0.,
                click_after_rank: 0.,
            })
            .collect();
        Self::with_derived(ranks)
    }
}

/// Propagates the examination probability over the ranks without looking at any clicks.
///
/// The first rank is always examined, the last value is the examination of the rank after the
/// session.
pub(crate) fn examination_probs(ranks: &[RankParams]) -> Vec<f64> {
    let mut probs = Vec::with_capacity(ranks.len() + 1);
    probs.push(1.);
    for params in ranks {
        let last = probs[probs.len() - 1];
        probs.push(last * params.continuation());
    }
    probs
}

/// Computes the probability of at least one click at or below each rank given its examination.
///
/// Satisfaction requires a click at the rank itself, hence any later click can only follow the
/// unsatisfied continuation.
pub(crate) fn click_after_rank_probs(ranks: &[RankParams]) -> Vec<f64> {
    let mut probs = vec![0.; ranks.len() + 1];
    for (rank, params) in ranks.iter().enumerate().rev() {
        let a = params.attractiveness;
        probs[rank] = a + (1. - a) * params.continuation_unsatisfied * probs[rank + 1];
    }
    probs
}
