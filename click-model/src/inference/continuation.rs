use itertools::iproduct;

use crate::{
    data::session::{SearchResult, SearchSession},
    inference::{ForwardPass, InferenceError, RankParams, SessionFrame},
};

/// A product of probabilities kept in log space, `None` once a factor is zero.
#[derive(Clone, Copy)]
struct LogProb(Option<f64>);

impl LogProb {
    const ONE: Self = Self(Some(0.));
    const IMPOSSIBLE: Self = Self(None);

    fn times(self, prob: f64) -> Self {
        match self.0 {
            Some(log) if prob > 0. => Self(Some(log + prob.ln())),
            _ => Self::IMPOSSIBLE,
        }
    }

    fn times_log(self, log_prob: Option<f64>) -> Self {
        Self(self.0.zip(log_prob).map(|(log, other)| log + other))
    }

    fn exp(self) -> f64 {
        self.0.map_or(0., f64::exp)
    }
}

/// The unnormalized joint probability of the hidden state around a rank.
///
/// The hidden triple is the examination of the rank, its satisfaction and the examination of the
/// next rank. The factor is tied to the observations of one session and a snapshot of the
/// current parameters.
pub struct ContinuationFactor<'s> {
    rank: usize,
    result: &'s SearchResult,
    params: RankParams,
    /// Examination of the rank given the earlier observations.
    examination: f64,
    /// Whether any rank after this one was clicked.
    click_after: bool,
    /// Log-likelihood of the observations after this rank given the next rank is examined.
    tail_log_likelihood: Option<f64>,
}

impl<'s> ContinuationFactor<'s> {
    /// Creates the factor of a rank.
    ///
    /// `forward` is the forward pass over the whole session, the pass over the tail of the
    /// session is computed here. A tail which can't be observed once the next rank is examined
    /// only rules out the hidden states examining it.
    ///
    /// # Errors
    /// Fails if the pass over the tail fails for any other reason.
    pub fn new(
        session: &'s SearchSession,
        frame: &SessionFrame,
        forward: &ForwardPass,
        rank: usize,
    ) -> Result<Self, InferenceError> {
        let tail_log_likelihood = if rank + 1 < session.len() {
            match ForwardPass::run(session, frame, rank + 1) {
                Ok(tail) => {
                    let log_likelihood = tail.log_likelihood();
                    (log_likelihood > f64::NEG_INFINITY).then(|| log_likelihood)
                }
                Err(InferenceError::InconsistentObservation { .. }) => None,
                Err(error) => return Err(error),
            }
        } else {
            Some(0.)
        };

        Ok(Self {
            rank,
            result: &session.results()[rank],
            params: frame[rank],
            examination: forward.examination(rank),
            click_after: session.has_click_after(rank),
            tail_log_likelihood,
        })
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The joint probability of the hidden `examined`, `satisfied` and `next_examined` state
    /// together with the observations from this rank on.
    pub fn factor(&self, examined: bool, satisfied: bool, next_examined: bool) -> f64 {
        let RankParams {
            attractiveness,
            satisfaction,
            continuation_satisfied,
            continuation_unsatisfied,
            ..
        } = self.params;
        let transition = |continuation: f64| {
            if next_examined {
                continuation
            } else {
                1. - continuation
            }
        };

        let mut log_prob = LogProb::ONE.times(if examined {
            self.examination
        } else {
            1. - self.examination
        });

        if !self.result.click() {
            if self.result.is_satisfied() || satisfied {
                return 0.;
            }
            if examined {
                log_prob = log_prob
                    .times(1. - attractiveness)
                    .times(transition(continuation_unsatisfied));
            } else if next_examined {
                return 0.;
            }
        } else {
            if !examined || satisfied != self.result.is_satisfied() {
                return 0.;
            }
            log_prob = log_prob.times(attractiveness);
            log_prob = if satisfied {
                log_prob
                    .times(satisfaction)
                    .times(transition(continuation_satisfied))
            } else {
                log_prob
                    .times(1. - satisfaction)
                    .times(transition(continuation_unsatisfied))
            };
        }

        if !next_examined {
            if self.click_after {
                return 0.;
            }
        } else {
            log_prob = log_prob.times_log(self.tail_log_likelihood);
        }

        log_prob.exp()
    }

    /// The sum of the factor over all hidden states.
    pub fn partition(&self) -> f64 {
        iproduct!([false, true], [false, true], [false, true])
            .map(|(examined, satisfied, next_examined)| {
                self.factor(examined, satisfied, next_examined)
            })
            .sum()
    }

    /// The posterior of the next rank's examination given the rank is examined with the given
    /// satisfaction.
    ///
    /// Returns the expected numerator and denominator contributions of the matching continuation
    /// parameter.
    ///
    /// # Errors
    /// Fails if the factor has zero mass over all hidden states.
    pub fn continuation_posterior(&self, satisfied: bool) -> Result<(f64, f64), InferenceError> {
        let partition = self.partition();
        if partition <= 0. {
            return Err(InferenceError::ZeroPartition { rank: self.rank });
        }

        let stop = self.factor(true, satisfied, false) / partition;
        let proceed = self.factor(true, satisfied, true) / partition;
        Ok((proceed, stop + proceed))
    }
}
