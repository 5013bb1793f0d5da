use crate::{
    data::session::SearchSession,
    inference::{InferenceError, SessionFrame},
};

/// The exact forward pass over a session, possibly starting at a later rank.
///
/// Every probability is conditioned on all observations between the start rank and the rank
/// itself, with the start rank being examined for sure.
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardPass {
    start_rank: usize,
    /// Per rank, the probability of the observed click or skip.
    click_probs: Vec<f64>,
    /// Per rank, the probability of its examination, plus one trailing value for the rank
    /// after the session.
    examination_probs: Vec<f64>,
}

impl ForwardPass {
    /// Runs the pass from `start_rank` to the end of the session.
    ///
    /// # Errors
    /// Fails if a skip is observed at a rank which is clicked for sure under the current
    /// parameters.
    pub fn run(
        session: &SearchSession,
        frame: &SessionFrame,
        start_rank: usize,
    ) -> Result<Self, InferenceError> {
        let remaining = session.len().saturating_sub(start_rank);
        let mut click_probs = Vec::with_capacity(remaining);
        let mut examination_probs = Vec::with_capacity(remaining + 1);

        let mut exam = 1.;
        examination_probs.push(exam);
        for (rank, (result, params)) in session
            .results()
            .iter()
            .zip(frame.iter())
            .enumerate()
            .skip(start_rank)
        {
            let attr = params.attractiveness;
            let click_prob = if result.click() {
                let click_prob = attr * exam;
                exam = if result.is_satisfied() {
                    params.continuation_satisfied
                } else {
                    params.continuation_unsatisfied
                };
                click_prob
            } else {
                let click_prob = 1. - attr * exam;
                if click_prob <= 0. {
                    return Err(InferenceError::InconsistentObservation { rank });
                }
                exam = exam * params.continuation_unsatisfied * (1. - attr) / click_prob;
                click_prob
            };
            click_probs.push(click_prob);
            examination_probs.push(exam);
        }

        Ok(Self {
            start_rank,
            click_probs,
            examination_probs,
        })
    }

    pub fn start_rank(&self) -> usize {
        self.start_rank
    }

    /// The probabilities of the observed outcomes, one per rank from the start rank on.
    pub fn click_probs(&self) -> &[f64] {
        &self.click_probs
    }

    /// The examination probabilities, one per rank from the start rank on and one more for the
    /// rank after the session.
    pub fn examination_probs(&self) -> &[f64] {
        &self.examination_probs
    }

    /// The examination probability of an absolute rank.
    pub(crate) fn examination(&self, rank: usize) -> f64 {
        self.examination_probs[rank - self.start_rank]
    }

    /// The probability of a click at each rank given the earlier observations.
    pub fn conditional_click_probs(&self, frame: &SessionFrame) -> Vec<f64> {
        frame
            .iter()
            .skip(self.start_rank)
            .zip(&self.examination_probs)
            .map(|(params, exam)| params.attractiveness * exam)
            .collect()
    }

    /// The log-likelihood of the observed outcomes.
    pub fn log_likelihood(&self) -> f64 {
        self.click_probs.iter().map(|prob| prob.ln()).sum()
    }
}
