use crate::{
    data::session::SearchSession,
    inference::{ContinuationFactor, ForwardPass, InferenceError, SessionFrame},
    params::{ModelParams, Param},
};

/// A session together with everything derived from it once per training pass.
struct SessionContext<'s> {
    session: &'s SearchSession,
    frame: SessionFrame,
    forward: ForwardPass,
    last_click_rank: usize,
}

impl<'s> SessionContext<'s> {
    fn new(params: &ModelParams, session: &'s SearchSession) -> Result<Self, InferenceError> {
        let frame = SessionFrame::new(params, session);
        let forward = ForwardPass::run(session, &frame, 0)?;

        Ok(Self {
            session,
            frame,
            forward,
            last_click_rank: session.last_click_rank(),
        })
    }
}

/// The inputs of the update rules at one rank of a session.
struct RankContext<'c, 's> {
    context: &'c SessionContext<'s>,
    rank: usize,
    continuation: ContinuationFactor<'s>,
}

impl Param {
    /// Adds the expected statistics of this parameter at a rank.
    fn update(self, ctx: &RankContext, stats: &mut ModelParams) -> Result<(), InferenceError> {
        let RankContext {
            context,
            rank,
            continuation,
        } = ctx;
        let rank = *rank;
        let query = context.session.query();
        let result = &context.session.results()[rank];
        let params = &context.frame[rank];

        match self {
            Param::Attractiveness => {
                let numerator = if result.click() {
                    1.
                } else if rank >= context.last_click_rank {
                    let denominator = 1. - params.examination * params.click_after_rank;
                    if denominator <= 0. {
                        return Err(InferenceError::DegenerateAttractiveness { rank });
                    }
                    (1. - params.examination) * params.attractiveness / denominator
                } else {
                    0.
                };
                stats.accumulate(self, query, result.id(), numerator, 1.);
            }
            Param::Satisfaction => {
                if result.click() {
                    let numerator = if result.is_satisfied() { 1. } else { 0. };
                    stats.accumulate(self, query, result.id(), numerator, 1.);
                }
            }
            Param::ContinuationSatisfied | Param::ContinuationUnsatisfied => {
                let satisfied = self == Param::ContinuationSatisfied;
                let (numerator, denominator) = continuation.continuation_posterior(satisfied)?;
                stats.accumulate(self, query, result.id(), numerator, denominator);
            }
        }

        Ok(())
    }
}

/// Adds the expected statistics of a session to `stats`.
///
/// The expectations are taken under the current `params`. Returns the log-likelihood of the
/// session under the current parameters.
///
/// # Errors
/// Fails if the session is inconsistent with the current parameters.
pub(crate) fn accumulate_session(
    params: &ModelParams,
    session: &SearchSession,
    stats: &mut ModelParams,
) -> Result<f64, InferenceError> {
    let context = SessionContext::new(params, session)?;

    for rank in 0..session.len() {
        let continuation =
            ContinuationFactor::new(session, &context.frame, &context.forward, rank)?;
        let ctx = RankContext {
            context: &context,
            rank,
            continuation,
        };
        for param in Param::ALL {
            param.update(&ctx, stats)?;
        }
    }

    Ok(context.forward.log_likelihood())
}

#[cfg(test)]
mod tests {
    use test_utils::assert_approx_eq;

    use super::*;
    use crate::{
        config::Priors,
        data::session::{DocumentId, Query},
        tests::session,
    };

    fn accumulate(session: &SearchSession) -> (ModelParams, f64) {
        let params = ModelParams::new(&Priors::default());
        let mut stats = params.empty_like();
        let log_likelihood = accumulate_session(&params, session, &mut stats).unwrap();
        (stats, log_likelihood)
    }

    fn attractiveness(stats: &ModelParams, rank: usize) -> (f64, f64) {
        stats
            .attractiveness()
            .get(&Query::from("q"), &DocumentId(format!("d{}", rank)))
            .unwrap()
            .statistics()
    }

    #[test]
    fn test_attractiveness_after_last_click() {
        let session = session("q", &[(true, Some(true)), (false, None), (false, None)]);
        let (stats, _) = accumulate(&session);

        // uniform priors of 0.5 give examinations 1, 0.5, 0.25 and cars 0.65625, 0.625, 0.5
        assert_approx_eq!(f64, attractiveness(&stats, 0), (1., 1.));
        assert_approx_eq!(
            f64,
            attractiveness(&stats, 1),
            (0.5 * 0.5 / (1. - 0.5 * 0.625), 1.),
            epsilon = 1e-12,
        );
        assert_approx_eq!(
            f64,
            attractiveness(&stats, 2),
            (0.75 * 0.5 / (1. - 0.25 * 0.5), 1.),
            epsilon = 1e-12,
        );
    }

    #[test]
    fn test_attractiveness_before_last_click() {
        let session = session("q", &[(false, None), (true, Some(false))]);
        let (stats, _) = accumulate(&session);

        assert_approx_eq!(f64, attractiveness(&stats, 0), (0., 1.));
        assert_approx_eq!(f64, attractiveness(&stats, 1), (1., 1.));
    }

    #[test]
    fn test_attractiveness_without_clicks() {
        // nothing is clicked, hence no rank is at or after the last click
        let session = session("q", &[(false, None), (false, None)]);
        let (stats, _) = accumulate(&session);

        assert_approx_eq!(f64, attractiveness(&stats, 0), (0., 1.));
        assert_approx_eq!(f64, attractiveness(&stats, 1), (0., 1.));
    }

    #[test]
    fn test_satisfaction_counts_clicks() {
        let session = session(
            "q",
            &[(true, Some(true)), (false, None), (true, Some(false)), (true, Some(false))],
        );
        let (stats, _) = accumulate(&session);
        let satisfaction = |rank: usize| {
            stats
                .satisfaction()
                .get(&"q".into(), &DocumentId(format!("d{}", rank)))
                .map(|param| param.statistics())
        };

        assert_eq!(satisfaction(0), Some((1., 1.)));
        assert_eq!(satisfaction(1), None);
        assert_eq!(satisfaction(2), Some((0., 1.)));
        assert_eq!(satisfaction(3), Some((0., 1.)));
    }

    #[test]
    fn test_continuation_after_single_unsatisfied_click() {
        let session = session("q", &[(true, Some(false))]);
        let (stats, log_likelihood) = accumulate(&session);

        assert_approx_eq!(
            f64,
            stats.continuation_unsatisfied().param().statistics(),
            (0.5, 1.),
            epsilon = 1e-12,
        );
        assert_approx_eq!(
            f64,
            stats.continuation_satisfied().param().statistics(),
            (0., 0.),
        );
        assert_approx_eq!(f64, log_likelihood, 0.5f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_continuation_sums_posteriors_over_ranks() {
        let session = session(
            "q",
            &[(false, None), (true, Some(true)), (false, None), (true, Some(false))],
        );
        let (stats, _) = accumulate(&session);

        let params = ModelParams::new(&Priors::default());
        let frame = SessionFrame::new(&params, &session);
        let forward = ForwardPass::run(&session, &frame, 0).unwrap();
        let (satisfied, unsatisfied) = (0..session.len())
            .map(|rank| {
                let factor = ContinuationFactor::new(&session, &frame, &forward, rank).unwrap();
                (
                    factor.continuation_posterior(true).unwrap(),
                    factor.continuation_posterior(false).unwrap(),
                )
            })
            .fold(((0., 0.), (0., 0.)), |(sat, unsat), (rank_sat, rank_unsat)| {
                (
                    (sat.0 + rank_sat.0, sat.1 + rank_sat.1),
                    (unsat.0 + rank_unsat.0, unsat.1 + rank_unsat.1),
                )
            });

        assert_approx_eq!(
            f64,
            stats.continuation_satisfied().param().statistics(),
            satisfied,
            epsilon = 1e-12,
        );
        assert_approx_eq!(
            f64,
            stats.continuation_unsatisfied().param().statistics(),
            unsatisfied,
            epsilon = 1e-12,
        );
        // only the satisfying click is followed by the satisfied continuation
        assert!(satisfied.1 > 0.);
        assert!(satisfied.1 < unsatisfied.1);
    }

    #[test]
    fn test_impossible_session_is_an_error() {
        let mut params = ModelParams::new(&Priors::default());
        // a certainly attractive and certainly examined document can't be skipped
        let mut stats = params.empty_like();
        let (query, document) = (Query::from("q"), DocumentId::from("d1"));
        stats.accumulate(Param::Attractiveness, &query, &document, 1., 1.);
        stats.accumulate(Param::ContinuationUnsatisfied, &query, &document, 1., 1.);
        stats.accumulate(Param::ContinuationSatisfied, &query, &document, 1., 1.);
        params.merge(stats);
        params.finalize();

        let session = session("q", &[(true, Some(true)), (false, None)]);
        let mut stats = params.empty_like();
        assert_eq!(
            accumulate_session(&params, &session, &mut stats).unwrap_err(),
            InferenceError::InconsistentObservation { rank: 1 },
        );
    }
}
