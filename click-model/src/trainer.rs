use std::{error::Error as StdError, ops::ControlFlow};

use log::{debug, info, trace};
use thiserror::Error;

use crate::{
    data::session::SearchSession,
    inference::{accumulate_session, InferenceError},
    params::ModelParams,
};

#[cfg(feature = "multithreaded")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

/// Trainer running expectation-maximization over a corpus of sessions.
pub struct EmTrainer<'p, 's, C>
where
    C: TrainingController,
{
    params: &'p mut ModelParams,
    sessions: &'s [SearchSession],
    controller: C,
    tolerance: Option<f64>,
}

impl<'p, 's, C> EmTrainer<'p, 's, C>
where
    C: TrainingController,
{
    /// Creates a new `EmTrainer` instance.
    ///
    /// Training stops early once the log-likelihood changes by at most `tolerance` between two
    /// iterations.
    pub fn new(
        params: &'p mut ModelParams,
        sessions: &'s [SearchSession],
        controller: C,
        tolerance: Option<f64>,
    ) -> Self {
        Self {
            params,
            sessions,
            controller,
            tolerance,
        }
    }

    /// Trains for the given number of iterations.
    ///
    /// The parameters are updated after every full pass over the sessions, an error leaves them
    /// at the state of the last completed iteration.
    pub fn train(mut self, iterations: usize) -> Result<C, TrainingError<C::Error>> {
        self.controller
            .begin_of_training(iterations)
            .map_err(TrainingError::Control)?;

        let mut previous: Option<f64> = None;
        for iteration in 0..iterations {
            self.controller
                .begin_of_iteration(iteration, self.sessions.len())
                .map_err(TrainingError::Control)?;

            let (stats, log_likelihood) = expectation(self.params, self.sessions)?;
            self.params.merge(stats);
            self.params.finalize();

            let converged = matches!(
                (self.tolerance, previous),
                (Some(tolerance), Some(previous)) if (log_likelihood - previous).abs() <= tolerance
            );
            previous = Some(log_likelihood);

            let flow = self
                .controller
                .end_of_iteration(iteration, log_likelihood, self.params)
                .map_err(TrainingError::Control)?;
            if converged {
                debug!("Converged after iteration #{}", iteration);
                break;
            }
            if let ControlFlow::Break(()) = flow {
                debug!("Training stopped after iteration #{}", iteration);
                break;
            }
        }

        self.controller
            .end_of_training()
            .map_err(TrainingError::Control)?;
        Ok(self.controller)
    }
}

/// Collects the expected statistics of all sessions under the current parameters.
///
/// Returns the statistics together with the corpus log-likelihood under the current parameters.
fn expectation(
    params: &ModelParams,
    sessions: &[SearchSession],
) -> Result<(ModelParams, f64), InferenceError> {
    trace!("Expectation over {} sessions", sessions.len());

    #[cfg(not(feature = "multithreaded"))]
    let outcome = sessions.iter().try_fold(
        (params.empty_like(), 0.),
        |(mut stats, log_likelihood), session| {
            accumulate_session(params, session, &mut stats)
                .map(|session_likelihood| (stats, log_likelihood + session_likelihood))
        },
    );

    // every worker accumulates into its own statistics, which are summed at the end
    #[cfg(feature = "multithreaded")]
    let outcome = sessions
        .par_iter()
        .try_fold(
            || (params.empty_like(), 0.),
            |(mut stats, log_likelihood), session| {
                accumulate_session(params, session, &mut stats)
                    .map(|session_likelihood| (stats, log_likelihood + session_likelihood))
            },
        )
        .try_reduce(
            || (params.empty_like(), 0.),
            |(mut stats, log_likelihood), (other, other_likelihood)| {
                stats.merge(other);
                Ok((stats, log_likelihood + other_likelihood))
            },
        );

    outcome
}

/// A trait providing various callbacks used during training.
#[cfg_attr(test, mockall::automock(type Error = std::convert::Infallible;))]
pub trait TrainingController {
    type Error: StdError + 'static;

    /// Called at the beginning of training.
    fn begin_of_training(&mut self, nr_iterations: usize) -> Result<(), Self::Error>;

    /// Called at the beginning of each iteration.
    fn begin_of_iteration(
        &mut self,
        iteration: usize,
        nr_sessions: usize,
    ) -> Result<(), Self::Error>;

    /// Called at the end of each iteration.
    ///
    /// `log_likelihood` is the corpus log-likelihood under the parameters the iteration started
    /// with, `params` are the updated parameters. Returning `Break` stops the training.
    fn end_of_iteration(
        &mut self,
        iteration: usize,
        log_likelihood: f64,
        params: &ModelParams,
    ) -> Result<ControlFlow<()>, Self::Error>;

    /// Called after training finished.
    fn end_of_training(&mut self) -> Result<(), Self::Error>;
}

/// Training controller which only logs the progress.
#[derive(Debug, Default)]
pub struct LogController {
    log_likelihoods: Vec<f64>,
}

impl LogController {
    /// The corpus log-likelihood of each finished iteration.
    pub fn log_likelihoods(&self) -> &[f64] {
        &self.log_likelihoods
    }
}

impl TrainingController for LogController {
    type Error = std::convert::Infallible;

    fn begin_of_training(&mut self, nr_iterations: usize) -> Result<(), Self::Error> {
        info!("Beginning of training for {} iterations", nr_iterations);
        Ok(())
    }

    fn begin_of_iteration(
        &mut self,
        iteration: usize,
        nr_sessions: usize,
    ) -> Result<(), Self::Error> {
        trace!(
            "Beginning of iteration #{} (#sessions {})",
            iteration,
            nr_sessions,
        );
        Ok(())
    }

    fn end_of_iteration(
        &mut self,
        iteration: usize,
        log_likelihood: f64,
        params: &ModelParams,
    ) -> Result<ControlFlow<()>, Self::Error> {
        debug!(
            "End of iteration #{}, log-likelihood={}, cont_sat={}, cont_nosat={}",
            iteration,
            log_likelihood,
            params.continuation_satisfied().value(),
            params.continuation_unsatisfied().value(),
        );
        self.log_likelihoods.push(log_likelihood);
        Ok(ControlFlow::Continue(()))
    }

    fn end_of_training(&mut self) -> Result<(), Self::Error> {
        info!("End of training");
        Ok(())
    }
}

/// An error which can occur during training.
///
/// This is either an error from the inference or the `TrainingController`.
#[derive(Error, Debug)]
pub enum TrainingError<CE>
where
    CE: StdError + 'static,
{
    #[error("Inference over the sessions failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("Training controller produced an error: {0}")]
    Control(#[source] CE),
}

#[cfg(test)]
mod tests {
    use mockall::{predicate::eq, Sequence};
    use test_utils::assert_approx_eq;

    use super::*;
    use crate::{
        config::Priors,
        data::session::{DocumentId, Query},
        params::Param,
        tests::session,
    };

    fn corpus() -> Vec<SearchSession> {
        vec![
            session("q", &[(true, Some(true)), (false, None), (false, None)]),
            session("q", &[(false, None), (true, Some(false)), (true, Some(true))]),
            session("q", &[(true, Some(false)), (false, None), (false, None)]),
            session("r", &[(false, None), (false, None), (true, Some(false))]),
        ]
    }

    #[test]
    fn test_callbacks_are_called_in_order() {
        let sessions = corpus();
        let mut params = ModelParams::new(&Priors::default());
        let mut controller = MockTrainingController::new();
        let mut seq = Sequence::new();

        controller
            .expect_begin_of_training()
            .with(eq(2))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        for iteration in 0..2 {
            controller
                .expect_begin_of_iteration()
                .with(eq(iteration), eq(4))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
            controller
                .expect_end_of_iteration()
                .withf(move |it, log_likelihood, _| *it == iteration && *log_likelihood < 0.)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _, _| Ok(ControlFlow::Continue(())));
        }
        controller
            .expect_end_of_training()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        EmTrainer::new(&mut params, &sessions, controller, None)
            .train(2)
            .unwrap();
    }

    #[test]
    fn test_controller_can_stop_training() {
        let sessions = corpus();
        let mut params = ModelParams::new(&Priors::default());
        let mut controller = MockTrainingController::new();

        controller
            .expect_begin_of_training()
            .returning(|_| Ok(()));
        controller
            .expect_begin_of_iteration()
            .times(1)
            .returning(|_, _| Ok(()));
        controller
            .expect_end_of_iteration()
            .times(1)
            .returning(|_, _, _| Ok(ControlFlow::Break(())));
        controller
            .expect_end_of_training()
            .times(1)
            .returning(|| Ok(()));

        EmTrainer::new(&mut params, &sessions, controller, None)
            .train(10)
            .unwrap();
    }

    #[test]
    fn test_first_iteration_updates_params() {
        let sessions = corpus();
        let mut params = ModelParams::new(&Priors::default());
        EmTrainer::new(&mut params, &sessions, LogController::default(), None)
            .train(1)
            .unwrap();

        let (query, document) = (Query::from("q"), DocumentId::from("d0"));
        // d0 of "q" is clicked in two of three sessions
        assert_approx_eq!(
            f64,
            params.attractiveness().get(&query, &document).unwrap().value(),
            2. / 3.,
        );
        // and satisfies one of the two clicks
        assert_approx_eq!(
            f64,
            params.satisfaction().get(&query, &document).unwrap().value(),
            0.5,
        );
        for value in [
            params.continuation_satisfied().value(),
            params.continuation_unsatisfied().value(),
        ] {
            assert!((0. ..=1.).contains(&value));
        }
    }

    #[test]
    fn test_convergence_stops_early() {
        // single rank sessions are fitted exactly after the first iteration
        let sessions = vec![
            session("q", &[(true, Some(true))]),
            session("q", &[(true, Some(false))]),
            session("q", &[(true, Some(true))]),
            session("q", &[(false, None)]),
        ];
        let mut params = ModelParams::new(&Priors::default());
        let controller = EmTrainer::new(&mut params, &sessions, LogController::default(), Some(1e-9))
            .train(10)
            .unwrap();

        assert_eq!(controller.log_likelihoods().len(), 3);
    }

    #[test]
    fn test_log_likelihood_does_not_decrease() {
        let sessions = vec![
            session("q", &[(true, Some(true)), (false, None), (false, None)]),
            session("q", &[(true, Some(true)), (true, Some(false)), (false, None)]),
            session("q", &[(false, None), (true, Some(false)), (false, None)]),
            session("q", &[(true, Some(false)), (false, None), (true, Some(true))]),
            session("p", &[(true, Some(true)), (false, None)]),
            session("p", &[(false, None), (true, Some(false))]),
            session("p", &[(true, Some(false)), (true, Some(true))]),
            session("p", &[(false, None), (false, None)]),
        ];
        let mut params = ModelParams::new(&Priors::default());
        let controller = EmTrainer::new(&mut params, &sessions, LogController::default(), None)
            .train(15)
            .unwrap();

        let log_likelihoods = controller.log_likelihoods();
        assert_eq!(log_likelihoods.len(), 15);
        assert!(log_likelihoods[14] > log_likelihoods[0]);
        for pair in log_likelihoods.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-12, "{:?}", log_likelihoods);
        }
    }

    #[test]
    fn test_inference_error_is_returned() {
        // a certainly attractive first rank can't be skipped
        let sessions = vec![session("q", &[(false, None)])];
        let mut params = ModelParams::new(&Priors::default());
        let mut stats = params.empty_like();
        stats.accumulate(
            Param::Attractiveness,
            &"q".into(),
            &"d0".into(),
            1.,
            1.,
        );
        params.merge(stats);
        params.finalize();

        let error = EmTrainer::new(&mut params, &sessions, LogController::default(), None)
            .train(1)
            .unwrap_err();
        assert!(matches!(
            error,
            TrainingError::Inference(InferenceError::InconsistentObservation { rank: 0 }),
        ));
    }
}
