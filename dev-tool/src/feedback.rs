use std::{convert::Infallible, ops::ControlFlow, time::Instant};

use click_model::{ModelParams, TrainingController};
use indicatif::{FormattedDuration, ProgressBar, ProgressStyle};
use log::{debug, info, trace};

/// Training controller for usage in a CLI setup.
pub(crate) struct CliTrainingController<F>
where
    F: TrainingFeedback,
{
    /// Implementation used to hint the training progress to the user.
    training_feedback: F,
    /// The corpus log-likelihood of each finished iteration.
    log_likelihoods: Vec<f64>,
    /// The time at which the training started.
    start_time: Option<Instant>,
}

impl<F> CliTrainingController<F>
where
    F: TrainingFeedback,
{
    pub(crate) fn new(training_feedback: F) -> Self {
        Self {
            training_feedback,
            log_likelihoods: Vec::new(),
            start_time: None,
        }
    }

    pub(crate) fn log_likelihoods(&self) -> &[f64] {
        &self.log_likelihoods
    }
}

impl<F> TrainingController for CliTrainingController<F>
where
    F: TrainingFeedback,
{
    type Error = Infallible;

    fn begin_of_training(&mut self, nr_iterations: usize) -> Result<(), Self::Error> {
        self.start_time = Some(Instant::now());
        info!("Beginning of training for {}", nr_iterations);

        self.training_feedback.start_feedback(nr_iterations as u64);
        Ok(())
    }

    fn begin_of_iteration(
        &mut self,
        iteration: usize,
        nr_sessions: usize,
    ) -> Result<(), Self::Error> {
        trace!(
            "Beginning of iteration #{:0>4} (#sessions {})",
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
            "End of iteration #{:0>4}, log-likelihood={}, cont_sat={}, cont_nosat={}",
            iteration,
            log_likelihood,
            params.continuation_satisfied().value(),
            params.continuation_unsatisfied().value(),
        );

        self.log_likelihoods.push(log_likelihood);
        self.training_feedback.hint_progress(1, log_likelihood);
        Ok(ControlFlow::Continue(()))
    }

    fn end_of_training(&mut self) -> Result<(), Self::Error> {
        self.training_feedback.end_feedback();
        let elapsed = self.start_time.map(|t| t.elapsed()).unwrap_or_default();
        info!("End of training. Duration: {}", FormattedDuration(elapsed));
        Ok(())
    }
}

pub(crate) trait TrainingFeedback {
    fn start_feedback(&mut self, max_progress: u64);
    fn end_feedback(&mut self);

    fn hint_progress(&self, inc_progress: u64, log_likelihood: f64);
}

/// Gives no feedback.
pub(crate) struct NoFeedback;

impl TrainingFeedback for NoFeedback {
    fn start_feedback(&mut self, _max_progress: u64) {}

    fn end_feedback(&mut self) {}

    fn hint_progress(&self, _inc_progress: u64, _log_likelihood: f64) {}
}

/// Training feedback through a progress bar over the iterations.
pub(crate) struct ProgressBarTrainingFeedback {
    train_progress_bar: ProgressBar,
}

impl ProgressBarTrainingFeedback {
    pub(crate) fn new() -> Self {
        let train_progress_bar = ProgressBar::new(0);
        train_progress_bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "Iterations: [{bar:30.green}] {percent:>3}% ({pos:>5}/{len:>5}) {elapsed_precise} {msg}",
                )
                .progress_chars("=> "),
        );

        Self { train_progress_bar }
    }
}

impl TrainingFeedback for ProgressBarTrainingFeedback {
    fn start_feedback(&mut self, max_progress: u64) {
        self.train_progress_bar.set_position(0);
        self.train_progress_bar.set_length(max_progress);
        self.train_progress_bar.enable_steady_tick(100);
    }

    fn end_feedback(&mut self) {
        self.train_progress_bar.finish_at_current_pos();
    }

    fn hint_progress(&self, inc_progress: u64, log_likelihood: f64) {
        self.train_progress_bar.inc(inc_progress);
        self.train_progress_bar
            .set_message(format!("log-likelihood={:.5}", log_likelihood));
    }
}

#[cfg(test)]
mod tests {
    use click_model::{ClickModel, Config};
    use test_utils::sessions::click_log;

    use super::*;
    use crate::sessions::load_sessions;

    #[test]
    fn test_controller_collects_log_likelihoods() {
        let sessions = load_sessions(click_log().unwrap()).unwrap();
        let mut model = ClickModel::new(Config::default());
        let controller = model
            .train_with(&sessions, 8, CliTrainingController::new(NoFeedback))
            .unwrap();

        let log_likelihoods = controller.log_likelihoods();
        assert_eq!(log_likelihoods.len(), 8);
        assert!(log_likelihoods.iter().all(|ll| ll.is_finite() && *ll < 0.));
        assert!(log_likelihoods[7] > log_likelihoods[0]);
    }
}
