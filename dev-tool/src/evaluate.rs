use std::path::PathBuf;

use anyhow::{bail, Context, Error};
use click_model::{ClickModel, SearchSession};
use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use structopt::StructOpt;

use crate::{
    exit_code::{NON_FATAL_ERROR, NO_ERROR},
    sessions::load_sessions,
    utils::{load_model, progress_spin_until_done},
};

/// Computes the log-likelihood of a click log under trained parameters.
#[derive(StructOpt, Debug)]
pub struct EvaluateCmd {
    /// File containing trained parameters.
    #[structopt(long)]
    params: PathBuf,

    /// A line delimited json file containing the sessions to evaluate on.
    #[structopt(long)]
    sessions: PathBuf,
}

impl EvaluateCmd {
    pub fn run(self) -> Result<i32, Error> {
        let Self { params, sessions } = self;

        let model = load_model(params)?;
        let sessions = progress_spin_until_done("Loading sessions", || {
            load_sessions(&sessions).context("Loading the click log failed.")
        })?;

        let progress_bar = ProgressBar::new(sessions.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("Evaluation: [{bar:27.green}] {percent:>3}% ({pos:>5}/{len:>5}) {elapsed_precise}")
                .progress_chars("=> "),
        );
        progress_bar.tick();

        let evaluation = run_evaluation(&model, &sessions, || progress_bar.inc(1))?;

        progress_bar.finish();
        match evaluation.mean_log_likelihood() {
            Some(mean_log_likelihood) => println!(
                "log_likelihood={} mean_log_likelihood={} impossible_sessions={}",
                evaluation.log_likelihood, mean_log_likelihood, evaluation.nr_impossible,
            ),
            None => println!(
                "all {} sessions are impossible under the parameters",
                evaluation.nr_impossible,
            ),
        }

        if evaluation.nr_impossible == 0 {
            Ok(NO_ERROR)
        } else {
            Ok(NON_FATAL_ERROR)
        }
    }
}

/// The log-likelihood of the sessions which are possible under the parameters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Evaluation {
    log_likelihood: f64,
    nr_possible: usize,
    nr_impossible: usize,
}

impl Evaluation {
    /// The average over the possible sessions, if there are any.
    fn mean_log_likelihood(&self) -> Option<f64> {
        (self.nr_possible > 0).then(|| self.log_likelihood / self.nr_possible as f64)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            log_likelihood: self.log_likelihood + other.log_likelihood,
            nr_possible: self.nr_possible + other.nr_possible,
            nr_impossible: self.nr_impossible + other.nr_impossible,
        }
    }
}

pub(crate) fn run_evaluation(
    model: &ClickModel,
    sessions: &[SearchSession],
    progress_hint: impl Fn() + Sync + Send,
) -> Result<Evaluation, Error> {
    if sessions.is_empty() {
        bail!("No sessions to evaluate on");
    }

    let evaluation = sessions
        .par_iter()
        .map(|session| {
            let evaluation = match model.log_likelihood(std::slice::from_ref(session)) {
                Ok(log_likelihood) => Evaluation {
                    log_likelihood,
                    nr_possible: 1,
                    nr_impossible: 0,
                },
                Err(error) => {
                    warn!("Skipping session for {:?}: {}", session.query().0, error);
                    Evaluation {
                        nr_impossible: 1,
                        ..Evaluation::default()
                    }
                }
            };
            progress_hint();
            evaluation
        })
        .reduce(Evaluation::default, Evaluation::merge);

    Ok(evaluation)
}
