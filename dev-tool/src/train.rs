use std::{fs, path::PathBuf};

use anyhow::{Context, Error};
use click_model::{ClickModel, Config, SearchSession};
use log::info;
use structopt::StructOpt;

use crate::{
    exit_code::NO_ERROR,
    feedback::{CliTrainingController, NoFeedback, ProgressBarTrainingFeedback, TrainingFeedback},
    sessions::load_sessions,
    utils::progress_spin_until_done,
};

/// Trains the click model on a click log.
#[derive(StructOpt, Debug)]
pub struct TrainCmd {
    /// A line delimited json file containing the sessions to train on.
    #[structopt(long)]
    sessions: PathBuf,

    /// The maximal number of iterations to run.
    #[structopt(long, default_value = "10")]
    iterations: usize,

    /// Stops once the log-likelihood changes by at most this value between two iterations.
    #[structopt(long)]
    tolerance: Option<f64>,

    /// Continues training from the parameters in this file.
    #[structopt(long)]
    use_initial_parameters: Option<PathBuf>,

    /// The file to write the trained parameters to.
    #[structopt(short, long)]
    out: PathBuf,

    /// Doesn't show a progress bar.
    #[structopt(short, long)]
    quiet: bool,
}

impl TrainCmd {
    pub fn run(self) -> Result<i32, Error> {
        let TrainCmd {
            sessions,
            iterations,
            tolerance,
            use_initial_parameters,
            out,
            quiet,
        } = self;

        let sessions = progress_spin_until_done("Loading sessions", || {
            load_sessions(&sessions).context("Loading the click log failed.")
        })?;

        let config = Config::default().with_tolerance(tolerance)?;
        let mut model = if let Some(initial_params_file) = use_initial_parameters {
            let bytes = fs::read(initial_params_file)?;
            ClickModel::deserialize(config, &bytes)?
        } else {
            ClickModel::new(config)
        };

        let log_likelihood = if quiet {
            train(&mut model, &sessions, iterations, NoFeedback)?
        } else {
            train(
                &mut model,
                &sessions,
                iterations,
                ProgressBarTrainingFeedback::new(),
            )?
        };
        if let Some(log_likelihood) = log_likelihood {
            println!("log_likelihood={}", log_likelihood);
        }

        fs::write(&out, model.serialize()?)
            .with_context(|| format!("Writing parameters to {} failed.", out.display()))?;
        info!("Wrote parameters to {}", out.display());

        Ok(NO_ERROR)
    }
}

/// Trains the model and returns the log-likelihood of the last iteration.
fn train<F>(
    model: &mut ClickModel,
    sessions: &[SearchSession],
    iterations: usize,
    feedback: F,
) -> Result<Option<f64>, Error>
where
    F: TrainingFeedback,
{
    let controller = model.train_with(sessions, iterations, CliTrainingController::new(feedback))?;
    Ok(controller.log_likelihoods().last().copied())
}
