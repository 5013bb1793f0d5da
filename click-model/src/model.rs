use anyhow::bail;

use crate::{
    config::Config,
    data::session::{DocumentId, Query, SearchSession},
    inference::{ForwardPass, InferenceError, SessionFrame},
    params::{ModelParams, Param},
    trainer::{EmTrainer, LogController, TrainingController, TrainingError},
    utils::serialize_with_version,
    Error,
};

const CURRENT_SCHEMA_VERSION: u8 = 1;

/// The click model with satisfaction-aware continuation.
///
/// Owns the parameter store, which is only ever changed by training.
#[derive(Clone, Debug, PartialEq)]
pub struct ClickModel {
    config: Config,
    params: ModelParams,
}

impl ClickModel {
    /// Creates an untrained model with all parameters at their priors.
    pub fn new(config: Config) -> Self {
        let params = ModelParams::new(config.priors());
        Self { config, params }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Runs expectation-maximization over the sessions.
    ///
    /// Stops after `iterations` or once the configured tolerance is met.
    ///
    /// # Errors
    /// Fails if a session is impossible under the current parameters. The parameters then stay
    /// at the state of the last completed iteration.
    pub fn train(
        &mut self,
        sessions: &[SearchSession],
        iterations: usize,
    ) -> Result<(), InferenceError> {
        self.train_with(sessions, iterations, LogController::default())
            .map(|_| ())
            .map_err(|error| match error {
                TrainingError::Inference(error) => error,
                TrainingError::Control(never) => match never {},
            })
    }

    /// Runs expectation-maximization with a custom training controller.
    ///
    /// Returns the controller after training.
    pub fn train_with<C>(
        &mut self,
        sessions: &[SearchSession],
        iterations: usize,
        controller: C,
    ) -> Result<C, TrainingError<C::Error>>
    where
        C: TrainingController,
    {
        EmTrainer::new(
            &mut self.params,
            sessions,
            controller,
            self.config.tolerance(),
        )
        .train(iterations)
    }

    /// The current parameter values for each rank of the session.
    pub fn session_params(&self, session: &SearchSession) -> SessionFrame {
        SessionFrame::new(&self.params, session)
    }

    /// The probability of the observed outcome at each rank given all earlier observations.
    pub fn click_probs(&self, session: &SearchSession) -> Result<Vec<f64>, InferenceError> {
        self.forward(session)
            .map(|forward| forward.click_probs().to_vec())
    }

    /// The probability of a click at each rank given all earlier observations.
    pub fn conditional_click_probs(
        &self,
        session: &SearchSession,
    ) -> Result<Vec<f64>, InferenceError> {
        let frame = self.session_params(session);
        ForwardPass::run(session, &frame, 0).map(|forward| forward.conditional_click_probs(&frame))
    }

    /// The probability of a click at each rank without looking at any observation.
    pub fn full_click_probs(&self, session: &SearchSession) -> Vec<f64> {
        self.session_params(session)
            .iter()
            .map(|params| params.attractiveness * params.examination)
            .collect()
    }

    /// The log-likelihood of the sessions under the current parameters.
    pub fn log_likelihood(&self, sessions: &[SearchSession]) -> Result<f64, InferenceError> {
        sessions.iter().try_fold(0., |log_likelihood, session| {
            self.forward(session)
                .map(|forward| log_likelihood + forward.log_likelihood())
        })
    }

    /// The probability that the document is clicked and satisfies once examined for the query.
    pub fn predict_relevance(&self, query: &Query, document: &DocumentId) -> f64 {
        self.params
            .get_value(Param::Attractiveness, query, document)
            * self.params.get_value(Param::Satisfaction, query, document)
    }

    /// Serializes the trained parameters.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        serialize_with_version(&self.params, CURRENT_SCHEMA_VERSION)
    }

    /// Deserializes the trained parameters into a model with the given configuration.
    ///
    /// If `bytes` is empty, then an untrained model is returned.
    pub fn deserialize(config: Config, bytes: &[u8]) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Ok(Self::new(config));
        }

        let params = match bytes[0] {
            CURRENT_SCHEMA_VERSION => bincode::deserialize(&bytes[1..])?,
            version => bail!(
                "Unsupported serialized data. Found version {} expected {}",
                version,
                CURRENT_SCHEMA_VERSION,
            ),
        };

        Ok(Self { config, params })
    }

    fn forward(&self, session: &SearchSession) -> Result<ForwardPass, InferenceError> {
        ForwardPass::run(session, &self.session_params(session), 0)
    }
}

impl Default for ClickModel {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
