//! A click model for search sessions with observed satisfaction.
//!
//! Examination is a hidden chain over the ranked results. After a click the user continues with
//! a probability depending on whether the clicked result satisfied them. The per (query,
//! document) attractiveness and satisfaction as well as the two global continuation
//! probabilities are estimated by expectation-maximization with exact inference.

mod config;
mod data;
mod inference;
mod model;
mod params;
mod trainer;
mod utils;

pub use crate::{
    config::{Config, ConfigError, Priors},
    data::session::{DocumentId, Query, SearchResult, SearchSession, SessionError},
    inference::{ContinuationFactor, ForwardPass, InferenceError, RankParams, SessionFrame},
    model::ClickModel,
    params::{ModelParams, Param, ParamContainer, ParamEm, QueryDocumentParams, SingleParam},
    trainer::{EmTrainer, LogController, TrainingController, TrainingError},
};

pub type Error = anyhow::Error;

#[cfg(test)]
mod tests;
