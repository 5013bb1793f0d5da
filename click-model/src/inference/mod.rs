//! Exact inference over the hidden examination/satisfaction chain of a session.

mod continuation;
mod forward;
mod frame;
mod update;

pub use continuation::ContinuationFactor;
pub use forward::ForwardPass;
pub use frame::{RankParams, SessionFrame};
pub(crate) use update::accumulate_session;

use displaydoc::Display;
use thiserror::Error;

/// Errors of the inference over a session.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq)]
pub enum InferenceError {
    /// Observation at rank {rank} is inconsistent with the current parameters
    InconsistentObservation { rank: usize },
    /// Attractiveness update at rank {rank} divides by zero
    DegenerateAttractiveness { rank: usize },
    /// Hidden state posterior at rank {rank} has zero mass
    ZeroPartition { rank: usize },
}
