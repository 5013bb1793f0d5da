//! Shared helpers for the tests of the workspace.

mod approx_eq;
pub mod asset;
pub mod sessions;

pub use approx_eq::ApproxEqIter;
pub use float_cmp::approx_eq;
