//! Matching Engine: resolves a source track to a target-track identifier
//! via the metadata/universal-link/search cascade.

pub mod engine;
pub mod normalize;

pub use engine::{resolve, CascadeOutcome, DURATION_TOLERANCE_SECS};
