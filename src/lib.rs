//! `chartsnap`: snapshot testing for Helm charts.
//!
//! A chart is rendered once per values file, the output is normalized
//! (documents split, resources parsed, dynamic fields masked, resources
//! sorted and re-serialized) and compared byte-for-byte with a stored
//! snapshot. See [`runner::Orchestrator`] for the entry point.

pub mod cli;
pub mod compare;
pub mod config;
pub mod document;
pub mod error;
pub mod logging;
pub mod mask;
pub mod model;
pub mod normalize;
pub mod output;
pub mod render;
pub mod resource;
pub mod runner;
pub mod snapshot;
pub mod util;

pub use error::{ErrorCode, Result, SnapError};
