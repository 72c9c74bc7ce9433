//! Convoy execution for gt.
//!
//! A convoy formula fans out into parallel legs that converge on an
//! optional synthesis step. Running one creates a convoy record, a task per
//! leg, and a synthesis task blocked on every leg, then dispatches each leg
//! to a worker on the target rig.

pub mod backends;
pub mod collab;
pub mod command;
pub mod executor;
pub mod graph;
pub mod plan;

use thiserror::Error;

pub use collab::{Dispatcher, PrSource, WorkStore};
pub use executor::{ConvoyExecutor, ConvoyReport, RunOutcome};
pub use plan::RunOptions;

/// Errors that abort a convoy run.
#[derive(Debug, Error)]
pub enum ConvoyError {
    #[error("creating convoy record: {0}")]
    ConvoyCreation(#[source] command::CommandError),

    #[error("writing progress: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvoyError>;
