//! # Datalog Engine Interface
//!
//! Generated programs are executed by an external Datalog engine. This module
//! defines the seam ([`DatalogEngine`]), a driver for the `souffle` binary
//! ([`SouffleEngine`]), and a bounded pool for running solves from async code
//! ([`EnginePool`]).
//!
//! An engine receives program text, the input relations named by its
//! `.input` declarations, and the signatures of the `.output` relations it
//! should read back. Output columns are typed by those signatures, so a
//! symbol that happens to spell a number keeps its text.

mod pool;
mod souffle;

use std::collections::BTreeMap;
use std::io;

use thiserror::Error;

use crate::value::{Relation, Type};

pub use pool::EnginePool;
pub use souffle::SouffleEngine;

#[cfg(test)]
pub(crate) use souffle::parse_output;

/// Relations by name
pub type Relations = BTreeMap<String, Relation>;

/// Column types of the output relations to read back, by name
pub type Signatures = BTreeMap<String, Vec<Type>>;

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// I/O error while staging inputs or reading outputs
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Engine binary could not be started
    #[error("Datalog engine not found: {0}")]
    NotFound(String),

    /// Engine rejected or failed to run the program
    #[error("Souffle failed:\n{stderr}")]
    Souffle { stderr: String },

    /// Input value the engine's file format cannot carry
    #[error("Cannot write fact for relation {relation}: {reason}")]
    InvalidFact { relation: String, reason: String },

    /// Output file could not be read back as a relation
    #[error("Malformed output for relation {relation}: {reason}")]
    MalformedOutput { relation: String, reason: String },

    /// Pool was shut down before a worker became free
    #[error("Engine pool is closed")]
    PoolClosed,

    /// A worker task panicked or was cancelled
    #[error("Engine worker failed: {0}")]
    Worker(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Runs Datalog program text against input relations
pub trait DatalogEngine: Send + Sync {
    /// Returns the relations of `outputs` the program produced. A relation
    /// the engine left no output for is absent from the result.
    fn run(&self, program: &str, inputs: &Relations, outputs: &Signatures) -> EngineResult<Relations>;
}
