//! # Relat
//!
//! A point-free relational query language compiled to Souffle Datalog.
//!
//! ## Pipeline
//!
//! ```text
//! Relat source
//!     ↓
//! [parser]      → Expression (with source ranges)
//!     ↓
//! [translator]  → SRelation + Datalog fragment
//!     ↓
//! [assembler]   → full program (.decl/.input, fragment, .output)
//!     ↓
//! [engine]      → output relations (Souffle subprocess)
//!     ↓
//! Relation
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relat::engine::{Relations, SouffleEngine};
//! use relat::run::run_relat;
//! use relat::value::{Relation, Type, Value};
//!
//! let rel = Relation::new(vec![Type::Number], vec![vec![Value::Number(1)]])?;
//! let inputs = Relations::from([("rel".to_string(), rel)]);
//! let result = run_relat("x : rel | `x * 3`", &inputs, &SouffleEngine::default())?;
//! println!("{}", serde_json::to_string(&result)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `ast` | Relat expression tree |
//! | `parser` | Source text → `Expression` |
//! | `translator` | `Expression` → Datalog fragment |
//! | `assembler` | Fragment → runnable program |
//! | `engine` | Souffle driver and worker pool |
//! | `run` | End-to-end evaluation |
//! | `value` | Runtime relations |
//! | `config` | Configuration system |

pub mod assembler;
pub mod ast;
pub mod config;
pub mod engine;
pub mod parser;
pub mod run;
pub mod translator;
pub mod value;

pub use datalog_ast::{program_to_string, Program};

pub use assembler::translation_result_to_full_program;
pub use config::Config;
pub use engine::{DatalogEngine, EngineError, EnginePool, Signatures, SouffleEngine};
pub use parser::{parse, SyntaxError};
pub use run::{prepare, run_relat, PreparedQuery};
pub use translator::{translate, Environment, TranslationError, TranslationErrorKind, TranslationResult};
pub use value::{Relation, Type, Value};

use thiserror::Error;

/// Any failure along the query pipeline
#[derive(Error, Debug)]
pub enum RelatError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    /// Failure outside any single expression (scope setup, assembly)
    #[error(transparent)]
    Scope(#[from] TranslationErrorKind),

    #[error(transparent)]
    Value(#[from] value::ValueError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Engine produced no output for result relation {0}")]
    MissingOutput(String),

    #[error("Invalid input relation name: {0}")]
    InvalidInputName(String),
}

pub type RelatResult<T> = Result<T, RelatError>;
