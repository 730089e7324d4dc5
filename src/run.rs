//! # Query Pipeline
//!
//! `source → parse → translate → assemble → engine → typed relation`.
//!
//! [`prepare`] does everything up to program text, so the same prepared
//! query can be run synchronously ([`run_relat`]) or through an
//! [`EnginePool`] ([`run_relat_pooled`]).

use std::time::Instant;

use tracing::info;

use crate::assembler::translation_result_to_full_program;
use crate::engine::{DatalogEngine, EnginePool, Relations, Signatures};
use crate::parser::parse;
use crate::translator::{translate_with_options, Environment, SRelation, TranslateOptions};
use crate::value::{Relation, Type};
use crate::{RelatError, RelatResult};

/// A translated query ready for an engine
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    /// Complete Datalog program text
    pub program: String,
    /// Relation holding the query's value
    pub result: SRelation,
}

impl PreparedQuery {
    pub fn result_types(&self) -> Vec<Type> {
        self.result.types()
    }

    /// The one output the engine has to read back
    pub fn outputs(&self) -> Signatures {
        Signatures::from([(self.result.name.clone(), self.result_types())])
    }

    /// Pick the result relation out of the engine outputs and re-type it
    pub fn finish(&self, mut outputs: Relations) -> RelatResult<Relation> {
        let raw = outputs
            .remove(&self.result.name)
            .ok_or_else(|| RelatError::MissingOutput(self.result.name.clone()))?;
        Ok(raw.coerce(&self.result_types())?.normalize())
    }
}

/// Parse and translate `source` against the signatures of `inputs`
pub fn prepare(source: &str, inputs: &Relations, options: TranslateOptions) -> RelatResult<PreparedQuery> {
    for name in inputs.keys() {
        if !is_identifier(name) {
            return Err(RelatError::InvalidInputName(name.clone()));
        }
    }
    let expr = parse(source)?;
    let env = Environment::with_inputs(
        inputs
            .iter()
            .map(|(name, relation)| (name.as_str(), relation.types.as_slice())),
    )?;
    let translated = translate_with_options(&expr, &env, options)?;
    let program = translation_result_to_full_program(&translated, &env)?;
    Ok(PreparedQuery {
        program: program.to_string(),
        result: translated.relation,
    })
}

/// Evaluate a query on one engine, blocking
pub fn run_relat(source: &str, inputs: &Relations, engine: &dyn DatalogEngine) -> RelatResult<Relation> {
    let started = Instant::now();
    let query = prepare(source, inputs, TranslateOptions::default())?;
    let outputs = engine.run(&query.program, inputs, &query.outputs())?;
    let relation = query.finish(outputs)?;
    info!(
        tuples = relation.len(),
        arity = relation.arity(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "query_evaluated"
    );
    Ok(relation)
}

/// Evaluate a query on the next free worker of `pool`
pub async fn run_relat_pooled(source: &str, inputs: Relations, pool: &EnginePool) -> RelatResult<Relation> {
    let query = prepare(source, &inputs, TranslateOptions::default())?;
    let outputs = pool.run(query.program.clone(), inputs, query.outputs()).await?;
    query.finish(outputs)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && name != crate::ast::WILDCARD
}
