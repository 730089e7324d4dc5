//! # Relat to Datalog Translator
//!
//! Compiles an [`Expression`] into a Datalog program fragment that defines a
//! freshly named relation holding the expression's value.
//!
//! ## How it works
//!
//! Translation is structural recursion over the expression tree. Every node
//! (except identifiers bound to relations, and `let`) defines exactly one new
//! relation `R<n>` and emits its `.decl` and rules after the fragments of its
//! subexpressions, so the concatenated program always declares before use.
//!
//! Each relation carries *external slots*: scalar variables bound by an
//! enclosing comprehension that its contents depend on. They appear as
//! trailing columns named `<var>_e` and are joined by name across rules. When
//! a rule needs an external variable that none of its positive atoms binds,
//! the variable's grounding constraint is added to the rule body.
//!
//! ## Errors
//!
//! Failures are reported against the smallest expression that raised them,
//! along with the scope at that point (see [`TranslationError`]).
//!
//! ## Example
//!
//! ```rust
//! use relat::parser::parse;
//! use relat::translator::{translate, Environment};
//! use relat::value::Type;
//!
//! let env = Environment::with_inputs([("rel", &[Type::Number, Type::Number][..])]).unwrap();
//! let result = translate(&parse("~rel").unwrap(), &env).unwrap();
//! assert_eq!(result.relation.arity(), 2);
//! assert!(result.program.to_string().contains(".decl R1("));
//! ```

mod closure;
mod comprehension;
pub mod environment;
pub mod error;
mod joins;
pub mod naming;
mod ordering;
pub mod relation;
mod scalar_ops;
mod set_ops;

use std::collections::BTreeSet;
use std::time::Instant;

use datalog_ast::{Command, Literal, Program, Rule, Term};
use tracing::{debug, info};

use crate::ast::{BinaryOp, Expression, ExpressionKind, UnaryOp};

pub use environment::{Binding, Environment, ScalarBinding, ScopeSnapshot};
pub use error::{TranslationError, TranslationErrorKind};
pub use naming::NameGen;
pub use relation::{SRelation, Signature, Slot};

use error::Fault;

/// Knobs for a translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Precede each generated relation with a blank line and a
    /// `// R7: <source> (<operator>)` comment
    pub emit_comments: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        TranslateOptions {
            emit_comments: true,
        }
    }
}

/// A relation plus the Datalog commands that define it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub relation: SRelation,
    pub program: Program,
}

impl TranslationResult {
    pub fn name(&self) -> &str {
        &self.relation.name
    }
}

/// Translate with default options
pub fn translate(
    expr: &Expression,
    env: &Environment,
) -> Result<TranslationResult, TranslationError> {
    translate_with_options(expr, env, TranslateOptions::default())
}

pub fn translate_with_options(
    expr: &Expression,
    env: &Environment,
    options: TranslateOptions,
) -> Result<TranslationResult, TranslationError> {
    let started = Instant::now();
    let mut translator = Translator::new(env, options);
    let result = translator.translate(expr, env)?;
    info!(
        result = %result.relation.name,
        nodes = expr.size(),
        relations = translator.names.relations_issued(),
        elapsed_us = started.elapsed().as_micros() as u64,
        "query_translated"
    );
    Ok(result)
}

type NodeResult = Result<TranslationResult, Fault>;

/// Translation state for one top-level call
pub struct Translator {
    names: NameGen,
    options: TranslateOptions,
}

impl Translator {
    /// New translator whose generated names avoid every relation bound in `env`
    pub fn new(env: &Environment, options: TranslateOptions) -> Self {
        let reserved: Vec<String> = env
            .relations()
            .into_iter()
            .flat_map(|(binding, relation)| [binding.to_string(), relation.name.clone()])
            .collect();
        Translator {
            names: NameGen::new(reserved),
            options,
        }
    }

    pub fn translate(
        &mut self,
        expr: &Expression,
        env: &Environment,
    ) -> Result<TranslationResult, TranslationError> {
        self.translate_node(expr, env)
            .map_err(|fault| fault.locate(expr, env))
    }

    fn translate_node(&mut self, expr: &Expression, env: &Environment) -> NodeResult {
        match &expr.kind {
            ExpressionKind::Identifier(name) => self.identifier(expr, name, env),
            ExpressionKind::Constant(constant) => self.constant(expr, constant, env),
            ExpressionKind::Formula(raw) => self.formula(expr, raw, env),
            ExpressionKind::Let {
                variable,
                value,
                body,
            } => self.let_binding(variable, value, body, env),
            ExpressionKind::Comprehension {
                variables,
                constraint,
                body,
                style,
            } => self.comprehension(expr, variables, constraint, body, *style, env),
            ExpressionKind::Unary { op, operand } => match op {
                UnaryOp::Some | UnaryOp::Not => self.quantifier(expr, *op, operand, env),
                UnaryOp::Closure => self.transitive_closure(expr, operand, env),
                UnaryOp::ReflexiveClosure => Err(TranslationErrorKind::Unsupported(
                    "Reflexive transitive closure (*)".to_string(),
                )
                .into()),
                UnaryOp::Transpose => self.transpose(expr, operand, env),
                UnaryOp::Count => self.count(expr, operand, env),
                UnaryOp::Min | UnaryOp::Max | UnaryOp::Sum => {
                    self.numeric_aggregate(expr, *op, operand, env)
                }
                UnaryOp::WildcardApply => self.wildcard_apply(expr, operand, env),
                UnaryOp::Index => self.index(expr, operand, env),
                UnaryOp::Concat => self.concat(expr, operand, env),
            },
            ExpressionKind::Binary { op, left, right } => match op {
                BinaryOp::Join => self.dot_join(expr, left, right, env),
                BinaryOp::Product => self.product(expr, left, right, env),
                BinaryOp::Apply => self.application(expr, left, right, env),
                BinaryOp::PrefixJoin | BinaryOp::SuffixJoin => {
                    self.restriction(expr, *op, left, right, env)
                }
                BinaryOp::Union | BinaryOp::Intersection | BinaryOp::Difference => {
                    self.set_operation(expr, *op, left, right, env)
                }
                op if op.is_comparison() => self.comparison(expr, *op, left, right, env),
                _ => self.arithmetic(expr, *op, left, right, env),
            },
        }
    }

    // ========================================================================
    // Helpers shared by the translation cases
    // ========================================================================

    /// Translate a subexpression; rejects a bare wildcard
    fn operand(&mut self, expr: &Expression, env: &Environment) -> NodeResult {
        if expr.is_wildcard() {
            return Err(TranslationError::new(expr, env, TranslationErrorKind::MisplacedWildcard).into());
        }
        Ok(self.translate(expr, env)?)
    }

    fn fresh_relation(&mut self) -> String {
        self.names.relation()
    }

    /// One fresh variable per slot
    fn fresh_vars(&mut self, slots: &[Slot]) -> Vec<String> {
        slots
            .iter()
            .map(|slot| self.names.var(&slot.debug_name))
            .collect()
    }

    fn fresh_var(&mut self, stem: &str) -> String {
        self.names.var(stem)
    }

    /// Declaration, optional comment, and rules for a new relation
    fn define(
        &self,
        expr: &Expression,
        label: &str,
        env: &Environment,
        relation: &SRelation,
        choice_domains: Vec<Vec<String>>,
        rules: Vec<Rule>,
    ) -> Result<Program, TranslationErrorKind> {
        let mut program = Program::new();
        if self.options.emit_comments {
            let text = match expr.text() {
                "" => expr.to_string(),
                text => text.to_string(),
            };
            program.push(Command::blank());
            program.push(Command::Comment(format!("{}: {text} ({label})", relation.name)));
        }
        program.push(relation.decl(env, choice_domains)?);
        program.commands.extend(rules.into_iter().map(Command::Rule));

        debug!(
            relation = %relation.name,
            operator = label,
            arity = relation.arity(),
            ext = relation.ext_slots.len(),
            "relation_defined"
        );
        Ok(program)
    }
}

/// Terms for a list of variable names
fn vars(names: &[String]) -> Vec<Term> {
    names.iter().map(Term::var).collect()
}

/// Concatenate program fragments in order
fn concat(parts: impl IntoIterator<Item = Program>) -> Program {
    let mut program = Program::new();
    for part in parts {
        program.append(part);
    }
    program
}

/// Grounding literals for every variable in `ext` not bound by `bound`.
///
/// Each missing variable contributes its scope constraint atom, which also
/// binds the variables that constraint depends on.
fn ground(
    env: &Environment,
    ext: &[String],
    bound: &[String],
) -> Result<Vec<Literal>, TranslationErrorKind> {
    let mut bound: BTreeSet<&str> = bound.iter().map(String::as_str).collect();
    let mut literals = Vec::new();
    for name in ext {
        if bound.contains(name.as_str()) {
            continue;
        }
        let scalar = env.scalar(name).ok_or_else(|| {
            TranslationErrorKind::Internal(format!("cannot ground {name}: not a scalar in scope"))
        })?;
        literals.push(Literal::Positive(scalar.constraint.clone()));
        bound.insert(name.as_str());
        bound.extend(scalar.constraint_ext_slots.iter().map(String::as_str));
    }
    Ok(literals)
}
