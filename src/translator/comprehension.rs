//! Scope-facing cases: identifiers, literals, formulas, `let`, and
//! comprehensions.

use std::sync::OnceLock;

use datalog_ast::{Expr, Literal, Program, Rule, Term, Type};
use regex::Regex;

use crate::ast::{ComprehensionStyle, Constant, Expression, WILDCARD};

use super::environment::{Binding, Environment, ScalarBinding};
use super::error::TranslationErrorKind;
use super::relation::{ext_var, merge_ext, SRelation, Slot};
use super::{concat, ground, vars, NodeResult, TranslationResult, Translator};

fn identifier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").ok())
        .as_ref()
}

impl Translator {
    pub(super) fn identifier(&mut self, expr: &Expression, name: &str, env: &Environment) -> NodeResult {
        match env.lookup(name) {
            // Shared, not copied: no new program text.
            Some(Binding::Relation(relation)) => Ok(TranslationResult {
                relation: relation.clone(),
                program: Program::new(),
            }),
            Some(Binding::Scalar(scalar)) => {
                let ext = merge_ext(&[name.to_string()], &scalar.constraint_ext_slots);
                let relation = SRelation::new(
                    self.fresh_relation(),
                    vec![Slot::new(scalar.ty, name)],
                    ext,
                );
                let rule = Rule::new(
                    relation.atom(vec![Term::var(ext_var(name))]),
                    vec![Literal::Positive(scalar.constraint.clone())],
                );
                let program = self.define(expr, "identifier", env, &relation, vec![], vec![rule])?;
                Ok(TranslationResult { relation, program })
            }
            None if name == WILDCARD => Err(TranslationErrorKind::MisplacedWildcard.into()),
            None => Err(TranslationErrorKind::UnknownIdentifier(name.to_string()).into()),
        }
    }

    pub(super) fn constant(&mut self, expr: &Expression, constant: &Constant, env: &Environment) -> NodeResult {
        let (ty, term) = match constant {
            Constant::Number(n) => (Type::Number, Term::Number(*n)),
            Constant::Str(s) => (Type::Symbol, Term::Symbol(s.clone())),
        };
        let relation = SRelation::new(self.fresh_relation(), vec![Slot::new(ty, "val")], vec![]);
        let v = self.fresh_var("val");
        let rule = Rule::new(
            relation.atom(vec![Term::var(&v)]),
            vec![Literal::assign(&v, Expr::Term(term))],
        );
        let program = self.define(expr, "literal", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult { relation, program })
    }

    /// Raw numeric expression. Depends on every bound scalar, since the text
    /// is not analysed beyond renaming scalar references.
    pub(super) fn formula(&mut self, expr: &Expression, raw: &str, env: &Environment) -> NodeResult {
        let pattern = identifier_pattern()
            .ok_or_else(|| TranslationErrorKind::Internal("identifier pattern failed to compile".to_string()))?;
        let rewritten = pattern.replace_all(raw, |caps: &regex::Captures<'_>| {
            let word = &caps[0];
            if env.scalar(word).is_some() {
                ext_var(word)
            } else {
                word.to_string()
            }
        });

        let ext = env.scalar_names();
        let relation = SRelation::new(
            self.fresh_relation(),
            vec![Slot::new(Type::Number, "val")],
            ext.clone(),
        );
        let out = self.fresh_var("val");
        let mut body = ground(env, &ext, &[])?;
        body.push(Literal::assign(&out, Expr::Raw(rewritten.into_owned())));
        let rule = Rule::new(relation.atom(vec![Term::var(&out)]), body);
        let program = self.define(expr, "formula", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult { relation, program })
    }

    pub(super) fn let_binding(
        &mut self,
        variable: &str,
        value: &Expression,
        body: &Expression,
        env: &Environment,
    ) -> NodeResult {
        if env.is_bound(variable) {
            return Err(TranslationErrorKind::AlreadyBound(variable.to_string()).into());
        }
        let value = self.operand(value, env)?;
        let body_env = env.extend(variable, Binding::Relation(value.relation.clone()))?;
        let body = self.translate(body, &body_env)?;
        Ok(TranslationResult {
            relation: body.relation,
            program: concat([value.program, body.program]),
        })
    }

    pub(super) fn comprehension(
        &mut self,
        expr: &Expression,
        variables: &[String],
        constraint: &Expression,
        body: &Expression,
        style: ComprehensionStyle,
        env: &Environment,
    ) -> NodeResult {
        for (i, variable) in variables.iter().enumerate() {
            if env.is_bound(variable) || variables[..i].contains(variable) {
                return Err(TranslationErrorKind::AlreadyBound(variable.clone()).into());
            }
        }

        let constraint = self.operand(constraint, env)?;
        if constraint.relation.arity() != variables.len() {
            return Err(TranslationErrorKind::arity(
                "Constraint of comprehension",
                &variables.len().to_string(),
                constraint.relation.arity(),
            )
            .into());
        }

        // Each variable is grounded by the constraint with the other
        // columns wildcarded.
        let mut body_env = env.clone();
        for (i, variable) in variables.iter().enumerate() {
            let args = (0..variables.len())
                .map(|j| if i == j { Term::var(ext_var(variable)) } else { Term::Wildcard })
                .collect();
            let binding = ScalarBinding {
                ty: constraint.relation.int_slots[i].ty,
                constraint: constraint.relation.atom(args),
                constraint_ext_slots: constraint.relation.ext_slots.clone(),
            };
            body_env = body_env.extend(variable, Binding::Scalar(binding))?;
        }

        let body = self.operand(body, &body_env)?;

        let mut int_slots = Vec::new();
        let mut head_terms = Vec::new();
        let bound_vars: Vec<Term> = variables.iter().map(|v| Term::var(ext_var(v))).collect();
        if style == ComprehensionStyle::For {
            int_slots.extend(
                variables
                    .iter()
                    .zip(&constraint.relation.int_slots)
                    .map(|(v, slot)| Slot::new(slot.ty, v)),
            );
            head_terms.extend(bound_vars.iter().cloned());
        }
        int_slots.extend(body.relation.int_slots.iter().cloned());
        let body_vars = self.fresh_vars(&body.relation.int_slots);
        head_terms.extend(vars(&body_vars));

        let free_body_ext: Vec<String> = body
            .relation
            .ext_slots
            .iter()
            .filter(|name| !variables.contains(name))
            .cloned()
            .collect();
        let ext = merge_ext(&free_body_ext, &constraint.relation.ext_slots);

        let relation = SRelation::new(self.fresh_relation(), int_slots, ext);
        let rule = Rule::new(
            relation.atom(head_terms),
            vec![
                Literal::Positive(body.relation.atom(vars(&body_vars))),
                Literal::Positive(constraint.relation.atom(bound_vars)),
            ],
        );
        let label = match style {
            ComprehensionStyle::For => "comprehension",
            ComprehensionStyle::From => "from-comprehension",
        };
        let program = self.define(expr, label, env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([constraint.program, body.program, program]),
        })
    }
}
