//! Quantifiers and set operations.

use datalog_ast::{Literal, Rule};

use crate::ast::{BinaryOp, Expression, UnaryOp};

use super::environment::Environment;
use super::error::TranslationErrorKind;
use super::relation::{merge_ext, SRelation, Signature};
use super::{concat, ground, vars, NodeResult, TranslationResult, Translator};

impl Translator {
    /// `some a` / `not a`: a nullary relation, true when `a` is non-empty
    /// (resp. empty) for the current values of the enclosing scalars.
    pub(super) fn quantifier(
        &mut self,
        expr: &Expression,
        op: UnaryOp,
        operand: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let operand = self.operand(operand, env)?;
        let a = &operand.relation;
        let relation = SRelation::new(self.fresh_relation(), vec![], a.ext_slots.clone());

        let (body, label) = if op == UnaryOp::Not {
            // Negation binds nothing, so every external slot is grounded.
            let mut body = vec![Literal::Negated(a.wildcard_atom())];
            body.extend(ground(env, &a.ext_slots, &[])?);
            (body, "not")
        } else {
            (vec![Literal::Positive(a.wildcard_atom())], "some")
        };
        let rule = Rule::new(relation.atom(vec![]), body);
        let program = self.define(expr, label, env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([operand.program, program]),
        })
    }

    /// `a ; b`, `a & b`, `a - b` over relations of equal signature
    pub(super) fn set_operation(
        &mut self,
        expr: &Expression,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let left = self.operand(left, env)?;
        let right = self.operand(right, env)?;
        let (a, b) = (&left.relation, &right.relation);
        if a.types() != b.types() {
            return Err(TranslationErrorKind::SignatureMismatch {
                operator: op.describe().to_string(),
                relationship: "matching".to_string(),
                left: Signature::of(a),
                right: Signature::of(b),
            }
            .into());
        }

        let ext = merge_ext(&a.ext_slots, &b.ext_slots);
        let relation = SRelation::new(self.fresh_relation(), a.int_slots.clone(), ext.clone());
        let columns = self.fresh_vars(&a.int_slots);
        let head = relation.atom(vars(&columns));

        let rules = match op {
            BinaryOp::Union => {
                let mut from_left = vec![Literal::Positive(a.atom(vars(&columns)))];
                from_left.extend(ground(env, &ext, &a.ext_slots)?);
                let mut from_right = vec![Literal::Positive(b.atom(vars(&columns)))];
                from_right.extend(ground(env, &ext, &b.ext_slots)?);
                vec![
                    Rule::new(head.clone(), from_left),
                    Rule::new(head, from_right),
                ]
            }
            BinaryOp::Intersection => vec![Rule::new(
                head,
                vec![
                    Literal::Positive(a.atom(vars(&columns))),
                    Literal::Positive(b.atom(vars(&columns))),
                ],
            )],
            BinaryOp::Difference => {
                let mut body = vec![
                    Literal::Positive(a.atom(vars(&columns))),
                    Literal::Negated(b.atom(vars(&columns))),
                ];
                body.extend(ground(env, &ext, &a.ext_slots)?);
                vec![Rule::new(head, body)]
            }
            other => {
                return Err(TranslationErrorKind::Internal(format!(
                    "{} is not a set operation",
                    other.describe()
                ))
                .into())
            }
        };

        let program = self.define(expr, op.describe(), env, &relation, vec![], rules)?;
        Ok(TranslationResult {
            relation,
            program: concat([left.program, right.program, program]),
        })
    }
}
