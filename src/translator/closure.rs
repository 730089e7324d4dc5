//! Binary-relation operators: transitive closure and transpose.

use datalog_ast::{Literal, Rule, Term};

use crate::ast::Expression;

use super::environment::Environment;
use super::error::TranslationErrorKind;
use super::relation::SRelation;
use super::{concat, NodeResult, TranslationResult, Translator};

impl Translator {
    /// `^a`: smallest transitive relation containing `a`
    pub(super) fn transitive_closure(
        &mut self,
        expr: &Expression,
        operand: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let operand = self.operand(operand, env)?;
        let a = &operand.relation;
        if a.arity() != 2 {
            return Err(TranslationErrorKind::arity("Transitive closure", "2", a.arity()).into());
        }
        let (from, to) = (a.int_slots[0].ty, a.int_slots[1].ty);
        if from != to {
            return Err(TranslationErrorKind::ty("Second column of transitive closure", from, to).into());
        }

        let relation = SRelation::new(self.fresh_relation(), a.int_slots.clone(), a.ext_slots.clone());
        let names = self.fresh_vars(&a.int_slots);
        let (x, z) = (Term::var(&names[0]), Term::var(&names[1]));
        let middle = Term::var(self.fresh_var("mid"));

        let rules = vec![
            Rule::new(
                relation.atom(vec![x.clone(), z.clone()]),
                vec![Literal::Positive(a.atom(vec![x.clone(), z.clone()]))],
            ),
            Rule::new(
                relation.atom(vec![x.clone(), z.clone()]),
                vec![
                    Literal::Positive(relation.atom(vec![x, middle.clone()])),
                    Literal::Positive(a.atom(vec![middle, z])),
                ],
            ),
        ];
        let program = self.define(expr, "transitive closure", env, &relation, vec![], rules)?;
        Ok(TranslationResult {
            relation,
            program: concat([operand.program, program]),
        })
    }

    /// `~a`: swap the two columns
    pub(super) fn transpose(&mut self, expr: &Expression, operand: &Expression, env: &Environment) -> NodeResult {
        let operand = self.operand(operand, env)?;
        let a = &operand.relation;
        if a.arity() != 2 {
            return Err(TranslationErrorKind::arity("Transpose", "2", a.arity()).into());
        }

        let swapped = vec![a.int_slots[1].clone(), a.int_slots[0].clone()];
        let relation = SRelation::new(self.fresh_relation(), swapped, a.ext_slots.clone());
        let names = self.fresh_vars(&a.int_slots);
        let (x, y) = (Term::var(&names[0]), Term::var(&names[1]));
        let rule = Rule::new(
            relation.atom(vec![y.clone(), x.clone()]),
            vec![Literal::Positive(a.atom(vec![x, y]))],
        );
        let program = self.define(expr, "transpose", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([operand.program, program]),
        })
    }
}
