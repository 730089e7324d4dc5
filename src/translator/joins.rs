//! Joins: dot-join, product, application, and prefix/suffix restriction.

use datalog_ast::{Literal, Rule, Term};

use crate::ast::{BinaryOp, Expression};

use super::environment::Environment;
use super::error::TranslationErrorKind;
use super::relation::{merge_ext, SRelation, Signature};
use super::{concat, vars, NodeResult, TranslationResult, Translator};

impl Translator {
    /// `a.b`: join the last column of `a` with the first column of `b`.
    /// `a._` drops the last column of `a`; `_.b` drops the first column of `b`.
    pub(super) fn dot_join(
        &mut self,
        expr: &Expression,
        left: &Expression,
        right: &Expression,
        env: &Environment,
    ) -> NodeResult {
        match (left.is_wildcard(), right.is_wildcard()) {
            (true, true) => return Err(TranslationErrorKind::MisplacedWildcard.into()),
            (true, false) => return self.wildcard_apply(expr, right, env),
            (false, true) => return self.drop_last(expr, left, env),
            (false, false) => {}
        }

        let left = self.operand(left, env)?;
        let right = self.operand(right, env)?;
        let (l, r) = (&left.relation, &right.relation);
        if l.arity() == 0 {
            return Err(TranslationErrorKind::arity("Left-hand side of dot-join", "> 0", 0).into());
        }
        if r.arity() == 0 {
            return Err(TranslationErrorKind::arity("Right-hand side of dot-join", "> 0", 0).into());
        }
        if let (Some(last), Some(first)) = (l.last_type(), r.first_type()) {
            if last != first {
                return Err(TranslationErrorKind::ty(
                    "First column of right-hand side of dot-join",
                    last,
                    first,
                )
                .into());
            }
        }

        let left_vars = self.fresh_vars(&l.int_slots);
        let mut right_vars = self.fresh_vars(&r.int_slots);
        let middle = left_vars[left_vars.len() - 1].clone();
        right_vars[0] = middle;

        let int_slots = l.int_slots[..l.arity() - 1]
            .iter()
            .chain(&r.int_slots[1..])
            .cloned()
            .collect();
        let relation = SRelation::new(
            self.fresh_relation(),
            int_slots,
            merge_ext(&l.ext_slots, &r.ext_slots),
        );
        let head_vars: Vec<String> = left_vars[..left_vars.len() - 1]
            .iter()
            .chain(&right_vars[1..])
            .cloned()
            .collect();
        let rule = Rule::new(
            relation.atom(vars(&head_vars)),
            vec![
                Literal::Positive(l.atom(vars(&left_vars))),
                Literal::Positive(r.atom(vars(&right_vars))),
            ],
        );
        let program = self.define(expr, "dot-join", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([left.program, right.program, program]),
        })
    }

    /// `a._`
    fn drop_last(&mut self, expr: &Expression, operand: &Expression, env: &Environment) -> NodeResult {
        let operand = self.operand(operand, env)?;
        let a = &operand.relation;
        if a.arity() == 0 {
            return Err(TranslationErrorKind::arity("Left-hand side of dot-join", "> 0", 0).into());
        }
        let kept = &a.int_slots[..a.arity() - 1];
        let kept_vars = self.fresh_vars(kept);
        let relation = SRelation::new(self.fresh_relation(), kept.to_vec(), a.ext_slots.clone());
        let mut body_terms = vars(&kept_vars);
        body_terms.push(Term::Wildcard);
        let rule = Rule::new(
            relation.atom(vars(&kept_vars)),
            vec![Literal::Positive(a.atom(body_terms))],
        );
        let program = self.define(expr, "wildcard dot-join", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([operand.program, program]),
        })
    }

    /// `a[_]`: drop the first column
    pub(super) fn wildcard_apply(
        &mut self,
        expr: &Expression,
        operand: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let operand = self.operand(operand, env)?;
        let a = &operand.relation;
        if a.arity() == 0 {
            return Err(TranslationErrorKind::arity("Operand of wildcard application", "> 0", 0).into());
        }
        let kept = &a.int_slots[1..];
        let kept_vars = self.fresh_vars(kept);
        let relation = SRelation::new(self.fresh_relation(), kept.to_vec(), a.ext_slots.clone());
        let mut body_terms = vec![Term::Wildcard];
        body_terms.extend(vars(&kept_vars));
        let rule = Rule::new(
            relation.atom(vars(&kept_vars)),
            vec![Literal::Positive(a.atom(body_terms))],
        );
        let program = self.define(expr, "wildcard application", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([operand.program, program]),
        })
    }

    /// `a, b`
    pub(super) fn product(
        &mut self,
        expr: &Expression,
        left: &Expression,
        right: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let left = self.operand(left, env)?;
        let right = self.operand(right, env)?;
        let (l, r) = (&left.relation, &right.relation);

        let left_vars = self.fresh_vars(&l.int_slots);
        let right_vars = self.fresh_vars(&r.int_slots);
        let int_slots = l.int_slots.iter().chain(&r.int_slots).cloned().collect();
        let relation = SRelation::new(
            self.fresh_relation(),
            int_slots,
            merge_ext(&l.ext_slots, &r.ext_slots),
        );
        let mut head = vars(&left_vars);
        head.extend(vars(&right_vars));
        let rule = Rule::new(
            relation.atom(head),
            vec![
                Literal::Positive(l.atom(vars(&left_vars))),
                Literal::Positive(r.atom(vars(&right_vars))),
            ],
        );
        let program = self.define(expr, "cartesian product", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([left.program, right.program, program]),
        })
    }

    /// `a[b]`: the columns of `b` match a prefix of `a`; keep the rest of `a`
    pub(super) fn application(
        &mut self,
        expr: &Expression,
        left: &Expression,
        right: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let left = self.operand(left, env)?;
        let right = self.operand(right, env)?;
        let (a, b) = (&left.relation, &right.relation);
        if !is_prefix(&b.types(), &a.types()) {
            return Err(signature_mismatch("application", "prefix-compatible", a, b).into());
        }

        let a_vars = self.fresh_vars(&a.int_slots);
        let split = b.arity();
        let relation = SRelation::new(
            self.fresh_relation(),
            a.int_slots[split..].to_vec(),
            merge_ext(&a.ext_slots, &b.ext_slots),
        );
        let rule = Rule::new(
            relation.atom(vars(&a_vars[split..])),
            vec![
                Literal::Positive(a.atom(vars(&a_vars))),
                Literal::Positive(b.atom(vars(&a_vars[..split]))),
            ],
        );
        let program = self.define(expr, "application", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([left.program, right.program, program]),
        })
    }

    /// `a <: b` keeps tuples of `b` whose prefix is in `a`;
    /// `a :> b` keeps tuples of `a` whose suffix is in `b`.
    pub(super) fn restriction(
        &mut self,
        expr: &Expression,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let left = self.operand(left, env)?;
        let right = self.operand(right, env)?;
        let (l, r) = (&left.relation, &right.relation);

        // (kept relation, filter relation, filter columns start in kept)
        let (kept, filter, offset, label) = if op == BinaryOp::PrefixJoin {
            if !is_prefix(&l.types(), &r.types()) {
                return Err(signature_mismatch("prefix join", "prefix-compatible", l, r).into());
            }
            (r, l, 0, "prefix join")
        } else {
            let (lt, rt) = (l.types(), r.types());
            if rt.len() > lt.len() || lt[lt.len() - rt.len()..] != rt[..] {
                return Err(signature_mismatch("suffix join", "suffix-compatible", l, r).into());
            }
            (l, r, lt.len() - rt.len(), "suffix join")
        };

        let kept_vars = self.fresh_vars(&kept.int_slots);
        let relation = SRelation::new(
            self.fresh_relation(),
            kept.int_slots.clone(),
            merge_ext(&l.ext_slots, &r.ext_slots),
        );
        let filter_vars = &kept_vars[offset..offset + filter.arity()];
        let rule = Rule::new(
            relation.atom(vars(&kept_vars)),
            vec![
                Literal::Positive(kept.atom(vars(&kept_vars))),
                Literal::Positive(filter.atom(vars(filter_vars))),
            ],
        );
        let program = self.define(expr, label, env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([left.program, right.program, program]),
        })
    }
}

fn is_prefix(prefix: &[datalog_ast::Type], of: &[datalog_ast::Type]) -> bool {
    prefix.len() <= of.len() && of[..prefix.len()] == *prefix
}

fn signature_mismatch(
    operator: &str,
    relationship: &str,
    left: &SRelation,
    right: &SRelation,
) -> TranslationErrorKind {
    TranslationErrorKind::SignatureMismatch {
        operator: operator.to_string(),
        relationship: relationship.to_string(),
        left: Signature::of(left),
        right: Signature::of(right),
    }
}
