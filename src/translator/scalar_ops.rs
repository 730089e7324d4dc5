//! Aggregates, comparisons, and arithmetic over unary relations.

use datalog_ast::{Aggregate, AggregateFunc, ArithOp, ComparisonOp, Expr, Literal, Rule, Term, Type};

use crate::ast::{BinaryOp, Expression, UnaryOp};

use super::environment::Environment;
use super::error::TranslationErrorKind;
use super::relation::{merge_ext, SRelation, Slot};
use super::{concat, ground, NodeResult, TranslationResult, Translator};

impl Translator {
    /// `#a`: number of tuples, per binding of the enclosing scalars
    pub(super) fn count(&mut self, expr: &Expression, operand: &Expression, env: &Environment) -> NodeResult {
        let operand = self.operand(operand, env)?;
        let a = &operand.relation;
        let relation = SRelation::new(
            self.fresh_relation(),
            vec![Slot::new(Type::Number, "cnt")],
            a.ext_slots.clone(),
        );
        let n = self.fresh_var("cnt");

        let mut body = vec![Literal::Aggregate(Aggregate {
            result: n.clone(),
            func: AggregateFunc::Count,
            target: None,
            atom: a.wildcard_atom(),
        })];
        body.extend(ground(env, &a.ext_slots, &[])?);
        let rule = Rule::new(relation.atom(vec![Term::var(&n)]), body);
        let program = self.define(expr, "count", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([operand.program, program]),
        })
    }

    /// `min a`, `max a`, `sum a` (also `Σ a`): aggregate the last column,
    /// which must be numeric
    pub(super) fn numeric_aggregate(
        &mut self,
        expr: &Expression,
        op: UnaryOp,
        operand: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let func = match op {
            UnaryOp::Min => AggregateFunc::Min,
            UnaryOp::Max => AggregateFunc::Max,
            UnaryOp::Sum => AggregateFunc::Sum,
            other => {
                return Err(TranslationErrorKind::Internal(format!(
                    "{} is not a numeric aggregate",
                    other.describe()
                ))
                .into())
            }
        };
        let operand = self.operand(operand, env)?;
        let a = &operand.relation;
        let Some(last) = a.last_type() else {
            return Err(TranslationErrorKind::arity(
                &format!("Operand of {}", op.describe()),
                "> 0",
                0,
            )
            .into());
        };
        if last != Type::Number {
            return Err(TranslationErrorKind::ty(
                &format!("Last column of {} operand", op.describe()),
                Type::Number,
                last,
            )
            .into());
        }

        let relation = SRelation::new(
            self.fresh_relation(),
            vec![Slot::new(Type::Number, op.describe())],
            a.ext_slots.clone(),
        );
        let result = self.fresh_var(op.describe());
        let target = self.fresh_var("val");
        let mut args = vec![Term::Wildcard; a.arity() - 1];
        args.push(Term::var(&target));

        let mut body = vec![Literal::Aggregate(Aggregate {
            result: result.clone(),
            func,
            target: Some(target),
            atom: a.atom(args),
        })];
        body.extend(ground(env, &a.ext_slots, &[])?);
        let rule = Rule::new(relation.atom(vec![Term::var(&result)]), body);
        let program = self.define(expr, op.describe(), env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([operand.program, program]),
        })
    }

    /// `a = b`, `a < b`, ...: nullary, true when some pair of values compares
    pub(super) fn comparison(
        &mut self,
        expr: &Expression,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let comparison = match op {
            BinaryOp::Eq => ComparisonOp::Equal,
            BinaryOp::Ne => ComparisonOp::NotEqual,
            BinaryOp::Lt => ComparisonOp::LessThan,
            BinaryOp::Gt => ComparisonOp::GreaterThan,
            BinaryOp::Le => ComparisonOp::LessOrEqual,
            BinaryOp::Ge => ComparisonOp::GreaterOrEqual,
            other => {
                return Err(TranslationErrorKind::Internal(format!(
                    "{} is not a comparison",
                    other.symbol()
                ))
                .into())
            }
        };
        let left = self.operand(left, env)?;
        let right = self.operand(right, env)?;
        let (a, b) = (&left.relation, &right.relation);
        let (lt, rt) = scalar_types("scalar operator", a, b)?;
        if lt != rt {
            return Err(TranslationErrorKind::ty("Right-hand side of comparison", lt, rt).into());
        }
        let ordered = !matches!(comparison, ComparisonOp::Equal | ComparisonOp::NotEqual);
        if ordered && lt != Type::Number {
            return Err(TranslationErrorKind::ty("Operands of ordering comparison", Type::Number, lt).into());
        }

        let relation = SRelation::new(
            self.fresh_relation(),
            vec![],
            merge_ext(&a.ext_slots, &b.ext_slots),
        );
        let l = self.fresh_var("lhs");
        let r = self.fresh_var("rhs");
        let rule = Rule::new(
            relation.atom(vec![]),
            vec![
                Literal::Positive(a.atom(vec![Term::var(&l)])),
                Literal::Positive(b.atom(vec![Term::var(&r)])),
                Literal::compare(Expr::var(&l), comparison, Expr::var(&r)),
            ],
        );
        let program = self.define(expr, "comparison", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([left.program, right.program, program]),
        })
    }

    /// `a + b`, `a * b` over numeric unary relations
    pub(super) fn arithmetic(
        &mut self,
        expr: &Expression,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        env: &Environment,
    ) -> NodeResult {
        let arith = match op {
            BinaryOp::Add => ArithOp::Add,
            BinaryOp::Mul => ArithOp::Mul,
            other => {
                return Err(TranslationErrorKind::Internal(format!(
                    "{} is not an arithmetic operator",
                    other.symbol()
                ))
                .into())
            }
        };
        let left = self.operand(left, env)?;
        let right = self.operand(right, env)?;
        let (a, b) = (&left.relation, &right.relation);
        let (lt, rt) = scalar_types("scalar operator", a, b)?;
        if lt != Type::Number {
            return Err(TranslationErrorKind::ty("Left-hand side of arithmetic", Type::Number, lt).into());
        }
        if rt != Type::Number {
            return Err(TranslationErrorKind::ty("Right-hand side of arithmetic", Type::Number, rt).into());
        }

        let relation = SRelation::new(
            self.fresh_relation(),
            vec![Slot::new(Type::Number, "val")],
            merge_ext(&a.ext_slots, &b.ext_slots),
        );
        let l = self.fresh_var("lhs");
        let r = self.fresh_var("rhs");
        let out = self.fresh_var("val");
        let rule = Rule::new(
            relation.atom(vec![Term::var(&out)]),
            vec![
                Literal::Positive(a.atom(vec![Term::var(&l)])),
                Literal::Positive(b.atom(vec![Term::var(&r)])),
                Literal::assign(&out, Expr::binary(arith, Expr::var(&l), Expr::var(&r))),
            ],
        );
        let program = self.define(expr, "arithmetic", env, &relation, vec![], vec![rule])?;
        Ok(TranslationResult {
            relation,
            program: concat([left.program, right.program, program]),
        })
    }
}

/// Column types of two unary operands
fn scalar_types(
    operator: &str,
    left: &SRelation,
    right: &SRelation,
) -> Result<(Type, Type), TranslationErrorKind> {
    let Some(lt) = left.first_type().filter(|_| left.arity() == 1) else {
        return Err(TranslationErrorKind::arity(
            &format!("Left-hand side of {operator}"),
            "1",
            left.arity(),
        ));
    };
    let Some(rt) = right.first_type().filter(|_| right.arity() == 1) else {
        return Err(TranslationErrorKind::arity(
            &format!("Right-hand side of {operator}"),
            "1",
            right.arity(),
        ));
    };
    Ok((lt, rt))
}
