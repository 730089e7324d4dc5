//! `index` and `concat`: operators that impose an order on a relation.
//!
//! `index a` numbers the tuples of `a` densely from 0 within each group of
//! external values. The rank relation is declared with two choice domains,
//! `(columns.., ext..)` and `(rank, ext..)`, so each tuple receives exactly
//! one rank and each rank is held by exactly one tuple. The order is
//! whatever the engine picks.
//!
//! `concat a` folds the last (symbol) column of `a` in rank order, joining
//! with `,`, and keeps the value accumulated at the highest rank.

use datalog_ast::{Aggregate, AggregateFunc, ArithOp, Expr, Literal, Program, Rule, Term, Type};

use crate::ast::Expression;

use super::environment::Environment;
use super::error::{Fault, TranslationErrorKind};
use super::relation::{ext_var, SRelation, Slot};
use super::{concat, vars, NodeResult, TranslationResult, Translator};

const SEPARATOR: &str = ",";

impl Translator {
    pub(super) fn index(&mut self, expr: &Expression, operand: &Expression, env: &Environment) -> NodeResult {
        let operand = self.operand(operand, env)?;
        let indexed = self.rank(expr, &operand.relation, env)?;
        Ok(TranslationResult {
            relation: indexed.relation,
            program: concat([operand.program, indexed.program]),
        })
    }

    pub(super) fn concat(&mut self, expr: &Expression, operand: &Expression, env: &Environment) -> NodeResult {
        let operand = self.operand(operand, env)?;
        let a = &operand.relation;
        match a.last_type() {
            None => return Err(TranslationErrorKind::arity("Operand of concat", "> 0", 0).into()),
            Some(Type::Symbol) => {}
            Some(found) => {
                return Err(TranslationErrorKind::ty("Last column of concat operand", Type::Symbol, found).into())
            }
        }

        let indexed = self.rank(expr, a, env)?;
        let ranked = &indexed.relation;
        let ext = a.ext_slots.clone();
        let leading = vec![Term::Wildcard; a.arity() - 1];

        // Running concatenation, one row per rank
        let acc = SRelation::new(
            self.fresh_relation(),
            vec![Slot::new(Type::Number, "idx"), Slot::new(Type::Symbol, "acc")],
            ext.clone(),
        );
        let first = self.fresh_var("str");
        let base = Rule::new(
            acc.atom(vec![Term::Number(0), Term::var(&first)]),
            vec![Literal::Positive(
                ranked.atom(ranked_args(Term::Number(0), &leading, Term::var(&first))),
            )],
        );
        let (prev_rank, prev_acc) = (self.fresh_var("idx"), self.fresh_var("acc"));
        let (rank, next, joined) = (self.fresh_var("idx"), self.fresh_var("str"), self.fresh_var("acc"));
        let step = Rule::new(
            acc.atom(vec![Term::var(&rank), Term::var(&joined)]),
            vec![
                Literal::Positive(acc.atom(vec![Term::var(&prev_rank), Term::var(&prev_acc)])),
                Literal::Positive(ranked.atom(ranked_args(Term::var(&rank), &leading, Term::var(&next)))),
                Literal::assign(
                    &rank,
                    Expr::binary(ArithOp::Add, Expr::var(&prev_rank), Expr::Term(Term::Number(1))),
                ),
                Literal::assign(
                    &joined,
                    Expr::Cat(vec![
                        Expr::var(&prev_acc),
                        Expr::Term(Term::Symbol(SEPARATOR.to_string())),
                        Expr::var(&next),
                    ]),
                ),
            ],
        );
        let acc_program = self.define(expr, "concat accumulator", env, &acc, vec![], vec![base, step])?;

        // Highest rank per group
        let top = SRelation::new(self.fresh_relation(), vec![Slot::new(Type::Number, "top")], ext.clone());
        let (max_rank, each) = (self.fresh_var("top"), self.fresh_var("idx"));
        let mut any_tuple = vec![Term::Wildcard];
        any_tuple.extend(vec![Term::Wildcard; a.arity()]);
        let mut each_tuple = vec![Term::var(&each)];
        each_tuple.extend(vec![Term::Wildcard; a.arity()]);
        let top_rule = Rule::new(
            top.atom(vec![Term::var(&max_rank)]),
            vec![
                Literal::Positive(ranked.atom(any_tuple)),
                Literal::Aggregate(Aggregate {
                    result: max_rank.clone(),
                    func: AggregateFunc::Max,
                    target: Some(each.clone()),
                    atom: ranked.atom(each_tuple),
                }),
            ],
        );
        let top_program = self.define(expr, "concat top index", env, &top, vec![], vec![top_rule])?;

        let relation = SRelation::new(self.fresh_relation(), vec![Slot::new(Type::Symbol, "concat")], ext);
        let (last, result) = (self.fresh_var("top"), self.fresh_var("str"));
        let rule = Rule::new(
            relation.atom(vec![Term::var(&result)]),
            vec![
                Literal::Positive(top.atom(vec![Term::var(&last)])),
                Literal::Positive(acc.atom(vec![Term::var(&last), Term::var(&result)])),
            ],
        );
        let program = self.define(expr, "concat", env, &relation, vec![], vec![rule])?;

        Ok(TranslationResult {
            relation,
            program: concat([operand.program, indexed.program, acc_program, top_program, program]),
        })
    }

    /// Rank relation over an already translated operand
    fn rank(&mut self, expr: &Expression, a: &SRelation, env: &Environment) -> Result<TranslationResult, Fault> {
        if a.arity() == 0 {
            return Err(TranslationErrorKind::arity("Operand of index", "> 0", 0).into());
        }
        let mut int_slots = vec![Slot::new(Type::Number, "idx")];
        int_slots.extend(a.int_slots.iter().cloned());
        let relation = SRelation::new(self.fresh_relation(), int_slots, a.ext_slots.clone());

        let attributes = relation.attribute_names();
        let ext_attributes: Vec<String> = a.ext_slots.iter().map(|name| ext_var(name)).collect();
        let columns_domain = attributes[1..].to_vec();
        let mut rank_domain = vec![attributes[0].clone()];
        rank_domain.extend(ext_attributes);

        let columns = self.fresh_vars(&a.int_slots);
        let mut base_head = vec![Term::Number(0)];
        base_head.extend(vars(&columns));
        let base = Rule::new(relation.atom(base_head), vec![Literal::Positive(a.atom(vars(&columns)))]);

        let (prev, next) = (self.fresh_var("idx"), self.fresh_var("idx"));
        let mut step_head = vec![Term::var(&next)];
        step_head.extend(vars(&columns));
        let mut prev_row = vec![Term::var(&prev)];
        prev_row.extend(vec![Term::Wildcard; a.arity()]);
        let step = Rule::new(
            relation.atom(step_head),
            vec![
                Literal::Positive(relation.atom(prev_row)),
                Literal::Positive(a.atom(vars(&columns))),
                Literal::assign(
                    &next,
                    Expr::binary(ArithOp::Add, Expr::var(&prev), Expr::Term(Term::Number(1))),
                ),
            ],
        );

        let program: Program = self.define(
            expr,
            "index",
            env,
            &relation,
            vec![columns_domain, rank_domain],
            vec![base, step],
        )?;
        Ok(TranslationResult { relation, program })
    }
}

/// `(rank, _.., last)` arguments for an atom over a rank relation
fn ranked_args(rank: Term, leading: &[Term], last: Term) -> Vec<Term> {
    let mut args = vec![rank];
    args.extend(leading.iter().cloned());
    args.push(last);
    args
}
