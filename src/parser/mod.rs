//! # Relat Parser
//!
//! Turns Relat source text into an [`Expression`] tree. The grammar lives in
//! `relat.pest`; this module walks the pest parse tree and folds each
//! precedence band into AST nodes, attaching a [`Range`] to every node.
//!
//! ## Operator bands (loosest first)
//!
//! | Band | Forms |
//! |------|-------|
//! | binding | `let x = v \| body`, `x, y : c \| body`, `x : c -> body` |
//! | union | `a ; b` |
//! | intersection / difference | `a & b`, `a - b` |
//! | product | `a , b` |
//! | quantifiers | `some a`, `not a` |
//! | comparison | `= != < > <= >=` (`=<` accepted for `<=`) |
//! | arithmetic | `a + b`, then `a * b` (no binary minus; see below) |
//! | aggregates | `#a`, `min a`, `max a`, `sum a` / `Σ a`, `index a`, `concat a` |
//! | chain | `a.b`, `a[b]`, `a[_]`, `a <: b`, `a :> b` |
//! | closure | `^a`, `*a`, `~a` |
//! | atoms | `100`, `'str'`, `"str"`, `` `formula` ``, `<p>`, `(e)`, identifiers |
//!
//! `<p>` is sugar for `p[_]` and `<_>` for the wildcard `_`.
//!
//! `-` always means set difference, so scalar arithmetic outside formulas is
//! `+` and `*` only. Subtraction (and any other Souffle arithmetic) is written
//! inside a backtick formula, e.g. `` x : rel -> `x - 1` ``.
//!
//! ## Example
//!
//! ```rust
//! use relat::parser::parse;
//!
//! let expr = parse("x.y[z]").unwrap();
//! assert_eq!(expr.to_string(), "([] (. x y) z)");
//! ```

use std::fmt;
use std::sync::Arc;

use pest::error::{ErrorVariant, InputLocation};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

use crate::ast::{
    BinaryOp, ComprehensionStyle, Constant, Expression, ExpressionKind, Range, UnaryOp, WILDCARD,
};

#[derive(Parser)]
#[grammar = "parser/relat.pest"]
struct RelatParser;

// ============================================================================
// Errors
// ============================================================================

/// A point in the source text. `line` and `column` are 1-based, `column`
/// counts characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Locate a byte offset in `source`
    pub fn locate(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        Position {
            offset,
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub start: Position,
    pub end: Position,
}

/// Malformed Relat source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct SyntaxError {
    /// Descriptions of what would have been accepted
    pub expected: Vec<String>,
    /// What was found instead (`end of input` at EOF)
    pub found: String,
    pub location: Location,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = self.location.start;
        write!(
            f,
            "Syntax error at line {}, column {}: expected ",
            start.line, start.column
        )?;
        match self.expected.as_slice() {
            [] => f.write_str("nothing")?,
            [only] => f.write_str(only)?,
            [init @ .., last] => write!(f, "{} or {last}", init.join(", "))?,
        }
        write!(f, ", found {}", self.found)
    }
}

impl SyntaxError {
    fn at(source: &str, start: usize, end: usize, expected: Vec<String>) -> Self {
        let found = source
            .get(start..)
            .and_then(|rest| rest.chars().next())
            .map_or_else(|| "end of input".to_string(), |c| format!("{c:?}"));
        SyntaxError {
            expected,
            found,
            location: Location {
                start: Position::locate(source, start),
                end: Position::locate(source, end),
            },
        }
    }

    fn from_pest(source: &str, error: &pest::error::Error<Rule>) -> Self {
        let (start, end) = match error.location {
            InputLocation::Pos(pos) => (pos, pos),
            InputLocation::Span((start, end)) => (start, end),
        };
        let expected = match &error.variant {
            ErrorVariant::ParsingError { positives, .. } => {
                let mut expected: Vec<String> =
                    positives.iter().map(|rule| describe(*rule).to_string()).collect();
                expected.sort();
                expected.dedup();
                expected
            }
            ErrorVariant::CustomError { message } => vec![message.clone()],
        };
        SyntaxError::at(source, start, end, expected)
    }
}

/// Describe a grammar rule for error messages
fn describe(rule: Rule) -> &'static str {
    match rule {
        Rule::EOI => "end of input",
        Rule::ident | Rule::variables => "identifier",
        Rule::number => "number",
        Rule::string | Rule::single_quoted | Rule::double_quoted => "string",
        Rule::formula | Rule::formula_text => "formula",
        Rule::colon => "\":\"",
        Rule::for_body => "\"|\"",
        Rule::from_body => "\"->\"",
        Rule::set_op | Rule::minus => "set operator",
        Rule::cmp_op => "comparison operator",
        Rule::quantifier | Rule::some_kw | Rule::not_kw => "quantifier",
        Rule::aggregate_op
        | Rule::min_kw
        | Rule::max_kw
        | Rule::sum_kw
        | Rule::index_kw
        | Rule::concat_kw => "aggregate",
        Rule::dot_join => "\".\"",
        Rule::wildcard_apply | Rule::application => "\"[\"",
        Rule::prefix_join => "\"<:\"",
        Rule::suffix_join => "\":>\"",
        Rule::tight_op => "closure operator",
        Rule::property => "property",
        Rule::let_kw | Rule::keyword => "keyword",
        _ => "expression",
    }
}

pub type ParseResult<T> = Result<T, SyntaxError>;

// ============================================================================
// Entry Point
// ============================================================================

/// Parse a Relat expression
pub fn parse(source: &str) -> ParseResult<Expression> {
    let mut pairs = RelatParser::parse(Rule::query, source)
        .map_err(|e| SyntaxError::from_pest(source, &e))?;

    let builder = TreeBuilder {
        source: Arc::from(source),
    };
    let query = pairs
        .next()
        .ok_or_else(|| SyntaxError::at(source, 0, 0, vec!["expression".to_string()]))?;
    let expr = query
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| SyntaxError::at(source, 0, source.len(), vec!["expression".to_string()]))?;
    builder.build(expr)
}

// ============================================================================
// Tree Builder
// ============================================================================

struct TreeBuilder {
    source: Arc<str>,
}

impl TreeBuilder {
    fn range(&self, pair: &Pair<'_, Rule>) -> Range {
        let span = pair.as_span();
        Range::new(Arc::clone(&self.source), span.start(), span.end())
    }

    fn malformed(&self, pair: &Pair<'_, Rule>, expected: &str) -> SyntaxError {
        let span = pair.as_span();
        SyntaxError::at(&self.source, span.start(), span.end(), vec![expected.to_string()])
    }

    fn next<'i>(
        &self,
        parent: &Pair<'i, Rule>,
        inner: &mut pest::iterators::Pairs<'i, Rule>,
    ) -> ParseResult<Pair<'i, Rule>> {
        inner
            .next()
            .ok_or_else(|| self.malformed(parent, describe(parent.as_rule())))
    }

    fn build(&self, pair: Pair<'_, Rule>) -> ParseResult<Expression> {
        match pair.as_rule() {
            Rule::expr | Rule::union | Rule::product | Rule::sum_expr | Rule::mul_expr => {
                let op = match pair.as_rule() {
                    Rule::union => Some(BinaryOp::Union),
                    Rule::product => Some(BinaryOp::Product),
                    Rule::sum_expr => Some(BinaryOp::Add),
                    Rule::mul_expr => Some(BinaryOp::Mul),
                    _ => None,
                };
                self.fold_left(pair, op)
            }
            Rule::intersection => self.fold_left(pair, None),
            Rule::let_expr => self.build_let(pair),
            Rule::comprehension => self.build_comprehension(pair),
            Rule::prefixed => self.build_prefixed(pair),
            Rule::comparison => self.build_comparison(pair),
            Rule::aggregate => self.build_aggregate(pair),
            Rule::chain => self.build_chain(pair),
            Rule::tight => self.build_tight(pair),
            Rule::number => {
                let range = self.range(&pair);
                // Souffle's default `number` domain is 32-bit.
                let value = pair
                    .as_str()
                    .parse::<i32>()
                    .map_err(|_| self.malformed(&pair, "number that fits in 32 bits"))?;
                Ok(Expression::new(
                    ExpressionKind::Constant(Constant::Number(i64::from(value))),
                    range,
                ))
            }
            Rule::string => {
                let range = self.range(&pair);
                let raw = pair.clone().into_inner().next().map_or("", |p| p.as_str());
                Ok(Expression::new(
                    ExpressionKind::Constant(Constant::Str(unescape(raw))),
                    range,
                ))
            }
            Rule::formula => {
                let range = self.range(&pair);
                let raw = pair.into_inner().next().map_or("", |p| p.as_str());
                Ok(Expression::new(
                    ExpressionKind::Formula(raw.trim().to_string()),
                    range,
                ))
            }
            Rule::property => {
                let range = self.range(&pair);
                let mut inner = pair.clone().into_inner();
                let name = self.next(&pair, &mut inner)?;
                let ident = Expression::new(
                    ExpressionKind::Identifier(name.as_str().to_string()),
                    self.range(&name),
                );
                if name.as_str() == WILDCARD {
                    Ok(Expression::new(ident.kind, range))
                } else {
                    Ok(Expression::new(
                        ExpressionKind::Unary {
                            op: UnaryOp::WildcardApply,
                            operand: Box::new(ident),
                        },
                        range,
                    ))
                }
            }
            Rule::ident => Ok(Expression::new(
                ExpressionKind::Identifier(pair.as_str().to_string()),
                self.range(&pair),
            )),
            _ => Err(self.malformed(&pair, "expression")),
        }
    }

    /// Fold `a op b op c` into `((a op b) op c)`. With `fixed == None` the
    /// operator is read from interleaved `set_op` pairs; a lone child is
    /// passed through unchanged.
    fn fold_left(&self, pair: Pair<'_, Rule>, fixed: Option<BinaryOp>) -> ParseResult<Expression> {
        let mut inner = pair.clone().into_inner();
        let first = self.next(&pair, &mut inner)?;
        let mut acc = self.build(first)?;
        while let Some(next) = inner.next() {
            let (op, operand) = if next.as_rule() == Rule::set_op {
                let op = if next.as_str().trim() == "&" {
                    BinaryOp::Intersection
                } else {
                    BinaryOp::Difference
                };
                (op, self.next(&pair, &mut inner)?)
            } else {
                let op = fixed.ok_or_else(|| self.malformed(&next, "operator"))?;
                (op, next)
            };
            let right = self.build(operand)?;
            acc = self.combine(op, acc, right);
        }
        Ok(acc)
    }

    fn combine(&self, op: BinaryOp, left: Expression, right: Expression) -> Expression {
        let range = Range::new(Arc::clone(&self.source), left.range.start, right.range.end);
        Expression::new(
            ExpressionKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            range,
        )
    }

    fn build_let(&self, pair: Pair<'_, Rule>) -> ParseResult<Expression> {
        let range = self.range(&pair);
        let mut inner = pair.clone().into_inner().filter(|p| p.as_rule() != Rule::let_kw);
        let missing = || self.malformed(&pair, "let binding");
        let variable = inner.next().ok_or_else(missing)?.as_str().to_string();
        let value = self.build(inner.next().ok_or_else(missing)?)?;
        let body = self.build(inner.next().ok_or_else(missing)?)?;
        Ok(Expression::new(
            ExpressionKind::Let {
                variable,
                value: Box::new(value),
                body: Box::new(body),
            },
            range,
        ))
    }

    fn build_comprehension(&self, pair: Pair<'_, Rule>) -> ParseResult<Expression> {
        let range = self.range(&pair);
        let mut inner = pair.clone().into_inner().filter(|p| p.as_rule() != Rule::colon);
        let missing = || self.malformed(&pair, "comprehension");

        let variables: Vec<String> = inner
            .next()
            .ok_or_else(missing)?
            .into_inner()
            .map(|p| p.as_str().to_string())
            .collect();
        let constraint = self.build(inner.next().ok_or_else(missing)?)?;
        let tail = inner.next().ok_or_else(missing)?;
        let style = if tail.as_rule() == Rule::from_body {
            ComprehensionStyle::From
        } else {
            ComprehensionStyle::For
        };
        let body_pair = tail.into_inner().next().ok_or_else(missing)?;
        let body = self.build(body_pair)?;

        Ok(Expression::new(
            ExpressionKind::Comprehension {
                variables,
                constraint: Box::new(constraint),
                body: Box::new(body),
                style,
            },
            range,
        ))
    }

    fn build_prefixed(&self, pair: Pair<'_, Rule>) -> ParseResult<Expression> {
        let range = self.range(&pair);
        let mut inner = pair.clone().into_inner();
        let first = self.next(&pair, &mut inner)?;
        if first.as_rule() != Rule::quantifier {
            return self.build(first);
        }
        let op = if first.as_str().trim() == "some" {
            UnaryOp::Some
        } else {
            UnaryOp::Not
        };
        let operand = self.build(self.next(&pair, &mut inner)?)?;
        Ok(unary(op, operand, range))
    }

    fn build_comparison(&self, pair: Pair<'_, Rule>) -> ParseResult<Expression> {
        let mut inner = pair.clone().into_inner();
        let left = self.build(self.next(&pair, &mut inner)?)?;
        let Some(op_pair) = inner.next() else {
            return Ok(left);
        };
        let op = match op_pair.as_str() {
            "=" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            ">" => BinaryOp::Gt,
            "<=" | "=<" => BinaryOp::Le,
            ">=" => BinaryOp::Ge,
            _ => return Err(self.malformed(&op_pair, "comparison operator")),
        };
        let right = self.build(self.next(&pair, &mut inner)?)?;
        Ok(self.combine(op, left, right))
    }

    fn build_aggregate(&self, pair: Pair<'_, Rule>) -> ParseResult<Expression> {
        let range = self.range(&pair);
        let mut inner = pair.clone().into_inner();
        let first = self.next(&pair, &mut inner)?;
        if first.as_rule() != Rule::aggregate_op {
            return self.build(first);
        }
        let op = match first.as_str() {
            "#" => UnaryOp::Count,
            "min" => UnaryOp::Min,
            "max" => UnaryOp::Max,
            "sum" | "Σ" => UnaryOp::Sum,
            "index" => UnaryOp::Index,
            "concat" => UnaryOp::Concat,
            _ => return Err(self.malformed(&first, "aggregate")),
        };
        let operand = self.build(self.next(&pair, &mut inner)?)?;
        Ok(unary(op, operand, range))
    }

    fn build_chain(&self, pair: Pair<'_, Rule>) -> ParseResult<Expression> {
        let mut inner = pair.clone().into_inner();
        let mut acc = self.build(self.next(&pair, &mut inner)?)?;
        for postfix in inner {
            let end = postfix.as_span().end();
            let range = Range::new(Arc::clone(&self.source), acc.range.start, end);
            acc = match postfix.as_rule() {
                Rule::wildcard_apply => unary(UnaryOp::WildcardApply, acc, range),
                rule => {
                    let op = match rule {
                        Rule::dot_join => BinaryOp::Join,
                        Rule::application => BinaryOp::Apply,
                        Rule::prefix_join => BinaryOp::PrefixJoin,
                        Rule::suffix_join => BinaryOp::SuffixJoin,
                        _ => return Err(self.malformed(&postfix, "join")),
                    };
                    let mut operand = postfix.clone().into_inner();
                    let right = self.build(self.next(&postfix, &mut operand)?)?;
                    Expression::new(
                        ExpressionKind::Binary {
                            op,
                            left: Box::new(acc),
                            right: Box::new(right),
                        },
                        range,
                    )
                }
            };
        }
        Ok(acc)
    }

    fn build_tight(&self, pair: Pair<'_, Rule>) -> ParseResult<Expression> {
        let range = self.range(&pair);
        let mut inner = pair.clone().into_inner();
        let first = self.next(&pair, &mut inner)?;
        if first.as_rule() != Rule::tight_op {
            return self.build(first);
        }
        let op = match first.as_str() {
            "^" => UnaryOp::Closure,
            "*" => UnaryOp::ReflexiveClosure,
            "~" => UnaryOp::Transpose,
            _ => return Err(self.malformed(&first, "closure operator")),
        };
        let operand = self.build(self.next(&pair, &mut inner)?)?;
        Ok(unary(op, operand, range))
    }
}

fn unary(op: UnaryOp, operand: Expression, range: Range) -> Expression {
    Expression::new(
        ExpressionKind::Unary {
            op,
            operand: Box::new(operand),
        },
        range,
    )
}

/// Resolve backslash escapes in a string literal body
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
