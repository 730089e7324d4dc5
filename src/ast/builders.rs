//! Builder Functions for AST Construction
//!
//! Terse constructors for [`Expression`] trees, mostly for tests. Nodes built
//! here carry [`Range::synthetic`] ranges.
//!
//! ## Example
//!
//! ```rust
//! use relat::ast::builders::{comprehension, ident, join, unary};
//! use relat::ast::UnaryOp;
//!
//! // x : isPerson | some x.hasChild
//! let query = comprehension(
//!     &["x"],
//!     ident("isPerson"),
//!     unary(UnaryOp::Some, join(ident("x"), ident("hasChild"))),
//! );
//! assert_eq!(query.to_string(), "(for (x) isPerson (some (. x hasChild)))");
//! ```

use super::{BinaryOp, ComprehensionStyle, Constant, Expression, ExpressionKind, Range, UnaryOp};

fn node(kind: ExpressionKind) -> Expression {
    Expression::new(kind, Range::synthetic())
}

pub fn ident(name: &str) -> Expression {
    node(ExpressionKind::Identifier(name.to_string()))
}

pub fn number(value: i64) -> Expression {
    node(ExpressionKind::Constant(Constant::Number(value)))
}

pub fn string(value: &str) -> Expression {
    node(ExpressionKind::Constant(Constant::Str(value.to_string())))
}

pub fn formula(raw: &str) -> Expression {
    node(ExpressionKind::Formula(raw.to_string()))
}

pub fn unary(op: UnaryOp, operand: Expression) -> Expression {
    node(ExpressionKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Expression {
    node(ExpressionKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// `left.right`
pub fn join(left: Expression, right: Expression) -> Expression {
    binary(BinaryOp::Join, left, right)
}

/// `relation[argument]`
pub fn apply(relation: Expression, argument: Expression) -> Expression {
    binary(BinaryOp::Apply, relation, argument)
}

/// `vars : constraint | body`
pub fn comprehension(variables: &[&str], constraint: Expression, body: Expression) -> Expression {
    comprehension_with_style(variables, constraint, body, ComprehensionStyle::For)
}

/// `vars : constraint -> body`
pub fn comprehension_from(variables: &[&str], constraint: Expression, body: Expression) -> Expression {
    comprehension_with_style(variables, constraint, body, ComprehensionStyle::From)
}

fn comprehension_with_style(
    variables: &[&str],
    constraint: Expression,
    body: Expression,
    style: ComprehensionStyle,
) -> Expression {
    node(ExpressionKind::Comprehension {
        variables: variables.iter().map(|v| (*v).to_string()).collect(),
        constraint: Box::new(constraint),
        body: Box::new(body),
        style,
    })
}

/// `let variable = value | body`
pub fn let_in(variable: &str, value: Expression, body: Expression) -> Expression {
    node(ExpressionKind::Let {
        variable: variable.to_string(),
        value: Box::new(value),
        body: Box::new(body),
    })
}
