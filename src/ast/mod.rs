//! # Relat AST
//!
//! The expression tree produced by the parser and consumed by the translator.
//! Nodes are immutable once built and every node carries the [`Range`] of
//! source text it was parsed from, so errors and generated Datalog comments
//! can quote the exact subexpression.
//!
//! ## Rendering
//!
//! `Display` renders a compact s-expression (`x.y[z]` becomes
//! `([] (. x y) z)`). It ignores ranges and is what the parser tests compare
//! against.
//!
//! ## Builders
//!
//! See the [`builders`] module for terse constructors used in tests.

use std::fmt;
use std::sync::Arc;

pub mod builders;

// ============================================================================
// Source Ranges
// ============================================================================

/// Byte range into the source text a node was parsed from
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Range {
    pub source: Arc<str>,
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(source: Arc<str>, start: usize, end: usize) -> Self {
        Range { source, start, end }
    }

    /// Range for nodes that were not parsed from text
    pub fn synthetic() -> Self {
        Range {
            source: Arc::from(""),
            start: 0,
            end: 0,
        }
    }

    /// The source text this range covers
    pub fn text(&self) -> &str {
        self.source.get(self.start..self.end).unwrap_or("")
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} {:?}", self.start, self.end, self.text())
    }
}

// ============================================================================
// Operators
// ============================================================================

/// Prefix operators (plus the postfix `[_]`, which takes one operand)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Some,
    Not,
    /// `#`
    Count,
    /// `^`
    Closure,
    /// `*`
    ReflexiveClosure,
    /// `~`
    Transpose,
    Min,
    Max,
    /// `sum` or `Σ`
    Sum,
    /// `x[_]`: drop the first column
    WildcardApply,
    Index,
    Concat,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Some => "some",
            UnaryOp::Not => "not",
            UnaryOp::Count => "#",
            UnaryOp::Closure => "^",
            UnaryOp::ReflexiveClosure => "*",
            UnaryOp::Transpose => "~",
            UnaryOp::Min => "min",
            UnaryOp::Max => "max",
            UnaryOp::Sum => "sum",
            UnaryOp::WildcardApply => "[_]",
            UnaryOp::Index => "index",
            UnaryOp::Concat => "concat",
        }
    }

    /// Human-readable operator name used in generated comments and errors
    pub fn describe(self) -> &'static str {
        match self {
            UnaryOp::Some => "some",
            UnaryOp::Not => "not",
            UnaryOp::Count => "count",
            UnaryOp::Closure => "transitive closure",
            UnaryOp::ReflexiveClosure => "reflexive transitive closure",
            UnaryOp::Transpose => "transpose",
            UnaryOp::Min => "min",
            UnaryOp::Max => "max",
            UnaryOp::Sum => "sum",
            UnaryOp::WildcardApply => "wildcard application",
            UnaryOp::Index => "index",
            UnaryOp::Concat => "concat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `.`
    Join,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    /// `;`
    Union,
    /// `&`
    Intersection,
    /// `,`
    Product,
    /// `x[y]`
    Apply,
    /// `-`
    Difference,
    /// `<:`
    PrefixJoin,
    /// `:>`
    SuffixJoin,
    Add,
    Mul,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Join => ".",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Union => ";",
            BinaryOp::Intersection => "&",
            BinaryOp::Product => ",",
            BinaryOp::Apply => "[]",
            BinaryOp::Difference => "-",
            BinaryOp::PrefixJoin => "<:",
            BinaryOp::SuffixJoin => ":>",
            BinaryOp::Add => "+",
            BinaryOp::Mul => "*",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            BinaryOp::Join => "dot-join",
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => "comparison",
            BinaryOp::Union => "union",
            BinaryOp::Intersection => "intersection",
            BinaryOp::Product => "cartesian product",
            BinaryOp::Apply => "application",
            BinaryOp::Difference => "difference",
            BinaryOp::PrefixJoin => "prefix join",
            BinaryOp::SuffixJoin => "suffix join",
            BinaryOp::Add | BinaryOp::Mul => "arithmetic",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Mul)
    }
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Number(i64),
    Str(String),
}

/// Whether a comprehension keeps its bound variables as result columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComprehensionStyle {
    /// `x : c | body`: result is `(x, body...)`
    For,
    /// `x : c -> body`: result is `(body...)`
    From,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    Constant(Constant),
    Identifier(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Comprehension {
        variables: Vec<String>,
        constraint: Box<Expression>,
        body: Box<Expression>,
        style: ComprehensionStyle,
    },
    Let {
        variable: String,
        value: Box<Expression>,
        body: Box<Expression>,
    },
    /// Raw numeric expression in backticks
    Formula(String),
}

/// A parsed Relat expression with its source range
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub range: Range,
}

/// Identifier that stands for "any value" next to `.`
pub const WILDCARD: &str = "_";

impl Expression {
    pub fn new(kind: ExpressionKind, range: Range) -> Self {
        Expression { kind, range }
    }

    /// Source text of this node
    pub fn text(&self) -> &str {
        self.range.text()
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(&self.kind, ExpressionKind::Identifier(name) if name == WILDCARD)
    }

    /// Short tag naming the node type (`identifier`, `binary`, ...)
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            ExpressionKind::Constant(_) => "constant",
            ExpressionKind::Identifier(_) => "identifier",
            ExpressionKind::Unary { .. } => "unary",
            ExpressionKind::Binary { .. } => "binary",
            ExpressionKind::Comprehension { .. } => "comprehension",
            ExpressionKind::Let { .. } => "let",
            ExpressionKind::Formula(_) => "formula",
        }
    }

    /// Number of nodes in the tree
    pub fn size(&self) -> usize {
        1 + match &self.kind {
            ExpressionKind::Constant(_)
            | ExpressionKind::Identifier(_)
            | ExpressionKind::Formula(_) => 0,
            ExpressionKind::Unary { operand, .. } => operand.size(),
            ExpressionKind::Binary { left, right, .. } => left.size() + right.size(),
            ExpressionKind::Comprehension {
                constraint, body, ..
            } => constraint.size() + body.size(),
            ExpressionKind::Let { value, body, .. } => value.size() + body.size(),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Number(n) => write!(f, "{n}"),
            Constant::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Constant(c) => write!(f, "{c}"),
            ExpressionKind::Identifier(name) => f.write_str(name),
            ExpressionKind::Unary { op, operand } => write!(f, "({} {operand})", op.symbol()),
            ExpressionKind::Binary { op, left, right } => {
                write!(f, "({} {left} {right})", op.symbol())
            }
            ExpressionKind::Comprehension {
                variables,
                constraint,
                body,
                style,
            } => {
                let tag = match style {
                    ComprehensionStyle::For => "for",
                    ComprehensionStyle::From => "from",
                };
                write!(f, "({tag} ({}) {constraint} {body})", variables.join(" "))
            }
            ExpressionKind::Let {
                variable,
                value,
                body,
            } => write!(f, "(let {variable} {value} {body})"),
            ExpressionKind::Formula(raw) => write!(f, "`{raw}`"),
        }
    }
}
