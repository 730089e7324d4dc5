//! # Datalog AST - Shared Library
//!
//! Abstract Syntax Tree types for the Souffle dialect of Datalog, plus a
//! deterministic printer. The printer is pure: the same [`Program`] always
//! renders to the same text, one line per command.
//!
//! ```
//! use datalog_ast::{Atom, Attribute, Command, Literal, Program, Rule, Term, Type};
//!
//! let mut program = Program::new();
//! program.push(Command::decl("edge", vec![Attribute::new("x", Type::Number), Attribute::new("y", Type::Number)]));
//! program.push(Command::Input("edge".to_string()));
//! program.push(Command::decl("path", vec![Attribute::new("x", Type::Number), Attribute::new("y", Type::Number)]));
//! program.push(Command::Rule(Rule::new(
//!     Atom::new("path", vec![Term::var("x"), Term::var("y")]),
//!     vec![Literal::Positive(Atom::new("edge", vec![Term::var("x"), Term::var("y")]))],
//! )));
//! program.push(Command::Output("path".to_string()));
//!
//! assert_eq!(
//!     program.to_string(),
//!     ".decl edge(x: number, y: number)\n.input edge\n.decl path(x: number, y: number)\npath(x, y) :- edge(x, y).\n.output path"
//! );
//! ```

use std::collections::BTreeSet;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ============================================================================
// Core AST Types
// ============================================================================

/// Column type of a relation attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Type {
    /// Signed integer (`number` in Souffle)
    Number,
    /// Interned string (`symbol` in Souffle)
    Symbol,
}

impl Type {
    /// Parse a type name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "number" => Some(Type::Number),
            "symbol" => Some(Type::Symbol),
            _ => None,
        }
    }

    /// Get the Souffle spelling of this type
    pub fn as_str(self) -> &'static str {
        match self {
            Type::Number => "number",
            Type::Symbol => "symbol",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed attribute of a relation declaration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
    pub ty: Type,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Attribute {
            name: name.into(),
            ty,
        }
    }
}

/// Argument of an atom
///
/// # Examples
/// ```
/// use datalog_ast::Term;
///
/// assert_eq!(Term::var("x").to_string(), "x");
/// assert_eq!(Term::Wildcard.to_string(), "_");
/// assert_eq!(Term::Symbol("say \"hi\"".to_string()).to_string(), r#""say \"hi\"""#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Variable(String),
    /// The anonymous variable `_`
    Wildcard,
    Number(i64),
    Symbol(String),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    /// Get variable name if this is a variable
    pub fn as_variable(&self) -> Option<&str> {
        if let Term::Variable(name) = self {
            Some(name)
        } else {
            None
        }
    }
}

/// Arithmetic operators usable inside [`Expr`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    /// Parse an arithmetic operator from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            "%" => Some(ArithOp::Mod),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

/// Scalar expression appearing in a constraint literal
///
/// `Raw` carries verbatim expression text (for example a user formula). It is
/// always parenthesized when rendered so it composes safely.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Term(Term),
    Binary {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// String concatenation: `cat(a, b, ...)`
    Cat(Vec<Expr>),
    Raw(String),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Term(Term::var(name))
    }

    pub fn binary(op: ArithOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Variables referenced by this expression. Raw text is opaque and
    /// contributes none.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut BTreeSet<String>) {
        match self {
            Expr::Term(Term::Variable(name)) => {
                vars.insert(name.clone());
            }
            Expr::Term(_) | Expr::Raw(_) => {}
            Expr::Binary { left, right, .. } => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
            Expr::Cat(parts) => {
                for part in parts {
                    part.collect_variables(vars);
                }
            }
        }
    }
}

/// Comparison operators for constraint literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
}

impl ComparisonOp {
    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::LessThan => "<",
            ComparisonOp::LessOrEqual => "<=",
            ComparisonOp::GreaterThan => ">",
            ComparisonOp::GreaterOrEqual => ">=",
        }
    }
}

/// Represents an atom like edge(x, y) or reach(x)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom {
    pub relation: String,
    pub args: Vec<Term>,
}

impl Atom {
    pub fn new(relation: impl Into<String>, args: Vec<Term>) -> Self {
        Atom {
            relation: relation.into(),
            args,
        }
    }

    /// Get all named variables in this atom
    pub fn variables(&self) -> BTreeSet<String> {
        self.args
            .iter()
            .filter_map(Term::as_variable)
            .map(str::to_string)
            .collect()
    }

    /// Get the arity (number of arguments) of this atom
    pub fn arity(&self) -> usize {
        self.args.len()
    }
}

/// Aggregation function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    Count,
    Sum,
    Min,
    Max,
}

impl AggregateFunc {
    /// Parse an aggregate function name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "count" => Some(AggregateFunc::Count),
            "sum" => Some(AggregateFunc::Sum),
            "min" => Some(AggregateFunc::Min),
            "max" => Some(AggregateFunc::Max),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFunc::Count => "count",
            AggregateFunc::Sum => "sum",
            AggregateFunc::Min => "min",
            AggregateFunc::Max => "max",
        }
    }
}

/// An aggregate literal: `result = func target : { atom }`
///
/// `target` is `None` for `count` and names the aggregated variable otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aggregate {
    pub result: String,
    pub func: AggregateFunc,
    pub target: Option<String>,
    pub atom: Atom,
}

/// Represents one element of a rule body
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Positive(Atom),
    Negated(Atom),
    Aggregate(Aggregate),
    /// Inline scalar constraint such as `x < y` or `z = x + y`
    Constraint {
        left: Expr,
        op: ComparisonOp,
        right: Expr,
    },
}

impl Literal {
    /// Shorthand for an assignment constraint `var = expr`
    pub fn assign(var: impl Into<String>, expr: Expr) -> Self {
        Literal::Constraint {
            left: Expr::var(var),
            op: ComparisonOp::Equal,
            right: expr,
        }
    }

    pub fn compare(left: Expr, op: ComparisonOp, right: Expr) -> Self {
        Literal::Constraint { left, op, right }
    }

    /// Relation referenced by this literal, if any
    pub fn relation(&self) -> Option<&str> {
        match self {
            Literal::Positive(atom) | Literal::Negated(atom) => Some(&atom.relation),
            Literal::Aggregate(aggregate) => Some(&aggregate.atom.relation),
            Literal::Constraint { .. } => None,
        }
    }
}

/// Represents a single Datalog rule; a rule with an empty body is a fact
///
/// # Examples
/// ```text
/// reach(y) :- reach(x), edge(x, y).
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<Literal>,
}

impl Rule {
    pub fn new(head: Atom, body: Vec<Literal>) -> Self {
        Rule { head, body }
    }

    /// Check if this rule is a fact (no body)
    pub fn is_fact(&self) -> bool {
        self.body.is_empty()
    }

    /// Check if this rule is recursive (head relation appears in body)
    pub fn is_recursive(&self) -> bool {
        self.body
            .iter()
            .any(|literal| literal.relation() == Some(self.head.relation.as_str()))
    }

    /// Check if this rule is safe: every variable in the head, in a negated
    /// atom, or in a constraint is bound by a positive atom, an aggregate
    /// result, or an assignment from bound variables.
    pub fn is_safe(&self) -> bool {
        self.unbound_variables().is_empty()
    }

    /// Variables that need a binding but have none
    pub fn unbound_variables(&self) -> BTreeSet<String> {
        let mut bound = BTreeSet::new();
        for literal in &self.body {
            match literal {
                Literal::Positive(atom) => bound.extend(atom.variables()),
                Literal::Aggregate(aggregate) => {
                    bound.insert(aggregate.result.clone());
                }
                Literal::Negated(_) | Literal::Constraint { .. } => {}
            }
        }

        // Assignments bind their target once the source is bound.
        loop {
            let mut changed = false;
            for literal in &self.body {
                let Literal::Constraint {
                    left,
                    op: ComparisonOp::Equal,
                    right,
                } = literal
                else {
                    continue;
                };
                for (target, source) in [(left, right), (right, left)] {
                    if let Expr::Term(Term::Variable(name)) = target {
                        if !bound.contains(name)
                            && source.variables().iter().all(|v| bound.contains(v))
                        {
                            bound.insert(name.clone());
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        let mut needed = self.head.variables();
        for literal in &self.body {
            match literal {
                Literal::Negated(atom) => needed.extend(atom.variables()),
                Literal::Constraint { left, right, .. } => {
                    needed.extend(left.variables());
                    needed.extend(right.variables());
                }
                Literal::Positive(_) | Literal::Aggregate(_) => {}
            }
        }

        needed.difference(&bound).cloned().collect()
    }
}

/// A relation declaration, optionally with choice domains
///
/// Each choice domain lists attribute names that must functionally determine
/// the rest of the tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decl {
    pub relation: String,
    pub attributes: Vec<Attribute>,
    pub choice_domains: Vec<Vec<String>>,
}

/// A top-level program element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Rule(Rule),
    Decl(Decl),
    Input(String),
    Output(String),
    /// Line comment, rendered as `// text`
    Comment(String),
    /// Verbatim line (an empty string renders a blank line)
    Raw(String),
    /// Nested commands, flattened when rendered
    Group(Vec<Command>),
}

impl Command {
    /// Plain declaration without choice domains
    pub fn decl(relation: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Command::Decl(Decl {
            relation: relation.into(),
            attributes,
            choice_domains: Vec::new(),
        })
    }

    pub fn blank() -> Self {
        Command::Raw(String::new())
    }
}

/// Represents a complete Datalog program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub commands: Vec<Command>,
}

impl Program {
    /// Create a new empty program
    pub fn new() -> Self {
        Program {
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Append all commands of another program, preserving order
    pub fn append(&mut self, other: Program) {
        self.commands.extend(other.commands);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// All commands in render order, with groups flattened
    pub fn flattened(&self) -> Vec<&Command> {
        fn walk<'a>(commands: &'a [Command], out: &mut Vec<&'a Command>) {
            for command in commands {
                match command {
                    Command::Group(inner) => walk(inner, out),
                    other => out.push(other),
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.commands, &mut out);
        out
    }

    /// Get all rules (including facts)
    pub fn rules(&self) -> Vec<&Rule> {
        self.flattened()
            .into_iter()
            .filter_map(|command| match command {
                Command::Rule(rule) => Some(rule),
                _ => None,
            })
            .collect()
    }

    /// Get all declarations
    pub fn decls(&self) -> Vec<&Decl> {
        self.flattened()
            .into_iter()
            .filter_map(|command| match command {
                Command::Decl(decl) => Some(decl),
                _ => None,
            })
            .collect()
    }

    /// Relations that are referenced (by a rule, `.input`, or `.output`)
    /// before their `.decl`, in order of first offending use
    pub fn undeclared_uses(&self) -> Vec<String> {
        let mut declared: BTreeSet<&str> = BTreeSet::new();
        let mut offending: Vec<String> = Vec::new();
        let mut note = |name: &str, declared: &BTreeSet<&str>| {
            if !declared.contains(name) && !offending.iter().any(|o| o == name) {
                offending.push(name.to_string());
            }
        };
        for command in self.flattened() {
            match command {
                Command::Decl(decl) => {
                    declared.insert(decl.relation.as_str());
                }
                Command::Rule(rule) => {
                    note(&rule.head.relation, &declared);
                    for relation in rule.body.iter().filter_map(Literal::relation) {
                        note(relation, &declared);
                    }
                }
                Command::Input(name) | Command::Output(name) => note(name, &declared),
                Command::Comment(_) | Command::Raw(_) | Command::Group(_) => {}
            }
        }
        offending
    }
}

impl From<Vec<Command>> for Program {
    fn from(commands: Vec<Command>) -> Self {
        Program { commands }
    }
}

// ============================================================================
// Printing
// ============================================================================

/// Render a program as Souffle source text
pub fn program_to_string(program: &Program) -> String {
    program.to_string()
}

fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_symbol(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(name) => f.write_str(name),
            Term::Wildcard => f.write_str("_"),
            Term::Number(n) => write!(f, "{n}"),
            Term::Symbol(s) => write_symbol(f, s),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Term(term) => write!(f, "{term}"),
            Expr::Binary { op, left, right } => write!(f, "({left} {} {right})", op.as_str()),
            Expr::Cat(parts) => {
                f.write_str("cat(")?;
                write_joined(f, parts)?;
                f.write_str(")")
            }
            Expr::Raw(text) => write!(f, "({text})"),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.relation)?;
        write_joined(f, &self.args)?;
        f.write_str(")")
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.result, self.func.as_str())?;
        if let Some(target) = &self.target {
            write!(f, " {target}")?;
        }
        write!(f, " : {{ {} }}", self.atom)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Positive(atom) => write!(f, "{atom}"),
            Literal::Negated(atom) => write!(f, "!{atom}"),
            Literal::Aggregate(aggregate) => write!(f, "{aggregate}"),
            Literal::Constraint { left, op, right } => {
                write!(f, "{left} {} {right}", op.as_str())
            }
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        if !self.body.is_empty() {
            f.write_str(" :- ")?;
            write_joined(f, &self.body)?;
        }
        f.write_str(".")
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".decl {}(", self.relation)?;
        for (i, attribute) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", attribute.name, attribute.ty)?;
        }
        f.write_str(")")?;
        if !self.choice_domains.is_empty() {
            f.write_str(" choice-domain ")?;
            for (i, domain) in self.choice_domains.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                if let [single] = domain.as_slice() {
                    f.write_str(single)?;
                } else {
                    write!(f, "({})", domain.join(", "))?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Rule(rule) => write!(f, "{rule}"),
            Command::Decl(decl) => write!(f, "{decl}"),
            Command::Input(name) => write!(f, ".input {name}"),
            Command::Output(name) => write!(f, ".output {name}"),
            Command::Comment(text) => write!(f, "// {}", text.replace('\n', " ")),
            Command::Raw(text) => f.write_str(text),
            Command::Group(inner) => {
                for (i, command) in inner.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "{command}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.flattened().into_iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{command}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
