//! # Runtime Values
//!
//! Relations exchanged with the Datalog engine: a list of column [`Type`]s
//! and a list of tuples.
//!
//! ## Booleans
//!
//! An arity-0 relation is a boolean. With no tuples it is false; with exactly
//! one empty tuple it is true.
//!
//! ## JSON
//!
//! Relations serialize as `{"types": ["number"], "tuples": [[1], [2]]}`.
//! Input files may also be a bare array of tuples, in which case the column
//! types are inferred from the first tuple.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use datalog_ast::Type;

/// A single column value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(i64),
    Symbol(String),
}

impl Value {
    pub fn type_of(&self) -> Type {
        match self {
            Value::Number(_) => Type::Number,
            Value::Symbol(_) => Type::Symbol,
        }
    }

    /// Convert to the given column type. Symbols that spell an integer become
    /// numbers; numbers become their decimal spelling.
    pub fn coerce(self, ty: Type) -> Option<Value> {
        match (self, ty) {
            (v @ Value::Number(_), Type::Number) | (v @ Value::Symbol(_), Type::Symbol) => Some(v),
            (Value::Number(n), Type::Symbol) => Some(Value::Symbol(n.to_string())),
            (Value::Symbol(s), Type::Number) => s.trim().parse().ok().map(Value::Number),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Symbol(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Symbol(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Symbol(s)
    }
}

/// Errors raised when a relation's tuples disagree with its types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("Cannot infer types of empty relation")]
    EmptyInference,

    #[error("Tuple {row} has {found} values, expected {expected}")]
    WidthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Tuple {row}, column {column}: expected {expected}, found {found}")]
    TypeMismatch {
        row: usize,
        column: usize,
        expected: Type,
        found: String,
    },

    #[error("Invalid relation JSON: {0}")]
    Json(String),
}

pub type ValueResult<T> = Result<T, ValueError>;

/// A typed set of tuples
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Relation {
    pub types: Vec<Type>,
    pub tuples: Vec<Vec<Value>>,
}

/// Shape accepted from JSON input files
#[derive(Deserialize)]
#[serde(untagged)]
enum RelationInput {
    Typed(Relation),
    Raw(Vec<Vec<Value>>),
}

impl Relation {
    /// Build a relation and check its invariants
    pub fn new(types: Vec<Type>, tuples: Vec<Vec<Value>>) -> ValueResult<Self> {
        let relation = Relation { types, tuples };
        relation.validate()?;
        Ok(relation)
    }

    /// Infer column types from the first tuple
    pub fn infer(tuples: Vec<Vec<Value>>) -> ValueResult<Self> {
        let first = tuples.first().ok_or(ValueError::EmptyInference)?;
        let types = first.iter().map(Value::type_of).collect();
        Relation::new(types, tuples)
    }

    /// The arity-0 relation for a boolean
    pub fn boolean(value: bool) -> Self {
        Relation {
            types: Vec::new(),
            tuples: if value { vec![Vec::new()] } else { Vec::new() },
        }
    }

    pub fn arity(&self) -> usize {
        self.types.len()
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Truth value of an arity-0 relation; `None` for other arities
    pub fn as_bool(&self) -> Option<bool> {
        if self.types.is_empty() {
            Some(!self.tuples.is_empty())
        } else {
            None
        }
    }

    /// Check tuple widths and value kinds against `types`
    pub fn validate(&self) -> ValueResult<()> {
        for (row, tuple) in self.tuples.iter().enumerate() {
            if tuple.len() != self.types.len() {
                return Err(ValueError::WidthMismatch {
                    row,
                    expected: self.types.len(),
                    found: tuple.len(),
                });
            }
            for (column, (value, ty)) in tuple.iter().zip(&self.types).enumerate() {
                if value.type_of() != *ty {
                    return Err(ValueError::TypeMismatch {
                        row,
                        column,
                        expected: *ty,
                        found: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Re-type every column, converting values where needed
    pub fn coerce(self, types: &[Type]) -> ValueResult<Self> {
        let mut tuples = Vec::with_capacity(self.tuples.len());
        for (row, tuple) in self.tuples.into_iter().enumerate() {
            if tuple.len() != types.len() {
                return Err(ValueError::WidthMismatch {
                    row,
                    expected: types.len(),
                    found: tuple.len(),
                });
            }
            let mut converted = Vec::with_capacity(tuple.len());
            for (column, (value, ty)) in tuple.into_iter().zip(types).enumerate() {
                let found = value.to_string();
                converted.push(value.coerce(*ty).ok_or(ValueError::TypeMismatch {
                    row,
                    column,
                    expected: *ty,
                    found,
                })?);
            }
            tuples.push(converted);
        }
        Ok(Relation {
            types: types.to_vec(),
            tuples,
        })
    }

    /// Sort tuples and drop duplicates
    pub fn normalize(mut self) -> Self {
        self.tuples.sort();
        self.tuples.dedup();
        self
    }

    /// Parse either a typed relation object or a bare array of tuples
    pub fn from_json(text: &str) -> ValueResult<Self> {
        let input: RelationInput =
            serde_json::from_str(text).map_err(|e| ValueError::Json(e.to_string()))?;
        match input {
            RelationInput::Typed(relation) => {
                relation.validate()?;
                Ok(relation)
            }
            RelationInput::Raw(tuples) => Relation::infer(tuples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[i64]) -> Vec<Vec<Value>> {
        values.iter().map(|v| vec![Value::Number(*v)]).collect()
    }

    #[test]
    fn test_infer_from_first_tuple() {
        let rel = Relation::infer(vec![vec![Value::Number(1), Value::from("a")]]).unwrap();
        assert_eq!(rel.types, vec![Type::Number, Type::Symbol]);
    }

    #[test]
    fn test_infer_empty_fails() {
        assert_eq!(Relation::infer(vec![]), Err(ValueError::EmptyInference));
    }

    #[test]
    fn test_validate_width() {
        let err = Relation::new(vec![Type::Number], vec![vec![]]).unwrap_err();
        assert!(matches!(err, ValueError::WidthMismatch { row: 0, expected: 1, found: 0 }));
    }

    #[test]
    fn test_validate_kind() {
        let err = Relation::new(vec![Type::Number], vec![vec![Value::from("x")]]).unwrap_err();
        assert!(matches!(err, ValueError::TypeMismatch { column: 0, .. }));
    }

    #[test]
    fn test_booleans() {
        assert_eq!(Relation::boolean(true).as_bool(), Some(true));
        assert_eq!(Relation::boolean(false).as_bool(), Some(false));
        let rel = Relation::new(vec![Type::Number], numbers(&[1])).unwrap();
        assert_eq!(rel.as_bool(), None);
    }

    #[test]
    fn test_coerce() {
        let raw = Relation {
            types: vec![],
            tuples: vec![vec![Value::from("12"), Value::Number(7)]],
        };
        let typed = raw.coerce(&[Type::Number, Type::Symbol]).unwrap();
        assert_eq!(typed.tuples, vec![vec![Value::Number(12), Value::from("7")]]);

        let bad = Relation {
            types: vec![],
            tuples: vec![vec![Value::from("abc")]],
        };
        assert!(bad.coerce(&[Type::Number]).is_err());
    }

    #[test]
    fn test_normalize_sorts_and_dedups() {
        let rel = Relation {
            types: vec![Type::Number],
            tuples: numbers(&[300, 100, 300, 200]),
        }
        .normalize();
        assert_eq!(rel.tuples, numbers(&[100, 200, 300]));
    }

    #[test]
    fn test_json_forms() {
        let typed = Relation::from_json(r#"{"types": ["number"], "tuples": [[1], [2]]}"#).unwrap();
        assert_eq!(typed.tuples, numbers(&[1, 2]));

        let raw = Relation::from_json(r#"[["alice", 3]]"#).unwrap();
        assert_eq!(raw.types, vec![Type::Symbol, Type::Number]);

        assert!(matches!(Relation::from_json("{"), Err(ValueError::Json(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let rel = Relation::new(vec![Type::Symbol], vec![vec![Value::from("x")]]).unwrap();
        let json = serde_json::to_string(&rel).unwrap();
        assert_eq!(json, r#"{"types":["symbol"],"tuples":[["x"]]}"#);
        let back: Relation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rel);
    }
}
