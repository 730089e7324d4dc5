//! Scoped relations: the translator's description of a generated relation.
//!
//! A relation has internal slots (its real columns) followed by external
//! slots. External slots name scalar variables in scope that the relation's
//! contents depend on; in rules they are always written as the shared
//! variable `<name>_e`, which is what ties a relation to its context.

use std::fmt;

use datalog_ast::{Atom, Attribute, Command, Decl, Term, Type};

use super::environment::Environment;
use super::error::TranslationErrorKind;

/// One internal column
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Slot {
    pub ty: Type,
    /// Readable stem used for attribute and variable names
    pub debug_name: String,
}

impl Slot {
    pub fn new(ty: Type, debug_name: &str) -> Self {
        Slot {
            ty,
            debug_name: sanitize(debug_name),
        }
    }
}

/// Keep only identifier characters, so names are always valid Datalog
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    match cleaned.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => cleaned,
        _ => format!("v{cleaned}"),
    }
}

/// Datalog variable standing for the scalar `name`
pub fn ext_var(name: &str) -> String {
    format!("{name}_e")
}

/// Ordered union without duplicates: `first`, then new names from `second`
pub fn merge_ext(first: &[String], second: &[String]) -> Vec<String> {
    let mut out = first.to_vec();
    for name in second {
        if !out.contains(name) {
            out.push(name.clone());
        }
    }
    out
}

/// Scoped relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SRelation {
    pub name: String,
    pub int_slots: Vec<Slot>,
    pub ext_slots: Vec<String>,
}

impl SRelation {
    pub fn new(name: impl Into<String>, int_slots: Vec<Slot>, ext_slots: Vec<String>) -> Self {
        SRelation {
            name: name.into(),
            int_slots,
            ext_slots,
        }
    }

    pub fn arity(&self) -> usize {
        self.int_slots.len()
    }

    pub fn types(&self) -> Vec<Type> {
        self.int_slots.iter().map(|slot| slot.ty).collect()
    }

    pub fn last_type(&self) -> Option<Type> {
        self.int_slots.last().map(|slot| slot.ty)
    }

    pub fn first_type(&self) -> Option<Type> {
        self.int_slots.first().map(|slot| slot.ty)
    }

    /// Atom over this relation: the given internal terms followed by the
    /// external variables
    pub fn atom(&self, int_terms: Vec<Term>) -> Atom {
        let mut args = int_terms;
        args.extend(self.ext_slots.iter().map(|name| Term::var(ext_var(name))));
        Atom::new(self.name.clone(), args)
    }

    /// Atom with every internal column wildcarded
    pub fn wildcard_atom(&self) -> Atom {
        self.atom(vec![Term::Wildcard; self.arity()])
    }

    /// Attribute names as they appear in the declaration
    pub fn attribute_names(&self) -> Vec<String> {
        self.int_slots
            .iter()
            .enumerate()
            .map(|(k, slot)| format!("{}_{k}", slot.debug_name))
            .chain(self.ext_slots.iter().map(|name| ext_var(name)))
            .collect()
    }

    /// `.decl` for this relation; external slot types come from `env`
    pub fn decl(
        &self,
        env: &Environment,
        choice_domains: Vec<Vec<String>>,
    ) -> Result<Command, TranslationErrorKind> {
        let mut types = self.types();
        for name in &self.ext_slots {
            let scalar = env.scalar(name).ok_or_else(|| {
                TranslationErrorKind::Internal(format!(
                    "external slot {name} of {} is not a scalar in scope",
                    self.name
                ))
            })?;
            types.push(scalar.ty);
        }
        let attributes = self
            .attribute_names()
            .into_iter()
            .zip(types)
            .map(|(name, ty)| Attribute::new(name, ty))
            .collect();
        Ok(Command::Decl(Decl {
            relation: self.name.clone(),
            attributes,
            choice_domains,
        }))
    }
}

/// Column types of a relation, rendered as `(number, symbol)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub Vec<Type>);

impl Signature {
    pub fn of(relation: &SRelation) -> Self {
        Signature(relation.types())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{ty}")?;
        }
        f.write_str(")")
    }
}
