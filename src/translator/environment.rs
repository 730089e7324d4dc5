//! Lexical scope for translation.
//!
//! An [`Environment`] is a persistent linked list of frames. Extending it
//! returns a new value and leaves the original untouched, so the scope in
//! effect at any subexpression can be captured cheaply (for example in an
//! error) and compared later.

use std::fmt;
use std::sync::Arc;

use datalog_ast::{Atom, Type};

use super::error::TranslationErrorKind;
use super::relation::{SRelation, Signature, Slot};

/// A scalar variable bound by a comprehension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarBinding {
    pub ty: Type,
    /// Atom that ranges over the values the variable may take
    pub constraint: Atom,
    /// Scalars the constraint itself depends on
    pub constraint_ext_slots: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Scalar(ScalarBinding),
    Relation(SRelation),
}

#[derive(Debug)]
struct Frame {
    name: String,
    binding: Binding,
    parent: Option<Arc<Frame>>,
}

/// Persistent name -> binding map
#[derive(Debug, Clone, Default)]
pub struct Environment {
    head: Option<Arc<Frame>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment { head: None }
    }

    /// Scope holding one relation binding per input relation
    pub fn with_inputs<'a, I>(inputs: I) -> Result<Self, TranslationErrorKind>
    where
        I: IntoIterator<Item = (&'a str, &'a [Type])>,
    {
        let mut env = Environment::new();
        for (name, types) in inputs {
            let slots = types.iter().map(|ty| Slot::new(*ty, name)).collect();
            let relation = SRelation::new(name, slots, Vec::new());
            env = env.extend(name, Binding::Relation(relation))?;
        }
        Ok(env)
    }

    /// Add a binding; rebinding a name already in scope is an error
    pub fn extend(&self, name: &str, binding: Binding) -> Result<Self, TranslationErrorKind> {
        if self.is_bound(name) {
            return Err(TranslationErrorKind::AlreadyBound(name.to_string()));
        }
        Ok(Environment {
            head: Some(Arc::new(Frame {
                name: name.to_string(),
                binding,
                parent: self.head.clone(),
            })),
        })
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        std::iter::successors(self.head.as_deref(), |frame| frame.parent.as_deref())
    }

    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.frames()
            .find(|frame| frame.name == name)
            .map(|frame| &frame.binding)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn scalar(&self, name: &str) -> Option<&ScalarBinding> {
        match self.lookup(name) {
            Some(Binding::Scalar(scalar)) => Some(scalar),
            _ => None,
        }
    }

    /// Bindings from outermost to innermost
    pub fn bindings(&self) -> Vec<(&str, &Binding)> {
        let mut out: Vec<_> = self
            .frames()
            .map(|frame| (frame.name.as_str(), &frame.binding))
            .collect();
        out.reverse();
        out
    }

    /// Names of all bound scalars, outermost first
    pub fn scalar_names(&self) -> Vec<String> {
        self.bindings()
            .into_iter()
            .filter(|(_, binding)| matches!(binding, Binding::Scalar(_)))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Relation bindings, outermost first
    pub fn relations(&self) -> Vec<(&str, &SRelation)> {
        self.bindings()
            .into_iter()
            .filter_map(|(name, binding)| match binding {
                Binding::Relation(relation) => Some((name, relation)),
                Binding::Scalar(_) => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.frames().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Owned, printable copy of the scope
    pub fn snapshot(&self) -> ScopeSnapshot {
        let entries = self
            .bindings()
            .into_iter()
            .map(|(name, binding)| {
                let kind = match binding {
                    Binding::Scalar(scalar) => format!("scalar {}", scalar.ty),
                    Binding::Relation(relation) => {
                        format!("relation {}", Signature::of(relation))
                    }
                };
                (name.to_string(), kind)
            })
            .collect();
        ScopeSnapshot { entries }
    }
}

/// The names in scope at the point of a failure, with their kinds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSnapshot {
    pub entries: Vec<(String, String)>,
}

impl ScopeSnapshot {
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }
}

impl fmt::Display for ScopeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, kind)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {kind}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datalog_ast::Term;

    fn scalar(relation: &str, var: &str) -> Binding {
        Binding::Scalar(ScalarBinding {
            ty: Type::Number,
            constraint: Atom::new(relation, vec![Term::var(var)]),
            constraint_ext_slots: vec![],
        })
    }

    #[test]
    fn test_extend_is_persistent() {
        let base = Environment::with_inputs([("rel", &[Type::Number][..])]).unwrap();
        let inner = base.extend("x", scalar("rel", "x_e")).unwrap();
        assert!(inner.is_bound("x"));
        assert!(!base.is_bound("x"));
        assert_eq!(inner.len(), 2);
        assert_eq!(base.len(), 1);
    }

    #[test]
    fn test_rebinding_is_rejected() {
        let env = Environment::new().extend("x", scalar("a", "x_e")).unwrap();
        let err = env.extend("x", scalar("b", "x_e")).unwrap_err();
        assert_eq!(err, TranslationErrorKind::AlreadyBound("x".to_string()));
    }

    #[test]
    fn test_order_outermost_first() {
        let env = Environment::with_inputs([
            ("a", &[Type::Number][..]),
            ("b", &[Type::Symbol, Type::Number][..]),
        ])
        .unwrap()
        .extend("x", scalar("a", "x_e"))
        .unwrap()
        .extend("y", scalar("a", "y_e"))
        .unwrap();

        assert_eq!(env.scalar_names(), vec!["x".to_string(), "y".to_string()]);
        let relations: Vec<&str> = env.relations().into_iter().map(|(n, _)| n).collect();
        assert_eq!(relations, vec!["a", "b"]);
    }

    #[test]
    fn test_snapshot_display() {
        let env = Environment::with_inputs([("rel", &[Type::Number, Type::Symbol][..])])
            .unwrap()
            .extend("x", scalar("rel", "x_e"))
            .unwrap();
        let snapshot = env.snapshot();
        assert!(snapshot.contains("x"));
        assert_eq!(
            snapshot.to_string(),
            "{rel: relation (number, symbol), x: scalar number}"
        );
    }
}
