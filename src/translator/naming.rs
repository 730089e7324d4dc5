//! Fresh names for one translation.
//!
//! Each top-level translation owns its own [`NameGen`], so concurrent
//! translations never share counters and repeated translations of the same
//! input produce identical text.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default)]
pub struct NameGen {
    next_relation: usize,
    next_variable: usize,
    reserved: BTreeSet<String>,
}

impl NameGen {
    /// `reserved` names are never handed out as relation names
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NameGen {
            next_relation: 0,
            next_variable: 0,
            reserved: reserved.into_iter().map(Into::into).collect(),
        }
    }

    /// Next relation name: `R1`, `R2`, ...
    pub fn relation(&mut self) -> String {
        loop {
            self.next_relation += 1;
            let name = format!("R{}", self.next_relation);
            if !self.reserved.contains(&name) {
                return name;
            }
        }
    }

    /// Fresh rule variable derived from `stem`
    pub fn var(&mut self, stem: &str) -> String {
        self.next_variable += 1;
        format!("{stem}_{}", self.next_variable)
    }

    pub fn relations_issued(&self) -> usize {
        self.next_relation
    }
}
