//! Variable allocation for SAT encoding
//!
//! Hands out primary variable labels for the candidate tuples of each
//! relation before any gate is built, so variables occupy `1..=n` and gates
//! can be labelled after them.

use crate::ast::RelationId;
use rustc_hash::FxHashMap;
use std::ops::Range;

/// Allocates SAT variables for relation tuples
#[derive(Debug)]
pub struct VariableAllocator {
    next_var: u32,
    relation_vars: FxHashMap<RelationId, Range<u32>>,
}

impl VariableAllocator {
    /// Creates a new variable allocator
    pub fn new() -> Self {
        Self {
            next_var: 1,
            relation_vars: FxHashMap::default(),
        }
    }

    /// Allocates one variable per candidate tuple of `relation`
    ///
    /// Returns the range of labels (empty if the relation has no candidates).
    pub fn allocate_for_relation(&mut self, relation: RelationId, candidates: usize) -> Range<u32> {
        if candidates == 0 {
            return 0..0;
        }

        let start = self.next_var;
        let end = start + candidates as u32;
        self.relation_vars.insert(relation, start..end);
        self.next_var = end;
        start..end
    }

    /// Returns the total number of variables allocated
    pub fn total_variables(&self) -> u32 {
        self.next_var - 1
    }

    /// Gets the variable range for a relation
    pub fn get_range(&self, relation: RelationId) -> Option<&Range<u32>> {
        self.relation_vars.get(&relation)
    }
}

impl Default for VariableAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldId, SigId};

    #[test]
    fn sequential_allocation() {
        let mut allocator = VariableAllocator::new();
        let a = RelationId::Sig(SigId(0));
        let b = RelationId::Sig(SigId(1));
        let r = RelationId::Field(FieldId(0));

        assert_eq!(allocator.allocate_for_relation(a, 3), 1..4);
        assert_eq!(allocator.allocate_for_relation(r, 9), 4..13);
        assert_eq!(allocator.allocate_for_relation(b, 0), 0..0);

        assert_eq!(allocator.total_variables(), 12);
        assert_eq!(allocator.get_range(r), Some(&(4..13)));
        assert_eq!(allocator.get_range(b), None);
    }

    #[test]
    fn empty_allocator() {
        assert_eq!(VariableAllocator::new().total_variables(), 0);
    }
}
