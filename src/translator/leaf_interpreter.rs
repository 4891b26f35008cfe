//! Interprets relations as boolean matrices
//!
//! Every candidate tuple in a relation's upper bound gets one primary
//! variable; tuples outside the bound are FALSE.

use crate::ast::RelationId;
use crate::bool::{BooleanFactory, BooleanMatrix, Dimensions, Options, VariableAllocator};
use crate::error::{AlloyError, Result};
use crate::instance::{Bounds, Universe};
use rustc_hash::FxHashMap;
use std::ops::Range;

/// Owns the boolean factory and the variable matrix of every bounded relation
pub struct LeafInterpreter {
    factory: BooleanFactory,
    universe: Universe,
    var_ranges: FxHashMap<RelationId, Range<u32>>,
    matrices: FxHashMap<RelationId, BooleanMatrix>,
}

impl LeafInterpreter {
    /// Allocates variables for every relation of `bounds`, in relation order
    pub fn from_bounds(bounds: &Bounds, options: &Options) -> Self {
        let mut allocator = VariableAllocator::new();
        let mut var_ranges = FxHashMap::default();
        let mut slots = Vec::new();

        for (relation, upper) in bounds.iter() {
            let range = allocator.allocate_for_relation(relation, upper.size());
            if !range.is_empty() {
                var_ranges.insert(relation, range.clone());
            }
            slots.push((relation, upper, range));
        }

        // the factory must know the variable count before any matrix is built
        let factory = BooleanFactory::new(allocator.total_variables(), options.clone());
        let universe = bounds.universe().clone();

        let mut matrices = FxHashMap::default();
        for (relation, upper, range) in slots {
            let dims = Dimensions::square(universe.size(), upper.arity());
            let mut matrix = BooleanMatrix::empty(dims);
            for (index, label) in upper.indices().zip(range) {
                matrix.set(index, factory.variable(label));
            }
            matrices.insert(relation, matrix);
        }

        Self {
            factory,
            universe,
            var_ranges,
            matrices,
        }
    }

    /// The factory shared by every matrix of this interpreter
    pub fn factory(&self) -> &BooleanFactory {
        &self.factory
    }

    /// The universe
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Number of primary variables (one per candidate tuple)
    pub fn num_primary_variables(&self) -> u32 {
        self.factory.num_variables()
    }

    /// Variable labels of each relation with at least one candidate tuple
    pub fn variable_ranges(&self) -> &FxHashMap<RelationId, Range<u32>> {
        &self.var_ranges
    }

    /// The matrix of a bounded relation
    pub fn interpret(&self, relation: RelationId) -> Result<&BooleanMatrix> {
        self.matrices
            .get(&relation)
            .ok_or_else(|| AlloyError::InvalidArgument(format!("{relation:?} has no bounds")))
    }

    /// The empty matrix of the given arity
    pub fn none(&self, arity: usize) -> BooleanMatrix {
        BooleanMatrix::empty(Dimensions::square(self.universe.size(), arity))
    }

    /// A singleton unary matrix holding one atom
    pub fn atom(&self, atom: usize) -> BooleanMatrix {
        BooleanMatrix::with_true(Dimensions::square(self.universe.size(), 1), [atom])
    }
}

impl std::fmt::Debug for LeafInterpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafInterpreter")
            .field("universe", &self.universe.size())
            .field("primary_variables", &self.num_primary_variables())
            .field("relations", &self.matrices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldId, SigId};
    use crate::bool::BoolValue;

    #[test]
    fn variables_follow_bound_order() -> Result<()> {
        let universe = Universe::new(&["A$0", "A$1"])?;
        let factory = universe.factory();
        let sig = RelationId::Sig(SigId(0));
        let field = RelationId::Field(FieldId(0));
        let empty = RelationId::Sig(SigId(1));

        let mut bounds = Bounds::new(universe);
        bounds.bound(sig, factory.range(0..2)?)?;
        bounds.bound(field, factory.range(0..2)?.product(&factory.range(1..2)?)?)?;
        bounds.bound(empty, factory.none(1))?;

        let interpreter = LeafInterpreter::from_bounds(&bounds, &Options::default());
        assert_eq!(interpreter.num_primary_variables(), 4);
        assert_eq!(interpreter.variable_ranges().get(&sig), Some(&(1..3)));
        assert_eq!(interpreter.variable_ranges().get(&field), Some(&(3..5)));
        assert!(interpreter.variable_ranges().get(&empty).is_none());

        let matrix = interpreter.interpret(field)?;
        assert_eq!(matrix.get(1), interpreter.factory().variable(3));
        assert_eq!(matrix.get(3), interpreter.factory().variable(4));
        assert_eq!(matrix.get(0), BoolValue::FALSE);
        assert!(interpreter.interpret(empty)?.is_empty());
        assert!(interpreter.interpret(RelationId::Sig(SigId(7))).is_err());
        Ok(())
    }

    #[test]
    fn constant_matrices() -> Result<()> {
        let universe = Universe::new(&["a", "b", "c"])?;
        let interpreter = LeafInterpreter::from_bounds(&Bounds::new(universe), &Options::default());
        assert_eq!(interpreter.atom(2).dense_indices(), vec![2]);
        assert!(interpreter.none(2).is_empty());
        assert_eq!(interpreter.none(2).dimensions().capacity(), 9);
        Ok(())
    }
}
