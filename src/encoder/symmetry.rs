//! Symmetry breaking over interchangeable atoms
//!
//! The atoms of a top-level signature all have the same candidate tuples in
//! every relation, so any permutation of them maps instances to isomorphic
//! instances. Requiring the atoms in use to form a prefix keeps one
//! representative of each class modulo which atoms are used.

use crate::bool::{BoolValue, BooleanFactory, BooleanMatrix};
use std::ops::Range;

/// `atom[i+1] in T => atom[i] in T` for consecutive atoms of `range`
pub fn prefix_constraints(top: &BooleanMatrix, range: Range<usize>, factory: &BooleanFactory) -> BoolValue {
    let atoms: Vec<usize> = range.collect();
    let implications = atoms
        .windows(2)
        .map(|pair| factory.implies(top.get(pair[1]), top.get(pair[0])))
        .collect();
    factory.and_multi(implications)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bool::{Dimensions, Options};

    #[test]
    fn chain_of_implications() {
        let factory = BooleanFactory::new(3, Options::default());
        let mut top = BooleanMatrix::empty(Dimensions::square(3, 1));
        for atom in 0..3 {
            top.set(atom, factory.variable(atom as u32 + 1));
        }
        let constraint = prefix_constraints(&top, 0..3, &factory);
        assert!(constraint.is_formula());

        assert_eq!(prefix_constraints(&top, 1..2, &factory), BoolValue::TRUE);
    }

    #[test]
    fn constant_prefixes() {
        let factory = BooleanFactory::new(0, Options::default());
        let prefix = BooleanMatrix::with_true(Dimensions::square(3, 1), [0, 1]);
        let gap = BooleanMatrix::with_true(Dimensions::square(3, 1), [0, 2]);
        assert_eq!(prefix_constraints(&prefix, 0..3, &factory), BoolValue::TRUE);
        assert_eq!(prefix_constraints(&gap, 0..3, &factory), BoolValue::FALSE);
    }
}
