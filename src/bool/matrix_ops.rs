//! Matrix operations for relational algebra
//!
//! Union, intersection, join, closure and friends over sparse boolean
//! matrices, plus the formulas (subset, equality, multiplicities) that
//! compare them.

use super::{BoolValue, BooleanFactory, BooleanMatrix, Count, Dimensions};
use std::collections::{BTreeMap, BTreeSet};

impl BooleanMatrix {
    /// Union (OR) of two matrices
    pub fn union(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions, other.dimensions);
        let mut result = self.clone();
        for (idx, val) in other.iter() {
            let mine = result.get(idx);
            result.set(idx, factory.or(mine, val));
        }
        result
    }

    /// Intersection (AND) of two matrices
    pub fn intersection(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions, other.dimensions);
        let mut result = BooleanMatrix::empty(self.dimensions);
        for (idx, val) in self.iter() {
            let theirs = other.get(idx);
            if theirs != BoolValue::FALSE {
                result.set(idx, factory.and(val, theirs));
            }
        }
        result
    }

    /// Difference (this AND NOT other)
    pub fn difference(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions, other.dimensions);
        if other.is_empty() {
            return self.clone();
        }
        let mut result = BooleanMatrix::empty(self.dimensions);
        for (idx, val) in self.iter() {
            let not_other = factory.not(other.get(idx));
            result.set(idx, factory.and(val, not_other));
        }
        result
    }

    /// Override: tuples of `other`, plus tuples of `self` whose first atom
    /// has no tuple in `other`
    pub fn override_with(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions, other.dimensions);
        if other.is_empty() {
            return self.clone();
        }

        let row_length = self.dimensions.row_length();
        let mut result = other.clone();
        let mut row = usize::MAX;
        let mut row_free = BoolValue::TRUE;

        for (idx, val) in self.iter() {
            let current_row = idx / row_length;
            if current_row != row {
                row = current_row;
                let negated: Vec<BoolValue> = other
                    .range(row * row_length, (row + 1) * row_length)
                    .map(|(_, v)| factory.not(v))
                    .collect();
                row_free = factory.and_multi(negated);
            }
            let kept = factory.and(val, row_free);
            let current = result.get(idx);
            result.set(idx, factory.or(current, kept));
        }

        result
    }

    /// Relational join: the last column of `self` against the first column of `other`
    pub fn join(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        let u = self.dimensions.universe();
        let arity = self.arity() + other.arity() - 2;
        let mut result = BooleanMatrix::empty(Dimensions::square(u, arity));

        if self.is_empty() || other.is_empty() {
            return result;
        }

        // cells of `other` whose first atom is `a` occupy [a*tail, (a+1)*tail)
        let tail = other.dimensions.row_length();
        let mut disjuncts: BTreeMap<usize, Vec<BoolValue>> = BTreeMap::new();

        for (i, v0) in self.iter() {
            let shared = i % u;
            let prefix = i / u;
            for (j, v1) in other.range(shared * tail, (shared + 1) * tail) {
                let conjunction = factory.and(v0, v1);
                if conjunction != BoolValue::FALSE {
                    disjuncts
                        .entry(prefix * tail + j % tail)
                        .or_default()
                        .push(conjunction);
                }
            }
        }

        for (k, values) in disjuncts {
            result.set(k, factory.or_multi(values));
        }
        result
    }

    /// Cross product of two matrices
    pub fn product(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        let u = self.dimensions.universe();
        let mut result = BooleanMatrix::empty(Dimensions::square(u, self.arity() + other.arity()));

        let other_cap = other.dimensions.capacity();
        for (i, v0) in self.iter() {
            for (j, v1) in other.iter() {
                result.set(i * other_cap + j, factory.and(v0, v1));
            }
        }
        result
    }

    /// Transpose of a binary matrix
    pub fn transpose(&self) -> BooleanMatrix {
        debug_assert_eq!(self.arity(), 2, "transpose only works on binary relations");
        let u = self.dimensions.universe();
        let mut result = BooleanMatrix::empty(self.dimensions);
        for (idx, val) in self.iter() {
            result.set((idx % u) * u + idx / u, val);
        }
        result
    }

    /// Transitive closure of a binary matrix
    ///
    /// Computes `r ∪ r.r ∪ r.r.r ∪ ...` by iterative squaring. Over `n` atoms
    /// no path needs more than `n` steps, so `⌈log2 n⌉` squarings suffice.
    pub fn closure(&self, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.arity(), 2, "closure requires a binary relation");
        if self.is_empty() {
            return self.clone();
        }

        let u = self.dimensions.universe();
        let atoms: BTreeSet<usize> = self
            .iter()
            .flat_map(|(idx, _)| [idx / u, idx % u])
            .collect();

        let mut ret = self.clone();
        let mut covered = 1;
        while covered < atoms.len() {
            let squared = ret.join(&ret, factory);
            ret = ret.union(&squared, factory);
            covered *= 2;
        }
        ret
    }

    /// Reflexive transitive closure: `iden ∪ ^r`
    pub fn reflexive_closure(&self, factory: &BooleanFactory, iden: &BooleanMatrix) -> BooleanMatrix {
        self.closure(factory).union(iden, factory)
    }

    /// Domain restriction `set <: self`: keeps tuples whose first atom is in `set`
    pub fn domain_restrict(&self, set: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(set.arity(), 1);
        let row_length = self.dimensions.row_length();
        let mut result = BooleanMatrix::empty(self.dimensions);
        for (idx, val) in self.iter() {
            let member = set.get(idx / row_length);
            result.set(idx, factory.and(val, member));
        }
        result
    }

    /// Range restriction `self :> set`: keeps tuples whose last atom is in `set`
    pub fn range_restrict(&self, set: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(set.arity(), 1);
        let u = self.dimensions.universe();
        let mut result = BooleanMatrix::empty(self.dimensions);
        for (idx, val) in self.iter() {
            let member = set.get(idx % u);
            result.set(idx, factory.and(val, member));
        }
        result
    }

    /// Returns a matrix `m` with `m[i] = condition ? self[i] : other[i]`
    pub fn choice(&self, condition: BoolValue, other: &BooleanMatrix, factory: &BooleanFactory) -> BooleanMatrix {
        debug_assert_eq!(self.dimensions, other.dimensions);
        let mut result = BooleanMatrix::empty(self.dimensions);
        let indices: BTreeSet<usize> = self.iter().chain(other.iter()).map(|(i, _)| i).collect();
        for idx in indices {
            result.set(idx, factory.ite(condition, self.get(idx), other.get(idx)));
        }
        result
    }

    /// Rows of a matrix restricted to one first-column atom
    pub fn row(&self, atom: usize) -> impl Iterator<Item = (usize, BoolValue)> + '_ {
        let row_length = self.dimensions.row_length();
        self.range(atom * row_length, (atom + 1) * row_length)
    }

    /// Subset: every cell of `self` implies the same cell of `other`
    pub fn subset(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BoolValue {
        debug_assert_eq!(self.dimensions, other.dimensions);
        let implications = self
            .iter()
            .map(|(idx, val)| factory.implies(val, other.get(idx)))
            .collect();
        factory.and_multi(implications)
    }

    /// Equality: mutual subset
    pub fn equals(&self, other: &BooleanMatrix, factory: &BooleanFactory) -> BoolValue {
        let forward = self.subset(other, factory);
        let backward = other.subset(self, factory);
        factory.and(forward, backward)
    }

    /// Multiplicity: some (at least one cell is TRUE)
    pub fn some(&self, factory: &BooleanFactory) -> BoolValue {
        factory.or_multi(self.values())
    }

    /// Multiplicity: no (all cells are FALSE)
    pub fn none(&self, factory: &BooleanFactory) -> BoolValue {
        let some = self.some(factory);
        factory.not(some)
    }

    /// Multiplicity: lone (at most one cell is TRUE)
    pub fn lone(&self, factory: &BooleanFactory) -> BoolValue {
        factory.at_most_one(&self.values())
    }

    /// Multiplicity: one (exactly one cell is TRUE)
    pub fn one(&self, factory: &BooleanFactory) -> BoolValue {
        factory.exactly_one(&self.values())
    }

    /// Cardinality of this matrix, exact up to `cap`
    pub fn count(&self, factory: &BooleanFactory, cap: usize) -> Count {
        Count::of(factory, &self.values(), cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bool::Options;

    fn binary(u: usize, pairs: &[(usize, usize)]) -> BooleanMatrix {
        let dims = Dimensions::square(u, 2);
        BooleanMatrix::with_true(dims, pairs.iter().map(|&(a, b)| dims.index_of(&[a, b])))
    }

    fn pairs(m: &BooleanMatrix) -> Vec<(usize, usize)> {
        let u = m.dimensions().universe();
        m.dense_indices().into_iter().map(|i| (i / u, i % u)).collect()
    }

    #[test]
    fn join_composes_binary_relations() {
        let factory = BooleanFactory::new(0, Options::default());
        let r = binary(3, &[(0, 1), (1, 2)]);
        let joined = r.join(&r, &factory);
        assert_eq!(pairs(&joined), vec![(0, 2)]);
    }

    #[test]
    fn join_unary_with_binary() {
        let factory = BooleanFactory::new(0, Options::default());
        let set = BooleanMatrix::with_true(Dimensions::square(3, 1), [1]);
        let r = binary(3, &[(0, 1), (1, 2), (1, 0)]);
        let image = set.join(&r, &factory);
        assert_eq!(image.arity(), 1);
        assert_eq!(image.dense_indices(), vec![0, 2]);
    }

    #[test]
    fn join_with_variables_builds_disjunction() {
        let factory = BooleanFactory::new(4, Options::default());
        let dims = Dimensions::square(2, 2);
        let mut r = BooleanMatrix::empty(dims);
        for label in 1..=4u32 {
            r.set(label as usize - 1, factory.variable(label));
        }
        let joined = r.join(&r, &factory);
        assert_eq!(joined.density(), 4);
        assert!(joined.get(0).is_formula());
    }

    #[test]
    fn product_and_transpose() {
        let factory = BooleanFactory::new(0, Options::default());
        let a = BooleanMatrix::with_true(Dimensions::square(3, 1), [0]);
        let b = BooleanMatrix::with_true(Dimensions::square(3, 1), [1, 2]);
        let ab = a.product(&b, &factory);
        assert_eq!(pairs(&ab), vec![(0, 1), (0, 2)]);
        assert_eq!(pairs(&ab.transpose()), vec![(1, 0), (2, 0)]);
    }

    #[test]
    fn closure_of_chain() {
        let factory = BooleanFactory::new(0, Options::default());
        let r = binary(4, &[(0, 1), (1, 2), (2, 3)]);
        let closed = r.closure(&factory);
        assert_eq!(
            pairs(&closed),
            vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
    }

    #[test]
    fn closure_is_idempotent() {
        let factory = BooleanFactory::new(0, Options::default());
        let r = binary(4, &[(0, 1), (1, 2), (2, 0), (3, 3)]);
        let once = r.closure(&factory);
        let twice = once.closure(&factory);
        assert_eq!(once, twice);
    }

    #[test]
    fn override_replaces_rows() {
        let factory = BooleanFactory::new(0, Options::default());
        let r = binary(3, &[(0, 1), (1, 1)]);
        let s = binary(3, &[(0, 2)]);
        let o = r.override_with(&s, &factory);
        assert_eq!(pairs(&o), vec![(0, 2), (1, 1)]);
    }

    #[test]
    fn restrictions() {
        let factory = BooleanFactory::new(0, Options::default());
        let r = binary(3, &[(0, 1), (1, 2), (2, 0)]);
        let set = BooleanMatrix::with_true(Dimensions::square(3, 1), [1]);
        assert_eq!(pairs(&r.domain_restrict(&set, &factory)), vec![(1, 2)]);
        assert_eq!(pairs(&r.range_restrict(&set, &factory)), vec![(0, 1)]);
    }

    #[test]
    fn multiplicities_on_constants() {
        let factory = BooleanFactory::new(0, Options::default());
        let empty = BooleanMatrix::empty(Dimensions::square(3, 1));
        let single = BooleanMatrix::with_true(Dimensions::square(3, 1), [2]);
        let double = BooleanMatrix::with_true(Dimensions::square(3, 1), [0, 2]);

        assert_eq!(empty.some(&factory), BoolValue::FALSE);
        assert_eq!(empty.none(&factory), BoolValue::TRUE);
        assert_eq!(empty.lone(&factory), BoolValue::TRUE);
        assert_eq!(single.one(&factory), BoolValue::TRUE);
        assert_eq!(double.one(&factory), BoolValue::FALSE);
        assert_eq!(double.lone(&factory), BoolValue::FALSE);
    }

    #[test]
    fn subset_and_equality() {
        let factory = BooleanFactory::new(0, Options::default());
        let small = binary(2, &[(0, 1)]);
        let large = binary(2, &[(0, 1), (1, 0)]);
        assert_eq!(small.subset(&large, &factory), BoolValue::TRUE);
        assert_eq!(large.subset(&small, &factory), BoolValue::FALSE);
        assert_eq!(small.equals(&small.clone(), &factory), BoolValue::TRUE);
    }
}
