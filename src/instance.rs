//! Instance types: Universe, Tuple, TupleSet, TupleFactory, Bounds, and Instance
//!
//! A universe orders the atoms of one analysis run. Tuples are identified by
//! their row-major index over the universe, which is also the cell index of
//! the boolean matrix encoding a relation.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::RelationId;
use crate::error::{AlloyError, Result};

/// An ordered set of unique atoms
///
/// Cloning is cheap; clones compare equal.
#[derive(Clone)]
pub struct Universe {
    inner: Arc<UniverseInner>,
}

struct UniverseInner {
    atoms: Vec<String>,
    indices: FxHashMap<String, usize>,
}

impl Universe {
    /// Creates a universe from atom names
    ///
    /// # Errors
    /// Returns an error if an atom name appears twice
    pub fn new<S: AsRef<str>>(atoms: &[S]) -> Result<Self> {
        let mut atom_vec = Vec::with_capacity(atoms.len());
        let mut indices = FxHashMap::default();

        for (i, atom) in atoms.iter().enumerate() {
            let atom = atom.as_ref().to_string();
            if indices.insert(atom.clone(), i).is_some() {
                return Err(AlloyError::InvalidArgument(format!("atom {atom} appears multiple times")));
            }
            atom_vec.push(atom);
        }

        Ok(Self {
            inner: Arc::new(UniverseInner {
                atoms: atom_vec,
                indices,
            }),
        })
    }

    /// Returns the number of atoms in this universe
    pub fn size(&self) -> usize {
        self.inner.atoms.len()
    }

    /// Returns the atom at the given index
    pub fn atom(&self, index: usize) -> Option<&str> {
        self.inner.atoms.get(index).map(|s| s.as_str())
    }

    /// Returns the index of the given atom
    pub fn index_of(&self, atom: &str) -> Option<usize> {
        self.inner.indices.get(atom).copied()
    }

    /// Returns true if this universe contains the given atom
    pub fn contains(&self, atom: &str) -> bool {
        self.inner.indices.contains_key(atom)
    }

    /// Returns a factory for creating tuples from this universe
    pub fn factory(&self) -> TupleFactory {
        TupleFactory {
            universe: self.clone(),
        }
    }
}

impl PartialEq for Universe {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Universe {}

impl fmt::Debug for Universe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Universe({:?})", self.inner.atoms)
    }
}

/// A tuple of atoms from a universe
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tuple {
    atom_indices: Vec<usize>,
    index: usize,
}

impl Tuple {
    /// Returns the arity (number of atoms) of this tuple
    pub fn arity(&self) -> usize {
        self.atom_indices.len()
    }

    /// Returns the row-major index of this tuple
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the index of the atom at position `i`
    pub fn atom_index(&self, i: usize) -> Option<usize> {
        self.atom_indices.get(i).copied()
    }

    /// Returns the atom indices of this tuple
    pub fn atom_indices(&self) -> &[usize] {
        &self.atom_indices
    }
}

/// A set of tuples of one arity, ordered by tuple index
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TupleSet {
    universe: Universe,
    arity: usize,
    tuples: BTreeMap<usize, Tuple>,
}

impl TupleSet {
    /// Creates an empty tuple set with the given arity
    pub fn empty(universe: Universe, arity: usize) -> Self {
        Self {
            universe,
            arity,
            tuples: BTreeMap::new(),
        }
    }

    /// Returns the universe this tuple set belongs to
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Returns the arity of tuples in this set
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the number of tuples in this set
    pub fn size(&self) -> usize {
        self.tuples.len()
    }

    /// Returns true if this set is empty
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Adds a tuple to this set
    pub fn add(&mut self, tuple: Tuple) -> Result<()> {
        if tuple.arity() != self.arity {
            return Err(AlloyError::InvalidArgument(format!(
                "expected arity {}, got {}",
                self.arity,
                tuple.arity()
            )));
        }
        self.tuples.insert(tuple.index, tuple);
        Ok(())
    }

    /// Returns true if the set holds a tuple with this index
    pub fn contains_index(&self, index: usize) -> bool {
        self.tuples.contains_key(&index)
    }

    /// Returns an iterator over the tuples in index order
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.values()
    }

    /// Returns the tuple indices in ascending order
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.tuples.keys().copied()
    }

    /// Atom names of every tuple, in index order
    pub fn atom_names(&self) -> Vec<Vec<String>> {
        self.iter()
            .map(|t| {
                t.atom_indices
                    .iter()
                    .filter_map(|&a| self.universe.atom(a).map(str::to_string))
                    .collect()
            })
            .collect()
    }

    /// Returns the Cartesian product of this set with another
    pub fn product(&self, other: &TupleSet) -> Result<TupleSet> {
        if other.universe() != &self.universe {
            return Err(AlloyError::InvalidArgument(
                "tuple sets from different universes".to_string(),
            ));
        }

        let factory = self.universe.factory();
        let mut result = TupleSet::empty(self.universe.clone(), self.arity + other.arity);
        for t1 in self.iter() {
            for t2 in other.iter() {
                let atoms: Vec<usize> = t1.atom_indices.iter().chain(&t2.atom_indices).copied().collect();
                result.add(factory.tuple_of_indices(&atoms)?)?;
            }
        }
        Ok(result)
    }
}

/// Factory for creating tuples and tuple sets
pub struct TupleFactory {
    universe: Universe,
}

impl TupleFactory {
    /// Returns the universe this factory belongs to
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Creates a tuple from atom names
    pub fn tuple(&self, atoms: &[&str]) -> Result<Tuple> {
        let mut indices = Vec::with_capacity(atoms.len());
        for &atom in atoms {
            let idx = self
                .universe
                .index_of(atom)
                .ok_or_else(|| AlloyError::InvalidArgument(format!("atom {atom} not in universe")))?;
            indices.push(idx);
        }
        self.tuple_of_indices(&indices)
    }

    /// Creates a tuple from atom indices
    pub fn tuple_of_indices(&self, atoms: &[usize]) -> Result<Tuple> {
        if atoms.is_empty() {
            return Err(AlloyError::InvalidArgument("cannot create empty tuple".to_string()));
        }
        let base = self.universe.size();
        let mut index = 0;
        for &atom in atoms {
            if atom >= base {
                return Err(AlloyError::InvalidArgument(format!("atom index {atom} out of range")));
            }
            index = index * base + atom;
        }
        Ok(Tuple {
            atom_indices: atoms.to_vec(),
            index,
        })
    }

    /// Creates a tuple from its row-major index
    pub fn tuple_from_index(&self, arity: usize, index: usize) -> Result<Tuple> {
        let base = self.universe.size();
        if index >= base.pow(arity as u32) {
            return Err(AlloyError::InvalidArgument(format!(
                "index {index} out of range for arity {arity}"
            )));
        }

        // first atom is most significant
        let mut atom_indices = vec![0; arity];
        let mut remaining = index;
        for slot in atom_indices.iter_mut().rev() {
            *slot = remaining % base;
            remaining /= base;
        }
        Ok(Tuple { atom_indices, index })
    }

    /// Creates a tuple set from atom-name sequences of equal length
    pub fn tuple_set(&self, arity: usize, tuples: &[&[&str]]) -> Result<TupleSet> {
        let mut set = TupleSet::empty(self.universe.clone(), arity);
        for &atoms in tuples {
            set.add(self.tuple(atoms)?)?;
        }
        Ok(set)
    }

    /// Unary tuple set of a contiguous range of atoms
    pub fn range(&self, atoms: std::ops::Range<usize>) -> Result<TupleSet> {
        let mut set = TupleSet::empty(self.universe.clone(), 1);
        for atom in atoms {
            set.add(self.tuple_of_indices(&[atom])?)?;
        }
        Ok(set)
    }

    /// Creates an empty tuple set with the given arity
    pub fn none(&self, arity: usize) -> TupleSet {
        TupleSet::empty(self.universe.clone(), arity)
    }
}

/// Upper bounds: the candidate tuples of each relation
///
/// Every candidate tuple gets one boolean variable; tuples outside the bound
/// are never in the relation.
#[derive(Clone, Debug)]
pub struct Bounds {
    universe: Universe,
    upper_bounds: BTreeMap<RelationId, TupleSet>,
}

impl Bounds {
    /// Creates empty bounds over the given universe
    pub fn new(universe: Universe) -> Self {
        Self {
            universe,
            upper_bounds: BTreeMap::new(),
        }
    }

    /// Returns the universe
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Sets the upper bound of a relation
    pub fn bound(&mut self, relation: RelationId, upper: TupleSet) -> Result<()> {
        if upper.universe() != &self.universe {
            return Err(AlloyError::InvalidArgument(
                "tuple set from a different universe".to_string(),
            ));
        }
        self.upper_bounds.insert(relation, upper);
        Ok(())
    }

    /// Returns the upper bound of a relation
    pub fn upper_bound(&self, relation: RelationId) -> Option<&TupleSet> {
        self.upper_bounds.get(&relation)
    }

    /// Bounded relations with their upper bounds, ordered by relation id
    pub fn iter(&self) -> impl Iterator<Item = (RelationId, &TupleSet)> {
        self.upper_bounds.iter().map(|(&r, t)| (r, t))
    }
}

/// An instance maps relations to tuple sets (a solution)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    universe: Universe,
    relations: BTreeMap<RelationId, TupleSet>,
}

impl Instance {
    /// Creates an empty instance
    pub fn new(universe: Universe) -> Self {
        Self {
            universe,
            relations: BTreeMap::new(),
        }
    }

    /// Returns the universe
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Adds a relation binding
    pub fn add(&mut self, relation: RelationId, tuples: TupleSet) -> Result<()> {
        if tuples.universe() != &self.universe {
            return Err(AlloyError::InvalidArgument(
                "tuple set from a different universe".to_string(),
            ));
        }
        self.relations.insert(relation, tuples);
        Ok(())
    }

    /// Returns the tuples of a relation
    pub fn tuples(&self, relation: RelationId) -> Option<&TupleSet> {
        self.relations.get(&relation)
    }

    /// Returns all relations in this instance
    pub fn relations(&self) -> impl Iterator<Item = RelationId> + '_ {
        self.relations.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FieldId, SigId};

    #[test]
    fn create_universe() -> Result<()> {
        let universe = Universe::new(&["A$0", "A$1", "B$0"])?;
        assert_eq!(universe.size(), 3);
        assert_eq!(universe.atom(2), Some("B$0"));
        assert_eq!(universe.index_of("A$1"), Some(1));
        assert!(universe.contains("A$0"));
        assert!(!universe.contains("C$0"));
        Ok(())
    }

    #[test]
    fn universe_rejects_duplicates() {
        assert!(Universe::new(&["A", "B", "A"]).is_err());
    }

    #[test]
    fn empty_universe_is_allowed() -> Result<()> {
        let universe = Universe::new::<&str>(&[])?;
        assert_eq!(universe.size(), 0);
        Ok(())
    }

    #[test]
    fn tuple_indices_are_row_major() -> Result<()> {
        let universe = Universe::new(&["a", "b", "c"])?;
        let factory = universe.factory();

        let t = factory.tuple(&["b", "c"])?;
        assert_eq!(t.index(), 5);
        assert_eq!(factory.tuple_from_index(2, 5)?, t);
        assert!(factory.tuple_from_index(2, 9).is_err());
        assert!(factory.tuple(&["x"]).is_err());
        Ok(())
    }

    #[test]
    fn tuple_sets_are_ordered_and_deduplicated() -> Result<()> {
        let universe = Universe::new(&["a", "b"])?;
        let factory = universe.factory();
        let set = factory.tuple_set(2, &[&["b", "a"], &["a", "b"], &["b", "a"]])?;
        assert_eq!(set.size(), 2);
        assert_eq!(set.indices().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(set.atom_names()[0], vec!["a".to_string(), "b".to_string()]);
        assert!(set.contains_index(2));
        Ok(())
    }

    #[test]
    fn product_of_ranges() -> Result<()> {
        let universe = Universe::new(&["a", "b", "c"])?;
        let factory = universe.factory();
        let left = factory.range(0..2)?;
        let right = factory.range(2..3)?;
        let product = left.product(&right)?;
        assert_eq!(product.arity(), 2);
        assert_eq!(product.indices().collect::<Vec<_>>(), vec![2, 5]);
        Ok(())
    }

    #[test]
    fn bounds_and_instances() -> Result<()> {
        let universe = Universe::new(&["a", "b"])?;
        let factory = universe.factory();
        let sig = RelationId::Sig(SigId(0));
        let field = RelationId::Field(FieldId(0));

        let mut bounds = Bounds::new(universe.clone());
        bounds.bound(field, factory.range(0..2)?.product(&factory.range(0..2)?)?)?;
        bounds.bound(sig, factory.range(0..2)?)?;
        let order: Vec<_> = bounds.iter().map(|(r, _)| r).collect();
        assert_eq!(order, vec![sig, field]);

        let mut instance = Instance::new(universe.clone());
        instance.add(sig, factory.tuple_set(1, &[&["b"]])?)?;
        assert_eq!(instance.tuples(sig).map(TupleSet::size), Some(1));
        assert!(instance.tuples(field).is_none());

        let other = Universe::new(&["a", "b"])?;
        assert!(instance.add(field, other.factory().none(2)).is_err());
        Ok(())
    }
}
