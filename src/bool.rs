//! Boolean circuit representation
//!
//! The boolean layer is the intermediate representation used when encoding
//! relations and translating formulas to CNF for SAT solving.
//!
//! Key types:
//! - `BooleanConstant`: TRUE (label 0) or FALSE (label -1)
//! - `BooleanVariable`: primary variables with positive labels
//! - `BooleanFormula`: gates (AND, OR, NOT, ITE), labels above the variables
//! - `BoolValue`: enum encompassing all of the above
//! - `Dimensions`: matrix dimensions for relation encoding
//! - `BooleanMatrix`: sparse matrix of boolean values, one cell per tuple
//! - `BooleanFactory`: creates and caches gates
//! - `Count`: unary cardinality of a set of boolean values

mod factory;
pub mod counter;
pub mod matrix_ops;
pub mod var_allocator;

pub use counter::Count;
pub use factory::{BooleanFactory, Options};
pub use var_allocator::VariableAllocator;

use std::collections::BTreeMap;

/// Boolean constant (TRUE or FALSE)
///
/// Constants have special labels:
/// - TRUE has label 0
/// - FALSE has label -1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanConstant {
    /// TRUE constant (label 0)
    TRUE,
    /// FALSE constant (label -1)
    FALSE,
}

impl BooleanConstant {
    /// Returns the label for this constant
    pub fn label(&self) -> i32 {
        match self {
            BooleanConstant::TRUE => 0,
            BooleanConstant::FALSE => -1,
        }
    }

    /// Returns the boolean value of this constant
    pub fn boolean_value(&self) -> bool {
        *self == BooleanConstant::TRUE
    }
}

/// Boolean variable with a positive integer label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BooleanVariable {
    label: i32,
}

impl BooleanVariable {
    /// Creates a new boolean variable with the given label.
    ///
    /// # Panics
    /// Panics if label is not positive.
    pub fn new(label: i32) -> Self {
        assert!(label > 0, "Variable labels must be positive");
        Self { label }
    }

    /// Returns the label for this variable
    pub fn label(&self) -> i32 {
        self.label
    }
}

/// Boolean gate
///
/// Gates have identity-based equality using their unique labels; the inputs
/// live in the factory that created the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BooleanFormula {
    label: i32,
    op: Operator,
}

impl BooleanFormula {
    pub(crate) fn new(label: i32, op: Operator) -> Self {
        Self { label, op }
    }

    /// Returns the label for this gate
    pub fn label(&self) -> i32 {
        self.label
    }

    /// Returns the gate operator
    pub fn op(&self) -> Operator {
        self.op
    }
}

/// Gate operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Multi-input conjunction
    AND,
    /// Multi-input disjunction
    OR,
    /// Negation
    NOT,
    /// If-then-else
    ITE,
}

/// Unified boolean value type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolValue {
    /// Constant (TRUE or FALSE)
    Constant(BooleanConstant),
    /// Primary variable
    Variable(BooleanVariable),
    /// Gate
    Formula(BooleanFormula),
}

impl BoolValue {
    /// The TRUE constant
    pub const TRUE: BoolValue = BoolValue::Constant(BooleanConstant::TRUE);
    /// The FALSE constant
    pub const FALSE: BoolValue = BoolValue::Constant(BooleanConstant::FALSE);

    /// Returns the label for this value
    pub fn label(&self) -> i32 {
        match self {
            BoolValue::Constant(c) => c.label(),
            BoolValue::Variable(v) => v.label(),
            BoolValue::Formula(f) => f.label(),
        }
    }

    /// Returns true if this is a constant
    pub fn is_constant(&self) -> bool {
        matches!(self, BoolValue::Constant(_))
    }

    /// Returns true if this is a primary variable
    pub fn is_variable(&self) -> bool {
        matches!(self, BoolValue::Variable(_))
    }

    /// Returns true if this is a gate
    pub fn is_formula(&self) -> bool {
        matches!(self, BoolValue::Formula(_))
    }
}

impl From<BooleanConstant> for BoolValue {
    fn from(c: BooleanConstant) -> Self {
        BoolValue::Constant(c)
    }
}

impl From<BooleanVariable> for BoolValue {
    fn from(v: BooleanVariable) -> Self {
        BoolValue::Variable(v)
    }
}

impl From<bool> for BoolValue {
    fn from(b: bool) -> Self {
        if b {
            BoolValue::TRUE
        } else {
            BoolValue::FALSE
        }
    }
}

/// Dimensions of a boolean matrix
///
/// A relation of arity `n` over a universe of `u` atoms has `u^n` cells. The
/// cell of tuple `(a0, .., a(n-1))` is `a0*u^(n-1) + .. + a(n-1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    universe: usize,
    arity: usize,
}

impl Dimensions {
    /// Creates dimensions for a relation of the given arity over a universe
    pub fn square(universe: usize, arity: usize) -> Self {
        Self { universe, arity }
    }

    /// Returns the universe size
    pub fn universe(&self) -> usize {
        self.universe
    }

    /// Returns the arity (number of columns)
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Returns the total number of cells
    pub fn capacity(&self) -> usize {
        self.universe.pow(self.arity as u32)
    }

    /// Number of cells spanned by one value of the first column
    pub fn row_length(&self) -> usize {
        self.universe.pow(self.arity.saturating_sub(1) as u32)
    }

    /// Returns the cell index of a tuple of atom indices
    pub fn index_of(&self, atoms: &[usize]) -> usize {
        debug_assert_eq!(atoms.len(), self.arity);
        atoms.iter().fold(0, |acc, &a| acc * self.universe + a)
    }

    /// Returns the atom indices of a cell
    pub fn atoms_of(&self, index: usize) -> Vec<usize> {
        let mut atoms = vec![0; self.arity];
        let mut rest = index;
        for slot in atoms.iter_mut().rev() {
            *slot = rest % self.universe;
            rest /= self.universe;
        }
        atoms
    }
}

/// Sparse matrix of boolean values
///
/// Only non-FALSE cells are stored, ordered by cell index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanMatrix {
    dimensions: Dimensions,
    cells: BTreeMap<usize, BoolValue>,
}

impl BooleanMatrix {
    /// Creates an empty matrix (all FALSE)
    pub fn empty(dimensions: Dimensions) -> Self {
        Self {
            dimensions,
            cells: BTreeMap::new(),
        }
    }

    /// Creates a matrix whose listed cells are TRUE
    pub fn with_true(dimensions: Dimensions, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut matrix = Self::empty(dimensions);
        for idx in indices {
            matrix.set(idx, BoolValue::TRUE);
        }
        matrix
    }

    /// Returns the dimensions of this matrix
    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    /// Returns the arity of this matrix
    pub fn arity(&self) -> usize {
        self.dimensions.arity()
    }

    /// Sets the value of a cell; FALSE removes it
    pub fn set(&mut self, index: usize, value: BoolValue) {
        debug_assert!(index < self.dimensions.capacity());
        if value == BoolValue::FALSE {
            self.cells.remove(&index);
        } else {
            self.cells.insert(index, value);
        }
    }

    /// Gets the value of a cell
    pub fn get(&self, index: usize) -> BoolValue {
        self.cells.get(&index).copied().unwrap_or(BoolValue::FALSE)
    }

    /// Iterates over the non-FALSE cells in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, BoolValue)> + '_ {
        self.cells.iter().map(|(&idx, &val)| (idx, val))
    }

    /// Iterates over the non-FALSE cells in `[start, end)`
    pub fn range(&self, start: usize, end: usize) -> impl Iterator<Item = (usize, BoolValue)> + '_ {
        self.cells.range(start..end).map(|(&idx, &val)| (idx, val))
    }

    /// Returns the number of non-FALSE cells
    pub fn density(&self) -> usize {
        self.cells.len()
    }

    /// Returns true if every cell is FALSE
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the values of the non-FALSE cells in index order
    pub fn values(&self) -> Vec<BoolValue> {
        self.cells.values().copied().collect()
    }

    /// Returns the indices of the TRUE cells
    pub fn dense_indices(&self) -> Vec<usize> {
        self.cells
            .iter()
            .filter(|(_, v)| **v == BoolValue::TRUE)
            .map(|(&idx, _)| idx)
            .collect()
    }
}
