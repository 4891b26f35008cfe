//! Formula types

use super::{Decl, ExprId, FormulaId, IntCompareOp, IntExpr, VarId};

/// Multiplicity tests on expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    /// At least one tuple
    Some,
    /// No tuples
    No,
    /// Exactly one tuple
    One,
    /// At most one tuple
    Lone,
}

/// Quantifiers
///
/// `one` and `lone` count satisfying bindings: with several declared
/// variables, a binding is a tuple of atoms, one per variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantifier {
    /// Universal
    All,
    /// Existential
    Some,
    /// No binding satisfies the body
    No,
    /// Exactly one binding satisfies the body
    One,
    /// At most one binding satisfies the body
    Lone,
}

/// Formula kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormulaKind {
    /// `true` / `false`
    Constant(bool),
    /// `!f`
    Not(FormulaId),
    /// Conjunction
    And(Vec<FormulaId>),
    /// Disjunction
    Or(Vec<FormulaId>),
    /// `a => b`
    Implies(FormulaId, FormulaId),
    /// `a <=> b`
    Iff(FormulaId, FormulaId),
    /// `c => a else b`
    IfThenElse(FormulaId, FormulaId, FormulaId),
    /// `a in b`
    Subset(ExprId, ExprId),
    /// `a = b`
    Equal(ExprId, ExprId),
    /// `some e`, `no e`, `one e`, `lone e`
    Multiplicity(Multiplicity, ExprId),
    /// `q x: A, y: B | body`
    Quantified {
        /// The quantifier
        quantifier: Quantifier,
        /// Declarations, in binding order
        decls: Vec<Decl>,
        /// Quantified body
        body: FormulaId,
    },
    /// `#a < 3`, `#a = #b`, ...
    IntComparison(IntExpr, IntCompareOp, IntExpr),
}

/// A typed formula
#[derive(Debug, Clone)]
pub struct Formula {
    kind: FormulaKind,
    free: Vec<VarId>,
}

impl Formula {
    pub(crate) fn new(kind: FormulaKind, free: Vec<VarId>) -> Self {
        Self { kind, free }
    }

    /// The formula kind
    pub fn kind(&self) -> &FormulaKind {
        &self.kind
    }

    /// Free variables, sorted
    pub fn free_vars(&self) -> &[VarId] {
        &self.free
    }
}
