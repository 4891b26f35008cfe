//! Integer expression types

use super::ExprId;

/// Integer comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntCompareOp {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
}

impl IntCompareOp {
    /// The operator with its operands swapped (`a < b` iff `b > a`)
    pub fn flipped(self) -> Self {
        match self {
            IntCompareOp::Eq => IntCompareOp::Eq,
            IntCompareOp::Ne => IntCompareOp::Ne,
            IntCompareOp::Lt => IntCompareOp::Gt,
            IntCompareOp::Lte => IntCompareOp::Gte,
            IntCompareOp::Gt => IntCompareOp::Lt,
            IntCompareOp::Gte => IntCompareOp::Lte,
        }
    }
}

/// An expression that evaluates to a non-negative integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntExpr {
    /// Integer literal
    Constant(usize),
    /// `#e`, the number of tuples in `e`
    Cardinality(ExprId),
}

impl IntExpr {
    /// Returns the literal value, if constant
    pub fn constant_value(&self) -> Option<usize> {
        match self {
            IntExpr::Constant(n) => Some(*n),
            IntExpr::Cardinality(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipping_is_an_involution() {
        for op in [
            IntCompareOp::Eq,
            IntCompareOp::Ne,
            IntCompareOp::Lt,
            IntCompareOp::Lte,
            IntCompareOp::Gt,
            IntCompareOp::Gte,
        ] {
            assert_eq!(op.flipped().flipped(), op);
        }
        assert_eq!(IntCompareOp::Lt.flipped(), IntCompareOp::Gt);
    }
}
