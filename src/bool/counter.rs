//! Cardinality circuits
//!
//! Counts are kept in unary: bit `k-1` holds iff at least `k` of the counted
//! values are true. A sequential counter builds these bits in `O(n * cap)`
//! gates, which keeps `#r = 2` style constraints cheap for small scopes.

use super::{BoolValue, BooleanFactory};

/// Unary cardinality of a collection of boolean values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Count {
    at_least: Vec<BoolValue>,
}

impl Count {
    /// The count of a constant
    pub fn constant(n: usize) -> Self {
        Self {
            at_least: vec![BoolValue::TRUE; n],
        }
    }

    /// The count of a constant that is only ever compared with counts of at
    /// most `bound`
    ///
    /// Every constant above `bound` compares alike, so the unary form is cut
    /// at `bound + 1` bits however large `n` is.
    pub fn constant_within(n: usize, bound: usize) -> Self {
        Self::constant(n.min(bound.saturating_add(1)))
    }

    /// Counts the true values among `values`.
    ///
    /// `at_least(k)` is exact for `k <= cap`; bits above `cap` are not built.
    pub fn of(factory: &BooleanFactory, values: &[BoolValue], cap: usize) -> Self {
        let cap = cap.min(values.len());
        let mut at_least = vec![BoolValue::FALSE; cap];

        for &value in values {
            // high to low, so at_least[k - 2] still refers to the previous prefix
            for k in (1..=cap).rev() {
                let below = if k == 1 { BoolValue::TRUE } else { at_least[k - 2] };
                let carry = factory.and(below, value);
                at_least[k - 1] = factory.or(at_least[k - 1], carry);
            }
        }

        while at_least.last() == Some(&BoolValue::FALSE) {
            at_least.pop();
        }
        Self { at_least }
    }

    /// Upper bound on the counted value
    pub fn bound(&self) -> usize {
        self.at_least.len()
    }

    /// Returns the value that holds iff the count is at least `k`
    pub fn at_least(&self, k: usize) -> BoolValue {
        match k {
            0 => BoolValue::TRUE,
            _ => self.at_least.get(k - 1).copied().unwrap_or(BoolValue::FALSE),
        }
    }

    /// `self = other`
    pub fn eq(&self, other: &Count, factory: &BooleanFactory) -> BoolValue {
        let n = self.bound().max(other.bound());
        let bits = (1..=n)
            .map(|k| factory.iff(self.at_least(k), other.at_least(k)))
            .collect();
        factory.and_multi(bits)
    }

    /// `self <= other`
    pub fn lte(&self, other: &Count, factory: &BooleanFactory) -> BoolValue {
        let n = self.bound().max(other.bound());
        let bits = (1..=n)
            .map(|k| factory.implies(self.at_least(k), other.at_least(k)))
            .collect();
        factory.and_multi(bits)
    }

    /// `self < other`
    pub fn lt(&self, other: &Count, factory: &BooleanFactory) -> BoolValue {
        let n = self.bound().max(other.bound());
        let witnesses = (1..=n)
            .map(|k| {
                let below = factory.not(self.at_least(k));
                factory.and(below, other.at_least(k))
            })
            .collect();
        factory.or_multi(witnesses)
    }
}

impl BooleanFactory {
    /// At most one of `values` is true
    pub fn at_most_one(&self, values: &[BoolValue]) -> BoolValue {
        let mut constraints = Vec::with_capacity(values.len());
        let mut seen = BoolValue::FALSE;
        for &value in values {
            // value => no earlier value
            let not_value = self.not(value);
            let not_seen = self.not(seen);
            constraints.push(self.or(not_value, not_seen));
            seen = self.or(seen, value);
        }
        self.and_multi(constraints)
    }

    /// Exactly one of `values` is true
    pub fn exactly_one(&self, values: &[BoolValue]) -> BoolValue {
        let at_most = self.at_most_one(values);
        let some = self.or_multi(values.to_vec());
        self.and(at_most, some)
    }
}
