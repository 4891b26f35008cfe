//! Translation cache
//!
//! Expressions and formulas are hash-consed, so an id identifies a subterm
//! structurally. A translation depends on the id and on the atoms bound to the
//! subterm's free variables. Each record remembers the translation for the
//! most recent ground binding only: quantifier expansion visits bindings in
//! order, so repeated lookups under one binding hit while the cache stays
//! linear in the number of distinct subterms.

use crate::ast::{ExprId, FormulaId};
use crate::bool::{BoolValue, BooleanMatrix};
use rustc_hash::FxHashMap;
use std::hash::Hash;

struct Record<T> {
    bindings: Vec<usize>,
    translation: T,
}

struct Table<K, T> {
    records: FxHashMap<K, Record<T>>,
    hits: usize,
}

impl<K: Hash + Eq, T: Clone> Table<K, T> {
    fn new() -> Self {
        Self {
            records: FxHashMap::default(),
            hits: 0,
        }
    }

    fn lookup(&mut self, key: &K, bindings: &[usize]) -> Option<T> {
        let record = self.records.get(key)?;
        if record.bindings != bindings {
            return None;
        }
        self.hits += 1;
        Some(record.translation.clone())
    }

    fn insert(&mut self, key: K, bindings: Vec<usize>, translation: T) {
        self.records.insert(key, Record { bindings, translation });
    }
}

/// Memo tables for expression and formula translations
pub struct TranslationCache {
    exprs: Table<ExprId, BooleanMatrix>,
    formulas: Table<FormulaId, BoolValue>,
}

impl TranslationCache {
    /// Creates an empty cache
    pub fn new() -> Self {
        Self {
            exprs: Table::new(),
            formulas: Table::new(),
        }
    }

    /// Cached translation of `expr` under the given free-variable atoms
    pub fn lookup_expr(&mut self, expr: ExprId, bindings: &[usize]) -> Option<BooleanMatrix> {
        self.exprs.lookup(&expr, bindings)
    }

    /// Records the translation of `expr`
    pub fn cache_expr(&mut self, expr: ExprId, bindings: Vec<usize>, translation: BooleanMatrix) {
        self.exprs.insert(expr, bindings, translation);
    }

    /// Cached translation of `formula` under the given free-variable atoms
    pub fn lookup_formula(&mut self, formula: FormulaId, bindings: &[usize]) -> Option<BoolValue> {
        self.formulas.lookup(&formula, bindings)
    }

    /// Records the translation of `formula`
    pub fn cache_formula(&mut self, formula: FormulaId, bindings: Vec<usize>, translation: BoolValue) {
        self.formulas.insert(formula, bindings, translation);
    }

    /// Number of lookups answered from the cache
    pub fn hits(&self) -> usize {
        self.exprs.hits + self.formulas.hits
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new()
    }
}
