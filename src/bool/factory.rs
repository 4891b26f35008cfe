//! Boolean factory with gate caching
//!
//! The factory creates boolean values and gates, with automatic deduplication.
//! Uses interior mutability (RefCell) to avoid &mut self everywhere.

use super::{BoolValue, BooleanFormula, BooleanVariable, Operator};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;

/// Options for boolean factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Enable sharing of structurally equal gates (default: true)
    pub sharing: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self { sharing: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    And(Vec<i32>),
    Or(Vec<i32>),
    Not(i32),
    Ite(i32, i32, i32),
}

#[derive(Debug)]
struct Gate {
    op: Operator,
    inputs: Box<[BoolValue]>,
}

/// Boolean circuit factory with caching
///
/// Variables are labelled `1..=num_variables`; gates get the labels that
/// follow, in creation order, so a gate's inputs always have smaller labels.
pub struct BooleanFactory {
    num_variables: u32,
    options: Options,
    gates: RefCell<Vec<Gate>>,
    cache: RefCell<FxHashMap<CacheKey, BoolValue>>,
}

impl BooleanFactory {
    /// Creates a factory over `num_variables` primary variables
    pub fn new(num_variables: u32, options: Options) -> Self {
        Self {
            num_variables,
            options,
            gates: RefCell::new(Vec::new()),
            cache: RefCell::new(FxHashMap::default()),
        }
    }

    /// Returns the number of primary variables
    pub fn num_variables(&self) -> u32 {
        self.num_variables
    }

    /// Returns the number of gates created so far
    pub fn num_gates(&self) -> usize {
        self.gates.borrow().len()
    }

    /// Returns the largest label in use
    pub fn max_label(&self) -> u32 {
        self.num_variables + self.num_gates() as u32
    }

    /// Returns the primary variable with the given label
    pub fn variable(&self, label: u32) -> BoolValue {
        debug_assert!(label > 0 && label <= self.num_variables, "variable {label} out of range");
        BoolValue::Variable(BooleanVariable::new(label as i32))
    }

    /// Creates a constant
    pub fn constant(&self, value: bool) -> BoolValue {
        BoolValue::from(value)
    }

    /// Returns the inputs of a gate
    pub fn inputs(&self, gate: &BooleanFormula) -> Vec<BoolValue> {
        let index = (gate.label() as u32 - self.num_variables - 1) as usize;
        self.gates.borrow()[index].inputs.to_vec()
    }

    /// Creates an AND gate
    pub fn and(&self, left: BoolValue, right: BoolValue) -> BoolValue {
        self.and_multi(vec![left, right])
    }

    /// Creates a multi-input AND gate
    pub fn and_multi(&self, inputs: Vec<BoolValue>) -> BoolValue {
        self.nary(Operator::AND, inputs)
    }

    /// Creates an OR gate
    pub fn or(&self, left: BoolValue, right: BoolValue) -> BoolValue {
        self.or_multi(vec![left, right])
    }

    /// Creates a multi-input OR gate
    pub fn or_multi(&self, inputs: Vec<BoolValue>) -> BoolValue {
        self.nary(Operator::OR, inputs)
    }

    fn nary(&self, op: Operator, mut inputs: Vec<BoolValue>) -> BoolValue {
        // AND: FALSE dominates, TRUE is the identity. OR: the other way round.
        let (dominant, identity) = match op {
            Operator::AND => (BoolValue::FALSE, BoolValue::TRUE),
            _ => (BoolValue::TRUE, BoolValue::FALSE),
        };

        if inputs.contains(&dominant) {
            return dominant;
        }
        inputs.retain(|v| *v != identity);
        inputs.sort_by_key(|v| v.label());
        inputs.dedup();

        match inputs.len() {
            0 => return identity,
            1 => return inputs[0],
            _ => {}
        }

        // x AND NOT x, x OR NOT x
        let labels: FxHashSet<i32> = inputs.iter().map(|v| v.label()).collect();
        for value in &inputs {
            if let BoolValue::Formula(f) = value {
                if f.op() == Operator::NOT && labels.contains(&self.inputs(f)[0].label()) {
                    return dominant;
                }
            }
        }

        let key_labels: Vec<i32> = inputs.iter().map(|v| v.label()).collect();
        let key = match op {
            Operator::AND => CacheKey::And(key_labels),
            _ => CacheKey::Or(key_labels),
        };
        self.cached_gate(key, op, inputs)
    }

    /// Creates a NOT gate
    pub fn not(&self, input: BoolValue) -> BoolValue {
        match input {
            BoolValue::Constant(c) => self.constant(!c.boolean_value()),
            BoolValue::Formula(f) if f.op() == Operator::NOT => self.inputs(&f)[0],
            _ => self.cached_gate(CacheKey::Not(input.label()), Operator::NOT, vec![input]),
        }
    }

    /// Creates an if-then-else gate
    pub fn ite(&self, condition: BoolValue, then_val: BoolValue, else_val: BoolValue) -> BoolValue {
        if let BoolValue::Constant(c) = condition {
            return if c.boolean_value() { then_val } else { else_val };
        }
        if then_val == else_val {
            return then_val;
        }
        match (then_val, else_val) {
            (BoolValue::TRUE, BoolValue::FALSE) => condition,
            (BoolValue::FALSE, BoolValue::TRUE) => self.not(condition),
            (BoolValue::TRUE, _) => self.or(condition, else_val),
            (BoolValue::FALSE, _) => {
                let not_c = self.not(condition);
                self.and(not_c, else_val)
            }
            (_, BoolValue::TRUE) => {
                let not_c = self.not(condition);
                self.or(not_c, then_val)
            }
            (_, BoolValue::FALSE) => self.and(condition, then_val),
            _ => {
                let key = CacheKey::Ite(condition.label(), then_val.label(), else_val.label());
                self.cached_gate(key, Operator::ITE, vec![condition, then_val, else_val])
            }
        }
    }

    /// IMPLIES: a => b = NOT a OR b
    pub fn implies(&self, a: BoolValue, b: BoolValue) -> BoolValue {
        let not_a = self.not(a);
        self.or(not_a, b)
    }

    /// IFF: a <=> b = (a AND b) OR (NOT a AND NOT b)
    pub fn iff(&self, a: BoolValue, b: BoolValue) -> BoolValue {
        let both = self.and(a, b);
        let not_a = self.not(a);
        let not_b = self.not(b);
        let neither = self.and(not_a, not_b);
        self.or(both, neither)
    }

    fn cached_gate(&self, key: CacheKey, op: Operator, inputs: Vec<BoolValue>) -> BoolValue {
        if self.options.sharing {
            if let Some(&cached) = self.cache.borrow().get(&key) {
                return cached;
            }
        }
        let gate = self.allocate(op, inputs);
        if self.options.sharing {
            self.cache.borrow_mut().insert(key, gate);
        }
        gate
    }

    fn allocate(&self, op: Operator, inputs: Vec<BoolValue>) -> BoolValue {
        let mut gates = self.gates.borrow_mut();
        gates.push(Gate {
            op,
            inputs: inputs.into_boxed_slice(),
        });
        let label = self.num_variables as i32 + gates.len() as i32;
        BoolValue::Formula(BooleanFormula::new(label, op))
    }
}

impl std::fmt::Debug for BooleanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BooleanFactory")
            .field("num_variables", &self.num_variables)
            .field("num_gates", &self.num_gates())
            .field("options", &self.options)
            .finish()
    }
}
