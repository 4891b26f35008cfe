//! Boolean circuit to CNF translation
//!
//! Converts gates to clauses with the Tseitin transformation: each gate's
//! label doubles as its CNF variable and is defined once, however many
//! gates share it. The root is asserted with a unit clause.

use crate::bool::{BoolValue, BooleanFactory, BooleanFormula, Operator};
use rustc_hash::FxHashSet;

/// CNF representation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CNF {
    /// Largest variable used by any clause
    pub num_variables: u32,
    /// Clauses; a literal is a signed variable label
    pub clauses: Vec<Vec<i32>>,
}

impl CNF {
    /// Creates a new empty CNF
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause to the CNF
    pub fn add_clause(&mut self, clause: Vec<i32>) {
        for &lit in &clause {
            self.num_variables = self.num_variables.max(lit.unsigned_abs());
        }
        self.clauses.push(clause);
    }

    /// Number of clauses
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// True if the CNF contains the empty clause
    pub fn has_empty_clause(&self) -> bool {
        self.clauses.iter().any(Vec::is_empty)
    }
}

/// Translates boolean circuits to CNF
pub struct CNFTranslator<'a> {
    cnf: CNF,
    factory: &'a BooleanFactory,
    visited: FxHashSet<i32>,
}

impl<'a> CNFTranslator<'a> {
    /// Creates a translator for circuits built by `factory`
    pub fn new(factory: &'a BooleanFactory) -> Self {
        Self {
            cnf: CNF::new(),
            factory,
            visited: FxHashSet::default(),
        }
    }

    /// Translates `root` to CNF, asserting that it holds
    ///
    /// TRUE yields no clauses and FALSE yields the empty clause.
    pub fn translate(mut self, root: BoolValue) -> CNF {
        match root {
            BoolValue::TRUE => {}
            BoolValue::FALSE => self.cnf.add_clause(Vec::new()),
            _ => {
                if let BoolValue::Formula(gate) = root {
                    self.define(gate);
                }
                self.cnf.add_clause(vec![root.label()]);
            }
        }
        // primary variables keep their labels even if no clause mentions them
        self.cnf.num_variables = self.cnf.num_variables.max(self.factory.num_variables());
        self.cnf
    }

    /// Defines every gate reachable from `root`, inputs before outputs
    fn define(&mut self, root: BooleanFormula) {
        let mut stack = vec![(root, false)];
        while let Some((gate, expanded)) = stack.pop() {
            if expanded {
                let inputs = self.factory.inputs(&gate);
                self.encode(gate, &inputs);
                continue;
            }
            if !self.visited.insert(gate.label()) {
                continue;
            }
            stack.push((gate, true));
            for input in self.factory.inputs(&gate) {
                if let BoolValue::Formula(child) = input {
                    if !self.visited.contains(&child.label()) {
                        stack.push((child, false));
                    }
                }
            }
        }
    }

    fn encode(&mut self, gate: BooleanFormula, inputs: &[BoolValue]) {
        let output = gate.label();
        let labels: Vec<i32> = inputs.iter().map(BoolValue::label).collect();
        match gate.op() {
            Operator::AND => {
                // all inputs => output; output => each input
                let mut clause: Vec<i32> = labels.iter().map(|&l| -l).collect();
                clause.push(output);
                self.cnf.add_clause(clause);
                for &input in &labels {
                    self.cnf.add_clause(vec![input, -output]);
                }
            }
            Operator::OR => {
                // output => some input; each input => output
                let mut clause = labels.clone();
                clause.push(-output);
                self.cnf.add_clause(clause);
                for &input in &labels {
                    self.cnf.add_clause(vec![-input, output]);
                }
            }
            Operator::NOT => {
                let input = labels[0];
                self.cnf.add_clause(vec![input, output]);
                self.cnf.add_clause(vec![-input, -output]);
            }
            Operator::ITE => {
                let (cond, then_label, else_label) = (labels[0], labels[1], labels[2]);
                self.cnf.add_clause(vec![-cond, -then_label, output]);
                self.cnf.add_clause(vec![-cond, then_label, -output]);
                self.cnf.add_clause(vec![cond, -else_label, output]);
                self.cnf.add_clause(vec![cond, else_label, -output]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bool::Options;

    #[test]
    fn cnf_add_clause() {
        let mut cnf = CNF::new();
        cnf.add_clause(vec![1, -2, 3]);
        assert_eq!(cnf.num_variables, 3);
        assert_eq!(cnf.num_clauses(), 1);
        assert!(!cnf.has_empty_clause());
    }

    #[test]
    fn constant_roots() {
        let factory = BooleanFactory::new(2, Options::default());
        let cnf = CNFTranslator::new(&factory).translate(BoolValue::TRUE);
        assert_eq!(cnf.num_clauses(), 0);
        assert_eq!(cnf.num_variables, 2);

        let cnf = CNFTranslator::new(&factory).translate(BoolValue::FALSE);
        assert!(cnf.has_empty_clause());
    }

    #[test]
    fn variable_root_is_a_unit_clause() {
        let factory = BooleanFactory::new(5, Options::default());
        let cnf = CNFTranslator::new(&factory).translate(factory.variable(5));
        assert_eq!(cnf.clauses, vec![vec![5]]);
    }

    #[test]
    fn and_gate() {
        let factory = BooleanFactory::new(2, Options::default());
        let and = factory.and(factory.variable(1), factory.variable(2));
        let cnf = CNFTranslator::new(&factory).translate(and);

        // definition (3 clauses) plus the root assertion
        assert_eq!(cnf.num_clauses(), 4);
        assert_eq!(cnf.num_variables, 3);
        assert_eq!(cnf.clauses.last(), Some(&vec![3]));
    }

    #[test]
    fn shared_gates_are_defined_once() {
        let factory = BooleanFactory::new(3, Options::default());
        let v1 = factory.variable(1);
        let v2 = factory.variable(2);
        let v3 = factory.variable(3);
        let shared = factory.and(v1, v2);
        let left = factory.or(shared, v3);
        let not_v3 = factory.not(v3);
        let right = factory.or(shared, not_v3);
        let root = factory.and(left, right);

        let cnf = CNFTranslator::new(&factory).translate(root);
        // AND(3) + OR(3) + NOT(2) + OR(3) + AND(3) + root
        assert_eq!(cnf.num_clauses(), 15);
    }

    #[test]
    fn ite_gate() {
        let factory = BooleanFactory::new(3, Options::default());
        let ite = factory.ite(factory.variable(1), factory.variable(2), factory.variable(3));
        let cnf = CNFTranslator::new(&factory).translate(ite);
        assert_eq!(cnf.num_clauses(), 5);
    }
}
