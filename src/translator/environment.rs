//! Ground bindings of quantified variables during translation

use crate::ast::VarId;

/// Stack of variable bindings; each variable is bound to one atom
///
/// Quantifier expansion pushes a binding per ground atom and pops it when
/// the atom is done, so inner bindings shadow outer ones.
#[derive(Debug, Default)]
pub struct Environment {
    bindings: Vec<(VarId, usize)>,
}

impl Environment {
    /// Creates an empty environment
    pub fn empty() -> Self {
        Self::default()
    }

    /// Binds `var` to `atom`
    pub fn extend(&mut self, var: VarId, atom: usize) {
        self.bindings.push((var, atom));
    }

    /// Drops the most recent binding
    pub fn pop(&mut self) {
        self.bindings.pop();
    }

    /// The atom `var` is bound to, most recent binding first
    pub fn lookup(&self, var: VarId) -> Option<usize> {
        self.bindings
            .iter()
            .rev()
            .find(|(v, _)| *v == var)
            .map(|&(_, atom)| atom)
    }

    /// Atoms of `vars`, in order; `None` if any is unbound
    pub fn ground(&self, vars: &[VarId]) -> Option<Vec<usize>> {
        vars.iter().map(|&v| self.lookup(v)).collect()
    }

    /// Number of live bindings
    pub fn depth(&self) -> usize {
        self.bindings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_bindings_shadow_outer() {
        let mut env = Environment::empty();
        let x = VarId(0);
        let y = VarId(1);
        assert_eq!(env.lookup(x), None);

        env.extend(x, 2);
        env.extend(y, 0);
        env.extend(x, 5);
        assert_eq!(env.lookup(x), Some(5));
        assert_eq!(env.ground(&[x, y]), Some(vec![5, 0]));
        assert_eq!(env.depth(), 3);

        env.pop();
        assert_eq!(env.lookup(x), Some(2));
        env.pop();
        assert_eq!(env.ground(&[x, y]), None);
    }
}
