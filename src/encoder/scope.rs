//! Scope resolution: how many atoms each signature hierarchy gets

use crate::ast::SigId;
use crate::resolve::{ResolvedCommand, SigTable, TypedModel};
use crate::syntax::ast::SigMult;

/// Scope used when neither the command nor the caller gives one
pub const DEFAULT_SCOPE: u32 = 3;

/// An explicit per-signature bound, enforced as a cardinality constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    /// Atom bound
    pub count: u32,
    /// `exactly`: the signature has precisely `count` atoms
    pub exact: bool,
}

/// The scope of one analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    default: u32,
    explicit: Vec<Option<Bound>>,
    atoms: Vec<u32>,
}

impl Scope {
    /// Computes the scope of a command
    ///
    /// `override_scope` replaces the command's `for N`; `default_scope`
    /// applies when neither is given. Per-signature `but` bounds are kept.
    pub fn for_command(
        model: &TypedModel,
        command: &ResolvedCommand,
        override_scope: Option<u32>,
        default_scope: u32,
    ) -> Self {
        let default = override_scope
            .or(command.scope.default)
            .unwrap_or(default_scope);

        let mut explicit = vec![None; model.sigs.num_sigs()];
        for sig_scope in &command.scope.sigs {
            explicit[sig_scope.sig.index()] = Some(Bound {
                count: sig_scope.count,
                exact: sig_scope.exact,
            });
        }

        let mut scope = Self {
            default,
            explicit,
            atoms: vec![0; model.sigs.num_sigs()],
        };
        for top in model.sigs.top_level() {
            scope.atoms[top.index()] = scope.top_level_atoms(&model.sigs, top);
        }
        scope
    }

    /// A scope with the same default for every signature and no explicit bounds
    pub fn uniform(sigs: &SigTable, default: u32) -> Self {
        let mut scope = Self {
            default,
            explicit: vec![None; sigs.num_sigs()],
            atoms: vec![0; sigs.num_sigs()],
        };
        for top in sigs.top_level() {
            scope.atoms[top.index()] = scope.top_level_atoms(sigs, top);
        }
        scope
    }

    /// The default scope in effect
    pub fn default_scope(&self) -> u32 {
        self.default
    }

    /// The explicit bound of a signature, if the command gave one
    pub fn bound(&self, sig: SigId) -> Option<Bound> {
        self.explicit.get(sig.index()).copied().flatten()
    }

    /// Number of atoms allocated to a top-level signature's hierarchy
    pub fn atoms(&self, top: SigId) -> u32 {
        self.atoms.get(top.index()).copied().unwrap_or(0)
    }

    fn top_level_atoms(&self, sigs: &SigTable, top: SigId) -> u32 {
        let own = match (self.bound(top), sigs.sig(top).mult) {
            (Some(bound), _) => bound.count,
            (None, Some(SigMult::One | SigMult::Lone)) => 1,
            (None, _) => self.default,
        };
        let descendants = sigs
            .descendants(top)
            .into_iter()
            .skip(1)
            .filter_map(|sig| self.bound(sig).map(|b| b.count))
            .max()
            .unwrap_or(0);
        own.max(descendants).max(self.required(sigs, top))
    }

    // Fewest atoms a hierarchy needs: each `one`/`some` signature holds an
    // atom and sibling signatures are disjoint.
    fn required(&self, sigs: &SigTable, sig: SigId) -> u32 {
        let own = match (self.bound(sig), sigs.sig(sig).mult) {
            (Some(Bound { count, exact: true }), _) => count,
            (_, Some(SigMult::One | SigMult::Some)) => 1,
            _ => 0,
        };
        let children: u32 = sigs
            .sig(sig)
            .children
            .iter()
            .map(|&child| self.required(sigs, child))
            .sum();
        own.max(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve;
    use crate::syntax::parse;

    fn scope_of(source: &str, override_scope: Option<u32>) -> (TypedModel, Scope) {
        let model = resolve(&parse(source).unwrap()).unwrap();
        let command = model.select_command(None).unwrap();
        let scope = Scope::for_command(&model, &command, override_scope, DEFAULT_SCOPE);
        (model, scope)
    }

    #[test]
    fn default_and_override() {
        let (model, scope) = scope_of("sig A {}\nrun {} for 5", None);
        let a = model.sigs.lookup("A").unwrap();
        assert_eq!(scope.atoms(a), 5);

        let (_, scope) = scope_of("sig A {}\nrun {} for 5", Some(2));
        assert_eq!(scope.atoms(a), 2);

        let (_, scope) = scope_of("sig A {}\nrun {}", None);
        assert_eq!(scope.atoms(a), DEFAULT_SCOPE);
    }

    #[test]
    fn one_and_lone_tops_get_a_single_atom() {
        let (model, scope) = scope_of("one sig A {}\nlone sig B {}\nsome sig C {}\nrun {} for 4", None);
        assert_eq!(scope.atoms(model.sigs.lookup("A").unwrap()), 1);
        assert_eq!(scope.atoms(model.sigs.lookup("B").unwrap()), 1);
        assert_eq!(scope.atoms(model.sigs.lookup("C").unwrap()), 4);
    }

    #[test]
    fn descendant_bounds_raise_the_top() {
        let (model, scope) = scope_of(
            "abstract sig A {}\nsig B extends A {}\nsig C extends A {}\nrun {} for 2 but exactly 4 B",
            None,
        );
        let a = model.sigs.lookup("A").unwrap();
        let b = model.sigs.lookup("B").unwrap();
        assert_eq!(scope.atoms(a), 4);
        assert_eq!(scope.bound(b), Some(Bound { count: 4, exact: true }));
        assert_eq!(scope.bound(a), None);
    }

    #[test]
    fn one_sig_extensions_are_counted() {
        let (model, scope) = scope_of(
            "abstract sig Color {}\none sig Red, Green, Blue, Black extends Color {}\nrun {} for 2",
            None,
        );
        assert_eq!(scope.atoms(model.sigs.lookup("Color").unwrap()), 4);
    }

    #[test]
    fn uniform_scope() {
        let model = resolve(&parse("sig A {} one sig B {}").unwrap()).unwrap();
        let scope = Scope::uniform(&model.sigs, 2);
        assert_eq!(scope.atoms(model.sigs.lookup("A").unwrap()), 2);
        assert_eq!(scope.atoms(model.sigs.lookup("B").unwrap()), 1);
    }
}
