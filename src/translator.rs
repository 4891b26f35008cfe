//! Relational formula to boolean circuit translation
//!
//! Expressions become sparse boolean matrices over the universe and formulas
//! become gates of the interpreter's [`BooleanFactory`]. Quantifiers and
//! comprehensions are expanded over the ground atoms of their domains, each
//! binding guarded by the atom's membership in the domain.

mod cache;
mod environment;
mod leaf_interpreter;

pub use cache::TranslationCache;
pub use environment::Environment;
pub use leaf_interpreter::LeafInterpreter;

use crate::ast::{
    Decl, ExprId, ExprKind, FormulaId, FormulaKind, IntCompareOp, IntExpr, Multiplicity, Quantifier, RelationId,
    VarId,
};
use crate::bool::{BoolValue, BooleanFactory, BooleanMatrix, Count, Dimensions};
use crate::error::{AlloyError, Result};
use crate::resolve::TypedModel;
use tracing::debug;

type Visit<'v, 'a> = dyn FnMut(&mut Translator<'a>, BoolValue) -> Result<()> + 'v;

/// Translates the formulas of a typed model against a [`LeafInterpreter`]
pub struct Translator<'a> {
    model: &'a TypedModel,
    interpreter: &'a LeafInterpreter,
    env: Environment,
    cache: TranslationCache,
    univ: BooleanMatrix,
    iden: BooleanMatrix,
}

impl<'a> Translator<'a> {
    /// Translates the conjunction of `formulas` to a single boolean value
    pub fn compile(
        model: &'a TypedModel,
        formulas: &[FormulaId],
        interpreter: &'a LeafInterpreter,
    ) -> Result<BoolValue> {
        let mut translator = Translator::new(model, interpreter)?;
        let mut values = Vec::with_capacity(formulas.len());
        for &formula in formulas {
            let value = translator.formula(formula)?;
            if value == BoolValue::FALSE {
                debug!("formula translated to FALSE");
                return Ok(BoolValue::FALSE);
            }
            values.push(value);
        }
        let root = interpreter.factory().and_multi(values);
        debug!(
            formulas = formulas.len(),
            gates = interpreter.factory().num_gates(),
            cache_hits = translator.cache.hits(),
            "formulas translated"
        );
        Ok(root)
    }

    /// Creates a translator with an empty environment
    pub fn new(model: &'a TypedModel, interpreter: &'a LeafInterpreter) -> Result<Self> {
        let factory = interpreter.factory();
        let mut univ = interpreter.none(1);
        for top in model.sigs.top_level() {
            univ = univ.union(interpreter.interpret(RelationId::Sig(top))?, factory);
        }
        let u = interpreter.universe().size();
        let mut iden = interpreter.none(2);
        for (atom, value) in univ.iter() {
            iden.set(atom * u + atom, value);
        }

        Ok(Self {
            model,
            interpreter,
            env: Environment::empty(),
            cache: TranslationCache::new(),
            univ,
            iden,
        })
    }

    fn factory(&self) -> &'a BooleanFactory {
        self.interpreter.factory()
    }

    fn bindings(&self, vars: &[VarId]) -> Result<Vec<usize>> {
        self.env.ground(vars).ok_or_else(|| {
            let names: Vec<&str> = vars
                .iter()
                .filter(|&&v| self.env.lookup(v).is_none())
                .map(|&v| self.model.arena.var(v).name.as_str())
                .collect();
            AlloyError::InvalidArgument(format!("unbound variables {names:?}"))
        })
    }

    /// Translates a formula under the current bindings
    pub fn formula(&mut self, id: FormulaId) -> Result<BoolValue> {
        let model = self.model;
        let formula = model.arena.formula(id);
        let bindings = self.bindings(formula.free_vars())?;
        if let Some(cached) = self.cache.lookup_formula(id, &bindings) {
            return Ok(cached);
        }

        let factory = self.factory();
        let value = match formula.kind() {
            FormulaKind::Constant(b) => BoolValue::from(*b),
            FormulaKind::Not(f) => {
                let inner = self.formula(*f)?;
                factory.not(inner)
            }
            FormulaKind::And(conjuncts) => {
                let mut values = Vec::with_capacity(conjuncts.len());
                for &f in conjuncts {
                    let value = self.formula(f)?;
                    if value == BoolValue::FALSE {
                        break;
                    }
                    values.push(value);
                }
                if values.len() < conjuncts.len() {
                    BoolValue::FALSE
                } else {
                    factory.and_multi(values)
                }
            }
            FormulaKind::Or(disjuncts) => {
                let mut values = Vec::with_capacity(disjuncts.len());
                for &f in disjuncts {
                    let value = self.formula(f)?;
                    if value == BoolValue::TRUE {
                        break;
                    }
                    values.push(value);
                }
                if values.len() < disjuncts.len() {
                    BoolValue::TRUE
                } else {
                    factory.or_multi(values)
                }
            }
            FormulaKind::Implies(a, b) => {
                let premise = self.formula(*a)?;
                if premise == BoolValue::FALSE {
                    BoolValue::TRUE
                } else {
                    let conclusion = self.formula(*b)?;
                    factory.implies(premise, conclusion)
                }
            }
            FormulaKind::Iff(a, b) => {
                let a = self.formula(*a)?;
                let b = self.formula(*b)?;
                factory.iff(a, b)
            }
            FormulaKind::IfThenElse(c, a, b) => {
                let c = self.formula(*c)?;
                let a = self.formula(*a)?;
                let b = self.formula(*b)?;
                factory.ite(c, a, b)
            }
            FormulaKind::Subset(a, b) => {
                let a = self.expr(*a)?;
                let b = self.expr(*b)?;
                a.subset(&b, factory)
            }
            FormulaKind::Equal(a, b) => {
                let a = self.expr(*a)?;
                let b = self.expr(*b)?;
                a.equals(&b, factory)
            }
            FormulaKind::Multiplicity(mult, e) => {
                let matrix = self.expr(*e)?;
                match mult {
                    Multiplicity::Some => matrix.some(factory),
                    Multiplicity::No => matrix.none(factory),
                    Multiplicity::One => matrix.one(factory),
                    Multiplicity::Lone => matrix.lone(factory),
                }
            }
            FormulaKind::Quantified {
                quantifier,
                decls,
                body,
            } => self.quantified(*quantifier, decls, *body)?,
            FormulaKind::IntComparison(left, op, right) => self.int_comparison(left, *op, right)?,
        };

        self.cache.cache_formula(id, bindings, value);
        Ok(value)
    }

    /// Translates an expression under the current bindings
    pub fn expr(&mut self, id: ExprId) -> Result<BooleanMatrix> {
        let model = self.model;
        let expr = model.arena.expr(id);
        let bindings = self.bindings(expr.free_vars())?;
        if let Some(cached) = self.cache.lookup_expr(id, &bindings) {
            return Ok(cached);
        }

        let factory = self.factory();
        let matrix = match expr.kind() {
            ExprKind::Sig(sig) => self.interpreter.interpret(RelationId::Sig(*sig))?.clone(),
            ExprKind::Field(field) => self.interpreter.interpret(RelationId::Field(*field))?.clone(),
            ExprKind::Var(_) => self.interpreter.atom(bindings[0]),
            ExprKind::Univ => self.univ.clone(),
            ExprKind::Iden => self.iden.clone(),
            ExprKind::None(arity) => self.interpreter.none(*arity),
            ExprKind::Union(a, b) => self.expr(*a)?.union(&self.expr(*b)?, factory),
            ExprKind::Intersection(a, b) => self.expr(*a)?.intersection(&self.expr(*b)?, factory),
            ExprKind::Difference(a, b) => self.expr(*a)?.difference(&self.expr(*b)?, factory),
            ExprKind::Override(a, b) => self.expr(*a)?.override_with(&self.expr(*b)?, factory),
            ExprKind::Join(a, b) => self.expr(*a)?.join(&self.expr(*b)?, factory),
            ExprKind::Product(a, b) => self.expr(*a)?.product(&self.expr(*b)?, factory),
            ExprKind::DomainRestrict(s, r) => {
                let s = self.expr(*s)?;
                self.expr(*r)?.domain_restrict(&s, factory)
            }
            ExprKind::RangeRestrict(r, s) => self.expr(*r)?.range_restrict(&self.expr(*s)?, factory),
            ExprKind::Transpose(e) => self.expr(*e)?.transpose(),
            ExprKind::Closure(e) => self.expr(*e)?.closure(factory),
            ExprKind::ReflexiveClosure(e) => self.expr(*e)?.reflexive_closure(factory, &self.iden),
            ExprKind::Comprehension(decls, body) => self.comprehension(decls, *body)?,
            ExprKind::IfThenElse(c, a, b) => {
                let condition = self.formula(*c)?;
                let then_matrix = self.expr(*a)?;
                let else_matrix = self.expr(*b)?;
                then_matrix.choice(condition, &else_matrix, factory)
            }
        };

        self.cache.cache_expr(id, bindings, matrix.clone());
        Ok(matrix)
    }

    /// Calls `visit` once per ground binding of `decls`, with the binding's guard
    fn expand(&mut self, decls: &[Decl], guard: BoolValue, visit: &mut Visit<'_, 'a>) -> Result<()> {
        let Some((decl, rest)) = decls.split_first() else {
            return visit(self, guard);
        };
        let domain = self.expr(decl.domain)?;
        let factory = self.factory();
        for (atom, membership) in domain.iter() {
            let guard = factory.and(guard, membership);
            if guard == BoolValue::FALSE {
                continue;
            }
            self.env.extend(decl.var, atom);
            let result = self.expand(rest, guard, visit);
            self.env.pop();
            result?;
        }
        Ok(())
    }

    fn quantified(&mut self, quantifier: Quantifier, decls: &[Decl], body: FormulaId) -> Result<BoolValue> {
        let factory = self.factory();
        let mut values = Vec::new();
        self.expand(decls, BoolValue::TRUE, &mut |t: &mut Translator<'a>, guard: BoolValue| {
            let holds = t.formula(body)?;
            values.push(match quantifier {
                Quantifier::All => factory.implies(guard, holds),
                _ => factory.and(guard, holds),
            });
            Ok(())
        })?;

        Ok(match quantifier {
            Quantifier::All => factory.and_multi(values),
            Quantifier::Some => factory.or_multi(values),
            Quantifier::No => {
                let some = factory.or_multi(values);
                factory.not(some)
            }
            Quantifier::One => factory.exactly_one(&values),
            Quantifier::Lone => factory.at_most_one(&values),
        })
    }

    fn comprehension(&mut self, decls: &[Decl], body: FormulaId) -> Result<BooleanMatrix> {
        let factory = self.factory();
        let dims = Dimensions::square(self.interpreter.universe().size(), decls.len());
        let vars: Vec<VarId> = decls.iter().map(|d| d.var).collect();
        let mut matrix = BooleanMatrix::empty(dims);

        self.expand(decls, BoolValue::TRUE, &mut |t: &mut Translator<'a>, guard: BoolValue| {
            let holds = t.formula(body)?;
            let atoms = t.bindings(&vars)?;
            matrix.set(dims.index_of(&atoms), factory.and(guard, holds));
            Ok(())
        })?;
        Ok(matrix)
    }

    fn int_comparison(&mut self, left: &IntExpr, op: IntCompareOp, right: &IntExpr) -> Result<BoolValue> {
        // counting one past a constant operand decides every comparison with it
        let (l, r) = match (*left, *right) {
            (IntExpr::Constant(a), IntExpr::Constant(b)) => return Ok(BoolValue::from(compare(a, op, b))),
            (IntExpr::Constant(c), IntExpr::Cardinality(e)) => {
                let r = self.cardinality(e, Some(c.saturating_add(1)))?;
                (Count::constant_within(c, r.bound()), r)
            }
            (IntExpr::Cardinality(e), IntExpr::Constant(c)) => {
                let l = self.cardinality(e, Some(c.saturating_add(1)))?;
                let r = Count::constant_within(c, l.bound());
                (l, r)
            }
            (IntExpr::Cardinality(a), IntExpr::Cardinality(b)) => (self.cardinality(a, None)?, self.cardinality(b, None)?),
        };
        let factory = self.factory();
        Ok(match op {
            IntCompareOp::Eq => l.eq(&r, factory),
            IntCompareOp::Ne => {
                let eq = l.eq(&r, factory);
                factory.not(eq)
            }
            IntCompareOp::Lt => l.lt(&r, factory),
            IntCompareOp::Lte => l.lte(&r, factory),
            IntCompareOp::Gt => r.lt(&l, factory),
            IntCompareOp::Gte => r.lte(&l, factory),
        })
    }

    fn cardinality(&mut self, expr: ExprId, cap: Option<usize>) -> Result<Count> {
        let matrix = self.expr(expr)?;
        let cap = cap.unwrap_or(matrix.density());
        Ok(matrix.count(self.factory(), cap))
    }
}

fn compare(a: usize, op: IntCompareOp, b: usize) -> bool {
    match op {
        IntCompareOp::Eq => a == b,
        IntCompareOp::Ne => a != b,
        IntCompareOp::Lt => a < b,
        IntCompareOp::Lte => a <= b,
        IntCompareOp::Gt => a > b,
        IntCompareOp::Gte => a >= b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{Encoder, Encoding, Scope, DEFAULT_SCOPE};
    use crate::resolve::resolve;
    use crate::solver::Options;
    use crate::syntax::parse;

    fn setup(source: &str, scope: u32) -> (TypedModel, Encoding) {
        let model = resolve(&parse(source).unwrap()).unwrap();
        let command = model.select_command(None).unwrap();
        let scope = Scope::for_command(&model, &command, Some(scope), DEFAULT_SCOPE);
        let encoding = Encoder::encode(&model, &scope, &Options::default()).unwrap();
        (model, encoding)
    }

    fn goal(source: &str, scope: u32) -> BoolValue {
        let (model, encoding) = setup(source, scope);
        let command = model.select_command(None).unwrap();
        Translator::compile(&model, &[command.goal], encoding.interpreter()).unwrap()
    }

    #[test]
    fn empty_universe_folds_to_constants() {
        assert_eq!(goal("sig A {}\nrun { some A }", 0), BoolValue::FALSE);
        assert_eq!(goal("sig A {}\nrun { no A }", 0), BoolValue::TRUE);
        assert_eq!(goal("sig A {}\nrun { all a: A | no a }", 0), BoolValue::TRUE);
        assert_eq!(goal("sig A {}\nrun { #A = 0 }", 0), BoolValue::TRUE);
    }

    #[test]
    fn tautologies_fold_to_true() {
        assert_eq!(goal("sig A {}\nrun { A in A }", 2), BoolValue::TRUE);
        assert_eq!(goal("sig A {}\nrun { all x: A | x in A }", 2), BoolValue::TRUE);
        assert_eq!(goal("sig A { r: set A }\nrun { r.r in r.r }", 2), BoolValue::TRUE);
    }

    #[test]
    fn counts_beyond_the_universe_are_false() {
        assert_eq!(goal("sig A {}\nrun { #A > 2 }", 2), BoolValue::FALSE);
        assert_eq!(goal("sig A {}\nrun { #A <= 2 }", 2), BoolValue::TRUE);
        assert!(goal("sig A {}\nrun { #A = 1 }", 2).is_formula());
        assert_eq!(goal("sig A {}\nrun { 1 < 2 }", 2), BoolValue::TRUE);
    }

    #[test]
    fn huge_count_literals_fold_quickly() {
        let start = std::time::Instant::now();
        assert_eq!(goal("sig A {}\nrun { #A < 50000000 }", 3), BoolValue::TRUE);
        assert_eq!(goal("sig A {}\nrun { 50000000 <= #A }", 3), BoolValue::FALSE);
        assert_eq!(goal("sig A {}\nrun { #A = 4294967295 }", 3), BoolValue::FALSE);
        assert!(goal("sig A {}\nrun { #A != 2 }", 3).is_formula());
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
    }

    #[test]
    fn quantifiers_expand_over_domains() {
        assert!(goal("sig A { r: set A }\nrun { all a: A | a not in a.r }", 2).is_formula());
        assert!(goal("sig A {}\nrun { one a: A | a in A }", 3).is_formula());
        assert!(goal("sig A { r: set A }\nrun { some { x: A | x in x.r } }", 2).is_formula());
    }

    #[test]
    fn shared_subterms_hit_the_cache() {
        let (model, encoding) = setup(
            "sig A { r: set A }\nrun { (all a: A | some a.r) and (all a: A | some a.r) or no r.r }",
            2,
        );
        let command = model.select_command(None).unwrap();
        let mut translator = Translator::new(&model, encoding.interpreter()).unwrap();
        let first = translator.formula(command.goal).unwrap();
        let hits = translator.cache.hits();
        let second = translator.formula(command.goal).unwrap();
        assert_eq!(first, second);
        assert_eq!(translator.cache.hits(), hits + 1);
    }

    #[test]
    fn unbound_variables_are_reported() {
        let (model, encoding) = setup("sig A {}\nrun { all x: A | some x }", 2);
        let command = model.select_command(None).unwrap();
        let FormulaKind::Quantified { body, .. } = model.arena.formula(command.goal).kind() else {
            panic!("expected a quantified goal");
        };
        let mut translator = Translator::new(&model, encoding.interpreter()).unwrap();
        assert!(translator.formula(*body).is_err());
    }
}
