//! Bounded encoding of a typed model
//!
//! Allocates the universe (one run of atoms per top-level signature), bounds
//! every signature and field by its candidate tuples, and builds the
//! structural constraints that every instance must satisfy: typing, field
//! and signature multiplicities, the extension hierarchy and explicit scope
//! counts.

pub mod scope;
pub mod symmetry;

pub use scope::{Bound, Scope, DEFAULT_SCOPE};

use crate::ast::{ColumnType, FieldId, RelationId, SigId};
use crate::bool::{BoolValue, BooleanFactory, BooleanMatrix, Count};
use crate::error::Result;
use crate::instance::{Bounds, Instance, TupleSet, Universe};
use crate::resolve::{SigTable, TypedModel};
use crate::solver::Options;
use crate::syntax::ast::{FieldMult, SigMult};
use crate::translator::LeafInterpreter;
use std::ops::Range;
use tracing::debug;

/// The encoded problem of one analysis run
#[derive(Debug)]
pub struct Encoding {
    scope: Scope,
    bounds: Bounds,
    interpreter: LeafInterpreter,
    atom_ranges: Vec<Range<usize>>,
    base: BoolValue,
}

impl Encoding {
    /// The universe of atoms
    pub fn universe(&self) -> &Universe {
        self.bounds.universe()
    }

    /// Candidate tuples of every relation
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// The scope the encoding was built for
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Relation matrices and the boolean factory
    pub fn interpreter(&self) -> &LeafInterpreter {
        &self.interpreter
    }

    /// Conjunction of the structural constraints
    pub fn base_constraints(&self) -> BoolValue {
        self.base
    }

    /// Number of primary variables
    pub fn num_primary_variables(&self) -> u32 {
        self.interpreter.num_primary_variables()
    }

    /// Universe indices of the atoms a signature's hierarchy may use
    pub fn atom_range(&self, sig: SigId) -> Range<usize> {
        self.atom_ranges.get(sig.index()).cloned().unwrap_or(0..0)
    }

    /// Decodes a variable assignment into an instance
    ///
    /// `model[i]` is the value of variable `i + 1`; missing entries are false.
    pub fn decode(&self, model: &[bool]) -> Result<Instance> {
        let universe = self.universe().clone();
        let factory = universe.factory();
        let mut instance = Instance::new(universe.clone());

        for (relation, upper) in self.bounds.iter() {
            let mut tuples = TupleSet::empty(universe.clone(), upper.arity());
            if let Some(range) = self.interpreter.variable_ranges().get(&relation) {
                for (tuple, label) in upper.iter().zip(range.clone()) {
                    if model.get(label as usize - 1).copied().unwrap_or(false) {
                        tuples.add(factory.tuple_of_indices(tuple.atom_indices())?)?;
                    }
                }
            }
            instance.add(relation, tuples)?;
        }
        Ok(instance)
    }

    /// The assignment that makes the relations of `instance` hold exactly
    ///
    /// Tuples outside a relation's bounds have no variable and are dropped.
    pub fn assignment(&self, instance: &Instance) -> Vec<bool> {
        let mut model = vec![false; self.num_primary_variables() as usize];
        for (relation, upper) in self.bounds.iter() {
            let (Some(range), Some(tuples)) = (
                self.interpreter.variable_ranges().get(&relation),
                instance.tuples(relation),
            ) else {
                continue;
            };
            for (index, label) in upper.indices().zip(range.clone()) {
                if tuples.contains_index(index) {
                    model[label as usize - 1] = true;
                }
            }
        }
        model
    }
}

/// Builds [`Encoding`]s
pub struct Encoder;

impl Encoder {
    /// Encodes a model for the given scope
    pub fn encode(model: &TypedModel, scope: &Scope, options: &Options) -> Result<Encoding> {
        let sigs = &model.sigs;

        let mut names = Vec::new();
        let mut atom_ranges = vec![0..0; sigs.num_sigs()];
        for top in sigs.top_level() {
            let start = names.len();
            let name = &sigs.sig(top).name;
            names.extend((0..scope.atoms(top)).map(|i| format!("{name}${i}")));
            for sig in sigs.descendants(top) {
                atom_ranges[sig.index()] = start..names.len();
            }
        }
        let universe = Universe::new(&names)?;
        let tuples = universe.factory();

        let mut bounds = Bounds::new(universe.clone());
        for sig in sigs.sig_ids() {
            bounds.bound(RelationId::Sig(sig), tuples.range(atom_ranges[sig.index()].clone())?)?;
        }
        for field in sigs.field_ids() {
            let info = sigs.field(field);
            let mut upper = tuples.range(atom_ranges[info.owner.index()].clone())?;
            for column in &info.columns[1..] {
                let mut candidates = tuples.none(1);
                for atom in column_atoms(column, &atom_ranges) {
                    candidates.add(tuples.tuple_of_indices(&[atom])?)?;
                }
                upper = upper.product(&candidates)?;
            }
            bounds.bound(RelationId::Field(field), upper)?;
        }

        let interpreter = LeafInterpreter::from_bounds(&bounds, &options.bool_options);
        let base = Structure {
            sigs,
            interpreter: &interpreter,
            atom_ranges: &atom_ranges,
            scope,
        }
        .constraints(options.symmetry_breaking)?;

        debug!(
            atoms = universe.size(),
            primary_variables = interpreter.num_primary_variables(),
            gates = interpreter.factory().num_gates(),
            "bounds encoded"
        );

        Ok(Encoding {
            scope: scope.clone(),
            bounds,
            interpreter,
            atom_ranges,
            base,
        })
    }
}

fn column_atoms(column: &ColumnType, atom_ranges: &[Range<usize>]) -> Vec<usize> {
    let mut atoms: Vec<usize> = column
        .sigs()
        .iter()
        .flat_map(|sig| atom_ranges[sig.index()].clone())
        .collect();
    atoms.sort_unstable();
    atoms.dedup();
    atoms
}

struct Structure<'a> {
    sigs: &'a SigTable,
    interpreter: &'a LeafInterpreter,
    atom_ranges: &'a [Range<usize>],
    scope: &'a Scope,
}

impl Structure<'_> {
    fn factory(&self) -> &BooleanFactory {
        self.interpreter.factory()
    }

    fn sig(&self, sig: SigId) -> Result<&BooleanMatrix> {
        self.interpreter.interpret(RelationId::Sig(sig))
    }

    fn field(&self, field: FieldId) -> Result<&BooleanMatrix> {
        self.interpreter.interpret(RelationId::Field(field))
    }

    fn constraints(&self, symmetry_breaking: bool) -> Result<BoolValue> {
        let mut conjuncts = Vec::new();
        for sig in self.sigs.sig_ids() {
            conjuncts.push(self.hierarchy(sig)?);
            conjuncts.push(self.multiplicity(sig)?);
            conjuncts.push(self.scope_count(sig)?);
        }
        for field in self.sigs.field_ids() {
            conjuncts.push(self.typing(field)?);
            conjuncts.push(self.field_multiplicity(field)?);
        }
        if symmetry_breaking {
            for top in self.sigs.top_level() {
                let range = self.atom_ranges[top.index()].clone();
                conjuncts.push(symmetry::prefix_constraints(self.sig(top)?, range, self.factory()));
            }
        }
        Ok(self.factory().and_multi(conjuncts))
    }

    /// Subsets of the parent, disjoint siblings, abstract = union of extensions
    fn hierarchy(&self, sig: SigId) -> Result<BoolValue> {
        let factory = self.factory();
        let info = self.sigs.sig(sig);
        let matrix = self.sig(sig)?;
        let mut conjuncts = Vec::new();

        if let Some(parent) = info.parent {
            conjuncts.push(matrix.subset(self.sig(parent)?, factory));
        }
        for (i, &left) in info.children.iter().enumerate() {
            for &right in &info.children[i + 1..] {
                let shared = self.sig(left)?.intersection(self.sig(right)?, factory);
                conjuncts.push(shared.none(factory));
            }
        }
        if info.is_abstract && !info.children.is_empty() {
            let mut extensions = self.interpreter.none(1);
            for &child in &info.children {
                extensions = extensions.union(self.sig(child)?, factory);
            }
            conjuncts.push(matrix.subset(&extensions, factory));
        }
        Ok(factory.and_multi(conjuncts))
    }

    fn multiplicity(&self, sig: SigId) -> Result<BoolValue> {
        let factory = self.factory();
        let matrix = self.sig(sig)?;
        Ok(match self.sigs.sig(sig).mult {
            Some(SigMult::One) => matrix.one(factory),
            Some(SigMult::Lone) => matrix.lone(factory),
            Some(SigMult::Some) => matrix.some(factory),
            None => BoolValue::TRUE,
        })
    }

    fn scope_count(&self, sig: SigId) -> Result<BoolValue> {
        let Some(bound) = self.scope.bound(sig) else {
            return Ok(BoolValue::TRUE);
        };
        let factory = self.factory();
        let matrix = self.sig(sig)?;
        let limit = bound.count as usize;
        if !bound.exact && limit >= matrix.density() {
            return Ok(BoolValue::TRUE);
        }
        let count = matrix.count(factory, limit + 1);
        let target = Count::constant_within(limit, count.bound());
        Ok(if bound.exact {
            count.eq(&target, factory)
        } else {
            count.lte(&target, factory)
        })
    }

    /// Every atom of a field tuple belongs to its column's signatures
    fn typing(&self, field: FieldId) -> Result<BoolValue> {
        let factory = self.factory();
        let info = self.sigs.field(field);
        let matrix = self.field(field)?;
        let dims = *matrix.dimensions();

        let mut columns = Vec::with_capacity(info.columns.len());
        for column in &info.columns {
            let mut members = self.interpreter.none(1);
            for &sig in column.sigs() {
                members = members.union(self.sig(sig)?, factory);
            }
            columns.push(members);
        }

        let implications = matrix
            .iter()
            .map(|(index, value)| {
                let memberships = dims
                    .atoms_of(index)
                    .into_iter()
                    .zip(&columns)
                    .map(|(atom, members)| members.get(atom))
                    .collect();
                let typed = factory.and_multi(memberships);
                factory.implies(value, typed)
            })
            .collect();
        Ok(factory.and_multi(implications))
    }

    /// `one`/`lone`/`some` bound the image `a.f` of every owner atom `a`
    fn field_multiplicity(&self, field: FieldId) -> Result<BoolValue> {
        let factory = self.factory();
        let info = self.sigs.field(field);
        if info.mult == FieldMult::Set {
            return Ok(BoolValue::TRUE);
        }
        let owner = self.sig(info.owner)?;
        let matrix = self.field(field)?;

        let constraints = self.atom_ranges[info.owner.index()]
            .clone()
            .map(|atom| {
                let image: Vec<BoolValue> = matrix.row(atom).map(|(_, v)| v).collect();
                let holds = match info.mult {
                    FieldMult::One => factory.exactly_one(&image),
                    FieldMult::Lone => factory.at_most_one(&image),
                    FieldMult::Some => factory.or_multi(image),
                    FieldMult::Set => BoolValue::TRUE,
                };
                factory.implies(owner.get(atom), holds)
            })
            .collect();
        Ok(factory.and_multi(constraints))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve;
    use crate::syntax::parse;

    fn encode(source: &str, scope: u32) -> (TypedModel, Encoding) {
        let model = resolve(&parse(source).unwrap()).unwrap();
        let command = model.select_command(None).unwrap();
        let scope = Scope::for_command(&model, &command, Some(scope), DEFAULT_SCOPE);
        let encoding = Encoder::encode(&model, &scope, &Options::default()).unwrap();
        (model, encoding)
    }

    #[test]
    fn atoms_per_top_level_signature() {
        let (model, encoding) = encode("sig A {}\nsig B extends A {}\nsig C {}", 2);
        let universe = encoding.universe();
        assert_eq!(universe.size(), 4);
        assert_eq!(universe.atom(0), Some("A$0"));
        assert_eq!(universe.atom(3), Some("C$1"));

        let b = model.sigs.lookup("B").unwrap();
        assert_eq!(encoding.atom_range(b), 0..2);
        assert_eq!(encoding.num_primary_variables(), 6);
    }

    #[test]
    fn field_candidates_span_column_hierarchies() {
        let (model, encoding) = encode("sig A { r: set B }\nsig B {}", 3);
        let r = model.sigs.field_named("r").unwrap();
        let upper = encoding.bounds().upper_bound(RelationId::Field(r)).unwrap();
        assert_eq!(upper.size(), 9);
        assert_eq!(upper.atom_names()[0], vec!["A$0".to_string(), "B$0".to_string()]);
        assert_eq!(encoding.num_primary_variables(), 3 + 3 + 9);
    }

    #[test]
    fn univ_columns_cover_every_atom() {
        let (model, encoding) = encode("sig A { r: set univ }\nsig B {}", 2);
        let r = model.sigs.field_named("r").unwrap();
        let upper = encoding.bounds().upper_bound(RelationId::Field(r)).unwrap();
        assert_eq!(upper.size(), 2 * 4);
    }

    #[test]
    fn decode_reproduces_an_assignment() {
        let (model, encoding) = encode("sig A { r: set A }", 2);
        let a = RelationId::Sig(model.sigs.lookup("A").unwrap());
        let r = RelationId::Field(model.sigs.field_named("r").unwrap());

        let tuples = encoding.universe().factory();
        let mut instance = Instance::new(encoding.universe().clone());
        instance.add(a, tuples.tuple_set(1, &[&["A$0"], &["A$1"]]).unwrap()).unwrap();
        instance.add(r, tuples.tuple_set(2, &[&["A$0", "A$1"], &["A$1", "A$1"]]).unwrap()).unwrap();

        let model_bits = encoding.assignment(&instance);
        assert_eq!(model_bits, vec![true, true, false, true, false, true]);
        assert_eq!(encoding.decode(&model_bits).unwrap(), instance);
    }

    #[test]
    fn structural_constraints_are_not_trivial() {
        let (_, encoding) = encode("abstract sig A { f: one A }\nsig B, C extends A {}", 2);
        assert!(encoding.base_constraints().is_formula());

        let (_, encoding) = encode("sig A {}", 0);
        assert_eq!(encoding.universe().size(), 0);
        assert_eq!(encoding.base_constraints(), BoolValue::TRUE);
    }
}
