//! Typed relational AST
//!
//! Resolved expressions and formulas live in an [`Arena`] and are referred to
//! by `ExprId` / `FormulaId`. The arena hash-conses every node, so two
//! structurally equal subterms always get the same id; the translator keys its
//! memo tables on those ids.

pub mod formula;
pub mod int_expr;

pub use formula::{Formula, FormulaKind, Multiplicity, Quantifier};
pub use int_expr::{IntCompareOp, IntExpr};

use rustc_hash::FxHashMap;
use std::fmt;

/// Index of a signature in the symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SigId(pub u32);

/// Index of a field in the symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

/// A bound variable (quantifier, comprehension or predicate parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// Handle to an expression in an [`Arena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

/// Handle to a formula in an [`Arena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormulaId(u32);

/// A relation that gets boolean variables during encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationId {
    /// The atom set of a signature
    Sig(SigId),
    /// A field relation
    Field(FieldId),
}

impl SigId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl FieldId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The signatures whose atoms may appear in one column of an expression
///
/// An empty column type carries no information (it is the type of `none`)
/// and is compatible with every other column type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ColumnType(Vec<SigId>);

impl ColumnType {
    /// Column type of a single signature
    pub fn of(sig: SigId) -> Self {
        Self(vec![sig])
    }

    /// Column type of several signatures
    pub fn from_sigs(sigs: impl IntoIterator<Item = SigId>) -> Self {
        let mut sigs: Vec<SigId> = sigs.into_iter().collect();
        sigs.sort();
        sigs.dedup();
        Self(sigs)
    }

    /// The signatures of this column
    pub fn sigs(&self) -> &[SigId] {
        &self.0
    }

    /// True for the type of `none`
    pub fn is_unconstrained(&self) -> bool {
        self.0.is_empty()
    }

    /// Union of two column types
    pub fn union(&self, other: &ColumnType) -> ColumnType {
        ColumnType::from_sigs(self.0.iter().chain(other.0.iter()).copied())
    }
}

/// A quantifier or comprehension declaration `var: domain`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decl {
    /// The bound variable
    pub var: VarId,
    /// A unary expression the variable ranges over
    pub domain: ExprId,
}

/// Relational expression kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// Atom set of a signature
    Sig(SigId),
    /// Field relation
    Field(FieldId),
    /// Bound variable
    Var(VarId),
    /// All atoms
    Univ,
    /// Identity over all atoms
    Iden,
    /// Empty relation of the given arity
    None(usize),
    /// `a + b`
    Union(ExprId, ExprId),
    /// `a & b`
    Intersection(ExprId, ExprId),
    /// `a - b`
    Difference(ExprId, ExprId),
    /// `a ++ b`
    Override(ExprId, ExprId),
    /// `a . b`
    Join(ExprId, ExprId),
    /// `a -> b`
    Product(ExprId, ExprId),
    /// `s <: r`
    DomainRestrict(ExprId, ExprId),
    /// `r :> s`
    RangeRestrict(ExprId, ExprId),
    /// `~r`
    Transpose(ExprId),
    /// `^r`
    Closure(ExprId),
    /// `*r`
    ReflexiveClosure(ExprId),
    /// `{x: A, y: B | f}`
    Comprehension(Vec<Decl>, FormulaId),
    /// `f => a else b`
    IfThenElse(FormulaId, ExprId, ExprId),
}

/// A typed relational expression
#[derive(Debug, Clone)]
pub struct Expr {
    kind: ExprKind,
    columns: Vec<ColumnType>,
    free: Vec<VarId>,
}

impl Expr {
    /// The expression kind
    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    /// Number of columns
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Per-column types
    pub fn columns(&self) -> &[ColumnType] {
        &self.columns
    }

    /// Free variables, sorted
    pub fn free_vars(&self) -> &[VarId] {
        &self.free
    }
}

/// A bound variable's name and type
#[derive(Debug, Clone)]
pub struct VarInfo {
    /// Source name
    pub name: String,
    /// Type of the (unary) variable
    pub column: ColumnType,
}

/// Hash-consing store of expressions, formulas and variables
#[derive(Default)]
pub struct Arena {
    exprs: Vec<Expr>,
    expr_ids: FxHashMap<ExprKind, ExprId>,
    formulas: Vec<Formula>,
    formula_ids: FxHashMap<FormulaKind, FormulaId>,
    vars: Vec<VarInfo>,
}

impl Arena {
    /// Creates an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct expressions
    pub fn num_exprs(&self) -> usize {
        self.exprs.len()
    }

    /// Number of distinct formulas
    pub fn num_formulas(&self) -> usize {
        self.formulas.len()
    }

    /// Creates a fresh variable
    pub fn fresh_var(&mut self, name: impl Into<String>, column: ColumnType) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(VarInfo {
            name: name.into(),
            column,
        });
        id
    }

    /// Looks up a variable
    pub fn var(&self, id: VarId) -> &VarInfo {
        &self.vars[id.0 as usize]
    }

    /// Looks up an expression
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0 as usize]
    }

    /// Looks up a formula
    pub fn formula(&self, id: FormulaId) -> &Formula {
        &self.formulas[id.0 as usize]
    }

    /// Interns an expression with the given column types
    ///
    /// Column types are a function of the kind, so an already interned kind
    /// keeps its original columns.
    pub fn mk_expr(&mut self, kind: ExprKind, columns: Vec<ColumnType>) -> ExprId {
        if let Some(&id) = self.expr_ids.get(&kind) {
            return id;
        }
        let free = self.expr_free_vars(&kind);
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(Expr {
            kind: kind.clone(),
            columns,
            free,
        });
        self.expr_ids.insert(kind, id);
        id
    }

    /// Interns a formula
    pub fn mk_formula(&mut self, kind: FormulaKind) -> FormulaId {
        if let Some(&id) = self.formula_ids.get(&kind) {
            return id;
        }
        let free = self.formula_free_vars(&kind);
        let id = FormulaId(self.formulas.len() as u32);
        self.formulas.push(Formula::new(kind.clone(), free));
        self.formula_ids.insert(kind, id);
        id
    }

    /// The constant formula
    pub fn constant(&mut self, value: bool) -> FormulaId {
        self.mk_formula(FormulaKind::Constant(value))
    }

    /// Negation
    pub fn not(&mut self, f: FormulaId) -> FormulaId {
        self.mk_formula(FormulaKind::Not(f))
    }

    /// Conjunction; a single conjunct is returned as is
    pub fn and(&mut self, mut conjuncts: Vec<FormulaId>) -> FormulaId {
        match conjuncts.len() {
            0 => self.constant(true),
            1 => conjuncts.remove(0),
            _ => self.mk_formula(FormulaKind::And(conjuncts)),
        }
    }

    /// Disjunction; a single disjunct is returned as is
    pub fn or(&mut self, mut disjuncts: Vec<FormulaId>) -> FormulaId {
        match disjuncts.len() {
            0 => self.constant(false),
            1 => disjuncts.remove(0),
            _ => self.mk_formula(FormulaKind::Or(disjuncts)),
        }
    }

    fn expr_free_vars(&self, kind: &ExprKind) -> Vec<VarId> {
        let mut free = match kind {
            ExprKind::Var(v) => vec![*v],
            ExprKind::Sig(_) | ExprKind::Field(_) | ExprKind::Univ | ExprKind::Iden | ExprKind::None(_) => {
                Vec::new()
            }
            ExprKind::Union(a, b)
            | ExprKind::Intersection(a, b)
            | ExprKind::Difference(a, b)
            | ExprKind::Override(a, b)
            | ExprKind::Join(a, b)
            | ExprKind::Product(a, b)
            | ExprKind::DomainRestrict(a, b)
            | ExprKind::RangeRestrict(a, b) => merge(self.expr(*a).free_vars(), self.expr(*b).free_vars()),
            ExprKind::Transpose(e) | ExprKind::Closure(e) | ExprKind::ReflexiveClosure(e) => {
                self.expr(*e).free_vars().to_vec()
            }
            ExprKind::Comprehension(decls, body) => self.binder_free_vars(decls, self.formula(*body).free_vars()),
            ExprKind::IfThenElse(c, a, b) => {
                let branches = merge(self.expr(*a).free_vars(), self.expr(*b).free_vars());
                merge(self.formula(*c).free_vars(), &branches)
            }
        };
        free.dedup();
        free
    }

    fn formula_free_vars(&self, kind: &FormulaKind) -> Vec<VarId> {
        match kind {
            FormulaKind::Constant(_) => Vec::new(),
            FormulaKind::Not(f) => self.formula(*f).free_vars().to_vec(),
            FormulaKind::And(fs) | FormulaKind::Or(fs) => fs
                .iter()
                .fold(Vec::new(), |acc, f| merge(&acc, self.formula(*f).free_vars())),
            FormulaKind::Implies(a, b) | FormulaKind::Iff(a, b) => {
                merge(self.formula(*a).free_vars(), self.formula(*b).free_vars())
            }
            FormulaKind::IfThenElse(c, a, b) => {
                let branches = merge(self.formula(*a).free_vars(), self.formula(*b).free_vars());
                merge(self.formula(*c).free_vars(), &branches)
            }
            FormulaKind::Subset(a, b) | FormulaKind::Equal(a, b) => {
                merge(self.expr(*a).free_vars(), self.expr(*b).free_vars())
            }
            FormulaKind::Multiplicity(_, e) => self.expr(*e).free_vars().to_vec(),
            FormulaKind::Quantified { decls, body, .. } => {
                self.binder_free_vars(decls, self.formula(*body).free_vars())
            }
            FormulaKind::IntComparison(left, _, right) => {
                merge(&self.int_free_vars(left), &self.int_free_vars(right))
            }
        }
    }

    fn int_free_vars(&self, int: &IntExpr) -> Vec<VarId> {
        match int {
            IntExpr::Constant(_) => Vec::new(),
            IntExpr::Cardinality(e) => self.expr(*e).free_vars().to_vec(),
        }
    }

    // Domains may mention earlier declarations of the same binder.
    fn binder_free_vars(&self, decls: &[Decl], body: &[VarId]) -> Vec<VarId> {
        let mut free = body.to_vec();
        for decl in decls {
            free = merge(&free, self.expr(decl.domain).free_vars());
        }
        free.retain(|v| !decls.iter().any(|d| d.var == *v));
        free
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("exprs", &self.exprs.len())
            .field("formulas", &self.formulas.len())
            .field("vars", &self.vars.len())
            .finish()
    }
}

fn merge(a: &[VarId], b: &[VarId]) -> Vec<VarId> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(a);
    out.extend_from_slice(b);
    out.sort();
    out.dedup();
    out
}
