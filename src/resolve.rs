//! Name and type resolution
//!
//! Turns a surface [`Module`] into a [`TypedModel`]: every identifier is bound
//! to a signature, field, variable or predicate; predicate calls are inlined;
//! signature facts become `all this: Sig | ...`; and every expression gets its
//! arity and column types. Resolution either succeeds completely or returns the
//! first `ResolutionError` / `TypeError`.

pub mod symbols;
pub mod types;

pub use symbols::{FieldInfo, SigInfo, SigTable};

use crate::ast::{
    Arena, ColumnType, Decl, ExprId, ExprKind, FieldId, FormulaId, FormulaKind, IntCompareOp, IntExpr,
    Multiplicity, Quantifier, SigId, VarId,
};
use crate::error::{AlloyError, ResolutionError, Result, TypeError};
use crate::syntax::ast::{
    AssertDecl, BinaryOp, CommandDecl, CommandKind, CommandTarget, DeclGroup, Ident, Module, Node, NodeKind,
    Paragraph, Pos, PredDecl, QuantKind, UnaryOp,
};
use crate::CommandSelector;
use rustc_hash::FxHashMap;
use tracing::debug;
use types::Columns;

/// Per-signature bound of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SigScope {
    /// The signature
    pub sig: SigId,
    /// Atom bound
    pub count: u32,
    /// Exact count rather than upper bound
    pub exact: bool,
}

/// Scope clause of a command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandScope {
    /// `for N`
    pub default: Option<u32>,
    /// `but exactly k S, ...`
    pub sigs: Vec<SigScope>,
}

/// A command with its goal formula
#[derive(Debug, Clone)]
pub struct ResolvedCommand {
    /// Predicate or assertion name, or `run$N` / `check$N` for blocks
    pub name: String,
    /// Optional label
    pub label: Option<String>,
    /// `run` or `check`
    pub kind: CommandKind,
    /// Formula to satisfy together with the facts (a negated assertion for `check`)
    pub goal: FormulaId,
    /// Scope clause
    pub scope: CommandScope,
    /// Command source text
    pub text: String,
}

/// A fully resolved, type-checked model
#[derive(Debug)]
pub struct TypedModel {
    /// Signatures and fields
    pub sigs: SigTable,
    /// Expressions and formulas
    pub arena: Arena,
    /// Facts, including desugared signature facts
    pub facts: Vec<FormulaId>,
    /// Commands in source order; never empty
    pub commands: Vec<ResolvedCommand>,
}

impl TypedModel {
    /// Picks a command by index or name; the first command by default
    pub fn select_command(&self, selector: Option<&CommandSelector>) -> Result<ResolvedCommand> {
        let found = match selector {
            None => self.commands.first(),
            Some(CommandSelector::Index(index)) => self.commands.get(*index),
            Some(CommandSelector::Name(name)) => self
                .commands
                .iter()
                .find(|c| &c.name == name || c.label.as_ref() == Some(name)),
        };
        found
            .cloned()
            .ok_or_else(|| AlloyError::InvalidArgument(format!("no command matches {selector:?}")))
    }
}

/// Resolves and type-checks a parsed module
pub fn resolve(module: &Module) -> Result<TypedModel> {
    let sigs = SigTable::build(module)?;
    let mut resolver = Resolver::new(module, sigs)?;
    let facts = resolver.facts()?;
    let commands = resolver.commands()?;
    debug!(
        sigs = resolver.sigs.num_sigs(),
        fields = resolver.sigs.num_fields(),
        facts = facts.len(),
        commands = commands.len(),
        exprs = resolver.arena.num_exprs(),
        formulas = resolver.arena.num_formulas(),
        "model resolved"
    );
    Ok(TypedModel {
        sigs: resolver.sigs,
        arena: resolver.arena,
        facts,
        commands,
    })
}

#[derive(Debug, Clone, Copy)]
enum Resolved {
    Expr(ExprId),
    Formula(FormulaId),
    Int(IntExpr),
}

struct Resolver<'m> {
    module: &'m Module,
    sigs: SigTable,
    arena: Arena,
    preds: FxHashMap<&'m str, &'m PredDecl>,
    asserts: FxHashMap<&'m str, &'m AssertDecl>,
    locals: Vec<(String, Resolved)>,
    this_sig: Option<(SigId, VarId)>,
    calls: Vec<String>,
    universal: ColumnType,
}

fn resolution_error(name: &str, context: impl Into<String>, pos: Pos) -> AlloyError {
    ResolutionError {
        name: name.to_string(),
        context: context.into(),
        line: pos.line,
        column: pos.column,
    }
    .into()
}

impl<'m> Resolver<'m> {
    fn new(module: &'m Module, sigs: SigTable) -> Result<Self> {
        let mut preds = FxHashMap::default();
        let mut asserts = FxHashMap::default();
        let mut names: FxHashMap<&str, Pos> = FxHashMap::default();
        let mut claim = |ident: &'m Ident| match names.insert(ident.name.as_str(), ident.pos) {
            Some(_) => Err(resolution_error(&ident.name, "duplicate paragraph name", ident.pos)),
            None => Ok(()),
        };
        for paragraph in &module.paragraphs {
            match paragraph {
                Paragraph::Fact(fact) => {
                    if let Some(name) = &fact.name {
                        claim(name)?;
                    }
                }
                Paragraph::Pred(pred) => {
                    claim(&pred.name)?;
                    preds.insert(pred.name.name.as_str(), pred);
                }
                Paragraph::Assert(assertion) => {
                    claim(&assertion.name)?;
                    asserts.insert(assertion.name.name.as_str(), assertion);
                }
                Paragraph::Sig(_) | Paragraph::Command(_) => {}
            }
        }
        let universal = ColumnType::from_sigs(sigs.top_level());
        Ok(Self {
            module,
            sigs,
            arena: Arena::new(),
            preds,
            asserts,
            locals: Vec::new(),
            this_sig: None,
            calls: Vec::new(),
            universal,
        })
    }

    // ---- paragraphs ----

    fn facts(&mut self) -> Result<Vec<FormulaId>> {
        let module = self.module;
        let mut facts = Vec::new();
        for paragraph in &module.paragraphs {
            match paragraph {
                Paragraph::Fact(fact) => facts.push(self.formula(&fact.body)?),
                Paragraph::Sig(decl) => {
                    let Some(body) = &decl.fact else { continue };
                    for name in &decl.names {
                        let sig = self
                            .sigs
                            .lookup(&name.name)
                            .ok_or_else(|| resolution_error(&name.name, "unknown signature", name.pos))?;
                        facts.push(self.sig_fact(sig, body)?);
                    }
                }
                _ => {}
            }
        }
        Ok(facts)
    }

    /// `sig S {..} { body }` is `all this: S | body`
    fn sig_fact(&mut self, sig: SigId, body: &Node) -> Result<FormulaId> {
        let var = self.arena.fresh_var("this", ColumnType::of(sig));
        let domain = self.sig_expr(sig);
        self.this_sig = Some((sig, var));
        let body = self.formula(body);
        self.this_sig = None;
        let body = body?;
        Ok(self.arena.mk_formula(FormulaKind::Quantified {
            quantifier: Quantifier::All,
            decls: vec![Decl { var, domain }],
            body,
        }))
    }

    fn commands(&mut self) -> Result<Vec<ResolvedCommand>> {
        let module = self.module;
        let mut commands = Vec::new();
        for paragraph in &module.paragraphs {
            if let Paragraph::Command(cmd) = paragraph {
                let resolved = self.command(cmd, commands.len())?;
                commands.push(resolved);
            }
        }
        if commands.is_empty() {
            let goal = self.arena.constant(true);
            commands.push(ResolvedCommand {
                name: "run$1".to_string(),
                label: None,
                kind: CommandKind::Run,
                goal,
                scope: CommandScope::default(),
                text: "run {}".to_string(),
            });
        }
        Ok(commands)
    }

    fn command(&mut self, cmd: &CommandDecl, index: usize) -> Result<ResolvedCommand> {
        let goal = match (cmd.kind, &cmd.target) {
            (_, CommandTarget::Block(body)) => self.formula(body)?,
            (CommandKind::Run, CommandTarget::Named(name)) => self.run_goal(name)?,
            (CommandKind::Check, CommandTarget::Named(name)) => {
                let assertion = self
                    .asserts
                    .get(name.name.as_str())
                    .copied()
                    .ok_or_else(|| resolution_error(&name.name, "no assertion with this name", name.pos))?;
                self.formula(&assertion.body)?
            }
        };
        let goal = match cmd.kind {
            CommandKind::Run => goal,
            CommandKind::Check => self.arena.not(goal),
        };

        let name = match &cmd.target {
            CommandTarget::Named(name) => name.name.clone(),
            CommandTarget::Block(_) => {
                let word = match cmd.kind {
                    CommandKind::Run => "run",
                    CommandKind::Check => "check",
                };
                format!("{word}${}", index + 1)
            }
        };

        let mut scope = CommandScope {
            default: cmd.default_scope,
            sigs: Vec::new(),
        };
        for ts in &cmd.type_scopes {
            let sig = self
                .sigs
                .lookup(&ts.sig.name)
                .ok_or_else(|| resolution_error(&ts.sig.name, "unknown signature in scope", ts.sig.pos))?;
            scope.sigs.retain(|s| s.sig != sig);
            scope.sigs.push(SigScope {
                sig,
                count: ts.count,
                exact: ts.exact,
            });
        }

        Ok(ResolvedCommand {
            name,
            label: cmd.label.as_ref().map(|l| l.name.clone()),
            kind: cmd.kind,
            goal,
            scope,
            text: cmd.text.clone(),
        })
    }

    /// `run p` for a predicate with parameters searches for some binding
    fn run_goal(&mut self, name: &Ident) -> Result<FormulaId> {
        let pred = self
            .preds
            .get(name.name.as_str())
            .copied()
            .ok_or_else(|| resolution_error(&name.name, "no predicate with this name", name.pos))?;
        self.in_pred_scope(pred, name.pos, |r| {
            if pred.params.is_empty() {
                return r.formula(&pred.body);
            }
            let (decls, guard) = r.bind_decls(&pred.params)?;
            let body = r.formula(&pred.body)?;
            let body = match guard {
                Some(guard) => r.arena.and(vec![guard, body]),
                None => body,
            };
            Ok(r.arena.mk_formula(FormulaKind::Quantified {
                quantifier: Quantifier::Some,
                decls,
                body,
            }))
        })
    }

    // ---- scopes ----

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mark = self.locals.len();
        let result = f(self);
        self.locals.truncate(mark);
        result
    }

    /// Runs `f` with only the predicate's own names visible
    fn in_pred_scope<T>(
        &mut self,
        pred: &'m PredDecl,
        at: Pos,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.calls.iter().any(|c| *c == pred.name.name) {
            return Err(resolution_error(&pred.name.name, "recursive predicate call", at));
        }
        let saved_locals = std::mem::take(&mut self.locals);
        let saved_this = self.this_sig.take();
        self.calls.push(pred.name.name.clone());
        let result = f(self);
        self.calls.pop();
        self.locals = saved_locals;
        self.this_sig = saved_this;
        result
    }

    /// Binds declared variables as locals; returns the declarations and the
    /// `disj` guard, if any
    fn bind_decls(&mut self, groups: &[DeclGroup]) -> Result<(Vec<Decl>, Option<FormulaId>)> {
        let mut decls = Vec::new();
        let mut disjoint = Vec::new();
        for group in groups {
            let domain = self.expr(&group.domain)?;
            let columns = self.columns(domain);
            if columns.len() != 1 {
                return Err(self.type_error(
                    &group.domain,
                    format!("declarations must range over a set, found arity {}", columns.len()),
                ));
            }
            let mut vars = Vec::with_capacity(group.names.len());
            for name in &group.names {
                let var = self.arena.fresh_var(name.name.clone(), columns[0].clone());
                decls.push(Decl { var, domain });
                vars.push(self.var_expr(var));
            }
            for (name, &var) in group.names.iter().zip(&vars) {
                self.locals.push((name.name.clone(), Resolved::Expr(var)));
            }
            if group.disjoint {
                for (i, &x) in vars.iter().enumerate() {
                    for &y in &vars[i + 1..] {
                        let both = self.arena.mk_expr(ExprKind::Intersection(x, y), columns.clone());
                        disjoint.push(self.arena.mk_formula(FormulaKind::Multiplicity(Multiplicity::No, both)));
                    }
                }
            }
        }
        let guard = (!disjoint.is_empty()).then(|| self.arena.and(disjoint));
        Ok((decls, guard))
    }

    // ---- leaves ----

    fn columns(&self, expr: ExprId) -> Columns {
        self.arena.expr(expr).columns().to_vec()
    }

    fn sig_expr(&mut self, sig: SigId) -> ExprId {
        self.arena.mk_expr(ExprKind::Sig(sig), vec![ColumnType::of(sig)])
    }

    fn field_expr(&mut self, field: FieldId) -> ExprId {
        let columns = self.sigs.field(field).columns.clone();
        self.arena.mk_expr(ExprKind::Field(field), columns)
    }

    fn var_expr(&mut self, var: VarId) -> ExprId {
        let column = self.arena.var(var).column.clone();
        self.arena.mk_expr(ExprKind::Var(var), vec![column])
    }

    fn type_error(&self, node: &Node, reason: impl Into<String>) -> AlloyError {
        TypeError {
            expr: self.module.text(node.span).to_string(),
            reason: reason.into(),
            line: node.pos.line,
            column: node.pos.column,
        }
        .into()
    }

    fn expr(&mut self, node: &Node) -> Result<ExprId> {
        match self.resolve_node(node)? {
            Resolved::Expr(e) => Ok(e),
            Resolved::Formula(_) => Err(self.type_error(node, "expected a relational expression, found a formula")),
            Resolved::Int(_) => Err(self.type_error(node, "expected a relational expression, found an integer")),
        }
    }

    fn formula(&mut self, node: &Node) -> Result<FormulaId> {
        match self.resolve_node(node)? {
            Resolved::Formula(f) => Ok(f),
            Resolved::Expr(_) => Err(self.type_error(node, "expected a formula, found a relational expression")),
            Resolved::Int(_) => Err(self.type_error(node, "expected a formula, found an integer")),
        }
    }

    // ---- names ----

    fn local(&self, name: &str) -> Option<Resolved> {
        self.locals.iter().rev().find(|(n, _)| n == name).map(|(_, r)| *r)
    }

    fn this_field(&self, name: &str) -> Option<FieldId> {
        let (sig, _) = self.this_sig?;
        self.sigs
            .visible_fields(sig)
            .into_iter()
            .find(|&f| self.sigs.field(f).name == name)
    }

    /// The predicate a name denotes, unless something nearer shadows it
    fn pred_named(&self, name: &str) -> Option<&'m PredDecl> {
        if self.local(name).is_some()
            || self.this_field(name).is_some()
            || self.sigs.lookup(name).is_some()
            || self.sigs.field_named(name).is_some()
        {
            return None;
        }
        self.preds.get(name).copied()
    }

    fn name(&mut self, name: &str, node: &Node) -> Result<Resolved> {
        if let Some(local) = self.local(name) {
            return Ok(local);
        }
        if let (Some(field), Some((_, this))) = (self.this_field(name), self.this_sig) {
            let this = self.var_expr(this);
            let field = self.field_expr(field);
            let columns = types::join(&self.sigs, &self.columns(this), &self.columns(field))
                .map_err(|reason| self.type_error(node, reason))?;
            return Ok(Resolved::Expr(self.arena.mk_expr(ExprKind::Join(this, field), columns)));
        }
        if let Some(sig) = self.sigs.lookup(name) {
            return Ok(Resolved::Expr(self.sig_expr(sig)));
        }
        if let Some(field) = self.sigs.field_named(name) {
            return Ok(Resolved::Expr(self.field_expr(field)));
        }
        if let Some(pred) = self.preds.get(name).copied() {
            return self.call(pred, &[], node).map(Resolved::Formula);
        }
        Err(resolution_error(
            name,
            "no signature, field, predicate or variable with this name",
            node.pos,
        ))
    }

    /// Inlines a predicate call; arguments are resolved in the caller's scope
    fn call(&mut self, pred: &'m PredDecl, args: &[Node], node: &Node) -> Result<FormulaId> {
        let expected: usize = pred.params.iter().map(|g| g.names.len()).sum();
        if args.len() != expected {
            return Err(self.type_error(
                node,
                format!("`{}` expects {expected} arguments, found {}", pred.name.name, args.len()),
            ));
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.expr(arg)?);
        }

        self.in_pred_scope(pred, node.pos, |r| {
            let mut values = values.into_iter();
            for group in &pred.params {
                let domain = r.expr(&group.domain)?;
                let arity = r.arena.expr(domain).arity();
                for (name, value) in group.names.iter().zip(&mut values) {
                    let found = r.arena.expr(value).arity();
                    if found != arity {
                        return Err(r.type_error(
                            node,
                            format!("argument `{}` has arity {found}, expected {arity}", name.name),
                        ));
                    }
                    r.locals.push((name.name.clone(), Resolved::Expr(value)));
                }
            }
            r.formula(&pred.body)
        })
    }

    // ---- nodes ----

    fn resolve_node(&mut self, node: &Node) -> Result<Resolved> {
        match &node.kind {
            NodeKind::Name(name) => self.name(name, node),
            NodeKind::RawField(name) => match self.sigs.field_named(name) {
                Some(field) => Ok(Resolved::Expr(self.field_expr(field))),
                None => Err(resolution_error(name, "no field with this name", node.pos)),
            },
            NodeKind::This => match self.this_sig {
                Some((_, var)) => Ok(Resolved::Expr(self.var_expr(var))),
                None => Err(resolution_error("this", "`this` outside a signature fact", node.pos)),
            },
            NodeKind::Univ => {
                let columns = vec![self.universal.clone()];
                Ok(Resolved::Expr(self.arena.mk_expr(ExprKind::Univ, columns)))
            }
            NodeKind::None => Ok(Resolved::Expr(
                self.arena.mk_expr(ExprKind::None(1), vec![ColumnType::default()]),
            )),
            NodeKind::Iden => {
                let columns = vec![self.universal.clone(), self.universal.clone()];
                Ok(Resolved::Expr(self.arena.mk_expr(ExprKind::Iden, columns)))
            }
            NodeKind::Int(n) => Ok(Resolved::Int(IntExpr::Constant(*n as usize))),
            NodeKind::Unary(op, inner) => self.unary(*op, inner, node),
            NodeKind::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs, node),
            NodeKind::IfElse(cond, then, otherwise) => {
                let cond = self.formula(cond)?;
                match (self.resolve_node(then)?, self.resolve_node(otherwise)?) {
                    (Resolved::Formula(a), Resolved::Formula(b)) => Ok(Resolved::Formula(
                        self.arena.mk_formula(FormulaKind::IfThenElse(cond, a, b)),
                    )),
                    (Resolved::Expr(a), Resolved::Expr(b)) => {
                        let columns = types::union("else", &self.columns(a), &self.columns(b))
                            .map_err(|reason| self.type_error(node, reason))?;
                        Ok(Resolved::Expr(self.arena.mk_expr(ExprKind::IfThenElse(cond, a, b), columns)))
                    }
                    _ => Err(self.type_error(
                        node,
                        "branches must both be formulas or both be relational expressions",
                    )),
                }
            }
            NodeKind::BoxJoin(target, args) => self.box_join(target, args, node),
            NodeKind::Quant(kind, groups, body) => self.quantified(*kind, groups, body),
            NodeKind::Comprehension(groups, body) => self.scoped(|r| {
                let (decls, guard) = r.bind_decls(groups)?;
                let body = r.formula(body)?;
                let body = match guard {
                    Some(guard) => r.arena.and(vec![guard, body]),
                    None => body,
                };
                let columns = decls.iter().map(|d| r.arena.var(d.var).column.clone()).collect();
                Ok(Resolved::Expr(r.arena.mk_expr(ExprKind::Comprehension(decls, body), columns)))
            }),
            NodeKind::Let(bindings, body) => self.scoped(|r| {
                for (name, value) in bindings {
                    let value = r.resolve_node(value)?;
                    r.locals.push((name.name.clone(), value));
                }
                r.resolve_node(body)
            }),
            NodeKind::Block(items) => {
                let mut conjuncts = Vec::with_capacity(items.len());
                for item in items {
                    conjuncts.push(self.formula(item)?);
                }
                Ok(Resolved::Formula(self.arena.and(conjuncts)))
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, inner: &Node, node: &Node) -> Result<Resolved> {
        let multiplicity = match op {
            UnaryOp::Not => {
                let f = self.formula(inner)?;
                return Ok(Resolved::Formula(self.arena.not(f)));
            }
            UnaryOp::Cardinality => {
                let e = self.expr(inner)?;
                return Ok(Resolved::Int(IntExpr::Cardinality(e)));
            }
            UnaryOp::Transpose | UnaryOp::Closure | UnaryOp::ReflexiveClosure => {
                let e = self.expr(inner)?;
                let (symbol, kind): (&str, fn(ExprId) -> ExprKind) = match op {
                    UnaryOp::Transpose => ("~", ExprKind::Transpose),
                    UnaryOp::Closure => ("^", ExprKind::Closure),
                    _ => ("*", ExprKind::ReflexiveClosure),
                };
                let columns =
                    types::binary_relation(symbol, &self.columns(e)).map_err(|reason| self.type_error(node, reason))?;
                return Ok(Resolved::Expr(self.arena.mk_expr(kind(e), columns)));
            }
            UnaryOp::Some => Multiplicity::Some,
            UnaryOp::No => Multiplicity::No,
            UnaryOp::One => Multiplicity::One,
            UnaryOp::Lone => Multiplicity::Lone,
        };
        let e = self.expr(inner)?;
        Ok(Resolved::Formula(
            self.arena.mk_formula(FormulaKind::Multiplicity(multiplicity, e)),
        ))
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Node, rhs: &Node, node: &Node) -> Result<Resolved> {
        match op {
            BinaryOp::Or | BinaryOp::And | BinaryOp::Iff | BinaryOp::Implies => {
                let a = self.formula(lhs)?;
                let b = self.formula(rhs)?;
                let f = match op {
                    BinaryOp::Or => self.arena.or(vec![a, b]),
                    BinaryOp::And => self.arena.and(vec![a, b]),
                    BinaryOp::Iff => self.arena.mk_formula(FormulaKind::Iff(a, b)),
                    _ => self.arena.mk_formula(FormulaKind::Implies(a, b)),
                };
                Ok(Resolved::Formula(f))
            }
            BinaryOp::In | BinaryOp::Eq | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Lte | BinaryOp::Gte => {
                self.comparison(op, lhs, rhs, node)
            }
            BinaryOp::Join => {
                let a = self.expr(lhs)?;
                let b = self.expr(rhs)?;
                self.set_op(a, b, node, types::join, ExprKind::Join)
            }
            BinaryOp::Union => self.set_op_nodes(lhs, rhs, node, |_, a, b| types::union("+", a, b), ExprKind::Union),
            BinaryOp::Override => {
                self.set_op_nodes(lhs, rhs, node, |_, a, b| types::union("++", a, b), ExprKind::Override)
            }
            BinaryOp::Intersection => self.set_op_nodes(
                lhs,
                rhs,
                node,
                |_, a, b| types::restrict_left("&", a, b),
                ExprKind::Intersection,
            ),
            BinaryOp::Difference => self.set_op_nodes(
                lhs,
                rhs,
                node,
                |_, a, b| types::restrict_left("-", a, b),
                ExprKind::Difference,
            ),
            BinaryOp::Product => {
                self.set_op_nodes(lhs, rhs, node, |_, a, b| Ok(types::product(a, b)), ExprKind::Product)
            }
            BinaryOp::DomainRestrict => self.set_op_nodes(
                lhs,
                rhs,
                node,
                |_, a, b| types::domain_restrict(a, b),
                ExprKind::DomainRestrict,
            ),
            BinaryOp::RangeRestrict => self.set_op_nodes(
                lhs,
                rhs,
                node,
                |_, a, b| types::range_restrict(a, b),
                ExprKind::RangeRestrict,
            ),
        }
    }

    fn set_op_nodes(
        &mut self,
        lhs: &Node,
        rhs: &Node,
        node: &Node,
        rule: impl FnOnce(&SigTable, &[ColumnType], &[ColumnType]) -> std::result::Result<Columns, String>,
        kind: fn(ExprId, ExprId) -> ExprKind,
    ) -> Result<Resolved> {
        let a = self.expr(lhs)?;
        let b = self.expr(rhs)?;
        self.set_op(a, b, node, rule, kind)
    }

    fn set_op(
        &mut self,
        a: ExprId,
        b: ExprId,
        node: &Node,
        rule: impl FnOnce(&SigTable, &[ColumnType], &[ColumnType]) -> std::result::Result<Columns, String>,
        kind: fn(ExprId, ExprId) -> ExprKind,
    ) -> Result<Resolved> {
        let columns = rule(&self.sigs, &self.columns(a), &self.columns(b)).map_err(|reason| self.type_error(node, reason))?;
        Ok(Resolved::Expr(self.arena.mk_expr(kind(a, b), columns)))
    }

    fn comparison(&mut self, op: BinaryOp, lhs: &Node, rhs: &Node, node: &Node) -> Result<Resolved> {
        let a = self.resolve_node(lhs)?;
        let b = self.resolve_node(rhs)?;
        if matches!(a, Resolved::Formula(_)) {
            return Err(self.type_error(lhs, "expected an expression, found a formula"));
        }
        if matches!(b, Resolved::Formula(_)) {
            return Err(self.type_error(rhs, "expected an expression, found a formula"));
        }

        let formula = match (op, a, b) {
            (BinaryOp::In, Resolved::Expr(x), Resolved::Expr(y)) => {
                types::comparable("in", &self.columns(x), &self.columns(y))
                    .map_err(|reason| self.type_error(node, reason))?;
                FormulaKind::Subset(x, y)
            }
            (BinaryOp::In, _, _) => return Err(self.type_error(node, "`in` applied to integers")),
            (BinaryOp::Eq, Resolved::Expr(x), Resolved::Expr(y)) => {
                types::comparable("=", &self.columns(x), &self.columns(y))
                    .map_err(|reason| self.type_error(node, reason))?;
                FormulaKind::Equal(x, y)
            }
            (_, Resolved::Int(x), Resolved::Int(y)) => {
                let cmp = match op {
                    BinaryOp::Eq => IntCompareOp::Eq,
                    BinaryOp::Lt => IntCompareOp::Lt,
                    BinaryOp::Gt => IntCompareOp::Gt,
                    BinaryOp::Lte => IntCompareOp::Lte,
                    _ => IntCompareOp::Gte,
                };
                FormulaKind::IntComparison(x, cmp, y)
            }
            (BinaryOp::Eq, _, _) => return Err(self.type_error(node, "`=` between a set and an integer")),
            _ => return Err(self.type_error(node, "cardinality comparison applied to sets")),
        };
        Ok(Resolved::Formula(self.arena.mk_formula(formula)))
    }

    /// `e[a, b]` is `b.(a.e)`, unless `e` names a predicate
    fn box_join(&mut self, target: &Node, args: &[Node], node: &Node) -> Result<Resolved> {
        if let NodeKind::Name(name) = &target.kind {
            if let Some(pred) = self.pred_named(name) {
                return self.call(pred, args, node).map(Resolved::Formula);
            }
        }
        if args.is_empty() {
            return Err(self.type_error(node, "box join needs at least one argument"));
        }

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.expr(arg)?);
        }
        let mut result = self.expr(target)?;
        for value in values {
            let columns = types::join(&self.sigs, &self.columns(value), &self.columns(result))
                .map_err(|reason| self.type_error(node, reason))?;
            result = self.arena.mk_expr(ExprKind::Join(value, result), columns);
        }
        Ok(Resolved::Expr(result))
    }

    fn quantified(&mut self, kind: QuantKind, groups: &[DeclGroup], body: &Node) -> Result<Resolved> {
        let quantifier = match kind {
            QuantKind::All => Quantifier::All,
            QuantKind::Some => Quantifier::Some,
            QuantKind::No => Quantifier::No,
            QuantKind::One => Quantifier::One,
            QuantKind::Lone => Quantifier::Lone,
        };
        self.scoped(|r| {
            let (decls, guard) = r.bind_decls(groups)?;
            let body = r.formula(body)?;
            let body = match (guard, quantifier) {
                (None, _) => body,
                (Some(guard), Quantifier::All) => r.arena.mk_formula(FormulaKind::Implies(guard, body)),
                (Some(guard), _) => r.arena.and(vec![guard, body]),
            };
            Ok(Resolved::Formula(r.arena.mk_formula(FormulaKind::Quantified {
                quantifier,
                decls,
                body,
            })))
        })
    }
}
