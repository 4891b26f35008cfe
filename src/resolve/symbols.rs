//! Signature and field symbol tables

use crate::ast::{ColumnType, FieldId, SigId};
use crate::error::ResolutionError;
use crate::syntax::ast::{FieldMult, Ident, Module, Paragraph, Pos, SigMult};
use rustc_hash::FxHashMap;

/// A declared signature
#[derive(Debug, Clone)]
pub struct SigInfo {
    /// Name
    pub name: String,
    /// Parent signature, `None` for top-level signatures
    pub parent: Option<SigId>,
    /// `abstract`
    pub is_abstract: bool,
    /// `one` / `lone` / `some`
    pub mult: Option<SigMult>,
    /// Fields declared by this signature, in declaration order
    pub fields: Vec<FieldId>,
    /// Direct extensions, in declaration order
    pub children: Vec<SigId>,
    /// Declaration site
    pub pos: Pos,
}

/// A declared field
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Name
    pub name: String,
    /// Declaring signature
    pub owner: SigId,
    /// Column types, the owner's column first
    pub columns: Vec<ColumnType>,
    /// Multiplicity of the target for each owner atom
    pub mult: FieldMult,
    /// Declaration site
    pub pos: Pos,
}

impl FieldInfo {
    /// Arity of the field relation
    pub fn arity(&self) -> usize {
        self.columns.len()
    }
}

/// Signatures and fields of a model, indexed by [`SigId`] and [`FieldId`]
#[derive(Debug, Clone, Default)]
pub struct SigTable {
    sigs: Vec<SigInfo>,
    fields: Vec<FieldInfo>,
    by_name: FxHashMap<String, SigId>,
    fields_by_name: FxHashMap<String, FieldId>,
}

impl SigTable {
    /// Builds the table from the `sig` paragraphs of a module
    pub fn build(module: &Module) -> Result<Self, ResolutionError> {
        let mut table = SigTable::default();
        let decls: Vec<_> = module
            .paragraphs
            .iter()
            .filter_map(|p| match p {
                Paragraph::Sig(decl) => Some(decl),
                _ => None,
            })
            .collect();

        // Names first, so parents and field columns may refer forward.
        for decl in &decls {
            for name in &decl.names {
                if table.by_name.contains_key(&name.name) || name.name == "univ" {
                    return Err(resolution_error(name, "duplicate signature declaration"));
                }
                let id = SigId(table.sigs.len() as u32);
                table.by_name.insert(name.name.clone(), id);
                table.sigs.push(SigInfo {
                    name: name.name.clone(),
                    parent: None,
                    is_abstract: decl.is_abstract,
                    mult: decl.mult,
                    fields: Vec::new(),
                    children: Vec::new(),
                    pos: name.pos,
                });
            }
        }

        for decl in &decls {
            let Some(parent) = &decl.parent else { continue };
            let parent_id = table
                .lookup(&parent.name)
                .ok_or_else(|| resolution_error(parent, "unknown parent signature"))?;
            for name in &decl.names {
                let id = table.by_name[&name.name];
                table.sigs[id.index()].parent = Some(parent_id);
                table.sigs[parent_id.index()].children.push(id);
            }
        }
        table.check_acyclic()?;

        let universal = ColumnType::from_sigs(table.top_level());
        for decl in &decls {
            for sig_name in &decl.names {
                let owner = table.by_name[&sig_name.name];
                for field in &decl.fields {
                    let mut columns = vec![ColumnType::of(owner)];
                    for column in &field.columns {
                        if column.name == "univ" {
                            columns.push(universal.clone());
                        } else {
                            let sig = table
                                .lookup(&column.name)
                                .ok_or_else(|| resolution_error(column, "unknown signature in field type"))?;
                            columns.push(ColumnType::of(sig));
                        }
                    }
                    // Alloy's default: `one` for a single target column
                    let mult = field.mult.unwrap_or(if field.columns.len() == 1 {
                        FieldMult::One
                    } else {
                        FieldMult::Set
                    });
                    for name in &field.names {
                        table.add_field(owner, name, columns.clone(), mult)?;
                    }
                }
            }
        }
        Ok(table)
    }

    fn add_field(
        &mut self,
        owner: SigId,
        name: &Ident,
        columns: Vec<ColumnType>,
        mult: FieldMult,
    ) -> Result<(), ResolutionError> {
        // field names are global so a bare `.f` always denotes one relation
        if let Some(&other) = self.fields_by_name.get(&name.name) {
            let other_owner = self.fields[other.index()].owner;
            return Err(resolution_error(
                name,
                &format!("field already declared in `{}`", self.sig(other_owner).name),
            ));
        }
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(FieldInfo {
            name: name.name.clone(),
            owner,
            columns,
            mult,
            pos: name.pos,
        });
        self.sigs[owner.index()].fields.push(id);
        self.fields_by_name.insert(name.name.clone(), id);
        Ok(())
    }

    fn check_acyclic(&self) -> Result<(), ResolutionError> {
        for (index, info) in self.sigs.iter().enumerate() {
            let mut current = info.parent;
            let mut steps = 0;
            while let Some(parent) = current {
                steps += 1;
                if parent.index() == index || steps > self.sigs.len() {
                    return Err(ResolutionError {
                        name: info.name.clone(),
                        context: "cyclic inheritance".to_string(),
                        line: info.pos.line,
                        column: info.pos.column,
                    });
                }
                current = self.sigs[parent.index()].parent;
            }
        }
        Ok(())
    }

    /// Number of signatures
    pub fn num_sigs(&self) -> usize {
        self.sigs.len()
    }

    /// Number of fields
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Looks up a signature by name
    pub fn lookup(&self, name: &str) -> Option<SigId> {
        self.by_name.get(name).copied()
    }

    /// Looks up a field by name
    pub fn field_named(&self, name: &str) -> Option<FieldId> {
        self.fields_by_name.get(name).copied()
    }

    /// Signature info
    pub fn sig(&self, id: SigId) -> &SigInfo {
        &self.sigs[id.index()]
    }

    /// Field info
    pub fn field(&self, id: FieldId) -> &FieldInfo {
        &self.fields[id.index()]
    }

    /// All signature ids in declaration order
    pub fn sig_ids(&self) -> impl Iterator<Item = SigId> + '_ {
        (0..self.sigs.len() as u32).map(SigId)
    }

    /// All field ids in declaration order
    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        (0..self.fields.len() as u32).map(FieldId)
    }

    /// Top-level signatures in declaration order
    pub fn top_level(&self) -> Vec<SigId> {
        self.sig_ids().filter(|&id| self.sig(id).parent.is_none()).collect()
    }

    /// The top-level ancestor of a signature (itself if top-level)
    pub fn top_of(&self, mut id: SigId) -> SigId {
        while let Some(parent) = self.sig(id).parent {
            id = parent;
        }
        id
    }

    /// True if `sub` is `sup` or one of its descendants
    pub fn is_subsig(&self, sub: SigId, sup: SigId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == sup {
                return true;
            }
            current = self.sig(id).parent;
        }
        false
    }

    /// `id` and all its descendants, pre-order
    pub fn descendants(&self, id: SigId) -> Vec<SigId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.sig(current).children.iter().rev());
        }
        out
    }

    /// Fields a signature owns or inherits, nearest declaration first
    pub fn visible_fields(&self, id: SigId) -> Vec<FieldId> {
        let mut out = Vec::new();
        let mut current = Some(id);
        while let Some(sig) = current {
            out.extend(&self.sig(sig).fields);
            current = self.sig(sig).parent;
        }
        out
    }

    /// True if atoms of the two column types may coincide
    pub fn overlaps(&self, a: &ColumnType, b: &ColumnType) -> bool {
        if a.is_unconstrained() || b.is_unconstrained() {
            return true;
        }
        a.sigs()
            .iter()
            .any(|&x| b.sigs().iter().any(|&y| self.is_subsig(x, y) || self.is_subsig(y, x)))
    }
}

fn resolution_error(ident: &Ident, context: &str) -> ResolutionError {
    ResolutionError {
        name: ident.name.clone(),
        context: context.to_string(),
        line: ident.pos.line,
        column: ident.pos.column,
    }
}
