//! The write-once registry of union definitions.
//!
//! The registry acts as a small database of definitions, divided into a
//! `unions` table and a flat `kinds` table, each indexed by a `Copy`
//! newtype ID. IDs are handed out by [`Registry::define`] and are valid by
//! construction; no API removes or rewrites a committed definition, so once
//! a process has finished defining its unions a shared `&Registry` can be
//! read from any number of threads without synchronization.
//!
//! Definition is atomic: every check runs against staged tables, and a
//! failed [`define_all`] leaves the registry exactly as it was.
//!
//! [`define_all`]: Registry::define_all

use std::collections::HashMap;

use ecow::EcoString;
use petgraph::graph::DiGraph;
use thiserror::Error;

use crate::{
    symbol::{NameTable, Symbol},
    union::{KindDecl, RawTy, RawValue, TyDecl, UnionDecl},
};

/// An index into the `unions` table of a [`Registry`].
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub struct UnionId(usize);

/// An index into the `kinds` table of a [`Registry`].
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub struct KindId(usize);

/// An entry in the `unions` table.
#[derive(Debug)]
pub struct UnionDef {
    name: Symbol,
    /// The kinds of this union, in declaration order.
    kinds: Box<[KindId]>,
    kind_names: HashMap<Symbol, KindId>,
    raw_ty: Option<RawTy>,
}

impl UnionDef {
    pub fn kinds(&self) -> &[KindId] {
        self.kinds.as_ref()
    }

    pub fn raw_ty(&self) -> Option<RawTy> {
        self.raw_ty
    }
}

/// An entry in the `kinds` table.
#[derive(Debug)]
pub struct KindDef {
    name: Symbol,
    union: UnionId,
    /// The position of this kind within its union's declaration order.
    ordinal: u32,
    fields: Box<[FieldDef]>,
    raw: Option<RawValue>,
}

impl KindDef {
    pub fn union(&self) -> UnionId {
        self.union
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn fields(&self) -> &[FieldDef] {
        self.fields.as_ref()
    }

    pub fn raw(&self) -> Option<&RawValue> {
        self.raw.as_ref()
    }

    pub fn is_unit(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A resolved payload field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    name: Symbol,
    ty: FieldTy,
}

impl FieldDef {
    pub fn ty(&self) -> FieldTy {
        self.ty
    }
}

/// The resolved type of a payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTy {
    Int,
    Float,
    Text,
    Bool,
    Union(UnionId),
}

/// An error produced while defining a batch of unions.
///
/// Each of these is detected once, at definition time, and aborts the
/// entire batch.
#[derive(Debug, Clone, Error)]
pub enum DefineError {
    #[error("a union named `{0}` is already defined")]
    DuplicateUnion(EcoString),
    #[error("union `{union}` declares two kinds named `{kind}`")]
    DuplicateKind { union: EcoString, kind: EcoString },
    #[error("kind `{union}::{kind}` declares two fields named `{field}`")]
    DuplicateField {
        union: EcoString,
        kind: EcoString,
        field: EcoString,
    },
    #[error("union `{union}` references an unknown union `{referenced}`")]
    UnknownUnion {
        union: EcoString,
        referenced: EcoString,
    },
    #[error("union `{union}` has no base case: no kind can ever finish constructing")]
    NoBaseCase { union: EcoString },
    #[error("raw values in union `{union}` are {expected}, but `{kind}` declares a {found} value")]
    RawTypeMismatch {
        union: EcoString,
        kind: EcoString,
        expected: RawTy,
        found: RawTy,
    },
    #[error("kind `{union}::{kind}` carries a payload and cannot take part in a raw-value mapping")]
    RawValueWithPayload { union: EcoString, kind: EcoString },
    #[error("raw value {value} is shared by `{first}` and `{second}` in union `{union}`")]
    DuplicateRawValue {
        union: EcoString,
        value: RawValue,
        first: EcoString,
        second: EcoString,
    },
    #[error("kind `{union}::{kind}` declares a raw value, but its union declares no raw type")]
    StrayRawValue { union: EcoString, kind: EcoString },
}

/// An error produced by the raw-value operations.
#[derive(Debug, Clone, Error)]
pub enum RawValueError {
    #[error("union `{0}` declares no raw-value mapping")]
    NoRawValueMapping(EcoString),
    #[error("no kind in union `{union}` has raw value {value}")]
    UnknownRawValue { union: EcoString, value: RawValue },
}

/// The global registry of union definitions.
pub struct Registry {
    unions: Vec<UnionDef>,
    kinds: Vec<KindDef>,
    by_name: HashMap<Symbol, UnionId>,
    names: NameTable,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            unions: Vec::new(),
            kinds: Vec::new(),
            by_name: HashMap::new(),
            names: NameTable::new(),
        }
    }

    // LOOKUPS

    pub fn get_union(&self, id: UnionId) -> &UnionDef {
        self.unions
            .get(id.0)
            .expect("Union IDs are valid by construction")
    }

    pub fn get_kind(&self, id: KindId) -> &KindDef {
        self.kinds
            .get(id.0)
            .expect("Kind IDs are valid by construction")
    }

    /// Looks up a union by name.
    pub fn union_of(&self, name: &str) -> Option<UnionId> {
        let sym = self.names.get(name)?;
        self.by_name.get(&sym).copied()
    }

    /// Looks up a kind by name within `union`.
    pub fn kind_of(&self, union: UnionId, name: &str) -> Option<KindId> {
        let sym = self.names.get(name)?;
        self.get_union(union).kind_names.get(&sym).copied()
    }

    pub fn union_name(&self, id: UnionId) -> &str {
        self.names
            .resolve(self.get_union(id).name)
            .expect("Union names are interned at definition time")
    }

    pub fn kind_name(&self, id: KindId) -> &str {
        self.names
            .resolve(self.get_kind(id).name)
            .expect("Kind names are interned at definition time")
    }

    pub fn field_name(&self, field: &FieldDef) -> &str {
        self.names
            .resolve(field.name)
            .expect("Field names are interned at definition time")
    }

    /// The kinds of `union` in declaration order.
    pub fn kinds(&self, union: UnionId) -> impl Iterator<Item = KindId> + '_ {
        self.get_union(union).kinds.iter().copied()
    }

    /// A displayable name for a field type.
    pub fn ty_name(&self, ty: FieldTy) -> EcoString {
        match ty {
            FieldTy::Int => "int".into(),
            FieldTy::Float => "float".into(),
            FieldTy::Text => "text".into(),
            FieldTy::Bool => "bool".into(),
            FieldTy::Union(id) => {
                ecow::eco_format!("union {}", self.union_name(id))
            }
        }
    }

    // DEFINITION

    /// Registers a single union.
    ///
    /// Equivalent to a [`define_all`] batch of one: the declaration may
    /// reference itself (via [`TyDecl::SelfRef`]) and any union defined
    /// earlier, but nothing later.
    ///
    /// [`define_all`]: Registry::define_all
    pub fn define(
        &mut self,
        decl: UnionDecl,
    ) -> Result<UnionId, DefineError> {
        let ids = self.define_all([decl])?;
        Ok(ids[0])
    }

    /// Registers a batch of unions, which may reference each other freely.
    ///
    /// The batch commits atomically: on any error the registry is left
    /// unchanged.
    pub fn define_all(
        &mut self,
        decls: impl IntoIterator<Item = UnionDecl>,
    ) -> Result<Box<[UnionId]>, DefineError> {
        let decls = decls.into_iter().collect::<Vec<_>>();

        // reserve ids, rejecting collisions with committed unions and
        // within the batch itself
        let mut batch = HashMap::with_capacity(decls.len());
        let mut ids = Vec::with_capacity(decls.len());
        for (offset, decl) in decls.iter().enumerate() {
            let sym = self.names.intern(&decl.name);
            let id = UnionId(self.unions.len() + offset);

            if self.by_name.contains_key(&sym)
                || batch.insert(sym, id).is_some()
            {
                return Err(DefineError::DuplicateUnion(decl.name.clone()));
            }
            ids.push(id);
        }

        // resolve declarations into staged table entries, tracking which
        // in-batch unions each kind's payload references
        let mut staged_unions = Vec::with_capacity(decls.len());
        let mut staged_kinds = Vec::new();
        let mut batch_refs = Vec::with_capacity(decls.len());

        for (decl, &id) in decls.iter().zip(&ids) {
            let kind_base = self.kinds.len() + staged_kinds.len();
            let (def, kinds, refs) =
                self.stage_union(decl, id, kind_base, &batch)?;

            staged_unions.push(def);
            staged_kinds.extend(kinds);
            batch_refs.push(refs);
        }

        check_well_founded(&decls, &batch_refs)?;

        // commit
        for (def, &id) in staged_unions.iter().zip(&ids) {
            self.by_name.insert(def.name, id);
        }
        self.unions.extend(staged_unions);
        self.kinds.extend(staged_kinds);

        Ok(ids.into_boxed_slice())
    }

    /// Resolves one declaration against the committed tables and the
    /// current batch. Returns the staged union, its staged kinds, and the
    /// per-kind sets of in-batch union references.
    fn stage_union(
        &mut self,
        decl: &UnionDecl,
        id: UnionId,
        kind_base: usize,
        batch: &HashMap<Symbol, UnionId>,
    ) -> Result<(UnionDef, Vec<KindDef>, Vec<Vec<usize>>), DefineError> {
        let base = self.unions.len();
        let name = self.names.intern(&decl.name);

        let mut kinds = Vec::with_capacity(decl.kinds.len());
        let mut kind_ids = Vec::with_capacity(decl.kinds.len());
        let mut kind_names = HashMap::with_capacity(decl.kinds.len());
        let mut refs = Vec::with_capacity(decl.kinds.len());
        let mut last_raw: Option<RawValue> = None;

        for (ordinal, kind) in decl.kinds.iter().enumerate() {
            let kind_sym = self.names.intern(&kind.name);
            let kind_id = KindId(kind_base + kinds.len());

            if kind_names.insert(kind_sym, kind_id).is_some() {
                return Err(DefineError::DuplicateKind {
                    union: decl.name.clone(),
                    kind: kind.name.clone(),
                });
            }

            // resolve payload fields
            let mut fields = Vec::with_capacity(kind.fields.len());
            let mut seen_fields = HashMap::new();
            let mut kind_refs = Vec::new();

            for field in &kind.fields {
                let field_sym = self.names.intern(&field.name);
                if seen_fields.insert(field_sym, ()).is_some() {
                    return Err(DefineError::DuplicateField {
                        union: decl.name.clone(),
                        kind: kind.name.clone(),
                        field: field.name.clone(),
                    });
                }

                let ty = match &field.ty {
                    TyDecl::Int => FieldTy::Int,
                    TyDecl::Float => FieldTy::Float,
                    TyDecl::Text => FieldTy::Text,
                    TyDecl::Bool => FieldTy::Bool,
                    TyDecl::SelfRef => {
                        kind_refs.push(id.0 - base);
                        FieldTy::Union(id)
                    }
                    TyDecl::Union(referenced) => {
                        let target = self
                            .names
                            .get(referenced)
                            .and_then(|sym| {
                                self.by_name
                                    .get(&sym)
                                    .or_else(|| batch.get(&sym))
                                    .copied()
                            })
                            .ok_or_else(|| DefineError::UnknownUnion {
                                union: decl.name.clone(),
                                referenced: referenced.clone(),
                            })?;

                        if target.0 >= base {
                            kind_refs.push(target.0 - base);
                        }
                        FieldTy::Union(target)
                    }
                };

                fields.push(FieldDef {
                    name: field_sym,
                    ty,
                });
            }

            let raw = self.stage_raw_value(
                decl,
                kind,
                &fields,
                &last_raw,
                &kinds,
            )?;
            last_raw = raw.clone();

            kinds.push(KindDef {
                name: kind_sym,
                union: id,
                ordinal: ordinal as u32,
                fields: fields.into_boxed_slice(),
                raw,
            });
            kind_ids.push(kind_id);
            refs.push(kind_refs);
        }

        let def = UnionDef {
            name,
            kinds: kind_ids.into_boxed_slice(),
            kind_names,
            raw_ty: decl.raw_ty,
        };

        Ok((def, kinds, refs))
    }

    /// Resolves the raw value of one staged kind, enforcing the raw-mapping
    /// invariants: unit kinds only, a consistent scalar type, injectivity,
    /// and implicit values where the declaration leaves them out.
    fn stage_raw_value(
        &self,
        decl: &UnionDecl,
        kind: &KindDecl,
        fields: &[FieldDef],
        last_raw: &Option<RawValue>,
        staged: &[KindDef],
    ) -> Result<Option<RawValue>, DefineError> {
        let Some(raw_ty) = decl.raw_ty else {
            return match kind.raw {
                Some(_) => Err(DefineError::StrayRawValue {
                    union: decl.name.clone(),
                    kind: kind.name.clone(),
                }),
                None => Ok(None),
            };
        };

        if !fields.is_empty() {
            return Err(DefineError::RawValueWithPayload {
                union: decl.name.clone(),
                kind: kind.name.clone(),
            });
        }

        let raw = match &kind.raw {
            Some(explicit) => {
                if explicit.ty() != raw_ty {
                    return Err(DefineError::RawTypeMismatch {
                        union: decl.name.clone(),
                        kind: kind.name.clone(),
                        expected: raw_ty,
                        found: explicit.ty(),
                    });
                }
                explicit.clone()
            }
            // implicit values: count up from the previous kind, or take
            // the kind's own name for text mappings
            None => match (raw_ty, last_raw) {
                (RawTy::Int, Some(RawValue::Int(prev))) => {
                    RawValue::Int(prev + 1)
                }
                (RawTy::Int, _) => RawValue::Int(0),
                (RawTy::Float, Some(RawValue::Float(prev))) => {
                    RawValue::Float(prev + 1.0)
                }
                (RawTy::Float, _) => RawValue::Float(0.0),
                (RawTy::Text, _) => RawValue::Text(kind.name.clone()),
            },
        };

        // injectivity against the kinds staged so far
        for earlier in staged {
            if earlier.raw.as_ref().is_some_and(|r| r.same(&raw)) {
                let first = self
                    .names
                    .resolve(earlier.name)
                    .expect("staged kind names are interned")
                    .into();
                return Err(DefineError::DuplicateRawValue {
                    union: decl.name.clone(),
                    value: raw,
                    first,
                    second: kind.name.clone(),
                });
            }
        }

        Ok(Some(raw))
    }

    // RAW-VALUE OPERATIONS

    /// The raw value of a unit kind in a raw-mapped union.
    pub fn raw_value(
        &self,
        kind: KindId,
    ) -> Result<&RawValue, RawValueError> {
        let def = self.get_kind(kind);
        def.raw.as_ref().ok_or_else(|| {
            RawValueError::NoRawValueMapping(
                self.union_name(def.union).into(),
            )
        })
    }

    /// Decodes a raw scalar back into a kind of `union`.
    pub fn from_raw(
        &self,
        union: UnionId,
        scalar: &RawValue,
    ) -> Result<KindId, RawValueError> {
        let def = self.get_union(union);
        if def.raw_ty.is_none() {
            return Err(RawValueError::NoRawValueMapping(
                self.union_name(union).into(),
            ));
        }

        def.kinds
            .iter()
            .copied()
            .find(|&id| {
                self.get_kind(id)
                    .raw
                    .as_ref()
                    .is_some_and(|raw| raw.same(scalar))
            })
            .ok_or_else(|| RawValueError::UnknownRawValue {
                union: self.union_name(union).into(),
                value: scalar.clone(),
            })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Rejects definition batches that can never finish constructing.
///
/// `batch_refs[u][k]` holds the in-batch unions referenced by the payload
/// of kind `k` of batch union `u`; references to committed unions are
/// absent, since a committed union is constructible by induction. If the
/// reference graph is acyclic the whole batch is well-founded, so the
/// fixpoint only runs when the toposort reports a cycle.
fn check_well_founded(
    decls: &[UnionDecl],
    batch_refs: &[Vec<Vec<usize>>],
) -> Result<(), DefineError> {
    // an empty union has, vacuously, no base case
    if let Some(decl) = decls.iter().find(|decl| decl.kinds.is_empty()) {
        return Err(DefineError::NoBaseCase {
            union: decl.name.clone(),
        });
    }

    let mut graph = DiGraph::<usize, ()>::new();
    let nodes = (0..decls.len())
        .map(|u| graph.add_node(u))
        .collect::<Vec<_>>();
    for (u, kinds) in batch_refs.iter().enumerate() {
        for kind_refs in kinds {
            for &v in kind_refs {
                graph.update_edge(nodes[u], nodes[v], ());
            }
        }
    }

    if petgraph::algo::toposort(&graph, None).is_ok() {
        return Ok(());
    }

    // cyclic batch: grow the constructible set to a fixpoint
    let mut constructible = vec![false; decls.len()];
    loop {
        let mut changed = false;
        for (u, kinds) in batch_refs.iter().enumerate() {
            if constructible[u] {
                continue;
            }
            let ok = kinds
                .iter()
                .any(|refs| refs.iter().all(|&v| constructible[v]));
            if ok {
                constructible[u] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    match constructible.iter().position(|&ok| !ok) {
        None => Ok(()),
        Some(u) => Err(DefineError::NoBaseCase {
            union: decls[u].name.clone(),
        }),
    }
}
