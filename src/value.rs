//! Variant instances and their construction.
//!
//! A [`Variant`] can only be produced by [`Registry::construct`], which is
//! what makes the central payload invariant hold: an instance's field
//! values always agree, in count and in type, with its kind's declared
//! shape. Payloads are owned outright; cloning a variant deep-copies its
//! payload, and nested variants are boxed so that recursive unions stay
//! finitely sized.

use ecow::EcoString;
use thiserror::Error;

use crate::registry::{FieldTy, KindId, Registry, UnionId};

/// A payload field value.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(EcoString),
    Bool(bool),
    Variant(Box<Variant>),
}

impl Value {
    pub fn text(s: impl Into<EcoString>) -> Self {
        Value::Text(s.into())
    }

    /// A displayable name for this value's type.
    pub fn ty_name(&self, registry: &Registry) -> EcoString {
        match self {
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Text(_) => "text".into(),
            Value::Bool(_) => "bool".into(),
            Value::Variant(inner) => {
                let union = registry.get_kind(inner.kind).union();
                ecow::eco_format!("union {}", registry.union_name(union))
            }
        }
    }

    /// Whether this value can fill a field of type `ty`.
    fn fits(&self, registry: &Registry, ty: FieldTy) -> bool {
        match (self, ty) {
            (Value::Int(_), FieldTy::Int) => true,
            (Value::Float(_), FieldTy::Float) => true,
            (Value::Text(_), FieldTy::Text) => true,
            (Value::Bool(_), FieldTy::Bool) => true,
            (Value::Variant(inner), FieldTy::Union(union)) => {
                registry.get_kind(inner.kind).union() == union
            }
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.into())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Variant> for Value {
    fn from(value: Variant) -> Self {
        Value::Variant(Box::new(value))
    }
}

/// One instance of a union: a kind plus its payload.
///
/// Deliberately not `PartialEq` — equality over variants is defined per
/// union through [`equality`](crate::equality), never implicitly.
#[derive(Debug, Clone)]
pub struct Variant {
    kind: KindId,
    fields: Box<[Value]>,
}

impl Variant {
    pub fn kind(&self) -> KindId {
        self.kind
    }

    pub fn fields(&self) -> &[Value] {
        self.fields.as_ref()
    }

    /// Decomposes this variant into its kind and owned payload.
    pub fn into_parts(self) -> (KindId, Box<[Value]>) {
        (self.kind, self.fields)
    }

    /// Looks up a payload field by its declared name.
    pub fn field<'v>(
        &'v self,
        registry: &Registry,
        name: &str,
    ) -> Option<&'v Value> {
        let def = registry.get_kind(self.kind);
        def.fields()
            .iter()
            .position(|field| registry.field_name(field) == name)
            .map(|index| &self.fields[index])
    }
}

/// A payload whose count or types disagree with the kind's declared shape.
#[derive(Debug, Clone, Error)]
pub enum ShapeMismatch {
    #[error("kind `{union}::{kind}` has {expected} fields, but {found} values were supplied")]
    Arity {
        union: EcoString,
        kind: EcoString,
        expected: usize,
        found: usize,
    },
    #[error("field `{field}` of `{union}::{kind}` expects {expected}, but was given {found}")]
    Field {
        union: EcoString,
        kind: EcoString,
        field: EcoString,
        expected: EcoString,
        found: EcoString,
    },
}

/// An error produced while constructing a variant.
#[derive(Debug, Clone, Error)]
pub enum ConstructError {
    #[error("union `{union}` has no kind named `{kind}`")]
    UnknownKind { union: EcoString, kind: EcoString },
    #[error(transparent)]
    Shape(#[from] ShapeMismatch),
}

impl Registry {
    /// Builds a variant of `kind`, checking the payload against the kind's
    /// declared shape. Values are taken in declaration order.
    pub fn construct(
        &self,
        kind: KindId,
        values: Vec<Value>,
    ) -> Result<Variant, ConstructError> {
        let def = self.get_kind(kind);

        if values.len() != def.fields().len() {
            return Err(ShapeMismatch::Arity {
                union: self.union_name(def.union()).into(),
                kind: self.kind_name(kind).into(),
                expected: def.fields().len(),
                found: values.len(),
            }
            .into());
        }

        for (field, value) in def.fields().iter().zip(&values) {
            if !value.fits(self, field.ty()) {
                return Err(ShapeMismatch::Field {
                    union: self.union_name(def.union()).into(),
                    kind: self.kind_name(kind).into(),
                    field: self.field_name(field).into(),
                    expected: self.ty_name(field.ty()),
                    found: value.ty_name(self),
                }
                .into());
            }
        }

        Ok(Variant {
            kind,
            fields: values.into_boxed_slice(),
        })
    }

    /// [`construct`](Registry::construct), resolving the kind by name.
    pub fn construct_by_name(
        &self,
        union: UnionId,
        kind: &str,
        values: Vec<Value>,
    ) -> Result<Variant, ConstructError> {
        let id = self.kind_of(union, kind).ok_or_else(|| {
            ConstructError::UnknownKind {
                union: self.union_name(union).into(),
                kind: kind.into(),
            }
        })?;

        self.construct(id, values)
    }
}

/// A single-owner cell holding one variant.
///
/// This models the state-machine use of a union: a slot starts in some
/// state and [`transition`]s replace the whole kind/payload pair as one
/// logical step. The replacement is built first and swapped in only on
/// success, so a failed transition leaves the slot untouched. The slot
/// itself holds no lock; callers that share one across threads bring their
/// own synchronization.
///
/// [`transition`]: VariantSlot::transition
#[derive(Debug, Clone)]
pub struct VariantSlot {
    variant: Variant,
}

impl VariantSlot {
    pub fn new(variant: Variant) -> Self {
        VariantSlot { variant }
    }

    pub fn get(&self) -> &Variant {
        &self.variant
    }

    /// Replaces the slot's kind and payload, succeeding exactly when
    /// [`Registry::construct`] would for the same arguments.
    pub fn transition(
        &mut self,
        registry: &Registry,
        kind: KindId,
        values: Vec<Value>,
    ) -> Result<&Variant, ConstructError> {
        self.variant = registry.construct(kind, values)?;
        Ok(&self.variant)
    }

    pub fn into_inner(self) -> Variant {
        self.variant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::union::{KindDecl, TyDecl, UnionDecl};

    fn trade_registry() -> (Registry, UnionId) {
        let mut registry = Registry::new();
        let trade = registry
            .define(
                UnionDecl::new("Trade")
                    .kind(
                        KindDecl::new("Buy")
                            .field("stock", TyDecl::Text)
                            .field("amount", TyDecl::Int),
                    )
                    .kind(
                        KindDecl::new("Sell")
                            .field("stock", TyDecl::Text)
                            .field("amount", TyDecl::Int),
                    ),
            )
            .unwrap();
        (registry, trade)
    }

    fn tree_registry() -> (Registry, UnionId) {
        let mut registry = Registry::new();
        let tree = registry
            .define(
                UnionDecl::new("Tree")
                    .kind(KindDecl::new("Empty"))
                    .kind(
                        KindDecl::new("Node")
                            .field("value", TyDecl::Int)
                            .field("left", TyDecl::SelfRef)
                            .field("right", TyDecl::SelfRef),
                    ),
            )
            .unwrap();
        (registry, tree)
    }

    #[test]
    fn construct_checks_arity() {
        let (registry, trade) = trade_registry();

        let err = registry
            .construct_by_name(trade, "Buy", vec!["APPL".into()])
            .unwrap_err();
        assert!(matches!(
            err,
            ConstructError::Shape(ShapeMismatch::Arity {
                expected: 2,
                found: 1,
                ..
            })
        ));

        let buy = registry
            .construct_by_name(trade, "Buy", vec!["APPL".into(), 500.into()])
            .unwrap();
        assert_eq!(buy.fields().len(), 2);
    }

    #[test]
    fn construct_checks_field_types() {
        let (registry, trade) = trade_registry();

        let err = registry
            .construct_by_name(trade, "Buy", vec![500.into(), "APPL".into()])
            .unwrap_err();
        assert!(matches!(
            err,
            ConstructError::Shape(ShapeMismatch::Field { field, .. }) if field == "stock"
        ));
    }

    #[test]
    fn construct_unknown_kind() {
        let (registry, trade) = trade_registry();

        let err = registry
            .construct_by_name(trade, "Hold", vec![])
            .unwrap_err();
        assert!(matches!(
            err,
            ConstructError::UnknownKind { union, kind }
                if union == "Trade" && kind == "Hold"
        ));
    }

    #[test]
    fn field_lookup_by_name() {
        let (registry, trade) = trade_registry();
        let buy = registry
            .construct_by_name(trade, "Buy", vec!["APPL".into(), 500.into()])
            .unwrap();

        assert!(matches!(
            buy.field(&registry, "amount"),
            Some(Value::Int(500))
        ));
        assert!(buy.field(&registry, "price").is_none());
    }

    #[test]
    fn recursive_construction_bottom_up() {
        let (registry, tree) = tree_registry();
        let empty = registry.kind_of(tree, "Empty").unwrap();
        let node = registry.kind_of(tree, "Node").unwrap();

        let leaf = |registry: &Registry, value: i64| {
            let e = registry.construct(empty, vec![]).unwrap();
            let e2 = registry.construct(empty, vec![]).unwrap();
            registry
                .construct(node, vec![value.into(), e.into(), e2.into()])
                .unwrap()
        };

        // depth 3: node -> node -> node -> empty
        let left = leaf(&registry, 2);
        let right = leaf(&registry, 3);
        let mid = registry
            .construct(node, vec![1.into(), left.into(), right.into()])
            .unwrap();
        let e = registry.construct(empty, vec![]).unwrap();
        let root = registry
            .construct(node, vec![0.into(), mid.into(), e.into()])
            .unwrap();

        assert_eq!(root.kind(), node);
        assert!(matches!(
            root.field(&registry, "value"),
            Some(Value::Int(0))
        ));
    }

    #[test]
    fn nested_variant_must_belong_to_declared_union() {
        let mut registry = Registry::new();
        let ids = registry
            .define_all([
                UnionDecl::new("Tree")
                    .kind(KindDecl::new("Empty"))
                    .kind(KindDecl::new("Node").field("child", TyDecl::SelfRef)),
                UnionDecl::new("Other").kind(KindDecl::new("Unit")),
            ])
            .unwrap();
        let (tree, other) = (ids[0], ids[1]);

        let stray = registry.construct_by_name(other, "Unit", vec![]).unwrap();
        let err = registry
            .construct_by_name(tree, "Node", vec![stray.into()])
            .unwrap_err();

        assert!(matches!(
            err,
            ConstructError::Shape(ShapeMismatch::Field { expected, found, .. })
                if expected == "union Tree" && found == "union Other"
        ));
    }

    #[test]
    fn toggle_transitions_cycle_back_after_three_steps() {
        let mut registry = Registry::new();
        let toggle = registry
            .define(
                UnionDecl::new("Toggle")
                    .kind(KindDecl::new("Off"))
                    .kind(KindDecl::new("Low"))
                    .kind(KindDecl::new("High")),
            )
            .unwrap();

        let kinds = registry.kinds(toggle).collect::<Vec<_>>();
        let next = |registry: &Registry, current: KindId| {
            let def = registry.get_kind(current);
            kinds[(def.ordinal() as usize + 1) % kinds.len()]
        };

        for &start in &kinds {
            let variant = registry.construct(start, vec![]).unwrap();
            let mut slot = VariantSlot::new(variant);

            for _ in 0..3 {
                let target = next(&registry, slot.get().kind());
                slot.transition(&registry, target, vec![]).unwrap();
            }
            assert_eq!(slot.get().kind(), start);
        }
    }

    #[test]
    fn failed_transition_leaves_slot_untouched() {
        let (registry, trade) = trade_registry();
        let buy = registry.kind_of(trade, "Buy").unwrap();
        let sell = registry.kind_of(trade, "Sell").unwrap();

        let variant = registry
            .construct(buy, vec!["APPL".into(), 500.into()])
            .unwrap();
        let mut slot = VariantSlot::new(variant);

        slot.transition(&registry, sell, vec![true.into()])
            .unwrap_err();

        assert_eq!(slot.get().kind(), buy);
        assert!(matches!(
            slot.get().field(&registry, "amount"),
            Some(Value::Int(500))
        ));
    }
}
