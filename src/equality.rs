//! Per-union equality with caller-defined leaves.
//!
//! No variant type in this crate is implicitly comparable; a caller that
//! wants equality over a union asks the registry for an [`Equality`] and
//! decides, through [`LeafEq`], what equality means for the scalar leaves.
//! The engine contributes only the generic traversal: kind against kind,
//! then payload fields pairwise, recursing through nested variants.

use crate::{
    registry::{Registry, UnionId},
    value::{Value, Variant},
};

/// Equality over the scalar leaf types.
///
/// Every method defaults to plain `==`; implementors override only the
/// leaves they care about. Note the float default means `NaN != NaN`.
pub trait LeafEq {
    fn int(&self, a: i64, b: i64) -> bool {
        a == b
    }

    fn float(&self, a: f64, b: f64) -> bool {
        a == b
    }

    fn text(&self, a: &str, b: &str) -> bool {
        a == b
    }

    fn bool(&self, a: bool, b: bool) -> bool {
        a == b
    }
}

/// The all-defaults [`LeafEq`]: structural equality down to the leaves.
#[derive(Debug, Clone, Copy, Default)]
pub struct Structural;

impl LeafEq for Structural {}

/// A comparator for variants of one union.
pub struct Equality<'r, L> {
    registry: &'r Registry,
    union: UnionId,
    leaves: L,
}

impl Registry {
    /// Defines equality over `union` in terms of `leaves`.
    pub fn equality<L: LeafEq>(
        &self,
        union: UnionId,
        leaves: L,
    ) -> Equality<'_, L> {
        Equality {
            registry: self,
            union,
            leaves,
        }
    }
}

impl<L: LeafEq> Equality<'_, L> {
    /// Whether `a` and `b` are the same kind with pairwise-equal payloads.
    ///
    /// Variants of a union other than the one this comparator was built
    /// for are never equal to anything, including themselves.
    pub fn holds(&self, a: &Variant, b: &Variant) -> bool {
        if self.registry.get_kind(a.kind()).union() != self.union {
            return false;
        }

        self.variants(a, b)
    }

    fn variants(&self, a: &Variant, b: &Variant) -> bool {
        a.kind() == b.kind()
            && a.fields()
                .iter()
                .zip(b.fields())
                .all(|(a, b)| self.values(a, b))
    }

    fn values(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Int(a), Value::Int(b)) => self.leaves.int(*a, *b),
            (Value::Float(a), Value::Float(b)) => self.leaves.float(*a, *b),
            (Value::Text(a), Value::Text(b)) => self.leaves.text(a, b),
            (Value::Bool(a), Value::Bool(b)) => self.leaves.bool(*a, *b),
            (Value::Variant(a), Value::Variant(b)) => self.variants(a, b),
            // unreachable for payloads of equal kinds, which construction
            // has already shaped
            _ => false,
        }
    }
}
