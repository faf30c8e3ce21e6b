//! Compiled per-union dispatch.
//!
//! A [`Matcher`] is built once and applied many times. Exhaustiveness is a
//! set difference computed at [`MatcherBuilder::finish`] — the union's
//! declared kind set against the registered arms — so an incomplete
//! handler set is reported at registration time with the missing kinds
//! listed in declaration order, never rediscovered call by call.

use ecow::EcoString;
use thiserror::Error;

use crate::{
    registry::{Registry, UnionId},
    value::{Value, Variant},
};

/// An error produced while building or applying a [`Matcher`].
#[derive(Debug, Clone, Error)]
pub enum MatchError {
    #[error("union `{union}` has no kind named `{kind}`")]
    UnknownKind { union: EcoString, kind: EcoString },
    #[error("match over union `{union}` is missing arms for {}", .missing.join(", "))]
    NonExhaustiveMatch {
        union: EcoString,
        missing: Box<[EcoString]>,
    },
}

type ArmFn<'h, T> = Box<dyn Fn(&[Value]) -> T + 'h>;
type FallbackFn<'h, T> = Box<dyn Fn(&Variant) -> T + 'h>;

/// An unfinished handler set over one union.
pub struct MatcherBuilder<'r, 'h, T> {
    registry: &'r Registry,
    union: UnionId,
    arms: Vec<Option<ArmFn<'h, T>>>,
    fallback: Option<FallbackFn<'h, T>>,
}

/// A compiled, exhaustive handler set over one union.
pub struct Matcher<'r, 'h, T> {
    registry: &'r Registry,
    union: UnionId,
    arms: Vec<Option<ArmFn<'h, T>>>,
    fallback: Option<FallbackFn<'h, T>>,
}

impl<T> std::fmt::Debug for MatcherBuilder<'_, '_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherBuilder")
            .field("union", &self.union)
            .field("arms", &self.arms.iter().filter(|arm| arm.is_some()).count())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl<T> std::fmt::Debug for Matcher<'_, '_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher")
            .field("union", &self.union)
            .field("arms", &self.arms.len())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl Registry {
    /// Starts a handler set over `union`.
    pub fn matcher<'r, 'h, T>(
        &'r self,
        union: UnionId,
    ) -> MatcherBuilder<'r, 'h, T> {
        let arity = self.get_union(union).kinds().len();
        let mut arms = Vec::with_capacity(arity);
        arms.resize_with(arity, || None);

        MatcherBuilder {
            registry: self,
            union,
            arms,
            fallback: None,
        }
    }
}

impl<'r, 'h, T> MatcherBuilder<'r, 'h, T> {
    /// Registers the handler for one kind; the handler receives the
    /// variant's payload fields in declaration order.
    ///
    /// Registering the same kind twice keeps the later handler, the same
    /// way an explicit arm overrides the fallback.
    pub fn arm(
        mut self,
        kind: &str,
        handler: impl Fn(&[Value]) -> T + 'h,
    ) -> Result<Self, MatchError> {
        let id = self.registry.kind_of(self.union, kind).ok_or_else(|| {
            MatchError::UnknownKind {
                union: self.registry.union_name(self.union).into(),
                kind: kind.into(),
            }
        })?;

        let ordinal = self.registry.get_kind(id).ordinal() as usize;
        self.arms[ordinal] = Some(Box::new(handler));
        Ok(self)
    }

    /// Registers the handler for every kind without an explicit arm; the
    /// handler receives the whole variant.
    pub fn fallback(
        mut self,
        handler: impl Fn(&Variant) -> T + 'h,
    ) -> Self {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Checks exhaustiveness and compiles the handler set.
    pub fn finish(self) -> Result<Matcher<'r, 'h, T>, MatchError> {
        if self.fallback.is_none() {
            let missing = self
                .registry
                .kinds(self.union)
                .zip(&self.arms)
                .filter(|(_, arm)| arm.is_none())
                .map(|(id, _)| self.registry.kind_name(id).into())
                .collect::<Box<[EcoString]>>();

            if !missing.is_empty() {
                return Err(MatchError::NonExhaustiveMatch {
                    union: self.registry.union_name(self.union).into(),
                    missing,
                });
            }
        }

        Ok(Matcher {
            registry: self.registry,
            union: self.union,
            arms: self.arms,
            fallback: self.fallback,
        })
    }
}

impl<T> Matcher<'_, '_, T> {
    /// Dispatches `variant` to exactly one handler.
    ///
    /// A variant of a different union is the run-time analogue of naming
    /// an unknown kind, and surfaces as [`MatchError::UnknownKind`].
    pub fn apply(&self, variant: &Variant) -> Result<T, MatchError> {
        let def = self.registry.get_kind(variant.kind());
        if def.union() != self.union {
            return Err(MatchError::UnknownKind {
                union: self.registry.union_name(self.union).into(),
                kind: self.registry.kind_name(variant.kind()).into(),
            });
        }

        match &self.arms[def.ordinal() as usize] {
            Some(arm) => Ok(arm(variant.fields())),
            None => {
                let fallback = self
                    .fallback
                    .as_ref()
                    .expect("finish() verified exhaustiveness");
                Ok(fallback(variant))
            }
        }
    }
}
