//! A registry for closed tagged-union types.
//!
//! A *union* is a closed set of named *kinds*, each carrying zero or more
//! typed payload fields; a *variant* is an instance of one kind together
//! with its payload. Definitions are registered once with
//! [`registry::Registry::define`] and are immutable afterwards, so a shared
//! `&Registry` can be read from any number of threads without locking.
//!
//! Behavior is kept separate from definition: dispatch lives in
//! [`matcher`], equality in [`equality`], and rendering in [`display`],
//! each built over a `(Registry, UnionId)` pair rather than baked into the
//! definition types.

pub mod display;
pub mod equality;
pub mod matcher;
pub mod registry;
pub mod symbol;
pub mod union;
pub mod value;

pub use registry::{KindId, Registry, UnionId};
pub use union::{FieldDecl, KindDecl, RawTy, RawValue, TyDecl, UnionDecl};
pub use value::{Value, Variant, VariantSlot};
