//! Rendering for union definitions and variant values.
//!
//! Variants are recursive, so their documents are built by collapsing a
//! [`ValueFrame`] per level rather than by explicit recursion; definitions
//! are flat and assemble their documents directly. Both render through
//! [`pretty::RcDoc`] with a caller-chosen width.

use ecow::EcoString;
use pretty::RcDoc;
use recursion::{Collapsible, CollapsibleExt, MappableFrame, PartiallyApplied};

use crate::{
    registry::{FieldTy, KindId, Registry, UnionId},
    value::{Value, Variant},
};

/// A single layer of a [`Value`].
#[derive(Debug, Clone)]
pub enum ValueFrame<A> {
    Int(i64),
    Float(f64),
    Text(EcoString),
    Bool(bool),
    Variant { kind: KindId, fields: Box<[A]> },
}

impl MappableFrame for ValueFrame<PartiallyApplied> {
    type Frame<X> = ValueFrame<X>;

    fn map_frame<A, B>(
        input: Self::Frame<A>,
        f: impl FnMut(A) -> B,
    ) -> Self::Frame<B> {
        match input {
            ValueFrame::Int(value) => ValueFrame::Int(value),
            ValueFrame::Float(value) => ValueFrame::Float(value),
            ValueFrame::Text(value) => ValueFrame::Text(value),
            ValueFrame::Bool(value) => ValueFrame::Bool(value),
            ValueFrame::Variant { kind, fields } => ValueFrame::Variant {
                kind,
                fields: fields.into_iter().map(f).collect(),
            },
        }
    }
}

impl Collapsible for Value {
    type FrameToken = ValueFrame<PartiallyApplied>;

    fn into_frame(self) -> <Self::FrameToken as MappableFrame>::Frame<Self> {
        match self {
            Value::Int(value) => ValueFrame::Int(value),
            Value::Float(value) => ValueFrame::Float(value),
            Value::Text(value) => ValueFrame::Text(value),
            Value::Bool(value) => ValueFrame::Bool(value),
            Value::Variant(variant) => {
                let (kind, fields) = variant.into_parts();
                ValueFrame::Variant { kind, fields }
            }
        }
    }
}

impl ValueFrame<RcDoc<'static, ()>> {
    fn to_doc(self, registry: &Registry) -> RcDoc<'static, ()> {
        match self {
            ValueFrame::Int(value) => RcDoc::as_string(value),
            // Debug keeps the decimal point, so `1.0` stays visibly float
            ValueFrame::Float(value) => {
                RcDoc::as_string(format!("{value:?}"))
            }
            ValueFrame::Text(value) => RcDoc::text("\"")
                .append(RcDoc::as_string(value))
                .append(RcDoc::text("\"")),
            ValueFrame::Bool(value) => {
                RcDoc::text(if value { "true" } else { "false" })
            }
            ValueFrame::Variant { kind, fields } => {
                let def = registry.get_kind(kind);
                let name = RcDoc::as_string(registry.kind_name(kind));

                if fields.is_empty() {
                    return name;
                }

                let pairs =
                    def.fields().iter().zip(fields).map(|(field, doc)| {
                        RcDoc::as_string(registry.field_name(field))
                            .append(RcDoc::text(": "))
                            .append(doc)
                    });

                name.append(RcDoc::text("("))
                    .append(
                        RcDoc::intersperse(
                            pairs,
                            RcDoc::text(",").append(RcDoc::softline()),
                        )
                        .nest(2),
                    )
                    .append(RcDoc::text(")"))
                    .group()
            }
        }
    }
}

impl Registry {
    pub fn variant_doc(&self, variant: &Variant) -> RcDoc<'static, ()> {
        Value::from(variant.clone())
            .collapse_frames(|frame| frame.to_doc(self))
    }

    pub fn render_variant(&self, variant: &Variant, width: usize) -> String {
        format!("{}", self.variant_doc(variant).pretty(width))
    }

    pub fn union_doc(&self, union: UnionId) -> RcDoc<'static, ()> {
        let def = self.get_union(union);

        let head = RcDoc::text("union ")
            .append(RcDoc::as_string(self.union_name(union)));
        let head = match def.raw_ty() {
            Some(ty) => head
                .append(RcDoc::text(" = "))
                .append(RcDoc::as_string(ty)),
            None => head,
        };

        let kinds = self.kinds(union).map(|kind| self.kind_doc(kind));
        let body = RcDoc::line()
            .append(RcDoc::intersperse(
                kinds,
                RcDoc::text(",").append(RcDoc::line()),
            ))
            .nest(4)
            .append(RcDoc::line());

        head.append(RcDoc::text(" {"))
            .append(body)
            .append(RcDoc::text("}"))
            .group()
    }

    pub fn render_union(&self, union: UnionId, width: usize) -> String {
        format!("{}", self.union_doc(union).pretty(width))
    }

    fn kind_doc(&self, kind: KindId) -> RcDoc<'static, ()> {
        let def = self.get_kind(kind);
        let name = RcDoc::as_string(self.kind_name(kind));

        if let Some(raw) = def.raw() {
            return name
                .append(RcDoc::text(" = "))
                .append(RcDoc::as_string(raw));
        }

        if def.is_unit() {
            return name;
        }

        let fields = def.fields().iter().map(|field| {
            RcDoc::as_string(self.field_name(field))
                .append(RcDoc::text(": "))
                .append(RcDoc::as_string(self.decl_ty_name(field.ty())))
        });

        name.append(RcDoc::text("("))
            .append(RcDoc::intersperse(
                fields,
                RcDoc::text(",").append(RcDoc::space()),
            ))
            .append(RcDoc::text(")"))
    }

    /// The name a field type goes by inside a rendered declaration, where
    /// union references appear bare.
    fn decl_ty_name(&self, ty: FieldTy) -> EcoString {
        match ty {
            FieldTy::Union(id) => self.union_name(id).into(),
            other => self.ty_name(other),
        }
    }
}
