//! Declaration-side data for closed union types.
//!
//! A [`UnionDecl`] is plain data: it carries the names and shapes a caller
//! wants, and none of them are checked until the declaration is handed to
//! [`Registry::define`]. The resolved, table-resident counterparts of these
//! types live in [`registry`].
//!
//! [`Registry::define`]: crate::registry::Registry::define
//! [`registry`]: crate::registry

use ecow::EcoString;

/// A declaration of a closed union type.
#[derive(Debug, Clone)]
pub struct UnionDecl {
    pub name: EcoString,
    pub kinds: Vec<KindDecl>,
    /// The scalar type of this union's raw-value mapping, if it has one.
    pub raw_ty: Option<RawTy>,
}

impl UnionDecl {
    pub fn new(name: impl Into<EcoString>) -> Self {
        UnionDecl {
            name: name.into(),
            kinds: Vec::new(),
            raw_ty: None,
        }
    }

    pub fn kind(mut self, kind: KindDecl) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Declares a raw-value mapping over `ty` for this union.
    ///
    /// Kinds without an explicit [`KindDecl::raw`] value get one implicitly:
    /// integer and float mappings count up from the previous kind's value
    /// (starting at zero), and text mappings default to the kind's own name.
    pub fn raw_ty(mut self, ty: RawTy) -> Self {
        self.raw_ty = Some(ty);
        self
    }
}

/// A declaration of a single kind within a union.
///
/// A kind with no fields is a *unit* kind; only unit kinds may participate
/// in a raw-value mapping.
#[derive(Debug, Clone)]
pub struct KindDecl {
    pub name: EcoString,
    pub fields: Vec<FieldDecl>,
    pub raw: Option<RawValue>,
}

impl KindDecl {
    pub fn new(name: impl Into<EcoString>) -> Self {
        KindDecl {
            name: name.into(),
            fields: Vec::new(),
            raw: None,
        }
    }

    pub fn field(mut self, name: impl Into<EcoString>, ty: TyDecl) -> Self {
        self.fields.push(FieldDecl {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn raw(mut self, value: RawValue) -> Self {
        self.raw = Some(value);
        self
    }
}

/// A named, typed payload field.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: EcoString,
    pub ty: TyDecl,
}

/// The declared type of a payload field.
///
/// `SelfRef` refers to the union being declared; `Union` refers to any
/// union by name, including one defined earlier in the same batch.
#[derive(Debug, Clone)]
pub enum TyDecl {
    Int,
    Float,
    Text,
    Bool,
    SelfRef,
    Union(EcoString),
}

/// The scalar type of a raw-value mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTy {
    Int,
    Float,
    Text,
}

impl std::fmt::Display for RawTy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RawTy::Int => "int",
            RawTy::Float => "float",
            RawTy::Text => "text",
        })
    }
}

/// A raw scalar standing in for a unit kind.
#[derive(Debug, Clone)]
pub enum RawValue {
    Int(i64),
    Float(f64),
    Text(EcoString),
}

impl RawValue {
    pub fn ty(&self) -> RawTy {
        match self {
            RawValue::Int(_) => RawTy::Int,
            RawValue::Float(_) => RawTy::Float,
            RawValue::Text(_) => RawTy::Text,
        }
    }

    /// Scalar identity, as used by the injectivity check and by decoding.
    ///
    /// Floats compare by bit pattern, so `0.0` and `-0.0` are distinct raw
    /// values and `NaN` is equal to itself.
    pub fn same(&self, other: &RawValue) -> bool {
        match (self, other) {
            (RawValue::Int(a), RawValue::Int(b)) => a == b,
            (RawValue::Float(a), RawValue::Float(b)) => {
                a.to_bits() == b.to_bits()
            }
            (RawValue::Text(a), RawValue::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for RawValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawValue::Int(value) => write!(f, "{value}"),
            RawValue::Float(value) => write!(f, "{value}"),
            RawValue::Text(value) => write!(f, "\"{value}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_value_identity_is_bitwise_for_floats() {
        assert!(RawValue::Float(1.5).same(&RawValue::Float(1.5)));
        assert!(!RawValue::Float(0.0).same(&RawValue::Float(-0.0)));
        assert!(RawValue::Float(f64::NAN).same(&RawValue::Float(f64::NAN)));
        assert!(!RawValue::Int(0).same(&RawValue::Float(0.0)));
    }

    #[test]
    fn builders_accumulate_in_declaration_order() {
        let decl = UnionDecl::new("Trade")
            .kind(
                KindDecl::new("Buy")
                    .field("stock", TyDecl::Text)
                    .field("amount", TyDecl::Int),
            )
            .kind(
                KindDecl::new("Sell")
                    .field("stock", TyDecl::Text)
                    .field("amount", TyDecl::Int),
            );

        assert_eq!(decl.name, "Trade");
        assert_eq!(decl.kinds.len(), 2);
        assert_eq!(decl.kinds[0].name, "Buy");
        assert_eq!(decl.kinds[0].fields.len(), 2);
        assert_eq!(decl.kinds[1].fields[1].name, "amount");
    }
}
