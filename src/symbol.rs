//! Interned names for unions, kinds, and fields.
//!
//! Definition-time code interns freely; everything after definition holds
//! only a `&Registry`, so the table also supports read-only lookup via
//! [`NameTable::get`].

use string_interner::{self, backend, symbol};

/// The initial capacity of a [`NameTable`].
///
/// Union, kind, and field names are short and few; this covers a few dozen
/// unions before the backing buffers grow.
const NAME_TABLE_CAPACITY: usize = 256;

/// An interned name.
#[derive(Debug, Hash, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Symbol(symbol::SymbolU32);

#[derive(Debug)]
pub struct NameTable(
    string_interner::StringInterner<backend::StringBackend<symbol::SymbolU32>>,
);

impl NameTable {
    pub fn new() -> Self {
        NameTable(string_interner::StringInterner::with_capacity(
            NAME_TABLE_CAPACITY,
        ))
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        let raw_symbol = self.0.get_or_intern(s);
        Symbol(raw_symbol)
    }

    pub fn intern_static(&mut self, s: &'static str) -> Symbol {
        let raw_symbol = self.0.get_or_intern_static(s);
        Symbol(raw_symbol)
    }

    /// Looks up a name without interning it.
    pub fn get(&self, s: &str) -> Option<Symbol> {
        self.0.get(s).map(Symbol)
    }

    pub fn resolve(&self, sym: Symbol) -> Option<&str> {
        self.0.resolve(sym.0)
    }
}

impl Default for NameTable {
    fn default() -> Self {
        Self::new()
    }
}
