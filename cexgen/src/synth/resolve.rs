//! Symbol resolution
//!
//! Resolves an identifier to its static table entry, or synthesizes a
//! placeholder symbol for trace-only objects using the executor's dynamic
//! type information. "Not found in the table" is a routine branch, so the
//! result is a two-outcome value rather than an error.

use log::debug;

use crate::error::{Result, SynthesisError};
use crate::model::{DynamicTypes, Symbol, SymbolTable};

/// Outcome of a symbol lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The static table knows the identifier
    Found(Symbol),
    /// Fabricated from dynamic type information; never written back
    Synthesized(Symbol),
}

impl Lookup {
    pub fn symbol(&self) -> &Symbol {
        match self {
            Lookup::Found(s) | Lookup::Synthesized(s) => s,
        }
    }

    pub fn into_symbol(self) -> Symbol {
        match self {
            Lookup::Found(s) | Lookup::Synthesized(s) => s,
        }
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, Lookup::Synthesized(_))
    }
}

/// Resolver over the static table and the dynamic-type side map
pub struct SymbolResolver<'a> {
    table: &'a SymbolTable,
    dynamic_types: &'a DynamicTypes,
}

impl<'a> SymbolResolver<'a> {
    pub fn new(table: &'a SymbolTable, dynamic_types: &'a DynamicTypes) -> Self {
        Self {
            table,
            dynamic_types,
        }
    }

    pub fn table(&self) -> &SymbolTable {
        self.table
    }

    /// Resolve an identifier. Fails only when neither the table nor the
    /// dynamic-type map has type information, which a well-formed trace
    /// never produces.
    pub fn resolve(&self, identifier: &str) -> Result<Lookup> {
        if let Some(symbol) = self.table.lookup(identifier) {
            return Ok(Lookup::Found(symbol.clone()));
        }
        match self.dynamic_types.get(identifier) {
            Some(ty) => {
                let symbol = Symbol::synthetic(identifier, ty.clone());
                debug!("synthesized symbol {} as {}", identifier, symbol.display_name);
                Ok(Lookup::Synthesized(symbol))
            }
            None => Err(SynthesisError::missing_type_info(identifier)),
        }
    }
}
