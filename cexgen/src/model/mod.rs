//! Data model: symbol table, types, recorded values, trace and call log

mod trace;
mod types;
mod value;

pub use trace::*;
pub use types::*;
pub use value::*;
