//! Recorded runtime values
//!
//! The interpreter reports every relevant variable's final value as a tree:
//! scalar constants, references to other recorded objects, and typed
//! aggregates for struct, union and array-encoded objects.

use serde::{Deserialize, Serialize};

use super::types::Type;

/// One recorded value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(Constant),
    /// Address-of a storage location; the address-of itself never prints
    Reference(Target),
    Aggregate(Aggregate),
    /// Typed wrapper around another value
    Cast { ty: Type, value: Box<Value> },
}

impl Value {
    pub fn int(n: i64) -> Self {
        Value::Scalar(Constant::Int(n))
    }

    pub fn reference_to(identifier: impl Into<String>) -> Self {
        Value::Reference(Target::Symbol {
            identifier: identifier.into(),
        })
    }

    pub fn null() -> Self {
        Value::Scalar(Constant::Null)
    }

    /// Peel typed wrappers down to the underlying value
    pub fn peeled(&self) -> &Value {
        let mut v = self;
        while let Value::Cast { value, .. } = v {
            v = value;
        }
        v
    }

    pub fn as_aggregate(&self) -> Option<&Aggregate> {
        match self.peeled() {
            Value::Aggregate(a) => Some(a),
            _ => None,
        }
    }
}

/// Scalar constant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Typed aggregate: ordered members for structs and unions, the
/// (length, data) pair for array-encoded objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub ty: Type,
    pub fields: Vec<Field>,
}

impl Aggregate {
    pub fn new(ty: Type, fields: Vec<Field>) -> Self {
        Self { ty, fields }
    }

    /// The `data` field of an array-encoded aggregate. Falls back to the
    /// second field when members are positional.
    pub fn data_field(&self) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.member.as_deref() == Some("data"))
            .or_else(|| self.fields.get(1))
            .map(|f| &f.value)
    }

    /// Element values of an array-encoded aggregate, flattened from the
    /// data member and discarding the length
    pub fn array_elements(&self) -> Option<&[Field]> {
        Some(&self.data_field()?.as_aggregate()?.fields)
    }
}

/// One aggregate member value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Member name; absent for positional array elements
    pub member: Option<String>,
    pub value: Value,
}

impl Field {
    pub fn named(member: impl Into<String>, value: Value) -> Self {
        Self {
            member: Some(member.into()),
            value,
        }
    }

    pub fn positional(value: Value) -> Self {
        Self {
            member: None,
            value,
        }
    }
}

/// Lvalue path a reference points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    Symbol { identifier: String },
    Member { base: Box<Target>, name: String },
    Element { base: Box<Target>, index: usize },
    Null,
    /// Raw address with no traceable storage behind it
    Opaque { address: u64 },
}

impl Target {
    /// The symbol a reference chain bottoms out at, unwrapping member and
    /// index access. `None` for null and computed addresses.
    pub fn root_symbol(&self) -> Option<&str> {
        match self {
            Target::Symbol { identifier } => Some(identifier),
            Target::Member { base, .. } => base.root_symbol(),
            Target::Element { base, .. } => base.root_symbol(),
            Target::Null | Target::Opaque { .. } => None,
        }
    }
}
