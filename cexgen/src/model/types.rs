//! Type model and symbol table
//!
//! Mirrors the shape of the verifier front end's static table: a flat
//! identifier-to-symbol map plus a tag-to-definition map for named types.
//! Array objects arrive encoded as two-field structs whose tag carries the
//! `java::array[` prefix; consumers recognize the tag and flatten.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::util::strip_scope;

/// Tag prefix marking the struct encoding of a Java array
pub const ARRAY_TAG_PREFIX: &str = "java::array[";

/// True if `tag` names the struct encoding of an array type
pub fn is_array_tag(tag: &str) -> bool {
    tag.starts_with(ARRAY_TAG_PREFIX)
}

/// True if `name` is an executor metadata member (class identifier, lock
/// word). Metadata members carry an `@` prefix and are never assigned as
/// real fields.
pub fn is_metadata_name(name: &str) -> bool {
    name.starts_with('@')
}

/// Java primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    Bool,
    Byte,
    Short,
    Int,
    Long,
    Char,
    Float,
    Double,
}

impl Primitive {
    /// Java source spelling of the primitive
    pub fn java_name(&self) -> &'static str {
        match self {
            Primitive::Bool => "boolean",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Char => "char",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }
}

/// Declared type of a symbol or value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    Void,
    Primitive(Primitive),
    /// Indirection into the table's type-definition map, resolved by `follow`
    Named(String),
    /// Pointer to the pointee; prints without any explicit indirection
    Reference(Box<Type>),
    Struct(StructType),
    /// Only the single largest member is ever populated in a value
    Union(StructType),
    Enum { tag: String },
    Array(Box<Type>),
    Function(FunctionType),
}

impl Type {
    /// True for types that render as Java primitives rather than references
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Void | Type::Primitive(_))
    }

    /// True if this is the struct encoding of an array
    pub fn is_array_struct(&self) -> bool {
        match self {
            Type::Struct(s) | Type::Union(s) => is_array_tag(&s.tag),
            _ => false,
        }
    }
}

/// Struct or union definition: a tag plus ordered members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructType {
    pub tag: String,
    pub members: Vec<Member>,
}

impl StructType {
    pub fn new(tag: impl Into<String>, members: Vec<Member>) -> Self {
        Self {
            tag: tag.into(),
            members,
        }
    }

    /// Look up a member by name
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Element type of an array-encoded struct, taken from the pointee of
    /// the `data` member
    pub fn array_element_type(&self) -> Option<&Type> {
        let data = self.member("data")?;
        match &data.ty {
            Type::Reference(elem) => Some(elem),
            Type::Array(elem) => Some(elem),
            _ => None,
        }
    }
}

/// One struct member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub ty: Type,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Function signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionType {
    pub parameters: Vec<Parameter>,
    pub ret: Box<Type>,
    pub constructor: bool,
}

impl FunctionType {
    /// True when a receiver parameter is present
    pub fn is_instance_method(&self) -> bool {
        self.parameters.iter().any(|p| p.this)
    }

    /// Parameters excluding the receiver
    pub fn explicit_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| !p.this)
    }

    /// The receiver parameter, if any
    pub fn receiver(&self) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.this)
    }
}

/// One declared parameter of a function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Identifier used to look the parameter's value up in the trace
    pub identifier: String,
    pub ty: Type,
    /// Receiver flag for instance methods
    pub this: bool,
}

/// Storage class of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageClass {
    StaticLifetime,
    Local,
    Parameter,
}

/// One table entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub identifier: String,
    pub ty: Type,
    /// Name used in generated source
    pub display_name: String,
    pub storage: StorageClass,
    /// Fabricated from trace type information rather than the static table
    pub synthetic: bool,
}

impl Symbol {
    pub fn new(
        identifier: impl Into<String>,
        ty: Type,
        display_name: impl Into<String>,
        storage: StorageClass,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            ty,
            display_name: display_name.into(),
            storage,
            synthetic: false,
        }
    }

    /// Build a placeholder symbol for a trace-only object. The display name
    /// strips the scope qualifier from the identifier.
    pub fn synthetic(identifier: impl Into<String>, ty: Type) -> Self {
        let identifier = identifier.into();
        let display_name = strip_scope(&identifier).to_string();
        Self {
            identifier,
            ty,
            display_name,
            storage: StorageClass::Local,
            synthetic: true,
        }
    }

    pub fn is_static_lifetime(&self) -> bool {
        self.storage == StorageClass::StaticLifetime
    }
}

/// Static symbol table: read-only oracle supplied by the front end
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Symbol>,
    types: BTreeMap<String, Type>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.identifier.clone(), symbol);
    }

    pub fn insert_type(&mut self, tag: impl Into<String>, ty: Type) {
        self.types.insert(tag.into(), ty);
    }

    pub fn lookup(&self, identifier: &str) -> Option<&Symbol> {
        self.symbols.get(identifier)
    }

    pub fn type_definition(&self, tag: &str) -> Option<&Type> {
        self.types.get(tag)
    }

    /// Resolve `Named` indirections down to the defining type. Unknown tags
    /// stop the chain; the hop bound guards against cyclic tag definitions.
    pub fn follow<'a>(&'a self, mut ty: &'a Type) -> &'a Type {
        let mut hops = 0;
        while let Type::Named(tag) = ty {
            match self.types.get(tag) {
                Some(next) if hops < 32 => {
                    ty = next;
                    hops += 1;
                }
                _ => break,
            }
        }
        ty
    }

    /// Display name for an identifier: the table entry's name when present,
    /// otherwise the identifier with its scope qualifier stripped
    pub fn display_of<'a>(&'a self, identifier: &'a str) -> &'a str {
        match self.symbols.get(identifier) {
            Some(symbol) => &symbol.display_name,
            None => strip_scope(identifier),
        }
    }
}

/// Executor-supplied types for objects created during the trace
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DynamicTypes {
    types: BTreeMap<String, Type>,
}

impl DynamicTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, identifier: impl Into<String>, ty: Type) {
        self.types.insert(identifier.into(), ty);
    }

    pub fn get(&self, identifier: &str) -> Option<&Type> {
        self.types.get(identifier)
    }
}
