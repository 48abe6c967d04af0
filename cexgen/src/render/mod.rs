//! Java source rendering for recorded values
//!
//! Turns one structured value or type into literal and declaration text.
//! Rendering is mechanical: type names, scalar literals, lvalue paths and
//! string escaping. Address-of is elided, array-encoded structs print as
//! `T[]`, and struct tags print without their scope qualifier.

use crate::model::{
    is_array_tag, Aggregate, Constant, Primitive, SymbolTable, Target, Type, Value,
};

/// Reflection harness package used by generated tests
pub const HARNESS_PACKAGE: &str = "com.diffblue.java_testcase";

/// A rendered Java type: its source spelling and whether it is primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaType {
    pub name: String,
    pub primitive: bool,
}

/// Strip the scope qualifier from a class tag: `java::my.pkg.C` prints
/// as `my.pkg.C`
pub fn clean_class_name(tag: &str) -> &str {
    tag.strip_prefix("java::").unwrap_or(tag)
}

/// Escape a string for a Java string literal
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || (c as u32) > 0x7e => {
                // Java reads exactly four hex digits after \u, so
                // supplementary plane characters escape per UTF-16 unit.
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            c => out.push(c),
        }
    }
    out
}

/// Renders values and types against one symbol table
pub struct ValueRenderer<'a> {
    table: &'a SymbolTable,
}

impl<'a> ValueRenderer<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        Self { table }
    }

    /// Java source spelling of a type
    pub fn type_name(&self, ty: &Type) -> String {
        match ty {
            Type::Void => "void".to_string(),
            Type::Primitive(p) => p.java_name().to_string(),
            Type::Named(tag) if is_array_tag(tag) => match self.table.type_definition(tag) {
                Some(def) => self.type_name(def),
                None => "java.lang.Object[]".to_string(),
            },
            Type::Named(tag) => clean_class_name(tag).to_string(),
            Type::Reference(pointee) => match pointee.as_ref() {
                Type::Void => "java.lang.Object".to_string(),
                other => self.type_name(other),
            },
            Type::Struct(s) | Type::Union(s) if is_array_tag(&s.tag) => {
                match s.array_element_type() {
                    Some(elem) => format!("{}[]", self.type_name(elem)),
                    None => "java.lang.Object[]".to_string(),
                }
            }
            Type::Struct(s) | Type::Union(s) => clean_class_name(&s.tag).to_string(),
            Type::Enum { tag } => clean_class_name(tag).to_string(),
            Type::Array(elem) => format!("{}[]", self.type_name(elem)),
            Type::Function(_) => "java.lang.Object".to_string(),
        }
    }

    /// Rendered type plus its primitive flag
    pub fn java_type(&self, ty: &Type) -> JavaType {
        JavaType {
            name: self.type_name(ty),
            primitive: self.table.follow(ty).is_primitive(),
        }
    }

    /// Render a scalar constant. The expected type picks literal suffixes
    /// and recovers booleans and enum constants the executor stores as
    /// integers.
    pub fn literal(&self, constant: &Constant, expected: Option<&Type>) -> String {
        let expected = expected.map(|t| self.table.follow(t));
        match constant {
            Constant::Null => "null".to_string(),
            Constant::Bool(b) => b.to_string(),
            Constant::Int(n) => match expected {
                Some(Type::Primitive(Primitive::Bool)) => (*n != 0).to_string(),
                Some(Type::Primitive(Primitive::Long)) => format!("{n}L"),
                Some(Type::Primitive(Primitive::Char)) => format!("(char) {n}"),
                Some(Type::Primitive(Primitive::Float)) => format!("{n}.0f"),
                Some(Type::Primitive(Primitive::Double)) => format!("{n}.0"),
                Some(Type::Enum { tag }) => {
                    format!("{}.values()[{n}]", clean_class_name(tag))
                }
                Some(Type::Reference(_)) if *n == 0 => "null".to_string(),
                _ => n.to_string(),
            },
            Constant::Float(x) => {
                let float = matches!(expected, Some(Type::Primitive(Primitive::Float)));
                render_float(*x, float)
            }
            Constant::Str(s) => format!("\"{}\"", escape_string(s)),
        }
    }

    /// Render the lvalue path a reference points at. Untraceable targets
    /// render as `null`.
    pub fn lvalue(&self, target: &Target) -> String {
        match target {
            Target::Symbol { identifier } => self.table.display_of(identifier).to_string(),
            Target::Member { base, name } => format!("{}.{}", self.lvalue(base), name),
            Target::Element { base, index } => format!("{}[{}]", self.lvalue(base), index),
            Target::Null | Target::Opaque { .. } => "null".to_string(),
        }
    }

    /// Render a value in expression position
    pub fn value_expr(&self, value: &Value, expected: Option<&Type>) -> String {
        match value {
            Value::Scalar(c) => self.literal(c, expected),
            Value::Reference(target) => self.lvalue(target),
            Value::Aggregate(a) => self.aggregate_expr(a),
            Value::Cast { ty, value } => match value.peeled() {
                Value::Aggregate(a) => self.aggregate_expr(a),
                inner => format!("({}) {}", self.type_name(ty), self.value_expr(inner, None)),
            },
        }
    }

    /// Expression form of an aggregate: a `new T[] {..}` initializer for
    /// array encodings, a bare reflective construction otherwise
    fn aggregate_expr(&self, aggregate: &Aggregate) -> String {
        let followed = self.table.follow(&aggregate.ty);
        if followed.is_array_struct() {
            return self.new_array_expr(aggregate);
        }
        let class = self.type_name(&aggregate.ty);
        format!("({class}) {HARNESS_PACKAGE}.Reflector.forceInstance(\"{class}\")")
    }

    /// `new T[] {e0, e1, ..}` for an array-encoded aggregate
    pub fn new_array_expr(&self, aggregate: &Aggregate) -> String {
        let followed = self.table.follow(&aggregate.ty);
        let element = match followed {
            Type::Struct(s) | Type::Union(s) => s.array_element_type(),
            _ => None,
        };
        let element_name = match element {
            Some(ty) => self.type_name(ty),
            None => "java.lang.Object".to_string(),
        };
        match aggregate.array_elements() {
            Some(fields) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|f| self.value_expr(&f.value, element))
                    .collect();
                format!("new {}[] {{{}}}", element_name, rendered.join(", "))
            }
            // The data member aliases another array rather than listing
            // elements.
            None => match aggregate.data_field() {
                Some(data) => self.value_expr(data, None),
                None => "null".to_string(),
            },
        }
    }
}

fn render_float(x: f64, float: bool) -> String {
    let suffix = if float { "f" } else { "" };
    if x.is_nan() {
        return if float { "Float.NaN".to_string() } else { "Double.NaN".to_string() };
    }
    if x.is_infinite() {
        let class = if float { "Float" } else { "Double" };
        let sign = if x > 0.0 { "POSITIVE" } else { "NEGATIVE" };
        return format!("{class}.{sign}_INFINITY");
    }
    let mut body = format!("{x}");
    if !body.contains('.') && !body.contains('e') {
        body.push_str(".0");
    }
    format!("{body}{suffix}")
}
