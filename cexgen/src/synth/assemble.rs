//! Test assembly
//!
//! Orchestrates the full synthesis of one test class: scan the opaque-call
//! log to build the mock environment, reconstruct global state, bind the
//! entry function's parameters, then splice the sections into one JUnit
//! unit with the invocation under test.

use std::fmt::Write;

use log::{info, warn};

use crate::error::{Result, SynthesisError};
use crate::model::{
    is_metadata_name, Aggregate, DynamicTypes, FunctionType, InvocationRecord, OpaqueCallLog,
    OutputAssignment, Symbol, SymbolTable, Trace, Type, Value,
};
use crate::render::{JavaType, ValueRenderer, HARNESS_PACKAGE};
use crate::synth::gather::gather_static_roots;
use crate::synth::mock::{InitStatement, MockEnvironment};
use crate::synth::resolve::SymbolResolver;
use crate::util::{escape_identifier, strip_descriptor, strip_scope};

const INDENT: &str = "  ";

/// Synthesis configuration for one counterexample
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Identifier of the function under test
    pub entry_function: String,
    /// When disabled, every reference falls back to real construction
    pub mocking: bool,
    /// Class-name prefixes that are never mocked
    pub excluded_namespaces: Vec<String>,
    /// Verifier goal labels covered by this trace
    pub goals: Vec<String>,
}

impl SynthesisOptions {
    pub fn new(entry_function: impl Into<String>) -> Self {
        Self {
            entry_function: entry_function.into(),
            mocking: true,
            excluded_namespaces: vec!["java.".to_string()],
            goals: Vec::new(),
        }
    }

    pub fn without_mocks(mut self) -> Self {
        self.mocking = false;
        self
    }

    pub fn with_excluded_namespace(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_namespaces.push(prefix.into());
        self
    }

    pub fn with_goals(mut self, goals: Vec<String>) -> Self {
        self.goals = goals;
        self
    }
}

/// Whether the assembled test invokes the entry function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Complete,
    /// A declared parameter had no trace value, so the invocation is
    /// omitted and the unit is setup only
    SetupOnly,
}

/// One synthesized test unit
#[derive(Debug, Clone)]
pub struct SynthesizedTest {
    pub source: String,
    pub emission: Emission,
}

/// Synthesize one test class reproducing the recorded trace
pub fn synthesize(
    table: &SymbolTable,
    dynamic_types: &DynamicTypes,
    trace: &Trace,
    opaque_calls: &OpaqueCallLog,
    options: &SynthesisOptions,
) -> Result<SynthesizedTest> {
    info!("synthesizing test for {}", options.entry_function);
    let resolver = SymbolResolver::new(table, dynamic_types);
    let assembler = Assembler::new(&resolver, trace, options);
    assembler.assemble(opaque_calls)
}

/// Everything known about one opaque call site
struct CallDescriptor {
    class: String,
    method: String,
    signature: FunctionType,
    arg_types: Vec<JavaType>,
    ret_type: Type,
    ret: JavaType,
}

impl CallDescriptor {
    fn qualified_name(&self) -> String {
        format!("{}.{}", self.class, self.method)
    }
}

struct Assembler<'a> {
    resolver: &'a SymbolResolver<'a>,
    renderer: ValueRenderer<'a>,
    trace: &'a Trace,
    options: &'a SynthesisOptions,
    env: MockEnvironment,
}

impl<'a> Assembler<'a> {
    fn new(
        resolver: &'a SymbolResolver<'a>,
        trace: &'a Trace,
        options: &'a SynthesisOptions,
    ) -> Self {
        Self {
            resolver,
            renderer: ValueRenderer::new(resolver.table()),
            trace,
            options,
            env: MockEnvironment::new(2 * INDENT.len()),
        }
    }

    fn assemble(mut self, opaque_calls: &OpaqueCallLog) -> Result<SynthesizedTest> {
        let options = self.options;
        let entry = match self.resolver.table().lookup(&options.entry_function) {
            Some(symbol) => symbol.clone(),
            None => return Err(SynthesisError::unknown_entry_function(&options.entry_function)),
        };
        let signature = match &entry.ty {
            Type::Function(f) => f.clone(),
            _ => return Err(SynthesisError::not_a_function(&options.entry_function)),
        };

        // The mock-class set must be complete before any reference is
        // rendered, since rendering picks mock or real per class.
        if options.mocking {
            self.scan_opaque_calls(opaque_calls)?;
        }

        let mut globals = String::new();
        self.add_global_state(&mut globals)?;

        let mut params = String::new();
        let emission = self.add_parameters(&mut params, &signature)?;

        let mut invocation = String::new();
        if emission == Emission::Complete {
            self.add_invocation(&mut invocation, &entry, &signature)?;
        } else {
            warn!("no call emitted for {}", options.entry_function);
        }

        let annotations = self.env.class_annotations()?;
        let env = self.env;
        let prelude = env.prelude().to_string();
        // Deferred stubs come last: parameter rendering above may have
        // registered further call sites.
        let stubs = env.finalise()?;

        let name = escape_identifier(&entry.display_name);
        let goal_comment = render_goal_comment(&options.goals)?;

        let mut source = String::new();
        source.push_str(&annotations);
        writeln!(source, "public class {name}Test {{")?;
        writeln!(
            source,
            "{INDENT}@org.junit.Test public void test{name}() throws Exception {{"
        )?;
        let sections = [goal_comment, prelude, globals, stubs, params, invocation];
        let body: Vec<&str> = sections
            .iter()
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        if !body.is_empty() {
            source.push('\n');
            source.push_str(&body.join("\n"));
        }
        writeln!(source, "{INDENT}}}")?;
        writeln!(source, "}}")?;

        Ok(SynthesizedTest { source, emission })
    }

    /// Two passes over the log: collect the mock-eligible classes, then
    /// emit or accumulate one intercept per recorded invocation.
    fn scan_opaque_calls(&mut self, opaque_calls: &OpaqueCallLog) -> Result<()> {
        for (function, _records) in opaque_calls.iter() {
            let class = self.opaque_class_of(function)?;
            if self.is_excluded(&class) {
                continue;
            }
            self.env.mock_class(&class);
        }
        for (function, records) in opaque_calls.iter() {
            let class = self.opaque_class_of(function)?;
            if self.is_excluded(&class) {
                continue;
            }
            let descriptor = self.call_descriptor(function, records)?;
            for record in records {
                self.add_mock_call(&descriptor, record)?;
            }
        }
        Ok(())
    }

    fn is_excluded(&self, class: &str) -> bool {
        self.options
            .excluded_namespaces
            .iter()
            .any(|prefix| class.starts_with(prefix.as_str()))
    }

    fn opaque_class_of(&self, function: &str) -> Result<String> {
        let symbol = self.resolver.resolve(function)?.into_symbol();
        match split_call_name(&symbol.display_name) {
            Some((class, _)) => Ok(class),
            None => Err(SynthesisError::malformed_opaque_call(
                function,
                "function name has no class qualifier",
            )),
        }
    }

    fn call_descriptor(
        &self,
        function: &str,
        records: &[InvocationRecord],
    ) -> Result<CallDescriptor> {
        let symbol = self.resolver.resolve(function)?.into_symbol();
        let signature = match &symbol.ty {
            Type::Function(f) => f.clone(),
            _ => return Err(SynthesisError::not_a_function(function)),
        };
        let (class, method) = match split_call_name(&symbol.display_name) {
            Some(parts) => parts,
            None => {
                return Err(SynthesisError::malformed_opaque_call(
                    function,
                    "function name has no class qualifier",
                ))
            }
        };
        let last_record = records.last().ok_or_else(|| {
            SynthesisError::malformed_opaque_call(function, "no recorded invocations")
        })?;
        let last_assignment = last_record.final_assignment().ok_or_else(|| {
            SynthesisError::malformed_opaque_call(function, "invocation record carries no outputs")
        })?;
        // The executor scrubs declared return types, so the type is
        // recovered from the last recorded output.
        let ret_type = self.opaque_return_type(last_assignment)?;
        let arg_types = signature
            .explicit_parameters()
            .map(|p| self.renderer.java_type(&p.ty))
            .collect();
        let ret = self.renderer.java_type(&ret_type);
        Ok(CallDescriptor {
            class,
            method,
            signature,
            arg_types,
            ret_type,
            ret,
        })
    }

    fn opaque_return_type(&self, assignment: &OutputAssignment) -> Result<Type> {
        match &assignment.value {
            Value::Cast { ty, .. } => Ok(ty.clone()),
            Value::Aggregate(a) => Ok(a.ty.clone()),
            _ => Ok(self.resolver.resolve(&assignment.identifier)?.into_symbol().ty),
        }
    }

    /// Turn one recorded invocation into an intercept. Primitive returns
    /// render directly; object returns build the returned instance in an
    /// anonymous prelude scope first.
    fn add_mock_call(&mut self, descriptor: &CallDescriptor, record: &InvocationRecord) -> Result<()> {
        let final_assignment = record.final_assignment().ok_or_else(|| {
            SynthesisError::malformed_opaque_call(
                descriptor.qualified_name(),
                "invocation record carries no outputs",
            )
        })?;

        let return_value = if descriptor.ret.primitive {
            self.renderer
                .value_expr(&final_assignment.value, Some(&descriptor.ret_type))
        } else {
            let mock_name = self.env.fresh_instance_name();
            let mut statements = vec![
                InitStatement::statement(format!("{} {}", descriptor.ret.name, mock_name)),
                // The construction chain's names recur when the same stub
                // fires twice, so the chain lives in its own scope.
                InitStatement::ScopeOpen,
            ];
            for assignment in &record.assignments {
                let symbol = self.resolver.resolve(&assignment.identifier)?.into_symbol();
                for line in self.declare_and_assign(&symbol, Some(&assignment.value))? {
                    statements.push(InitStatement::Statement(line));
                }
            }
            let last_name = self
                .resolver
                .table()
                .display_of(&final_assignment.identifier)
                .to_string();
            statements.push(InitStatement::statement(format!("{mock_name} = {last_name}")));
            statements.push(InitStatement::ScopeClose);
            self.env.add_to_prelude(statements);
            mock_name
        };

        if !descriptor.signature.is_instance_method() {
            self.env.static_call(
                &descriptor.class,
                &descriptor.method,
                &descriptor.arg_types,
                &return_value,
            );
        } else if descriptor.signature.constructor {
            let caller = caller_class(&record.calling_function).ok_or_else(|| {
                SynthesisError::malformed_opaque_call(
                    descriptor.qualified_name(),
                    "constructor caller has no class qualifier",
                )
            })?;
            self.env
                .constructor_call(&caller, &descriptor.class, &return_value);
        } else {
            self.env.instance_call(
                &descriptor.class,
                &descriptor.method,
                &descriptor.arg_types,
                &return_value,
            );
        }
        Ok(())
    }

    /// Reconstruct every static-lifetime object reachable from the entry
    /// function's inputs
    fn add_global_state(&self, out: &mut String) -> Result<()> {
        let declarations = gather_static_roots(self.resolver, self.trace)?;
        for symbol in &declarations {
            let statements =
                self.declare_and_assign(symbol, self.trace.value_of(&symbol.identifier))?;
            self.write_statements(out, statements)?;
        }
        Ok(())
    }

    /// Bind the entry function's declared parameters from the trace.
    /// Unbound parameters are declared without a value and downgrade the
    /// unit to setup only.
    fn add_parameters(&self, out: &mut String, signature: &FunctionType) -> Result<Emission> {
        let mut emission = Emission::Complete;
        for parameter in &signature.parameters {
            if parameter.this {
                // The receiver is rendered inline at the invocation.
                if self.trace.value_of(&parameter.identifier).is_none() {
                    warn!("no trace value for receiver {}", parameter.identifier);
                    emission = Emission::SetupOnly;
                }
                continue;
            }
            let symbol = self.resolver.resolve(&parameter.identifier)?.into_symbol();
            match self.trace.value_of(&parameter.identifier) {
                Some(value) => {
                    let statements = self.declare_and_assign(&symbol, Some(value))?;
                    self.write_statements(out, statements)?;
                }
                None => {
                    warn!("missing trace value for parameter {}", symbol.display_name);
                    emission = Emission::SetupOnly;
                    let statements = self.declare_and_assign(&symbol, None)?;
                    self.write_statements(out, statements)?;
                }
            }
        }
        Ok(emission)
    }

    /// The invocation under test, capturing a `retval` unless the entry
    /// function returns void
    fn add_invocation(&self, out: &mut String, entry: &Symbol, signature: &FunctionType) -> Result<()> {
        let pad = INDENT.repeat(2);
        let callee = base_call_name(&entry.display_name);
        let args: Vec<String> = signature
            .explicit_parameters()
            .map(|p| self.resolver.table().display_of(&p.identifier).to_string())
            .collect();
        let call = match signature.receiver() {
            Some(receiver) => {
                let method = match callee.rfind('.') {
                    Some(idx) => &callee[idx + 1..],
                    None => callee,
                };
                // Presence was checked while binding parameters.
                let receiver_expr = match self.trace.value_of(&receiver.identifier) {
                    Some(value) => self.renderer.value_expr(value, Some(&receiver.ty)),
                    None => return Ok(()),
                };
                format!("{receiver_expr}.{method}({})", args.join(", "))
            }
            None => format!("{callee}({})", args.join(", ")),
        };
        if matches!(self.resolver.table().follow(&signature.ret), Type::Void) {
            writeln!(out, "{pad}{call};")?;
        } else {
            let ret = self.renderer.type_name(&signature.ret);
            writeln!(out, "{pad}{ret} retval = {call};")?;
        }
        Ok(())
    }

    /// Statements declaring `symbol` and reconstructing `value` into it.
    /// Scalars and references assign directly; array encodings flatten to
    /// an initializer; objects are force-constructed or mocked, then their
    /// fields set reflectively.
    fn declare_and_assign(&self, symbol: &Symbol, value: Option<&Value>) -> Result<Vec<String>> {
        let java = self.renderer.java_type(&symbol.ty);
        let name = &symbol.display_name;
        let value = match value {
            Some(v) => v,
            None => return Ok(vec![format!("{} {}", java.name, name)]),
        };
        match value.as_aggregate() {
            Some(aggregate) => {
                if self.resolver.table().follow(&aggregate.ty).is_array_struct() {
                    Ok(vec![format!(
                        "{} {} = {}",
                        java.name,
                        name,
                        self.renderer.new_array_expr(aggregate)
                    )])
                } else {
                    self.object_statements(symbol, aggregate)
                }
            }
            None => Ok(vec![format!(
                "{} {} = {}",
                java.name,
                name,
                self.renderer.value_expr(value, Some(&symbol.ty))
            )]),
        }
    }

    fn object_statements(&self, symbol: &Symbol, aggregate: &Aggregate) -> Result<Vec<String>> {
        let declared = self.renderer.type_name(&symbol.ty);
        let class = self.renderer.type_name(&aggregate.ty);
        let name = &symbol.display_name;
        let mut statements = Vec::new();
        if self.env.is_mocked(&class) {
            statements.push(format!(
                "{declared} {name} = ({class}) {}",
                self.env.mock_expression(&class)
            ));
            statements.push(self.env.register_instance(&class, name));
        } else {
            statements.push(format!(
                "{declared} {name} = ({class}) {HARNESS_PACKAGE}.Reflector.forceInstance(\"{class}\")"
            ));
        }
        self.member_statements(&mut statements, name, aggregate)?;
        Ok(statements)
    }

    /// Field assignments for one object. Inline struct members are
    /// inheritance blocks and flatten onto the same instance; `@`-named
    /// scalar members are executor metadata and are skipped.
    fn member_statements(
        &self,
        statements: &mut Vec<String>,
        instance: &str,
        aggregate: &Aggregate,
    ) -> Result<()> {
        let definition = match self.resolver.table().follow(&aggregate.ty) {
            Type::Struct(s) | Type::Union(s) => Some(s),
            _ => None,
        };
        for (index, field) in aggregate.fields.iter().enumerate() {
            let member_def = field
                .member
                .as_deref()
                .and_then(|n| definition.and_then(|d| d.member(n)))
                .or_else(|| definition.and_then(|d| d.members.get(index)));
            let name = match field.member.as_deref().or(member_def.map(|m| m.name.as_str())) {
                Some(n) => n,
                None => continue,
            };
            if let Some(inner) = field.value.as_aggregate() {
                let followed = self.resolver.table().follow(&inner.ty);
                if matches!(followed, Type::Struct(_) | Type::Union(_))
                    && !followed.is_array_struct()
                {
                    self.member_statements(statements, instance, inner)?;
                    continue;
                }
            }
            if is_metadata_name(name) {
                continue;
            }
            let expected = member_def.map(|m| &m.ty);
            let expr = match field.value.as_aggregate() {
                Some(inner) => self.renderer.new_array_expr(inner),
                None => self.renderer.value_expr(&field.value, expected),
            };
            statements.push(format!(
                "{HARNESS_PACKAGE}.Reflector.setInstanceField({instance}, \"{name}\", {expr})"
            ));
        }
        Ok(())
    }

    fn write_statements(&self, out: &mut String, statements: Vec<String>) -> Result<()> {
        let pad = INDENT.repeat(2);
        for statement in statements {
            writeln!(out, "{pad}{statement};")?;
        }
        Ok(())
    }
}

/// Class and method parts of a qualified function display name
fn split_call_name(display: &str) -> Option<(String, String)> {
    let qualified = base_call_name(display);
    let idx = qualified.rfind('.')?;
    Some((qualified[..idx].to_string(), qualified[idx + 1..].to_string()))
}

/// Dotted call name with scope qualifier, descriptor and parameter list
/// removed
fn base_call_name(display: &str) -> &str {
    let qualified = strip_descriptor(strip_scope(display));
    match qualified.find('(') {
        Some(idx) => &qualified[..idx],
        None => qualified,
    }
}

/// Class enclosing the function a constructor call was recorded in
fn caller_class(calling_function: &str) -> Option<String> {
    let qualified = base_call_name(calling_function);
    let idx = qualified.rfind('.')?;
    Some(qualified[..idx].to_string())
}

fn render_goal_comment(goals: &[String]) -> Result<String> {
    let mut out = String::new();
    if goals.is_empty() {
        return Ok(out);
    }
    let pad = INDENT.repeat(2);
    writeln!(out, "{pad}// Covered goals:")?;
    for goal in goals {
        writeln!(out, "{pad}// {goal}")?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Parameter, Primitive, StorageClass, HARNESS_FUNCTION};

    fn int() -> Type {
        Type::Primitive(Primitive::Int)
    }

    fn entry_fn(parameters: Vec<Parameter>, ret: Type) -> Type {
        Type::Function(FunctionType {
            parameters,
            ret: Box::new(ret),
            constructor: false,
        })
    }

    fn parameter(identifier: &str, ty: Type) -> Parameter {
        Parameter {
            identifier: identifier.to_string(),
            ty,
            this: false,
        }
    }

    fn fixture(ret: Type) -> (SymbolTable, DynamicTypes, Trace) {
        let mut table = SymbolTable::new();
        table.insert(Symbol::new(
            "java::my.pkg.A.foo",
            entry_fn(vec![parameter("java::my.pkg.A.foo::arg0", int())], ret),
            "my.pkg.A.foo",
            StorageClass::Local,
        ));
        table.insert(Symbol::new(
            "java::my.pkg.A.foo::arg0",
            int(),
            "arg0",
            StorageClass::Parameter,
        ));
        (table, DynamicTypes::new(), Trace::new())
    }

    #[test]
    fn test_static_invocation_captures_return() {
        let (table, dynamic, mut trace) = fixture(int());
        trace.record("java::my.pkg.A.foo::arg0", Value::int(5), HARNESS_FUNCTION);
        let options = SynthesisOptions::new("java::my.pkg.A.foo");
        let test = synthesize(&table, &dynamic, &trace, &OpaqueCallLog::new(), &options).unwrap();
        assert_eq!(test.emission, Emission::Complete);
        assert!(test.source.contains("public class my_pkg_A_fooTest {"));
        assert!(test.source.contains("    int arg0 = 5;\n"));
        assert!(test.source.contains("    int retval = my.pkg.A.foo(arg0);\n"));
    }

    #[test]
    fn test_void_entry_has_no_capture() {
        let (table, dynamic, mut trace) = fixture(Type::Void);
        trace.record("java::my.pkg.A.foo::arg0", Value::int(1), HARNESS_FUNCTION);
        let options = SynthesisOptions::new("java::my.pkg.A.foo");
        let test = synthesize(&table, &dynamic, &trace, &OpaqueCallLog::new(), &options).unwrap();
        assert!(!test.source.contains("retval"));
        assert!(test.source.contains("    my.pkg.A.foo(arg0);\n"));
    }

    #[test]
    fn test_unbound_parameter_downgrades_to_setup_only() {
        let (table, dynamic, trace) = fixture(int());
        let options = SynthesisOptions::new("java::my.pkg.A.foo");
        let test = synthesize(&table, &dynamic, &trace, &OpaqueCallLog::new(), &options).unwrap();
        assert_eq!(test.emission, Emission::SetupOnly);
        assert!(test.source.contains("    int arg0;\n"));
        assert!(!test.source.contains("retval"));
        assert!(!test.source.contains("my.pkg.A.foo(arg0)"));
    }

    #[test]
    fn test_unknown_entry_function_is_fatal() {
        let (table, dynamic, trace) = fixture(int());
        let options = SynthesisOptions::new("java::my.pkg.B.bar");
        let err = synthesize(&table, &dynamic, &trace, &OpaqueCallLog::new(), &options)
            .unwrap_err();
        assert!(matches!(err, SynthesisError::UnknownEntryFunction { .. }));
    }

    #[test]
    fn test_goal_comment_under_header() {
        let (table, dynamic, mut trace) = fixture(int());
        trace.record("java::my.pkg.A.foo::arg0", Value::int(2), HARNESS_FUNCTION);
        let options = SynthesisOptions::new("java::my.pkg.A.foo")
            .with_goals(vec!["my.pkg.A.foo.assertion.1".to_string()]);
        let test = synthesize(&table, &dynamic, &trace, &OpaqueCallLog::new(), &options).unwrap();
        assert!(test.source.contains("    // Covered goals:\n    // my.pkg.A.foo.assertion.1\n"));
    }

    #[test]
    fn test_split_call_name() {
        assert_eq!(
            split_call_name("my.pkg.C.f"),
            Some(("my.pkg.C".to_string(), "f".to_string()))
        );
        assert_eq!(
            split_call_name("java::my.pkg.C.f:(I)V"),
            Some(("my.pkg.C".to_string(), "f".to_string()))
        );
        assert_eq!(split_call_name("unqualified"), None);
    }

    #[test]
    fn test_caller_class() {
        assert_eq!(
            caller_class("java::my.pkg.Caller.m"),
            Some("my.pkg.Caller".to_string())
        );
        assert_eq!(caller_class("lone"), None);
    }
}
