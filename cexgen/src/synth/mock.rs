//! Mock environment accumulation
//!
//! Opaque calls observed in the log become intercept statements. Static and
//! constructor intercepts are emitted immediately into the prelude; instance
//! intercepts accumulate per call-site signature and are written as chained
//! answer stubs by `finalise`, once every call site is known.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

use crate::error::Result;
use crate::render::{JavaType, HARNESS_PACKAGE};

/// One interceptable call-site shape. Parameter types are rendered Java
/// names, so two overloads never collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MethodSignature {
    pub class: String,
    pub method: String,
    pub parameter_types: Vec<String>,
}

impl MethodSignature {
    pub fn new(class: impl Into<String>, method: impl Into<String>, parameter_types: Vec<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            parameter_types,
        }
    }
}

/// One line of mock setup. Scope markers wrap statement groups whose local
/// names may recur when the same stub fires more than once.
#[derive(Debug, Clone)]
pub enum InitStatement {
    Statement(String),
    ScopeOpen,
    ScopeClose,
}

impl InitStatement {
    pub fn statement(text: impl Into<String>) -> Self {
        Self::Statement(text.into())
    }
}

/// Per-run mock registration state. Created once per synthesis, mutated
/// while calls are discovered, consumed exactly once by `finalise`.
pub struct MockEnvironment {
    /// Classes whose references must be mock instances, not real objects
    mock_classes: BTreeSet<String>,
    /// Classes the test runner must prepare for interception
    prepare_classes: BTreeSet<String>,
    /// Classes whose static half has already been mocked
    static_mocked: BTreeSet<String>,
    /// Recorded return renderings per instance call site, in trace order
    instance_answers: BTreeMap<MethodSignature, Vec<String>>,
    /// Setup statements preceding the test entry point
    prelude: String,
    /// Column width of the statement indent
    indent: usize,
    scope_depth: usize,
    instance_counter: usize,
}

impl MockEnvironment {
    pub fn new(indent: usize) -> Self {
        Self {
            mock_classes: BTreeSet::new(),
            prepare_classes: BTreeSet::new(),
            static_mocked: BTreeSet::new(),
            instance_answers: BTreeMap::new(),
            prelude: String::new(),
            indent,
            scope_depth: 0,
            instance_counter: 0,
        }
    }

    /// Mark a class as mock-eligible. References to it render as mock
    /// instances from here on.
    pub fn mock_class(&mut self, class: &str) {
        self.mock_classes.insert(class.to_string());
    }

    pub fn is_mocked(&self, class: &str) -> bool {
        self.mock_classes.contains(class)
    }

    /// Expression producing a fresh mock instance of `class`
    pub fn mock_expression(&self, class: &str) -> String {
        format!("org.mockito.Mockito.mock({class}.class)")
    }

    /// Statement attaching an existing mock instance to the answer table,
    /// so chained stubs apply to it
    pub fn register_instance(&self, class: &str, instance: &str) -> String {
        format!("{HARNESS_PACKAGE}.AnswerTable.register({class}.class, {instance})")
    }

    /// Run-unique name for a synthetic instance
    pub fn fresh_instance_name(&mut self) -> String {
        let name = format!("mock_instance_{}", self.instance_counter);
        self.instance_counter += 1;
        name
    }

    /// Append setup statements to the prelude, tracking scope nesting
    pub fn add_to_prelude(&mut self, statements: Vec<InitStatement>) {
        for statement in statements {
            match statement {
                InitStatement::Statement(text) => {
                    let pad = self.pad();
                    self.prelude.push_str(&pad);
                    self.prelude.push_str(&text);
                    self.prelude.push_str(";\n");
                }
                InitStatement::ScopeOpen => {
                    let pad = self.pad();
                    self.prelude.push_str(&pad);
                    self.prelude.push_str("{\n");
                    self.scope_depth += 1;
                }
                InitStatement::ScopeClose => {
                    self.scope_depth = self.scope_depth.saturating_sub(1);
                    let pad = self.pad();
                    self.prelude.push_str(&pad);
                    self.prelude.push_str("}\n");
                }
            }
        }
    }

    fn pad(&self) -> String {
        " ".repeat(self.indent + 2 * self.scope_depth)
    }

    /// Record an instance call. No code is emitted now; the rendered return
    /// value joins the answer sequence for this signature.
    pub fn instance_call(
        &mut self,
        class: &str,
        method: &str,
        arg_types: &[JavaType],
        retval: &str,
    ) {
        let signature = MethodSignature::new(class, method, type_names(arg_types));
        self.instance_answers
            .entry(signature)
            .or_default()
            .push(retval.to_string());
    }

    /// Intercept the next static call to `class.method(...)`. The class's
    /// static half is mocked on first encounter only; repeats just stack
    /// another substitution.
    pub fn static_call(&mut self, class: &str, method: &str, arg_types: &[JavaType], retval: &str) {
        self.prepare_classes.insert(class.to_string());
        let mut statements = Vec::new();
        if self.static_mocked.insert(class.to_string()) {
            statements.push(InitStatement::statement(format!(
                "org.powermock.api.mockito.PowerMockito.mockStatic({class}.class)"
            )));
        }
        let matchers = matcher_list(arg_types);
        statements.push(InitStatement::statement(format!(
            "org.mockito.Mockito.when({class}.{method}({matchers})).thenReturn({retval})"
        )));
        self.add_to_prelude(statements);
    }

    /// Return `retval` the next time `class` is constructed. The caller's
    /// class is prepared too, since the interception rewrites its bytecode.
    pub fn constructor_call(&mut self, caller_class: &str, class: &str, retval: &str) {
        self.prepare_classes.insert(class.to_string());
        self.prepare_classes.insert(caller_class.to_string());
        self.add_to_prelude(vec![InitStatement::statement(format!(
            "org.powermock.api.mockito.PowerMockito.whenNew({class}.class).withAnyArguments().thenReturn({retval})"
        ))]);
    }

    /// Annotations the test class needs to run its mocks
    pub fn class_annotations(&self) -> Result<String> {
        let mut out = String::new();
        if self.mock_classes.is_empty()
            && self.prepare_classes.is_empty()
            && self.instance_answers.is_empty()
        {
            return Ok(out);
        }
        writeln!(
            out,
            "@org.junit.runner.RunWith(org.powermock.modules.junit4.PowerMockRunner.class)"
        )?;
        if !self.prepare_classes.is_empty() {
            let classes: Vec<String> = self
                .prepare_classes
                .iter()
                .map(|c| format!("{c}.class"))
                .collect();
            writeln!(
                out,
                "@org.powermock.core.classloader.annotations.PrepareForTest({{{}}})",
                classes.join(", ")
            )?;
        }
        Ok(out)
    }

    /// Mock setup code preceding the test entry point
    pub fn prelude(&self) -> &str {
        &self.prelude
    }

    /// Write the deferred instance stubs: one chained-answer registration
    /// per call-site signature, answering in recorded order. Consumes the
    /// environment, so no call site can be added afterwards.
    pub fn finalise(self) -> Result<String> {
        let mut out = String::new();
        let pad = " ".repeat(self.indent);
        for (signature, answers) in &self.instance_answers {
            let types: Vec<String> = signature
                .parameter_types
                .iter()
                .map(|t| format!("{t}.class"))
                .collect();
            writeln!(
                out,
                "{pad}{HARNESS_PACKAGE}.AnswerTable.chain({}.class, \"{}\", new Class<?>[] {{{}}}, new java.lang.Object[] {{{}}});",
                signature.class,
                signature.method,
                types.join(", "),
                answers.join(", ")
            )?;
        }
        Ok(out)
    }
}

fn type_names(arg_types: &[JavaType]) -> Vec<String> {
    arg_types.iter().map(|t| t.name.clone()).collect()
}

fn matcher_list(arg_types: &[JavaType]) -> String {
    let matchers: Vec<String> = arg_types.iter().map(|t| matcher_for(&t.name)).collect();
    matchers.join(", ")
}

/// Argument matcher accepting any value of the given type
fn matcher_for(type_name: &str) -> String {
    match type_name {
        "boolean" => "org.mockito.Matchers.anyBoolean()".to_string(),
        "byte" => "org.mockito.Matchers.anyByte()".to_string(),
        "short" => "org.mockito.Matchers.anyShort()".to_string(),
        "int" => "org.mockito.Matchers.anyInt()".to_string(),
        "long" => "org.mockito.Matchers.anyLong()".to_string(),
        "char" => "org.mockito.Matchers.anyChar()".to_string(),
        "float" => "org.mockito.Matchers.anyFloat()".to_string(),
        "double" => "org.mockito.Matchers.anyDouble()".to_string(),
        other => format!("org.mockito.Matchers.any({other}.class)"),
    }
}
