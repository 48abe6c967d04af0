//! Reference graph discovery
//!
//! Walks recorded values to find every symbol a test must declare:
//! references are chased to their root symbol and that symbol's own value
//! is gathered before the referrer is appended. Output order is discovery
//! order with duplicates dropped, not a dependency order.

use log::debug;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::model::{Symbol, Target, Trace, Type, Value, HARNESS_FUNCTION};
use crate::synth::resolve::SymbolResolver;

/// Accumulates the transitive set of symbols reachable from gathered roots.
/// Each symbol is declared at most once; revisiting an identifier, whether
/// through a cycle or a second root, is a no-op.
pub struct ReferenceGatherer<'a> {
    resolver: &'a SymbolResolver<'a>,
    trace: &'a Trace,
    visited: BTreeSet<String>,
    declarations: Vec<Symbol>,
}

impl<'a> ReferenceGatherer<'a> {
    pub fn new(resolver: &'a SymbolResolver<'a>, trace: &'a Trace) -> Self {
        Self {
            resolver,
            trace,
            visited: BTreeSet::new(),
            declarations: Vec::new(),
        }
    }

    /// Gather a root symbol: recurse into its recorded value, then append
    /// the root itself
    pub fn gather_root(&mut self, symbol: &Symbol) -> Result<()> {
        if !self.visited.insert(symbol.identifier.clone()) {
            return Ok(());
        }
        if let Some(value) = self.trace.value_of(&symbol.identifier) {
            self.gather_value(value)?;
        }
        self.declarations.push(symbol.clone());
        Ok(())
    }

    fn gather_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Scalar(_) => Ok(()),
            Value::Reference(target) => self.chase(target),
            Value::Aggregate(aggregate) => {
                for field in &aggregate.fields {
                    self.gather_value(&field.value)?;
                }
                Ok(())
            }
            Value::Cast { value, .. } => self.gather_value(value),
        }
    }

    /// Follow a reference to its root symbol and gather it. Chains that
    /// bottom out at a null or computed address are a valid dead end.
    fn chase(&mut self, target: &Target) -> Result<()> {
        match target.root_symbol() {
            Some(identifier) => {
                let lookup = self.resolver.resolve(identifier)?;
                self.gather_root(lookup.symbol())
            }
            None => {
                debug!("reference chain bottoms out without a symbol");
                Ok(())
            }
        }
    }

    /// Declaration list in first-discovery order
    pub fn into_declarations(self) -> Vec<Symbol> {
        self.declarations
    }
}

/// Discover all global state a test must reconstruct: every static-lifetime
/// class, pointer or array input defined by the harness, walked
/// most-recently-defined first so the latest shared-object assignment wins.
pub fn gather_static_roots(
    resolver: &SymbolResolver<'_>,
    trace: &Trace,
) -> Result<Vec<Symbol>> {
    let mut gatherer = ReferenceGatherer::new(resolver, trace);
    for entry in trace.latest_entries() {
        if entry.defined_in != HARNESS_FUNCTION {
            continue;
        }
        let lookup = resolver.resolve(&entry.identifier)?;
        let symbol = lookup.symbol();
        if !symbol.is_static_lifetime() {
            continue;
        }
        if !is_input_shape(resolver, &symbol.ty) {
            continue;
        }
        debug!("gathering global state from {}", entry.identifier);
        gatherer.gather_root(symbol)?;
    }
    Ok(gatherer.into_declarations())
}

fn is_input_shape(resolver: &SymbolResolver<'_>, ty: &Type) -> bool {
    matches!(
        resolver.table().follow(ty),
        Type::Struct(_) | Type::Union(_) | Type::Reference(_) | Type::Array(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Aggregate, DynamicTypes, Field, Member, Primitive, StorageClass, StructType,
        SymbolTable,
    };

    fn int() -> Type {
        Type::Primitive(Primitive::Int)
    }

    fn node_type(tag: &str) -> Type {
        Type::Struct(StructType::new(
            tag,
            vec![
                Member::new("next", Type::Reference(Box::new(Type::Named(tag.to_string())))),
                Member::new("val", int()),
            ],
        ))
    }

    fn static_symbol(table: &mut SymbolTable, identifier: &str, display: &str, ty: Type) {
        table.insert(Symbol::new(identifier, ty, display, StorageClass::StaticLifetime));
    }

    #[test]
    fn test_referenced_symbol_gathered_before_referrer() {
        let mut table = SymbolTable::new();
        static_symbol(&mut table, "java::p", "p", node_type("java::my.pkg.Node"));
        static_symbol(&mut table, "java::g", "g", node_type("java::my.pkg.Node"));
        let dynamic = DynamicTypes::new();
        let resolver = SymbolResolver::new(&table, &dynamic);

        let mut trace = Trace::new();
        trace.record("java::g", Value::int(1), HARNESS_FUNCTION);
        trace.record(
            "java::p",
            Value::Aggregate(Aggregate::new(
                node_type("java::my.pkg.Node"),
                vec![
                    Field::named("next", Value::reference_to("java::g")),
                    Field::named("val", Value::int(2)),
                ],
            )),
            HARNESS_FUNCTION,
        );

        let roots = gather_static_roots(&resolver, &trace).unwrap();
        let names: Vec<&str> = roots.iter().map(|s| s.identifier.as_str()).collect();
        // p is most recent, gathered first; g lands before it in post-order.
        assert_eq!(names, vec!["java::g", "java::p"]);
    }

    #[test]
    fn test_cyclic_references_terminate() {
        let mut table = SymbolTable::new();
        static_symbol(&mut table, "java::a", "a", node_type("java::my.pkg.Node"));
        static_symbol(&mut table, "java::b", "b", node_type("java::my.pkg.Node"));
        let dynamic = DynamicTypes::new();
        let resolver = SymbolResolver::new(&table, &dynamic);

        let mut trace = Trace::new();
        trace.record(
            "java::a",
            Value::Aggregate(Aggregate::new(
                node_type("java::my.pkg.Node"),
                vec![
                    Field::named("next", Value::reference_to("java::b")),
                    Field::named("val", Value::int(1)),
                ],
            )),
            HARNESS_FUNCTION,
        );
        trace.record(
            "java::b",
            Value::Aggregate(Aggregate::new(
                node_type("java::my.pkg.Node"),
                vec![
                    Field::named("next", Value::reference_to("java::a")),
                    Field::named("val", Value::int(2)),
                ],
            )),
            HARNESS_FUNCTION,
        );

        let roots = gather_static_roots(&resolver, &trace).unwrap();
        let names: Vec<&str> = roots.iter().map(|s| s.identifier.as_str()).collect();
        // b is most recent; its traversal reaches a, which refers back to b
        // and stops there.
        assert_eq!(names, vec!["java::a", "java::b"]);
    }

    #[test]
    fn test_dead_end_chain_is_silent() {
        let mut table = SymbolTable::new();
        static_symbol(&mut table, "java::p", "p", node_type("java::my.pkg.Node"));
        let dynamic = DynamicTypes::new();
        let resolver = SymbolResolver::new(&table, &dynamic);

        let mut trace = Trace::new();
        trace.record(
            "java::p",
            Value::Aggregate(Aggregate::new(
                node_type("java::my.pkg.Node"),
                vec![
                    Field::named("next", Value::Reference(Target::Opaque { address: 0x10 })),
                    Field::named("val", Value::int(1)),
                ],
            )),
            HARNESS_FUNCTION,
        );

        let roots = gather_static_roots(&resolver, &trace).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].identifier, "java::p");
    }

    #[test]
    fn test_root_filter() {
        let mut table = SymbolTable::new();
        static_symbol(&mut table, "java::flag", "flag", int());
        static_symbol(&mut table, "java::late", "late", node_type("java::my.pkg.Node"));
        table.insert(Symbol::new(
            "java::local",
            node_type("java::my.pkg.Node"),
            "local",
            StorageClass::Local,
        ));
        let dynamic = DynamicTypes::new();
        let resolver = SymbolResolver::new(&table, &dynamic);

        let mut trace = Trace::new();
        // Primitive static: wrong shape.
        trace.record("java::flag", Value::int(1), HARNESS_FUNCTION);
        // Defined by user code, not the harness.
        trace.record("java::late", Value::int(2), "java::my.pkg.C.m");
        // Not static lifetime.
        trace.record("java::local", Value::int(3), HARNESS_FUNCTION);

        let roots = gather_static_roots(&resolver, &trace).unwrap();
        assert!(roots.is_empty());
    }

    #[test]
    fn test_shared_target_declared_once() {
        let mut table = SymbolTable::new();
        static_symbol(&mut table, "java::p", "p", node_type("java::my.pkg.Node"));
        static_symbol(&mut table, "java::q", "q", node_type("java::my.pkg.Node"));
        static_symbol(&mut table, "java::g", "g", node_type("java::my.pkg.Node"));
        let dynamic = DynamicTypes::new();
        let resolver = SymbolResolver::new(&table, &dynamic);

        let shared = |target: &str| {
            Value::Aggregate(Aggregate::new(
                node_type("java::my.pkg.Node"),
                vec![
                    Field::named("next", Value::reference_to(target)),
                    Field::named("val", Value::int(0)),
                ],
            ))
        };
        let mut trace = Trace::new();
        trace.record("java::g", Value::int(9), HARNESS_FUNCTION);
        trace.record("java::p", shared("java::g"), HARNESS_FUNCTION);
        trace.record("java::q", shared("java::g"), HARNESS_FUNCTION);

        let roots = gather_static_roots(&resolver, &trace).unwrap();
        let g_count = roots.iter().filter(|s| s.identifier == "java::g").count();
        assert_eq!(g_count, 1);
        assert_eq!(roots.len(), 3);
    }
}
