//! Recorded trace and opaque-call log
//!
//! The trace maps identifiers to their final recorded value; the opaque-call
//! log records, per unanalyzed function, the ordered outputs the interpreter
//! observed at each call site.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::value::Value;

/// Identifier of the harness function that defines program inputs
pub const HARNESS_FUNCTION: &str = "_start";

/// One recorded input: an identifier, its final value, and the function
/// the executor attributes the definition to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub identifier: String,
    pub value: Value,
    pub defined_in: String,
}

/// Recorded trace in definition order. Re-recording an identifier makes the
/// new entry its value and its position; the superseded entry is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        identifier: impl Into<String>,
        value: Value,
        defined_in: impl Into<String>,
    ) {
        self.entries.push(TraceEntry {
            identifier: identifier.into(),
            value,
            defined_in: defined_in.into(),
        });
    }

    /// Final value recorded for an identifier
    pub fn value_of(&self, identifier: &str) -> Option<&Value> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.identifier == identifier)
            .map(|e| &e.value)
    }

    /// Entries most-recently-defined first, one per identifier.
    /// Superseded records of a re-recorded identifier are skipped.
    pub fn latest_entries(&self) -> impl Iterator<Item = &TraceEntry> {
        let mut seen = BTreeSet::new();
        self.entries
            .iter()
            .rev()
            .filter(move |e| seen.insert(e.identifier.clone()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One output assignment of an opaque call: the identifier the interpreter
/// bound and the value it took
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputAssignment {
    pub identifier: String,
    pub value: Value,
}

/// One logged invocation of an opaque function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRecord {
    /// Identifier of the function the call happened in
    pub calling_function: String,
    /// Ordered chain of constructions ending in the returned value
    pub assignments: Vec<OutputAssignment>,
}

impl InvocationRecord {
    pub fn new(calling_function: impl Into<String>, assignments: Vec<OutputAssignment>) -> Self {
        Self {
            calling_function: calling_function.into(),
            assignments,
        }
    }

    /// The assignment carrying the call's returned value
    pub fn final_assignment(&self) -> Option<&OutputAssignment> {
        self.assignments.last()
    }
}

/// Opaque-function identifier mapped to its invocation records in trace
/// order. Function identifiers iterate lexicographically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpaqueCallLog {
    calls: BTreeMap<String, Vec<InvocationRecord>>,
}

impl OpaqueCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, function: impl Into<String>, invocation: InvocationRecord) {
        self.calls.entry(function.into()).or_default().push(invocation);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<InvocationRecord>)> {
        self.calls.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_later_writes_win() {
        let mut trace = Trace::new();
        trace.record("java::g", Value::int(1), HARNESS_FUNCTION);
        trace.record("java::h", Value::int(2), HARNESS_FUNCTION);
        trace.record("java::g", Value::int(3), HARNESS_FUNCTION);

        assert_eq!(trace.value_of("java::g"), Some(&Value::int(3)));
        let order: Vec<&str> = trace
            .latest_entries()
            .map(|e| e.identifier.as_str())
            .collect();
        // g was re-recorded last, so it is the most recent definition.
        assert_eq!(order, vec!["java::g", "java::h"]);
    }

    #[test]
    fn test_value_of_missing() {
        let trace = Trace::new();
        assert_eq!(trace.value_of("java::g"), None);
    }

    #[test]
    fn test_opaque_log_orders_functions() {
        let mut log = OpaqueCallLog::new();
        log.record("java::b.f", InvocationRecord::new("java::main", vec![]));
        log.record("java::a.f", InvocationRecord::new("java::main", vec![]));
        log.record("java::b.f", InvocationRecord::new("java::main", vec![]));

        let keys: Vec<&str> = log.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["java::a.f", "java::b.f"]);
        let counts: Vec<usize> = log.iter().map(|(_, v)| v.len()).collect();
        assert_eq!(counts, vec![1, 2]);
    }

    #[test]
    fn test_final_assignment() {
        let record = InvocationRecord::new(
            "java::main",
            vec![
                OutputAssignment {
                    identifier: "java::tmp1".to_string(),
                    value: Value::int(1),
                },
                OutputAssignment {
                    identifier: "java::tmp2".to_string(),
                    value: Value::int(2),
                },
            ],
        );
        assert_eq!(
            record.final_assignment().map(|a| a.identifier.as_str()),
            Some("java::tmp2")
        );
    }
}
