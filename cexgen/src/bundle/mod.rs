//! Counterexample interchange format
//!
//! One serializable carrier for everything the executor hands over about a
//! single counterexample. The library API works on the in-memory pieces
//! directly; the bundle exists for the command line and for fixtures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{DynamicTypes, OpaqueCallLog, SymbolTable, Trace};
use crate::synth::{synthesize, SynthesisOptions, SynthesizedTest};

/// All inputs for one synthesis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CounterexampleBundle {
    pub symbols: SymbolTable,
    #[serde(default)]
    pub dynamic_types: DynamicTypes,
    pub trace: Trace,
    #[serde(default)]
    pub opaque_calls: OpaqueCallLog,
    pub entry_function: String,
    #[serde(default)]
    pub goals: Vec<String>,
}

impl CounterexampleBundle {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Default synthesis options for this bundle's entry function and goals
    pub fn options(&self) -> SynthesisOptions {
        SynthesisOptions::new(&self.entry_function).with_goals(self.goals.clone())
    }

    /// Run synthesis over the bundled inputs
    pub fn synthesize(&self, options: &SynthesisOptions) -> Result<SynthesizedTest> {
        synthesize(
            &self.symbols,
            &self.dynamic_types,
            &self.trace,
            &self.opaque_calls,
            options,
        )
    }
}
