//! Counterexample-to-test synthesis
//!
//! Turns a bounded-model-checking counterexample, a recorded trace of final
//! variable values plus a log of opaque calls, into compilable JUnit source
//! reproducing the same execution path. Global object graphs are
//! reconstructed by reflection, opaque calls are replayed through mock
//! stubs with chained answer sequences.

pub mod bundle;
pub mod error;
pub mod model;
pub mod render;
pub mod synth;
pub mod util;

pub use bundle::CounterexampleBundle;
pub use error::{Result, SynthesisError};
pub use synth::{synthesize, Emission, SynthesisOptions, SynthesizedTest};
