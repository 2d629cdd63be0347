//! trunk-ods: operation definitions to synthesized code.
//!
//! The workspace crates do the work; this crate ties them into a salsa
//! pipeline with per-record diagnostics.

pub mod database;
pub mod diagnostics;
pub mod pipeline;

pub use database::OdsDatabase;
pub use diagnostics::{CompilationPhase, Diagnostic, DiagnosticSeverity};
pub use pipeline::{
    CompiledSpec, SpecFailure, SpecSource, compile_spec, compile_with_diagnostics,
    resolved_records,
};
