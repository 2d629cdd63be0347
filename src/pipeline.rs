//! Batch compilation of a record graph.
//!
//! ## Pipeline Stages
//!
//! ```text
//! SpecSource (graph + config)
//!     │
//!     ▼
//! resolved_records ─► ResolvedGraph (flat records)
//!     │
//!     ▼
//! lower_records ─► OpDef / PatternDef per record
//!     │
//!     ├─► synthesize (parallel) ─► OpUnit per op
//!     │
//!     └─► compile_pattern (parallel) ─► RewriteUnit per pattern
//! ```
//!
//! ## Diagnostics
//!
//! A failing record never aborts the batch. Each failure is listed in
//! [`CompiledSpec::failures`] and emitted as a [`Diagnostic`] through the
//! salsa accumulator, in declaration order.

use std::collections::HashMap;
use std::fmt::Display;

use rayon::prelude::*;
use salsa::Accumulator;
use tracing::debug;
use trunk_ods_gen::{GenConfig, OpTable, OpUnit, RewriteUnit, compile_pattern, synthesize};
use trunk_ods_model::{ArgKind, LoweredItem, OpDef, lower_records};
use trunk_ods_records::{RecordGraph, ResolvedGraph, resolve};

use crate::diagnostics::{CompilationPhase, Diagnostic, DiagnosticSeverity};

/// A record graph with the configuration to compile it under.
#[salsa::input(debug)]
pub struct SpecSource {
    #[returns(deref)]
    pub name: String,
    #[returns(ref)]
    pub graph: RecordGraph,
    #[returns(ref)]
    pub config: GenConfig,
}

/// A record that produced no unit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct SpecFailure {
    pub record: String,
    pub phase: CompilationPhase,
    pub message: String,
}

/// Units of every record that compiled, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, salsa::Update)]
pub struct CompiledSpec {
    pub ops: Vec<OpUnit>,
    pub patterns: Vec<RewriteUnit>,
    pub failures: Vec<SpecFailure>,
}

impl CompiledSpec {
    /// Look up an op unit by full op name.
    pub fn op(&self, name: &str) -> Option<&OpUnit> {
        self.ops.iter().find(|unit| unit.op_name == name)
    }

    pub fn pattern(&self, name: &str) -> Option<&RewriteUnit> {
        self.patterns.iter().find(|unit| unit.name == name)
    }
}

/// Flatten the class chains of every def.
#[salsa::tracked(returns(ref))]
pub fn resolved_records(db: &dyn salsa::Database, source: SpecSource) -> ResolvedGraph {
    let resolved = resolve(source.graph(db));
    debug!(
        source = source.name(db),
        records = resolved.records.len(),
        failures = resolved.failures.len(),
        "resolved records"
    );
    resolved
}

#[salsa::tracked(returns(ref))]
pub fn compile_spec(db: &dyn salsa::Database, source: SpecSource) -> CompiledSpec {
    let config = source.config(db);
    let resolved = resolved_records(db, source);
    let mut report = Report::new(source.graph(db));

    for failure in &resolved.failures {
        report.error_at(
            failure.index,
            &failure.record,
            CompilationPhase::Resolution,
            &failure.error,
        );
    }

    let mut ops = Vec::new();
    let mut patterns = Vec::new();
    for lowered in lower_records(resolved, &config.ambient(), &config.shape_style) {
        match lowered.result {
            Ok(LoweredItem::Op(op)) => {
                report.optional_defaults(&lowered.name, &op);
                ops.push((lowered.name, op));
            }
            Ok(LoweredItem::Pattern(pattern)) => patterns.push((lowered.name, pattern)),
            Err(error) => report.error(&lowered.name, CompilationPhase::Lowering, &error),
        }
    }

    let synthesized: Vec<_> = ops
        .par_iter()
        .map(|(record, op)| (record, synthesize(op, config)))
        .collect();
    // Patterns only see ops that synthesized cleanly.
    let mut table = OpTable::new(ops.iter().map(|(_, op)| op));
    for ((_, op), (_, result)) in ops.iter().zip(&synthesized) {
        if result.is_err() {
            table.reject(&op.name);
        }
    }
    let rewrites: Vec<_> = patterns
        .par_iter()
        .map(|(record, pattern)| (record, compile_pattern(pattern, &table, config)))
        .collect();

    let mut compiled = CompiledSpec::default();
    for (record, result) in synthesized {
        match result {
            Ok(unit) => compiled.ops.push(unit),
            Err(error) => report.error(record, CompilationPhase::Synthesis, &error),
        }
    }
    for (record, result) in rewrites {
        match result {
            Ok(unit) => compiled.patterns.push(unit),
            Err(error) => report.error(record, CompilationPhase::PatternCompilation, &error),
        }
    }

    for diagnostic in report.finish() {
        if diagnostic.severity == DiagnosticSeverity::Error {
            compiled.failures.push(SpecFailure {
                record: diagnostic.record.clone(),
                phase: diagnostic.phase,
                message: diagnostic.message.clone(),
            });
        }
        diagnostic.accumulate(db);
    }

    debug!(
        source = source.name(db),
        ops = compiled.ops.len(),
        patterns = compiled.patterns.len(),
        failures = compiled.failures.len(),
        "compiled records"
    );
    compiled
}

/// Compile `source` and collect the diagnostics it accumulated.
pub fn compile_with_diagnostics(
    db: &dyn salsa::Database,
    source: SpecSource,
) -> (&CompiledSpec, Vec<Diagnostic>) {
    let compiled = compile_spec(db, source);
    let diagnostics = compile_spec::accumulated::<Diagnostic>(db, source)
        .into_iter()
        .cloned()
        .collect();
    (compiled, diagnostics)
}

/// Diagnostics keyed by the declaration index of their record.
struct Report<'g> {
    positions: HashMap<&'g str, usize>,
    entries: Vec<(usize, Diagnostic)>,
}

impl<'g> Report<'g> {
    fn new(graph: &'g RecordGraph) -> Self {
        // First declaration wins for duplicated names.
        let positions = graph
            .defs
            .iter()
            .enumerate()
            .rev()
            .map(|(index, def)| (def.name.as_str(), index))
            .collect();
        Self {
            positions,
            entries: Vec::new(),
        }
    }

    fn error(&mut self, record: &str, phase: CompilationPhase, error: &dyn Display) {
        let index = self.positions.get(record).copied().unwrap_or(usize::MAX);
        self.error_at(index, record, phase, error);
    }

    fn error_at(&mut self, index: usize, record: &str, phase: CompilationPhase, error: &dyn Display) {
        self.entries.push((
            index,
            Diagnostic {
                record: record.to_owned(),
                message: error.to_string(),
                severity: DiagnosticSeverity::Error,
                phase,
            },
        ));
    }

    /// Warn about attributes declared both optional and defaulted.
    fn optional_defaults(&mut self, record: &str, op: &OpDef) {
        let index = self.positions.get(record).copied().unwrap_or(usize::MAX);
        for arg in &op.arguments {
            let ArgKind::Attr(attr) = &arg.kind else {
                continue;
            };
            if attr.optional && attr.default_value.is_some() {
                self.entries.push((
                    index,
                    Diagnostic {
                        record: record.to_owned(),
                        message: format!(
                            "attribute '{}' is both optional and defaulted; treated as defaulted",
                            arg.name
                        ),
                        severity: DiagnosticSeverity::Warning,
                        phase: CompilationPhase::Synthesis,
                    },
                ));
            }
        }
    }

    /// Entries in declaration order, stable within a record.
    fn finish(mut self) -> Vec<Diagnostic> {
        self.entries.sort_by_key(|(index, _)| *index);
        self.entries.into_iter().map(|(_, diag)| diag).collect()
    }
}
