//! Record graph for trunk-ods operation definitions.
//!
//! The front-end that reads definition files is not part of this
//! workspace. It hands over a [`RecordGraph`]: named classes with single
//! inheritance and named defs instantiating them. [`resolve`] flattens every
//! def into a [`ResolvedRecord`] so that later stages never chase base
//! classes themselves.

pub mod error;
pub mod graph;
pub mod resolve;

pub use error::RecordError;
pub use graph::{ClassDef, Dag, DagArg, FieldValue, RecordDef, RecordGraph};
pub use resolve::{RecordFailure, ResolvedGraph, ResolvedRecord, resolve};
