//! Code synthesis for trunk-ods.
//!
//! Takes the typed definitions from `trunk-ods-model` and produces
//! host-neutral code units:
//!
//! - [`classify`]: argument classification and shape checks
//! - [`synth`]: accessors, verifiers, and builders for each op
//! - [`rewrite`]: rewrite patterns compiled to match and rewrite bodies
//! - [`printer`]: pseudo-Rust rendering of the units
//!
//! Host API spellings come from [`GenConfig`].

pub mod classify;
pub mod code;
pub mod config;
pub mod printer;
pub mod rewrite;
pub mod synth;
pub mod unit;

pub use classify::{ClassifiedOp, attr_storage, classify_arguments, classify_op, classify_results};
pub use code::{AttrInit, Block, Expr, Stmt};
pub use config::{GenConfig, ShapeLiteralStyle};
pub use printer::{print_op_unit, print_rewrite_unit};
pub use rewrite::{OpTable, compile_pattern};
pub use synth::{accessor_name, synthesize};
pub use unit::{
    Accessor, AccessorKind, AttrStorage, Binding, BoundPosition, Builder, BuilderKind, Hook,
    HookDecl, OpUnit, Param, RewriteUnit,
};
