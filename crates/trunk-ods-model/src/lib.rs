//! Typed model of operation definitions.
//!
//! Everything here is immutable data plus pure functions:
//!
//! - [`template`]: code fragments with typed placeholder slots
//! - [`pred`]: the predicate algebra and its expansion to boolean expressions
//! - [`constraint`]: type, container, and attribute constraints
//! - [`op`] / [`pattern`]: operation and rewrite-pattern definitions
//! - [`lower`]: translation from resolved records into the types above

pub mod constraint;
pub mod error;
pub mod lower;
pub mod op;
pub mod pattern;
pub mod pred;
pub mod template;

pub use constraint::{
    ArrayLiteralShape, Attr, AttrConstraint, ContainerType, DerivedAttr, OpTrait,
    ShapeFormatter, Type, TypeConstraint, constant_attr, container_of,
};
pub use error::{OdsError, OdsErrorKind, OdsResult};
pub use lower::{LoweredItem, LoweredRecord, lower_records};
pub use op::{ArgKind, Argument, CustomHooks, OpDef, ResultDecl};
pub use pattern::{ArgMatcher, DagNode, OpNode, PatternDef, SideConstraint};
pub use pred::{CombinerKind, Predicate};
pub use template::{Ambient, CodeTemplate, Placeholder, TemplateArgs};
