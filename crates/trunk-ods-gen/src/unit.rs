//! Synthesized units: one per operation, one per rewrite pattern.

use crate::code::Block;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub enum AttrStorage {
    /// No default, not optional.
    Required,
    /// Built from the default literal when absent.
    Defaulted,
    /// Absent reads as the empty optional.
    Optional,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub enum AccessorKind {
    Operand { index: usize, variadic: bool },
    Result { index: usize, variadic: bool },
    Attribute(AttrStorage),
    Derived,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct Accessor {
    /// Method name, snake_case.
    pub name: String,
    /// Name as declared.
    pub source: String,
    pub kind: AccessorKind,
    pub returns: String,
    pub body: Block,
}

/// A synthesized or hand-written body.
#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub enum Hook {
    Synthesized(Block),
    Custom(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub enum BuilderKind {
    /// One parameter per result type, operand, and attribute.
    Positional,
    /// Result type, operand, and attribute lists.
    Bulk,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct Param {
    pub name: String,
    pub ty: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub enum Builder {
    Synthesized {
        kind: BuilderKind,
        params: Vec<Param>,
        body: Block,
    },
    Custom(String),
}

/// Host hooks an op declares without a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub enum HookDecl {
    Canonicalization,
    Fold,
    ConstantFold,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct OpUnit {
    /// Full `dialect.mnemonic` name.
    pub op_name: String,
    /// SHOUTY_SNAKE constant holding the name.
    pub name_const: String,
    /// UpperCamelCase wrapper type.
    pub wrapper: String,
    pub summary: String,
    pub description: String,
    pub native_traits: Vec<String>,
    /// Operands, then results, then attributes, then derived attributes.
    pub accessors: Vec<Accessor>,
    pub verifier: Hook,
    pub builders: Vec<Builder>,
    pub parser: Option<String>,
    pub printer: Option<String>,
    pub hook_decls: Vec<HookDecl>,
}

impl OpUnit {
    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.accessors.iter().find(|acc| acc.source == name)
    }
}

/// Where a bound name came from in the matched tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub enum BoundPosition {
    Operand {
        op: String,
        index: usize,
        variadic: bool,
    },
    Attribute {
        op: String,
        name: String,
    },
    /// Result value of a matched op node.
    OpResult { op: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct Binding {
    pub name: String,
    /// Local holding the bound value.
    pub local: String,
    pub position: BoundPosition,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct RewriteUnit {
    pub name: String,
    pub root_op: String,
    pub benefit: i64,
    /// First binding of every name, in source order.
    pub bindings: Vec<Binding>,
    pub match_body: Block,
    pub rewrite_body: Block,
}

impl RewriteUnit {
    pub fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.name == name)
    }
}
