//! Operation definitions.

use crate::constraint::{Attr, DerivedAttr, OpTrait, Type};

/// What an argument of an operation is.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Operand(Type),
    Attr(Attr),
    Derived(DerivedAttr),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Argument {
    pub name: String,
    pub kind: ArgKind,
}

impl Argument {
    pub fn operand(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            kind: ArgKind::Operand(ty),
        }
    }

    pub fn attr(name: impl Into<String>, attr: Attr) -> Self {
        Self {
            name: name.into(),
            kind: ArgKind::Attr(attr),
        }
    }

    pub fn derived(name: impl Into<String>, attr: DerivedAttr) -> Self {
        Self {
            name: name.into(),
            kind: ArgKind::Derived(attr),
        }
    }

    pub fn is_derived(&self) -> bool {
        matches!(self.kind, ArgKind::Derived(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResultDecl {
    pub name: String,
    pub ty: Type,
}

/// Hand-written bodies that replace synthesized ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CustomHooks {
    pub builders: Vec<String>,
    pub parser: Option<String>,
    pub printer: Option<String>,
    pub verifier: Option<String>,
}

/// An operation, named `dialect.mnemonic`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpDef {
    pub name: String,
    pub summary: String,
    pub description: String,
    /// Operands and attributes, interleaved in declaration order.
    pub arguments: Vec<Argument>,
    pub results: Vec<ResultDecl>,
    pub traits: Vec<OpTrait>,
    pub hooks: CustomHooks,
    pub has_canonicalizer: bool,
    pub has_folder: bool,
    pub has_constant_folder: bool,
}

impl OpDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            summary: String::new(),
            description: String::new(),
            arguments: Vec::new(),
            results: Vec::new(),
            traits: Vec::new(),
            hooks: CustomHooks::default(),
            has_canonicalizer: false,
            has_folder: false,
            has_constant_folder: false,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn operand(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.arguments.push(Argument::operand(name, ty));
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, attr: Attr) -> Self {
        self.arguments.push(Argument::attr(name, attr));
        self
    }

    pub fn derived(mut self, name: impl Into<String>, attr: DerivedAttr) -> Self {
        self.arguments.push(Argument::derived(name, attr));
        self
    }

    pub fn result(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.results.push(ResultDecl {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn with_trait(mut self, op_trait: OpTrait) -> Self {
        self.traits.push(op_trait);
        self
    }

    pub fn with_hooks(mut self, hooks: CustomHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Part before the first `.`, empty when there is none.
    pub fn dialect(&self) -> &str {
        self.name.split_once('.').map_or("", |(dialect, _)| dialect)
    }

    /// Part after the first `.`, or the whole name.
    pub fn mnemonic(&self) -> &str {
        self.name
            .split_once('.')
            .map_or(self.name.as_str(), |(_, mnemonic)| mnemonic)
    }

    /// Arguments a pattern has to spell out: everything except derived ones.
    pub fn matchable_arity(&self) -> usize {
        self.arguments.iter().filter(|arg| !arg.is_derived()).count()
    }
}
