//! Synthesized code tree.
//!
//! A small statement language with enough structure to tell the
//! branches of an accessor or verifier apart, with host expressions kept as
//! opaque [`Expr::Code`] text.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub enum Expr {
    /// Host expression, never inspected.
    Code(String),
    /// A local introduced by the synthesized code.
    Var(String),
    /// String literal.
    Str(String),
    Not(Box<Expr>),
    /// The optional value is present.
    IsPresent(Box<Expr>),
    /// Non-empty optional.
    Wrap(Box<Expr>),
    /// Empty optional.
    Empty,
    /// Content of an optional, or `fallback` when it is empty.
    OrElse {
        value: Box<Expr>,
        fallback: Box<Expr>,
    },
    Eq(Box<Expr>, Box<Expr>),
    Call { callee: String, args: Vec<Expr> },
}

impl Expr {
    pub fn code(text: impl Into<String>) -> Self {
        Expr::Code(text.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn str(text: impl Into<String>) -> Self {
        Expr::Str(text.into())
    }

    pub fn negated(self) -> Self {
        Expr::Not(Box::new(self))
    }

    pub fn wrap(self) -> Self {
        Expr::Wrap(Box::new(self))
    }

    pub fn is_present(self) -> Self {
        Expr::IsPresent(Box::new(self))
    }

    pub fn equals(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn or_else(self, fallback: Expr) -> Self {
        Expr::OrElse {
            value: Box::new(self),
            fallback: Box::new(fallback),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Code(text) | Expr::Var(text) => f.write_str(text),
            Expr::Str(text) => write!(f, "{text:?}"),
            Expr::Not(inner) => write!(f, "!({inner})"),
            Expr::IsPresent(inner) => write!(f, "{inner}.is_some()"),
            Expr::Wrap(inner) => write!(f, "Some({inner})"),
            Expr::Empty => f.write_str("None"),
            Expr::OrElse { value, fallback } => write!(f, "{value}.unwrap_or_else(|| {fallback})"),
            Expr::Eq(lhs, rhs) => write!(f, "{lhs} == {rhs}"),
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// `name = value` in an op creation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct AttrInit {
    pub name: String,
    pub value: Expr,
}

pub type Block = Vec<Stmt>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub enum Stmt {
    Let {
        name: String,
        value: Expr,
    },
    /// Bind the content of an optional, or run `otherwise` (which must exit).
    LetElse {
        name: String,
        value: Expr,
        otherwise: Block,
    },
    If {
        cond: Expr,
        then: Block,
        otherwise: Block,
    },
    /// Branch on an optional, binding its content in `then`.
    IfLet {
        name: String,
        value: Expr,
        then: Block,
        otherwise: Block,
    },
    ForEach {
        pattern: String,
        iter: Expr,
        body: Block,
    },
    Return(Expr),
    /// Verification failure with a message.
    Fail(String),
    /// The pattern does not apply.
    NoMatch,
    AddResultType(Expr),
    AddResultTypes(Expr),
    AddOperand(Expr),
    AddOperands(Expr),
    AddAttribute {
        name: Expr,
        value: Expr,
    },
    CreateOp {
        name: String,
        op: String,
        operands: Vec<Expr>,
        attributes: Vec<AttrInit>,
        result_types: Expr,
    },
    /// Replace the results of `target`, in order.
    Replace {
        target: String,
        values: Vec<Expr>,
    },
    /// Hand-written code, emitted as is.
    Verbatim(String),
}

impl Stmt {
    /// `if cond { then }` without an else branch.
    pub fn when(cond: Expr, then: Block) -> Self {
        Stmt::If {
            cond,
            then,
            otherwise: Vec::new(),
        }
    }
}
