//! Rewrite pattern definitions.

use crate::constraint::{AttrConstraint, TypeConstraint};
use crate::template::CodeTemplate;

/// A node of a source or result tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DagNode {
    /// `$x`: binds in a source tree, references in a result tree.
    Var(String),
    /// Opaque expression, passed through.
    Literal(String),
    Op(OpNode),
    /// `cOp` in results, `mPat`-style call elsewhere.
    Native {
        function: String,
        args: Vec<DagNode>,
        binding: Option<String>,
    },
    /// `tAttr`: template over positional arguments.
    Transform {
        template: CodeTemplate,
        args: Vec<DagNode>,
    },
    /// Replace the matched root with an already bound value.
    ReplaceWithValue(String),
    /// Constraint on an argument position, optionally binding it.
    Match {
        matcher: ArgMatcher,
        binding: Option<String>,
    },
}

/// Application of an operation to child nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpNode {
    pub op: String,
    pub args: Vec<DagNode>,
    /// Name for the op's result value.
    pub binding: Option<String>,
}

impl OpNode {
    pub fn new(op: impl Into<String>, args: impl IntoIterator<Item = DagNode>) -> Self {
        Self {
            op: op.into(),
            args: args.into_iter().collect(),
            binding: None,
        }
    }

    pub fn bind(mut self, name: impl Into<String>) -> Self {
        self.binding = Some(name.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgMatcher {
    /// Operand type check.
    Type(TypeConstraint),
    /// `mAttr`.
    Attr(AttrConstraint),
    /// `mAttrAnyOf`: any of the listed constraints.
    AttrAnyOf(Vec<AttrConstraint>),
    /// A constant attribute: equality when matching, `value` when building.
    Constant {
        check: AttrConstraint,
        value: String,
    },
}

/// An extra condition over bound names.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SideConstraint {
    /// `mPat`: native predicate called with the names in order.
    Native { function: String, args: Vec<String> },
    Type {
        constraint: TypeConstraint,
        var: String,
    },
    Attr {
        constraint: AttrConstraint,
        var: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatternDef {
    pub name: String,
    pub source: DagNode,
    /// Replacements for the root's results, in order.
    pub results: Vec<DagNode>,
    pub constraints: Vec<SideConstraint>,
    pub benefit_added: i64,
}

impl DagNode {
    pub fn var(name: impl Into<String>) -> Self {
        DagNode::Var(name.into())
    }

    pub fn op(op: impl Into<String>, args: impl IntoIterator<Item = DagNode>) -> Self {
        DagNode::Op(OpNode::new(op, args))
    }

    /// Number of op nodes in this tree.
    pub fn op_count(&self) -> usize {
        match self {
            DagNode::Op(node) => 1 + node.args.iter().map(DagNode::op_count).sum::<usize>(),
            DagNode::Native { args, .. } | DagNode::Transform { args, .. } => {
                args.iter().map(DagNode::op_count).sum()
            }
            DagNode::Var(_)
            | DagNode::Literal(_)
            | DagNode::ReplaceWithValue(_)
            | DagNode::Match { .. } => 0,
        }
    }
}

impl PatternDef {
    pub fn new(name: impl Into<String>, source: DagNode) -> Self {
        Self {
            name: name.into(),
            source,
            results: Vec::new(),
            constraints: Vec::new(),
            benefit_added: 0,
        }
    }

    pub fn result(mut self, node: DagNode) -> Self {
        self.results.push(node);
        self
    }

    pub fn constraint(mut self, constraint: SideConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Op nodes in the source plus the declared extra benefit.
    pub fn benefit(&self) -> i64 {
        self.source.op_count() as i64 + self.benefit_added
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benefit_counts_source_ops() {
        let source = DagNode::op(
            "test.foo",
            [
                DagNode::var("x"),
                DagNode::op("test.bar", [DagNode::var("y")]),
            ],
        );
        let mut pattern = PatternDef::new("FooBar", source)
            .result(DagNode::op("test.baz", [DagNode::var("y"), DagNode::var("x")]));
        assert_eq!(pattern.benefit(), 2);

        pattern.benefit_added = 3;
        assert_eq!(pattern.benefit(), 5);
    }
}
