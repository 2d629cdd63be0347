//! Pattern compilation.
//!
//! A [`PatternDef`] becomes a [`RewriteUnit`] with two bodies. The match body
//! walks the source tree depth-first, guarding every op name, operand type,
//! and attribute constraint and binding names along the way. The rewrite body
//! builds the result trees in order and replaces the root's results with
//! them.
//!
//! Bound names live in locals prefixed with `v_`, apart from the generated
//! `op<N>`, `attr<N>`, and `r<N>` locals.

use std::collections::{HashMap, HashSet};

use tracing::debug;
use trunk_ods_model::{
    ArgKind, ArgMatcher, Attr, DagNode, OdsError, OdsResult, OpDef, OpNode, PatternDef,
    Predicate, SideConstraint, TemplateArgs,
};

use crate::classify::attr_storage;
use crate::code::{AttrInit, Block, Expr, Stmt};
use crate::config::GenConfig;
use crate::synth::Host;
use crate::unit::{AttrStorage, Binding, BoundPosition, RewriteUnit};

/// Ops known to the pattern compiler, by full name.
#[derive(Clone, Debug, Default)]
pub struct OpTable<'a> {
    ops: HashMap<&'a str, &'a OpDef>,
    rejected: HashSet<&'a str>,
}

impl<'a> OpTable<'a> {
    pub fn new(ops: impl IntoIterator<Item = &'a OpDef>) -> Self {
        Self {
            ops: ops.into_iter().map(|op| (op.name.as_str(), op)).collect(),
            rejected: HashSet::new(),
        }
    }

    /// Withdraw an op whose own definition failed; patterns using it fail too.
    pub fn reject(&mut self, name: &'a str) {
        self.ops.remove(name);
        self.rejected.insert(name);
    }

    pub fn get(&self, name: &str) -> Option<&'a OpDef> {
        self.ops.get(name).copied()
    }

    fn expect(&self, name: &str) -> OdsResult<&'a OpDef> {
        if self.rejected.contains(name) {
            return Err(OdsError::invalid_pattern(format!(
                "op `{name}` has an invalid definition"
            )));
        }
        self.get(name)
            .ok_or_else(|| OdsError::invalid_pattern(format!("unknown op `{name}`")))
    }
}

pub fn compile_pattern(
    pattern: &PatternDef,
    ops: &OpTable<'_>,
    config: &GenConfig,
) -> OdsResult<RewriteUnit> {
    let DagNode::Op(root) = &pattern.source else {
        return Err(OdsError::invalid_pattern(format!(
            "source of `{}` must be an op",
            pattern.name
        )));
    };

    let mut compiler = PatternCompiler {
        ops,
        host: Host::new(config),
        bindings: Vec::new(),
        match_body: Vec::new(),
        rewrite_body: Vec::new(),
        next_op: 0,
        next_attr: 0,
        next_result: 0,
    };
    let root_var = compiler.host.ambient.op.clone();

    compiler.guard(Expr::code(compiler.host.op_is(&root_var, &root.op)));
    if let Some(name) = &root.binding {
        let value = compiler.host.result(&root_var, 0, false);
        compiler.bind_value(name, value, BoundPosition::OpResult { op: root.op.clone() });
    }
    compiler.match_op(root, &root_var)?;

    for constraint in &pattern.constraints {
        compiler.side_constraint(constraint)?;
    }

    check_result_count(pattern, ops.expect(&root.op)?)?;
    let result_types = Expr::code(compiler.host.result_types(&root_var));
    let values = pattern
        .results
        .iter()
        .map(|node| compiler.top_level_result(node, &result_types))
        .collect::<OdsResult<Vec<_>>>()?;
    compiler.rewrite_body.push(Stmt::Replace {
        target: root_var,
        values,
    });

    debug!(pattern = %pattern.name, root = %root.op, benefit = pattern.benefit(), "compiled pattern");
    Ok(RewriteUnit {
        name: pattern.name.clone(),
        root_op: root.op.clone(),
        benefit: pattern.benefit(),
        bindings: compiler.bindings,
        match_body: compiler.match_body,
        rewrite_body: compiler.rewrite_body,
    })
}

/// One replacement value per root result; a variadic last result takes any
/// number of trailing values.
fn check_result_count(pattern: &PatternDef, root: &OpDef) -> OdsResult<()> {
    let declared = root.results.len();
    let given = pattern.results.len();
    let variadic = root.results.last().is_some_and(|result| result.ty.variadic);
    let fits = if variadic {
        given + 1 >= declared
    } else {
        given == declared
    };
    if fits {
        return Ok(());
    }

    let expected = if variadic {
        format!("at least {}", declared - 1)
    } else {
        declared.to_string()
    };
    Err(OdsError::invalid_pattern(format!(
        "`{}` needs {expected} replacement values, `{}` gives {given}",
        root.name, pattern.name
    )))
}

/// Local holding a bound name.
fn local_name(name: &str) -> String {
    format!("v_{name}")
}

struct PatternCompiler<'t, 'o, 'c> {
    ops: &'t OpTable<'o>,
    host: Host<'c>,
    bindings: Vec<Binding>,
    match_body: Block,
    rewrite_body: Block,
    next_op: usize,
    next_attr: usize,
    next_result: usize,
}

impl PatternCompiler<'_, '_, '_> {
    /// Bail out unless `cond` holds.
    fn guard(&mut self, cond: Expr) {
        self.match_body
            .push(Stmt::when(cond.negated(), vec![Stmt::NoMatch]));
    }

    fn binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.name == name)
    }

    fn lookup(&self, name: &str) -> OdsResult<&Binding> {
        self.binding(name).ok_or_else(|| {
            OdsError::invalid_pattern(format!("`{name}` is not bound in the source pattern"))
        })
    }

    /// Bind `name` to a value, or require equality with its first binding.
    fn bind_value(&mut self, name: &str, value: String, position: BoundPosition) {
        if let Some(existing) = self.binding(name) {
            let cond = Expr::var(&existing.local).equals(Expr::Code(value));
            self.guard(cond);
            return;
        }
        let local = local_name(name);
        self.match_body.push(Stmt::Let {
            name: local.clone(),
            value: Expr::Code(value),
        });
        self.bindings.push(Binding {
            name: name.to_owned(),
            local,
            position,
        });
    }

    fn fresh_attr(&mut self) -> String {
        self.next_attr += 1;
        format!("attr{}", self.next_attr - 1)
    }

    /// Look up an attribute according to its storage class, binding it to
    /// `name` when given.
    ///
    /// Returns the local holding the present attribute for matcher checks.
    /// An absent defaulted attribute reads as its default. An absent optional
    /// one binds the empty optional, and fails the match only when `checked`.
    fn bind_attr(
        &mut self,
        name: Option<&str>,
        attr: &Attr,
        storage: AttrStorage,
        lookup: String,
        checked: bool,
        position: BoundPosition,
    ) -> OdsResult<String> {
        let local = match name {
            Some(name) if self.binding(name).is_none() => local_name(name),
            _ => self.fresh_attr(),
        };
        let lookup = Expr::Code(lookup);
        let present = match storage {
            AttrStorage::Required => {
                self.match_body.push(Stmt::LetElse {
                    name: local.clone(),
                    value: lookup,
                    otherwise: vec![Stmt::NoMatch],
                });
                local.clone()
            }
            AttrStorage::Defaulted => {
                let default = attr.default_value.as_deref().unwrap_or_default();
                let built = attr.build_constant(default, &self.host.ambient)?;
                self.match_body.push(Stmt::Let {
                    name: local.clone(),
                    value: lookup.or_else(Expr::Code(built)),
                });
                local.clone()
            }
            AttrStorage::Optional => {
                self.match_body.push(Stmt::Let {
                    name: local.clone(),
                    value: lookup,
                });
                if checked {
                    let present = self.fresh_attr();
                    self.match_body.push(Stmt::LetElse {
                        name: present.clone(),
                        value: Expr::var(&local),
                        otherwise: vec![Stmt::NoMatch],
                    });
                    present
                } else {
                    local.clone()
                }
            }
        };

        if let Some(name) = name {
            if let Some(existing) = self.binding(name) {
                let cond = Expr::var(&existing.local).equals(Expr::var(&local));
                self.guard(cond);
            } else {
                self.bindings.push(Binding {
                    name: name.to_owned(),
                    local: local.clone(),
                    position,
                });
            }
        }
        Ok(present)
    }

    // =========================================================================
    // Source
    // =========================================================================

    fn match_op(&mut self, node: &OpNode, var: &str) -> OdsResult<()> {
        let def = self.ops.expect(&node.op)?;
        let arity = def.matchable_arity();
        if node.args.len() != arity {
            return Err(OdsError::invalid_pattern(format!(
                "`{}` takes {arity} arguments, pattern gives {}",
                def.name,
                node.args.len()
            )));
        }

        let mut operand_index = 0;
        let positions = def.arguments.iter().filter(|arg| !arg.is_derived());
        for (arg, child) in positions.zip(&node.args) {
            match &arg.kind {
                ArgKind::Operand(ty) => {
                    let position = BoundPosition::Operand {
                        op: def.name.clone(),
                        index: operand_index,
                        variadic: ty.variadic,
                    };
                    let access = self.host.operand(var, operand_index, ty.variadic);
                    self.match_operand(child, access, position, &arg.name)?;
                    operand_index += 1;
                }
                ArgKind::Attr(attr) => {
                    let position = BoundPosition::Attribute {
                        op: def.name.clone(),
                        name: arg.name.clone(),
                    };
                    let lookup = self.host.attr(var, &arg.name);
                    self.match_attr(child, attr, lookup, position, &arg.name)?;
                }
                ArgKind::Derived(_) => {}
            }
        }
        Ok(())
    }

    fn match_operand(
        &mut self,
        child: &DagNode,
        access: String,
        position: BoundPosition,
        arg_name: &str,
    ) -> OdsResult<()> {
        let variadic = matches!(position, BoundPosition::Operand { variadic: true, .. });
        match child {
            DagNode::Var(name) => self.bind_value(name, access, position),
            DagNode::Match {
                matcher: ArgMatcher::Type(constraint),
                binding,
            } if !variadic => {
                let ty = self.host.value_type(&access);
                let cond = Expr::code(constraint.predicate_for(&ty, &self.host.ambient));
                self.guard(cond);
                if let Some(name) = binding {
                    self.bind_value(name, access, position);
                }
            }
            DagNode::Op(inner) if !variadic => {
                let var = format!("op{}", self.next_op);
                self.next_op += 1;
                self.match_body.push(Stmt::LetElse {
                    name: var.clone(),
                    value: Expr::code(self.host.defining_op(&access)),
                    otherwise: vec![Stmt::NoMatch],
                });
                self.guard(Expr::code(self.host.op_is(&var, &inner.op)));
                if let Some(name) = &inner.binding {
                    self.bind_value(name, access, BoundPosition::OpResult { op: inner.op.clone() });
                }
                self.match_op(inner, &var)?;
            }
            _ => {
                return Err(OdsError::invalid_pattern(format!(
                    "operand '{arg_name}' cannot be matched by {}",
                    describe_node(child)
                )));
            }
        }
        Ok(())
    }

    fn match_attr(
        &mut self,
        child: &DagNode,
        attr: &Attr,
        lookup: String,
        position: BoundPosition,
        arg_name: &str,
    ) -> OdsResult<()> {
        let (predicate, binding) = match child {
            DagNode::Var(name) => (None, Some(name.as_str())),
            DagNode::Match { matcher, binding } => {
                let predicate = match matcher {
                    ArgMatcher::Attr(constraint) => constraint.predicate.clone(),
                    ArgMatcher::AttrAnyOf(alternatives) => Predicate::any_of(
                        alternatives.iter().map(|constraint| constraint.predicate.clone()),
                    ),
                    ArgMatcher::Constant { check, .. } => check.predicate.clone(),
                    ArgMatcher::Type(_) => {
                        return Err(OdsError::invalid_pattern(format!(
                            "attribute '{arg_name}' cannot be matched by a type constraint"
                        )));
                    }
                };
                (Some(predicate), binding.as_deref())
            }
            _ => {
                return Err(OdsError::invalid_pattern(format!(
                    "attribute '{arg_name}' cannot be matched by {}",
                    describe_node(child)
                )));
            }
        };

        let storage = attr_storage(arg_name, attr)?;
        let present = self.bind_attr(
            binding,
            attr,
            storage,
            lookup,
            predicate.is_some(),
            position,
        )?;
        if let Some(predicate) = predicate {
            let cond = Expr::code(predicate.expand(&present, &self.host.ambient));
            self.guard(cond);
        }
        Ok(())
    }

    fn side_constraint(&mut self, constraint: &SideConstraint) -> OdsResult<()> {
        let cond = match constraint {
            SideConstraint::Native { function, args } => Expr::Call {
                callee: function.clone(),
                args: args
                    .iter()
                    .map(|name| -> OdsResult<Expr> { Ok(Expr::var(&self.lookup(name)?.local)) })
                    .collect::<OdsResult<_>>()?,
            },
            SideConstraint::Type { constraint, var } => {
                let binding = self.lookup(var)?;
                if matches!(binding.position, BoundPosition::Attribute { .. }) {
                    return Err(OdsError::invalid_pattern(format!(
                        "type constraint on attribute `{var}`"
                    )));
                }
                let ty = self.host.value_type(&binding.local);
                Expr::code(constraint.predicate_for(&ty, &self.host.ambient))
            }
            SideConstraint::Attr { constraint, var } => {
                let binding = self.lookup(var)?;
                if !matches!(binding.position, BoundPosition::Attribute { .. }) {
                    return Err(OdsError::invalid_pattern(format!(
                        "attribute constraint on value `{var}`"
                    )));
                }
                Expr::code(constraint.predicate_for(&binding.local, &self.host.ambient))
            }
        };
        self.guard(cond);
        Ok(())
    }

    // =========================================================================
    // Results
    // =========================================================================

    fn top_level_result(&mut self, node: &DagNode, result_types: &Expr) -> OdsResult<Expr> {
        match node {
            DagNode::ReplaceWithValue(name) => Ok(Expr::var(&self.lookup(name)?.local)),
            other => self.result_expr(other, result_types),
        }
    }

    fn result_expr(&mut self, node: &DagNode, result_types: &Expr) -> OdsResult<Expr> {
        match node {
            DagNode::Var(name) => Ok(Expr::var(&self.lookup(name)?.local)),
            DagNode::Literal(text) => Ok(Expr::code(text)),
            DagNode::Match {
                matcher: ArgMatcher::Constant { value, .. },
                ..
            } => Ok(Expr::code(value)),
            DagNode::Op(op) => self.create_op(op, result_types),
            DagNode::Native { function, args, .. } => {
                let args = args
                    .iter()
                    .map(|arg| self.result_expr(arg, result_types))
                    .collect::<OdsResult<Vec<_>>>()?;
                let name = self.fresh_result();
                self.rewrite_body.push(Stmt::Let {
                    name: name.clone(),
                    value: Expr::Call {
                        callee: function.clone(),
                        args,
                    },
                });
                Ok(Expr::Var(name))
            }
            DagNode::Transform { template, args } => {
                let positional = args
                    .iter()
                    .map(|arg| -> OdsResult<String> {
                        Ok(self.result_expr(arg, result_types)?.to_string())
                    })
                    .collect::<OdsResult<Vec<_>>>()?;
                let args = TemplateArgs::new(&self.host.ambient).with_positional(&positional);
                Ok(Expr::code(template.instantiate(&args)))
            }
            DagNode::ReplaceWithValue(_) | DagNode::Match { .. } => {
                Err(OdsError::invalid_pattern(format!(
                    "{} cannot build a value",
                    describe_node(node)
                )))
            }
        }
    }

    fn create_op(&mut self, node: &OpNode, result_types: &Expr) -> OdsResult<Expr> {
        let def = self.ops.expect(&node.op)?;
        let arity = def.matchable_arity();
        if node.args.len() != arity {
            return Err(OdsError::invalid_pattern(format!(
                "`{}` takes {arity} arguments, result gives {}",
                def.name,
                node.args.len()
            )));
        }

        let mut operands = Vec::new();
        let mut attributes = Vec::new();
        let positions = def.arguments.iter().filter(|arg| !arg.is_derived());
        for (arg, child) in positions.zip(&node.args) {
            let value = self.result_expr(child, result_types)?;
            match &arg.kind {
                ArgKind::Operand(_) => operands.push(value),
                ArgKind::Attr(_) => attributes.push(AttrInit {
                    name: arg.name.clone(),
                    value,
                }),
                ArgKind::Derived(_) => {}
            }
        }

        let name = self.fresh_result();
        self.rewrite_body.push(Stmt::CreateOp {
            name: name.clone(),
            op: def.name.clone(),
            operands,
            attributes,
            result_types: result_types.clone(),
        });

        let value = self.host.result(&name, 0, false);
        match &node.binding {
            Some(binding) => {
                let local = local_name(binding);
                self.rewrite_body.push(Stmt::Let {
                    name: local.clone(),
                    value: Expr::Code(value),
                });
                Ok(Expr::Var(local))
            }
            None => Ok(Expr::Code(value)),
        }
    }

    fn fresh_result(&mut self) -> String {
        self.next_result += 1;
        format!("r{}", self.next_result - 1)
    }
}

fn describe_node(node: &DagNode) -> &'static str {
    match node {
        DagNode::Var(_) => "a bound name",
        DagNode::Literal(_) => "a literal",
        DagNode::Op(_) => "an op",
        DagNode::Native { .. } => "a native call",
        DagNode::Transform { .. } => "an attribute transform",
        DagNode::ReplaceWithValue(_) => "replaceWithValue",
        DagNode::Match { .. } => "this matcher",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trunk_ods_model::{Attr, AttrConstraint, CodeTemplate, Type, TypeConstraint};

    fn any() -> Type {
        Type::new(TypeConstraint::any())
    }

    fn int_attr() -> Attr {
        Attr::new(
            AttrConstraint::new(Predicate::leaf("$_self.is_int()"), "integer attribute"),
            "IntAttr",
            "i64",
        )
        .with_const_builder("$_builder.int_attr($0)")
    }

    fn ops() -> Vec<OpDef> {
        vec![
            OpDef::new("test.foo").operand("lhs", any()).operand("rhs", any()).result("out", any()),
            OpDef::new("test.bar").operand("input", any()).result("out", any()),
            OpDef::new("test.baz").operand("a", any()).operand("b", any()).result("out", any()),
            OpDef::new("test.shift")
                .operand("input", any())
                .attribute("amount", int_attr())
                .result("out", any()),
            OpDef::new("test.step")
                .operand("input", any())
                .attribute("amount", int_attr().with_default("1"))
                .result("out", any()),
            OpDef::new("test.tag")
                .operand("input", any())
                .attribute("label", int_attr().optional())
                .result("out", any()),
            OpDef::new("test.split")
                .operand("input", any())
                .result("low", any())
                .result("high", any()),
            OpDef::new("test.unpack")
                .operand("input", any())
                .result("first", any())
                .result("rest", any().variadic()),
        ]
    }

    fn compile(pattern: &PatternDef) -> OdsResult<RewriteUnit> {
        let ops = ops();
        compile_pattern(pattern, &OpTable::new(&ops), &GenConfig::default())
    }

    fn no_match_unless(cond: &str) -> Stmt {
        Stmt::when(Expr::code(cond).negated(), vec![Stmt::NoMatch])
    }

    #[test]
    fn test_nested_match_swaps_operands() {
        let pattern = PatternDef::new(
            "FooBarToBaz",
            DagNode::op(
                "test.foo",
                [DagNode::var("x"), DagNode::op("test.bar", [DagNode::var("y")])],
            ),
        )
        .result(DagNode::op("test.baz", [DagNode::var("y"), DagNode::var("x")]));

        let unit = compile(&pattern).unwrap();
        assert_eq!(unit.root_op, "test.foo");
        assert_eq!(unit.benefit, 2);
        assert_eq!(
            unit.match_body,
            vec![
                no_match_unless("op.is(\"test.foo\")"),
                Stmt::Let {
                    name: "v_x".into(),
                    value: Expr::code("op.operand(0)"),
                },
                Stmt::LetElse {
                    name: "op0".into(),
                    value: Expr::code("ctx.defining_op(op.operand(1))"),
                    otherwise: vec![Stmt::NoMatch],
                },
                no_match_unless("op0.is(\"test.bar\")"),
                Stmt::Let {
                    name: "v_y".into(),
                    value: Expr::code("op0.operand(0)"),
                },
            ]
        );
        assert_eq!(
            unit.rewrite_body,
            vec![
                Stmt::CreateOp {
                    name: "r0".into(),
                    op: "test.baz".into(),
                    operands: vec![Expr::var("v_y"), Expr::var("v_x")],
                    attributes: vec![],
                    result_types: Expr::code("op.result_types()"),
                },
                Stmt::Replace {
                    target: "op".into(),
                    values: vec![Expr::code("r0.result(0)")],
                },
            ]
        );
        assert_eq!(
            unit.binding("y").unwrap().position,
            BoundPosition::Operand {
                op: "test.bar".into(),
                index: 0,
                variadic: false
            }
        );
    }

    #[test]
    fn test_repeated_name_adds_equality_guard() {
        let pattern = PatternDef::new(
            "SameOperands",
            DagNode::op("test.foo", [DagNode::var("x"), DagNode::var("x")]),
        )
        .result(DagNode::ReplaceWithValue("x".into()));

        let unit = compile(&pattern).unwrap();
        assert_eq!(
            unit.match_body[2],
            Stmt::when(
                Expr::var("v_x").equals(Expr::code("op.operand(1)")).negated(),
                vec![Stmt::NoMatch],
            )
        );
        assert_eq!(
            unit.rewrite_body,
            vec![Stmt::Replace {
                target: "op".into(),
                values: vec![Expr::var("v_x")],
            }]
        );
    }

    #[test]
    fn test_attribute_matchers_and_native_guards() {
        let positive = AttrConstraint::new(Predicate::leaf("$_self.as_i64() > 0"), "positive");
        let small = AttrConstraint::new(Predicate::leaf("$_self.as_i64() < 8"), "small");
        let pattern = PatternDef::new(
            "ShiftSmall",
            DagNode::op(
                "test.shift",
                [
                    DagNode::var("v"),
                    DagNode::Match {
                        matcher: ArgMatcher::AttrAnyOf(vec![positive, small]),
                        binding: Some("n".into()),
                    },
                ],
            ),
        )
        .constraint(SideConstraint::Native {
            function: "fits".into(),
            args: vec!["n".into(), "v".into()],
        })
        .result(DagNode::op(
            "test.shift",
            [
                DagNode::var("v"),
                DagNode::Transform {
                    template: CodeTemplate::parse("$_builder.int_attr($0.as_i64() - 1)"),
                    args: vec![DagNode::var("n")],
                },
            ],
        ));

        let unit = compile(&pattern).unwrap();
        assert_eq!(
            unit.match_body[2..],
            [
                Stmt::LetElse {
                    name: "v_n".into(),
                    value: Expr::code("op.attr(\"amount\")"),
                    otherwise: vec![Stmt::NoMatch],
                },
                no_match_unless("(v_n.as_i64() > 0 || v_n.as_i64() < 8)"),
                Stmt::when(
                    Expr::Call {
                        callee: "fits".into(),
                        args: vec![Expr::var("v_n"), Expr::var("v_v")],
                    }
                    .negated(),
                    vec![Stmt::NoMatch],
                ),
            ]
        );
        let Stmt::CreateOp { attributes, .. } = &unit.rewrite_body[0] else {
            panic!("expected op creation");
        };
        assert_eq!(
            attributes,
            &vec![AttrInit {
                name: "amount".into(),
                value: Expr::code("builder.int_attr(v_n.as_i64() - 1)"),
            }]
        );
    }

    #[test]
    fn test_results_replace_in_order_with_native_builders() {
        let pattern = PatternDef::new("Split", DagNode::op("test.split", [DagNode::var("x")]))
            .result(DagNode::Native {
                function: "build_low".into(),
                args: vec![DagNode::var("x")],
                binding: None,
            })
            .result(DagNode::op("test.bar", [DagNode::var("x")]));

        let unit = compile(&pattern).unwrap();
        assert_eq!(
            unit.rewrite_body.last(),
            Some(&Stmt::Replace {
                target: "op".into(),
                values: vec![Expr::var("r0"), Expr::code("r1.result(0)")],
            })
        );
    }

    #[test]
    fn test_result_count_must_match_root() {
        let pattern = PatternDef::new("Triple", DagNode::op("test.bar", [DagNode::var("x")]))
            .result(DagNode::var("x"))
            .result(DagNode::var("x"))
            .result(DagNode::var("x"));
        assert_eq!(
            compile(&pattern).unwrap_err().to_string(),
            "invalid pattern: `test.bar` needs 1 replacement values, `Triple` gives 3"
        );

        let short = PatternDef::new("Short", DagNode::op("test.split", [DagNode::var("x")]))
            .result(DagNode::var("x"));
        assert_eq!(
            compile(&short).unwrap_err().to_string(),
            "invalid pattern: `test.split` needs 2 replacement values, `Short` gives 1"
        );

        let unpack = |count: usize| {
            (0..count).fold(
                PatternDef::new("Unpack", DagNode::op("test.unpack", [DagNode::var("x")])),
                |pattern, _| pattern.result(DagNode::var("x")),
            )
        };
        assert!(compile(&unpack(1)).is_ok());
        assert!(compile(&unpack(3)).is_ok());
        assert_eq!(
            compile(&unpack(0)).unwrap_err().to_string(),
            "invalid pattern: `test.unpack` needs at least 1 replacement values, `Unpack` gives 0"
        );
    }

    #[test]
    fn test_bound_names_do_not_shadow_generated_locals() {
        let pattern = PatternDef::new("Shadow", DagNode::op("test.split", [DagNode::var("r0")]))
            .result(DagNode::Native {
                function: "build_low".into(),
                args: vec![DagNode::var("r0")],
                binding: None,
            })
            .result(DagNode::op("test.bar", [DagNode::var("r0")]));

        let unit = compile(&pattern).unwrap();
        assert_eq!(unit.binding("r0").unwrap().local, "v_r0");
        assert_eq!(
            unit.rewrite_body,
            vec![
                Stmt::Let {
                    name: "r0".into(),
                    value: Expr::Call {
                        callee: "build_low".into(),
                        args: vec![Expr::var("v_r0")],
                    },
                },
                Stmt::CreateOp {
                    name: "r1".into(),
                    op: "test.bar".into(),
                    operands: vec![Expr::var("v_r0")],
                    attributes: vec![],
                    result_types: Expr::code("op.result_types()"),
                },
                Stmt::Replace {
                    target: "op".into(),
                    values: vec![Expr::var("r0"), Expr::code("r1.result(0)")],
                },
            ]
        );
    }

    #[test]
    fn test_defaulted_attribute_reads_default_when_absent() {
        let pattern = PatternDef::new(
            "StepToBar",
            DagNode::op("test.step", [DagNode::var("v"), DagNode::var("n")]),
        )
        .result(DagNode::op("test.bar", [DagNode::var("v")]));

        let unit = compile(&pattern).unwrap();
        assert_eq!(
            unit.match_body[2],
            Stmt::Let {
                name: "v_n".into(),
                value: Expr::code("op.attr(\"amount\")")
                    .or_else(Expr::code("builder.int_attr(1)")),
            }
        );
        assert_eq!(unit.match_body.len(), 3);

        let constrained = PatternDef::new(
            "PositiveStep",
            DagNode::op(
                "test.step",
                [
                    DagNode::var("v"),
                    DagNode::Match {
                        matcher: ArgMatcher::Attr(AttrConstraint::new(
                            Predicate::leaf("$_self.as_i64() > 0"),
                            "positive",
                        )),
                        binding: None,
                    },
                ],
            ),
        )
        .result(DagNode::var("v"));

        let unit = compile(&constrained).unwrap();
        assert_eq!(
            unit.match_body[2..],
            [
                Stmt::Let {
                    name: "attr0".into(),
                    value: Expr::code("op.attr(\"amount\")")
                        .or_else(Expr::code("builder.int_attr(1)")),
                },
                no_match_unless("attr0.as_i64() > 0"),
            ]
        );
    }

    #[test]
    fn test_optional_attribute_binds_absence() {
        let pattern = PatternDef::new(
            "Untag",
            DagNode::op("test.tag", [DagNode::var("v"), DagNode::var("label")]),
        )
        .result(DagNode::var("v"));

        let unit = compile(&pattern).unwrap();
        assert_eq!(
            unit.match_body[2..],
            [Stmt::Let {
                name: "v_label".into(),
                value: Expr::code("op.attr(\"label\")"),
            }]
        );

        let constrained = PatternDef::new(
            "UntagSmall",
            DagNode::op(
                "test.tag",
                [
                    DagNode::var("v"),
                    DagNode::Match {
                        matcher: ArgMatcher::Attr(AttrConstraint::new(
                            Predicate::leaf("$_self.as_i64() < 8"),
                            "small",
                        )),
                        binding: Some("label".into()),
                    },
                ],
            ),
        )
        .result(DagNode::var("v"));

        let unit = compile(&constrained).unwrap();
        assert_eq!(
            unit.match_body[2..],
            [
                Stmt::Let {
                    name: "v_label".into(),
                    value: Expr::code("op.attr(\"label\")"),
                },
                Stmt::LetElse {
                    name: "attr0".into(),
                    value: Expr::var("v_label"),
                    otherwise: vec![Stmt::NoMatch],
                },
                no_match_unless("attr0.as_i64() < 8"),
            ]
        );
    }

    #[test]
    fn test_rejected_ops_fail_dependent_patterns() {
        let ops = ops();
        let mut table = OpTable::new(&ops);
        table.reject("test.bar");

        let pattern = PatternDef::new("UsesBar", DagNode::op("test.bar", [DagNode::var("x")]))
            .result(DagNode::var("x"));
        assert_eq!(
            compile_pattern(&pattern, &table, &GenConfig::default())
                .unwrap_err()
                .to_string(),
            "invalid pattern: op `test.bar` has an invalid definition"
        );
    }

    #[test]
    fn test_invalid_patterns() {
        let unbound = PatternDef::new("Unbound", DagNode::op("test.bar", [DagNode::var("x")]))
            .result(DagNode::var("y"));
        assert_eq!(
            compile(&unbound).unwrap_err().to_string(),
            "invalid pattern: `y` is not bound in the source pattern"
        );

        let arity = PatternDef::new("Arity", DagNode::op("test.foo", [DagNode::var("x")]))
            .result(DagNode::var("x"));
        assert_eq!(
            compile(&arity).unwrap_err().to_string(),
            "invalid pattern: `test.foo` takes 2 arguments, pattern gives 1"
        );

        let unknown = PatternDef::new("Unknown", DagNode::op("test.nope", []))
            .result(DagNode::Literal("x".into()));
        assert_eq!(
            compile(&unknown).unwrap_err().to_string(),
            "invalid pattern: unknown op `test.nope`"
        );

        let not_op = PatternDef::new("NotOp", DagNode::var("x")).result(DagNode::var("x"));
        assert!(compile(&not_op).is_err());
    }
}
