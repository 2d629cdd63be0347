//! Lowering of resolved records into the typed model.
//!
//! Every record whose class chain contains `Op` becomes an [`OpDef`], every
//! `Pattern` or `Pat` a [`PatternDef`]. Other records are only reachable
//! through references. Errors are reported per record.

use std::cell::RefCell;

use tracing::{debug, trace};
use trunk_ods_records::{Dag, DagArg, FieldValue, RecordError, ResolvedGraph, ResolvedRecord};

use crate::constraint::{
    Attr, AttrConstraint, DerivedAttr, OpTrait, ShapeFormatter, Type, TypeConstraint,
    constant_attr, container_of,
};
use crate::error::{OdsError, OdsResult};
use crate::op::{Argument, CustomHooks, OpDef, ResultDecl};
use crate::pattern::{ArgMatcher, DagNode, OpNode, PatternDef, SideConstraint};
use crate::pred::{CombinerKind, Predicate};
use crate::template::{Ambient, CodeTemplate};

const DEFAULT_SHAPE_CALL: &str = "$_self.shape()";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoweredItem {
    Op(OpDef),
    Pattern(PatternDef),
}

/// Outcome of lowering one top-level record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoweredRecord {
    pub name: String,
    pub result: OdsResult<LoweredItem>,
}

/// Lower every op and pattern record, in declaration order.
pub fn lower_records(
    graph: &ResolvedGraph,
    ambient: &Ambient,
    shapes: &dyn ShapeFormatter,
) -> Vec<LoweredRecord> {
    let lowerer = Lowerer {
        graph,
        ambient,
        shapes,
        active: RefCell::new(Vec::new()),
    };

    let mut lowered = Vec::new();
    for record in &graph.records {
        let result = if record.is_a("Op") {
            lowerer.op(record).map(LoweredItem::Op)
        } else if record.is_a("Pattern") || record.is_a("Pat") {
            lowerer.pattern(record).map(LoweredItem::Pattern)
        } else {
            continue;
        };
        match &result {
            Ok(_) => trace!(record = %record.name, "lowered record"),
            Err(error) => debug!(record = %record.name, %error, "lowering failed"),
        }
        lowered.push(LoweredRecord {
            name: record.name.clone(),
            result,
        });
    }
    lowered
}

struct Lowerer<'a> {
    graph: &'a ResolvedGraph,
    ambient: &'a Ambient,
    shapes: &'a dyn ShapeFormatter,
    /// Records currently being lowered, to reject reference cycles.
    active: RefCell<Vec<String>>,
}

impl<'a> Lowerer<'a> {
    /// Look up `name` and lower it with `f`, rejecting cycles.
    fn visit<T>(
        &self,
        name: &str,
        f: impl FnOnce(&'a ResolvedRecord) -> OdsResult<T>,
    ) -> OdsResult<T> {
        let record = self.graph.expect(name)?;
        if self.active.borrow().iter().any(|active| active == name) {
            return Err(RecordError::CyclicReference(name.to_owned()).into());
        }
        self.active.borrow_mut().push(name.to_owned());
        let result = f(record);
        self.active.borrow_mut().pop();
        result
    }

    // =========================================================================
    // Predicates and constraints
    // =========================================================================

    fn predicate(&self, name: &str) -> OdsResult<Predicate> {
        self.visit(name, |record| {
            if record.is_a("CPred") {
                return Ok(Predicate::leaf(record.text("predExpr")?));
            }

            let kind = if record.is_a("AllOf") {
                CombinerKind::And
            } else if record.is_a("AnyOf") {
                CombinerKind::Or
            } else if record.is_a("Neg") {
                CombinerKind::Not
            } else if record.is_a("SubstLeaves") {
                CombinerKind::SubstLeaves {
                    pattern: record.text("pattern")?.to_owned(),
                    replacement: record.text("replacement")?.to_owned(),
                }
            } else if record.is_a("TypeConstraint") || record.is_a("AttrConstraint") {
                return self.predicate(record.def_ref("predicate")?);
            } else {
                return Err(OdsError::invalid_predicate_shape(format!(
                    "`{}` is not a predicate",
                    record.name
                )));
            };

            let children = record
                .def_list("children")?
                .into_iter()
                .map(|child| self.predicate(child))
                .collect::<OdsResult<Vec<_>>>()?;
            Predicate::combine(kind, children)
        })
    }

    fn ty(&self, name: &str) -> OdsResult<Type> {
        self.visit(name, |record| {
            if record.is_a("Variadic") {
                let base = self.ty(record.def_ref("baseType")?)?;
                if base.variadic {
                    return Err(OdsError::invalid_argument_shape(format!(
                        "`{}` nests variadic types",
                        record.name
                    )));
                }
                return Ok(base.variadic());
            }

            let mut ty = if record.is_a("ContainerType") {
                let element = self.ty(record.def_ref("elementType")?)?;
                if element.variadic {
                    return Err(OdsError::invalid_argument_shape(format!(
                        "`{}` has a variadic element type",
                        record.name
                    )));
                }
                let mut container = container_of(
                    self.predicate(record.def_ref("containerPred")?)?,
                    record.text("elementTypeCall")?,
                    record.text("noun")?,
                    element,
                );
                let shape = record.int_list("shape")?;
                if !shape.is_empty() {
                    let call = record.opt_text("shapeCall")?.unwrap_or(DEFAULT_SHAPE_CALL);
                    container = container.with_shape(call, &shape, self.shapes);
                }
                container.into_type()
            } else if record.is_a("TypeConstraint") {
                Type::new(TypeConstraint::new(
                    self.predicate(record.def_ref("predicate")?)?,
                    record.text_or_empty("summary")?,
                ))
            } else {
                return Err(OdsError::invalid_argument_shape(format!(
                    "`{}` is not a type",
                    record.name
                )));
            };

            ty.value_type = non_empty(record.opt_text("valueType")?);
            Ok(ty)
        })
    }

    fn type_constraint(&self, name: &str) -> OdsResult<TypeConstraint> {
        let ty = self.ty(name)?;
        if ty.variadic {
            return Err(OdsError::invalid_pattern(format!(
                "variadic type `{name}` used as a constraint"
            )));
        }
        Ok(ty.constraint)
    }

    fn attr_constraint(&self, name: &str) -> OdsResult<AttrConstraint> {
        self.visit(name, |record| {
            if !record.is_a("AttrConstraint") {
                return Err(OdsError::invalid_argument_shape(format!(
                    "`{}` is not an attribute constraint",
                    record.name
                )));
            }
            Ok(AttrConstraint::new(
                self.predicate(record.def_ref("predicate")?)?,
                record.text_or_empty("summary")?,
            ))
        })
    }

    fn attr(&self, name: &str) -> OdsResult<Attr> {
        let constraint = self.attr_constraint(name)?;
        let record = self.graph.expect(name)?;
        let mut attr = Attr::new(
            constraint,
            record.text_or_empty("storageType")?,
            record.text_or_empty("returnType")?,
        );
        if let Some(convert) = non_empty(record.opt_text("convertFromStorage")?) {
            attr.convert_from_storage = CodeTemplate::parse(convert);
        }
        attr.const_builder = non_empty(record.opt_text("constBuilderCall")?).map(CodeTemplate::parse);
        attr.default_value = non_empty(record.opt_text("defaultValue")?);
        attr.optional = record.bit("isOptional")?;
        Ok(attr)
    }

    fn derived_attr(&self, record: &ResolvedRecord) -> OdsResult<DerivedAttr> {
        let mut derived = DerivedAttr::new(record.text_or_empty("returnType")?, record.text("body")?);
        derived.description = record.text_or_empty("summary")?.to_owned();
        Ok(derived)
    }

    /// The equality check and the built value of a `ConstantAttr`.
    fn constant(&self, record: &ResolvedRecord) -> OdsResult<ArgMatcher> {
        let attr = self.attr(record.def_ref("attr")?)?;
        let literal = record.text("value")?;
        Ok(ArgMatcher::Constant {
            check: constant_attr(&attr, literal, self.ambient)?,
            value: attr.build_constant(literal, self.ambient)?,
        })
    }

    // =========================================================================
    // Operations
    // =========================================================================

    fn op(&self, record: &ResolvedRecord) -> OdsResult<OpDef> {
        let mut op = OpDef::new(record.text("opName")?);
        op.summary = record.text_or_empty("summary")?.to_owned();
        op.description = record.text_or_empty("description")?.to_owned();

        if let Some(dag) = record.opt_dag("arguments")? {
            expect_marker(record, dag, "ins")?;
            op.arguments = dag
                .args
                .iter()
                .map(|arg| self.argument(record, arg))
                .collect::<OdsResult<_>>()?;
        }
        if let Some(dag) = record.opt_dag("results")? {
            expect_marker(record, dag, "outs")?;
            op.results = dag
                .args
                .iter()
                .map(|arg| {
                    let (def, name) = named_def(record, arg)?;
                    Ok(ResultDecl {
                        name: name.to_owned(),
                        ty: self.ty(def)?,
                    })
                })
                .collect::<OdsResult<_>>()?;
        }

        op.traits = record
            .def_list("traits")?
            .into_iter()
            .map(|name| self.op_trait(name))
            .collect::<OdsResult<_>>()?;

        op.hooks = CustomHooks {
            builders: record
                .list("builders")?
                .iter()
                .map(|item| match item {
                    FieldValue::Str(body) | FieldValue::Code(body) => Ok(body.clone()),
                    _ => Err(OdsError::invalid_argument_shape(format!(
                        "custom builder of `{}` is not code",
                        record.name
                    ))),
                })
                .collect::<OdsResult<_>>()?,
            parser: non_empty(record.opt_text("parser")?),
            printer: non_empty(record.opt_text("printer")?),
            verifier: non_empty(record.opt_text("verifier")?),
        };

        op.has_canonicalizer = record.bit("hasCanonicalizer")?;
        op.has_folder = record.bit("hasFolder")?;
        op.has_constant_folder = record.bit("hasConstantFolder")?;
        Ok(op)
    }

    fn argument(&self, op: &ResolvedRecord, arg: &DagArg) -> OdsResult<Argument> {
        let (def, name) = named_def(op, arg)?;
        let record = self.graph.expect(def)?;
        if record.is_a("DerivedAttr") {
            Ok(Argument::derived(name, self.derived_attr(record)?))
        } else if record.is_a("Attr") {
            Ok(Argument::attr(name, self.attr(def)?))
        } else if record.is_a("TypeConstraint") {
            Ok(Argument::operand(name, self.ty(def)?))
        } else {
            Err(OdsError::invalid_argument_shape(format!(
                "argument `{name}` of `{}` is neither a type nor an attribute",
                op.name
            )))
        }
    }

    fn op_trait(&self, name: &str) -> OdsResult<OpTrait> {
        let record = self.graph.expect(name)?;
        if record.is_a("NativeOpTrait") {
            Ok(OpTrait::Native(record.text("trait")?.to_owned()))
        } else if record.is_a("PredOpTrait") {
            Ok(OpTrait::Pred {
                predicate: self.predicate(record.def_ref("predicate")?)?,
                description: record.text_or_empty("description")?.to_owned(),
            })
        } else {
            Err(OdsError::invalid_argument_shape(format!(
                "`{name}` is not an op trait"
            )))
        }
    }

    // =========================================================================
    // Patterns
    // =========================================================================

    fn pattern(&self, record: &ResolvedRecord) -> OdsResult<PatternDef> {
        let source = self.dag_node(record.dag("sourcePattern")?, None)?;

        let results = record
            .list("resultPatterns")?
            .iter()
            .map(|item| self.value_node(item, None))
            .collect::<OdsResult<Vec<_>>>()?;
        if results.is_empty() {
            return Err(OdsError::invalid_pattern(format!(
                "`{}` has no result patterns",
                record.name
            )));
        }

        let constraints = record
            .list("constraints")?
            .iter()
            .map(|item| match item {
                FieldValue::Dag(dag) => self.side_constraint(dag),
                other => Err(OdsError::invalid_pattern(format!(
                    "constraint of `{}` is a {}, not a dag",
                    record.name,
                    other.kind_name()
                ))),
            })
            .collect::<OdsResult<_>>()?;

        Ok(PatternDef {
            name: record.name.clone(),
            source,
            results,
            constraints,
            benefit_added: record.int("benefitAdded")?,
        })
    }

    fn value_node(&self, value: &FieldValue, binding: Option<&str>) -> OdsResult<DagNode> {
        let binding = binding.map(str::to_owned);
        match value {
            FieldValue::Unset => binding.map(DagNode::Var).ok_or_else(|| {
                OdsError::invalid_pattern("argument has neither a value nor a name")
            }),
            FieldValue::Dag(dag) => self.dag_node(dag, binding),
            FieldValue::Def(name) => {
                let matcher = self.matcher(name)?;
                Ok(DagNode::Match { matcher, binding })
            }
            FieldValue::Str(text) | FieldValue::Code(text) => Ok(DagNode::Literal(text.clone())),
            FieldValue::Int(value) => Ok(DagNode::Literal(value.to_string())),
            other => Err(OdsError::invalid_pattern(format!(
                "a {} cannot appear in a pattern",
                other.kind_name()
            ))),
        }
    }

    fn args(&self, dag: &Dag) -> OdsResult<Vec<DagNode>> {
        dag.args
            .iter()
            .map(|arg| self.value_node(&arg.value, arg.name.as_deref()))
            .collect()
    }

    fn dag_node(&self, dag: &Dag, binding: Option<String>) -> OdsResult<DagNode> {
        let operator = self.graph.expect(&dag.operator)?;

        if operator.is_a("Op") {
            let mut node = OpNode::new(operator.text("opName")?, self.args(dag)?);
            node.binding = binding;
            Ok(DagNode::Op(node))
        } else if operator.is_a("cOp") {
            Ok(DagNode::Native {
                function: operator.text("function")?.to_owned(),
                args: self.args(dag)?,
                binding,
            })
        } else if operator.is_a("tAttr") {
            Ok(DagNode::Transform {
                template: CodeTemplate::parse(operator.text("attrTransform")?),
                args: self.args(dag)?,
            })
        } else if operator.is_a("replaceWithValue") {
            match dag.args.as_slice() {
                [DagArg {
                    value: FieldValue::Unset,
                    name: Some(name),
                }] => Ok(DagNode::ReplaceWithValue(name.clone())),
                _ => Err(OdsError::invalid_pattern(
                    "replaceWithValue takes exactly one bound name",
                )),
            }
        } else {
            Err(OdsError::invalid_pattern(format!(
                "`{}` cannot be applied in a pattern",
                operator.name
            )))
        }
    }

    fn matcher(&self, name: &str) -> OdsResult<ArgMatcher> {
        let record = self.graph.expect(name)?;
        if record.is_a("ConstantAttr") {
            self.constant(record)
        } else if record.is_a("mAttr") {
            Ok(ArgMatcher::Attr(self.attr_constraint(record.def_ref("attr")?)?))
        } else if record.is_a("mAttrAnyOf") {
            let alternatives = record
                .def_list("attrs")?
                .into_iter()
                .map(|attr| self.attr_constraint(attr))
                .collect::<OdsResult<_>>()?;
            Ok(ArgMatcher::AttrAnyOf(alternatives))
        } else if record.is_a("AttrConstraint") {
            Ok(ArgMatcher::Attr(self.attr_constraint(name)?))
        } else if record.is_a("TypeConstraint") {
            Ok(ArgMatcher::Type(self.type_constraint(name)?))
        } else {
            Err(OdsError::invalid_pattern(format!(
                "`{name}` is not a matcher"
            )))
        }
    }

    fn side_constraint(&self, dag: &Dag) -> OdsResult<SideConstraint> {
        let operator = self.graph.expect(&dag.operator)?;
        let vars = dag
            .args
            .iter()
            .map(|arg| match (&arg.value, &arg.name) {
                (FieldValue::Unset, Some(name)) => Ok(name.clone()),
                _ => Err(OdsError::invalid_pattern(format!(
                    "constraint `{}` takes bound names only",
                    operator.name
                ))),
            })
            .collect::<OdsResult<Vec<_>>>()?;

        if operator.is_a("mPat") {
            return Ok(SideConstraint::Native {
                function: operator.text("funcName")?.to_owned(),
                args: vars,
            });
        }

        let [var] = <[String; 1]>::try_from(vars).map_err(|_| {
            OdsError::invalid_pattern(format!(
                "constraint `{}` applies to exactly one name",
                operator.name
            ))
        })?;
        if operator.is_a("AttrConstraint") {
            Ok(SideConstraint::Attr {
                constraint: self.attr_constraint(&operator.name)?,
                var,
            })
        } else if operator.is_a("TypeConstraint") {
            Ok(SideConstraint::Type {
                constraint: self.type_constraint(&operator.name)?,
                var,
            })
        } else {
            Err(OdsError::invalid_pattern(format!(
                "`{}` is not a constraint",
                operator.name
            )))
        }
    }
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty()).map(str::to_owned)
}

fn expect_marker(record: &ResolvedRecord, dag: &Dag, marker: &str) -> OdsResult<()> {
    if dag.operator != marker {
        return Err(OdsError::invalid_argument_shape(format!(
            "`{}` lists `{}` where `{marker}` is expected",
            record.name, dag.operator
        )));
    }
    Ok(())
}

fn named_def<'r>(record: &ResolvedRecord, arg: &'r DagArg) -> OdsResult<(&'r str, &'r str)> {
    match (&arg.value, &arg.name) {
        (FieldValue::Def(def), Some(name)) => Ok((def, name)),
        _ => Err(OdsError::invalid_argument_shape(format!(
            "every entry of `{}` needs a constraint and a name",
            record.name
        ))),
    }
}
