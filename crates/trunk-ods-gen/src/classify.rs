//! Argument classification.
//!
//! Splits an op's interleaved argument list into operands, stored attributes,
//! and derived attributes, in one pass and without reordering. Placement
//! rules for variadics are checked here so synthesis only ever sees a valid
//! shape.

use std::collections::HashMap;

use smallvec::SmallVec;
use tracing::warn;
use trunk_ods_model::{
    ArgKind, Argument, Attr, DerivedAttr, OdsError, OdsResult, OpDef, ResultDecl, Type,
};

use crate::synth::accessor_name;
use crate::unit::AttrStorage;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperandArg<'a> {
    pub name: &'a str,
    /// Position among operands.
    pub index: usize,
    pub ty: &'a Type,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttrArg<'a> {
    pub name: &'a str,
    pub attr: &'a Attr,
    pub storage: AttrStorage,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DerivedArg<'a> {
    pub name: &'a str,
    pub attr: &'a DerivedAttr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultArg<'a> {
    pub name: &'a str,
    pub index: usize,
    pub ty: &'a Type,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArgumentLists<'a> {
    pub operands: SmallVec<[OperandArg<'a>; 4]>,
    pub attributes: SmallVec<[AttrArg<'a>; 4]>,
    pub derived: SmallVec<[DerivedArg<'a>; 2]>,
}

/// An op with its arguments and results classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedOp<'a> {
    pub op: &'a OpDef,
    pub arguments: ArgumentLists<'a>,
    pub results: SmallVec<[ResultArg<'a>; 2]>,
}

impl ClassifiedOp<'_> {
    pub fn variadic_operand(&self) -> Option<&OperandArg<'_>> {
        self.arguments.operands.iter().find(|operand| operand.ty.variadic)
    }
}

/// Storage class of a stored attribute.
pub fn attr_storage(name: &str, attr: &Attr) -> OdsResult<AttrStorage> {
    match (&attr.default_value, &attr.const_builder) {
        (Some(_), None) => Err(OdsError::invalid_argument_shape(format!(
            "attribute '{name}' has a default value but no constant builder"
        ))),
        (Some(_), Some(_)) => {
            if attr.optional {
                warn!(attribute = name, "optional attribute with a default is treated as defaulted");
            }
            Ok(AttrStorage::Defaulted)
        }
        (None, _) if attr.optional => Ok(AttrStorage::Optional),
        (None, _) => Ok(AttrStorage::Required),
    }
}

pub fn classify_arguments<'a>(op_name: &str, args: &'a [Argument]) -> OdsResult<ArgumentLists<'a>> {
    let mut lists = ArgumentLists::default();
    let mut names = HashMap::new();

    for arg in args {
        claim_name(&mut names, op_name, &arg.name)?;
        match &arg.kind {
            ArgKind::Operand(ty) => lists.operands.push(OperandArg {
                name: &arg.name,
                index: lists.operands.len(),
                ty,
            }),
            ArgKind::Attr(attr) => lists.attributes.push(AttrArg {
                name: &arg.name,
                attr,
                storage: attr_storage(&arg.name, attr)?,
            }),
            ArgKind::Derived(attr) => lists.derived.push(DerivedArg {
                name: &arg.name,
                attr,
            }),
        }
    }

    check_variadic(
        op_name,
        "operand",
        lists.operands.iter().map(|operand| (operand.name, operand.ty)),
    )?;
    Ok(lists)
}

pub fn classify_results<'a>(
    op_name: &str,
    results: &'a [ResultDecl],
) -> OdsResult<SmallVec<[ResultArg<'a>; 2]>> {
    let classified: SmallVec<[ResultArg<'a>; 2]> = results
        .iter()
        .enumerate()
        .map(|(index, result)| ResultArg {
            name: &result.name,
            index,
            ty: &result.ty,
        })
        .collect();
    check_variadic(
        op_name,
        "result",
        classified.iter().map(|result| (result.name, result.ty)),
    )?;
    Ok(classified)
}

pub fn classify_op(op: &OpDef) -> OdsResult<ClassifiedOp<'_>> {
    let arguments = classify_arguments(&op.name, &op.arguments)?;
    let results = classify_results(&op.name, &op.results)?;

    let mut names: HashMap<String, &str> = op
        .arguments
        .iter()
        .map(|arg| (accessor_name(&arg.name), arg.name.as_str()))
        .collect();
    for result in &op.results {
        claim_name(&mut names, &op.name, &result.name)?;
    }

    Ok(ClassifiedOp {
        op,
        arguments,
        results,
    })
}

/// Declared names must stay distinct once turned into accessor names.
fn claim_name<'a>(
    names: &mut HashMap<String, &'a str>,
    op_name: &str,
    name: &'a str,
) -> OdsResult<()> {
    let accessor = accessor_name(name);
    match names.get(&accessor).copied() {
        None => {
            names.insert(accessor, name);
            Ok(())
        }
        Some(previous) if previous == name => Err(OdsError::invalid_argument_shape(format!(
            "`{op_name}` declares '{name}' more than once"
        ))),
        Some(previous) => Err(OdsError::invalid_argument_shape(format!(
            "'{previous}' and '{name}' of `{op_name}` both become `{accessor}`"
        ))),
    }
}

/// At most one variadic entry, and only in the last position.
fn check_variadic<'a>(
    op_name: &str,
    what: &str,
    entries: impl ExactSizeIterator<Item = (&'a str, &'a Type)>,
) -> OdsResult<()> {
    let len = entries.len();
    let variadics: SmallVec<[(usize, &str); 2]> = entries
        .enumerate()
        .filter(|(_, (_, ty))| ty.variadic)
        .map(|(position, (name, _))| (position, name))
        .collect();

    match variadics.as_slice() {
        [] => Ok(()),
        [(position, _)] if position + 1 == len => Ok(()),
        [(_, name)] => Err(OdsError::invalid_argument_shape(format!(
            "variadic {what} '{name}' of `{op_name}` must be the last {what}"
        ))),
        [(_, first), (_, second), ..] => Err(OdsError::invalid_argument_shape(format!(
            "`{op_name}` has more than one variadic {what}: '{first}' and '{second}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trunk_ods_model::{AttrConstraint, Predicate, TypeConstraint};

    fn any() -> Type {
        Type::new(TypeConstraint::any())
    }

    fn attr() -> Attr {
        Attr::new(
            AttrConstraint::new(Predicate::leaf("$_self.is_f32_attr()"), "float attribute"),
            "FloatAttr",
            "f32",
        )
        .with_const_builder("$_builder.f32_attr($0)")
    }

    fn names<'a>(lists: &ArgumentLists<'a>) -> (Vec<&'a str>, Vec<&'a str>) {
        (
            lists.operands.iter().map(|o| o.name).collect(),
            lists.attributes.iter().map(|a| a.name).collect(),
        )
    }

    #[test]
    fn test_interleaved_arguments_keep_relative_order() {
        let op = OpDef::new("test.mixed")
            .attribute("first", attr())
            .operand("lhs", any())
            .attribute("second", attr())
            .operand("rhs", any());

        let lists = classify_arguments(&op.name, &op.arguments).unwrap();
        assert_eq!(names(&lists), (vec!["lhs", "rhs"], vec!["first", "second"]));
        assert_eq!(lists.operands[1].index, 1);

        // Classifying again gives the same lists.
        let again = classify_arguments(&op.name, &op.arguments).unwrap();
        assert_eq!(lists, again);
    }

    #[test]
    fn test_storage_classes() {
        let op = OpDef::new("test.attrs")
            .attribute("a", attr())
            .attribute("b", attr().with_default("4.2"))
            .attribute("c", attr().optional())
            .attribute("d", attr().optional().with_default("1.0"));

        let lists = classify_arguments(&op.name, &op.arguments).unwrap();
        let storage: Vec<_> = lists.attributes.iter().map(|a| a.storage).collect();
        assert_eq!(
            storage,
            vec![
                AttrStorage::Required,
                AttrStorage::Defaulted,
                AttrStorage::Optional,
                AttrStorage::Defaulted,
            ]
        );
    }

    #[test]
    fn test_default_needs_constant_builder() {
        let mut bare = attr().with_default("1.0");
        bare.const_builder = None;
        let op = OpDef::new("test.bad").attribute("x", bare);

        let err = classify_arguments(&op.name, &op.arguments).unwrap_err();
        assert!(err.is_argument_shape());
        assert_eq!(
            err.to_string(),
            "invalid argument shape: attribute 'x' has a default value but no constant builder"
        );
    }

    #[test]
    fn test_variadic_placement() {
        let last = OpDef::new("test.ok")
            .operand("a", any())
            .attribute("flag", attr())
            .operand("rest", any().variadic());
        assert!(classify_op(&last).is_ok());

        let early = OpDef::new("test.early")
            .operand("rest", any().variadic())
            .operand("b", any());
        let err = classify_op(&early).unwrap_err();
        assert!(err.is_argument_shape());
        assert_eq!(
            err.to_string(),
            "invalid argument shape: variadic operand 'rest' of `test.early` must be the last operand"
        );

        let results = OpDef::new("test.results")
            .result("many", any().variadic())
            .result("one", any());
        assert!(classify_op(&results).unwrap_err().is_argument_shape());

        let two = OpDef::new("test.two")
            .result("x", any().variadic())
            .result("y", any().variadic());
        assert!(classify_op(&two).unwrap_err().to_string().contains("more than one variadic result"));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let op = OpDef::new("test.dup").operand("x", any()).result("x", any());
        assert!(classify_op(&op).unwrap_err().is_argument_shape());

        let op = OpDef::new("test.dup").operand("x", any()).attribute("x", attr());
        assert_eq!(
            classify_op(&op).unwrap_err().to_string(),
            "invalid argument shape: `test.dup` declares 'x' more than once"
        );
    }

    #[test]
    fn test_names_colliding_after_snake_case_are_rejected() {
        let op = OpDef::new("test.case")
            .operand("fooBar", any())
            .attribute("foo_bar", attr());
        assert_eq!(
            classify_op(&op).unwrap_err().to_string(),
            "invalid argument shape: 'fooBar' and 'foo_bar' of `test.case` both become `foo_bar`"
        );

        let op = OpDef::new("test.case")
            .operand("lowBits", any())
            .result("low_bits", any());
        assert_eq!(
            classify_op(&op).unwrap_err().to_string(),
            "invalid argument shape: 'lowBits' and 'low_bits' of `test.case` both become `low_bits`"
        );
    }
}
