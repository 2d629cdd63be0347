//! Verifier synthesis.
//!
//! Checks run in a fixed order: operands, attributes, results, then
//! predicate traits. Every failing check reports its own message.

use trunk_ods_model::{OpTrait, Predicate, Type};

use super::{Host, accessor_name};
use crate::classify::{AttrArg, ClassifiedOp};
use crate::code::{Block, Expr, Stmt};
use crate::unit::AttrStorage;

/// Local bound to each element of a variadic operand or result.
const ELEMENT_LOCAL: &str = "value";

pub(super) fn verifier_body(op: &ClassifiedOp<'_>, host: &Host<'_>) -> Block {
    let this = host.ambient.op.as_str();
    let mut body = Vec::new();

    for operand in &op.arguments.operands {
        let access = host.operand(this, operand.index, operand.ty.variadic);
        body.extend(value_check("operand", operand.index, operand.name, operand.ty, &access, host));
    }

    for attr in &op.arguments.attributes {
        body.extend(attr_checks(attr, host));
    }

    for result in &op.results {
        let access = host.result(this, result.index, result.ty.variadic);
        body.extend(value_check("result", result.index, result.name, result.ty, &access, host));
    }

    for op_trait in &op.op.traits {
        if let OpTrait::Pred {
            predicate,
            description,
        } = op_trait
        {
            body.push(Stmt::when(
                Expr::code(predicate.expand(this, &host.ambient)).negated(),
                vec![Stmt::Fail(format!("failed to verify that {description}"))],
            ));
        }
    }

    body
}

fn value_check(
    what: &str,
    index: usize,
    name: &str,
    ty: &Type,
    access: &str,
    host: &Host<'_>,
) -> Option<Stmt> {
    let predicate = ty.predicate();
    if predicate.is_trivially_true() {
        return None;
    }
    let fail = Stmt::Fail(format!("{what} #{index} ('{name}') must be {}", ty.describe()));
    let check = |value: &str| {
        Stmt::when(
            Expr::code(predicate.expand(&host.value_type(value), &host.ambient)).negated(),
            vec![fail.clone()],
        )
    };

    Some(if ty.variadic {
        Stmt::ForEach {
            pattern: ELEMENT_LOCAL.to_owned(),
            iter: Expr::code(access),
            body: vec![check(ELEMENT_LOCAL)],
        }
    } else {
        check(access)
    })
}

fn constraint_check(local: &str, predicate: &Predicate, message: String, host: &Host<'_>) -> Block {
    if predicate.is_trivially_true() {
        return Vec::new();
    }
    vec![Stmt::when(
        Expr::code(predicate.expand(local, &host.ambient)).negated(),
        vec![Stmt::Fail(message)],
    )]
}

fn attr_checks(arg: &AttrArg<'_>, host: &Host<'_>) -> Block {
    let local = format!("attr_{}", accessor_name(arg.name));
    let lookup = Expr::code(host.attr(&host.ambient.op, arg.name));
    let constraint = &arg.attr.constraint;
    let check = constraint_check(
        &local,
        &constraint.predicate,
        format!(
            "attribute '{}' failed to satisfy constraint: {}",
            arg.name,
            constraint.describe()
        ),
        host,
    );

    match arg.storage {
        AttrStorage::Required => {
            let mut block = vec![Stmt::LetElse {
                name: local,
                value: lookup,
                otherwise: vec![Stmt::Fail(format!("requires attribute '{}'", arg.name))],
            }];
            block.extend(check);
            block
        }
        AttrStorage::Defaulted | AttrStorage::Optional if check.is_empty() => Vec::new(),
        AttrStorage::Defaulted | AttrStorage::Optional => vec![Stmt::IfLet {
            name: local,
            value: lookup,
            then: check,
            otherwise: Vec::new(),
        }],
    }
}
