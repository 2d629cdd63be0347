//! Accessor synthesis.

use heck::ToSnakeCase;
use trunk_ods_model::OdsResult;

use super::Host;
use crate::classify::{AttrArg, ClassifiedOp};
use crate::code::{Block, Expr, Stmt};
use crate::unit::{Accessor, AccessorKind, AttrStorage};

/// Local holding a looked-up attribute.
const ATTR_LOCAL: &str = "attr";

/// Method name for a declared argument or result name.
pub fn accessor_name(name: &str) -> String {
    name.to_snake_case()
}

pub(super) fn accessors(op: &ClassifiedOp<'_>, host: &Host<'_>) -> OdsResult<Vec<Accessor>> {
    let config = host.config;
    let this = host.ambient.op.as_str();
    let mut accessors = Vec::new();

    for operand in &op.arguments.operands {
        let variadic = operand.ty.variadic;
        accessors.push(Accessor {
            name: accessor_name(operand.name),
            source: operand.name.to_owned(),
            kind: AccessorKind::Operand {
                index: operand.index,
                variadic,
            },
            returns: if variadic {
                config.value_range_repr.clone()
            } else {
                config.value_repr.clone()
            },
            body: vec![Stmt::Return(Expr::code(host.operand(
                this,
                operand.index,
                variadic,
            )))],
        });
    }

    for result in &op.results {
        let variadic = result.ty.variadic;
        accessors.push(Accessor {
            name: accessor_name(result.name),
            source: result.name.to_owned(),
            kind: AccessorKind::Result {
                index: result.index,
                variadic,
            },
            returns: if variadic {
                config.value_range_repr.clone()
            } else {
                config.value_repr.clone()
            },
            body: vec![Stmt::Return(Expr::code(host.result(
                this,
                result.index,
                variadic,
            )))],
        });
    }

    for attr in &op.arguments.attributes {
        accessors.push(attr_accessor(attr, host)?);
    }

    for derived in &op.arguments.derived {
        accessors.push(Accessor {
            name: accessor_name(derived.name),
            source: derived.name.to_owned(),
            kind: AccessorKind::Derived,
            returns: derived.attr.return_type.clone(),
            body: vec![Stmt::Return(Expr::code(
                host.ambient_only(&derived.attr.body),
            ))],
        });
    }

    Ok(accessors)
}

fn attr_accessor(arg: &AttrArg<'_>, host: &Host<'_>) -> OdsResult<Accessor> {
    let attr = arg.attr;
    let lookup = Expr::code(host.attr(&host.ambient.op, arg.name));
    let converted = Expr::code(attr.convert(ATTR_LOCAL, &host.ambient));
    let return_type = if attr.return_type.is_empty() {
        host.config.attribute_repr.clone()
    } else {
        attr.return_type.clone()
    };

    let (returns, body): (String, Block) = match arg.storage {
        AttrStorage::Required => (
            return_type,
            vec![
                Stmt::Let {
                    name: ATTR_LOCAL.to_owned(),
                    value: lookup,
                },
                Stmt::Return(converted),
            ],
        ),
        AttrStorage::Defaulted => {
            let default = attr.default_value.as_deref().unwrap_or_default();
            let built = attr.build_constant(default, &host.ambient)?;
            (
                return_type,
                vec![Stmt::IfLet {
                    name: ATTR_LOCAL.to_owned(),
                    value: lookup,
                    then: vec![Stmt::Return(converted)],
                    otherwise: vec![Stmt::Return(Expr::code(
                        attr.convert(&built, &host.ambient),
                    ))],
                }],
            )
        }
        AttrStorage::Optional => (
            format!("Option<{return_type}>"),
            vec![Stmt::IfLet {
                name: ATTR_LOCAL.to_owned(),
                value: lookup,
                then: vec![Stmt::Return(converted.wrap())],
                otherwise: vec![Stmt::Return(Expr::Empty)],
            }],
        ),
    };

    Ok(Accessor {
        name: accessor_name(arg.name),
        source: arg.name.to_owned(),
        kind: AccessorKind::Attribute(arg.storage),
        returns,
        body,
    })
}
