//! Default builders: one positional, one bulk.

use super::{Host, accessor_name};
use crate::classify::ClassifiedOp;
use crate::code::{Expr, Stmt};
use crate::unit::{AttrStorage, Builder, BuilderKind, Param};

pub(super) fn default_builders(op: &ClassifiedOp<'_>, host: &Host<'_>) -> Vec<Builder> {
    vec![positional(op, host), bulk(host)]
}

fn positional(op: &ClassifiedOp<'_>, host: &Host<'_>) -> Builder {
    let config = host.config;
    let mut params = Vec::new();
    let mut body = Vec::new();

    for result in &op.results {
        let name = format!("{}_ty", accessor_name(result.name));
        if result.ty.variadic {
            params.push(param(&name, &config.type_range_repr));
            body.push(Stmt::AddResultTypes(Expr::var(&name)));
        } else {
            params.push(param(&name, &config.type_repr));
            body.push(Stmt::AddResultType(Expr::var(&name)));
        }
    }

    for operand in &op.arguments.operands {
        let name = accessor_name(operand.name);
        if operand.ty.variadic {
            params.push(param(&name, &config.value_range_repr));
            body.push(Stmt::AddOperands(Expr::var(&name)));
        } else {
            params.push(param(&name, operand.ty.value_type_or(&config.value_repr)));
            body.push(Stmt::AddOperand(Expr::var(&name)));
        }
    }

    for attr in &op.arguments.attributes {
        let name = accessor_name(attr.name);
        let storage = if attr.attr.storage_type.is_empty() {
            config.attribute_repr.as_str()
        } else {
            attr.attr.storage_type.as_str()
        };
        let add = Stmt::AddAttribute {
            name: Expr::str(attr.name),
            value: Expr::var(&name),
        };
        match attr.storage {
            AttrStorage::Required | AttrStorage::Defaulted => {
                params.push(param(&name, storage));
                body.push(add);
            }
            AttrStorage::Optional => {
                params.push(param(&name, &format!("Option<{storage}>")));
                body.push(Stmt::IfLet {
                    name: name.clone(),
                    value: Expr::var(&name),
                    then: vec![add],
                    otherwise: Vec::new(),
                });
            }
        }
    }

    Builder::Synthesized {
        kind: BuilderKind::Positional,
        params,
        body,
    }
}

fn bulk(host: &Host<'_>) -> Builder {
    let config = host.config;
    Builder::Synthesized {
        kind: BuilderKind::Bulk,
        params: vec![
            param("result_types", &config.type_range_repr),
            param("operands", &config.value_range_repr),
            param("attributes", &config.named_attr_list_repr),
        ],
        body: vec![
            Stmt::AddResultTypes(Expr::var("result_types")),
            Stmt::AddOperands(Expr::var("operands")),
            Stmt::ForEach {
                pattern: "(name, value)".to_owned(),
                iter: Expr::var("attributes"),
                body: vec![Stmt::AddAttribute {
                    name: Expr::var("name"),
                    value: Expr::var("value"),
                }],
            },
        ],
    }
}

fn param(name: &str, ty: &str) -> Param {
    Param {
        name: name.to_owned(),
        ty: ty.to_owned(),
    }
}
