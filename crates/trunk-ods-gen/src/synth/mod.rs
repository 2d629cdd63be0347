//! Code synthesis for operations.
//!
//! [`synthesize`] classifies an [`OpDef`] and produces its [`OpUnit`]:
//! accessors, verifier, and builders. A hand-written hook replaces the
//! synthesized one for that hook only.

mod accessors;
mod builders;
mod verifier;

use heck::{ToShoutySnakeCase, ToUpperCamelCase};
use tracing::trace;
use trunk_ods_model::{Ambient, CodeTemplate, OdsResult, OpDef, OpTrait, TemplateArgs};

use crate::classify::classify_op;
use crate::config::GenConfig;
use crate::unit::{Builder, Hook, HookDecl, OpUnit};

pub use accessors::accessor_name;

/// Host spellings from a [`GenConfig`], parsed once.
pub(crate) struct Host<'c> {
    pub config: &'c GenConfig,
    pub ambient: Ambient,
    operand: CodeTemplate,
    operand_range: CodeTemplate,
    result: CodeTemplate,
    result_range: CodeTemplate,
    attr_lookup: CodeTemplate,
    value_type: CodeTemplate,
    defining_op: CodeTemplate,
    op_is: CodeTemplate,
    result_types: CodeTemplate,
}

impl<'c> Host<'c> {
    pub fn new(config: &'c GenConfig) -> Self {
        Self {
            config,
            ambient: config.ambient(),
            operand: CodeTemplate::parse(config.operand_access.as_str()),
            operand_range: CodeTemplate::parse(config.operand_range_access.as_str()),
            result: CodeTemplate::parse(config.result_access.as_str()),
            result_range: CodeTemplate::parse(config.result_range_access.as_str()),
            attr_lookup: CodeTemplate::parse(config.attr_lookup.as_str()),
            value_type: CodeTemplate::parse(config.value_type.as_str()),
            defining_op: CodeTemplate::parse(config.defining_op.as_str()),
            op_is: CodeTemplate::parse(config.op_is.as_str()),
            result_types: CodeTemplate::parse(config.result_types.as_str()),
        }
    }

    fn fill(&self, template: &CodeTemplate, subject: &str, arg: Option<String>) -> String {
        let positional: Vec<String> = arg.into_iter().collect();
        template.instantiate(
            &TemplateArgs::new(&self.ambient)
                .with_subject(subject)
                .with_positional(&positional),
        )
    }

    /// Operand `index` of `op`, or the operands from `index` on.
    pub fn operand(&self, op: &str, index: usize, variadic: bool) -> String {
        let template = if variadic {
            &self.operand_range
        } else {
            &self.operand
        };
        self.fill(template, op, Some(index.to_string()))
    }

    /// Result `index` of `op`, or the results from `index` on.
    pub fn result(&self, op: &str, index: usize, variadic: bool) -> String {
        let template = if variadic {
            &self.result_range
        } else {
            &self.result
        };
        self.fill(template, op, Some(index.to_string()))
    }

    /// Optional lookup of attribute `name` on `op`.
    pub fn attr(&self, op: &str, name: &str) -> String {
        self.fill(&self.attr_lookup, op, Some(format!("{name:?}")))
    }

    pub fn value_type(&self, value: &str) -> String {
        self.fill(&self.value_type, value, None)
    }

    /// Optional op defining `value`.
    pub fn defining_op(&self, value: &str) -> String {
        self.fill(&self.defining_op, value, None)
    }

    /// Whether `op` is named `name`.
    pub fn op_is(&self, op: &str, name: &str) -> String {
        self.fill(&self.op_is, op, Some(format!("{name:?}")))
    }

    pub fn result_types(&self, op: &str) -> String {
        self.fill(&self.result_types, op, None)
    }

    /// Template instantiated with only the ambient names bound.
    pub fn ambient_only(&self, template: &CodeTemplate) -> String {
        template.instantiate(&TemplateArgs::new(&self.ambient))
    }
}

/// Synthesize the unit for one op.
pub fn synthesize(op: &OpDef, config: &GenConfig) -> OdsResult<OpUnit> {
    let classified = classify_op(op)?;
    let host = Host::new(config);
    trace!(
        op = %op.name,
        operands = classified.arguments.operands.len(),
        attributes = classified.arguments.attributes.len(),
        "synthesizing op"
    );

    let verifier = match &op.hooks.verifier {
        Some(body) => Hook::Custom(body.clone()),
        None => Hook::Synthesized(verifier::verifier_body(&classified, &host)),
    };

    let builders = if op.hooks.builders.is_empty() {
        builders::default_builders(&classified, &host)
    } else {
        op.hooks.builders.iter().cloned().map(Builder::Custom).collect()
    };

    let mnemonic = op.mnemonic();
    Ok(OpUnit {
        op_name: op.name.clone(),
        name_const: mnemonic.to_shouty_snake_case(),
        wrapper: mnemonic.to_upper_camel_case(),
        summary: op.summary.clone(),
        description: op.description.clone(),
        native_traits: op
            .traits
            .iter()
            .filter_map(|op_trait| match op_trait {
                OpTrait::Native(name) => Some(name.clone()),
                OpTrait::Pred { .. } => None,
            })
            .collect(),
        accessors: accessors::accessors(&classified, &host)?,
        verifier,
        builders,
        parser: op.hooks.parser.clone(),
        printer: op.hooks.printer.clone(),
        hook_decls: hook_decls(op),
    })
}

fn hook_decls(op: &OpDef) -> Vec<HookDecl> {
    [
        (op.has_canonicalizer, HookDecl::Canonicalization),
        (op.has_folder, HookDecl::Fold),
        (op.has_constant_folder, HookDecl::ConstantFold),
    ]
    .into_iter()
    .filter_map(|(set, decl)| set.then_some(decl))
    .collect()
}
