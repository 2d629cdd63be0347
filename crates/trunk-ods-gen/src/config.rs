//! Generator configuration.
//!
//! Host-facing spellings live here, so the synthesizer itself never hardcodes
//! a host API. Every field has a default; a config file only names what it
//! changes.

use serde::{Deserialize, Serialize};
use trunk_ods_model::{Ambient, ArrayLiteralShape, ShapeFormatter};

/// How fixed shapes are spelled in container checks.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, salsa::Update,
)]
#[serde(rename_all = "snake_case")]
pub enum ShapeLiteralStyle {
    /// `[2, 3]`
    #[default]
    ArrayLiteral,
    /// `&[2, 3]`
    SliceRef,
    /// `vec![2, 3]`
    VecMacro,
}

impl ShapeFormatter for ShapeLiteralStyle {
    fn format_shape(&self, dims: &[i64]) -> String {
        let array = ArrayLiteralShape.format_shape(dims);
        match self {
            ShapeLiteralStyle::ArrayLiteral => array,
            ShapeLiteralStyle::SliceRef => format!("&{array}"),
            ShapeLiteralStyle::VecMacro => format!("vec!{array}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, salsa::Update)]
#[serde(default, rename_all = "snake_case")]
pub struct GenConfig {
    /// Bound to `$_builder`.
    pub builder_name: String,
    /// Bound to `$_ctx`.
    pub context_name: String,
    /// Bound to `$_op`.
    pub op_name: String,

    // Host access templates. `$_self` is the operation or value, `$0` an
    // index or a quoted attribute name.
    pub operand_access: String,
    pub operand_range_access: String,
    pub result_access: String,
    pub result_range_access: String,
    pub attr_lookup: String,
    pub value_type: String,
    pub defining_op: String,
    pub op_is: String,
    pub result_types: String,

    // Representations used in synthesized signatures.
    pub value_repr: String,
    pub value_range_repr: String,
    pub type_repr: String,
    pub type_range_repr: String,
    pub attribute_repr: String,
    pub named_attr_list_repr: String,

    pub shape_style: ShapeLiteralStyle,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            builder_name: "builder".to_owned(),
            context_name: "ctx".to_owned(),
            op_name: "op".to_owned(),
            operand_access: "$_self.operand($0)".to_owned(),
            operand_range_access: "$_self.operands_from($0)".to_owned(),
            result_access: "$_self.result($0)".to_owned(),
            result_range_access: "$_self.results_from($0)".to_owned(),
            attr_lookup: "$_self.attr($0)".to_owned(),
            value_type: "$_ctx.value_ty($_self)".to_owned(),
            defining_op: "$_ctx.defining_op($_self)".to_owned(),
            op_is: "$_self.is($0)".to_owned(),
            result_types: "$_self.result_types()".to_owned(),
            value_repr: "Value".to_owned(),
            value_range_repr: "&[Value]".to_owned(),
            type_repr: "Type".to_owned(),
            type_range_repr: "&[Type]".to_owned(),
            attribute_repr: "Attribute".to_owned(),
            named_attr_list_repr: "&[(&str, Attribute)]".to_owned(),
            shape_style: ShapeLiteralStyle::default(),
        }
    }
}

impl GenConfig {
    /// Names bound to the ambient placeholders.
    pub fn ambient(&self) -> Ambient {
        Ambient {
            builder: self.builder_name.clone(),
            context: self.context_name.clone(),
            op: self.op_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: GenConfig = serde_json::from_str(
            r#"{ "builder_name": "b", "value_repr": "ValueRef", "shape_style": "slice_ref" }"#,
        )
        .expect("valid config");

        assert_eq!(config.builder_name, "b");
        assert_eq!(config.value_repr, "ValueRef");
        assert_eq!(config.context_name, "ctx");
        assert_eq!(config.shape_style, ShapeLiteralStyle::SliceRef);
        assert_eq!(config.ambient().builder, "b");
    }

    #[test]
    fn test_shape_styles() {
        assert_eq!(ShapeLiteralStyle::ArrayLiteral.format_shape(&[2, 3]), "[2, 3]");
        assert_eq!(ShapeLiteralStyle::SliceRef.format_shape(&[4]), "&[4]");
        assert_eq!(ShapeLiteralStyle::VecMacro.format_shape(&[]), "vec![]");
    }
}
