//! Type, container, and attribute constraints.

use crate::error::{OdsError, OdsResult};
use crate::pred::Predicate;
use crate::template::{Ambient, CodeTemplate, SUBJECT, TemplateArgs};

/// Description used when a constraint carries none.
pub const FALLBACK_DESCRIPTION: &str = "value";

fn describe_or_fallback(description: &str) -> &str {
    if description.trim().is_empty() {
        FALLBACK_DESCRIPTION
    } else {
        description
    }
}

/// Escape computed text so it survives being parsed as a template again.
fn escape_template(text: &str) -> String {
    text.replace('$', "$$")
}

// =============================================================================
// Type constraints
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeConstraint {
    pub predicate: Predicate,
    pub description: String,
}

impl TypeConstraint {
    pub fn new(predicate: Predicate, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }

    /// Accepts every type.
    pub fn any() -> Self {
        Self::new(Predicate::truth(), "")
    }

    pub fn describe(&self) -> &str {
        describe_or_fallback(&self.description)
    }

    pub fn predicate_for(&self, subject: &str, ambient: &Ambient) -> String {
        self.predicate.expand(subject, ambient)
    }
}

/// A type constraint usable as an operand or result type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    pub constraint: TypeConstraint,
    /// Host representation of a value of this type in builder signatures.
    pub value_type: Option<String>,
    pub variadic: bool,
    /// Built from a container, whose description already names its values.
    pub container: bool,
}

impl Type {
    pub fn new(constraint: TypeConstraint) -> Self {
        Self {
            constraint,
            value_type: None,
            variadic: false,
            container: false,
        }
    }

    pub fn with_value_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = Some(value_type.into());
        self
    }

    /// Zero or more values of this type.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn predicate(&self) -> &Predicate {
        &self.constraint.predicate
    }

    /// Description of a single value, ignoring variadicity.
    pub fn element_description(&self) -> &str {
        self.constraint.describe()
    }

    pub fn describe(&self) -> String {
        if self.variadic {
            format!("variadic of {}", self.element_description())
        } else {
            self.element_description().to_owned()
        }
    }

    /// Value representation, or `default` when the type names none.
    pub fn value_type_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.value_type.as_deref().unwrap_or(default)
    }
}

impl From<TypeConstraint> for Type {
    fn from(constraint: TypeConstraint) -> Self {
        Type::new(constraint)
    }
}

// =============================================================================
// Containers
// =============================================================================

/// Renders a fixed shape as a literal in the host's expression syntax.
pub trait ShapeFormatter: Send + Sync {
    fn format_shape(&self, dims: &[i64]) -> String;
}

/// Renders `[2, 3]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArrayLiteralShape;

impl ShapeFormatter for ArrayLiteralShape {
    fn format_shape(&self, dims: &[i64]) -> String {
        let dims: Vec<String> = dims.iter().map(i64::to_string).collect();
        format!("[{}]", dims.join(", "))
    }
}

/// A type whose values contain elements of another type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContainerType {
    pub element: Box<Type>,
    /// Checks the container itself, with `$_self` bound to the container type.
    pub container: Predicate,
    /// Expression yielding the element type from `$_self`.
    pub extraction: String,
    pub noun: String,
    /// Trailing part of the description, e.g. ` of shape 2x3`.
    pub qualifier: String,
}

/// Build a container constraint.
///
/// The element predicate is evaluated against the extracted element type,
/// so vector-like and tensor-like containers only differ in their arguments.
pub fn container_of(
    container: Predicate,
    extraction: impl Into<String>,
    noun: impl Into<String>,
    element: Type,
) -> ContainerType {
    ContainerType {
        element: Box::new(element),
        container,
        extraction: extraction.into(),
        noun: noun.into(),
        qualifier: String::new(),
    }
}

impl ContainerType {
    /// Require a fixed shape, read through `shape_call`.
    pub fn with_shape(
        mut self,
        shape_call: &str,
        dims: &[i64],
        formatter: &dyn ShapeFormatter,
    ) -> Self {
        let literal = escape_template(&formatter.format_shape(dims));
        let shape_check = Predicate::leaf(format!("{shape_call} == {literal}"));
        self.container = Predicate::all_of([self.container, shape_check]);

        let dims: Vec<String> = dims.iter().map(i64::to_string).collect();
        self.qualifier = format!(" of shape {}", dims.join("x"));
        self
    }

    pub fn predicate(&self) -> Predicate {
        Predicate::all_of([
            self.container.clone(),
            Predicate::subst_leaves(
                SUBJECT,
                self.extraction.clone(),
                self.element.predicate().clone(),
            ),
        ])
    }

    pub fn predicate_for(&self, subject: &str, ambient: &Ambient) -> String {
        self.predicate().expand(subject, ambient)
    }

    pub fn description(&self) -> String {
        let suffix = if self.element.container { "" } else { " values" };
        format!(
            "{} of {}{suffix}{}",
            self.noun,
            self.element.element_description(),
            self.qualifier
        )
    }

    pub fn constraint(&self) -> TypeConstraint {
        TypeConstraint::new(self.predicate(), self.description())
    }

    pub fn into_type(self) -> Type {
        let mut ty = Type::new(self.constraint());
        ty.container = true;
        ty
    }
}

// =============================================================================
// Attributes
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AttrConstraint {
    pub predicate: Predicate,
    pub description: String,
}

impl AttrConstraint {
    pub fn new(predicate: Predicate, description: impl Into<String>) -> Self {
        Self {
            predicate,
            description: description.into(),
        }
    }

    pub fn describe(&self) -> &str {
        describe_or_fallback(&self.description)
    }

    pub fn predicate_for(&self, subject: &str, ambient: &Ambient) -> String {
        self.predicate.expand(subject, ambient)
    }
}

/// A stored attribute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Attr {
    pub constraint: AttrConstraint,
    pub storage_type: String,
    pub return_type: String,
    /// Converts the stored attribute (`$_self`) into the return type.
    pub convert_from_storage: CodeTemplate,
    /// Builds an attribute from `$0` with `$_builder`.
    pub const_builder: Option<CodeTemplate>,
    pub default_value: Option<String>,
    pub optional: bool,
}

impl Attr {
    pub fn new(
        constraint: AttrConstraint,
        storage_type: impl Into<String>,
        return_type: impl Into<String>,
    ) -> Self {
        Self {
            constraint,
            storage_type: storage_type.into(),
            return_type: return_type.into(),
            convert_from_storage: CodeTemplate::parse(SUBJECT),
            const_builder: None,
            default_value: None,
            optional: false,
        }
    }

    pub fn with_convert(mut self, convert: impl Into<String>) -> Self {
        self.convert_from_storage = CodeTemplate::parse(convert);
        self
    }

    pub fn with_const_builder(mut self, builder: impl Into<String>) -> Self {
        self.const_builder = Some(CodeTemplate::parse(builder));
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn describe(&self) -> &str {
        self.constraint.describe()
    }

    /// Instantiate the constant builder with `literal`.
    pub fn build_constant(&self, literal: &str, ambient: &Ambient) -> OdsResult<String> {
        let builder = self.const_builder.as_ref().ok_or_else(|| {
            OdsError::invalid_argument_shape(format!(
                "attribute of storage type `{}` has no constant builder",
                self.storage_type
            ))
        })?;
        let positional = [literal.to_owned()];
        Ok(builder.instantiate(&TemplateArgs::new(ambient).with_positional(&positional)))
    }

    /// Convert a stored attribute expression into the return type.
    pub fn convert(&self, storage: &str, ambient: &Ambient) -> String {
        self.convert_from_storage
            .instantiate(&TemplateArgs::new(ambient).with_subject(storage))
    }
}

/// An attribute computed on access; never stored, verified, or built.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DerivedAttr {
    pub return_type: String,
    /// Computes the value; `$_op` is the operation.
    pub body: CodeTemplate,
    pub description: String,
}

impl DerivedAttr {
    pub fn new(return_type: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            return_type: return_type.into(),
            body: CodeTemplate::parse(body),
            description: String::new(),
        }
    }
}

/// Equality with a constant built from `attr`.
pub fn constant_attr(attr: &Attr, literal: &str, ambient: &Ambient) -> OdsResult<AttrConstraint> {
    let built = attr.build_constant(literal, ambient)?;
    Ok(AttrConstraint::new(
        Predicate::leaf(format!("{SUBJECT} == {}", escape_template(&built))),
        format!("constant attribute {literal}"),
    ))
}

/// A trait attached to an operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpTrait {
    /// Behaviour implemented by the host, e.g. `Commutative`.
    Native(String),
    /// Checked by the verifier with `$_self` bound to the operation.
    Pred {
        predicate: Predicate,
        description: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_type() -> Type {
        Type::new(TypeConstraint::new(
            Predicate::leaf("$_self.is_f32()"),
            "32-bit float",
        ))
    }

    fn vector(element: Type) -> ContainerType {
        container_of(
            Predicate::leaf("$_self.is_vector()"),
            "$_self.element_type()",
            "vector",
            element,
        )
    }

    #[test]
    fn test_describe_falls_back() {
        let constraint = TypeConstraint::new(Predicate::leaf("$_self.ok()"), "  ");
        assert_eq!(constraint.describe(), "value");
        assert_eq!(TypeConstraint::any().predicate_for("t", &Ambient::default()), "true");
        assert_eq!(f32_type().variadic().describe(), "variadic of 32-bit float");
    }

    #[test]
    fn test_container_predicate_applies_extraction_to_element() {
        let ty = vector(f32_type());
        assert_eq!(
            ty.predicate_for("t", &Ambient::default()),
            "(t.is_vector() && t.element_type().is_f32())"
        );
        assert_eq!(ty.description(), "vector of 32-bit float values");
    }

    #[test]
    fn test_containers_share_element_matching() {
        let tensor = container_of(
            Predicate::leaf("$_self.is_tensor()"),
            "$_self.element_type()",
            "tensor",
            f32_type(),
        );
        let nested = vector(tensor.into_type());
        assert_eq!(
            nested.predicate_for("t", &Ambient::default()),
            "(t.is_vector() && (t.element_type().is_tensor() && \
             t.element_type().element_type().is_f32()))"
        );
        assert_eq!(
            nested.description(),
            "vector of tensor of 32-bit float values"
        );
    }

    #[test]
    fn test_fixed_shape_uses_formatter() {
        struct SliceRef;
        impl ShapeFormatter for SliceRef {
            fn format_shape(&self, dims: &[i64]) -> String {
                format!("&{}", ArrayLiteralShape.format_shape(dims))
            }
        }

        let ty = vector(f32_type()).with_shape("$_self.shape()", &[2, 3], &ArrayLiteralShape);
        assert_eq!(
            ty.predicate_for("t", &Ambient::default()),
            "((t.is_vector() && t.shape() == [2, 3]) && t.element_type().is_f32())"
        );
        assert_eq!(ty.description(), "vector of 32-bit float values of shape 2x3");

        let ty = vector(f32_type()).with_shape("$_self.shape()", &[4], &SliceRef);
        assert!(ty.predicate_for("t", &Ambient::default()).contains("t.shape() == &[4]"));
    }

    #[test]
    fn test_constant_attr_equality() {
        let attr = Attr::new(
            AttrConstraint::new(Predicate::leaf("$_self.is_f32_attr()"), "32-bit float attribute"),
            "FloatAttr",
            "f32",
        )
        .with_const_builder("$_builder.f32_attr($0)");

        let eq = constant_attr(&attr, "4.2", &Ambient::default()).unwrap();
        assert_eq!(
            eq.predicate_for("a", &Ambient::default()),
            "a == builder.f32_attr(4.2)"
        );

        let bare = Attr::new(AttrConstraint::new(Predicate::truth(), ""), "Attribute", "Attribute");
        let err = constant_attr(&bare, "1", &Ambient::default()).unwrap_err();
        assert!(err.is_argument_shape());
    }

    #[test]
    fn test_convert_defaults_to_identity() {
        let attr = Attr::new(AttrConstraint::new(Predicate::truth(), ""), "StringAttr", "String");
        assert_eq!(attr.convert("raw", &Ambient::default()), "raw");
        let attr = attr.with_convert("$_self.value().to_owned()");
        assert_eq!(attr.convert("raw", &Ambient::default()), "raw.value().to_owned()");
    }
}
