//! Error types for definition lowering, classification, and synthesis.

use derive_more::Display;
use trunk_ods_records::RecordError;

pub type OdsResult<T> = Result<T, OdsError>;

/// A structural defect in one definition.
///
/// Detected while building or classifying a definition, never at the run time
/// of the code synthesized from it. It aborts the affected record only.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
#[display("{kind}")]
pub struct OdsError {
    kind: Box<OdsErrorKind>,
}

impl OdsError {
    pub fn kind(&self) -> &OdsErrorKind {
        &self.kind
    }

    pub fn into_kind(self) -> OdsErrorKind {
        *self.kind
    }

    pub fn invalid_predicate_shape(msg: impl std::fmt::Display) -> Self {
        OdsErrorKind::InvalidPredicateShape(msg.to_string()).into()
    }

    pub fn invalid_argument_shape(msg: impl std::fmt::Display) -> Self {
        OdsErrorKind::InvalidArgumentShape(msg.to_string()).into()
    }

    pub fn invalid_pattern(msg: impl std::fmt::Display) -> Self {
        OdsErrorKind::InvalidPattern(msg.to_string()).into()
    }

    /// Whether this is an [`OdsErrorKind::InvalidPredicateShape`].
    pub fn is_predicate_shape(&self) -> bool {
        matches!(*self.kind, OdsErrorKind::InvalidPredicateShape(_))
    }

    /// Whether this is an [`OdsErrorKind::InvalidArgumentShape`].
    pub fn is_argument_shape(&self) -> bool {
        matches!(*self.kind, OdsErrorKind::InvalidArgumentShape(_))
    }
}

impl std::error::Error for OdsError {}

impl From<OdsErrorKind> for OdsError {
    fn from(kind: OdsErrorKind) -> Self {
        OdsError {
            kind: Box::new(kind),
        }
    }
}

impl From<RecordError> for OdsError {
    fn from(error: RecordError) -> Self {
        OdsErrorKind::Record(error).into()
    }
}

#[derive(Clone, Debug, Display, PartialEq, Eq, Hash)]
pub enum OdsErrorKind {
    /// A combinator built with the wrong number of children.
    #[display("invalid predicate shape: {_0}")]
    InvalidPredicateShape(String),

    /// Misplaced or duplicate variadic, default without a constant builder,
    /// constant built from an attribute without a constant builder.
    #[display("invalid argument shape: {_0}")]
    InvalidArgumentShape(String),

    /// Rewrite pattern that does not fit the operations it names.
    #[display("invalid pattern: {_0}")]
    InvalidPattern(String),

    #[display("{_0}")]
    Record(RecordError),
}
