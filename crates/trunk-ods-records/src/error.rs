//! Errors raised while resolving or reading records.

use derive_more::Display;

/// A structural defect in a single record.
///
/// These never abort a whole batch: the record that carries the defect is
/// reported and skipped.
#[derive(Clone, Debug, Display, PartialEq, Eq, Hash, salsa::Update)]
pub enum RecordError {
    #[display("`{record}` derives from unknown class `{class}`")]
    UnknownClass { record: String, class: String },

    #[display("class chain of `{record}` is cyclic at `{class}`")]
    CyclicClass { record: String, class: String },

    #[display("record `{_0}` is defined more than once")]
    DuplicateDef(String),

    #[display("unknown record `{_0}`")]
    UnknownDef(String),

    #[display("record `{_0}` refers to itself")]
    CyclicReference(String),

    #[display("record `{record}` is missing field `{field}`")]
    MissingField { record: String, field: String },

    #[display("field `{field}` of `{record}` must be {expected}")]
    FieldType {
        record: String,
        field: String,
        expected: String,
    },
}

impl std::error::Error for RecordError {}

impl RecordError {
    pub(crate) fn field_type(record: &str, field: &str, expected: &str) -> Self {
        RecordError::FieldType {
            record: record.to_owned(),
            field: field.to_owned(),
            expected: expected.to_owned(),
        }
    }
}
