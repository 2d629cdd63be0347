//! Inheritance resolution.
//!
//! Each def is flattened against its class chain: fields of the root class
//! come first, every subclass overrides them, and the def's own fields win
//! last. A field left [`FieldValue::Unset`] by a subclass or def keeps the
//! inherited value.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, trace};

use crate::error::RecordError;
use crate::graph::{ClassDef, Dag, FieldValue, RecordGraph};

/// A def with every field resolved through its class chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct ResolvedRecord {
    pub name: String,
    /// Class chain, most derived first.
    pub classes: Vec<String>,
    pub fields: BTreeMap<String, FieldValue>,
}

/// A def that could not be resolved, with its declaration index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, salsa::Update)]
pub struct RecordFailure {
    pub index: usize,
    pub record: String,
    pub error: RecordError,
}

/// Result of resolving a whole graph.
#[derive(Clone, Debug, Default, PartialEq, Eq, salsa::Update)]
pub struct ResolvedGraph {
    /// Successfully resolved records, in declaration order.
    pub records: Vec<ResolvedRecord>,
    pub failures: Vec<RecordFailure>,
    by_name: BTreeMap<String, usize>,
}

impl ResolvedGraph {
    /// Look up a resolved record by name.
    pub fn get(&self, name: &str) -> Option<&ResolvedRecord> {
        self.by_name.get(name).map(|&idx| &self.records[idx])
    }

    /// Look up a record, reporting a missing one as an error.
    pub fn expect(&self, name: &str) -> Result<&ResolvedRecord, RecordError> {
        self.get(name)
            .ok_or_else(|| RecordError::UnknownDef(name.to_owned()))
    }

    /// Build a graph from already flat records. Later duplicates are dropped.
    pub fn from_records(records: impl IntoIterator<Item = ResolvedRecord>) -> Self {
        let mut graph = ResolvedGraph::default();
        for record in records {
            graph.push(record);
        }
        graph
    }

    fn push(&mut self, record: ResolvedRecord) -> bool {
        if self.by_name.contains_key(&record.name) {
            return false;
        }
        self.by_name.insert(record.name.clone(), self.records.len());
        self.records.push(record);
        true
    }
}

/// Resolve every def of `graph`.
pub fn resolve(graph: &RecordGraph) -> ResolvedGraph {
    let classes: HashMap<&str, &ClassDef> = graph
        .classes
        .iter()
        .map(|class| (class.name.as_str(), class))
        .collect();

    let mut resolved = ResolvedGraph::default();
    for (index, def) in graph.defs.iter().enumerate() {
        let outcome = class_chain(&def.name, &def.class, &classes).map(|chain| {
            let mut fields = BTreeMap::new();
            for class in chain.iter().rev() {
                overlay(&mut fields, &class.fields);
            }
            overlay(&mut fields, &def.fields);
            ResolvedRecord {
                name: def.name.clone(),
                classes: chain.iter().map(|class| class.name.clone()).collect(),
                fields,
            }
        });

        let error = match outcome {
            Ok(record) => {
                trace!(record = %record.name, classes = ?record.classes, "resolved record");
                if resolved.push(record) {
                    continue;
                }
                RecordError::DuplicateDef(def.name.clone())
            }
            Err(error) => error,
        };
        debug!(record = %def.name, %error, "record resolution failed");
        resolved.failures.push(RecordFailure {
            index,
            record: def.name.clone(),
            error,
        });
    }
    resolved
}

fn class_chain<'g>(
    record: &str,
    start: &str,
    classes: &HashMap<&str, &'g ClassDef>,
) -> Result<Vec<&'g ClassDef>, RecordError> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut next = Some(start);
    while let Some(name) = next {
        if !seen.insert(name) {
            return Err(RecordError::CyclicClass {
                record: record.to_owned(),
                class: name.to_owned(),
            });
        }
        let class = classes
            .get(name)
            .copied()
            .ok_or_else(|| RecordError::UnknownClass {
                record: record.to_owned(),
                class: name.to_owned(),
            })?;
        chain.push(class);
        next = class.parent.as_deref();
    }
    Ok(chain)
}

fn overlay(fields: &mut BTreeMap<String, FieldValue>, layer: &BTreeMap<String, FieldValue>) {
    for (name, value) in layer {
        if value.is_unset() && fields.contains_key(name) {
            continue;
        }
        fields.insert(name.clone(), value.clone());
    }
}

// =============================================================================
// Typed field access
// =============================================================================

impl ResolvedRecord {
    /// Whether `class` appears anywhere in this record's class chain.
    pub fn is_a(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Raw field value; unset fields read as absent.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).filter(|value| !value.is_unset())
    }

    fn missing(&self, field: &str) -> RecordError {
        RecordError::MissingField {
            record: self.name.clone(),
            field: field.to_owned(),
        }
    }

    /// A string or code field that must be present.
    pub fn text(&self, field: &str) -> Result<&str, RecordError> {
        self.opt_text(field)?.ok_or_else(|| self.missing(field))
    }

    /// A string or code field; absent or unset reads as `None`.
    pub fn opt_text(&self, field: &str) -> Result<Option<&str>, RecordError> {
        match self.field(field) {
            None => Ok(None),
            Some(FieldValue::Str(s) | FieldValue::Code(s)) => Ok(Some(s)),
            Some(_) => Err(RecordError::field_type(&self.name, field, "a string")),
        }
    }

    /// A string or code field; absent reads as the empty string.
    pub fn text_or_empty(&self, field: &str) -> Result<&str, RecordError> {
        Ok(self.opt_text(field)?.unwrap_or(""))
    }

    /// A bit field; absent reads as `false`.
    pub fn bit(&self, field: &str) -> Result<bool, RecordError> {
        match self.field(field) {
            None => Ok(false),
            Some(FieldValue::Bit(b)) => Ok(*b),
            Some(FieldValue::Int(i)) => Ok(*i != 0),
            Some(_) => Err(RecordError::field_type(&self.name, field, "a bit")),
        }
    }

    /// An int field; absent reads as `0`.
    pub fn int(&self, field: &str) -> Result<i64, RecordError> {
        match self.field(field) {
            None => Ok(0),
            Some(FieldValue::Int(i)) => Ok(*i),
            Some(_) => Err(RecordError::field_type(&self.name, field, "an int")),
        }
    }

    /// A def reference that must be present.
    pub fn def_ref(&self, field: &str) -> Result<&str, RecordError> {
        match self.field(field) {
            None => Err(self.missing(field)),
            Some(FieldValue::Def(name)) => Ok(name),
            Some(_) => Err(RecordError::field_type(&self.name, field, "a def reference")),
        }
    }

    /// A list field; absent reads as empty.
    pub fn list(&self, field: &str) -> Result<&[FieldValue], RecordError> {
        match self.field(field) {
            None => Ok(&[]),
            Some(FieldValue::List(items)) => Ok(items),
            Some(_) => Err(RecordError::field_type(&self.name, field, "a list")),
        }
    }

    /// A list of def references.
    pub fn def_list(&self, field: &str) -> Result<Vec<&str>, RecordError> {
        self.list(field)?
            .iter()
            .map(|item| match item {
                FieldValue::Def(name) => Ok(name.as_str()),
                _ => Err(RecordError::field_type(
                    &self.name,
                    field,
                    "a list of def references",
                )),
            })
            .collect()
    }

    /// A list of ints.
    pub fn int_list(&self, field: &str) -> Result<Vec<i64>, RecordError> {
        self.list(field)?
            .iter()
            .map(|item| match item {
                FieldValue::Int(i) => Ok(*i),
                _ => Err(RecordError::field_type(&self.name, field, "a list of ints")),
            })
            .collect()
    }

    /// A dag field; absent reads as `None`.
    pub fn opt_dag(&self, field: &str) -> Result<Option<&Dag>, RecordError> {
        match self.field(field) {
            None => Ok(None),
            Some(FieldValue::Dag(dag)) => Ok(Some(dag)),
            Some(_) => Err(RecordError::field_type(&self.name, field, "a dag")),
        }
    }

    /// A dag field that must be present.
    pub fn dag(&self, field: &str) -> Result<&Dag, RecordError> {
        match self.field(field) {
            None => Err(self.missing(field)),
            Some(FieldValue::Dag(dag)) => Ok(dag),
            Some(_) => Err(RecordError::field_type(&self.name, field, "a dag")),
        }
    }
}
