//! Unresolved record graph, as produced by a front-end.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value of a single record field.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, salsa::Update)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// `?` in the source: the field exists but carries nothing.
    Unset,
    Str(String),
    Int(i64),
    Bit(bool),
    /// Opaque code fragment, never interpreted.
    Code(String),
    /// Reference to another def by name.
    Def(String),
    List(Vec<FieldValue>),
    Dag(Dag),
}

impl FieldValue {
    pub fn str(value: impl Into<String>) -> Self {
        FieldValue::Str(value.into())
    }

    pub fn code(value: impl Into<String>) -> Self {
        FieldValue::Code(value.into())
    }

    pub fn def(name: impl Into<String>) -> Self {
        FieldValue::Def(name.into())
    }

    pub fn list(items: impl IntoIterator<Item = FieldValue>) -> Self {
        FieldValue::List(items.into_iter().collect())
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, FieldValue::Unset)
    }

    /// Short kind name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Unset => "unset",
            FieldValue::Str(_) => "string",
            FieldValue::Int(_) => "int",
            FieldValue::Bit(_) => "bit",
            FieldValue::Code(_) => "code",
            FieldValue::Def(_) => "def",
            FieldValue::List(_) => "list",
            FieldValue::Dag(_) => "dag",
        }
    }
}

/// A directed acyclic graph value: `(operator arg:$name, ...)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, salsa::Update)]
pub struct Dag {
    /// Name of the operator def (`ins`, `outs`, an op, a matcher, ...).
    pub operator: String,
    #[serde(default)]
    pub args: Vec<DagArg>,
}

impl Dag {
    pub fn new(operator: impl Into<String>) -> Self {
        Self {
            operator: operator.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument with a binding name.
    pub fn arg(mut self, value: FieldValue, name: impl Into<String>) -> Self {
        self.args.push(DagArg {
            value,
            name: Some(name.into()),
        });
        self
    }

    /// Append an argument without a binding name.
    pub fn value(mut self, value: FieldValue) -> Self {
        self.args.push(DagArg { value, name: None });
        self
    }

    /// Append a bare `$name` argument.
    pub fn var(self, name: impl Into<String>) -> Self {
        self.arg(FieldValue::Unset, name)
    }
}

/// One `value:$name` entry of a dag.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, salsa::Update)]
pub struct DagArg {
    pub value: FieldValue,
    #[serde(default)]
    pub name: Option<String>,
}

/// A class: a named bundle of field defaults with at most one parent.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, salsa::Update)]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// A concrete record instantiating a class.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, salsa::Update)]
pub struct RecordDef {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl RecordDef {
    pub fn new(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// The complete input: classes plus defs in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, salsa::Update)]
pub struct RecordGraph {
    #[serde(default)]
    pub classes: Vec<ClassDef>,
    #[serde(default)]
    pub defs: Vec<RecordDef>,
}

impl RecordGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_class(&mut self, class: ClassDef) -> &mut Self {
        self.classes.push(class);
        self
    }

    pub fn add_def(&mut self, def: RecordDef) -> &mut Self {
        self.defs.push(def);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_from_json() {
        let graph: RecordGraph = serde_json::from_str(
            r#"{
                "classes": [
                    { "name": "Pred" },
                    { "name": "CPred", "parent": "Pred",
                      "fields": { "predExpr": "unset" } }
                ],
                "defs": [
                    { "name": "IsF32", "class": "CPred",
                      "fields": { "predExpr": { "code": "$_self.is_f32()" } } },
                    { "name": "Args", "class": "Pred",
                      "fields": { "arguments": { "dag": {
                          "operator": "ins",
                          "args": [ { "value": { "def": "F32" }, "name": "lhs" } ]
                      } } } }
                ]
            }"#,
        )
        .expect("valid graph");

        assert_eq!(graph.classes.len(), 2);
        assert_eq!(graph.classes[1].parent.as_deref(), Some("Pred"));
        assert_eq!(
            graph.defs[0].fields["predExpr"],
            FieldValue::code("$_self.is_f32()")
        );
        let FieldValue::Dag(dag) = &graph.defs[1].fields["arguments"] else {
            panic!("expected dag");
        };
        assert_eq!(dag.operator, "ins");
        assert_eq!(dag.args[0].name.as_deref(), Some("lhs"));
    }

    #[test]
    fn test_dag_builder_keeps_argument_order() {
        let dag = Dag::new("outs")
            .arg(FieldValue::def("F32"), "res")
            .var("x")
            .value(FieldValue::str("lit"));

        let names: Vec<_> = dag.args.iter().map(|a| a.name.as_deref()).collect();
        assert_eq!(names, vec![Some("res"), Some("x"), None]);
        assert!(dag.args[1].value.is_unset());
    }
}
