//! Common test utilities for the integration tests.

use trunk_ods::{OdsDatabase, SpecSource};
use trunk_ods_gen::GenConfig;
use trunk_ods_records::{ClassDef, Dag, FieldValue, RecordDef, RecordGraph};

/// The well-known classes, with the defaults a front-end would supply.
#[allow(dead_code)]
pub fn standard_classes(graph: &mut RecordGraph) {
    graph
        .add_class(ClassDef::new("Pred"))
        .add_class(ClassDef::new("CPred").extends("Pred"))
        .add_class(ClassDef::new("AllOf").extends("Pred"))
        .add_class(ClassDef::new("AnyOf").extends("Pred"))
        .add_class(ClassDef::new("Neg").extends("Pred"))
        .add_class(ClassDef::new("SubstLeaves").extends("Pred"))
        .add_class(ClassDef::new("TypeConstraint"))
        .add_class(ClassDef::new("Type").extends("TypeConstraint"))
        .add_class(ClassDef::new("Variadic").extends("Type"))
        .add_class(ClassDef::new("ContainerType").extends("Type"))
        .add_class(
            ClassDef::new("VectorOf")
                .extends("ContainerType")
                .field("containerPred", FieldValue::def("IsVector"))
                .field("elementTypeCall", FieldValue::code("$_self.element_type()"))
                .field("noun", FieldValue::str("vector")),
        )
        .add_class(ClassDef::new("AttrConstraint"))
        .add_class(
            ClassDef::new("Attr")
                .extends("AttrConstraint")
                .field("convertFromStorage", FieldValue::code("$_self"))
                .field("isOptional", FieldValue::Bit(false)),
        )
        .add_class(
            ClassDef::new("F32AttrBase")
                .extends("Attr")
                .field("predicate", FieldValue::def("IsF32Attr"))
                .field("summary", FieldValue::str("32-bit float attribute"))
                .field("storageType", FieldValue::str("FloatAttr"))
                .field("returnType", FieldValue::str("f32"))
                .field("convertFromStorage", FieldValue::code("$_self.as_f32()"))
                .field("constBuilderCall", FieldValue::code("$_builder.f32_attr($0)")),
        )
        .add_class(ClassDef::new("DerivedAttr").extends("Attr"))
        .add_class(ClassDef::new("ConstantAttr"))
        .add_class(ClassDef::new("OpTrait"))
        .add_class(ClassDef::new("NativeOpTrait").extends("OpTrait"))
        .add_class(ClassDef::new("PredOpTrait").extends("OpTrait"))
        .add_class(
            ClassDef::new("Op")
                .field("summary", FieldValue::str(""))
                .field("traits", FieldValue::list([]))
                .field("hasFolder", FieldValue::Bit(false)),
        )
        .add_class(ClassDef::new("Pattern").field("benefitAdded", FieldValue::Int(0)))
        .add_class(ClassDef::new("Pat").extends("Pattern"))
        .add_class(ClassDef::new("mAttr"))
        .add_class(ClassDef::new("mAttrAnyOf"))
        .add_class(ClassDef::new("mPat"))
        .add_class(ClassDef::new("cOp"))
        .add_class(ClassDef::new("tAttr"))
        .add_class(ClassDef::new("replaceWithValue"));
}

/// Standard classes plus a handful of predicates, types, and attributes.
#[allow(dead_code)]
pub fn base_graph() -> RecordGraph {
    let mut graph = RecordGraph::new();
    standard_classes(&mut graph);
    for (name, expr) in [
        ("IsF32", "$_self.is_f32()"),
        ("IsI32", "$_self.is_i32()"),
        ("IsVector", "$_self.is_vector()"),
        ("IsF32Attr", "$_self.is_f32_attr()"),
    ] {
        graph.add_def(RecordDef::new(name, "CPred").field("predExpr", FieldValue::code(expr)));
    }
    graph
        .add_def(RecordDef::new("AnyPred", "AllOf").field("children", FieldValue::list([])))
        .add_def(
            RecordDef::new("F32", "Type")
                .field("predicate", FieldValue::def("IsF32"))
                .field("summary", FieldValue::str("32-bit float")),
        )
        .add_def(
            RecordDef::new("I32", "Type")
                .field("predicate", FieldValue::def("IsI32"))
                .field("summary", FieldValue::str("32-bit integer")),
        )
        .add_def(
            RecordDef::new("AnyType", "Type")
                .field("predicate", FieldValue::def("AnyPred"))
                .field("summary", FieldValue::str("any type")),
        )
        .add_def(RecordDef::new("VariadicF32", "Variadic").field("baseType", FieldValue::def("F32")))
        .add_def(RecordDef::new("F32Attr", "F32AttrBase"))
        .add_def(RecordDef::new("ReplaceWithValue", "replaceWithValue"));
    graph
}

/// An `Op` def with `ins` arguments and `outs` results.
#[allow(dead_code)]
pub fn op_record(name: &str, op_name: &str, arguments: &[(&str, &str)], results: &[(&str, &str)]) -> RecordDef {
    let ins = arguments
        .iter()
        .fold(Dag::new("ins"), |dag, (def, arg)| dag.arg(FieldValue::def(*def), *arg));
    let outs = results
        .iter()
        .fold(Dag::new("outs"), |dag, (def, result)| dag.arg(FieldValue::def(*def), *result));
    RecordDef::new(name, "Op")
        .field("opName", FieldValue::str(op_name))
        .field("arguments", FieldValue::Dag(ins))
        .field("results", FieldValue::Dag(outs))
}

/// A fresh database holding `graph` under the default config.
#[allow(dead_code)]
pub fn spec_source(graph: RecordGraph) -> (OdsDatabase, SpecSource) {
    spec_source_with(graph, GenConfig::default())
}

#[allow(dead_code)]
pub fn spec_source_with(graph: RecordGraph, config: GenConfig) -> (OdsDatabase, SpecSource) {
    let db = OdsDatabase::default();
    let source = SpecSource::new(&db, "test".to_owned(), graph, config);
    (db, source)
}
