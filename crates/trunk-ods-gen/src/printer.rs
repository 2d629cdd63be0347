//! Pseudo-Rust rendering of synthesized units.
//!
//! The output reads like host code but is meant for inspection and
//! snapshot tests, not compilation.
//!
//! # Example output
//!
//! ```text
//! // FooBarToBaz: rooted at test.foo, benefit 2
//! pub fn foo_bar_to_baz(op: Operation) -> Option<()> {
//!   if !(op.is("test.foo")) {
//!     return None;
//!   }
//!   let v_x = op.operand(0);
//!   let r0 = create("test.baz", [v_x], [], op.result_types());
//!   replace(op, [r0.result(0)]);
//!   Some(())
//! }
//! ```

use heck::ToSnakeCase;

use crate::code::{AttrInit, Expr, Stmt};
use crate::unit::{Accessor, Builder, BuilderKind, Hook, HookDecl, OpUnit, RewriteUnit};

struct PrintState {
    output: String,
    /// Current indentation level (in spaces, 2-space indent)
    indent: usize,
}

impl PrintState {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    fn finish(self) -> String {
        self.output
    }

    fn line(&mut self, text: &str) {
        if !text.is_empty() {
            self.output.extend(std::iter::repeat_n(' ', self.indent));
            self.output.push_str(text);
        }
        self.output.push('\n');
    }

    fn open(&mut self, header: &str) {
        self.line(header);
        self.indent += 2;
    }

    fn close(&mut self, footer: &str) {
        self.indent -= 2;
        self.line(footer);
    }

    fn verbatim(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    fn block(&mut self, block: &[Stmt]) {
        for stmt in block {
            self.stmt(stmt);
        }
    }

    fn branches(&mut self, header: &str, then: &[Stmt], otherwise: &[Stmt]) {
        self.open(header);
        self.block(then);
        if !otherwise.is_empty() {
            self.close("} else {");
            self.indent += 2;
            self.block(otherwise);
        }
        self.close("}");
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let { name, value } => self.line(&format!("let {name} = {value};")),
            Stmt::LetElse {
                name,
                value,
                otherwise,
            } => {
                self.open(&format!("let Some({name}) = {value} else {{"));
                self.block(otherwise);
                self.close("};");
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => self.branches(&format!("if {cond} {{"), then, otherwise),
            Stmt::IfLet {
                name,
                value,
                then,
                otherwise,
            } => self.branches(&format!("if let Some({name}) = {value} {{"), then, otherwise),
            Stmt::ForEach {
                pattern,
                iter,
                body,
            } => {
                self.open(&format!("for {pattern} in {iter} {{"));
                self.block(body);
                self.close("}");
            }
            Stmt::Return(value) => self.line(&format!("return {value};")),
            Stmt::Fail(message) => self.line(&format!("return Err({message:?}.into());")),
            Stmt::NoMatch => self.line("return None;"),
            Stmt::AddResultType(ty) => self.line(&format!("state.add_result_type({ty});")),
            Stmt::AddResultTypes(tys) => self.line(&format!("state.add_result_types({tys});")),
            Stmt::AddOperand(value) => self.line(&format!("state.add_operand({value});")),
            Stmt::AddOperands(values) => self.line(&format!("state.add_operands({values});")),
            Stmt::AddAttribute { name, value } => {
                self.line(&format!("state.add_attribute({name}, {value});"))
            }
            Stmt::CreateOp {
                name,
                op,
                operands,
                attributes,
                result_types,
            } => self.line(&format!(
                "let {name} = create({op:?}, [{}], [{}], {result_types});",
                list(operands),
                attr_list(attributes)
            )),
            Stmt::Replace { target, values } => {
                self.line(&format!("replace({target}, [{}]);", list(values)))
            }
            Stmt::Verbatim(text) => self.verbatim(text),
        }
    }

    fn accessor(&mut self, accessor: &Accessor) {
        self.open(&format!(
            "pub fn {}(&self) -> {} {{",
            accessor.name, accessor.returns
        ));
        self.block(&accessor.body);
        self.close("}");
    }

    fn verifier(&mut self, hook: &Hook) {
        self.open("pub fn verify(&self) -> Result<(), String> {");
        match hook {
            Hook::Synthesized(body) => {
                self.block(body);
                self.line("Ok(())");
            }
            Hook::Custom(text) => self.verbatim(text),
        }
        self.close("}");
    }

    fn builder(&mut self, builder: &Builder) {
        match builder {
            Builder::Synthesized { kind, params, body } => {
                let name = match kind {
                    BuilderKind::Positional => "build",
                    BuilderKind::Bulk => "build_generic",
                };
                let params: String = params
                    .iter()
                    .map(|param| format!(", {}: {}", param.name, param.ty))
                    .collect();
                self.open(&format!(
                    "pub fn {name}(state: &mut OperationState{params}) {{"
                ));
                self.block(body);
                self.close("}");
            }
            Builder::Custom(text) => self.verbatim(text),
        }
    }
}

fn list(exprs: &[Expr]) -> String {
    exprs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn attr_list(attributes: &[AttrInit]) -> String {
    attributes
        .iter()
        .map(|init| format!("{} = {}", init.name, init.value))
        .collect::<Vec<_>>()
        .join(", ")
}

fn hook_signature(decl: HookDecl) -> &'static str {
    match decl {
        HookDecl::Canonicalization => "fn canonicalize(&self, patterns: &mut PatternSet);",
        HookDecl::Fold => "fn fold(&self) -> Option<Value>;",
        HookDecl::ConstantFold => "fn constant_fold(&self) -> Option<Attribute>;",
    }
}

/// Render an op unit as a wrapper struct with its methods.
pub fn print_op_unit(unit: &OpUnit) -> String {
    let mut state = PrintState::new();

    if unit.summary.is_empty() {
        state.line(&format!("// {}", unit.op_name));
    } else {
        state.line(&format!("// {}: {}", unit.op_name, unit.summary));
    }
    state.line(&format!(
        "pub const {}: &str = {:?};",
        unit.name_const, unit.op_name
    ));
    state.line("");

    for line in unit.description.lines() {
        state.line(format!("/// {line}").trim_end());
    }
    if !unit.native_traits.is_empty() {
        state.line(&format!("#[traits({})]", unit.native_traits.join(", ")));
    }
    state.line(&format!("pub struct {};", unit.wrapper));
    state.line("");

    state.open(&format!("impl {} {{", unit.wrapper));
    let mut first = true;
    let mut separate = |state: &mut PrintState| {
        if !std::mem::take(&mut first) {
            state.line("");
        }
    };

    for accessor in &unit.accessors {
        separate(&mut state);
        state.accessor(accessor);
    }
    separate(&mut state);
    state.verifier(&unit.verifier);
    for builder in &unit.builders {
        separate(&mut state);
        state.builder(builder);
    }
    for (label, hook) in [("parser", &unit.parser), ("printer", &unit.printer)] {
        if let Some(text) = hook {
            separate(&mut state);
            state.line(&format!("// custom {label}"));
            state.verbatim(text);
        }
    }
    if !unit.hook_decls.is_empty() {
        separate(&mut state);
        for decl in &unit.hook_decls {
            state.line(hook_signature(*decl));
        }
    }
    state.close("}");

    state.finish()
}

/// Render a rewrite unit as one function: match body, then rewrite body.
pub fn print_rewrite_unit(unit: &RewriteUnit) -> String {
    let root = unit
        .rewrite_body
        .iter()
        .rev()
        .find_map(|stmt| match stmt {
            Stmt::Replace { target, .. } => Some(target.as_str()),
            _ => None,
        })
        .unwrap_or("op");

    let mut state = PrintState::new();
    state.line(&format!(
        "// {}: rooted at {}, benefit {}",
        unit.name, unit.root_op, unit.benefit
    ));
    state.open(&format!(
        "pub fn {}({root}: Operation) -> Option<()> {{",
        unit.name.to_snake_case()
    ));
    state.block(&unit.match_body);
    state.block(&unit.rewrite_body);
    state.line("Some(())");
    state.close("}");
    state.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenConfig;
    use crate::rewrite::{OpTable, compile_pattern};
    use crate::synth::synthesize;
    use trunk_ods_model::{
        Attr, AttrConstraint, CustomHooks, DagNode, OpDef, OpTrait, PatternDef, Predicate, Type,
        TypeConstraint,
    };

    fn any() -> Type {
        Type::new(TypeConstraint::any())
    }

    fn f32_type() -> Type {
        Type::new(TypeConstraint::new(Predicate::leaf("$_self.is_f32()"), "32-bit float"))
    }

    fn f32_attr() -> Attr {
        Attr::new(
            AttrConstraint::new(Predicate::leaf("$_self.is_f32_attr()"), "32-bit float attribute"),
            "FloatAttr",
            "f32",
        )
        .with_convert("$_self.as_f32()")
        .with_const_builder("$_builder.f32_attr($0)")
    }

    #[test]
    fn test_print_op_unit() {
        let mut op = OpDef::new("test.scale")
            .with_summary("Scales a value")
            .operand("input", f32_type())
            .attribute("factor", f32_attr().with_default("4.2"))
            .result("out", any())
            .with_trait(OpTrait::Native("Pure".into()));
        op.has_folder = true;

        let unit = synthesize(&op, &GenConfig::default()).unwrap();
        insta::assert_snapshot!(print_op_unit(&unit), @r#"
        // test.scale: Scales a value
        pub const SCALE: &str = "test.scale";

        #[traits(Pure)]
        pub struct Scale;

        impl Scale {
          pub fn input(&self) -> Value {
            return op.operand(0);
          }

          pub fn out(&self) -> Value {
            return op.result(0);
          }

          pub fn factor(&self) -> f32 {
            if let Some(attr) = op.attr("factor") {
              return attr.as_f32();
            } else {
              return builder.f32_attr(4.2).as_f32();
            }
          }

          pub fn verify(&self) -> Result<(), String> {
            if !(ctx.value_ty(op.operand(0)).is_f32()) {
              return Err("operand #0 ('input') must be 32-bit float".into());
            }
            if let Some(attr_factor) = op.attr("factor") {
              if !(attr_factor.is_f32_attr()) {
                return Err("attribute 'factor' failed to satisfy constraint: 32-bit float attribute".into());
              }
            }
            Ok(())
          }

          pub fn build(state: &mut OperationState, out_ty: Type, input: Value, factor: FloatAttr) {
            state.add_result_type(out_ty);
            state.add_operand(input);
            state.add_attribute("factor", factor);
          }

          pub fn build_generic(state: &mut OperationState, result_types: &[Type], operands: &[Value], attributes: &[(&str, Attribute)]) {
            state.add_result_types(result_types);
            state.add_operands(operands);
            for (name, value) in attributes {
              state.add_attribute(name, value);
            }
          }

          fn fold(&self) -> Option<Value>;
        }
        "#);
    }

    #[test]
    fn test_print_custom_hooks() {
        let op = OpDef::new("test.custom").with_hooks(CustomHooks {
            builders: vec!["pub fn build_empty(state: &mut OperationState) {}".into()],
            verifier: Some("if op.is_broken() {\n  return Err(\"broken\".into());\n}\nOk(())".into()),
            printer: Some("p.print_custom(op);".into()),
            parser: None,
        });

        let unit = synthesize(&op, &GenConfig::default()).unwrap();
        insta::assert_snapshot!(print_op_unit(&unit), @r#"
        // test.custom
        pub const CUSTOM: &str = "test.custom";

        pub struct Custom;

        impl Custom {
          pub fn verify(&self) -> Result<(), String> {
            if op.is_broken() {
              return Err("broken".into());
            }
            Ok(())
          }

          pub fn build_empty(state: &mut OperationState) {}

          // custom printer
          p.print_custom(op);
        }
        "#);
    }

    #[test]
    fn test_print_rewrite_unit() {
        let ops = vec![
            OpDef::new("test.foo").operand("lhs", any()).operand("rhs", any()).result("out", any()),
            OpDef::new("test.bar").operand("input", any()).result("out", any()),
            OpDef::new("test.baz").operand("a", any()).operand("b", any()).result("out", any()),
        ];
        let pattern = PatternDef::new(
            "FooBarToBaz",
            DagNode::op(
                "test.foo",
                [DagNode::var("x"), DagNode::op("test.bar", [DagNode::var("y")])],
            ),
        )
        .result(DagNode::op("test.baz", [DagNode::var("y"), DagNode::var("x")]));

        let unit = compile_pattern(&pattern, &OpTable::new(&ops), &GenConfig::default()).unwrap();
        insta::assert_snapshot!(print_rewrite_unit(&unit), @r#"
        // FooBarToBaz: rooted at test.foo, benefit 2
        pub fn foo_bar_to_baz(op: Operation) -> Option<()> {
          if !(op.is("test.foo")) {
            return None;
          }
          let v_x = op.operand(0);
          let Some(op0) = ctx.defining_op(op.operand(1)) else {
            return None;
          };
          if !(op0.is("test.bar")) {
            return None;
          }
          let v_y = op0.operand(0);
          let r0 = create("test.baz", [v_y, v_x], [], op.result_types());
          replace(op, [r0.result(0)]);
          Some(())
        }
        "#);
    }
}
