//! Graphviz rendering of the HIR.
//!
//! Every item, statement and expression becomes a box; names, types and
//! literal values become leaves. A child reached through a named role is
//! labelled `role: label`, e.g. `cond: Binary >`.

use cinder_common::SymbolInterner;
use std::fmt::Write;

use crate::expr::{Expr, ExprKind, Literal};
use crate::item::{Item, ItemKind};
use crate::module::Module;
use crate::stmt::{Stmt, StmtKind};

/// Render `module` as a `digraph` in DOT syntax.
pub fn to_dot(module: &Module, interner: &SymbolInterner) -> String {
    let mut writer = DotWriter {
        out: String::new(),
        next_id: 0,
        interner,
    };
    writer.out.push_str("digraph AST {\n");
    writer
        .out
        .push_str("    node [shape=box, style=filled, fillcolor=lightblue];\n");
    let root = writer.node(None, "", "Program");
    for item in &module.items {
        writer.item(root, item);
    }
    writer.out.push_str("}\n");
    writer.out
}

struct DotWriter<'a> {
    out: String,
    next_id: u32,
    interner: &'a SymbolInterner,
}

impl DotWriter<'_> {
    fn node(&mut self, parent: Option<u32>, role: &str, label: &str) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let text = if role.is_empty() {
            label.to_string()
        } else {
            format!("{role}: {label}")
        };
        // Writing into a String cannot fail.
        let _ = writeln!(self.out, "    n{id} [label=\"{}\"];", escape(&text));
        if let Some(parent) = parent {
            let _ = writeln!(self.out, "    n{parent} -> n{id};");
        }
        id
    }

    fn leaf(&mut self, parent: u32, role: &str, label: &str) {
        self.node(Some(parent), role, label);
    }

    fn item(&mut self, parent: u32, item: &Item) {
        match &item.kind {
            ItemKind::Global(global) => {
                let id = self.node(Some(parent), "", "GlobalDecl");
                self.leaf(id, "type", &global.ty.to_string());
                self.leaf(id, "name", &self.interner.resolve(global.name));
                self.expr(id, "value", &global.init);
            }
            ItemKind::Function(func) => {
                let label = if func.body.is_some() { "Function" } else { "Prototype" };
                let id = self.node(Some(parent), "", label);
                self.leaf(id, "type", &func.sig.ret_ty.to_string());
                self.leaf(id, "name", &self.interner.resolve(func.name));
                for param in &func.sig.params {
                    let text = format!("{} {}", param.ty, self.interner.resolve(param.name));
                    self.leaf(id, "param", &text);
                }
                if let Some(body) = &func.body {
                    self.expr(id, "body", body);
                }
            }
        }
    }

    fn stmt(&mut self, parent: u32, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Let { name, ty, init, .. } => {
                let id = self.node(Some(parent), "", "VarDecl");
                self.leaf(id, "type", &ty.to_string());
                self.leaf(id, "name", &self.interner.resolve(*name));
                self.expr(id, "value", init);
            }
            StmtKind::Expr(expr) => self.expr(parent, "", expr),
            StmtKind::Empty => self.leaf(parent, "", "Empty"),
        }
    }

    fn expr(&mut self, parent: u32, role: &str, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(v)) => self.leaf(parent, role, &v.to_string()),
            ExprKind::Literal(Literal::Bool(b)) => self.leaf(parent, role, &b.to_string()),
            ExprKind::Ident(sym) => self.leaf(parent, role, &self.interner.resolve(*sym)),
            ExprKind::Binary { op, lhs, rhs } => {
                let id = self.node(Some(parent), role, &format!("Binary {}", op.as_str()));
                self.expr(id, "lhs", lhs);
                self.expr(id, "rhs", rhs);
            }
            ExprKind::Unary { op, operand } => {
                let id = self.node(Some(parent), role, &format!("Unary {}", op.as_str()));
                self.expr(id, "operand", operand);
            }
            ExprKind::Call { callee, args } => {
                let id = self.node(Some(parent), role, "Call");
                self.expr(id, "callee", callee);
                for arg in args {
                    self.expr(id, "arg", arg);
                }
            }
            ExprKind::Assign { lhs, rhs } => {
                let id = self.node(Some(parent), role, "Assign");
                self.expr(id, "name", lhs);
                self.expr(id, "value", rhs);
            }
            ExprKind::Block(stmts) => {
                let id = self.node(Some(parent), role, "Block");
                for stmt in stmts {
                    self.stmt(id, stmt);
                }
            }
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let id = self.node(Some(parent), role, "If");
                self.expr(id, "cond", cond);
                self.expr(id, "then", then_branch);
                if let Some(else_branch) = else_branch {
                    self.expr(id, "else", else_branch);
                }
            }
            ExprKind::While { cond, body } => {
                let id = self.node(Some(parent), role, "While");
                self.expr(id, "cond", cond);
                self.expr(id, "body", body);
            }
            ExprKind::Return(value) => {
                let id = self.node(Some(parent), role, "Return");
                if let Some(value) = value {
                    self.expr(id, "value", value);
                }
            }
        }
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::GlobalDef;
    use crate::types::{Mutability, Type};
    use cinder_common::{SourceId, Span};

    #[test]
    fn test_global_rendering() {
        let interner = SymbolInterner::new();
        let span = Span::new(SourceId::new(0), 0, 0);
        let mut module = Module::new(interner.intern("main"), SourceId::new(0));
        module.add_item(Item::new(
            ItemKind::Global(GlobalDef {
                name: interner.intern("globalVar"),
                mutability: Mutability::Mutable,
                ty: Type::i32(),
                init: Expr::new(ExprKind::Literal(Literal::Int(42)), span),
                span,
            }),
            span,
        ));

        let dot = to_dot(&module, &interner);
        assert!(dot.starts_with("digraph AST {\n"));
        assert!(dot.contains("n0 [label=\"Program\"];"));
        assert!(dot.contains("n1 [label=\"GlobalDecl\"];"));
        assert!(dot.contains("n0 -> n1;"));
        assert!(dot.contains("n3 [label=\"name: globalVar\"];"));
        assert!(dot.contains("n4 [label=\"value: 42\"];"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape(r#"a"b"#), r#"a\"b"#);
    }
}
