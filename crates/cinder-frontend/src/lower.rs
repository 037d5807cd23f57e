use cinder_common::{Diagnostic, Diagnostics, SourceFile, Span, Symbol, SymbolInterner};
use cinder_hir::{
    BinOp, Expr, ExprKind, FnDef, FnSig, GlobalDef, Item, ItemKind, Literal, Module, Mutability,
    Param, PrimitiveType, Stmt, StmtKind, Type, UnaryOp,
};
use tree_sitter::{Node, Tree};

type LowerResult<T> = Result<T, Diagnostic>;

/// Lower a tree-sitter Tree to a HIR Module.
///
/// Every top-level item is lowered independently, so one unsupported
/// construct does not hide problems in later items.
pub fn lower(tree: &Tree, source: &SourceFile, interner: &SymbolInterner) -> Result<Module, Diagnostics> {
    let ctx = LoweringContext::new(source, interner);
    let module_name = source
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("main");
    let mut module = Module::new(ctx.intern(module_name), source.id);
    let mut errors = vec![];

    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match ctx.lower_item(child) {
            Ok(Some(item)) => module.add_item(item),
            Ok(None) => {}
            Err(diag) => errors.push(diag),
        }
    }

    if errors.is_empty() {
        Ok(module)
    } else {
        Err(Diagnostics::new("lowering", source, errors))
    }
}

struct LoweringContext<'a> {
    source: &'a SourceFile,
    interner: &'a SymbolInterner,
}

impl<'a> LoweringContext<'a> {
    fn new(source: &'a SourceFile, interner: &'a SymbolInterner) -> Self {
        Self { source, interner }
    }

    fn span(&self, node: Node) -> Span {
        Span::new(
            self.source.id,
            node.start_byte() as u32,
            node.end_byte() as u32,
        )
    }

    fn text(&self, node: Node) -> &str {
        node.utf8_text(self.source.content.as_bytes()).unwrap_or("")
    }

    fn intern(&self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    fn unsupported(&self, node: Node, what: &str) -> Diagnostic {
        Diagnostic::error(format!("unsupported {what}"))
            .with_span(self.span(node))
            .with_label(format!("`{}` is outside the supported C++ subset", node.kind()))
    }

    fn field<'t>(&self, node: Node<'t>, name: &str) -> LowerResult<Node<'t>> {
        node.child_by_field_name(name).ok_or_else(|| {
            Diagnostic::error(format!("{} is missing its {name}", node.kind().replace('_', " ")))
                .with_span(self.span(node))
        })
    }

    fn lower_item(&self, node: Node) -> LowerResult<Option<Item>> {
        let span = self.span(node);

        match node.kind() {
            "function_definition" => {
                let fn_def = self.lower_function(node)?;
                Ok(Some(Item::new(ItemKind::Function(fn_def), span)))
            }
            "declaration" => {
                let declarator = self.single_declarator(node)?;
                if declarator.kind() == "function_declarator" {
                    // Prototype: int add(int x, int y);
                    let fn_def = self.lower_prototype(node, declarator)?;
                    return Ok(Some(Item::new(ItemKind::Function(fn_def), span)));
                }
                let (name, _, ty, init, mutability) = self.lower_variable(node, declarator)?;
                Ok(Some(Item::new(
                    ItemKind::Global(GlobalDef {
                        name,
                        mutability,
                        ty,
                        init,
                        span,
                    }),
                    span,
                )))
            }
            "comment" | ";" => Ok(None),
            _ => Err(self.unsupported(node, "top-level item")),
        }
    }

    fn lower_function(&self, node: Node) -> LowerResult<FnDef> {
        let span = self.span(node);
        let declarator = self.field(node, "declarator")?;
        if declarator.kind() != "function_declarator" {
            return Err(self.unsupported(declarator, "function declarator"));
        }

        let name = self.extract_function_name(declarator)?;
        let params = self.extract_parameters(declarator)?;
        let ret_ty = self.lower_type(self.field(node, "type")?)?;
        let body = self.lower_compound_statement(self.field(node, "body")?)?;

        Ok(FnDef {
            name,
            sig: FnSig { params, ret_ty },
            body: Some(body),
            span,
        })
    }

    fn lower_prototype(&self, node: Node, declarator: Node) -> LowerResult<FnDef> {
        Ok(FnDef {
            name: self.extract_function_name(declarator)?,
            sig: FnSig {
                params: self.extract_parameters(declarator)?,
                ret_ty: self.lower_type(self.field(node, "type")?)?,
            },
            body: None,
            span: self.span(node),
        })
    }

    fn extract_function_name(&self, declarator: Node) -> LowerResult<Symbol> {
        let name = self.field(declarator, "declarator")?;
        if name.kind() != "identifier" {
            return Err(self.unsupported(name, "function name"));
        }
        Ok(self.intern(self.text(name)))
    }

    fn extract_parameters(&self, declarator: Node) -> LowerResult<Vec<Param>> {
        let param_list = self.field(declarator, "parameters")?;
        let mut params = vec![];

        let mut cursor = param_list.walk();
        for child in param_list.named_children(&mut cursor) {
            match child.kind() {
                "parameter_declaration" => {
                    let ty = self.lower_type(self.field(child, "type")?)?;
                    match child.child_by_field_name("declarator") {
                        Some(decl) if decl.kind() == "identifier" => params.push(Param {
                            name: self.intern(self.text(decl)),
                            ty,
                            mutability: Mutability::Mutable,
                            span: self.span(child),
                        }),
                        Some(decl) => return Err(self.unsupported(decl, "parameter declarator")),
                        // `int f(void)`
                        None if ty.is_unit() => {}
                        None => {
                            return Err(Diagnostic::error("parameter must be named")
                                .with_span(self.span(child)))
                        }
                    }
                }
                "comment" => {}
                _ => return Err(self.unsupported(child, "parameter")),
            }
        }

        Ok(params)
    }

    fn lower_type(&self, node: Node) -> LowerResult<Type> {
        let prim = match (node.kind(), self.text(node).trim()) {
            ("primitive_type", "int") => PrimitiveType::I32,
            ("primitive_type", "bool") => PrimitiveType::Bool,
            ("primitive_type", "void") => PrimitiveType::Unit,
            _ => return Err(self.unsupported(node, "type").with_help("use `int`, `bool` or `void`")),
        };
        Ok(Type::Primitive(prim))
    }

    /// The one declarator of a declaration; `int a = 1, b = 2;` is rejected.
    fn single_declarator<'t>(&self, node: Node<'t>) -> LowerResult<Node<'t>> {
        let mut cursor = node.walk();
        let declarators: Vec<Node<'t>> = node.children_by_field_name("declarator", &mut cursor).collect();
        match declarators.as_slice() {
            [one] => Ok(*one),
            [] => Err(Diagnostic::error("declaration declares nothing").with_span(self.span(node))),
            [_, second, ..] => Err(Diagnostic::error("one variable per declaration")
                .with_span(self.span(*second))
                .with_help("split this into separate declarations")),
        }
    }

    /// `[const] T name = init;`
    fn lower_variable(
        &self,
        node: Node,
        declarator: Node,
    ) -> LowerResult<(Symbol, Span, Type, Expr, Mutability)> {
        let ty = self.lower_type(self.field(node, "type")?)?;

        let mut mutability = Mutability::Mutable;
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "type_qualifier" if self.text(child) == "const" => mutability = Mutability::Immutable,
                "type_qualifier" | "storage_class_specifier" | "attribute_declaration" => {
                    return Err(self.unsupported(child, "declaration specifier"))
                }
                _ => {}
            }
        }

        match declarator.kind() {
            "init_declarator" => {
                let name_node = self.field(declarator, "declarator")?;
                if name_node.kind() != "identifier" {
                    return Err(self.unsupported(name_node, "declarator"));
                }
                let value = self.field(declarator, "value")?;
                if value.kind() == "initializer_list" || value.kind() == "argument_list" {
                    return Err(self.unsupported(value, "initializer").with_help("use `T name = value;`"));
                }
                let init = self.lower_expr(value)?;
                Ok((
                    self.intern(self.text(name_node)),
                    self.span(name_node),
                    ty,
                    init,
                    mutability,
                ))
            }
            "identifier" => Err(Diagnostic::error(format!(
                "variable '{}' must be initialized",
                self.text(declarator)
            ))
            .with_span(self.span(declarator))
            .with_label("declared without a value")),
            _ => Err(self.unsupported(declarator, "declarator")),
        }
    }

    fn lower_compound_statement(&self, node: Node) -> LowerResult<Expr> {
        let span = self.span(node);
        let mut stmts = vec![];

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "comment" {
                continue;
            }
            stmts.push(self.lower_statement(child)?);
        }

        Ok(Expr::new(ExprKind::Block(stmts), span))
    }

    fn lower_statement(&self, node: Node) -> LowerResult<Stmt> {
        let span = self.span(node);
        match node.kind() {
            "declaration" => {
                let declarator = self.single_declarator(node)?;
                if declarator.kind() == "function_declarator" {
                    return Err(self.unsupported(node, "local function declaration"));
                }
                let (name, name_span, ty, init, mutability) = self.lower_variable(node, declarator)?;
                Ok(Stmt::new(
                    StmtKind::Let {
                        name,
                        name_span,
                        ty,
                        init,
                        mutability,
                    },
                    span,
                ))
            }
            "expression_statement" => match node.named_child(0) {
                Some(expr_node) if expr_node.kind() != "comment" => {
                    Ok(Stmt::new(StmtKind::Expr(self.lower_expr(expr_node)?), span))
                }
                _ => Ok(Stmt::new(StmtKind::Empty, span)),
            },
            "return_statement" => Ok(Stmt::expr(self.lower_return_statement(node)?)),
            "if_statement" => Ok(Stmt::expr(self.lower_if_statement(node)?)),
            "while_statement" => Ok(Stmt::expr(self.lower_while_statement(node)?)),
            "compound_statement" => Ok(Stmt::expr(self.lower_compound_statement(node)?)),
            _ => Err(self.unsupported(node, "statement")),
        }
    }

    /// Body of an `if`/`while`/`else`: a block or a single statement.
    fn lower_branch(&self, node: Node) -> LowerResult<Expr> {
        if node.kind() == "compound_statement" {
            return self.lower_compound_statement(node);
        }
        let stmt = self.lower_statement(node)?;
        if let StmtKind::Let { .. } = stmt.kind {
            return Err(Diagnostic::error("declaration must be inside braces")
                .with_span(stmt.span)
                .with_help("wrap the statement in `{ ... }`"));
        }
        Ok(Expr::new(ExprKind::Block(vec![stmt]), self.span(node)))
    }

    /// Condition of `if`/`while`, unwrapping `condition_clause` and parentheses.
    fn lower_condition(&self, node: Node) -> LowerResult<Expr> {
        let cond = self.field(node, "condition")?;
        let inner = match cond.kind() {
            "condition_clause" => {
                if let Some(init) = cond.child_by_field_name("initializer") {
                    return Err(self.unsupported(init, "condition initializer"));
                }
                self.field(cond, "value")?
            }
            _ => cond,
        };
        if inner.kind() == "condition_declaration" {
            return Err(self.unsupported(inner, "condition declaration"));
        }
        self.lower_expr(inner)
    }

    fn lower_return_statement(&self, node: Node) -> LowerResult<Expr> {
        let span = self.span(node);
        let mut cursor = node.walk();

        let value = node
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment")
            .map(|n| self.lower_expr(n))
            .transpose()?;

        Ok(Expr::new(ExprKind::Return(value.map(Box::new)), span))
    }

    fn lower_if_statement(&self, node: Node) -> LowerResult<Expr> {
        let span = self.span(node);
        let cond = self.lower_condition(node)?;
        let then_branch = self.lower_branch(self.field(node, "consequence")?)?;

        let else_branch = match node.child_by_field_name("alternative") {
            Some(alt) => {
                // Newer grammars wrap the branch in an else_clause
                let branch = if alt.kind() == "else_clause" {
                    let mut cursor = alt.walk();
                    let found = alt
                        .named_children(&mut cursor)
                        .find(|c| c.kind() != "comment");
                    found.ok_or_else(|| {
                        Diagnostic::error("else is missing its body").with_span(self.span(alt))
                    })?
                } else {
                    alt
                };
                Some(self.lower_branch(branch)?)
            }
            None => None,
        };

        Ok(Expr::new(
            ExprKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch: else_branch.map(Box::new),
            },
            span,
        ))
    }

    fn lower_while_statement(&self, node: Node) -> LowerResult<Expr> {
        let span = self.span(node);
        let cond = self.lower_condition(node)?;
        let body = self.lower_branch(self.field(node, "body")?)?;

        Ok(Expr::new(
            ExprKind::While {
                cond: Box::new(cond),
                body: Box::new(body),
            },
            span,
        ))
    }

    fn lower_expr(&self, node: Node) -> LowerResult<Expr> {
        let span = self.span(node);

        let kind = match node.kind() {
            "number_literal" => ExprKind::Literal(Literal::Int(self.lower_int(node)?)),

            "true" => ExprKind::Literal(Literal::Bool(true)),
            "false" => ExprKind::Literal(Literal::Bool(false)),

            "identifier" => ExprKind::Ident(self.intern(self.text(node))),

            "binary_expression" => {
                let lhs = self.lower_expr(self.field(node, "left")?)?;
                let rhs = self.lower_expr(self.field(node, "right")?)?;
                let op_node = self.field(node, "operator")?;
                let op = BinOp::from_token(self.text(op_node))
                    .ok_or_else(|| self.unsupported(op_node, "binary operator"))?;

                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            }

            "unary_expression" => {
                let op_node = self.field(node, "operator")?;
                let op = match self.text(op_node) {
                    "-" => UnaryOp::Neg,
                    "!" => UnaryOp::Not,
                    // +x is x
                    "+" => return self.lower_expr(self.field(node, "argument")?),
                    _ => return Err(self.unsupported(op_node, "unary operator")),
                };
                let operand = self.lower_expr(self.field(node, "argument")?)?;

                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                }
            }

            "call_expression" => {
                let callee = self.lower_expr(self.field(node, "function")?)?;

                let mut args = vec![];
                let args_node = self.field(node, "arguments")?;
                let mut cursor = args_node.walk();
                for child in args_node.named_children(&mut cursor) {
                    if child.kind() != "comment" {
                        args.push(self.lower_expr(child)?);
                    }
                }

                ExprKind::Call {
                    callee: Box::new(callee),
                    args,
                }
            }

            "assignment_expression" => {
                let op_node = self.field(node, "operator")?;
                if self.text(op_node) != "=" {
                    return Err(self
                        .unsupported(op_node, "compound assignment")
                        .with_help("write `x = x op y`"));
                }
                let lhs_node = self.field(node, "left")?;
                if lhs_node.kind() != "identifier" {
                    return Err(self.unsupported(lhs_node, "assignment target"));
                }
                let lhs = self.lower_expr(lhs_node)?;
                let rhs = self.lower_expr(self.field(node, "right")?)?;

                ExprKind::Assign {
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            }

            "parenthesized_expression" => {
                let mut cursor = node.walk();
                let inner = node
                    .named_children(&mut cursor)
                    .find(|c| c.kind() != "comment");
                return match inner {
                    Some(inner) => self.lower_expr(inner),
                    None => Err(Diagnostic::error("empty parentheses").with_span(span)),
                };
            }

            _ => return Err(self.unsupported(node, "expression")),
        };

        Ok(Expr::new(kind, span))
    }

    fn lower_int(&self, node: Node) -> LowerResult<i128> {
        let text = self.text(node).replace('\'', "");
        let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            i128::from_str_radix(hex, 16)
        } else if text.len() > 1 && text.starts_with('0') {
            i128::from_str_radix(&text[1..], 8)
        } else {
            text.parse()
        };

        parsed.map_err(|_| {
            Diagnostic::error(format!("invalid integer literal `{text}`"))
                .with_span(self.span(node))
                .with_help("only plain decimal, octal and hex `int` literals are supported")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use cinder_common::SourceId;
    use std::path::PathBuf;

    fn lower_str(text: &str, interner: &SymbolInterner) -> Result<Module, Diagnostics> {
        let file = SourceFile::new(SourceId::new(0), PathBuf::from("t.cpp"), text.to_string());
        let tree = parse(text).unwrap();
        lower(&tree, &file, interner)
    }

    #[test]
    fn test_lower_globals_and_functions() {
        let interner = SymbolInterner::new();
        let module = lower_str(
            r#"
int globalVar = 42;
bool globalFlag = false;
int add(int x, int y) { return x + y; }
int main() { return add(1, 2); }
"#,
            &interner,
        )
        .unwrap();

        assert_eq!(module.items.len(), 4);
        let globals: Vec<_> = module.globals().collect();
        assert_eq!(interner.resolve(globals[0].name), "globalVar");
        assert_eq!(globals[1].ty, Type::bool());
        assert!(matches!(globals[0].init.kind, ExprKind::Literal(Literal::Int(42))));

        let add = module.find_function(interner.intern("add")).unwrap();
        assert_eq!(add.sig.params.len(), 2);
        assert_eq!(add.sig.ret_ty, Type::i32());
    }

    #[test]
    fn test_lower_control_flow() {
        let interner = SymbolInterner::new();
        let module = lower_str(
            r#"
int main() {
    int a = 5;
    if (a > 1 && true) { a = a + 1; } else a = a - 1;
    while (a < 10) { a = a + 2; }
    return a;
}
"#,
            &interner,
        )
        .unwrap();

        let main = module.find_function(interner.intern("main")).unwrap();
        let Some(Expr { kind: ExprKind::Block(stmts), .. }) = &main.body else {
            panic!("body is not a block");
        };
        assert_eq!(stmts.len(), 4);
        assert!(matches!(stmts[0].kind, StmtKind::Let { .. }));

        let StmtKind::Expr(if_expr) = &stmts[1].kind else { panic!("expected if") };
        let ExprKind::If { cond, else_branch, .. } = &if_expr.kind else { panic!("expected if") };
        assert!(matches!(cond.kind, ExprKind::Binary { op: BinOp::And, .. }));
        assert!(else_branch.is_some());

        let StmtKind::Expr(while_expr) = &stmts[2].kind else { panic!("expected while") };
        assert!(matches!(while_expr.kind, ExprKind::While { .. }));
        assert!(main.body.as_ref().unwrap().always_returns());
    }

    #[test]
    fn test_const_and_prototype() {
        let interner = SymbolInterner::new();
        let module = lower_str(
            "const int limit = 3;\nint twice(int v);\nint twice(int v) { return v * 2; }\n",
            &interner,
        )
        .unwrap();
        let limit = module.globals().next().unwrap();
        assert_eq!(limit.mutability, Mutability::Immutable);
        let ItemKind::Function(proto) = &module.items[1].kind else { panic!("expected prototype") };
        assert!(proto.body.is_none());
        assert_eq!(module.functions().count(), 1);
    }

    #[test]
    fn test_literal_forms() {
        let interner = SymbolInterner::new();
        let module = lower_str("int a = 0x1F;\nint b = 017;\nint c = 0;\n", &interner).unwrap();
        let values: Vec<i128> = module
            .globals()
            .map(|g| match g.init.kind {
                ExprKind::Literal(Literal::Int(v)) => v,
                _ => panic!("expected literal"),
            })
            .collect();
        assert_eq!(values, vec![31, 15, 0]);
    }

    #[test]
    fn test_unsupported_constructs_are_reported() {
        let interner = SymbolInterner::new();
        let err = lower_str(
            r#"
int main() {
    for (int i = 0; i < 3; i = i + 1) {}
    return 0;
}
int f() { int x; return 0; }
int g() { int y = 1; y += 2; return y; }
"#,
            &interner,
        )
        .unwrap_err();

        let messages = err.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0], "unsupported statement");
        assert_eq!(messages[1], "variable 'x' must be initialized");
        assert_eq!(messages[2], "unsupported compound assignment");
    }

    #[test]
    fn test_rejects_multiple_declarators() {
        let interner = SymbolInterner::new();
        let err = lower_str("int a = 1, b = 2;", &interner).unwrap_err();
        assert_eq!(err.messages(), vec!["one variable per declaration"]);
    }
}
