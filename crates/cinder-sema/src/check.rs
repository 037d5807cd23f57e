use cinder_common::{Diagnostic, Span, Symbol, SymbolInterner};
use cinder_hir::{
    BinOp, Expr, ExprKind, FnDef, GlobalDef, ItemKind, Literal, Module, Mutability, Stmt,
    StmtKind, Type, UnaryOp,
};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::scope::{FnInfo, Scopes, VarInfo};

pub(crate) struct Checker<'a> {
    interner: &'a SymbolInterner,
    pub(crate) scopes: Scopes,
    pub(crate) functions: IndexMap<Symbol, FnInfo>,
    called: FxHashSet<Symbol>,
    /// Return type of the function being checked
    ret_ty: Type,
    in_global_init: bool,
    pub(crate) errors: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    pub(crate) fn new(interner: &'a SymbolInterner) -> Self {
        Self {
            interner,
            scopes: Scopes::default(),
            functions: IndexMap::new(),
            called: FxHashSet::default(),
            ret_ty: Type::unit(),
            in_global_init: false,
            errors: vec![],
        }
    }

    fn name(&self, sym: Symbol) -> smol_str::SmolStr {
        self.interner.resolve(sym)
    }

    fn error(&mut self, diag: Diagnostic) {
        log::trace!("sema error: {}", diag.message);
        self.errors.push(diag);
    }

    pub(crate) fn check_module(&mut self, module: &mut Module, entry: &str) {
        // Signatures first so calls may precede definitions
        for item in &module.items {
            if let ItemKind::Function(f) = &item.kind {
                self.declare_function(f);
            }
        }
        log::debug!("collected {} function signature(s)", self.functions.len());

        for item in &mut module.items {
            if let ItemKind::Global(g) = &mut item.kind {
                self.check_global(g);
            }
        }

        for item in &mut module.items {
            if let ItemKind::Function(f) = &mut item.kind {
                self.check_function(f);
            }
        }

        self.check_undefined_calls();
        self.check_entry(entry, module.items.first().map(|i| i.span));
    }

    fn declare_function(&mut self, f: &FnDef) {
        let name = self.name(f.name);
        let mut seen: FxHashSet<Symbol> = FxHashSet::default();
        for param in &f.sig.params {
            if !param.ty.is_value() {
                self.error(
                    Diagnostic::error(format!("parameter '{}' cannot have type {}", self.name(param.name), param.ty))
                        .with_span(param.span),
                );
            }
            if !seen.insert(param.name) {
                self.error(
                    Diagnostic::error(format!("duplicate parameter '{}' in '{name}'", self.name(param.name)))
                        .with_span(param.span),
                );
            }
        }

        let info = FnInfo {
            params: f.sig.params.iter().map(|p| p.ty.clone()).collect(),
            ret: f.sig.ret_ty.clone(),
            defined: f.body.is_some(),
            span: f.span,
        };

        match self.functions.get_mut(&f.name) {
            None => {
                self.functions.insert(f.name, info);
            }
            Some(existing) if !existing.same_signature(&info) => {
                let previous = existing.span;
                self.error(
                    Diagnostic::error(format!("conflicting declaration of function '{name}'"))
                        .with_span(f.span)
                        .with_label("signature differs from the earlier declaration")
                        .with_help(format!("first declared at byte {}", previous.start)),
                );
            }
            Some(existing) if existing.defined && info.defined => {
                self.error(
                    Diagnostic::error(format!("redefinition of function '{name}'")).with_span(f.span),
                );
            }
            Some(existing) => existing.defined |= info.defined,
        }
    }

    fn check_global(&mut self, g: &mut GlobalDef) {
        let name = self.name(g.name);
        if !g.ty.is_value() {
            self.error(
                Diagnostic::error(format!("variable '{name}' cannot have type {}", g.ty)).with_span(g.span),
            );
        }
        if self.functions.contains_key(&g.name) {
            self.error(
                Diagnostic::error(format!("'{name}' redeclared as a different kind of symbol"))
                    .with_span(g.span)
                    .with_label("already declared as a function"),
            );
        }

        self.in_global_init = true;
        let init_ty = self.check_expr(&mut g.init);
        self.in_global_init = false;
        self.expect_type(&g.ty, &init_ty, g.init.span, "initializer");

        let info = VarInfo {
            ty: g.ty.clone(),
            mutability: g.mutability,
            span: g.span,
        };
        if self.scopes.declare(g.name, info).is_err() {
            self.error(
                Diagnostic::error(format!("redefinition of global '{name}'")).with_span(g.span),
            );
        }
    }

    fn check_function(&mut self, f: &mut FnDef) {
        let Some(body) = &mut f.body else { return };
        let name = self.name(f.name);

        self.ret_ty = f.sig.ret_ty.clone();
        self.scopes.push();
        for param in &f.sig.params {
            let info = VarInfo {
                ty: param.ty.clone(),
                mutability: param.mutability,
                span: param.span,
            };
            // Duplicates were reported with the signature
            let _ = self.scopes.declare(param.name, info);
        }

        // The outermost block shares the parameters' scope
        if let ExprKind::Block(stmts) = &mut body.kind {
            for stmt in stmts.iter_mut() {
                self.check_stmt(stmt);
            }
            body.ty = Some(Type::unit());
        } else {
            self.check_expr(body);
        }
        self.scopes.pop();

        if !f.sig.ret_ty.is_unit() && !body.always_returns() {
            self.error(
                Diagnostic::error(format!("function '{name}' does not return a value on every path"))
                    .with_span(f.span)
                    .with_help(format!("end '{name}' with a `return` statement")),
            );
        }
    }

    fn check_undefined_calls(&mut self) {
        let mut missing: Vec<(Symbol, Span)> = self
            .functions
            .iter()
            .filter(|(name, info)| !info.defined && self.called.contains(*name))
            .map(|(name, info)| (*name, info.span))
            .collect();
        missing.sort_by_key(|(_, span)| span.start);
        for (name, span) in missing {
            self.error(
                Diagnostic::error(format!("function '{}' is called but never defined", self.name(name)))
                    .with_span(span),
            );
        }
    }

    fn check_entry(&mut self, entry: &str, fallback: Option<Span>) {
        let sym = self.interner.intern(entry);
        match self.functions.get(&sym) {
            Some(info) if info.defined => {
                if !info.params.is_empty() || info.ret != Type::i32() {
                    let span = info.span;
                    self.error(
                        Diagnostic::error(format!("entry function '{entry}' must be declared `int {entry}()`"))
                            .with_span(span),
                    );
                }
            }
            _ => {
                let mut diag = Diagnostic::error(format!("no entry function '{entry}' defined"))
                    .with_help(format!("add `int {entry}() {{ ... }}`"));
                if let Some(span) = fallback {
                    diag = diag.with_span(Span::new(span.source, span.start, span.start));
                }
                self.error(diag);
            }
        }
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match &mut stmt.kind {
            StmtKind::Let {
                name,
                name_span,
                ty,
                init,
                mutability,
            } => {
                // The initializer sees the enclosing scopes, not the new name
                let init_ty = self.check_expr(init);
                if !ty.is_value() {
                    self.error(
                        Diagnostic::error(format!("variable '{}' cannot have type {ty}", self.name(*name)))
                            .with_span(*name_span),
                    );
                }
                self.expect_type(ty, &init_ty, init.span, "initializer");

                let info = VarInfo {
                    ty: ty.clone(),
                    mutability: *mutability,
                    span: *name_span,
                };
                if let Err(previous) = self.scopes.declare(*name, info) {
                    self.error(
                        Diagnostic::error(format!("redeclaration of '{}'", self.name(*name)))
                            .with_span(*name_span)
                            .with_label("already declared in this scope")
                            .with_help(format!("previous declaration at byte {}", previous.start)),
                    );
                }
            }
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::Empty => {}
        }
    }

    /// Report a mismatch unless either side already failed to type-check.
    fn expect_type(&mut self, expected: &Type, found: &Type, span: Span, what: &str) -> bool {
        if expected == found || expected.is_error() || found.is_error() {
            return true;
        }
        self.error(
            Diagnostic::error(format!("mismatched types in {what}: expected {expected}, found {found}"))
                .with_span(span)
                .with_label(format!("this is {found}")),
        );
        false
    }

    pub(crate) fn check_expr(&mut self, expr: &mut Expr) -> Type {
        let ty = self.infer_expr(expr);
        expr.ty = Some(ty.clone());
        ty
    }

    fn infer_expr(&mut self, expr: &mut Expr) -> Type {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Literal(Literal::Bool(_)) => Type::bool(),
            ExprKind::Literal(Literal::Int(value)) => {
                if i32::try_from(*value).is_err() {
                    self.error(
                        Diagnostic::error(format!("integer literal {value} does not fit in int"))
                            .with_span(span)
                            .with_help(format!("int holds {} to {}", i32::MIN, i32::MAX)),
                    );
                }
                Type::i32()
            }

            ExprKind::Ident(sym) => {
                let sym = *sym;
                if let Some(var) = self.scopes.lookup(sym) {
                    return var.ty.clone();
                }
                let name = self.name(sym);
                if self.functions.contains_key(&sym) {
                    self.error(
                        Diagnostic::error(format!("function '{name}' used as a value"))
                            .with_span(span)
                            .with_help(format!("call it: `{name}(...)`")),
                    );
                } else {
                    self.error(
                        Diagnostic::error(format!("undeclared variable '{name}'"))
                            .with_span(span)
                            .with_label("not found in this scope"),
                    );
                }
                Type::Error
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let op = *op;
                let lhs_ty = self.check_expr(lhs);
                let rhs_ty = self.check_expr(rhs);
                self.check_binary(op, &lhs_ty, &rhs_ty, span)
            }

            ExprKind::Unary { op, operand } => {
                let op = *op;
                let ty = self.check_expr(operand);
                let (expected, result) = match op {
                    UnaryOp::Neg => (Type::i32(), Type::i32()),
                    UnaryOp::Not => (Type::bool(), Type::bool()),
                };
                if !ty.is_error() && ty != expected {
                    self.error(
                        Diagnostic::error(format!("operator `{}` expects {expected}, found {ty}", op.as_str()))
                            .with_span(span),
                    );
                }
                result
            }

            ExprKind::Call { callee, args } => {
                let arg_tys: Vec<(Type, Span)> =
                    args.iter_mut().map(|a| (self.check_expr(a), a.span)).collect();
                self.check_call(callee, &arg_tys, span)
            }

            ExprKind::Assign { lhs, rhs } => {
                let rhs_ty = self.check_expr(rhs);
                let lhs_ty = self.check_assign_target(lhs);
                self.expect_type(&lhs_ty, &rhs_ty, rhs.span, "assignment");
                lhs_ty
            }

            ExprKind::Block(stmts) => {
                self.scopes.push();
                for stmt in stmts.iter_mut() {
                    self.check_stmt(stmt);
                }
                self.scopes.pop();
                Type::unit()
            }

            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_condition(cond, "if");
                self.check_expr(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_expr(else_branch);
                }
                Type::unit()
            }

            ExprKind::While { cond, body } => {
                self.check_condition(cond, "while");
                self.check_expr(body);
                Type::unit()
            }

            ExprKind::Return(value) => {
                let ret_ty = self.ret_ty.clone();
                match value {
                    Some(value) => {
                        let ty = self.check_expr(value);
                        if ret_ty.is_unit() {
                            self.error(
                                Diagnostic::error("void function cannot return a value")
                                    .with_span(value.span),
                            );
                        } else {
                            self.expect_type(&ret_ty, &ty, value.span, "return value");
                        }
                    }
                    None if !ret_ty.is_unit() => {
                        self.error(
                            Diagnostic::error(format!("missing return value, expected {ret_ty}"))
                                .with_span(span),
                        );
                    }
                    None => {}
                }
                Type::unit()
            }
        }
    }

    fn check_binary(&mut self, op: BinOp, lhs: &Type, rhs: &Type, span: Span) -> Type {
        let (operand, result) = if op.is_arithmetic() {
            (Some(Type::i32()), Type::i32())
        } else if op.is_ordering() {
            (Some(Type::i32()), Type::bool())
        } else if op.is_logical() {
            (Some(Type::bool()), Type::bool())
        } else {
            // == and != take any two values of the same type
            (None, Type::bool())
        };

        if lhs.is_error() || rhs.is_error() {
            return result;
        }

        let ok = match &operand {
            Some(expected) => lhs == expected && rhs == expected,
            None => lhs == rhs && lhs.is_value(),
        };
        if !ok {
            let wanted = match operand {
                Some(t) => format!("{t} operands"),
                None => "operands of the same type".to_string(),
            };
            self.error(
                Diagnostic::error(format!(
                    "operator `{}` expects {wanted}, found {lhs} and {rhs}",
                    op.as_str()
                ))
                .with_span(span),
            );
        }
        result
    }

    fn check_call(&mut self, callee: &mut Expr, args: &[(Type, Span)], span: Span) -> Type {
        let Some(sym) = callee.as_ident() else {
            self.error(Diagnostic::error("only named functions can be called").with_span(callee.span));
            return Type::Error;
        };
        let name = self.name(sym);

        if self.in_global_init {
            self.error(
                Diagnostic::error(format!("global initializer cannot call '{name}'"))
                    .with_span(span)
                    .with_help("global initializers may only use literals, operators and earlier globals"),
            );
        }

        if self.scopes.lookup(sym).is_some() {
            self.error(Diagnostic::error(format!("'{name}' is a variable, not a function")).with_span(callee.span));
            return Type::Error;
        }

        let Some(info) = self.functions.get(&sym).cloned() else {
            self.error(
                Diagnostic::error(format!("undeclared function '{name}'"))
                    .with_span(callee.span)
                    .with_label("not declared before use"),
            );
            return Type::Error;
        };
        self.called.insert(sym);
        callee.ty = Some(Type::Function {
            params: info.params.clone(),
            ret: Box::new(info.ret.clone()),
        });

        if info.params.len() != args.len() {
            self.error(
                Diagnostic::error(format!(
                    "function '{name}' takes {} argument(s) but {} were supplied",
                    info.params.len(),
                    args.len()
                ))
                .with_span(span),
            );
            return info.ret;
        }

        for (expected, (found, arg_span)) in info.params.iter().zip(args) {
            self.expect_type(expected, found, *arg_span, "argument");
        }
        info.ret
    }

    fn check_assign_target(&mut self, lhs: &mut Expr) -> Type {
        let Some(sym) = lhs.as_ident() else {
            self.error(Diagnostic::error("left side of assignment must be a variable").with_span(lhs.span));
            return Type::Error;
        };
        let ty = self.check_expr(lhs);
        if let Some(var) = self.scopes.lookup(sym) {
            if var.mutability == Mutability::Immutable {
                let declared = var.span;
                self.error(
                    Diagnostic::error(format!("cannot assign to const variable '{}'", self.name(sym)))
                        .with_span(lhs.span)
                        .with_help(format!("declared const at byte {}", declared.start)),
                );
            }
        }
        ty
    }

    fn check_condition(&mut self, cond: &mut Expr, what: &str) {
        let ty = self.check_expr(cond);
        if !ty.is_error() && ty != Type::bool() {
            self.error(
                Diagnostic::error(format!("`{what}` condition must be bool, found {ty}"))
                    .with_span(cond.span)
                    .with_help("compare explicitly, e.g. `x != 0`"),
            );
        }
    }
}
