use cinder_common::{Symbol, SymbolInterner};
use cinder_hir::{BinOp, Expr, ExprKind, FnDef, ItemKind, Literal, Module, Stmt, StmtKind};
use miette::Result;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use crate::inst::{Const, Function, Inst, Label, Operand, Place, Program};

pub struct CodeGenerator<'a> {
    interner: &'a SymbolInterner,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(interner: &'a SymbolInterner) -> Self {
        Self { interner }
    }

    /// Compile a checked module. Expects every expression to have passed
    /// semantic analysis; unresolved names are reported, not assumed.
    pub fn compile_module(&self, module: &Module) -> Result<Program> {
        let mut compiler = ModuleCompiler::new(self.interner);

        // First pass: register every global and function signature
        for item in &module.items {
            match &item.kind {
                ItemKind::Global(g) => {
                    compiler.globals.insert(g.name, self.interner.resolve(g.name));
                }
                ItemKind::Function(f) => {
                    compiler.returns_value.insert(f.name, !f.sig.ret_ty.is_unit());
                }
            }
        }

        let mut program = Program {
            name: self.interner.resolve(module.name),
            ..Program::default()
        };

        // Second pass: the global section, in declaration order
        let mut init = Emitter::new(&compiler);
        for item in &module.items {
            if let ItemKind::Global(g) = &item.kind {
                let value = init.value(&g.init)?;
                init.emit(Inst::Global {
                    name: self.interner.resolve(g.name),
                    value,
                });
            }
        }
        program.global_temps = init.temps;
        program.globals = init.body;

        // Third pass: function bodies
        for item in &module.items {
            if let ItemKind::Function(f) = &item.kind {
                if let Some(function) = compiler.compile_function(f)? {
                    program.functions.insert(function.name.clone(), function);
                }
            }
        }

        log::debug!(
            "generated {} function(s), {} instruction(s) for {}",
            program.functions.len(),
            program.len(),
            program.name
        );
        Ok(program)
    }
}

struct ModuleCompiler<'a> {
    interner: &'a SymbolInterner,
    globals: FxHashMap<Symbol, SmolStr>,
    returns_value: FxHashMap<Symbol, bool>,
}

impl<'a> ModuleCompiler<'a> {
    fn new(interner: &'a SymbolInterner) -> Self {
        Self {
            interner,
            globals: FxHashMap::default(),
            returns_value: FxHashMap::default(),
        }
    }

    fn compile_function(&self, fn_def: &FnDef) -> Result<Option<Function>> {
        // Prototypes produce no code
        let Some(body) = &fn_def.body else {
            return Ok(None);
        };
        let name = self.interner.resolve(fn_def.name);
        let mut emitter = Emitter::new(self);

        emitter.scopes.push(FxHashMap::default());
        let params = fn_def
            .sig
            .params
            .iter()
            .map(|p| emitter.declare_local(p.name))
            .collect();

        // The outermost block shares the parameters' scope
        match &body.kind {
            ExprKind::Block(stmts) => {
                for stmt in stmts {
                    emitter.compile_stmt(stmt)?;
                }
            }
            _ => {
                emitter.compile_expr(body)?;
            }
        }

        let returns_value = !fn_def.sig.ret_ty.is_unit();
        if !returns_value && !matches!(emitter.body.last(), Some(Inst::Ret(_))) {
            emitter.emit(Inst::Ret(None));
        }

        log::trace!("compiled {name}: {} instruction(s)", emitter.body.len());
        Ok(Some(Function {
            name,
            params,
            returns_value,
            body: emitter.body,
            temps: emitter.temps,
        }))
    }
}

/// Instruction builder for one function or for the global section.
struct Emitter<'m, 'a> {
    module: &'m ModuleCompiler<'a>,
    body: Vec<Inst>,
    temps: u32,
    labels: u32,
    scopes: Vec<FxHashMap<Symbol, SmolStr>>,
    /// Slot names already used in this function, plus all global names.
    taken: FxHashSet<SmolStr>,
}

impl<'m, 'a> Emitter<'m, 'a> {
    fn new(module: &'m ModuleCompiler<'a>) -> Self {
        Self {
            module,
            body: vec![],
            temps: 0,
            labels: 0,
            scopes: vec![],
            taken: module.globals.values().cloned().collect(),
        }
    }

    fn emit(&mut self, inst: Inst) {
        self.body.push(inst);
    }

    fn new_temp(&mut self) -> Place {
        let temp = Place::Temp(self.temps);
        self.temps += 1;
        temp
    }

    fn new_label(&mut self) -> Label {
        let label = Label(self.labels);
        self.labels += 1;
        label
    }

    /// Pick a slot name unique within the function: `a`, then `a.1`, `a.2`...
    fn declare_local(&mut self, sym: Symbol) -> SmolStr {
        let base = self.module.interner.resolve(sym);
        let mut slot = base.clone();
        let mut n = 0;
        while self.taken.contains(&slot) || looks_like_temp(&slot) {
            n += 1;
            slot = SmolStr::new(format!("{base}.{n}"));
        }
        self.taken.insert(slot.clone());
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(sym, slot.clone());
        }
        slot
    }

    fn lookup(&self, sym: Symbol) -> Result<Place> {
        if let Some(slot) = self.scopes.iter().rev().find_map(|s| s.get(&sym)) {
            return Ok(Place::Local(slot.clone()));
        }
        self.module
            .globals
            .get(&sym)
            .map(|name| Place::Global(name.clone()))
            .ok_or_else(|| miette::miette!("Unknown variable: {}", self.module.interner.resolve(sym)))
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match &stmt.kind {
            StmtKind::Let { name, init, .. } => {
                // Evaluated before the new name is in scope
                let value = self.value(init)?;
                let slot = self.declare_local(*name);
                self.emit(Inst::Mov {
                    dst: Place::Local(slot),
                    src: value,
                });
            }
            StmtKind::Expr(expr) => {
                self.compile_expr(expr)?;
            }
            StmtKind::Empty => {}
        }
        Ok(())
    }

    /// Compile an expression that must produce a value.
    fn value(&mut self, expr: &Expr) -> Result<Operand> {
        self.compile_expr(expr)?
            .ok_or_else(|| miette::miette!("Expression has no value"))
    }

    fn compile_expr(&mut self, expr: &Expr) -> Result<Option<Operand>> {
        match &expr.kind {
            ExprKind::Literal(Literal::Int(v)) => {
                let v = i32::try_from(*v)
                    .map_err(|_| miette::miette!("Integer literal out of range: {}", v))?;
                Ok(Some(Operand::Const(Const::Int(v))))
            }
            ExprKind::Literal(Literal::Bool(b)) => Ok(Some(Operand::Const(Const::Bool(*b)))),

            ExprKind::Ident(sym) => Ok(Some(Operand::Place(self.lookup(*sym)?))),

            ExprKind::Binary { op: BinOp::And, lhs, rhs } => {
                self.compile_short_circuit(true, lhs, rhs).map(Some)
            }
            ExprKind::Binary { op: BinOp::Or, lhs, rhs } => {
                self.compile_short_circuit(false, lhs, rhs).map(Some)
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.value(lhs)?;
                let rhs = self.value(rhs)?;
                let dst = self.new_temp();
                self.emit(Inst::Binary {
                    op: *op,
                    dst: dst.clone(),
                    lhs,
                    rhs,
                });
                Ok(Some(Operand::Place(dst)))
            }

            ExprKind::Unary { op, operand } => {
                let operand = self.value(operand)?;
                let dst = self.new_temp();
                self.emit(Inst::Unary {
                    op: *op,
                    dst: dst.clone(),
                    operand,
                });
                Ok(Some(Operand::Place(dst)))
            }

            ExprKind::Call { callee, args } => {
                let sym = callee
                    .as_ident()
                    .ok_or_else(|| miette::miette!("Call target is not a function name"))?;
                let returns_value = *self.module.returns_value.get(&sym).ok_or_else(|| {
                    miette::miette!("Unknown function: {}", self.module.interner.resolve(sym))
                })?;

                let args = args
                    .iter()
                    .map(|a| self.value(a))
                    .collect::<Result<Vec<_>>>()?;
                let dst = returns_value.then(|| self.new_temp());
                self.emit(Inst::Call {
                    dst: dst.clone(),
                    func: self.module.interner.resolve(sym),
                    args,
                });
                Ok(dst.map(Operand::Place))
            }

            ExprKind::Assign { lhs, rhs } => {
                let value = self.value(rhs)?;
                let sym = lhs
                    .as_ident()
                    .ok_or_else(|| miette::miette!("Assignment target is not a variable"))?;
                let dst = self.lookup(sym)?;
                self.emit(Inst::Mov {
                    dst: dst.clone(),
                    src: value,
                });
                Ok(Some(Operand::Place(dst)))
            }

            ExprKind::Block(stmts) => {
                self.scopes.push(FxHashMap::default());
                for stmt in stmts {
                    self.compile_stmt(stmt)?;
                }
                self.scopes.pop();
                Ok(None)
            }

            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.value(cond)?;
                let else_label = self.new_label();
                self.emit(Inst::Jz {
                    cond,
                    target: else_label,
                });
                self.compile_expr(then_branch)?;
                match else_branch {
                    Some(else_branch) => {
                        let end = self.new_label();
                        self.emit(Inst::Jmp(end));
                        self.emit(Inst::Label(else_label));
                        self.compile_expr(else_branch)?;
                        self.emit(Inst::Label(end));
                    }
                    None => self.emit(Inst::Label(else_label)),
                }
                Ok(None)
            }

            ExprKind::While { cond, body } => {
                let start = self.new_label();
                let end = self.new_label();
                self.emit(Inst::Label(start));
                let cond = self.value(cond)?;
                self.emit(Inst::Jz { cond, target: end });
                self.compile_expr(body)?;
                self.emit(Inst::Jmp(start));
                self.emit(Inst::Label(end));
                Ok(None)
            }

            ExprKind::Return(value) => {
                let value = match value {
                    Some(v) => Some(self.value(v)?),
                    None => None,
                };
                self.emit(Inst::Ret(value));
                Ok(None)
            }
        }
    }

    /// `a && b` skips `b` when `a` is false; `a || b` skips it when `a` is true.
    fn compile_short_circuit(&mut self, is_and: bool, lhs: &Expr, rhs: &Expr) -> Result<Operand> {
        let lhs = self.value(lhs)?;
        let dst = self.new_temp();
        self.emit(Inst::Mov {
            dst: dst.clone(),
            src: lhs,
        });

        let end = self.new_label();
        if is_and {
            self.emit(Inst::Jz {
                cond: Operand::Place(dst.clone()),
                target: end,
            });
        } else {
            let eval_rhs = self.new_label();
            self.emit(Inst::Jz {
                cond: Operand::Place(dst.clone()),
                target: eval_rhs,
            });
            self.emit(Inst::Jmp(end));
            self.emit(Inst::Label(eval_rhs));
        }

        let rhs = self.value(rhs)?;
        self.emit(Inst::Mov {
            dst: dst.clone(),
            src: rhs,
        });
        self.emit(Inst::Label(end));
        Ok(Operand::Place(dst))
    }
}

/// Local names must not read like a temporary in the listing.
fn looks_like_temp(name: &str) -> bool {
    name.strip_prefix('t')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinder_common::{SourceFile, SourceId};
    use std::path::PathBuf;

    fn compile(text: &str) -> Program {
        let interner = SymbolInterner::new();
        let file = SourceFile::new(SourceId::new(0), PathBuf::from("t.cpp"), text.to_string());
        let mut module = cinder_frontend::parse_file(&file, &interner).unwrap();
        cinder_sema::analyze(&mut module, &interner, &file, "main").unwrap();
        CodeGenerator::new(&interner).compile_module(&module).unwrap()
    }

    #[test]
    fn test_listing() {
        let program = compile(
            r#"
int g = 2;
int twice(int x) { return x * g; }
int main() {
    int a = 1;
    if (a < 3 && true) { a = twice(a); }
    return a;
}
"#,
        );
        insta::assert_snapshot!(program.to_string().trim_end(), @r"
GLOBAL g, 2

FUNC twice(x)
BEGIN
    MUL t0, x, g
    RET t0
END

FUNC main()
BEGIN
    MOV a, 1
    LT t0, a, 3
    MOV t1, t0
    JZ t1, L0
    MOV t1, true
L0:
    JZ t1, L1
    CALL t2, twice(a)
    MOV a, t2
L1:
    RET a
END
");
    }

    #[test]
    fn test_shadowed_locals_get_unique_slots() {
        let program = compile("int main() { int a = 1; { int a = 2; a = a + 1; } return a; }");
        let text = program.function("main").unwrap().to_string();
        assert!(text.contains("MOV a, 1"), "{text}");
        assert!(text.contains("MOV a.1, 2"), "{text}");
        assert!(text.contains("ADD t0, a.1, 1"), "{text}");
        assert!(text.contains("MOV a.1, t0"), "{text}");
        assert!(text.contains("RET a\n"), "{text}");
    }

    #[test]
    fn test_locals_do_not_collide_with_globals_or_temps() {
        let program = compile("int x = 1;\nint f(int x) { int t0 = x; return t0; }\nint main() { return f(x); }");
        let f = program.function("f").unwrap();
        assert_eq!(f.params, vec![SmolStr::new("x.1")]);
        assert!(f.to_string().contains("MOV t0.1, x.1"));
        assert!(program.function("main").unwrap().to_string().contains("CALL t0, f(x)"));
    }

    #[test]
    fn test_while_loop_shape() {
        let program = compile("int main() { int a = 0; while (a < 5) { a = a + 2; } return a; }");
        let body = &program.function("main").unwrap().body;
        assert_eq!(body[1], Inst::Label(Label(0)));
        assert!(matches!(&body[3], Inst::Jz { target: Label(1), .. }));
        assert_eq!(body[body.len() - 3], Inst::Jmp(Label(0)));
        assert_eq!(body[body.len() - 2], Inst::Label(Label(1)));
    }

    #[test]
    fn test_or_jumps_over_rhs() {
        let program = compile("bool f() { return true; }\nint main() { bool b = false || f(); if (b) { return 1; } return 0; }");
        let text = program.function("main").unwrap().to_string();
        let expected = "    MOV t0, false\n    JZ t0, L1\n    JMP L0\nL1:\n    CALL t1, f()\n    MOV t0, t1\nL0:\n";
        assert!(text.contains(expected), "{text}");
    }

    #[test]
    fn test_void_function_gets_implicit_return() {
        let program = compile("void nop() { }\nint main() { nop(); return 0; }");
        let nop = program.function("nop").unwrap();
        assert!(!nop.returns_value);
        assert_eq!(nop.body, vec![Inst::Ret(None)]);
        assert!(program.function("main").unwrap().to_string().contains("    CALL nop()\n"));
    }

    #[test]
    fn test_prototypes_emit_nothing() {
        let program = compile("int one();\nint main() { return one(); }\nint one() { return 1; }");
        let names: Vec<&str> = program.functions.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["main", "one"]);
    }

    #[test]
    fn test_computed_global_initializer() {
        let program = compile("int a = 3;\nint b = -a * 2;\nint main() { return b; }");
        let globals: Vec<String> = program.globals.iter().map(ToString::to_string).collect();
        assert_eq!(
            globals,
            vec!["GLOBAL a, 3", "NEG t0, a", "MUL t1, t0, 2", "GLOBAL b, t1"]
        );
        assert_eq!(program.global_temps, 2);
    }

    #[test]
    fn test_looks_like_temp() {
        assert!(looks_like_temp("t0"));
        assert!(looks_like_temp("t12"));
        assert!(!looks_like_temp("t"));
        assert!(!looks_like_temp("tx"));
        assert!(!looks_like_temp("total"));
    }
}
