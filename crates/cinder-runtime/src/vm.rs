//! Interpreter for compiled programs.
//!
//! Calls push frames on an explicit stack rather than recursing, so the
//! call depth limit is the only bound on guest recursion.

use cinder_codegen::{label_positions, Function, Inst, Label, Operand, Place, Program};
use cinder_hir::{BinOp, UnaryOp};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;

use crate::arith::{ArithError, OverflowPolicy};
use crate::value::Value;

/// Frame name used for the global initialisation section.
const GLOBALS: &str = "<globals>";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("{source} in '{function}'")]
    Arith {
        function: SmolStr,
        #[source]
        source: ArithError,
    },

    #[error("no function named '{0}'")]
    UnknownFunction(SmolStr),

    #[error("'{function}' takes {expected} argument(s) but was given {found}")]
    Arity {
        function: SmolStr,
        expected: usize,
        found: usize,
    },

    #[error("step limit of {0} instructions exceeded")]
    StepLimit(u64),

    #[error("call depth limit of {0} exceeded")]
    CallDepth(usize),

    #[error("'{0}' finished without returning a value")]
    MissingReturn(SmolStr),

    #[error("read of '{0}' before it was set")]
    Unset(SmolStr),

    #[error("expected {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("jump to undefined label {label} in '{function}'")]
    UnknownLabel { function: SmolStr, label: Label },
}

/// Execution limits and arithmetic behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    pub policy: OverflowPolicy,
    /// Instructions executed before giving up, labels included.
    pub max_steps: u64,
    /// Frames live at once, the entry function counting as one.
    pub max_call_depth: usize,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            policy: OverflowPolicy::Checked,
            max_steps: 1_000_000,
            max_call_depth: 256,
        }
    }
}

struct Frame<'p> {
    name: &'p str,
    code: &'p [Inst],
    returns_value: bool,
    pc: usize,
    locals: FxHashMap<SmolStr, Value>,
    temps: Vec<Option<Value>>,
    /// Where the caller wants the return value.
    ret_dst: Option<Place>,
}

impl<'p> Frame<'p> {
    fn globals(program: &'p Program) -> Self {
        Self {
            name: GLOBALS,
            code: &program.globals,
            returns_value: false,
            pc: 0,
            locals: FxHashMap::default(),
            temps: vec![None; program.global_temps as usize],
            ret_dst: None,
        }
    }

    fn call(function: &'p Function, args: Vec<Value>, ret_dst: Option<Place>) -> Result<Self, RuntimeError> {
        if function.params.len() != args.len() {
            return Err(RuntimeError::Arity {
                function: function.name.clone(),
                expected: function.params.len(),
                found: args.len(),
            });
        }
        Ok(Self {
            name: &function.name,
            code: &function.body,
            returns_value: function.returns_value,
            pc: 0,
            locals: function.params.iter().cloned().zip(args).collect(),
            temps: vec![None; function.temps as usize],
            ret_dst,
        })
    }

    fn read(&self, operand: &Operand, globals: &FxHashMap<SmolStr, Value>) -> Result<Value, RuntimeError> {
        let place = match operand {
            Operand::Const(c) => return Ok(Value::from(*c)),
            Operand::Place(place) => place,
        };
        let value = match place {
            Place::Global(name) => globals.get(name).copied(),
            Place::Local(name) => self.locals.get(name).copied(),
            Place::Temp(n) => self.temps.get(*n as usize).copied().flatten(),
        };
        value.ok_or_else(|| RuntimeError::Unset(SmolStr::new(place.to_string())))
    }

    fn write(&mut self, place: &Place, value: Value, globals: &mut FxHashMap<SmolStr, Value>) {
        match place {
            Place::Global(name) => {
                globals.insert(name.clone(), value);
            }
            Place::Local(name) => {
                self.locals.insert(name.clone(), value);
            }
            Place::Temp(n) => {
                let n = *n as usize;
                if n >= self.temps.len() {
                    self.temps.resize(n + 1, None);
                }
                self.temps[n] = Some(value);
            }
        }
    }
}

enum Flow {
    Continue,
    Finished(Option<Value>),
}

/// Executes one program. Globals persist between [`Vm::call`]s and are
/// reset by [`Vm::run`].
pub struct Vm<'p> {
    program: &'p Program,
    options: VmOptions,
    globals: FxHashMap<SmolStr, Value>,
    labels: FxHashMap<&'p str, FxHashMap<Label, usize>>,
    steps: u64,
}

impl<'p> Vm<'p> {
    pub fn new(program: &'p Program, options: VmOptions) -> Self {
        let mut labels = FxHashMap::default();
        labels.insert(GLOBALS, label_positions(&program.globals));
        for function in program.functions.values() {
            labels.insert(function.name.as_str(), function.label_positions());
        }
        Self {
            program,
            options,
            globals: FxHashMap::default(),
            labels,
            steps: 0,
        }
    }

    /// Initialise globals, then run `entry` and return its exit value.
    pub fn run(&mut self, entry: &str) -> Result<i32, RuntimeError> {
        self.globals.clear();
        self.steps = 0;
        self.execute(Frame::globals(self.program))?;
        log::debug!("initialised {} global(s)", self.globals.len());

        let value = self.call(entry, vec![])?.ok_or_else(|| RuntimeError::MissingReturn(entry.into()))?;
        let exit = value.as_int()?;
        log::debug!("{entry} returned {exit} after {} step(s)", self.steps);
        Ok(exit)
    }

    /// Call a single function with the current globals.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Option<Value>, RuntimeError> {
        let function = self
            .program
            .function(name)
            .ok_or_else(|| RuntimeError::UnknownFunction(name.into()))?;
        self.execute(Frame::call(function, args, None)?)
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).copied()
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn jump(&self, function: &str, label: Label) -> Result<usize, RuntimeError> {
        self.labels
            .get(function)
            .and_then(|positions| positions.get(&label))
            .copied()
            .ok_or_else(|| RuntimeError::UnknownLabel {
                function: function.into(),
                label,
            })
    }

    fn execute(&mut self, root: Frame<'p>) -> Result<Option<Value>, RuntimeError> {
        let mut stack = vec![root];

        while let Some(frame) = stack.last_mut() {
            let code = frame.code;
            let Some(inst) = code.get(frame.pc) else {
                // Fell off the end of the body
                if frame.returns_value {
                    return Err(RuntimeError::MissingReturn(frame.name.into()));
                }
                match Self::ret(&mut stack, None, &mut self.globals)? {
                    Flow::Continue => continue,
                    Flow::Finished(value) => return Ok(value),
                }
            };

            self.steps += 1;
            if self.steps > self.options.max_steps {
                return Err(RuntimeError::StepLimit(self.options.max_steps));
            }
            log::trace!("{:>8} {}@{}: {inst}", self.steps, frame.name, frame.pc);
            frame.pc += 1;

            match inst {
                Inst::Global { name, value } => {
                    let value = frame.read(value, &self.globals)?;
                    self.globals.insert(name.clone(), value);
                }
                Inst::Mov { dst, src } => {
                    let value = frame.read(src, &self.globals)?;
                    frame.write(dst, value, &mut self.globals);
                }
                Inst::Binary { op, dst, lhs, rhs } => {
                    let lhs = frame.read(lhs, &self.globals)?;
                    let rhs = frame.read(rhs, &self.globals)?;
                    let value = binary(self.options.policy, *op, lhs, rhs).map_err(|e| in_function(e, frame.name))?;
                    frame.write(dst, value, &mut self.globals);
                }
                Inst::Unary { op, dst, operand } => {
                    let operand = frame.read(operand, &self.globals)?;
                    let value = match op {
                        UnaryOp::Neg => self
                            .options
                            .policy
                            .neg(operand.as_int()?)
                            .map(Value::Int)
                            .map_err(|source| RuntimeError::Arith {
                                function: frame.name.into(),
                                source,
                            })?,
                        UnaryOp::Not => Value::Bool(!operand.as_bool()?),
                    };
                    frame.write(dst, value, &mut self.globals);
                }
                Inst::Call { dst, func, args } => {
                    let args = args
                        .iter()
                        .map(|a| frame.read(a, &self.globals))
                        .collect::<Result<Vec<_>, _>>()?;
                    let callee = self
                        .program
                        .function(func)
                        .ok_or_else(|| RuntimeError::UnknownFunction(func.clone()))?;
                    if stack.len() >= self.options.max_call_depth {
                        return Err(RuntimeError::CallDepth(self.options.max_call_depth));
                    }
                    stack.push(Frame::call(callee, args, dst.clone())?);
                }
                Inst::Jmp(label) => {
                    frame.pc = self.jump(frame.name, *label)?;
                }
                Inst::Jz { cond, target } => {
                    if !frame.read(cond, &self.globals)?.as_bool()? {
                        frame.pc = self.jump(frame.name, *target)?;
                    }
                }
                Inst::Label(_) => {}
                Inst::Ret(value) => {
                    let value = match value {
                        Some(v) => Some(frame.read(v, &self.globals)?),
                        None => None,
                    };
                    if let Flow::Finished(value) = Self::ret(&mut stack, value, &mut self.globals)? {
                        return Ok(value);
                    }
                }
            }
        }

        Ok(None)
    }

    /// Pop the current frame and hand `value` to the caller, if any.
    fn ret(
        stack: &mut Vec<Frame<'p>>,
        value: Option<Value>,
        globals: &mut FxHashMap<SmolStr, Value>,
    ) -> Result<Flow, RuntimeError> {
        let Some(finished) = stack.pop() else {
            return Ok(Flow::Finished(value));
        };
        let Some(caller) = stack.last_mut() else {
            return Ok(Flow::Finished(value));
        };
        if let Some(dst) = &finished.ret_dst {
            let value = value.ok_or_else(|| RuntimeError::MissingReturn(finished.name.into()))?;
            caller.write(dst, value, globals);
        }
        Ok(Flow::Continue)
    }
}

fn in_function(error: RuntimeError, function: &str) -> RuntimeError {
    match error {
        RuntimeError::Arith { source, .. } => RuntimeError::Arith {
            function: function.into(),
            source,
        },
        other => other,
    }
}

fn binary(policy: OverflowPolicy, op: BinOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    let arith = |result: Result<i32, ArithError>| {
        result.map(Value::Int).map_err(|source| RuntimeError::Arith {
            function: SmolStr::default(),
            source,
        })
    };
    match op {
        BinOp::Add => arith(policy.add(lhs.as_int()?, rhs.as_int()?)),
        BinOp::Sub => arith(policy.sub(lhs.as_int()?, rhs.as_int()?)),
        BinOp::Mul => arith(policy.mul(lhs.as_int()?, rhs.as_int()?)),
        BinOp::Div => arith(policy.div(lhs.as_int()?, rhs.as_int()?)),
        BinOp::Rem => arith(policy.rem(lhs.as_int()?, rhs.as_int()?)),
        BinOp::Pow => arith(policy.pow(lhs.as_int()?, rhs.as_int()?)),
        BinOp::Lt => Ok(Value::Bool(lhs.as_int()? < rhs.as_int()?)),
        BinOp::Le => Ok(Value::Bool(lhs.as_int()? <= rhs.as_int()?)),
        BinOp::Gt => Ok(Value::Bool(lhs.as_int()? > rhs.as_int()?)),
        BinOp::Ge => Ok(Value::Bool(lhs.as_int()? >= rhs.as_int()?)),
        BinOp::Eq => Ok(Value::Bool(lhs == rhs)),
        BinOp::Ne => Ok(Value::Bool(lhs != rhs)),
        // Only reached for listings built by hand; codegen short-circuits these
        BinOp::And => Ok(Value::Bool(lhs.as_bool()? && rhs.as_bool()?)),
        BinOp::Or => Ok(Value::Bool(lhs.as_bool()? || rhs.as_bool()?)),
    }
}
