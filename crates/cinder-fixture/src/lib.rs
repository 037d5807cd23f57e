//! The reference fixture program.
//!
//! [`SOURCE`] is the C++ text the compiler pipeline is exercised with;
//! [`entry`] is the same program written directly in Rust so both can be
//! compared. With default inputs the program always exits with 16.

use cinder_runtime::{ArithError, OverflowPolicy};
use std::fmt;

/// C++ source of the fixture.
pub const SOURCE: &str = include_str!("../fixtures/input.cpp");

/// Exit value of the fixture with default inputs.
pub const EXPECTED_EXIT: i32 = 16;

/// File-scope state of the program. Initialised once, never read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Globals {
    pub global_var: i32,
    pub global_flag: bool,
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            global_var: 42,
            global_flag: false,
        }
    }
}

/// Initial values of the entry routine's locals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inputs {
    pub a: i32,
    pub b: i32,
    pub flag: bool,
}

impl Default for Inputs {
    fn default() -> Self {
        Self {
            a: 5,
            b: 10,
            flag: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// `flag && c > 10` held; `a` was incremented.
    Then,
    Else,
}

/// Every intermediate value of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub inputs: Inputs,
    pub c: i32,
    pub d: i32,
    pub e: i32,
    pub branch: Branch,
    /// `a` after the conditional.
    pub after_branch: i32,
    /// Times the loop body ran.
    pub iterations: u32,
    /// Final `a`, the exit value.
    pub result: i32,
}

pub fn add(x: i32, y: i32) -> Result<i32, ArithError> {
    OverflowPolicy::Checked.add(x, y)
}

pub fn sub(x: i32, y: i32) -> Result<i32, ArithError> {
    OverflowPolicy::Checked.sub(x, y)
}

/// Run the entry routine with checked arithmetic.
pub fn entry(globals: &Globals, inputs: Inputs) -> Result<Trace, ArithError> {
    entry_with(OverflowPolicy::Checked, globals, inputs)
}

/// Run the entry routine under `policy`.
pub fn entry_with(policy: OverflowPolicy, globals: &Globals, inputs: Inputs) -> Result<Trace, ArithError> {
    log::debug!("fixture globals: {globals:?}, inputs: {inputs:?}, policy: {policy}");
    let Inputs { mut a, b, flag } = inputs;

    let c = policy.add(a, b)?;
    let d = policy.sub(a, b)?;
    let e = policy.rem(a, b)?;

    let branch = if flag && c > 10 {
        a = policy.add(a, 1)?;
        Branch::Then
    } else {
        a = policy.sub(a, 1)?;
        Branch::Else
    };
    let after_branch = a;

    let mut iterations = 0;
    while a < c {
        a = policy.add(a, 2)?;
        iterations += 1;
        log::trace!("loop {iterations}: a = {a}");
    }

    Ok(Trace {
        inputs,
        c,
        d,
        e,
        branch,
        after_branch,
        iterations,
        result: a,
    })
}

/// Run with default globals and inputs, returning the exit value.
pub fn run() -> Result<i32, ArithError> {
    entry(&Globals::default(), Inputs::default()).map(|trace| trace.result)
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Branch::Then => "then",
            Branch::Else => "else",
        })
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Inputs { a, b, flag } = self.inputs;
        writeln!(f, "a = {a}, b = {b}, flag = {flag}")?;
        writeln!(f, "c = add(a, b) = {}", self.c)?;
        writeln!(f, "d = sub(a, b) = {}", self.d)?;
        writeln!(f, "e = a % b = {}", self.e)?;
        writeln!(f, "branch: {} (a = {})", self.branch, self.after_branch)?;
        writeln!(f, "loop: {} iteration(s)", self.iterations)?;
        write!(f, "exit: {}", self.result)
    }
}
