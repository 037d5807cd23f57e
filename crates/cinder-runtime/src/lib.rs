//! Runtime for compiled Cinder programs.
//!
//! This crate provides:
//!
//! - [`OverflowPolicy`]: `int` arithmetic with an explicit answer to what
//!   happens on overflow (checked, wrapping or saturating)
//! - [`Vm`]: an interpreter for the instruction listing produced by
//!   `cinder-codegen`
//!
//! # Example
//!
//! ```text
//! FUNC main()
//! BEGIN
//!     MOD t0, 5, 0     ; ArithError::DivisionByZero under every policy
//!     RET t0
//! END
//! ```

mod arith;
mod value;
mod vm;

pub use arith::{ArithError, OverflowPolicy};
pub use value::Value;
pub use vm::{RuntimeError, Vm, VmOptions};
