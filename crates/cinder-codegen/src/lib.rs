mod codegen;
mod inst;

pub use codegen::CodeGenerator;
pub use inst::{
    binop_mnemonic, label_positions, unary_mnemonic, Const, Function, Inst, Label, Operand, Place,
    Program,
};

use cinder_common::SymbolInterner;
use cinder_hir::Module;
use miette::Result;

/// Compile a checked HIR module to an instruction listing.
pub fn compile_module(module: &Module, interner: &SymbolInterner) -> Result<Program> {
    CodeGenerator::new(interner).compile_module(module)
}
