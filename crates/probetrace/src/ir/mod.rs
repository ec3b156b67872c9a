//! Intermediate representation of the programs being instrumented.
//!
//! The model is a small, typed, three-address style IR: classes hold static
//! fields and methods, a method body is an ordered list of instructions, and
//! each instruction may carry a source line tag. Bodies are loaded from JSON.

mod body;
mod cfg;
pub mod display;
mod expr;
mod lines;
mod types;

pub use body::{
    Class, FieldDecl, InstrId, InstrKind, Instruction, Method, MethodBody, Place, Program,
    STATIC_INITIALIZER, TEMP_PREFIX,
};
pub use cfg::{CfgBuilder, ControlFlowGraph};
pub use expr::{BinOp, CallTarget, Expr, FieldRef, Local, UnaryOp};
pub use lines::LineIndex;
pub use types::{Literal, Type};
