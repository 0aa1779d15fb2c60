pub mod backend;
mod env;
pub mod symbolic;

pub use backend::{Backend, CompileError, CompileResult, Compiler, CompilerFlags};
pub use symbolic::{NodeCategory, NodeKind, Signature, SymbolicCircuit, SymbolicNode};
