//! Reference compilation backend.
//!
//! Compiles a symbolic circuit into a [`RefProgram`]: a flat, evaluation-ordered list of
//! layer descriptions with their compiled parameter graphs. It performs no numerics and
//! exists to exercise the rule dispatch and memoization machinery end to end.

pub mod ir;
mod pipeline;
mod rules;

use cirkit_rs::backend::{ensure_supported_backend, Backend, CompileResult, Compiler, CompilerFlags};
use cirkit_rs::symbolic::SymbolicCircuit;

pub use ir::{
    RefCircuit, RefInitializer, RefLayer, RefLayerOp, RefParameter, RefParameterNode,
    RefParameterOp, RefProgram, Semiring,
};
pub use pipeline::{PipelineOptions, PRUNE_UNREACHABLE_FLAG, SEMIRING_FLAG};
pub use rules::register_default_rules;

pub const BACKEND_NAME: &str = "ref";

/// Pipeline runs and completed rule invocations, failed runs included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefStats {
    pub pipeline_runs: usize,
    pub layer_rules: usize,
    pub parameter_rules: usize,
    pub initializer_rules: usize,
}

#[derive(Debug, Default)]
pub struct RefBackend {
    stats: RefStats,
    next_id: u64,
}

impl RefBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> RefStats {
        self.stats
    }

    fn next_circuit_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Backend for RefBackend {
    const NAME: &'static str = BACKEND_NAME;

    type CompiledLayer = RefLayerOp;
    type CompiledParameter = RefParameterOp;
    type CompiledInitializer = RefInitializer;
    type CompiledCircuit = RefCircuit;

    fn compile_pipeline(
        compiler: &mut Compiler<Self>,
        circuit: &SymbolicCircuit,
    ) -> CompileResult<RefCircuit> {
        pipeline::compile_circuit(compiler, circuit)
    }
}

/// Reference compiler with the default rules installed.
///
/// Flags from `CIRKIT_COMPILER_FLAGS` are applied first; `flags` override them.
pub fn ref_compiler(flags: CompilerFlags) -> CompileResult<Compiler<RefBackend>> {
    ensure_supported_backend(BACKEND_NAME)?;
    let flags = CompilerFlags::from_env()?.merged(flags);
    let mut compiler = Compiler::new(RefBackend::new(), flags);
    register_default_rules(&mut compiler)?;
    Ok(compiler)
}
