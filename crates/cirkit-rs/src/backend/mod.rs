//! Backend-facing compilation machinery.
//!
//! ```text
//! SymbolicCircuit
//!      |
//!      v
//! Compiler::compile ----- cache hit ----> CompiledCircuitsMap
//!      |
//!      | miss
//!      v
//! Backend::compile_pipeline
//!      |
//!      +-- retrieve_layer_rule        (LayerRegistry)
//!      +-- retrieve_parameter_rule    (ParameterRegistry)
//!      +-- retrieve_initializer_rule  (InitializerRegistry)
//!      |
//!      v
//! B::CompiledCircuit --- registered ---> CompiledCircuitsMap
//! ```

mod compiled;
mod compiler;
mod error;
mod flags;
pub mod registry;

use std::fmt;
use std::hash::Hash;

pub use compiled::CompiledCircuitsMap;
pub use compiler::{
    Compiler, InitializerRegistry, InitializerRule, LayerRegistry, LayerRule, ParameterRegistry,
    ParameterRule,
};
pub use error::{CircuitSide, CompileError, CompileResult};
pub use flags::{CompilerFlags, FlagValue};
pub use registry::{DuplicatePolicy, Rule, RuleRegistry};

use crate::symbolic::SymbolicCircuit;

/// Backend names an application may select.
pub const SUPPORTED_BACKENDS: &[&str] = &["ref"];

pub fn is_supported_backend(name: &str) -> bool {
    SUPPORTED_BACKENDS.contains(&name)
}

pub fn ensure_supported_backend(name: &str) -> CompileResult<()> {
    if is_supported_backend(name) {
        Ok(())
    } else {
        Err(CompileError::UnsupportedBackend(name.to_string()))
    }
}

/// A compilation target.
///
/// The associated types are the compiled counterparts of each node category and of a
/// whole circuit. `compile_pipeline` is the only required behavior: traverse the
/// circuit so that every node's inputs are handled before the node, dispatch each node
/// to the rule registered for its exact type, and assemble the results.
pub trait Backend: Sized + 'static {
    /// Identifier used to select the backend by name.
    const NAME: &'static str;

    type CompiledLayer: 'static;
    type CompiledParameter: 'static;
    type CompiledInitializer: 'static;
    type CompiledCircuit: Clone + Eq + Hash + fmt::Debug + 'static;

    /// Compiles a circuit that is not in the compiled-circuit map yet.
    ///
    /// Implementations may register the result themselves; otherwise
    /// [`Compiler::compile`] registers it after this returns `Ok`.
    fn compile_pipeline(
        compiler: &mut Compiler<Self>,
        circuit: &SymbolicCircuit,
    ) -> CompileResult<Self::CompiledCircuit>;
}
