//! Compilation orchestrator.
//!
//! [`Compiler`] owns the three rule registries, the compiled-circuit map, the backend
//! state and the flags. `compile` memoizes by circuit identity: a circuit that has been
//! compiled once is answered from the map without running any rule again. On a miss the
//! backend's [`Backend::compile_pipeline`] borrows the compiler for the whole run, looks
//! rules up through the `retrieve_*_rule` methods, and returns the assembled circuit,
//! which is then registered.

use std::sync::Arc;
use std::time::Instant;

use super::compiled::CompiledCircuitsMap;
use super::error::{CircuitSide, CompileError, CompileResult};
use super::flags::CompilerFlags;
use super::registry::{Rule, RuleRegistry};
use super::Backend;
use crate::symbolic::{NodeCategory, NodeKind, Signature, SymbolicCircuit, SymbolicNode};

pub type LayerRegistry<B> = RuleRegistry<Compiler<B>, <B as Backend>::CompiledLayer>;
pub type ParameterRegistry<B> = RuleRegistry<Compiler<B>, <B as Backend>::CompiledParameter>;
pub type InitializerRegistry<B> = RuleRegistry<Compiler<B>, <B as Backend>::CompiledInitializer>;

pub type LayerRule<B> = Rule<Compiler<B>, <B as Backend>::CompiledLayer>;
pub type ParameterRule<B> = Rule<Compiler<B>, <B as Backend>::CompiledParameter>;
pub type InitializerRule<B> = Rule<Compiler<B>, <B as Backend>::CompiledInitializer>;

pub struct Compiler<B: Backend> {
    backend: B,
    layers: LayerRegistry<B>,
    parameters: ParameterRegistry<B>,
    initializers: InitializerRegistry<B>,
    flags: CompilerFlags,
    compiled: CompiledCircuitsMap<B::CompiledCircuit>,
}

impl<B: Backend> Compiler<B> {
    /// Compiler with empty registries.
    pub fn new(backend: B, flags: CompilerFlags) -> Self {
        Self {
            backend,
            layers: RuleRegistry::new(NodeCategory::Layer),
            parameters: RuleRegistry::new(NodeCategory::Parameter),
            initializers: RuleRegistry::new(NodeCategory::Initializer),
            flags,
            compiled: CompiledCircuitsMap::new(),
        }
    }

    /// Compiler over pre-populated registries. Each registry must have been created for
    /// the category of the slot it is passed in.
    pub fn with_registries(
        backend: B,
        layers: LayerRegistry<B>,
        parameters: ParameterRegistry<B>,
        initializers: InitializerRegistry<B>,
        flags: CompilerFlags,
    ) -> CompileResult<Self> {
        check_slot(NodeCategory::Layer, layers.category())?;
        check_slot(NodeCategory::Parameter, parameters.category())?;
        check_slot(NodeCategory::Initializer, initializers.category())?;
        Ok(Self {
            backend,
            layers,
            parameters,
            initializers,
            flags,
            compiled: CompiledCircuitsMap::new(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn backend_name(&self) -> &'static str {
        B::NAME
    }

    pub fn flags(&self) -> &CompilerFlags {
        &self.flags
    }

    pub fn layer_registry(&self) -> &LayerRegistry<B> {
        &self.layers
    }

    pub fn parameter_registry(&self) -> &ParameterRegistry<B> {
        &self.parameters
    }

    pub fn initializer_registry(&self) -> &InitializerRegistry<B> {
        &self.initializers
    }

    pub fn compiled_circuits(&self) -> &CompiledCircuitsMap<B::CompiledCircuit> {
        &self.compiled
    }

    pub fn is_compiled(&self, symbolic: &SymbolicCircuit) -> bool {
        self.compiled.is_compiled(symbolic)
    }

    pub fn has_symbolic(&self, compiled: &B::CompiledCircuit) -> bool {
        self.compiled.has_symbolic(compiled)
    }

    pub fn get_compiled_circuit(
        &self,
        symbolic: &SymbolicCircuit,
    ) -> CompileResult<&B::CompiledCircuit> {
        self.compiled.get_compiled_circuit(symbolic)
    }

    pub fn get_symbolic_circuit(
        &self,
        compiled: &B::CompiledCircuit,
    ) -> CompileResult<&SymbolicCircuit> {
        self.compiled.get_symbolic_circuit(compiled)
    }

    pub fn register_compiled_circuit(
        &mut self,
        symbolic: SymbolicCircuit,
        compiled: B::CompiledCircuit,
    ) -> CompileResult<()> {
        self.compiled.register_compiled_circuit(symbolic, compiled)
    }

    pub fn add_layer_rule<T, F>(&mut self, rule: F) -> CompileResult<()>
    where
        T: NodeKind,
        F: Fn(&mut Self, &T) -> CompileResult<B::CompiledLayer> + Send + Sync + 'static,
    {
        self.layers.add_rule::<T, F>(rule)
    }

    pub fn add_parameter_rule<T, F>(&mut self, rule: F) -> CompileResult<()>
    where
        T: NodeKind,
        F: Fn(&mut Self, &T) -> CompileResult<B::CompiledParameter> + Send + Sync + 'static,
    {
        self.parameters.add_rule::<T, F>(rule)
    }

    pub fn add_initializer_rule<T, F>(&mut self, rule: F) -> CompileResult<()>
    where
        T: NodeKind,
        F: Fn(&mut Self, &T) -> CompileResult<B::CompiledInitializer> + Send + Sync + 'static,
    {
        self.initializers.add_rule::<T, F>(rule)
    }

    pub fn retrieve_layer_rule(&self, signature: &Signature) -> CompileResult<Arc<LayerRule<B>>> {
        self.layers.retrieve_rule(signature)
    }

    pub fn retrieve_parameter_rule(
        &self,
        signature: &Signature,
    ) -> CompileResult<Arc<ParameterRule<B>>> {
        self.parameters.retrieve_rule(signature)
    }

    pub fn retrieve_initializer_rule(
        &self,
        signature: &Signature,
    ) -> CompileResult<Arc<InitializerRule<B>>> {
        self.initializers.retrieve_rule(signature)
    }

    /// Looks up the layer rule for `node`'s exact type and applies it.
    pub fn compile_layer(&mut self, node: &dyn SymbolicNode) -> CompileResult<B::CompiledLayer> {
        let rule = self.retrieve_layer_rule(&node.signature())?;
        tracing::trace!(signature = node.signature().name(), "compiling layer");
        rule(self, node)
    }

    /// Looks up the parameter rule for `node`'s exact type and applies it.
    pub fn compile_parameter(
        &mut self,
        node: &dyn SymbolicNode,
    ) -> CompileResult<B::CompiledParameter> {
        let rule = self.retrieve_parameter_rule(&node.signature())?;
        tracing::trace!(signature = node.signature().name(), "compiling parameter");
        rule(self, node)
    }

    /// Looks up the initializer rule for `node`'s exact type and applies it.
    pub fn compile_initializer(
        &mut self,
        node: &dyn SymbolicNode,
    ) -> CompileResult<B::CompiledInitializer> {
        let rule = self.retrieve_initializer_rule(&node.signature())?;
        tracing::trace!(signature = node.signature().name(), "compiling initializer");
        rule(self, node)
    }

    /// Compiles `symbolic`, or returns the value it was compiled to before.
    ///
    /// A failed pipeline run leaves the compiled-circuit map as it was, including pairs
    /// the run registered for other circuits, so the same circuit can be compiled again
    /// once the cause is fixed.
    pub fn compile(&mut self, symbolic: &SymbolicCircuit) -> CompileResult<B::CompiledCircuit> {
        if let Ok(compiled) = self.compiled.get_compiled_circuit(symbolic) {
            tracing::debug!(circuit = %symbolic.id(), backend = B::NAME, "compiled circuit cache hit");
            return Ok(compiled.clone());
        }

        let span = tracing::info_span!("compile_pipeline", circuit = %symbolic.id(), backend = B::NAME);
        let _guard = span.enter();
        let started = Instant::now();

        let checkpoint = self.compiled.checkpoint();
        let result = B::compile_pipeline(self, symbolic)
            .and_then(|compiled| self.finish_registration(symbolic, compiled));
        let compiled = match result {
            Ok(compiled) => compiled,
            Err(err) => {
                let dropped = self.compiled.rollback(checkpoint);
                if dropped > 0 {
                    tracing::debug!(dropped, "rolled back registrations of failed pipeline run");
                }
                tracing::debug!(error = %err, "compilation pipeline failed");
                return Err(err);
            }
        };

        tracing::debug!(
            elapsed_us = started.elapsed().as_micros() as u64,
            compiled_circuits = self.compiled.len(),
            "compiled circuit"
        );
        Ok(compiled)
    }

    // The pipeline may register its result itself; anything else it left in the map for
    // this circuit is a double registration. The caller rolls back on error.
    fn finish_registration(
        &mut self,
        symbolic: &SymbolicCircuit,
        compiled: B::CompiledCircuit,
    ) -> CompileResult<B::CompiledCircuit> {
        match self.compiled.get_compiled_circuit(symbolic) {
            Ok(existing) if *existing == compiled => Ok(compiled),
            Ok(existing) => Err(CompileError::AlreadyRegistered {
                side: CircuitSide::Symbolic,
                detail: format!(
                    "pipeline registered {existing:?} for {} but returned {compiled:?}",
                    symbolic.id()
                ),
            }),
            Err(_) => {
                self.compiled
                    .register_compiled_circuit(symbolic.clone(), compiled.clone())?;
                Ok(compiled)
            }
        }
    }
}

fn check_slot(slot: NodeCategory, found: NodeCategory) -> CompileResult<()> {
    if slot == found {
        Ok(())
    } else {
        Err(CompileError::RegistrySlot { slot, found })
    }
}

impl<B: Backend + std::fmt::Debug> std::fmt::Debug for Compiler<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("backend", &self.backend)
            .field("layers", &self.layers)
            .field("parameters", &self.parameters)
            .field("initializers", &self.initializers)
            .field("flags", &self.flags)
            .field("compiled", &self.compiled)
            .finish()
    }
}
