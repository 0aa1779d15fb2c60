use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use super::error::{CircuitSide, CompileError, CompileResult};
use crate::symbolic::SymbolicCircuit;

/// Bijection between symbolic circuits and the values they were compiled to.
///
/// Both directions are kept in plain hash maps. `register_compiled_circuit` checks both
/// before touching either, so a rejected insertion leaves the map unchanged.
///
/// Registrations are journaled in insertion order so that everything added after a
/// [`checkpoint`](Self::checkpoint) can be undone at once.
pub struct CompiledCircuitsMap<C> {
    forward: HashMap<SymbolicCircuit, C>,
    backward: HashMap<C, SymbolicCircuit>,
    journal: Vec<SymbolicCircuit>,
}

impl<C> CompiledCircuitsMap<C>
where
    C: Clone + Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            backward: HashMap::new(),
            journal: Vec::new(),
        }
    }

    pub fn is_compiled(&self, symbolic: &SymbolicCircuit) -> bool {
        self.forward.contains_key(symbolic)
    }

    pub fn has_symbolic(&self, compiled: &C) -> bool {
        self.backward.contains_key(compiled)
    }

    pub fn get_compiled_circuit(&self, symbolic: &SymbolicCircuit) -> CompileResult<&C> {
        self.forward
            .get(symbolic)
            .ok_or_else(|| CompileError::NotFound {
                side: CircuitSide::Symbolic,
                detail: format!("{} was never compiled", symbolic.id()),
            })
    }

    pub fn get_symbolic_circuit(&self, compiled: &C) -> CompileResult<&SymbolicCircuit> {
        self.backward
            .get(compiled)
            .ok_or_else(|| CompileError::NotFound {
                side: CircuitSide::Compiled,
                detail: format!("{compiled:?} has no symbolic counterpart"),
            })
    }

    pub fn register_compiled_circuit(
        &mut self,
        symbolic: SymbolicCircuit,
        compiled: C,
    ) -> CompileResult<()> {
        if let Some(existing) = self.forward.get(&symbolic) {
            return Err(CompileError::AlreadyRegistered {
                side: CircuitSide::Symbolic,
                detail: format!("{} already maps to {existing:?}", symbolic.id()),
            });
        }
        if let Some(existing) = self.backward.get(&compiled) {
            return Err(CompileError::AlreadyRegistered {
                side: CircuitSide::Compiled,
                detail: format!("{compiled:?} already maps to {}", existing.id()),
            });
        }
        self.forward.insert(symbolic.clone(), compiled.clone());
        self.backward.insert(compiled, symbolic.clone());
        self.journal.push(symbolic);
        Ok(())
    }

    /// Position in the registration journal; pass it to [`rollback`](Self::rollback).
    pub(crate) fn checkpoint(&self) -> usize {
        self.journal.len()
    }

    /// Drops every pair registered after `checkpoint`, newest first. Returns how many
    /// pairs were removed.
    pub(crate) fn rollback(&mut self, checkpoint: usize) -> usize {
        let mut removed = 0;
        while self.journal.len() > checkpoint {
            let Some(symbolic) = self.journal.pop() else {
                break;
            };
            if let Some(compiled) = self.forward.remove(&symbolic) {
                self.backward.remove(&compiled);
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SymbolicCircuit, &C)> {
        self.forward.iter()
    }
}

impl<C> Default for CompiledCircuitsMap<C>
where
    C: Clone + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C: fmt::Debug> fmt::Debug for CompiledCircuitsMap<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.forward.iter().map(|(sc, cc)| (sc.id(), cc)))
            .finish()
    }
}
