//! Symbolic circuit model consumed by the compiler.
//!
//! A symbolic circuit is an immutable graph of typed nodes. Every node plays one of three
//! roles ([`NodeCategory`]): a layer of the circuit, a node of a parameter graph, or an
//! initializer attached to a tensor parameter. The compiler never inspects node contents;
//! it only needs each node's category and exact runtime type, which together form its
//! [`Signature`].

mod circuit;
pub mod nodes;
mod topology;

use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

pub use circuit::{
    CircuitBuildError, CircuitBuilder, CircuitId, LayerEntry, LayerId, ParamId, ParameterEntry,
    ParameterGraph, ParameterGraphBuilder, SymbolicCircuit,
};

/// Role a symbolic node plays inside a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeCategory {
    Layer,
    Parameter,
    Initializer,
}

impl NodeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCategory::Layer => "layer",
            NodeCategory::Parameter => "parameter",
            NodeCategory::Initializer => "initializer",
        }
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a concrete node type.
///
/// Implementing this trait is what makes a type usable as a symbolic node. `CATEGORY`
/// pins the type to one node role; `supertype` optionally records the type it
/// specializes. The supertype is informational: rule dispatch is always exact-type.
pub trait NodeKind: Any + Send + Sync + fmt::Debug {
    const CATEGORY: NodeCategory;

    fn supertype() -> Option<Signature> {
        None
    }
}

/// Object-safe view of a symbolic node, blanket-implemented for every [`NodeKind`].
pub trait SymbolicNode: Any + Send + Sync + fmt::Debug {
    fn signature(&self) -> Signature;

    fn as_any(&self) -> &dyn Any;
}

impl<T: NodeKind> SymbolicNode for T {
    fn signature(&self) -> Signature {
        Signature::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn SymbolicNode {
    pub fn category(&self) -> NodeCategory {
        self.signature().category()
    }

    pub fn downcast_ref<T: NodeKind>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Dispatch key of a node: its exact runtime type.
///
/// Equality and hashing only consider the `TypeId`; name, category and supertype are
/// derived from the type and carried along for validation and diagnostics.
#[derive(Clone, Copy)]
pub struct Signature {
    id: TypeId,
    name: &'static str,
    category: NodeCategory,
    supertype: fn() -> Option<Signature>,
}

impl Signature {
    pub fn of<T: NodeKind>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            category: T::CATEGORY,
            supertype: T::supertype,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path.
    pub fn short_name(&self) -> &'static str {
        let end = self.name.find('<').unwrap_or(self.name.len());
        match self.name[..end].rfind("::") {
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
    }

    pub fn category(&self) -> NodeCategory {
        self.category
    }

    pub fn supertype(&self) -> Option<Signature> {
        (self.supertype)()
    }

    /// Declared supertypes, nearest first.
    pub fn ancestors(&self) -> Ancestors {
        Ancestors {
            next: self.supertype(),
            remaining: MAX_SUPERTYPE_DEPTH,
        }
    }
}

// Bounds the walk in case two node types name each other as supertype.
const MAX_SUPERTYPE_DEPTH: usize = 64;

pub struct Ancestors {
    next: Option<Signature>,
    remaining: usize,
}

impl Iterator for Ancestors {
    type Item = Signature;

    fn next(&mut self) -> Option<Signature> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next.take()?;
        self.next = current.supertype();
        Some(current)
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Base;

    #[derive(Debug)]
    struct Derived;

    impl NodeKind for Base {
        const CATEGORY: NodeCategory = NodeCategory::Layer;
    }

    impl NodeKind for Derived {
        const CATEGORY: NodeCategory = NodeCategory::Layer;

        fn supertype() -> Option<Signature> {
            Some(Signature::of::<Base>())
        }
    }

    #[test]
    fn signatures_compare_by_exact_type() {
        assert_eq!(Signature::of::<Base>(), Signature::of::<Base>());
        assert_ne!(Signature::of::<Base>(), Signature::of::<Derived>());
        assert_eq!(Signature::of::<Derived>().short_name(), "Derived");
    }

    #[test]
    fn ancestors_walk_declared_supertypes() {
        let chain: Vec<_> = Signature::of::<Derived>().ancestors().collect();
        assert_eq!(chain, vec![Signature::of::<Base>()]);
        assert_eq!(Signature::of::<Base>().ancestors().count(), 0);
    }

    #[test]
    fn erased_node_reports_runtime_signature() {
        let node: Box<dyn SymbolicNode> = Box::new(Derived);
        assert_eq!(node.signature(), Signature::of::<Derived>());
        assert_eq!(node.category(), NodeCategory::Layer);
        assert!(node.downcast_ref::<Derived>().is_some());
        assert!(node.downcast_ref::<Base>().is_none());
    }
}
