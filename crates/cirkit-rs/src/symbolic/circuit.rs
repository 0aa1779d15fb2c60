use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::topology::reachable_post_order;
use super::{NodeCategory, NodeKind, Signature, SymbolicNode};

static NEXT_CIRCUIT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a built symbolic circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CircuitId(pub u64);

impl CircuitId {
    fn fresh() -> Self {
        CircuitId(NEXT_CIRCUIT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit#{}", self.0)
    }
}

/// Index of a layer within its circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub usize);

/// Index of a node within its parameter graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub usize);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CircuitBuildError {
    #[error("{slot} slot expects a {expected} node, got {found} `{name}`")]
    CategoryMismatch {
        slot: &'static str,
        expected: NodeCategory,
        found: NodeCategory,
        name: &'static str,
    },
    #[error("{slot} {index} does not exist (graph has {len} entries)")]
    UnknownReference {
        slot: &'static str,
        index: usize,
        len: usize,
    },
    #[error("{0} has no outputs")]
    NoOutputs(&'static str),
}

type BuildResult<T> = Result<T, CircuitBuildError>;

fn check_category(
    slot: &'static str,
    expected: NodeCategory,
    signature: Signature,
) -> BuildResult<()> {
    if signature.category() == expected {
        Ok(())
    } else {
        Err(CircuitBuildError::CategoryMismatch {
            slot,
            expected,
            found: signature.category(),
            name: signature.name(),
        })
    }
}

fn check_reference(slot: &'static str, index: usize, len: usize) -> BuildResult<()> {
    if index < len {
        Ok(())
    } else {
        Err(CircuitBuildError::UnknownReference { slot, index, len })
    }
}

/// A parameter node together with its inputs and optional initializer.
#[derive(Debug, Clone)]
pub struct ParameterEntry {
    node: Arc<dyn SymbolicNode>,
    inputs: Vec<ParamId>,
    initializer: Option<Arc<dyn SymbolicNode>>,
}

impl ParameterEntry {
    pub fn node(&self) -> &dyn SymbolicNode {
        self.node.as_ref()
    }

    pub fn inputs(&self) -> &[ParamId] {
        &self.inputs
    }

    pub fn initializer(&self) -> Option<&dyn SymbolicNode> {
        self.initializer.as_deref()
    }
}

/// Computational graph producing one parameter tensor of a layer.
#[derive(Debug, Clone)]
pub struct ParameterGraph {
    nodes: Vec<ParameterEntry>,
    output: ParamId,
}

impl ParameterGraph {
    /// Single tensor leaf initialized by `initializer`.
    pub fn tensor<P, I>(parameter: P, initializer: I) -> BuildResult<Self>
    where
        P: NodeKind,
        I: NodeKind,
    {
        let mut builder = ParameterGraphBuilder::new();
        let leaf = builder.add_leaf(parameter, Some(Arc::new(initializer)))?;
        builder.finish(leaf)
    }

    pub fn nodes(&self) -> &[ParameterEntry] {
        &self.nodes
    }

    pub fn node(&self, id: ParamId) -> &ParameterEntry {
        &self.nodes[id.0]
    }

    pub fn output(&self) -> ParamId {
        self.output
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes the output depends on, inputs first.
    pub fn topological_order(&self) -> Vec<ParamId> {
        reachable_post_order(self.nodes.len(), &[self.output.0], |idx| {
            self.nodes[idx].inputs.iter().map(|id| id.0).collect()
        })
        .into_iter()
        .map(ParamId)
        .collect()
    }
}

#[derive(Debug, Default)]
pub struct ParameterGraphBuilder {
    nodes: Vec<ParameterEntry>,
}

impl ParameterGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_leaf<P: NodeKind>(
        &mut self,
        parameter: P,
        initializer: Option<Arc<dyn SymbolicNode>>,
    ) -> BuildResult<ParamId> {
        self.push(Arc::new(parameter), Vec::new(), initializer)
    }

    pub fn add_op<P: NodeKind>(&mut self, parameter: P, inputs: &[ParamId]) -> BuildResult<ParamId> {
        self.push(Arc::new(parameter), inputs.to_vec(), None)
    }

    /// Appends an already type-erased node.
    pub fn push(
        &mut self,
        node: Arc<dyn SymbolicNode>,
        inputs: Vec<ParamId>,
        initializer: Option<Arc<dyn SymbolicNode>>,
    ) -> BuildResult<ParamId> {
        check_category("parameter", NodeCategory::Parameter, node.signature())?;
        if let Some(init) = initializer.as_ref() {
            check_category("initializer", NodeCategory::Initializer, init.signature())?;
        }
        for input in &inputs {
            check_reference("parameter", input.0, self.nodes.len())?;
        }
        let id = ParamId(self.nodes.len());
        self.nodes.push(ParameterEntry {
            node,
            inputs,
            initializer,
        });
        Ok(id)
    }

    pub fn finish(self, output: ParamId) -> BuildResult<ParameterGraph> {
        if self.nodes.is_empty() {
            return Err(CircuitBuildError::NoOutputs("parameter graph"));
        }
        check_reference("parameter", output.0, self.nodes.len())?;
        Ok(ParameterGraph {
            nodes: self.nodes,
            output,
        })
    }
}

/// A layer together with its inputs and named parameter graphs.
#[derive(Debug, Clone)]
pub struct LayerEntry {
    node: Arc<dyn SymbolicNode>,
    inputs: Vec<LayerId>,
    parameters: Vec<(String, ParameterGraph)>,
}

impl LayerEntry {
    pub fn node(&self) -> &dyn SymbolicNode {
        self.node.as_ref()
    }

    pub fn inputs(&self) -> &[LayerId] {
        &self.inputs
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&str, &ParameterGraph)> {
        self.parameters
            .iter()
            .map(|(name, graph)| (name.as_str(), graph))
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterGraph> {
        self.parameters
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, graph)| graph)
    }
}

#[derive(Debug)]
struct CircuitData {
    id: CircuitId,
    name: Option<String>,
    layers: Vec<LayerEntry>,
    outputs: Vec<LayerId>,
}

/// Immutable symbolic circuit handle.
///
/// Clones share the same underlying graph. Equality and hashing use the circuit's
/// identity, so two separately built circuits with identical structure are distinct keys.
#[derive(Clone)]
pub struct SymbolicCircuit {
    inner: Arc<CircuitData>,
}

impl SymbolicCircuit {
    pub fn builder() -> CircuitBuilder {
        CircuitBuilder::new()
    }

    pub fn id(&self) -> CircuitId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    pub fn layers(&self) -> &[LayerEntry] {
        &self.inner.layers
    }

    pub fn layer(&self, id: LayerId) -> &LayerEntry {
        &self.inner.layers[id.0]
    }

    pub fn outputs(&self) -> &[LayerId] {
        &self.inner.outputs
    }

    pub fn num_layers(&self) -> usize {
        self.inner.layers.len()
    }

    /// Layers reachable from the outputs, each after all of its inputs.
    pub fn topological_order(&self) -> Vec<LayerId> {
        let roots: Vec<usize> = self.inner.outputs.iter().map(|id| id.0).collect();
        reachable_post_order(self.inner.layers.len(), &roots, |idx| {
            self.inner.layers[idx].inputs.iter().map(|id| id.0).collect()
        })
        .into_iter()
        .map(LayerId)
        .collect()
    }
}

impl PartialEq for SymbolicCircuit {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SymbolicCircuit {}

impl Hash for SymbolicCircuit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for SymbolicCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolicCircuit")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("layers", &self.inner.layers.len())
            .field("outputs", &self.inner.outputs)
            .finish()
    }
}

/// Append-only builder: a layer may only reference layers added before it, so every
/// built circuit is acyclic.
#[derive(Debug, Default)]
pub struct CircuitBuilder {
    name: Option<String>,
    layers: Vec<LayerEntry>,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn add_layer<L: NodeKind>(&mut self, layer: L, inputs: &[LayerId]) -> BuildResult<LayerId> {
        self.push(Arc::new(layer), inputs.to_vec(), Vec::new())
    }

    pub fn add_layer_with_parameters<L, I>(
        &mut self,
        layer: L,
        inputs: &[LayerId],
        parameters: I,
    ) -> BuildResult<LayerId>
    where
        L: NodeKind,
        I: IntoIterator<Item = (String, ParameterGraph)>,
    {
        self.push(
            Arc::new(layer),
            inputs.to_vec(),
            parameters.into_iter().collect(),
        )
    }

    /// Appends an already type-erased layer.
    pub fn push(
        &mut self,
        node: Arc<dyn SymbolicNode>,
        inputs: Vec<LayerId>,
        parameters: Vec<(String, ParameterGraph)>,
    ) -> BuildResult<LayerId> {
        check_category("layer", NodeCategory::Layer, node.signature())?;
        for input in &inputs {
            check_reference("layer", input.0, self.layers.len())?;
        }
        let id = LayerId(self.layers.len());
        self.layers.push(LayerEntry {
            node,
            inputs,
            parameters,
        });
        Ok(id)
    }

    pub fn finish(self, outputs: &[LayerId]) -> BuildResult<SymbolicCircuit> {
        if outputs.is_empty() {
            return Err(CircuitBuildError::NoOutputs("circuit"));
        }
        for output in outputs {
            check_reference("layer", output.0, self.layers.len())?;
        }
        Ok(SymbolicCircuit {
            inner: Arc::new(CircuitData {
                id: CircuitId::fresh(),
                name: self.name,
                layers: self.layers,
                outputs: outputs.to_vec(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::nodes::{
        CategoricalLayer, ConstantInitializer, HadamardLayer, SoftmaxParameter, SumLayer,
        TensorParameter,
    };

    fn categorical(var: usize) -> CategoricalLayer {
        CategoricalLayer {
            scope: vec![var],
            num_output_units: 2,
            num_categories: 3,
        }
    }

    #[test]
    fn builder_rejects_wrong_category() {
        let mut builder = CircuitBuilder::new();
        let err = builder
            .add_layer(TensorParameter::new(vec![2]), &[])
            .unwrap_err();
        assert!(matches!(
            err,
            CircuitBuildError::CategoryMismatch {
                expected: NodeCategory::Layer,
                found: NodeCategory::Parameter,
                ..
            }
        ));
    }

    #[test]
    fn builder_rejects_forward_references() {
        let mut builder = CircuitBuilder::new();
        let err = builder
            .add_layer(HadamardLayer::new(2, 2), &[LayerId(0), LayerId(1)])
            .unwrap_err();
        assert_eq!(
            err,
            CircuitBuildError::UnknownReference {
                slot: "layer",
                index: 0,
                len: 0
            }
        );
    }

    #[test]
    fn identity_is_per_build() {
        let build = || {
            let mut builder = CircuitBuilder::new();
            let leaf = builder.add_layer(categorical(0), &[]).unwrap();
            builder.finish(&[leaf]).unwrap()
        };
        let a = build();
        let b = build();
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn topological_order_skips_dangling_layers() {
        let mut builder = CircuitBuilder::new();
        let x0 = builder.add_layer(categorical(0), &[]).unwrap();
        let _unused = builder.add_layer(categorical(1), &[]).unwrap();
        let x2 = builder.add_layer(categorical(2), &[]).unwrap();
        let prod = builder.add_layer(HadamardLayer::new(2, 2), &[x0, x2]).unwrap();
        let weight =
            ParameterGraph::tensor(TensorParameter::new(vec![1, 2]), ConstantInitializer::new(1.0))
                .unwrap();
        let sum = builder
            .add_layer_with_parameters(
                SumLayer::new(2, 1, 1),
                &[prod],
                [("weight".to_string(), weight)],
            )
            .unwrap();
        let circuit = builder.finish(&[sum]).unwrap();

        assert_eq!(circuit.topological_order(), vec![x0, x2, prod, sum]);
        assert!(circuit.layer(sum).parameter("weight").is_some());
    }

    #[test]
    fn parameter_graph_orders_inputs_first() {
        let mut builder = ParameterGraphBuilder::new();
        let leaf = builder
            .add_leaf(
                TensorParameter::new(vec![2, 3]),
                Some(Arc::new(ConstantInitializer::new(0.0))),
            )
            .unwrap();
        let softmax = builder
            .add_op(SoftmaxParameter::new(vec![2, 3], 1), &[leaf])
            .unwrap();
        let graph = builder.finish(softmax).unwrap();
        assert_eq!(graph.topological_order(), vec![leaf, softmax]);
        assert!(graph.node(leaf).initializer().is_some());
    }

    #[test]
    fn parameter_builder_rejects_misplaced_initializer() {
        let mut builder = ParameterGraphBuilder::new();
        let err = builder
            .add_leaf(
                TensorParameter::new(vec![2]),
                Some(Arc::new(TensorParameter::new(vec![2]))),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            CircuitBuildError::CategoryMismatch {
                slot: "initializer",
                ..
            }
        ));
    }
}
