use cirkit_rs::symbolic::nodes::{
    CategoricalLayer, ExpParameter, GaussianLayer, HadamardLayer, KroneckerLayer,
    NormalInitializer, SoftmaxParameter, SumLayer, TensorParameter, UniformInitializer,
};
use cirkit_rs::symbolic::{
    NodeCategory, NodeKind, ParameterGraph, ParameterGraphBuilder, Signature, SymbolicCircuit,
};

/// Layer type no backend registers a rule for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnregisteredLayer;

impl NodeKind for UnregisteredLayer {
    const CATEGORY: NodeCategory = NodeCategory::Layer;
}

/// Specialization of [`SumLayer`] that backends do not know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixingLayer {
    pub num_units: usize,
    pub arity: usize,
}

impl NodeKind for MixingLayer {
    const CATEGORY: NodeCategory = NodeCategory::Layer;

    fn supertype() -> Option<Signature> {
        Some(Signature::of::<SumLayer>())
    }
}

/// `softmax(tensor)` with normally initialized logits, the usual sum layer weight.
pub fn softmax_weight(num_output_units: usize, num_input_units: usize) -> ParameterGraph {
    let shape = vec![num_output_units, num_input_units];
    let mut builder = ParameterGraphBuilder::new();
    let logits = builder
        .add_leaf(
            TensorParameter::new(shape.clone()),
            Some(std::sync::Arc::new(NormalInitializer::default())),
        )
        .unwrap();
    let weight = builder
        .add_op(SoftmaxParameter::new(shape, 1), &[logits])
        .unwrap();
    builder.finish(weight).unwrap()
}

/// Mixture of two factorizations over two categorical variables:
/// `sum(hadamard(cat0, cat1), sum(kronecker(cat0, cat1)))`.
pub fn mixture_of_products() -> SymbolicCircuit {
    let mut builder = SymbolicCircuit::builder().name("mixture-of-products");
    let x0 = builder
        .add_layer(
            CategoricalLayer {
                scope: vec![0],
                num_output_units: 2,
                num_categories: 3,
            },
            &[],
        )
        .unwrap();
    let x1 = builder
        .add_layer(
            CategoricalLayer {
                scope: vec![1],
                num_output_units: 2,
                num_categories: 3,
            },
            &[],
        )
        .unwrap();
    let hadamard = builder.add_layer(HadamardLayer::new(2, 2), &[x0, x1]).unwrap();
    let kronecker = builder
        .add_layer(KroneckerLayer::new(2, 2), &[x0, x1])
        .unwrap();
    let folded = builder
        .add_layer_with_parameters(
            SumLayer::new(4, 2, 1),
            &[kronecker],
            [("weight".to_string(), softmax_weight(2, 4))],
        )
        .unwrap();
    let mix = builder
        .add_layer_with_parameters(
            SumLayer::new(2, 1, 2),
            &[hadamard, folded],
            [("weight".to_string(), softmax_weight(1, 4))],
        )
        .unwrap();
    builder.finish(&[mix]).unwrap()
}

/// Single Gaussian leaf scaled by a positive weight: `sum(gaussian)` with `exp(uniform)`.
pub fn gaussian_leaf() -> SymbolicCircuit {
    let mut params = ParameterGraphBuilder::new();
    let raw = params
        .add_leaf(
            TensorParameter::new(vec![1, 3]),
            Some(std::sync::Arc::new(UniformInitializer { a: -1.0, b: 1.0 })),
        )
        .unwrap();
    let weight = params
        .add_op(ExpParameter { shape: vec![1, 3] }, &[raw])
        .unwrap();
    let weight = params.finish(weight).unwrap();

    let mut builder = SymbolicCircuit::builder();
    let leaf = builder
        .add_layer(
            GaussianLayer {
                scope: vec![0],
                num_output_units: 3,
            },
            &[],
        )
        .unwrap();
    let sum = builder
        .add_layer_with_parameters(
            SumLayer::new(3, 1, 1),
            &[leaf],
            [("weight".to_string(), weight)],
        )
        .unwrap();
    builder.finish(&[sum]).unwrap()
}

/// A circuit whose output layer has no rule anywhere.
pub fn with_unregistered_layer() -> SymbolicCircuit {
    let mut builder = SymbolicCircuit::builder();
    let leaf = builder
        .add_layer(
            CategoricalLayer {
                scope: vec![0],
                num_output_units: 1,
                num_categories: 2,
            },
            &[],
        )
        .unwrap();
    let out = builder.add_layer(UnregisteredLayer, &[leaf]).unwrap();
    builder.finish(&[out]).unwrap()
}

/// A circuit using [`MixingLayer`], whose supertype has a rule in every backend.
pub fn with_mixing_layer() -> SymbolicCircuit {
    let mut builder = SymbolicCircuit::builder();
    let leaf = builder
        .add_layer(
            CategoricalLayer {
                scope: vec![0],
                num_output_units: 2,
                num_categories: 2,
            },
            &[],
        )
        .unwrap();
    let out = builder
        .add_layer(
            MixingLayer {
                num_units: 2,
                arity: 1,
            },
            &[leaf],
        )
        .unwrap();
    builder.finish(&[out]).unwrap()
}
