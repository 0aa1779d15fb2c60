//! Standard symbolic node vocabulary.
//!
//! These types only describe structure (scopes, unit counts, shapes, hyperparameters).
//! What they compute is decided by the backend rules registered for them.

use super::{NodeCategory, NodeKind};

macro_rules! node_kind {
    ($category:ident: $($ty:ty),+ $(,)?) => {
        $(
            impl NodeKind for $ty {
                const CATEGORY: NodeCategory = NodeCategory::$category;
            }
        )+
    };
}

/// Input layer over categorical variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoricalLayer {
    pub scope: Vec<usize>,
    pub num_output_units: usize,
    pub num_categories: usize,
}

/// Input layer over continuous variables with a normal density.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaussianLayer {
    pub scope: Vec<usize>,
    pub num_output_units: usize,
}

/// Weighted sum over the units of its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SumLayer {
    pub num_input_units: usize,
    pub num_output_units: usize,
    pub arity: usize,
}

impl SumLayer {
    pub fn new(num_input_units: usize, num_output_units: usize, arity: usize) -> Self {
        Self {
            num_input_units,
            num_output_units,
            arity,
        }
    }
}

/// Element-wise product of its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HadamardLayer {
    pub num_input_units: usize,
    pub arity: usize,
}

impl HadamardLayer {
    pub fn new(num_input_units: usize, arity: usize) -> Self {
        Self {
            num_input_units,
            arity,
        }
    }
}

/// Outer product of its inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KroneckerLayer {
    pub num_input_units: usize,
    pub arity: usize,
}

impl KroneckerLayer {
    pub fn new(num_input_units: usize, arity: usize) -> Self {
        Self {
            num_input_units,
            arity,
        }
    }

    /// `num_input_units ^ arity`, or `None` when that does not fit in a `usize`.
    pub fn num_output_units(&self) -> Option<usize> {
        let arity = u32::try_from(self.arity).ok()?;
        self.num_input_units.checked_pow(arity)
    }
}

node_kind!(Layer: CategoricalLayer, GaussianLayer, SumLayer, HadamardLayer, KroneckerLayer);

/// Leaf tensor, materialized by its initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorParameter {
    pub shape: Vec<usize>,
    pub learnable: bool,
}

impl TensorParameter {
    pub fn new(shape: Vec<usize>) -> Self {
        Self {
            shape,
            learnable: true,
        }
    }

    pub fn frozen(shape: Vec<usize>) -> Self {
        Self {
            shape,
            learnable: false,
        }
    }
}

/// Leaf tensor filled with a fixed value.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantParameter {
    pub shape: Vec<usize>,
    pub value: f64,
}

/// Normalizes its input along `axis`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftmaxParameter {
    pub shape: Vec<usize>,
    pub axis: usize,
}

impl SoftmaxParameter {
    pub fn new(shape: Vec<usize>, axis: usize) -> Self {
        Self { shape, axis }
    }
}

/// Element-wise exponential of its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpParameter {
    pub shape: Vec<usize>,
}

node_kind!(Parameter: TensorParameter, ConstantParameter, SoftmaxParameter, ExpParameter);

#[derive(Debug, Clone, PartialEq)]
pub struct ConstantInitializer {
    pub value: f64,
}

impl ConstantInitializer {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalInitializer {
    pub mean: f64,
    pub stddev: f64,
}

impl Default for NormalInitializer {
    fn default() -> Self {
        Self {
            mean: 0.0,
            stddev: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniformInitializer {
    pub a: f64,
    pub b: f64,
}

impl Default for UniformInitializer {
    fn default() -> Self {
        Self { a: 0.0, b: 1.0 }
    }
}

node_kind!(Initializer: ConstantInitializer, NormalInitializer, UniformInitializer);
