//! Compiled artifacts produced by the reference backend.
//!
//! A [`RefProgram`] lists layers in evaluation order; every layer refers to its inputs by
//! index into the same list, and every parameter graph does the same for its nodes.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::Arc;

use cirkit_rs::backend::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Semiring {
    SumProduct,
    #[default]
    LseSum,
    ComplexLseSum,
}

impl Semiring {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semiring::SumProduct => "sum-product",
            Semiring::LseSum => "lse-sum",
            Semiring::ComplexLseSum => "complex-lse-sum",
        }
    }
}

impl FromStr for Semiring {
    type Err = CompileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sum-product" => Ok(Semiring::SumProduct),
            "lse-sum" => Ok(Semiring::LseSum),
            "complex-lse-sum" => Ok(Semiring::ComplexLseSum),
            other => Err(CompileError::invalid_flag(
                "semiring",
                format!(
                    "unknown semiring `{other}` (expected sum-product, lse-sum or complex-lse-sum)"
                ),
            )),
        }
    }
}

impl fmt::Display for Semiring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefInitializer {
    Constant { value: f64 },
    Normal { mean: f64, stddev: f64 },
    Uniform { a: f64, b: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefParameterOp {
    Tensor { shape: Vec<usize>, learnable: bool },
    Constant { shape: Vec<usize>, value: f64 },
    Softmax { axis: usize },
    Exp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefParameterNode {
    pub op: RefParameterOp,
    pub inputs: Vec<usize>,
    pub initializer: Option<RefInitializer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefParameter {
    pub nodes: Vec<RefParameterNode>,
    pub output: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefLayerOp {
    Categorical {
        scope: Vec<usize>,
        num_output_units: usize,
        num_categories: usize,
    },
    Gaussian {
        scope: Vec<usize>,
        num_output_units: usize,
    },
    Sum {
        num_input_units: usize,
        num_output_units: usize,
        arity: usize,
    },
    Hadamard {
        num_units: usize,
        arity: usize,
    },
    Kronecker {
        num_input_units: usize,
        num_output_units: usize,
        arity: usize,
    },
}

impl RefLayerOp {
    pub fn name(&self) -> &'static str {
        match self {
            RefLayerOp::Categorical { .. } => "categorical",
            RefLayerOp::Gaussian { .. } => "gaussian",
            RefLayerOp::Sum { .. } => "sum",
            RefLayerOp::Hadamard { .. } => "hadamard",
            RefLayerOp::Kronecker { .. } => "kronecker",
        }
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self,
            RefLayerOp::Categorical { .. } | RefLayerOp::Gaussian { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefLayer {
    pub op: RefLayerOp,
    pub inputs: Vec<usize>,
    pub parameters: BTreeMap<String, RefParameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefProgram {
    pub name: Option<String>,
    pub semiring: Semiring,
    pub layers: Vec<RefLayer>,
    pub outputs: Vec<usize>,
}

impl RefProgram {
    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.op.name()).collect()
    }
}

/// Handle to a compiled program. Equality and hashing use the handle's identity.
#[derive(Clone)]
pub struct RefCircuit {
    id: u64,
    program: Arc<RefProgram>,
}

impl RefCircuit {
    pub(crate) fn new(id: u64, program: RefProgram) -> Self {
        Self {
            id,
            program: Arc::new(program),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn program(&self) -> &RefProgram {
        &self.program
    }

    /// True when both handles share the same compiled program.
    pub fn same_program(&self, other: &RefCircuit) -> bool {
        Arc::ptr_eq(&self.program, &other.program)
    }
}

impl PartialEq for RefCircuit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RefCircuit {}

impl Hash for RefCircuit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for RefCircuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefCircuit")
            .field("id", &self.id)
            .field("name", &self.program.name)
            .field("layers", &self.program.layers.len())
            .finish()
    }
}
