use std::collections::{BTreeMap, HashMap};

use cirkit_rs::backend::{CompileError, CompileResult, Compiler, CompilerFlags};
use cirkit_rs::symbolic::{LayerId, ParamId, ParameterGraph, SymbolicCircuit};

use crate::ir::{RefCircuit, RefLayer, RefParameter, RefParameterNode, RefProgram, Semiring};
use crate::RefBackend;

pub const SEMIRING_FLAG: &str = "semiring";
pub const PRUNE_UNREACHABLE_FLAG: &str = "prune_unreachable";

/// Flags understood by the reference pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub semiring: Semiring,
    pub prune_unreachable: bool,
}

impl PipelineOptions {
    pub fn from_flags(flags: &CompilerFlags) -> CompileResult<Self> {
        Ok(Self {
            semiring: flags
                .str_or(SEMIRING_FLAG, Semiring::default().as_str())?
                .parse()?,
            prune_unreachable: flags.bool_or(PRUNE_UNREACHABLE_FLAG, true)?,
        })
    }
}

pub(crate) fn compile_circuit(
    compiler: &mut Compiler<RefBackend>,
    circuit: &SymbolicCircuit,
) -> CompileResult<RefCircuit> {
    compiler.backend_mut().stats.pipeline_runs += 1;
    let options = PipelineOptions::from_flags(compiler.flags())?;
    let order: Vec<LayerId> = if options.prune_unreachable {
        circuit.topological_order()
    } else {
        (0..circuit.num_layers()).map(LayerId).collect()
    };
    tracing::debug!(
        layers = order.len(),
        skipped = circuit.num_layers() - order.len(),
        semiring = %options.semiring,
        "compiling circuit layers"
    );

    let mut slots: HashMap<LayerId, usize> = HashMap::with_capacity(order.len());
    let mut layers = Vec::with_capacity(order.len());
    for id in order {
        let entry = circuit.layer(id);
        let inputs = entry
            .inputs()
            .iter()
            .map(|input| resolve(&slots, *input, "layer"))
            .collect::<CompileResult<Vec<_>>>()?;

        let mut parameters = BTreeMap::new();
        for (name, graph) in entry.parameters() {
            parameters.insert(name.to_string(), compile_parameter_graph(compiler, graph)?);
        }

        let op = compiler.compile_layer(entry.node())?;
        compiler.backend_mut().stats.layer_rules += 1;

        slots.insert(id, layers.len());
        layers.push(RefLayer {
            op,
            inputs,
            parameters,
        });
    }

    let outputs = circuit
        .outputs()
        .iter()
        .map(|output| resolve(&slots, *output, "output"))
        .collect::<CompileResult<Vec<_>>>()?;

    let program = RefProgram {
        name: circuit.name().map(str::to_string),
        semiring: options.semiring,
        layers,
        outputs,
    };
    let id = compiler.backend_mut().next_circuit_id();
    Ok(RefCircuit::new(id, program))
}

fn compile_parameter_graph(
    compiler: &mut Compiler<RefBackend>,
    graph: &ParameterGraph,
) -> CompileResult<RefParameter> {
    let mut slots: HashMap<ParamId, usize> = HashMap::with_capacity(graph.len());
    let mut nodes = Vec::with_capacity(graph.len());
    for id in graph.topological_order() {
        let entry = graph.node(id);
        let inputs = entry
            .inputs()
            .iter()
            .map(|input| resolve(&slots, *input, "parameter"))
            .collect::<CompileResult<Vec<_>>>()?;

        let initializer = match entry.initializer() {
            Some(init) => {
                let compiled = compiler.compile_initializer(init)?;
                compiler.backend_mut().stats.initializer_rules += 1;
                Some(compiled)
            }
            None => None,
        };

        let op = compiler.compile_parameter(entry.node())?;
        compiler.backend_mut().stats.parameter_rules += 1;

        slots.insert(id, nodes.len());
        nodes.push(RefParameterNode {
            op,
            inputs,
            initializer,
        });
    }

    Ok(RefParameter {
        output: resolve(&slots, graph.output(), "parameter output")?,
        nodes,
    })
}

fn resolve<K>(slots: &HashMap<K, usize>, key: K, what: &str) -> CompileResult<usize>
where
    K: std::hash::Hash + Eq + std::fmt::Debug + Copy,
{
    slots.get(&key).copied().ok_or_else(|| {
        CompileError::pipeline(format!("{what} {key:?} was not compiled before its use"))
    })
}
