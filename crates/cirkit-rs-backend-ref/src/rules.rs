use cirkit_rs::backend::{CompileError, CompileResult, Compiler};
use cirkit_rs::symbolic::nodes::{
    CategoricalLayer, ConstantInitializer, ConstantParameter, ExpParameter, GaussianLayer,
    HadamardLayer, KroneckerLayer, NormalInitializer, SoftmaxParameter, SumLayer,
    TensorParameter, UniformInitializer,
};

use crate::ir::{RefInitializer, RefLayerOp, RefParameterOp};
use crate::RefBackend;

type Cx = Compiler<RefBackend>;

/// Installs a rule for every standard node type.
pub fn register_default_rules(compiler: &mut Cx) -> CompileResult<()> {
    compiler.add_layer_rule::<CategoricalLayer, _>(compile_categorical)?;
    compiler.add_layer_rule::<GaussianLayer, _>(compile_gaussian)?;
    compiler.add_layer_rule::<SumLayer, _>(compile_sum)?;
    compiler.add_layer_rule::<HadamardLayer, _>(compile_hadamard)?;
    compiler.add_layer_rule::<KroneckerLayer, _>(compile_kronecker)?;

    compiler.add_parameter_rule::<TensorParameter, _>(compile_tensor)?;
    compiler.add_parameter_rule::<ConstantParameter, _>(compile_constant)?;
    compiler.add_parameter_rule::<SoftmaxParameter, _>(compile_softmax)?;
    compiler.add_parameter_rule::<ExpParameter, _>(|_, _| Ok(RefParameterOp::Exp))?;

    compiler.add_initializer_rule::<ConstantInitializer, _>(|_, init| {
        Ok(RefInitializer::Constant { value: init.value })
    })?;
    compiler.add_initializer_rule::<NormalInitializer, _>(compile_normal)?;
    compiler.add_initializer_rule::<UniformInitializer, _>(compile_uniform)?;
    Ok(())
}

fn compile_categorical(_: &mut Cx, layer: &CategoricalLayer) -> CompileResult<RefLayerOp> {
    if layer.num_categories == 0 {
        return Err(CompileError::pipeline(
            "categorical layer needs at least one category",
        ));
    }
    Ok(RefLayerOp::Categorical {
        scope: layer.scope.clone(),
        num_output_units: layer.num_output_units,
        num_categories: layer.num_categories,
    })
}

fn compile_gaussian(_: &mut Cx, layer: &GaussianLayer) -> CompileResult<RefLayerOp> {
    Ok(RefLayerOp::Gaussian {
        scope: layer.scope.clone(),
        num_output_units: layer.num_output_units,
    })
}

fn compile_sum(_: &mut Cx, layer: &SumLayer) -> CompileResult<RefLayerOp> {
    Ok(RefLayerOp::Sum {
        num_input_units: layer.num_input_units,
        num_output_units: layer.num_output_units,
        arity: layer.arity,
    })
}

fn compile_hadamard(_: &mut Cx, layer: &HadamardLayer) -> CompileResult<RefLayerOp> {
    Ok(RefLayerOp::Hadamard {
        num_units: layer.num_input_units,
        arity: layer.arity,
    })
}

fn compile_kronecker(_: &mut Cx, layer: &KroneckerLayer) -> CompileResult<RefLayerOp> {
    let num_output_units = layer.num_output_units().ok_or_else(|| {
        CompileError::pipeline(format!(
            "kronecker layer output size {}^{} overflows",
            layer.num_input_units, layer.arity
        ))
    })?;
    Ok(RefLayerOp::Kronecker {
        num_input_units: layer.num_input_units,
        num_output_units,
        arity: layer.arity,
    })
}

fn compile_tensor(_: &mut Cx, param: &TensorParameter) -> CompileResult<RefParameterOp> {
    Ok(RefParameterOp::Tensor {
        shape: param.shape.clone(),
        learnable: param.learnable,
    })
}

fn compile_constant(_: &mut Cx, param: &ConstantParameter) -> CompileResult<RefParameterOp> {
    Ok(RefParameterOp::Constant {
        shape: param.shape.clone(),
        value: param.value,
    })
}

fn compile_softmax(_: &mut Cx, param: &SoftmaxParameter) -> CompileResult<RefParameterOp> {
    if param.axis >= param.shape.len() {
        return Err(CompileError::pipeline(format!(
            "softmax axis {} out of range for shape {:?}",
            param.axis, param.shape
        )));
    }
    Ok(RefParameterOp::Softmax { axis: param.axis })
}

fn compile_normal(_: &mut Cx, init: &NormalInitializer) -> CompileResult<RefInitializer> {
    if init.stddev <= 0.0 {
        return Err(CompileError::pipeline(format!(
            "normal initializer needs a positive stddev, got {}",
            init.stddev
        )));
    }
    Ok(RefInitializer::Normal {
        mean: init.mean,
        stddev: init.stddev,
    })
}

fn compile_uniform(_: &mut Cx, init: &UniformInitializer) -> CompileResult<RefInitializer> {
    if init.a >= init.b {
        return Err(CompileError::pipeline(format!(
            "uniform initializer needs a < b, got [{}, {}]",
            init.a, init.b
        )));
    }
    Ok(RefInitializer::Uniform {
        a: init.a,
        b: init.b,
    })
}
