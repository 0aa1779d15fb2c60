
use std::sync::Arc;

use cirkit_rs::backend::{CircuitSide, CompileError};
use recording_support::{
    add_counting_rules, product_of_sums, recording_compiler, Leaf, Ones, ProductLayer, SumLayer,
    Weight,
};

use cirkit_rs::symbolic::{ParameterGraphBuilder, SymbolicCircuit};

#[test]
fn compiles_dependencies_before_consumers() {
    let mut compiler = recording_compiler();
    let (leaf, sum, prod) = add_counting_rules(&mut compiler);
    let circuit = product_of_sums();

    let compiled = compiler.compile(&circuit).expect("compile");

    assert_eq!(
        compiled.layers.as_slice(),
        ["leaf", "sum", "sum", "product"]
    );
    assert_eq!(leaf.get(), 1);
    assert_eq!(sum.get(), 2);
    assert_eq!(prod.get(), 1);
}

#[test]
fn second_compile_is_answered_from_cache() {
    let mut compiler = recording_compiler();
    let (leaf, sum, prod) = add_counting_rules(&mut compiler);
    let circuit = product_of_sums();

    let first = compiler.compile(&circuit).expect("first compile");
    let second = compiler.compile(&circuit.clone()).expect("second compile");

    assert_eq!(compiler.backend().pipeline_runs, 1);
    assert_eq!(first, second);
    assert!(Arc::ptr_eq(&first.layers, &second.layers));
    assert_eq!((leaf.get(), sum.get(), prod.get()), (1, 2, 1));
    assert_eq!(compiler.compiled_circuits().len(), 1);
}

#[test]
fn structurally_equal_circuits_compile_separately() {
    let mut compiler = recording_compiler();
    add_counting_rules(&mut compiler);

    let a = compiler.compile(&product_of_sums()).unwrap();
    let b = compiler.compile(&product_of_sums()).unwrap();

    assert_ne!(a, b);
    assert_eq!(compiler.backend().pipeline_runs, 2);
}

#[test]
fn compiled_and_symbolic_are_queryable_both_ways() {
    let mut compiler = recording_compiler();
    add_counting_rules(&mut compiler);
    let circuit = product_of_sums();

    let compiled = compiler.compile(&circuit).unwrap();

    assert!(compiler.is_compiled(&circuit));
    assert!(compiler.has_symbolic(&compiled));
    assert_eq!(compiler.get_compiled_circuit(&circuit).unwrap(), &compiled);
    assert_eq!(compiler.get_symbolic_circuit(&compiled).unwrap(), &circuit);
}

#[test]
fn missing_rule_fails_without_caching() {
    let mut compiler = recording_compiler();
    compiler
        .add_layer_rule::<Leaf, _>(|_, _| Ok("leaf".to_string()))
        .unwrap();
    let circuit = product_of_sums();

    let err = compiler.compile(&circuit).unwrap_err();
    assert!(matches!(err, CompileError::RuleNotFound { .. }));
    assert!(!compiler.is_compiled(&circuit));

    compiler
        .add_layer_rule::<SumLayer, _>(|_, _| Ok("sum".to_string()))
        .unwrap();
    compiler
        .add_layer_rule::<recording_support::ProductLayer, _>(|_, _| Ok("product".to_string()))
        .unwrap();

    compiler.compile(&circuit).expect("retry after registering rules");
    assert_eq!(compiler.backend().pipeline_runs, 2);
    assert!(compiler.is_compiled(&circuit));
}

#[test]
fn failed_pipeline_is_retried_from_scratch() {
    let mut compiler = recording_compiler();
    let (leaf, sum, prod) = add_counting_rules(&mut compiler);
    compiler.backend_mut().fail_after_layers = Some(2);
    let circuit = product_of_sums();

    let err = compiler.compile(&circuit).unwrap_err();
    assert_eq!(err, CompileError::pipeline("injected failure"));
    assert!(!compiler.is_compiled(&circuit));
    assert!(compiler.compiled_circuits().is_empty());

    compiler.backend_mut().fail_after_layers = None;
    let compiled = compiler.compile(&circuit).unwrap();

    assert_eq!(compiled.layers.len(), 4);
    assert_eq!(compiler.backend().pipeline_runs, 2);
    assert_eq!((leaf.get(), sum.get(), prod.get()), (2, 3, 1));
}

#[test]
fn self_registering_pipeline_yields_one_entry() {
    let mut compiler = recording_compiler();
    add_counting_rules(&mut compiler);
    compiler.backend_mut().self_register = true;
    let circuit = product_of_sums();

    let compiled = compiler.compile(&circuit).unwrap();

    assert_eq!(compiler.compiled_circuits().len(), 1);
    assert_eq!(compiler.get_symbolic_circuit(&compiled).unwrap(), &circuit);
    compiler.compile(&circuit).unwrap();
    assert_eq!(compiler.backend().pipeline_runs, 1);
}

#[test]
fn double_registration_by_pipeline_is_rejected() {
    let mut compiler = recording_compiler();
    add_counting_rules(&mut compiler);
    compiler.backend_mut().register_decoy = true;
    let circuit = product_of_sums();

    let err = compiler.compile(&circuit).unwrap_err();

    assert!(matches!(
        err,
        CompileError::AlreadyRegistered {
            side: CircuitSide::Symbolic,
            ..
        }
    ));
    assert!(!compiler.is_compiled(&circuit));
}

#[test]
fn registration_by_pipeline_is_rolled_back_on_failure() {
    let mut compiler = recording_compiler();
    add_counting_rules(&mut compiler);
    compiler.backend_mut().self_register = true;
    compiler.backend_mut().fail_after_register = true;
    let circuit = product_of_sums();

    let err = compiler.compile(&circuit).unwrap_err();
    assert_eq!(err, CompileError::pipeline("failed after registering"));
    assert!(!compiler.is_compiled(&circuit));
    assert!(compiler.compiled_circuits().is_empty());

    compiler.backend_mut().fail_after_register = false;
    compiler.compile(&circuit).unwrap();
    assert_eq!(compiler.compiled_circuits().len(), 1);
}

#[test]
fn parameters_and_initializers_dispatch_to_their_registries() {
    let mut compiler = recording_compiler();
    add_counting_rules(&mut compiler);
    compiler
        .add_parameter_rule::<Weight, _>(|_, _| Ok("weight".to_string()))
        .unwrap();
    compiler
        .add_initializer_rule::<Ones, _>(|_, _| Ok("ones".to_string()))
        .unwrap();

    let mut params = ParameterGraphBuilder::new();
    let weight = params.add_leaf(Weight, Some(Arc::new(Ones))).unwrap();
    let weight = params.finish(weight).unwrap();

    let mut builder = SymbolicCircuit::builder();
    let leaf = builder.add_layer(Leaf, &[]).unwrap();
    let sum = builder
        .add_layer_with_parameters(SumLayer, &[leaf], [("weight".to_string(), weight)])
        .unwrap();
    let circuit = builder.finish(&[sum]).unwrap();

    let compiled = compiler.compile(&circuit).unwrap();
    assert_eq!(compiled.layers.as_slice(), ["leaf", "ones", "weight", "sum"]);
}

#[test]
fn rules_can_consult_flags_through_the_compiler() {
    let mut compiler = cirkit_rs::Compiler::new(
        recording_support::RecordingBackend::default(),
        cirkit_rs::CompilerFlags::new().with("leaf_tag", "x"),
    );
    compiler
        .add_layer_rule::<Leaf, _>(|compiler, _| {
            Ok(compiler.flags().str_or("leaf_tag", "leaf")?.to_string())
        })
        .unwrap();
    let mut builder = SymbolicCircuit::builder();
    let leaf = builder.add_layer(Leaf, &[]).unwrap();
    let circuit = builder.finish(&[leaf]).unwrap();

    let compiled = compiler.compile(&circuit).unwrap();
    assert_eq!(compiled.layers.as_slice(), ["x"]);
}

fn single_product() -> SymbolicCircuit {
    let mut builder = SymbolicCircuit::builder();
    let root = builder.add_layer(ProductLayer, &[]).unwrap();
    builder.finish(&[root]).unwrap()
}

#[test]
fn failed_run_drops_pairs_registered_for_other_circuits() {
    let mut compiler = recording_compiler();
    add_counting_rules(&mut compiler);
    let side = single_product();
    compiler.backend_mut().register_side = Some(side.clone());
    compiler.backend_mut().fail_after_register = true;
    let circuit = product_of_sums();

    let err = compiler.compile(&circuit).unwrap_err();

    assert_eq!(err, CompileError::pipeline("failed after registering"));
    assert!(!compiler.is_compiled(&side));
    assert!(!compiler.is_compiled(&circuit));
    assert!(compiler.compiled_circuits().is_empty());

    compiler.backend_mut().register_side = None;
    compiler.backend_mut().fail_after_register = false;
    compiler.compile(&circuit).unwrap();
    assert_eq!(compiler.compiled_circuits().len(), 1);
}

#[test]
fn conflicting_compiled_value_is_rolled_back() {
    let mut compiler = recording_compiler();
    add_counting_rules(&mut compiler);
    let side = single_product();
    compiler.backend_mut().register_side = Some(side.clone());
    compiler.backend_mut().side_shares_result = true;
    let circuit = product_of_sums();

    let err = compiler.compile(&circuit).unwrap_err();

    assert!(matches!(
        err,
        CompileError::AlreadyRegistered {
            side: CircuitSide::Compiled,
            ..
        }
    ));
    assert!(!compiler.is_compiled(&side));
    assert!(compiler.compiled_circuits().is_empty());
}

#[test]
fn failed_run_drops_nested_compilations() {
    let mut compiler = recording_compiler();
    let nested = single_product();
    let inner = nested.clone();
    compiler
        .add_layer_rule::<Leaf, _>(move |compiler, _| {
            compiler.compile(&inner)?;
            Ok("leaf".to_string())
        })
        .unwrap();
    compiler
        .add_layer_rule::<SumLayer, _>(|_, _| Ok("sum".to_string()))
        .unwrap();
    compiler
        .add_layer_rule::<ProductLayer, _>(|_, _| Ok("product".to_string()))
        .unwrap();
    compiler.backend_mut().fail_after_layers = Some(2);
    let circuit = product_of_sums();

    compiler.compile(&circuit).unwrap_err();

    assert_eq!(compiler.backend().pipeline_runs, 2);
    assert!(!compiler.is_compiled(&nested));
    assert!(compiler.compiled_circuits().is_empty());
}
