//! Behaviour every backend must show once the standard rules are installed.

use cirkit_rs::backend::{is_supported_backend, DuplicatePolicy};
use cirkit_rs::symbolic::nodes::SumLayer;
use cirkit_rs::symbolic::{NodeCategory, Signature};
use cirkit_rs::{Backend, CompileError, Compiler};

use crate::circuits::{self, MixingLayer};

pub fn backend_name_is_supported<B: Backend>(_compiler: &Compiler<B>) {
    assert!(
        is_supported_backend(B::NAME),
        "backend `{}` missing from SUPPORTED_BACKENDS",
        B::NAME
    );
}

pub fn compile_is_memoized<B: Backend>(compiler: &mut Compiler<B>) {
    let circuit = circuits::mixture_of_products();

    let first = compiler.compile(&circuit).expect("first compile");
    let second = compiler.compile(&circuit).expect("second compile");

    assert_eq!(first, second);
    assert_eq!(compiler.compiled_circuits().len(), 1);
}

pub fn compiled_map_is_bijective<B: Backend>(compiler: &mut Compiler<B>) {
    let a = circuits::mixture_of_products();
    let b = circuits::gaussian_leaf();

    let compiled_a = compiler.compile(&a).expect("compile a");
    let compiled_b = compiler.compile(&b).expect("compile b");

    assert_ne!(compiled_a, compiled_b);
    assert_eq!(compiler.get_compiled_circuit(&a).unwrap(), &compiled_a);
    assert_eq!(compiler.get_compiled_circuit(&b).unwrap(), &compiled_b);
    assert_eq!(compiler.get_symbolic_circuit(&compiled_a).unwrap(), &a);
    assert_eq!(compiler.get_symbolic_circuit(&compiled_b).unwrap(), &b);
    for (symbolic, compiled) in compiler.compiled_circuits().iter() {
        assert_eq!(compiler.get_symbolic_circuit(compiled).unwrap(), symbolic);
    }
}

pub fn missing_rule_does_not_pollute_cache<B: Backend>(compiler: &mut Compiler<B>) {
    let broken = circuits::with_unregistered_layer();

    let err = compiler.compile(&broken).unwrap_err();
    assert!(
        matches!(
            err,
            CompileError::RuleNotFound {
                category: NodeCategory::Layer,
                ..
            }
        ),
        "unexpected error: {err}"
    );
    assert!(!compiler.is_compiled(&broken));
    assert!(compiler.compiled_circuits().is_empty());

    let healthy = circuits::mixture_of_products();
    compiler.compile(&healthy).expect("compile after failure");
    assert_eq!(compiler.compiled_circuits().len(), 1);
}

pub fn supertype_rule_is_not_a_fallback<B: Backend>(compiler: &mut Compiler<B>) {
    assert!(compiler
        .layer_registry()
        .has_rule(&Signature::of::<SumLayer>()));
    let circuit = circuits::with_mixing_layer();

    let err = compiler.compile(&circuit).unwrap_err();

    match err {
        CompileError::RuleNotFound {
            signature,
            supertype_with_rule,
            ..
        } => {
            assert_eq!(signature, std::any::type_name::<MixingLayer>());
            assert_eq!(supertype_with_rule, Some(std::any::type_name::<SumLayer>()));
        }
        other => panic!("expected RuleNotFound, got {other:?}"),
    }
    assert!(!compiler.is_compiled(&circuit));
}

pub fn duplicate_rule_is_rejected<B: Backend>(compiler: &mut Compiler<B>) {
    if compiler.layer_registry().policy() != DuplicatePolicy::Reject {
        return;
    }
    let before = compiler.layer_registry().len();

    let err = compiler
        .add_layer_rule::<SumLayer, _>(|_, _| Err(CompileError::pipeline("replacement rule")))
        .unwrap_err();

    assert!(matches!(err, CompileError::DuplicateSignature { .. }));
    assert_eq!(compiler.layer_registry().len(), before);
    compiler
        .compile(&circuits::mixture_of_products())
        .expect("first sum rule still in place");
}
