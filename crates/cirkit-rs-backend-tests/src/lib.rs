pub mod circuits;
pub mod conformance;

#[macro_export]
macro_rules! define_backend_tests {
    ($module:ident, $compiler_ctor:expr) => {
        #[cfg(test)]
        mod $module {
            #[allow(unused_imports)]
            use super::*;
            use $crate::conformance;

            macro_rules! conformance_test {
                ($name:ident, $func:path) => {
                    #[test]
                    fn $name() {
                        let mut compiler = ($compiler_ctor)();
                        $func(&mut compiler);
                    }
                };
            }

            #[test]
            fn backend_name_is_supported() {
                let compiler = ($compiler_ctor)();
                conformance::backend_name_is_supported(&compiler);
            }

            conformance_test!(compile_is_memoized, conformance::compile_is_memoized);
            conformance_test!(compiled_map_is_bijective, conformance::compiled_map_is_bijective);
            conformance_test!(
                missing_rule_does_not_pollute_cache,
                conformance::missing_rule_does_not_pollute_cache
            );
            conformance_test!(
                supertype_rule_is_not_a_fallback,
                conformance::supertype_rule_is_not_a_fallback
            );
            conformance_test!(duplicate_rule_is_rejected, conformance::duplicate_rule_is_rejected);
        }
    };
}
