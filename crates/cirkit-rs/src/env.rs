use std::env;
use std::sync::OnceLock;

static CIRKIT_RULE_OVERWRITE: OnceLock<bool> = OnceLock::new();

pub(crate) const COMPILER_FLAGS_VAR: &str = "CIRKIT_COMPILER_FLAGS";

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub(crate) fn rule_overwrite_enabled() -> bool {
    *CIRKIT_RULE_OVERWRITE.get_or_init(|| match env::var("CIRKIT_RULE_OVERWRITE") {
        Ok(value) if !value.trim().is_empty() => parse_bool(&value).unwrap_or(false),
        _ => false,
    })
}

pub(crate) fn compiler_flags_spec() -> Option<String> {
    env::var(COMPILER_FLAGS_VAR)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
