use std::fmt;

use thiserror::Error;

use crate::symbolic::{CircuitBuildError, NodeCategory};

/// Which side of the compiled-circuit map an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitSide {
    Symbolic,
    Compiled,
}

impl CircuitSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitSide::Symbolic => "symbolic",
            CircuitSide::Compiled => "compiled",
        }
    }
}

impl fmt::Display for CircuitSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CompileError {
    #[error("invalid {category} rule: node type `{signature}` is a {found} node")]
    InvalidRule {
        category: NodeCategory,
        signature: &'static str,
        found: NodeCategory,
    },

    #[error("{found} rule registry passed in the {slot} registry slot")]
    RegistrySlot {
        slot: NodeCategory,
        found: NodeCategory,
    },

    #[error("a {category} rule for `{signature}` is already registered")]
    DuplicateSignature {
        category: NodeCategory,
        signature: &'static str,
    },

    #[error("{}", rule_not_found_message(.category, .signature, .supertype_with_rule))]
    RuleNotFound {
        category: NodeCategory,
        signature: &'static str,
        /// Nearest declared supertype that has a rule; reported, never used.
        supertype_with_rule: Option<&'static str>,
    },

    #[error("{side} circuit not found: {detail}")]
    NotFound { side: CircuitSide, detail: String },

    #[error("{side} circuit is already registered: {detail}")]
    AlreadyRegistered { side: CircuitSide, detail: String },

    #[error("rule for `{expected}` was invoked on a `{found}` node")]
    NodeTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid compiler flag `{name}`: {reason}")]
    InvalidFlag { name: String, reason: String },

    #[error("unsupported backend `{0}`")]
    UnsupportedBackend(String),

    #[error(transparent)]
    Build(#[from] CircuitBuildError),

    #[error("compilation pipeline failed: {0}")]
    Pipeline(String),
}

fn rule_not_found_message(
    category: &NodeCategory,
    signature: &str,
    supertype_with_rule: &Option<&'static str>,
) -> String {
    match supertype_with_rule {
        Some(parent) => format!(
            "no {category} compilation rule for `{signature}` \
             (supertype `{parent}` has one, but rules match exact types only)"
        ),
        None => format!("no {category} compilation rule for `{signature}`"),
    }
}

impl CompileError {
    pub fn pipeline(message: impl Into<String>) -> Self {
        CompileError::Pipeline(message.into())
    }

    pub fn invalid_flag(name: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::InvalidFlag {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results returned by compiler routines.
pub type CompileResult<T> = Result<T, CompileError>;
