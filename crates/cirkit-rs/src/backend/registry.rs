//! Per-category compilation rule tables.
//!
//! A registry maps the exact runtime type of a node ([`Signature`]) to the rule that
//! compiles it. Rules are registered against a concrete node type; the registry erases
//! that type behind a downcast so that pipelines can dispatch on `&dyn SymbolicNode`.
//!
//! Lookups never fall back to a supertype's rule. When a declared supertype does have a
//! rule, the lookup error names it so the missing registration is easy to spot.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::error::{CompileError, CompileResult};
use crate::symbolic::{NodeCategory, NodeKind, Signature, SymbolicNode};

/// Type-erased compilation rule: `(context, node) -> compiled value`.
pub type Rule<Cx, Out> = dyn Fn(&mut Cx, &dyn SymbolicNode) -> CompileResult<Out> + Send + Sync;

/// What `add_rule` does when the signature already has a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail with [`CompileError::DuplicateSignature`] and keep the existing rule.
    #[default]
    Reject,
    /// Replace the existing rule and emit a warning.
    Overwrite,
}

impl DuplicatePolicy {
    /// `Overwrite` when `CIRKIT_RULE_OVERWRITE` is truthy, `Reject` otherwise.
    pub fn from_env() -> Self {
        if crate::env::rule_overwrite_enabled() {
            DuplicatePolicy::Overwrite
        } else {
            DuplicatePolicy::Reject
        }
    }
}

pub struct RuleRegistry<Cx, Out> {
    category: NodeCategory,
    policy: DuplicatePolicy,
    rules: HashMap<Signature, Arc<Rule<Cx, Out>>>,
}

impl<Cx: 'static, Out: 'static> RuleRegistry<Cx, Out> {
    pub fn new(category: NodeCategory) -> Self {
        Self::with_policy(category, DuplicatePolicy::from_env())
    }

    pub fn with_policy(category: NodeCategory, policy: DuplicatePolicy) -> Self {
        Self {
            category,
            policy,
            rules: HashMap::new(),
        }
    }

    pub fn category(&self) -> NodeCategory {
        self.category
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Registers `rule` for nodes of exact type `T`.
    pub fn add_rule<T, F>(&mut self, rule: F) -> CompileResult<()>
    where
        T: NodeKind,
        F: Fn(&mut Cx, &T) -> CompileResult<Out> + Send + Sync + 'static,
    {
        let signature = Signature::of::<T>();
        let erased = move |cx: &mut Cx, node: &dyn SymbolicNode| -> CompileResult<Out> {
            let typed = node.downcast_ref::<T>().ok_or_else(|| CompileError::NodeTypeMismatch {
                expected: signature.name(),
                found: node.signature().name(),
            })?;
            rule(cx, typed)
        };
        self.add_rule_with_signature(signature, Arc::new(erased))
    }

    /// Registers an already type-erased rule under an explicit signature.
    pub fn add_rule_with_signature(
        &mut self,
        signature: Signature,
        rule: Arc<Rule<Cx, Out>>,
    ) -> CompileResult<()> {
        if signature.category() != self.category {
            return Err(CompileError::InvalidRule {
                category: self.category,
                signature: signature.name(),
                found: signature.category(),
            });
        }
        if self.rules.contains_key(&signature) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(CompileError::DuplicateSignature {
                        category: self.category,
                        signature: signature.name(),
                    });
                }
                DuplicatePolicy::Overwrite => {
                    tracing::warn!(
                        category = %self.category,
                        signature = signature.name(),
                        "overwriting compilation rule"
                    );
                }
            }
        }
        tracing::debug!(
            category = %self.category,
            signature = signature.name(),
            "registered compilation rule"
        );
        self.rules.insert(signature, rule);
        Ok(())
    }

    pub fn retrieve_rule(&self, signature: &Signature) -> CompileResult<Arc<Rule<Cx, Out>>> {
        if let Some(rule) = self.rules.get(signature) {
            return Ok(Arc::clone(rule));
        }
        let supertype_with_rule = signature
            .ancestors()
            .find(|ancestor| self.rules.contains_key(ancestor))
            .map(|ancestor| ancestor.name());
        Err(CompileError::RuleNotFound {
            category: self.category,
            signature: signature.name(),
            supertype_with_rule,
        })
    }

    pub fn has_rule(&self, signature: &Signature) -> bool {
        self.rules.contains_key(signature)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Registered signatures, sorted by type name.
    pub fn signatures(&self) -> Vec<Signature> {
        let mut signatures: Vec<Signature> = self.rules.keys().copied().collect();
        signatures.sort_by_key(|signature| signature.name());
        signatures
    }
}

impl<Cx, Out> fmt::Debug for RuleRegistry<Cx, Out> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.rules.keys().map(|sig| sig.name()).collect();
        names.sort_unstable();
        f.debug_struct("RuleRegistry")
            .field("category", &self.category)
            .field("policy", &self.policy)
            .field("rules", &names)
            .finish()
    }
}
