//! Free-form compiler configuration.
//!
//! The compiler never interprets flags itself; it stores them and hands them to the
//! backend pipeline, which decides which names it understands.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{CompileError, CompileResult};
use crate::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl FlagValue {
    /// Parses a textual flag value: booleans and numbers first, strings otherwise.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(value) = env::parse_bool(trimmed) {
            return FlagValue::Bool(value);
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return FlagValue::Int(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return FlagValue::Float(value);
        }
        FlagValue::Str(trimmed.to_string())
    }

    fn kind(&self) -> &'static str {
        match self {
            FlagValue::Bool(_) => "bool",
            FlagValue::Int(_) => "int",
            FlagValue::Float(_) => "float",
            FlagValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagValue::Bool(value) => write!(f, "{value}"),
            FlagValue::Int(value) => write!(f, "{value}"),
            FlagValue::Float(value) => write!(f, "{value}"),
            FlagValue::Str(value) => f.write_str(value),
        }
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl From<f64> for FlagValue {
    fn from(value: f64) -> Self {
        FlagValue::Float(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        FlagValue::Str(value.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        FlagValue::Str(value)
    }
}

/// Named options passed through to the compilation pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerFlags {
    values: BTreeMap<String, FlagValue>,
}

impl CompilerFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FlagValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Parses a JSON object of flag names to scalar values.
    pub fn from_json(json: &str) -> CompileResult<Self> {
        serde_json::from_str(json)
            .map_err(|err| CompileError::invalid_flag("<json>", err.to_string()))
    }

    /// Parses `name=value` pairs separated by commas.
    pub fn parse_pairs(spec: &str) -> CompileResult<Self> {
        let mut flags = Self::new();
        for pair in spec.split(',').map(str::trim).filter(|pair| !pair.is_empty()) {
            let (name, raw) = pair
                .split_once('=')
                .ok_or_else(|| CompileError::invalid_flag(pair, "expected `name=value`"))?;
            let name = name.trim();
            if name.is_empty() {
                return Err(CompileError::invalid_flag(pair, "empty flag name"));
            }
            flags.set(name, FlagValue::parse(raw));
        }
        Ok(flags)
    }

    /// Flags from the `CIRKIT_COMPILER_FLAGS` environment variable, empty when unset.
    pub fn from_env() -> CompileResult<Self> {
        match env::compiler_flags_spec() {
            Some(spec) => Self::parse_pairs(&spec),
            None => Ok(Self::new()),
        }
    }

    /// Overlays `other` on top of `self`; names present in both take `other`'s value.
    pub fn merged(mut self, other: CompilerFlags) -> Self {
        self.values.extend(other.values);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn bool_or(&self, name: &str, default: bool) -> CompileResult<bool> {
        match self.values.get(name) {
            None => Ok(default),
            Some(FlagValue::Bool(value)) => Ok(*value),
            Some(other) => Err(type_mismatch(name, "bool", other)),
        }
    }

    pub fn int_or(&self, name: &str, default: i64) -> CompileResult<i64> {
        match self.values.get(name) {
            None => Ok(default),
            Some(FlagValue::Int(value)) => Ok(*value),
            Some(other) => Err(type_mismatch(name, "int", other)),
        }
    }

    pub fn float_or(&self, name: &str, default: f64) -> CompileResult<f64> {
        match self.values.get(name) {
            None => Ok(default),
            Some(FlagValue::Float(value)) => Ok(*value),
            Some(FlagValue::Int(value)) => Ok(*value as f64),
            Some(other) => Err(type_mismatch(name, "float", other)),
        }
    }

    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> CompileResult<&'a str> {
        match self.values.get(name) {
            None => Ok(default),
            Some(FlagValue::Str(value)) => Ok(value.as_str()),
            Some(other) => Err(type_mismatch(name, "string", other)),
        }
    }
}

fn type_mismatch(name: &str, expected: &str, found: &FlagValue) -> CompileError {
    CompileError::invalid_flag(
        name,
        format!("expected a {expected}, got {} `{found}`", found.kind()),
    )
}

impl<K, V> FromIterator<(K, V)> for CompilerFlags
where
    K: Into<String>,
    V: Into<FlagValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut flags = Self::new();
        for (name, value) in iter {
            flags.set(name, value);
        }
        flags
    }
}
