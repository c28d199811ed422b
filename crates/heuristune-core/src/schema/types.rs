//! Parameter model
//!
//! Parameters are a tagged union over integer and float domains. The kind
//! is fixed at load time and drives every later coercion.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Numeric domain of a parameter, with its bounds and current value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Int {
        lower: i64,
        upper: i64,
        default: i64,
    },
    Float {
        lower: f64,
        upper: f64,
        default: f64,
        /// Sample on a logarithmic scale
        log: bool,
    },
}

/// One tunable parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    /// Whether the search varies this parameter or keeps it at its default
    pub searchable: bool,
}

impl ParameterSpec {
    pub fn int(name: impl Into<String>, lower: i64, upper: i64, default: i64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Int {
                lower,
                upper,
                default,
            },
            searchable: true,
        }
    }

    pub fn float(name: impl Into<String>, lower: f64, upper: f64, default: f64) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Float {
                lower,
                upper,
                default,
                log: false,
            },
            searchable: true,
        }
    }

    /// Mark a float parameter as log-scaled (no effect on integers)
    pub fn log_scale(mut self) -> Self {
        if let ParamKind::Float { log, .. } = &mut self.kind {
            *log = true;
        }
        self
    }

    /// Keep the parameter fixed at its default during search
    pub fn fixed(mut self) -> Self {
        self.searchable = false;
        self
    }

    /// Current value as stored in the schema
    pub fn default_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::Int { default, .. } => ParamValue::Int(default),
            ParamKind::Float { default, .. } => ParamValue::Float(default),
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, ParamKind::Float { .. })
    }

    /// Coerce a value into this parameter's domain, rejecting out-of-range values
    pub fn coerce(&self, value: ParamValue) -> Option<ParamValue> {
        match self.kind {
            ParamKind::Int { lower, upper, .. } => {
                let v = match value {
                    ParamValue::Int(v) => v,
                    ParamValue::Float(f) if f.fract() == 0.0 => f as i64,
                    ParamValue::Float(_) => return None,
                };
                (lower..=upper).contains(&v).then_some(ParamValue::Int(v))
            }
            ParamKind::Float { lower, upper, .. } => {
                let v = value.as_f64();
                (v.is_finite() && lower <= v && v <= upper).then_some(ParamValue::Float(v))
            }
        }
    }

    /// Overwrite the stored value; the caller guarantees the domain
    pub(crate) fn set_default(&mut self, value: ParamValue) {
        match (&mut self.kind, value) {
            (ParamKind::Int { default, .. }, ParamValue::Int(v)) => *default = v,
            (ParamKind::Float { default, .. }, v) => *default = v.as_f64(),
            (ParamKind::Int { default, .. }, ParamValue::Float(f)) => *default = f as i64,
        }
    }
}

/// A concrete parameter value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Int(v) => *v as f64,
            ParamValue::Float(v) => *v,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Concrete values for one evaluation, keyed by parameter name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateParameterSet {
    values: BTreeMap<String, ParamValue>,
}

impl CandidateParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Environment variables `<prefix><name>=<value>` for the solution process
    pub fn to_env(&self, prefix: &str) -> Vec<(String, String)> {
        self.values
            .iter()
            .map(|(name, value)| (format!("{}{}", prefix, name), value.to_string()))
            .collect()
    }
}

impl fmt::Display for CandidateParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
