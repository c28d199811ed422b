//! Parameter schema file
//!
//! The on-disk form keeps integers and floats in two ordered collections.
//! [`ParameterSchema`] is the validated, typed view of it.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{CandidateParameterSet, ParamKind, ParamValue, ParameterSpec};

/// Errors raised while loading, validating or writing a schema
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to access schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate parameter name: {0}")]
    DuplicateName(String),

    #[error("Parameter {name}: lower bound {lower} exceeds upper bound {upper}")]
    InvertedBounds {
        name: String,
        lower: String,
        upper: String,
    },

    #[error("Parameter {name}: value {value} outside [{lower}, {upper}]")]
    ValueOutOfBounds {
        name: String,
        value: String,
        lower: String,
        upper: String,
    },

    #[error("Parameter {0}: log scale requires a positive lower bound")]
    InvalidLogScale(String),

    #[error("Parameter {0}: bounds and value must be finite")]
    NonFinite(String),

    #[error("Parameter name must not be empty")]
    EmptyName,

    #[error("Invalid parameter macro pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Integer entry as written on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntParamEntry {
    pub name: String,
    pub lower: i64,
    pub upper: i64,
    pub value: i64,
    #[serde(default)]
    pub used: bool,
}

/// Float entry as written on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatParamEntry {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub value: f64,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub log: bool,
}

/// The schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub integer_params: Vec<IntParamEntry>,
    pub float_params: Vec<FloatParamEntry>,
    /// Aggregate score of the values currently stored, set after a search
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best_score: Option<f64>,
}

impl SchemaDocument {
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> SchemaResult<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// Validated parameter schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    params: Vec<ParameterSpec>,
    best_score: Option<f64>,
}

impl ParameterSchema {
    /// Build from specs, validating every invariant
    pub fn new(params: Vec<ParameterSpec>) -> SchemaResult<Self> {
        let schema = Self {
            params,
            best_score: None,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Load and validate a schema file
    pub fn load(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let schema = Self::from_document(SchemaDocument::from_json(&content)?)?;
        tracing::debug!(
            path = %path.display(),
            params = schema.params.len(),
            searchable = schema.searchable().count(),
            "Loaded parameter schema"
        );
        Ok(schema)
    }

    /// Write the schema file
    pub fn save(&self, path: impl AsRef<Path>) -> SchemaResult<()> {
        let path = path.as_ref();
        let json = self.to_document().to_json()?;
        std::fs::write(path, json).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_document(doc: SchemaDocument) -> SchemaResult<Self> {
        let mut params = Vec::with_capacity(doc.integer_params.len() + doc.float_params.len());
        for p in doc.integer_params {
            params.push(ParameterSpec {
                name: p.name,
                kind: ParamKind::Int {
                    lower: p.lower,
                    upper: p.upper,
                    default: p.value,
                },
                searchable: p.used,
            });
        }
        for p in doc.float_params {
            params.push(ParameterSpec {
                name: p.name,
                kind: ParamKind::Float {
                    lower: p.lower,
                    upper: p.upper,
                    default: p.value,
                    log: p.log,
                },
                searchable: p.used,
            });
        }

        let schema = Self {
            params,
            best_score: doc.best_score,
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn to_document(&self) -> SchemaDocument {
        let mut doc = SchemaDocument {
            best_score: self.best_score,
            ..Default::default()
        };
        for p in &self.params {
            match p.kind {
                ParamKind::Int {
                    lower,
                    upper,
                    default,
                } => doc.integer_params.push(IntParamEntry {
                    name: p.name.clone(),
                    lower,
                    upper,
                    value: default,
                    used: p.searchable,
                }),
                ParamKind::Float {
                    lower,
                    upper,
                    default,
                    log,
                } => doc.float_params.push(FloatParamEntry {
                    name: p.name.clone(),
                    lower,
                    upper,
                    value: default,
                    used: p.searchable,
                    log,
                }),
            }
        }
        doc
    }

    fn validate(&self) -> SchemaResult<()> {
        let mut seen = HashSet::new();
        for p in &self.params {
            if p.name.trim().is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if !seen.insert(p.name.as_str()) {
                return Err(SchemaError::DuplicateName(p.name.clone()));
            }
            validate_spec(p)?;
        }
        Ok(())
    }

    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Parameters the search varies
    pub fn searchable(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.params.iter().filter(|p| p.searchable)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best_score
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Candidate holding every parameter at its stored value
    pub fn defaults(&self) -> CandidateParameterSet {
        let mut candidate = CandidateParameterSet::new();
        for p in &self.params {
            candidate.insert(p.name.clone(), p.default_value());
        }
        candidate
    }

    /// Store the winning values of every searchable parameter
    ///
    /// Values outside a parameter's domain are ignored and reported.
    pub fn apply_best(&mut self, best: &CandidateParameterSet, score: f64) {
        for p in self.params.iter_mut().filter(|p| p.searchable) {
            let Some(value) = best.get(&p.name) else {
                continue;
            };
            match p.coerce(value) {
                Some(v) => p.set_default(v),
                None => tracing::warn!(
                    param = %p.name,
                    value = %value,
                    "Best value outside parameter domain, keeping stored value"
                ),
            }
        }
        self.best_score = Some(score);
    }

    /// Add a parameter or replace the one with the same name
    pub fn upsert(&mut self, spec: ParameterSpec) -> SchemaResult<()> {
        if spec.name.trim().is_empty() {
            return Err(SchemaError::EmptyName);
        }
        validate_spec(&spec)?;
        match self.params.iter_mut().find(|p| p.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.params.push(spec),
        }
        Ok(())
    }

    /// Remove a parameter, returning whether it existed
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.params.len();
        self.params.retain(|p| p.name != name);
        self.params.len() != before
    }
}

fn validate_spec(p: &ParameterSpec) -> SchemaResult<()> {
    match p.kind {
        ParamKind::Int {
            lower,
            upper,
            default,
        } => check_bounds(&p.name, lower, upper, default),
        ParamKind::Float {
            lower,
            upper,
            default,
            log,
        } => {
            if !(lower.is_finite() && upper.is_finite() && default.is_finite()) {
                return Err(SchemaError::NonFinite(p.name.clone()));
            }
            check_bounds(&p.name, lower, upper, default)?;
            if log && lower <= 0.0 {
                return Err(SchemaError::InvalidLogScale(p.name.clone()));
            }
            Ok(())
        }
    }
}

fn check_bounds<T>(name: &str, lower: T, upper: T, value: T) -> SchemaResult<()>
where
    T: PartialOrd + ToString,
{
    if lower > upper {
        return Err(SchemaError::InvertedBounds {
            name: name.to_string(),
            lower: lower.to_string(),
            upper: upper.to_string(),
        });
    }
    if value < lower || value > upper {
        return Err(SchemaError::ValueOutOfBounds {
            name: name.to_string(),
            value: value.to_string(),
            lower: lower.to_string(),
            upper: upper.to_string(),
        });
    }
    Ok(())
}

/// Parse command-line text as an integer or float value
pub fn parse_value(is_float: bool, text: &str) -> Option<ParamValue> {
    let text = text.trim();
    if is_float {
        text.parse::<f64>().ok().map(ParamValue::Float)
    } else {
        text.parse::<i64>().ok().map(ParamValue::Int)
    }
}
