//! Parameter schema: typed parameters, the JSON file format and source extraction

mod document;
mod extract;
mod types;

pub use document::{
    FloatParamEntry, IntParamEntry, ParameterSchema, SchemaDocument, SchemaError, SchemaResult,
    parse_value,
};
pub use extract::extract_params;
pub use types::{CandidateParameterSet, ParamKind, ParamValue, ParameterSpec};
