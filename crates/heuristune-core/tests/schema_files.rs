//! Parameter schema files on disk

use heuristune_core::schema::{
    CandidateParameterSet, ParamValue, ParameterSchema, SchemaDocument, SchemaError,
    extract_params,
};
use tempfile::TempDir;

const SCHEMA: &str = r#"{
  "integer_params": [
    {
      "name": "beam_width",
      "lower": 10,
      "upper": 2000,
      "value": 300,
      "used": true
    },
    {
      "name": "max_turns",
      "lower": 1,
      "upper": 100,
      "value": 40,
      "used": false
    }
  ],
  "float_params": [
    {
      "name": "start_temp",
      "lower": 0.01,
      "upper": 100.0,
      "value": 2.5,
      "used": true,
      "log": true
    }
  ],
  "best_score": 123456.0
}
"#;

#[test]
fn test_load_save_is_byte_stable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(&path, SCHEMA).unwrap();

    let schema = ParameterSchema::load(&path).unwrap();
    assert_eq!(schema.best_score(), Some(123456.0));
    schema.save(&path).unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), SCHEMA);
}

#[test]
fn test_finalize_rewrites_only_searchable_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(&path, SCHEMA).unwrap();

    let mut schema = ParameterSchema::load(&path).unwrap();
    let best = CandidateParameterSet::new()
        .with("beam_width", ParamValue::Int(512))
        .with("max_turns", ParamValue::Int(99))
        .with("start_temp", ParamValue::Float(0.75));
    schema.apply_best(&best, 200000.0);
    schema.save(&path).unwrap();

    let doc = SchemaDocument::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc.integer_params[0].value, 512);
    assert_eq!(doc.integer_params[1].value, 40);
    assert!(!doc.integer_params[1].used);
    assert_eq!(doc.float_params[0].value, 0.75);
    assert!(doc.float_params[0].log);
    assert_eq!(doc.best_score, Some(200000.0));
}

#[test]
fn test_malformed_schema_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("params.json");

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(ParameterSchema::load(&path), Err(SchemaError::Json(_))));

    std::fs::write(
        &path,
        r#"{"integer_params":[{"name":"a","lower":5,"upper":1,"value":3}],"float_params":[]}"#,
    )
    .unwrap();
    assert!(matches!(
        ParameterSchema::load(&path),
        Err(SchemaError::InvertedBounds { .. })
    ));

    assert!(matches!(
        ParameterSchema::load(dir.path().join("missing.json")),
        Err(SchemaError::Io { .. })
    ));
}

#[test]
fn test_extract_then_save() {
    let source = r#"
#include <bits/stdc++.h>
#include "hp_params.hpp"
using namespace std;

HP_PARAM(int, ITER, 1000, 100, 100000);
HP_PARAM(double, COOL, 0.95, 0.5, 0.999);

int main() { return 0; }
"#;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("params.json");
    extract_params(source).unwrap().save(&path).unwrap();

    let doc = SchemaDocument::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc.integer_params.len(), 1);
    assert_eq!(doc.integer_params[0].name, "ITER");
    assert!(doc.integer_params[0].used);
    assert_eq!(doc.float_params[0].name, "COOL");
    assert_eq!(doc.float_params[0].value, 0.95);
    assert_eq!(doc.best_score, None);
}
