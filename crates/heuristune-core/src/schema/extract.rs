//! Schema extraction from `HP_PARAM(type, name, default, lower, upper)` macros

use std::sync::OnceLock;

use regex::Regex;

use super::document::{ParameterSchema, SchemaError, SchemaResult};
use super::types::ParameterSpec;

const MACRO_PATTERN: &str = r"HP_PARAM\s*\(\s*([A-Za-z_][\w:\s]*?)\s*,\s*([A-Za-z_]\w*)\s*,\s*([^,()]+?)\s*,\s*([^,()]+?)\s*,\s*([^,()]+?)\s*\)";

fn macro_pattern() -> SchemaResult<&'static Regex> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(MACRO_PATTERN))
        .as_ref()
        .map_err(|e| SchemaError::Pattern(e.clone()))
}

/// Scan source text for parameter macros
///
/// `double`/`float` types become float parameters, every other type an
/// integer one. Declarations whose values are not numeric literals are
/// skipped. Macros inside `#define` lines are ignored.
pub fn extract_params(source: &str) -> SchemaResult<ParameterSchema> {
    let pattern = macro_pattern()?;
    let mut schema = ParameterSchema::default();

    for line in source.lines() {
        if line.trim_start().starts_with("#define") {
            continue;
        }
        for caps in pattern.captures_iter(line) {
            let ty = caps[1].trim();
            let name = &caps[2];
            let (default, lower, upper) = (&caps[3], &caps[4], &caps[5]);

            let spec = if is_float_type(ty) {
                match (parse_f64(default), parse_f64(lower), parse_f64(upper)) {
                    (Some(d), Some(l), Some(u)) => ParameterSpec::float(name, l, u, d),
                    _ => {
                        tracing::warn!(param = name, "Skipping parameter with non-literal values");
                        continue;
                    }
                }
            } else {
                match (parse_i64(default), parse_i64(lower), parse_i64(upper)) {
                    (Some(d), Some(l), Some(u)) => ParameterSpec::int(name, l, u, d),
                    _ => {
                        tracing::warn!(param = name, "Skipping parameter with non-literal values");
                        continue;
                    }
                }
            };

            if schema.get(name).is_some() {
                tracing::warn!(param = name, "Duplicate parameter macro, keeping the first");
                continue;
            }
            schema.upsert(spec)?;
        }
    }

    Ok(schema)
}

fn is_float_type(ty: &str) -> bool {
    matches!(ty, "double" | "float" | "long double")
}

fn strip_suffix_chars<'a>(text: &'a str, suffixes: &[char]) -> &'a str {
    text.trim().trim_end_matches(|c| suffixes.contains(&c))
}

fn parse_i64(text: &str) -> Option<i64> {
    let text = strip_suffix_chars(text, &['l', 'L', 'u', 'U']);
    let text = text.replace('\'', "");
    text.parse().ok()
}

fn parse_f64(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let text = if trimmed.contains(['.', 'e', 'E']) {
        strip_suffix_chars(trimmed, &['f', 'F', 'l', 'L'])
    } else {
        strip_suffix_chars(trimmed, &['l', 'L', 'u', 'U'])
    };
    text.replace('\'', "").parse().ok()
}
