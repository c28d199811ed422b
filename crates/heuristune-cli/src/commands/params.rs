//! `heuristune params`: schema inspection and editing

use super::load_config;
use crate::args::{KindArg, ParamsAction};
use crate::console::CliConsole;
use anyhow::{Context, anyhow, bail};
use colored::*;
use heuristune_core::schema::{
    ParamKind, ParamValue, ParameterSchema, ParameterSpec, extract_params, parse_value,
};
use std::path::Path;

pub fn run(config_path: &Path, action: ParamsAction) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let config = load_config(config_path)?;
    let schema_path = config.params_path();

    match action {
        ParamsAction::Show => {
            if !schema_path.is_file() {
                console.warn(&format!(
                    "No schema at {} (try `heuristune params extract`)",
                    schema_path.display()
                ));
                return Ok(());
            }
            let schema = ParameterSchema::load(&schema_path)?;
            print_schema(&schema);
        }
        ParamsAction::Add {
            name,
            kind,
            lower,
            upper,
            value,
            fixed,
            log,
        } => {
            let mut schema = load_or_empty(&schema_path)?;
            let spec = build_spec(&name, kind, &lower, &upper, &value, fixed, log)?;
            schema.upsert(spec)?;
            schema.save(&schema_path)?;
            console.success(&format!("Saved {} to {}", name, schema_path.display()));
        }
        ParamsAction::Remove { name } => {
            let mut schema = ParameterSchema::load(&schema_path)?;
            if !schema.remove(&name) {
                bail!("No parameter named {}", name);
            }
            schema.save(&schema_path)?;
            console.success(&format!("Removed {}", name));
        }
        ParamsAction::Extract { force } => {
            if schema_path.exists() && !force {
                bail!(
                    "{} already exists (pass --force to overwrite)",
                    schema_path.display()
                );
            }
            let source_path = config.source_path();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("Failed to read {}", source_path.display()))?;
            let schema = extract_params(&source)?;
            schema.save(&schema_path)?;
            console.success(&format!(
                "Extracted {} parameters from {}",
                schema.len(),
                source_path.display()
            ));
        }
    }
    Ok(())
}

fn load_or_empty(path: &Path) -> anyhow::Result<ParameterSchema> {
    if path.is_file() {
        Ok(ParameterSchema::load(path)?)
    } else {
        Ok(ParameterSchema::new(Vec::new())?)
    }
}

fn build_spec(
    name: &str,
    kind: KindArg,
    lower: &str,
    upper: &str,
    value: &str,
    fixed: bool,
    log: bool,
) -> anyhow::Result<ParameterSpec> {
    let is_float = matches!(kind, KindArg::Float);
    let parse = |text: &str| {
        parse_value(is_float, text)
            .ok_or_else(|| anyhow!("'{}' is not a valid {:?} value", text, kind))
    };

    let spec = match (parse(lower)?, parse(upper)?, parse(value)?) {
        (ParamValue::Int(lo), ParamValue::Int(hi), ParamValue::Int(v)) => {
            if log {
                bail!("--log applies to float parameters only");
            }
            ParameterSpec::int(name, lo, hi, v)
        }
        (lo, hi, v) => {
            let spec = ParameterSpec::float(name, lo.as_f64(), hi.as_f64(), v.as_f64());
            if log { spec.log_scale() } else { spec }
        }
    };
    Ok(if fixed { spec.fixed() } else { spec })
}

fn print_schema(schema: &ParameterSchema) {
    println!(
        "{:<24} {:<6} {:>12} {:>12} {:>12}  {}",
        "NAME", "TYPE", "LOWER", "UPPER", "VALUE", "FLAGS"
    );
    println!("{:-<80}", "");
    for spec in schema.params() {
        let (kind, lower, upper, log) = match spec.kind {
            ParamKind::Int { lower, upper, .. } => {
                ("int", lower.to_string(), upper.to_string(), false)
            }
            ParamKind::Float {
                lower, upper, log, ..
            } => ("float", lower.to_string(), upper.to_string(), log),
        };
        let mut flags = Vec::new();
        if !spec.searchable {
            flags.push("fixed");
        }
        if log {
            flags.push("log");
        }
        let name = format!("{:<24}", spec.name);
        let name = if spec.searchable {
            name.normal()
        } else {
            name.dimmed()
        };
        println!(
            "{} {:<6} {:>12} {:>12} {:>12}  {}",
            name,
            kind,
            lower,
            upper,
            spec.default_value().to_string(),
            flags.join(",")
        );
    }
    if let Some(score) = schema.best_score() {
        println!("\nBest score: {}", heuristune_core::report::format_score(score));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("heuristune.toml");
        heuristune_core::TunerConfig::new(heuristune_core::Direction::Maximize, 1000)
            .save(&config_path)
            .unwrap();
        (dir, config_path)
    }

    fn add(
        config_path: &Path,
        name: &str,
        kind: KindArg,
        bounds: [&str; 3],
        fixed: bool,
        log: bool,
    ) -> anyhow::Result<()> {
        run(
            config_path,
            ParamsAction::Add {
                name: name.to_string(),
                kind,
                lower: bounds[0].to_string(),
                upper: bounds[1].to_string(),
                value: bounds[2].to_string(),
                fixed,
                log,
            },
        )
    }

    #[test]
    fn test_add_replace_and_remove() {
        let (dir, config_path) = setup();
        let schema_path = dir.path().join("params.json");

        add(&config_path, "iters", KindArg::Int, ["1", "100", "10"], false, false).unwrap();
        add(&config_path, "temp", KindArg::Float, ["0.01", "10", "1"], true, true).unwrap();
        add(&config_path, "iters", KindArg::Int, ["1", "500", "250"], false, false).unwrap();

        let schema = ParameterSchema::load(&schema_path).unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.get("iters").unwrap().default_value(), ParamValue::Int(250));
        let temp = schema.get("temp").unwrap();
        assert!(!temp.searchable);
        assert!(matches!(temp.kind, ParamKind::Float { log: true, .. }));

        run(&config_path, ParamsAction::Remove { name: "temp".into() }).unwrap();
        assert_eq!(ParameterSchema::load(&schema_path).unwrap().len(), 1);
        assert!(run(&config_path, ParamsAction::Remove { name: "temp".into() }).is_err());
    }

    #[test]
    fn test_add_validates_like_load() {
        let (dir, config_path) = setup();
        assert!(add(&config_path, "a", KindArg::Int, ["10", "1", "5"], false, false).is_err());
        assert!(add(&config_path, "a", KindArg::Int, ["1", "10", "1.5"], false, false).is_err());
        assert!(add(&config_path, "a", KindArg::Int, ["1", "10", "5"], false, true).is_err());
        assert!(add(&config_path, "b", KindArg::Float, ["0", "1", "0.5"], false, true).is_err());
        assert!(!dir.path().join("params.json").exists());
    }

    #[test]
    fn test_extract_refuses_to_overwrite() {
        let (dir, config_path) = setup();
        std::fs::write(
            dir.path().join("main.cpp"),
            "HP_PARAM(int, DEPTH, 8, 1, 32);\nHP_PARAM(double, T0, 1.5, 0.1, 9.0);\n",
        )
        .unwrap();

        run(&config_path, ParamsAction::Extract { force: false }).unwrap();
        let schema = ParameterSchema::load(dir.path().join("params.json")).unwrap();
        assert_eq!(schema.len(), 2);
        assert!(schema.get("T0").unwrap().is_float());

        assert!(run(&config_path, ParamsAction::Extract { force: false }).is_err());
        run(&config_path, ParamsAction::Extract { force: true }).unwrap();
    }
}
