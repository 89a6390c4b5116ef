//! CLI tool for merging QBR report fields into PowerPoint templates.

use anyhow::{bail, Context, Result};
use clap::Parser;
use qbr_core::{FieldMap, SubstitutionPolicy};
use qbr_pptx::TemplateMerger;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Fill `{{placeholders}}` in a PPTX template from a JSON field file.
#[derive(Parser, Debug)]
#[command(name = "qbr-merge")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Template presentation (.pptx)
    template: PathBuf,

    /// JSON file with the report fields (bare object or {"qbr_data": {...}})
    #[arg(short, long)]
    data: PathBuf,

    /// Output file or directory (default: <template>-merged.pptx beside the template)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Placeholder matching for shape text: whole-text or per-run
    #[arg(long, default_value = "whole-text")]
    policy: SubstitutionPolicy,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let template = std::fs::read(&args.template)
        .with_context(|| format!("Failed to open {}", args.template.display()))?;
    let data = std::fs::read_to_string(&args.data)
        .with_context(|| format!("Failed to read {}", args.data.display()))?;
    let fields = parse_fields(&data)
        .with_context(|| format!("Invalid field file {}", args.data.display()))?;

    if args.verbose {
        eprintln!("Processing: {}", args.template.display());
        eprintln!("  {} fields loaded", fields.len());
    }

    let merger = TemplateMerger::new().with_policy(args.policy);
    let today = chrono::Local::now().date_naive();
    let output = merger
        .merge_bytes(&template, &fields, today)
        .with_context(|| format!("Failed to merge {}", args.template.display()))?;

    let output_path = get_output_path(&args.template, args.output.as_deref())?;
    std::fs::write(&output_path, &output.bytes)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    if args.verbose {
        eprintln!("  {}", output.stats);
        eprintln!("  {} replacement tokens", output.table.len());
        eprintln!("Written to: {}", output_path.display());
    }

    Ok(())
}

/// Read the field map from a bare JSON object or a `qbr_data` envelope.
fn parse_fields(data: &str) -> Result<FieldMap> {
    let value: Value = serde_json::from_str(data).context("Field file is not valid JSON")?;
    let Value::Object(mut map) = value else {
        bail!("Field file must contain a JSON object");
    };

    match map.remove("qbr_data") {
        Some(Value::Object(inner)) => Ok(inner),
        Some(Value::Null) => Ok(FieldMap::new()),
        Some(other) => {
            // Not an envelope: a plain field that happens to be named qbr_data.
            map.insert("qbr_data".to_string(), other);
            Ok(map)
        }
        None => Ok(map),
    }
}

/// Determine the output path for a merged deck.
fn get_output_path(template: &Path, output: Option<&Path>) -> Result<PathBuf> {
    let stem = template
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let output_filename = format!("{}-merged.pptx", stem);

    let output_path = match output {
        Some(path) if path.is_dir() => path.join(output_filename),
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory: {}", parent.display())
                })?;
            }
            path.to_path_buf()
        }
        None => match template.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        },
    };

    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_bare_object() {
        let fields = parse_fields(r#"{"Client": "Acme", "Revenue": 1200}"#).unwrap();
        assert_eq!(fields.get("Client"), Some(&json!("Acme")));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_parse_envelope() {
        let fields =
            parse_fields(r#"{"pptx_binary": "ignored", "qbr_data": {"Period": "Q3"}}"#).unwrap();
        assert_eq!(fields.get("Period"), Some(&json!("Q3")));
        assert_eq!(fields.len(), 1);

        let empty = parse_fields(r#"{"qbr_data": null}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_objects() {
        assert!(parse_fields("[1, 2]").is_err());
        assert!(parse_fields("not json").is_err());
    }

    #[test]
    fn test_default_output_path() {
        let path = get_output_path(Path::new("decks/q3 template.pptx"), None).unwrap();
        assert_eq!(path, PathBuf::from("decks/q3 template-merged.pptx"));

        let path = get_output_path(Path::new("template.pptx"), None).unwrap();
        assert_eq!(path, PathBuf::from("template-merged.pptx"));
    }

    #[test]
    fn test_explicit_output_file() {
        let path = get_output_path(Path::new("t.pptx"), Some(Path::new("out.pptx"))).unwrap();
        assert_eq!(path, PathBuf::from("out.pptx"));
    }

    #[test]
    fn test_output_directory() {
        let dir = std::env::temp_dir();
        let path = get_output_path(Path::new("t.pptx"), Some(&dir)).unwrap();
        assert_eq!(path, dir.join("t-merged.pptx"));
    }
}
