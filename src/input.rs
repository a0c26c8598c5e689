//! Desired-state input: files, stdin or inline JSON.

use crate::cli::DataArgs;
use crate::paths;
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::fs;
use std::io::{self, Read};
use std::path::Path;

/// Parse a value given inline as JSON or as a path to a JSON/TOML file.
pub fn value(source: &str, what: &str) -> Result<Value> {
    let trimmed = source.trim();
    if trimmed == "-" {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .with_context(|| format!("Failed to read {what} from stdin"))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {what} from stdin as JSON"));
    }
    if trimmed.starts_with(['{', '[', '"']) {
        return serde_json::from_str(trimmed)
            .with_context(|| format!("Failed to parse {what} as JSON"));
    }

    let path = paths::expand(trimmed);
    if path.is_file() {
        return from_file(&path, what);
    }
    serde_json::from_str(trimmed).with_context(|| {
        format!("{what} is neither valid JSON nor an existing file: {trimmed}")
    })
}

fn from_file(path: &Path, what: &str) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {what}: {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        let parsed: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML {what}: {}", path.display()))?;
        serde_json::to_value(parsed).context("TOML value has no JSON form")
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON {what}: {}", path.display()))
    }
}

/// Parse an optional argument with [`value`].
pub fn optional(source: Option<&str>, what: &str) -> Result<Option<Value>> {
    source.map(|source| value(source, what)).transpose()
}

/// The desired-state document, with `--name`/`--uri` folded in.
///
/// `name_key` is the kind's natural key; `--name` fills it unless the
/// document already sets it.
pub fn document(args: &DataArgs, name_key: &str) -> Result<Map<String, Value>> {
    let mut data = match optional(args.data.as_deref(), "data")? {
        None => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => bail!("data must be a mapping, got {other}"),
    };
    if let Some(name) = &args.name {
        data.entry(name_key.to_string())
            .or_insert_with(|| Value::String(name.clone()));
    }
    if let Some(uri) = &args.uri {
        data.insert("uri".to_string(), Value::String(uri.clone()));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn args(data: Option<&str>, name: Option<&str>) -> DataArgs {
        DataArgs {
            data: data.map(str::to_string),
            name: name.map(str::to_string),
            uri: None,
        }
    }

    #[test]
    fn test_inline_json() {
        let data = document(&args(Some(r#"{"name": "net1", "vlanId": 10}"#), None), "name").unwrap();
        assert_eq!(data["vlanId"], json!(10));
    }

    #[test]
    fn test_name_flag_fills_natural_key() {
        let data = document(&args(None, Some("10.0.0.1")), "destinationAddress").unwrap();
        assert_eq!(data["destinationAddress"], json!("10.0.0.1"));

        let explicit = document(&args(Some(r#"{"name": "a"}"#), Some("b")), "name").unwrap();
        assert_eq!(explicit["name"], json!("a"));
    }

    #[test]
    fn test_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("net.toml");
        fs::write(&path, "name = \"net1\"\nfabricType = \"FabricAttach\"\n").unwrap();
        let data = document(&args(path.to_str(), None), "name").unwrap();
        assert_eq!(data["fabricType"], json!("FabricAttach"));
    }

    #[test]
    fn test_non_mapping_rejected() {
        assert!(document(&args(Some("[1, 2]"), None), "name").is_err());
        assert!(value("not json", "params").is_err());
    }
}
