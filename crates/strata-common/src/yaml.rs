//! YAML loading for template config files and rendered manifests
//!
//! Both entry points take a `source` label (usually a file name) that
//! prefixes every error, and produce `serde_json::Value`s ready for
//! `UpgradeConfig` or `DynamicObject` deserialization.

use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

use crate::Error;

/// Load the first document of `input`; empty input yields `Value::Null`.
pub fn parse_document(source: &str, input: &str) -> Result<Value, Error> {
    load(source, input)?
        .into_iter()
        .next()
        .map_or(Ok(Value::Null), |doc| to_json(source, doc))
}

/// Load every non-empty document of a multi-document stream.
///
/// Documents that are empty or explicitly `null` (such as a trailing
/// `---`, or a template branch that rendered nothing) are dropped.
pub fn parse_manifests(source: &str, input: &str) -> Result<Vec<Value>, Error> {
    let mut manifests = Vec::new();
    for doc in load(source, input)? {
        if matches!(doc, Yaml::Null) {
            continue;
        }
        manifests.push(to_json(source, doc)?);
    }
    Ok(manifests)
}

fn load(source: &str, input: &str) -> Result<Vec<Yaml>, Error> {
    YamlLoader::load_from_str(input)
        .map_err(|e| Error::serialization(format!("{}: invalid YAML: {}", source, e)))
}

fn to_json(source: &str, node: Yaml) -> Result<Value, Error> {
    let value = match node {
        Yaml::Null => Value::Null,
        Yaml::Boolean(b) => Value::Bool(b),
        Yaml::Integer(i) => Value::from(i),
        Yaml::String(s) => Value::String(s),
        Yaml::Real(repr) => {
            let parsed = repr.parse::<f64>().ok().and_then(Number::from_f64);
            match parsed {
                Some(n) => Value::Number(n),
                None => return Err(unsupported(source, format!("float `{}`", repr))),
            }
        }
        Yaml::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| to_json(source, item))
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Hash(entries) => {
            let mut object = Map::with_capacity(entries.len());
            for (key, item) in entries {
                object.insert(key_string(source, key)?, to_json(source, item)?);
            }
            Value::Object(object)
        }
        Yaml::Alias(_) => return Err(unsupported(source, "alias")),
        Yaml::BadValue => return Err(unsupported(source, "malformed value")),
    };
    Ok(value)
}

/// JSON object keys are strings; scalar YAML keys are stringified
fn key_string(source: &str, key: Yaml) -> Result<String, Error> {
    match key {
        Yaml::String(s) | Yaml::Real(s) => Ok(s),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Boolean(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        _ => Err(unsupported(source, "non-scalar mapping key")),
    }
}

fn unsupported(source: &str, what: impl std::fmt::Display) -> Error {
    Error::serialization(format!("{}: unsupported YAML {}", source, what))
}
