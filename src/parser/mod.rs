use anyhow::{Context, Result};
use serde_json::Value;

use crate::processor::symbol::{Bindings, Symbol};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LoadError {
    #[error("bindings document must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("number at `{0}` does not fit a 64-bit float")]
    BadNumber(String),
}

/// Parse a JSON document into a binding table.
///
/// The top level must be an object. Nested values map as:
///   • object  → `Symbol::Object`
///   • array   → `Symbol::Object` keyed `"0"`, `"1"`, …
///   • number / string / bool → the matching scalar
///   • null    → skipped, so `[path?]` sees it as absent
pub fn load_bindings(json: &str) -> Result<Bindings> {
    let root: Value = serde_json::from_str(json).with_context(|| "Parsing bindings JSON")?;
    bindings_from_value(&root)
}

pub fn bindings_from_value(root: &Value) -> Result<Bindings> {
    let Value::Object(members) = root else {
        return Err(LoadError::NotAnObject(json_type(root)).into());
    };

    let mut bindings = Bindings::new();
    for (name, value) in members {
        if let Some(symbol) = to_symbol(name, value)? {
            bindings.insert(name.as_str(), symbol);
        }
    }
    Ok(bindings)
}

fn to_symbol(path: &str, value: &Value) -> Result<Option<Symbol>, LoadError> {
    Ok(match value {
        Value::Null => None,
        Value::Bool(b) => Some(Symbol::Boolean(*b)),
        Value::Number(n) => Some(Symbol::Number(
            n.as_f64().ok_or_else(|| LoadError::BadNumber(path.to_string()))?,
        )),
        Value::String(s) => Some(Symbol::String(s.clone())),
        Value::Object(members) => Some(children(
            path,
            members.iter().map(|(k, v)| (k.clone(), v)),
        )?),
        Value::Array(items) => Some(children(
            path,
            items.iter().enumerate().map(|(i, v)| (i.to_string(), v)),
        )?),
    })
}

// serde_json caps nesting at 128 levels, so plain recursion is fine here.
fn children<'v>(
    path: &str,
    members: impl Iterator<Item = (String, &'v Value)>,
) -> Result<Symbol, LoadError> {
    let mut built = Vec::new();
    for (key, value) in members {
        if let Some(symbol) = to_symbol(&format!("{path}.{key}"), value)? {
            built.push((key, symbol));
        }
    }
    Ok(Symbol::object(built))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
