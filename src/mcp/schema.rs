//! Published-schema preparation.
//!
//! Tool schemas may use `$ref`/`$defs` internally; by default the
//! published form is fully dereferenced so clients without resolver
//! support can consume it. Excluded arguments are stripped from the
//! published input schema while the full argument object still reaches
//! the handler.

use serde_json::{Map, Value};

/// Maximum `$ref` expansion depth.
///
/// Guards against cyclic definitions; a cycle leaves the unresolved
/// `$ref` in place once the budget is exhausted.
const MAX_REF_DEPTH: usize = 32;

/// Fully dereferences `#/$defs/...` references and drops the `$defs` table.
///
/// Unknown or external references are left untouched.
#[must_use]
pub fn dereference(schema: &Value) -> Value {
    let defs = schema.get("$defs").and_then(Value::as_object).cloned();
    let mut result = expand(schema, defs.as_ref(), 0);
    if let Some(obj) = result.as_object_mut() {
        obj.remove("$defs");
    }
    result
}

fn expand(value: &Value, defs: Option<&Map<String, Value>>, depth: usize) -> Value {
    if depth >= MAX_REF_DEPTH {
        return value.clone();
    }
    match value {
        Value::Object(obj) => {
            if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
                if let Some(resolved) = resolve_local(reference, defs) {
                    let mut expanded = expand(resolved, defs, depth + 1);
                    // Sibling keys of $ref (title, description) overlay the
                    // resolved target.
                    if let Some(target) = expanded.as_object_mut() {
                        for (key, val) in obj {
                            if key != "$ref" {
                                target.insert(key.clone(), expand(val, defs, depth + 1));
                            }
                        }
                    }
                    return expanded;
                }
            }
            let mut out = Map::with_capacity(obj.len());
            for (key, val) in obj {
                out.insert(key.clone(), expand(val, defs, depth + 1));
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| expand(v, defs, depth + 1)).collect())
        }
        other => other.clone(),
    }
}

fn resolve_local<'a>(reference: &str, defs: Option<&'a Map<String, Value>>) -> Option<&'a Value> {
    let name = reference.strip_prefix("#/$defs/")?;
    defs?.get(name)
}

/// Removes excluded argument names from a published input schema's
/// `properties` and `required` lists.
#[must_use]
pub fn strip_excluded_args(schema: &Value, excluded: &[String]) -> Value {
    if excluded.is_empty() {
        return schema.clone();
    }
    let mut schema = schema.clone();
    if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        for name in excluded {
            properties.remove(name);
        }
    }
    if let Some(required) = schema.get_mut("required").and_then(Value::as_array_mut) {
        required.retain(|entry| match entry.as_str() {
            Some(name) => !excluded.iter().any(|e| e == name),
            None => true,
        });
    }
    schema
}
