//! Document loading from files and strings.
//!
//! Handles JSON and YAML sources, inlining of external file `$ref`s and
//! JSON Pointer navigation for internal ones.

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::DocumentError;

/// Load a document from a file path.
///
/// `.json` files are parsed as JSON, `.yaml`/`.yml` as YAML; anything else is
/// tried as JSON first, then YAML.
///
/// # Errors
///
/// Returns `DocumentError::FileNotFound` if the file doesn't exist, or a
/// parse error if the content is neither valid JSON nor YAML.
pub fn load_document(path: &Path) -> Result<Value, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| DocumentError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => parse_json(&content),
        Some("yaml") | Some("yml") => parse_yaml(&content),
        _ => load_document_str(&content),
    }
}

/// Load a document from a JSON or YAML string.
///
/// # Errors
///
/// Returns the YAML parse error when the content is neither format.
pub fn load_document_str(content: &str) -> Result<Value, DocumentError> {
    if content.trim_start().starts_with('{') {
        if let Ok(value) = parse_json(content) {
            return Ok(value);
        }
    }
    parse_yaml(content)
}

fn parse_json(content: &str) -> Result<Value, DocumentError> {
    serde_json::from_str(content).map_err(|source| DocumentError::InvalidJson { source })
}

fn parse_yaml(content: &str) -> Result<Value, DocumentError> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|source| DocumentError::InvalidYaml { source })?;
    Ok(yaml_to_json(yaml))
}

/// Convert YAML into JSON, stringifying non-string keys such as status codes.
pub(crate) fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (k, v) in mapping {
                let key = match k {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => match yaml_to_json(other) {
                        Value::String(s) => s,
                        v => v.to_string(),
                    },
                };
                map.insert(key, yaml_to_json(v));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Navigate a JSON Pointer fragment (e.g., "#/components/schemas/Pet").
///
/// The fragment should start with '#'. Returns `None` when any segment is
/// missing.
pub fn navigate_fragment<'a>(root: &'a Value, fragment: &str) -> Option<&'a Value> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            other => other.get(&key)?,
        };
    }
    Some(current)
}

/// Recursively inline external `$ref` pointers.
///
/// Walks the document, loads files referenced by relative path
/// (`common.yaml#/components/schemas/Error`) and replaces the `$ref` node with
/// the target content. Internal refs (`#/...`) in the root document are left
/// for the normalizer; internal refs inside loaded files are resolved against
/// that file.
///
/// # Errors
///
/// Returns `DocumentError::CircularRef` when external files reference each
/// other in a cycle, and load errors for missing or malformed files.
pub fn bundle_refs(document: &mut Value, base_dir: &Path) -> Result<(), DocumentError> {
    bundle_refs_inner(document, base_dir, None, &mut HashSet::new())
}

fn bundle_refs_inner(
    node: &mut Value,
    base_dir: &Path,
    file_root: Option<&Value>, // Root of external file for resolving internal refs
    visited: &mut HashSet<String>,
) -> Result<(), DocumentError> {
    match node {
        Value::Object(obj) => {
            if let Some(ref_val) = obj.get("$ref").and_then(|v| v.as_str()).map(String::from) {
                if ref_val.starts_with('#') {
                    // Internal ref in the root document: left for the normalizer
                    let Some(root) = file_root else {
                        return Ok(());
                    };
                    if visited.contains(&ref_val) {
                        return Err(DocumentError::CircularRef { reference: ref_val });
                    }
                    let mut target = navigate_fragment(root, &ref_val).cloned().ok_or_else(|| {
                        DocumentError::RefNotFound {
                            reference: ref_val.clone(),
                        }
                    })?;
                    visited.insert(ref_val.clone());
                    bundle_refs_inner(&mut target, base_dir, file_root, visited)?;
                    visited.remove(&ref_val);
                    inline_target(obj, target);
                    return Ok(());
                }

                let (file_part, fragment) = match ref_val.find('#') {
                    Some(idx) => (&ref_val[..idx], Some(&ref_val[idx..])),
                    None => (ref_val.as_str(), None),
                };

                let ref_path = base_dir.join(file_part);
                let canonical = ref_path.canonicalize().unwrap_or(ref_path.clone());
                let visit_key = format!("{}|{}", canonical.display(), fragment.unwrap_or(""));

                if visited.contains(&visit_key) {
                    return Err(DocumentError::CircularRef {
                        reference: ref_val.clone(),
                    });
                }

                // Load file - this becomes the new file_root for internal refs
                let loaded = load_document(&ref_path)?;
                let mut target = match fragment {
                    Some(frag) => navigate_fragment(&loaded, frag).cloned().ok_or_else(|| {
                        DocumentError::RefNotFound {
                            reference: ref_val.clone(),
                        }
                    })?,
                    None => loaded.clone(),
                };

                visited.insert(visit_key.clone());
                let ref_dir = ref_path.parent().unwrap_or(base_dir);
                bundle_refs_inner(&mut target, ref_dir, Some(&loaded), visited)?;
                visited.remove(&visit_key);

                inline_target(obj, target);
                return Ok(());
            }

            for value in obj.values_mut() {
                bundle_refs_inner(value, base_dir, file_root, visited)?;
            }
        }
        Value::Array(arr) => {
            for item in arr {
                bundle_refs_inner(item, base_dir, file_root, visited)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Replace a `$ref` node with the target, keeping sibling keys.
fn inline_target(obj: &mut Map<String, Value>, target: Value) {
    obj.remove("$ref");
    if let Value::Object(ref_obj) = target {
        for (k, v) in ref_obj {
            obj.entry(k).or_insert(v);
        }
    }
}
