//! Raw schema normalization.
//!
//! Turns raw OpenAPI/JSON-Schema fragments (as found in the document tree)
//! into canonical [`Schema`] nodes:
//!
//! - internal `$ref`s are followed against the document root
//! - `allOf` members and one representative each of `anyOf`/`oneOf` are folded
//!   into a single node, repeatedly, until no combinator is left
//! - branches deeper than `maxLevels` or repeating a `$ref` more than
//!   `maxRecursionLevels` times are cut (normalize to `None`)
//! - `additionalProperties` is expanded into `extra-N` properties
//!
//! Normalization never fails; anything it cannot resolve is simply absent.

use std::collections::HashMap;

use serde_json::{Map, Value as JsonValue};

use crate::loader::navigate_fragment;
use crate::schema::Schema;
use crate::types::{ParseConfig, SchemaType};
use crate::value::Value;

/// Sentinel appended to the ref path when expanding `additionalProperties`.
pub const ADDITIONAL_PROPERTIES: &str = "additionalProperties";

/// Default number of synthesized `additionalProperties` entries.
const DEFAULT_EXTRA_PROPERTIES: u64 = 3;

/// Upper bound on combinator folding passes for a single node.
const MAX_MERGE_PASSES: usize = 64;

/// Upper bound on `$ref` → `$ref` hops for a single node.
const MAX_REF_HOPS: usize = 32;

const COMBINATORS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

type RawMap = Map<String, JsonValue>;

/// Normalize `raw`, resolving internal references against `root`.
pub fn normalize(raw: &JsonValue, root: &JsonValue, config: &ParseConfig) -> Option<Schema> {
    Normalizer::new(root, *config).normalize_at(raw, &[], &[])
}

/// Normalizes raw schemas of one document under one [`ParseConfig`].
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    root: &'a JsonValue,
    config: ParseConfig,
}

impl<'a> Normalizer<'a> {
    pub fn new(root: &'a JsonValue, config: ParseConfig) -> Self {
        Self { root, config }
    }

    /// Normalize a raw node reached through `ref_path` and `name_path`.
    pub fn normalize_at(
        &self,
        raw: &JsonValue,
        ref_path: &[String],
        name_path: &[String],
    ) -> Option<Schema> {
        if self.config.max_levels > 0 && name_path.len() > self.config.max_levels {
            tracing::debug!(path = %name_path.join("."), "schema deeper than maxLevels");
            return None;
        }

        let (node, own_ref) = self.deref(raw)?;
        let (merged, merged_ref) = self.merge_combinators(node);

        let mut ref_path = ref_path.to_vec();
        if let Some(r) = own_ref.or(merged_ref) {
            ref_path.push(r);
        }
        if max_repetition(&ref_path) > self.config.max_recursion_levels {
            tracing::debug!(
                refs = %ref_path.join(" -> "),
                "recursive reference exceeds maxRecursionLevels"
            );
            return None;
        }

        self.build(&merged, &ref_path, name_path)
    }

    /// Follow `$ref` chains. Returns the target node and the first ref seen.
    ///
    /// Keys next to a `$ref` override the target's.
    fn deref(&self, raw: &JsonValue) -> Option<(RawMap, Option<String>)> {
        let mut node = match raw {
            JsonValue::Object(map) => map.clone(),
            JsonValue::Bool(true) => RawMap::new(),
            _ => return None,
        };
        let mut first_ref = None;

        for _ in 0..MAX_REF_HOPS {
            let Some(reference) = node.get("$ref").and_then(JsonValue::as_str).map(String::from)
            else {
                return Some((node, first_ref));
            };
            let Some(JsonValue::Object(target)) = resolve_ref(self.root, &reference) else {
                tracing::debug!(reference = %reference, "unresolvable reference");
                return None;
            };

            node.remove("$ref");
            let mut resolved = target.clone();
            for (k, v) in node {
                resolved.insert(k, v);
            }
            node = resolved;
            first_ref.get_or_insert(reference);
        }

        tracing::debug!(reference = ?first_ref, "reference chain too long");
        None
    }

    /// Fold combinators into one node. Returns the node and the first `$ref`
    /// carried by a folded member.
    fn merge_combinators(&self, mut node: RawMap) -> (RawMap, Option<String>) {
        let mut merged_ref = None;

        for _ in 0..MAX_MERGE_PASSES {
            if !COMBINATORS.iter().any(|c| node.contains_key(*c)) {
                break;
            }

            let mut members: Vec<&JsonValue> = Vec::new();
            let mut has_all_of = false;
            if let Some(JsonValue::Array(all)) = node.get("allOf") {
                has_all_of = !all.is_empty();
                members.extend(all.iter());
            }
            for key in ["anyOf", "oneOf"] {
                if let Some(JsonValue::Array(choices)) = node.get(key) {
                    if let Some(pick) = pick_representative(choices) {
                        members.push(pick);
                    }
                }
            }

            let mut resolved = Vec::with_capacity(members.len());
            for member in members {
                if let Some((map, r)) = self.deref(member) {
                    if merged_ref.is_none() {
                        merged_ref = r;
                    }
                    resolved.push(map);
                }
            }

            for key in COMBINATORS {
                node.remove(key);
            }
            let implied = if has_all_of {
                SchemaType::Object
            } else {
                resolved.first().map_or(SchemaType::Object, member_type)
            };
            node = fold(node, resolved, implied);
        }

        (node, merged_ref)
    }

    fn build(&self, node: &RawMap, ref_path: &[String], name_path: &[String]) -> Option<Schema> {
        let (declared_type, type_allows_null) = declared_type(node);
        let schema_type = declared_type.unwrap_or_else(|| infer_type(node));

        let mut schema = Schema {
            schema_type,
            nullable: type_allows_null || flag(node, "nullable"),
            read_only: flag(node, "readOnly"),
            write_only: flag(node, "writeOnly"),
            deprecated: flag(node, "deprecated"),
            format: node.get("format").and_then(JsonValue::as_str).map(String::from),
            pattern: node.get("pattern").and_then(JsonValue::as_str).map(String::from),
            default: node.get("default").map(Value::from),
            example: node.get("example").map(Value::from),
            examples: node
                .get("examples")
                .and_then(JsonValue::as_array)
                .map(|items| items.iter().map(Value::from).collect())
                .unwrap_or_default(),
            enum_values: node
                .get("enum")
                .and_then(JsonValue::as_array)
                .map(|items| items.iter().map(Value::from).collect())
                .unwrap_or_default(),
            minimum: number(node, "minimum"),
            maximum: number(node, "maximum"),
            multiple_of: number(node, "multipleOf"),
            min_length: unsigned(node, "minLength"),
            max_length: unsigned(node, "maxLength"),
            min_items: unsigned(node, "minItems"),
            max_items: unsigned(node, "maxItems"),
            min_properties: unsigned(node, "minProperties"),
            max_properties: unsigned(node, "maxProperties"),
            required: required_list(node),
            ..Schema::default()
        };

        // 3.0 uses boolean exclusive bounds, 3.1 numeric ones
        match node.get("exclusiveMinimum") {
            Some(JsonValue::Bool(true)) => schema.exclusive_minimum = schema.minimum.take(),
            Some(v) => schema.exclusive_minimum = v.as_f64(),
            None => {}
        }
        match node.get("exclusiveMaximum") {
            Some(JsonValue::Bool(true)) => schema.exclusive_maximum = schema.maximum.take(),
            Some(v) => schema.exclusive_maximum = v.as_f64(),
            None => {}
        }

        if let Some(JsonValue::Object(properties)) = node.get("properties") {
            for (name, raw_property) in properties {
                if self.config.only_required && !schema.is_required(name) {
                    continue;
                }
                let child_names = extend(name_path, name);
                if let Some(property) = self.normalize_at(raw_property, ref_path, &child_names) {
                    schema.properties.insert(name.clone(), property);
                }
            }
        }

        if let Some(additional) = node.get("additionalProperties") {
            self.add_extra_properties(&mut schema, additional, ref_path, name_path);
        }

        if schema.schema_type == SchemaType::Array {
            match node.get("items") {
                Some(raw_items) => {
                    let items = self.normalize_at(raw_items, ref_path, name_path)?;
                    schema.items = Some(Box::new(items));
                }
                None => schema.items = Some(Box::new(Schema::string())),
            }
        }

        if let Some(raw_not) = node.get("not") {
            if let Some(mut not) = self.normalize_at(raw_not, ref_path, name_path) {
                not.schema_type = SchemaType::Object;
                schema.not = Some(Box::new(not));
            }
        }

        Some(schema)
    }

    fn add_extra_properties(
        &self,
        schema: &mut Schema,
        additional: &JsonValue,
        ref_path: &[String],
        name_path: &[String],
    ) {
        let template = match additional {
            JsonValue::Bool(true) => None,
            JsonValue::Object(_) => Some(additional),
            _ => return,
        };

        let count = match schema.min_properties {
            Some(min) if min > 0 => min.max(DEFAULT_EXTRA_PROPERTIES),
            _ => DEFAULT_EXTRA_PROPERTIES,
        };
        let extra_refs = extend(ref_path, ADDITIONAL_PROPERTIES);

        for i in 1..=count {
            let name = format!("extra-{i}");
            let property = match template {
                Some(raw) => self.normalize_at(raw, &extra_refs, &extend(name_path, &name)),
                None => Some(Schema::string()),
            };
            if let Some(property) = property {
                schema.properties.insert(name, property);
            }
        }
    }
}

/// Resolve an internal `#/...` reference.
fn resolve_ref<'r>(root: &'r JsonValue, reference: &str) -> Option<&'r JsonValue> {
    if !reference.starts_with('#') {
        return None;
    }
    navigate_fragment(root, reference)
}

/// Prefer the first member carrying a `$ref`, else the first member.
fn pick_representative(choices: &[JsonValue]) -> Option<&JsonValue> {
    choices
        .iter()
        .find(|c| c.get("$ref").is_some())
        .or_else(|| choices.first())
}

/// Fold members into `base` as a node of type `implied`. Properties from
/// later members overwrite earlier ones, `required` is unioned, and every
/// other keyword is taken from the first node that has it.
fn fold(base: RawMap, members: Vec<RawMap>, implied: SchemaType) -> RawMap {
    let mut properties = RawMap::new();
    let mut required: Vec<JsonValue> = Vec::new();
    let mut out = RawMap::new();

    for part in std::iter::once(base).chain(members) {
        for (key, value) in part {
            match key.as_str() {
                "properties" => {
                    if let JsonValue::Object(props) = value {
                        properties.extend(props);
                    }
                }
                "required" => {
                    if let JsonValue::Array(names) = value {
                        for name in names {
                            if !required.contains(&name) {
                                required.push(name);
                            }
                        }
                    }
                }
                _ => {
                    out.entry(key).or_insert(value);
                }
            }
        }
    }

    if declared_type(&out).1 {
        out.insert("nullable".into(), JsonValue::Bool(true));
    }
    out.insert("type".into(), JsonValue::from(implied.as_str()));
    if !properties.is_empty() {
        out.insert("properties".into(), JsonValue::Object(properties));
    }
    if !required.is_empty() {
        out.insert("required".into(), JsonValue::Array(required));
    }
    out
}

/// Declared type and whether `null` is among the declared types.
fn declared_type(node: &RawMap) -> (Option<SchemaType>, bool) {
    match node.get("type") {
        Some(JsonValue::String(s)) => (SchemaType::parse(s), s == "null"),
        Some(JsonValue::Array(types)) => {
            let names: Vec<&str> = types.iter().filter_map(JsonValue::as_str).collect();
            let first = names.iter().find_map(|name| SchemaType::parse(name));
            (first, names.contains(&"null"))
        }
        _ => (None, false),
    }
}

/// Type of a picked `anyOf`/`oneOf` member: its declared type, `array`
/// when it only carries `items`, else `object`.
fn member_type(member: &RawMap) -> SchemaType {
    match declared_type(member) {
        (Some(ty), _) => ty,
        _ if member.contains_key("items") => SchemaType::Array,
        _ => SchemaType::Object,
    }
}

/// Untyped nodes take the kind of their first non-null enum value, else
/// `object`.
fn infer_type(node: &RawMap) -> SchemaType {
    if let Some(JsonValue::Array(values)) = node.get("enum") {
        if let Some(ty) = values.iter().find_map(SchemaType::of_json) {
            return ty;
        }
    }
    SchemaType::Object
}

/// Highest number of repeats (occurrences beyond the first) of any single ref.
fn max_repetition(ref_path: &[String]) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in ref_path {
        *counts.entry(r.as_str()).or_default() += 1;
    }
    counts.values().max().map_or(0, |n| n - 1)
}

fn extend(path: &[String], name: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(path.len() + 1);
    out.extend_from_slice(path);
    out.push(name.to_string());
    out
}

fn flag(node: &RawMap, key: &str) -> bool {
    node.get(key).and_then(JsonValue::as_bool).unwrap_or(false)
}

fn number(node: &RawMap, key: &str) -> Option<f64> {
    node.get(key).and_then(JsonValue::as_f64)
}

fn unsigned(node: &RawMap, key: &str) -> Option<u64> {
    node.get(key).and_then(JsonValue::as_u64)
}

fn required_list(node: &RawMap) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    if let Some(JsonValue::Array(names)) = node.get("required") {
        for name in names.iter().filter_map(JsonValue::as_str) {
            if !out.iter().any(|n| n == name) {
                out.push(name.to_string());
            }
        }
    }
    out
}
