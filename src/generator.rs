//! Content generation from canonical schemas.

use indexmap::IndexMap;

use crate::replacer::{is_visible, ValueReplacer};
use crate::schema::Schema;
use crate::state::ReplaceState;
use crate::types::SchemaType;
use crate::value::Value;

/// Hard ceiling on generated array elements.
pub const MAX_ARRAY_ITEMS: usize = 9;

/// Generate a value for `schema`.
///
/// Returns `None` when the schema is absent, hidden in the state's direction
/// (`readOnly` in requests, `writeOnly` in responses) or resolves to null.
/// Objects and arrays that end up empty become `{}`/`[]` unless the schema is
/// nullable.
pub fn generate<R>(schema: Option<&Schema>, replacer: &R, state: &ReplaceState) -> Option<Value>
where
    R: ValueReplacer + ?Sized,
{
    let schema = schema?;
    if !is_visible(schema, state) {
        return None;
    }

    // Values for named primitives are trusted as long as their kind matches
    if schema.schema_type.is_primitive() && !state.name_path.is_empty() {
        if let Some(value) = replacer.replace(Some(schema), state) {
            if value.is_null() {
                return None;
            }
            if value.matches_type(schema.schema_type) {
                return Some(value);
            }
        }
    }

    match schema.schema_type {
        SchemaType::Object => match generate_object(schema, replacer, state) {
            Some(map) => Some(map),
            None if schema.nullable => None,
            None => Some(Value::Map(IndexMap::new())),
        },
        SchemaType::Array => match generate_array(schema, replacer, state) {
            Some(list) => Some(list),
            None if schema.nullable => None,
            None => Some(Value::List(Vec::new())),
        },
        _ => replacer
            .replace(Some(schema), state)
            .filter(|value| !value.is_null()),
    }
}

/// Generate an object from the schema's properties.
///
/// Properties resolving to nothing are dropped; generation stops once
/// `maxProperties` entries exist. Returns `None` when no property produced a
/// value, including when the schema declares none.
pub fn generate_object<R>(schema: &Schema, replacer: &R, state: &ReplaceState) -> Option<Value>
where
    R: ValueReplacer + ?Sized,
{
    if schema.properties.is_empty() {
        return None;
    }

    let limit = schema.max_properties.map(|n| n as usize).filter(|n| *n > 0);
    let mut out = IndexMap::new();

    for (name, property) in &schema.properties {
        let child = state.child_named(name.as_str());
        let Some(value) = generate(Some(property), replacer, &child) else {
            continue;
        };
        out.insert(name.clone(), value);

        if limit.is_some_and(|max| out.len() >= max) {
            break;
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(Value::Map(out))
    }
}

/// Generate `minItems` elements (1 when unset), never more than
/// [`MAX_ARRAY_ITEMS`]. Returns `None` when no element produced a value.
pub fn generate_array<R>(schema: &Schema, replacer: &R, state: &ReplaceState) -> Option<Value>
where
    R: ValueReplacer + ?Sized,
{
    let take = match schema.min_items {
        Some(n) if n > 0 => n as usize,
        _ => 1,
    };

    let items = schema.items.as_deref();
    let out: Vec<Value> = (1..=MAX_ARRAY_ITEMS)
        .take_while(|i| *i <= take)
        .filter_map(|i| generate(items, replacer, &state.child_at(i)))
        .collect();

    if out.is_empty() {
        None
    } else {
        Some(Value::List(out))
    }
}
