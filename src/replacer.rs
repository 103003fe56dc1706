//! Value resolution pipeline.
//!
//! A [`Pipeline`] tries an ordered list of [`Replacer`] strategies for each
//! node until one produces a value of the right kind, then enforces the
//! schema's constraints on it. The reference order is:
//!
//! 1. header / path parameter overrides (`in-header`, `in-path` context keys)
//! 2. context data looked up by the snake-cased name path
//! 3. format-driven fake data (`date`, `email`, `uuid`, ...)
//! 4. schema `example`
//! 5. type-driven fake data
//! 6. schema `default`
//!
//! A strategy returning [`Value::Null`] means "explicit null" and stops the
//! pipeline; `None` means "no opinion" and moves on to the next strategy.

use std::sync::{Mutex, PoisonError};

use base64::Engine;
use chrono::{DateTime, NaiveDate};
use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::contexts::{lookup, ContextFunc, Contexts};
use crate::faker::Faker;
use crate::patterns::{compiled, generate_from_pattern, to_snake_case, validate_with_pattern};
use crate::schema::Schema;
use crate::state::ReplaceState;
use crate::types::SchemaType;
use crate::value::Value;

/// Default prefix of area-scoped context keys (`in-header`, `in-path`).
pub const DEFAULT_AREA_PREFIX: &str = "in-";

/// Resolves a value for a schema node (or a bare placeholder when `schema` is
/// `None`).
///
/// `Some(Value::Null)` is an explicit null, `None` means nothing was found.
pub trait ValueReplacer: Send + Sync {
    fn replace(&self, schema: Option<&Schema>, state: &ReplaceState) -> Option<Value>;
}

impl<F> ValueReplacer for F
where
    F: Fn(Option<&Schema>, &ReplaceState) -> Option<Value> + Send + Sync,
{
    fn replace(&self, schema: Option<&Schema>, state: &ReplaceState) -> Option<Value> {
        self(schema, state)
    }
}

/// Everything a single strategy can look at while resolving one node.
pub struct ReplaceContext<'a> {
    pub faker: Faker,
    pub schema: Option<&'a Schema>,
    pub state: &'a ReplaceState,
    pub data: &'a Contexts,
    pub area_prefix: &'a str,
    pub functions: &'a IndexMap<String, ContextFunc>,
}

impl ReplaceContext<'_> {
    /// Call a top-level context function by name.
    pub fn function(&mut self, name: &str) -> Option<Value> {
        let func = self.functions.get(name)?;
        Some(func.call(&mut self.faker))
    }

    /// Free-form string: the `expression` context function when defined,
    /// otherwise a random word.
    pub fn string_expression(&mut self) -> String {
        match self.function("expression") {
            Some(Value::String(s)) => s,
            Some(other) => other.to_string(),
            None => self.faker.word(),
        }
    }
}

/// One resolution strategy.
pub type Replacer = fn(&mut ReplaceContext<'_>) -> Option<Value>;

/// Strategies in reference order.
pub const DEFAULT_REPLACERS: &[Replacer] = &[
    replace_in_headers,
    replace_in_path,
    replace_from_context,
    replace_from_schema_format,
    replace_from_schema_example,
    replace_from_schema_primitive,
    replace_from_schema_default,
];

/// The standard [`ValueReplacer`]: ordered strategies over context data.
pub struct Pipeline {
    replacers: Vec<Replacer>,
    contexts: Contexts,
    functions: IndexMap<String, ContextFunc>,
    area_prefix: String,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("replacers", &self.replacers.len())
            .field("contexts", &self.contexts.names().collect::<Vec<_>>())
            .field("area_prefix", &self.area_prefix)
            .finish()
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// Pipeline with the default strategies and no context data.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Fresh faker for one call, drawn from the pipeline's RNG.
    fn next_faker(&self) -> Faker {
        let seed = self.rng.lock().unwrap_or_else(PoisonError::into_inner).gen();
        Faker::seeded(seed)
    }
}

impl ValueReplacer for Pipeline {
    fn replace(&self, schema: Option<&Schema>, state: &ReplaceState) -> Option<Value> {
        let mut ctx = ReplaceContext {
            faker: self.next_faker(),
            schema,
            state,
            data: &self.contexts,
            area_prefix: &self.area_prefix,
            functions: &self.functions,
        };

        for replacer in &self.replacers {
            let Some(mut value) = replacer(&mut ctx) else {
                continue;
            };
            if value.is_null() {
                return Some(Value::Null);
            }

            if let Some(schema) = schema {
                if !has_correct_schema_value(schema, &value) {
                    continue;
                }
                match apply_schema_constraints(schema, value, &mut ctx.faker) {
                    Some(constrained) => value = constrained,
                    None => continue,
                }
            }

            if value.as_str() == Some("") {
                continue;
            }
            return Some(value);
        }

        None
    }
}

/// Builder for [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    replacers: Option<Vec<Replacer>>,
    contexts: Contexts,
    area_prefix: Option<String>,
    seed: Option<u64>,
}

impl PipelineBuilder {
    /// Replace the strategy list.
    pub fn replacers(mut self, replacers: Vec<Replacer>) -> Self {
        self.replacers = Some(replacers);
        self
    }

    /// Context namespaces, searched in order.
    pub fn contexts(mut self, contexts: Contexts) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn area_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.area_prefix = Some(prefix.into());
        self
    }

    /// Make generation reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Pipeline {
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Pipeline {
            replacers: self
                .replacers
                .unwrap_or_else(|| DEFAULT_REPLACERS.to_vec()),
            functions: self.contexts.functions(),
            contexts: self.contexts,
            area_prefix: self
                .area_prefix
                .unwrap_or_else(|| DEFAULT_AREA_PREFIX.to_string()),
            rng: Mutex::new(rng),
        }
    }
}

/// Whether a node with this schema is generated in the state's direction.
///
/// Path parameters are never hidden.
pub fn is_visible(schema: &Schema, state: &ReplaceState) -> bool {
    if state.is_path_param {
        return true;
    }
    if schema.read_only && !state.is_content_read_only() {
        return false;
    }
    if schema.write_only && !state.is_content_write_only() {
        return false;
    }
    true
}

/// Header overrides from `in-header` context data, plus `authorization`
/// headers with `basic`/`bearer` formats.
pub fn replace_in_headers(ctx: &mut ReplaceContext<'_>) -> Option<Value> {
    if !ctx.state.is_header {
        return None;
    }
    let value = replace_in_area(ctx, "header");

    let Some(schema) = ctx.schema else {
        return value;
    };
    let is_authorization = ctx
        .state
        .root_name()
        .is_some_and(|name| name.eq_ignore_ascii_case("authorization"));
    if !is_authorization {
        return value;
    }

    match schema.format() {
        "basic" => {
            let credentials = match value {
                Some(v) if !v.is_null() => v.to_string(),
                _ => format!("{}:{}", ctx.faker.user_name(), ctx.faker.password()),
            };
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            Some(Value::String(format!("Basic {encoded}")))
        }
        "bearer" => {
            let token = match value {
                Some(v) if !v.is_null() => v.to_string(),
                _ => ctx.faker.password(),
            };
            Some(Value::String(format!("Bearer {token}")))
        }
        _ => value,
    }
}

/// Path parameter overrides from `in-path` context data.
pub fn replace_in_path(ctx: &mut ReplaceContext<'_>) -> Option<Value> {
    if !ctx.state.is_path_param {
        return None;
    }
    replace_in_area(ctx, "path")
}

fn replace_in_area(ctx: &mut ReplaceContext<'_>, area: &str) -> Option<Value> {
    if ctx.area_prefix.is_empty() {
        return None;
    }
    let name = to_snake_case(ctx.state.root_name()?);
    let key = format!("{}{}", ctx.area_prefix, area);
    let path = [name];

    for data in ctx.data.iter() {
        let Some(replacements) = data.get(&key) else {
            continue;
        };
        if let Some(value) = replacements.resolve(&path, &mut ctx.faker) {
            return Some(value);
        }
    }
    None
}

/// Context data looked up by the snake-cased name path.
pub fn replace_from_context(ctx: &mut ReplaceContext<'_>) -> Option<Value> {
    let path: Vec<String> = ctx.state.name_path.iter().map(|n| to_snake_case(n)).collect();
    if path.is_empty() {
        return None;
    }

    for data in ctx.data.iter() {
        if let Some(value) = lookup(data, &path, &mut ctx.faker) {
            let value = cast_to_schema_format(ctx.schema, value)?;
            if value.as_str() == Some("") {
                return None;
            }
            return Some(value);
        }
    }
    None
}

/// Coerce context values to integer formats. `uuid` fields are left to the
/// format strategy.
fn cast_to_schema_format(schema: Option<&Schema>, value: Value) -> Option<Value> {
    let Some(schema) = schema else {
        return Some(value);
    };
    match schema.format() {
        "uuid" => None,
        "int32" | "int64" | "uint8" | "uint16" | "uint32" | "uint64"
            if schema.schema_type != SchemaType::String =>
        {
            let bits = int_format_bits(schema.format());
            match value.as_i64() {
                Some(i) if fits_format(i, schema.format(), bits) => Some(Value::Int(i)),
                _ => Some(value),
            }
        }
        _ => Some(value),
    }
}

fn int_format_bits(format: &str) -> u32 {
    match format {
        "uint8" => 8,
        "uint16" => 16,
        "int32" | "uint32" => 32,
        _ => 64,
    }
}

fn fits_format(value: i64, format: &str, bits: u32) -> bool {
    if format.starts_with("uint") {
        return value >= 0 && (bits >= 63 || value < (1_i64 << bits));
    }
    if format == "int32" {
        return i32::try_from(value).is_ok();
    }
    true
}

/// Fake data driven by the schema's `format`.
pub fn replace_from_schema_format(ctx: &mut ReplaceContext<'_>) -> Option<Value> {
    let schema = ctx.schema?;
    let as_string = schema.schema_type == SchemaType::String;
    let faker = &mut ctx.faker;

    let value = match schema.format() {
        "byte" | "binary" => {
            let raw = ctx.string_expression();
            Value::String(base64::engine::general_purpose::STANDARD.encode(raw))
        }
        "date" => faker.date().into(),
        "date-time" | "datetime" => faker.date_time().into(),
        "email" => faker.email().into(),
        "uuid" => match expected_uuid_length(schema) {
            0 | 36 => faker.uuid().into(),
            32 => faker.uuid().replace('-', "").into(),
            len => hex_string(faker, len).into(),
        },
        "password" => faker.password().into(),
        "hostname" => faker.domain().into(),
        "uri" | "url" => faker.url().into(),
        "ipv4" => faker.ipv4().into(),
        "ipv6" => faker.ipv6().into(),
        "int32" => int_value(faker.int32(), as_string),
        "int64" => int_value(faker.int64(), as_string),
        "uint8" | "uint16" | "uint32" | "uint64" => {
            let n = faker.uint(int_format_bits(schema.format())).max(1);
            int_value(n, as_string)
        }
        _ => return None,
    };
    Some(value)
}

fn int_value(n: i64, as_string: bool) -> Value {
    if as_string {
        Value::String(n.to_string())
    } else {
        Value::Int(n)
    }
}

/// The schema's `example`, or its first `examples` entry.
pub fn replace_from_schema_example(ctx: &mut ReplaceContext<'_>) -> Option<Value> {
    let schema = ctx.schema?;
    schema
        .example
        .iter()
        .chain(schema.examples.iter())
        .find(|v| !v.is_null())
        .cloned()
}

/// Random data for the schema's type, or a random `enum` member.
pub fn replace_from_schema_primitive(ctx: &mut ReplaceContext<'_>) -> Option<Value> {
    let schema = ctx.schema?;

    let candidates = schema.enum_candidates();
    if let Some(choice) = ctx.faker.choose(&candidates) {
        return Some((*choice).clone());
    }

    let faker = &mut ctx.faker;
    match schema.schema_type {
        SchemaType::String => Some(Value::String(ctx.string_expression())),
        SchemaType::Integer => Some(Value::Int(random_integer(faker, schema.format()))),
        SchemaType::Number => match schema.format() {
            "float" | "double" | "" => Some(Value::Float(faker.float())),
            format => Some(Value::Int(random_integer(faker, format))),
        },
        SchemaType::Boolean => Some(Value::Bool(faker.bool())),
        SchemaType::Object | SchemaType::Array => None,
    }
}

fn random_integer(faker: &mut Faker, format: &str) -> i64 {
    match format {
        "int64" => faker.int64(),
        "uint8" | "uint16" | "uint32" | "uint64" => faker.uint(int_format_bits(format)).max(1),
        _ => faker.int32(),
    }
}

/// The schema's `default`.
pub fn replace_from_schema_default(ctx: &mut ReplaceContext<'_>) -> Option<Value> {
    ctx.schema?.default.clone().filter(|v| !v.is_null())
}

/// Whether `value` has the schema's type and a valid representation of its
/// format.
pub fn has_correct_schema_value(schema: &Schema, value: &Value) -> bool {
    if !value.matches_type(schema.schema_type) {
        return false;
    }

    let as_string = schema.schema_type == SchemaType::String;
    match schema.format() {
        "int32" if as_string => value.as_str().is_some_and(|s| s.parse::<i32>().is_ok()),
        "int32" => value.as_i64().is_some_and(|i| i32::try_from(i).is_ok()),
        "int64" if as_string => value.as_str().is_some_and(|s| s.parse::<i64>().is_ok()),
        "int64" => value.as_i64().is_some(),
        "date" => match value {
            Value::String(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            other => other.as_i64().is_some(),
        },
        "date-time" | "datetime" => match value {
            Value::String(s) => DateTime::parse_from_rfc3339(s).is_ok(),
            other => other.as_i64().is_some(),
        },
        "email" => value.as_str().is_some_and(is_email),
        "uuid" => value.as_str().is_some_and(|s| is_uuid(s, schema)),
        _ => true,
    }
}

fn is_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !s.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn is_uuid(s: &str, schema: &Schema) -> bool {
    match expected_uuid_length(schema) {
        0 | 32 | 36 => uuid::Uuid::parse_str(s).is_ok(),
        len => s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit()),
    }
}

/// Length implied by `minLength`/`maxLength` on a `uuid` string, 0 when
/// unconstrained.
fn expected_uuid_length(schema: &Schema) -> usize {
    match (schema.min_length, schema.max_length) {
        (Some(min), Some(max)) if min == max => min as usize,
        (_, Some(max)) => max as usize,
        (Some(min), None) => min as usize,
        (None, None) => 0,
    }
}

fn hex_string(faker: &mut Faker, len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    (0..len)
        .map(|_| HEX[faker.rng().gen_range(0..HEX.len())] as char)
        .collect()
}

/// Bring a value in line with the schema's constraints.
///
/// Returns `None` when a string cannot be made to match its `pattern`.
pub fn apply_schema_constraints(schema: &Schema, value: Value, faker: &mut Faker) -> Option<Value> {
    match (schema.schema_type, value) {
        (SchemaType::String, Value::String(s)) => {
            apply_string_constraints(schema, s, faker).map(Value::String)
        }
        (SchemaType::Integer, value) => {
            let n = value.as_f64()?;
            let n = apply_number_constraints(schema, n, faker);
            Some(Value::Int(n as i64))
        }
        (SchemaType::Number, value) => {
            let was_int = matches!(value, Value::Int(_));
            let n = apply_number_constraints(schema, value.as_f64()?, faker);
            if (was_int || is_integer_schema(schema)) && n.fract() == 0.0 {
                Some(Value::Int(n as i64))
            } else {
                Some(Value::Float(n))
            }
        }
        (_, value) => Some(value),
    }
}

fn apply_string_constraints(schema: &Schema, value: String, faker: &mut Faker) -> Option<String> {
    let format = schema.format();
    if format == "byte" || format == "binary" {
        let engine = base64::engine::general_purpose::STANDARD;
        if engine.decode(&value).is_ok() {
            return Some(value);
        }
        return Some(engine.encode(value));
    }

    let candidates: Vec<String> = schema
        .enum_candidates()
        .into_iter()
        .map(Value::to_string)
        .collect();
    let mut value = value;
    if !candidates.is_empty() && !candidates.contains(&value) {
        value = faker.choose(&candidates).cloned().unwrap_or(value);
    }

    if let Some(pattern) = schema.pattern.as_deref() {
        if compiled(pattern).is_none() {
            return Some(value);
        }
        if validate_with_pattern(&value, pattern) {
            return Some(value);
        }
        if let Some(Value::String(example)) = &schema.example {
            if validate_with_pattern(example, pattern) {
                return Some(example.clone());
            }
        }
        return generate_from_pattern(pattern, faker)
            .filter(|generated| validate_with_pattern(generated, pattern));
    }

    if matches!(format, "date" | "date-time" | "datetime" | "uuid") {
        return Some(value);
    }

    let len = value.chars().count();
    if let Some(min) = schema.min_length.map(|n| n as usize) {
        if len < min {
            value.push_str(&"-".repeat(min - len));
        }
    }
    if let Some(max) = schema.max_length.map(|n| n as usize) {
        if value.chars().count() > max {
            value = value.chars().take(max).collect();
        }
    }
    Some(value)
}

fn is_integer_schema(schema: &Schema) -> bool {
    schema.schema_type == SchemaType::Integer
        || matches!(
            schema.format(),
            "int32" | "int64" | "uint8" | "uint16" | "uint32" | "uint64"
        )
}

/// Apply `enum`, `multipleOf` and bounds to a number.
///
/// Out-of-range values are replaced by a random value inside the range.
fn apply_number_constraints(schema: &Schema, value: f64, faker: &mut Faker) -> f64 {
    let candidates: Vec<f64> = schema
        .enum_candidates()
        .into_iter()
        .filter_map(Value::as_f64)
        .collect();
    if !candidates.is_empty() {
        if candidates.contains(&value) {
            return value;
        }
        return faker.choose(&candidates).copied().unwrap_or(value);
    }

    let integer = is_integer_schema(schema);
    let step = if integer { 1.0 } else { 0.01 };
    let multiple_of = schema.multiple_of.filter(|m| *m != 0.0);

    let mut value = value;
    if let Some(m) = multiple_of {
        value = (value / m).trunc() * m;
        if value == 0.0 {
            value = m;
        }
    }

    let min = schema
        .exclusive_minimum
        .map(|b| b + step)
        .or(schema.minimum);
    let max = schema
        .exclusive_maximum
        .map(|b| b - step)
        .or(schema.maximum);

    let out_of_bounds = min.is_some_and(|lo| value < lo) || max.is_some_and(|hi| value > hi);
    if out_of_bounds {
        let lo = min.unwrap_or(match max {
            Some(hi) if hi <= 0.0 => f64::from(i32::MIN),
            Some(hi) if hi < 1.0 => 0.0,
            _ => 1.0,
        });
        let hi = max.unwrap_or(if lo > f64::from(i32::MAX) {
            lo + 1_000_000.0
        } else {
            f64::from(i32::MAX)
        });

        value = random_in_range(faker, lo, hi, integer);
        if let Some(m) = multiple_of {
            let up = (value / m).ceil() * m;
            value = if up <= hi { up } else { (hi / m).floor() * m };
        }
        return value;
    }

    if value == 0.0 {
        let nudged = if integer { 1.0 } else { 0.01 };
        let fits = min.map_or(true, |lo| nudged >= lo) && max.map_or(true, |hi| nudged <= hi);
        if fits && multiple_of.is_none() {
            return nudged;
        }
    }
    value
}

fn random_in_range(faker: &mut Faker, lo: f64, hi: f64, integer: bool) -> f64 {
    if integer {
        let mut lo_int = lo.ceil() as i64;
        let hi_int = hi.floor() as i64;
        if lo_int == 0 && hi_int > 0 {
            lo_int = 1;
        }
        if hi_int <= lo_int {
            return lo_int as f64;
        }
        return faker.rng().gen_range(lo_int..=hi_int) as f64;
    }
    if hi <= lo {
        return lo;
    }
    let span = hi - lo;
    if !span.is_finite() {
        // Sample each half separately so no intermediate overflows.
        let half = hi / 2.0 - lo / 2.0;
        let r: f64 = faker.rng().gen();
        return (lo + r * half + r * half).clamp(lo, hi);
    }
    faker.rng().gen_range(lo..hi)
}
