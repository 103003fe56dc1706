//! Core types shared by normalization and generation.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Context-data marker meaning "resolve to an explicit null".
pub const NULL: &str = "__null__";

/// Request body media types, in selection order.
pub const REQUEST_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "multipart/form-data",
    "application/x-www-form-urlencoded",
    "application/octet-stream",
];

/// Response media types, in selection order.
pub const RESPONSE_CONTENT_TYPES: &[&str] = &["application/json", "text/plain", "text/html"];

/// Direction of the generated content.
///
/// Requests carry `writeOnly` properties, responses carry `readOnly` ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Request,
    Response,
}

impl Direction {
    /// Create direction from a request flag (true = Request, false = Response).
    pub fn from_request_flag(is_request: bool) -> Self {
        if is_request {
            Direction::Request
        } else {
            Direction::Response
        }
    }

    /// Content is generated for output, so `readOnly` properties are visible.
    pub fn is_read_only(&self) -> bool {
        matches!(self, Direction::Response)
    }

    /// Content is generated for input, so `writeOnly` properties are visible.
    pub fn is_write_only(&self) -> bool {
        matches!(self, Direction::Request)
    }
}

/// The six primitive OpenAPI types a normalized schema can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    #[default]
    Object,
    Array,
}

impl SchemaType {
    /// Parse a type name, accepting the common misspellings `int`, `float`
    /// and `bool`.
    ///
    /// Returns `None` for `null` and unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(SchemaType::String),
            "integer" | "int" => Some(SchemaType::Integer),
            "number" | "float" => Some(SchemaType::Number),
            "boolean" | "bool" => Some(SchemaType::Boolean),
            "object" => Some(SchemaType::Object),
            "array" => Some(SchemaType::Array),
            _ => None,
        }
    }

    /// Returns the OpenAPI name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::Boolean => "boolean",
            SchemaType::Object => "object",
            SchemaType::Array => "array",
        }
    }

    /// Object and array schemas are generated structurally.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, SchemaType::Object | SchemaType::Array)
    }

    /// Infer the type of a literal value, as used for untyped `enum` schemas.
    pub fn of_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::String(_) => Some(SchemaType::String),
            JsonValue::Bool(_) => Some(SchemaType::Boolean),
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => Some(SchemaType::Integer),
            JsonValue::Number(_) => Some(SchemaType::Number),
            _ => None,
        }
    }
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounds applied while normalizing raw schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseConfig {
    /// Maximum property depth. 0 means unbounded.
    pub max_levels: usize,
    /// Maximum repetitions of any single `$ref` along a branch.
    /// 0 rejects the first repetition.
    pub max_recursion_levels: usize,
    /// Drop properties that are not listed as required.
    pub only_required: bool,
}

impl ParseConfig {
    /// Create a config with the defaults: unbounded depth, strict cycle
    /// rejection, all properties kept.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum property depth.
    pub fn max_levels(mut self, levels: usize) -> Self {
        self.max_levels = levels;
        self
    }

    /// Set the maximum `$ref` repetition count.
    pub fn max_recursion_levels(mut self, levels: usize) -> Self {
        self.max_recursion_levels = levels;
        self
    }

    /// Keep only required properties.
    pub fn only_required(mut self, only_required: bool) -> Self {
        self.only_required = only_required;
        self
    }
}
