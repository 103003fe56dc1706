//! OpenAPI Mock Generator
//!
//! Synthetic request and response generation for OpenAPI 3.x documents.
//!
//! Raw schemas are first normalized into a canonical, combinator-free and
//! cycle-bounded [`Schema`]. The content generator then walks that tree and
//! asks a [`ValueReplacer`] for every leaf. The default replacer is a
//! [`Pipeline`] of strategies (context data, formats, examples, primitives,
//! defaults) whose values are fixed up to satisfy the schema's constraints.
//!
//! # Example
//!
//! ```
//! use openapi_mockgen::{generate, normalize, ParseConfig, Pipeline, ReplaceState};
//! use serde_json::json;
//!
//! let raw = json!({
//!     "type": "object",
//!     "properties": {
//!         "id": { "type": "integer", "minimum": 1, "maximum": 10 },
//!         "tags": { "type": "array", "minItems": 2, "items": { "type": "string" } }
//!     }
//! });
//!
//! let schema = normalize(&raw, &raw, &ParseConfig::new()).unwrap();
//! let pipeline = Pipeline::builder().seed(7).build();
//! let content = generate(Some(&schema), &pipeline, &ReplaceState::response()).unwrap();
//!
//! let fields = content.as_map().unwrap();
//! assert!((1..=10).contains(&fields["id"].as_i64().unwrap()));
//! assert_eq!(fields["tags"].as_list().unwrap().len(), 2);
//! ```
//!
//! # Replacement Order
//!
//! | Strategy | Source |
//! |----------|--------|
//! | header / path | `in-header` / `in-path` context areas, auth headers |
//! | context | context data keyed by the snake-cased name path |
//! | format | `date`, `email`, `uuid`, `int32`, ... |
//! | example | `example`, then `examples` |
//! | primitive | random value of the schema type or enum |
//! | default | `default` |
//!
//! # Context Data
//!
//! Context files are YAML maps searched by property name:
//! ```yaml
//! name: fake:person.first_name
//! pet:
//!   status: [available, sold]
//! in-header:
//!   x-api-version: "2"
//! ```

mod assembler;
mod cache;
mod config;
mod contexts;
mod document;
mod error;
mod faker;
mod generator;
mod loader;
mod normalizer;
mod patterns;
mod replacer;
mod schema;
mod state;
mod types;
mod validator;
mod value;

pub use assembler::{
    create_curl_body, encode_content, fill_content_placeholders, generate_query,
    generate_request_headers, generate_response_headers, generate_url_from_parameters,
    new_request_from_fixed_resource, new_request_from_operation, new_response_from_fixed_content,
    new_response_from_operation, ContentExample, GeneratedRequest, GeneratedResponse,
    DEFAULT_CONTENT_TYPE,
};
pub use cache::{CacheEntry, CacheOperationAdapter, CacheStorage, MemoryStorage};
pub use config::{CacheConfig, ServiceConfig};
pub use contexts::{
    load_contexts, parse_context, ContextData, ContextFunc, ContextValue, Contexts,
};
pub use document::{
    transform_http_code, AuthScheme, AuthType, Document, OpenApiDocument, OpenApiOperation,
    Operation, OperationRequest, OperationResponse, Parameter, ParameterIn, RequestBody,
    SecurityComponent, SecurityComponents,
};
pub use error::{ConfigError, DocumentError, EncodeError, SchemaError, ValidateError};
pub use faker::{fake_function, fake_function_names, FakeFn, Faker};
pub use generator::{generate, generate_array, generate_object, MAX_ARRAY_ITEMS};
pub use loader::{bundle_refs, load_document, load_document_str, navigate_fragment};
pub use normalizer::{normalize, Normalizer};
pub use patterns::{
    extract_placeholders, generate_from_pattern, maybe_regex_pattern, to_snake_case,
    validate_with_pattern,
};
pub use replacer::{
    apply_schema_constraints, has_correct_schema_value, is_visible, replace_from_context,
    replace_from_schema_default, replace_from_schema_example, replace_from_schema_format,
    replace_from_schema_primitive, replace_in_headers, replace_in_path, Pipeline,
    PipelineBuilder, ReplaceContext, Replacer, ValueReplacer, DEFAULT_AREA_PREFIX,
    DEFAULT_REPLACERS,
};
pub use schema::Schema;
pub use state::ReplaceState;
pub use types::{
    Direction, ParseConfig, SchemaType, NULL, REQUEST_CONTENT_TYPES, RESPONSE_CONTENT_TYPES,
};
pub use validator::{to_json_schema, validate_against_schema, validate_content};
pub use value::Value;
