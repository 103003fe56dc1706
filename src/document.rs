//! Document and operation surface over OpenAPI 3.x specs.
//!
//! [`Document`] and [`Operation`] are capability traits: the generator and
//! assembler only see parameters, bodies and responses as canonical
//! [`Schema`]s. [`OpenApiDocument`] implements them over a raw JSON tree;
//! decorators such as [`crate::cache::CacheOperationAdapter`] wrap any
//! [`Operation`].

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::DocumentError;
use crate::loader::{bundle_refs, load_document, navigate_fragment};
use crate::normalizer::Normalizer;
use crate::schema::Schema;
use crate::types::{ParseConfig, REQUEST_CONTENT_TYPES, RESPONSE_CONTENT_TYPES};

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Status codes preferred for the generated response, in order.
const PREFERRED_STATUS_CODES: [&str; 4] = ["200", "201", "202", "204"];

const MAX_REF_HOPS: usize = 16;

/// Where a parameter is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterIn {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(ParameterIn::Path),
            "query" => Some(ParameterIn::Query),
            "header" => Some(ParameterIn::Header),
            "cookie" => Some(ParameterIn::Cookie),
            _ => None,
        }
    }
}

/// A request parameter or response header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterIn,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: ParameterIn, schema: Option<Schema>) -> Self {
        Self {
            name: name.into(),
            location,
            required: location == ParameterIn::Path,
            schema,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    pub content_type: String,
}

/// Request shape of an operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OperationRequest {
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
}

impl OperationRequest {
    /// Parameters sent in `location`, in declaration order.
    pub fn parameters_in(&self, location: ParameterIn) -> impl Iterator<Item = &Parameter> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }
}

/// Response shape of an operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    /// Header parameters keyed by lower-cased name.
    pub headers: IndexMap<String, Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Schema>,
    pub content_type: String,
    pub status_code: u16,
}

impl Default for OperationResponse {
    fn default() -> Self {
        Self {
            headers: IndexMap::new(),
            content: None,
            content_type: String::new(),
            status_code: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthType {
    Http,
    ApiKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    Bearer,
    Basic,
}

/// A declared security scheme reduced to what request generation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityComponent {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<AuthScheme>,
    #[serde(rename = "in")]
    pub location: ParameterIn,
    pub name: String,
}

impl SecurityComponent {
    /// The synthetic required parameter this scheme adds to requests.
    ///
    /// HTTP schemes other than bearer and basic have no parameter.
    pub fn parameter(&self) -> Option<Parameter> {
        let param = match (self.auth_type, self.scheme) {
            (AuthType::Http, Some(scheme)) => {
                let format = match scheme {
                    AuthScheme::Bearer => "bearer",
                    AuthScheme::Basic => "basic",
                };
                Parameter::new(
                    "authorization",
                    ParameterIn::Header,
                    Some(Schema::string().with_format(format)),
                )
            }
            (AuthType::Http, None) => return None,
            (AuthType::ApiKey, _) => {
                Parameter::new(self.name.clone(), self.location, Some(Schema::string()))
            }
        };
        Some(param.required(true))
    }
}

/// Security schemes by their component name.
pub type SecurityComponents = IndexMap<String, SecurityComponent>;

/// A parsed API description.
pub trait Document: Send + Sync {
    /// The declared `openapi` version.
    fn version(&self) -> &str;

    /// Resource paths mapped to their sorted, upper-case methods.
    fn resources(&self) -> IndexMap<String, Vec<String>>;

    fn security(&self) -> &SecurityComponents;

    /// Find the operation serving `method` on `resource`.
    ///
    /// # Errors
    ///
    /// `OperationNotFound` when no path matches, `MethodNotAllowed` when the
    /// path exists without that method.
    fn find_operation(&self, method: &str, resource: &str)
        -> Result<Box<dyn Operation>, DocumentError>;
}

/// A single API operation.
pub trait Operation: Send + Sync + std::fmt::Debug {
    fn id(&self) -> String;

    /// The innermost operation when decorators are stacked.
    fn unwrap(&self) -> &dyn Operation;

    fn request(&self, security: &SecurityComponents) -> OperationRequest;

    fn response(&self) -> OperationResponse;

    /// Bounds used for subsequent normalization.
    fn set_parse_config(&mut self, config: ParseConfig);
}

/// An OpenAPI 3.x document backed by its raw JSON tree.
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    root: Arc<JsonValue>,
    version: String,
    security: SecurityComponents,
}

impl OpenApiDocument {
    /// Wrap an already loaded document.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVersion` unless the document declares `openapi: 3.x`.
    pub fn from_value(root: JsonValue) -> Result<Self, DocumentError> {
        let version = match root.get("openapi") {
            Some(JsonValue::String(v)) => v.clone(),
            Some(JsonValue::Number(n)) => n.to_string(),
            _ => root
                .get("swagger")
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .unwrap_or_default(),
        };
        if !version.starts_with("3.") {
            return Err(DocumentError::UnsupportedVersion { version });
        }

        let security = parse_security_schemes(&root);
        Ok(Self {
            root: Arc::new(root),
            version,
            security,
        })
    }

    /// Load a document from disk, inlining external file references.
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let mut root = load_document(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        bundle_refs(&mut root, base_dir)?;
        Self::from_value(root)
    }

    /// The raw document.
    pub fn root(&self) -> &JsonValue {
        &self.root
    }

    fn paths(&self) -> Option<&Map<String, JsonValue>> {
        self.root.get("paths").and_then(JsonValue::as_object)
    }

    /// The declared path matching `resource`: exact first, then template-aware.
    fn match_path(&self, resource: &str) -> Option<(&String, &JsonValue)> {
        let paths = self.paths()?;
        if let Some(entry) = paths.get_key_value(resource) {
            return Some(entry);
        }
        paths
            .iter()
            .find(|(declared, _)| path_matches(declared, resource))
    }
}

impl Document for OpenApiDocument {
    fn version(&self) -> &str {
        &self.version
    }

    fn resources(&self) -> IndexMap<String, Vec<String>> {
        let Some(paths) = self.paths() else {
            return IndexMap::new();
        };

        paths
            .iter()
            .map(|(path, item)| {
                let item = resolve_ref(&self.root, item);
                let mut methods: Vec<String> = HTTP_METHODS
                    .iter()
                    .filter(|m| item.get(**m).is_some())
                    .map(|m| m.to_uppercase())
                    .collect();
                methods.sort();
                (path.clone(), methods)
            })
            .collect()
    }

    fn security(&self) -> &SecurityComponents {
        &self.security
    }

    fn find_operation(
        &self,
        method: &str,
        resource: &str,
    ) -> Result<Box<dyn Operation>, DocumentError> {
        let (path, item) =
            self.match_path(resource)
                .ok_or_else(|| DocumentError::OperationNotFound {
                    resource: resource.to_string(),
                })?;

        let method = method.to_lowercase();
        let item = resolve_ref(&self.root, item);
        if !HTTP_METHODS.contains(&method.as_str()) || item.get(&method).is_none() {
            return Err(DocumentError::MethodNotAllowed {
                method: method.to_uppercase(),
                resource: resource.to_string(),
            });
        }

        Ok(Box::new(OpenApiOperation {
            root: Arc::clone(&self.root),
            path: path.clone(),
            method,
            parse_config: ParseConfig::default(),
        }))
    }
}

/// One operation of an [`OpenApiDocument`].
///
/// Schemas are normalized on every call, so a changed [`ParseConfig`] takes
/// effect immediately.
#[derive(Debug, Clone)]
pub struct OpenApiOperation {
    root: Arc<JsonValue>,
    path: String,
    method: String,
    parse_config: ParseConfig,
}

impl OpenApiOperation {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    fn path_item(&self) -> &JsonValue {
        let item = self
            .root
            .get("paths")
            .and_then(|paths| paths.get(&self.path))
            .unwrap_or(&JsonValue::Null);
        resolve_ref(&self.root, item)
    }

    fn raw(&self) -> &JsonValue {
        self.path_item().get(&self.method).unwrap_or(&JsonValue::Null)
    }

    fn normalizer(&self) -> Normalizer<'_> {
        Normalizer::new(&self.root, self.parse_config)
    }

    fn normalize(&self, raw: Option<&JsonValue>) -> Option<Schema> {
        raw.and_then(|raw| self.normalizer().normalize_at(raw, &[], &[]))
    }

    /// Path-item and operation parameters, operation entries winning by
    /// `(name, in)`.
    fn parameters(&self) -> Vec<Parameter> {
        let mut merged: IndexMap<(String, ParameterIn), Parameter> = IndexMap::new();

        let declared = [self.path_item().get("parameters"), self.raw().get("parameters")];
        for list in declared.into_iter().flatten().filter_map(JsonValue::as_array) {
            for raw in list {
                let raw = resolve_ref(&self.root, raw);
                let Some(param) = self.parameter(raw) else {
                    continue;
                };
                merged.insert((param.name.clone(), param.location), param);
            }
        }

        merged.into_values().collect()
    }

    fn parameter(&self, raw: &JsonValue) -> Option<Parameter> {
        let name = raw.get("name")?.as_str()?;
        let location = ParameterIn::parse(raw.get("in")?.as_str()?)?;
        let required = location == ParameterIn::Path
            || raw.get("required").and_then(JsonValue::as_bool).unwrap_or(false);

        Some(Parameter::new(name, location, self.parameter_schema(raw)).required(required))
    }

    /// `schema`, or the schema of the first `content` entry.
    fn parameter_schema(&self, raw: &JsonValue) -> Option<Schema> {
        let schema = raw.get("schema").or_else(|| {
            raw.get("content")
                .and_then(JsonValue::as_object)
                .and_then(|content| content.values().next())
                .and_then(|media| media.get("schema"))
        });
        self.normalize(schema)
    }

    /// Security scheme names required by the operation or, failing that, by
    /// the document.
    fn security_names(&self) -> Vec<String> {
        let requirements = self
            .raw()
            .get("security")
            .or_else(|| self.root.get("security"))
            .and_then(JsonValue::as_array);

        let mut names = Vec::new();
        for requirement in requirements.into_iter().flatten() {
            let Some(requirement) = requirement.as_object() else {
                continue;
            };
            for name in requirement.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    fn request_body(&self) -> Option<RequestBody> {
        let raw = resolve_ref(&self.root, self.raw().get("requestBody")?);
        let content = raw.get("content")?.as_object()?;
        let (content_type, media) = select_content(content, REQUEST_CONTENT_TYPES)?;

        Some(RequestBody {
            schema: self.normalize(media.get("schema")),
            content_type: content_type.to_string(),
        })
    }

    fn select_response(&self) -> Option<(u16, &JsonValue)> {
        let responses = self.raw().get("responses")?.as_object()?;

        let chosen = PREFERRED_STATUS_CODES
            .iter()
            .find_map(|code| responses.get_key_value(*code))
            .or_else(|| {
                responses
                    .iter()
                    .find(|(code, _)| code.as_str() != "default" && transform_http_code(code) > 0)
            })
            .or_else(|| responses.get_key_value("default"))?;

        let (code, raw) = chosen;
        Some((transform_http_code(code), resolve_ref(&self.root, raw)))
    }
}

impl Operation for OpenApiOperation {
    fn id(&self) -> String {
        match self.raw().get("operationId").and_then(JsonValue::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => format!("{} {}", self.method.to_uppercase(), self.path),
        }
    }

    fn unwrap(&self) -> &dyn Operation {
        self
    }

    fn request(&self, security: &SecurityComponents) -> OperationRequest {
        let mut parameters = self.parameters();

        for name in self.security_names() {
            let Some(param) = security.get(&name).and_then(SecurityComponent::parameter) else {
                continue;
            };
            let exists = parameters
                .iter()
                .any(|p| p.location == param.location && p.name.eq_ignore_ascii_case(&param.name));
            if !exists {
                parameters.push(param);
            }
        }

        parameters.sort_by(|a, b| a.name.cmp(&b.name));

        OperationRequest {
            parameters,
            body: self.request_body(),
        }
    }

    fn response(&self) -> OperationResponse {
        let Some((status_code, raw)) = self.select_response() else {
            return OperationResponse::default();
        };

        let mut headers = IndexMap::new();
        if let Some(declared) = raw.get("headers").and_then(JsonValue::as_object) {
            for (name, header) in declared {
                let header = resolve_ref(&self.root, header);
                let name = name.to_lowercase();
                let required = header
                    .get("required")
                    .and_then(JsonValue::as_bool)
                    .unwrap_or(false);
                let param = Parameter::new(name.clone(), ParameterIn::Header, self.parameter_schema(header))
                    .required(required);
                headers.insert(name, param);
            }
        }

        let (content, content_type) = raw
            .get("content")
            .and_then(JsonValue::as_object)
            .and_then(|content| select_content(content, RESPONSE_CONTENT_TYPES))
            .map(|(content_type, media)| (self.normalize(media.get("schema")), content_type.to_string()))
            .unwrap_or_default();

        OperationResponse {
            headers,
            content,
            content_type,
            status_code,
        }
    }

    fn set_parse_config(&mut self, config: ParseConfig) {
        self.parse_config = config;
    }
}

/// Normalize an OpenAPI status key.
///
/// `default`, `*` and all-wildcard keys map to 200, other wildcards replace
/// `x` with `0`. Unparsable keys give 0.
pub fn transform_http_code(code: &str) -> u16 {
    let code = code.to_lowercase().replace('x', "0");
    match code.as_str() {
        "*" | "default" | "000" => 200,
        _ => code.parse().unwrap_or(0),
    }
}

/// Pick a media type by precedence, else the first declared one.
fn select_content<'a>(
    content: &'a Map<String, JsonValue>,
    precedence: &[&str],
) -> Option<(&'a str, &'a JsonValue)> {
    precedence
        .iter()
        .find_map(|ct| content.get_key_value(*ct))
        .or_else(|| content.iter().next())
        .map(|(ct, media)| (ct.as_str(), media))
}

/// Follow `$ref` chains through the document; unresolvable refs stay as is.
fn resolve_ref<'a>(root: &'a JsonValue, mut node: &'a JsonValue) -> &'a JsonValue {
    for _ in 0..MAX_REF_HOPS {
        let Some(reference) = node.get("$ref").and_then(JsonValue::as_str) else {
            break;
        };
        if !reference.starts_with('#') {
            break;
        }
        match navigate_fragment(root, reference) {
            Some(target) => node = target,
            None => {
                tracing::debug!(reference, "unresolved reference");
                break;
            }
        }
    }
    node
}

fn parse_security_schemes(root: &JsonValue) -> SecurityComponents {
    let Some(schemes) = root
        .pointer("/components/securitySchemes")
        .and_then(JsonValue::as_object)
    else {
        return SecurityComponents::new();
    };

    let mut out = SecurityComponents::new();
    for (name, scheme) in schemes {
        let scheme = resolve_ref(root, scheme);
        let auth_type = match scheme.get("type").and_then(JsonValue::as_str) {
            Some("http") => AuthType::Http,
            Some("apiKey") => AuthType::ApiKey,
            _ => continue,
        };
        let auth_scheme = match scheme
            .get("scheme")
            .and_then(JsonValue::as_str)
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("bearer") => Some(AuthScheme::Bearer),
            Some("basic") => Some(AuthScheme::Basic),
            _ => None,
        };
        let location = match scheme.get("in").and_then(JsonValue::as_str) {
            Some("query") => ParameterIn::Query,
            _ => ParameterIn::Header,
        };
        let param_name = scheme
            .get("name")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        out.insert(
            name.clone(),
            SecurityComponent {
                auth_type,
                scheme: auth_scheme,
                location,
                name: param_name,
            },
        );
    }
    out
}

/// Whether two paths match segment by segment, `{template}` segments on
/// either side matching any non-empty segment.
fn path_matches(declared: &str, resource: &str) -> bool {
    let declared: Vec<&str> = declared.trim_end_matches('/').split('/').collect();
    let resource: Vec<&str> = resource.trim_end_matches('/').split('/').collect();
    if declared.len() != resource.len() {
        return false;
    }

    declared.iter().zip(&resource).all(|(d, r)| {
        d == r || (is_template(d) && !r.is_empty()) || (is_template(r) && !d.is_empty())
    })
}

fn is_template(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemaType;
    use serde_json::json;

    fn petstore() -> OpenApiDocument {
        OpenApiDocument::from_value(json!({
            "openapi": "3.0.3",
            "info": {"title": "Pets", "version": "1"},
            "security": [{"token": []}],
            "paths": {
                "/pets": {
                    "get": {
                        "operationId": "listPets",
                        "parameters": [
                            {"name": "limit", "in": "query", "schema": {"type": "integer"}},
                            {"$ref": "#/components/parameters/Trace"}
                        ],
                        "responses": {
                            "200": {
                                "description": "ok",
                                "headers": {"X-Rate-Limit": {"schema": {"type": "integer"}}},
                                "content": {
                                    "text/html": {"schema": {"type": "string"}},
                                    "application/json": {
                                        "schema": {"type": "array", "items": {"$ref": "#/components/schemas/Pet"}}
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "security": [{"basic": []}, {"apiKey": []}],
                        "requestBody": {"$ref": "#/components/requestBodies/NewPet"},
                        "responses": {
                            "4XX": {"description": "bad"},
                            "default": {"description": "err"}
                        }
                    }
                },
                "/pets/{petId}": {
                    "parameters": [
                        {"name": "petId", "in": "path", "schema": {"type": "string"}},
                        {"name": "verbose", "in": "query", "schema": {"type": "boolean"}}
                    ],
                    "get": {
                        "parameters": [
                            {"name": "verbose", "in": "query", "required": true, "schema": {"type": "string"}}
                        ],
                        "responses": {"default": {"$ref": "#/components/responses/Error"}}
                    },
                    "delete": {"responses": {}}
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "required": ["name"],
                        "properties": {
                            "id": {"type": "integer", "readOnly": true},
                            "name": {"type": "string"},
                            "tag": {"type": "string"}
                        }
                    }
                },
                "parameters": {
                    "Trace": {"name": "x-trace", "in": "header", "schema": {"type": "string"}}
                },
                "requestBodies": {
                    "NewPet": {
                        "content": {
                            "application/xml": {"schema": {"$ref": "#/components/schemas/Pet"}},
                            "application/x-www-form-urlencoded": {"schema": {"$ref": "#/components/schemas/Pet"}}
                        }
                    }
                },
                "responses": {
                    "Error": {
                        "description": "error",
                        "content": {"application/problem+json": {"schema": {"type": "object"}}}
                    }
                },
                "securitySchemes": {
                    "token": {"type": "http", "scheme": "bearer"},
                    "basic": {"type": "http", "scheme": "Basic"},
                    "apiKey": {"type": "apiKey", "in": "query", "name": "api_key"},
                    "oauth": {"type": "oauth2", "flows": {}}
                }
            }
        }))
        .unwrap()
    }

    fn names(params: &[Parameter]) -> Vec<&str> {
        params.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn rejects_non_3x_documents() {
        let err = OpenApiDocument::from_value(json!({"swagger": "2.0", "paths": {}})).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedVersion { version } if version == "2.0"));

        let err = OpenApiDocument::from_value(json!({"paths": {}})).unwrap_err();
        assert!(matches!(err, DocumentError::UnsupportedVersion { .. }));
    }

    #[test]
    fn resources_list_sorted_methods() {
        let doc = petstore();
        assert_eq!(doc.version(), "3.0.3");
        let resources = doc.resources();
        assert_eq!(resources["/pets"], vec!["GET", "POST"]);
        assert_eq!(resources["/pets/{petId}"], vec!["DELETE", "GET"]);
    }

    #[test]
    fn security_schemes_are_surfaced() {
        let doc = petstore();
        let security = doc.security();
        assert_eq!(security.len(), 3);
        assert_eq!(security["token"].scheme, Some(AuthScheme::Bearer));
        assert_eq!(security["basic"].scheme, Some(AuthScheme::Basic));
        assert_eq!(security["apiKey"].location, ParameterIn::Query);
        assert!(!security.contains_key("oauth"));
    }

    #[test]
    fn find_operation_distinguishes_not_found_and_not_allowed() {
        let doc = petstore();
        assert_eq!(doc.find_operation("GET", "/pets").unwrap().id(), "listPets");

        let err = doc.find_operation("get", "/owners").unwrap_err();
        assert!(matches!(err, DocumentError::OperationNotFound { .. }));

        let err = doc.find_operation("PATCH", "/pets").unwrap_err();
        assert!(err.is_method_not_allowed());
    }

    #[test]
    fn find_operation_matches_templates() {
        let doc = petstore();
        let op = doc.find_operation("get", "/pets/{id}").unwrap();
        assert_eq!(op.id(), "GET /pets/{petId}");
        assert!(doc.find_operation("delete", "/pets/42").is_ok());
        assert!(doc.find_operation("get", "/pets/42/toys").is_err());
    }

    #[test]
    fn parameters_merge_and_sort() {
        let doc = petstore();
        let op = doc.find_operation("get", "/pets/1").unwrap();
        let request = op.request(doc.security());

        assert_eq!(names(&request.parameters), vec!["authorization", "petId", "verbose"]);
        let verbose = &request.parameters[2];
        assert!(verbose.required);
        assert_eq!(verbose.schema.as_ref().unwrap().schema_type, SchemaType::String);
        assert!(request.parameters[1].required);
        assert!(request.body.is_none());
    }

    #[test]
    fn document_security_applies_by_default() {
        let doc = petstore();
        let op = doc.find_operation("get", "/pets").unwrap();
        let request = op.request(doc.security());

        assert_eq!(names(&request.parameters), vec!["authorization", "limit", "x-trace"]);
        let auth = &request.parameters[0];
        assert_eq!(auth.location, ParameterIn::Header);
        assert!(auth.required);
        assert_eq!(auth.schema.as_ref().unwrap().format(), "bearer");
    }

    #[test]
    fn operation_security_overrides_document() {
        let doc = petstore();
        let op = doc.find_operation("post", "/pets").unwrap();
        let request = op.request(doc.security());

        assert_eq!(names(&request.parameters), vec!["api_key", "authorization"]);
        assert_eq!(request.parameters[0].location, ParameterIn::Query);
        assert_eq!(request.parameters[1].schema.as_ref().unwrap().format(), "basic");
    }

    #[test]
    fn request_body_follows_precedence() {
        let doc = petstore();
        let op = doc.find_operation("post", "/pets").unwrap();
        let body = op.request(doc.security()).body.unwrap();

        assert_eq!(body.content_type, "application/x-www-form-urlencoded");
        let schema = body.schema.unwrap();
        assert_eq!(schema.properties.len(), 3);
        assert!(schema.is_required("name"));
    }

    #[test]
    fn response_prefers_json_and_lowercases_headers() {
        let doc = petstore();
        let response = doc.find_operation("get", "/pets").unwrap().response();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.content_type, "application/json");
        assert_eq!(response.content.unwrap().schema_type, SchemaType::Array);
        assert!(response.headers.contains_key("x-rate-limit"));
        assert_eq!(response.headers["x-rate-limit"].location, ParameterIn::Header);
    }

    #[test]
    fn response_falls_back_through_codes() {
        let doc = petstore();

        let response = doc.find_operation("post", "/pets").unwrap().response();
        assert_eq!(response.status_code, 400);
        assert!(response.content.is_none());

        let response = doc.find_operation("get", "/pets/1").unwrap().response();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content_type, "application/problem+json");

        let response = doc.find_operation("delete", "/pets/1").unwrap().response();
        assert_eq!(response, OperationResponse::default());
    }

    #[test]
    fn parse_config_applies_to_later_calls() {
        let doc = petstore();
        let mut op = doc.find_operation("post", "/pets").unwrap();
        op.set_parse_config(ParseConfig::new().only_required(true));

        let schema = op.request(doc.security()).body.unwrap().schema.unwrap();
        assert_eq!(schema.properties.keys().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn http_code_transform() {
        assert_eq!(transform_http_code("200"), 200);
        assert_eq!(transform_http_code("2XX"), 200);
        assert_eq!(transform_http_code("2xx"), 200);
        assert_eq!(transform_http_code("20x"), 200);
        assert_eq!(transform_http_code("default"), 200);
        assert_eq!(transform_http_code("*"), 200);
        assert_eq!(transform_http_code("xxx"), 200);
        assert_eq!(transform_http_code("5XX"), 500);
        assert_eq!(transform_http_code("oops"), 0);
    }

    #[test]
    fn unwrap_returns_self_for_base_operations() {
        let doc = petstore();
        let op = doc.find_operation("get", "/pets").unwrap();
        assert_eq!(op.unwrap().id(), "listPets");
    }
}
