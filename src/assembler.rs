//! Request and response assembly.
//!
//! Turns an [`Operation`]'s shapes into concrete payloads: a path with its
//! placeholders filled, a query string, headers, an encoded body and a cURL
//! snippet for documentation. Encoding failures are logged and leave the
//! body empty; the rest of the request is still returned.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, warn};

use crate::document::{Operation, Parameter, ParameterIn, SecurityComponents};
use crate::error::EncodeError;
use crate::generator::generate;
use crate::patterns::extract_placeholders;
use crate::replacer::ValueReplacer;
use crate::state::ReplaceState;
use crate::value::Value;

/// Content type used when a response declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A generated request, ready to be sent or shown.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedRequest {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Value>,
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub query: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<ContentExample>,
}

/// Documentation snippets for a generated request.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ContentExample {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub curl: String,
}

/// A generated response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeneratedResponse {
    pub headers: IndexMap<String, String>,
    pub content: Vec<u8>,
    pub content_type: String,
    pub status_code: u16,
}

impl GeneratedResponse {
    /// Body as text, replacing invalid UTF-8.
    pub fn content_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Generate a request for `operation` mounted at `path_prefix + path`.
pub fn new_request_from_operation<R>(
    path_prefix: &str,
    path: &str,
    method: &str,
    operation: &dyn Operation,
    security: &SecurityComponents,
    replacer: &R,
) -> GeneratedRequest
where
    R: ValueReplacer + ?Sized,
{
    let shape = operation.request(security);
    let (schema, content_type) = match &shape.body {
        Some(body) => (body.schema.as_ref(), body.content_type.clone()),
        None => (None, String::new()),
    };

    let state = ReplaceState::request().with_content_type(content_type.as_str());
    let content = generate(schema, replacer, &state);

    let body = encode_content(content.as_ref(), &content_type).unwrap_or_else(|err| {
        error!(operation = %operation.id(), %err, "cannot encode request body");
        Vec::new()
    });
    let curl = create_curl_body(content.as_ref(), &content_type).unwrap_or_else(|err| {
        error!(operation = %operation.id(), %err, "cannot create cURL example");
        String::new()
    });

    GeneratedRequest {
        headers: generate_request_headers(&shape.parameters, replacer),
        method: method.to_uppercase(),
        path: format!(
            "{}{}",
            path_prefix,
            generate_url_from_parameters(path, replacer, &shape.parameters)
        ),
        query: generate_query(replacer, &shape.parameters),
        body: String::from_utf8_lossy(&body).into_owned(),
        content_type,
        examples: Some(ContentExample { curl }),
    }
}

/// Generate the response `operation` would return.
pub fn new_response_from_operation<R>(operation: &dyn Operation, replacer: &R) -> GeneratedResponse
where
    R: ValueReplacer + ?Sized,
{
    let shape = operation.response();
    let content_type = if shape.content_type.is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        shape.content_type
    };

    let mut headers = generate_response_headers(&shape.headers, replacer);
    headers.insert("content-type".to_string(), content_type.clone());

    let state = ReplaceState::response().with_content_type(content_type.as_str());
    let content = generate(shape.content.as_ref(), replacer, &state);
    let content = encode_content(content.as_ref(), &content_type).unwrap_or_else(|err| {
        error!(operation = %operation.id(), %err, "cannot encode response");
        Vec::new()
    });

    GeneratedResponse {
        headers,
        content,
        content_type,
        status_code: shape.status_code,
    }
}

/// Generate a request for a resource declared without a schema.
///
/// `{name}` placeholders in `path` are asked of the replacer in path mode.
pub fn new_request_from_fixed_resource<R>(
    path: &str,
    method: &str,
    content_type: &str,
    replacer: &R,
) -> GeneratedRequest
where
    R: ValueReplacer + ?Sized,
{
    let mut out = path.to_string();
    for placeholder in extract_placeholders(path) {
        let name = &placeholder[1..placeholder.len() - 1];
        let state = ReplaceState::request().child_named(name).with_path_param();
        let replaced = render(replacer.replace(None, &state).as_ref());
        if replaced.is_empty() {
            warn!(parameter = name, "parameter not replaced in URL path");
            continue;
        }
        out = out.replace(&placeholder, &replaced);
    }

    GeneratedRequest {
        method: method.to_uppercase(),
        path: out,
        content_type: content_type.to_string(),
        ..GeneratedRequest::default()
    }
}

/// Build a response from a fixed payload.
///
/// JSON payloads have their `{placeholder}` strings filled; anything else is
/// returned as is. Fixed resources always answer 200.
pub fn new_response_from_fixed_content<R>(
    payload: &[u8],
    content_type: &str,
    replacer: &R,
) -> GeneratedResponse
where
    R: ValueReplacer + ?Sized,
{
    let content = if media_type(content_type) == DEFAULT_CONTENT_TYPE {
        serde_json::from_slice::<JsonValue>(payload)
            .map_err(EncodeError::from)
            .and_then(|template| {
                let filled = fill_content_placeholders(&template, replacer);
                serde_json::to_vec(&filled).map_err(EncodeError::from)
            })
            .unwrap_or_else(|err| {
                error!(%err, "cannot fill fixed JSON content");
                payload.to_vec()
            })
    } else {
        payload.to_vec()
    };

    let mut headers = IndexMap::new();
    headers.insert("content-type".to_string(), content_type.to_string());

    GeneratedResponse {
        headers,
        content,
        content_type: content_type.to_string(),
        status_code: 200,
    }
}

/// Substitute `{name}` path placeholders from path parameters.
///
/// Parameters the replacer leaves empty keep their placeholder and are
/// logged.
pub fn generate_url_from_parameters<R>(path: &str, replacer: &R, params: &[Parameter]) -> String
where
    R: ValueReplacer + ?Sized,
{
    let mut out = path.to_string();
    for param in params.iter().filter(|p| p.location == ParameterIn::Path) {
        let state = ReplaceState::request()
            .child_named(param.name.as_str())
            .with_path_param();
        let replaced = render(replacer.replace(param.schema.as_ref(), &state).as_ref());
        if replaced.is_empty() {
            warn!(parameter = %param.name, "parameter not replaced in URL path");
            continue;
        }
        out = out.replace(&format!("{{{}}}", param.name), &replaced);
    }
    out
}

/// Build the query string from query parameters.
///
/// Lists become repeated `name[]=value` pairs. Values are escaped, keys are
/// not, so the brackets survive.
pub fn generate_query<R>(replacer: &R, params: &[Parameter]) -> String
where
    R: ValueReplacer + ?Sized,
{
    let mut pairs = Vec::new();
    for param in params.iter().filter(|p| p.location == ParameterIn::Query) {
        let state = ReplaceState::request().child_named(param.name.as_str());
        match generate(param.schema.as_ref(), replacer, &state) {
            Some(Value::List(items)) => {
                for item in &items {
                    pairs.push(format!("{}[]={}", param.name, query_escape(&item.to_string())));
                }
            }
            value => pairs.push(format!("{}={}", param.name, query_escape(&render(value.as_ref())))),
        }
    }
    pairs.join("&")
}

/// Generate header parameters in header mode, keyed by lower-cased name.
pub fn generate_request_headers<R>(params: &[Parameter], replacer: &R) -> IndexMap<String, Value>
where
    R: ValueReplacer + ?Sized,
{
    let mut out = IndexMap::new();
    for param in params.iter().filter(|p| p.location == ParameterIn::Header) {
        let Some(schema) = param.schema.as_ref() else {
            continue;
        };
        let name = param.name.to_lowercase();
        let state = ReplaceState::request()
            .child_named(name.as_str())
            .with_header();
        if let Some(value) = generate(Some(schema), replacer, &state) {
            out.insert(name, value);
        }
    }
    out
}

/// Generate response header values in header mode.
pub fn generate_response_headers<R>(
    headers: &IndexMap<String, Parameter>,
    replacer: &R,
) -> IndexMap<String, String>
where
    R: ValueReplacer + ?Sized,
{
    headers
        .iter()
        .map(|(name, param)| {
            let name = name.to_lowercase();
            let state = ReplaceState::response()
                .child_named(name.as_str())
                .with_header();
            let value = generate(param.schema.as_ref(), replacer, &state);
            (name, render(value.as_ref()))
        })
        .collect()
}

/// Encode generated content for `content_type`.
///
/// JSON and form types are sent as JSON text. Unknown types pass strings
/// through and render other values as text.
pub fn encode_content(content: Option<&Value>, content_type: &str) -> Result<Vec<u8>, EncodeError> {
    let Some(content) = content else {
        return Ok(Vec::new());
    };

    match media_type(content_type) {
        "application/json" | "application/x-www-form-urlencoded" | "multipart/form-data" => {
            Ok(serde_json::to_vec(content)?)
        }
        "application/xml" | "text/xml" => Ok(to_xml(content)?.into_bytes()),
        "application/x-yaml" | "application/yaml" | "text/yaml" => {
            Ok(serde_yaml::to_string(content)?.into_bytes())
        }
        _ => Ok(content.to_string().into_bytes()),
    }
}

/// A cURL argument snippet sending `content` as `content_type`.
///
/// Form types need a map and list fields in key order. Unsupported types give
/// an empty snippet.
pub fn create_curl_body(content: Option<&Value>, content_type: &str) -> Result<String, EncodeError> {
    let Some(content) = content else {
        return Ok(String::new());
    };

    match media_type(content_type) {
        ct @ ("application/x-www-form-urlencoded" | "multipart/form-data") => {
            let Value::Map(fields) = content else {
                return Err(EncodeError::UnexpectedFormType {
                    content_type: ct.to_string(),
                });
            };

            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            let lines: Vec<String> = keys
                .into_iter()
                .map(|key| {
                    let name = query_escape(key);
                    let value = query_escape(&fields[key.as_str()].to_string());
                    if ct == "multipart/form-data" {
                        format!("--form '{name}=\"{value}\"'")
                    } else {
                        format!("--data-urlencode '{name}={value}'")
                    }
                })
                .collect();
            Ok(lines.join(" \\\n"))
        }
        "application/json" => Ok(format!("--data-raw '{}'", serde_json::to_string(content)?)),
        "application/xml" | "text/xml" => Ok(format!("--data '{}'", to_xml(content)?)),
        _ => Ok(String::new()),
    }
}

/// Replace `{placeholder}` strings in a JSON template.
///
/// A string that is exactly one placeholder takes the replacer's value with
/// its type. Strings mixing text and placeholders are interpolated.
/// Placeholders without a value stay in place.
pub fn fill_content_placeholders<R>(template: &JsonValue, replacer: &R) -> JsonValue
where
    R: ValueReplacer + ?Sized,
{
    fill_json(template, replacer, &ReplaceState::response())
}

fn fill_json<R>(node: &JsonValue, replacer: &R, state: &ReplaceState) -> JsonValue
where
    R: ValueReplacer + ?Sized,
{
    match node {
        JsonValue::Object(map) => JsonValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), fill_json(v, replacer, state)))
                .collect(),
        ),
        JsonValue::Array(items) => {
            JsonValue::Array(items.iter().map(|v| fill_json(v, replacer, state)).collect())
        }
        JsonValue::String(text) => fill_string(text, replacer, state),
        other => other.clone(),
    }
}

fn fill_string<R>(text: &str, replacer: &R, state: &ReplaceState) -> JsonValue
where
    R: ValueReplacer + ?Sized,
{
    let mut resolved: Vec<(String, Value)> = Vec::new();
    for placeholder in extract_placeholders(text) {
        let name = &placeholder[1..placeholder.len() - 1];
        if let Some(value) = replacer.replace(None, &state.child_named(name)) {
            resolved.push((placeholder, value));
        }
    }

    match resolved.as_slice() {
        [] => JsonValue::String(text.to_string()),
        [(placeholder, value)] if placeholder == text => value.to_json(),
        _ => {
            let mut out = text.to_string();
            for (placeholder, value) in &resolved {
                out = out.replace(placeholder.as_str(), &value.to_string());
            }
            JsonValue::String(out)
        }
    }
}

/// The media type without parameters such as `charset`.
fn media_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
}

fn to_xml(content: &Value) -> Result<String, EncodeError> {
    Ok(quick_xml::se::to_string_with_root("root", content)?)
}

fn render(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(value) => value.to_string(),
    }
}

fn query_escape(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize;
    use crate::schema::Schema;
    use crate::types::ParseConfig;
    use serde_json::json;

    fn schema(raw: JsonValue) -> Schema {
        normalize(&raw, &json!({}), &ParseConfig::new()).unwrap()
    }

    fn path_param(name: &str) -> Parameter {
        Parameter::new(name, ParameterIn::Path, Some(Schema::string()))
    }

    #[test]
    fn path_placeholders_are_substituted() {
        let replacer = |_: Option<&Schema>, state: &ReplaceState| match state.leaf_name() {
            Some("id") => Some(Value::Int(123)),
            Some("file-id") => Some(Value::from("foo")),
            _ => None,
        };
        let params = [path_param("id"), path_param("file-id")];
        assert_eq!(
            generate_url_from_parameters("/users/{id}/{file-id}", &replacer, &params),
            "/users/123/foo"
        );
    }

    #[test]
    fn empty_path_values_leave_placeholders() {
        let replacer = |_: Option<&Schema>, _: &ReplaceState| Some(Value::from(""));
        let params = [path_param("id"), path_param("file-id")];
        assert_eq!(
            generate_url_from_parameters("/users/{id}/{file-id}", &replacer, &params),
            "/users/{id}/{file-id}"
        );
    }

    #[test]
    fn path_params_are_asked_in_path_mode() {
        let replacer = |_: Option<&Schema>, state: &ReplaceState| {
            state.is_path_param.then(|| Value::from("p"))
        };
        let params = [path_param("id")];
        assert_eq!(generate_url_from_parameters("/a/{id}", &replacer, &params), "/a/p");
    }

    #[test]
    fn query_lists_repeat_with_brackets() {
        let params = [
            Parameter::new(
                "tags",
                ParameterIn::Query,
                Some(schema(json!({"type": "array", "minItems": 2, "items": {"type": "string"}}))),
            ),
            Parameter::new("q", ParameterIn::Query, Some(Schema::string())),
            path_param("id"),
        ];
        let replacer = |_: Option<&Schema>, state: &ReplaceState| match state.leaf_name() {
            Some("tags") => Some(Value::from(format!("a b{}", state.element_index))),
            Some("q") => Some(Value::from("x&y")),
            _ => None,
        };
        assert_eq!(
            generate_query(&replacer, &params),
            "tags[]=a+b1&tags[]=a+b2&q=x%26y"
        );
    }

    #[test]
    fn headers_are_lowercased_and_generated_in_header_mode() {
        let params = [
            Parameter::new("X-Request-Id", ParameterIn::Header, Some(Schema::string())),
            Parameter::new("X-Missing-Schema", ParameterIn::Header, None),
            Parameter::new("q", ParameterIn::Query, Some(Schema::string())),
        ];
        let replacer = |_: Option<&Schema>, state: &ReplaceState| {
            state.is_header.then(|| Value::from(state.leaf_name().unwrap_or_default()))
        };
        let headers = generate_request_headers(&params, &replacer);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers["x-request-id"], Value::from("x-request-id"));
    }

    #[test]
    fn encodes_by_content_type() {
        let content = Value::from(json!({"name": "Rex", "age": 3}));

        let encoded = encode_content(Some(&content), "application/json").unwrap();
        assert_eq!(String::from_utf8(encoded).unwrap(), r#"{"name":"Rex","age":3}"#);

        let encoded = encode_content(Some(&content), "application/json; charset=utf-8").unwrap();
        assert!(!encoded.is_empty());

        let encoded = encode_content(Some(&content), "application/x-yaml").unwrap();
        assert_eq!(String::from_utf8(encoded).unwrap(), "name: Rex\nage: 3\n");

        let encoded = encode_content(Some(&content), "application/xml").unwrap();
        let xml = String::from_utf8(encoded).unwrap();
        assert!(xml.starts_with("<root>"));
        assert!(xml.contains("<name>Rex</name>"));

        let encoded = encode_content(Some(&Value::from("plain")), "text/plain").unwrap();
        assert_eq!(encoded, b"plain");

        assert!(encode_content(None, "application/json").unwrap().is_empty());
    }

    #[test]
    fn curl_bodies_per_content_type() {
        let content = Value::from(json!({"name": "a b", "id": 1}));

        let curl = create_curl_body(Some(&content), "application/x-www-form-urlencoded").unwrap();
        assert_eq!(curl, "--data-urlencode 'id=1' \\\n--data-urlencode 'name=a+b'");

        let curl = create_curl_body(Some(&content), "multipart/form-data").unwrap();
        assert_eq!(curl, "--form 'id=\"1\"' \\\n--form 'name=\"a+b\"'");

        let curl = create_curl_body(Some(&content), "application/json").unwrap();
        assert_eq!(curl, r#"--data-raw '{"name":"a b","id":1}'"#);

        assert_eq!(create_curl_body(Some(&content), "text/plain").unwrap(), "");
    }

    #[test]
    fn form_curl_needs_a_map() {
        let err = create_curl_body(Some(&Value::from("x")), "multipart/form-data").unwrap_err();
        assert!(matches!(err, EncodeError::UnexpectedFormType { .. }));
    }

    #[test]
    fn fixed_resource_paths() {
        let nothing = |_: Option<&Schema>, _: &ReplaceState| -> Option<Value> { None };
        let request = new_request_from_fixed_resource("/files/{id}", "get", "", &nothing);
        assert_eq!(request.path, "/files/{id}");
        assert_eq!(request.method, "GET");

        let replacer = |schema: Option<&Schema>, state: &ReplaceState| {
            assert!(schema.is_none());
            assert!(state.is_path_param);
            Some(Value::from("7"))
        };
        let request = new_request_from_fixed_resource("/files/{id}/{id}", "get", "text/plain", &replacer);
        assert_eq!(request.path, "/files/7/7");
        assert_eq!(request.content_type, "text/plain");
    }

    #[test]
    fn json_placeholders_keep_types_or_interpolate() {
        let replacer = |_: Option<&Schema>, state: &ReplaceState| match state.leaf_name() {
            Some("id") => Some(Value::Int(42)),
            Some("name") => Some(Value::from("Rex")),
            _ => None,
        };
        let template = json!({
            "id": "{id}",
            "label": "{name}-{id}",
            "nested": [{"owner": "{name}"}],
            "unknown": "{nope}",
            "count": 3
        });
        assert_eq!(
            fill_content_placeholders(&template, &replacer),
            json!({
                "id": 42,
                "label": "Rex-42",
                "nested": [{"owner": "Rex"}],
                "unknown": "{nope}",
                "count": 3
            })
        );
    }

    #[test]
    fn fixed_json_content_is_filled() {
        let replacer = |_: Option<&Schema>, _: &ReplaceState| Some(Value::Int(1));
        let response = new_response_from_fixed_content(br#"{"id": "{id}"}"#, "application/json", &replacer);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.content_str(), r#"{"id":1}"#);
        assert_eq!(response.headers["content-type"], "application/json");

        let response = new_response_from_fixed_content(b"{id}", "text/plain", &replacer);
        assert_eq!(response.content, b"{id}");
    }
}
