//! Integration tests for normalization, the replacer pipeline and content
//! generation.

use openapi_mockgen::{
    generate, generate_request_headers, generate_url_from_parameters, normalize, parse_context,
    validate_content, Contexts, Direction, Parameter, ParameterIn, ParseConfig, Pipeline,
    ReplaceState, Schema, SchemaType, SecurityComponent, Value, ValueReplacer,
};
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicI64, Ordering};

fn schema(raw: JsonValue) -> Schema {
    normalize(&raw, &raw, &ParseConfig::new()).unwrap()
}

fn schema_in(raw: JsonValue, root: &JsonValue, config: ParseConfig) -> Option<Schema> {
    normalize(&raw, root, &config)
}

fn seeded() -> Pipeline {
    Pipeline::builder().seed(42).build()
}

mod structure {
    use super::*;

    #[test]
    fn empty_object_depends_only_on_nullable() {
        let replacer = seeded();
        let plain = schema(json!({"type": "object"}));
        assert_eq!(
            generate(Some(&plain), &replacer, &ReplaceState::response()),
            Some(Value::Map(Default::default()))
        );

        let nullable = schema(json!({"type": "object", "nullable": true}));
        assert_eq!(generate(Some(&nullable), &replacer, &ReplaceState::response()), None);
    }

    #[test]
    fn min_items_three_in_call_order() {
        let calls = AtomicI64::new(0);
        let replacer = move |_: Option<&Schema>, _: &ReplaceState| {
            Some(Value::Int(calls.fetch_add(1, Ordering::SeqCst) + 10))
        };
        let s = schema(json!({"type": "array", "minItems": 3, "items": {"type": "integer"}}));

        let out = generate(Some(&s), &replacer, &ReplaceState::response()).unwrap();
        assert_eq!(
            out,
            Value::List(vec![Value::Int(10), Value::Int(11), Value::Int(12)])
        );
    }

    #[test]
    fn normalized_type_is_always_one_of_six() {
        let raws = [
            json!({}),
            json!({"enum": [1, 2]}),
            json!({"enum": [null, "a"]}),
            json!({"properties": {"a": {}}}),
            json!({"items": {"type": "string"}}),
            json!({"allOf": [{"properties": {"a": {}}}, {"required": ["a"]}]}),
            json!({"anyOf": [{"type": "integer"}, {"type": "string"}]}),
            json!({"oneOf": [{"items": {}}]}),
            json!({"type": ["null", "boolean"]}),
            json!({"not": {"type": "string"}}),
        ];
        for raw in raws {
            let s = normalize(&raw, &raw, &ParseConfig::new()).unwrap();
            assert!(matches!(
                s.schema_type,
                SchemaType::String
                    | SchemaType::Integer
                    | SchemaType::Number
                    | SchemaType::Boolean
                    | SchemaType::Object
                    | SchemaType::Array
            ));
        }
    }

    #[test]
    fn recursion_level_one_nests_once() {
        let root = json!({
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "child": {"$ref": "#/components/schemas/Node"}
                }
            }}}
        });
        let raw = json!({"$ref": "#/components/schemas/Node"});
        let s = schema_in(raw, &root, ParseConfig::new().max_recursion_levels(1)).unwrap();

        let out = generate(Some(&s), &seeded(), &ReplaceState::response()).unwrap();
        let top = out.as_map().unwrap();
        let child = top["child"].as_map().unwrap();
        assert!(child.contains_key("name"));
        assert!(!child.contains_key("child"));
    }

    #[test]
    fn strict_recursion_drops_the_cycle() {
        let root = json!({
            "components": {"schemas": {"Node": {
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "child": {"$ref": "#/components/schemas/Node"}
                }
            }}}
        });
        let raw = json!({"$ref": "#/components/schemas/Node"});
        let s = schema_in(raw, &root, ParseConfig::new()).unwrap();

        let out = generate(Some(&s), &seeded(), &ReplaceState::response()).unwrap();
        let keys: Vec<_> = out.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name"]);
    }

    #[test]
    fn read_only_and_write_only_follow_direction() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "id": {"type": "integer", "readOnly": true},
                "secret": {"type": "string", "writeOnly": true},
                "name": {"type": "string"}
            }
        }));
        let replacer = seeded();

        let response = generate(Some(&s), &replacer, &ReplaceState::response()).unwrap();
        let response = response.as_map().unwrap();
        assert!(response.contains_key("id"));
        assert!(!response.contains_key("secret"));

        let request = generate(Some(&s), &replacer, &ReplaceState::request()).unwrap();
        let request = request.as_map().unwrap();
        assert!(!request.contains_key("id"));
        assert!(request.contains_key("secret"));
    }
}

mod scenarios {
    use super::*;

    #[test]
    fn a_null_replacer_gives_empty_list() {
        let s = schema(json!({"type": "array", "items": {"type": "string"}}));
        let replacer = |_: Option<&Schema>, _: &ReplaceState| Some(Value::Null);
        assert_eq!(
            generate(Some(&s), &replacer, &ReplaceState::response()),
            Some(Value::List(vec![]))
        );
    }

    #[test]
    fn b_additional_properties_yield_six_keys() {
        let s = schema(json!({
            "type": "object",
            "minProperties": 5,
            "properties": {"name": {"type": "string"}},
            "additionalProperties": {"type": "string"}
        }));
        assert_eq!(s.properties.len(), 6);
        assert!(s.properties.contains_key("extra-5"));

        let out = generate(Some(&s), &seeded(), &ReplaceState::response()).unwrap();
        assert_eq!(out.as_map().unwrap().len(), 6);
    }

    #[test]
    fn c_path_parameters() {
        let params = [
            Parameter::new("id", ParameterIn::Path, Some(Schema::new(SchemaType::Integer))),
            Parameter::new("file-id", ParameterIn::Path, Some(Schema::string())),
        ];
        let replacer = |_: Option<&Schema>, state: &ReplaceState| match state.leaf_name() {
            Some("id") => Some(Value::Int(123)),
            Some("file-id") => Some(Value::from("foo")),
            _ => None,
        };
        assert_eq!(
            generate_url_from_parameters("/users/{id}/{file-id}", &replacer, &params),
            "/users/123/foo"
        );

        let empty = |_: Option<&Schema>, _: &ReplaceState| Some(Value::from(""));
        assert_eq!(
            generate_url_from_parameters("/users/{id}/{file-id}", &empty, &params),
            "/users/{id}/{file-id}"
        );
    }

    #[test]
    fn d_bearer_header_without_context() {
        let bearer = SecurityComponent {
            auth_type: openapi_mockgen::AuthType::Http,
            scheme: Some(openapi_mockgen::AuthScheme::Bearer),
            location: ParameterIn::Header,
            name: String::new(),
        };
        let params = [bearer.parameter().unwrap()];

        for seed in 0..5 {
            let replacer = Pipeline::builder().seed(seed).build();
            let headers = generate_request_headers(&params, &replacer);
            let value = headers["authorization"].as_str().unwrap().to_string();

            let tokens: Vec<&str> = value.split(' ').collect();
            assert_eq!(tokens.len(), 2, "{value}");
            assert_eq!(tokens[0], "Bearer");
            assert!(!tokens[1].is_empty());
        }
    }
}

mod pipeline {
    use super::*;

    fn with_context(yaml: &str) -> Pipeline {
        Pipeline::builder()
            .contexts(Contexts::new().with("petstore", parse_context(yaml).unwrap()))
            .seed(1)
            .build()
    }

    #[test]
    fn context_values_fill_matching_names() {
        let replacer = with_context("user:\n  first_name: Jane\nemail: jane@example.com\n");
        let s = schema(json!({
            "type": "object",
            "properties": {
                "user": {
                    "type": "object",
                    "properties": {"firstName": {"type": "string"}}
                },
                "email": {"type": "string", "format": "email"}
            }
        }));

        let out = generate(Some(&s), &replacer, &ReplaceState::response()).unwrap();
        assert_eq!(
            out.to_json(),
            json!({"user": {"firstName": "Jane"}, "email": "jane@example.com"})
        );
    }

    #[test]
    fn context_null_drops_the_field() {
        let replacer = with_context("nickname: __null__\n");
        let s = schema(json!({
            "type": "object",
            "properties": {"nickname": {"type": "string"}, "name": {"type": "string"}}
        }));
        let out = generate(Some(&s), &replacer, &ReplaceState::response()).unwrap();
        let keys: Vec<_> = out.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name"]);
    }

    #[test]
    fn regex_context_keys_match_leaf_names() {
        let replacer = with_context("\"^.*_id$\": 77\n");
        let s = schema(json!({
            "type": "object",
            "properties": {"owner_id": {"type": "integer"}}
        }));
        let out = generate(Some(&s), &replacer, &ReplaceState::response()).unwrap();
        assert_eq!(out.to_json(), json!({"owner_id": 77}));
    }

    #[test]
    fn generated_content_satisfies_constraints() {
        let s = schema(json!({
            "type": "object",
            "required": ["id", "code", "status", "tags"],
            "properties": {
                "id": {"type": "integer", "minimum": 10, "maximum": 20},
                "code": {"type": "string", "pattern": "^[A-Z]{3}-[0-9]{2}$"},
                "status": {"type": "string", "enum": ["available", "sold"]},
                "price": {"type": "number", "minimum": 0, "maximum": 5, "multipleOf": 0.5},
                "tags": {"type": "array", "minItems": 2, "items": {"type": "string", "maxLength": 5}},
                "created": {"type": "string", "format": "date-time"},
                "uid": {"type": "string", "format": "uuid"}
            }
        }));

        for seed in 0..10 {
            let replacer = Pipeline::builder().seed(seed).build();
            let out = generate(Some(&s), &replacer, &ReplaceState::response()).unwrap();
            validate_content(&s, &out.to_json(), Direction::Response)
                .unwrap_or_else(|e| panic!("seed {seed}: {e:?} in {}", out.to_json()));
        }
    }

    #[test]
    fn same_seed_same_content() {
        let s = schema(json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "count": {"type": "integer"},
                "ok": {"type": "boolean"}
            }
        }));
        let a = generate(Some(&s), &seeded(), &ReplaceState::response());
        let b = generate(Some(&s), &seeded(), &ReplaceState::response());
        assert_eq!(a, b);
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        let s = schema(json!({"type": "array", "minItems": 4, "items": {"type": "string"}}));
        let replacer = seeded();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let out = generate(Some(&s), &replacer, &ReplaceState::response()).unwrap();
                    assert_eq!(out.as_list().unwrap().len(), 4);
                });
            }
        });
    }

    #[test]
    fn placeholder_lookups_without_schema() {
        let replacer = with_context("pet_id: \"42\"\n");
        let state = ReplaceState::request().child_named("petId").with_path_param();
        assert_eq!(replacer.replace(None, &state), Some(Value::from("42")));
    }
}
