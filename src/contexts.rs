//! User-supplied context data.
//!
//! Context files are YAML maps keyed by snake-cased property names. Values are
//! literals, lists (one element picked per lookup) or generator functions
//! written as string prefixes:
//!
//! ```yaml
//! name: fake:person.first_name
//! code: botify:???-###
//! age: func:int_between:18,65
//! greeting: func:echo:hello
//! host: alias:common.server.host
//! in-path:
//!   user_id: 42
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::ConfigError;
use crate::faker::{fake_function, FakeFn, Faker};
use crate::patterns::{maybe_regex_pattern, validate_with_pattern};
use crate::types::NULL;
use crate::value::Value;

/// Map of keys to context values within one namespace.
pub type ContextData = IndexMap<String, ContextValue>;

/// A generator attached to a context key.
#[derive(Clone)]
pub enum ContextFunc {
    Fake(FakeFn),
    Echo(String),
    IntBetween(i64, i64),
    Botify(String),
}

impl std::fmt::Debug for ContextFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextFunc::Fake(_) => f.write_str("Fake(..)"),
            ContextFunc::Echo(text) => f.debug_tuple("Echo").field(text).finish(),
            ContextFunc::IntBetween(low, high) => {
                f.debug_tuple("IntBetween").field(low).field(high).finish()
            }
            ContextFunc::Botify(pattern) => f.debug_tuple("Botify").field(pattern).finish(),
        }
    }
}

impl ContextFunc {
    pub fn call(&self, faker: &mut Faker) -> Value {
        match self {
            ContextFunc::Fake(f) => f(faker),
            ContextFunc::Echo(text) => Value::String(text.clone()),
            ContextFunc::IntBetween(low, high) => Value::Int(faker.int_between(*low, *high)),
            ContextFunc::Botify(pattern) => Value::String(faker.bothify(pattern)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ContextValue>),
    Map(ContextData),
    Func(ContextFunc),
}

impl ContextValue {
    /// Resolve a snake-cased name path against this value.
    ///
    /// Maps are searched by leaf name, then by the first path segment, then by
    /// keys that look like regular expressions matched against the leaf name.
    /// Lists yield one random element, functions are called. The `__null__`
    /// marker resolves to [`Value::Null`].
    pub fn resolve(&self, path: &[String], faker: &mut Faker) -> Option<Value> {
        match self {
            ContextValue::Map(map) => lookup(map, path, faker),
            ContextValue::Func(f) => Some(f.call(faker)),
            ContextValue::String(s) if s == NULL => Some(Value::Null),
            ContextValue::String(s) => Some(Value::String(s.clone())),
            ContextValue::Int(i) => Some(Value::Int(*i)),
            ContextValue::Float(f) => Some(Value::Float(*f)),
            ContextValue::Bool(b) => Some(Value::Bool(*b)),
            ContextValue::Null => None,
            ContextValue::List(items) => {
                let item = faker.choose(items)?.clone();
                item.resolve(&[], faker)
            }
        }
    }

    pub fn as_map(&self) -> Option<&ContextData> {
        match self {
            ContextValue::Map(map) => Some(map),
            _ => None,
        }
    }

    fn from_yaml(value: serde_yaml::Value, key: &str) -> Self {
        match value {
            serde_yaml::Value::Null => ContextValue::Null,
            serde_yaml::Value::Bool(b) => ContextValue::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => ContextValue::Int(i),
                None => ContextValue::Float(n.as_f64().unwrap_or_default()),
            },
            serde_yaml::Value::String(s) => {
                parse_function(key, &s).unwrap_or(ContextValue::String(s))
            }
            serde_yaml::Value::Sequence(items) => ContextValue::List(
                items
                    .into_iter()
                    .map(|item| ContextValue::from_yaml(item, key))
                    .collect(),
            ),
            serde_yaml::Value::Mapping(mapping) => ContextValue::Map(from_mapping(mapping)),
            serde_yaml::Value::Tagged(tagged) => ContextValue::from_yaml(tagged.value, key),
        }
    }
}

/// Resolve a snake-cased name path in one namespace. See
/// [`ContextValue::resolve`].
pub fn lookup(map: &ContextData, path: &[String], faker: &mut Faker) -> Option<Value> {
    let leaf = path.last()?;
    let rest = &path[1..];

    if let Some(value) = map.get(leaf) {
        return value.resolve(rest, faker);
    }

    if path.len() > 1 {
        if let Some(value) = map.get(&path[0]) {
            return value.resolve(rest, faker);
        }
    }

    for (key, value) in map {
        if !maybe_regex_pattern(key) {
            continue;
        }
        let pattern = if key == "*" { ".*" } else { key.as_str() };
        if validate_with_pattern(leaf, pattern) {
            return value.resolve(rest, faker);
        }
    }

    None
}

/// Parse `fake:`, `func:` and `botify:` prefixed strings.
///
/// Unknown functions and malformed arguments yield `None` so the string is
/// kept as a literal.
fn parse_function(key: &str, raw: &str) -> Option<ContextValue> {
    let mut parts = raw.splitn(3, ':');
    let prefix = parts.next()?.to_lowercase();
    let name = parts.next();
    let args = parts.next();

    let func = match (prefix.as_str(), name, args) {
        ("fake", Some(name), None) | ("func", Some(name), None) => {
            let name = if name.is_empty() { key } else { name };
            ContextFunc::Fake(fake_function(name)?)
        }
        ("func", Some("echo"), Some(text)) => ContextFunc::Echo(text.to_string()),
        ("func", Some("botify"), Some(pattern)) => ContextFunc::Botify(pattern.to_string()),
        ("func", Some("int_between"), Some(args)) => {
            let (low, high) = args.split_once(',')?;
            ContextFunc::IntBetween(low.trim().parse().ok()?, high.trim().parse().ok()?)
        }
        ("botify", Some(pattern), rest) => {
            let pattern = match rest {
                Some(rest) => format!("{pattern}:{rest}"),
                None => pattern.to_string(),
            };
            ContextFunc::Botify(pattern)
        }
        _ => return None,
    };
    Some(ContextValue::Func(func))
}

fn from_mapping(mapping: serde_yaml::Mapping) -> ContextData {
    mapping
        .into_iter()
        .map(|(k, v)| {
            let key = match k {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => serde_yaml::to_string(&other)
                    .map(|s| s.trim().to_string())
                    .unwrap_or_default(),
            };
            let value = ContextValue::from_yaml(v, &key);
            (key, value)
        })
        .collect()
}

/// Parse one YAML context document.
///
/// `alias:` values are kept as literal strings; [`load_contexts`] resolves
/// them across namespaces.
///
/// # Errors
///
/// Returns `ConfigError::InvalidYaml` if the document is not a YAML map.
pub fn parse_context(yaml: &str) -> Result<ContextData, ConfigError> {
    let mapping: Option<serde_yaml::Mapping> =
        serde_yaml::from_str(yaml).map_err(|source| ConfigError::InvalidYaml { source })?;
    Ok(mapping.map(from_mapping).unwrap_or_default())
}

/// Ordered context namespaces searched by the replacer.
#[derive(Debug, Clone, Default)]
pub struct Contexts {
    namespaces: Vec<(String, ContextData)>,
}

impl Contexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a namespace. Earlier namespaces win lookups.
    pub fn push(&mut self, name: impl Into<String>, data: ContextData) {
        self.namespaces.push((name.into(), data));
    }

    /// Builder-style [`Contexts::push`].
    pub fn with(mut self, name: impl Into<String>, data: ContextData) -> Self {
        self.push(name, data);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ContextData> {
        self.namespaces
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContextData> {
        self.namespaces.iter().map(|(_, data)| data)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(|(n, _)| n.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Top-level functions across all namespaces, first definition wins.
    pub fn functions(&self) -> IndexMap<String, ContextFunc> {
        let mut out = IndexMap::new();
        for data in self.iter() {
            for (key, value) in data {
                if let ContextValue::Func(f) = value {
                    out.entry(key.clone()).or_insert_with(|| f.clone());
                }
            }
        }
        out
    }

    /// Keep only the named namespaces, in the given order.
    pub fn select(&self, names: &[String]) -> Contexts {
        let namespaces = names
            .iter()
            .filter_map(|name| self.get(name).map(|data| (name.clone(), data.clone())))
            .collect();
        Contexts { namespaces }
    }

    /// Load context files; each file's stem becomes its namespace name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a file can't be read or parsed.
    pub fn load_files(paths: &[PathBuf]) -> Result<Contexts, ConfigError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let content =
                std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
                    path: path.clone(),
                    source,
                })?;
            files.push((namespace_name(path), content));
        }
        load_contexts(files.iter().map(|(n, c)| (n.as_str(), c.as_str())))
    }
}

fn namespace_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Parse named context documents and resolve `alias:<namespace>.<path>`
/// references between them.
///
/// Unresolved aliases are logged and dropped.
///
/// # Errors
///
/// Returns `ConfigError::InvalidYaml` for the first malformed document.
pub fn load_contexts<'a>(
    files: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Contexts, ConfigError> {
    let mut contexts = Contexts::new();
    for (name, content) in files {
        contexts.push(name, parse_context(content)?);
    }

    let mut pending = Vec::new();
    for (idx, (_, data)) in contexts.namespaces.iter().enumerate() {
        let mut found = Vec::new();
        collect_aliases(data, &mut Vec::new(), &mut found);
        pending.extend(found.into_iter().map(|(path, target)| (idx, path, target)));
    }

    let resolved: Vec<_> = pending
        .into_iter()
        .map(|(idx, path, target)| {
            let value = lookup_alias(&contexts, &target);
            (idx, path, target, value)
        })
        .collect();

    for (idx, path, target, value) in resolved {
        let (namespace, data) = &mut contexts.namespaces[idx];
        match value {
            Some(value) => set_at(data, &path, value),
            None => {
                tracing::warn!(
                    context = %namespace,
                    key = %path.join("."),
                    alias = %target,
                    "context alias is not defined"
                );
                remove_at(data, &path);
            }
        }
    }

    Ok(contexts)
}

fn collect_aliases(
    data: &ContextData,
    prefix: &mut Vec<String>,
    out: &mut Vec<(Vec<String>, String)>,
) {
    for (key, value) in data {
        prefix.push(key.clone());
        match value {
            ContextValue::String(s) => {
                if let Some(target) = s.strip_prefix("alias:") {
                    out.push((prefix.clone(), target.to_string()));
                }
            }
            ContextValue::Map(map) => collect_aliases(map, prefix, out),
            _ => {}
        }
        prefix.pop();
    }
}

fn lookup_alias(contexts: &Contexts, target: &str) -> Option<ContextValue> {
    let mut parts = target.split('.');
    let mut current = contexts.get(parts.next()?)?;
    let mut keys = parts.peekable();
    while let Some(key) = keys.next() {
        let value = current.get(key)?;
        if keys.peek().is_none() {
            return Some(value.clone());
        }
        current = value.as_map()?;
    }
    None
}

fn set_at(data: &mut ContextData, path: &[String], value: ContextValue) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = data;
    for key in parents {
        match current.get_mut(key) {
            Some(ContextValue::Map(map)) => current = map,
            _ => return,
        }
    }
    current.insert(last.clone(), value);
}

fn remove_at(data: &mut ContextData, path: &[String]) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = data;
    for key in parents {
        match current.get_mut(key) {
            Some(ContextValue::Map(map)) => current = map,
            _ => return,
        }
    }
    current.shift_remove(last);
}
