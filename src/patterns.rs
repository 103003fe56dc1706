//! Regular expression helpers: cached validation, string synthesis from a
//! pattern, placeholder extraction and name casing.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use regex_syntax::hir::{Class, Hir, HirKind};

use crate::faker::Faker;

/// Upper bound added to the minimum of `*`, `+` and `{n,}` repetitions.
const MAX_UNBOUNDED_REPEAT: u32 = 8;

static REGEX_CACHE: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(Default::default);

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^}]*\}").expect("valid regex"));
static FIRST_CAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
static ALL_CAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// Compile a pattern through the shared cache.
///
/// Returns `None` for patterns that do not compile.
pub fn compiled(pattern: &str) -> Option<Regex> {
    let mut cache = REGEX_CACHE.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(re) = cache.get(pattern) {
        return Some(re.clone());
    }
    match Regex::new(pattern) {
        Ok(re) => {
            cache.insert(pattern.to_string(), re.clone());
            Some(re)
        }
        Err(e) => {
            tracing::debug!(pattern, error = %e, "invalid regular expression");
            None
        }
    }
}

/// Check `input` against `pattern`. Invalid patterns never match.
pub fn validate_with_pattern(input: &str, pattern: &str) -> bool {
    compiled(pattern).is_some_and(|re| re.is_match(input))
}

/// Whether a context key looks like a regular expression rather than a name.
pub fn maybe_regex_pattern(key: &str) -> bool {
    const SPECIAL: &[char] = &['\\', '.', '*', '^', '$', '+', '?', '(', '[', '{', '|'];
    key.contains(SPECIAL)
}

/// Synthesize a string matching `pattern`.
///
/// Anchors and word boundaries produce nothing, classes prefer printable
/// ASCII members. Returns `None` when the pattern does not parse.
pub fn generate_from_pattern(pattern: &str, faker: &mut Faker) -> Option<String> {
    let hir = match regex_syntax::Parser::new().parse(pattern) {
        Ok(hir) => hir,
        Err(e) => {
            tracing::debug!(pattern, error = %e, "cannot parse pattern");
            return None;
        }
    };
    let mut out = String::new();
    emit(&hir, faker, &mut out);
    Some(out)
}

fn emit(hir: &Hir, faker: &mut Faker, out: &mut String) {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => {}
        HirKind::Literal(lit) => out.push_str(&String::from_utf8_lossy(&lit.0)),
        HirKind::Class(class) => {
            if let Some(c) = pick_class_char(class, faker) {
                out.push(c);
            }
        }
        HirKind::Repetition(rep) => {
            let upper = rep
                .max
                .unwrap_or_else(|| rep.min.saturating_add(MAX_UNBOUNDED_REPEAT));
            let count = if upper > rep.min {
                faker.rng().gen_range(rep.min..=upper)
            } else {
                rep.min
            };
            for _ in 0..count {
                emit(&rep.sub, faker, out);
            }
        }
        HirKind::Capture(capture) => emit(&capture.sub, faker, out),
        HirKind::Concat(parts) => {
            for part in parts {
                emit(part, faker, out);
            }
        }
        HirKind::Alternation(branches) => {
            if !branches.is_empty() {
                let idx = faker.rng().gen_range(0..branches.len());
                emit(&branches[idx], faker, out);
            }
        }
    }
}

fn pick_class_char(class: &Class, faker: &mut Faker) -> Option<char> {
    let ranges: Vec<(u32, u32)> = match class {
        Class::Unicode(cls) => cls
            .ranges()
            .iter()
            .map(|r| (r.start() as u32, r.end() as u32))
            .collect(),
        Class::Bytes(cls) => cls
            .ranges()
            .iter()
            .map(|r| (u32::from(r.start()), u32::from(r.end())))
            .collect(),
    };

    // Printable ASCII first, then whatever the class allows
    let printable: Vec<(u32, u32)> = ranges
        .iter()
        .filter_map(|&(start, end)| {
            let (s, e) = (start.max(0x20), end.min(0x7e));
            (s <= e).then_some((s, e))
        })
        .collect();
    let pool = if printable.is_empty() { &ranges } else { &printable };
    if pool.is_empty() {
        return None;
    }

    let (start, end) = pool[faker.rng().gen_range(0..pool.len())];
    let code = faker.rng().gen_range(start..=end);
    char::from_u32(code).or_else(|| char::from_u32(start))
}

/// Extract `{identifier}` placeholders in order of appearance, braces included.
pub fn extract_placeholders(text: &str) -> Vec<String> {
    PLACEHOLDER
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Convert `camelCase` and `PascalCase` names to `snake_case`.
pub fn to_snake_case(input: &str) -> String {
    let snake = FIRST_CAP.replace_all(input, "${1}_${2}");
    let snake = ALL_CAP.replace_all(&snake, "${1}_${2}");
    snake.replace("__", "_").trim_matches('_').to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_uses_cache_and_rejects_invalid() {
        assert!(validate_with_pattern("abc-123", r"^[a-z]+-\d+$"));
        assert!(validate_with_pattern("xyz-9", r"^[a-z]+-\d+$"));
        assert!(!validate_with_pattern("ABC", r"^[a-z]+$"));
        assert!(!validate_with_pattern("anything", r"(unclosed"));
    }

    #[test]
    fn generated_strings_match_their_pattern() {
        let mut faker = Faker::seeded(7);
        for pattern in [
            r"^\d{3}-\d{4}$",
            r"^[A-Z]{2}[0-9]{6}$",
            r"^(foo|bar)+baz?$",
            r"^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,4}$",
            r"^\w+\s\w+$",
        ] {
            for _ in 0..20 {
                let value = generate_from_pattern(pattern, &mut faker).unwrap();
                assert!(
                    validate_with_pattern(&value, pattern),
                    "{value:?} does not match {pattern}"
                );
            }
        }
    }

    #[test]
    fn generate_rejects_unparsable_pattern() {
        let mut faker = Faker::seeded(1);
        assert!(generate_from_pattern("[z-a]", &mut faker).is_none());
    }

    #[test]
    fn regex_key_heuristic() {
        assert!(maybe_regex_pattern("^user_.*"));
        assert!(maybe_regex_pattern("id|key"));
        assert!(!maybe_regex_pattern("user_name"));
    }

    #[test]
    fn placeholders_in_order() {
        assert_eq!(
            extract_placeholders("/users/{id}/files/{file-id}"),
            vec!["{id}".to_string(), "{file-id}".to_string()]
        );
        assert!(extract_placeholders("/users").is_empty());
    }

    #[test]
    fn snake_case() {
        assert_eq!(to_snake_case("firstName"), "first_name");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("userID"), "user_id");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
    }
}
