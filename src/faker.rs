//! Random data source backing generation.
//!
//! All randomness in the crate flows through a [`Faker`], so a seeded faker
//! makes a generation call reproducible.

use base64::Engine;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::value::Value;

const WORDS: &[&str] = &[
    "alpha", "amber", "anchor", "apple", "arrow", "autumn", "basket", "beacon", "berry", "birch",
    "blossom", "bridge", "canyon", "carbon", "castle", "cedar", "cloud", "comet", "coral", "cotton",
    "crystal", "delta", "desert", "dream", "ember", "falcon", "feather", "field", "forest", "frost",
    "galaxy", "garden", "glacier", "harbor", "hazel", "horizon", "island", "jasmine", "lagoon",
    "lantern", "lemon", "maple", "meadow", "meteor", "mirror", "mountain", "nectar", "ocean",
    "orbit", "orchid", "pebble", "pepper", "planet", "prairie", "quartz", "rain", "river", "saffron",
    "shadow", "silver", "spring", "stone", "summit", "sunset", "thunder", "timber", "valley",
    "velvet", "willow", "winter",
];

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Amara", "Ben", "Chloe", "Dmitri", "Elena", "Farah", "Grace", "Hugo", "Ines",
    "Jonas", "Kai", "Lena", "Mateo", "Nia", "Omar", "Priya", "Quinn", "Rosa", "Sami", "Tara",
    "Umar", "Vera", "Wei", "Yara", "Zoe",
];

const LAST_NAMES: &[&str] = &[
    "Adams", "Bauer", "Costa", "Dubois", "Eriksen", "Fischer", "Garcia", "Hansen", "Ivanova",
    "Jensen", "Kowalski", "Lopez", "Moreau", "Nakamura", "Okafor", "Petrov", "Rossi", "Schmidt",
    "Tanaka", "Usman", "Varga", "Weber", "Young", "Zhang",
];

const TLDS: &[&str] = &["com", "net", "org", "io", "dev", "info"];

/// Named generator function, resolvable from context data (`fake:<name>`).
pub type FakeFn = fn(&mut Faker) -> Value;

/// Seedable random data generator.
#[derive(Debug, Clone)]
pub struct Faker {
    rng: StdRng,
}

impl Default for Faker {
    fn default() -> Self {
        Self::new()
    }
}

impl Faker {
    /// Create a faker seeded from system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministic faker.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Access the underlying RNG.
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Pick a random element. Returns `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    fn pick(&mut self, items: &[&str]) -> String {
        self.choose(items).map(|s| s.to_string()).unwrap_or_default()
    }

    pub fn word(&mut self) -> String {
        self.pick(WORDS)
    }

    pub fn sentence(&mut self) -> String {
        let count = self.rng.gen_range(4..=9);
        let words: Vec<String> = (0..count).map(|_| self.word()).collect();
        let mut sentence = words.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }

    pub fn first_name(&mut self) -> String {
        self.pick(FIRST_NAMES)
    }

    pub fn last_name(&mut self) -> String {
        self.pick(LAST_NAMES)
    }

    pub fn name(&mut self) -> String {
        format!("{} {}", self.first_name(), self.last_name())
    }

    pub fn user_name(&mut self) -> String {
        let first = self.first_name().to_lowercase();
        let suffix: u16 = self.rng.gen_range(1..1000);
        format!("{first}{suffix}")
    }

    pub fn domain(&mut self) -> String {
        let tld = self.pick(TLDS);
        format!("{}.{}", self.word(), tld)
    }

    pub fn email(&mut self) -> String {
        format!("{}@{}", self.user_name(), self.domain())
    }

    pub fn url(&mut self) -> String {
        format!("https://{}/{}", self.domain(), self.word())
    }

    /// Password without whitespace, suitable for `Basic`/`Bearer` headers.
    pub fn password(&mut self) -> String {
        const CHARSET: &[u8] =
            b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789!@#%&*-_";
        let len = self.rng.gen_range(12..=20);
        (0..len)
            .map(|_| CHARSET[self.rng.gen_range(0..CHARSET.len())] as char)
            .collect()
    }

    pub fn ipv4(&mut self) -> String {
        let octets: [u8; 4] = self.rng.gen();
        std::net::Ipv4Addr::from(octets).to_string()
    }

    pub fn ipv6(&mut self) -> String {
        let segments: [u16; 8] = self.rng.gen();
        std::net::Ipv6Addr::from(segments).to_string()
    }

    /// Random version 4 UUID drawn from this faker's RNG.
    pub fn uuid(&mut self) -> String {
        let bytes: [u8; 16] = self.rng.gen();
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string()
    }

    /// Date between 1970 and 2030 as `YYYY-MM-DD`.
    pub fn date(&mut self) -> String {
        let days = self.rng.gen_range(0..22_000);
        NaiveDate::from_ymd_opt(1970, 1, 1)
            .and_then(|epoch| epoch.checked_add_signed(Duration::days(days)))
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    /// RFC 3339 timestamp in UTC.
    pub fn date_time(&mut self) -> String {
        let secs = self.rng.gen_range(0..1_900_000_000_i64);
        DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    }

    pub fn int32(&mut self) -> i64 {
        i64::from(self.rng.gen_range(1..=i32::MAX))
    }

    pub fn int64(&mut self) -> i64 {
        self.rng.gen_range(1..=i64::MAX)
    }

    /// Unsigned value that fits in `bits` bits (capped at `i64::MAX`).
    pub fn uint(&mut self, bits: u32) -> i64 {
        let max = if bits >= 63 {
            i64::MAX
        } else {
            (1_i64 << bits) - 1
        };
        self.rng.gen_range(0..=max)
    }

    /// Small positive number for unconstrained numeric fields.
    pub fn number(&mut self) -> i64 {
        self.rng.gen_range(1..=10_000)
    }

    pub fn float(&mut self) -> f64 {
        let raw: f64 = self.rng.gen_range(0.0..10_000.0);
        (raw * 100.0).round() / 100.0
    }

    pub fn bool(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    pub fn int_between(&mut self, low: i64, high: i64) -> i64 {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.rng.gen_range(low..=high)
    }

    /// Replace `?` with a random letter and `#` with a random digit.
    pub fn bothify(&mut self, pattern: &str) -> String {
        pattern
            .chars()
            .map(|c| match c {
                '?' => char::from(b'a' + self.rng.gen_range(0..26)),
                '#' => char::from(b'0' + self.rng.gen_range(0..10)),
                other => other,
            })
            .collect()
    }

    /// Random bytes, base64 encoded.
    pub fn base64(&mut self) -> String {
        let len = self.rng.gen_range(8..=24);
        let bytes: Vec<u8> = (0..len).map(|_| self.rng.gen()).collect();
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }
}

static FAKE_FUNCTIONS: &[(&str, FakeFn)] = &[
    ("person.first_name", |f| f.first_name().into()),
    ("person.last_name", |f| f.last_name().into()),
    ("person.name", |f| f.name().into()),
    ("internet.user_name", |f| f.user_name().into()),
    ("internet.email", |f| f.email().into()),
    ("internet.password", |f| f.password().into()),
    ("internet.domain_name", |f| f.domain().into()),
    ("internet.url", |f| f.url().into()),
    ("internet.ipv4", |f| f.ipv4().into()),
    ("internet.ipv6", |f| f.ipv6().into()),
    ("lorem.word", |f| f.word().into()),
    ("lorem.sentence", |f| f.sentence().into()),
    ("uuid.v4", |f| f.uuid().into()),
    ("time.date", |f| f.date().into()),
    ("time.date_time", |f| f.date_time().into()),
    ("number.int32", |f| f.int32().into()),
    ("number.int64", |f| f.int64().into()),
    ("number.float", |f| f.float().into()),
    ("bool.bool", |f| f.bool().into()),
];

/// Look up a named generator function.
pub fn fake_function(name: &str) -> Option<FakeFn> {
    FAKE_FUNCTIONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, f)| *f)
}

/// Names of all registered generator functions.
pub fn fake_function_names() -> impl Iterator<Item = &'static str> {
    FAKE_FUNCTIONS.iter().map(|(n, _)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_faker_is_deterministic() {
        let mut a = Faker::seeded(42);
        let mut b = Faker::seeded(42);
        assert_eq!(a.email(), b.email());
        assert_eq!(a.uuid(), b.uuid());
        assert_eq!(a.int32(), b.int32());
    }

    #[test]
    fn formats_are_well_formed() {
        let mut faker = Faker::seeded(3);
        let uuid = faker.uuid();
        assert!(uuid::Uuid::parse_str(&uuid).is_ok());
        assert_eq!(uuid.as_bytes()[14], b'4');

        assert!(NaiveDate::parse_from_str(&faker.date(), "%Y-%m-%d").is_ok());
        assert!(DateTime::parse_from_rfc3339(&faker.date_time()).is_ok());
        assert!(faker.ipv4().parse::<std::net::Ipv4Addr>().is_ok());
        assert!(faker.ipv6().parse::<std::net::Ipv6Addr>().is_ok());
        assert!(faker.email().contains('@'));
        assert!(!faker.password().contains(char::is_whitespace));
    }

    #[test]
    fn bothify_replaces_markers() {
        let mut faker = Faker::seeded(9);
        let out = faker.bothify("ID-??-###");
        assert_eq!(out.len(), 9);
        assert!(out.starts_with("ID-"));
        assert!(out[3..5].chars().all(|c| c.is_ascii_lowercase()));
        assert!(out[6..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn uint_respects_bit_width() {
        let mut faker = Faker::seeded(5);
        for _ in 0..100 {
            assert!(faker.uint(8) <= 255);
            assert!(faker.uint(16) <= 65_535);
        }
    }

    #[test]
    fn registry_lookup() {
        let f = fake_function("person.first_name").unwrap();
        let mut faker = Faker::seeded(1);
        assert!(matches!(f(&mut faker), Value::String(s) if !s.is_empty()));
        assert!(fake_function("does.not_exist").is_none());
        assert!(fake_function_names().any(|n| n == "uuid.v4"));
    }
}
